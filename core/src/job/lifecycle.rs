//! job/lifecycle.rs
//! One hardware invocation: Built -> Submitted -> Completed | Failed | TimedOut.
//!
//! Industry notes:
//! - Each state is its own type. A `Job` can only be submitted, an
//!   `InFlightJob` can only be waited on, a `CompletedJob` is the only thing
//!   that exposes the output region.
//! - Submit clears the valid bit, issues a release fence and enqueues. Wait
//!   observes the valid bit with acquire ordering, so the device's writes are
//!   visible once it returns.
//! - The device holds raw addresses into the region and operands. An in-flight
//!   job that is dropped before completion is leaked, never freed.

use std::sync::atomic::{fence, Ordering};
use std::time::Instant;

use crate::blocks::param::ParameterBlock;
use crate::blocks::region::JobRegion;
use crate::blocks::request::{FunctionCode, RequestBlock};
use crate::blocks::status::CompletionStatus;
use crate::classify::{classify, Classification};
use crate::config::JobConfig;
use crate::constants::{INIT_ADLER, INIT_CRC};
use crate::dde::Operand;
use crate::error::NxError;
use crate::job::platform::Platform;
use crate::job::wait::WaitOutcome;
use crate::metrics::CompletionMetrics;
use crate::timebase::Timebase;

/// A built, not yet submitted invocation.
#[derive(Debug)]
pub struct Job {
    region: Box<JobRegion>,
    function: FunctionCode,
    source: Operand,
    target: Operand,
}

impl Job {
    /// Program the request block for `function` over `source` into `target`.
    /// Checksum seeds start at their initial values.
    pub fn new(
        function: FunctionCode,
        source: Operand,
        target: Operand,
        config: &JobConfig,
    ) -> Result<Self, NxError> {
        let region = JobRegion::new_boxed();
        let crb = &region.crb;
        crb.set_function(function, config.limit_select)?;
        if config.notify {
            crb.set_notify(true)?;
            crb.set_completion_method(config.completion_method)?;
        }
        source.descriptor.write_into(&crb.source_dde())?;
        target.descriptor.write_into(&crb.target_dde())?;
        region.cpb.set_seeds(INIT_CRC, INIT_ADLER);

        log::trace!(
            "built {:?}: src {} bytes ({}), dst {} bytes",
            function,
            source.len(),
            if source.descriptor.is_indirect() { "indirect" } else { "direct" },
            target.len()
        );
        Ok(Self { region, function, source, target })
    }

    pub fn function(&self) -> FunctionCode {
        self.function
    }

    /// Switch to another function code, keeping operands and parameters.
    pub fn set_function(&mut self, function: FunctionCode, limit_select: bool) -> Result<(), NxError> {
        self.region.crb.set_function(function, limit_select)?;
        self.function = function;
        Ok(())
    }

    pub fn request(&self) -> &RequestBlock {
        &self.region.crb
    }

    /// Input region is filled here before submission.
    pub fn param(&self) -> &ParameterBlock {
        &self.region.cpb
    }

    pub fn region(&self) -> &JobRegion {
        &self.region
    }

    pub fn source(&self) -> &Operand {
        &self.source
    }

    pub fn target(&self) -> &Operand {
        &self.target
    }

    /// Hand the job to the device. On rejection the job comes back unchanged
    /// so the caller may retry.
    pub fn submit(self, platform: &dyn Platform) -> Result<InFlightJob, (Job, NxError)> {
        self.region.csb.clear();
        fence(Ordering::Release);

        let started = platform.read_timebase();
        let address = self.region.address();
        log::trace!("enqueue {:?} at {:#x}", self.function, address);
        match platform.enqueue(address) {
            Ok(()) => Ok(InFlightJob { job: Some(self), started, submitted_at: Instant::now() }),
            Err(e) => Err((self, e.into())),
        }
    }

    pub fn into_operands(self) -> (Operand, Operand) {
        (self.source, self.target)
    }
}

/// A submitted job. The device may write into it at any moment until its
/// valid bit is observed.
#[derive(Debug)]
pub struct InFlightJob {
    job: Option<Job>,
    started: u64,
    submitted_at: Instant,
}

impl InFlightJob {
    pub fn function(&self) -> Option<FunctionCode> {
        self.job.as_ref().map(Job::function)
    }

    pub fn submitted_at(&self) -> Instant {
        self.submitted_at
    }

    /// Non-blocking completion check.
    pub fn is_complete(&self) -> bool {
        self.job.as_ref().is_some_and(|j| j.region.csb.is_valid())
    }

    /// Wait until completion or `deadline`. On timeout the job stays in flight
    /// and is handed back; the caller may wait again or drop it.
    pub fn wait(
        mut self,
        platform: &dyn Platform,
        deadline: Instant,
        config: &JobConfig,
    ) -> Result<CompletedJob, (InFlightJob, NxError)> {
        let Some(job) = self.job.as_ref() else {
            return Err((self, NxError::State("job already retired")));
        };

        match platform.wait(&job.region.csb, deadline, &config.poll) {
            WaitOutcome::Completed => {
                fence(Ordering::Acquire);
                let ticks = Timebase::diff(self.started, platform.read_timebase());
                let status = job.region.csb.read();
                let job = match self.job.take() {
                    Some(j) => j,
                    None => return Err((self, NxError::State("job already retired"))),
                };
                log::debug!(
                    "{:?} completed: cc={} ce={:#04x} tpbc={}",
                    job.function, status.code, status.extension, status.tpbc
                );
                Ok(CompletedJob { job, status, ticks })
            }
            WaitOutcome::TimedOut { elapsed } => {
                log::warn!("{:?} not complete after {:?}", job.function, elapsed);
                Err((self, NxError::TimedOut { elapsed }))
            }
        }
    }
}

impl Drop for InFlightJob {
    fn drop(&mut self) {
        if let Some(job) = self.job.take() {
            if job.region.csb.is_valid() {
                return;
            }
            log::warn!(
                "dropping in-flight {:?} job at {:#x}: leaking its buffers",
                job.function,
                job.region.address()
            );
            std::mem::forget(job);
        }
    }
}

/// A job whose valid bit has been observed.
#[derive(Debug)]
pub struct CompletedJob {
    job: Job,
    status: CompletionStatus,
    ticks: u64,
}

impl CompletedJob {
    pub fn status(&self) -> &CompletionStatus {
        &self.status
    }

    pub fn classification(&self) -> Classification {
        classify(&self.status)
    }

    pub fn function(&self) -> FunctionCode {
        self.job.function
    }

    /// Output region is readable here.
    pub fn param(&self) -> &ParameterBlock {
        &self.job.region.cpb
    }

    pub fn request(&self) -> &RequestBlock {
        &self.job.region.crb
    }

    pub fn source(&self) -> &Operand {
        &self.job.source
    }

    pub fn target(&self) -> &Operand {
        &self.job.target
    }

    /// Timebase ticks from submit to observed completion.
    pub fn ticks(&self) -> u64 {
        self.ticks
    }

    /// Source processed bytes when the counters are trustworthy.
    pub fn spbc(&self) -> Option<u32> {
        self.status.counts_valid().then(|| self.param().spbc(self.job.function))
    }

    pub fn metrics(&self, timebase: &Timebase) -> CompletionMetrics {
        CompletionMetrics::extract(self.param(), &self.status, self.job.function, self.ticks, timebase)
    }

    /// The first `tpbc` bytes written across the target buffers.
    pub fn output(&self) -> Vec<u8> {
        let mut remaining = self.status.tpbc as usize;
        let mut out = Vec::with_capacity(remaining);
        for buf in &self.job.target.buffers {
            if remaining == 0 {
                break;
            }
            let take = remaining.min(buf.len());
            buf.read_into(&mut out, take);
            remaining -= take;
        }
        out
    }

    /// Back to a submittable job: same operands, same parameters.
    pub fn into_job(self) -> Job {
        self.job
    }
}
