//! job/accelerator.rs
//! Accelerator context: platform handle, policy, timebase and counters.
//!
//! `execute` drives submit -> wait -> classify and retries the Retryable
//! category a bounded number of times, each time with a freshly cleared valid
//! bit. `run` additionally turns every non-success category into an error.

use std::sync::{Arc, Mutex};
use std::time::Instant;

use crossbeam::utils::Backoff;

use crate::blocks::request::FunctionCode;
use crate::classify::Category;
use crate::config::JobConfig;
use crate::debug::{cpb_dump, crb_dump, lzcount_dump};
use crate::dde::Operand;
use crate::error::{ConfigError, EnqueueError, NxError};
use crate::job::lifecycle::{CompletedJob, InFlightJob, Job};
use crate::job::platform::Platform;
use crate::metrics::{TelemetryCounters, TelemetrySnapshot};
use crate::timebase::Timebase;

pub struct Accelerator<P: Platform> {
    platform: Arc<P>,
    config: JobConfig,
    timebase: Timebase,
    telemetry: Mutex<TelemetryCounters>,
}

impl<P: Platform> Accelerator<P> {
    /// Validates `config` and reads the timebase frequency once.
    pub fn new(platform: Arc<P>, config: JobConfig) -> Result<Self, ConfigError> {
        config.validate()?;
        let timebase = Timebase::new(platform.timebase_frequency())
            .ok_or_else(|| ConfigError::Invalid("platform reports a zero timebase frequency".into()))?;
        log::debug!("accelerator ready, timebase {} Hz", timebase.frequency_hz());
        Ok(Self { platform, config, timebase, telemetry: Mutex::new(TelemetryCounters::default()) })
    }

    pub fn platform(&self) -> &Arc<P> {
        &self.platform
    }

    pub fn config(&self) -> &JobConfig {
        &self.config
    }

    pub fn timebase(&self) -> &Timebase {
        &self.timebase
    }

    /// Build a job with this context's policy.
    pub fn job(&self, function: FunctionCode, source: Operand, target: Operand) -> Result<Job, NxError> {
        Job::new(function, source, target, &self.config)
    }

    /// Submit, retrying a busy queue with backoff up to `max_retries` times.
    pub fn submit(&self, job: Job) -> Result<InFlightJob, NxError> {
        let backoff = Backoff::new();
        let mut job = job;
        let mut attempts = 0;
        loop {
            match job.submit(self.platform.as_ref()) {
                Ok(inflight) => {
                    self.record(|t| t.add_submit());
                    return Ok(inflight);
                }
                Err((back, NxError::Enqueue(EnqueueError::Busy))) if attempts < self.config.max_retries => {
                    attempts += 1;
                    log::warn!("receive queue busy, attempt {}", attempts);
                    backoff.snooze();
                    job = back;
                }
                Err((_, e)) => return Err(e),
            }
        }
    }

    /// Wait for `inflight` up to the configured timeout. On failure the job
    /// comes back with the error so the caller can wait again; dropping it
    /// instead leaks its buffers.
    pub fn wait(&self, inflight: InFlightJob) -> Result<CompletedJob, (InFlightJob, NxError)> {
        let deadline = Instant::now() + self.config.timeout();
        match inflight.wait(self.platform.as_ref(), deadline, &self.config) {
            Ok(done) => {
                let c = done.classification();
                let spbc = done.spbc();
                self.record(|t| t.add_completion(&c, spbc, done.ticks()));
                if log::log_enabled!(log::Level::Trace) {
                    log::trace!("{}{}", crb_dump(done.request()), cpb_dump(done.param(), done.function()));
                    if done.function().has_count() && c.counts_trusted() {
                        log::trace!("{}", lzcount_dump(done.param()));
                    }
                }
                Ok(done)
            }
            Err((pending, e)) => {
                if matches!(e, NxError::TimedOut { .. }) {
                    self.record(|t| t.add_timeout());
                }
                Err((pending, e))
            }
        }
    }

    /// Run `job` to a hardware verdict, whatever its category.
    pub fn execute(&self, job: Job) -> Result<CompletedJob, NxError> {
        let mut job = job;
        let mut retries = 0;
        loop {
            // A job that never completes is abandoned here and stays leaked.
            let done = self.wait(self.submit(job)?).map_err(|(_abandoned, e)| e)?;
            let c = done.classification();
            if c.category != Category::Retryable || retries >= self.config.max_retries {
                return Ok(done);
            }
            retries += 1;
            log::warn!("retrying {:?} ({}/{}): {}", done.function(), retries, self.config.max_retries, c.fault());
            self.record(|t| t.add_retry());
            job = done.into_job();
        }
    }

    /// Like `execute`, with every non-success category surfaced as a fault.
    pub fn run(&self, job: Job) -> Result<CompletedJob, NxError> {
        let done = self.execute(job)?;
        done.classification().into_result().map_err(NxError::Fault)?;
        Ok(done)
    }

    pub fn counters(&self) -> TelemetryCounters {
        match self.telemetry.lock() {
            Ok(t) => t.clone(),
            Err(poisoned) => poisoned.into_inner().clone(),
        }
    }

    /// Fold counters saved from an earlier context into this one's totals.
    pub fn restore_counters(&self, saved: &TelemetryCounters) {
        self.record(|t| t.merge(saved));
    }

    pub fn telemetry(&self) -> TelemetrySnapshot {
        TelemetrySnapshot::from(&self.counters(), &self.timebase)
    }

    fn record(&self, f: impl FnOnce(&mut TelemetryCounters)) {
        let mut local = TelemetryCounters::default();
        f(&mut local);
        match self.telemetry.lock() {
            Ok(mut t) => t.merge(&local),
            Err(poisoned) => poisoned.into_inner().merge(&local),
        }
    }
}
