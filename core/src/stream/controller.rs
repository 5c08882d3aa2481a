//! stream/controller.rs
//! Drives one logical stream across as many invocations as it takes.
//!
//! Idle -> Running -> {Suspended -> Running -> ...} -> Finished | Aborted.
//!
//! Industry notes:
//! - Invocations of one stream are strictly sequential: the next input
//!   parameter block is built from the previous output one.
//! - Decompression may stop inside a byte. The source is re-fed from the
//!   first byte that still holds unprocessed bits, and the low three bits of
//!   the unprocessed count tell the device how many of that byte's bits remain.
//! - Compression suspends only on source byte boundaries and carries no bit
//!   offset. Its output is realigned after each invocation and terminated
//!   with an empty final block once all input is consumed.
//! - Checksums chain: each output seed is the next input seed.

use serde::{Deserialize, Serialize};

use crate::classify::Classification;
use crate::constants::sfbt_ids;
use crate::dde::{Operand, PinnedBuffer};
use crate::error::{StreamError, TokenError};
use crate::job::accelerator::Accelerator;
use crate::job::lifecycle::{CompletedJob, Job};
use crate::job::platform::Platform;
use crate::metrics::CompletionMetrics;
use crate::stream::{deflate, history};
use crate::stream::state::{BlockType, StreamKind, StreamState};
use crate::utils::bits_to_bytes;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum Phase {
    Idle,
    Running,
    Suspended,
    Finished,
    Aborted,
}

/// Result of one invocation.
#[derive(Debug, Clone)]
pub struct Step {
    /// Source bytes to drop from the front of the caller's input.
    pub consumed: usize,
    pub output: Vec<u8>,
    pub phase: Phase,
    /// Bytes after the end-of-stream marker (e.g. a gzip trailer). Only set
    /// when `phase` is Finished.
    pub trailing: usize,
    pub metrics: CompletionMetrics,
}

/// Result of `run`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StreamOutput {
    pub output: Vec<u8>,
    pub consumed: usize,
    pub phase: Phase,
    pub crc: u32,
    pub adler: u32,
    pub trailing: usize,
}

pub struct StreamController<'a, P: Platform> {
    accel: &'a Accelerator<P>,
    state: StreamState,
    phase: Phase,
}

impl<'a, P: Platform> StreamController<'a, P> {
    pub fn new(accel: &'a Accelerator<P>, kind: StreamKind) -> Self {
        Self { accel, state: StreamState::new(kind), phase: Phase::Idle }
    }

    /// Continue a stream from a previously captured token.
    pub fn resume(accel: &'a Accelerator<P>, state: StreamState) -> Result<Self, StreamError> {
        state.validate()?;
        if !state.resumed {
            return Ok(Self { accel, state, phase: Phase::Idle });
        }
        if state.kind.is_decompress() && state.sfbt == sfbt_ids::END_OF_STREAM {
            return Err(StreamError::State("token belongs to a finished stream"));
        }
        Ok(Self { accel, state, phase: Phase::Suspended })
    }

    /// Import a token exported with `export_token`.
    pub fn import(accel: &'a Accelerator<P>, token: &[u8]) -> Result<Self, StreamError> {
        Self::resume(accel, StreamState::from_bytes(token)?)
    }

    pub fn export_token(&self) -> Result<Vec<u8>, TokenError> {
        self.state.to_bytes()
    }

    pub fn phase(&self) -> Phase {
        self.phase
    }

    pub fn state(&self) -> &StreamState {
        &self.state
    }

    pub fn into_state(self) -> StreamState {
        self.state
    }

    /// Running checksums; final only once the stream is Finished.
    pub fn checksums(&self) -> (u32, u32) {
        (self.state.crc, self.state.adler)
    }

    /// Issue one invocation over `input`, the caller's not yet consumed
    /// source, with room for `capacity` output bytes.
    pub fn step(&mut self, input: &[u8], capacity: usize) -> Result<Step, StreamError> {
        match self.phase {
            Phase::Finished => return Err(StreamError::State("stream already finished")),
            Phase::Aborted => return Err(StreamError::State("stream aborted")),
            Phase::Running => return Err(StreamError::State("invocation already running")),
            Phase::Idle | Phase::Suspended => {}
        }
        if self.state.steps >= self.accel.config().max_stream_steps {
            self.phase = Phase::Aborted;
            return Err(StreamError::State("invocation limit reached"));
        }

        let job = self.build_job(input, capacity)?;
        let before = self.phase;
        self.phase = Phase::Running;

        let done = match self.accel.execute(job) {
            Ok(done) => done,
            Err(e) => {
                self.phase = Phase::Aborted;
                log::error!("stream invocation failed after {:?}: {}", before, e);
                return Err(e.into());
            }
        };
        self.state.steps += 1;

        let c = done.classification();
        if c.category.is_error() {
            self.phase = Phase::Aborted;
            let fault = c.fault();
            log::error!("stream aborted: {}", fault);
            let partial_output = if c.counts_trusted() { done.output() } else { Vec::new() };
            return Err(StreamError::Aborted { fault, partial_output });
        }
        if !c.counts_trusted() {
            self.phase = Phase::Aborted;
            return Err(StreamError::Protocol("completion without valid byte counts".into()));
        }

        let step = match self.absorb(&done, &c, input) {
            Ok(step) => step,
            Err(e) => {
                self.phase = Phase::Aborted;
                return Err(e);
            }
        };
        self.phase = step.phase;
        log::debug!(
            "stream step {}: consumed {}, produced {}, {:?}",
            self.state.steps,
            step.consumed,
            step.output.len(),
            step.phase
        );
        Ok(step)
    }

    /// Step until Finished, or until the device can make no further progress
    /// with what it was given (more input needed).
    ///
    /// Every error exit carries the output gathered so far: hardware faults
    /// as `Aborted`, anything else wrapped in `Halted`.
    pub fn run(&mut self, input: &[u8], capacity: usize) -> Result<StreamOutput, StreamError> {
        let mut output = Vec::new();
        let mut pos = 0usize;
        let mut trailing = 0usize;

        loop {
            let step = match self.step(&input[pos..], capacity) {
                Ok(step) => step,
                Err(StreamError::Aborted { fault, partial_output }) => {
                    output.extend_from_slice(&partial_output);
                    return Err(StreamError::Aborted { fault, partial_output: output });
                }
                Err(e) => {
                    return Err(StreamError::Halted { cause: Box::new(e), partial_output: output });
                }
            };
            pos += step.consumed;
            output.extend_from_slice(&step.output);

            match step.phase {
                Phase::Finished => {
                    trailing = step.trailing;
                    break;
                }
                Phase::Suspended if step.consumed == 0 && step.output.is_empty() => {
                    log::debug!("no progress at source offset {}", pos);
                    break;
                }
                Phase::Suspended if self.state.kind.is_decompress() && pos == input.len() => break,
                _ => {}
            }
        }

        Ok(StreamOutput {
            output,
            consumed: pos,
            phase: self.phase,
            crc: self.state.crc,
            adler: self.state.adler,
            trailing,
        })
    }

    fn build_job(&self, input: &[u8], capacity: usize) -> Result<Job, StreamError> {
        let st = &self.state;
        let function = st.kind.function(st.resumed);

        let (window, quadwords) = if st.resumed && st.kind != StreamKind::Wrap {
            history::prepare(&st.history, st.kind.is_decompress())
        } else {
            (Vec::new(), 0)
        };

        let mut buffers = Vec::with_capacity(2);
        if quadwords > 0 {
            buffers.push(PinnedBuffer::from(window));
        }
        buffers.push(PinnedBuffer::from(input));
        let source = Operand::new(buffers)?;
        let target = Operand::single(PinnedBuffer::zeroed(capacity))?;

        let job = self.accel.job(function, source, target)?;
        let p = job.param();
        p.set_seeds(st.crc, st.adler);
        if st.resumed {
            p.set_history_len(quadwords)?;
            if st.kind.is_decompress() {
                p.set_in_subc(st.subc)?;
                p.set_in_sfbt(st.sfbt)?;
                match st.block_type()? {
                    BlockType::Literal { .. } => p.set_in_rembytecnt(st.rembytecnt)?,
                    BlockType::Dynamic { .. } => {
                        p.set_in_dhtlen(st.dhtlen)?;
                        p.write_in_dht(&st.dht)?;
                    }
                    _ => {}
                }
            }
        }
        Ok(job)
    }

    /// Fold a successful completion into the stream state.
    fn absorb(&mut self, done: &CompletedJob, c: &Classification, input: &[u8]) -> Result<Step, StreamError> {
        let p = done.param();
        let spbc = p.spbc(done.function()) as usize;
        let mut output = done.output();
        let mut trailing = 0usize;

        let (consumed, phase) = if self.state.kind.is_decompress() {
            let sfbt = p.out_sfbt();
            let subc = p.out_subc() as usize;

            if sfbt == sfbt_ids::END_OF_STREAM && !c.status.is_terminated() {
                trailing = subc / 8;
                let consumed = spbc
                    .checked_sub(trailing)
                    .ok_or_else(|| StreamError::Protocol(format!("subc {} exceeds spbc {}", subc, spbc)))?;
                (consumed, Phase::Finished)
            } else if c.is_suspended() {
                let unprocessed = bits_to_bytes(subc as u32);
                let consumed = spbc.checked_sub(unprocessed).ok_or_else(|| {
                    StreamError::Protocol(format!("subc {} exceeds spbc {}", subc, spbc))
                })?;
                self.capture(done, sfbt, subc)?;
                (consumed, Phase::Suspended)
            } else {
                return Err(StreamError::Protocol(format!(
                    "decompression stopped in block type {:#06b} without suspending",
                    sfbt
                )));
            }
        } else if c.is_suspended() {
            (spbc, Phase::Suspended)
        } else if spbc == input.len() {
            (spbc, Phase::Finished)
        } else {
            return Err(StreamError::Protocol(format!(
                "completed after {} of {} source bytes without suspending",
                spbc,
                input.len()
            )));
        };

        if consumed > input.len() {
            return Err(StreamError::Protocol(format!(
                "device consumed {} bytes of a {} byte source",
                consumed,
                input.len()
            )));
        }

        if let StreamKind::Compress { .. } = self.state.kind {
            let tebc = p.out_tebc();
            if phase == Phase::Finished {
                deflate::finish(&mut output, tebc);
            } else if tebc != 0 {
                deflate::append_sync_flush(&mut output, tebc);
            }
        }

        match self.state.kind {
            StreamKind::Decompress { .. } => history::retain_tail(&mut self.state.history, &output),
            StreamKind::Compress { .. } => history::retain_tail(&mut self.state.history, &input[..consumed]),
            StreamKind::Wrap => {}
        }
        self.state.crc = p.out_crc();
        self.state.adler = p.out_adler();
        self.state.total_in += consumed as u64;
        self.state.total_out += output.len() as u64;
        self.state.resumed = true;

        Ok(Step {
            consumed,
            output,
            phase,
            trailing,
            metrics: done.metrics(self.accel.timebase()),
        })
    }

    /// Copy the resume fields of a suspended decompression verbatim.
    fn capture(&mut self, done: &CompletedJob, sfbt: u8, subc: usize) -> Result<(), StreamError> {
        let p = done.param();
        let st = &mut self.state;
        st.sfbt = sfbt;
        st.subc = (subc % 8) as u8;
        st.rembytecnt = 0;
        st.dhtlen = 0;
        st.dht.clear();
        match BlockType::from_sfbt(sfbt)? {
            BlockType::Literal { .. } => st.rembytecnt = p.out_rembytecnt(),
            BlockType::Dynamic { .. } => {
                st.dhtlen = p.out_dhtlen();
                st.dht = p.out_dht(bits_to_bytes(st.dhtlen));
            }
            BlockType::EndOfStream => {
                return Err(StreamError::Protocol("suspended at end of stream".into()));
            }
            BlockType::Fixed { .. } | BlockType::Header { .. } => {}
        }
        log::debug!("captured token: sfbt={:#06b} subc={} dhtlen={}", sfbt, st.subc, st.dhtlen);
        Ok(())
    }
}
