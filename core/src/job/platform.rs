//! job/platform.rs
//! The boundary to whatever actually moves a request onto the accelerator.
//!
//! Industry notes:
//! - `enqueue` is the privileged paste/enqueue primitive: it hands over the
//!   request block address and returns without waiting.
//! - `wait` defaults to polling the status block; a platform with completion
//!   interrupts can override it.
//! - The timebase is read through the platform so elapsed-time metrics come
//!   from the same clock the device stamps with.

use std::time::Instant;

use crate::blocks::status::StatusBlock;
use crate::config::PollConfig;
use crate::error::EnqueueError;
use crate::job::wait::{poll_until, WaitOutcome};

pub trait Platform: Send + Sync {
    /// Queue the request block at `request_address`. Non-blocking.
    fn enqueue(&self, request_address: u64) -> Result<(), EnqueueError>;

    /// Block until `status` becomes valid or `deadline` passes.
    fn wait(&self, status: &StatusBlock, deadline: Instant, poll: &PollConfig) -> WaitOutcome {
        poll_until(status, deadline, poll)
    }

    /// Free-running timebase counter.
    fn read_timebase(&self) -> u64;

    /// Ticks per second of `read_timebase`.
    fn timebase_frequency(&self) -> u64;
}
