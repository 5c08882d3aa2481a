//! job/wait.rs
//! The one place that polls a status block.
//!
//! Spins first, then yields, then sleeps in bounded steps until the deadline.
//! The deadline is a host liveness guard; the device's own watchdog code is
//! the authoritative verdict on a hung job.

use std::thread;
use std::time::{Duration, Instant};

use crossbeam::utils::Backoff;

use crate::blocks::status::StatusBlock;
use crate::config::PollConfig;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum WaitOutcome {
    /// Valid bit observed with acquire ordering.
    Completed,
    TimedOut { elapsed: Duration },
}

pub fn poll_until(status: &StatusBlock, deadline: Instant, poll: &PollConfig) -> WaitOutcome {
    let start = Instant::now();
    let backoff = Backoff::new();
    let mut polls: u64 = 0;

    loop {
        if status.is_valid() {
            log::trace!("completion after {} polls", polls);
            return WaitOutcome::Completed;
        }
        polls += 1;

        let now = Instant::now();
        if now >= deadline {
            return WaitOutcome::TimedOut { elapsed: now - start };
        }

        if backoff.is_completed() {
            thread::sleep(poll.max_sleep().min(deadline - now));
        } else {
            backoff.snooze();
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::blocks::status::CompletionStatus;

    #[test]
    fn expired_deadline_times_out() {
        let sb = StatusBlock::default();
        let out = poll_until(&sb, Instant::now(), &PollConfig::default());
        assert!(matches!(out, WaitOutcome::TimedOut { .. }));
    }

    #[test]
    fn valid_status_returns_immediately() {
        let sb = StatusBlock::default();
        sb.post(&CompletionStatus::success(0));
        let out = poll_until(&sb, Instant::now() + Duration::from_secs(5), &PollConfig::default());
        assert_eq!(out, WaitOutcome::Completed);
    }
}
