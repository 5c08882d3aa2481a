//! timebase.rs
//! Conversion of platform timebase ticks to wall time.
//!
//! The frequency is read once from the platform when the accelerator context
//! is created and carried here as a plain value.

use std::time::Duration;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Timebase {
    frequency_hz: u64,
}

impl Timebase {
    /// `None` for a zero frequency.
    pub fn new(frequency_hz: u64) -> Option<Self> {
        (frequency_hz != 0).then_some(Self { frequency_hz })
    }

    pub fn frequency_hz(&self) -> u64 {
        self.frequency_hz
    }

    /// Ticks from `start` to `end`, tolerating one counter wrap.
    pub fn diff(start: u64, end: u64) -> u64 {
        end.wrapping_sub(start)
    }

    pub fn to_micros(&self, ticks: u64) -> u64 {
        ((ticks as u128 * 1_000_000) / self.frequency_hz as u128) as u64
    }

    pub fn to_duration(&self, ticks: u64) -> Duration {
        let secs = ticks / self.frequency_hz;
        let rem = ticks % self.frequency_hz;
        let nanos = (rem as u128 * 1_000_000_000 / self.frequency_hz as u128) as u32;
        Duration::new(secs, nanos)
    }
}
