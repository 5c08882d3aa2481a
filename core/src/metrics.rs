//! metrics.rs
//! Checksum and byte-count extraction from a completed parameter block, and
//! accelerator-wide counters.
//!
//! Summary: `CompletionMetrics` is read once per completed job.
//! `TelemetryCounters` accumulate per caller and are merged into the shared
//! total; `TelemetrySnapshot` is the immutable, serializable view.

use std::ops::AddAssign;
use std::time::Duration;

use bincode::error::{DecodeError, EncodeError};
use bincode::{Decode, Encode};
use serde::{Deserialize, Serialize};

use crate::blocks::param::ParameterBlock;
use crate::blocks::request::FunctionCode;
use crate::blocks::status::CompletionStatus;
use crate::classify::{Category, Classification};
use crate::timebase::Timebase;

/// What one invocation reported.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CompletionMetrics {
    pub crc: u32,
    pub adler: u32,
    /// Valid bits in the last target byte.
    pub tebc: u8,
    /// Source processed bytes, only when counts are valid.
    pub spbc: Option<u32>,
    /// Target processed bytes, only when counts are valid.
    pub tpbc: Option<u32>,
    /// 286 literal/length + 30 distance counts, for counting functions.
    pub lzcounts: Option<Vec<u32>>,
    pub ticks: u64,
    pub elapsed: Duration,
}

impl CompletionMetrics {
    pub fn extract(
        param: &ParameterBlock,
        status: &CompletionStatus,
        function: FunctionCode,
        ticks: u64,
        timebase: &Timebase,
    ) -> Self {
        let counts = status.counts_valid();
        Self {
            crc: param.out_crc(),
            adler: param.out_adler(),
            tebc: param.out_tebc(),
            spbc: counts.then(|| param.spbc(function)),
            tpbc: counts.then_some(status.tpbc),
            lzcounts: (counts && function.has_count()).then(|| param.lzcounts()),
            ticks,
            elapsed: timebase.to_duration(ticks),
        }
    }
}

/// Deterministic counters. Callers keep their own and merge, so the hot path
/// takes no lock.
#[derive(Default, Clone, Debug, Encode, Decode, PartialEq, Eq)]
pub struct TelemetryCounters {
    pub jobs_submitted: u64,
    pub jobs_completed: u64,
    pub jobs_retried: u64,
    pub jobs_suspended: u64,
    pub jobs_timed_out: u64,
    pub faults_translation: u64,
    pub faults_protection: u64,
    pub faults_invalid: u64,
    pub faults_fatal: u64,
    pub faults_retryable: u64,
    pub target_overruns: u64,
    pub bytes_in: u64,
    pub bytes_out: u64,
    pub device_ticks: u64,
}

impl TelemetryCounters {
    pub fn add_submit(&mut self) {
        self.jobs_submitted += 1;
    }

    pub fn add_retry(&mut self) {
        self.jobs_retried += 1;
    }

    pub fn add_timeout(&mut self) {
        self.jobs_timed_out += 1;
    }

    /// Record one completion by category, with its byte counts when trusted.
    pub fn add_completion(&mut self, c: &Classification, spbc: Option<u32>, ticks: u64) {
        self.jobs_completed += 1;
        self.device_ticks += ticks;
        match c.category {
            Category::Success => {}
            Category::Retryable => self.faults_retryable += 1,
            Category::TranslationFault => self.faults_translation += 1,
            Category::ProtectionFault => self.faults_protection += 1,
            Category::InvalidRequest => self.faults_invalid += 1,
            Category::HardwareFatal => self.faults_fatal += 1,
            Category::TargetOverrun => self.target_overruns += 1,
        }
        if c.is_suspended() {
            self.jobs_suspended += 1;
        }
        if c.counts_trusted() {
            self.bytes_in += spbc.unwrap_or(0) as u64;
            self.bytes_out += c.status.tpbc as u64;
        }
    }

    pub fn faults(&self) -> u64 {
        self.faults_translation
            + self.faults_protection
            + self.faults_invalid
            + self.faults_fatal
            + self.faults_retryable
    }

    pub fn merge(&mut self, other: &TelemetryCounters) {
        *self += other.clone();
    }

    /// Compact checkpoint, so totals can outlive one accelerator context.
    pub fn to_bytes(&self) -> Result<Vec<u8>, EncodeError> {
        bincode::encode_to_vec(self, bincode::config::standard())
    }

    pub fn from_bytes(bytes: &[u8]) -> Result<Self, DecodeError> {
        let (counters, _) = bincode::decode_from_slice(bytes, bincode::config::standard())?;
        Ok(counters)
    }
}

impl AddAssign for TelemetryCounters {
    fn add_assign(&mut self, rhs: Self) {
        self.jobs_submitted     += rhs.jobs_submitted;
        self.jobs_completed     += rhs.jobs_completed;
        self.jobs_retried       += rhs.jobs_retried;
        self.jobs_suspended     += rhs.jobs_suspended;
        self.jobs_timed_out     += rhs.jobs_timed_out;

        self.faults_translation += rhs.faults_translation;
        self.faults_protection  += rhs.faults_protection;
        self.faults_invalid     += rhs.faults_invalid;
        self.faults_fatal       += rhs.faults_fatal;
        self.faults_retryable   += rhs.faults_retryable;
        self.target_overruns    += rhs.target_overruns;

        self.bytes_in           += rhs.bytes_in;
        self.bytes_out          += rhs.bytes_out;
        self.device_ticks       += rhs.device_ticks;
    }
}

/// Immutable view of the counters.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TelemetrySnapshot {
    pub jobs_submitted: u64,
    pub jobs_completed: u64,
    pub jobs_retried: u64,
    pub jobs_suspended: u64,
    pub jobs_timed_out: u64,
    pub faults: u64,
    pub target_overruns: u64,
    pub bytes_in: u64,
    pub bytes_out: u64,
    /// bytes_out / bytes_in, 0 when nothing was processed.
    pub ratio: f64,
    pub device_time: Duration,
}

impl TelemetrySnapshot {
    pub fn from(counters: &TelemetryCounters, timebase: &Timebase) -> Self {
        let ratio = if counters.bytes_in > 0 {
            counters.bytes_out as f64 / counters.bytes_in as f64
        } else {
            0.0
        };
        Self {
            jobs_submitted: counters.jobs_submitted,
            jobs_completed: counters.jobs_completed,
            jobs_retried: counters.jobs_retried,
            jobs_suspended: counters.jobs_suspended,
            jobs_timed_out: counters.jobs_timed_out,
            faults: counters.faults(),
            target_overruns: counters.target_overruns,
            bytes_in: counters.bytes_in,
            bytes_out: counters.bytes_out,
            ratio,
            device_time: timebase.to_duration(counters.device_ticks),
        }
    }

    pub fn to_json(&self) -> Result<String, serde_json::Error> {
        serde_json::to_string(self)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::classify::classify;

    #[test]
    fn merge_adds_every_counter() {
        let mut a = TelemetryCounters::default();
        a.add_submit();
        a.add_completion(&classify(&CompletionStatus::success(10)), Some(40), 5);

        let mut total = TelemetryCounters::default();
        total.merge(&a);
        total.merge(&a);
        assert_eq!(total.jobs_submitted, 2);
        assert_eq!(total.bytes_in, 80);
        assert_eq!(total.bytes_out, 20);
        assert_eq!(total.device_ticks, 10);

        let snap = TelemetrySnapshot::from(&total, &Timebase::new(1_000).unwrap());
        assert_eq!(snap.ratio, 0.25);
        assert_eq!(snap.device_time, Duration::from_millis(10));
        assert!(snap.to_json().unwrap().contains("\"jobs_completed\":2"));
    }

    #[test]
    fn checkpoint_restores_counters() {
        let mut c = TelemetryCounters::default();
        c.add_submit();
        c.add_timeout();
        c.device_ticks = u64::MAX;

        let bytes = c.to_bytes().unwrap();
        assert_eq!(TelemetryCounters::from_bytes(&bytes).unwrap(), c);
        assert!(TelemetryCounters::from_bytes(&bytes[..bytes.len() - 1]).is_err());
    }
}
