//! config.rs
//! Job submission and wait policy.
//!
//! Loaded from JSON (every field optional, defaults fill the rest) or built in
//! code. `validate` rejects settings the protocol cannot honour.

use std::time::Duration;

use serde::{Deserialize, Serialize};

use crate::error::ConfigError;

/// Default host-side liveness guard for one invocation.
pub const DEFAULT_TIMEOUT_MS: u64 = 60_000;
/// Default number of transparent resubmissions of a retryable outcome.
pub const DEFAULT_MAX_RETRIES: u32 = 3;
/// Ceiling on invocations per logical stream.
pub const DEFAULT_MAX_STEPS: u32 = 1 << 20;

/// Wait loop tuning.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct PollConfig {
    /// Longest sleep between polls once spinning and yielding are exhausted.
    pub max_sleep_us: u64,
}

impl Default for PollConfig {
    fn default() -> Self {
        Self { max_sleep_us: 1_000 }
    }
}

impl PollConfig {
    pub fn max_sleep(&self) -> Duration {
        Duration::from_micros(self.max_sleep_us)
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct JobConfig {
    pub timeout_ms: u64,
    /// Resubmissions of a Retryable outcome before it is surfaced.
    pub max_retries: u32,
    pub poll: PollConfig,
    /// Program the completion notification (`c` bit + CCB method).
    pub notify: bool,
    pub completion_method: u8,
    /// Select the second DMA byte-count limit (function code bit 0).
    pub limit_select: bool,
    /// Invocations a stream controller may issue before giving up.
    pub max_stream_steps: u32,
}

impl Default for JobConfig {
    fn default() -> Self {
        Self {
            timeout_ms: DEFAULT_TIMEOUT_MS,
            max_retries: DEFAULT_MAX_RETRIES,
            poll: PollConfig::default(),
            notify: false,
            completion_method: 0,
            limit_select: false,
            max_stream_steps: DEFAULT_MAX_STEPS,
        }
    }
}

impl JobConfig {
    pub fn from_json(text: &str) -> Result<Self, ConfigError> {
        let cfg: JobConfig = serde_json::from_str(text)?;
        cfg.validate()?;
        Ok(cfg)
    }

    pub fn timeout(&self) -> Duration {
        Duration::from_millis(self.timeout_ms)
    }

    /// Saturates at `u64::MAX` milliseconds.
    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout_ms = u64::try_from(timeout.as_millis()).unwrap_or(u64::MAX);
        self
    }

    pub fn with_max_retries(mut self, n: u32) -> Self {
        self.max_retries = n;
        self
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.timeout_ms == 0 {
            return Err(ConfigError::Invalid("timeout_ms must be > 0".into()));
        }
        if self.completion_method > 0b111 {
            return Err(ConfigError::Invalid(format!(
                "completion_method {} does not fit 3 bits",
                self.completion_method
            )));
        }
        if !self.notify && self.completion_method != 0 {
            return Err(ConfigError::Invalid("completion_method set without notify".into()));
        }
        if self.max_stream_steps == 0 {
            return Err(ConfigError::Invalid("max_stream_steps must be > 0".into()));
        }
        Ok(())
    }
}
