//! error.rs
//! Error types for every layer, from field encoding up to stream control.
//!
//! Protocol misuse (field overflow, illegal indirection) is rejected before
//! anything reaches the hardware. Hardware-reported faults arrive only after a
//! wait returns and are always carried as a classified [`Fault`].

use std::time::Duration;

use thiserror::Error;

use crate::classify::Fault;

/// Field-level encoding errors.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum CodecError {
    #[error("value {value:#x} does not fit field {field} ({width} bits)")]
    FieldOverflow { field: &'static str, value: u64, width: u32 },
}

/// Buffer descriptor construction errors.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum DdeError {
    /// Composing the request would need a second indirection level, or more
    /// entries than one indirect list can hold.
    #[error("excessive DDE: {reason}")]
    ExcessiveDde { reason: String },

    #[error("descriptor needs at least one buffer")]
    Empty,

    #[error("aggregate operand length {total} exceeds the 32-bit byte count")]
    LengthOverflow { total: u64 },

    #[error(transparent)]
    Codec(#[from] CodecError),
}

/// Rejection from the platform enqueue primitive.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum EnqueueError {
    /// No send credits available; the caller may retry later.
    #[error("receive queue busy")]
    Busy,

    #[error("enqueue rejected: {0}")]
    Rejected(String),
}

/// Configuration loading and validation errors.
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("config parse error: {0}")]
    Parse(#[from] serde_json::Error),

    #[error("invalid config: {0}")]
    Invalid(String),
}

/// Resume token validation and transport errors.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum TokenError {
    #[error("invalid source final block type {raw:#06b}")]
    InvalidBlockType { raw: u8 },

    #[error("dynamic table length {have} > {max}")]
    DhtTooLong { have: usize, max: usize },

    #[error("unprocessed bit count {have} out of range (0..8)")]
    SubcOutOfRange { have: u8 },

    #[error("history length {have} exceeds {max} bytes")]
    HistoryTooLong { have: usize, max: usize },

    #[error("token export failed: {0}")]
    Export(String),

    #[error("token import failed: {0}")]
    Import(String),
}

/// Job lifecycle errors.
#[derive(Debug, Error)]
pub enum NxError {
    #[error(transparent)]
    Codec(#[from] CodecError),

    #[error(transparent)]
    Dde(#[from] DdeError),

    #[error(transparent)]
    Enqueue(#[from] EnqueueError),

    /// Host-side liveness guard expired. Not a hardware verdict: the job may
    /// still complete and its buffers stay pinned.
    #[error("job timed out after {elapsed:?}")]
    TimedOut { elapsed: Duration },

    /// Hardware-reported outcome that is not a success.
    #[error("{0}")]
    Fault(Fault),

    #[error("job state error: {0}")]
    State(&'static str),
}

/// Stream controller errors.
#[derive(Debug, Error)]
pub enum StreamError {
    /// The controller reached Aborted. `partial_output` holds whatever the
    /// failing invocation reported as validly stored (possibly empty).
    #[error("stream aborted: {fault}")]
    Aborted { fault: Fault, partial_output: Vec<u8> },

    /// `run` stopped on a non-hardware error after earlier invocations had
    /// already produced output. `partial_output` holds all of it.
    #[error("stream halted after {} output bytes: {cause}", partial_output.len())]
    Halted { cause: Box<StreamError>, partial_output: Vec<u8> },

    #[error(transparent)]
    Nx(#[from] NxError),

    #[error(transparent)]
    Codec(#[from] CodecError),

    #[error(transparent)]
    Token(#[from] TokenError),

    #[error(transparent)]
    Dde(#[from] DdeError),

    /// Hardware reported counters that contradict the submitted operands.
    #[error("protocol violation: {0}")]
    Protocol(String),

    #[error("stream state error: {0}")]
    State(&'static str),
}

impl StreamError {
    /// Output that was validly produced before the error, if any.
    pub fn partial_output(&self) -> &[u8] {
        match self {
            StreamError::Aborted { partial_output, .. } | StreamError::Halted { partial_output, .. } => {
                partial_output
            }
            _ => &[],
        }
    }
}
