//! nxgzip-core
//!
//! Host-side protocol layer for the NX deflate coprocessor: bit-exact
//! request/parameter/status blocks, data descriptors, job submission and
//! completion, completion classification and suspend/resume streaming.
//! The enqueue instruction itself is supplied by a `Platform`.

#![forbid(unsafe_code)]

// Shared and top level
pub mod config;
pub mod constants;
pub mod error;
pub mod utils;

// Wire layout
pub mod blocks;
pub mod codec;
pub mod dde;

// Invocation layers
pub mod classify;
pub mod job;
pub mod metrics;
pub mod stream;
pub mod timebase;

pub mod debug;

// -----------------------------------------------------------------------------
// Prelude (Rust users)
// -----------------------------------------------------------------------------
pub mod prelude {
    pub use crate::blocks::{CompletionCode, CompletionExtension, CompletionStatus, FunctionCode, JobRegion};
    pub use crate::classify::{classify, Category, Classification, Fault};
    pub use crate::config::{JobConfig, PollConfig};
    pub use crate::dde::{build, DataDescriptor, Dde, Operand, PinnedBuffer};
    pub use crate::error::{CodecError, ConfigError, DdeError, EnqueueError, NxError, StreamError, TokenError};
    pub use crate::job::{Accelerator, CompletedJob, InFlightJob, Job, Platform, WaitOutcome};
    pub use crate::metrics::{CompletionMetrics, TelemetryCounters, TelemetrySnapshot};
    pub use crate::stream::{HuffmanTable, Phase, StreamController, StreamKind, StreamOutput, StreamState};
    pub use crate::timebase::Timebase;
}
