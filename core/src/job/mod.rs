//! job/mod.rs
//! Submission, completion and the platform boundary.

pub mod accelerator;
pub mod lifecycle;
pub mod platform;
pub mod wait;

pub use accelerator::Accelerator;
pub use lifecycle::{CompletedJob, InFlightJob, Job};
pub use platform::Platform;
pub use wait::{poll_until, WaitOutcome};
