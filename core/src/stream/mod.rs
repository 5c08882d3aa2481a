//! stream/mod.rs
//! Suspend/resume control for streams larger than one invocation.

pub mod controller;
pub mod deflate;
pub mod history;
pub mod state;

pub use controller::{Phase, Step, StreamController, StreamOutput};
pub use state::{BlockType, HuffmanTable, StreamKind, StreamState};
