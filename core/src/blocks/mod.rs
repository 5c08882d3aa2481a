//! blocks/mod.rs
//! Typed views over the request, status and parameter blocks.

pub mod param;
pub mod region;
pub mod request;
pub mod status;

pub use param::ParameterBlock;
pub use region::JobRegion;
pub use request::{FcBits, FunctionCode, RequestBlock};
pub use status::{CompletionCode, CompletionExtension, CompletionStatus, StatusBlock};
