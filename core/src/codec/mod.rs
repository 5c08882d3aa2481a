//! codec/mod.rs
//! Descriptor codec: bit-exact access to big-endian register blocks.
//!
//! Hardware notes:
//! - The coprocessor registers are always big-endian; the host may run in
//!   either byte order, so every access converts through this module.
//! - Sub-word fields are masked and shifted; whole-word registers are plain
//!   endianness conversions.
//! - Overflowing values are rejected before submission, never truncated.

pub mod field;
pub mod layout;
pub mod words;

pub use field::{decode, encode, get32, get64, put32, put64, Field, Reg32, Reg64};
pub use words::Words;
