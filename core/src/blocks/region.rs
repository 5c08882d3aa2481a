//! blocks/region.rs
//! The 2048-byte job region: request, status and parameter blocks laid out
//! the way the coprocessor expects them.
//!
//! Industry notes:
//! - The device holds a raw address into this region from submit to
//!   completion, so a region always lives in a `Box` and is never moved.
//! - Offsets and alignments are pinned at compile time.

use std::mem::{align_of, offset_of, size_of};

use static_assertions::const_assert_eq;

use crate::blocks::param::ParameterBlock;
use crate::blocks::request::RequestBlock;
use crate::blocks::status::StatusBlock;
use crate::codec::Words;
use crate::constants::{
    JOB_REGION_LEN, PARAM_BLOCK_LEN, PARAM_BLOCK_OFFSET, REQUEST_BLOCK_LEN, STATUS_BLOCK_LEN,
    STATUS_BLOCK_OFFSET,
};

/// Request + status + parameter blocks for one invocation.
#[repr(C, align(2048))]
#[derive(Debug, Default)]
pub struct JobRegion {
    pub crb: RequestBlock,
    /// Bytes 128..240: time stamps and scratch owned by the platform.
    pub stamp: Words<28>,
    pub csb: StatusBlock,
    pub cpb: ParameterBlock,
}

const_assert_eq!(size_of::<RequestBlock>(), REQUEST_BLOCK_LEN);
const_assert_eq!(align_of::<RequestBlock>(), 128);
const_assert_eq!(size_of::<StatusBlock>(), STATUS_BLOCK_LEN);
const_assert_eq!(align_of::<StatusBlock>(), 16);
const_assert_eq!(size_of::<ParameterBlock>(), PARAM_BLOCK_LEN);
const_assert_eq!(align_of::<ParameterBlock>(), 128);
const_assert_eq!(size_of::<JobRegion>(), JOB_REGION_LEN);
const_assert_eq!(align_of::<JobRegion>(), JOB_REGION_LEN);
const_assert_eq!(offset_of!(JobRegion, crb), 0);
const_assert_eq!(offset_of!(JobRegion, csb), STATUS_BLOCK_OFFSET);
const_assert_eq!(offset_of!(JobRegion, cpb), PARAM_BLOCK_OFFSET);

impl JobRegion {
    /// A zeroed region on the heap, crb already pointing at its csb.
    pub fn new_boxed() -> Box<Self> {
        let region = Box::<Self>::default();
        region.crb.set_status_address(region.status_address());
        region
    }

    /// Address the device is handed on enqueue.
    pub fn address(&self) -> u64 {
        self as *const Self as u64
    }

    pub fn status_address(&self) -> u64 {
        &self.csb as *const StatusBlock as u64
    }

    pub fn param_address(&self) -> u64 {
        &self.cpb as *const ParameterBlock as u64
    }

    /// Zero everything but keep the crb linked to its csb.
    pub fn reset(&self) {
        self.crb.clear();
        self.stamp.clear();
        self.csb.clear();
        self.cpb.clear();
        self.crb.set_status_address(self.status_address());
    }
}
