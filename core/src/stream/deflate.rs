//! stream/deflate.rs
//! Bit-level edits to raw deflate output between invocations.
//!
//! Industry notes:
//! - Compression invocations never set BFINAL; the host ends the stream by
//!   appending an empty final fixed-Huffman block after the last output bit.
//! - A block that ends inside a byte is followed by an empty stored block so
//!   the next invocation's output starts byte aligned.
//! - Deflate packs bits LSB first. `tebc` counts the valid bits in the last
//!   output byte, 0 meaning the output ends on a byte boundary.

use crate::constants::EMPTY_FIXED_BLOCK_LEN;

/// BFINAL=0, BTYPE=01, then the 7-bit end-of-block code.
const EMPTY_FIXED_BLOCK: u32 = 0b010;
const EMPTY_FIXED_BLOCK_BITS: u32 = 10;

/// Stored block header bits (BFINAL=0, BTYPE=00) and its LEN/NLEN for zero bytes.
const STORED_HEADER_BITS: u32 = 3;
const EMPTY_STORED_LEN_NLEN: [u8; 4] = [0x00, 0x00, 0xff, 0xff];

/// Append `nbits` of `value` after bit `tebc` of the last byte of `out`.
/// Returns the new ending bit count.
fn append_bits(out: &mut Vec<u8>, tebc: u8, value: u32, nbits: u32) -> u8 {
    let used = match out.last() {
        Some(_) => u32::from(tebc % 8),
        None => 0,
    };
    let mut acc = u64::from(value) << used;
    if used > 0 {
        if let Some(last) = out.pop() {
            acc |= u64::from(last) & ((1 << used) - 1);
        }
    }
    let total = used + nbits;
    for i in 0..total.div_ceil(8) {
        out.push((acc >> (8 * i)) as u8);
    }
    (total % 8) as u8
}

/// Append an empty fixed-Huffman block after bit `tebc`. Returns the new
/// ending bit count.
pub fn append_empty_fixed_block(out: &mut Vec<u8>, tebc: u8, bfinal: bool) -> u8 {
    out.reserve(EMPTY_FIXED_BLOCK_LEN as usize + 1);
    append_bits(out, tebc, EMPTY_FIXED_BLOCK | u32::from(bfinal), EMPTY_FIXED_BLOCK_BITS)
}

/// Append an empty non-final stored block after bit `tebc`. The output ends
/// byte aligned.
pub fn append_sync_flush(out: &mut Vec<u8>, tebc: u8) {
    append_bits(out, tebc, 0, STORED_HEADER_BITS);
    out.extend_from_slice(&EMPTY_STORED_LEN_NLEN);
}

/// Terminate a compressed stream whose last invocation produced `out`.
pub fn finish(out: &mut Vec<u8>, tebc: u8) -> u8 {
    append_empty_fixed_block(out, tebc, true)
}
