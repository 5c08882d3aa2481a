//! stream/history.rs
//! Sliding window handed to resumed invocations.
//!
//! The device takes history as whole 16-byte quadwords in front of the
//! source. Only the last 32 KiB can ever be referenced.

use crate::constants::{HISTORY_MAX, HISTORY_QUANTUM};
use crate::utils::{quadword_ceil, quadword_floor};

/// Append `fresh` and keep only the last `HISTORY_MAX` bytes.
pub fn retain_tail(history: &mut Vec<u8>, fresh: &[u8]) {
    if fresh.len() >= HISTORY_MAX {
        history.clear();
        history.extend_from_slice(&fresh[fresh.len() - HISTORY_MAX..]);
        return;
    }
    history.extend_from_slice(fresh);
    if history.len() > HISTORY_MAX {
        let excess = history.len() - HISTORY_MAX;
        history.drain(..excess);
    }
}

/// Quadword-aligned history for the next invocation, and its length in
/// quadwords.
///
/// Decompression must see every byte it may reference, so a short window is
/// zero-padded at the front. Compression history only seeds matching, so it
/// is truncated to whole quadwords instead.
pub fn prepare(history: &[u8], decompress: bool) -> (Vec<u8>, u32) {
    let tail = &history[history.len().saturating_sub(HISTORY_MAX)..];
    let window = if decompress {
        let padded = quadword_ceil(tail.len());
        let mut w = vec![0u8; padded - tail.len()];
        w.extend_from_slice(tail);
        w
    } else {
        tail[tail.len() - quadword_floor(tail.len())..].to_vec()
    };
    let quadwords = (window.len() / HISTORY_QUANTUM) as u32;
    (window, quadwords)
}
