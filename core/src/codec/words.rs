//! codec/words.rs
//! Fixed arrays of big-endian 32-bit words shared with the accelerator.
//!
//! Each word holds the big-endian image of its register: the bytes in memory
//! are exactly what the coprocessor reads, on any host. Words are atomics so
//! the accelerator (another bus master) may write while the host holds a
//! shared reference; ordering is supplied by the job lifecycle, not here.

use std::sync::atomic::{AtomicU32, Ordering};

use byteorder::{BigEndian, ByteOrder};

/// `N` consecutive 32-bit registers in wire (big-endian) byte order.
#[repr(transparent)]
pub struct Words<const N: usize>([AtomicU32; N]);

impl<const N: usize> Words<N> {
    /// Size of the block in bytes.
    pub const LEN: usize = N * 4;

    pub fn zeroed() -> Self {
        Self(std::array::from_fn(|_| AtomicU32::new(0)))
    }

    /// Number of words.
    pub const fn len(&self) -> usize {
        N
    }

    pub const fn is_empty(&self) -> bool {
        N == 0
    }

    /// Read word `idx` converted to host order.
    #[inline]
    pub(crate) fn load(&self, idx: usize, order: Ordering) -> u32 {
        u32::from_be(self.0[idx].load(order))
    }

    /// Store host-order `value` into word `idx` as a big-endian image.
    #[inline]
    pub(crate) fn store(&self, idx: usize, value: u32, order: Ordering) {
        self.0[idx].store(value.to_be(), order);
    }

    /// Zero every word.
    pub fn clear(&self) {
        for w in &self.0 {
            w.store(0, Ordering::Relaxed);
        }
    }

    /// Copy the block into a byte image exactly as it sits in memory.
    pub fn to_bytes(&self) -> Vec<u8> {
        let mut out = vec![0u8; Self::LEN];
        self.read_bytes(0, &mut out);
        out
    }

    /// Read `out.len()` bytes starting at byte offset `at`.
    ///
    /// Panics if the range exceeds the block; callers index with layout
    /// constants.
    pub fn read_bytes(&self, at: usize, out: &mut [u8]) {
        let mut word = [0u8; 4];
        for (i, b) in out.iter_mut().enumerate() {
            let pos = at + i;
            BigEndian::write_u32(&mut word, self.load(pos / 4, Ordering::Relaxed));
            *b = word[pos % 4];
        }
    }

    /// Write `bytes` starting at byte offset `at`, preserving neighbouring bytes
    /// of partially covered words.
    pub fn write_bytes(&self, at: usize, bytes: &[u8]) {
        let mut pos = at;
        let mut rest = bytes;
        while !rest.is_empty() {
            let idx = pos / 4;
            let lane = pos % 4;
            let take = (4 - lane).min(rest.len());

            let mut word = [0u8; 4];
            BigEndian::write_u32(&mut word, self.load(idx, Ordering::Relaxed));
            word[lane..lane + take].copy_from_slice(&rest[..take]);
            self.store(idx, BigEndian::read_u32(&word), Ordering::Relaxed);

            pos += take;
            rest = &rest[take..];
        }
    }
}

impl<const N: usize> Default for Words<N> {
    fn default() -> Self {
        Self::zeroed()
    }
}

impl<const N: usize> std::fmt::Debug for Words<N> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "Words<{}>(0x{})", N, hex::encode(self.to_bytes()))
    }
}
