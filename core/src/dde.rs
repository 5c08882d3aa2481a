//! dde.rs
//! Data descriptor elements: direct (one contiguous region) or indirect (a
//! list of direct elements), plus the pinned host buffers they point at.
//!
//! Industry notes:
//! - `dde_count == 0` means `address` is a data buffer of `byte_count` bytes.
//! - `dde_count > 0` means `address` is a 16-byte aligned array of that many
//!   direct elements and `byte_count` is their sum.
//! - The hardware follows exactly one level of indirection.

use std::fmt;
use std::sync::atomic::{AtomicU8, Ordering};

use crate::codec::layout::dde;
use crate::codec::{decode, encode, get32, get64, put32, put64, Words};
use crate::constants::MAX_DDE_COUNT;
use crate::error::{CodecError, DdeError};

/// Host value of one descriptor element.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct Dde {
    /// 0 for a direct element, list length for an indirect one.
    pub count: u8,
    pub byte_count: u32,
    pub address: u64,
}

impl Dde {
    pub const fn leaf(address: u64, byte_count: u32) -> Self {
        Self { count: 0, byte_count, address }
    }

    pub const fn is_indirect(&self) -> bool {
        self.count != 0
    }
}

/// A descriptor element embedded in some word block at word `base`.
pub struct DdeRef<'a, const N: usize> {
    block: &'a Words<N>,
    base: usize,
}

impl<'a, const N: usize> DdeRef<'a, N> {
    pub fn new(block: &'a Words<N>, base: usize) -> Self {
        Self { block, base }
    }

    pub fn read(&self) -> Dde {
        Dde {
            count: decode(self.block, dde::count(self.base)) as u8,
            byte_count: get32(self.block, dde::byte_count(self.base)),
            address: get64(self.block, dde::address(self.base)),
        }
    }

    pub fn write(&self, value: &Dde) -> Result<(), CodecError> {
        encode(self.block, dde::count(self.base), value.count as u32)?;
        put32(self.block, dde::byte_count(self.base), value.byte_count);
        put64(self.block, dde::address(self.base), value.address);
        Ok(())
    }
}

/// One 16-byte entry of an indirect list.
#[repr(C, align(16))]
#[derive(Debug, Default)]
pub struct DdeSlot {
    words: Words<4>,
}

impl DdeSlot {
    pub fn view(&self) -> DdeRef<'_, 4> {
        DdeRef::new(&self.words, 0)
    }
}

static_assertions::const_assert_eq!(std::mem::size_of::<DdeSlot>(), crate::constants::DDE_LEN);

/// A built source or target descriptor.
///
/// The indirect list is owned here so its address stays valid for as long as
/// the descriptor does.
#[derive(Debug)]
pub enum DataDescriptor {
    Direct(Dde),
    Indirect { head: Dde, list: Box<[DdeSlot]> },
}

impl DataDescriptor {
    /// The element that goes into the request block.
    pub fn head(&self) -> Dde {
        match self {
            DataDescriptor::Direct(d) => *d,
            DataDescriptor::Indirect { head, .. } => *head,
        }
    }

    /// Authoritative operand length.
    pub fn total_len(&self) -> u32 {
        self.head().byte_count
    }

    /// Leaf elements in order.
    pub fn leaves(&self) -> Vec<Dde> {
        match self {
            DataDescriptor::Direct(d) => vec![*d],
            DataDescriptor::Indirect { list, .. } => list.iter().map(|s| s.view().read()).collect(),
        }
    }

    pub fn is_indirect(&self) -> bool {
        matches!(self, DataDescriptor::Indirect { .. })
    }

    pub fn write_into<const N: usize>(&self, slot: &DdeRef<'_, N>) -> Result<(), CodecError> {
        slot.write(&self.head())
    }
}

/// Compose `buffers` into one descriptor.
///
/// One buffer gives a direct element. Several give an indirect element over a
/// freshly allocated list. An input that is already indirect would need a
/// second level and is rejected, as is a list longer than `dde_count` allows.
pub fn build(buffers: &[Dde]) -> Result<DataDescriptor, DdeError> {
    if let Some(nested) = buffers.iter().find(|b| b.is_indirect()) {
        return Err(DdeError::ExcessiveDde {
            reason: format!(
                "input at {:#x} is already an indirect list of {} entries",
                nested.address, nested.count
            ),
        });
    }

    match buffers {
        [] => Err(DdeError::Empty),
        [single] => Ok(DataDescriptor::Direct(*single)),
        many => {
            if many.len() > MAX_DDE_COUNT {
                return Err(DdeError::ExcessiveDde {
                    reason: format!("{} entries exceed the {} an indirect list holds", many.len(), MAX_DDE_COUNT),
                });
            }

            let total: u64 = many.iter().map(|b| b.byte_count as u64).sum();
            let total = u32::try_from(total).map_err(|_| DdeError::LengthOverflow { total })?;

            let list: Box<[DdeSlot]> = many.iter().map(|_| DdeSlot::default()).collect();
            for (slot, leaf) in list.iter().zip(many) {
                slot.view().write(leaf)?;
            }
            let head = Dde {
                count: many.len() as u8,
                byte_count: total,
                address: list.as_ptr() as u64,
            };
            log::trace!("indirect dde: {} entries, {} bytes", many.len(), total);
            Ok(DataDescriptor::Indirect { head, list })
        }
    }
}

/// Host memory that stays at one address until released.
///
/// Owned by a job for the whole Submitted to Completed window. The device
/// writes it behind the host's back, so every byte is an atomic cell like the
/// control blocks. Relaxed accesses suffice: the submit fence publishes host
/// writes and the completion fence publishes device writes.
#[derive(Default)]
pub struct PinnedBuffer(Box<[AtomicU8]>);

impl PinnedBuffer {
    pub fn zeroed(len: usize) -> Self {
        Self((0..len).map(|_| AtomicU8::new(0)).collect())
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    pub fn address(&self) -> u64 {
        self.0.as_ptr() as u64
    }

    /// Append the first `len` bytes (clamped to the buffer) to `out`.
    pub fn read_into(&self, out: &mut Vec<u8>, len: usize) {
        out.extend(self.0.iter().take(len).map(|b| b.load(Ordering::Relaxed)));
    }

    pub fn to_vec(&self) -> Vec<u8> {
        let mut out = Vec::with_capacity(self.len());
        self.read_into(&mut out, self.len());
        out
    }

    /// Overwrite from byte offset `at`. Bytes past the end are dropped.
    pub fn write(&self, at: usize, bytes: &[u8]) {
        for (cell, &b) in self.0.iter().skip(at).zip(bytes) {
            cell.store(b, Ordering::Relaxed);
        }
    }

    /// Direct element covering the whole buffer.
    pub fn leaf(&self) -> Result<Dde, DdeError> {
        let len = u32::try_from(self.0.len())
            .map_err(|_| DdeError::LengthOverflow { total: self.0.len() as u64 })?;
        Ok(Dde::leaf(self.address(), len))
    }
}

impl fmt::Debug for PinnedBuffer {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "PinnedBuffer({} bytes @ {:#x})", self.len(), self.address())
    }
}

impl From<&[u8]> for PinnedBuffer {
    fn from(v: &[u8]) -> Self {
        Self(v.iter().map(|&b| AtomicU8::new(b)).collect())
    }
}

impl From<Vec<u8>> for PinnedBuffer {
    fn from(v: Vec<u8>) -> Self {
        Self::from(v.as_slice())
    }
}

/// Pinned buffers together with the descriptor that covers them.
#[derive(Debug)]
pub struct Operand {
    pub buffers: Vec<PinnedBuffer>,
    pub descriptor: DataDescriptor,
}

impl Operand {
    /// Describe `buffers` in order. Empty buffers still get an element so an
    /// empty operand is a valid zero-length direct descriptor.
    pub fn new(buffers: Vec<PinnedBuffer>) -> Result<Self, DdeError> {
        let leaves = buffers.iter().map(PinnedBuffer::leaf).collect::<Result<Vec<_>, _>>()?;
        let descriptor = build(&leaves)?;
        Ok(Self { buffers, descriptor })
    }

    pub fn single(buffer: PinnedBuffer) -> Result<Self, DdeError> {
        Self::new(vec![buffer])
    }

    pub fn len(&self) -> usize {
        self.descriptor.total_len() as usize
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    pub fn into_buffers(self) -> Vec<PinnedBuffer> {
        self.buffers
    }
}
