//! codec/field.rs
//! Named bit-fields inside big-endian words, and whole-word accessors.
//!
//! Bit numbering follows the coprocessor manual: bit 0 is the MSB of a 32-bit
//! word. A field is declared by the position of its right-most bit (`offset`)
//! and its `width`, so its shift from the LSB is `31 - offset`.

use std::sync::atomic::Ordering;

use crate::codec::words::Words;
use crate::error::CodecError;

/// A sub-word register field.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Field {
    pub name: &'static str,
    /// Index of the enclosing 32-bit word inside its block.
    pub word: usize,
    /// Right-most bit position, MSB = 0.
    pub offset: u32,
    pub width: u32,
}

impl Field {
    pub const fn new(name: &'static str, word: usize, offset: u32, width: u32) -> Self {
        Self { name, word, offset, width }
    }

    /// Right-aligned mask of `width` ones.
    #[inline]
    pub const fn mask(&self) -> u32 {
        if self.width >= 32 {
            u32::MAX
        } else {
            (1u32 << self.width) - 1
        }
    }

    #[inline]
    pub const fn shift(&self) -> u32 {
        31 - self.offset
    }

    /// Largest value the field can hold.
    #[inline]
    pub const fn max_value(&self) -> u32 {
        self.mask()
    }
}

/// A whole 32-bit register.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Reg32 {
    pub name: &'static str,
    pub word: usize,
}

/// A whole 64-bit register: two consecutive words, high word first.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Reg64 {
    pub name: &'static str,
    pub word: usize,
}

/// Write `value` into `field`, preserving every other bit of the word.
///
/// Values wider than the field are rejected rather than truncated.
pub fn encode<const N: usize>(block: &Words<N>, field: Field, value: u32) -> Result<(), CodecError> {
    if value > field.max_value() {
        return Err(CodecError::FieldOverflow {
            field: field.name,
            value: value as u64,
            width: field.width,
        });
    }
    let shift = field.shift();
    let current = block.load(field.word, Ordering::Relaxed);
    let cleared = current & !(field.mask() << shift);
    block.store(field.word, cleared | ((value & field.mask()) << shift), Ordering::Relaxed);
    log::trace!("encode {} <- {:#x}", field.name, value);
    Ok(())
}

/// Extract `field` from its word, converted to host order.
#[inline]
pub fn decode<const N: usize>(block: &Words<N>, field: Field) -> u32 {
    (block.load(field.word, Ordering::Relaxed) >> field.shift()) & field.mask()
}

/// Whole-word write: endianness conversion only, no masking.
#[inline]
pub fn put32<const N: usize>(block: &Words<N>, reg: Reg32, value: u32) {
    block.store(reg.word, value, Ordering::Relaxed);
}

#[inline]
pub fn get32<const N: usize>(block: &Words<N>, reg: Reg32) -> u32 {
    block.load(reg.word, Ordering::Relaxed)
}

pub fn put64<const N: usize>(block: &Words<N>, reg: Reg64, value: u64) {
    block.store(reg.word, (value >> 32) as u32, Ordering::Relaxed);
    block.store(reg.word + 1, value as u32, Ordering::Relaxed);
}

pub fn get64<const N: usize>(block: &Words<N>, reg: Reg64) -> u64 {
    let hi = block.load(reg.word, Ordering::Relaxed) as u64;
    let lo = block.load(reg.word + 1, Ordering::Relaxed) as u64;
    (hi << 32) | lo
}

#[cfg(test)]
mod tests {
    use super::*;

    const LOW: Field = Field::new("low", 0, 31, 8);
    const MID: Field = Field::new("mid", 0, 23, 8);
    const TOP: Field = Field::new("top", 0, 0, 1);

    #[test]
    fn msb_numbering_places_fields() {
        let w = Words::<1>::zeroed();
        encode(&w, TOP, 1).unwrap();
        encode(&w, MID, 0xAB).unwrap();
        encode(&w, LOW, 0xCD).unwrap();
        assert_eq!(w.to_bytes(), vec![0x80, 0x00, 0xAB, 0xCD]);
    }

    #[test]
    fn encode_preserves_other_bits() {
        let w = Words::<1>::zeroed();
        put32(&w, Reg32 { name: "all", word: 0 }, 0xFFFF_FFFF);
        encode(&w, MID, 0).unwrap();
        assert_eq!(get32(&w, Reg32 { name: "all", word: 0 }), 0xFFFF_00FF);
    }

    #[test]
    fn overflow_is_rejected_not_truncated() {
        let w = Words::<1>::zeroed();
        let err = encode(&w, MID, 0x100).unwrap_err();
        assert!(matches!(err, CodecError::FieldOverflow { field: "mid", width: 8, .. }));
        assert_eq!(decode(&w, MID), 0);
    }

    #[test]
    fn reg64_is_high_word_first() {
        let w = Words::<2>::zeroed();
        put64(&w, Reg64 { name: "addr", word: 0 }, 0x0011_2233_4455_6677);
        assert_eq!(w.to_bytes(), vec![0x00, 0x11, 0x22, 0x33, 0x44, 0x55, 0x66, 0x77]);
        assert_eq!(get64(&w, Reg64 { name: "addr", word: 0 }), 0x0011_2233_4455_6677);
    }
}
