use std::fmt;

use num_enum::TryFromPrimitive;

use crate::constants::HISTORY_QUANTUM;

/// Render a raw code as its variant name, or hex when it is undocumented.
pub fn enum_name_or_hex<T>(raw: T::Primitive) -> String
where
    T: TryFromPrimitive + fmt::Debug,
    T::Primitive: fmt::LowerHex,
{
    match T::try_from_primitive(raw) {
        Ok(variant) => format!("{:?}", variant),
        Err(_) => format!("0x{:x}", raw),
    }
}

/// Bytes needed to hold `bits` bits.
pub const fn bits_to_bytes(bits: u32) -> usize {
    bits.div_ceil(8) as usize
}

/// Round down to a whole number of history quadwords.
pub const fn quadword_floor(len: usize) -> usize {
    len - len % HISTORY_QUANTUM
}

/// Round up to a whole number of history quadwords.
pub const fn quadword_ceil(len: usize) -> usize {
    len.div_ceil(HISTORY_QUANTUM) * HISTORY_QUANTUM
}
