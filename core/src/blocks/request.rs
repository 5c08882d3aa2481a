//! blocks/request.rs
//! Coprocessor request block (CRB) and the function-code catalogue.
//!
//! The CRB is 128 bytes, 128-byte aligned. It names the operation, points at
//! the status block and carries the source/target data descriptors inline.

use num_enum::TryFromPrimitive;

use crate::codec::layout::{cpb, crb};
use crate::codec::{decode, encode, get64, put64, Reg32, Words};
use crate::constants::fc_ids;
use crate::dde::DdeRef;
use crate::error::CodecError;

bitflags::bitflags! {
    /// Function code bit meanings (Table 6-2 of the coprocessor manual).
    #[derive(Debug, Clone, Copy, PartialEq, Eq)]
    pub struct FcBits: u8 {
        /// Selects the second DMA byte-count limit.
        const LIMIT      = 0b0000_0001;
        /// Dynamic Huffman table (compress) / single block and suspend
        /// (decompress).
        const DHT_SINGLE = 0b0000_0010;
        /// Count LZ77 symbols (compress) / resume (decompress).
        const COUNT_RESUME = 0b0000_0100;
        /// Resume (compress).
        const RESUME     = 0b0000_1000;
        /// Decompression family.
        const DECOMPRESS = 0b0001_0000;
    }
}

/// Accelerator function codes, limit bit cleared.
#[repr(u8)]
#[derive(Copy, Clone, Debug, PartialEq, Eq, Hash, TryFromPrimitive)]
pub enum FunctionCode {
    CompressFht                 = fc_ids::COMPRESS_FHT,
    CompressDht                 = fc_ids::COMPRESS_DHT,
    CompressFhtCount            = fc_ids::COMPRESS_FHT_COUNT,
    CompressDhtCount            = fc_ids::COMPRESS_DHT_COUNT,
    CompressResumeFht           = fc_ids::COMPRESS_RESUME_FHT,
    CompressResumeDht           = fc_ids::COMPRESS_RESUME_DHT,
    CompressResumeFhtCount      = fc_ids::COMPRESS_RESUME_FHT_COUNT,
    CompressResumeDhtCount      = fc_ids::COMPRESS_RESUME_DHT_COUNT,
    Decompress                  = fc_ids::DECOMPRESS,
    DecompressSingleBlock       = fc_ids::DECOMPRESS_SINGLE_BLK_N_SUSPEND,
    DecompressResume            = fc_ids::DECOMPRESS_RESUME,
    DecompressResumeSingleBlock = fc_ids::DECOMPRESS_RESUME_SINGLE_BLK_N_SUSPEND,
    Wrap                        = fc_ids::WRAP,
}

impl FunctionCode {
    /// Parse a raw 8-bit field value, ignoring the limit-select bit.
    pub fn from_raw(raw: u8) -> Option<Self> {
        Self::try_from_primitive(raw & !fc_ids::LIMIT_MASK).ok()
    }

    pub fn bits(self) -> FcBits {
        FcBits::from_bits_truncate(self as u8)
    }

    pub fn is_wrap(self) -> bool {
        self == FunctionCode::Wrap
    }

    /// Compression family. Wrap shares the decompress bit pattern prefix but
    /// is neither.
    pub fn is_compress(self) -> bool {
        !self.bits().contains(FcBits::DECOMPRESS)
    }

    pub fn is_decompress(self) -> bool {
        self.bits().contains(FcBits::DECOMPRESS) && !self.is_wrap()
    }

    /// Compression that also reports LZ symbol counts.
    pub fn has_count(self) -> bool {
        self.is_compress() && self.bits().contains(FcBits::COUNT_RESUME)
    }

    pub fn is_resume(self) -> bool {
        if self.is_compress() {
            self.bits().contains(FcBits::RESUME)
        } else {
            self.is_decompress() && self.bits().contains(FcBits::COUNT_RESUME)
        }
    }

    /// The resume variant of this function. Wrap has none and maps to itself.
    pub fn resumed(self) -> Self {
        use FunctionCode::*;
        match self {
            CompressFht | CompressResumeFht => CompressResumeFht,
            CompressDht | CompressResumeDht => CompressResumeDht,
            CompressFhtCount | CompressResumeFhtCount => CompressResumeFhtCount,
            CompressDhtCount | CompressResumeDhtCount => CompressResumeDhtCount,
            Decompress | DecompressResume => DecompressResume,
            DecompressSingleBlock | DecompressResumeSingleBlock => DecompressResumeSingleBlock,
            Wrap => Wrap,
        }
    }

    /// Where the accelerator reports the source processed byte count for
    /// this function.
    pub fn spbc_register(self) -> Reg32 {
        if self.is_decompress() {
            cpb::OUT_SPBC_DECOMP
        } else if self.has_count() {
            cpb::OUT_SPBC_COMP_WITH_COUNT
        } else {
            cpb::OUT_SPBC_COMP_WRAP
        }
    }
}

/// 128-byte request block.
#[repr(C, align(128))]
#[derive(Debug, Default)]
pub struct RequestBlock {
    words: Words<32>,
}

impl RequestBlock {
    pub fn words(&self) -> &Words<32> {
        &self.words
    }

    pub fn clear(&self) {
        self.words.clear();
    }

    pub fn set_function(&self, fc: FunctionCode, limit_select: bool) -> Result<(), CodecError> {
        let raw = fc as u8 | if limit_select { fc_ids::LIMIT_MASK } else { 0 };
        encode(&self.words, crb::FUNCTION_CODE, raw as u32)
    }

    /// Raw 8-bit function code field, limit bit included.
    pub fn function_raw(&self) -> u8 {
        decode(&self.words, crb::FUNCTION_CODE) as u8
    }

    pub fn function(&self) -> Option<FunctionCode> {
        FunctionCode::from_raw(self.function_raw())
    }

    pub fn limit_select(&self) -> bool {
        self.function_raw() & fc_ids::LIMIT_MASK != 0
    }

    /// Point the request at its status block. The status block is 16-byte
    /// aligned, so the four low bits are free; the `c`/`at` bits stored there
    /// are preserved.
    pub fn set_status_address(&self, addr: u64) {
        let keep = get64(&self.words, crb::STATUS_ADDRESS) & !crb::STATUS_ADDRESS_MASK;
        put64(
            &self.words,
            crb::STATUS_ADDRESS,
            (addr & crb::STATUS_ADDRESS_MASK) | keep,
        );
    }

    pub fn status_address(&self) -> u64 {
        get64(&self.words, crb::STATUS_ADDRESS) & crb::STATUS_ADDRESS_MASK
    }

    /// `c` bit: a completion block (CCB) is defined.
    pub fn set_notify(&self, on: bool) -> Result<(), CodecError> {
        encode(&self.words, crb::NOTIFY, on as u32)
    }

    pub fn notify(&self) -> bool {
        decode(&self.words, crb::NOTIFY) != 0
    }

    /// `at` bit: 0 means every address is an effective address.
    pub fn set_address_type(&self, at: bool) -> Result<(), CodecError> {
        encode(&self.words, crb::ADDRESS_TYPE, at as u32)
    }

    pub fn address_type(&self) -> bool {
        decode(&self.words, crb::ADDRESS_TYPE) != 0
    }

    /// CCB completion method; meaningful only when `notify` is set.
    pub fn set_completion_method(&self, cm: u8) -> Result<(), CodecError> {
        encode(&self.words, crb::COMPLETION_METHOD, cm as u32)
    }

    pub fn completion_method(&self) -> u8 {
        decode(&self.words, crb::COMPLETION_METHOD) as u8
    }

    pub fn source_dde(&self) -> DdeRef<'_, 32> {
        DdeRef::new(&self.words, crb::SOURCE_DDE_WORD)
    }

    pub fn target_dde(&self) -> DdeRef<'_, 32> {
        DdeRef::new(&self.words, crb::TARGET_DDE_WORD)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn function_families() {
        assert!(FunctionCode::CompressDhtCount.has_count());
        assert!(!FunctionCode::DecompressResume.has_count());
        assert!(FunctionCode::DecompressResume.is_resume());
        assert!(FunctionCode::CompressResumeFht.is_resume());
        assert!(!FunctionCode::CompressFhtCount.is_resume());
        assert!(!FunctionCode::Wrap.is_compress());
        assert!(!FunctionCode::Wrap.is_decompress());
        assert_eq!(FunctionCode::DecompressSingleBlock.resumed(), FunctionCode::DecompressResumeSingleBlock);
        assert_eq!(FunctionCode::from_raw(0x13), Some(FunctionCode::DecompressSingleBlock));
        assert_eq!(FunctionCode::from_raw(0x18), None);
    }

    #[test]
    fn spbc_location_depends_on_function() {
        assert_eq!(FunctionCode::Decompress.spbc_register(), cpb::OUT_SPBC_DECOMP);
        assert_eq!(FunctionCode::CompressResumeDhtCount.spbc_register(), cpb::OUT_SPBC_COMP_WITH_COUNT);
        assert_eq!(FunctionCode::Wrap.spbc_register(), cpb::OUT_SPBC_COMP_WRAP);
        assert_eq!(FunctionCode::CompressFht.spbc_register(), cpb::OUT_SPBC_COMP_WRAP);
    }

    #[test]
    fn status_address_keeps_flag_bits() {
        let crb = RequestBlock::default();
        crb.set_notify(true).unwrap();
        crb.set_address_type(true).unwrap();
        crb.set_status_address(0x1234_5678_9abc_def7);
        assert_eq!(crb.status_address(), 0x1234_5678_9abc_def0);
        assert!(crb.notify());
        assert!(crb.address_type());
    }
}
