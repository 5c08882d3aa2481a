//! constants.rs
//! Layout sizes, protocol limits and raw identifiers shared by every layer.
//!
//! Hardware notes:
//! - Every multi-byte register is big-endian regardless of host order.
//! - Block sizes and alignments are fixed by the coprocessor and pinned by
//!   compile-time assertions in `blocks::region`.

/// Request block (CRB) size in bytes.
pub const REQUEST_BLOCK_LEN: usize = 128;
/// Completion status block (CSB) size in bytes.
pub const STATUS_BLOCK_LEN: usize = 16;
/// Byte offset of the status block inside the job region.
pub const STATUS_BLOCK_OFFSET: usize = 240;
/// Parameter block (CPB) size in bytes, padded to its 128-byte alignment.
pub const PARAM_BLOCK_LEN: usize = 1792;
/// Byte offset of the parameter block inside the job region.
pub const PARAM_BLOCK_OFFSET: usize = 256;
/// Combined request + parameter region size and alignment.
pub const JOB_REGION_LEN: usize = 2048;

/// Data descriptor element size in bytes.
pub const DDE_LEN: usize = 16;
/// Largest entry count an indirect descriptor can carry (8-bit `dde_count`).
pub const MAX_DDE_COUNT: usize = 255;

/// Deflate literal/length alphabet size.
pub const LLSZ: usize = 286;
/// Deflate distance alphabet size.
pub const DSZ: usize = 30;
/// Number of 32-bit LZ symbol counters reported by counting functions.
pub const LZCOUNT_LEN: usize = LLSZ + DSZ;

/// Dynamic Huffman table area, in quadwords.
pub const DHT_QW: usize = 18;
/// Dynamic Huffman table area, in bytes.
pub const DHT_MAXSZ: usize = 288;
/// Largest encoded dynamic table, in bits.
pub const DHT_MAX_BITS: u32 = 2283;

/// Deflate window; only the last 32 KiB of history is ever referenced.
pub const HISTORY_MAX: usize = 32 * 1024;
/// History is passed to the accelerator in 16-byte quadwords.
pub const HISTORY_QUANTUM: usize = 16;

/// Initial CRC32 seed for non-resumed work (`crc32(0, NULL, 0)`).
pub const INIT_CRC: u32 = 0;
/// Initial Adler32 seed for non-resumed work (`adler32(0, NULL, 0)`).
pub const INIT_ADLER: u32 = 1;

/// Bytes of an empty fixed-Huffman block written on a byte boundary: 3 header
/// bits and the 7-bit end-of-block code, padded. Also what the device emits
/// for a compression over empty input.
pub const EMPTY_FIXED_BLOCK_LEN: u32 = 2;

/// Raw function codes. Bits 0:4 carry the function; the least significant bit
/// selects one of the two DMA byte-count limits.
pub mod fc_ids {
    pub const LIMIT_MASK: u8 = 0x01;

    pub const COMPRESS_FHT: u8 = 0x00;
    pub const COMPRESS_DHT: u8 = 0x02;
    pub const COMPRESS_FHT_COUNT: u8 = 0x04;
    pub const COMPRESS_DHT_COUNT: u8 = 0x06;
    pub const COMPRESS_RESUME_FHT: u8 = 0x08;
    pub const COMPRESS_RESUME_DHT: u8 = 0x0a;
    pub const COMPRESS_RESUME_FHT_COUNT: u8 = 0x0c;
    pub const COMPRESS_RESUME_DHT_COUNT: u8 = 0x0e;
    pub const DECOMPRESS: u8 = 0x10;
    pub const DECOMPRESS_SINGLE_BLK_N_SUSPEND: u8 = 0x12;
    pub const DECOMPRESS_RESUME: u8 = 0x14;
    pub const DECOMPRESS_RESUME_SINGLE_BLK_N_SUSPEND: u8 = 0x16;
    pub const WRAP: u8 = 0x1e;
}

/// Raw completion codes (CSB.CC).
pub mod cc_ids {
    pub const OK: u8 = 0;
    pub const ALIGNMENT: u8 = 1;
    pub const OPOVERLAP: u8 = 2;
    pub const DATA_LENGTH: u8 = 3;
    pub const TRANSLATION: u8 = 5;
    pub const PROTECTION: u8 = 6;
    pub const EXTERNAL_UE7: u8 = 7;
    pub const INVALID_OP: u8 = 8;
    pub const PRIVILEGE: u8 = 9;
    pub const INTERNAL_UE: u8 = 10;
    pub const EXTERN_UE_WR: u8 = 12;
    pub const TARGET_SPACE: u8 = 13;
    pub const EXCESSIVE_DDE: u8 = 14;
    pub const TRANSL_WR: u8 = 15;
    pub const PROTECT_WR: u8 = 16;
    pub const SUBFUNCTION: u8 = 17;
    pub const FUNC_ABORT: u8 = 18;
    pub const BYTE_MAX: u8 = 19;
    pub const CORRUPT_CRB: u8 = 20;
    pub const INVALID_CRB: u8 = 21;
    pub const INVALID_DDE: u8 = 30;
    pub const SEGMENTED_DDL: u8 = 31;
    pub const DDE_OVERFLOW: u8 = 33;
    pub const TPBC_GT_SPBC: u8 = 64;
    pub const MISSING_CODE: u8 = 66;
    pub const INVALID_DIST: u8 = 67;
    pub const INVALID_DHT: u8 = 68;
    pub const EXTERNAL_UE90: u8 = 90;
    pub const WDOG_TIMER: u8 = 224;
    pub const AT_FAULT: u8 = 250;
    pub const INTR_SERVER: u8 = 252;
    pub const UE253: u8 = 253;
    pub const NO_HW: u8 = 254;
    pub const HUNG_OP: u8 = 255;
}

/// Source final block type (SFBT) building blocks. The low bit is BFINAL.
pub mod sfbt_ids {
    pub const END_OF_STREAM: u8 = 0x0;
    pub const BFINAL: u8 = 0x1;
    pub const LITERAL: u8 = 0x8;
    pub const FIXED: u8 = 0xa;
    pub const DYNAMIC: u8 = 0xc;
    pub const HEADER: u8 = 0xe;
}
