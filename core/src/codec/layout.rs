//! codec/layout.rs
//! Every architected register of the request, status, descriptor and
//! parameter blocks, as (word, offset, width) declarations.
//!
//! Word indices are relative to the start of the enclosing block. Several
//! fields share storage (e.g. `IN_REMBYTECNT` / `IN_DHTLEN`); which one is
//! meaningful depends on the block type being resumed, so each has its own
//! accessor and callers never see the raw word.

use crate::codec::field::{Field, Reg32, Reg64};
use crate::constants::{DHT_MAXSZ, LZCOUNT_LEN};

/// Coprocessor request block (CRB), 32 words.
pub mod crb {
    use super::*;

    pub const FUNCTION_CODE: Field = Field::new("gzip_fc", 0, 31, 8);
    pub const STATUS_ADDRESS: Reg64 = Reg64 { name: "csb_address", word: 2 };
    /// Low four address bits are not address bits; `c` and `at` live there.
    pub const STATUS_ADDRESS_MASK: u64 = !15u64;
    pub const NOTIFY: Field = Field::new("crb_c", 3, 28, 1);
    pub const ADDRESS_TYPE: Field = Field::new("crb_at", 3, 30, 1);
    pub const SOURCE_DDE_WORD: usize = 4;
    pub const TARGET_DDE_WORD: usize = 8;
    pub const COMPLETION_METHOD: Field = Field::new("ccb_cm", 15, 31, 3);

    pub const FIELDS: &[Field] = &[FUNCTION_CODE, NOTIFY, ADDRESS_TYPE, COMPLETION_METHOD];
}

/// Data descriptor element, relative to the first word of the DDE.
pub mod dde {
    use super::*;

    pub const fn count(base: usize) -> Field {
        Field::new("dde_count", base, 23, 8)
    }
    pub const fn byte_count(base: usize) -> Reg32 {
        Reg32 { name: "ddebc", word: base + 1 }
    }
    pub const fn address(base: usize) -> Reg64 {
        Reg64 { name: "ddead", word: base + 2 }
    }

    pub const FIELDS: &[Field] = &[count(0)];
}

/// Coprocessor status block (CSB), 4 words.
pub mod csb {
    use super::*;

    pub const VALID: Field = Field::new("csb_v", 0, 0, 1);
    pub const FORMAT: Field = Field::new("csb_f", 0, 6, 1);
    pub const SEQUENCE: Field = Field::new("csb_cs", 0, 15, 8);
    pub const CODE: Field = Field::new("csb_cc", 0, 23, 8);
    pub const EXTENSION: Field = Field::new("csb_ce", 0, 31, 8);
    pub const TPBC: Reg32 = Reg32 { name: "tpbc", word: 1 };
    pub const FAILING_ADDRESS: Reg64 = Reg64 { name: "fsaddr", word: 2 };

    pub const FIELDS: &[Field] = &[VALID, FORMAT, SEQUENCE, CODE, EXTENSION];
}

/// Coprocessor parameter block (CPB), 448 words. Input region is quadwords
/// 0..24, output region starts at quadword 24.
pub mod cpb {
    use super::*;

    pub const IN_ADLER: Reg32 = Reg32 { name: "in_adler", word: 0 };
    pub const IN_CRC: Reg32 = Reg32 { name: "in_crc", word: 1 };
    pub const IN_HISTLEN: Field = Field::new("in_histlen", 2, 11, 12);
    pub const IN_SUBC: Field = Field::new("in_subc", 2, 31, 3);
    pub const IN_SFBT: Field = Field::new("in_sfbt", 3, 15, 4);
    pub const IN_REMBYTECNT: Field = Field::new("in_rembytecnt", 3, 31, 16);
    pub const IN_DHTLEN: Field = Field::new("in_dhtlen", 3, 31, 12);
    /// Byte offset of the input dynamic Huffman table (quadwords 1..19).
    pub const IN_DHT_BYTE: usize = 16;
    pub const IN_DHT_LEN: usize = DHT_MAXSZ;

    /// First word of the output region (quadword 24).
    pub const OUTPUT_WORD: usize = 96;
    pub const OUT_ADLER: Reg32 = Reg32 { name: "out_adler", word: 96 };
    pub const OUT_CRC: Reg32 = Reg32 { name: "out_crc", word: 97 };
    pub const OUT_TEBC: Field = Field::new("out_tebc", 98, 15, 3);
    pub const OUT_SUBC: Field = Field::new("out_subc", 98, 31, 16);
    pub const OUT_SFBT: Field = Field::new("out_sfbt", 99, 15, 4);
    pub const OUT_REMBYTECNT: Field = Field::new("out_rembytecnt", 99, 31, 16);
    pub const OUT_DHTLEN: Field = Field::new("out_dhtlen", 99, 31, 12);

    /// Compress without counts, and wrap (quadword 25).
    pub const OUT_SPBC_COMP_WRAP: Reg32 = Reg32 { name: "out_spbc_comp_wrap", word: 100 };
    /// 286 literal/length + 30 distance counters (quadwords 25..104).
    pub const OUT_LZCOUNT_WORD: usize = 100;
    pub const OUT_LZCOUNT_LEN: usize = LZCOUNT_LEN;
    /// Echoed dynamic table after decompression (quadwords 25..43).
    pub const OUT_DHT_BYTE: usize = 400;
    pub const OUT_DHT_LEN: usize = DHT_MAXSZ;
    /// Decompress (quadword 43).
    pub const OUT_SPBC_DECOMP: Reg32 = Reg32 { name: "out_spbc_decomp", word: 172 };
    /// Compress with counts (quadword 104).
    pub const OUT_SPBC_COMP_WITH_COUNT: Reg32 = Reg32 { name: "out_spbc_comp_with_count", word: 416 };

    pub const FIELDS: &[Field] = &[
        IN_HISTLEN, IN_SUBC, IN_SFBT, IN_REMBYTECNT, IN_DHTLEN,
        OUT_TEBC, OUT_SUBC, OUT_SFBT, OUT_REMBYTECNT, OUT_DHTLEN,
    ];
}
