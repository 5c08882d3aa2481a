//! blocks/param.rs
//! Coprocessor parameter block (CPB): resume/checksum input and the
//! accelerator's output record.
//!
//! Industry notes:
//! - Input quadwords 0..24 are written by the host before submission and read
//!   by the device. Output quadwords from 24 on are written by the device and
//!   read by the host after completion.
//! - `rembytecnt` and `dhtlen` share storage; which one holds is decided by
//!   the block type being resumed (literal vs. dynamic).
//! - The source processed byte count lives at a different word depending on
//!   the function code; see `FunctionCode::spbc_register`.

use crate::blocks::request::FunctionCode;
use crate::codec::layout::cpb;
use crate::codec::{decode, encode, get32, put32, Words};
use crate::constants::{DHT_MAXSZ, LZCOUNT_LEN};
use crate::error::CodecError;

/// 1792-byte parameter block, 128-byte aligned.
#[repr(C, align(128))]
#[derive(Debug, Default)]
pub struct ParameterBlock {
    words: Words<448>,
}

fn dht_overflow(field: &'static str, len: usize) -> CodecError {
    CodecError::FieldOverflow { field, value: len as u64, width: (DHT_MAXSZ * 8) as u32 }
}

impl ParameterBlock {
    pub fn words(&self) -> &Words<448> {
        &self.words
    }

    pub fn clear(&self) {
        self.words.clear();
    }

    // ---- input region ----

    /// Checksum seeds carried in from the previous invocation.
    pub fn set_seeds(&self, crc: u32, adler: u32) {
        put32(&self.words, cpb::IN_CRC, crc);
        put32(&self.words, cpb::IN_ADLER, adler);
    }

    pub fn in_crc(&self) -> u32 {
        get32(&self.words, cpb::IN_CRC)
    }

    pub fn in_adler(&self) -> u32 {
        get32(&self.words, cpb::IN_ADLER)
    }

    /// History length in quadwords.
    pub fn set_history_len(&self, quadwords: u32) -> Result<(), CodecError> {
        encode(&self.words, cpb::IN_HISTLEN, quadwords)
    }

    pub fn history_len(&self) -> u32 {
        decode(&self.words, cpb::IN_HISTLEN)
    }

    pub fn set_in_subc(&self, bits: u8) -> Result<(), CodecError> {
        encode(&self.words, cpb::IN_SUBC, bits as u32)
    }

    pub fn in_subc(&self) -> u8 {
        decode(&self.words, cpb::IN_SUBC) as u8
    }

    pub fn set_in_sfbt(&self, sfbt: u8) -> Result<(), CodecError> {
        encode(&self.words, cpb::IN_SFBT, sfbt as u32)
    }

    pub fn in_sfbt(&self) -> u8 {
        decode(&self.words, cpb::IN_SFBT) as u8
    }

    /// Remaining bytes of a suspended literal (stored) block.
    pub fn set_in_rembytecnt(&self, count: u32) -> Result<(), CodecError> {
        encode(&self.words, cpb::IN_REMBYTECNT, count)
    }

    pub fn in_rembytecnt(&self) -> u32 {
        decode(&self.words, cpb::IN_REMBYTECNT)
    }

    /// Length of the carried dynamic table, in bits.
    pub fn set_in_dhtlen(&self, bits: u32) -> Result<(), CodecError> {
        encode(&self.words, cpb::IN_DHTLEN, bits)
    }

    pub fn in_dhtlen(&self) -> u32 {
        decode(&self.words, cpb::IN_DHTLEN)
    }

    pub fn write_in_dht(&self, dht: &[u8]) -> Result<(), CodecError> {
        if dht.len() > cpb::IN_DHT_LEN {
            return Err(dht_overflow("in_dht", dht.len()));
        }
        self.words.write_bytes(cpb::IN_DHT_BYTE, dht);
        Ok(())
    }

    pub fn in_dht(&self, len: usize) -> Vec<u8> {
        let mut out = vec![0u8; len.min(cpb::IN_DHT_LEN)];
        self.words.read_bytes(cpb::IN_DHT_BYTE, &mut out);
        out
    }

    // ---- output region ----

    pub fn out_crc(&self) -> u32 {
        get32(&self.words, cpb::OUT_CRC)
    }

    pub fn out_adler(&self) -> u32 {
        get32(&self.words, cpb::OUT_ADLER)
    }

    /// Target ending bit count: valid bits in the last output byte.
    pub fn out_tebc(&self) -> u8 {
        decode(&self.words, cpb::OUT_TEBC) as u8
    }

    /// Unprocessed bits at the end of the source (decompression).
    pub fn out_subc(&self) -> u32 {
        decode(&self.words, cpb::OUT_SUBC)
    }

    pub fn out_sfbt(&self) -> u8 {
        decode(&self.words, cpb::OUT_SFBT) as u8
    }

    pub fn out_rembytecnt(&self) -> u32 {
        decode(&self.words, cpb::OUT_REMBYTECNT)
    }

    pub fn out_dhtlen(&self) -> u32 {
        decode(&self.words, cpb::OUT_DHTLEN)
    }

    /// Echoed dynamic table, `len` bytes.
    pub fn out_dht(&self, len: usize) -> Vec<u8> {
        let mut out = vec![0u8; len.min(cpb::OUT_DHT_LEN)];
        self.words.read_bytes(cpb::OUT_DHT_BYTE, &mut out);
        out
    }

    /// Source processed byte count, read from the word `fc` reports it in.
    pub fn spbc(&self, fc: FunctionCode) -> u32 {
        get32(&self.words, fc.spbc_register())
    }

    /// 286 literal/length then 30 distance counters.
    pub fn lzcounts(&self) -> Vec<u32> {
        (0..cpb::OUT_LZCOUNT_LEN)
            .map(|i| self.words.load(cpb::OUT_LZCOUNT_WORD + i, std::sync::atomic::Ordering::Relaxed))
            .collect()
    }

    // ---- device side ----
    //
    // The accelerator fills the output region. These setters exist for
    // platforms that complete jobs in software.

    pub fn set_out_checksums(&self, crc: u32, adler: u32) {
        put32(&self.words, cpb::OUT_CRC, crc);
        put32(&self.words, cpb::OUT_ADLER, adler);
    }

    pub fn set_out_tebc(&self, bits: u8) -> Result<(), CodecError> {
        encode(&self.words, cpb::OUT_TEBC, bits as u32)
    }

    pub fn set_out_subc(&self, bits: u32) -> Result<(), CodecError> {
        encode(&self.words, cpb::OUT_SUBC, bits)
    }

    pub fn set_out_sfbt(&self, sfbt: u8) -> Result<(), CodecError> {
        encode(&self.words, cpb::OUT_SFBT, sfbt as u32)
    }

    pub fn set_out_rembytecnt(&self, count: u32) -> Result<(), CodecError> {
        encode(&self.words, cpb::OUT_REMBYTECNT, count)
    }

    pub fn set_out_dhtlen(&self, bits: u32) -> Result<(), CodecError> {
        encode(&self.words, cpb::OUT_DHTLEN, bits)
    }

    pub fn write_out_dht(&self, dht: &[u8]) -> Result<(), CodecError> {
        if dht.len() > cpb::OUT_DHT_LEN {
            return Err(dht_overflow("out_dht", dht.len()));
        }
        self.words.write_bytes(cpb::OUT_DHT_BYTE, dht);
        Ok(())
    }

    pub fn set_spbc(&self, fc: FunctionCode, count: u32) {
        put32(&self.words, fc.spbc_register(), count);
    }

    pub fn set_lzcounts(&self, counts: &[u32]) {
        for (i, c) in counts.iter().take(LZCOUNT_LEN).enumerate() {
            self.words.store(cpb::OUT_LZCOUNT_WORD + i, *c, std::sync::atomic::Ordering::Relaxed);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn rembytecnt_and_dhtlen_share_a_word() {
        let p = ParameterBlock::default();
        p.set_in_sfbt(0b1000).unwrap();
        p.set_in_rembytecnt(0xFFFF).unwrap();
        assert_eq!(p.in_dhtlen(), 0xFFF);
        assert_eq!(p.in_sfbt(), 0b1000);

        p.set_in_dhtlen(2283).unwrap();
        assert_eq!(p.in_dhtlen(), 2283);
        assert_eq!(p.in_rembytecnt(), 2283 | 0xF000);
    }

    #[test]
    fn histlen_and_subc_are_independent() {
        let p = ParameterBlock::default();
        p.set_history_len(2048).unwrap();
        p.set_in_subc(5).unwrap();
        assert_eq!(p.history_len(), 2048);
        assert_eq!(p.in_subc(), 5);
        assert!(p.set_history_len(4096).is_err());
        assert!(p.set_in_subc(8).is_err());
    }

    #[test]
    fn spbc_lands_where_the_function_reports_it() {
        let p = ParameterBlock::default();
        p.set_spbc(FunctionCode::DecompressResume, 1000);
        assert_eq!(p.spbc(FunctionCode::Decompress), 1000);
        assert_eq!(p.spbc(FunctionCode::CompressFht), 0);
        // The compress-with-count word sits after the symbol counters.
        p.set_spbc(FunctionCode::CompressDhtCount, 77);
        p.set_lzcounts(&[1u32; LZCOUNT_LEN]);
        assert_eq!(p.spbc(FunctionCode::CompressFhtCount), 77);
        assert_eq!(p.lzcounts().len(), LZCOUNT_LEN);
    }

    #[test]
    fn dht_bytes_round_trip() {
        let p = ParameterBlock::default();
        let table: Vec<u8> = (0..DHT_MAXSZ as u32).map(|i| i as u8).collect();
        p.write_in_dht(&table).unwrap();
        assert_eq!(p.in_dht(DHT_MAXSZ), table);
        assert!(p.write_in_dht(&[0u8; DHT_MAXSZ + 1]).is_err());
    }
}
