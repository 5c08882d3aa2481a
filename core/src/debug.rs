//! debug.rs
//! Human-readable dumps of request and parameter blocks.

use std::fmt::Write;

use crate::blocks::param::ParameterBlock;
use crate::blocks::request::{FunctionCode, RequestBlock};
use crate::blocks::status::CompletionCode;
use crate::constants::{DSZ, LLSZ};
use crate::utils::enum_name_or_hex;

/// Classic 16-bytes-per-line hex dump with offsets.
pub fn hex_dump(bytes: &[u8]) -> String {
    let mut out = String::new();
    for (i, line) in bytes.chunks(16).enumerate() {
        let _ = writeln!(out, "{:04x}: {}", i * 16, hex::encode(line));
    }
    out
}

pub fn crb_dump(crb: &RequestBlock) -> String {
    let mut out = String::new();
    let src = crb.source_dde().read();
    let dst = crb.target_dde().read();
    let fc = crb.function_raw();
    let _ = writeln!(
        out,
        "crb: fc={} limit={} csb={:#x} c={} at={} cm={}",
        crb.function().map(|f| format!("{:?}", f)).unwrap_or_else(|| format!("{:#x}", fc)),
        crb.limit_select(),
        crb.status_address(),
        crb.notify() as u8,
        crb.address_type() as u8,
        crb.completion_method(),
    );
    let _ = writeln!(out, "  src: count={} bytes={} addr={:#x}", src.count, src.byte_count, src.address);
    let _ = writeln!(out, "  dst: count={} bytes={} addr={:#x}", dst.count, dst.byte_count, dst.address);
    out
}

/// Input and output registers; `function` picks which spbc word to show.
pub fn cpb_dump(cpb: &ParameterBlock, function: FunctionCode) -> String {
    let mut out = String::new();
    let _ = writeln!(
        out,
        "cpb in: crc={:#010x} adler={:#010x} histlen={} subc={} sfbt={:#06b} rembytecnt={} dhtlen={}",
        cpb.in_crc(),
        cpb.in_adler(),
        cpb.history_len(),
        cpb.in_subc(),
        cpb.in_sfbt(),
        cpb.in_rembytecnt(),
        cpb.in_dhtlen(),
    );
    let _ = writeln!(
        out,
        "cpb out: crc={:#010x} adler={:#010x} tebc={} subc={} sfbt={:#06b} rembytecnt={} dhtlen={} spbc={}",
        cpb.out_crc(),
        cpb.out_adler(),
        cpb.out_tebc(),
        cpb.out_subc(),
        cpb.out_sfbt(),
        cpb.out_rembytecnt(),
        cpb.out_dhtlen(),
        cpb.spbc(function),
    );
    out
}

/// Non-zero symbol counts from a counting compression, literal/length
/// symbols first, then distance codes. Eight entries per line.
pub fn lzcount_dump(cpb: &ParameterBlock) -> String {
    let counts = cpb.lzcounts();
    let (ll, d) = counts.split_at(LLSZ.min(counts.len()));
    let mut out = String::new();
    for (label, table) in [("ll", ll), ("d", &d[..DSZ.min(d.len())])] {
        let used: Vec<_> = table.iter().enumerate().filter(|(_, c)| **c != 0).collect();
        let _ = writeln!(out, "lzcount {}: {} of {} symbols used", label, used.len(), table.len());
        for line in used.chunks(8) {
            let row: Vec<String> = line.iter().map(|(sym, c)| format!("{}={}", sym, c)).collect();
            let _ = writeln!(out, "  {}", row.join(" "));
        }
    }
    out
}

/// One-line description of a raw completion code.
pub fn cc_str(raw: u8) -> String {
    let name = enum_name_or_hex::<CompletionCode>(raw);
    match CompletionCode::try_from(raw) {
        Ok(code) => format!("{}: {}", name, code.describe()),
        Err(_) => format!("{}: undocumented", name),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn dumps_render() {
        let crb = RequestBlock::default();
        crb.set_function(FunctionCode::DecompressResume, true).unwrap();
        let s = crb_dump(&crb);
        assert!(s.contains("DecompressResume"));
        assert!(s.contains("limit=true"));

        assert_eq!(hex_dump(&[0xab; 17]).lines().count(), 2);
        assert_eq!(cc_str(13), "TargetSpace: target buffer too small");
        assert_eq!(cc_str(4), "0x4: undocumented");

        let cpb = ParameterBlock::default();
        assert!(cpb_dump(&cpb, FunctionCode::Decompress).contains("spbc=0"));
    }

    #[test]
    fn lzcounts_list_used_symbols() {
        let cpb = ParameterBlock::default();
        let mut counts = vec![0u32; LLSZ + DSZ];
        counts[b'a' as usize] = 3;
        counts[256] = 1;
        counts[LLSZ + 4] = 7;
        cpb.set_lzcounts(&counts);

        let s = lzcount_dump(&cpb);
        let lines: Vec<&str> = s.lines().collect();
        assert_eq!(
            lines,
            vec![
                "lzcount ll: 2 of 286 symbols used",
                "  97=3 256=1",
                "lzcount d: 1 of 30 symbols used",
                "  4=7",
            ]
        );

        let empty = lzcount_dump(&ParameterBlock::default());
        assert_eq!(empty.lines().count(), 2);
    }
}
