//! stream/state.rs
//! The resume token carried between invocations of one logical stream.
//!
//! Industry notes:
//! - Fields are copied verbatim from one invocation's output parameter block
//!   into the next one's input; nothing here is recomputed.
//! - Tokens can be exported to bytes and imported later; an imported token is
//!   validated before it is trusted.

use serde::{Deserialize, Serialize};

use crate::blocks::request::FunctionCode;
use crate::constants::{sfbt_ids, DHT_MAXSZ, HISTORY_MAX, INIT_ADLER, INIT_CRC};
use crate::error::TokenError;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum HuffmanTable {
    Fixed,
    Dynamic,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum StreamKind {
    Compress { table: HuffmanTable, count: bool },
    /// `single_block` stops after every deflate block.
    Decompress { single_block: bool },
    /// Checksum and copy only.
    Wrap,
}

impl StreamKind {
    /// Function code for the first (`resumed == false`) or a later invocation.
    pub fn function(self, resumed: bool) -> FunctionCode {
        use FunctionCode::*;
        let first = match self {
            StreamKind::Compress { table: HuffmanTable::Fixed, count: false } => CompressFht,
            StreamKind::Compress { table: HuffmanTable::Dynamic, count: false } => CompressDht,
            StreamKind::Compress { table: HuffmanTable::Fixed, count: true } => CompressFhtCount,
            StreamKind::Compress { table: HuffmanTable::Dynamic, count: true } => CompressDhtCount,
            StreamKind::Decompress { single_block: false } => Decompress,
            StreamKind::Decompress { single_block: true } => DecompressSingleBlock,
            StreamKind::Wrap => Wrap,
        };
        if resumed { first.resumed() } else { first }
    }

    pub fn is_decompress(self) -> bool {
        matches!(self, StreamKind::Decompress { .. })
    }
}

/// Decoded view of a 4-bit source final block type.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BlockType {
    EndOfStream,
    Literal { bfinal: bool },
    Fixed { bfinal: bool },
    Dynamic { bfinal: bool },
    Header { bfinal: bool },
}

impl BlockType {
    pub fn from_sfbt(raw: u8) -> Result<Self, TokenError> {
        let bfinal = raw & sfbt_ids::BFINAL != 0;
        match raw & !sfbt_ids::BFINAL {
            _ if raw == sfbt_ids::END_OF_STREAM => Ok(BlockType::EndOfStream),
            sfbt_ids::LITERAL => Ok(BlockType::Literal { bfinal }),
            sfbt_ids::FIXED => Ok(BlockType::Fixed { bfinal }),
            sfbt_ids::DYNAMIC => Ok(BlockType::Dynamic { bfinal }),
            sfbt_ids::HEADER => Ok(BlockType::Header { bfinal }),
            _ => Err(TokenError::InvalidBlockType { raw }),
        }
    }
}

/// Everything needed to issue the next invocation of a stream.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct StreamState {
    pub kind: StreamKind,
    /// At least one invocation has completed; later ones use resume codes.
    pub resumed: bool,
    pub crc: u32,
    pub adler: u32,
    /// Unprocessed bits of the first source byte, 0 meaning all eight.
    pub subc: u8,
    pub sfbt: u8,
    /// Remaining bytes of a suspended literal block.
    pub rembytecnt: u32,
    /// Carried dynamic table length in bits, and its bytes.
    pub dhtlen: u32,
    pub dht: Vec<u8>,
    /// Tail of previously consumed input (compress) or produced output
    /// (decompress), at most 32 KiB.
    pub history: Vec<u8>,
    pub total_in: u64,
    pub total_out: u64,
    pub steps: u32,
}

impl StreamState {
    pub fn new(kind: StreamKind) -> Self {
        Self {
            kind,
            resumed: false,
            crc: INIT_CRC,
            adler: INIT_ADLER,
            subc: 0,
            sfbt: 0,
            rembytecnt: 0,
            dhtlen: 0,
            dht: Vec::new(),
            history: Vec::new(),
            total_in: 0,
            total_out: 0,
            steps: 0,
        }
    }

    pub fn block_type(&self) -> Result<BlockType, TokenError> {
        BlockType::from_sfbt(self.sfbt)
    }

    pub fn validate(&self) -> Result<(), TokenError> {
        if self.sfbt > 0xf {
            return Err(TokenError::InvalidBlockType { raw: self.sfbt });
        }
        self.block_type()?;
        if self.subc >= 8 {
            return Err(TokenError::SubcOutOfRange { have: self.subc });
        }
        if self.dht.len() > DHT_MAXSZ {
            return Err(TokenError::DhtTooLong { have: self.dht.len(), max: DHT_MAXSZ });
        }
        if self.dhtlen as usize > self.dht.len() * 8 {
            return Err(TokenError::DhtTooLong { have: (self.dhtlen as usize).div_ceil(8), max: self.dht.len() });
        }
        if self.history.len() > HISTORY_MAX {
            return Err(TokenError::HistoryTooLong { have: self.history.len(), max: HISTORY_MAX });
        }
        Ok(())
    }

    pub fn to_bytes(&self) -> Result<Vec<u8>, TokenError> {
        bincode::serde::encode_to_vec(self, bincode::config::standard())
            .map_err(|e| TokenError::Export(e.to_string()))
    }

    pub fn from_bytes(bytes: &[u8]) -> Result<Self, TokenError> {
        let (state, _): (StreamState, usize) =
            bincode::serde::decode_from_slice(bytes, bincode::config::standard())
                .map_err(|e| TokenError::Import(e.to_string()))?;
        state.validate()?;
        Ok(state)
    }
}
