//! blocks/status.rs
//! Coprocessor status block (CSB): the hardware-written completion record.
//!
//! Industry notes:
//! - The valid bit is the only synchronization between host and device. The
//!   host clears the whole block before each submission; the device writes the
//!   body first and the valid bit last.
//! - Host reads of the body are meaningful only after observing `valid` with
//!   acquire ordering.

use std::sync::atomic::Ordering;

use num_enum::TryFromPrimitive;
use serde::{Deserialize, Serialize};

use crate::codec::layout::csb;
use crate::codec::{decode, get32, get64, put32, put64, Field, Words};
use crate::constants::cc_ids;

bitflags::bitflags! {
    /// Completion extension bits, as they sit in the 8-bit `csb_ce` field.
    #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
    pub struct CompletionExtension: u8 {
        /// Stream suspended; resume fields in the parameter block are valid.
        const PARTIAL      = 0x80;
        /// Operation terminated; output may be partially invalid.
        const TERMINATED   = 0x40;
        /// Source and target processed byte counts are trustworthy.
        const COUNTS_VALID = 0x20;
    }
}

impl CompletionExtension {
    /// Bits the hardware never documents.
    pub const RESERVED: u8 = 0x1f;
}

/// Documented completion codes.
#[repr(u8)]
#[derive(Copy, Clone, Debug, PartialEq, Eq, Hash, TryFromPrimitive, Serialize, Deserialize)]
pub enum CompletionCode {
    Ok                      = cc_ids::OK,
    Alignment               = cc_ids::ALIGNMENT,
    OperandOverlap          = cc_ids::OPOVERLAP,
    DataLength              = cc_ids::DATA_LENGTH,
    Translation             = cc_ids::TRANSLATION,
    Protection              = cc_ids::PROTECTION,
    ExternalUe7             = cc_ids::EXTERNAL_UE7,
    InvalidOp               = cc_ids::INVALID_OP,
    Privilege               = cc_ids::PRIVILEGE,
    InternalUe              = cc_ids::INTERNAL_UE,
    ExternalUeWrite         = cc_ids::EXTERN_UE_WR,
    TargetSpace             = cc_ids::TARGET_SPACE,
    ExcessiveDde            = cc_ids::EXCESSIVE_DDE,
    TranslationWrite        = cc_ids::TRANSL_WR,
    ProtectionWrite         = cc_ids::PROTECT_WR,
    Subfunction             = cc_ids::SUBFUNCTION,
    FunctionAbort           = cc_ids::FUNC_ABORT,
    ByteMax                 = cc_ids::BYTE_MAX,
    CorruptCrb              = cc_ids::CORRUPT_CRB,
    InvalidCrb              = cc_ids::INVALID_CRB,
    InvalidDde              = cc_ids::INVALID_DDE,
    SegmentedDdl            = cc_ids::SEGMENTED_DDL,
    DdeOverflow             = cc_ids::DDE_OVERFLOW,
    TargetOverrun           = cc_ids::TPBC_GT_SPBC,
    MissingCode             = cc_ids::MISSING_CODE,
    InvalidDistance         = cc_ids::INVALID_DIST,
    InvalidDht              = cc_ids::INVALID_DHT,
    ExternalUe90            = cc_ids::EXTERNAL_UE90,
    WatchdogTimer           = cc_ids::WDOG_TIMER,
    AddressTranslationFault = cc_ids::AT_FAULT,
    InterruptServer         = cc_ids::INTR_SERVER,
    Ue253                   = cc_ids::UE253,
    NoHardware              = cc_ids::NO_HW,
    HungOperation           = cc_ids::HUNG_OP,
}

impl CompletionCode {
    pub const ALL: &'static [CompletionCode] = &[
        Self::Ok, Self::Alignment, Self::OperandOverlap, Self::DataLength,
        Self::Translation, Self::Protection, Self::ExternalUe7, Self::InvalidOp,
        Self::Privilege, Self::InternalUe, Self::ExternalUeWrite, Self::TargetSpace,
        Self::ExcessiveDde, Self::TranslationWrite, Self::ProtectionWrite,
        Self::Subfunction, Self::FunctionAbort, Self::ByteMax, Self::CorruptCrb,
        Self::InvalidCrb, Self::InvalidDde, Self::SegmentedDdl, Self::DdeOverflow,
        Self::TargetOverrun, Self::MissingCode, Self::InvalidDistance,
        Self::InvalidDht, Self::ExternalUe90, Self::WatchdogTimer,
        Self::AddressTranslationFault, Self::InterruptServer, Self::Ue253,
        Self::NoHardware, Self::HungOperation,
    ];

    /// Human-readable meaning of the code.
    pub fn describe(self) -> &'static str {
        use CompletionCode::*;
        match self {
            Ok => "operation completed",
            Alignment => "storage operand alignment error",
            OperandOverlap => "source and target operands overlap",
            DataLength => "source data ended before the operation completed",
            Translation => "address translation fault on read",
            Protection => "storage protection violation on read",
            ExternalUe7 => "external uncorrectable error",
            InvalidOp => "invalid operation",
            Privilege => "privilege violation",
            InternalUe => "internal uncorrectable error",
            ExternalUeWrite => "external uncorrectable error on write",
            TargetSpace => "target buffer too small",
            ExcessiveDde => "too many data descriptor elements",
            TranslationWrite => "address translation fault on write",
            ProtectionWrite => "storage protection violation on write",
            Subfunction => "invalid subfunction",
            FunctionAbort => "function aborted",
            ByteMax => "byte count exceeds the selected limit",
            CorruptCrb => "request block corrupted",
            InvalidCrb => "invalid request block",
            InvalidDde => "invalid data descriptor element",
            SegmentedDdl => "segmented descriptor list",
            DdeOverflow => "descriptor byte counts overflow",
            TargetOverrun => "target processed more bytes than source (expansion)",
            MissingCode => "Huffman code missing from the table",
            InvalidDistance => "distance points before the start of history",
            InvalidDht => "invalid dynamic Huffman table",
            ExternalUe90 => "external uncorrectable error (90)",
            WatchdogTimer => "hardware watchdog expired",
            AddressTranslationFault => "translation fault reported by the switch",
            InterruptServer => "interrupt server error",
            Ue253 => "uncorrectable error (253)",
            NoHardware => "no accelerator present",
            HungOperation => "operation hung",
        }
    }
}

/// Host copy of a completed status block.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct CompletionStatus {
    pub valid: bool,
    pub format: bool,
    pub sequence: u8,
    pub code: u8,
    pub extension: u8,
    /// Target processed byte count.
    pub tpbc: u32,
    pub failing_address: u64,
}

impl CompletionStatus {
    /// A success record with the given target count, counts-valid set.
    pub fn success(tpbc: u32) -> Self {
        Self {
            valid: true,
            extension: CompletionExtension::COUNTS_VALID.bits(),
            tpbc,
            ..Self::default()
        }
    }

    pub fn completion_code(&self) -> Option<CompletionCode> {
        CompletionCode::try_from_primitive(self.code).ok()
    }

    /// Architected extension bits; reserved bits are dropped.
    pub fn flags(&self) -> CompletionExtension {
        CompletionExtension::from_bits_truncate(self.extension)
    }

    pub fn is_partial(&self) -> bool {
        self.flags().contains(CompletionExtension::PARTIAL)
    }

    pub fn is_terminated(&self) -> bool {
        self.flags().contains(CompletionExtension::TERMINATED)
    }

    /// Byte counters may be used. Terminated without counts-valid never
    /// qualifies.
    pub fn counts_valid(&self) -> bool {
        self.flags().contains(CompletionExtension::COUNTS_VALID)
    }
}

/// 16-byte status block.
#[repr(C, align(16))]
#[derive(Debug, Default)]
pub struct StatusBlock {
    words: Words<4>,
}

impl StatusBlock {
    pub fn words(&self) -> &Words<4> {
        &self.words
    }

    /// Zero the block, valid bit included. Done once per submission.
    pub fn clear(&self) {
        self.words.clear();
    }

    /// Has the device published a completion? Acquire: a `true` result makes
    /// every device write before the valid bit visible.
    pub fn is_valid(&self) -> bool {
        let w0 = self.words.load(csb::VALID.word, Ordering::Acquire);
        (w0 >> csb::VALID.shift()) & csb::VALID.mask() != 0
    }

    /// Read the whole record. Only meaningful after `is_valid` returned true.
    pub fn read(&self) -> CompletionStatus {
        CompletionStatus {
            valid: decode(&self.words, csb::VALID) != 0,
            format: decode(&self.words, csb::FORMAT) != 0,
            sequence: decode(&self.words, csb::SEQUENCE) as u8,
            code: decode(&self.words, csb::CODE) as u8,
            extension: decode(&self.words, csb::EXTENSION) as u8,
            tpbc: get32(&self.words, csb::TPBC),
            failing_address: get64(&self.words, csb::FAILING_ADDRESS),
        }
    }

    /// Publish a completion the way the device does: body first, then word 0
    /// carrying the valid bit with release ordering. Used by platform
    /// implementations that complete jobs in software.
    pub fn post(&self, status: &CompletionStatus) {
        put32(&self.words, csb::TPBC, status.tpbc);
        put64(&self.words, csb::FAILING_ADDRESS, status.failing_address);

        let place = |f: Field, v: u32| (v & f.mask()) << f.shift();
        let w0 = place(csb::VALID, 1)
            | place(csb::FORMAT, status.format as u32)
            | place(csb::SEQUENCE, status.sequence as u32)
            | place(csb::CODE, status.code as u32)
            | place(csb::EXTENSION, status.extension as u32);
        self.words.store(csb::VALID.word, w0, Ordering::Release);
    }
}
