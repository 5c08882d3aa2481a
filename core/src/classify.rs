//! classify.rs
//! Maps a raw completion record to a closed taxonomy.
//!
//! Industry notes:
//! - Every documented completion code lands in exactly one category; unknown
//!   codes are device faults.
//! - Extension bits are decoded independently of the code. Only documented
//!   combinations are interpreted; the rest are device faults.
//! - Source exhausted (data length) and target full (target space) with
//!   partial + counts-valid are suspensions, not failures.

use std::fmt;

use serde::{Deserialize, Serialize};

use crate::blocks::status::{CompletionCode, CompletionExtension, CompletionStatus};
use crate::utils::enum_name_or_hex;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Category {
    Success,
    /// Caller may fix the condition and resubmit.
    Retryable,
    TranslationFault,
    ProtectionFault,
    /// Non-recoverable at this layer.
    InvalidRequest,
    HardwareFatal,
    /// Compression expanded the data. Informational.
    TargetOverrun,
}

impl Category {
    pub const ALL: [Category; 7] = [
        Category::Success,
        Category::Retryable,
        Category::TranslationFault,
        Category::ProtectionFault,
        Category::InvalidRequest,
        Category::HardwareFatal,
        Category::TargetOverrun,
    ];

    /// Whether the outcome stops the caller.
    pub fn is_error(self) -> bool {
        !matches!(self, Category::Success | Category::TargetOverrun)
    }

    /// Faults that carry a meaningful failing address.
    pub fn has_failing_address(self) -> bool {
        matches!(self, Category::TranslationFault | Category::ProtectionFault)
    }
}

impl fmt::Display for Category {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Category::Success          => "success",
            Category::Retryable        => "retryable",
            Category::TranslationFault => "translation fault",
            Category::ProtectionFault  => "protection fault",
            Category::InvalidRequest   => "invalid request",
            Category::HardwareFatal    => "hardware fatal",
            Category::TargetOverrun    => "target overrun",
        };
        f.write_str(name)
    }
}

/// A non-success outcome with full diagnostic context.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Fault {
    pub category: Category,
    pub code: Option<CompletionCode>,
    pub raw_code: u8,
    pub extension: u8,
    pub failing_address: Option<u64>,
}

impl fmt::Display for Fault {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{}: {} ({})",
            self.category,
            enum_name_or_hex::<CompletionCode>(self.raw_code),
            self.code.map(CompletionCode::describe).unwrap_or("undocumented completion code"),
        )?;
        write!(f, ", ce={:#04x}", self.extension)?;
        if let Some(addr) = self.failing_address {
            write!(f, ", failing address {:#x}", addr)?;
        }
        Ok(())
    }
}

/// Result of classifying one completion.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Classification {
    pub category: Category,
    pub status: CompletionStatus,
}

impl Classification {
    /// Suspended mid-stream: resume fields must be captured.
    pub fn is_suspended(&self) -> bool {
        !self.category.is_error() && self.status.is_partial() && self.status.counts_valid()
    }

    /// Byte counters may be used.
    pub fn counts_trusted(&self) -> bool {
        self.status.counts_valid()
    }

    pub fn fault(&self) -> Fault {
        Fault {
            category: self.category,
            code: self.status.completion_code(),
            raw_code: self.status.code,
            extension: self.status.extension,
            failing_address: self
                .category
                .has_failing_address()
                .then_some(self.status.failing_address),
        }
    }

    /// `Ok` for success and informational outcomes, the fault otherwise.
    pub fn into_result(self) -> Result<Self, Fault> {
        if self.category.is_error() {
            Err(self.fault())
        } else {
            Ok(self)
        }
    }
}

/// Is the extension byte one of the documented combinations for this code?
pub fn extension_documented(code: u8, extension: u8) -> bool {
    if extension & CompletionExtension::RESERVED != 0 {
        return false;
    }
    let flags = CompletionExtension::from_bits_truncate(extension);
    if flags.contains(CompletionExtension::PARTIAL | CompletionExtension::TERMINATED) {
        return false;
    }
    !(code == 0 && flags.contains(CompletionExtension::TERMINATED))
}

/// Category of a documented code, ignoring extension bits.
pub fn category_of(code: CompletionCode) -> Category {
    use CompletionCode as C;
    match code {
        C::Ok => Category::Success,

        C::Alignment | C::OperandOverlap | C::ExcessiveDde | C::SegmentedDdl
        | C::TargetSpace => Category::Retryable,

        C::Translation | C::TranslationWrite | C::AddressTranslationFault => Category::TranslationFault,
        C::Protection | C::ProtectionWrite => Category::ProtectionFault,

        C::DataLength | C::InvalidOp | C::Privilege | C::Subfunction | C::ByteMax
        | C::CorruptCrb | C::InvalidCrb | C::InvalidDde | C::DdeOverflow
        | C::MissingCode | C::InvalidDistance | C::InvalidDht => Category::InvalidRequest,

        C::ExternalUe7 | C::InternalUe | C::ExternalUeWrite | C::FunctionAbort
        | C::ExternalUe90 | C::WatchdogTimer | C::InterruptServer | C::Ue253
        | C::NoHardware | C::HungOperation => Category::HardwareFatal,

        C::TargetOverrun => Category::TargetOverrun,
    }
}

/// Classify a completed status record.
pub fn classify(status: &CompletionStatus) -> Classification {
    let category = match status.completion_code() {
        _ if !extension_documented(status.code, status.extension) => Category::HardwareFatal,
        None => Category::HardwareFatal,
        Some(code @ (CompletionCode::DataLength | CompletionCode::TargetSpace))
            if status.is_partial() && status.counts_valid() =>
        {
            log::debug!("{:?} with partial: suspend", code);
            Category::Success
        }
        Some(code) => category_of(code),
    };

    if category == Category::HardwareFatal {
        log::error!(
            "device fault: cc={} ce={:#04x}",
            enum_name_or_hex::<CompletionCode>(status.code),
            status.extension
        );
    }

    Classification { category, status: *status }
}
