//! Media capacities and byte arithmetic.
//!
//! Capacities for the supported optical media, unit conversion, the safety
//! cushion applied before fitting, and human-readable byte formatting.
//! Units are binary: 1 kB = 1024 bytes, 1 MB = 1024 kB, 1 GB = 1024 MB.
//! An ISO sector is 2048 bytes.

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::error::EngineError;

pub const BYTES_PER_SECTOR: u64 = 2048;
pub const BYTES_PER_KBYTE: u64 = 1024;
pub const BYTES_PER_MBYTE: u64 = BYTES_PER_KBYTE * 1024;
pub const BYTES_PER_GBYTE: u64 = BYTES_PER_MBYTE * 1024;

/// Cushion used when none is configured.
pub const DEFAULT_CUSHION_PERCENT: f64 = 4.5;

/// Units understood by [`convert_size`] and [`parse_size`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SizeUnit {
    Bytes,
    Kilobytes,
    Megabytes,
    Gigabytes,
    Sectors,
}

impl SizeUnit {
    pub fn bytes_per_unit(&self) -> u64 {
        match self {
            Self::Bytes => 1,
            Self::Kilobytes => BYTES_PER_KBYTE,
            Self::Megabytes => BYTES_PER_MBYTE,
            Self::Gigabytes => BYTES_PER_GBYTE,
            Self::Sectors => BYTES_PER_SECTOR,
        }
    }
}

impl FromStr for SizeUnit {
    type Err = EngineError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "" | "b" | "byte" | "bytes" => Ok(Self::Bytes),
            "k" | "kb" | "kib" => Ok(Self::Kilobytes),
            "m" | "mb" | "mib" => Ok(Self::Megabytes),
            "g" | "gb" | "gib" => Ok(Self::Gigabytes),
            "s" | "sector" | "sectors" => Ok(Self::Sectors),
            other => Err(EngineError::InvalidSize {
                input: s.to_string(),
                reason: format!("unknown unit '{}'", other),
            }),
        }
    }
}

/// Convert a quantity between units.
pub fn convert_size(size: f64, from: SizeUnit, to: SizeUnit) -> f64 {
    size * from.bytes_per_unit() as f64 / to.bytes_per_unit() as f64
}

/// Parse a size such as `"734003200"`, `"700 MB"` or `"4.4GB"` into bytes.
///
/// Fractional results are truncated to whole bytes.
pub fn parse_size(input: &str) -> Result<u64, EngineError> {
    let text = input.trim();
    let split = text
        .find(|c: char| !(c.is_ascii_digit() || c == '.' || c == '-' || c == '+'))
        .unwrap_or(text.len());
    let (number, unit) = text.split_at(split);

    let invalid = |reason: &str| EngineError::InvalidSize {
        input: input.to_string(),
        reason: reason.to_string(),
    };

    if number.is_empty() {
        return Err(invalid("missing number"));
    }
    let value: f64 = number.parse().map_err(|_| invalid("not a number"))?;
    if !value.is_finite() {
        return Err(invalid("not a finite number"));
    }
    if value < 0.0 {
        return Err(invalid("size must not be negative"));
    }
    let unit: SizeUnit = unit.parse().map_err(|_| invalid("unknown unit"))?;

    Ok(convert_size(value, unit, SizeUnit::Bytes) as u64)
}

/// Supported optical media.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum MediaType {
    /// 74-minute CD-R (650 MB)
    #[serde(rename = "cdr-74")]
    Cdr74,
    /// 74-minute CD-RW (650 MB)
    #[serde(rename = "cdrw-74")]
    Cdrw74,
    /// 80-minute CD-R (700 MB)
    #[serde(rename = "cdr-80")]
    Cdr80,
    /// 80-minute CD-RW (700 MB)
    #[serde(rename = "cdrw-80")]
    Cdrw80,
    /// DVD+R (4.4 GB, sold as 4.7 "marketing" GB)
    #[serde(rename = "dvd+r")]
    DvdPlusR,
    /// DVD+RW (4.4 GB)
    #[serde(rename = "dvd+rw")]
    DvdPlusRw,
}

impl MediaType {
    pub const ALL: [MediaType; 6] = [
        MediaType::Cdr74,
        MediaType::Cdrw74,
        MediaType::Cdr80,
        MediaType::Cdrw80,
        MediaType::DvdPlusR,
        MediaType::DvdPlusRw,
    ];

    pub fn name(&self) -> &'static str {
        match self {
            Self::Cdr74 => "cdr-74",
            Self::Cdrw74 => "cdrw-74",
            Self::Cdr80 => "cdr-80",
            Self::Cdrw80 => "cdrw-80",
            Self::DvdPlusR => "dvd+r",
            Self::DvdPlusRw => "dvd+rw",
        }
    }

    /// Total capacity of blank media in bytes, before any cushion.
    pub fn capacity_bytes(&self) -> u64 {
        match self {
            Self::Cdr74 | Self::Cdrw74 => 650 * BYTES_PER_MBYTE,
            Self::Cdr80 | Self::Cdrw80 => 700 * BYTES_PER_MBYTE,
            Self::DvdPlusR | Self::DvdPlusRw => {
                convert_size(4.4, SizeUnit::Gigabytes, SizeUnit::Bytes) as u64
            }
        }
    }

    pub fn is_rewritable(&self) -> bool {
        matches!(self, Self::Cdrw74 | Self::Cdrw80 | Self::DvdPlusRw)
    }
}

impl fmt::Display for MediaType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

impl FromStr for MediaType {
    type Err = EngineError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let wanted = s.trim().to_lowercase();
        MediaType::ALL
            .into_iter()
            .find(|media| media.name() == wanted)
            .ok_or_else(|| EngineError::UnknownMediaType {
                name: s.to_string(),
            })
    }
}

/// Capacity left after setting aside `cushion_percent` of it.
///
/// Size estimates are never perfect, so a slice of every volume is held back.
/// A 4.5% cushion leaves 95.5% of the capacity usable.
pub fn usable_capacity(capacity: u64, cushion_percent: f64) -> Result<u64, EngineError> {
    if !(0.0..100.0).contains(&cushion_percent) {
        return Err(EngineError::InvalidCushion {
            percent: cushion_percent,
        });
    }
    Ok((capacity as f64 * (100.0 - cushion_percent) / 100.0) as u64)
}

/// Format a byte quantity for display.
///
/// Values under 1 kB are shown as whole bytes; larger values in kB, MB or GB
/// with `digits` places after the decimal point.
pub fn display_bytes(bytes: u64, digits: usize) -> String {
    if bytes < BYTES_PER_KBYTE {
        return format!("{} bytes", bytes);
    }
    let (divisor, unit) = if bytes < BYTES_PER_MBYTE {
        (BYTES_PER_KBYTE, "kB")
    } else if bytes < BYTES_PER_GBYTE {
        (BYTES_PER_MBYTE, "MB")
    } else {
        (BYTES_PER_GBYTE, "GB")
    };
    format!("{:.*} {}", digits, bytes as f64 / divisor as f64, unit)
}
