//! Units for cache lifetimes and cache sizes.

use std::time::Duration;

/// Seconds in a second.
pub const SEC: u64 = 1;
/// Seconds in a minute.
pub const MIN: u64 = 60;
/// Seconds in an hour.
pub const HOUR: u64 = 3_600;
/// Seconds in a day.
pub const DAY: u64 = 86_400;

/// Bytes in a byte.
pub const BYTE: u64 = 1;
/// Bytes in a kibibyte.
pub const KB: u64 = 1_024;
/// Bytes in a mebibyte.
pub const MB: u64 = 1_048_576;
/// Bytes in a gibibyte.
pub const GB: u64 = 1_073_741_824;

/// A cache lifetime unit.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TimeUnit {
    /// One second.
    Sec,
    /// One minute.
    Min,
    /// One hour.
    Hour,
    /// One day.
    Day,
}

impl TimeUnit {
    /// Length of one unit in seconds.
    pub fn seconds(self) -> u64 {
        match self {
            TimeUnit::Sec => SEC,
            TimeUnit::Min => MIN,
            TimeUnit::Hour => HOUR,
            TimeUnit::Day => DAY,
        }
    }

    /// `count` of this unit, saturating at `u64::MAX` seconds.
    pub fn as_duration(self, count: u64) -> Duration {
        Duration::from_secs(count.saturating_mul(self.seconds()))
    }
}

/// A cache size unit.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MemoryUnit {
    /// One byte.
    Byte,
    /// 1024 bytes.
    Kb,
    /// 1024 KB.
    Mb,
    /// 1024 MB.
    Gb,
}

impl MemoryUnit {
    /// Size of one unit in bytes.
    pub fn bytes(self) -> u64 {
        match self {
            MemoryUnit::Byte => BYTE,
            MemoryUnit::Kb => KB,
            MemoryUnit::Mb => MB,
            MemoryUnit::Gb => GB,
        }
    }

    /// `count` of this unit in bytes, saturating at `u64::MAX`.
    pub fn to_bytes(self, count: u64) -> u64 {
        count.saturating_mul(self.bytes())
    }
}
