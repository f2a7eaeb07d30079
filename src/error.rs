// SPDX-License-Identifier: MIT
// © 2025–2026 Christopher Liu

//! Error types.
//!
//! Nothing on the tick path returns an error: garbled frames, bad checksums and stale links are
//! absorbed locally and surface only as the safe state. Errors here cover configuration load and
//! calibration persistence.

use core::fmt;

/// Result type for configuration checks.
pub type Result<T> = core::result::Result<T, ConfigError>;

/// A configuration value violates a design-time contract.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum ConfigError {
    /// Rate limit must be non-negative.
    NegativeRate(i16),
    /// A zero filter coefficient freezes the filter.
    ZeroFilter,
    /// Input type outside `0..=3`.
    UnknownInputType(u16),
    /// Calibrated min/mid/max leave no room for the mapping.
    DegenerateInputRange { min: i16, mid: i16, max: i16 },
    /// Deadband must be non-negative.
    NegativeDeadband(i16),
    /// Multi-tap low threshold must sit below the high threshold.
    MultiTapThresholds { lo: i16, hi: i16 },
    /// Multi-tap needs at least one pulse, or it toggles on every tick.
    ZeroMultiTapPulses,
    /// Electric brake threshold must lie strictly inside `(0, INPUT_MAX)`.
    ElectricBrakeThreshold(i16),
    /// Electric brake strength must lie in `(0, 500]`.
    ElectricBrakeStrength(i16),
    /// Serial or input timeout of zero would trip on the first tick.
    ZeroTimeout,
}

impl fmt::Display for ConfigError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ConfigError::NegativeRate(rate) => write!(f, "negative rate limit {}", rate),
            ConfigError::ZeroFilter => write!(f, "filter coefficient is zero"),
            ConfigError::UnknownInputType(raw) => write!(f, "unknown input type {}", raw),
            ConfigError::DegenerateInputRange { min, mid, max } => {
                write!(f, "degenerate input range min={} mid={} max={}", min, mid, max)
            }
            ConfigError::NegativeDeadband(db) => write!(f, "negative deadband {}", db),
            ConfigError::MultiTapThresholds { lo, hi } => {
                write!(f, "multi-tap thresholds lo={} hi={}", lo, hi)
            }
            ConfigError::ZeroMultiTapPulses => write!(f, "multi-tap pulse count is zero"),
            ConfigError::ElectricBrakeStrength(max) => {
                write!(f, "electric brake strength {} out of range", max)
            }
            ConfigError::ElectricBrakeThreshold(thres) => {
                write!(f, "electric brake threshold {} out of range", thres)
            }
            ConfigError::ZeroTimeout => write!(f, "timeout of zero ticks"),
        }
    }
}

/// Calibration store failures.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum StoreError {
    /// The backing store refused the write.
    WriteFailed { key: u16 },
    /// No free slot left for a new key.
    Full,
}

impl fmt::Display for StoreError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            StoreError::WriteFailed { key } => write!(f, "write to key {:#06x} failed", key),
            StoreError::Full => write!(f, "calibration store full"),
        }
    }
}
