// SPDX-License-Identifier: MIT
// © 2025–2026 Christopher Liu

//! Type-dependent deadband mapping of raw inputs.
//!
//! A raw pot or serial channel arrives in a non-normalized range described by its calibrated
//! `min`/`mid`/`max`. [`DeadbandProfile::apply`] maps it onto the working command range, with a
//! zero zone around `mid` for center-resting pots.

use crate::error::{ConfigError, Result};

/// What kind of device sits behind an input.
#[derive(Copy, Clone, Debug, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum InputType {
    /// Input is ignored, always maps to zero.
    Disabled = 0,
    /// Normal pot, `[min, max] -> [0, out_max]`.
    SimplePot = 1,
    /// Pot resting in the middle, maps to both signs.
    CenterResting = 2,
    /// Resolve from the calibration with [`InputType::detect`].
    Auto = 3,
}

impl TryFrom<u16> for InputType {
    type Error = ConfigError;

    fn try_from(raw: u16) -> Result<Self> {
        match raw {
            0 => Ok(InputType::Disabled),
            1 => Ok(InputType::SimplePot),
            2 => Ok(InputType::CenterResting),
            3 => Ok(InputType::Auto),
            other => Err(ConfigError::UnknownInputType(other)),
        }
    }
}

impl From<InputType> for u16 {
    fn from(kind: InputType) -> u16 {
        kind as u16
    }
}

/// Default separation used by auto-detection for serial inputs.
pub const DETECT_THRESHOLD: i16 = 200;

impl InputType {
    /// Guess the input type from a calibrated range.
    ///
    /// Values are bucketed by `threshold`. If `min` and `max` (or `mid` and `max`) land in the same
    /// bucket, or the ordering is wrong, the input is disabled. If `min` and `mid` share a bucket it
    /// is a normal pot, otherwise a center-resting one.
    pub fn detect(min: i16, mid: i16, max: i16, threshold: i16) -> InputType {
        if threshold <= 0 {
            return InputType::Disabled;
        }

        let kind = if min / threshold == max / threshold
            || mid / threshold == max / threshold
            || min > max
            || mid > max
        {
            InputType::Disabled
        } else if min / threshold == mid / threshold {
            InputType::SimplePot
        } else {
            InputType::CenterResting
        };

        crate::log_info!("input detect min={} mid={} max={} -> {:?}", min, mid, max, kind);
        kind
    }
}

/// Calibration and deadband of one logical input.
#[derive(Copy, Clone, Debug, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub struct DeadbandProfile {
    pub kind: InputType,
    pub deadband: i16,
    pub min: i16,
    pub mid: i16,
    pub max: i16,
}

impl DeadbandProfile {
    pub const fn new(kind: InputType, min: i16, mid: i16, max: i16) -> Self {
        Self {
            kind,
            deadband: 0,
            min,
            mid,
            max,
        }
    }

    pub const fn with_deadband(mut self, deadband: i16) -> Self {
        self.deadband = deadband;
        self
    }

    /// Replace `Auto` with the detected type; other types are kept.
    pub fn resolved(mut self, threshold: i16) -> Self {
        if self.kind == InputType::Auto {
            self.kind = InputType::detect(self.min, self.mid, self.max, threshold);
        }
        self
    }

    /// Check that the calibration leaves room for the mapping of its type.
    pub fn validate(&self) -> Result<()> {
        if self.deadband < 0 {
            return Err(ConfigError::NegativeDeadband(self.deadband));
        }

        let degenerate = ConfigError::DegenerateInputRange {
            min: self.min,
            mid: self.mid,
            max: self.max,
        };

        let (mid, db) = (i32::from(self.mid), i32::from(self.deadband));
        match self.kind {
            InputType::Disabled | InputType::Auto => Ok(()),
            InputType::SimplePot if self.min < self.max => Ok(()),
            InputType::CenterResting
                if i32::from(self.min) < mid - db && mid + db < i32::from(self.max) =>
            {
                Ok(())
            }
            _ => Err(degenerate),
        }
    }

    /// Map a raw sample into `[out_min, out_max]`.
    ///
    /// `Auto` profiles that were never resolved map to zero.
    pub fn apply(&self, u: i16, out_min: i16, out_max: i16) -> i16 {
        let (u, db) = (i32::from(u), i32::from(self.deadband));
        let (min, mid, max) = (i32::from(self.min), i32::from(self.mid), i32::from(self.max));
        let (out_min, out_max) = (i32::from(out_min), i32::from(out_max));

        let out = match self.kind {
            InputType::Disabled | InputType::Auto => 0,
            InputType::SimplePot => map(u, min, max, 0, out_max).clamp(0, out_max.max(0)),
            InputType::CenterResting => {
                if u > mid - db && u < mid + db {
                    0
                } else if u > mid {
                    map(u, mid + db, max, 0, out_max).clamp(0, out_max.max(0))
                } else {
                    map(u, mid - db, min, 0, out_min).clamp(out_min.min(0), 0)
                }
            }
        };

        out as i16
    }
}

/// Linear map of `x` from `[in_min, in_max]` to `[out_min, out_max]`, unclamped.
///
/// A zero-width input range maps everything to `out_min`.
fn map(x: i32, in_min: i32, in_max: i32, out_min: i32, out_max: i32) -> i32 {
    let num = i64::from(x - in_min) * i64::from(out_max - out_min);
    let span = i64::from(in_max - in_min);
    let scaled = num.checked_div(span).unwrap_or(0);
    (scaled + i64::from(out_min)).clamp(i64::from(i32::MIN), i64::from(i32::MAX)) as i32
}
