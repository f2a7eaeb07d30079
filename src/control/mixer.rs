// SPDX-License-Identifier: MIT
// © 2025–2026 Christopher Liu

//! Speed/steer mixer and the working command range.

use crate::config::{FIELD_WEAK_HI, INPUT_LIMIT};
use crate::fixed::{sat16, MixCoef, Speed};

/// Symmetric working range of conditioned commands.
///
/// Widened when field weakening is enabled so the upper part of the pedal travel can reach the
/// field weakening band.
#[derive(Copy, Clone, Debug, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub struct InputLimits {
    pub min: i16,
    pub max: i16,
}

impl InputLimits {
    pub fn new(field_weakening: bool) -> Self {
        if field_weakening {
            Self {
                min: (-INPUT_LIMIT).min(-FIELD_WEAK_HI),
                max: INPUT_LIMIT.max(FIELD_WEAK_HI),
            }
        } else {
            Self {
                min: -INPUT_LIMIT,
                max: INPUT_LIMIT,
            }
        }
    }

    #[inline]
    pub fn clamp(&self, v: i16) -> i16 {
        v.clamp(self.min, self.max)
    }
}

impl Default for InputLimits {
    fn default() -> Self {
        Self::new(false)
    }
}

/// How many actuators the mixer drives.
#[derive(Copy, Clone, Debug, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum MixerKind {
    /// Both outputs follow the speed command, steering is ignored.
    Single,
    /// Left/right split by the steering command.
    Differential,
}

/// Per-wheel motor command.
#[derive(Copy, Clone, Debug, Default, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub struct WheelPair {
    pub left: i16,
    pub right: i16,
}

impl WheelPair {
    pub const ZERO: Self = Self { left: 0, right: 0 };
}

/// Fixed-point mixer with `fixdt(1,16,14)` gains.
#[derive(Copy, Clone, Debug)]
pub struct Mixer {
    kind: MixerKind,
    speed_coef: MixCoef,
    steer_coef: MixCoef,
}

impl Mixer {
    pub const fn new(kind: MixerKind, speed_coef: MixCoef, steer_coef: MixCoef) -> Self {
        Self {
            kind,
            speed_coef,
            steer_coef,
        }
    }

    /// Mix `fixdt(1,16,4)` speed and steer into integer wheel commands.
    ///
    /// Each product is saturated to 16 bits before the shift back to integer, and the result is
    /// clamped again to `limits`.
    pub fn mix(&self, speed: Speed, steer: Speed, limits: InputLimits) -> WheelPair {
        let prod_speed = i32::from(product(speed, self.speed_coef));

        match self.kind {
            MixerKind::Single => {
                let out = limits.clamp(sat16(prod_speed) >> 4);
                WheelPair {
                    left: out,
                    right: out,
                }
            }
            MixerKind::Differential => {
                let prod_steer = i32::from(product(steer, self.steer_coef));
                WheelPair {
                    left: limits.clamp(sat16(prod_speed + prod_steer) >> 4),
                    right: limits.clamp(sat16(prod_speed - prod_steer) >> 4),
                }
            }
        }
    }
}

/// `fixdt(1,16,4) * fixdt(1,16,14)`, back to `fixdt(1,16,4)` with saturation.
#[inline]
fn product(value: Speed, coef: MixCoef) -> i16 {
    sat16((i32::from(value.to_bits()) * i32::from(coef.to_bits())) >> 14)
}

/// Measured average speed in the command sign convention.
///
/// The differential variant halves the difference because the two motors are mounted mirrored.
/// A negative speed coefficient means the motors are wired inverted, so the sign is flipped.
pub fn average_speed(kind: MixerKind, n_left: i16, n_right: i16, speed_coef: MixCoef) -> i16 {
    let avg = match kind {
        MixerKind::Single => i32::from(n_left),
        MixerKind::Differential => (i32::from(n_left) - i32::from(n_right)) / 2,
    };

    let avg = if speed_coef.is_negative() { -avg } else { avg };
    sat16(avg)
}
