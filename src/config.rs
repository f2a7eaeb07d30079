// SPDX-License-Identifier: MIT
// © 2025–2026 Christopher Liu

//! Board constants and runtime configuration.
//!
//! Constants are fixed at build time. [`Config`] gathers everything the drive core can be set up
//! with; [`Config::default`] is the hovercar build and [`Config::validate`] rejects combinations
//! the control code cannot work with.

use crate::assist::ElectricBrake;
use crate::calibration::StoredCalibration;
use crate::control::{DeadbandProfile, InputType, MixerKind, MultiTapConfig};
use crate::error::{ConfigError, Result};
use crate::fixed::{FilterCoef, MixCoef, Speed};
use crate::protocol::Protocol;
use crate::supervisor::{ChannelId, ControlMode, ControlType};

// ------------------------------------------------------------------------------------------------
// Timing
// ------------------------------------------------------------------------------------------------

/// Main loop period in ms.
pub const DELAY_IN_MAIN_LOOP: u32 = 5;
/// Ticks without fresh raw input before the safe state.
pub const TIMEOUT: u16 = 20;
/// Ticks without a valid serial record before the safe state (~0.8 s).
pub const SERIAL_TIMEOUT: u16 = 160;

// ------------------------------------------------------------------------------------------------
// Serial
// ------------------------------------------------------------------------------------------------

pub const SERIAL_BUFFER_SIZE: usize = 64;
pub const USART3_BAUD: u32 = 115_200;
pub const DEBUG_BAUD: u32 = 115_200;

// ------------------------------------------------------------------------------------------------
// Motor limits
// ------------------------------------------------------------------------------------------------

/// Amps to ADC counts.
pub const A2BIT_CONV: i32 = 19;
/// Maximum single motor current in A.
pub const I_MOT_MAX: i32 = 50;
/// Maximum motor speed in rpm.
pub const N_MOT_MAX: i32 = 2047;

pub const FIELD_WEAK_ENA: bool = false;
/// Input level where field weakening reaches its maximum, `(1000, 1500]`.
pub const FIELD_WEAK_HI: i16 = 1000;

// ------------------------------------------------------------------------------------------------
// Conditioning
// ------------------------------------------------------------------------------------------------

/// Working range of conditioned commands without field weakening.
pub const INPUT_LIMIT: i16 = 1000;
/// Rate limit, `fixdt(1,16,4)`: 30.0 per tick.
pub const DEFAULT_RATE: i16 = 480;
/// Low-pass coefficient, `fixdt(0,16,16)`: 0.1.
pub const DEFAULT_FILTER: u16 = 6553;
/// `fixdt(1,16,14)`: 1.0.
pub const SPEED_COEFFICIENT: i16 = 16384;
/// `fixdt(1,16,14)`: ~0.05.
pub const STEER_COEFFICIENT: i16 = 768;

/// Change to ignore calibration already stored in flash.
pub const FLASH_WRITE_KEY: u16 = 0x1233;

/// Brake pedal.
pub const INPUT1: DeadbandProfile = DeadbandProfile::new(InputType::SimplePot, -50, 0, 1000);
/// Throttle pedal.
pub const INPUT2: DeadbandProfile = DeadbandProfile::new(InputType::SimplePot, 0, 0, 1000);

/// Where the two raw inputs come from.
#[derive(Copy, Clone, Debug, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum InputSource {
    /// Serial remote on `channel`.
    Serial { protocol: Protocol, channel: ChannelId },
    /// Pots sampled by the ADC.
    Analog,
}

/// Vehicle layout the commands are shaped for.
#[derive(Copy, Clone, Debug, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum Variant {
    /// `input1` steers, `input2` drives.
    Standard,
    /// `input1` is a brake pedal, `input2` a throttle pedal; double tap on the brake reverses.
    Hovercar,
}

/// Runtime configuration of the drive core.
#[derive(Copy, Clone, Debug)]
pub struct Config {
    pub input_source: InputSource,
    /// Sideboard feedback link, if one is connected.
    pub sideboard: Option<ChannelId>,
    pub variant: Variant,
    pub mixer: MixerKind,

    pub input1: DeadbandProfile,
    pub input2: DeadbandProfile,

    pub rate: Speed,
    pub filter: FilterCoef,
    pub speed_coef: MixCoef,
    pub steer_coef: MixCoef,

    pub ctrl_mode: ControlMode,
    pub ctrl_type: ControlType,
    pub field_weakening: bool,

    pub cruise_control: bool,
    pub standstill_hold: bool,
    pub electric_brake: Option<ElectricBrake>,
    pub multi_tap: MultiTapConfig,

    /// Current limit, `fixdt(1,16,4)`.
    pub i_max: i16,
    /// Speed limit, `fixdt(1,16,4)`.
    pub n_max: i16,

    pub serial_timeout: u16,
    pub input_timeout: u16,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            input_source: InputSource::Serial {
                protocol: Protocol::Simple,
                channel: ChannelId::Usart3,
            },
            sideboard: None,
            variant: Variant::Hovercar,
            mixer: MixerKind::Single,

            input1: INPUT1,
            input2: INPUT2,

            rate: Speed::from_bits(DEFAULT_RATE),
            filter: FilterCoef::from_bits(DEFAULT_FILTER),
            speed_coef: MixCoef::from_bits(SPEED_COEFFICIENT),
            steer_coef: MixCoef::from_bits(STEER_COEFFICIENT),

            ctrl_mode: ControlMode::Torque,
            ctrl_type: ControlType::Foc,
            field_weakening: FIELD_WEAK_ENA,

            cruise_control: true,
            standstill_hold: false,
            electric_brake: None,
            multi_tap: MultiTapConfig::default(),

            i_max: ((I_MOT_MAX * A2BIT_CONV) << 4) as i16,
            n_max: (N_MOT_MAX << 4) as i16,

            serial_timeout: SERIAL_TIMEOUT,
            input_timeout: TIMEOUT,
        }
    }
}

impl Config {
    /// Check design-time contracts. Called by [`crate::drive::DriveCore::new`].
    pub fn validate(&self) -> Result<()> {
        if self.rate.is_negative() {
            return Err(ConfigError::NegativeRate(self.rate.to_bits()));
        }
        if self.filter.to_bits() == 0 {
            return Err(ConfigError::ZeroFilter);
        }
        if self.serial_timeout == 0 || self.input_timeout == 0 {
            return Err(ConfigError::ZeroTimeout);
        }

        self.input1.validate()?;
        self.input2.validate()?;

        if self.multi_tap.lo >= self.multi_tap.hi {
            return Err(ConfigError::MultiTapThresholds {
                lo: self.multi_tap.lo,
                hi: self.multi_tap.hi,
            });
        }
        if self.multi_tap.pulses == 0 {
            return Err(ConfigError::ZeroMultiTapPulses);
        }

        if let Some(eb) = self.electric_brake {
            eb.validate(INPUT_LIMIT)?;
        }

        Ok(())
    }

    /// Calibration used when nothing valid is stored.
    pub fn stored_defaults(&self) -> StoredCalibration {
        StoredCalibration {
            input1: self.input1,
            input2: self.input2,
            i_max: self.i_max,
            n_max: self.n_max,
        }
    }

    /// Input types the board was built for, before auto-detection.
    pub fn configured_types(&self) -> [InputType; 2] {
        [self.input1.kind, self.input2.kind]
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_config_is_valid() {
        assert_eq!(Config::default().validate(), Ok(()));
    }

    #[test]
    fn default_limits_match_motor_constants() {
        let cfg = Config::default();
        assert_eq!(cfg.i_max, 15200);
        assert_eq!(cfg.n_max, 32752);
    }

    #[test]
    fn validate_rejects_bad_values() {
        let mut cfg = Config::default();
        cfg.rate = Speed::from_bits(-1);
        assert_eq!(cfg.validate(), Err(ConfigError::NegativeRate(-1)));

        let mut cfg = Config::default();
        cfg.filter = FilterCoef::ZERO;
        assert_eq!(cfg.validate(), Err(ConfigError::ZeroFilter));

        let mut cfg = Config::default();
        cfg.multi_tap.lo = 700;
        assert!(matches!(cfg.validate(), Err(ConfigError::MultiTapThresholds { .. })));

        let mut cfg = Config::default();
        cfg.multi_tap = MultiTapConfig::default().taps(0);
        assert_eq!(cfg.validate(), Err(ConfigError::ZeroMultiTapPulses));

        let mut cfg = Config::default();
        cfg.electric_brake = Some(ElectricBrake { max: 100, thres: 0 });
        assert_eq!(cfg.validate(), Err(ConfigError::ElectricBrakeThreshold(0)));

        let mut cfg = Config::default();
        cfg.electric_brake = Some(ElectricBrake { max: -400, thres: 10 });
        assert_eq!(cfg.validate(), Err(ConfigError::ElectricBrakeStrength(-400)));

        let mut cfg = Config::default();
        cfg.electric_brake = Some(ElectricBrake { max: 501, thres: 10 });
        assert_eq!(cfg.validate(), Err(ConfigError::ElectricBrakeStrength(501)));

        let mut cfg = Config::default();
        cfg.input1 = DeadbandProfile::new(InputType::SimplePot, 10, 10, 10);
        assert!(matches!(cfg.validate(), Err(ConfigError::DegenerateInputRange { .. })));

        let mut cfg = Config::default();
        cfg.serial_timeout = 0;
        assert_eq!(cfg.validate(), Err(ConfigError::ZeroTimeout));
    }
}
