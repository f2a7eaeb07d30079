// SPDX-License-Identifier: MIT
// © 2025–2026 Christopher Liu

//! Sideboard photo sensors used as push buttons.
//!
//! Sensor 1 cycles through control type / mode combinations. Sensor 2 is a plain button whose
//! meaning the drive core decides (cruise control or field weakening).

use crate::supervisor::{ControlMode, ControlType};

pub const SENSOR1_SET: u16 = 0x01;
pub const SENSOR2_SET: u16 = 0x02;

/// Number of entries sensor 1 cycles through.
const MODE_SLOTS: u8 = 5;

/// What a sensor 1 press selects. `None` fields keep their current value.
#[derive(Copy, Clone, Debug, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub struct ModeSelection {
    pub ctrl_type: Option<ControlType>,
    pub mode: Option<ControlMode>,
}

impl ModeSelection {
    fn for_index(index: u8) -> Self {
        let (ctrl_type, mode) = match index {
            0 => (Some(ControlType::Foc), Some(ControlMode::Voltage)),
            1 => (None, Some(ControlMode::Speed)),
            2 => (None, Some(ControlMode::Torque)),
            3 => (Some(ControlType::Sinusoidal), None),
            _ => (Some(ControlType::Commutation), None),
        };
        Self { ctrl_type, mode }
    }
}

/// Result of one sensor sample.
#[derive(Copy, Clone, Debug, Default, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub struct SensorEvents {
    /// Sensor 1 rising edge and the selection it cycled to.
    pub selection: Option<ModeSelection>,
    /// Sensor 2 rising edge.
    pub button2: bool,
}

/// Edge detection and press index of the two sensors.
#[derive(Copy, Clone, Debug, Default)]
pub struct SideboardSensors {
    sensor1_prev: bool,
    sensor2_prev: bool,
    index: u8,
}

impl SideboardSensors {
    pub const fn new() -> Self {
        Self {
            sensor1_prev: false,
            sensor2_prev: false,
            index: 0,
        }
    }

    /// Sensor 1 press count modulo the number of slots.
    #[inline]
    pub fn index(&self) -> u8 {
        self.index
    }

    /// Feed the `sensors` bit field of the latest sideboard record.
    pub fn update(&mut self, sensors: u16) -> SensorEvents {
        let s1 = sensors & SENSOR1_SET != 0;
        let s2 = sensors & SENSOR2_SET != 0;
        let rising1 = s1 && !self.sensor1_prev;
        let rising2 = s2 && !self.sensor2_prev;
        self.sensor1_prev = s1;
        self.sensor2_prev = s2;

        let selection = if rising1 {
            self.index = (self.index + 1) % MODE_SLOTS;
            let sel = ModeSelection::for_index(self.index);
            crate::log_info!("sensor1 -> slot {}", self.index);
            Some(sel)
        } else {
            None
        };

        SensorEvents {
            selection,
            button2: rising2,
        }
    }
}
