// SPDX-License-Identifier: MIT
// © 2025–2026 Christopher Liu

//! Wire records of the serial links.
//!
//! All multi-byte fields are little-endian. Records are fixed size and carry their own checksum;
//! there is no length prefix, so the receiver relies on [`Frame::LEN`] to cut them out of the
//! byte stream.
//!
//! | Record | Bytes | Check |
//! | ------ | ----- | ----- |
//! | [`SerialCommand`] | 8 | start marker, XOR |
//! | [`IbusCommand`] | 32 | length/type header, subtractive sum |
//! | [`SideboardFeedback`] | 14 | start marker, XOR |

use crate::control::RawChannel;

/// Sync word of the simple and sideboard records.
pub const START_FRAME: u16 = (START_FRAME_ESC_TO_DISPLAY as u16) << 8 | START_FRAME_DISPLAY_TO_ESC as u16;
pub const START_FRAME_ESC_TO_DISPLAY: u8 = 0x5A;
pub const START_FRAME_DISPLAY_TO_ESC: u8 = 0xA5;

// iBUS header
pub const IBUS_LENGTH: u8 = 0x20;
pub const IBUS_COMMAND: u8 = 0x40;
pub const IBUS_NUM_CHANNELS: usize = 14;

/// Center value of an iBUS channel.
pub const IBUS_CENTER: u16 = 1500;

/// A fixed-size record with a self-contained validity check.
pub trait Frame: Copy + Default {
    /// Encoded size in bytes.
    const LEN: usize;

    /// Parse the first `LEN` bytes. Does not check validity.
    fn decode(bytes: &[u8]) -> Option<Self>;

    /// Write the record into `out`. Returns the number of bytes written.
    fn encode(&self, out: &mut [u8]) -> Option<usize>;

    /// Marker and checksum agree with the payload.
    fn is_valid(&self) -> bool;
}

/// A record that carries the two control inputs.
pub trait CommandFrame: Frame {
    fn inputs(&self) -> RawChannel;
}

#[inline]
fn u16_at(bytes: &[u8], at: usize) -> u16 {
    u16::from_le_bytes([bytes[at], bytes[at + 1]])
}

#[inline]
fn i16_at(bytes: &[u8], at: usize) -> i16 {
    i16::from_le_bytes([bytes[at], bytes[at + 1]])
}

#[inline]
fn put(out: &mut [u8], at: usize, bytes: [u8; 2]) {
    out[at..at + 2].copy_from_slice(&bytes);
}

// ================================================================================================
// Simple command
// ================================================================================================

/// Steer/speed command from the remote.
#[derive(Copy, Clone, Debug, Default, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub struct SerialCommand {
    pub start: u16,
    pub steer: i16,
    pub speed: i16,
    pub checksum: u16,
}

impl SerialCommand {
    /// Build a valid record.
    pub fn new(steer: i16, speed: i16) -> Self {
        let mut cmd = Self {
            start: START_FRAME,
            steer,
            speed,
            checksum: 0,
        };
        cmd.checksum = cmd.expected_checksum();
        cmd
    }

    pub fn expected_checksum(&self) -> u16 {
        self.start ^ self.steer as u16 ^ self.speed as u16
    }
}

impl Frame for SerialCommand {
    const LEN: usize = 8;

    fn decode(bytes: &[u8]) -> Option<Self> {
        if bytes.len() < Self::LEN {
            return None;
        }
        Some(Self {
            start: u16_at(bytes, 0),
            steer: i16_at(bytes, 2),
            speed: i16_at(bytes, 4),
            checksum: u16_at(bytes, 6),
        })
    }

    fn encode(&self, out: &mut [u8]) -> Option<usize> {
        if out.len() < Self::LEN {
            return None;
        }
        put(out, 0, self.start.to_le_bytes());
        put(out, 2, self.steer.to_le_bytes());
        put(out, 4, self.speed.to_le_bytes());
        put(out, 6, self.checksum.to_le_bytes());
        Some(Self::LEN)
    }

    fn is_valid(&self) -> bool {
        self.start == START_FRAME && self.checksum == self.expected_checksum()
    }
}

impl CommandFrame for SerialCommand {
    fn inputs(&self) -> RawChannel {
        RawChannel {
            input1: self.steer,
            input2: self.speed,
        }
    }
}

// ================================================================================================
// iBUS
// ================================================================================================

/// FlySky iBUS servo frame.
#[derive(Copy, Clone, Debug, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub struct IbusCommand {
    pub length: u8,
    pub kind: u8,
    pub channels: [u16; IBUS_NUM_CHANNELS],
    pub checksum: u16,
}

impl Default for IbusCommand {
    fn default() -> Self {
        Self {
            length: 0,
            kind: 0,
            channels: [IBUS_CENTER; IBUS_NUM_CHANNELS],
            checksum: 0,
        }
    }
}

impl IbusCommand {
    /// Build a valid frame from channel values.
    pub fn new(channels: [u16; IBUS_NUM_CHANNELS]) -> Self {
        let mut cmd = Self {
            length: IBUS_LENGTH,
            kind: IBUS_COMMAND,
            channels,
            checksum: 0,
        };
        cmd.checksum = cmd.expected_checksum();
        cmd
    }

    /// `0xFFFF` minus the header and every channel byte, wrapping.
    pub fn expected_checksum(&self) -> u16 {
        let init = 0xFFFF_u16
            .wrapping_sub(u16::from(IBUS_LENGTH))
            .wrapping_sub(u16::from(IBUS_COMMAND));

        self.channels.iter().fold(init, |sum, ch| {
            let [lo, hi] = ch.to_le_bytes();
            sum.wrapping_sub(u16::from(lo)).wrapping_sub(u16::from(hi))
        })
    }

    /// Channel value, or center if out of range.
    pub fn channel(&self, idx: usize) -> u16 {
        self.channels.get(idx).copied().unwrap_or(IBUS_CENTER)
    }
}

impl Frame for IbusCommand {
    const LEN: usize = 2 + IBUS_NUM_CHANNELS * 2 + 2;

    fn decode(bytes: &[u8]) -> Option<Self> {
        if bytes.len() < Self::LEN {
            return None;
        }
        let mut channels = [0u16; IBUS_NUM_CHANNELS];
        for (i, ch) in channels.iter_mut().enumerate() {
            *ch = u16_at(bytes, 2 + 2 * i);
        }
        Some(Self {
            length: bytes[0],
            kind: bytes[1],
            channels,
            checksum: u16_at(bytes, Self::LEN - 2),
        })
    }

    fn encode(&self, out: &mut [u8]) -> Option<usize> {
        if out.len() < Self::LEN {
            return None;
        }
        out[0] = self.length;
        out[1] = self.kind;
        for (i, ch) in self.channels.iter().enumerate() {
            put(out, 2 + 2 * i, ch.to_le_bytes());
        }
        put(out, Self::LEN - 2, self.checksum.to_le_bytes());
        Some(Self::LEN)
    }

    fn is_valid(&self) -> bool {
        self.length == IBUS_LENGTH
            && self.kind == IBUS_COMMAND
            && self.checksum == self.expected_checksum()
    }
}

impl CommandFrame for IbusCommand {
    /// Channel 0 steers, channel 1 drives; both rescaled to about `±1000`.
    fn inputs(&self) -> RawChannel {
        let scale = |ch: u16| {
            let v = (i32::from(ch) - i32::from(IBUS_CENTER)) * 2;
            v.clamp(i32::from(i16::MIN), i32::from(i16::MAX)) as i16
        };
        RawChannel {
            input1: scale(self.channel(0)),
            input2: scale(self.channel(1)),
        }
    }
}

// ================================================================================================
// Sideboard
// ================================================================================================

/// IMU and sensor feedback from a sideboard.
#[derive(Copy, Clone, Debug, Default, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub struct SideboardFeedback {
    pub start: u16,
    pub pitch: i16,
    pub d_pitch: i16,
    pub cmd1: i16,
    pub cmd2: i16,
    pub sensors: u16,
    pub checksum: u16,
}

impl SideboardFeedback {
    pub fn new(pitch: i16, d_pitch: i16, cmd1: i16, cmd2: i16, sensors: u16) -> Self {
        let mut fb = Self {
            start: START_FRAME,
            pitch,
            d_pitch,
            cmd1,
            cmd2,
            sensors,
            checksum: 0,
        };
        fb.checksum = fb.expected_checksum();
        fb
    }

    pub fn expected_checksum(&self) -> u16 {
        self.start
            ^ self.pitch as u16
            ^ self.d_pitch as u16
            ^ self.cmd1 as u16
            ^ self.cmd2 as u16
            ^ self.sensors
    }
}

impl Frame for SideboardFeedback {
    const LEN: usize = 14;

    fn decode(bytes: &[u8]) -> Option<Self> {
        if bytes.len() < Self::LEN {
            return None;
        }
        Some(Self {
            start: u16_at(bytes, 0),
            pitch: i16_at(bytes, 2),
            d_pitch: i16_at(bytes, 4),
            cmd1: i16_at(bytes, 6),
            cmd2: i16_at(bytes, 8),
            sensors: u16_at(bytes, 10),
            checksum: u16_at(bytes, 12),
        })
    }

    fn encode(&self, out: &mut [u8]) -> Option<usize> {
        if out.len() < Self::LEN {
            return None;
        }
        put(out, 0, self.start.to_le_bytes());
        put(out, 2, self.pitch.to_le_bytes());
        put(out, 4, self.d_pitch.to_le_bytes());
        put(out, 6, self.cmd1.to_le_bytes());
        put(out, 8, self.cmd2.to_le_bytes());
        put(out, 10, self.sensors.to_le_bytes());
        put(out, 12, self.checksum.to_le_bytes());
        Some(Self::LEN)
    }

    fn is_valid(&self) -> bool {
        self.start == START_FRAME && self.checksum == self.expected_checksum()
    }
}
