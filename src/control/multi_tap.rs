// SPDX-License-Identifier: MIT
// © 2025–2026 Christopher Liu

//! Multi-tap gesture detector.
//!
//! Turns an analog-ish input into a toggle that flips when the input is pressed a configured
//! number of times within a time window. Used on the brake pedal to switch between forward and
//! reverse driving with a double tap.
//!
//! Every crossing of the hysteresis band counts as one pulse, so a full tap (press and release)
//! is two pulses.

/// Thresholds and timing of the gesture.
#[derive(Copy, Clone, Debug, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub struct MultiTapConfig {
    /// Input level that starts a press.
    pub hi: i16,
    /// Input level that ends a press.
    pub lo: i16,
    /// Window in milliseconds measured from the first pulse.
    pub timeout_ms: u32,
    /// Pulses needed to toggle.
    pub pulses: u8,
}

impl MultiTapConfig {
    /// Require `n` full taps.
    pub const fn taps(mut self, n: u8) -> Self {
        self.pulses = n.saturating_mul(2);
        self
    }
}

impl Default for MultiTapConfig {
    fn default() -> Self {
        Self {
            hi: 600,
            lo: 200,
            timeout_ms: 2000,
            pulses: 4,
        }
    }
}

/// Detector state. Call [`MultiTap::update`] once per tick.
#[derive(Copy, Clone, Debug, Default)]
pub struct MultiTap {
    cfg: MultiTapConfig,
    hysteresis: bool,
    pulse_cnt: u8,
    t_start: u32,
    toggled: bool,
}

impl MultiTap {
    pub fn new(cfg: MultiTapConfig) -> Self {
        Self {
            cfg,
            ..Default::default()
        }
    }

    /// Current output bit.
    #[inline]
    pub fn is_toggled(&self) -> bool {
        self.toggled
    }

    #[inline]
    pub fn pulse_count(&self) -> u8 {
        self.pulse_cnt
    }

    /// Advance by one sample taken at `now_ms`. Returns the output bit.
    pub fn update(&mut self, u: i16, now_ms: u32) -> bool {
        let hyst = if self.hysteresis {
            u > self.cfg.lo
        } else {
            u > self.cfg.hi
        };
        let pulse = hyst != self.hysteresis;

        // First press of a sequence starts the window.
        let t_start = if hyst && pulse && self.pulse_cnt == 0 {
            now_ms
        } else {
            self.t_start
        };
        let timed_out = now_ms.wrapping_sub(t_start) > self.cfg.timeout_ms;

        let new_pulse = if !hyst && self.pulse_cnt == 0 {
            0
        } else {
            u8::from(pulse)
        };

        let carried = if self.pulse_cnt >= self.cfg.pulses || timed_out {
            0
        } else {
            self.pulse_cnt
        };
        let count = carried.saturating_add(new_pulse);

        if count >= self.cfg.pulses && !timed_out {
            self.toggled = !self.toggled;
            crate::log_debug!("multi-tap toggled -> {}", self.toggled);
        }

        self.pulse_cnt = count;
        self.hysteresis = hyst;
        self.t_start = t_start;
        self.toggled
    }
}
