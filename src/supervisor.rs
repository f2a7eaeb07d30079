// SPDX-License-Identifier: MIT
// © 2025–2026 Christopher Liu

//! Link staleness tracking and the safe state.
//!
//! Each serial channel has its own [`ChannelTimeout`]; a validated record resets it, every other
//! tick ages it. Independently, a raw input counter ages whenever no fresh input sample was read.
//! The supervisor derives `unsafe` from both on every tick and never latches it: as soon as the
//! stale channel delivers a valid record again the system leaves the safe state.

/// Requested motor control mode.
#[derive(Copy, Clone, Debug, Default, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum ControlMode {
    /// Motor power is brought to zero in a controlled way.
    #[default]
    Open = 0,
    Voltage = 1,
    Speed = 2,
    Torque = 3,
}

/// Motor control algorithm.
#[derive(Copy, Clone, Debug, Default, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum ControlType {
    Commutation = 0,
    Sinusoidal = 1,
    #[default]
    Foc = 2,
}

/// Physical serial port a record arrived on.
#[derive(Copy, Clone, Debug, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum ChannelId {
    /// Left sideboard cable.
    Usart2 = 0,
    /// Right sideboard cable.
    Usart3 = 1,
}

impl ChannelId {
    pub const ALL: [ChannelId; 2] = [ChannelId::Usart2, ChannelId::Usart3];

    #[inline]
    fn index(self) -> usize {
        self as usize
    }
}

/// Staleness counter of one serial channel.
///
/// The counter saturates at `limit`; the flag is set on the tick the counter reaches it and is
/// cleared only by [`ChannelTimeout::reset`].
#[derive(Copy, Clone, Debug)]
pub struct ChannelTimeout {
    counter: u16,
    limit: u16,
    flag: bool,
    fresh: bool,
}

impl ChannelTimeout {
    pub const fn new(limit: u16) -> Self {
        Self {
            counter: 0,
            limit,
            flag: false,
            fresh: false,
        }
    }

    /// A valid record arrived.
    pub fn reset(&mut self) {
        self.counter = 0;
        self.flag = false;
        self.fresh = true;
    }

    /// Age by one tick unless a record was accepted since the last call. Returns the flag.
    pub fn tick(&mut self) -> bool {
        if self.fresh {
            self.fresh = false;
        } else {
            self.counter = self.counter.saturating_add(1).min(self.limit);
            if self.counter >= self.limit {
                self.flag = true;
            }
        }
        self.flag
    }

    #[inline]
    pub fn counter(&self) -> u16 {
        self.counter
    }

    #[inline]
    pub fn is_timed_out(&self) -> bool {
        self.flag
    }
}

/// Combines the per-channel timeouts and the raw input timeout into one safe/unsafe decision.
#[derive(Clone, Debug)]
pub struct Supervisor {
    channels: [ChannelTimeout; 2],
    tracked: [bool; 2],
    input_cnt: u16,
    input_limit: u16,
    input_fresh: bool,
    is_unsafe: bool,
}

impl Supervisor {
    /// `serial_timeout` ticks for serial channels, `input_timeout` for raw input.
    pub fn new(serial_timeout: u16, input_timeout: u16) -> Self {
        Self {
            channels: [ChannelTimeout::new(serial_timeout); 2],
            tracked: [false; 2],
            input_cnt: 0,
            input_limit: input_timeout,
            input_fresh: false,
            is_unsafe: false,
        }
    }

    /// Let the channel's timeout contribute to the safe state.
    pub fn with_channel(mut self, ch: ChannelId) -> Self {
        self.tracked[ch.index()] = true;
        self
    }

    /// A record on `ch` passed validation this tick.
    pub fn accept(&mut self, ch: ChannelId) {
        let timeout = &mut self.channels[ch.index()];
        if timeout.is_timed_out() {
            crate::log_info!("{:?} link restored", ch);
        }
        timeout.reset();
    }

    /// Fresh raw input was read this tick.
    pub fn input_sampled(&mut self) {
        self.input_fresh = true;
    }

    /// Age the tracked channel counters and derive the safe state for this tick.
    ///
    /// Untracked channels never age, so they neither report a timeout nor trip the safe state.
    pub fn tick(&mut self) -> bool {
        let mut any_flag = false;
        for ch in ChannelId::ALL {
            if !self.tracked[ch.index()] {
                continue;
            }
            let timeout = &mut self.channels[ch.index()];
            let was = timeout.is_timed_out();
            let now = timeout.tick();
            if now && !was {
                crate::log_warn!("{:?} link timed out", ch);
            }
            any_flag |= now;
        }

        if self.input_fresh {
            self.input_cnt = 0;
            self.input_fresh = false;
        } else {
            self.input_cnt = self.input_cnt.saturating_add(1);
        }

        let is_unsafe = any_flag || self.input_cnt > self.input_limit;
        if is_unsafe != self.is_unsafe {
            if is_unsafe {
                crate::log_warn!("entering safe state");
            } else {
                crate::log_info!("leaving safe state");
            }
        }
        self.is_unsafe = is_unsafe;
        is_unsafe
    }

    /// Safe state as computed by the last [`Supervisor::tick`].
    #[inline]
    pub fn is_unsafe(&self) -> bool {
        self.is_unsafe
    }

    /// Mode actually handed to the motor controller.
    pub fn effective_mode(&self, requested: ControlMode) -> ControlMode {
        if self.is_unsafe {
            ControlMode::Open
        } else {
            requested
        }
    }

    #[inline]
    pub fn is_tracked(&self, ch: ChannelId) -> bool {
        self.tracked[ch.index()]
    }

    pub fn channel(&self, ch: ChannelId) -> &ChannelTimeout {
        &self.channels[ch.index()]
    }

    pub fn input_counter(&self) -> u16 {
        self.input_cnt
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn channel_flag_sets_after_limit_and_stays_set() {
        let mut t = ChannelTimeout::new(5);
        for _ in 0..4 {
            assert!(!t.tick());
        }
        assert!(t.tick());
        assert_eq!(t.counter(), 5);
        for _ in 0..100 {
            assert!(t.tick());
        }
        assert_eq!(t.counter(), 5);
    }

    #[test]
    fn reset_clears_and_skips_the_current_tick() {
        let mut t = ChannelTimeout::new(5);
        for _ in 0..10 {
            t.tick();
        }
        t.reset();
        assert!(!t.tick());
        assert_eq!(t.counter(), 0);
        assert!(!t.tick());
        assert_eq!(t.counter(), 1);
    }

    #[test]
    fn untracked_channel_never_ages_or_trips_safe_state() {
        let mut sup = Supervisor::new(3, 20).with_channel(ChannelId::Usart3);
        for _ in 0..10 {
            sup.input_sampled();
            sup.accept(ChannelId::Usart3);
            assert!(!sup.tick());
        }
        assert!(sup.is_tracked(ChannelId::Usart3));
        assert!(!sup.is_tracked(ChannelId::Usart2));
        assert!(!sup.channel(ChannelId::Usart2).is_timed_out());
        assert_eq!(sup.channel(ChannelId::Usart2).counter(), 0);
    }

    #[test]
    fn stale_channel_forces_open_mode_until_valid_record() {
        let mut sup = Supervisor::new(3, 20).with_channel(ChannelId::Usart3);
        for _ in 0..2 {
            sup.input_sampled();
            assert!(!sup.tick());
        }
        sup.input_sampled();
        assert!(sup.tick());
        assert_eq!(sup.effective_mode(ControlMode::Torque), ControlMode::Open);

        sup.accept(ChannelId::Usart3);
        sup.input_sampled();
        assert!(!sup.tick());
        assert_eq!(sup.effective_mode(ControlMode::Torque), ControlMode::Torque);
    }

    #[test]
    fn raw_input_timeout_trips_after_threshold() {
        let mut sup = Supervisor::new(1000, 20);
        for _ in 0..20 {
            assert!(!sup.tick());
        }
        assert!(sup.tick());
        assert_eq!(sup.input_counter(), 21);

        sup.input_sampled();
        assert!(!sup.tick());
    }
}
