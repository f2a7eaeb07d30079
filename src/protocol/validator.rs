// SPDX-License-Identifier: MIT
// © 2025–2026 Christopher Liu

//! Command validation and the active record of each link.
//!
//! A decoded record lands in `raw` first. Only if its marker and checksum match is it copied to
//! `active` and the owning channel's timeout reset; otherwise nothing changes and the previous
//! command stays in force. Bad frames are expected on a noisy cable and are dropped silently.

use crate::control::RawChannel;
use crate::protocol::frame::FrameDecoder;
use crate::protocol::messages::{CommandFrame, Frame, IbusCommand, SerialCommand};
use crate::supervisor::{ChannelId, Supervisor};

/// Largest record any link decodes.
pub const MAX_FRAME_LEN: usize = 32;

/// Wire format of the control link.
#[derive(Copy, Clone, Debug, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum Protocol {
    /// 8-byte steer/speed record with XOR checksum.
    Simple,
    /// 32-byte iBUS servo frame.
    Ibus,
}

/// Decoder, validator and active record of one serial channel.
#[derive(Clone, Debug)]
pub struct SerialLink<F: Frame> {
    channel: ChannelId,
    decoder: FrameDecoder,
    scratch: [u8; MAX_FRAME_LEN],
    raw: F,
    active: F,
}

impl<F: Frame> SerialLink<F> {
    pub fn new(channel: ChannelId) -> Self {
        Self {
            channel,
            decoder: FrameDecoder::new(),
            scratch: [0; MAX_FRAME_LEN],
            raw: F::default(),
            active: F::default(),
        }
    }

    #[inline]
    pub fn channel(&self) -> ChannelId {
        self.channel
    }

    /// Last record that passed validation.
    #[inline]
    pub fn active(&self) -> &F {
        &self.active
    }

    /// Last decoded record, valid or not.
    #[inline]
    pub fn raw(&self) -> &F {
        &self.raw
    }

    /// Look for a new record in `ring` and validate it. Returns `true` if `active` was replaced.
    pub fn poll(&mut self, ring: &[u8], pos: usize, supervisor: &mut Supervisor) -> bool {
        let Some(scratch) = self.scratch.get_mut(..F::LEN) else {
            return false;
        };
        if !self.decoder.poll(ring, pos, scratch) {
            return false;
        }
        match F::decode(scratch) {
            Some(candidate) => self.validate(candidate, supervisor),
            None => false,
        }
    }

    /// Adopt `candidate` if it checks out.
    pub fn validate(&mut self, candidate: F, supervisor: &mut Supervisor) -> bool {
        self.raw = candidate;
        if !candidate.is_valid() {
            crate::log_debug!("{:?} dropped invalid record", self.channel);
            return false;
        }
        self.active = candidate;
        supervisor.accept(self.channel);
        true
    }
}

/// The control link in whichever protocol the board is configured for.
#[derive(Clone, Debug)]
pub enum ControlLink {
    Simple(SerialLink<SerialCommand>),
    Ibus(SerialLink<IbusCommand>),
}

impl ControlLink {
    pub fn new(protocol: Protocol, channel: ChannelId) -> Self {
        match protocol {
            Protocol::Simple => ControlLink::Simple(SerialLink::new(channel)),
            Protocol::Ibus => ControlLink::Ibus(SerialLink::new(channel)),
        }
    }

    pub fn channel(&self) -> ChannelId {
        match self {
            ControlLink::Simple(link) => link.channel(),
            ControlLink::Ibus(link) => link.channel(),
        }
    }

    pub fn poll(&mut self, ring: &[u8], pos: usize, supervisor: &mut Supervisor) -> bool {
        match self {
            ControlLink::Simple(link) => link.poll(ring, pos, supervisor),
            ControlLink::Ibus(link) => link.poll(ring, pos, supervisor),
        }
    }

    /// Inputs carried by the active record.
    pub fn inputs(&self) -> RawChannel {
        match self {
            ControlLink::Simple(link) => link.active().inputs(),
            ControlLink::Ibus(link) => link.active().inputs(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::protocol::frame::RxRing;
    use crate::protocol::messages::SideboardFeedback;

    fn supervisor() -> Supervisor {
        Supervisor::new(160, 20).with_channel(ChannelId::Usart3)
    }

    #[test]
    fn valid_record_replaces_active_and_resets_timeout() {
        let mut sup = supervisor();
        for _ in 0..10 {
            sup.tick();
        }
        let mut link = SerialLink::<SerialCommand>::new(ChannelId::Usart3);
        assert!(link.validate(SerialCommand::new(10, 20), &mut sup));
        assert_eq!(link.active().steer, 10);
        sup.tick();
        assert_eq!(sup.channel(ChannelId::Usart3).counter(), 0);
    }

    #[test]
    fn invalid_record_keeps_previous_active() {
        let mut sup = supervisor();
        let mut link = SerialLink::<SerialCommand>::new(ChannelId::Usart3);
        link.validate(SerialCommand::new(10, 20), &mut sup);
        sup.tick();
        sup.tick();

        let mut bad = SerialCommand::new(99, 99);
        bad.checksum ^= 0x0100;
        assert!(!link.validate(bad, &mut sup));
        assert_eq!(link.active(), &SerialCommand::new(10, 20));
        assert_eq!(link.raw(), &bad);
        sup.tick();
        assert_eq!(sup.channel(ChannelId::Usart3).counter(), 2);
    }

    #[test]
    fn poll_decodes_from_ring() {
        let mut sup = supervisor();
        let mut ring = RxRing::<64>::new();
        let mut link = ControlLink::new(Protocol::Simple, ChannelId::Usart3);

        let mut buf = [0u8; 8];
        SerialCommand::new(-300, 700).encode(&mut buf);
        ring.extend(&buf);
        assert!(link.poll(ring.as_slice(), ring.write_pos(), &mut sup));
        assert_eq!(link.inputs(), RawChannel { input1: -300, input2: 700 });

        // Nothing new: still the same command, no second acceptance.
        assert!(!link.poll(ring.as_slice(), ring.write_pos(), &mut sup));
        assert_eq!(link.inputs(), RawChannel { input1: -300, input2: 700 });
    }

    #[test]
    fn partial_frame_is_skipped_then_next_window_decodes() {
        let mut sup = supervisor();
        let mut ring = RxRing::<64>::new();
        let mut link = SerialLink::<SerialCommand>::new(ChannelId::Usart3);

        ring.extend(&[0x11, 0x22, 0x33]);
        assert!(!link.poll(ring.as_slice(), ring.write_pos(), &mut sup));

        let mut buf = [0u8; 8];
        SerialCommand::new(1, 2).encode(&mut buf);
        ring.extend(&buf);
        assert!(link.poll(ring.as_slice(), ring.write_pos(), &mut sup));
        assert_eq!(link.active().speed, 2);
    }

    #[test]
    fn ibus_link_maps_channels() {
        let mut sup = supervisor();
        let mut ring = RxRing::<64>::new();
        let mut link = ControlLink::new(Protocol::Ibus, ChannelId::Usart3);
        assert_eq!(link.inputs(), RawChannel::default());

        let mut channels = [1500u16; 14];
        channels[1] = 1750;
        let mut buf = [0u8; 32];
        IbusCommand::new(channels).encode(&mut buf);
        ring.extend(&buf);
        assert!(link.poll(ring.as_slice(), ring.write_pos(), &mut sup));
        assert_eq!(link.inputs(), RawChannel { input1: 0, input2: 500 });
    }

    #[test]
    fn sideboard_link_resets_its_own_channel() {
        let mut sup = Supervisor::new(3, 20).with_channel(ChannelId::Usart2);
        let mut link = SerialLink::<SideboardFeedback>::new(ChannelId::Usart2);
        for _ in 0..5 {
            sup.tick();
        }
        assert!(sup.channel(ChannelId::Usart2).is_timed_out());
        link.validate(SideboardFeedback::new(0, 0, 0, 0, 1), &mut sup);
        assert!(!sup.channel(ChannelId::Usart2).is_timed_out());
    }
}
