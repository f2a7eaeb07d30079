// SPDX-License-Identifier: MIT
// © 2025–2026 Christopher Liu

//! Control link end to end: ring buffer in, wheel commands out.

use hovercar::config::{InputSource, Variant, SERIAL_BUFFER_SIZE, SERIAL_TIMEOUT};
use hovercar::control::{DeadbandProfile, InputType, MixerKind, WheelPair};
use hovercar::protocol::{Frame, IbusCommand, Protocol, RxRing, SerialCommand};
use hovercar::supervisor::{ChannelId, ControlMode};
use hovercar::{Config, DriveCore, TickInputs};

fn config(protocol: Protocol) -> Config {
    let centered = DeadbandProfile::new(InputType::CenterResting, -1000, 0, 1000);
    Config {
        input_source: InputSource::Serial {
            protocol,
            channel: ChannelId::Usart3,
        },
        variant: Variant::Standard,
        mixer: MixerKind::Differential,
        input1: centered,
        input2: centered,
        cruise_control: false,
        ..Config::default()
    }
}

fn encode(steer: i16, speed: i16) -> [u8; SerialCommand::LEN] {
    let mut buf = [0u8; SerialCommand::LEN];
    SerialCommand::new(steer, speed).encode(&mut buf).unwrap();
    buf
}

#[test]
fn record_split_across_ring_end_is_decoded() {
    let mut core = DriveCore::new(config(Protocol::Simple)).unwrap();
    let mut ring = RxRing::<SERIAL_BUFFER_SIZE>::new();

    // Bring the decoder to offset 60 with no complete record in between
    ring.seek(60);
    assert!(!core.poll_control(ring.as_slice(), ring.write_pos()));

    // 4 bytes at 60..64, 4 bytes at 0..4
    ring.extend(&encode(100, -50));
    assert_eq!(ring.write_pos(), 4);
    assert!(core.poll_control(ring.as_slice(), ring.write_pos()));

    core.tick(&TickInputs::default());
    assert_eq!(core.supervisor().channel(ChannelId::Usart3).counter(), 0);
    assert!(!core.supervisor().is_unsafe());
    assert_eq!(core.raw().input1, 100);
    assert_eq!(core.raw().input2, -50);
}

#[test]
fn corrupted_record_is_ignored() {
    let mut core = DriveCore::new(config(Protocol::Simple)).unwrap();
    let mut ring = RxRing::<SERIAL_BUFFER_SIZE>::new();

    ring.extend(&encode(0, 300));
    assert!(core.poll_control(ring.as_slice(), ring.write_pos()));

    let mut bad = encode(0, -900);
    bad[4] ^= 0x01;
    ring.extend(&bad);
    assert!(!core.poll_control(ring.as_slice(), ring.write_pos()));

    core.tick(&TickInputs::default());
    assert_eq!(core.raw().input2, 300);
}

#[test]
fn burst_of_partial_data_is_dropped() {
    let mut core = DriveCore::new(config(Protocol::Simple)).unwrap();
    let mut ring = RxRing::<SERIAL_BUFFER_SIZE>::new();

    let rec = encode(0, 300);
    ring.extend(&rec[..5]);
    assert!(!core.poll_control(ring.as_slice(), ring.write_pos()));
    ring.extend(&rec[5..]);
    assert!(!core.poll_control(ring.as_slice(), ring.write_pos()));

    // Resynchronised on the next whole record
    ring.extend(&encode(0, 200));
    assert!(core.poll_control(ring.as_slice(), ring.write_pos()));
    core.tick(&TickInputs::default());
    assert_eq!(core.raw().input2, 200);
}

#[test]
fn silent_link_enters_and_leaves_safe_state() {
    let mut core = DriveCore::new(config(Protocol::Simple)).unwrap();
    let mut ring = RxRing::<SERIAL_BUFFER_SIZE>::new();

    for _ in 0..100 {
        ring.extend(&encode(0, 600));
        core.poll_control(ring.as_slice(), ring.write_pos());
        core.tick(&TickInputs::default());
    }
    assert!(!core.supervisor().is_unsafe());

    for i in 1..=SERIAL_TIMEOUT {
        let out = core.tick(&TickInputs::default());
        if i < SERIAL_TIMEOUT {
            assert!(!core.supervisor().is_unsafe(), "tripped early at {}", i);
        } else {
            assert_eq!(out.wheels, WheelPair::ZERO);
            assert_eq!(out.mode, ControlMode::Open);
        }
    }
    assert!(core.supervisor().channel(ChannelId::Usart3).is_timed_out());
    assert_eq!(core.commands(), (0, 0));

    // Stays safe while silent
    for _ in 0..50 {
        let out = core.tick(&TickInputs::default());
        assert_eq!(out.wheels, WheelPair::ZERO);
    }

    ring.extend(&encode(0, 600));
    assert!(core.poll_control(ring.as_slice(), ring.write_pos()));
    let out = core.tick(&TickInputs::default());
    assert!(!core.supervisor().is_unsafe());
    assert_eq!(out.mode, ControlMode::Torque);
}

#[test]
fn ibus_channels_drive_the_wheels() {
    let mut core = DriveCore::new(config(Protocol::Ibus)).unwrap();
    let mut ring = RxRing::<SERIAL_BUFFER_SIZE>::new();

    let mut channels = [1500_u16; 14];
    channels[1] = 1700;
    let mut buf = [0u8; IbusCommand::LEN];
    IbusCommand::new(channels).encode(&mut buf).unwrap();

    let mut out = core.tick(&TickInputs::default());
    for _ in 0..200 {
        ring.extend(&buf);
        core.poll_control(ring.as_slice(), ring.write_pos());
        out = core.tick(&TickInputs::default());
    }
    assert_eq!(core.raw().input2, 400);
    assert!(out.wheels.left > 350 && out.wheels.left <= 400);
}
