// SPDX-License-Identifier: MIT
// © 2025–2026 Christopher Liu

//! # Hovercar Controller Firmware
//!
//! Control core for a dual-motor hoverboard mainboard driving a hovercar: serial and pedal inputs
//! in, speed/torque requests for the two motor controllers out. Everything except [`hw`] is plain
//! `no_std` logic that builds and tests on the host.
//!
//! ## Crate Structure
//!
//! | Module | Purpose |
//! | ------ | -------- |
//! | [`fixed`] | Fixed-point newtypes matching the motor controller's number formats |
//! | [`control`] | Deadband, rate limit, low-pass, mixer, multi-tap detection |
//! | [`assist`] | Cruise control, standstill hold, electric brake |
//! | [`protocol`] | Serial records, ring-buffer framing, validation |
//! | [`supervisor`] | Link timeouts and the safe state |
//! | [`sideboard`] | Sideboard photo sensors as buttons |
//! | [`calibration`] | Persisted calibration, power button, calibration procedures |
//! | [`drive`] | Per-tick orchestration of all of the above |
//! | [`config`] | Build constants and runtime configuration |
//! | [`debug`] | ASCII scope output |
//! | `hw` | MCU-level wrappers (with the `board` feature) |
//!
//! ## Getting Started
//!
//! Run the host tests:
//!
//! ```bash
//! cargo test
//! ```
//!
//! Flash the board:
//!
//! ```bash
//! cargo run --release --features board
//! ```
//!
//! ## License
//!
//! Licensed under the **MIT License**.
//! See the `LICENSE` file in the repository root for full terms.
//!
//! © 2025–2026 Christopher Liu

#![cfg_attr(not(test), no_std)]

pub mod logging;

pub mod assist;
pub mod calibration;
pub mod config;
pub mod control;
pub mod debug;
pub mod drive;
pub mod error;
pub mod fixed;
pub mod protocol;
pub mod sideboard;
pub mod supervisor;

#[cfg(feature = "board")]
pub mod hw;

pub use config::Config;
pub use drive::{DriveCore, MotorCommand, TickInputs};
pub use error::{ConfigError, StoreError};
