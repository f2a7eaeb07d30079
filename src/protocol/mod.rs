// SPDX-License-Identifier: MIT
// © 2025–2026 Christopher Liu

//! # Serial Protocol
//!
//! - [`messages`] - Wire records and their checksums.
//! - [`frame`] - Record extraction from a circular receive buffer.
//! - [`validator`] - Per-channel validation and active command.

pub mod frame;
pub mod messages;
pub mod validator;

pub use frame::{FrameDecoder, RxRing};
pub use messages::{CommandFrame, Frame, IbusCommand, SerialCommand, SideboardFeedback};
pub use validator::{ControlLink, Protocol, SerialLink};
