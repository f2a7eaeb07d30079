// SPDX-License-Identifier: MIT
// © 2025–2026 Christopher Liu

//! MCU-level wrappers. Built only with the `board` feature.

pub mod usart;

pub use usart::{RxLink, Usart};
