// SPDX-License-Identifier: MIT
// © 2025–2026 Christopher Liu

//! USART wrappers.
//!
//! - [`Usart`]: blocking TX for the ASCII debug terminal and scope output.
//! - [`RxLink`]: receive side of a command link, moving bytes into an [`RxRing`] from the RX
//!   interrupt.
//!
//! Note: When using `writeln!`, be sure to include `\r` (CR) in the format string to ensure correct
//! line endings on the terminal.
//!
//! To access the terminal on the host machine, connect to the debug USB port and use
//! ```text
//! $ screen /dev/tty.usbmodem* <baud_rate>
//! ```

use core::fmt;
use nb::block;

use stm32f7xx_hal::{
    prelude::*,
    serial::{Event, Instance, Pins, Rx, Serial, Tx},
};

use crate::debug::{console_log, Scope};
use crate::protocol::RxRing;

pub struct Usart<U: Instance> {
    tx: Tx<U>,
}

impl<U: Instance> Usart<U> {
    /// Take the TX half of `serial`; RX is dropped.
    pub fn new<PINS: Pins<U>>(serial: Serial<U, PINS>) -> Self {
        let (tx, _rx) = serial.split();
        Self { tx }
    }

    #[inline]
    pub fn write_byte(&mut self, b: u8) {
        let _ = block!(self.tx.write(b));
    }

    pub fn write_str(&mut self, s: &str) {
        for &b in s.as_bytes() {
            self.write_byte(b);
        }
    }

    /// Write string and CRLF terminator.
    #[inline]
    pub fn println(&mut self, s: &str) {
        let _ = console_log(self, s);
    }

    /// One scope line.
    pub fn scope(&mut self, scope: &Scope) {
        let _ = scope.write_to(self);
    }

    /// Block until the hardware TX FIFO/drain is flushed.
    #[inline]
    pub fn flush(&mut self) {
        let _ = block!(self.tx.flush());
    }
}

impl<U: Instance> fmt::Write for Usart<U> {
    fn write_str(&mut self, s: &str) -> fmt::Result {
        Usart::write_str(self, s);
        Ok(())
    }
}

/// Receive half of a command link.
pub struct RxLink<U: Instance> {
    rx: Rx<U>,
}

impl<U: Instance> RxLink<U> {
    /// Split `serial`, enable the RXNE interrupt and keep the RX half. TX is dropped.
    pub fn new<PINS: Pins<U>>(mut serial: Serial<U, PINS>) -> Self {
        serial.listen(Event::Rxne);
        let (_tx, rx) = serial.split();
        Self { rx }
    }

    /// Drain every byte the peripheral holds into `ring`. Returns the number moved.
    ///
    /// Overrun and framing errors drop the byte; the frame validator rejects whatever record it
    /// belonged to.
    pub fn drain<const N: usize>(&mut self, ring: &mut RxRing<N>) -> usize {
        let mut n = 0;
        loop {
            match self.rx.read() {
                Ok(b) => {
                    ring.push(b);
                    n += 1;
                }
                Err(nb::Error::WouldBlock) => break,
                Err(nb::Error::Other(_)) => continue,
            }
        }
        n
    }
}
