// SPDX-License-Identifier: MIT
// © 2025–2026 Christopher Liu

//! ASCII debug output.
//!
//! [`Scope`] prints up to eight signed values per line in the `1:v1 2:v2 ... 8:v8\r\n` layout that
//! serial plotters understand. Any [`core::fmt::Write`] sink works; on the board that is the debug
//! [`crate::hw::Usart`].

use core::fmt::{self, Write};

pub const SCOPE_CHANNELS: usize = 8;

/// Eight-channel value snapshot.
#[derive(Copy, Clone, Debug, Default, PartialEq, Eq)]
pub struct Scope {
    values: [i16; SCOPE_CHANNELS],
}

impl Scope {
    pub const fn new() -> Self {
        Self {
            values: [0; SCOPE_CHANNELS],
        }
    }

    pub const fn from_values(values: [i16; SCOPE_CHANNELS]) -> Self {
        Self { values }
    }

    /// Set channel `ch` (zero based). Out-of-range channels are ignored.
    pub fn set(&mut self, ch: usize, value: i16) {
        if let Some(slot) = self.values.get_mut(ch) {
            *slot = value;
        }
    }

    pub fn values(&self) -> &[i16; SCOPE_CHANNELS] {
        &self.values
    }

    /// Emit one line.
    pub fn write_to<W: Write>(&self, w: &mut W) -> fmt::Result {
        for (i, v) in self.values.iter().enumerate() {
            if i > 0 {
                w.write_char(' ')?;
            }
            write!(w, "{}:{}", i + 1, v)?;
        }
        w.write_str("\r\n")
    }
}

/// Print a console message with CRLF.
pub fn console_log<W: Write>(w: &mut W, msg: &str) -> fmt::Result {
    w.write_str(msg)?;
    w.write_str("\r\n")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn scope_line_layout() {
        let mut s = Scope::new();
        s.set(0, 12);
        s.set(1, -340);
        s.set(7, 5);
        s.set(8, 99);

        let mut out = String::new();
        s.write_to(&mut out).unwrap();
        assert_eq!(out, "1:12 2:-340 3:0 4:0 5:0 6:0 7:0 8:5\r\n");
    }

    #[test]
    fn console_log_appends_crlf() {
        let mut out = String::new();
        console_log(&mut out, "-- Motors enabled --").unwrap();
        assert_eq!(out, "-- Motors enabled --\r\n");
    }
}
