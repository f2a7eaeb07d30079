// SPDX-License-Identifier: MIT
// © 2025–2026 Christopher Liu

//! Record extraction from a circular receive buffer.
//!
//! The receiver (DMA on the board, [`RxRing`] on the host) writes bytes into a ring and only
//! publishes its write offset. Once per tick [`FrameDecoder::poll`] compares that offset with the
//! one seen on the previous tick: if exactly one record's worth of bytes arrived, it is copied out
//! contiguously, otherwise the interval is dropped and decoding resumes on the next complete
//! window. No history is kept and the byte contents are never inspected here.

/// Offset tracker for one receive ring.
#[derive(Copy, Clone, Debug, Default)]
pub struct FrameDecoder {
    old_pos: usize,
}

impl FrameDecoder {
    pub const fn new() -> Self {
        Self { old_pos: 0 }
    }

    /// Start from a known offset (e.g. the ring's position when reception was enabled).
    pub const fn at(old_pos: usize) -> Self {
        Self { old_pos }
    }

    #[inline]
    pub fn old_pos(&self) -> usize {
        self.old_pos
    }

    /// Check the ring for one new record of `out.len()` bytes.
    ///
    /// `pos` is the receiver's current write offset in `[0, ring.len()]`. Returns `true` when
    /// `out` was filled with a new record.
    pub fn poll(&mut self, ring: &[u8], pos: usize, out: &mut [u8]) -> bool {
        let len = ring.len();
        let rec = out.len();

        if pos > len {
            crate::log_warn!("rx offset {} beyond ring of {}", pos, len);
            return false;
        }

        let old = if self.old_pos >= len { 0 } else { self.old_pos };
        let mut got = false;

        if rec != 0 && rec <= len && pos != old {
            if pos > old && pos - old == rec {
                // Linear
                out.copy_from_slice(&ring[old..pos]);
                got = true;
            } else if len - old + pos == rec {
                // Wrapped: tail first, then head
                let tail = len - old;
                out[..tail].copy_from_slice(&ring[old..]);
                if pos > 0 {
                    out[tail..].copy_from_slice(&ring[..pos]);
                }
                got = true;
            }
        }

        self.old_pos = if pos == len { 0 } else { pos };
        got
    }
}

/// Circular receive buffer, filled a byte at a time by the RX interrupt (or a test).
#[derive(Clone, Debug)]
pub struct RxRing<const N: usize> {
    buf: [u8; N],
    pos: usize,
}

impl<const N: usize> Default for RxRing<N> {
    fn default() -> Self {
        Self::new()
    }
}

impl<const N: usize> RxRing<N> {
    pub const fn new() -> Self {
        Self { buf: [0; N], pos: 0 }
    }

    /// Place the write offset, e.g. to line up a test scenario.
    pub fn seek(&mut self, pos: usize) {
        self.pos = if N == 0 { 0 } else { pos % N };
    }

    pub fn push(&mut self, byte: u8) {
        if N == 0 {
            return;
        }
        self.buf[self.pos] = byte;
        self.pos = (self.pos + 1) % N;
    }

    pub fn extend(&mut self, bytes: &[u8]) {
        for &b in bytes {
            self.push(b);
        }
    }

    #[inline]
    pub fn as_slice(&self) -> &[u8] {
        &self.buf
    }

    /// Offset the next byte will be written to.
    #[inline]
    pub fn write_pos(&self) -> usize {
        self.pos
    }
}
