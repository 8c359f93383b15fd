//! # Receive Ring Buffer
//!
//! Fixed-capacity byte FIFO filled by a receive interrupt and drained by
//! foreground code. The capacity is a const generic and never changes at
//! run time.
//!
//! ## Overflow policy
//!
//! The producer never blocks. When a byte arrives while the buffer holds
//! `N` unread bytes, the oldest unread byte is overwritten, the read
//! position moves past it and `error_count` is incremented. Size the
//! buffer so this is rare.
//!
//! ## Positions
//!
//! `write_pos` and `read_pos` run over `0..2N` and index storage modulo
//! `N`. That keeps "full" (`available() == N`) distinct from "empty"
//! (`write_pos == read_pos`) without a separate length field.
//!
//! The buffer itself is plain data. The runtime keeps it in a
//! `critical_section::Mutex<RefCell<_>>`, so every access below happens
//! with interrupts masked.

use crate::counter::SaturatingCounter;
use crate::hal::RxPort;

pub struct RingBuffer<const N: usize> {
    data: [u8; N],
    write_pos: usize,
    read_pos: usize,
    error_count: u8,
}

impl<const N: usize> RingBuffer<N> {
    const WRAP: usize = {
        assert!(N > 0, "ring buffer capacity must be non-zero");
        assert!(N <= usize::MAX / 2, "ring buffer capacity too large");
        2 * N
    };

    pub const fn new() -> Self {
        let _ = Self::WRAP;
        Self {
            data: [0; N],
            write_pos: 0,
            read_pos: 0,
            error_count: 0,
        }
    }

    #[inline]
    fn advance(pos: usize) -> usize {
        (pos + 1) % Self::WRAP
    }

    #[inline]
    fn unread(&self) -> usize {
        (self.write_pos + Self::WRAP - self.read_pos) % Self::WRAP
    }

    /// Store a received byte.
    ///
    /// Returns `false` if the buffer was full and the oldest unread byte
    /// was overwritten.
    pub fn push(&mut self, byte: u8) -> bool {
        let fits = self.unread() < N;
        if !fits {
            self.read_pos = Self::advance(self.read_pos);
            self.error_count.bump();
        }
        self.data[self.write_pos % N] = byte;
        self.write_pos = Self::advance(self.write_pos);
        fits
    }

    /// Number of unread bytes.
    #[inline]
    pub fn available(&self) -> usize {
        self.unread()
    }

    /// Take the next unread byte, or `None` if the buffer is empty.
    pub fn pop(&mut self) -> Option<u8> {
        if self.write_pos == self.read_pos {
            return None;
        }
        let byte = self.data[self.read_pos % N];
        self.read_pos = Self::advance(self.read_pos);
        Some(byte)
    }

    /// Byte `offset` positions past the read position, without consuming.
    ///
    /// `None` if `offset >= available()`.
    pub fn peek(&self, offset: usize) -> Option<u8> {
        if offset >= self.unread() {
            return None;
        }
        Some(self.data[(self.read_pos + offset) % N])
    }

    /// Overflow count since start or the last flush.
    #[inline]
    pub fn error_count(&self) -> u8 {
        self.error_count
    }

    /// Discard everything, including a byte still latched in the receiver.
    ///
    /// The latched byte is drained first so that it does not show up as
    /// the first byte after the flush.
    pub fn flush<R: RxPort>(&mut self, rx: &mut R) {
        while rx.byte_pending() {
            self.data[0] = rx.read_byte();
        }
        self.read_pos = 0;
        self.write_pos = 0;
        self.error_count = 0;
    }
}

impl<const N: usize> Default for RingBuffer<N> {
    fn default() -> Self {
        Self::new()
    }
}

// ---------------------------------------------------------------------------
// Unit tests (host-only)
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;
    use crate::hal::mock::MockRx;

    #[test]
    fn test_fifo_order_and_empty() {
        let mut ring: RingBuffer<8> = RingBuffer::new();
        for b in [1, 2, 3] {
            assert!(ring.push(b));
        }

        assert_eq!(ring.available(), 3);
        assert_eq!(ring.pop(), Some(1));
        assert_eq!(ring.pop(), Some(2));
        assert_eq!(ring.pop(), Some(3));
        assert_eq!(ring.pop(), None);
        assert_eq!(ring.available(), 0);
    }

    #[test]
    fn test_available_tracks_interleaved_push_pop() {
        let mut ring: RingBuffer<5> = RingBuffer::new();
        let mut expected = std::collections::VecDeque::new();
        let mut next = 0u8;

        // Enough rounds to wrap the positions several times
        for round in 0..40 {
            let room = 5 - expected.len();
            for _ in 0..(round % 5).min(room) {
                ring.push(next);
                expected.push_back(next);
                next = next.wrapping_add(1);
            }
            assert_eq!(ring.available(), expected.len());
            for _ in 0..(round % 3) {
                assert_eq!(ring.pop(), expected.pop_front());
            }
        }
        assert_eq!(ring.error_count(), 0);
    }

    #[test]
    fn test_overflow_overwrites_oldest() {
        let mut ring: RingBuffer<4> = RingBuffer::new();
        for b in 1..=4 {
            assert!(ring.push(b));
        }
        assert!(!ring.push(5));
        assert!(!ring.push(6));

        assert_eq!(ring.available(), 4);
        assert_eq!(ring.error_count(), 2);
        // 1 and 2 were overwritten
        assert_eq!(ring.peek(0), Some(3));
        assert_eq!(ring.pop(), Some(3));
        assert_eq!(ring.pop(), Some(4));
        assert_eq!(ring.pop(), Some(5));
        assert_eq!(ring.pop(), Some(6));
        assert_eq!(ring.pop(), None);
    }

    #[test]
    fn test_overflow_error_count_saturates() {
        let mut ring: RingBuffer<2> = RingBuffer::new();
        for b in 0..600u16 {
            ring.push(b as u8);
        }
        assert_eq!(ring.error_count(), u8::MAX);
        assert_eq!(ring.available(), 2);
    }

    #[test]
    fn test_peek_matches_pop_without_consuming() {
        let mut ring: RingBuffer<4> = RingBuffer::new();
        // Move the read position so peeks cross the storage boundary
        for b in [9, 9, 9] {
            ring.push(b);
        }
        for _ in 0..3 {
            ring.pop();
        }
        for b in [10, 20, 30, 40] {
            ring.push(b);
        }

        assert_eq!(ring.peek(0), Some(10));
        assert_eq!(ring.peek(2), Some(30));
        assert_eq!(ring.peek(3), Some(40));
        assert_eq!(ring.peek(4), None);
        assert_eq!(ring.available(), 4);

        assert_eq!(ring.pop(), Some(10));
        assert_eq!(ring.pop(), Some(20));
        assert_eq!(ring.peek(0), Some(30));
        assert_eq!(ring.peek(2), None);
    }

    #[test]
    fn test_flush_drains_receiver_and_resets() {
        let mut rx = MockRx::new();
        let mut ring: RingBuffer<2> = RingBuffer::new();
        for b in [1, 2, 3] {
            ring.push(b);
        }
        rx.latch(0x55);
        rx.latch(0x66);

        assert_eq!(ring.error_count(), 1);
        ring.flush(&mut rx);
        assert_eq!(ring.available(), 0);
        assert_eq!(ring.error_count(), 0);
        assert_eq!(ring.pop(), None);
        assert_eq!(rx.remaining(), 0);
    }
}
