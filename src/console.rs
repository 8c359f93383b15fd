//! # Console Channel
//!
//! Output and control helpers for the console serial link.
//!
//! - [`Console`] is a blocking `core::fmt::Write` sink. Each byte waits for
//!   the transmitter to become ready; the wait is bounded by the bit rate,
//!   never by a consumer, so there is no transmit buffer.
//! - [`RebootSequence`] watches received console bytes for the two-byte
//!   `@R` sequence that asks the node to reset itself.

use core::fmt;

use crate::hal::TxPort;

pub struct Console<T> {
    tx: T,
}

impl<T: TxPort> Console<T> {
    pub const fn new(tx: T) -> Self {
        Self { tx }
    }

    /// Busy-wait for the transmitter, then send one byte.
    pub fn write_byte(&mut self, byte: u8) {
        while !self.tx.is_ready() {
            core::hint::spin_loop();
        }
        self.tx.write_byte(byte);
    }

    pub fn write_bytes(&mut self, bytes: &[u8]) {
        for &byte in bytes {
            self.write_byte(byte);
        }
    }

    /// Terminal line break, carriage return last.
    pub fn newline(&mut self) {
        self.write_bytes(b"\n\r");
    }

    pub fn into_inner(self) -> T {
        self.tx
    }
}

impl<T: TxPort> fmt::Write for Console<T> {
    fn write_str(&mut self, s: &str) -> fmt::Result {
        self.write_bytes(s.as_bytes());
        Ok(())
    }
}

/// Detector for the console reset request `@R`.
#[derive(Debug, Default)]
pub struct RebootSequence {
    last: u8,
}

impl RebootSequence {
    pub const LEADER: u8 = b'@';
    pub const TRIGGER: u8 = b'R';

    pub const fn new() -> Self {
        Self { last: 0 }
    }

    /// Feed one received byte; `true` when it completes the sequence.
    pub fn feed(&mut self, byte: u8) -> bool {
        let hit = self.last == Self::LEADER && byte == Self::TRIGGER;
        self.last = byte;
        hit
    }
}

// ---------------------------------------------------------------------------
// Unit tests (host-only)
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;
    use crate::hal::mock::MockTx;
    use core::fmt::Write;

    #[test]
    fn test_write_waits_for_ready() {
        let mut console = Console::new(MockTx::new(3));
        write!(console, "id={}", 7).unwrap();
        console.newline();
        assert_eq!(console.into_inner().written, b"id=7\n\r");
    }

    #[test]
    fn test_reboot_sequence() {
        let mut seq = RebootSequence::new();
        assert!(!seq.feed(b'R'));
        assert!(!seq.feed(b'@'));
        assert!(seq.feed(b'R'));
        // Needs a fresh leader
        assert!(!seq.feed(b'R'));
        assert!(!seq.feed(b'@'));
        assert!(!seq.feed(b'x'));
        assert!(!seq.feed(b'R'));
        // Repeated leaders still arm it
        assert!(!seq.feed(b'@'));
        assert!(!seq.feed(b'@'));
        assert!(seq.feed(b'R'));
    }
}
