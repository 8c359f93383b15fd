//! # Hardware Seams
//!
//! The runtime core touches hardware only through these traits. A board
//! support layer implements them on top of its UART and timer registers;
//! register initialization (baud divisors, clock prescalers, pin muxing)
//! stays on the board side.

/// Receive error indicators latched together with a received byte.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub struct LineErrors {
    /// Stop bit not found where expected.
    pub framing: bool,
    /// Parity mismatch.
    pub parity: bool,
    /// Receiver data overrun (a byte was lost in hardware).
    pub overrun: bool,
}

impl LineErrors {
    pub const NONE: Self = Self {
        framing: false,
        parity: false,
        overrun: false,
    };

    #[inline]
    pub const fn any(&self) -> bool {
        self.framing || self.parity || self.overrun
    }
}

/// Receive side of a UART-like transceiver.
pub trait RxPort {
    /// A received byte is waiting in the data register.
    fn byte_pending(&self) -> bool;

    /// Error flags latched with the byte currently in the data register.
    /// Read these before [`RxPort::read_byte`] releases the byte.
    fn line_errors(&self) -> LineErrors;

    /// Take the byte from the data register.
    fn read_byte(&mut self) -> u8;
}

/// Transmit side of a UART-like transceiver.
pub trait TxPort {
    /// The transmit data register can accept another byte.
    fn is_ready(&self) -> bool;

    fn write_byte(&mut self, byte: u8);
}

/// 16-bit free-running timer with a compare-match interrupt, used to
/// measure silence between received bytes.
pub trait GapTimer {
    /// The timer is counting (it is stopped by the compare-match timeout).
    fn is_running(&self) -> bool;

    /// Ticks elapsed since the last [`GapTimer::restart`].
    fn count(&self) -> u16;

    /// Zero the counter and start it.
    fn restart(&mut self);

    /// Stop counting.
    fn stop(&mut self);

    /// Program the compare-match value that raises the timeout interrupt.
    fn set_compare(&mut self, ticks: u16);
}

// ---------------------------------------------------------------------------
// Host-side mocks
// ---------------------------------------------------------------------------

#[cfg(test)]
pub(crate) mod mock {
    use core::cell::Cell;
    use std::collections::VecDeque;

    use super::{GapTimer, LineErrors, RxPort, TxPort};
    use crate::sync::InterruptControl;

    /// Global interrupt flag that records how often it was re-enabled.
    pub struct MockIrq {
        enabled: Cell<bool>,
        enables: Cell<u32>,
    }

    impl MockIrq {
        pub fn enabled() -> Self {
            Self {
                enabled: Cell::new(true),
                enables: Cell::new(0),
            }
        }

        /// Interrupt handler context: the CPU masked interrupts on entry.
        pub fn disabled() -> Self {
            Self {
                enabled: Cell::new(false),
                enables: Cell::new(0),
            }
        }

        pub fn enable_count(&self) -> u32 {
            self.enables.get()
        }
    }

    impl InterruptControl for MockIrq {
        fn are_enabled(&self) -> bool {
            self.enabled.get()
        }

        fn disable(&self) {
            self.enabled.set(false);
        }

        unsafe fn enable(&self) {
            self.enabled.set(true);
            self.enables.set(self.enables.get() + 1);
        }
    }

    /// Receiver with a queue of latched bytes.
    #[derive(Default)]
    pub struct MockRx {
        latched: VecDeque<(u8, LineErrors)>,
    }

    impl MockRx {
        pub fn new() -> Self {
            Self::default()
        }

        pub fn latch(&mut self, byte: u8) {
            self.latched.push_back((byte, LineErrors::NONE));
        }

        pub fn latch_with_errors(&mut self, byte: u8, errors: LineErrors) {
            self.latched.push_back((byte, errors));
        }

        pub fn remaining(&self) -> usize {
            self.latched.len()
        }
    }

    impl RxPort for MockRx {
        fn byte_pending(&self) -> bool {
            !self.latched.is_empty()
        }

        fn line_errors(&self) -> LineErrors {
            self.latched
                .front()
                .map(|&(_, errors)| errors)
                .unwrap_or(LineErrors::NONE)
        }

        fn read_byte(&mut self) -> u8 {
            self.latched.pop_front().map(|(byte, _)| byte).unwrap_or(0)
        }
    }

    /// Transmitter that reports busy for a fixed number of polls per byte.
    pub struct MockTx {
        busy_polls: u32,
        polls_left: Cell<u32>,
        pub written: Vec<u8>,
    }

    impl MockTx {
        pub fn new(busy_polls: u32) -> Self {
            Self {
                busy_polls,
                polls_left: Cell::new(busy_polls),
                written: Vec::new(),
            }
        }
    }

    impl TxPort for MockTx {
        fn is_ready(&self) -> bool {
            match self.polls_left.get() {
                0 => true,
                n => {
                    self.polls_left.set(n - 1);
                    false
                }
            }
        }

        fn write_byte(&mut self, byte: u8) {
            assert_eq!(self.polls_left.get(), 0, "write while transmitter busy");
            self.written.push(byte);
            self.polls_left.set(self.busy_polls);
        }
    }

    /// Gap timer whose elapsed count is set by the test.
    pub struct MockTimer {
        pub running: bool,
        pub count: u16,
        pub compare: u16,
        pub restarts: u32,
    }

    impl MockTimer {
        pub fn stopped() -> Self {
            Self {
                running: false,
                count: 0,
                compare: u16::MAX,
                restarts: 0,
            }
        }

        /// Let `ticks` elapse on a running timer.
        pub fn elapse(&mut self, ticks: u16) {
            if self.running {
                self.count = self.count.saturating_add(ticks);
            }
        }
    }

    impl GapTimer for MockTimer {
        fn is_running(&self) -> bool {
            self.running
        }

        fn count(&self) -> u16 {
            self.count
        }

        fn restart(&mut self) {
            self.count = 0;
            self.running = true;
            self.restarts += 1;
        }

        fn stop(&mut self) {
            self.running = false;
        }

        fn set_compare(&mut self, ticks: u16) {
            self.compare = ticks;
        }
    }
}
