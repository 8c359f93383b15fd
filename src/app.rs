//! # Application Callbacks
//!
//! The contract between the runtime core and the gateway application. The
//! core guarantees when and in which order these run; it has no opinion on
//! what they do. Every method defaults to doing nothing.
//!
//! | Hook | Context | When |
//! |------|---------|------|
//! | `handle_uart0_byte` | console RX interrupt | after the byte is buffered |
//! | `handle_uart1_byte` | bus RX interrupt | every byte, with its frame status |
//! | `handle_uart1_timeout` | gap timer interrupt | bus silent for an inter-frame gap |
//! | `task_1ms` … `task_128ms` | tick interrupt, interrupts enabled | see [`crate::scheduler`] |
//!
//! Task hooks must finish well within one base tick; a hook that runs
//! long shows up as scheduler overruns, not as an error.
//!
//! Hooks take `&self`. A hook may be preempted by another interrupt that
//! runs a different hook on the same application, so any state an
//! application keeps goes behind its own cells or atomics. Hooks may call
//! back into the runtime (set an event, read the console buffer); the
//! runtime holds no borrow of its own state while a hook runs.

use crate::frame::RxStatus;

pub trait Application {
    fn handle_uart0_byte(&self, _byte: u8) {}

    fn handle_uart1_byte(&self, _byte: u8, _status: RxStatus) {}

    fn handle_uart1_timeout(&self) {}

    fn task_1ms(&self) {}

    fn task_2ms(&self) {}

    fn task_4ms(&self) {}

    fn task_8ms(&self) {}

    fn task_16ms(&self) {}

    fn task_32ms(&self) {}

    fn task_64ms(&self) {}

    fn task_128ms(&self) {}
}
