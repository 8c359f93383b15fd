//! # Runtime Context
//!
//! [`Runtime`] owns every piece of state the interrupt handlers and the
//! foreground share. There is exactly one per node; on target it is the
//! global instance in `kernel`, in tests it is a local value.
//!
//! ## Access rules
//!
//! | State | Written by | Access |
//! |-------|------------|--------|
//! | console ring buffer | console RX interrupt | `Mutex<RefCell<_>>`, token required |
//! | reboot sequence | console RX interrupt | `Mutex<RefCell<_>>`, token required |
//! | bus detector | bus RX and gap timer interrupts | `Mutex<RefCell<_>>`, token required |
//! | event flags | any context | set/clear with a token, poll anywhere |
//! | scheduler | tick interrupt | atomics, read-only snapshots |
//!
//! Every method takes `&self`. Interrupt entry points open a short atomic
//! section for their bookkeeping and leave it before calling the
//! application, so a hook can call straight back into the runtime.
//!
//! Methods ending in `_interrupt` are the handler entry points and must
//! only be called from the matching interrupt. Everything else is
//! foreground API.

use core::cell::RefCell;

use critical_section::Mutex;

use crate::app::Application;
use crate::console::RebootSequence;
use crate::event::{Event, EventFlags};
use crate::frame::{ChannelStats, ChannelTiming, FrameGapDetector, RxStatus};
use crate::hal::{GapTimer, RxPort};
use crate::ring::RingBuffer;
use crate::scheduler::{Dispatch, TaskScheduler};
use crate::sync::{AtomicSection, CriticalSection, InterruptControl};

/// What the console receive handler did with a byte.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum ConsoleRx {
    /// Buffered and handed to the application.
    Delivered,
    /// Buffered, overwriting the oldest unread byte, and handed on.
    Overflowed,
    /// The byte completed the reset sequence; it was not delivered. The
    /// caller is expected to reset the node.
    RebootRequested,
}

pub struct Runtime<I, const N: usize> {
    guard: AtomicSection<I>,
    uart0_rx: Mutex<RefCell<RingBuffer<N>>>,
    reboot: Mutex<RefCell<RebootSequence>>,
    events: EventFlags,
    uart1: Mutex<RefCell<FrameGapDetector>>,
    scheduler: TaskScheduler,
}

impl<I: InterruptControl, const N: usize> Runtime<I, N> {
    pub const fn new(irq: I, uart1_timing: ChannelTiming) -> Self {
        Self {
            guard: AtomicSection::new(irq),
            uart0_rx: Mutex::new(RefCell::new(RingBuffer::new())),
            reboot: Mutex::new(RefCell::new(RebootSequence::new())),
            events: EventFlags::new(),
            uart1: Mutex::new(RefCell::new(FrameGapDetector::new(uart1_timing))),
            scheduler: TaskScheduler::new(),
        }
    }

    /// Run `f` with interrupts masked.
    #[inline]
    pub fn atomic<R>(&self, f: impl FnOnce(CriticalSection<'_>) -> R) -> R {
        self.guard.free(f)
    }

    // -----------------------------------------------------------------------
    // Interrupt entry points
    // -----------------------------------------------------------------------

    /// Console (UART0) receive interrupt.
    pub fn uart0_rx_interrupt<R, A>(&self, rx: &mut R, app: &A) -> ConsoleRx
    where
        R: RxPort,
        A: Application + ?Sized,
    {
        let byte = rx.read_byte();
        let outcome = self.atomic(|cs| {
            if self.reboot.borrow_ref_mut(cs).feed(byte) {
                ConsoleRx::RebootRequested
            } else if self.uart0_rx.borrow_ref_mut(cs).push(byte) {
                ConsoleRx::Delivered
            } else {
                ConsoleRx::Overflowed
            }
        });

        match outcome {
            ConsoleRx::RebootRequested => {
                info!("console: reboot sequence received");
                return outcome;
            }
            ConsoleRx::Overflowed => debug!("console: rx buffer overflow"),
            ConsoleRx::Delivered => {}
        }
        app.handle_uart0_byte(byte);
        outcome
    }

    /// Bus (UART1) receive interrupt.
    pub fn uart1_rx_interrupt<R, T, A>(&self, rx: &mut R, timer: &mut T, app: &A) -> RxStatus
    where
        R: RxPort,
        T: GapTimer,
        A: Application + ?Sized,
    {
        let errors = rx.line_errors();
        let byte = rx.read_byte();
        let status = self.atomic(|cs| self.uart1.borrow_ref_mut(cs).on_byte(timer, errors));
        if status.has_error() {
            trace!("bus: line error {}", status.bits());
        }
        app.handle_uart1_byte(byte, status);
        status
    }

    /// Gap timer compare-match interrupt: the bus has been silent for an
    /// inter-frame gap.
    pub fn uart1_timeout_interrupt<T, A>(&self, timer: &mut T, app: &A)
    where
        T: GapTimer,
        A: Application + ?Sized,
    {
        self.atomic(|cs| self.uart1.borrow_ref_mut(cs).on_timeout(timer));
        trace!("bus: frame closed by timeout");
        app.handle_uart1_timeout();
    }

    /// Base tick interrupt.
    pub fn tick_interrupt<A: Application + ?Sized>(&self, app: &A) -> Dispatch {
        self.scheduler.tick(self.guard.interrupts(), app)
    }

    // -----------------------------------------------------------------------
    // Foreground API
    // -----------------------------------------------------------------------

    /// Program the bus gap timer's timeout. Call once before enabling the
    /// bus receive interrupt.
    pub fn arm_uart1_timer<T: GapTimer>(&self, timer: &mut T) {
        let timing = self.atomic(|cs| {
            let uart1 = self.uart1.borrow_ref(cs);
            uart1.arm(timer);
            uart1.timing()
        });
        info!(
            "bus: inter-char {} ticks, inter-frame {} ticks",
            timing.inter_char_ticks(),
            timing.inter_frame_ticks()
        );
    }

    /// Unread console bytes.
    pub fn uart0_available(&self) -> usize {
        self.atomic(|cs| self.uart0_rx.borrow_ref(cs).available())
    }

    /// Next console byte, if any.
    pub fn uart0_read(&self) -> Option<u8> {
        self.atomic(|cs| self.uart0_rx.borrow_ref_mut(cs).pop())
    }

    /// Console byte `offset` positions ahead, without consuming it.
    pub fn uart0_peek(&self, offset: usize) -> Option<u8> {
        self.atomic(|cs| self.uart0_rx.borrow_ref(cs).peek(offset))
    }

    /// Console receive overflows since start or the last flush.
    pub fn uart0_errors(&self) -> u8 {
        self.atomic(|cs| self.uart0_rx.borrow_ref(cs).error_count())
    }

    /// Drop all buffered console input, including a byte still in the
    /// receiver.
    pub fn uart0_flush<R: RxPort>(&self, rx: &mut R) {
        self.atomic(|cs| self.uart0_rx.borrow_ref_mut(cs).flush(rx));
        debug!("console: rx flushed");
    }

    pub const fn uart0_capacity(&self) -> usize {
        N
    }

    /// Mark `event` pending; returns whether it already was.
    pub fn set_event(&self, event: Event) -> bool {
        self.atomic(|cs| self.events.set(cs, event))
    }

    /// Clear `event`; returns whether it was pending.
    pub fn clear_event(&self, event: Event) -> bool {
        self.atomic(|cs| self.events.clear(cs, event))
    }

    #[inline]
    pub fn is_event_pending(&self, event: Event) -> bool {
        self.events.is_pending(event)
    }

    pub fn uart1_stats(&self) -> ChannelStats {
        self.atomic(|cs| self.uart1.borrow_ref(cs).stats())
    }

    pub fn uart1_timing(&self) -> ChannelTiming {
        self.atomic(|cs| self.uart1.borrow_ref(cs).timing())
    }

    /// Scheduler overruns since start.
    pub fn task_overruns(&self) -> u8 {
        self.scheduler.overruns()
    }
}

// ---------------------------------------------------------------------------
// Unit tests (host-only)
// ---------------------------------------------------------------------------
