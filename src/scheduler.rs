//! # Scheduler
//!
//! Cooperative tiered task dispatch driven by the base tick interrupt.
//!
//! ## Cadence
//!
//! At each base tick (100 µs):
//! 1. **Sub-tick**: Count up to `SUB_TICKS_PER_CADENCE`; return if not reached
//! 2. **Cadence step**: Reset the sub-tick, advance the 8-bit cadence counter
//! 3. **Overrun check**: If the previous dispatch is still running, count an
//!    overrun and return
//! 4. **Dispatch**: Mark busy, re-enable interrupts, run exactly one tier,
//!    restore the interrupt state, clear busy
//!
//! ## Tier selection
//!
//! The tier is the index of the lowest set bit of the cadence counter:
//!
//! ```text
//! cadence  ...0001 ...0010 ...0100 ... 1000_0000  0000_0000
//! tier       1ms     2ms     4ms   ...   128ms     (none)
//! ```
//!
//! With a 500 µs cadence the 1 ms tier runs on every odd step (every 1 ms),
//! the 2 ms tier every 2 ms, and so on up to the 128 ms tier. Because only
//! one bit can be the lowest set bit, no two tiers ever share a step. Over
//! one full cadence cycle of 256 steps the tiers run 128, 64, 32, 16, 8,
//! 4, 2 and 1 times; the step where the counter wraps to zero runs none.
//!
//! All state lives in atomics so a nested tick interrupt, arriving while a
//! tier hook runs with interrupts enabled, sees `busy` through a shared
//! reference and backs off.

use portable_atomic::{AtomicBool, AtomicU8, Ordering};

use crate::app::Application;
use crate::config::SUB_TICKS_PER_CADENCE;
use crate::counter::inc_u8;
use crate::sync::InterruptControl;

// ---------------------------------------------------------------------------
// Tiers
// ---------------------------------------------------------------------------

/// Task tier, named by its period at the default cadence.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
#[repr(u8)]
pub enum Tier {
    Ms1 = 0,
    Ms2,
    Ms4,
    Ms8,
    Ms16,
    Ms32,
    Ms64,
    Ms128,
}

impl Tier {
    pub const ALL: [Tier; 8] = [
        Tier::Ms1,
        Tier::Ms2,
        Tier::Ms4,
        Tier::Ms8,
        Tier::Ms16,
        Tier::Ms32,
        Tier::Ms64,
        Tier::Ms128,
    ];

    /// Tier that runs at cadence value `cadence`, if any.
    #[inline]
    pub const fn for_cadence(cadence: u8) -> Option<Tier> {
        if cadence == 0 {
            None
        } else {
            Some(Self::ALL[cadence.trailing_zeros() as usize])
        }
    }

    /// Run this tier's hook.
    pub fn run<A: Application + ?Sized>(self, app: &A) {
        match self {
            Tier::Ms1 => app.task_1ms(),
            Tier::Ms2 => app.task_2ms(),
            Tier::Ms4 => app.task_4ms(),
            Tier::Ms8 => app.task_8ms(),
            Tier::Ms16 => app.task_16ms(),
            Tier::Ms32 => app.task_32ms(),
            Tier::Ms64 => app.task_64ms(),
            Tier::Ms128 => app.task_128ms(),
        }
    }
}

/// Outcome of one base tick.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum Dispatch {
    /// Sub-tick only; no cadence step.
    Pending,
    /// Cadence step taken; the tier that ran, or `None` at cadence zero.
    Ran(Option<Tier>),
    /// Cadence step taken while the previous dispatch was still running.
    Overrun,
}

// ---------------------------------------------------------------------------
// Scheduler
// ---------------------------------------------------------------------------

/// Cadence divider and dispatch guard. Stored inside the runtime context;
/// only the tick interrupt mutates it.
pub struct TaskScheduler {
    /// Base ticks since the last cadence step.
    sub_ticks: AtomicU8,

    /// Cadence counter; wraps at 256.
    cadence: AtomicU8,

    /// A tier hook is executing.
    busy: AtomicBool,

    /// Cadence steps skipped because `busy` was set. Saturating.
    overruns: AtomicU8,
}

impl TaskScheduler {
    pub const fn new() -> Self {
        Self {
            sub_ticks: AtomicU8::new(0),
            cadence: AtomicU8::new(0),
            busy: AtomicBool::new(false),
            overruns: AtomicU8::new(0),
        }
    }

    /// Called from the base tick interrupt.
    ///
    /// `irq` is re-enabled while the tier hook runs so that receive
    /// interrupts are not held off by application work, then put back the
    /// way the handler found it.
    pub fn tick<I, A>(&self, irq: &I, app: &A) -> Dispatch
    where
        I: InterruptControl,
        A: Application + ?Sized,
    {
        let sub = self.sub_ticks.load(Ordering::Relaxed) + 1;
        if sub < SUB_TICKS_PER_CADENCE {
            self.sub_ticks.store(sub, Ordering::Relaxed);
            return Dispatch::Pending;
        }
        self.sub_ticks.store(0, Ordering::Relaxed);

        let cadence = self.cadence.load(Ordering::Relaxed).wrapping_add(1);
        self.cadence.store(cadence, Ordering::Relaxed);

        if self.busy.load(Ordering::Acquire) {
            let overruns = inc_u8(self.overruns.load(Ordering::Relaxed));
            self.overruns.store(overruns, Ordering::Relaxed);
            warn!("scheduler overrun at cadence {}, total {}", cadence, overruns);
            return Dispatch::Overrun;
        }
        self.busy.store(true, Ordering::Release);

        let tier = Tier::for_cadence(cadence);
        let were_enabled = irq.are_enabled();
        // SAFETY: no atomic section is open inside the tick handler, and
        // `busy` keeps a nested tick from dispatching again
        unsafe { irq.enable() };
        if let Some(tier) = tier {
            tier.run(app);
        }
        if !were_enabled {
            irq.disable();
        }

        self.busy.store(false, Ordering::Release);
        Dispatch::Ran(tier)
    }

    /// Current cadence counter value.
    #[inline]
    pub fn cadence(&self) -> u8 {
        self.cadence.load(Ordering::Relaxed)
    }

    /// Overrun count since start.
    #[inline]
    pub fn overruns(&self) -> u8 {
        self.overruns.load(Ordering::Relaxed)
    }

    /// A tier hook is executing right now.
    #[inline]
    pub fn is_busy(&self) -> bool {
        self.busy.load(Ordering::Relaxed)
    }
}

impl Default for TaskScheduler {
    fn default() -> Self {
        Self::new()
    }
}

// ---------------------------------------------------------------------------
// Unit tests (host-only)
// ---------------------------------------------------------------------------
