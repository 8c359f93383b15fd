//! # Synchronization Primitives
//!
//! Interrupt-safe atomic sections for state shared between interrupt
//! handlers and foreground code.
//!
//! The guard keeps a single sticky flag recording whether interrupts were
//! enabled when it was entered, and only re-enables them on exit if they
//! were. It does **not** count nesting: a second `disable()` before the
//! matching `restore()` overwrites the flag, so callers pair the two calls
//! at one call site. [`AtomicSection::free`] does the pairing for you and
//! hands the closure a [`CriticalSection`] token.
//!
//! Shared state lives in `critical_section::Mutex<RefCell<_>>` and is only
//! reachable with that token, from the foreground and from interrupt
//! handlers alike.

pub use critical_section::CriticalSection;
use portable_atomic::{AtomicBool, Ordering};

/// Global interrupt enable control for the execution environment.
pub trait InterruptControl {
    /// Whether interrupt delivery is currently enabled.
    fn are_enabled(&self) -> bool;

    /// Mask all maskable interrupts.
    fn disable(&self);

    /// Unmask interrupts.
    ///
    /// # Safety
    /// Must not be called while a [`CriticalSection`] handed out by an
    /// [`AtomicSection`] on the same controller is alive.
    unsafe fn enable(&self);
}

/// Disable/restore guard around an [`InterruptControl`].
pub struct AtomicSection<I> {
    irq: I,
    were_enabled: AtomicBool,
}

impl<I: InterruptControl> AtomicSection<I> {
    pub const fn new(irq: I) -> Self {
        Self {
            irq,
            were_enabled: AtomicBool::new(false),
        }
    }

    /// The wrapped interrupt controller.
    #[inline]
    pub fn interrupts(&self) -> &I {
        &self.irq
    }

    /// Record the current enable state, then mask interrupts.
    #[inline]
    pub fn disable(&self) {
        self.were_enabled
            .store(self.irq.are_enabled(), Ordering::Relaxed);
        self.irq.disable();
    }

    /// Re-enable interrupts if they were enabled at the last `disable()`.
    #[inline]
    pub fn restore(&self) {
        if self.were_enabled.load(Ordering::Relaxed) {
            // SAFETY: called only outside `free`'s closure, so no token is alive
            unsafe { self.irq.enable() }
        }
    }

    /// Execute a closure with interrupts masked.
    ///
    /// This is the primary mechanism for foreground access to state the
    /// interrupt handlers also touch. Keep the closure short: every cycle
    /// spent inside it adds to receive interrupt latency.
    ///
    /// # Usage
    /// ```ignore
    /// let byte = guard.free(|cs| ring.borrow_ref_mut(cs).pop());
    /// ```
    #[inline]
    pub fn free<R>(&self, f: impl FnOnce(CriticalSection<'_>) -> R) -> R {
        self.disable();
        // SAFETY: interrupts stay masked until `restore` below, and the
        // token cannot leave the closure
        let result = f(unsafe { CriticalSection::new() });
        self.restore();
        result
    }
}

// ---------------------------------------------------------------------------
// Unit tests (host-only)
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;
    use crate::hal::mock::MockIrq;

    #[test]
    fn test_restore_reenables_when_previously_enabled() {
        let guard = AtomicSection::new(MockIrq::enabled());
        guard.disable();
        assert!(!guard.interrupts().are_enabled());
        guard.restore();
        assert!(guard.interrupts().are_enabled());
    }

    #[test]
    fn test_restore_keeps_disabled_state() {
        let guard = AtomicSection::new(MockIrq::disabled());
        guard.disable();
        guard.restore();
        assert!(!guard.interrupts().are_enabled());
    }

    #[test]
    fn test_free_masks_during_closure() {
        let guard = AtomicSection::new(MockIrq::enabled());
        let inside = guard.free(|_cs| guard.interrupts().are_enabled());
        assert!(!inside);
        assert!(guard.interrupts().are_enabled());
    }

    #[test]
    fn test_token_opens_shared_cell() {
        use core::cell::RefCell;
        use critical_section::Mutex;

        let guard = AtomicSection::new(MockIrq::enabled());
        let shared = Mutex::new(RefCell::new(0u8));
        guard.free(|cs| *shared.borrow_ref_mut(cs) += 1);
        guard.free(|cs| *shared.borrow_ref_mut(cs) += 1);
        assert_eq!(guard.free(|cs| *shared.borrow_ref(cs)), 2);
        assert!(guard.interrupts().are_enabled());
    }

    #[test]
    fn test_second_disable_loses_outer_state() {
        // Not counting: the inner disable records "disabled" and wins
        let guard = AtomicSection::new(MockIrq::enabled());
        guard.disable();
        guard.disable();
        guard.restore();
        assert!(!guard.interrupts().are_enabled());
        guard.restore();
        assert!(!guard.interrupts().are_enabled());
    }
}
