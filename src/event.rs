//! # Event Flags
//!
//! An 8-bit register of pending conditions. Interrupt handlers set bits,
//! foreground code polls and clears them. There is no queueing: setting a
//! bit that is already pending changes nothing, and the setter is told so.
//!
//! The register is an atomic byte so it can be read from any context
//! without a section; set and clear still run inside one because they are
//! read-modify-write sequences built from plain loads and stores.

use core::ops::BitOr;

use portable_atomic::{AtomicU8, Ordering};

use crate::sync::CriticalSection;

/// One or more condition bits.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub struct Event(u8);

impl Event {
    /// The condition with bit index `bit`.
    ///
    /// # Panics
    /// If `bit >= 8`. Use it in `const` items to turn that into a build error.
    pub const fn from_bit(bit: u8) -> Self {
        assert!(bit < 8, "event register is 8 bits wide");
        Self(1 << bit)
    }

    #[inline]
    pub const fn mask(self) -> u8 {
        self.0
    }
}

impl BitOr for Event {
    type Output = Event;

    fn bitor(self, rhs: Event) -> Event {
        Event(self.0 | rhs.0)
    }
}

pub struct EventFlags {
    pending: AtomicU8,
}

impl EventFlags {
    pub const fn new() -> Self {
        Self {
            pending: AtomicU8::new(0),
        }
    }

    /// Mark `event` pending. Returns whether any of its bits already were.
    pub fn set(&self, _cs: CriticalSection<'_>, event: Event) -> bool {
        let pending = self.pending.load(Ordering::Relaxed);
        self.pending.store(pending | event.mask(), Ordering::Relaxed);
        pending & event.mask() != 0
    }

    /// Clear `event`. Returns whether any of its bits were pending.
    pub fn clear(&self, _cs: CriticalSection<'_>, event: Event) -> bool {
        let pending = self.pending.load(Ordering::Relaxed);
        self.pending.store(pending & !event.mask(), Ordering::Relaxed);
        pending & event.mask() != 0
    }

    /// Unsynchronized poll. A stale answer only delays the reaction by one
    /// polling round.
    #[inline]
    pub fn is_pending(&self, event: Event) -> bool {
        self.pending.load(Ordering::Relaxed) & event.mask() != 0
    }

    /// Raw snapshot of the whole register.
    #[inline]
    pub fn bits(&self) -> u8 {
        self.pending.load(Ordering::Relaxed)
    }
}

impl Default for EventFlags {
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
    use crate::hal::mock::MockIrq;
    use crate::sync::AtomicSection;

    const RX_DONE: Event = Event::from_bit(0);
    const TIMEOUT: Event = Event::from_bit(3);

    #[test]
    fn test_set_reports_previous_state() {
        let guard = AtomicSection::new(MockIrq::enabled());
        let flags = EventFlags::new();

        assert!(!guard.free(|cs| flags.set(cs, RX_DONE)));
        assert!(guard.free(|cs| flags.set(cs, RX_DONE)));
        assert!(flags.is_pending(RX_DONE));
        assert!(!flags.is_pending(TIMEOUT));
        assert_eq!(flags.bits(), 0b0000_0001);
    }

    #[test]
    fn test_clear_reports_previous_state() {
        let guard = AtomicSection::new(MockIrq::enabled());
        let flags = EventFlags::new();
        guard.free(|cs| {
            flags.set(cs, RX_DONE);
            flags.set(cs, TIMEOUT);
        });

        assert!(guard.free(|cs| flags.clear(cs, RX_DONE)));
        assert!(!guard.free(|cs| flags.clear(cs, RX_DONE)));
        assert!(!flags.is_pending(RX_DONE));
        assert!(flags.is_pending(TIMEOUT));
    }

    #[test]
    fn test_combined_mask() {
        let guard = AtomicSection::new(MockIrq::enabled());
        let flags = EventFlags::new();
        let both = RX_DONE | TIMEOUT;
        assert_eq!(both.mask(), 0b0000_1001);

        guard.free(|cs| flags.set(cs, TIMEOUT));
        assert!(flags.is_pending(both));
        assert!(guard.free(|cs| flags.set(cs, both)));
        assert!(guard.free(|cs| flags.clear(cs, both)));
        assert_eq!(flags.bits(), 0);
    }
}
