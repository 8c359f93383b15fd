//! # Saturating Counters
//!
//! Diagnostic counters (receive errors, overruns, byte counts) stick at
//! their maximum instead of wrapping, so a long-running node never reports
//! a small count after an error burst.

/// Increment an 8-bit counter, holding at `u8::MAX`.
#[inline]
pub const fn inc_u8(count: u8) -> u8 {
    if count < u8::MAX {
        count + 1
    } else {
        count
    }
}

/// Increment a 16-bit counter, holding at `u16::MAX`.
#[inline]
pub const fn inc_u16(count: u16) -> u16 {
    if count < u16::MAX {
        count + 1
    } else {
        count
    }
}

/// In-place saturating increment for the counter widths used in the core.
pub trait SaturatingCounter: Copy {
    /// Add one unless the counter is already at its maximum.
    fn bump(&mut self);
}

impl SaturatingCounter for u8 {
    #[inline]
    fn bump(&mut self) {
        *self = inc_u8(*self);
    }
}

impl SaturatingCounter for u16 {
    #[inline]
    fn bump(&mut self) {
        *self = inc_u16(*self);
    }
}

// ---------------------------------------------------------------------------
// Unit tests (host-only)
// ---------------------------------------------------------------------------
