//! # Frame Gap Detector
//!
//! Modbus-RTU style buses have no frame delimiter byte: a frame ends when
//! the line stays silent for 3.5 character times. The detector keeps a
//! free-running [`GapTimer`] that is restarted on every received byte.
//!
//! ## Byte arrival
//!
//! ```text
//! dt = timer.count()                       (before reset)
//! new_frame = !timer.is_running() || dt > inter_frame_ticks
//! timer.restart()
//! errors?  -> errors += 1, status |= ERROR | error bits
//! else     -> received_bytes += 1
//! deliver (byte, status)
//! ```
//!
//! ## Silence
//!
//! The timer's compare match is armed at `inter_frame_ticks`. When it
//! fires, [`FrameGapDetector::on_timeout`] stops the timer, the
//! application learns that no more bytes are coming for the current
//! frame, and the next byte is classified as a new frame because the
//! timer is no longer running.
//!
//! `inter_char_ticks` (1.5 character times) is computed and exposed but
//! does not take part in the boundary decision; only the inter-frame
//! threshold does.

use core::fmt;

use crate::counter::SaturatingCounter;
use crate::hal::{GapTimer, LineErrors};

// ---------------------------------------------------------------------------
// Per-byte status
// ---------------------------------------------------------------------------

/// Status delivered alongside every byte of the timed channel.
///
/// ```text
///  7        6         5        4   3   2   1       0
/// FRAMING  OVERRUN  PARITY    -   -   -  ERROR  NEW_FRAME
/// ```
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub struct RxStatus(u8);

impl RxStatus {
    pub const NEW_FRAME: u8 = 1 << 0;
    pub const ERROR: u8 = 1 << 1;
    pub const PARITY: u8 = 1 << 5;
    pub const OVERRUN: u8 = 1 << 6;
    pub const FRAMING: u8 = 1 << 7;

    #[inline]
    pub const fn bits(self) -> u8 {
        self.0
    }

    /// This byte is the first byte of a frame.
    #[inline]
    pub const fn is_new_frame(self) -> bool {
        self.0 & Self::NEW_FRAME != 0
    }

    /// The receiver flagged this byte as damaged.
    #[inline]
    pub const fn has_error(self) -> bool {
        self.0 & Self::ERROR != 0
    }

    pub const fn line_errors(self) -> LineErrors {
        LineErrors {
            framing: self.0 & Self::FRAMING != 0,
            parity: self.0 & Self::PARITY != 0,
            overrun: self.0 & Self::OVERRUN != 0,
        }
    }

    const fn encode(new_frame: bool, errors: LineErrors) -> Self {
        let mut bits = 0;
        if new_frame {
            bits |= Self::NEW_FRAME;
        }
        if errors.any() {
            bits |= Self::ERROR;
            if errors.framing {
                bits |= Self::FRAMING;
            }
            if errors.parity {
                bits |= Self::PARITY;
            }
            if errors.overrun {
                bits |= Self::OVERRUN;
            }
        }
        Self(bits)
    }
}

// ---------------------------------------------------------------------------
// Thresholds
// ---------------------------------------------------------------------------

/// Reasons a bit rate / timer rate pair cannot drive the detector.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum TimingError {
    /// Bit rate of zero.
    ZeroBitrate,
    /// The timer is too slow: the inter-character gap is under one tick.
    TimerTooSlow,
    /// The inter-frame gap does not fit the 16-bit timer.
    GapOverflow { ticks: u32 },
    /// Inter-character threshold not strictly below the inter-frame one.
    Unordered { inter_char: u16, inter_frame: u16 },
}

impl fmt::Display for TimingError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            TimingError::ZeroBitrate => f.write_str("bit rate must be non-zero"),
            TimingError::TimerTooSlow => {
                f.write_str("gap timer too slow to resolve an inter-character gap")
            }
            TimingError::GapOverflow { ticks } => {
                write!(f, "inter-frame gap of {} ticks exceeds the 16-bit timer", ticks)
            }
            TimingError::Unordered {
                inter_char,
                inter_frame,
            } => write!(
                f,
                "inter-char threshold {} must be below inter-frame threshold {}",
                inter_char, inter_frame
            ),
        }
    }
}

/// Silence thresholds of one serial channel, in gap-timer ticks.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub struct ChannelTiming {
    inter_char_ticks: u16,
    inter_frame_ticks: u16,
}

impl ChannelTiming {
    /// 1.5 characters of 10 bits.
    pub const INTER_CHAR_BIT_TIMES: u32 = 15;
    /// 3.5 characters of 10 bits.
    pub const INTER_FRAME_BIT_TIMES: u32 = 35;

    /// Use explicit thresholds.
    pub const fn new(inter_char_ticks: u16, inter_frame_ticks: u16) -> Result<Self, TimingError> {
        if inter_char_ticks >= inter_frame_ticks {
            return Err(TimingError::Unordered {
                inter_char: inter_char_ticks,
                inter_frame: inter_frame_ticks,
            });
        }
        Ok(Self {
            inter_char_ticks,
            inter_frame_ticks,
        })
    }

    /// Derive both thresholds from the channel bit rate and the gap timer
    /// tick rate.
    ///
    /// # Example
    /// A 1.5 MHz timer on a 19200 bit/s bus gives 1171 and 2734 ticks.
    pub const fn from_bitrate(bitrate: u32, timer_hz: u32) -> Result<Self, TimingError> {
        if bitrate == 0 {
            return Err(TimingError::ZeroBitrate);
        }
        let inter_char = Self::INTER_CHAR_BIT_TIMES as u64 * timer_hz as u64 / bitrate as u64;
        let inter_frame = Self::INTER_FRAME_BIT_TIMES as u64 * timer_hz as u64 / bitrate as u64;

        if inter_char == 0 {
            return Err(TimingError::TimerTooSlow);
        }
        if inter_frame > u16::MAX as u64 {
            let ticks = if inter_frame > u32::MAX as u64 {
                u32::MAX
            } else {
                inter_frame as u32
            };
            return Err(TimingError::GapOverflow { ticks });
        }
        Self::new(inter_char as u16, inter_frame as u16)
    }

    #[inline]
    pub const fn inter_char_ticks(&self) -> u16 {
        self.inter_char_ticks
    }

    #[inline]
    pub const fn inter_frame_ticks(&self) -> u16 {
        self.inter_frame_ticks
    }
}

// ---------------------------------------------------------------------------
// Detector
// ---------------------------------------------------------------------------

/// Counters of the timed channel.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub struct ChannelStats {
    pub received_bytes: u16,
    pub errors: u16,
}

pub struct FrameGapDetector {
    timing: ChannelTiming,
    received_bytes: u16,
    errors: u16,
}

impl FrameGapDetector {
    pub const fn new(timing: ChannelTiming) -> Self {
        Self {
            timing,
            received_bytes: 0,
            errors: 0,
        }
    }

    #[inline]
    pub const fn timing(&self) -> ChannelTiming {
        self.timing
    }

    /// Program the timeout compare value. Call once during start-up.
    pub fn arm<T: GapTimer>(&self, timer: &mut T) {
        timer.set_compare(self.timing.inter_frame_ticks);
    }

    /// Boundary decision for a byte seen `elapsed` ticks after the previous
    /// one. A stopped timer means the previous frame already timed out.
    #[inline]
    pub const fn starts_frame(&self, timer_running: bool, elapsed: u16) -> bool {
        !timer_running || elapsed > self.timing.inter_frame_ticks
    }

    /// Classify a byte and account for it. Receive interrupt context only.
    pub(crate) fn on_byte<T: GapTimer>(&mut self, timer: &mut T, errors: LineErrors) -> RxStatus {
        let new_frame = self.starts_frame(timer.is_running(), timer.count());
        timer.restart();

        if errors.any() {
            self.errors.bump();
        } else {
            self.received_bytes.bump();
        }
        RxStatus::encode(new_frame, errors)
    }

    /// Compare-match timeout. Gap timer interrupt context only.
    pub(crate) fn on_timeout<T: GapTimer>(&mut self, timer: &mut T) {
        timer.stop();
    }

    pub fn stats(&self) -> ChannelStats {
        ChannelStats {
            received_bytes: self.received_bytes,
            errors: self.errors,
        }
    }
}

// ---------------------------------------------------------------------------
// Unit tests (host-only)
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;
    use crate::hal::mock::MockTimer;

    fn detector(inter_frame: u16) -> FrameGapDetector {
        FrameGapDetector::new(ChannelTiming::new(inter_frame / 2, inter_frame).unwrap())
    }

    #[test]
    fn test_thresholds_from_bitrate() {
        let timing = ChannelTiming::from_bitrate(19_200, 1_500_000).unwrap();
        assert_eq!(timing.inter_char_ticks(), 1171);
        assert_eq!(timing.inter_frame_ticks(), 2734);

        let timing = ChannelTiming::from_bitrate(9_600, 1_000_000).unwrap();
        assert_eq!(timing.inter_char_ticks(), 1562);
        assert_eq!(timing.inter_frame_ticks(), 3645);
        assert!(timing.inter_char_ticks() < timing.inter_frame_ticks());
    }

    #[test]
    fn test_threshold_errors() {
        assert_eq!(
            ChannelTiming::from_bitrate(0, 1_000_000),
            Err(TimingError::ZeroBitrate)
        );
        assert_eq!(
            ChannelTiming::from_bitrate(115_200, 1_000),
            Err(TimingError::TimerTooSlow)
        );
        assert_eq!(
            ChannelTiming::from_bitrate(1_200, 16_000_000),
            Err(TimingError::GapOverflow { ticks: 466_666 })
        );
        assert_eq!(
            ChannelTiming::new(100, 100),
            Err(TimingError::Unordered {
                inter_char: 100,
                inter_frame: 100
            })
        );
    }

    #[test]
    fn test_boundary_is_strictly_greater() {
        let det = detector(100);
        assert!(!det.starts_frame(true, 0));
        assert!(!det.starts_frame(true, 100));
        assert!(det.starts_frame(true, 101));
        assert!(det.starts_frame(false, 0));
    }

    #[test]
    fn test_inter_char_threshold_not_used() {
        // A gap well past the inter-char threshold is still a continuation
        let det = FrameGapDetector::new(ChannelTiming::new(10, 100).unwrap());
        assert!(!det.starts_frame(true, 50));
    }

    #[test]
    fn test_continuation_then_new_frame() {
        let mut det = detector(100);
        let mut timer = MockTimer::stopped();
        det.arm(&mut timer);
        assert_eq!(timer.compare, 100);

        // First byte ever: timer not running yet
        let first = det.on_byte(&mut timer, LineErrors::NONE);
        assert_eq!(first.bits(), RxStatus::NEW_FRAME);

        timer.elapse(50);
        let second = det.on_byte(&mut timer, LineErrors::NONE);
        assert_eq!(second.bits(), 0);
        assert!(!second.is_new_frame());

        timer.elapse(150);
        let third = det.on_byte(&mut timer, LineErrors::NONE);
        assert_eq!(third.bits(), RxStatus::NEW_FRAME);
        assert_eq!(timer.restarts, 3);
        assert!(timer.running);
    }

    #[test]
    fn test_timeout_stops_timer_and_next_byte_opens_frame() {
        let mut det = detector(100);
        let mut timer = MockTimer::stopped();
        det.on_byte(&mut timer, LineErrors::NONE);
        timer.elapse(100);
        det.on_timeout(&mut timer);
        assert!(!timer.running);

        let status = det.on_byte(&mut timer, LineErrors::NONE);
        assert!(status.is_new_frame());
    }

    #[test]
    fn test_line_errors_are_encoded_and_counted() {
        let mut det = detector(100);
        let mut timer = MockTimer::stopped();
        det.on_byte(&mut timer, LineErrors::NONE);

        let errors = LineErrors {
            framing: true,
            parity: false,
            overrun: true,
        };
        let status = det.on_byte(&mut timer, errors);
        assert!(status.has_error());
        assert!(!status.is_new_frame());
        assert_eq!(
            status.bits(),
            RxStatus::ERROR | RxStatus::FRAMING | RxStatus::OVERRUN
        );
        assert_eq!(status.line_errors(), errors);

        let stats = det.stats();
        assert_eq!(
            stats,
            ChannelStats {
                received_bytes: 1,
                errors: 1
            }
        );
    }

    #[test]
    fn test_counters_saturate() {
        let mut det = detector(100);
        det.received_bytes = u16::MAX;
        det.errors = u16::MAX;
        let mut timer = MockTimer::stopped();
        det.on_byte(&mut timer, LineErrors::NONE);
        det.on_byte(
            &mut timer,
            LineErrors {
                parity: true,
                ..LineErrors::NONE
            },
        );
        let stats = det.stats();
        assert_eq!(stats.received_bytes, u16::MAX);
        assert_eq!(stats.errors, u16::MAX);
    }

    #[test]
    fn test_timing_error_display() {
        assert_eq!(
            TimingError::ZeroBitrate.to_string(),
            "bit rate must be non-zero"
        );
    }
}
