//! # Gateway Configuration
//!
//! Compile-time constants for the runtime core. All limits are fixed at
//! compile time; nothing is allocated at run time.

use crate::frame::ChannelTiming;

/// Base tick frequency in Hz (one tick every 100 µs).
pub const TICK_HZ: u32 = 10_000;

/// Base ticks per scheduler cadence step. With `TICK_HZ` this gives a
/// 500 µs cadence, so the fastest tier runs every 1 ms.
pub const SUB_TICKS_PER_CADENCE: u8 = 5;

/// Receive buffer capacity of the console channel in bytes. Sized to
/// hold one full command line typed faster than the foreground drains it.
pub const CONSOLE_RX_CAPACITY: usize = 32;

/// Bit rate of the console channel.
pub const CONSOLE_BITRATE: u32 = 115_200;

/// Bit rate of the timed bus channel.
pub const BUS_BITRATE: u32 = 19_200;

/// Tick rate of the gap timer in Hz.
pub const GAP_TIMER_HZ: u32 = 1_000_000;

/// Silence thresholds of the bus channel. Evaluated at compile time, so an
/// impossible bit rate / timer rate pair fails the build.
pub const BUS_TIMING: ChannelTiming = match ChannelTiming::from_bitrate(BUS_BITRATE, GAP_TIMER_HZ) {
    Ok(timing) => timing,
    Err(_) => panic!("BUS_BITRATE and GAP_TIMER_HZ do not give usable frame gaps"),
};

/// System clock frequency in Hz (default for STM32F4 at 16 MHz HSI).
pub const SYSTEM_CLOCK_HZ: u32 = 16_000_000;
