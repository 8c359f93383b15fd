//! # gwcore: Gateway Runtime Core
//!
//! The interrupt-driven runtime underneath a serial gateway node on an ARM
//! Cortex-M4 microcontroller.
//!
//! ## Overview
//!
//! The node talks to two serial links. The console link (UART0) carries
//! operator input, which is buffered for the foreground loop. The bus link
//! (UART1) carries framed traffic with no delimiters; frame boundaries are
//! recovered from the silence between characters. A base tick drives a
//! ladder of periodic task hooks, and a small set of event flags carries
//! "work pending" signals from interrupts to the foreground.
//!
//! ## Architecture
//!
//! ```text
//! ┌────────────────────────────────────────────────────────┐
//! │             Application (app.rs callbacks)              │
//! ├────────────────────────────────────────────────────────┤
//! │          Kernel glue (kernel.rs, target only)           │
//! │   init() · start() · *_interrupt() · foreground API    │
//! ├────────────────────────────────────────────────────────┤
//! │                 Runtime (runtime.rs)                    │
//! ├──────────────┬──────────────┬──────────────┬──────────┤
//! │ Ring buffer  │ Frame gaps   │ Scheduler    │ Events   │
//! │ ring.rs      │ frame.rs     │ scheduler.rs │ event.rs │
//! ├──────────────┴──────────────┴──────────────┴──────────┤
//! │   Atomic sections (sync.rs) · Counters (counter.rs)     │
//! ├────────────────────────────────────────────────────────┤
//! │   Peripheral seams (hal.rs) · Arch port (arch/)         │
//! ├────────────────────────────────────────────────────────┤
//! │         ARM Cortex-M4 Hardware (Thumb-2)                │
//! └────────────────────────────────────────────────────────┘
//! ```
//!
//! ## Timing
//!
//! | Source | Rate | Work |
//! |--------|------|------|
//! | SysTick | `TICK_HZ` | one scheduler sub-tick |
//! | console RX | per byte | buffer, reboot check, callback |
//! | bus RX | per byte | gap classification, callback |
//! | gap timer | once per silent gap | end-of-frame callback |
//!
//! ## Memory Model
//!
//! - **No heap**: all state is statically allocated
//! - **Fixed-size console buffer**: `RingBuffer<CONSOLE_RX_CAPACITY>`
//! - **Atomic sections**: a sticky PRIMASK guard in `sync` hands out
//!   `critical_section` tokens; interrupt-shared state sits in
//!   `critical_section::Mutex<RefCell<_>>` and is unreachable without one
//! - **No `static mut`**: the kernel's globals are plain statics holding
//!   the runtime and a shared application reference
//!
//! Everything except `arch` and `kernel` is portable and is unit tested on
//! the host against the mock peripherals in `hal::mock`.

#![cfg_attr(not(test), no_std)]

#[macro_use]
mod fmt;

pub mod app;
pub mod config;
pub mod console;
pub mod counter;
pub mod event;
pub mod frame;
pub mod hal;
pub mod ring;
pub mod runtime;
pub mod scheduler;
pub mod sync;

#[cfg(target_os = "none")]
pub mod arch;
#[cfg(target_os = "none")]
pub mod kernel;
