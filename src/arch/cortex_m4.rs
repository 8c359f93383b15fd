//! # Cortex-M4 Port Layer
//!
//! Hardware-specific pieces for the ARM Cortex-M4: global interrupt
//! control through PRIMASK, the SysTick base tick, and the system reset
//! used by the console reboot sequence.
//!
//! ## Interrupt Priorities
//!
//! - SysTick: Priority 0xF0 (lowest). The UART and gap timer interrupts,
//!   configured by the board layer at higher priority, preempt it
//!
//! SysTick at the lowest priority matters because the scheduler runs task
//! hooks from inside the SysTick handler. On this core "re-enabling
//! interrupts" during a hook means clearing PRIMASK; preemption by the
//! receive interrupts is then decided by NVIC priority.

use cortex_m::interrupt;
use cortex_m::peripheral::scb::SystemHandler;
use cortex_m::peripheral::syst::SystClkSource;
use cortex_m::peripheral::{SCB, SYST};
use cortex_m::register::primask;

use crate::config::{SYSTEM_CLOCK_HZ, TICK_HZ};
use crate::sync::InterruptControl;

// ---------------------------------------------------------------------------
// Interrupt control
// ---------------------------------------------------------------------------

/// PRIMASK-based global interrupt control.
#[derive(Debug, Clone, Copy, Default)]
pub struct CortexM;

impl InterruptControl for CortexM {
    #[inline]
    fn are_enabled(&self) -> bool {
        primask::read().is_active()
    }

    #[inline]
    fn disable(&self) {
        interrupt::disable();
    }

    #[inline]
    unsafe fn enable(&self) {
        interrupt::enable()
    }
}

// ---------------------------------------------------------------------------
// SysTick configuration
// ---------------------------------------------------------------------------

/// Configure the SysTick timer for the scheduler base tick.
///
/// Sets up SysTick to fire at `TICK_HZ` frequency using the processor
/// clock. The firmware's `SysTick` handler forwards each tick to
/// `kernel::tick_interrupt`.
pub fn configure_systick(syst: &mut SYST) {
    let reload = SYSTEM_CLOCK_HZ / TICK_HZ - 1;
    syst.set_reload(reload);
    syst.clear_current();
    syst.set_clock_source(SystClkSource::Core);
    syst.enable_counter();
    syst.enable_interrupt();
}

/// Put SysTick at the lowest priority (0xF0 with 4 implemented bits).
pub fn set_interrupt_priorities(scb: &mut SCB) {
    unsafe {
        scb.set_priority(SystemHandler::SysTick, 0xF0);
    }
}

// ---------------------------------------------------------------------------
// Reset
// ---------------------------------------------------------------------------

/// Reset the node. Used when the console receives the reboot sequence.
pub fn reboot() -> ! {
    SCB::sys_reset()
}
