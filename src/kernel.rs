//! # Kernel
//!
//! The node's single [`Runtime`] instance and the functions that reach it
//! from interrupt vectors and from the foreground loop.
//!
//! ## Startup Sequence
//!
//! ```text
//! reset_handler (cortex-m-rt)
//!   └─► main()
//!         ├─► board init              ← clocks, pins, UART/timer registers
//!         ├─► kernel::init(app)       ← register the application callbacks
//!         ├─► kernel::arm_uart1_timer ← program the bus frame timeout
//!         ├─► kernel::start(cp)       ← SysTick at TICK_HZ, priorities
//!         └─► foreground loop         ← poll events, drain console input
//! ```
//!
//! ## Interrupt wiring
//!
//! The vectors themselves belong to the board layer, since UART and timer
//! peripherals are device specific (see `arch::stm32f401`). Each vector
//! forwards to one function here:
//!
//! | Vector | Forward to |
//! |--------|------------|
//! | SysTick | [`tick_interrupt`] |
//! | console UART RX | [`uart0_rx_interrupt`] |
//! | bus UART RX | [`uart1_rx_interrupt`] |
//! | gap timer compare | [`uart1_timeout_interrupt`] |

use core::cell::Cell;

use critical_section::Mutex;

use crate::app::Application;
use crate::arch::cortex_m4::{self, CortexM};
use crate::config::{BUS_TIMING, CONSOLE_RX_CAPACITY};
use crate::event::Event;
use crate::frame::{ChannelStats, RxStatus};
use crate::hal::{GapTimer, RxPort};
use crate::runtime::{ConsoleRx, Runtime};
use crate::scheduler::Dispatch;

pub type GatewayRuntime = Runtime<CortexM, CONSOLE_RX_CAPACITY>;

/// Application type the kernel can hold. Hooks run from several interrupt
/// priorities, so the application is shared between them.
pub type SharedApp = dyn Application + Sync;

// ---------------------------------------------------------------------------
// Global instances
// ---------------------------------------------------------------------------

/// Global runtime context. All of its mutable state sits behind its own
/// critical-section mutexes, so a shared reference is all anyone gets.
static RUNTIME: GatewayRuntime = Runtime::new(CortexM, BUS_TIMING);

/// Application callbacks, registered once by `init()`.
static APP: Mutex<Cell<Option<&'static SharedApp>>> = Mutex::new(Cell::new(None));

/// Stand-in until the application is registered.
struct Unregistered;

impl Application for Unregistered {}

static UNREGISTERED: Unregistered = Unregistered;

#[inline]
fn app() -> &'static SharedApp {
    RUNTIME
        .atomic(|cs| APP.borrow(cs).get())
        .unwrap_or(&UNREGISTERED)
}

// ---------------------------------------------------------------------------
// Startup API
// ---------------------------------------------------------------------------

/// Register the application callbacks.
///
/// Must be called before [`start`]; interrupts arriving earlier are
/// handled with no-op callbacks.
pub fn init(app: &'static SharedApp) {
    RUNTIME.atomic(|cs| APP.borrow(cs).set(Some(app)));
    info!("kernel: application registered");
}

/// Program the bus gap timer's compare value from the configured timing.
pub fn arm_uart1_timer<T: GapTimer>(timer: &mut T) {
    RUNTIME.arm_uart1_timer(timer);
}

/// Start the base tick. After this call the scheduler is live.
pub fn start(core: &mut cortex_m::Peripherals) {
    cortex_m4::set_interrupt_priorities(&mut core.SCB);
    cortex_m4::configure_systick(&mut core.SYST);
    info!("kernel: base tick started");
}

// ---------------------------------------------------------------------------
// Interrupt entry points
// ---------------------------------------------------------------------------
//
// Call each from its vector, or from one polling loop when no device
// vector table is linked. Two contexts serving the same peripheral would
// interleave its bytes.

/// Forward from the SysTick exception.
pub fn tick_interrupt() -> Dispatch {
    RUNTIME.tick_interrupt(app())
}

/// Forward from the console UART receive vector. Resets the node when the
/// reboot sequence arrives.
pub fn uart0_rx_interrupt<R: RxPort>(rx: &mut R) -> ConsoleRx {
    let outcome = RUNTIME.uart0_rx_interrupt(rx, app());
    if outcome == ConsoleRx::RebootRequested {
        cortex_m4::reboot();
    }
    outcome
}

/// Forward from the bus UART receive vector.
pub fn uart1_rx_interrupt<R: RxPort, T: GapTimer>(rx: &mut R, timer: &mut T) -> RxStatus {
    RUNTIME.uart1_rx_interrupt(rx, timer, app())
}

/// Forward from the gap timer compare-match vector.
pub fn uart1_timeout_interrupt<T: GapTimer>(timer: &mut T) {
    RUNTIME.uart1_timeout_interrupt(timer, app());
}

// ---------------------------------------------------------------------------
// Foreground API
// ---------------------------------------------------------------------------

/// Next byte of console input, if any.
pub fn uart0_read() -> Option<u8> {
    RUNTIME.uart0_read()
}

pub fn uart0_available() -> usize {
    RUNTIME.uart0_available()
}

pub fn uart0_peek(offset: usize) -> Option<u8> {
    RUNTIME.uart0_peek(offset)
}

pub fn uart0_errors() -> u8 {
    RUNTIME.uart0_errors()
}

/// Drop buffered console input and whatever the receiver still holds.
pub fn uart0_flush<R: RxPort>(rx: &mut R) {
    RUNTIME.uart0_flush(rx)
}

pub fn set_event(event: Event) -> bool {
    RUNTIME.set_event(event)
}

pub fn clear_event(event: Event) -> bool {
    RUNTIME.clear_event(event)
}

pub fn is_event_pending(event: Event) -> bool {
    RUNTIME.is_event_pending(event)
}

pub fn uart1_stats() -> ChannelStats {
    RUNTIME.uart1_stats()
}

pub fn task_overruns() -> u8 {
    RUNTIME.task_overruns()
}
