//! # Gateway Node Firmware
//!
//! Node image for an STM32F401 board. It registers an application whose
//! hooks raise event flags, starts the base tick, and services those flags
//! from the foreground loop. Console input is echoed back through the
//! blocking console writer.
//!
//! | Hook | Raises |
//! |------|--------|
//! | `task_128ms` | `HEARTBEAT` |
//! | `handle_uart1_timeout` | `BUS_FRAME` |
//! | `handle_uart0_byte` | `CONSOLE_INPUT` |
//!
//! ## Vectors
//!
//! SysTick is wired here. The peripheral vectors need a device vector
//! table, which this image does not link; the foreground loop polls the
//! same status flags and forwards to the same kernel entry points:
//!
//! | Vector | Kernel entry point |
//! |--------|--------------------|
//! | SysTick | `kernel::tick_interrupt` |
//! | USART2 (RXNE) | `kernel::uart0_rx_interrupt` |
//! | USART1 (RXNE) | `kernel::uart1_rx_interrupt` |
//! | TIM2 (CC1IF) | `kernel::uart1_timeout_interrupt` |

#![cfg_attr(target_os = "none", no_std)]
#![cfg_attr(target_os = "none", no_main)]

#[cfg(not(target_os = "none"))]
fn main() {}

#[cfg(target_os = "none")]
mod firmware {
    use core::fmt::Write;

    use cortex_m_rt::{entry, exception};
    #[cfg(feature = "defmt")]
    use defmt_rtt as _;
    use panic_halt as _;

    use gwcore::app::Application;
    use gwcore::arch::stm32f401::Board;
    use gwcore::console::Console;
    use gwcore::event::Event;
    use gwcore::hal::RxPort;
    use gwcore::kernel;

    const HEARTBEAT: Event = Event::from_bit(0);
    const BUS_FRAME: Event = Event::from_bit(1);
    const CONSOLE_INPUT: Event = Event::from_bit(2);

    struct Gateway;

    impl Application for Gateway {
        fn handle_uart0_byte(&self, _byte: u8) {
            kernel::set_event(CONSOLE_INPUT);
        }

        fn handle_uart1_timeout(&self) {
            kernel::set_event(BUS_FRAME);
        }

        fn task_128ms(&self) {
            kernel::set_event(HEARTBEAT);
        }
    }

    static GATEWAY: Gateway = Gateway;

    #[exception]
    fn SysTick() {
        kernel::tick_interrupt();
    }

    #[entry]
    fn main() -> ! {
        let mut cp = cortex_m::Peripherals::take().unwrap();
        let Board {
            mut console_rx,
            console_tx,
            mut bus_rx,
            mut gap_timer,
        } = Board::take().unwrap();

        kernel::init(&GATEWAY);
        kernel::uart0_flush(&mut console_rx);
        kernel::arm_uart1_timer(&mut gap_timer);
        kernel::start(&mut cp);

        let mut console = Console::new(console_tx);
        let _ = write!(console, "gwcore {}", env!("CARGO_PKG_VERSION"));
        console.newline();

        let mut heartbeats: u32 = 0;
        loop {
            if console_rx.byte_pending() {
                kernel::uart0_rx_interrupt(&mut console_rx);
            }
            if bus_rx.byte_pending() {
                kernel::uart1_rx_interrupt(&mut bus_rx, &mut gap_timer);
            }
            if gap_timer.compare_pending() {
                gap_timer.clear_compare();
                kernel::uart1_timeout_interrupt(&mut gap_timer);
            }

            if kernel::clear_event(HEARTBEAT) {
                heartbeats = heartbeats.wrapping_add(1);
                #[cfg(feature = "defmt")]
                defmt::debug!(
                    "heartbeat {=u32}, overruns {=u8}",
                    heartbeats,
                    kernel::task_overruns()
                );
            }

            if kernel::clear_event(BUS_FRAME) {
                let stats = kernel::uart1_stats();
                #[cfg(feature = "defmt")]
                defmt::info!(
                    "bus frame end: {=u16} bytes, {=u16} errors",
                    stats.received_bytes,
                    stats.errors
                );
                let _ = stats;
            }

            if kernel::clear_event(CONSOLE_INPUT) {
                while let Some(byte) = kernel::uart0_read() {
                    console.write_byte(byte);
                    if byte == b'\r' {
                        console.newline();
                    }
                }
            }
        }
    }
}
