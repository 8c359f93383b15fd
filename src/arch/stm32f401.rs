//! # STM32F401 Board Layer
//!
//! Register-level drivers for the peripherals the runtime needs on an
//! STM32F401 running from the 16 MHz HSI with no bus prescalers:
//!
//! | Role | Peripheral | Pins |
//! |------|------------|------|
//! | console | USART2 | PA2 TX, PA3 RX (AF7) |
//! | bus | USART1 | PA10 RX (AF7) |
//! | gap timer | TIM2, compare channel 1 | none |
//!
//! Receive and compare interrupts are left disabled. The interrupt
//! vectors for these peripherals (USART2, USART1, TIM2) come from a
//! device crate; without one the firmware polls [`RxPort::byte_pending`]
//! and [`Tim2::compare_pending`] instead.

use core::ptr::{read_volatile, write_volatile};

use portable_atomic::{AtomicBool, Ordering};

use crate::config::{BUS_BITRATE, CONSOLE_BITRATE, GAP_TIMER_HZ, SYSTEM_CLOCK_HZ};
use crate::hal::{GapTimer, LineErrors, RxPort, TxPort};

// ---------------------------------------------------------------------------
// Register map
// ---------------------------------------------------------------------------

const RCC: usize = 0x4002_3800;
const RCC_AHB1ENR: usize = RCC + 0x30;
const RCC_APB1ENR: usize = RCC + 0x40;
const RCC_APB2ENR: usize = RCC + 0x44;

const GPIOA: usize = 0x4002_0000;
const GPIOA_MODER: usize = GPIOA;
const GPIOA_AFRL: usize = GPIOA + 0x20;
const GPIOA_AFRH: usize = GPIOA + 0x24;

const USART1: usize = 0x4001_1000;
const USART2: usize = 0x4000_4400;
const USART_SR: usize = 0x00;
const USART_DR: usize = 0x04;
const USART_BRR: usize = 0x08;
const USART_CR1: usize = 0x0C;

const SR_PE: u32 = 1 << 0;
const SR_FE: u32 = 1 << 1;
const SR_ORE: u32 = 1 << 3;
const SR_RXNE: u32 = 1 << 5;
const SR_TXE: u32 = 1 << 7;
const CR1_RE: u32 = 1 << 2;
const CR1_TE: u32 = 1 << 3;
const CR1_UE: u32 = 1 << 13;

const TIM2: usize = 0x4000_0000;
const TIM_CR1: usize = TIM2;
const TIM_SR: usize = TIM2 + 0x10;
const TIM_EGR: usize = TIM2 + 0x14;
const TIM_CNT: usize = TIM2 + 0x24;
const TIM_PSC: usize = TIM2 + 0x28;
const TIM_ARR: usize = TIM2 + 0x2C;
const TIM_CCR1: usize = TIM2 + 0x34;

const TIM_CR1_CEN: u32 = 1 << 0;
const TIM_SR_CC1IF: u32 = 1 << 1;
const TIM_EGR_UG: u32 = 1 << 0;

const AF7: u32 = 7;
const MODE_AF: u32 = 0b10;

#[inline]
fn read(addr: usize) -> u32 {
    // SAFETY: `addr` is one of the fixed, aligned MMIO registers above
    unsafe { read_volatile(addr as *const u32) }
}

#[inline]
fn write(addr: usize, value: u32) {
    // SAFETY: `addr` is one of the fixed, aligned MMIO registers above
    unsafe { write_volatile(addr as *mut u32, value) }
}

#[inline]
fn modify(addr: usize, f: impl FnOnce(u32) -> u32) {
    write(addr, f(read(addr)));
}

const fn brr(bitrate: u32) -> u32 {
    (SYSTEM_CLOCK_HZ + bitrate / 2) / bitrate
}

// ---------------------------------------------------------------------------
// USART
// ---------------------------------------------------------------------------

/// Receive half of a USART.
pub struct UsartRx {
    base: usize,
}

/// Transmit half of a USART.
pub struct UsartTx {
    base: usize,
}

impl RxPort for UsartRx {
    fn byte_pending(&self) -> bool {
        read(self.base + USART_SR) & SR_RXNE != 0
    }

    fn line_errors(&self) -> LineErrors {
        let sr = read(self.base + USART_SR);
        LineErrors {
            framing: sr & SR_FE != 0,
            parity: sr & SR_PE != 0,
            overrun: sr & SR_ORE != 0,
        }
    }

    /// Reading DR after SR also clears the error flags.
    fn read_byte(&mut self) -> u8 {
        read(self.base + USART_DR) as u8
    }
}

impl TxPort for UsartTx {
    fn is_ready(&self) -> bool {
        read(self.base + USART_SR) & SR_TXE != 0
    }

    fn write_byte(&mut self, byte: u8) {
        write(self.base + USART_DR, byte as u32);
    }
}

fn enable_usart(base: usize, bitrate: u32, cr1: u32) {
    write(base + USART_BRR, brr(bitrate));
    write(base + USART_CR1, CR1_UE | cr1);
}

// ---------------------------------------------------------------------------
// Gap timer
// ---------------------------------------------------------------------------

/// TIM2 counting at `GAP_TIMER_HZ`, compare channel 1 as the timeout.
pub struct Tim2 {
    _private: (),
}

impl Tim2 {
    /// The counter reached the compare value since the last restart.
    pub fn compare_pending(&self) -> bool {
        read(TIM_SR) & TIM_SR_CC1IF != 0
    }

    pub fn clear_compare(&mut self) {
        write(TIM_SR, !TIM_SR_CC1IF);
    }
}

impl GapTimer for Tim2 {
    fn is_running(&self) -> bool {
        read(TIM_CR1) & TIM_CR1_CEN != 0
    }

    /// TIM2 is 32 bits wide; gaps past the 16-bit range read as maximal.
    fn count(&self) -> u16 {
        read(TIM_CNT).min(u16::MAX as u32) as u16
    }

    fn restart(&mut self) {
        write(TIM_CNT, 0);
        self.clear_compare();
        modify(TIM_CR1, |v| v | TIM_CR1_CEN);
    }

    fn stop(&mut self) {
        modify(TIM_CR1, |v| v & !TIM_CR1_CEN);
    }

    fn set_compare(&mut self, ticks: u16) {
        write(TIM_CCR1, ticks as u32);
    }
}

// ---------------------------------------------------------------------------
// Board
// ---------------------------------------------------------------------------

pub struct Board {
    pub console_rx: UsartRx,
    pub console_tx: UsartTx,
    pub bus_rx: UsartRx,
    pub gap_timer: Tim2,
}

static TAKEN: AtomicBool = AtomicBool::new(false);

impl Board {
    /// Bring up clocks, pins, both USARTs and the gap timer. Returns `None`
    /// after the first call.
    pub fn take() -> Option<Self> {
        if TAKEN.swap(true, Ordering::AcqRel) {
            return None;
        }

        // GPIOA, USART2, TIM2, USART1
        modify(RCC_AHB1ENR, |v| v | 1 << 0);
        modify(RCC_APB1ENR, |v| v | 1 << 17 | 1 << 0);
        modify(RCC_APB2ENR, |v| v | 1 << 4);

        // PA2, PA3, PA10 to alternate function 7
        modify(GPIOA_MODER, |v| {
            let cleared = v & !(0b11 << 4 | 0b11 << 6 | 0b11 << 20);
            cleared | MODE_AF << 4 | MODE_AF << 6 | MODE_AF << 20
        });
        modify(GPIOA_AFRL, |v| {
            (v & !(0xF << 8 | 0xF << 12)) | AF7 << 8 | AF7 << 12
        });
        modify(GPIOA_AFRH, |v| (v & !(0xF << 8)) | AF7 << 8);

        enable_usart(USART2, CONSOLE_BITRATE, CR1_TE | CR1_RE);
        enable_usart(USART1, BUS_BITRATE, CR1_RE);

        // Stopped, free-running over the full 32 bits, prescaler latched
        write(TIM_CR1, 0);
        write(TIM_PSC, SYSTEM_CLOCK_HZ / GAP_TIMER_HZ - 1);
        write(TIM_ARR, u32::MAX);
        write(TIM_EGR, TIM_EGR_UG);
        write(TIM_SR, 0);

        Some(Self {
            console_rx: UsartRx { base: USART2 },
            console_tx: UsartTx { base: USART2 },
            bus_rx: UsartRx { base: USART1 },
            gap_timer: Tim2 { _private: () },
        })
    }
}
