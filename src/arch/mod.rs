//! # Architecture Abstraction Layer
//!
//! Implements the core's interrupt-control seam and base tick for the
//! Cortex-M4, plus register-level drivers for the STM32F401 board the
//! firmware image targets. Other cores and boards get sibling modules.

pub mod cortex_m4;
pub mod stm32f401;
