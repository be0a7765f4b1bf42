//! DMA UART Ring-Buffer Transport
//!
//! A `no_std`, `no_alloc` byte-stream transport that sits between an
//! application and a DMA-capable UART. Two fixed-capacity ring buffers
//! decouple non-blocking `send`/`receive` calls from the interrupt context
//! that completes DMA transfers and reports line-idle events.
//!
//! # Architecture
//!
//! The crate is organized into three layers:
//!
//! 1. **HAL Layer** ([`hal`]): the [`Capabilities`] the driver needs from the
//!    DMA/UART hardware (start/abort per direction, remaining count, clock)
//! 2. **Driver Layer** ([`driver`]): TX and RX ring engines plus the
//!    [`DmaUart`] device that ties them to the capabilities
//! 3. **Sync Layer** ([`sync`]): ISR sharing through [`IrqSlot`] and, with
//!    the `async` feature, futures woken from the interrupt callbacks
//!
//! ## Transmit path
//!
//! `UartTx::send` copies into the TX ring and, if the DMA engine is idle,
//! starts the longest contiguous run from the oldest byte. Each TX-complete
//! interrupt retires the run and starts the next one.
//!
//! ## Receive path
//!
//! The RX DMA fills the ring in fixed-size batches. Progress inside a batch
//! is derived from the hardware's remaining count on half-complete and
//! idle-line events, and again on every `UartRx::receive`.
//!
//! ## Concurrency
//!
//! Every ring index has exactly one writing context. [`DmaUart::split`]
//! hands out one [`UartTx`], one [`UartRx`] and one [`UartIrq`]; the borrow
//! checker keeps it that way.
//!
//! # Features
//!
//! - `defmt`: Log through `defmt` and derive `defmt::Format` on public types
//! - `log`: Log through the `log` facade
//! - `async`: Enable `send_async`, `flush_async` and `receive_async`
//!
//! # Example
//!
//! ```ignore
//! use core::pin::Pin;
//! use ph_dma_uart::{CapabilityTable, DmaUartDefault, IrqSlot, UartConfig};
//!
//! static mut UART: DmaUartDefault<Caps> = DmaUartDefault::new();
//! static UART_IRQ: IrqSlot<Caps, 128, 1024> = IrqSlot::new();
//!
//! let caps = CapabilityTable::new(hdma_rx, hdma_tx)
//!     .with_start_rx(hal_start_rx)
//!     .with_abort_rx(hal_abort_rx)
//!     .with_rx_remaining(hal_rx_remaining)
//!     .with_start_tx(hal_start_tx)
//!     .with_abort_tx(hal_abort_tx)
//!     .with_now_millis(hal_tick_ms);
//!
//! // The DMA engine writes into the device, so it is pinned in place.
//! let mut uart = Pin::static_mut(unsafe { &mut *core::ptr::addr_of_mut!(UART) });
//! uart.as_mut().init(caps, UartConfig::new())?;
//! let (mut tx, mut rx, irq) = uart.split()?;
//! UART_IRQ.install(irq);
//!
//! tx.send(b"hello\r\n")?;
//! tx.flush(100)?;
//!
//! let mut buf = [0u8; 32];
//! let n = rx.receive(&mut buf);
//! ```
//!
//! A device whose interrupt handle sits in an [`IrqSlot`] stays borrowed for
//! the rest of the program; stop its transmitter with [`UartTx::abort`].
//!
//! # Memory Requirements
//!
//! With the default configuration (128-byte TX ring, 1024-byte RX ring) a
//! device needs a little over 1.1 KB; see [`DmaUart::memory_usage`].

#![no_std]
#![deny(missing_docs)]
#![allow(unsafe_code)]
#![deny(unsafe_op_in_unsafe_fn)]
// Clippy lint levels live here; thresholds and config are in Cargo.toml.
#![deny(clippy::correctness)]
#![warn(
    clippy::suspicious,
    clippy::style,
    clippy::complexity,
    clippy::perf,
    clippy::cloned_instead_of_copied,
    clippy::explicit_iter_loop,
    clippy::implicit_clone,
    clippy::inconsistent_struct_constructor,
    clippy::manual_assert,
    clippy::manual_let_else,
    clippy::match_same_arms,
    clippy::needless_pass_by_value,
    clippy::semicolon_if_nothing_returned,
    clippy::uninlined_format_args,
    clippy::unnested_or_patterns,
    clippy::std_instead_of_core,
    clippy::std_instead_of_alloc,
    clippy::alloc_instead_of_core
)]
#![allow(
    clippy::mod_module_files,
    clippy::self_named_module_files,
    clippy::similar_names,
    clippy::struct_excessive_bools,
    clippy::type_complexity,
    clippy::must_use_candidate,
    clippy::assertions_on_constants,
    clippy::cast_possible_truncation,
    clippy::cast_possible_wrap,
    clippy::cast_sign_loss,
    clippy::cast_lossless,
    clippy::panic_in_result_fn,
    clippy::unwrap_used,
    clippy::expect_used,
    clippy::module_name_repetitions,
    clippy::wildcard_imports,
    clippy::items_after_statements,
    clippy::let_underscore_future
)]

// =============================================================================
// Modules
// =============================================================================

// Must come first so the logging macros are visible everywhere below.
mod fmt;

pub mod driver;
pub mod hal;
pub mod sync;

// Internal implementation details (pub(crate) only)
mod internal;

// Test utilities (only available during testing)
#[cfg(test)]
pub mod testing;

// =============================================================================
// Re-exports
// =============================================================================

pub use driver::config::UartConfig;
pub use driver::error::{Error, Result, result_code};
pub use driver::status::StatusFlags;
pub use driver::uart::{
    DmaUart, DmaUartDefault, DmaUartLarge, DmaUartSmall, UartIrq, UartRx, UartTx,
};
pub use driver::TxState;
pub use hal::{Capabilities, CapabilityTable};
pub use sync::IrqSlot;

/// Shared driver constants.
///
/// Default capacities, timing and the numeric status codes, grouped so the
/// top-level facade stays focused on driver types.
pub mod constants {
    pub use crate::driver::status::{
        FLAG_RX_OVERRUN, FLAG_RX_REARM_FAILED, FLAG_TX_ABORTED, FLAG_TX_STALLED,
        FLAG_TX_TRUNCATED,
    };
    pub use crate::internal::constants::{
        BUSY_CODE, DEFAULT_FLUSH_TIMEOUT_MS, DEFAULT_RX_CAPACITY, DEFAULT_TX_CAPACITY,
        FLUSH_POLL_INTERVAL_US, GENERIC_ERROR_CODE, INVALID_ARGUMENT_CODE, MIN_CAPACITY,
        NOT_INITIALIZED_CODE, NOT_SUPPORTED_CODE, OK_CODE, RESERVED_SLOTS, TIMEOUT_CODE,
    };
}

// =============================================================================
// Macro Helpers
// =============================================================================

/// Declare a static [`IrqSlot`] for a device's interrupt handle.
///
/// The capacities default to [`DmaUartDefault`]'s (128 TX, 1024 RX).
///
/// # Examples
///
/// ```ignore
/// ph_dma_uart::uart_irq_slot!(UART_IRQ, MyCaps);
///
/// #[interrupt]
/// fn USART2() {
///     UART_IRQ.on_idle_line().ok();
/// }
/// ```
#[macro_export]
macro_rules! uart_irq_slot {
    ($name:ident, $caps:ty) => {
        $crate::uart_irq_slot!(
            $name,
            $caps,
            $crate::constants::DEFAULT_TX_CAPACITY,
            $crate::constants::DEFAULT_RX_CAPACITY
        );
    };
    ($name:ident, $caps:ty, $tx:expr, $rx:expr) => {
        static $name: $crate::IrqSlot<$caps, { $tx }, { $rx }> = $crate::IrqSlot::new();
    };
}
