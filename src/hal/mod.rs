//! Hardware Abstraction Layer
//!
//! The driver never touches UART or DMA registers. Everything it needs from
//! the hardware is expressed by the [`Capabilities`] trait, implemented either
//! directly by a HAL wrapper or through the function-pointer
//! [`CapabilityTable`].
//!
//! # Modules
//!
//! - [`table`]: C-style capability table with presence validation
//!
//! # Contract
//!
//! - `start_tx` and `start_rx` only program a transfer; completion is
//!   reported later through the [`UartIrq`](crate::UartIrq) callbacks.
//! - `rx_remaining` returns the number of bytes still outstanding in the
//!   receive transfer armed by the last `start_rx` (the STM32 `NDTR` value,
//!   for example). It is polled from both execution contexts.
//! - `start_tx` is called from the application context while the TX engine
//!   is idle and from the TX-complete callback; it is never re-entered.
//! - `abort_tx` is called inside a critical section.

pub mod table;

pub use table::CapabilityTable;

use crate::driver::error::Result;

/// Operations the driver requires from the DMA/UART layer.
///
/// Pointers handed to `start_rx` / `start_tx` always point into the device's
/// own ring storage. The device is pinned before the first transfer is armed
/// and aborts both directions in `deinit` and `Drop`, so they stay valid
/// until the matching completion callback or abort.
pub trait Capabilities {
    /// Begin one receive batch of `len` bytes into `dst`
    fn start_rx(&self, dst: *mut u8, len: usize) -> Result<()>;

    /// Stop the receive DMA
    fn abort_rx(&self) -> Result<()>;

    /// Bytes still outstanding in the current receive batch
    fn rx_remaining(&self) -> usize;

    /// Begin transmitting one contiguous run of `len` bytes from `src`
    fn start_tx(&self, src: *const u8, len: usize) -> Result<()>;

    /// Stop the transmit DMA
    fn abort_tx(&self) -> Result<()>;

    /// Monotonic millisecond timestamp (wrapping), if a clock is available
    fn now_millis(&self) -> Option<u32> {
        None
    }

    /// Whether [`now_millis`](Self::now_millis) is backed by a real clock
    fn has_clock(&self) -> bool {
        false
    }

    /// Whether every mandatory operation is present
    ///
    /// Always true for trait implementations; tables with optional entries
    /// override it.
    fn is_complete(&self) -> bool {
        true
    }
}

impl<C: Capabilities> Capabilities for &C {
    fn start_rx(&self, dst: *mut u8, len: usize) -> Result<()> {
        (**self).start_rx(dst, len)
    }

    fn abort_rx(&self) -> Result<()> {
        (**self).abort_rx()
    }

    fn rx_remaining(&self) -> usize {
        (**self).rx_remaining()
    }

    fn start_tx(&self, src: *const u8, len: usize) -> Result<()> {
        (**self).start_tx(src, len)
    }

    fn abort_tx(&self) -> Result<()> {
        (**self).abort_tx()
    }

    fn now_millis(&self) -> Option<u32> {
        (**self).now_millis()
    }

    fn has_clock(&self) -> bool {
        (**self).has_clock()
    }

    fn is_complete(&self) -> bool {
        (**self).is_complete()
    }
}
