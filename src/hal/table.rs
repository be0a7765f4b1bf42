//! Function-pointer capability table.
//!
//! Mirrors the init structure C firmware fills in: two opaque DMA handles
//! plus optional operation entries. [`DmaUart::init`](crate::DmaUart::init)
//! rejects a table with a missing mandatory entry before touching any state.

use super::Capabilities;
use crate::driver::error::{Error, Result};

/// Start a receive batch: `(rx handle, destination, length)`
pub type StartRxFn<R> = fn(&R, *mut u8, usize) -> Result<()>;
/// Stop the receive DMA
pub type AbortRxFn<R> = fn(&R) -> Result<()>;
/// Bytes outstanding in the current receive batch
pub type RxRemainingFn<R> = fn(&R) -> usize;
/// Start a transmit run: `(tx handle, source, length)`
pub type StartTxFn<T> = fn(&T, *const u8, usize) -> Result<()>;
/// Stop the transmit DMA
pub type AbortTxFn<T> = fn(&T) -> Result<()>;
/// Millisecond tick source
pub type NowMillisFn = fn() -> u32;

/// Capability table built from plain functions and opaque handles.
///
/// # Example
///
/// ```ignore
/// let caps = CapabilityTable::new(hdma_rx, hdma_tx)
///     .with_start_rx(|h, dst, len| h.start(dst, len))
///     .with_abort_rx(|h| h.abort())
///     .with_rx_remaining(|h| h.ndtr())
///     .with_start_tx(|h, src, len| h.start(src, len))
///     .with_abort_tx(|h| h.abort())
///     .with_now_millis(tick_ms);
/// ```
#[derive(Debug, Clone, Copy)]
pub struct CapabilityTable<R, T> {
    /// Receive DMA handle passed to every RX entry
    pub rx_dma: R,
    /// Transmit DMA handle passed to every TX entry
    pub tx_dma: T,
    /// Begin one receive batch
    pub start_rx: Option<StartRxFn<R>>,
    /// Stop the receive DMA
    pub abort_rx: Option<AbortRxFn<R>>,
    /// Query outstanding receive bytes
    pub rx_remaining: Option<RxRemainingFn<R>>,
    /// Begin one transmit run
    pub start_tx: Option<StartTxFn<T>>,
    /// Stop the transmit DMA
    pub abort_tx: Option<AbortTxFn<T>>,
    /// Optional millisecond clock
    pub now_millis: Option<NowMillisFn>,
}

impl<R, T> CapabilityTable<R, T> {
    /// Create an empty table around the two DMA handles
    pub const fn new(rx_dma: R, tx_dma: T) -> Self {
        Self {
            rx_dma,
            tx_dma,
            start_rx: None,
            abort_rx: None,
            rx_remaining: None,
            start_tx: None,
            abort_tx: None,
            now_millis: None,
        }
    }

    /// Set the receive start entry
    #[must_use]
    pub fn with_start_rx(mut self, f: StartRxFn<R>) -> Self {
        self.start_rx = Some(f);
        self
    }

    /// Set the receive abort entry
    #[must_use]
    pub fn with_abort_rx(mut self, f: AbortRxFn<R>) -> Self {
        self.abort_rx = Some(f);
        self
    }

    /// Set the receive progress entry
    #[must_use]
    pub fn with_rx_remaining(mut self, f: RxRemainingFn<R>) -> Self {
        self.rx_remaining = Some(f);
        self
    }

    /// Set the transmit start entry
    #[must_use]
    pub fn with_start_tx(mut self, f: StartTxFn<T>) -> Self {
        self.start_tx = Some(f);
        self
    }

    /// Set the transmit abort entry
    #[must_use]
    pub fn with_abort_tx(mut self, f: AbortTxFn<T>) -> Self {
        self.abort_tx = Some(f);
        self
    }

    /// Set the millisecond clock entry
    #[must_use]
    pub fn with_now_millis(mut self, f: NowMillisFn) -> Self {
        self.now_millis = Some(f);
        self
    }
}

impl<R, T> Capabilities for CapabilityTable<R, T> {
    fn start_rx(&self, dst: *mut u8, len: usize) -> Result<()> {
        let f = self.start_rx.ok_or(Error::NotSupported)?;
        f(&self.rx_dma, dst, len)
    }

    fn abort_rx(&self) -> Result<()> {
        let f = self.abort_rx.ok_or(Error::NotSupported)?;
        f(&self.rx_dma)
    }

    fn rx_remaining(&self) -> usize {
        self.rx_remaining.map_or(0, |f| f(&self.rx_dma))
    }

    fn start_tx(&self, src: *const u8, len: usize) -> Result<()> {
        let f = self.start_tx.ok_or(Error::NotSupported)?;
        f(&self.tx_dma, src, len)
    }

    fn abort_tx(&self) -> Result<()> {
        let f = self.abort_tx.ok_or(Error::NotSupported)?;
        f(&self.tx_dma)
    }

    fn now_millis(&self) -> Option<u32> {
        self.now_millis.map(|f| f())
    }

    fn has_clock(&self) -> bool {
        self.now_millis.is_some()
    }

    fn is_complete(&self) -> bool {
        self.start_rx.is_some()
            && self.abort_rx.is_some()
            && self.rx_remaining.is_some()
            && self.start_tx.is_some()
            && self.abort_tx.is_some()
    }
}
