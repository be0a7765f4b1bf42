//! DMA UART device and its split handles.
//!
//! [`DmaUart`] owns both ring engines, the capabilities and the status word.
//! After [`init`](DmaUart::init) it is [`split`](DmaUart::split) into one
//! handle per role:
//!
//! - [`UartTx`]: application-side producer (`send`, `flush`, `abort`)
//! - [`UartRx`]: application-side consumer (`receive`)
//! - [`UartIrq`]: interrupt-side callbacks
//!
//! Exactly one handle of each kind exists per borrow, which is what keeps
//! every ring index single-writer.
//!
//! # Pinning
//!
//! The DMA engine holds raw pointers into the ring storage, which lives
//! inside the device. `init`, `split` and `deinit` therefore take
//! `Pin<&mut Self>`: once a transfer can be armed the device cannot move,
//! and [`Drop`] aborts both directions before its memory is reused.
//!
//! # Example
//!
//! ```ignore
//! use core::pin::pin;
//! use ph_dma_uart::{DmaUartDefault, UartConfig};
//!
//! let mut uart = pin!(DmaUartDefault::<MyDma>::new());
//! uart.as_mut().init(my_dma, UartConfig::new())?;
//! let (mut tx, mut rx, irq) = uart.as_mut().split()?;
//!
//! tx.send(b"hello\r\n")?;
//! tx.flush(100)?;
//!
//! let mut buf = [0u8; 64];
//! let n = rx.receive(&mut buf);
//! ```

use core::marker::PhantomPinned;
use core::pin::Pin;

use embedded_hal::delay::DelayNs;

use super::config::UartConfig;
use super::error::{Error, Result};
use super::rx::RxRing;
use super::status::{StatusCell, StatusFlags};
use super::tx::{TxRing, TxState};
use crate::hal::Capabilities;
use crate::internal::constants::{
    DEFAULT_FLUSH_TIMEOUT_MS, DEFAULT_RX_CAPACITY, DEFAULT_TX_CAPACITY,
};
#[cfg(feature = "async")]
use crate::sync::asynch::UartWakers;

// =============================================================================
// Device
// =============================================================================

/// DMA-driven UART transport with `TX`/`RX` byte ring capacities.
///
/// `TX - 1` and `RX - 1` bytes are usable; one slot of each ring stays free
/// to tell a full ring from an empty one. The struct is `const`
/// constructible so it can live in a `static`; pin it there with
/// [`Pin::static_mut`], or on the stack with [`core::pin::pin!`].
pub struct DmaUart<C: Capabilities, const TX: usize, const RX: usize> {
    caps: Option<C>,
    config: UartConfig,
    pub(crate) tx: TxRing<TX>,
    pub(crate) rx: RxRing<RX>,
    pub(crate) status: StatusCell,
    #[cfg(feature = "async")]
    pub(crate) wakers: UartWakers,
    /// DMA targets the ring storage in place
    _pinned: PhantomPinned,
}

/// 128-byte TX ring, 1024-byte RX ring
pub type DmaUartDefault<C> = DmaUart<C, DEFAULT_TX_CAPACITY, DEFAULT_RX_CAPACITY>;

/// Small configuration for memory-constrained systems
pub type DmaUartSmall<C> = DmaUart<C, 64, 256>;

/// Large configuration for high-throughput links
pub type DmaUartLarge<C> = DmaUart<C, 1024, 4096>;

impl<C: Capabilities, const TX: usize, const RX: usize> DmaUart<C, TX, RX> {
    /// Create an uninitialized device
    pub const fn new() -> Self {
        Self {
            caps: None,
            config: UartConfig::new(),
            tx: TxRing::new(),
            rx: RxRing::new(),
            status: StatusCell::new(),
            #[cfg(feature = "async")]
            wakers: UartWakers::new(),
            _pinned: PhantomPinned,
        }
    }

    /// Mutable access to the fields of a pinned device
    fn fields(self: Pin<&mut Self>) -> &mut Self {
        // SAFETY: callers only reset the rings in place and replace `caps`
        // and `config`, which the DMA engine never points into.
        unsafe { self.get_unchecked_mut() }
    }

    /// Validate `caps` and `config`, zero all state and arm the first
    /// receive batch.
    ///
    /// # Errors
    ///
    /// - [`Error::Busy`] if the device is already initialized
    /// - [`Error::InvalidArgument`] if a mandatory capability is missing, the
    ///   clock is missing while timeouts are enabled, or `config` does not
    ///   fit the ring capacities
    /// - any error from the first `start_rx`
    ///
    /// On failure the device stays uninitialized and `caps` is dropped.
    pub fn init(self: Pin<&mut Self>, caps: C, config: UartConfig) -> Result<()> {
        let this = self.fields();
        if this.caps.is_some() {
            return Err(Error::Busy);
        }
        if !caps.is_complete() || (config.timeouts && !caps.has_clock()) {
            warn!("DMA UART init rejected: incomplete capabilities");
            return Err(Error::InvalidArgument);
        }
        let batch = config.validate::<TX, RX>()?;

        this.tx.reset();
        this.status.reset();
        if let Err(e) = this.rx.start(&caps, batch) {
            error!("DMA UART init failed: first RX batch did not start");
            return Err(e);
        }

        this.config = config;
        this.caps = Some(caps);
        debug!("DMA UART ready: tx={} rx={} batch={}", TX, RX, batch);
        Ok(())
    }

    /// Split into the transmit, receive and interrupt handles.
    ///
    /// # Errors
    ///
    /// [`Error::NotInitialized`] before a successful [`init`](Self::init).
    #[allow(clippy::type_complexity)]
    pub fn split<'a>(
        self: Pin<&'a mut Self>,
    ) -> Result<(
        UartTx<'a, C, TX, RX>,
        UartRx<'a, C, TX, RX>,
        UartIrq<'a, C, TX, RX>,
    )> {
        let uart: &'a Self = self.into_ref().get_ref();
        let caps = uart.caps.as_ref().ok_or(Error::NotInitialized)?;
        Ok((
            UartTx { uart, caps },
            UartRx { uart, caps },
            UartIrq { uart, caps },
        ))
    }

    /// Abort both directions, zero all state and hand the capabilities back.
    ///
    /// Both aborts are attempted; the first failure is reported. The device
    /// is uninitialized afterwards either way.
    pub fn deinit(self: Pin<&mut Self>) -> Result<C> {
        let this = self.fields();
        let caps = this.caps.take().ok_or(Error::NotInitialized)?;
        let tx_result = caps.abort_tx();
        let rx_result = caps.abort_rx();

        this.tx.reset();
        this.rx.reset();
        this.status.reset();
        #[cfg(feature = "async")]
        this.wakers.wake_all();
        debug!("DMA UART shut down");

        tx_result.and(rx_result)?;
        Ok(caps)
    }

    /// Check whether [`init`](Self::init) has succeeded
    #[inline]
    pub fn is_initialized(&self) -> bool {
        self.caps.is_some()
    }

    /// Active configuration
    #[inline]
    pub fn config(&self) -> &UartConfig {
        &self.config
    }

    /// Current status flags
    #[inline]
    pub fn flags(&self) -> StatusFlags {
        self.status.get()
    }

    /// Read and clear the status flags
    #[inline]
    pub fn take_flags(&self) -> StatusFlags {
        self.status.take()
    }

    /// Total memory used by one device, in bytes
    pub const fn memory_usage() -> usize {
        core::mem::size_of::<Self>()
    }
}

impl<C: Capabilities, const TX: usize, const RX: usize> Default for DmaUart<C, TX, RX> {
    fn default() -> Self {
        Self::new()
    }
}

impl<C: Capabilities, const TX: usize, const RX: usize> Drop for DmaUart<C, TX, RX> {
    fn drop(&mut self) {
        if let Some(caps) = self.caps.take() {
            let _ = caps.abort_tx();
            let _ = caps.abort_rx();
        }
    }
}

// =============================================================================
// Transmit handle
// =============================================================================

/// Application-side transmit handle
pub struct UartTx<'a, C: Capabilities, const TX: usize, const RX: usize> {
    pub(crate) uart: &'a DmaUart<C, TX, RX>,
    pub(crate) caps: &'a C,
}

impl<C: Capabilities, const TX: usize, const RX: usize> UartTx<'_, C, TX, RX> {
    /// Queue as many bytes of `data` as fit and start transmitting.
    ///
    /// Never blocks. Returns the number of bytes accepted, which may be 0
    /// when the ring is full; a short write raises `tx_truncated`.
    ///
    /// # Errors
    ///
    /// Propagates a failed `start_tx`. The bytes of this call are not kept
    /// in that case.
    pub fn send(&mut self, data: &[u8]) -> Result<usize> {
        self.uart.tx.send(self.caps, &self.uart.status, data)
    }

    /// Wait until every queued byte has been transmitted.
    ///
    /// Polls the TX ring against the millisecond clock and restarts a
    /// stalled engine while waiting. Must not be called from interrupt
    /// context, since progress depends on the TX-complete callback.
    ///
    /// # Errors
    ///
    /// - [`Error::NotSupported`] when timeouts are disabled
    /// - [`Error::Timeout`] if bytes are still queued after `timeout_ms`
    /// - any error from restarting the engine
    pub fn flush(&mut self, timeout_ms: u32) -> Result<()> {
        if self.uart.tx.used() == 0 {
            return Ok(());
        }
        if !self.uart.config.timeouts {
            return Err(Error::NotSupported);
        }

        let start = self.caps.now_millis().ok_or(Error::NotSupported)?;
        loop {
            self.uart.tx.kick(self.caps)?;
            if self.uart.tx.used() == 0 {
                return Ok(());
            }
            let now = self.caps.now_millis().ok_or(Error::NotSupported)?;
            if now.wrapping_sub(start) >= timeout_ms {
                return Err(Error::Timeout);
            }
            core::hint::spin_loop();
        }
    }

    /// [`flush`](Self::flush) with the default timeout of
    /// [`DEFAULT_FLUSH_TIMEOUT_MS`](crate::constants::DEFAULT_FLUSH_TIMEOUT_MS).
    pub fn flush_default(&mut self) -> Result<()> {
        self.flush(DEFAULT_FLUSH_TIMEOUT_MS)
    }

    /// Clock-free [`flush`](Self::flush) paced by a `DelayNs` provider.
    ///
    /// Polls every `flush_poll_interval_us` for at most `timeout_ms`.
    pub fn flush_with_delay<D: DelayNs>(&mut self, delay: &mut D, timeout_ms: u32) -> Result<()> {
        let interval = self.uart.config.flush_poll_interval_us;
        let max_polls = (u64::from(timeout_ms) * 1000) / u64::from(interval);

        for _ in 0..max_polls {
            self.uart.tx.kick(self.caps)?;
            if self.uart.tx.used() == 0 {
                return Ok(());
            }
            delay.delay_us(interval);
        }

        if self.uart.tx.used() == 0 {
            Ok(())
        } else {
            Err(Error::Timeout)
        }
    }

    /// Retry starting a run after a failed continuation.
    ///
    /// Returns whether a run was started. No-op while a run is in flight.
    pub fn kick(&mut self) -> Result<bool> {
        self.uart.tx.kick(self.caps)
    }

    /// Stop the transmit DMA and discard everything queued.
    ///
    /// # Errors
    ///
    /// Propagates a failed `abort_tx`; the queue is left untouched then.
    pub fn abort(&mut self) -> Result<()> {
        self.uart.tx.abort(self.caps, &self.uart.status)
    }

    /// Bytes queued or in flight
    #[inline]
    pub fn pending(&self) -> usize {
        self.uart.tx.used()
    }

    /// Bytes `send` can accept right now
    #[inline]
    pub fn free(&self) -> usize {
        self.uart.tx.free()
    }

    /// Transmit engine state
    #[inline]
    pub fn tx_state(&self) -> TxState {
        self.uart.tx.state()
    }

    /// Check that nothing is queued or in flight
    #[inline]
    pub fn is_idle(&self) -> bool {
        self.uart.tx.state() == TxState::Idle && self.uart.tx.used() == 0
    }

    /// Current status flags
    #[inline]
    pub fn flags(&self) -> StatusFlags {
        self.uart.status.get()
    }
}

// =============================================================================
// Receive handle
// =============================================================================

/// Application-side receive handle
pub struct UartRx<'a, C: Capabilities, const TX: usize, const RX: usize> {
    pub(crate) uart: &'a DmaUart<C, TX, RX>,
    pub(crate) caps: &'a C,
}

impl<C: Capabilities, const TX: usize, const RX: usize> UartRx<'_, C, TX, RX> {
    /// Copy received bytes into `buf`, returning how many were copied.
    ///
    /// Never blocks and never fails; 0 means nothing has arrived. Bytes the
    /// hardware delivered since the last interrupt are included.
    pub fn receive(&mut self, buf: &mut [u8]) -> usize {
        self.uart.rx.read(self.caps, &self.uart.status, buf)
    }

    /// Bytes ready to be received
    #[inline]
    pub fn available(&self) -> usize {
        self.uart.rx.available(self.caps)
    }

    /// Re-arm a receive engine that stalled on a full ring.
    ///
    /// `receive` already does this; call it explicitly after a failed
    /// rearm. Returns whether a batch was armed.
    pub fn resume(&mut self) -> Result<bool> {
        self.uart.rx.resume(self.caps, &self.uart.status)
    }

    /// Check whether reception is paused waiting for free space
    #[inline]
    pub fn is_stalled(&self) -> bool {
        self.uart.rx.is_stalled()
    }

    /// Configured bytes per receive batch
    #[inline]
    pub fn batch_size(&self) -> usize {
        self.uart.rx.batch_size()
    }
}

// =============================================================================
// Interrupt handle
// =============================================================================

/// Interrupt-side handle
///
/// Call its methods from the DMA and UART interrupt handlers. Receive
/// callbacks must not preempt one another; share the handle through
/// [`IrqSlot`](crate::IrqSlot) if they run at different priorities.
///
/// # Example
///
/// ```ignore
/// #[interrupt]
/// fn DMA1_STREAM6() {
///     UART_IRQ.on_tx_complete().ok();
/// }
///
/// #[interrupt]
/// fn USART2() {
///     UART_IRQ.on_idle_line().ok();
/// }
/// ```
pub struct UartIrq<'a, C: Capabilities, const TX: usize, const RX: usize> {
    pub(crate) uart: &'a DmaUart<C, TX, RX>,
    pub(crate) caps: &'a C,
}

impl<C: Capabilities, const TX: usize, const RX: usize> UartIrq<'_, C, TX, RX> {
    /// TX DMA transfer complete
    ///
    /// # Errors
    ///
    /// The error of a failed continuation; the bytes stay queued and
    /// `tx_stalled` is raised.
    pub fn on_tx_complete(&mut self) -> Result<()> {
        let result = self.uart.tx.on_transfer_complete(self.caps, &self.uart.status);
        #[cfg(feature = "async")]
        self.uart.wakers.tx.wake();
        result
    }

    /// RX DMA half-transfer event
    pub fn on_rx_half_complete(&mut self) -> Result<()> {
        self.uart.rx.refresh_tail(self.caps);
        #[cfg(feature = "async")]
        self.uart.wakers.rx.wake();
        Ok(())
    }

    /// RX DMA batch complete
    ///
    /// # Errors
    ///
    /// The error of a failed rearm; `rx_rearm_failed` is raised and the
    /// application can retry with [`UartRx::resume`].
    pub fn on_rx_complete(&mut self) -> Result<()> {
        let result = self.uart.rx.on_batch_complete(self.caps, &self.uart.status);
        #[cfg(feature = "async")]
        self.uart.wakers.rx.wake();
        result
    }

    /// UART idle-line event
    pub fn on_idle_line(&mut self) -> Result<()> {
        self.uart.rx.refresh_tail(self.caps);
        #[cfg(feature = "async")]
        self.uart.wakers.rx.wake();
        Ok(())
    }
}

// =============================================================================
// Tests
// =============================================================================
