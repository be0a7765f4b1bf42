//! Static slot for handing the interrupt handle to ISRs.
//!
//! Interrupt handlers are plain functions without arguments, so the
//! [`UartIrq`] produced by [`DmaUart::split`](crate::DmaUart::split) has to
//! live in a `static`. [`IrqSlot`] is that static: install the handle once
//! during bring-up and forward every interrupt through it.

use super::primitives::CriticalSectionCell;
use crate::driver::error::{Error, Result};
use crate::driver::uart::UartIrq;
use crate::hal::Capabilities;

/// ISR-safe holder for a [`UartIrq`].
///
/// Every forwarded callback runs inside a critical section, which also
/// serializes receive callbacks raised at different priorities.
///
/// # Teardown
///
/// Installing a handle borrows the device for `'static`, so
/// [`DmaUart::deinit`](crate::DmaUart::deinit) and its `Drop` never run
/// afterwards. Such a device lives for the rest of the program. Stop
/// transmission with [`UartTx::abort`](crate::UartTx::abort); the receive
/// side keeps its window armed and there is no handle-level RX abort. To
/// shut a device down completely, keep it out of an `IrqSlot` and call
/// `deinit` once the handles are gone.
///
/// # Example
///
/// ```ignore
/// static mut UART: DmaUartDefault<MyDma> = DmaUartDefault::new();
/// static UART_IRQ: IrqSlot<MyDma, 128, 1024> = IrqSlot::new();
///
/// let mut uart = Pin::static_mut(unsafe { &mut *addr_of_mut!(UART) });
/// uart.as_mut().init(my_dma, UartConfig::new())?;
/// let (tx, rx, irq) = uart.split()?;
/// UART_IRQ.install(irq);
///
/// #[interrupt]
/// fn USART2() {
///     UART_IRQ.on_idle_line().ok();
/// }
/// ```
pub struct IrqSlot<C: Capabilities + 'static, const TX: usize, const RX: usize> {
    inner: CriticalSectionCell<Option<UartIrq<'static, C, TX, RX>>>,
}

impl<C: Capabilities + 'static, const TX: usize, const RX: usize> IrqSlot<C, TX, RX> {
    /// Create an empty slot (const, suitable for static initialization).
    pub const fn new() -> Self {
        Self {
            inner: CriticalSectionCell::new(None),
        }
    }

    /// Install `irq`, returning the handle it replaces
    pub fn install(
        &self,
        irq: UartIrq<'static, C, TX, RX>,
    ) -> Option<UartIrq<'static, C, TX, RX>> {
        self.inner.with(|slot| slot.replace(irq))
    }

    /// Take the handle back out
    pub fn remove(&self) -> Option<UartIrq<'static, C, TX, RX>> {
        self.inner.with(Option::take)
    }

    /// Check whether a handle is installed
    pub fn is_installed(&self) -> bool {
        self.inner.with_ref(Option::is_some)
    }

    /// Forward [`UartIrq::on_tx_complete`]
    #[inline]
    pub fn on_tx_complete(&self) -> Result<()> {
        self.forward(UartIrq::on_tx_complete)
    }

    /// Forward [`UartIrq::on_rx_half_complete`]
    #[inline]
    pub fn on_rx_half_complete(&self) -> Result<()> {
        self.forward(UartIrq::on_rx_half_complete)
    }

    /// Forward [`UartIrq::on_rx_complete`]
    #[inline]
    pub fn on_rx_complete(&self) -> Result<()> {
        self.forward(UartIrq::on_rx_complete)
    }

    /// Forward [`UartIrq::on_idle_line`]
    #[inline]
    pub fn on_idle_line(&self) -> Result<()> {
        self.forward(UartIrq::on_idle_line)
    }

    /// `NotInitialized` when empty, `Busy` if re-entered from inside a
    /// callback.
    fn forward<F>(&self, f: F) -> Result<()>
    where
        F: FnOnce(&mut UartIrq<'static, C, TX, RX>) -> Result<()>,
    {
        self.inner
            .try_with(|slot| slot.as_mut().map_or(Err(Error::NotInitialized), f))
            .unwrap_or(Err(Error::Busy))
    }
}

impl<C: Capabilities + 'static, const TX: usize, const RX: usize> Default for IrqSlot<C, TX, RX> {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    extern crate std;
    use core::pin::Pin;
    use std::boxed::Box;

    use super::*;
    use crate::driver::config::UartConfig;
    use crate::driver::uart::DmaUart;
    use crate::hal::CapabilityTable;
    use crate::testing::MockDma;

    type LeakedUart = DmaUart<&'static MockDma, 8, 32>;

    fn leaked() -> (&'static MockDma, Pin<&'static mut LeakedUart>) {
        let dma: &'static MockDma = Box::leak(Box::new(MockDma::new()));
        let mut uart = Pin::static_mut(Box::leak(Box::new(LeakedUart::new())));
        uart.as_mut()
            .init(dma, UartConfig::new().with_timeouts(false))
            .unwrap();
        (dma, uart)
    }

    #[test]
    fn slot_is_static_friendly() {
        static SLOT: IrqSlot<CapabilityTable<(), ()>, 8, 32> = IrqSlot::new();
        assert!(!SLOT.is_installed());
    }

    #[test]
    fn empty_slot_reports_not_initialized() {
        let slot: IrqSlot<&'static MockDma, 8, 32> = IrqSlot::default();
        assert_eq!(slot.on_tx_complete(), Err(Error::NotInitialized));
        assert_eq!(slot.on_rx_half_complete(), Err(Error::NotInitialized));
        assert_eq!(slot.on_rx_complete(), Err(Error::NotInitialized));
        assert_eq!(slot.on_idle_line(), Err(Error::NotInitialized));
    }

    #[test]
    fn installed_slot_forwards_callbacks() {
        let (dma, uart) = leaked();
        let (mut tx, mut rx, irq) = uart.split().unwrap();
        let slot = IrqSlot::new();
        assert!(slot.install(irq).is_none());
        assert!(slot.is_installed());

        tx.send(b"ab").unwrap();
        tx.send(b"cd").unwrap();
        slot.on_tx_complete().unwrap();
        slot.on_tx_complete().unwrap();
        assert!(tx.is_idle());
        assert_eq!(dma.tx_bytes(), b"abcd".to_vec());

        dma.deliver(b"hi");
        slot.on_idle_line().unwrap();
        let mut buf = [0u8; 4];
        assert_eq!(rx.receive(&mut buf), 2);
        assert_eq!(&buf[..2], b"hi");
    }

    #[test]
    fn installed_device_stops_through_tx_abort() {
        let (dma, uart) = leaked();
        let (mut tx, _rx, irq) = uart.split().unwrap();
        let slot = IrqSlot::new();
        slot.install(irq);

        tx.send(b"ab").unwrap();
        tx.send(b"cd").unwrap();
        tx.abort().unwrap();
        assert_eq!(dma.tx_abort_count(), 1);

        // The completion of the aborted run starts nothing new.
        slot.on_tx_complete().unwrap();
        assert!(tx.is_idle());
        assert_eq!(dma.tx_bytes(), b"ab".to_vec());
    }

    #[test]
    fn reentry_is_busy() {
        let (_dma, uart) = leaked();
        let (_tx, _rx, irq) = uart.split().unwrap();
        let slot = IrqSlot::new();
        slot.install(irq);

        let nested = slot.inner.with(|_| slot.on_idle_line());
        assert_eq!(nested, Err(Error::Busy));
    }

    #[test]
    fn remove_empties_slot() {
        let (_dma, uart) = leaked();
        let (_tx, _rx, irq) = uart.split().unwrap();
        let slot = IrqSlot::new();
        slot.install(irq);

        let mut irq = slot.remove().unwrap();
        assert!(!slot.is_installed());
        assert_eq!(slot.on_idle_line(), Err(Error::NotInitialized));
        assert_eq!(irq.on_idle_line(), Ok(()));
    }
}
