//! Async/await support for the split handles.
//!
//! Each device carries one waker per direction. The interrupt callbacks on
//! [`UartIrq`](crate::UartIrq) wake them, so the futures here only poll the
//! ring state and park until the next TX-complete, RX progress or idle-line
//! event.

use core::future::poll_fn;
use core::task::Poll;

use super::primitives::AtomicWaker;
use crate::driver::error::Result;
use crate::driver::uart::{UartRx, UartTx};
use crate::hal::Capabilities;

/// Per-device wakers
pub(crate) struct UartWakers {
    pub(crate) tx: AtomicWaker,
    pub(crate) rx: AtomicWaker,
}

impl UartWakers {
    pub(crate) const fn new() -> Self {
        Self {
            tx: AtomicWaker::new(),
            rx: AtomicWaker::new(),
        }
    }

    /// Release every parked task (used on teardown)
    pub(crate) fn wake_all(&self) {
        self.tx.wake();
        self.rx.wake();
    }
}

impl<C: Capabilities, const TX: usize, const RX: usize> UartTx<'_, C, TX, RX> {
    /// Wait for free space, then queue as much of `data` as fits.
    ///
    /// Resolves with the number of bytes accepted, at least 1 unless `data`
    /// is empty.
    pub async fn send_async(&mut self, data: &[u8]) -> Result<usize> {
        if data.is_empty() {
            return Ok(0);
        }

        poll_fn(|cx| {
            if self.uart.tx.free() == 0 {
                self.uart.wakers.tx.register(cx.waker());
                if self.uart.tx.free() == 0 {
                    return Poll::Pending;
                }
            }
            Poll::Ready(self.uart.tx.send(self.caps, &self.uart.status, data))
        })
        .await
    }

    /// Wait until every queued byte has been transmitted.
    ///
    /// Restarts a stalled engine on every poll; a failed restart resolves
    /// with its error.
    pub async fn flush_async(&mut self) -> Result<()> {
        poll_fn(|cx| {
            if let Err(e) = self.uart.tx.kick(self.caps) {
                return Poll::Ready(Err(e));
            }
            if self.uart.tx.used() == 0 {
                return Poll::Ready(Ok(()));
            }
            self.uart.wakers.tx.register(cx.waker());
            if self.uart.tx.used() == 0 {
                Poll::Ready(Ok(()))
            } else {
                Poll::Pending
            }
        })
        .await
    }
}

impl<C: Capabilities, const TX: usize, const RX: usize> UartRx<'_, C, TX, RX> {
    /// Wait until at least one byte is available, then receive into `buf`.
    pub async fn receive_async(&mut self, buf: &mut [u8]) -> usize {
        if buf.is_empty() {
            return 0;
        }

        poll_fn(|cx| {
            let n = self.uart.rx.read(self.caps, &self.uart.status, buf);
            if n > 0 {
                return Poll::Ready(n);
            }
            self.uart.wakers.rx.register(cx.waker());
            match self.uart.rx.read(self.caps, &self.uart.status, buf) {
                0 => Poll::Pending,
                n => Poll::Ready(n),
            }
        })
        .await
    }
}

#[cfg(test)]
mod tests {
    use core::future::Future;
    use core::pin::pin;
    use core::task::Context;

    use super::*;
    use crate::driver::config::UartConfig;
    use crate::driver::error::Error;
    use crate::driver::uart::DmaUart;
    use crate::testing::{MockDma, WakeCounter};

    fn no_timeouts() -> UartConfig {
        UartConfig::new().with_timeouts(false)
    }

    #[test]
    fn send_async_waits_for_space() {
        let dma = MockDma::new();
        let mut uart = pin!(DmaUart::<&MockDma, 8, 32>::new());
        uart.as_mut().init(&dma, no_timeouts()).unwrap();
        let (mut tx, _rx, mut irq) = uart.as_mut().split().unwrap();

        assert_eq!(tx.send(b"0123456"), Ok(7));

        let counter = WakeCounter::new();
        let waker = counter.waker();
        let mut cx = Context::from_waker(&waker);
        let mut fut = pin!(tx.send_async(b"xy"));
        assert!(fut.as_mut().poll(&mut cx).is_pending());

        irq.on_tx_complete().unwrap();
        assert_eq!(counter.count(), 1);
        assert_eq!(fut.as_mut().poll(&mut cx), Poll::Ready(Ok(2)));
    }

    #[test]
    fn send_async_empty_resolves_immediately() {
        let dma = MockDma::new();
        let mut uart = pin!(DmaUart::<&MockDma, 8, 32>::new());
        uart.as_mut().init(&dma, no_timeouts()).unwrap();
        let (mut tx, _rx, _irq) = uart.as_mut().split().unwrap();

        let mut cx = Context::from_waker(core::task::Waker::noop());
        let mut fut = pin!(tx.send_async(&[]));
        assert_eq!(fut.as_mut().poll(&mut cx), Poll::Ready(Ok(0)));
    }

    #[test]
    fn flush_async_resolves_after_completion() {
        let dma = MockDma::new();
        let mut uart = pin!(DmaUart::<&MockDma, 8, 32>::new());
        uart.as_mut().init(&dma, no_timeouts()).unwrap();
        let (mut tx, _rx, mut irq) = uart.as_mut().split().unwrap();
        tx.send(b"abc").unwrap();

        let counter = WakeCounter::new();
        let waker = counter.waker();
        let mut cx = Context::from_waker(&waker);
        let mut fut = pin!(tx.flush_async());
        assert!(fut.as_mut().poll(&mut cx).is_pending());

        irq.on_tx_complete().unwrap();
        assert_eq!(counter.count(), 1);
        assert_eq!(fut.as_mut().poll(&mut cx), Poll::Ready(Ok(())));
    }

    #[test]
    fn flush_async_reports_failed_restart() {
        let dma = MockDma::new();
        let mut uart = pin!(DmaUart::<&MockDma, 8, 32>::new());
        uart.as_mut().init(&dma, no_timeouts()).unwrap();
        let (mut tx, _rx, mut irq) = uart.as_mut().split().unwrap();
        tx.send(b"ab").unwrap();
        tx.send(b"cd").unwrap();
        dma.fail_next_start_tx(Error::Generic);
        let _ = irq.on_tx_complete();

        dma.fail_next_start_tx(Error::Busy);
        let mut cx = Context::from_waker(core::task::Waker::noop());
        let mut fut = pin!(tx.flush_async());
        assert_eq!(fut.as_mut().poll(&mut cx), Poll::Ready(Err(Error::Busy)));
    }

    #[test]
    fn receive_async_wakes_on_idle_line() {
        let dma = MockDma::new();
        let mut uart = pin!(DmaUart::<&MockDma, 8, 32>::new());
        uart.as_mut().init(&dma, no_timeouts()).unwrap();
        let (_tx, mut rx, mut irq) = uart.as_mut().split().unwrap();

        let counter = WakeCounter::new();
        let waker = counter.waker();
        let mut cx = Context::from_waker(&waker);
        let mut buf = [0u8; 8];
        {
            let mut fut = pin!(rx.receive_async(&mut buf));
            assert!(fut.as_mut().poll(&mut cx).is_pending());

            dma.deliver(b"ok");
            irq.on_idle_line().unwrap();
            assert_eq!(counter.count(), 1);
            assert_eq!(fut.as_mut().poll(&mut cx), Poll::Ready(2));
        }
        assert_eq!(&buf[..2], b"ok");
    }

    #[test]
    fn wake_all_releases_both_directions() {
        let wakers = UartWakers::new();
        let tx = WakeCounter::new();
        let rx = WakeCounter::new();
        wakers.tx.register(&tx.waker());
        wakers.rx.register(&rx.waker());

        wakers.wake_all();
        assert_eq!(tx.count(), 1);
        assert_eq!(rx.count(), 1);
    }
}
