//! Receive ring engine.
//!
//! The DMA engine fills the ring in fixed windows ("batches") of
//! `batch_size` bytes. Arrival inside the armed window is never signalled
//! byte by byte; it is inferred from the hardware's remaining count:
//!
//! ```text
//! tail = (batch_origin + batch_size - remaining) mod N
//! ```
//!
//! # Index ownership
//!
//! | Field                          | Written by                          |
//! |--------------------------------|-------------------------------------|
//! | `head`                         | application (`read`)                |
//! | `tail`                         | interrupt (refresh, batch complete) |
//! | `batch_origin`, `delivered`,   | interrupt, or the application while |
//! | `generation`, `stalled`        | the engine is stalled (masked)      |
//!
//! The application never stores `tail`. Before a read it computes the same
//! value locally and uses it only if no rearm happened while it was
//! sampling, which the `generation` counter detects.
//!
//! # Overrun
//!
//! A window is armed only while `used + batch_size <= N - 1`, so the
//! hardware can never write over unread bytes. If the reader falls behind
//! the engine stalls, raises [`FLAG_RX_OVERRUN`], and the next
//! [`read`](RxRing::read) that frees enough space arms the window again.

use portable_atomic::{AtomicBool, AtomicU32, AtomicUsize, Ordering};

use super::error::Result;
use super::status::{FLAG_RX_OVERRUN, FLAG_RX_REARM_FAILED, StatusCell};
use crate::hal::Capabilities;
use crate::internal::constants::RESERVED_SLOTS;
use crate::internal::ring::{self, RingStorage};

pub(crate) struct RxRing<const N: usize> {
    storage: RingStorage<N>,
    head: AtomicUsize,
    tail: AtomicUsize,
    batch_origin: AtomicUsize,
    batch_size: usize,
    /// Bytes of the current window already published to `tail`
    delivered: AtomicUsize,
    /// Bumped on every rearm
    generation: AtomicU32,
    /// No window armed; waiting for the reader to free space
    stalled: AtomicBool,
}

impl<const N: usize> RxRing<N> {
    pub(crate) const fn new() -> Self {
        Self {
            storage: RingStorage::new(),
            head: AtomicUsize::new(0),
            tail: AtomicUsize::new(0),
            batch_origin: AtomicUsize::new(0),
            batch_size: 0,
            delivered: AtomicUsize::new(0),
            generation: AtomicU32::new(0),
            stalled: AtomicBool::new(false),
        }
    }

    /// Return to the empty state (exclusive access)
    pub(crate) fn reset(&mut self) {
        self.storage.clear();
        *self.head.get_mut() = 0;
        *self.tail.get_mut() = 0;
        *self.batch_origin.get_mut() = 0;
        self.batch_size = 0;
        *self.delivered.get_mut() = 0;
        *self.generation.get_mut() = 0;
        *self.stalled.get_mut() = false;
    }

    /// Zero the ring and arm the first window `[0, batch_size)`.
    ///
    /// On failure the ring is left reset and the error is returned.
    pub(crate) fn start<C: Capabilities>(&mut self, caps: &C, batch_size: usize) -> Result<()> {
        debug_assert!(batch_size > 0 && batch_size <= N / 2 && N % batch_size == 0);
        self.reset();
        self.batch_size = batch_size;

        if let Err(e) = caps.start_rx(self.storage.ptr_at(0), batch_size) {
            self.reset();
            return Err(e);
        }
        Ok(())
    }

    #[inline]
    pub(crate) fn batch_size(&self) -> usize {
        self.batch_size
    }

    #[inline]
    pub(crate) fn is_stalled(&self) -> bool {
        self.stalled.load(Ordering::Acquire)
    }

    /// Publish the bytes delivered so far in the armed window.
    ///
    /// Idle-line and half-complete handler (interrupt context). Safe to call
    /// any number of times; `tail` never moves backwards.
    pub(crate) fn refresh_tail<C: Capabilities>(&self, caps: &C) {
        if self.stalled.load(Ordering::Acquire) {
            return;
        }

        let remaining = core::cmp::min(caps.rx_remaining(), self.batch_size);
        let delivered = self.batch_size - remaining;
        if delivered <= self.delivered.load(Ordering::Relaxed) {
            return;
        }

        let origin = self.batch_origin.load(Ordering::Relaxed);
        self.delivered.store(delivered, Ordering::Release);
        self.tail
            .store(ring::advance::<N>(origin, delivered), Ordering::Release);
    }

    /// RX-complete handler (interrupt context).
    ///
    /// Publishes the whole window and arms the next one at
    /// `batch_origin + batch_size`. Ignored while stalled, since no window is
    /// armed then.
    pub(crate) fn on_batch_complete<C: Capabilities>(
        &self,
        caps: &C,
        status: &StatusCell,
    ) -> Result<()> {
        if self.stalled.load(Ordering::Acquire) {
            return Ok(());
        }

        let origin = self.batch_origin.load(Ordering::Relaxed);
        let next = ring::advance::<N>(origin, self.batch_size);
        self.delivered.store(self.batch_size, Ordering::Release);
        self.tail.store(next, Ordering::Release);

        self.arm(caps, status, next).map(|_| ())
    }

    /// Arm the window starting at `origin`, or stall if it is not free.
    ///
    /// Returns `Ok(true)` when a window was armed. Callers must have
    /// exclusive access to the batch bookkeeping: interrupt context, or a
    /// critical section while stalled.
    fn arm<C: Capabilities>(&self, caps: &C, status: &StatusCell, origin: usize) -> Result<bool> {
        let head = self.head.load(Ordering::Acquire);
        if ring::used::<N>(head, origin) + self.batch_size > N - RESERVED_SLOTS {
            if !self.stalled.swap(true, Ordering::AcqRel) {
                status.raise(FLAG_RX_OVERRUN);
                warn!("RX overrun, window at {} not free", origin);
            }
            return Ok(false);
        }

        self.batch_origin.store(origin, Ordering::Release);
        self.delivered.store(0, Ordering::Release);
        let generation = self.generation.load(Ordering::Relaxed);
        self.generation
            .store(generation.wrapping_add(1), Ordering::Release);

        if let Err(e) = caps.start_rx(self.storage.ptr_at(origin), self.batch_size) {
            self.stalled.store(true, Ordering::Release);
            status.raise(FLAG_RX_REARM_FAILED);
            error!("RX rearm at {} failed", origin);
            return Err(e);
        }

        self.stalled.store(false, Ordering::Release);
        trace!("RX window armed at {}", origin);
        Ok(true)
    }

    /// Re-arm a stalled engine from the application side.
    ///
    /// Returns `Ok(true)` if a window was armed, `Ok(false)` if the engine
    /// was not stalled or there is still not enough free space.
    pub(crate) fn resume<C: Capabilities>(&self, caps: &C, status: &StatusCell) -> Result<bool> {
        if !self.stalled.load(Ordering::Acquire) {
            return Ok(false);
        }

        critical_section::with(|_| {
            if !self.stalled.load(Ordering::Acquire) {
                return Ok(false);
            }
            // While stalled `tail` sits exactly on the next window boundary.
            let origin = self.tail.load(Ordering::Acquire);
            self.arm(caps, status, origin)
        })
    }

    /// `tail` as the application sees it, including bytes the hardware
    /// delivered since the last interrupt.
    pub(crate) fn observed_tail<C: Capabilities>(&self, caps: &C) -> usize {
        if self.stalled.load(Ordering::Acquire) {
            return self.tail.load(Ordering::Acquire);
        }

        let generation = self.generation.load(Ordering::Acquire);
        let origin = self.batch_origin.load(Ordering::Acquire);
        let published = self.delivered.load(Ordering::Acquire);
        let remaining = core::cmp::min(caps.rx_remaining(), self.batch_size);

        if self.generation.load(Ordering::Acquire) != generation
            || self.stalled.load(Ordering::Acquire)
        {
            // Rearmed underneath us; the stored tail is consistent.
            return self.tail.load(Ordering::Acquire);
        }

        let delivered = core::cmp::max(published, self.batch_size - remaining);
        ring::advance::<N>(origin, delivered)
    }

    /// Bytes ready to be read
    #[inline]
    pub(crate) fn available<C: Capabilities>(&self, caps: &C) -> usize {
        ring::used::<N>(self.head.load(Ordering::Relaxed), self.observed_tail(caps))
    }

    /// Copy up to `buf.len()` received bytes into `buf`.
    ///
    /// Never fails. If the engine is stalled and this read frees enough
    /// space, the next window is armed before returning.
    pub(crate) fn read<C: Capabilities>(
        &self,
        caps: &C,
        status: &StatusCell,
        buf: &mut [u8],
    ) -> usize {
        let head = self.head.load(Ordering::Relaxed);
        let tail = self.observed_tail(caps);
        let n = core::cmp::min(buf.len(), ring::used::<N>(head, tail));

        if n > 0 {
            // SAFETY: `[head, tail)` is published and outside any armed
            // window; nothing but this side touches it until `head` moves.
            unsafe { self.storage.read_wrapping(head, &mut buf[..n]) };
            self.head
                .store(ring::advance::<N>(head, n), Ordering::Release);
        }

        // Failures are latched in the status flags; reads themselves never fail.
        let _ = self.resume(caps, status);
        n
    }

    #[cfg(test)]
    pub(crate) fn indices(&self) -> (usize, usize) {
        (
            self.head.load(Ordering::Relaxed),
            self.tail.load(Ordering::Relaxed),
        )
    }
}

// =============================================================================
// Tests
// =============================================================================
