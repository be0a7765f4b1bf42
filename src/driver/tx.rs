//! Transmit ring engine.
//!
//! The application copies bytes in at `tail`; the DMA engine drains
//! contiguous runs starting at `head`. A run never crosses the physical end of
//! the buffer, so a wrapped queue is sent as two consecutive runs.
//!
//! # Index ownership
//!
//! | Field       | Written by                              |
//! |-------------|-----------------------------------------|
//! | `tail`      | application (`send`, `abort`)           |
//! | `head`      | interrupt (`on_transfer_complete`)      |
//! | `running`   | whichever context submits or completes  |
//! | `committed` | same as `running`                       |
//!
//! Submission writes `committed` before setting `running`; completion clears
//! `running` before zeroing `committed`. Application-side submissions run
//! inside a critical section so a completion can never observe a half-made
//! submission.

use portable_atomic::{AtomicBool, AtomicUsize, Ordering};

use super::error::Result;
use super::status::{FLAG_TX_ABORTED, FLAG_TX_STALLED, FLAG_TX_TRUNCATED, StatusCell};
use crate::hal::Capabilities;
use crate::internal::ring::{self, RingStorage};

/// Observable transmit engine state
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum TxState {
    /// No DMA run in flight
    Idle,
    /// A run of `committed` bytes starting at `head` is in flight
    Running {
        /// Length of the run handed to `start_tx`
        committed: usize,
    },
}

impl TxState {
    /// Check whether a run is in flight
    #[inline]
    pub fn is_running(&self) -> bool {
        matches!(self, TxState::Running { .. })
    }
}

pub(crate) struct TxRing<const N: usize> {
    storage: RingStorage<N>,
    head: AtomicUsize,
    tail: AtomicUsize,
    running: AtomicBool,
    committed: AtomicUsize,
}

impl<const N: usize> TxRing<N> {
    pub(crate) const fn new() -> Self {
        Self {
            storage: RingStorage::new(),
            head: AtomicUsize::new(0),
            tail: AtomicUsize::new(0),
            running: AtomicBool::new(false),
            committed: AtomicUsize::new(0),
        }
    }

    /// Return to the empty idle state (exclusive access)
    pub(crate) fn reset(&mut self) {
        self.storage.clear();
        *self.head.get_mut() = 0;
        *self.tail.get_mut() = 0;
        *self.running.get_mut() = false;
        *self.committed.get_mut() = 0;
    }

    /// Bytes queued or in flight
    #[inline]
    pub(crate) fn used(&self) -> usize {
        ring::used::<N>(self.head.load(Ordering::Acquire), self.tail.load(Ordering::Acquire))
    }

    /// Bytes a `send` can accept right now
    #[inline]
    pub(crate) fn free(&self) -> usize {
        ring::free::<N>(self.head.load(Ordering::Acquire), self.tail.load(Ordering::Acquire))
    }

    /// Copy as much of `data` as fits and start a run if the engine is idle.
    ///
    /// Returns the number of bytes accepted, which is always a prefix of
    /// `data`. If the run cannot be started the bytes accepted by this call
    /// are dropped again and the error is returned.
    pub(crate) fn send<C: Capabilities>(
        &self,
        caps: &C,
        status: &StatusCell,
        data: &[u8],
    ) -> Result<usize> {
        if data.is_empty() {
            return Ok(0);
        }

        let head = self.head.load(Ordering::Acquire);
        let tail = self.tail.load(Ordering::Relaxed);
        let accepted = core::cmp::min(data.len(), ring::free::<N>(head, tail));

        if accepted > 0 {
            // SAFETY: the slots between `tail` and `head - 1` are free; only
            // this side writes them and DMA never reads past `tail`.
            unsafe { self.storage.write_wrapping(tail, &data[..accepted]) };
            self.tail
                .store(ring::advance::<N>(tail, accepted), Ordering::Release);
        }

        if let Err(e) = self.kick(caps) {
            if accepted > 0 {
                self.tail.store(tail, Ordering::Release);
            }
            return Err(e);
        }

        if accepted < data.len() {
            status.raise(FLAG_TX_TRUNCATED);
        }
        Ok(accepted)
    }

    /// Application-side continuation.
    ///
    /// Same as [`continue_if_idle`](Self::continue_if_idle) but masked
    /// against the TX-complete interrupt.
    pub(crate) fn kick<C: Capabilities>(&self, caps: &C) -> Result<bool> {
        critical_section::with(|_| self.continue_if_idle(caps))
    }

    /// Start the next run if the engine is idle and data is queued.
    ///
    /// Returns whether a run was started. A failed start leaves the engine
    /// idle with nothing committed.
    pub(crate) fn continue_if_idle<C: Capabilities>(&self, caps: &C) -> Result<bool> {
        if self.running.load(Ordering::Acquire) {
            return Ok(false);
        }

        let head = self.head.load(Ordering::Relaxed);
        let tail = self.tail.load(Ordering::Acquire);
        let run = ring::contiguous::<N>(head, tail);
        if run == 0 {
            return Ok(false);
        }

        caps.start_tx(self.storage.ptr_at(head).cast_const(), run)?;

        self.committed.store(run, Ordering::Relaxed);
        self.running.store(true, Ordering::Release);
        Ok(true)
    }

    /// TX-complete handler (interrupt context only).
    ///
    /// Retires the committed run and chains the next one. Completions that
    /// arrive while idle are ignored. If the follow-up run fails to start the
    /// bytes stay queued and [`FLAG_TX_STALLED`] is raised.
    pub(crate) fn on_transfer_complete<C: Capabilities>(
        &self,
        caps: &C,
        status: &StatusCell,
    ) -> Result<()> {
        if !self.running.load(Ordering::Acquire) {
            return Ok(());
        }

        let committed = self.committed.load(Ordering::Relaxed);
        let head = self.head.load(Ordering::Relaxed);
        self.head
            .store(ring::advance::<N>(head, committed), Ordering::Release);
        self.running.store(false, Ordering::Release);
        self.committed.store(0, Ordering::Relaxed);

        if let Err(e) = self.continue_if_idle(caps) {
            status.raise(FLAG_TX_STALLED);
            warn!("TX continuation failed, {} bytes stalled", self.used());
            return Err(e);
        }
        Ok(())
    }

    /// Stop the transmit DMA and discard everything queued.
    ///
    /// Runs masked. The engine is marked idle before `abort_tx` is issued, so
    /// a completion still pending for the aborted run is ignored instead of
    /// chaining the next one. If the abort capability fails the engine is
    /// left untouched.
    pub(crate) fn abort<C: Capabilities>(&self, caps: &C, status: &StatusCell) -> Result<()> {
        critical_section::with(|_| {
            let was_running = self.running.swap(false, Ordering::AcqRel);
            if let Err(e) = caps.abort_tx() {
                self.running.store(was_running, Ordering::Release);
                return Err(e);
            }
            self.committed.store(0, Ordering::Relaxed);

            let head = self.head.load(Ordering::Acquire);
            let tail = self.tail.load(Ordering::Relaxed);
            if head != tail {
                status.raise(FLAG_TX_ABORTED);
                debug!("TX abort dropped {} bytes", ring::used::<N>(head, tail));
            }
            self.tail.store(head, Ordering::Release);
            Ok(())
        })
    }

    /// Consistent snapshot of `running` and `committed`
    pub(crate) fn state(&self) -> TxState {
        loop {
            if !self.running.load(Ordering::Acquire) {
                return TxState::Idle;
            }
            let committed = self.committed.load(Ordering::Acquire);
            // A completion and resubmission may have slipped in between the
            // two flag reads; committed is never 0 for a live run.
            if committed != 0 && self.running.load(Ordering::Acquire) {
                return TxState::Running { committed };
            }
        }
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
