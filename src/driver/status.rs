//! Auxiliary status flags.
//!
//! Positive results mean "success"; anything worth knowing beyond the byte
//! count (truncated sends, a stalled receive window, ...) is latched here and
//! read separately with [`UartTx::flags`](crate::UartTx::flags) or
//! [`DmaUart::flags`](crate::DmaUart::flags).

use portable_atomic::{AtomicU32, Ordering};

/// A send accepted fewer bytes than offered
pub const FLAG_TX_TRUNCATED: u32 = 1 << 0;
/// A continuation from the TX-complete callback failed to start
pub const FLAG_TX_STALLED: u32 = 1 << 1;
/// Queued TX bytes were discarded by an abort
pub const FLAG_TX_ABORTED: u32 = 1 << 2;
/// The next RX window was still occupied by unread bytes
pub const FLAG_RX_OVERRUN: u32 = 1 << 3;
/// Rearming the RX DMA for the next batch failed
pub const FLAG_RX_REARM_FAILED: u32 = 1 << 4;

/// Snapshot of the latched status flags
///
/// # Example
///
/// ```ignore
/// let n = tx.send(b"hello")?;
/// if tx.flags().tx_truncated {
///     // retry the remainder later
/// }
/// ```
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub struct StatusFlags {
    /// A send accepted fewer bytes than offered
    pub tx_truncated: bool,
    /// TX engine idle with data queued after a failed continuation
    pub tx_stalled: bool,
    /// Queued TX bytes were discarded by an abort
    pub tx_aborted: bool,
    /// RX hardware paused because the reader fell behind
    pub rx_overrun: bool,
    /// RX batch rearm failed at the DMA layer
    pub rx_rearm_failed: bool,
}

impl StatusFlags {
    /// Create from a raw flag word
    #[inline]
    pub fn from_raw(raw: u32) -> Self {
        Self {
            tx_truncated: (raw & FLAG_TX_TRUNCATED) != 0,
            tx_stalled: (raw & FLAG_TX_STALLED) != 0,
            tx_aborted: (raw & FLAG_TX_ABORTED) != 0,
            rx_overrun: (raw & FLAG_RX_OVERRUN) != 0,
            rx_rearm_failed: (raw & FLAG_RX_REARM_FAILED) != 0,
        }
    }

    /// Convert back to a raw flag word
    #[inline]
    pub fn to_raw(&self) -> u32 {
        let mut val = 0u32;
        if self.tx_truncated {
            val |= FLAG_TX_TRUNCATED;
        }
        if self.tx_stalled {
            val |= FLAG_TX_STALLED;
        }
        if self.tx_aborted {
            val |= FLAG_TX_ABORTED;
        }
        if self.rx_overrun {
            val |= FLAG_RX_OVERRUN;
        }
        if self.rx_rearm_failed {
            val |= FLAG_RX_REARM_FAILED;
        }
        val
    }

    /// Check if any flag is set
    #[inline]
    pub fn any(&self) -> bool {
        self.to_raw() != 0
    }

    /// Check if a flag reports a DMA-layer failure
    #[inline]
    pub fn has_error(&self) -> bool {
        self.tx_stalled || self.rx_rearm_failed
    }
}

/// Atomic flag word written from both execution contexts.
///
/// Unlike the ring indices this word has many writers, so it is only ever
/// updated with read-modify-write operations.
pub(crate) struct StatusCell {
    raw: AtomicU32,
}

impl StatusCell {
    pub(crate) const fn new() -> Self {
        Self {
            raw: AtomicU32::new(0),
        }
    }

    #[inline]
    pub(crate) fn raise(&self, flags: u32) {
        self.raw.fetch_or(flags, Ordering::AcqRel);
    }

    #[inline]
    pub(crate) fn clear(&self, flags: u32) {
        self.raw.fetch_and(!flags, Ordering::AcqRel);
    }

    #[inline]
    pub(crate) fn get(&self) -> StatusFlags {
        StatusFlags::from_raw(self.raw.load(Ordering::Acquire))
    }

    /// Read and clear every flag
    #[inline]
    pub(crate) fn take(&self) -> StatusFlags {
        StatusFlags::from_raw(self.raw.swap(0, Ordering::AcqRel))
    }

    pub(crate) fn reset(&mut self) {
        *self.raw.get_mut() = 0;
    }
}
