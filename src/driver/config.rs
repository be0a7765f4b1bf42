//! Configuration types for the DMA UART driver

use super::error::{Error, Result};
use crate::internal::constants::{FLUSH_POLL_INTERVAL_US, MIN_CAPACITY, RESERVED_SLOTS};

/// Runtime driver configuration
///
/// Ring capacities are const generics on [`DmaUart`](crate::DmaUart); this
/// struct only holds what can change without resizing memory.
///
/// # Example
///
/// ```ignore
/// let config = UartConfig::new()
///     .with_rx_batch_size(256)
///     .with_timeouts(false);
/// ```
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub struct UartConfig {
    /// Bytes per receive batch; `None` selects half the RX capacity
    pub rx_batch_size: Option<usize>,
    /// Whether timeout support (and thus a clock capability) is required
    pub timeouts: bool,
    /// Delay between polls in [`UartTx::flush_with_delay`](crate::UartTx::flush_with_delay)
    pub flush_poll_interval_us: u32,
}

impl Default for UartConfig {
    fn default() -> Self {
        Self::new()
    }
}

impl UartConfig {
    /// Default configuration: half-buffer RX batches, timeouts enabled
    #[must_use]
    pub const fn new() -> Self {
        Self {
            rx_batch_size: None,
            timeouts: true,
            flush_poll_interval_us: FLUSH_POLL_INTERVAL_US,
        }
    }

    /// Set a fixed receive batch size in bytes
    #[must_use]
    pub const fn with_rx_batch_size(mut self, size: usize) -> Self {
        self.rx_batch_size = Some(size);
        self
    }

    /// Enable or disable timeout support
    ///
    /// With timeouts disabled no clock capability is required and
    /// [`UartTx::flush`](crate::UartTx::flush) reports `NotSupported`.
    #[must_use]
    pub const fn with_timeouts(mut self, enabled: bool) -> Self {
        self.timeouts = enabled;
        self
    }

    /// Set the flush polling interval in microseconds
    #[must_use]
    pub const fn with_flush_poll_interval_us(mut self, interval_us: u32) -> Self {
        self.flush_poll_interval_us = interval_us;
        self
    }

    /// Check the configuration against ring capacities.
    ///
    /// Returns the effective receive batch size. The batch must divide `RX`
    /// and be at most `RX / 2`, so every window starts on a batch boundary and
    /// a full window always fits beside the reserved slot.
    pub const fn validate<const TX: usize, const RX: usize>(&self) -> Result<usize> {
        if TX < MIN_CAPACITY || RX < MIN_CAPACITY {
            return Err(Error::InvalidArgument);
        }
        if self.flush_poll_interval_us == 0 {
            return Err(Error::InvalidArgument);
        }

        let batch = match self.rx_batch_size {
            Some(size) => size,
            None => RX / 2,
        };
        if batch == 0 || batch > RX - RESERVED_SLOTS || batch > RX / 2 || RX % batch != 0 {
            return Err(Error::InvalidArgument);
        }
        Ok(batch)
    }
}
