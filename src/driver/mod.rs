//! Core driver components for the DMA UART transport.
//!
//! - [`config`] - Runtime configuration and validation
//! - [`error`] - Error type, result alias and numeric status codes
//! - [`status`] - Auxiliary status flags
//! - [`uart`] - The device and its split handles
//!
//! The ring engines (`tx`, `rx`) are internal; they are reached through the
//! handles returned by [`DmaUart::split`].
//!
//! # Example
//!
//! ```ignore
//! use ph_dma_uart::driver::{DmaUart, UartConfig};
//!
//! let config = UartConfig::new().with_rx_batch_size(256);
//! ```

// Submodules
pub mod config;
pub mod error;
pub mod status;
pub mod uart;

mod rx;
mod tx;

// Re-exports for convenience
pub use config::UartConfig;
pub use error::{Error, Result, result_code};
pub use status::{
    FLAG_RX_OVERRUN, FLAG_RX_REARM_FAILED, FLAG_TX_ABORTED, FLAG_TX_STALLED, FLAG_TX_TRUNCATED,
    StatusFlags,
};
pub use tx::TxState;
pub use uart::{DmaUart, DmaUartDefault, DmaUartLarge, DmaUartSmall, UartIrq, UartRx, UartTx};
