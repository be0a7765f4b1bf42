//! Synchronization and Concurrency Support
//!
//! The ring engines themselves are lock-free under the single-writer
//! protocol. This module holds what sits around them:
//!
//! - **Primitives** (`primitives`)
//!   - [`CriticalSectionCell`] - ISR-safe interior mutability
//!   - [`AtomicWaker`] - waker storage woken from interrupts (`async`)
//!
//! - **Shared slot** (`shared`)
//!   - [`IrqSlot`] - `static` home for the [`UartIrq`](crate::UartIrq)
//!     handle so interrupt handlers can reach it
//!
//! - **Async support** (`asynch`, feature `async`)
//!   - `UartTx::send_async`, `UartTx::flush_async`, `UartRx::receive_async`
//!
//! # Example
//!
//! ```ignore
//! use ph_dma_uart::sync::IrqSlot;
//!
//! static UART_IRQ: IrqSlot<MyDma, 128, 1024> = IrqSlot::new();
//!
//! #[interrupt]
//! fn DMA1_STREAM5() {
//!     UART_IRQ.on_rx_complete().ok();
//! }
//! ```

mod primitives;

#[cfg(feature = "async")]
pub use primitives::AtomicWaker;
pub use primitives::CriticalSectionCell;

mod shared;

pub use shared::IrqSlot;

#[cfg(feature = "async")]
pub mod asynch;
