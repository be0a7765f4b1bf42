//! Centralized Constants
//!
//! Single source of truth for the default sizes, timeouts and numeric codes
//! used throughout the driver.
//!
//! # Organization
//!
//! - **Buffer sizes**: default ring capacities and the reserved slot
//! - **Timing**: flush polling and default timeouts
//! - **Result codes**: the signed status convention shared with C firmware

// =============================================================================
// Buffer Sizes
// =============================================================================

/// Default transmit ring capacity in bytes (127 usable)
pub const DEFAULT_TX_CAPACITY: usize = 128;

/// Default receive ring capacity in bytes (1023 usable)
pub const DEFAULT_RX_CAPACITY: usize = 1024;

/// Slots permanently kept free in each ring so `head == tail` means empty
pub const RESERVED_SLOTS: usize = 1;

/// Smallest ring capacity that can hold at least one byte
pub const MIN_CAPACITY: usize = RESERVED_SLOTS + 1;

// =============================================================================
// Timing
// =============================================================================

/// Default delay between flush polls when pacing with `DelayNs`
pub const FLUSH_POLL_INTERVAL_US: u32 = 100;

/// Default flush timeout in milliseconds
pub const DEFAULT_FLUSH_TIMEOUT_MS: u32 = 1_000;

// =============================================================================
// Result Codes
// =============================================================================

/// Success code in the signed result convention
pub const OK_CODE: i32 = 0;

/// Generic failure
pub const GENERIC_ERROR_CODE: i32 = -1;

/// Operation timed out
pub const TIMEOUT_CODE: i32 = -2;

/// Invalid argument or incomplete capability table
pub const INVALID_ARGUMENT_CODE: i32 = -3;

/// Resource busy
pub const BUSY_CODE: i32 = -4;

/// Driver not initialized
pub const NOT_INITIALIZED_CODE: i32 = -5;

/// Operation not supported with the current configuration
pub const NOT_SUPPORTED_CODE: i32 = -6;
