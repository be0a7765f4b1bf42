//! Error types for the DMA UART driver
//!
//! A single flat [`Error`] enum mirrors the signed status codes used by C
//! firmware around this driver: `0` is success, negative values are errors
//! and non-negative values on success carry a byte count. The
//! "success, but..." cases are reported through
//! [`StatusFlags`](crate::StatusFlags) instead of the return value.

use crate::internal::constants::{
    BUSY_CODE, GENERIC_ERROR_CODE, INVALID_ARGUMENT_CODE, NOT_INITIALIZED_CODE,
    NOT_SUPPORTED_CODE, OK_CODE, TIMEOUT_CODE,
};

/// Driver error
///
/// Returned by lifecycle calls, by `flush`, and passed through unchanged
/// when a [`Capabilities`](crate::Capabilities) operation fails.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum Error {
    /// Unspecified failure, typically reported by the DMA layer
    Generic,
    /// Deadline passed before the operation completed
    Timeout,
    /// Missing capability or invalid configuration
    InvalidArgument,
    /// Resource already in use (e.g. device initialized twice)
    Busy,
    /// Device used before a successful `init`
    NotInitialized,
    /// Operation unavailable with the current configuration
    NotSupported,
}

impl core::fmt::Display for Error {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        f.write_str(self.as_str())
    }
}

impl Error {
    /// Returns a human-readable description of the error
    #[must_use]
    pub const fn as_str(&self) -> &'static str {
        match self {
            Error::Generic => "generic error",
            Error::Timeout => "operation timed out",
            Error::InvalidArgument => "invalid argument",
            Error::Busy => "resource busy",
            Error::NotInitialized => "not initialized",
            Error::NotSupported => "not supported",
        }
    }

    /// Negative status code for this error
    #[must_use]
    pub const fn code(self) -> i32 {
        match self {
            Error::Generic => GENERIC_ERROR_CODE,
            Error::Timeout => TIMEOUT_CODE,
            Error::InvalidArgument => INVALID_ARGUMENT_CODE,
            Error::Busy => BUSY_CODE,
            Error::NotInitialized => NOT_INITIALIZED_CODE,
            Error::NotSupported => NOT_SUPPORTED_CODE,
        }
    }

    /// Map a status code returned by C-style DMA glue back to an error.
    ///
    /// Non-negative codes are successes and return `None`. Unknown negative
    /// codes collapse to [`Error::Generic`].
    #[must_use]
    pub const fn from_code(code: i32) -> Option<Self> {
        match code {
            c if c >= OK_CODE => None,
            TIMEOUT_CODE => Some(Error::Timeout),
            INVALID_ARGUMENT_CODE => Some(Error::InvalidArgument),
            BUSY_CODE => Some(Error::Busy),
            NOT_INITIALIZED_CODE => Some(Error::NotInitialized),
            NOT_SUPPORTED_CODE => Some(Error::NotSupported),
            _ => Some(Error::Generic),
        }
    }

    /// Convert a C-style status code into a `Result`
    pub const fn check(code: i32) -> Result<()> {
        match Self::from_code(code) {
            Some(e) => Err(e),
            None => Ok(()),
        }
    }
}

/// Result type alias for driver operations
pub type Result<T> = core::result::Result<T, Error>;

/// Fold a byte-count result into the signed status convention.
///
/// Counts above `i32::MAX` saturate.
#[must_use]
pub fn result_code(result: Result<usize>) -> i32 {
    match result {
        Ok(n) => i32::try_from(n).unwrap_or(i32::MAX),
        Err(e) => e.code(),
    }
}

// =============================================================================
// Unit Tests
// =============================================================================
