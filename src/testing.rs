//! Testing utilities and mock implementations
//!
//! Mock DMA layer, clock, delay and wakers for exercising the driver on the host
//! without hardware access.
//!
//! Only available when running `cargo test`.

// Note: The #[cfg(test)] attribute is applied in lib.rs where this module is declared
#![allow(missing_docs)]
#![allow(clippy::std_instead_of_core, clippy::std_instead_of_alloc)]

extern crate std;

use core::cell::RefCell;
use std::vec::Vec;

use crate::driver::error::{Error, Result};
use crate::hal::Capabilities;

// =============================================================================
// Mock DMA
// =============================================================================

#[derive(Debug, Default)]
struct MockState {
    /// Address of the first RX start, used as offset origin
    rx_base: Option<usize>,
    /// (offset, len) for every successful RX start
    rx_starts: Vec<(usize, usize)>,
    /// Bytes captured at every successful TX start
    tx_runs: Vec<Vec<u8>>,
    /// (address, len) of the last successful TX start
    tx_window: Option<(usize, usize)>,
    rx_aborts: usize,
    tx_aborts: usize,
    /// Currently armed RX window
    rx_window: Option<(usize, usize)>,
    rx_remaining: usize,
    fail_start_rx: Option<Error>,
    fail_start_tx: Option<Error>,
    fail_abort_tx: Option<Error>,
    fail_abort_rx: Option<Error>,
    clock: Option<u32>,
    clock_step: u32,
    clock_reads: usize,
}

/// Mock DMA/UART layer implementing [`Capabilities`]
///
/// Records every transfer the driver starts and lets tests play the role of
/// the hardware: deliver bytes into the armed RX window, script the
/// remaining count, and inject failures.
///
/// # Example
///
/// ```ignore
/// let dma = MockDma::new();
/// let mut uart = pin!(DmaUart::<&MockDma, 8, 32>::new());
/// uart.as_mut().init(&dma, UartConfig::new().with_timeouts(false)).unwrap();
///
/// dma.deliver(b"hi");
/// ```
#[derive(Debug, Default)]
pub struct MockDma {
    state: RefCell<MockState>,
}

impl MockDma {
    /// Create a mock without a clock
    pub fn new() -> Self {
        Self::default()
    }

    /// Create a mock whose clock starts at `start` and advances `step`
    /// milliseconds on every read
    pub fn with_clock(start: u32, step: u32) -> Self {
        let mock = Self::default();
        {
            let mut s = mock.state.borrow_mut();
            s.clock = Some(start);
            s.clock_step = step;
        }
        mock
    }

    /// Write bytes into the armed RX window, as the DMA engine would
    pub fn deliver(&self, bytes: &[u8]) {
        let mut s = self.state.borrow_mut();
        let (addr, len) = s.rx_window.expect("no RX window armed");
        let filled = len - s.rx_remaining;
        assert!(
            bytes.len() <= s.rx_remaining,
            "delivery of {} bytes overflows window ({} left)",
            bytes.len(),
            s.rx_remaining
        );
        // SAFETY: the window was armed by the driver and stays valid until
        // the next start or abort.
        unsafe {
            core::ptr::copy_nonoverlapping(
                bytes.as_ptr(),
                (addr as *mut u8).add(filled),
                bytes.len(),
            );
        }
        s.rx_remaining -= bytes.len();
    }

    /// Override the remaining count reported for the current batch
    pub fn set_rx_remaining(&self, remaining: usize) {
        self.state.borrow_mut().rx_remaining = remaining;
    }

    /// Make the next `start_rx` fail with `error`
    pub fn fail_next_start_rx(&self, error: Error) {
        self.state.borrow_mut().fail_start_rx = Some(error);
    }

    /// Make the next `start_tx` fail with `error`
    pub fn fail_next_start_tx(&self, error: Error) {
        self.state.borrow_mut().fail_start_tx = Some(error);
    }

    /// Make the next `abort_tx` fail with `error`
    pub fn fail_next_abort_tx(&self, error: Error) {
        self.state.borrow_mut().fail_abort_tx = Some(error);
    }

    /// Make the next `abort_rx` fail with `error`
    pub fn fail_next_abort_rx(&self, error: Error) {
        self.state.borrow_mut().fail_abort_rx = Some(error);
    }

    /// (address, len) of the RX window currently armed
    pub fn armed_rx_window(&self) -> Option<(usize, usize)> {
        self.state.borrow().rx_window
    }

    /// (address, len) of the last TX run started
    pub fn last_tx_window(&self) -> Option<(usize, usize)> {
        self.state.borrow().tx_window
    }

    /// (offset, len) of every RX batch started so far
    pub fn rx_starts(&self) -> Vec<(usize, usize)> {
        self.state.borrow().rx_starts.clone()
    }

    /// Bytes of every TX run started so far
    pub fn tx_runs(&self) -> Vec<Vec<u8>> {
        self.state.borrow().tx_runs.clone()
    }

    /// All transmitted bytes concatenated in start order
    pub fn tx_bytes(&self) -> Vec<u8> {
        self.state.borrow().tx_runs.concat()
    }

    pub fn rx_abort_count(&self) -> usize {
        self.state.borrow().rx_aborts
    }

    pub fn tx_abort_count(&self) -> usize {
        self.state.borrow().tx_aborts
    }

    /// Number of clock reads performed by the driver
    pub fn clock_reads(&self) -> usize {
        self.state.borrow().clock_reads
    }
}

impl Capabilities for MockDma {
    fn start_rx(&self, dst: *mut u8, len: usize) -> Result<()> {
        let mut s = self.state.borrow_mut();
        if let Some(e) = s.fail_start_rx.take() {
            return Err(e);
        }
        let addr = dst as usize;
        let base = *s.rx_base.get_or_insert(addr);
        s.rx_starts.push((addr - base, len));
        s.rx_window = Some((addr, len));
        s.rx_remaining = len;
        Ok(())
    }

    fn abort_rx(&self) -> Result<()> {
        let mut s = self.state.borrow_mut();
        if let Some(e) = s.fail_abort_rx.take() {
            return Err(e);
        }
        s.rx_aborts += 1;
        s.rx_window = None;
        Ok(())
    }

    fn rx_remaining(&self) -> usize {
        self.state.borrow().rx_remaining
    }

    fn start_tx(&self, src: *const u8, len: usize) -> Result<()> {
        let mut s = self.state.borrow_mut();
        if let Some(e) = s.fail_start_tx.take() {
            return Err(e);
        }
        // SAFETY: the driver hands out a run inside its own TX storage.
        let run = unsafe { core::slice::from_raw_parts(src, len) };
        s.tx_runs.push(run.to_vec());
        s.tx_window = Some((src as usize, len));
        Ok(())
    }

    fn abort_tx(&self) -> Result<()> {
        let mut s = self.state.borrow_mut();
        if let Some(e) = s.fail_abort_tx.take() {
            return Err(e);
        }
        s.tx_aborts += 1;
        Ok(())
    }

    fn now_millis(&self) -> Option<u32> {
        let mut s = self.state.borrow_mut();
        let now = s.clock?;
        s.clock_reads += 1;
        s.clock = Some(now.wrapping_add(s.clock_step));
        Some(now)
    }

    fn has_clock(&self) -> bool {
        self.state.borrow().clock.is_some()
    }
}

// =============================================================================
// Mock Delay
// =============================================================================

/// Mock delay for testing without actual timing
///
/// Records delays for verification without actually waiting.
#[derive(Debug, Default)]
pub struct MockDelay {
    /// Total nanoseconds delayed
    total_ns: RefCell<u64>,
}

impl MockDelay {
    /// Create a new mock delay
    pub fn new() -> Self {
        Self::default()
    }

    /// Get total nanoseconds that were "delayed"
    pub fn total_ns(&self) -> u64 {
        *self.total_ns.borrow()
    }

    /// Get total microseconds that were "delayed"
    pub fn total_us(&self) -> u64 {
        self.total_ns() / 1_000
    }
}

impl embedded_hal::delay::DelayNs for MockDelay {
    fn delay_ns(&mut self, ns: u32) {
        *self.total_ns.borrow_mut() += ns as u64;
    }
}

// =============================================================================
// Pseudo-random input
// =============================================================================

/// Small deterministic xorshift generator for randomized property loops
#[derive(Debug, Clone)]
pub struct XorShift(u32);

impl XorShift {
    pub fn new(seed: u32) -> Self {
        Self(if seed == 0 { 0x9E37_79B9 } else { seed })
    }

    pub fn next_u32(&mut self) -> u32 {
        let mut x = self.0;
        x ^= x << 13;
        x ^= x >> 17;
        x ^= x << 5;
        self.0 = x;
        x
    }

    /// Uniform-ish value in `0..bound` (`bound > 0`)
    pub fn below(&mut self, bound: usize) -> usize {
        self.next_u32() as usize % bound
    }
}

// =============================================================================
// Wake counting
// =============================================================================

/// Waker target that counts how often it was woken
#[cfg(feature = "async")]
#[derive(Debug, Default)]
pub struct WakeCounter {
    count: std::sync::atomic::AtomicUsize,
}

#[cfg(feature = "async")]
impl WakeCounter {
    pub fn new() -> std::sync::Arc<Self> {
        std::sync::Arc::new(Self::default())
    }

    pub fn count(&self) -> usize {
        self.count.load(std::sync::atomic::Ordering::SeqCst)
    }

    pub fn waker(self: &std::sync::Arc<Self>) -> core::task::Waker {
        core::task::Waker::from(self.clone())
    }
}

#[cfg(feature = "async")]
impl std::task::Wake for WakeCounter {
    fn wake(self: std::sync::Arc<Self>) {
        self.wake_by_ref();
    }

    fn wake_by_ref(self: &std::sync::Arc<Self>) {
        self.count.fetch_add(1, std::sync::atomic::Ordering::SeqCst);
    }
}

#[cfg(test)]
mod tests {
    extern crate std;
    use std::vec;

    use super::*;
    use embedded_hal::delay::DelayNs;

    #[test]
    fn mock_records_tx_runs() {
        let dma = MockDma::new();
        dma.start_tx(b"abc".as_ptr(), 3).unwrap();
        dma.start_tx(b"de".as_ptr(), 2).unwrap();
        assert_eq!(dma.tx_runs().len(), 2);
        assert_eq!(dma.tx_bytes(), b"abcde".to_vec());
    }

    #[test]
    fn mock_delivers_into_window() {
        let dma = MockDma::new();
        let mut buf = [0u8; 8];
        dma.start_rx(buf.as_mut_ptr(), 4).unwrap();
        dma.deliver(b"xy");
        assert_eq!(dma.rx_remaining(), 2);
        dma.deliver(b"z");
        assert_eq!(dma.rx_remaining(), 1);
        assert_eq!(&buf[..3], b"xyz");
        assert_eq!(dma.rx_starts(), vec![(0, 4)]);
    }

    #[test]
    fn mock_rx_offsets_relative_to_first_start() {
        let dma = MockDma::new();
        let mut buf = [0u8; 8];
        dma.start_rx(buf.as_mut_ptr(), 4).unwrap();
        dma.start_rx(unsafe { buf.as_mut_ptr().add(4) }, 4).unwrap();
        assert_eq!(dma.rx_starts(), vec![(0, 4), (4, 4)]);
    }

    #[test]
    fn mock_injected_failures_fire_once() {
        let dma = MockDma::new();
        dma.fail_next_start_tx(Error::Busy);
        assert_eq!(dma.start_tx(b"a".as_ptr(), 1), Err(Error::Busy));
        assert_eq!(dma.start_tx(b"a".as_ptr(), 1), Ok(()));
        assert_eq!(dma.tx_runs().len(), 1);
    }

    #[test]
    fn mock_clock_advances_per_read() {
        let dma = MockDma::with_clock(100, 5);
        assert!(dma.has_clock());
        assert_eq!(dma.now_millis(), Some(100));
        assert_eq!(dma.now_millis(), Some(105));
        assert_eq!(dma.clock_reads(), 2);

        let no_clock = MockDma::new();
        assert!(!no_clock.has_clock());
        assert_eq!(no_clock.now_millis(), None);
    }

    #[test]
    fn mock_delay_tracking() {
        let mut delay = MockDelay::new();
        delay.delay_ns(1_000);
        delay.delay_us(2);
        assert_eq!(delay.total_ns(), 3_000);
        assert_eq!(delay.total_us(), 3);
    }

    #[test]
    fn xorshift_is_deterministic() {
        let mut a = XorShift::new(7);
        let mut b = XorShift::new(7);
        for _ in 0..16 {
            assert_eq!(a.next_u32(), b.next_u32());
        }
        assert!(XorShift::new(0).below(10) < 10);
    }
}
