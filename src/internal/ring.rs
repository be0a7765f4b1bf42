//! Ring index arithmetic and byte storage shared by the TX and RX engines.
//!
//! Every index lives in `[0, N)` and advances modulo `N`. One slot is always
//! left free, so `head == tail` means empty and `used == N - 1` means full.

use core::cell::UnsafeCell;
use core::ops::Range;

use super::constants::RESERVED_SLOTS;

/// Advance `index` by `n` slots, wrapping at `N`
#[inline(always)]
pub(crate) const fn advance<const N: usize>(index: usize, n: usize) -> usize {
    (index + n) % N
}

/// Bytes between `head` (oldest byte) and `tail` (next free slot)
#[inline(always)]
pub(crate) const fn used<const N: usize>(head: usize, tail: usize) -> usize {
    (tail + N - head) % N
}

/// Bytes a producer may still add without making `tail` catch `head`
#[inline(always)]
pub(crate) const fn free<const N: usize>(head: usize, tail: usize) -> usize {
    N - RESERVED_SLOTS - used::<N>(head, tail)
}

/// Length of the longest non-wrapping run of queued bytes starting at `head`
#[inline(always)]
pub(crate) const fn contiguous<const N: usize>(head: usize, tail: usize) -> usize {
    if head <= tail { tail - head } else { N - head }
}

/// Split `len` bytes starting at `start` into at most two contiguous ranges.
///
/// The first range ends at the physical end of the buffer at the latest; the
/// second one (possibly empty) restarts at index 0.
#[inline]
pub(crate) fn split_at_wrap<const N: usize>(start: usize, len: usize) -> (Range<usize>, Range<usize>) {
    let first_len = core::cmp::min(len, N - start);
    (start..start + first_len, 0..len - first_len)
}

/// Fixed-capacity byte storage that DMA hardware and the CPU share.
///
/// The storage itself carries no indices; the owning engine decides which
/// region belongs to which side at any time.
#[repr(transparent)]
pub(crate) struct RingStorage<const N: usize> {
    bytes: UnsafeCell<[u8; N]>,
}

// SAFETY: access to a region is only performed by the context that owns it
// under the engine's index protocol (producer writes free slots, consumer
// reads published slots, DMA touches only the armed window or run).
unsafe impl<const N: usize> Sync for RingStorage<N> {}

impl<const N: usize> RingStorage<N> {
    /// Create zeroed storage (const, suitable for static initialization)
    pub(crate) const fn new() -> Self {
        Self {
            bytes: UnsafeCell::new([0u8; N]),
        }
    }

    /// Capacity in bytes
    #[inline(always)]
    pub(crate) const fn capacity(&self) -> usize {
        N
    }

    /// Pointer to the byte at `index`, for handing to the DMA engine
    #[inline(always)]
    pub(crate) fn ptr_at(&self, index: usize) -> *mut u8 {
        debug_assert!(index < N);
        // SAFETY: index < N keeps the pointer inside the array.
        unsafe { self.bytes.get().cast::<u8>().add(index) }
    }

    /// Copy `src` into the ring starting at `start`, wrapping once at the end.
    ///
    /// # Safety
    ///
    /// The caller must own the `src.len()` slots starting at `start`: neither
    /// DMA nor the other context may access them during the call.
    pub(crate) unsafe fn write_wrapping(&self, start: usize, src: &[u8]) {
        debug_assert!(src.len() < N);
        let (first, second) = split_at_wrap::<N>(start, src.len());
        let split = first.len();
        // SAFETY: both ranges are in bounds and owned by the caller.
        unsafe {
            core::ptr::copy_nonoverlapping(src.as_ptr(), self.ptr_at(first.start), split);
            if !second.is_empty() {
                core::ptr::copy_nonoverlapping(
                    src.as_ptr().add(split),
                    self.ptr_at(0),
                    second.len(),
                );
            }
        }
    }

    /// Copy bytes out of the ring starting at `start` into `dst`.
    ///
    /// # Safety
    ///
    /// The caller must own the `dst.len()` slots starting at `start`: they
    /// must hold published data that nothing else writes during the call.
    pub(crate) unsafe fn read_wrapping(&self, start: usize, dst: &mut [u8]) {
        debug_assert!(dst.len() < N);
        let (first, second) = split_at_wrap::<N>(start, dst.len());
        let split = first.len();
        // SAFETY: both ranges are in bounds and owned by the caller.
        unsafe {
            core::ptr::copy_nonoverlapping(self.ptr_at(first.start), dst.as_mut_ptr(), split);
            if !second.is_empty() {
                core::ptr::copy_nonoverlapping(
                    self.ptr_at(0),
                    dst.as_mut_ptr().add(split),
                    second.len(),
                );
            }
        }
    }

    /// Zero the whole buffer (exclusive access)
    pub(crate) fn clear(&mut self) {
        *self.bytes.get_mut() = [0u8; N];
    }
}

// =============================================================================
// Tests
// =============================================================================
