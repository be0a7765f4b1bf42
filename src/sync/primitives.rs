//! Synchronization primitives for ISR-safe access.

use core::cell::RefCell;
#[cfg(feature = "async")]
use core::task::Waker;
use critical_section::Mutex;

/// Interior-mutable cell guarded by a critical section.
///
/// Used for state that both the application and interrupt handlers touch
/// but that does not fit the single-writer index protocol, such as the
/// installed [`UartIrq`](crate::UartIrq) in an [`IrqSlot`](super::IrqSlot).
pub struct CriticalSectionCell<T> {
    inner: Mutex<RefCell<T>>,
}

impl<T> CriticalSectionCell<T> {
    /// Create a new cell (const, suitable for static initialization).
    pub const fn new(value: T) -> Self {
        Self {
            inner: Mutex::new(RefCell::new(value)),
        }
    }

    /// Run `f` with exclusive access, interrupts masked.
    ///
    /// # Panics
    ///
    /// Re-entering the same cell from inside `f` panics; use
    /// [`try_with`](Self::try_with) where that can happen.
    #[inline]
    pub fn with<R, F>(&self, f: F) -> R
    where
        F: FnOnce(&mut T) -> R,
    {
        critical_section::with(|cs| f(&mut self.inner.borrow_ref_mut(cs)))
    }

    /// Like [`with`](Self::with), but returns `None` if the cell is
    /// already borrowed further up the stack.
    #[inline]
    pub fn try_with<R, F>(&self, f: F) -> Option<R>
    where
        F: FnOnce(&mut T) -> R,
    {
        critical_section::with(|cs| {
            self.inner
                .borrow(cs)
                .try_borrow_mut()
                .ok()
                .map(|mut value| f(&mut value))
        })
    }

    /// Run `f` with shared access, interrupts masked.
    #[inline]
    pub fn with_ref<R, F>(&self, f: F) -> R
    where
        F: FnOnce(&T) -> R,
    {
        critical_section::with(|cs| f(&self.inner.borrow_ref(cs)))
    }
}

// SAFETY: every access goes through a critical section, and values only move
// between contexts when `T: Send`.
unsafe impl<T: Send> Sync for CriticalSectionCell<T> {}

/// Waker slot filled by a pending future and drained by an interrupt.
#[cfg(feature = "async")]
pub struct AtomicWaker {
    waker: CriticalSectionCell<Option<Waker>>,
}

#[cfg(feature = "async")]
impl AtomicWaker {
    /// Create an empty slot (const, suitable for static initialization).
    pub const fn new() -> Self {
        Self {
            waker: CriticalSectionCell::new(None),
        }
    }

    /// Store `waker`, replacing any waker for a different task.
    pub fn register(&self, waker: &Waker) {
        self.waker.with(|slot| {
            if !slot.as_ref().is_some_and(|w| w.will_wake(waker)) {
                *slot = Some(waker.clone());
            }
        });
    }

    /// Take and wake the stored waker, if any.
    #[inline]
    pub fn wake(&self) {
        // Wake outside the critical section.
        if let Some(waker) = self.waker.with(Option::take) {
            waker.wake();
        }
    }

    /// Check whether a waker is stored
    pub fn is_registered(&self) -> bool {
        self.waker.with_ref(Option::is_some)
    }
}

#[cfg(feature = "async")]
impl Default for AtomicWaker {
    fn default() -> Self {
        Self::new()
    }
}
