//! Indirection layer so [`crate::ring::Ring`] can run under `loom`'s
//! model-checked scheduler when the `loom` feature is enabled, and under
//! plain `std` atomics/cells otherwise.
//!
//! `Backoff`'s spin/yield hints are left as plain `std::hint`/`std::thread`
//! calls in both configurations: they are inert under loom (it does not
//! need to intercept a CPU hint or an uncontended yield to explore
//! interleavings), so swapping them buys nothing.

#[cfg(feature = "loom")]
pub(crate) use loom::sync::atomic::AtomicU64;
#[cfg(not(feature = "loom"))]
pub(crate) use std::sync::atomic::AtomicU64;

/// A single ring slot: holds one possibly-uninitialized `T`, written by
/// exactly one producer and read by any number of concurrent consumers
/// once the ring's `commit` counter has passed it.
#[cfg(feature = "loom")]
pub(crate) struct Slot<T>(loom::cell::UnsafeCell<std::mem::MaybeUninit<T>>);

#[cfg(not(feature = "loom"))]
pub(crate) struct Slot<T>(std::cell::UnsafeCell<std::mem::MaybeUninit<T>>);

#[cfg(feature = "loom")]
impl<T: Copy> Slot<T> {
    pub(crate) fn new() -> Self {
        Slot(loom::cell::UnsafeCell::new(std::mem::MaybeUninit::uninit()))
    }

    /// # Safety
    /// Caller must own this slot's index exclusively (no concurrent writer
    /// or reader of the same index).
    pub(crate) unsafe fn write(&self, value: T) {
        self.0.with_mut(|ptr| (*ptr).write(value));
    }

    /// # Safety
    /// Caller must have observed `commit` past this slot's index.
    pub(crate) unsafe fn read(&self) -> T {
        self.0.with(|ptr| (*ptr).assume_init())
    }
}

#[cfg(not(feature = "loom"))]
impl<T: Copy> Slot<T> {
    pub(crate) fn new() -> Self {
        Slot(std::cell::UnsafeCell::new(std::mem::MaybeUninit::uninit()))
    }

    /// # Safety
    /// Caller must own this slot's index exclusively (no concurrent writer
    /// or reader of the same index).
    pub(crate) unsafe fn write(&self, value: T) {
        (*self.0.get()).write(value);
    }

    /// # Safety
    /// Caller must have observed `commit` past this slot's index.
    pub(crate) unsafe fn read(&self) -> T {
        (*self.0.get()).assume_init()
    }
}

// Safety: `Slot<T>` is only ever accessed through the disjoint-index,
// commit-gated protocol in `ring.rs`.
unsafe impl<T: Copy + Send> Send for Slot<T> {}
unsafe impl<T: Copy + Send> Sync for Slot<T> {}
