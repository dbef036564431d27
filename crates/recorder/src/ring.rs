use crate::backoff::Backoff;
use crate::invariants::{
    debug_assert_bounded_lag, debug_assert_monotonic, debug_assert_ring_order,
};
use crate::loom_compat::{AtomicU64, Slot};
use crate::metrics::{Metrics, MetricsSnapshot};
use std::sync::atomic::Ordering;

// =============================================================================
// MEMORY ORDERING & SYNCHRONIZATION STRATEGY
// =============================================================================
//
// This is a lock-free multi-producer/multi-consumer ring buffer. Unlike a
// classic SPSC ring (single writer owning `tail`, single reader owning
// `head`), any number of producer threads may reserve slots concurrently,
// and any number of independent cursors may read concurrently.
//
// ## Counters
//
// - `writer`: bumped by `fetch_add`-via-CAS for every reservation. Multiple
//   producers race on this; the winner of the CAS owns the reserved range
//   `[start, start+n)` exclusively.
// - `commit`: only ever advanced from `commit == start` to `start + n`,
//   i.e. strictly in reservation order. A producer that finishes writing its
//   payload before an earlier reservation has committed must spin
//   (`Backoff::snooze`) until its turn comes. This is the single
//   wait-freedom sacrifice of the design.
// - `reader` / `overflow`: see `check_overrun` below for how a write that
//   would lap an unread slot is handled without ever blocking the writer.
//
// ## Memory ordering
//
// - `writer` CAS uses `AcqRel`/`Relaxed`: only the winner needs to observe a
//   consistent ordering relative to its own payload write.
// - `commit` is stored with `Release` and loaded with `Acquire`, so that a
//   reader observing `commit > pos` is guaranteed to see the fully written
//   payload at `pos`.
// - `reader`/`overflow` bumps use `Relaxed` for the fast path and `AcqRel`
//   CAS loops when forcing a floor forward, since they are bookkeeping, not
//   a publication barrier.
//
// =============================================================================

/// Outcome of reading (or peeking) one item from a ring via a cursor.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ReadOutcome<T> {
    /// An item was available and is returned.
    Item(T),
    /// No committed item is available yet.
    Empty,
    /// The cursor had fallen more than one wrap behind the writer; it has
    /// been snapped forward to `writer - capacity` and the caller should
    /// discard this result and retry.
    CatchUp,
}

/// A lock-free multi-producer/multi-consumer ring buffer of fixed-size,
/// `Copy` items.
///
/// `size` (the capacity) must be a power of two. Writers never block:
/// on overrun both the commit and reader cursors are force-advanced
/// together so that `reader <= commit <= writer` always holds.
#[repr(C)]
pub struct Ring<T: Copy> {
    /// Bump-allocated via CAS by producers; `[0, writer)` is the set of all
    /// reservations ever made.
    writer: CacheAligned<AtomicU64>,
    /// Advances strictly in reservation order; `[0, commit)` is safe to read.
    commit: CacheAligned<AtomicU64>,
    /// The ring's own built-in consumer cursor (used by the default
    /// single-consumer path, e.g. a recorder's merge-dump). External
    /// subscribers may instead own a private `AtomicU64` cursor and pass it
    /// to the cursor-taking methods below.
    reader: CacheAligned<AtomicU64>,
    /// Number of times a write had to force the floor forward.
    overflow: CacheAligned<AtomicU64>,
    metrics: Metrics,
    mask: usize,
    buffer: Box<[Slot<T>]>,
}

// Safety: all shared access to `buffer` goes through disjoint-index raw
// pointer reads/writes gated by the reservation protocol above.
unsafe impl<T: Copy + Send> Send for Ring<T> {}
unsafe impl<T: Copy + Send> Sync for Ring<T> {}

impl<T: Copy> Ring<T> {
    /// Creates a ring with the given capacity, which must be a power of two.
    ///
    /// # Panics
    ///
    /// Panics if `capacity` is zero or not a power of two.
    pub fn with_capacity(capacity: usize) -> Self {
        assert!(capacity > 0 && capacity.is_power_of_two(), "ring capacity must be a power of two");
        let buffer = (0..capacity).map(|_| Slot::new()).collect::<Vec<_>>().into_boxed_slice();

        Self {
            writer: CacheAligned::new(AtomicU64::new(0)),
            commit: CacheAligned::new(AtomicU64::new(0)),
            reader: CacheAligned::new(AtomicU64::new(0)),
            overflow: CacheAligned::new(AtomicU64::new(0)),
            metrics: Metrics::new(),
            mask: capacity - 1,
            buffer,
        }
    }

    #[inline]
    pub fn capacity(&self) -> usize {
        self.mask + 1
    }

    /// Returns the ring's built-in reader cursor, used by the default
    /// single-consumer path (e.g. a recorder's own dump cursor).
    #[inline]
    pub fn reader_cursor(&self) -> &AtomicU64 {
        &self.reader.value
    }

    #[inline]
    pub fn metrics(&self) -> MetricsSnapshot {
        self.metrics.snapshot()
    }

    #[inline]
    pub fn overflow_count(&self) -> u64 {
        self.overflow.value.load(Ordering::Relaxed)
    }

    /// True if no committed item is available under the given cursor.
    pub fn is_empty(&self, cursor: &AtomicU64) -> bool {
        let pos = cursor.load(Ordering::Relaxed);
        let commit = self.commit.value.load(Ordering::Acquire);
        pos >= commit
    }

    /// `commit - cursor`, clamped to `capacity`.
    pub fn readable(&self, cursor: &AtomicU64) -> u64 {
        let pos = cursor.load(Ordering::Relaxed);
        let commit = self.commit.value.load(Ordering::Acquire);
        commit.saturating_sub(pos).min(self.capacity() as u64)
    }

    // ---------------------------------------------------------------------
    // PRODUCER SIDE
    // ---------------------------------------------------------------------

    /// Reserves `n` consecutive slots, writes `items` into them, and
    /// publishes via the commit-in-order protocol. Never blocks the caller
    /// longer than the number of other in-flight reservations (see
    /// `publish`). `items.len()` must be <= capacity; longer writes are
    /// truncated to `capacity`.
    pub fn write(&self, items: &[T]) {
        let n = items.len().min(self.capacity()) as u64;
        if n == 0 {
            return;
        }
        let start = self.reserve(n);
        for (i, item) in items.iter().take(n as usize).enumerate() {
            let idx = ((start + i as u64) as usize) & self.mask;
            // SAFETY: this reservation owns indices [start, start+n) exclusively;
            // no other producer will touch them until the writer counter wraps
            // all the way back around, which cannot happen while this call is
            // still in flight.
            unsafe {
                self.buffer[idx].write(*item);
            }
        }
        self.metrics.add_items_written(n);
        self.publish(start, n);
    }

    /// Convenience wrapper for the common single-item emit path.
    #[inline]
    pub fn push(&self, item: T) {
        self.write(std::slice::from_ref(&item));
    }

    /// Reserves `n` consecutive slots via CAS and applies the overrun
    /// policy. Returns the start sequence of the reservation.
    fn reserve(&self, n: u64) -> u64 {
        loop {
            let current = self.writer.value.load(Ordering::Relaxed);
            let next = current + n;
            if self
                .writer
                .value
                .compare_exchange_weak(current, next, Ordering::AcqRel, Ordering::Relaxed)
                .is_ok()
            {
                debug_assert_monotonic!("writer", current, next);
                self.check_overrun(current, n);
                return current;
            }
        }
    }

    /// If this reservation would lap an unread slot, records the overrun and
    /// forces both `reader` and `commit` forward to the new floor so that
    /// the `reader <= commit <= writer` invariant is preserved even though
    /// the discarded range was never actually read.
    fn check_overrun(&self, start: u64, n: u64) {
        let end = start + n;
        let capacity = self.capacity() as u64;
        let floor = end.saturating_sub(capacity);
        let reader = self.reader.value.load(Ordering::Relaxed);
        if floor > reader {
            self.metrics.record_overrun();
            self.overflow.value.fetch_add(1, Ordering::Relaxed);
            Self::advance_floor(&self.reader.value, floor);
            Self::advance_floor(&self.commit.value, floor);
        }
    }

    fn advance_floor(counter: &AtomicU64, floor: u64) {
        let mut current = counter.load(Ordering::Relaxed);
        while current < floor {
            match counter.compare_exchange_weak(current, floor, Ordering::AcqRel, Ordering::Relaxed) {
                Ok(_) => break,
                Err(actual) => current = actual,
            }
        }
    }

    /// Commit-in-order barrier: spins until every earlier reservation has
    /// published, then advances `commit` by `n`. If an overrun floor bump
    /// already discarded this range (because a later writer lapped it
    /// before this one could publish), returns immediately without writing
    /// `commit` backwards.
    fn publish(&self, start: u64, n: u64) {
        let mut backoff = Backoff::new();
        let mut spins = 0u64;
        loop {
            let current = self.commit.value.load(Ordering::Acquire);
            if current >= start + n {
                // Already published, or discarded by a concurrent overrun.
                break;
            }
            if current == start {
                if self
                    .commit
                    .value
                    .compare_exchange(current, start + n, Ordering::AcqRel, Ordering::Relaxed)
                    .is_ok()
                {
                    break;
                }
                continue;
            }
            spins += 1;
            backoff.snooze();
        }
        if spins > 0 {
            self.metrics.add_commit_spins(spins);
        }
        debug_assert_ring_order!(
            self.reader.value.load(Ordering::Relaxed),
            self.commit.value.load(Ordering::Relaxed),
            self.writer.value.load(Ordering::Relaxed)
        );
        debug_assert_bounded_lag!(
            self.writer.value.load(Ordering::Relaxed),
            self.reader.value.load(Ordering::Relaxed),
            self.capacity(),
            self.overflow.value.load(Ordering::Relaxed)
        );
    }

    // ---------------------------------------------------------------------
    // CONSUMER SIDE
    // ---------------------------------------------------------------------

    /// Peeks the item at `cursor` without advancing it.
    pub fn peek(&self, cursor: &AtomicU64) -> ReadOutcome<T> {
        let pos = cursor.load(Ordering::Relaxed);
        let writer = self.writer.value.load(Ordering::Acquire);
        let capacity = self.capacity() as u64;
        if writer.wrapping_sub(pos) > capacity {
            let floor = writer - capacity;
            cursor.store(floor, Ordering::Relaxed);
            self.metrics.record_catch_up();
            return ReadOutcome::CatchUp;
        }

        let commit = self.commit.value.load(Ordering::Acquire);
        if pos >= commit {
            return ReadOutcome::Empty;
        }

        let idx = (pos as usize) & self.mask;
        // SAFETY: pos < commit, so this slot has been fully published by its
        // writer (Acquire load above synchronizes with that writer's Release
        // store to `commit`), and T: Copy so reading it does not move out of
        // shared storage.
        let item = unsafe { self.buffer[idx].read() };
        ReadOutcome::Item(item)
    }

    /// Reads the item at `cursor`, advancing it by one on success.
    pub fn read(&self, cursor: &AtomicU64) -> ReadOutcome<T> {
        match self.peek(cursor) {
            ReadOutcome::Item(item) => {
                cursor.fetch_add(1, Ordering::Release);
                self.metrics.add_items_read(1);
                ReadOutcome::Item(item)
            }
            other => other,
        }
    }

    /// Reads up to `out.len()` items starting at `cursor`, advancing it by
    /// the number actually read. Stops at the first gap or catch-up.
    pub fn read_batch(&self, cursor: &AtomicU64, out: &mut [T]) -> usize {
        let mut n = 0;
        while n < out.len() {
            match self.read(cursor) {
                ReadOutcome::Item(item) => {
                    out[n] = item;
                    n += 1;
                }
                ReadOutcome::Empty | ReadOutcome::CatchUp => break,
            }
        }
        n
    }
}

// ---------------------------------------------------------------------
// HELPER: cache-line aligned wrapper
// ---------------------------------------------------------------------

/// 128-byte alignment prevents prefetcher-induced false sharing between the
/// hot writer/commit/reader/overflow counters on Intel/AMD CPUs.
#[repr(align(128))]
struct CacheAligned<T> {
    value: T,
}

impl<T> CacheAligned<T> {
    const fn new(value: T) -> Self {
        Self { value }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::AtomicU64;
    use std::sync::Arc;
    use std::thread;

    #[test]
    fn single_thread_write_read_order() {
        let ring = Ring::<u64>::with_capacity(8);
        let cursor = AtomicU64::new(0);

        ring.push(1);
        ring.push(2);
        ring.push(3);

        assert_eq!(ring.read(&cursor), ReadOutcome::Item(1));
        assert_eq!(ring.read(&cursor), ReadOutcome::Item(2));
        assert_eq!(ring.read(&cursor), ReadOutcome::Item(3));
        assert_eq!(ring.read(&cursor), ReadOutcome::Empty);
        assert_eq!(ring.overflow_count(), 0);
    }

    #[test]
    fn overrun_every_other_write_with_size_one() {
        let ring = Ring::<u64>::with_capacity(1);
        // With no reader, every second write laps the single slot.
        for i in 0..10u64 {
            ring.push(i);
        }
        assert_eq!(ring.overflow_count(), 9);
    }

    #[test]
    fn writing_past_capacity_forces_reader_to_writer_minus_size() {
        let ring = Ring::<u64>::with_capacity(4);
        for i in 0..5u64 {
            ring.push(i);
        }
        let reader = ring.reader_cursor().load(Ordering::Relaxed);
        assert_eq!(reader, 5 - 4);
    }

    #[test]
    fn catch_up_snaps_cursor_forward() {
        let ring = Ring::<u64>::with_capacity(4);
        let cursor = AtomicU64::new(0);
        for i in 0..20u64 {
            ring.push(i);
        }
        // cursor is way behind; first read should report CatchUp and snap forward.
        let outcome = ring.read(&cursor);
        assert_eq!(outcome, ReadOutcome::CatchUp);
        assert_eq!(cursor.load(Ordering::Relaxed), 20 - 4);
    }

    #[test]
    fn dump_at_most_capacity_entries_after_overrun() {
        let ring = Ring::<u64>::with_capacity(4);
        let cursor = AtomicU64::new(0);
        for i in 0..10u64 {
            ring.push(i);
        }
        let mut out = [0u64; 16];
        let n = ring.read_batch(&cursor, &mut out);
        assert!(n <= 4);
        assert_eq!(out[n - 1], 9);
    }

    #[test]
    fn concurrent_producers_preserve_ring_order_invariant() {
        let ring = Arc::new(Ring::<u64>::with_capacity(1024));
        let mut handles = Vec::new();
        for t in 0..8u64 {
            let ring = Arc::clone(&ring);
            handles.push(thread::spawn(move || {
                for i in 0..2000u64 {
                    ring.push(t * 10_000 + i);
                }
            }));
        }
        for h in handles {
            h.join().unwrap();
        }
        let cursor = AtomicU64::new(0);
        let mut total = 0usize;
        loop {
            match ring.read(&cursor) {
                ReadOutcome::Item(_) => total += 1,
                ReadOutcome::Empty => break,
                ReadOutcome::CatchUp => continue,
            }
        }
        assert!(total <= 16_000);
        assert!(total > 0);
    }
}
