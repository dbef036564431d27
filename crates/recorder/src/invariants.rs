//! Debug assertion macros for ring buffer invariants.
//!
//! These only fire in debug builds, so there is zero overhead in release
//! builds.
//!
//! Used by [`crate::ring::Ring`].

/// Assert that `reader <= commit <= writer` holds.
///
/// A slot is only safe to read once committed, and nothing is ever
/// committed ahead of what has been reserved.
macro_rules! debug_assert_ring_order {
    ($reader:expr, $commit:expr, $writer:expr) => {
        debug_assert!(
            $reader <= $commit && $commit <= $writer,
            "ring order violated: reader {} <= commit {} <= writer {} does not hold",
            $reader,
            $commit,
            $writer
        )
    };
}

/// Assert that `writer - reader <= capacity * (1 + overflow)`.
///
/// Overrun is counted, not blocked, so the lag is bounded by the overflow
/// multiplier rather than by capacity alone.
macro_rules! debug_assert_bounded_lag {
    ($writer:expr, $reader:expr, $capacity:expr, $overflow:expr) => {
        debug_assert!(
            $writer.wrapping_sub($reader) <= ($capacity as u64).saturating_mul(1 + $overflow),
            "bounded lag violated: writer-reader lag {} exceeds capacity*(1+overflow) bound",
            $writer.wrapping_sub($reader)
        )
    };
}

/// Assert that a sequence counter only moves forward.
macro_rules! debug_assert_monotonic {
    ($name:literal, $old:expr, $new:expr) => {
        debug_assert!(
            $new >= $old,
            "monotonic progress violated: {} decreased from {} to {}",
            $name,
            $old,
            $new
        )
    };
}

/// Assert that successive draws from the process-wide order counter strictly
/// increase.
macro_rules! debug_assert_order_increasing {
    ($old:expr, $new:expr) => {
        debug_assert!(
            $new > $old,
            "order increasing violated: order went from {} to {}",
            $old,
            $new
        )
    };
}

pub(crate) use debug_assert_bounded_lag;
pub(crate) use debug_assert_monotonic;
pub(crate) use debug_assert_order_increasing;
pub(crate) use debug_assert_ring_order;
