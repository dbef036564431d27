use std::hint;
use std::thread;

/// Adaptive wait strategy for a producer spinning on `Ring::publish`'s
/// commit-in-order barrier.
///
/// A producer only ever spins here because an earlier reservation hasn't
/// published yet, which is expected to resolve in a handful of cycles, so
/// this escalates from tight `PAUSE` spins to a thread yield rather than
/// ever parking: the recorder's emit path must stay usable from a signal
/// handler, where blocking on anything but a spin is not an option.
#[derive(Debug)]
pub struct Backoff {
    step: u32,
}

impl Backoff {
    const SPIN_LIMIT: u32 = 6; // 2^6 = 64 PAUSE instructions before yielding
    const YIELD_LIMIT: u32 = 10;

    #[inline]
    pub fn new() -> Self {
        Self { step: 0 }
    }

    /// Busy-spins with `PAUSE` hints, doubling the spin count each call.
    #[inline]
    pub fn spin(&mut self) {
        let spins = 1 << self.step.min(Self::SPIN_LIMIT);
        for _ in 0..spins {
            hint::spin_loop();
        }
        if self.step <= Self::SPIN_LIMIT {
            self.step += 1;
        }
    }

    /// Spins while under `SPIN_LIMIT`, then falls back to yielding the
    /// thread. Used in the commit-in-order retry loops in `ring.rs` and
    /// `shm/channel.rs`.
    #[inline]
    pub fn snooze(&mut self) {
        if self.step <= Self::SPIN_LIMIT {
            self.spin();
        } else {
            thread::yield_now();
            if self.step <= Self::YIELD_LIMIT {
                self.step += 1;
            }
        }
    }

    /// True once `snooze` has escalated all the way to repeated yields.
    #[inline]
    pub fn is_completed(&self) -> bool {
        self.step > Self::YIELD_LIMIT
    }

    #[inline]
    pub fn reset(&mut self) {
        self.step = 0;
    }
}

impl Default for Backoff {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn snooze_escalates_from_spin_to_yield_and_completes() {
        let mut backoff = Backoff::new();
        assert_eq!(backoff.step, 0);
        assert!(!backoff.is_completed());

        let mut iterations = 0;
        while !backoff.is_completed() {
            backoff.snooze();
            iterations += 1;
            assert!(iterations < 1_000, "backoff never completed");
        }
        assert!(backoff.step > Backoff::YIELD_LIMIT);

        backoff.reset();
        assert_eq!(backoff.step, 0);
    }
}
