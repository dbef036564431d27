use std::sync::OnceLock;
use std::time::Instant;

/// Source of the monotonic timestamps stamped onto each [`crate::entry::Entry`].
///
/// Pluggable so tests can supply a deterministic clock; production code uses
/// [`SystemTickSource`].
pub trait TickSource: Send + Sync {
    /// Returns a monotonically non-decreasing tick count in nanoseconds.
    fn now_nanos(&self) -> u64;
}

/// Default tick source: nanoseconds elapsed since the source was created,
/// measured with [`std::time::Instant`].
pub struct SystemTickSource {
    epoch: Instant,
}

impl SystemTickSource {
    pub fn new() -> Self {
        Self { epoch: Instant::now() }
    }
}

impl Default for SystemTickSource {
    fn default() -> Self {
        Self::new()
    }
}

impl TickSource for SystemTickSource {
    fn now_nanos(&self) -> u64 {
        self.epoch.elapsed().as_nanos() as u64
    }
}

static DEFAULT_TICK_SOURCE: OnceLock<SystemTickSource> = OnceLock::new();

/// Returns the process-wide default tick source, initialized lazily on
/// first use so the epoch is "time the recorder subsystem first ran" rather
/// than "process start".
pub fn default_tick_source() -> &'static SystemTickSource {
    DEFAULT_TICK_SOURCE.get_or_init(SystemTickSource::new)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn ticks_are_monotonic() {
        let src = SystemTickSource::new();
        let a = src.now_nanos();
        let b = src.now_nanos();
        assert!(b >= a);
    }
}
