use crate::registry::Registry;
use std::sync::atomic::{AtomicI64, Ordering};

/// A named, runtime-mutable integer exposed to the configuration language.
pub struct Tweak {
    pub name: &'static str,
    pub description: &'static str,
    value: AtomicI64,
}

impl Tweak {
    pub const fn new(name: &'static str, description: &'static str, default: i64) -> Self {
        Self {
            name,
            description,
            value: AtomicI64::new(default),
        }
    }

    #[inline]
    pub fn get(&self) -> i64 {
        self.value.load(Ordering::Relaxed)
    }

    #[inline]
    pub fn set(&self, value: i64) {
        self.value.store(value, Ordering::Relaxed);
    }
}

/// Process-wide registry of tweaks, registered symmetrically to recorders.
static TWEAKS: Registry<Tweak> = Registry::new();

pub fn register_tweak(tweak: Tweak) -> &'static Tweak {
    TWEAKS.push(tweak)
}

pub fn tweaks() -> impl Iterator<Item = &'static Tweak> {
    TWEAKS.iter()
}

pub fn find_tweak(name: &str) -> Option<&'static Tweak> {
    TWEAKS.iter().find(|t| t.name == name)
}

/// Milliseconds the background dumper sleeps between empty passes.
pub static RECORDER_DUMP_SLEEP: once_cell_tweak::Lazy<&'static Tweak> =
    once_cell_tweak::Lazy::new(|| register_tweak(Tweak::new("recorder_dump_sleep", "background dumper sleep interval in milliseconds", 100)));

/// Additional signal mask bits OR-ed into `dump_on_common_signals`.
pub static RECORDER_SIGNALS: once_cell_tweak::Lazy<&'static Tweak> =
    once_cell_tweak::Lazy::new(|| register_tweak(Tweak::new("recorder_signals", "extra signal bitmask ORed into dump_on_common_signals", 0)));

/// Minimal lazily-initialized-once cell, local to this crate so it does not
/// need an `once_cell` dependency just for two process-wide statics.
mod once_cell_tweak {
    use std::sync::OnceLock;

    pub struct Lazy<T> {
        cell: OnceLock<T>,
        init: fn() -> T,
    }

    impl<T> Lazy<T> {
        pub const fn new(init: fn() -> T) -> Self {
            Self {
                cell: OnceLock::new(),
                init,
            }
        }
    }

    impl<T> std::ops::Deref for Lazy<T> {
        type Target = T;
        fn deref(&self) -> &T {
            self.cell.get_or_init(self.init)
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn tweak_get_set() {
        let tweak = Tweak::new("x", "d", 5);
        assert_eq!(tweak.get(), 5);
        tweak.set(9);
        assert_eq!(tweak.get(), 9);
    }

    #[test]
    fn recorder_dump_sleep_has_default() {
        assert_eq!(RECORDER_DUMP_SLEEP.get(), 100);
    }
}
