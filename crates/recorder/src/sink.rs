use std::io::Write;
use std::sync::atomic::{AtomicPtr, AtomicUsize, Ordering};

/// A byte-writer hook: `show(bytes) -> bytes written`.
///
/// Modeled as a trait object rather than a bare function pointer so the
/// sink argument can carry arbitrary opaque state, which a trait object's
/// captured environment models naturally in Rust.
pub trait Sink: Send + Sync {
    fn show(&self, bytes: &[u8]) -> usize;
}

/// Default sink: writes to standard error, the default output when no
/// sink has been configured.
pub struct StderrSink;

impl Sink for StderrSink {
    fn show(&self, bytes: &[u8]) -> usize {
        let mut stderr = std::io::stderr().lock();
        match stderr.write_all(bytes) {
            Ok(()) => bytes.len(),
            Err(_) => 0,
        }
    }
}

static STDERR_SINK: StderrSink = StderrSink;
static DEFAULT_SINK: &'static dyn Sink = &STDERR_SINK;

/// The installed sink, stored as a pointer to a leaked `&'static dyn Sink`
/// (double indirection: `AtomicPtr` can only hold a thin pointer, and a
/// trait object reference is a fat one). Swapped via CAS rather than
/// guarded by a `Mutex` because `show` runs on the emit hot path, which
/// must stay callable from a signal handler — a handler that fires while
/// the interrupted thread holds a non-reentrant lock on this slot would
/// deadlock the process the moment it tried to dump.
static CURRENT_SINK: AtomicPtr<&'static dyn Sink> =
    AtomicPtr::new(&DEFAULT_SINK as *const &'static dyn Sink as *mut &'static dyn Sink);

/// Installs a new sink, returning the previous one.
///
/// The replaced slot is intentionally leaked rather than freed: any number
/// of `show` calls may already be mid-flight holding the old pointer, and
/// there is no quiescence point at which it would be safe to reclaim it.
/// This matches how recorders, tweaks, and channels are never freed either.
pub fn configure_show(sink: &'static dyn Sink) -> &'static dyn Sink {
    let leaked: &'static mut &'static dyn Sink = Box::leak(Box::new(sink));
    let previous = CURRENT_SINK.swap(leaked as *mut &'static dyn Sink, Ordering::AcqRel);
    // SAFETY: every pointer ever stored here points at either `DEFAULT_SINK`
    // or a `Box::leak`ed slot, both of which live for the process lifetime.
    unsafe { *previous }
}

/// Writes `bytes` to the currently configured sink.
pub fn show(bytes: &[u8]) -> usize {
    let ptr = CURRENT_SINK.load(Ordering::Acquire);
    // SAFETY: see `configure_show`.
    let sink = unsafe { *ptr };
    sink.show(bytes)
}

/// Opaque sink argument slot, kept separate from the `Sink` trait object so
/// callers that just want to redirect the default `StderrSink`-style output
/// (e.g. to a different fd) don't need to implement the trait.
static SINK_ARG: AtomicUsize = AtomicUsize::new(0);

/// Sets the opaque sink argument, returning the previous value. The core
/// library never interprets this value; it exists purely so a custom
/// `Sink` implementation can recover caller-supplied state (e.g. a file
/// descriptor number) without a global `static mut`.
pub fn configure_output(arg: usize) -> usize {
    SINK_ARG.swap(arg, Ordering::AcqRel)
}

pub fn output_arg() -> usize {
    SINK_ARG.load(Ordering::Acquire)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::AtomicUsize as StdAtomicUsize;

    struct CountingSink {
        count: StdAtomicUsize,
    }

    impl Sink for CountingSink {
        fn show(&self, bytes: &[u8]) -> usize {
            self.count.fetch_add(1, Ordering::Relaxed);
            bytes.len()
        }
    }

    #[test]
    fn configure_output_roundtrips_previous_value() {
        let prev = configure_output(42);
        let prev2 = configure_output(prev);
        assert_eq!(prev2, 42);
    }

    #[test]
    fn configure_show_installs_and_restores_sink() {
        static COUNTING: CountingSink = CountingSink { count: StdAtomicUsize::new(0) };
        let previous = configure_show(&COUNTING);
        show(b"hello");
        show(b"world");
        assert_eq!(COUNTING.count.load(Ordering::Relaxed), 2);
        configure_show(previous);
    }
}
