use crate::clock::{default_tick_source, TickSource};
use crate::consts::{MAX_ARGS, SHARE_MAGIC};
use crate::entry::Entry;
use crate::format;
use crate::registry::Registry;
use crate::ring::{ReadOutcome, Ring};
use crate::shm::Channel;
use crate::sink;
use std::sync::atomic::{AtomicI64, AtomicPtr, AtomicU64, Ordering};

/// Sentinel `trace` value meaning "exported only": entries are written into
/// the ring and pushed to export channels, but never printed synchronously.
pub const TRACE_EXPORTED_ONLY: i64 = SHARE_MAGIC as i64;

/// A named ring of trace entries plus export configuration.
pub struct Recorder {
    pub name: &'static str,
    pub description: &'static str,
    trace: AtomicI64,
    ring: Ring<Entry>,
    exported: [AtomicPtr<Channel>; MAX_ARGS],
}

impl Recorder {
    pub fn new(name: &'static str, description: &'static str, capacity: usize) -> Self {
        Self {
            name,
            description,
            trace: AtomicI64::new(0),
            ring: Ring::with_capacity(capacity),
            exported: Default::default(),
        }
    }

    #[inline]
    pub fn trace(&self) -> i64 {
        // Relaxed: concurrent trace_set/emit races on this field are
        // accepted as a visible window since the store is word-sized.
        self.trace.load(Ordering::Relaxed)
    }

    #[inline]
    pub fn set_trace(&self, value: i64) {
        self.trace.store(value, Ordering::Relaxed);
    }

    pub fn ring(&self) -> &Ring<Entry> {
        &self.ring
    }

    /// Installs `channel` as the export target for argument slot `i`,
    /// leaking it for the process lifetime (symmetric with recorders and
    /// tweaks) until explicitly cleared.
    pub fn set_exported(&self, i: usize, channel: &'static Channel) {
        self.exported[i].store(channel as *const Channel as *mut Channel, Ordering::Release);
    }

    pub fn exported(&self, i: usize) -> Option<&'static Channel> {
        let ptr = self.exported[i].load(Ordering::Acquire);
        // SAFETY: channels are leaked for the process lifetime once
        // installed, so a non-null pointer observed here is always valid.
        unsafe { ptr.as_ref() }
    }

    pub fn is_empty(&self) -> bool {
        self.ring.is_empty(self.ring.reader_cursor())
    }
}

/// Process-wide monotonic counter establishing total order across all
/// recorders.
static GLOBAL_ORDER: AtomicU64 = AtomicU64::new(0);

static RECORDERS: Registry<Recorder> = Registry::new();

/// Pushes `recorder` onto the global list via a CAS loop on the head.
/// Duplicate registration of the same name is a caller bug.
pub fn register_recorder(recorder: Recorder) -> &'static Recorder {
    RECORDERS.push(recorder)
}

pub fn recorders() -> impl Iterator<Item = &'static Recorder> {
    RECORDERS.iter()
}

pub fn find_recorder(name: &str) -> Option<&'static Recorder> {
    RECORDERS.iter().find(|r| r.name == name)
}

/// The emit hot path. Async-signal-safe: the ring write is allocation-free,
/// and the synchronous-print branch reads the installed formatter/sink
/// through `format::render`/`sink::show`, both lock-free `AtomicPtr` swaps,
/// so nothing here can block on a lock a signal handler might already be
/// holding on the interrupted thread.
pub fn emit(recorder: &Recorder, location: &'static str, format: &'static str, args: &[u64]) {
    let timestamp = default_tick_source().now_nanos();
    let order = GLOBAL_ORDER.fetch_add(1, Ordering::Relaxed);
    let entry = Entry::new(timestamp, order, location, format, args);
    recorder.ring.push(entry);

    let trace = recorder.trace();
    if trace != 0 && trace != TRACE_EXPORTED_ONLY {
        if let Some(line) = format::render(recorder.name, &entry) {
            sink::show(line.as_bytes());
        }
    }

    for (i, &arg) in entry.args().iter().enumerate().take(MAX_ARGS) {
        if let Some(channel) = recorder.exported(i) {
            channel.ensure_type(format, i);
            channel.write_sample(timestamp, arg);
        }
    }
}

/// Peeks the oldest unread entry of `recorder` without consuming it, for
/// use by the merge-dump algorithm.
pub fn peek(recorder: &Recorder) -> ReadOutcome<Entry> {
    recorder.ring.peek(recorder.ring.reader_cursor())
}

/// Reads (consuming) the oldest unread entry of `recorder`.
pub fn read(recorder: &Recorder) -> ReadOutcome<Entry> {
    recorder.ring.read(recorder.ring.reader_cursor())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn emit_assigns_strictly_increasing_order_same_thread() {
        let recorder = Recorder::new("test.order", "d", 16);
        emit(&recorder, "a.rs:1", "%d", &[1]);
        emit(&recorder, "a.rs:2", "%d", &[2]);
        emit(&recorder, "a.rs:3", "%d", &[3]);

        let a = read(&recorder);
        let b = read(&recorder);
        let c = read(&recorder);
        let orders: Vec<u64> = [a, b, c]
            .into_iter()
            .filter_map(|o| match o {
                ReadOutcome::Item(e) => Some(e.order),
                _ => None,
            })
            .collect();
        assert_eq!(orders.len(), 3);
        assert!(orders[0] < orders[1] && orders[1] < orders[2]);
    }

    #[test]
    fn exported_only_sentinel_suppresses_print() {
        let recorder = Recorder::new("test.sentinel", "d", 16);
        recorder.set_trace(TRACE_EXPORTED_ONLY);
        assert_eq!(recorder.trace(), TRACE_EXPORTED_ONLY);
        assert_ne!(recorder.trace(), 0);
    }
}
