use crate::format;
use crate::recorder::{self, Recorder};
use crate::ring::ReadOutcome;
use crate::sink;
use crate::tweak::RECORDER_DUMP_SLEEP;
use regex::RegexBuilder;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Mutex;
use std::thread::JoinHandle;
use std::time::Duration;

/// Merge-dumps every recorder whose name fully matches `pattern`
/// (extended, case-insensitive regex), in global order. Returns the
/// number of entries emitted, or `None` if `pattern` failed to compile
/// (mirrors `trace_set`'s invalid-name outcome).
pub fn sort(pattern: &str) -> Option<usize> {
    let re = RegexBuilder::new(&format!("^(?:{})$", pattern))
        .case_insensitive(true)
        .build()
        .ok()?;

    let matching: Vec<&'static Recorder> = recorder::recorders().filter(|r| re.is_match(r.name)).collect();

    let mut count = 0;
    loop {
        // 1. Among matching, non-empty recorders, pick the one with the
        // smallest `order` at its head.
        let mut best: Option<(&'static Recorder, u64)> = None;
        for &rec in &matching {
            if let ReadOutcome::Item(entry) = recorder::peek(rec) {
                match best {
                    Some((_, order)) if order <= entry.order => {}
                    _ => best = Some((rec, entry.order)),
                }
            }
        }
        let Some((rec, _)) = best else {
            break;
        };

        // 2. Read it. A concurrent overrun may report catch-up; skip and
        // retry the outer loop without manually advancing anything.
        match recorder::read(rec) {
            ReadOutcome::Item(entry) => {
                if let Some(line) = format::render(rec.name, &entry) {
                    sink::show(line.as_bytes());
                }
                count += 1;
            }
            ReadOutcome::CatchUp | ReadOutcome::Empty => continue,
        }
    }
    Some(count)
}

/// `dump()` is `sort(".*")`.
pub fn dump() -> usize {
    sort(".*").unwrap_or(0)
}

/// `dump_for(pattern)`, filtered by full-match regex.
pub fn dump_for(pattern: &str) -> usize {
    sort(pattern).unwrap_or(0)
}

struct BackgroundDumper {
    stop: AtomicBool,
    handle: Mutex<Option<JoinHandle<()>>>,
}

static DUMPER: BackgroundDumper = BackgroundDumper {
    stop: AtomicBool::new(false),
    handle: Mutex::new(None),
};

/// Starts the single dedicated background dumper thread, looping `sort`
/// over `pattern` and sleeping for `recorder_dump_sleep` milliseconds
/// between empty passes. A second call while one is
/// already running is a no-op.
pub fn background_dump(pattern: &'static str) {
    let mut guard = DUMPER.handle.lock().unwrap_or_else(|e| e.into_inner());
    if guard.is_some() {
        return;
    }
    DUMPER.stop.store(false, Ordering::Relaxed);
    let join = std::thread::Builder::new()
        .name("recorder-dump".into())
        .spawn(move || {
            while !DUMPER.stop.load(Ordering::Relaxed) {
                let emitted = sort(pattern).unwrap_or(0);
                if emitted == 0 {
                    let sleep_ms = RECORDER_DUMP_SLEEP.get().max(0) as u64;
                    std::thread::sleep(Duration::from_millis(sleep_ms));
                }
            }
        })
        .expect("failed to spawn background dumper thread");
    *guard = Some(join);
}

/// Stops the background dumper; it exits cleanly at its next loop
/// iteration.
pub fn background_dump_stop() {
    DUMPER.stop.store(true, Ordering::Relaxed);
    let handle = DUMPER.handle.lock().unwrap_or_else(|e| e.into_inner()).take();
    if let Some(handle) = handle {
        let _ = handle.join();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::recorder::{emit, register_recorder, Recorder};

    #[test]
    fn dump_on_empty_system_matching_nothing_returns_zero() {
        assert_eq!(dump_for("nonexistent_recorder_xyz"), 0);
    }

    #[test]
    fn single_recorder_order_preserved() {
        let rec = register_recorder(Recorder::new("dump.single", "d", 16));
        emit(rec, "a.rs:1", "%d", &[1]);
        emit(rec, "a.rs:2", "%d", &[2]);
        emit(rec, "a.rs:3", "%d", &[3]);
        let n = dump_for("dump\\.single");
        assert_eq!(n, 3);
    }

    #[test]
    fn cross_recorder_merge_is_order_sorted() {
        let r1 = register_recorder(Recorder::new("dump.merge.r1", "d", 16));
        let r2 = register_recorder(Recorder::new("dump.merge.r2", "d", 16));
        emit(r1, "a.rs:1", "%d", &[1]);
        emit(r2, "a.rs:2", "%d", &[2]);
        emit(r1, "a.rs:3", "%d", &[3]);
        let n = dump_for("dump\\.merge\\..*");
        assert_eq!(n, 3);
    }
}
