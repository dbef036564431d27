//! Publishes one recorder's first argument into a shared-memory channel and
//! reads it back through a [`recorder::chans_open`] subscriber, the way an
//! external monitoring process would.

use std::sync::atomic::AtomicU64;

fn main() {
    let path = std::env::temp_dir().join("recorder_shared_memory_export_demo");
    let path = path.to_str().expect("temp path is valid UTF-8");
    let _ = std::fs::remove_file(path);

    let rec = recorder::register_recorder(recorder::Recorder::new(
        "demo.queue_depth",
        "depth of some queue, exported for live monitoring",
        64,
    ));

    let outcome = recorder::trace_set(&format!("share={path}:demo\\.queue_depth=depth"));
    assert_eq!(outcome, recorder::TraceSetOutcome::Ok);

    for depth in [3u64, 7, 2, 9] {
        recorder::emit(rec, "shared_memory_export.rs:21", "queue depth %u", &[depth]);
    }

    let subscriber = recorder::chans_open(path).expect("channel set was just created by trace_set");
    let channel = recorder::chan_find(&subscriber, "depth", None)
        .expect("pattern compiles")
        .expect("channel was published above");

    let cursor = AtomicU64::new(0);
    while let Some(sample) = recorder::chan_read(&channel, &cursor) {
        println!("t={} depth={}", sample.timestamp, sample.value);
    }

    let _ = std::fs::remove_file(path);
}
