//! Emits a handful of trace events into one recorder and merge-dumps them.

fn main() {
    let rec = recorder::register_recorder(recorder::Recorder::new(
        "demo.basic",
        "basic emit example",
        256,
    ));
    rec.set_trace(1);

    for i in 0..5 {
        recorder::emit(rec, "basic_emit.rs:12", "iteration %d of %d", &[i, 5]);
    }

    recorder::dump();
}
