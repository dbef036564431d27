//! Installs the common crash/user signal set and triggers one manually by
//! raising `SIGUSR1`, demonstrating that a merge-dump happens before the
//! process's previous disposition (here, the default "ignore and continue"
//! test harness disposition) takes over.

fn main() {
    let rec = recorder::register_recorder(recorder::Recorder::new(
        "demo.crash",
        "events leading up to a signal",
        128,
    ));
    rec.set_trace(1);

    recorder::emit(rec, "dump_on_crash.rs:14", "about to raise SIGUSR1", &[]);
    recorder::dump_on_common_signals(&[], &[]);

    unsafe {
        libc::raise(libc::SIGUSR1);
    }

    recorder::emit(rec, "dump_on_crash.rs:21", "still running after the signal", &[]);
    recorder::dump();
}
