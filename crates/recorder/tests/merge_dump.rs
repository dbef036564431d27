use recorder::{dump_for, emit, register_recorder, Recorder};

#[test]
fn merge_dump_orders_across_recorders_by_global_order() {
    let a = register_recorder(Recorder::new("merge_dump.alpha", "d", 64));
    let b = register_recorder(Recorder::new("merge_dump.beta", "d", 64));
    a.set_trace(0);
    b.set_trace(0);

    emit(a, "merge_dump.rs:9", "a1", &[]);
    emit(b, "merge_dump.rs:10", "b1", &[]);
    emit(a, "merge_dump.rs:11", "a2", &[]);
    emit(b, "merge_dump.rs:12", "b2", &[]);

    let count = dump_for("merge_dump\\.(alpha|beta)");
    assert_eq!(count, 4);

    // A second pass finds nothing new: both rings were fully drained.
    let count2 = dump_for("merge_dump\\.(alpha|beta)");
    assert_eq!(count2, 0);
}

#[test]
fn pattern_restricts_which_recorders_are_drained() {
    let only = register_recorder(Recorder::new("merge_dump.only", "d", 64));
    let other = register_recorder(Recorder::new("merge_dump.untouched", "d", 64));
    only.set_trace(0);
    other.set_trace(0);

    emit(only, "merge_dump.rs:28", "x", &[]);
    emit(other, "merge_dump.rs:29", "y", &[]);

    let count = dump_for("merge_dump\\.only");
    assert_eq!(count, 1);
    assert!(!other.is_empty());
}
