use proptest::prelude::*;
use recorder::ring::{ReadOutcome, Ring};
use std::sync::atomic::AtomicU64;

fn capacity_and_values() -> impl Strategy<Value = (usize, Vec<u64>)> {
    (2u32..8).prop_flat_map(|shift| {
        let capacity = 1usize << shift;
        prop::collection::vec(any::<u64>(), 0..=capacity).prop_map(move |values| (capacity, values))
    })
}

proptest! {
    #[test]
    fn single_consumer_reads_back_in_push_order_when_capacity_never_exceeded(
        (capacity, values) in capacity_and_values(),
    ) {
        let ring = Ring::<u64>::with_capacity(capacity);
        for &v in &values {
            ring.push(v);
        }

        let cursor = AtomicU64::new(0);
        let mut read_back = Vec::new();
        loop {
            match ring.read(&cursor) {
                ReadOutcome::Item(v) => read_back.push(v),
                ReadOutcome::Empty => break,
                ReadOutcome::CatchUp => prop_assert!(false, "unexpected catch-up with no overrun"),
            }
        }
        prop_assert_eq!(read_back, values);
        prop_assert_eq!(ring.overflow_count(), 0);
    }

    #[test]
    fn reader_never_outruns_writer_after_any_push_sequence(
        capacity_shift in 0u32..6,
        pushes in 0usize..500,
    ) {
        let capacity = 1usize << capacity_shift;
        let ring = Ring::<u64>::with_capacity(capacity);
        for i in 0..pushes as u64 {
            ring.push(i);
        }
        let reader = ring.reader_cursor().load(std::sync::atomic::Ordering::Relaxed);
        prop_assert!(reader <= pushes as u64);
    }

    #[test]
    fn read_batch_never_returns_more_than_capacity_items(
        capacity_shift in 0u32..6,
        pushes in 0usize..200,
    ) {
        let capacity = 1usize << capacity_shift;
        let ring = Ring::<u64>::with_capacity(capacity);
        for i in 0..pushes as u64 {
            ring.push(i);
        }
        let cursor = AtomicU64::new(0);
        let mut out = vec![0u64; capacity.max(pushes) + 1];
        let n = ring.read_batch(&cursor, &mut out);
        prop_assert!(n <= capacity);
    }
}
