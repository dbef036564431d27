use recorder::shm::ChannelType;
use std::sync::atomic::AtomicU64;

fn temp_path(name: &str) -> (tempfile::TempDir, String) {
    let dir = tempfile::tempdir().expect("create temp dir");
    let path = dir.path().join(name).to_str().unwrap().to_string();
    (dir, path)
}

#[test]
fn write_read_roundtrip_preserves_timestamp_and_value() {
    let (_dir, path) = temp_path("roundtrip");
    let set = recorder::chans_new(&path).unwrap();
    let channel = recorder::chan_new(&set, "queue_depth", "depth of the work queue", "items", 16).unwrap();

    for (t, v) in [(10u64, 1u64), (20, 2), (30, 3)] {
        recorder::chan_write(&channel, t, v);
    }

    let cursor = AtomicU64::new(0);
    let samples: Vec<(u64, u64)> = std::iter::from_fn(|| recorder::chan_read(&channel, &cursor).map(|s| (s.timestamp, s.value))).collect();

    assert_eq!(samples, vec![(10, 1), (20, 2), (30, 3)]);
}

#[test]
fn subscriber_finds_channel_by_name_pattern_from_another_handle() {
    let (_dir, path) = temp_path("subscriber_find");
    let set = recorder::chans_new(&path).unwrap();
    let a = recorder::chan_new(&set, "alpha.depth", "d", "items", 8).unwrap();
    let _b = recorder::chan_new(&set, "beta.depth", "d", "items", 8).unwrap();
    recorder::chan_write(&a, 1, 100);

    let subscriber = recorder::chans_open(&path).unwrap();
    let found = recorder::chan_find(&subscriber, "alpha\\.depth", None).unwrap().expect("channel exists");
    assert_eq!(recorder::chan_name(&found), "alpha.depth");

    let cursor = AtomicU64::new(0);
    let sample = recorder::chan_read(&found, &cursor).expect("sample was written");
    assert_eq!(sample.value, 100);
}

#[test]
fn type_is_inferred_from_first_use_format_specifier() {
    let (_dir, path) = temp_path("type_inference");
    let set = recorder::chans_new(&path).unwrap();

    let signed = recorder::chan_new(&set, "signed_chan", "d", "u", 4).unwrap();
    signed.ensure_type("queue depth %d", 0);
    assert_eq!(recorder::chan_type(&signed), ChannelType::Signed);

    let unsigned = recorder::chan_new(&set, "unsigned_chan", "d", "u", 4).unwrap();
    unsigned.ensure_type("queue depth %u", 0);
    assert_eq!(recorder::chan_type(&unsigned), ChannelType::Unsigned);

    let real = recorder::chan_new(&set, "real_chan", "d", "u", 4).unwrap();
    real.ensure_type("latency %f seconds", 0);
    assert_eq!(recorder::chan_type(&real), ChannelType::Real);
}

#[test]
fn type_inference_is_sticky_after_first_call() {
    let (_dir, path) = temp_path("type_sticky");
    let set = recorder::chans_new(&path).unwrap();
    let channel = recorder::chan_new(&set, "sticky_chan", "d", "u", 4).unwrap();

    channel.ensure_type("%d", 0);
    assert_eq!(recorder::chan_type(&channel), ChannelType::Signed);

    // A later call with a different specifier must not overwrite the type
    // already installed by the first writer.
    channel.ensure_type("%f", 0);
    assert_eq!(recorder::chan_type(&channel), ChannelType::Signed);
}

#[test]
fn allocating_a_large_channel_forces_the_mapping_to_grow_and_relocate() {
    let (_dir, path) = temp_path("grow_to_remap");
    let set = recorder::chans_new(&path).unwrap();

    // Each sample is 16 bytes; 4096 samples is 64 KiB of items alone, far
    // larger than the single page the channel set is initially mapped at,
    // forcing `Mapping::grow_to` to actually extend the file and re-mmap.
    let channel = recorder::chan_new(&set, "big_channel", "forces a real remap", "u", 4096).unwrap();

    recorder::chan_write(&channel, 1, 0xAAAA);
    let cursor = AtomicU64::new(0);
    let sample = recorder::chan_read(&channel, &cursor).expect("sample survives the remap");
    assert_eq!(sample.value, 0xAAAA);
}
