//! A non-blocking in-process flight recorder.
//!
//! Application threads emit structured trace events at high frequency —
//! including from signal handlers — without ever blocking, allocating, or
//! taking locks, into lock-free per-recorder ring buffers. A merge-dump
//! operation walks every recorder and produces a single globally-ordered
//! stream on demand, on a crash signal, or continuously from a background
//! thread. Selected numeric argument streams can additionally be published
//! into a memory-mapped file for another process to subscribe to live.
//!
//! # Layout
//!
//! - [`ring`]: the lock-free multi-producer/multi-consumer ring buffer
//!   underlying every recorder and every exported channel.
//! - [`recorder`]: the recorder registry and the [`emit`] hot path.
//! - [`tweak`]: named runtime-mutable integers reachable from the
//!   configuration language.
//! - [`format`] / [`dump`]: the entry formatter and the global merge-dump
//!   algorithm.
//! - [`shm`]: the shared-memory channel set (layout, allocator,
//!   publisher/subscriber).
//! - [`config_lang`]: the trace/tweak configuration language.
//! - [`signal`]: crash/user-signal-triggered dump installation.

pub mod backoff;
pub mod clock;
pub mod config_lang;
pub mod consts;
pub mod dump;
pub mod entry;
pub mod error;
pub mod format;
mod global_share;
mod invariants;
mod loom_compat;
pub mod metrics;
pub mod recorder;
pub mod registry;
pub mod ring;
pub mod shm;
pub mod signal;
pub mod sink;
pub mod tweak;

pub use crate::dump::{background_dump, background_dump_stop, dump, dump_for};
pub use crate::entry::Entry;
pub use crate::error::{ConfigError, ShmError, TraceSetOutcome};
pub use crate::recorder::{emit, register_recorder, Recorder, TRACE_EXPORTED_ONLY};
pub use crate::signal::{dump_on_common_signals, dump_on_signal};
pub use crate::sink::{configure_output, configure_show, Sink};
pub use crate::tweak::{register_tweak, Tweak};

pub use crate::config_lang::trace_set;
pub use crate::format::configure_format;

use crate::shm::{Channel, ChannelSet, Subscriber};

/// Creates a fresh channel set (the publisher/owner side) at `path`.
pub fn chans_new(path: &str) -> Result<ChannelSet, ShmError> {
    ChannelSet::create(path)
}

/// Opens an existing channel set for subscription.
pub fn chans_open(path: &str) -> Result<Subscriber, ShmError> {
    Subscriber::open(path)
}

/// Closes a subscriber. In this implementation that is simply dropping it;
/// this function exists to match the documented operation name.
pub fn chans_close(subscriber: Subscriber) {
    drop(subscriber);
}

/// Deletes an owned channel set's backing file. Existing handles derived
/// from `set` remain valid in memory until dropped, but the path is
/// unlinked so no new subscriber can open it.
pub fn chans_delete(set: ChannelSet, path: &str) {
    drop(set);
    let _ = std::fs::remove_file(path);
}

/// Allocates a new channel named `name` in `set`.
pub fn chan_new(set: &ChannelSet, name: &str, description: &str, unit: &str, capacity: u32) -> Result<Channel, ShmError> {
    set.new_channel(name, description, unit, capacity)
}

/// Pushes `channel`'s offset onto `set`'s free list.
pub fn chan_delete(set: &ChannelSet, channel: &Channel) {
    set.delete_channel(channel);
}

/// Full-regex-matches a channel name within an open subscriber.
pub fn chan_find(subscriber: &Subscriber, pattern: &str, after: Option<&Channel>) -> Result<Option<Channel>, ShmError> {
    subscriber.find(pattern, after)
}

pub fn chan_name(channel: &Channel) -> String {
    channel.name()
}

pub fn chan_description(channel: &Channel) -> String {
    channel.description()
}

pub fn chan_unit(channel: &Channel) -> String {
    channel.unit()
}

pub fn chan_min(channel: &Channel) -> f64 {
    channel.min()
}

pub fn chan_max(channel: &Channel) -> f64 {
    channel.max()
}

pub fn chan_type(channel: &Channel) -> crate::shm::ChannelType {
    channel.kind()
}

pub fn chan_size(channel: &Channel) -> u32 {
    channel.size()
}

pub fn chan_item_size(channel: &Channel) -> u32 {
    channel.item_size()
}

/// Reads one sample at `cursor`, advancing it. `cursor` is owned by the
/// caller so multiple independent subscribers can read the same channel
/// concurrently without interfering with each other.
pub fn chan_read(channel: &Channel, cursor: &std::sync::atomic::AtomicU64) -> Option<crate::shm::Sample> {
    channel.read_sample(cursor)
}

pub fn chan_readable(channel: &Channel, cursor: &std::sync::atomic::AtomicU64) -> u64 {
    channel.readable(cursor)
}

/// The channel's own built-in reader cursor, for callers that don't want to
/// own a private one.
pub fn chan_reader(channel: &Channel) -> &std::sync::atomic::AtomicU64 {
    channel.reader_cursor()
}

pub fn chan_write(channel: &Channel, timestamp: u64, value: u64) {
    channel.write_sample(timestamp, value);
}

/// Space available to write. Writes never block (an overrun is counted,
/// not prevented), so this is always the channel's full capacity.
pub fn chan_writable(channel: &Channel) -> u32 {
    channel.size()
}

/// The channel's current writer sequence number.
pub fn chan_writer(channel: &Channel) -> u64 {
    channel.writer_position()
}
