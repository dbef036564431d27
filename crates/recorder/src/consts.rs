/// Magic value stamped in a channel set's file header, and reused as the
/// `trace` field sentinel meaning "exported only".
pub const SHARE_MAGIC: u64 = 0x5245_434f_5244_4552; // ASCII "RECORDER" read big-endian.

/// File format version written into every channel set header.
pub const SHARE_VERSION: u32 = 1;

/// Default path used when no `share=PATH` directive or `RECORDER_SHARE`
/// environment variable is supplied.
pub const DEFAULT_SHARE_PATH: &str = "/tmp/recorder_share";

/// Page size assumed for shared-memory growth steps.
pub const PAGE_SIZE: u64 = 4096;

/// Alignment for channel blocks bump-allocated in a channel set, wide
/// enough for any scalar the format supports.
pub const CHANNEL_ALIGN: u64 = 16;

/// Number of argument slots carried by every entry and exported per
/// recorder.
pub const MAX_ARGS: usize = crate::entry::MAX_ARGS;
