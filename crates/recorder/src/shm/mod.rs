//! Shared-memory channel export: the memory-mapped file layout, allocator,
//! and cross-process ring access for publishing numeric channels that
//! another process can subscribe to live.

mod channel;
mod header;
mod mapping;
mod set;
mod subscriber;

pub use channel::Channel;
pub use header::{ChannelType, Sample};
pub use set::ChannelSet;
pub use subscriber::Subscriber;
