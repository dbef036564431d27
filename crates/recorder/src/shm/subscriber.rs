use super::channel::Channel;
use super::header::{ChannelHeader, ShareHeader};
use super::mapping::Mapping;
use crate::consts::{SHARE_MAGIC, SHARE_VERSION};
use crate::error::ShmError;
use regex::RegexBuilder;
use std::sync::atomic::Ordering;
use std::sync::Arc;

/// Read-side handle to a channel set created by another (or the same)
/// process.
///
/// Maps the file read-write (not read-only) so that atomic loads against
/// the embedded ring counters observe writer progress without undefined
/// behaviour from a read-only mapping racing a concurrent writer.
pub struct Subscriber {
    mapping: Arc<Mapping>,
}

impl Subscriber {
    /// Opens `path`, verifying the header's magic and version.
    pub fn open(path: &str) -> Result<Self, ShmError> {
        let mapping = Mapping::open(path, false, ShareHeader::SIZE)?;
        // SAFETY: the mapping covers at least ShareHeader::SIZE bytes.
        let header = unsafe { ShareHeader::view(mapping.ptr_at(0)) };
        let magic = header.magic.load(Ordering::Acquire);
        if magic != SHARE_MAGIC {
            return Err(ShmError::MagicMismatch {
                expected: SHARE_MAGIC,
                found: magic,
            });
        }
        let version = header.version.load(Ordering::Acquire);
        if version != SHARE_VERSION {
            return Err(ShmError::VersionMismatch {
                expected: SHARE_VERSION,
                found: version,
            });
        }
        Ok(Self {
            mapping: Arc::new(mapping),
        })
    }

    fn header(&self) -> &ShareHeader {
        unsafe { ShareHeader::view(self.mapping.ptr_at(0)) }
    }

    /// Returns every channel currently linked into the set, in
    /// most-recently-created-first order.
    pub fn channels(&self) -> Vec<Channel> {
        let mut out = Vec::new();
        let mut offset = self.header().head.load(Ordering::Acquire);
        while offset != 0 {
            out.push(Channel::new(Arc::clone(&self.mapping), offset));
            // SAFETY: offset points at a linked, initialized ChannelHeader.
            offset = unsafe {
                (*self.mapping.ptr_at(offset).cast::<ChannelHeader>())
                    .next
                    .load(Ordering::Acquire)
            };
        }
        out
    }

    /// Finds the first channel (starting after `after`, if given, in list
    /// order) whose name fully matches `pattern`.
    pub fn find(&self, pattern: &str, after: Option<&Channel>) -> Result<Option<Channel>, ShmError> {
        let re = RegexBuilder::new(&format!("^(?:{})$", pattern))
            .case_insensitive(true)
            .build()
            .map_err(|_| ShmError::ChannelNotFound {
                pattern: pattern.to_string(),
            })?;
        let mut skipping = after.is_some();
        let after_offset = after.map(Channel::offset);
        for channel in self.channels() {
            if skipping {
                if Some(channel.offset()) == after_offset {
                    skipping = false;
                }
                continue;
            }
            if re.is_match(&channel.name()) {
                return Ok(Some(channel));
            }
        }
        Ok(None)
    }
}

// `close` is simply dropping the Subscriber: the Arc<Mapping>
// unmaps once the last Channel handle derived from it is also dropped.
