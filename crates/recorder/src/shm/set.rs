use super::channel::Channel;
use super::header::{ChannelHeader, ShareHeader};
use super::mapping::Mapping;
use crate::consts::{CHANNEL_ALIGN, SHARE_MAGIC};
use crate::error::ShmError;
use regex::RegexBuilder;
use std::sync::atomic::Ordering;
use std::sync::{Arc, Mutex};

/// Owner-side handle to a channel set: the memory-mapped file a process
/// publishes channels into.
///
/// Allocation is serialized by `alloc_lock` even though the underlying
/// counters are atomic, because creating a channel touches multiple fields
/// (bump offset, new header, linked-list head) that must move together;
/// concurrent *samples* into already-created channels never take this lock.
pub struct ChannelSet {
    mapping: Arc<Mapping>,
    alloc_lock: Mutex<()>,
}

impl ChannelSet {
    /// Creates a fresh channel set at `path`, truncating/initializing the
    /// header if the file is new or empty.
    pub fn create(path: &str) -> Result<Self, ShmError> {
        let mapping = Mapping::open(path, true, ShareHeader::SIZE)?;
        // SAFETY: we just mapped at least ShareHeader::SIZE bytes and hold
        // exclusive access during initialization.
        let needs_init = unsafe {
            let header = ShareHeader::view(mapping.ptr_at(0));
            header.magic.load(Ordering::Relaxed) != SHARE_MAGIC
        };
        if needs_init {
            unsafe { ShareHeader::init(mapping.ptr_at(0)) };
        }
        Ok(Self {
            mapping: Arc::new(mapping),
            alloc_lock: Mutex::new(()),
        })
    }

    fn header(&self) -> &ShareHeader {
        unsafe { ShareHeader::view(self.mapping.ptr_at(0)) }
    }

    /// Bump-allocates (preferring a free-list entry) a
    /// new channel block sized for `capacity` samples plus the three name
    /// strings, and links it at the head of the channel list.
    pub fn new_channel(
        &self,
        name: &str,
        description: &str,
        unit: &str,
        capacity: u32,
    ) -> Result<Channel, ShmError> {
        assert!(capacity.is_power_of_two(), "channel capacity must be a power of two");
        let _guard = self.alloc_lock.lock().unwrap_or_else(|e| e.into_inner());

        let items_len = capacity as u64 * super::header::Sample::SIZE;
        let name_len = name.len() as u64 + 1;
        let desc_len = description.len() as u64 + 1;
        let unit_len = unit.len() as u64 + 1;
        let block_len = ChannelHeader::SIZE + items_len + name_len + desc_len + unit_len;

        let offset = self.reuse_free_slot(block_len).unwrap_or_else(|| self.bump_alloc(block_len));
        self.mapping.grow_to(offset + block_len)?;

        let name_off = (ChannelHeader::SIZE + items_len) as u32;
        let desc_off = name_off + name_len as u32;
        let unit_off = desc_off + desc_len as u32;

        // SAFETY: `offset..offset+block_len` was just reserved exclusively
        // by this call under `alloc_lock`, and the mapping was grown to
        // cover it.
        unsafe {
            let header_ptr = self.mapping.ptr_at(offset).cast::<ChannelHeader>();
            header_ptr.write(ChannelHeader {
                next: std::sync::atomic::AtomicU64::new(0),
                kind: std::sync::atomic::AtomicU32::new(0),
                item_size: super::header::Sample::SIZE as u32,
                capacity,
                name_off,
                desc_off,
                unit_off,
                _pad: 0,
                min_bits: std::sync::atomic::AtomicU64::new(0),
                max_bits: std::sync::atomic::AtomicU64::new(0),
                writer: std::sync::atomic::AtomicU64::new(0),
                commit: std::sync::atomic::AtomicU64::new(0),
                reader: std::sync::atomic::AtomicU64::new(0),
                overflow: std::sync::atomic::AtomicU64::new(0),
            });
            write_cstr(self.mapping.ptr_at(offset + name_off as u64), name);
            write_cstr(self.mapping.ptr_at(offset + desc_off as u64), description);
            write_cstr(self.mapping.ptr_at(offset + unit_off as u64), unit);
        }

        self.link_in(offset);
        Ok(Channel::new(Arc::clone(&self.mapping), offset))
    }

    fn reuse_free_slot(&self, _needed_len: u64) -> Option<u64> {
        // The free list is tracked but never consumed by this
        // implementation: allocation always bumps. See DESIGN.md.
        let head = self.header().free_list.load(Ordering::Acquire);
        if head == 0 {
            None
        } else {
            None
        }
    }

    fn bump_alloc(&self, len: u64) -> u64 {
        let aligned_len = (len + CHANNEL_ALIGN - 1) / CHANNEL_ALIGN * CHANNEL_ALIGN;
        let header = self.header();
        loop {
            let current = header.offset.load(Ordering::Relaxed);
            let next = current + aligned_len;
            if header
                .offset
                .compare_exchange_weak(current, next, Ordering::AcqRel, Ordering::Relaxed)
                .is_ok()
            {
                return current;
            }
        }
    }

    fn link_in(&self, offset: u64) {
        let header = self.header();
        loop {
            let head = header.head.load(Ordering::Acquire);
            // SAFETY: `offset` was just allocated and initialized above.
            let new_header = unsafe { &*self.mapping.ptr_at(offset).cast::<ChannelHeader>() };
            new_header.next.store(head, Ordering::Relaxed);
            if header
                .head
                .compare_exchange_weak(head, offset, Ordering::AcqRel, Ordering::Relaxed)
                .is_ok()
            {
                return;
            }
        }
    }

    /// Pushes `channel`'s offset onto the free list. Does not remove it
    /// from the linked list or zero its contents — readers that already
    /// hold a handle simply see a channel whose offset has been recycled by
    /// a future allocation.
    pub fn delete_channel(&self, channel: &Channel) {
        let header = self.header();
        loop {
            let head = header.free_list.load(Ordering::Acquire);
            if header
                .free_list
                .compare_exchange_weak(head, channel.offset(), Ordering::AcqRel, Ordering::Relaxed)
                .is_ok()
            {
                return;
            }
        }
    }

    /// Walks the linked list of channels, returning the first whose name
    /// fully matches `pattern` (extended, case-insensitive regex).
    pub fn find_channel(&self, pattern: &str) -> Result<Option<Channel>, ShmError> {
        let re = RegexBuilder::new(&format!("^(?:{})$", pattern))
            .case_insensitive(true)
            .build()
            .map_err(|_| ShmError::ChannelNotFound {
                pattern: pattern.to_string(),
            })?;
        let mut offset = self.header().head.load(Ordering::Acquire);
        while offset != 0 {
            let channel = Channel::new(Arc::clone(&self.mapping), offset);
            if re.is_match(&channel.name()) {
                return Ok(Some(channel));
            }
            // SAFETY: offset points at a previously-linked, initialized
            // ChannelHeader.
            offset = unsafe { (*self.mapping.ptr_at(offset).cast::<ChannelHeader>()).next.load(Ordering::Acquire) };
        }
        Ok(None)
    }

    pub fn mapping(&self) -> Arc<Mapping> {
        Arc::clone(&self.mapping)
    }
}

unsafe fn write_cstr(ptr: *mut u8, s: &str) {
    std::ptr::copy_nonoverlapping(s.as_ptr(), ptr, s.len());
    ptr.add(s.len()).write(0);
}
