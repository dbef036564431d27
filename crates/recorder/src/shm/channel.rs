use super::header::{ChannelHeader, ChannelType, Sample};
use super::mapping::Mapping;
use crate::backoff::Backoff;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;

/// A per-process handle to one published channel.
///
/// Stores only an offset into the owning [`Mapping`], never a raw pointer,
/// so it stays valid across a mapping relocation: every
/// operation recomputes `mapping.ptr_at(offset)` at the moment of use.
pub struct Channel {
    mapping: Arc<Mapping>,
    offset: u64,
}

// Safety: all shared access goes through the same disjoint-index,
// commit-in-order protocol as `crate::ring::Ring`, applied to raw pointers
// into mapped memory instead of an owned buffer.
unsafe impl Send for Channel {}
unsafe impl Sync for Channel {}

impl Channel {
    pub(crate) fn new(mapping: Arc<Mapping>, offset: u64) -> Self {
        Self { mapping, offset }
    }

    pub fn offset(&self) -> u64 {
        self.offset
    }

    #[inline]
    fn header(&self) -> &ChannelHeader {
        // SAFETY: offset was validated at allocation/discovery time against
        // the mapping's length, and the mapping outlives this handle via
        // the shared `Arc`.
        unsafe { &*self.mapping.ptr_at(self.offset).cast::<ChannelHeader>() }
    }

    fn capacity(&self) -> u64 {
        self.header().capacity as u64
    }

    fn item_ptr(&self, idx: u64) -> *mut Sample {
        let items_base = self.offset + ChannelHeader::SIZE;
        let byte_off = items_base + (idx & (self.capacity() - 1)) * Sample::SIZE;
        self.mapping.ptr_at(byte_off).cast::<Sample>()
    }

    fn string_at(&self, rel_off: u32) -> String {
        if rel_off == 0 {
            return String::new();
        }
        let ptr = self.mapping.ptr_at(self.offset + rel_off as u64);
        // SAFETY: strings are NUL-terminated and stored within the mapping
        // by `ChannelSet::new_channel`.
        unsafe {
            let cstr = std::ffi::CStr::from_ptr(ptr.cast());
            cstr.to_string_lossy().into_owned()
        }
    }

    /// Current writer sequence number.
    pub fn writer_position(&self) -> u64 {
        self.header().writer.load(Ordering::Relaxed)
    }

    pub fn name(&self) -> String {
        self.string_at(self.header().name_off)
    }

    pub fn description(&self) -> String {
        self.string_at(self.header().desc_off)
    }

    pub fn unit(&self) -> String {
        self.string_at(self.header().unit_off)
    }

    pub fn kind(&self) -> ChannelType {
        ChannelType::from_u32(self.header().kind.load(Ordering::Acquire))
    }

    pub fn min(&self) -> f64 {
        f64::from_bits(self.header().min_bits.load(Ordering::Relaxed))
    }

    pub fn max(&self) -> f64 {
        f64::from_bits(self.header().max_bits.load(Ordering::Relaxed))
    }

    pub fn item_size(&self) -> u32 {
        self.header().item_size
    }

    pub fn size(&self) -> u32 {
        self.header().capacity
    }

    pub fn overflow_count(&self) -> u64 {
        self.header().overflow.load(Ordering::Relaxed)
    }

    /// The channel's own built-in reader cursor, for callers that don't
    /// want to own a private one.
    pub fn reader_cursor(&self) -> &AtomicU64 {
        &self.header().reader
    }

    /// On first use, CAS-installs the channel's type, inferred from the
    /// `arg_index`-th conversion specifier of `format`. Subsequent writers
    /// observe a non-`None` kind and leave it alone.
    pub fn ensure_type(&self, format: &str, arg_index: usize) {
        let header = self.header();
        if header.kind.load(Ordering::Acquire) != ChannelType::None as u32 {
            return;
        }
        if header
            .kind
            .compare_exchange(
                ChannelType::None as u32,
                ChannelType::Invalid as u32,
                Ordering::AcqRel,
                Ordering::Relaxed,
            )
            .is_ok()
        {
            let inferred = ChannelType::infer(format, arg_index);
            header.kind.store(inferred as u32, Ordering::Release);
        }
    }

    /// Publishes one `(timestamp, value)` sample, applying the same
    /// reserve / overrun / commit-in-order protocol as
    /// [`crate::ring::Ring`], specialized to raw pointers into shared
    /// memory since the buffer is not an owned `Box` here.
    pub fn write_sample(&self, timestamp: u64, value: u64) {
        let header = self.header();
        let capacity = self.capacity();

        let start = loop {
            let current = header.writer.load(Ordering::Relaxed);
            let next = current + 1;
            if header
                .writer
                .compare_exchange_weak(current, next, Ordering::AcqRel, Ordering::Relaxed)
                .is_ok()
            {
                break current;
            }
        };

        let end = start + 1;
        let floor = end.saturating_sub(capacity);
        let reader = header.reader.load(Ordering::Relaxed);
        if floor > reader {
            header.overflow.fetch_add(1, Ordering::Relaxed);
            advance_floor(&header.reader, floor);
            advance_floor(&header.commit, floor);
        }

        // SAFETY: this reservation owns index `start` exclusively.
        unsafe {
            self.item_ptr(start).write(Sample { timestamp, value });
        }

        let mut backoff = Backoff::new();
        loop {
            let current = header.commit.load(Ordering::Acquire);
            if current >= end {
                break;
            }
            if current == start {
                if header
                    .commit
                    .compare_exchange(current, end, Ordering::AcqRel, Ordering::Relaxed)
                    .is_ok()
                {
                    break;
                }
                continue;
            }
            backoff.snooze();
        }
    }

    /// Reads one sample at `cursor`, advancing it by one on success.
    /// Returns `None` if no committed sample is available, or if the
    /// cursor had to be snapped forward past a catch-up point.
    pub fn read_sample(&self, cursor: &AtomicU64) -> Option<Sample> {
        let header = self.header();
        let pos = cursor.load(Ordering::Relaxed);
        let writer = header.writer.load(Ordering::Acquire);
        let capacity = self.capacity();
        if writer.wrapping_sub(pos) > capacity {
            cursor.store(writer - capacity, Ordering::Relaxed);
            return None;
        }
        let commit = header.commit.load(Ordering::Acquire);
        if pos >= commit {
            return None;
        }
        // SAFETY: pos < commit, so this slot was fully published.
        let sample = unsafe { self.item_ptr(pos).read() };
        cursor.fetch_add(1, Ordering::Release);
        Some(sample)
    }

    pub fn readable(&self, cursor: &AtomicU64) -> u64 {
        let header = self.header();
        let pos = cursor.load(Ordering::Relaxed);
        let commit = header.commit.load(Ordering::Acquire);
        commit.saturating_sub(pos).min(self.capacity())
    }
}

fn advance_floor(counter: &AtomicU64, floor: u64) {
    let mut current = counter.load(Ordering::Relaxed);
    while current < floor {
        match counter.compare_exchange_weak(current, floor, Ordering::AcqRel, Ordering::Relaxed) {
            Ok(_) => break,
            Err(actual) => current = actual,
        }
    }
}
