use crate::consts::{SHARE_MAGIC, SHARE_VERSION};
use std::sync::atomic::{AtomicU32, AtomicU64};

/// On-disk/in-mapping channel set header.
///
/// Little-endian, native alignment; cross-architecture sharing is
/// explicitly not a goal, so this is a plain `#[repr(C)]` struct rather
/// than an explicit byte-level codec.
#[repr(C)]
pub struct ShareHeader {
    pub magic: AtomicU64,
    pub version: AtomicU32,
    _pad: u32,
    /// Offset (bytes from mapping base) of the first channel header, or 0.
    pub head: AtomicU64,
    /// Offset of the first free channel slot, or 0. Declared but not
    /// consumed by this implementation — see `DESIGN.md`.
    pub free_list: AtomicU64,
    /// Bump-allocator cursor: next free byte offset.
    pub offset: AtomicU64,
}

impl ShareHeader {
    pub const SIZE: u64 = std::mem::size_of::<ShareHeader>() as u64;

    /// Initializes a freshly-mapped header in place.
    ///
    /// # Safety
    /// `ptr` must point to at least `Self::SIZE` bytes of writable, mapped
    /// memory and must not be concurrently accessed by another thread
    /// during initialization.
    pub unsafe fn init(ptr: *mut u8) {
        let header = ptr.cast::<ShareHeader>();
        (*header).magic.store(SHARE_MAGIC, std::sync::atomic::Ordering::Relaxed);
        (*header).version.store(SHARE_VERSION, std::sync::atomic::Ordering::Relaxed);
        (*header).head.store(0, std::sync::atomic::Ordering::Relaxed);
        (*header).free_list.store(0, std::sync::atomic::Ordering::Relaxed);
        (*header)
            .offset
            .store(Self::SIZE, std::sync::atomic::Ordering::Relaxed);
    }

    /// # Safety
    /// `ptr` must point to at least `Self::SIZE` bytes of mapped memory
    /// that outlive the returned reference's use.
    pub unsafe fn view<'a>(ptr: *mut u8) -> &'a ShareHeader {
        &*ptr.cast::<ShareHeader>()
    }
}

/// Inferred channel value type, CAS-installed by the first writer from the
/// format string's conversion specifier.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[repr(u32)]
pub enum ChannelType {
    None = 0,
    Invalid = 1,
    Signed = 2,
    Unsigned = 3,
    Real = 4,
}

impl ChannelType {
    pub fn from_u32(v: u32) -> Self {
        match v {
            1 => ChannelType::Invalid,
            2 => ChannelType::Signed,
            3 => ChannelType::Unsigned,
            4 => ChannelType::Real,
            _ => ChannelType::None,
        }
    }

    /// Infers the channel type from the `i`-th `%` conversion specifier of
    /// `format`.
    pub fn infer(format: &str, arg_index: usize) -> ChannelType {
        let mut seen = 0usize;
        let mut chars = format.chars().peekable();
        while let Some(c) = chars.next() {
            if c != '%' {
                continue;
            }
            if chars.peek() == Some(&'%') {
                chars.next();
                continue;
            }
            let mut conv = None;
            for next in chars.by_ref() {
                if next.is_ascii_alphabetic() {
                    conv = Some(next);
                    break;
                }
            }
            let Some(conv) = conv else { continue };
            if seen == arg_index {
                return match conv {
                    'd' | 'D' | 'i' | 'b' | 'o' | 'O' => ChannelType::Signed,
                    'u' | 'U' | 'x' | 'X' | 'c' | 'C' | 'p' => ChannelType::Unsigned,
                    'f' | 'F' | 'g' | 'G' | 'e' | 'E' | 'a' | 'A' => ChannelType::Real,
                    _ => ChannelType::Invalid,
                };
            }
            seen += 1;
        }
        ChannelType::Invalid
    }
}

/// Per-channel header, immediately followed by `capacity` [`Sample`]s and
/// then the name/description/unit C-strings.
#[repr(C)]
pub struct ChannelHeader {
    pub next: AtomicU64,
    pub kind: AtomicU32,
    pub item_size: u32,
    pub capacity: u32,
    pub name_off: u32,
    pub desc_off: u32,
    pub unit_off: u32,
    pub _pad: u32,
    pub min_bits: AtomicU64,
    pub max_bits: AtomicU64,
    pub writer: AtomicU64,
    pub commit: AtomicU64,
    pub reader: AtomicU64,
    pub overflow: AtomicU64,
}

impl ChannelHeader {
    pub const SIZE: u64 = std::mem::size_of::<ChannelHeader>() as u64;
}

/// One sample published into a channel's ring: a tick timestamp paired with
/// the raw argument word.
#[derive(Debug, Clone, Copy, Default)]
#[repr(C)]
pub struct Sample {
    pub timestamp: u64,
    pub value: u64,
}

impl Sample {
    pub const SIZE: u64 = std::mem::size_of::<Sample>() as u64;
}
