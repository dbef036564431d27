/// Maximum number of format arguments captured per entry.
///
/// Chosen to keep an [`Entry`] a fixed-size, `Copy` value that fits in a
/// handful of cache lines, matching the ring's requirement that slot items
/// be `Copy` (see `ring.rs`). Emits with more arguments than this are
/// truncated; the dropped arguments are never evaluated into the slot, they
/// are simply not recorded.
pub const MAX_ARGS: usize = 4;

/// One recorded event: a timestamp, a global order, the static location and
/// format strings, and up to [`MAX_ARGS`] raw argument words.
///
/// Argument words are stored as `u64` regardless of their logical type.
/// Integers and pointers are stored directly; floats are bit-reinterpreted
/// (`f32::to_bits` widened, or `f64::to_bits`) and recovered by the
/// formatter from the conversion specifier.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Entry {
    pub timestamp: u64,
    pub order: u64,
    pub location: &'static str,
    pub format: &'static str,
    pub args: [u64; MAX_ARGS],
    pub arg_count: u8,
}

impl Entry {
    pub fn new(
        timestamp: u64,
        order: u64,
        location: &'static str,
        format: &'static str,
        args: &[u64],
    ) -> Self {
        let mut slots = [0u64; MAX_ARGS];
        let n = args.len().min(MAX_ARGS);
        slots[..n].copy_from_slice(&args[..n]);
        Self {
            timestamp,
            order,
            location,
            format,
            args: slots,
            arg_count: n as u8,
        }
    }

    #[inline]
    pub fn args(&self) -> &[u64] {
        &self.args[..self.arg_count as usize]
    }
}

/// Zero entry used to fill unwritten slots and as a sentinel in tests.
impl Default for Entry {
    fn default() -> Self {
        Self {
            timestamp: 0,
            order: 0,
            location: "",
            format: "",
            args: [0; MAX_ARGS],
            arg_count: 0,
        }
    }
}
