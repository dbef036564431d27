use crate::consts::PAGE_SIZE;
use crate::error::ShmError;
use std::os::unix::io::RawFd;
use std::sync::atomic::{AtomicPtr, AtomicU64, Ordering};

/// An mmap'd, growable file mapping shared between a channel set owner and
/// any number of subscriber processes.
///
/// The mapping may be re-established (and potentially relocated) whenever
/// a bump allocation would exceed the current length. Every caller that
/// dereferences into the mapping must recompute `base + offset` at the
/// moment of use rather than caching a pointer — that contract is
/// enforced here by only ever handing out offsets, never pointers, to
/// callers; [`Mapping::ptr_at`] is the sole way to turn an offset into a
/// live pointer.
pub struct Mapping {
    fd: RawFd,
    base: AtomicPtr<u8>,
    len: AtomicU64,
}

// Safety: `base`/`len` are only ever mutated through `grow_to`, which takes
// `&self` and internally serializes via the owning `ChannelSet`'s bump
// allocator lock; readers only ever load the current values.
unsafe impl Send for Mapping {}
unsafe impl Sync for Mapping {}

impl Mapping {
    /// Opens `path`, creating it if `create` is set, and maps the first
    /// `initial_len` bytes (rounded up to a page).
    pub fn open(path: &str, create: bool, initial_len: u64) -> Result<Self, ShmError> {
        let c_path = std::ffi::CString::new(path).map_err(|_| ShmError::Open {
            path: path.to_string(),
            source: std::io::Error::new(std::io::ErrorKind::InvalidInput, "path contains NUL"),
        })?;

        let mut flags = libc::O_RDWR;
        if create {
            flags |= libc::O_CREAT;
        }
        let fd = unsafe { libc::open(c_path.as_ptr(), flags, 0o644) };
        if fd < 0 {
            return Err(ShmError::Open {
                path: path.to_string(),
                source: std::io::Error::last_os_error(),
            });
        }

        let len = page_round(initial_len.max(1));
        let current_size = unsafe {
            let mut st: libc::stat = std::mem::zeroed();
            if libc::fstat(fd, &mut st) != 0 {
                let err = std::io::Error::last_os_error();
                libc::close(fd);
                return Err(ShmError::Open {
                    path: path.to_string(),
                    source: err,
                });
            }
            st.st_size as u64
        };
        let target = len.max(current_size);
        if target > current_size {
            extend_file(fd, target).map_err(|source| ShmError::Extend {
                target_len: target,
                source,
            })?;
        }

        let base = unsafe {
            libc::mmap(
                std::ptr::null_mut(),
                target as usize,
                libc::PROT_READ | libc::PROT_WRITE,
                libc::MAP_SHARED,
                fd,
                0,
            )
        };
        if base == libc::MAP_FAILED {
            let err = std::io::Error::last_os_error();
            unsafe { libc::close(fd) };
            return Err(ShmError::Map { source: err });
        }

        Ok(Self {
            fd,
            base: AtomicPtr::new(base.cast()),
            len: AtomicU64::new(target),
        })
    }

    #[inline]
    pub fn len(&self) -> u64 {
        self.len.load(Ordering::Acquire)
    }

    /// Recomputes a live pointer from an offset. Must be called fresh for
    /// every access; never cache the result across a potential `grow_to`.
    #[inline]
    pub fn ptr_at(&self, offset: u64) -> *mut u8 {
        // SAFETY: offset is caller-validated against `len()`.
        unsafe { self.base.load(Ordering::Acquire).add(offset as usize) }
    }

    /// Ensures the mapping covers at least `required_len` bytes, extending
    /// the file and re-mapping if necessary. Callers must hold whatever
    /// serialization is needed on the writer side (see `ChannelSet`); this
    /// method itself does not lock.
    pub fn grow_to(&self, required_len: u64) -> Result<(), ShmError> {
        let current = self.len();
        if required_len <= current {
            return Ok(());
        }
        let target = page_round(required_len);
        extend_file(self.fd, target).map_err(|source| ShmError::Extend {
            target_len: target,
            source,
        })?;

        let old_base = self.base.load(Ordering::Acquire);
        // SAFETY: fd refers to a file we opened and extended above.
        unsafe { libc::munmap(old_base.cast(), current as usize) };
        let new_base = unsafe {
            libc::mmap(
                std::ptr::null_mut(),
                target as usize,
                libc::PROT_READ | libc::PROT_WRITE,
                libc::MAP_SHARED,
                self.fd,
                0,
            )
        };
        if new_base == libc::MAP_FAILED {
            return Err(ShmError::Map {
                source: std::io::Error::last_os_error(),
            });
        }
        self.base.store(new_base.cast(), Ordering::Release);
        self.len.store(target, Ordering::Release);
        Ok(())
    }
}

impl Drop for Mapping {
    fn drop(&mut self) {
        unsafe {
            libc::munmap(self.base.load(Ordering::Acquire).cast(), self.len() as usize);
            libc::close(self.fd);
        }
    }
}

fn page_round(len: u64) -> u64 {
    ((len + PAGE_SIZE - 1) / PAGE_SIZE) * PAGE_SIZE
}

fn extend_file(fd: RawFd, target_len: u64) -> std::io::Result<()> {
    let current = unsafe {
        let mut st: libc::stat = std::mem::zeroed();
        if libc::fstat(fd, &mut st) != 0 {
            return Err(std::io::Error::last_os_error());
        }
        st.st_size as u64
    };
    if current >= target_len {
        return Ok(());
    }
    // lseek + single byte write rather than ftruncate, so the growth is
    // observable through the page cache the same way on every platform
    // this targets.
    let pos = unsafe { libc::lseek(fd, (target_len - 1) as libc::off_t, libc::SEEK_SET) };
    if pos < 0 {
        return Err(std::io::Error::last_os_error());
    }
    let byte = [0u8];
    let n = unsafe { libc::write(fd, byte.as_ptr().cast(), 1) };
    if n != 1 {
        return Err(std::io::Error::last_os_error());
    }
    Ok(())
}
