use std::{
    fmt, io,
    ops::{Deref, DerefMut},
    os::unix::io::RawFd,
    ptr, slice,
};

use tracing::warn;

use crate::v4l2;

/// Memory used for buffer exchange
///
/// Only driver-allocated buffers mapped into this process are used.
#[repr(u32)]
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Memory {
    Mmap = 1,
}

/// Memory-mapped region of a device
///
/// Used both for capture buffers living in driver memory and for the framebuffer itself.
/// The region is shared with the device, so the kernel may write to it at any time the
/// corresponding buffer is owned by the driver.
///
/// The destructor automatically unmaps the memory.
pub struct Mmap {
    ptr: ptr::NonNull<u8>,
    len: usize,
}

impl Mmap {
    /// Maps `len` bytes of `fd` starting at `offset` as shared read/write memory
    pub fn new(fd: RawFd, len: usize, offset: libc::off_t) -> io::Result<Self> {
        if len == 0 {
            return Err(io::Error::new(
                io::ErrorKind::InvalidInput,
                "cannot map an empty region",
            ));
        }

        let ptr = unsafe {
            v4l2::mmap(
                ptr::null_mut(),
                len,
                libc::PROT_READ | libc::PROT_WRITE,
                libc::MAP_SHARED,
                fd,
                offset,
            )?
        };

        let ptr = ptr::NonNull::new(ptr as *mut u8)
            .ok_or_else(|| io::Error::new(io::ErrorKind::Other, "mmap returned NULL"))?;
        Ok(Mmap { ptr, len })
    }

    /// Size of the mapping in bytes
    pub fn len(&self) -> usize {
        self.len
    }

    pub fn is_empty(&self) -> bool {
        self.len == 0
    }
}

impl Drop for Mmap {
    fn drop(&mut self) {
        let res = unsafe {
            v4l2::munmap(self.ptr.as_ptr() as *mut std::os::raw::c_void, self.len)
        };
        if let Err(e) = res {
            warn!("failed to unmap {} bytes: {}", self.len, e);
        }
    }
}

impl Deref for Mmap {
    type Target = [u8];

    fn deref(&self) -> &Self::Target {
        unsafe { slice::from_raw_parts(self.ptr.as_ptr(), self.len) }
    }
}

impl DerefMut for Mmap {
    fn deref_mut(&mut self) -> &mut Self::Target {
        unsafe { slice::from_raw_parts_mut(self.ptr.as_ptr(), self.len) }
    }
}

impl fmt::Debug for Mmap {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Mmap")
            .field("ptr", &self.ptr)
            .field("len", &self.len)
            .finish()
    }
}
