use std::{io, mem, sync::Arc};

use tracing::{debug, warn};
use v4l2_sys::{v4l2_buffer, v4l2_requestbuffers};

use crate::buffer::Type;
use crate::device::Handle;
use crate::memory::{Memory, Mmap};
use crate::v4l2;
use crate::{Error, Result};

/// Upper bound for the number of buffers requested from a driver
pub const MAX_BUFFERS: u32 = 32;

/// Manage mapped buffers
///
/// All buffers are unmapped and given back to the driver in the Drop impl.
pub struct Arena {
    handle: Arc<Handle>,
    bufs: Vec<Mmap>,
    buf_type: Type,
    allocated: bool,
}

impl Arena {
    /// Returns a new buffer manager instance
    ///
    /// You usually do not need to use this directly.
    /// A [`super::Stream`] creates its own manager instance.
    ///
    /// # Arguments
    ///
    /// * `handle` - Device handle to get its file descriptor
    /// * `buf_type` - Type of the buffers
    pub fn new(handle: Arc<Handle>, buf_type: Type) -> Self {
        Arena {
            handle,
            bufs: Vec::new(),
            buf_type,
            allocated: false,
        }
    }

    fn request(&mut self, count: u32) -> io::Result<u32> {
        let mut v4l2_reqbufs = v4l2_requestbuffers {
            count,
            type_: self.buf_type as u32,
            memory: Memory::Mmap as u32,
            ..unsafe { mem::zeroed() }
        };
        unsafe {
            v4l2::ioctl(
                self.handle.fd(),
                v4l2::vidioc::VIDIOC_REQBUFS,
                &mut v4l2_reqbufs as *mut _ as *mut std::os::raw::c_void,
            )?;
        }

        Ok(v4l2_reqbufs.count)
    }

    /// Allocate and map buffers
    ///
    /// The request is capped at [`MAX_BUFFERS`]. Returns the number of buffers granted by the
    /// driver, which may differ from the request. Either every granted buffer is mapped or
    /// none is.
    ///
    /// # Arguments
    ///
    /// * `count` - Desired number of buffers
    pub fn allocate(&mut self, count: u32) -> Result<u32> {
        let requested = count.clamp(1, MAX_BUFFERS);
        let granted = self
            .request(requested)
            .map_err(|source| Error::BufferAllocation { requested, source })?;
        self.allocated = true;

        if granted == 0 {
            self.release_quietly();
            return Err(Error::BufferAllocation {
                requested,
                source: io::Error::new(io::ErrorKind::Other, "driver granted no buffers"),
            });
        }
        debug!("driver granted {} of {} buffers", granted, requested);

        for index in 0..granted {
            match self.map(index) {
                Ok(buf) => self.bufs.push(buf),
                Err(source) => {
                    self.release_quietly();
                    return Err(Error::BufferMap { index, source });
                }
            }
        }

        Ok(granted)
    }

    fn map(&self, index: u32) -> io::Result<Mmap> {
        let mut v4l2_buf = v4l2_buffer {
            index,
            type_: self.buf_type as u32,
            memory: Memory::Mmap as u32,
            ..unsafe { mem::zeroed() }
        };
        unsafe {
            v4l2::ioctl(
                self.handle.fd(),
                v4l2::vidioc::VIDIOC_QUERYBUF,
                &mut v4l2_buf as *mut _ as *mut std::os::raw::c_void,
            )?;
        }

        let offset = unsafe { v4l2_buf.m.offset };
        Mmap::new(
            self.handle.fd(),
            v4l2_buf.length as usize,
            offset as libc::off_t,
        )
    }

    /// Unmap all buffers and free them in the driver
    pub fn release(&mut self) -> io::Result<()> {
        // mappings must be gone before the driver can free the memory
        self.bufs.clear();

        if self.allocated {
            self.request(0)?;
            self.allocated = false;
        }
        Ok(())
    }

    fn release_quietly(&mut self) {
        if let Err(e) = self.release() {
            warn!("failed to release capture buffers: {}", e);
        }
    }

    /// Number of mapped buffers
    pub fn len(&self) -> usize {
        self.bufs.len()
    }

    pub fn is_empty(&self) -> bool {
        self.bufs.is_empty()
    }

    /// Access the full mapping of a single buffer
    pub fn get(&self, index: usize) -> Option<&[u8]> {
        self.bufs.get(index).map(|buf| &buf[..])
    }
}

impl Drop for Arena {
    fn drop(&mut self) {
        self.release_quietly();
    }
}
