use std::{io, mem, sync::Arc, time::Duration};

use tracing::{debug, warn};
use v4l2_sys::v4l2_buffer;

use crate::buffer::{Metadata, Type};
use crate::device::{Device, Handle};
use crate::io::mmap::arena::Arena;
use crate::io::ring::Ring;
use crate::io::traits::{CaptureStream, Stream as StreamTrait};
use crate::memory::Memory;
use crate::{poll, v4l2};
use crate::{Error, Result};

/// Stream of mapped capture buffers
///
/// An arena instance is used internally for buffer handling. Buffer ownership is tracked in
/// a [`Ring`] so that only one buffer is on loan to the application at a time.
pub struct Stream {
    handle: Arc<Handle>,
    arena: Arena,
    ring: Ring,
    meta: Vec<Metadata>,
    buf_type: Type,

    active: bool,
}

impl Stream {
    /// Returns a capture stream backed by `count` mapped buffers
    ///
    /// The driver may grant fewer (or more) buffers than requested; [`Stream::len`] reports
    /// the actual pool size. Buffers are not queued yet, see [`Stream::enqueue_all`].
    ///
    /// # Arguments
    ///
    /// * `dev` - Capture device ref to get its file descriptor
    /// * `count` - Desired number of buffers, capped at [`super::MAX_BUFFERS`]
    pub fn with_buffers(dev: &Device, count: u32) -> Result<Self> {
        let buf_type = Type::VideoCapture;
        let mut arena = Arena::new(dev.handle(), buf_type);
        let granted = arena.allocate(count)? as usize;

        Ok(Stream {
            handle: dev.handle(),
            arena,
            ring: Ring::new(granted),
            meta: vec![Metadata::default(); granted],
            buf_type,
            active: false,
        })
    }

    /// Number of buffers in the pool
    pub fn len(&self) -> usize {
        self.ring.len()
    }

    pub fn is_empty(&self) -> bool {
        self.ring.is_empty()
    }

    /// Whether the driver is currently producing frames
    pub fn is_active(&self) -> bool {
        self.active
    }

    /// Hand every buffer of the pool to the driver
    pub fn enqueue_all(&mut self) -> Result<()> {
        for index in 0..self.len() {
            CaptureStream::queue(self, index)?;
        }
        Ok(())
    }

    fn buffer_desc(&self) -> v4l2_buffer {
        v4l2_buffer {
            type_: self.buf_type as u32,
            memory: Memory::Mmap as u32,
            ..unsafe { mem::zeroed() }
        }
    }

    fn stream_ioctl(&self, request: v4l2::vidioc::_IOC_TYPE) -> io::Result<()> {
        unsafe {
            let mut typ = self.buf_type as u32;
            v4l2::ioctl(
                self.handle.fd(),
                request,
                &mut typ as *mut _ as *mut std::os::raw::c_void,
            )
        }
    }
}

impl Drop for Stream {
    fn drop(&mut self) {
        if !self.active {
            return;
        }

        if let Err(Error::StreamStop(e)) = self.stop() {
            // ENODEV means the device was unplugged or its connection broke down, so there
            // is nothing left to stop.
            if e.raw_os_error() != Some(libc::ENODEV) {
                warn!("failed to stop streaming: {}", e);
            }
        }
    }
}

impl StreamTrait for Stream {
    fn start(&mut self) -> Result<()> {
        self.stream_ioctl(v4l2::vidioc::VIDIOC_STREAMON)
            .map_err(Error::StreamStart)?;

        self.active = true;
        debug!("streaming started with {} buffers", self.len());
        Ok(())
    }

    fn stop(&mut self) -> Result<()> {
        self.stream_ioctl(v4l2::vidioc::VIDIOC_STREAMOFF)
            .map_err(Error::StreamStop)?;

        // stream-off removes every buffer from the driver queues
        self.active = false;
        self.ring.reset();
        debug!("streaming stopped");
        Ok(())
    }
}

impl CaptureStream for Stream {
    fn poll(&mut self, timeout: Option<Duration>) -> Result<bool> {
        poll::wait_readable(self.handle.fd(), timeout).map_err(Error::Wait)
    }

    fn queue(&mut self, index: usize) -> Result<()> {
        self.ring.check_queue(index)?;

        let mut v4l2_buf = v4l2_buffer {
            index: index as u32,
            ..self.buffer_desc()
        };
        unsafe {
            v4l2::ioctl(
                self.handle.fd(),
                v4l2::vidioc::VIDIOC_QBUF,
                &mut v4l2_buf as *mut _ as *mut std::os::raw::c_void,
            )
            .map_err(|source| Error::Queue { index, source })?;
        }

        self.ring.mark_queued(index)
    }

    fn dequeue(&mut self) -> Result<usize> {
        self.ring.check_dequeue()?;

        let mut v4l2_buf = self.buffer_desc();
        unsafe {
            v4l2::ioctl(
                self.handle.fd(),
                v4l2::vidioc::VIDIOC_DQBUF,
                &mut v4l2_buf as *mut _ as *mut std::os::raw::c_void,
            )
            .map_err(Error::Dequeue)?;
        }

        let index = v4l2_buf.index as usize;
        self.ring.mark_held(index)?;
        self.meta[index] = Metadata::from(&v4l2_buf);

        Ok(index)
    }

    fn get(&self, index: usize) -> Option<&[u8]> {
        if self.ring.held() != Some(index) {
            return None;
        }

        let buf = self.arena.get(index)?;
        let used = (self.meta[index].bytesused as usize).min(buf.len());
        Some(&buf[..used])
    }

    fn get_meta(&self, index: usize) -> Option<&Metadata> {
        if self.ring.held() != Some(index) {
            return None;
        }
        self.meta.get(index)
    }

    fn ring(&self) -> &Ring {
        &self.ring
    }
}
