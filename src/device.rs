use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::{io, mem};

use tracing::warn;
use v4l2_sys::*;

use crate::buffer::Type;
use crate::capability::Capabilities;
use crate::format::{Description as FormatDescription, Format};
use crate::fourcc::FourCC;
use crate::framesize::FrameSize;
use crate::v4l2;
use crate::{Error, Result};

/// Linux capture device abstraction
pub struct Device {
    /// Raw handle, shared with the buffer arena and stream
    handle: Arc<Handle>,
    /// Node path, kept for diagnostics
    path: PathBuf,
}

impl Device {
    /// Returns a capture device by path
    ///
    /// The node is opened read/write and non-blocking; readiness is awaited through
    /// [`crate::io::traits::CaptureStream::poll`] instead of blocking in the driver.
    ///
    /// # Arguments
    ///
    /// * `path` - Path (e.g. "/dev/video0")
    ///
    /// # Example
    ///
    /// ```
    /// use uvc_lcd::Device;
    /// let dev = Device::with_path("/dev/video0");
    /// ```
    pub fn with_path<P: AsRef<Path>>(path: P) -> Result<Self> {
        let path = path.as_ref();
        let fd = v4l2::open(path, libc::O_RDWR | libc::O_NONBLOCK).map_err(|source| {
            Error::DeviceOpen {
                path: path.to_path_buf(),
                source,
            }
        })?;

        Ok(Device {
            handle: Arc::new(Handle::new(fd)),
            path: path.to_path_buf(),
        })
    }

    /// Returns the node path this device was opened with
    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Returns the underlying handle
    pub fn handle(&self) -> Arc<Handle> {
        self.handle.clone()
    }

    /// Query for device capabilities
    ///
    /// This returns video4linux framework defined information such as card, driver, etc.
    pub fn query_caps(&self) -> io::Result<Capabilities> {
        unsafe {
            let mut v4l2_caps: v4l2_capability = mem::zeroed();
            v4l2::ioctl(
                self.handle.fd(),
                v4l2::vidioc::VIDIOC_QUERYCAP,
                &mut v4l2_caps as *mut _ as *mut std::os::raw::c_void,
            )?;

            Ok(Capabilities::from(v4l2_caps))
        }
    }

    /// Returns a vector of valid capture formats for this device
    pub fn enum_formats(&self) -> io::Result<Vec<FormatDescription>> {
        let mut formats = Vec::new();
        let mut v4l2_fmt = v4l2_fmtdesc {
            index: 0,
            type_: Type::VideoCapture as u32,
            ..unsafe { mem::zeroed() }
        };

        loop {
            let ret = unsafe {
                v4l2::ioctl(
                    self.handle.fd(),
                    v4l2::vidioc::VIDIOC_ENUM_FMT,
                    &mut v4l2_fmt as *mut _ as *mut std::os::raw::c_void,
                )
            };

            match ret {
                Ok(()) => formats.push(FormatDescription::from(v4l2_fmt)),
                // EINVAL marks the end of the list
                Err(e) if e.kind() == io::ErrorKind::InvalidInput => return Ok(formats),
                Err(e) => return Err(e),
            }

            v4l2_fmt.index += 1;
            v4l2_fmt.description = unsafe { mem::zeroed() };
        }
    }

    /// Returns a vector of valid framesizes that the device supports for the given pixel format
    pub fn enum_framesizes(&self, fourcc: FourCC) -> io::Result<Vec<FrameSize>> {
        let mut framesizes = Vec::new();
        let mut v4l2_struct = v4l2_frmsizeenum {
            index: 0,
            pixel_format: fourcc.into(),
            ..unsafe { mem::zeroed() }
        };

        loop {
            let ret = unsafe {
                v4l2::ioctl(
                    self.handle.fd(),
                    v4l2::vidioc::VIDIOC_ENUM_FRAMESIZES,
                    &mut v4l2_struct as *mut _ as *mut std::os::raw::c_void,
                )
            };

            if let Err(e) = ret {
                if v4l2_struct.index == 0 {
                    return Err(e);
                } else {
                    return Ok(framesizes);
                }
            }

            match FrameSize::try_from(v4l2_struct) {
                Ok(frame_size) => framesizes.push(frame_size),
                Err(e) => warn!("skipping frame size {}: {}", v4l2_struct.index, e),
            }

            v4l2_struct.index += 1;
        }
    }

    /// Returns the format currently in use
    pub fn format(&self) -> io::Result<Format> {
        unsafe {
            let mut v4l2_fmt = v4l2_format {
                type_: Type::VideoCapture as u32,
                ..mem::zeroed()
            };
            v4l2::ioctl(
                self.handle.fd(),
                v4l2::vidioc::VIDIOC_G_FMT,
                &mut v4l2_fmt as *mut _ as *mut std::os::raw::c_void,
            )?;

            Ok(Format::from(v4l2_fmt.fmt.pix))
        }
    }

    /// Modifies the capture format and returns the actual format
    ///
    /// The driver tries to match the format parameters on a best effort basis.
    /// Thus, if the combination of format properties cannot be achieved, the closest possible
    /// settings are used and reported back.
    ///
    /// # Arguments
    ///
    /// * `fmt` - Desired format
    pub fn set_format(&self, fmt: &Format) -> io::Result<Format> {
        unsafe {
            let mut v4l2_fmt = v4l2_format {
                type_: Type::VideoCapture as u32,
                fmt: v4l2_format__bindgen_ty_1 { pix: (*fmt).into() },
            };
            v4l2::ioctl(
                self.handle.fd(),
                v4l2::vidioc::VIDIOC_S_FMT,
                &mut v4l2_fmt as *mut _ as *mut std::os::raw::c_void,
            )?;

            // S_FMT writes the negotiated format back into the argument
            Ok(Format::from(v4l2_fmt.fmt.pix))
        }
    }
}

/// Device handle for low-level access.
///
/// Acquiring a handle facilitates (possibly mutating) interactions with the device.
/// The descriptor is closed once the last clone of the handle is dropped.
pub struct Handle {
    fd: std::os::raw::c_int,
}

impl Handle {
    pub(crate) fn new(fd: std::os::raw::c_int) -> Self {
        Self { fd }
    }

    /// Returns the raw file descriptor
    pub fn fd(&self) -> std::os::raw::c_int {
        self.fd
    }
}

impl Drop for Handle {
    fn drop(&mut self) {
        if let Err(e) = v4l2::close(self.fd) {
            warn!("failed to close fd {}: {}", self.fd, e);
        }
    }
}
