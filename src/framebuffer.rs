use std::path::{Path, PathBuf};
use std::{fmt, io, mem};

use tracing::{info, warn};
use v4l2_sys::{fb_bitfield, fb_var_screeninfo};

use crate::device::Handle;
use crate::memory::Mmap;
use crate::surface::{Channel, Geometry, PixelLayout, Surface};
use crate::v4l2;
use crate::{Error, Result};

/// A memory-mapped Linux framebuffer device (`/dev/fbX`)
///
/// The visible area is mapped read/write and cleared on open. The mapping is released and
/// the device closed when the value is dropped.
pub struct Framebuffer {
    // declared before `handle` so the mapping goes away before the descriptor is closed
    mem: Mmap,
    handle: Handle,
    path: PathBuf,
    geometry: Geometry,
    layout: PixelLayout,
}

impl Framebuffer {
    /// Opens and maps a framebuffer device
    ///
    /// # Arguments
    ///
    /// * `path` - Path (e.g. "/dev/fb0")
    ///
    /// # Example
    ///
    /// ```no_run
    /// use uvc_lcd::Framebuffer;
    /// let fb = Framebuffer::open("/dev/fb0");
    /// ```
    pub fn open<P: AsRef<Path>>(path: P) -> Result<Self> {
        let path = path.as_ref();
        let fd = v4l2::open(path, libc::O_RDWR).map_err(|source| Error::DeviceOpen {
            path: path.to_path_buf(),
            source,
        })?;
        let handle = Handle::new(fd);

        let (mem, geometry, layout) = Self::map(handle.fd())?;
        info!("display {}: {}", path.display(), geometry);

        Ok(Framebuffer {
            mem,
            handle,
            path: path.to_path_buf(),
            geometry,
            layout,
        })
    }

    fn map(fd: std::os::raw::c_int) -> Result<(Mmap, Geometry, PixelLayout)> {
        let var = screeninfo(fd)
            .map_err(|e| Error::GeometryQuery(format!("FBIOGET_VSCREENINFO: {}", e)))?;
        let geometry = Geometry::new(var.xres, var.yres, var.bits_per_pixel)?;
        let layout = layout_from(&var, &geometry);

        let len = geometry.size();
        let mut mem = Mmap::new(fd, len, 0).map_err(|source| Error::Mapping { len, source })?;
        mem.fill(0);

        Ok((mem, geometry, layout))
    }

    /// Returns the node path this framebuffer was opened with
    pub fn path(&self) -> &Path {
        &self.path
    }

    pub fn width(&self) -> u32 {
        self.geometry.width
    }

    pub fn height(&self) -> u32 {
        self.geometry.height
    }

    pub fn bpp(&self) -> u32 {
        self.geometry.bpp
    }

    pub fn stride(&self) -> usize {
        self.geometry.stride()
    }
}

fn screeninfo(fd: std::os::raw::c_int) -> io::Result<fb_var_screeninfo> {
    unsafe {
        let mut var: fb_var_screeninfo = mem::zeroed();
        v4l2::ioctl(
            fd,
            v4l2::vidioc::FBIOGET_VSCREENINFO,
            &mut var as *mut _ as *mut std::os::raw::c_void,
        )?;
        Ok(var)
    }
}

/// Channel positions as reported by the driver, or the conventional ones for the depth
fn layout_from(var: &fb_var_screeninfo, geometry: &Geometry) -> PixelLayout {
    let fallback = PixelLayout::for_geometry(geometry);
    let channel = |field: &fb_bitfield| Channel::new(field.offset, field.length);

    let reported = [&var.red, &var.green, &var.blue];
    let usable = reported
        .iter()
        .all(|c| c.length > 0 && c.offset + c.length <= geometry.bpp);
    if !usable {
        return fallback;
    }
    if reported.iter().any(|c| c.msb_right != 0) {
        warn!("framebuffer reports msb_right channels, falling back to {:?}", fallback);
        return fallback;
    }

    PixelLayout {
        bytes_per_pixel: geometry.bytes_per_pixel(),
        red: channel(&var.red),
        green: channel(&var.green),
        blue: channel(&var.blue),
    }
}

impl fmt::Debug for Framebuffer {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Framebuffer")
            .field("path", &self.path)
            .field("fd", &self.handle.fd())
            .field("geometry", &self.geometry)
            .field("layout", &self.layout)
            .finish()
    }
}

impl Surface for Framebuffer {
    fn geometry(&self) -> Geometry {
        self.geometry
    }

    fn layout(&self) -> PixelLayout {
        self.layout
    }

    fn pixels(&self) -> &[u8] {
        &self.mem
    }

    fn pixels_mut(&mut self) -> &mut [u8] {
        &mut self.mem
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn var(bpp: u32, red: (u32, u32), green: (u32, u32), blue: (u32, u32)) -> fb_var_screeninfo {
        let mut var: fb_var_screeninfo = unsafe { mem::zeroed() };
        var.xres = 800;
        var.yres = 480;
        var.bits_per_pixel = bpp;
        var.red.offset = red.0;
        var.red.length = red.1;
        var.green.offset = green.0;
        var.green.length = green.1;
        var.blue.offset = blue.0;
        var.blue.length = blue.1;
        var
    }

    #[test]
    fn reported_layout_is_used() {
        let geometry = Geometry::new(800, 480, 32).unwrap();
        // ABGR panel
        let layout = layout_from(&var(32, (0, 8), (8, 8), (16, 8)), &geometry);
        assert_eq!(layout.pack(255, 0, 0), 0x0000_00ff);
        assert_eq!(layout.bytes_per_pixel, 4);
    }

    #[test]
    fn missing_bitfields_fall_back() {
        let geometry = Geometry::new(800, 480, 16).unwrap();
        let layout = layout_from(&var(16, (0, 0), (0, 0), (0, 0)), &geometry);
        assert_eq!(layout, PixelLayout::RGB565);
    }

    #[test]
    fn out_of_range_bitfields_fall_back() {
        let geometry = Geometry::new(800, 480, 16).unwrap();
        let layout = layout_from(&var(16, (16, 8), (8, 8), (0, 8)), &geometry);
        assert_eq!(layout, PixelLayout::RGB565);
    }

    #[test]
    fn missing_device() {
        assert!(matches!(
            Framebuffer::open("/nonexistent/fb0"),
            Err(Error::DeviceOpen { .. })
        ));
    }

    #[test]
    fn regular_file_has_no_geometry() {
        let file = tempfile::NamedTempFile::new().unwrap();
        assert!(matches!(
            Framebuffer::open(file.path()),
            Err(Error::GeometryQuery(_))
        ));
    }
}
