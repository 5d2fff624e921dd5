use std::{fmt, mem};

use bitflags::bitflags;
use v4l2_sys::{v4l2_fmtdesc, v4l2_pix_format};

use crate::fourcc::FourCC;

#[derive(Debug, Copy, Clone, PartialEq, Eq)]
/// Streaming format (single-planar)
pub struct Format {
    /// width in pixels
    pub width: u32,
    /// height in pixels
    pub height: u32,
    /// pixelformat code
    pub fourcc: FourCC,

    /// bytes per line, zero for compressed formats
    pub stride: u32,
    /// maximum number of bytes required to store an image
    pub size: u32,
}

impl Format {
    /// Returns a capture format
    ///
    /// # Arguments
    ///
    /// * `width` - Width in pixels
    /// * `height` - Height in pixels
    /// * `fourcc` - Four character code (pixelformat)
    ///
    /// # Example
    ///
    /// ```
    /// use uvc_lcd::{Format, FourCC};
    /// let fmt = Format::new(800, 480, FourCC::MJPG);
    /// ```
    pub const fn new(width: u32, height: u32, fourcc: FourCC) -> Self {
        Format {
            width,
            height,
            fourcc,
            stride: 0,
            size: 0,
        }
    }
}

impl fmt::Display for Format {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}x{} {}", self.width, self.height, self.fourcc)?;
        if self.size != 0 {
            write!(f, " (max {} bytes)", self.size)?;
        }
        Ok(())
    }
}

impl From<v4l2_pix_format> for Format {
    fn from(fmt: v4l2_pix_format) -> Self {
        Self {
            width: fmt.width,
            height: fmt.height,
            fourcc: FourCC::from(fmt.pixelformat),
            stride: fmt.bytesperline,
            size: fmt.sizeimage,
        }
    }
}

impl From<Format> for v4l2_pix_format {
    fn from(format: Format) -> Self {
        Self {
            width: format.width,
            height: format.height,
            pixelformat: format.fourcc.into(),
            // V4L2_FIELD_ANY: let the driver pick
            field: 0,
            bytesperline: format.stride,
            sizeimage: format.size,
            ..unsafe { mem::zeroed() }
        }
    }
}

bitflags! {
    #[derive(Debug, Clone, Copy, PartialEq, Eq)]
    pub struct DescriptionFlags : u32 {
        const COMPRESSED            = 0x0001;
        const EMULATED              = 0x0002;
        const CONTINUOUS_BITSTREAM  = 0x0004;
        const DYN_RESOLUTION        = 0x0008;
    }
}

#[derive(Debug)]
/// Format description as returned by [`crate::v4l2::vidioc::VIDIOC_ENUM_FMT`]
pub struct Description {
    pub index: u32,
    pub flags: DescriptionFlags,
    pub description: String,
    pub fourcc: FourCC,
}

impl fmt::Display for Description {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "[{}] {} ({})", self.index, self.fourcc, self.description)?;
        if self.flags.contains(DescriptionFlags::COMPRESSED) {
            write!(f, ", compressed")?;
        }
        if self.flags.contains(DescriptionFlags::EMULATED) {
            write!(f, ", emulated")?;
        }
        Ok(())
    }
}

impl From<v4l2_fmtdesc> for Description {
    fn from(desc: v4l2_fmtdesc) -> Self {
        let end = desc
            .description
            .iter()
            .position(|&c| c == 0)
            .unwrap_or(desc.description.len());

        Self {
            index: desc.index,
            flags: DescriptionFlags::from_bits_truncate(desc.flags),
            description: String::from_utf8_lossy(&desc.description[..end]).into_owned(),
            fourcc: FourCC::from(desc.pixelformat),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn pix_format_conversion() {
        let fmt = Format::new(800, 480, FourCC::MJPG);
        let raw = v4l2_pix_format::from(fmt);
        assert_eq!(raw.width, 800);
        assert_eq!(raw.height, 480);
        assert_eq!(raw.pixelformat, u32::from(FourCC::MJPG));
        assert_eq!(raw.field, 0);

        assert_eq!(Format::from(raw), fmt);
    }

    #[test]
    fn description_trims_padding() {
        let mut raw: v4l2_fmtdesc = unsafe { mem::zeroed() };
        raw.index = 1;
        raw.flags = 0x0001;
        raw.pixelformat = u32::from(FourCC::MJPG);
        raw.description[..11].copy_from_slice(b"Motion-JPEG");

        let desc = Description::from(raw);
        assert_eq!(desc.description, "Motion-JPEG");
        assert_eq!(desc.to_string(), "[1] MJPG (Motion-JPEG), compressed");
    }
}
