//! Destination rasters the mirror draws into.

use std::fmt;

use crate::{Error, Result};

/// Fixed dimensions of a display surface
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Geometry {
    /// Visible width in pixels
    pub width: u32,
    /// Visible height in pixels
    pub height: u32,
    /// Bits per pixel
    pub bpp: u32,
}

impl Geometry {
    /// Returns a geometry after checking that pixels can be packed for it
    pub fn new(width: u32, height: u32, bpp: u32) -> Result<Self> {
        if width == 0 || height == 0 {
            return Err(Error::GeometryQuery(format!(
                "empty visible area {}x{}",
                width, height
            )));
        }
        if !matches!(bpp, 16 | 24 | 32) {
            return Err(Error::GeometryQuery(format!(
                "unsupported depth of {} bits per pixel",
                bpp
            )));
        }

        Ok(Geometry { width, height, bpp })
    }

    /// Bytes occupied by one pixel
    pub fn bytes_per_pixel(&self) -> usize {
        self.bpp as usize / 8
    }

    /// Bytes occupied by one scanline
    pub fn stride(&self) -> usize {
        self.width as usize * self.bpp as usize / 8
    }

    /// Bytes occupied by the visible area
    pub fn size(&self) -> usize {
        self.stride() * self.height as usize
    }
}

impl fmt::Display for Geometry {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{}x{} @ {} bpp, stride {} bytes",
            self.width,
            self.height,
            self.bpp,
            self.stride()
        )
    }
}

/// Position of one colour channel inside a packed pixel
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Channel {
    /// Bit offset of the least significant bit
    pub offset: u32,
    /// Number of bits
    pub length: u32,
}

impl Channel {
    pub const fn new(offset: u32, length: u32) -> Self {
        Channel { offset, length }
    }

    /// Places the top `length` bits of an 8-bit component
    fn place(&self, value: u8) -> u32 {
        match self.length {
            0 => 0,
            len if len >= 8 => (value as u32) << (self.offset + len - 8),
            len => ((value as u32) >> (8 - len)) << self.offset,
        }
    }
}

/// How 8-bit RGB triples are packed into surface pixels
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PixelLayout {
    pub bytes_per_pixel: usize,
    pub red: Channel,
    pub green: Channel,
    pub blue: Channel,
}

impl PixelLayout {
    /// XRGB8888: `(R << 16) | (G << 8) | B`, top byte zero
    pub const XRGB8888: PixelLayout = PixelLayout {
        bytes_per_pixel: 4,
        red: Channel::new(16, 8),
        green: Channel::new(8, 8),
        blue: Channel::new(0, 8),
    };

    /// RGB888 packed into three bytes
    pub const RGB888: PixelLayout = PixelLayout {
        bytes_per_pixel: 3,
        red: Channel::new(16, 8),
        green: Channel::new(8, 8),
        blue: Channel::new(0, 8),
    };

    /// RGB565
    pub const RGB565: PixelLayout = PixelLayout {
        bytes_per_pixel: 2,
        red: Channel::new(11, 5),
        green: Channel::new(5, 6),
        blue: Channel::new(0, 5),
    };

    /// The conventional layout for a colour depth
    pub fn for_geometry(geometry: &Geometry) -> Self {
        match geometry.bpp {
            16 => Self::RGB565,
            24 => Self::RGB888,
            _ => Self::XRGB8888,
        }
    }

    /// Packs one pixel into its numeric value
    pub fn pack(&self, r: u8, g: u8, b: u8) -> u32 {
        self.red.place(r) | self.green.place(g) | self.blue.place(b)
    }

    /// Packs one pixel into `dst`, which must be `bytes_per_pixel` long
    ///
    /// The value is stored in native byte order, as the CPU would store an integer of the
    /// pixel's width.
    pub fn write(&self, dst: &mut [u8], r: u8, g: u8, b: u8) {
        let value = self.pack(r, g, b);
        match self.bytes_per_pixel {
            2 => dst.copy_from_slice(&(value as u16).to_ne_bytes()),
            3 => {
                let bytes = value.to_ne_bytes();
                if cfg!(target_endian = "little") {
                    dst.copy_from_slice(&bytes[..3]);
                } else {
                    dst.copy_from_slice(&bytes[1..]);
                }
            }
            _ => dst.copy_from_slice(&value.to_ne_bytes()),
        }
    }
}

/// A mutable pixel raster with fixed geometry
///
/// `pixels()` is at least `geometry().size()` bytes long; scanline `y` starts at byte
/// `y * geometry().stride()`.
pub trait Surface {
    fn geometry(&self) -> Geometry;

    fn layout(&self) -> PixelLayout;

    fn pixels(&self) -> &[u8];

    fn pixels_mut(&mut self) -> &mut [u8];
}

/// Heap backed surface, useful for tests and headless operation
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MemorySurface {
    geometry: Geometry,
    layout: PixelLayout,
    pixels: Vec<u8>,
}

impl MemorySurface {
    /// Returns a zero-filled surface with the conventional layout for its depth
    pub fn new(geometry: Geometry) -> Self {
        MemorySurface {
            geometry,
            layout: PixelLayout::for_geometry(&geometry),
            pixels: vec![0; geometry.size()],
        }
    }

    /// Reads back the packed value of a pixel
    pub fn pixel(&self, x: u32, y: u32) -> Option<u32> {
        if x >= self.geometry.width || y >= self.geometry.height {
            return None;
        }

        let bpp = self.geometry.bytes_per_pixel();
        let start = y as usize * self.geometry.stride() + x as usize * bpp;
        let bytes = &self.pixels[start..start + bpp];
        let mut raw = [0u8; 4];
        if cfg!(target_endian = "little") {
            raw[..bpp].copy_from_slice(bytes);
        } else {
            raw[4 - bpp..].copy_from_slice(bytes);
        }
        Some(u32::from_ne_bytes(raw))
    }
}

impl Surface for MemorySurface {
    fn geometry(&self) -> Geometry {
        self.geometry
    }

    fn layout(&self) -> PixelLayout {
        self.layout
    }

    fn pixels(&self) -> &[u8] {
        &self.pixels
    }

    fn pixels_mut(&mut self) -> &mut [u8] {
        &mut self.pixels
    }
}
