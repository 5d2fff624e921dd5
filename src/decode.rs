//! Compressed frame decoding.

use jpeg_decoder::PixelFormat;

use crate::error::DecodeError;

/// A decoded frame of packed RGB888 triples, row-major without padding
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Raster {
    pub width: u32,
    pub height: u32,
    pub pixels: Vec<u8>,
}

impl Raster {
    /// Wraps decoder output after checking that it covers `width * height` pixels
    pub fn new(width: u32, height: u32, pixels: Vec<u8>) -> Result<Self, DecodeError> {
        let expected = width as usize * height as usize * 3;
        if pixels.len() < expected {
            return Err(DecodeError::Truncated {
                expected,
                actual: pixels.len(),
            });
        }

        Ok(Raster {
            width,
            height,
            pixels,
        })
    }

    /// Bytes of one row
    pub fn stride(&self) -> usize {
        self.width as usize * 3
    }

    /// The RGB triples of row `y`
    pub fn scanline(&self, y: u32) -> Option<&[u8]> {
        if y >= self.height {
            return None;
        }
        let start = y as usize * self.stride();
        self.pixels.get(start..start + self.stride())
    }
}

/// Turns one compressed frame into a raster
pub trait Decode {
    fn decode(&mut self, data: &[u8]) -> Result<Raster, DecodeError>;
}

impl<D: Decode + ?Sized> Decode for &mut D {
    fn decode(&mut self, data: &[u8]) -> Result<Raster, DecodeError> {
        (**self).decode(data)
    }
}

/// Pixel limit of [`MjpegDecoder::new`], enough for 4096x4096 frames
pub const DEFAULT_MAX_PIXELS: usize = 4096 * 4096;

/// Motion-JPEG frame decoder
///
/// Every frame of an MJPG stream is a self-contained JPEG image, so no state is carried from
/// one frame to the next. The image size claimed by a frame header is checked against a pixel
/// limit before anything is decoded.
#[derive(Debug, Clone, Copy)]
pub struct MjpegDecoder {
    max_pixels: usize,
}

impl MjpegDecoder {
    pub fn new() -> Self {
        Self::with_max_pixels(DEFAULT_MAX_PIXELS)
    }

    /// Returns a decoder rejecting frames larger than `max_pixels`
    pub fn with_max_pixels(max_pixels: usize) -> Self {
        MjpegDecoder { max_pixels }
    }

    pub fn max_pixels(&self) -> usize {
        self.max_pixels
    }
}

impl Default for MjpegDecoder {
    fn default() -> Self {
        Self::new()
    }
}

impl Decode for MjpegDecoder {
    fn decode(&mut self, data: &[u8]) -> Result<Raster, DecodeError> {
        if data.is_empty() {
            return Err(DecodeError::Empty);
        }

        let mut decoder = jpeg_decoder::Decoder::new(data);
        // four bytes per pixel covers every output format of the decoder
        decoder.set_max_decoding_buffer_size(self.max_pixels.saturating_mul(4));
        decoder.read_info()?;
        let info = decoder.info().ok_or(DecodeError::MissingInfo)?;
        let (width, height) = (u32::from(info.width), u32::from(info.height));
        if width as usize * height as usize > self.max_pixels {
            return Err(DecodeError::TooLarge {
                width,
                height,
                limit: self.max_pixels,
            });
        }

        let pixels = decoder.decode()?;
        let rgb = match info.pixel_format {
            PixelFormat::RGB24 => pixels,
            PixelFormat::L8 => pixels.iter().flat_map(|&l| [l, l, l]).collect(),
            PixelFormat::L16 => expand_l16(&pixels, sample_precision(data).unwrap_or(16)),
            other => {
                return Err(DecodeError::UnsupportedPixelFormat(format!("{:?}", other)));
            }
        };

        Raster::new(width, height, rgb)
    }
}

/// Expands native-endian 16-bit luma samples of `precision` bits to RGB888
fn expand_l16(samples: &[u8], precision: u8) -> Vec<u8> {
    let shift = precision.clamp(8, 16) - 8;
    samples
        .chunks_exact(2)
        .map(|s| (u16::from_ne_bytes([s[0], s[1]]) >> shift).min(255) as u8)
        .flat_map(|l| [l, l, l])
        .collect()
}

/// Sample precision in bits, read from the first start-of-frame segment
fn sample_precision(data: &[u8]) -> Option<u8> {
    let mut pos = 2;
    while pos + 4 < data.len() {
        if data[pos] != 0xff {
            return None;
        }
        let marker = data[pos + 1];
        match marker {
            // fill byte
            0xff => pos += 1,
            0xc0..=0xcf if !matches!(marker, 0xc4 | 0xc8 | 0xcc) => {
                return data.get(pos + 4).copied();
            }
            // start of scan or end of image
            0xda | 0xd9 => return None,
            _ => {
                let len = u16::from_be_bytes([data[pos + 2], data[pos + 3]]) as usize;
                pos += 2 + len;
            }
        }
    }
    None
}
