//! Centered, clipped copy of a decoded raster into a surface.

use std::fmt;

use tracing::debug;

use crate::decode::{Decode, Raster};
use crate::surface::{Geometry, Surface};
use crate::Result;

/// Where a frame lands on a surface
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Placement {
    /// Columns written per row
    pub width: u32,
    /// Rows written
    pub height: u32,
    /// First column written
    pub left: u32,
    /// First row written
    pub top: u32,
}

impl Placement {
    /// Centers a `width` x `height` frame, clipping whatever does not fit
    pub fn centered(width: u32, height: u32, geometry: &Geometry) -> Self {
        let width = width.min(geometry.width);
        let height = height.min(geometry.height);

        Placement {
            width,
            height,
            left: (geometry.width - width) / 2,
            top: (geometry.height - height) / 2,
        }
    }

    /// Horizontal offset of the first written byte within a scanline
    pub fn offset_x(&self, geometry: &Geometry) -> usize {
        self.left as usize * geometry.bytes_per_pixel()
    }

    /// Byte offset of the first written pixel of row `row`
    pub fn row_offset(&self, row: u32, geometry: &Geometry) -> usize {
        (self.top + row) as usize * geometry.stride() + self.offset_x(geometry)
    }
}

impl fmt::Display for Placement {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{}x{} at ({}, {})",
            self.width, self.height, self.left, self.top
        )
    }
}

/// Writes `raster` centered onto `surface`
///
/// Pixels outside the placement keep their previous contents.
pub fn present<T: Surface + ?Sized>(raster: &Raster, surface: &mut T) -> Placement {
    let geometry = surface.geometry();
    let layout = surface.layout();
    let placement = Placement::centered(raster.width, raster.height, &geometry);

    let bpp = geometry.bytes_per_pixel();
    let offset_x = placement.offset_x(&geometry);
    let span = placement.width as usize * bpp;
    let src_len = placement.width as usize * 3;

    let rows = surface
        .pixels_mut()
        .chunks_exact_mut(geometry.stride())
        .skip(placement.top as usize)
        .take(placement.height as usize);
    for (y, row) in rows.enumerate() {
        let src = match raster.scanline(y as u32) {
            Some(line) => &line[..src_len],
            None => break,
        };
        let dst = &mut row[offset_x..offset_x + span];
        for (px, rgb) in dst.chunks_exact_mut(bpp).zip(src.chunks_exact(3)) {
            layout.write(px, rgb[0], rgb[1], rgb[2]);
        }
    }

    placement
}

/// Decodes one compressed frame and presents it
///
/// The frame is decoded completely before the surface is touched, so a frame that fails to
/// decode leaves the surface as it was.
pub fn decode_and_present<D, T>(decoder: &mut D, data: &[u8], surface: &mut T) -> Result<Placement>
where
    D: Decode + ?Sized,
    T: Surface + ?Sized,
{
    let raster = decoder.decode(data)?;
    let placement = present(&raster, surface);
    debug!(
        "presented {}x{} frame as {}",
        raster.width, raster.height, placement
    );
    Ok(placement)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::surface::MemorySurface;

    fn solid(width: u32, height: u32, rgb: [u8; 3]) -> Raster {
        let pixels = rgb
            .iter()
            .copied()
            .cycle()
            .take(width as usize * height as usize * 3)
            .collect();
        Raster::new(width, height, pixels).unwrap()
    }

    #[test]
    fn centered_fit() {
        let geometry = Geometry::new(800, 480, 32).unwrap();
        let placement = Placement::centered(640, 480, &geometry);
        assert_eq!(
            placement,
            Placement {
                width: 640,
                height: 480,
                left: 80,
                top: 0
            }
        );
        assert_eq!(placement.offset_x(&geometry), 320);
        assert_eq!(placement.row_offset(1, &geometry), 3200 + 320);
    }

    #[test]
    fn oversize_is_clipped() {
        let geometry = Geometry::new(800, 480, 32).unwrap();
        let placement = Placement::centered(1024, 768, &geometry);
        assert_eq!((placement.width, placement.height), (800, 480));
        assert_eq!((placement.left, placement.top), (0, 0));
    }

    #[test]
    fn odd_margins() {
        let geometry = Geometry::new(801, 481, 16).unwrap();
        let placement = Placement::centered(100, 100, &geometry);
        let right = geometry.width - placement.left - placement.width;
        let bottom = geometry.height - placement.top - placement.height;
        assert!(right.abs_diff(placement.left) <= 1);
        assert!(bottom.abs_diff(placement.top) <= 1);
    }

    #[test]
    fn margins_untouched() {
        let geometry = Geometry::new(8, 4, 32).unwrap();
        let mut surface = MemorySurface::new(geometry);
        surface.pixels_mut().fill(0xaa);

        let placement = present(&solid(4, 2, [255, 0, 0]), &mut surface);
        assert_eq!((placement.left, placement.top), (2, 1));

        for y in 0..4 {
            for x in 0..8 {
                let inside = (2..6).contains(&x) && (1..3).contains(&y);
                let expected = if inside { 0x00ff_0000 } else { 0xaaaa_aaaa };
                assert_eq!(surface.pixel(x, y), Some(expected), "pixel ({}, {})", x, y);
            }
        }
    }

    #[test]
    fn rgb565_surface() {
        let geometry = Geometry::new(4, 4, 16).unwrap();
        let mut surface = MemorySurface::new(geometry);
        present(&solid(6, 6, [0, 0, 255]), &mut surface);
        for y in 0..4 {
            for x in 0..4 {
                assert_eq!(surface.pixel(x, y), Some(0x001f));
            }
        }
    }

    #[test]
    fn rgb888_surface() {
        let geometry = Geometry::new(3, 1, 24).unwrap();
        let mut surface = MemorySurface::new(geometry);
        present(&solid(1, 1, [1, 2, 3]), &mut surface);
        assert_eq!(surface.pixel(0, 0), Some(0));
        assert_eq!(surface.pixel(1, 0), Some(0x0001_0203));
        assert_eq!(surface.pixel(2, 0), Some(0));
    }
}
