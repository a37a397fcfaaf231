//! Fixed-size opaque RGB raster.

use crate::color::Rgb;

/// Bytes per pixel in the surface buffer.
const CHANNELS: usize = 3;

/// A width × height RGB pixel buffer, origin at the top-left.
///
/// Every pixel always holds a defined color; a fresh surface is white.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Surface {
    width: u32,
    height: u32,
    pixels: Vec<u8>,
}

impl Surface {
    /// Create a white surface.
    pub fn new(width: u32, height: u32) -> Self {
        Self {
            width,
            height,
            pixels: vec![255; width as usize * height as usize * CHANNELS],
        }
    }

    pub fn width(&self) -> u32 {
        self.width
    }

    pub fn height(&self) -> u32 {
        self.height
    }

    /// Raw RGB bytes, row-major.
    pub fn as_bytes(&self) -> &[u8] {
        &self.pixels
    }

    fn offset(&self, x: i64, y: i64) -> Option<usize> {
        if x < 0 || y < 0 || x >= self.width as i64 || y >= self.height as i64 {
            return None;
        }
        Some((y as usize * self.width as usize + x as usize) * CHANNELS)
    }

    /// Color at `(x, y)`, or `None` outside the surface.
    pub fn pixel(&self, x: i64, y: i64) -> Option<Rgb> {
        let i = self.offset(x, y)?;
        Some(Rgb::new(self.pixels[i], self.pixels[i + 1], self.pixels[i + 2]))
    }

    /// Set one pixel. Out-of-bounds writes are dropped.
    pub fn set_pixel(&mut self, x: i64, y: i64, color: Rgb) {
        if let Some(i) = self.offset(x, y) {
            self.pixels[i..i + CHANNELS].copy_from_slice(&color.to_bytes());
        }
    }

    /// Fill the whole surface with one color.
    pub fn fill(&mut self, color: Rgb) {
        let bytes = color.to_bytes();
        for px in self.pixels.chunks_exact_mut(CHANNELS) {
            px.copy_from_slice(&bytes);
        }
    }

    /// Composite an RGBA image at the origin with source-over blending.
    ///
    /// Parts of the image that fall outside the surface are clipped.
    pub fn draw_rgba(&mut self, rgba: &[u8], width: u32, height: u32) {
        let cols = width.min(self.width) as usize;
        let rows = height.min(self.height) as usize;
        for y in 0..rows {
            for x in 0..cols {
                let src = (y * width as usize + x) * 4;
                let Some(px) = rgba.get(src..src + 4) else {
                    return;
                };
                let dst = (y * self.width as usize + x) * CHANNELS;
                let alpha = px[3] as u32;
                for c in 0..CHANNELS {
                    let under = self.pixels[dst + c] as u32;
                    let over = px[c] as u32;
                    self.pixels[dst + c] = ((over * alpha + under * (255 - alpha) + 127) / 255) as u8;
                }
            }
        }
    }

    /// Count pixels matching `color`. Mostly useful in tests.
    pub fn count(&self, color: Rgb) -> usize {
        let bytes = color.to_bytes();
        self.pixels
            .chunks_exact(CHANNELS)
            .filter(|px| *px == bytes)
            .count()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_new_surface_is_white() {
        let surface = Surface::new(4, 3);
        assert_eq!(surface.as_bytes().len(), 4 * 3 * 3);
        assert_eq!(surface.count(Rgb::WHITE), 12);
    }

    #[test]
    fn test_out_of_bounds_is_ignored() {
        let mut surface = Surface::new(2, 2);
        surface.set_pixel(-1, 0, Rgb::BLACK);
        surface.set_pixel(2, 1, Rgb::BLACK);
        assert_eq!(surface.count(Rgb::WHITE), 4);
        assert_eq!(surface.pixel(5, 5), None);
    }

    #[test]
    fn test_draw_rgba_blends_and_clips() {
        let mut surface = Surface::new(2, 1);
        // 3x1 image: opaque red, transparent, opaque blue (clipped)
        let rgba = [255, 0, 0, 255, 0, 0, 0, 0, 0, 0, 255, 255];
        surface.draw_rgba(&rgba, 3, 1);
        assert_eq!(surface.pixel(0, 0), Some(Rgb::new(255, 0, 0)));
        assert_eq!(surface.pixel(1, 0), Some(Rgb::WHITE));
    }
}
