//! Global RGB framebuffer.

use super::{Bounds, Rgb, Surface};

/// Fixed-size grid of RGB pixels, row-major.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FrameBuffer {
    width: u32,
    height: u32,
    pixels: Vec<Rgb>,
}

impl FrameBuffer {
    /// Create a black framebuffer.
    pub fn new(width: u32, height: u32) -> Self {
        Self {
            width,
            height,
            pixels: vec![Rgb::BLACK; width as usize * height as usize],
        }
    }

    pub fn width(&self) -> u32 {
        self.width
    }

    pub fn height(&self) -> u32 {
        self.height
    }

    fn index(&self, x: i32, y: i32) -> Option<usize> {
        if x < 0 || y < 0 || x as u32 >= self.width || y as u32 >= self.height {
            return None;
        }
        Some(y as usize * self.width as usize + x as usize)
    }

    /// Write one pixel. Out-of-bounds writes are ignored.
    pub fn set_pixel(&mut self, x: i32, y: i32, color: Rgb) {
        if let Some(i) = self.index(x, y) {
            self.pixels[i] = color;
        }
    }

    pub fn get_pixel(&self, x: i32, y: i32) -> Option<Rgb> {
        self.index(x, y).map(|i| self.pixels[i])
    }

    /// Reset every pixel to `color`.
    pub fn clear(&mut self, color: Rgb) {
        self.pixels.fill(color);
    }

    /// Raw `RGBRGB...` bytes, row-major, for host presentation.
    pub fn to_rgb_bytes(&self) -> Vec<u8> {
        self.pixels
            .iter()
            .flat_map(|&Rgb(r, g, b)| [r, g, b])
            .collect()
    }
}

impl Surface for FrameBuffer {
    fn set_pixel(&mut self, x: i32, y: i32, color: Rgb) {
        FrameBuffer::set_pixel(self, x, y, color);
    }

    fn bounds(&self) -> Bounds {
        Bounds::new(i64::from(self.width), i64::from(self.height))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn new_is_black() {
        let fb = FrameBuffer::new(4, 3);
        assert_eq!(fb.width(), 4);
        assert_eq!(fb.height(), 3);
        assert_eq!(fb.get_pixel(3, 2), Some(Rgb::BLACK));
    }

    #[test]
    fn out_of_bounds_writes_are_ignored() {
        let mut fb = FrameBuffer::new(2, 2);
        fb.set_pixel(-1, 0, Rgb::WHITE);
        fb.set_pixel(0, 2, Rgb::WHITE);
        fb.set_pixel(2, 0, Rgb::WHITE);
        assert!(fb.to_rgb_bytes().iter().all(|&b| b == 0));
        assert_eq!(fb.get_pixel(2, 0), None);
    }

    #[test]
    fn clear_fills_every_cell() {
        let mut fb = FrameBuffer::new(3, 2);
        fb.set_pixel(1, 1, Rgb::WHITE);
        fb.clear(Rgb(1, 2, 3));
        assert_eq!(fb.to_rgb_bytes(), [1, 2, 3].repeat(6));
    }

    #[test]
    fn rgb_bytes_are_row_major() {
        let mut fb = FrameBuffer::new(2, 2);
        fb.set_pixel(1, 0, Rgb(9, 9, 9));
        let bytes = fb.to_rgb_bytes();
        assert_eq!(&bytes[3..6], &[9, 9, 9]);
        assert_eq!(bytes.len(), 12);
    }
}
