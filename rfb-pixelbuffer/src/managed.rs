//! Managed framebuffer implementation.
//!
//! [`ManagedFramebuffer`] owns its pixels in a `Vec<u32>` (`0x00RRGGBB`,
//! stride = width) and implements both [`PixelBuffer`] and
//! [`FramebufferSink`].
//!
//! A rectangle is drawable when it lies inside the buffer and, if a viewport
//! has been set, inside the viewport as well. Committed rectangles are
//! collected as damage until [`take_damage`](ManagedFramebuffer::take_damage)
//! drains them.

use crate::{FramebufferSink, PixelBuffer};
use anyhow::{anyhow, Result};
use rfb_common::{Point, Rect};

#[derive(Debug, Clone)]
pub struct ManagedFramebuffer {
    width: u32,
    height: u32,
    data: Vec<u32>,
    /// Region the viewer currently has loaded; `None` means everything.
    viewport: Option<Rect>,
    damage: Vec<Rect>,
}

impl ManagedFramebuffer {
    /// Creates a black framebuffer.
    pub fn new(width: u32, height: u32) -> Self {
        Self {
            width,
            height,
            data: vec![0; width as usize * height as usize],
            viewport: None,
            damage: Vec::new(),
        }
    }

    pub fn dimensions(&self) -> (u32, u32) {
        (self.width, self.height)
    }

    pub fn stride(&self) -> usize {
        self.width as usize
    }

    pub fn data(&self) -> &[u32] {
        &self.data
    }

    pub fn viewport(&self) -> Option<Rect> {
        self.viewport
    }

    /// Restricts drawing to `viewport`. Rectangles outside it are still
    /// decoded but not written.
    pub fn set_viewport(&mut self, viewport: Option<Rect>) {
        self.viewport = viewport;
    }

    /// Drains the rectangles committed since the previous call.
    pub fn take_damage(&mut self) -> Vec<Rect> {
        std::mem::take(&mut self.damage)
    }

    fn bounds(&self) -> Rect {
        Rect::new(0, 0, self.width, self.height)
    }

    fn validate_rect(&self, rect: Rect) -> Result<()> {
        if !self.bounds().contains_rect(&rect) {
            return Err(anyhow!(
                "Rectangle out of bounds: {:?} (buffer size: {}x{})",
                rect,
                self.width,
                self.height
            ));
        }
        Ok(())
    }

    #[inline]
    fn offset(&self, x: i32, y: i32) -> usize {
        y as usize * self.stride() + x as usize
    }
}

impl PixelBuffer for ManagedFramebuffer {
    fn dimensions(&self) -> (u32, u32) {
        (self.width, self.height)
    }

    fn get_buffer(&self, rect: Rect, stride: &mut usize) -> Option<&[u32]> {
        if self.validate_rect(rect).is_err() || rect.is_empty() {
            return None;
        }

        *stride = self.stride();
        let start = self.offset(rect.x, rect.y);
        let len = (rect.height as usize - 1) * self.stride() + rect.width as usize;

        Some(&self.data[start..start + len])
    }
}

impl FramebufferSink for ManagedFramebuffer {
    fn dimensions(&self) -> (u32, u32) {
        (self.width, self.height)
    }

    fn valid_draw(&self, rect: Rect) -> bool {
        self.bounds().contains_rect(&rect)
            && self.viewport.map_or(true, |vp| vp.contains_rect(&rect))
    }

    fn resize(&mut self, width: u32, height: u32) {
        self.width = width;
        self.height = height;
        self.data.clear();
        self.data.resize(width as usize * height as usize, 0);
        self.viewport = None;
        self.damage.clear();
        self.damage.push(self.bounds());
    }

    fn fill_rect(&mut self, rect: Rect, pixel: u32) -> Result<()> {
        self.validate_rect(rect)?;

        for y in 0..rect.height as i32 {
            let start = self.offset(rect.x, rect.y + y);
            self.data[start..start + rect.width as usize].fill(pixel);
        }

        Ok(())
    }

    fn copy_rect(&mut self, dest: Rect, src_offset: Point) -> Result<()> {
        self.validate_rect(dest)?;
        let src = dest.translate(src_offset);
        self.validate_rect(src)?;

        let width = dest.width as usize;
        let stride = self.stride();
        let data = &mut self.data;
        let mut copy_row = |y: i32| {
            let from = (src.y + y) as usize * stride + src.x as usize;
            let to = (dest.y + y) as usize * stride + dest.x as usize;
            data.copy_within(from..from + width, to);
        };

        // Source above the destination: walk bottom-up so no source row is
        // overwritten before it is read. copy_within handles overlap inside
        // a single row.
        if src_offset.y < 0 {
            for y in (0..dest.height as i32).rev() {
                copy_row(y);
            }
        } else {
            for y in 0..dest.height as i32 {
                copy_row(y);
            }
        }

        Ok(())
    }

    fn image_rect(&mut self, dest: Rect, pixels: &[u32], stride: usize) -> Result<()> {
        self.validate_rect(dest)?;
        if dest.is_empty() {
            return Ok(());
        }

        let width = dest.width as usize;
        let src_stride = if stride == 0 { width } else { stride };

        let required = src_stride * (dest.height as usize - 1) + width;
        if pixels.len() < required {
            return Err(anyhow!(
                "Insufficient source data: got {} pixels, need at least {}",
                pixels.len(),
                required
            ));
        }

        for (y, row) in pixels
            .chunks(src_stride)
            .take(dest.height as usize)
            .enumerate()
        {
            let start = self.offset(dest.x, dest.y + y as i32);
            self.data[start..start + width].copy_from_slice(&row[..width]);
        }

        Ok(())
    }

    fn commit(&mut self, rect: Rect) {
        if !rect.is_empty() {
            self.damage.push(rect);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    fn patterned(width: u32, height: u32) -> ManagedFramebuffer {
        let mut fb = ManagedFramebuffer::new(width, height);
        let pixels: Vec<u32> = (0..width * height).collect();
        fb.image_rect(Rect::new(0, 0, width, height), &pixels, 0)
            .unwrap();
        fb
    }

    /// Reference copy through a temporary buffer.
    fn copy_via_temp(fb: &ManagedFramebuffer, dest: Rect, offset: Point) -> Vec<u32> {
        let mut expected = fb.data().to_vec();
        let src = dest.translate(offset);
        let stride = fb.stride();
        let mut tmp = Vec::new();
        for y in 0..src.height as usize {
            let start = (src.y as usize + y) * stride + src.x as usize;
            tmp.extend_from_slice(&fb.data()[start..start + src.width as usize]);
        }
        for y in 0..dest.height as usize {
            let start = (dest.y as usize + y) * stride + dest.x as usize;
            let row = &tmp[y * dest.width as usize..(y + 1) * dest.width as usize];
            expected[start..start + dest.width as usize].copy_from_slice(row);
        }
        expected
    }

    #[test]
    fn test_create_and_resize() {
        let mut fb = ManagedFramebuffer::new(100, 100);
        assert_eq!(fb.dimensions(), (100, 100));
        assert_eq!(fb.data().len(), 100 * 100);

        fb.fill_rect(Rect::new(0, 0, 10, 10), 0xFFFFFF).unwrap();
        fb.resize(200, 150);
        assert_eq!(fb.dimensions(), (200, 150));
        assert_eq!(fb.stride(), 200);
        assert!(fb.data().iter().all(|&p| p == 0));
        assert_eq!(fb.take_damage(), vec![Rect::new(0, 0, 200, 150)]);
    }

    #[test]
    fn test_fill_rect() {
        let mut fb = ManagedFramebuffer::new(100, 100);
        fb.fill_rect(Rect::new(10, 10, 20, 20), 0xFF0000).unwrap();
        assert_eq!(fb.pixel(15, 15), Some(0xFF0000));
        assert_eq!(fb.pixel(29, 29), Some(0xFF0000));
        assert_eq!(fb.pixel(30, 30), Some(0));
    }

    #[test]
    fn test_out_of_bounds_writes_are_errors() {
        let mut fb = ManagedFramebuffer::new(16, 16);
        assert!(fb.fill_rect(Rect::new(8, 8, 9, 1), 1).is_err());
        assert!(fb.image_rect(Rect::new(-1, 0, 1, 1), &[1], 0).is_err());
        assert!(fb
            .copy_rect(Rect::new(0, 0, 4, 4), Point::new(13, 0))
            .is_err());
    }

    #[test]
    fn test_copy_rect_overlapping_down() {
        let mut fb = patterned(32, 32);
        let dest = Rect::new(4, 8, 20, 20);
        let offset = Point::new(0, -5);
        let expected = copy_via_temp(&fb, dest, offset);
        fb.copy_rect(dest, offset).unwrap();
        assert_eq!(fb.data(), &expected[..]);
    }

    #[test]
    fn test_copy_rect_overlapping_up_and_left() {
        let mut fb = patterned(32, 32);
        let dest = Rect::new(2, 3, 20, 20);
        let offset = Point::new(3, 4);
        let expected = copy_via_temp(&fb, dest, offset);
        fb.copy_rect(dest, offset).unwrap();
        assert_eq!(fb.data(), &expected[..]);
    }

    #[test]
    fn test_copy_rect_same_row_right() {
        let mut fb = patterned(32, 8);
        let dest = Rect::new(5, 0, 20, 8);
        let offset = Point::new(-3, 0);
        let expected = copy_via_temp(&fb, dest, offset);
        fb.copy_rect(dest, offset).unwrap();
        assert_eq!(fb.data(), &expected[..]);
    }

    #[test]
    fn test_image_rect_with_stride() {
        let mut fb = ManagedFramebuffer::new(100, 100);
        // 10x10 image with 10 pixels of padding per row
        let mut image = Vec::new();
        for _ in 0..10 {
            image.extend(std::iter::repeat(0xFFFF00).take(10));
            image.extend(std::iter::repeat(0).take(10));
        }
        fb.image_rect(Rect::new(40, 40, 10, 10), &image, 20).unwrap();
        assert_eq!(fb.pixel(45, 45), Some(0xFFFF00));
        assert_eq!(fb.pixel(49, 49), Some(0xFFFF00));
        assert_eq!(fb.pixel(50, 45), Some(0));
    }

    #[test]
    fn test_image_rect_insufficient_data() {
        let mut fb = ManagedFramebuffer::new(10, 10);
        let err = fb
            .image_rect(Rect::new(0, 0, 4, 4), &[0; 15], 0)
            .unwrap_err();
        assert!(err.to_string().contains("Insufficient"));
    }

    #[test]
    fn test_valid_draw_respects_viewport() {
        let mut fb = ManagedFramebuffer::new(64, 64);
        assert!(fb.valid_draw(Rect::new(0, 0, 64, 64)));
        assert!(!fb.valid_draw(Rect::new(60, 0, 8, 8)));

        fb.set_viewport(Some(Rect::new(0, 0, 32, 32)));
        assert!(fb.valid_draw(Rect::new(16, 16, 16, 16)));
        assert!(!fb.valid_draw(Rect::new(16, 16, 17, 16)));
    }

    #[test]
    fn test_commit_collects_damage() {
        let mut fb = ManagedFramebuffer::new(8, 8);
        fb.commit(Rect::new(0, 0, 4, 4));
        fb.commit(Rect::new(0, 0, 0, 4));
        fb.commit(Rect::new(4, 4, 4, 4));
        assert_eq!(
            fb.take_damage(),
            vec![Rect::new(0, 0, 4, 4), Rect::new(4, 4, 4, 4)]
        );
        assert!(fb.take_damage().is_empty());
    }

    #[test]
    fn test_get_buffer_rows() {
        let fb = patterned(8, 4);
        let mut stride = 0;
        let data = fb.get_buffer(Rect::new(2, 1, 3, 2), &mut stride).unwrap();
        assert_eq!(stride, 8);
        assert_eq!(&data[..3], &[10, 11, 12]);
        assert_eq!(&data[stride..stride + 3], &[18, 19, 20]);
    }
}
