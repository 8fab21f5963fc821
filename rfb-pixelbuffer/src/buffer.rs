//! Pixel sink traits.
//!
//! - [`PixelBuffer`]: read-only access for whoever displays the framebuffer
//! - [`FramebufferSink`]: the write side used by the rectangle decoders
//!
//! # Pixels and stride
//!
//! Sinks store native `0x00RRGGBB` values, one `u32` per pixel. All stride
//! values in this API are measured in **pixels**, not bytes:
//!
//! ```text
//! index = y * stride + x
//! ```
//!
//! # Drawability
//!
//! Decoders always consume a rectangle's bytes from the wire, but only write
//! when [`FramebufferSink::valid_draw`] says the rectangle is currently
//! drawable. A sink may report `false` for regions outside the buffer or
//! outside the part the viewer has loaded.
//!
//! ```
//! use rfb_pixelbuffer::{FramebufferSink, ManagedFramebuffer, PixelBuffer};
//! use rfb_common::Rect;
//!
//! let mut fb = ManagedFramebuffer::new(32, 32);
//! let tile = Rect::new(0, 0, 16, 16);
//! if fb.valid_draw(tile) {
//!     fb.fill_rect(tile, 0x00FF00).unwrap();
//!     fb.commit(tile);
//! }
//! assert_eq!(fb.pixel(15, 15), Some(0x00FF00));
//! assert_eq!(fb.take_damage(), vec![tile]);
//! ```

use anyhow::Result;
use rfb_common::{Point, Rect};

/// Read-only pixel buffer access.
pub trait PixelBuffer {
    /// Returns the dimensions of the pixel buffer as (width, height).
    fn dimensions(&self) -> (u32, u32);

    /// Gets read-only access to a rectangular region of pixel data.
    ///
    /// `stride` receives the row stride in **pixels**. The returned slice
    /// starts at the top-left pixel of `rect` and may extend past its right
    /// edge; use the stride to step between rows. Returns `None` when the
    /// rectangle is out of bounds.
    fn get_buffer(&self, rect: Rect, stride: &mut usize) -> Option<&[u32]>;

    /// Single pixel lookup, `None` outside the buffer.
    fn pixel(&self, x: u32, y: u32) -> Option<u32> {
        let mut stride = 0;
        let rect = Rect::new(x as i32, y as i32, 1, 1);
        self.get_buffer(rect, &mut stride)
            .and_then(|data| data.first().copied())
    }
}

/// Write side of the framebuffer, driven by the rectangle decoders.
///
/// Implementations must be `Send` because the update loop runs on a tokio
/// worker while the display reads from another thread.
pub trait FramebufferSink: Send {
    /// Returns the dimensions of the framebuffer as (width, height).
    fn dimensions(&self) -> (u32, u32);

    /// True when `rect` may be written right now.
    fn valid_draw(&self, rect: Rect) -> bool;

    /// Replaces the framebuffer with a `width` x `height` black buffer.
    fn resize(&mut self, width: u32, height: u32);

    /// Fills a rectangle with a solid colour.
    fn fill_rect(&mut self, rect: Rect, pixel: u32) -> Result<()>;

    /// Copies a rectangle within the buffer. `src_offset` is the offset from
    /// `dest` to the source position; overlapping regions are handled.
    fn copy_rect(&mut self, dest: Rect, src_offset: Point) -> Result<()>;

    /// Copies pixel data into a rectangle. `stride` is in pixels, 0 means
    /// tightly packed (`dest.width`).
    fn image_rect(&mut self, dest: Rect, pixels: &[u32], stride: usize) -> Result<()>;

    /// Signals that `rect` is finished and can be repainted.
    fn commit(&mut self, rect: Rect);
}
