//! Framebuffer shared between the decode task and a display reader.

use crate::{FramebufferSink, ManagedFramebuffer};
use anyhow::Result;
use parking_lot::{Mutex, MutexGuard};
use rfb_common::{Point, Rect};
use std::sync::Arc;

/// Cloneable handle to a [`ManagedFramebuffer`] behind a mutex.
///
/// As a [`FramebufferSink`] every operation takes the lock only for its own
/// duration, so a reader can interleave at row or rectangle granularity and
/// the guard is never held across an `.await`.
#[derive(Debug, Clone)]
pub struct SharedFramebuffer {
    inner: Arc<Mutex<ManagedFramebuffer>>,
}

impl SharedFramebuffer {
    pub fn new(framebuffer: ManagedFramebuffer) -> Self {
        Self {
            inner: Arc::new(Mutex::new(framebuffer)),
        }
    }

    /// Locks the framebuffer for reading or for viewer-side changes such as
    /// [`ManagedFramebuffer::set_viewport`]. Do not hold the guard across an
    /// await point.
    pub fn lock(&self) -> MutexGuard<'_, ManagedFramebuffer> {
        self.inner.lock()
    }
}

impl FramebufferSink for SharedFramebuffer {
    fn dimensions(&self) -> (u32, u32) {
        self.inner.lock().dimensions()
    }

    fn valid_draw(&self, rect: Rect) -> bool {
        self.inner.lock().valid_draw(rect)
    }

    fn resize(&mut self, width: u32, height: u32) {
        self.inner.lock().resize(width, height);
    }

    fn fill_rect(&mut self, rect: Rect, pixel: u32) -> Result<()> {
        self.inner.lock().fill_rect(rect, pixel)
    }

    fn copy_rect(&mut self, dest: Rect, src_offset: Point) -> Result<()> {
        self.inner.lock().copy_rect(dest, src_offset)
    }

    fn image_rect(&mut self, dest: Rect, pixels: &[u32], stride: usize) -> Result<()> {
        self.inner.lock().image_rect(dest, pixels, stride)
    }

    fn commit(&mut self, rect: Rect) {
        self.inner.lock().commit(rect);
    }
}
