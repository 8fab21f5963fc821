//! Pixel formats, colour-model presets and framebuffer sinks.
//!
//! This crate sits between the wire decoders and whatever displays the
//! remote desktop:
//!
//! - [`ColourModel`] - the fixed presets a user can pick, and the
//!   [`PixelFormat`] each one negotiates
//! - [`Palette`] - lookup tables that expand one-byte pixels
//! - [`FramebufferSink`] / [`PixelBuffer`] - write and read sides of a framebuffer
//! - [`ManagedFramebuffer`] / [`SharedFramebuffer`] - the owned implementation
//!   and its thread-shareable handle

pub mod buffer;
pub mod colour_model;
pub mod format;
pub mod managed;
pub mod palette;
pub mod shared;

pub use buffer::{FramebufferSink, PixelBuffer};
pub use colour_model::{ColourModel, Preset};
pub use format::PixelFormat;
pub use managed::ManagedFramebuffer;
pub use palette::Palette;
pub use shared::SharedFramebuffer;
