//! Rectangle decoders for RFB (VNC) framebuffer updates.
//!
//! This crate defines the [`Decoder`] trait that every encoding implements.
//! A decoder reads one framebuffer-update rectangle from the stream, resolves
//! its pixels through the session's [`PixelFormat`] and writes them into a
//! [`FramebufferSink`].
//!
//! # Key Concepts
//!
//! - **Async decoding**: decoders read from a tokio [`AsyncRead`]-backed [`RfbInStream`]
//! - **Exact consumption**: a decoder consumes exactly the bytes its encoding
//!   defines, whether or not the rectangle ends up being drawn
//! - **Two-phase writes**: wire data is always read; pixels are only written
//!   when [`FramebufferSink::valid_draw`] accepts the destination
//! - **Fail-fast policy**: malformed data (oversized runs, palette indices out of
//!   range, subrectangles outside their rectangle) is an error, never patched up
//! - **Caller-owned memory**: working buffers come from [`ScratchBuffers`]
//!
//! # Example
//!
//! ```
//! use rfb_encodings::{Decoder, RawDecoder, RfbInStream, ScratchBuffers};
//! use rfb_pixelbuffer::{ColourModel, ManagedFramebuffer, PixelBuffer};
//! use rfb_protocol::messages::Rectangle;
//!
//! # #[tokio::main(flavor = "current_thread")]
//! # async fn main() -> anyhow::Result<()> {
//! let pf = ColourModel::C24bit.pixel_format();
//! let rect = Rectangle { x: 0, y: 0, width: 1, height: 1, encoding: 0 };
//! let wire: &[u8] = &[0x33, 0x22, 0x11, 0x00];
//!
//! let mut stream = RfbInStream::new(wire);
//! let mut scratch = ScratchBuffers::new();
//! let mut fb = ManagedFramebuffer::new(4, 4);
//! RawDecoder
//!     .decode(&mut stream, &rect, &pf, &mut scratch, &mut fb)
//!     .await?;
//! assert_eq!(fb.pixel(0, 0), Some(0x112233));
//! # Ok(())
//! # }
//! ```
//!
//! # Encoding Types
//!
//! - [`ENCODING_RAW`] (0): uncompressed pixel data
//! - [`ENCODING_COPYRECT`] (1): copy from another framebuffer region
//! - [`ENCODING_RRE`] (2): background plus solid subrectangles
//! - [`ENCODING_CORRE`] (4): RRE with 8-bit subrectangle geometry
//! - [`ENCODING_HEXTILE`] (5): 16x16 tiles with subrectangles
//! - [`ENCODING_ZLIB`] (6): raw pixels through a persistent zlib stream
//! - [`ENCODING_ZRLE`] (16): zlib-compressed 64x64 tiles with palettes and RLE
//!
//! Cursor pseudo-encodings are not painted; [`cursor`] skips their payloads.

use anyhow::Result;
use tokio::io::AsyncRead;

pub use rfb_pixelbuffer::{FramebufferSink, PixelFormat};
pub use rfb_protocol::io::RfbInStream;
pub use rfb_protocol::messages::types::{
    Rectangle, ENCODING_COPYRECT, ENCODING_CORRE, ENCODING_HEXTILE, ENCODING_RAW, ENCODING_RRE,
    ENCODING_ZLIB, ENCODING_ZRLE,
};

pub mod copyrect;
pub mod cursor;
pub mod hextile;
pub mod inflate;
pub mod raw;
pub mod rre;
pub mod scratch;
pub mod zlib;
pub mod zrle;

pub use copyrect::CopyRectDecoder;
pub use hextile::HextileDecoder;
pub use inflate::{InflateStream, MAX_COMPRESSED_LEN};
pub use raw::RawDecoder;
pub use rre::{CoRREDecoder, RREDecoder};
pub use scratch::ScratchBuffers;
pub use zlib::ZlibDecoder;
pub use zrle::{ZRLEDecoder, ZrleStreamMode};

/// Decoder for a single RFB encoding.
#[allow(async_fn_in_trait)]
pub trait Decoder {
    /// The RFB encoding number this decoder handles.
    fn encoding_type(&self) -> i32;

    /// Reads one rectangle's payload from `stream` and paints it into `sink`.
    ///
    /// The rectangle header has already been consumed. On success the stream
    /// is positioned at the next rectangle header or message.
    async fn decode<R: AsyncRead + Unpin>(
        &self,
        stream: &mut RfbInStream<R>,
        rect: &Rectangle,
        pixel_format: &PixelFormat,
        scratch: &mut ScratchBuffers,
        sink: &mut dyn FramebufferSink,
    ) -> Result<()>;
}

/// Logs the start of a rectangle and returns the stream position.
pub(crate) fn framing_start<R: AsyncRead + Unpin>(
    name: &str,
    rect: &Rectangle,
    stream: &RfbInStream<R>,
) -> u64 {
    let consumed = stream.consumed();
    tracing::debug!(
        target: "rfb_encodings::framing",
        "{} decode start: rect=[{},{} {}x{}] buffered={}",
        name,
        rect.x,
        rect.y,
        rect.width,
        rect.height,
        stream.available()
    );
    consumed
}

pub(crate) fn framing_end<R: AsyncRead + Unpin>(name: &str, stream: &RfbInStream<R>, start: u64) {
    tracing::debug!(
        target: "rfb_encodings::framing",
        "{} decode end: bytes_consumed={} buffered={}",
        name,
        stream.consumed() - start,
        stream.available()
    );
}

#[cfg(test)]
pub(crate) mod test_support {
    use rfb_pixelbuffer::{ColourModel, ManagedFramebuffer, PixelFormat};

    pub fn rgb888() -> PixelFormat {
        ColourModel::C24bit.pixel_format()
    }

    /// Wire bytes of a full-colour pixel (`B, G, R, pad`).
    pub fn px(rgb: u32) -> [u8; 4] {
        [rgb as u8, (rgb >> 8) as u8, (rgb >> 16) as u8, 0]
    }

    /// Compact ZRLE pixel (`B, G, R`).
    pub fn cpx(rgb: u32) -> [u8; 3] {
        [rgb as u8, (rgb >> 8) as u8, (rgb >> 16) as u8]
    }

    /// Copies out a `w` x `h` block starting at (`x`, `y`).
    pub fn region(fb: &ManagedFramebuffer, x: u32, y: u32, w: u32, h: u32) -> Vec<u32> {
        let stride = fb.stride();
        (y..y + h)
            .flat_map(|row| {
                let start = row as usize * stride + x as usize;
                fb.data()[start..start + w as usize].to_vec()
            })
            .collect()
    }
}
