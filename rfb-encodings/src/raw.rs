//! Raw encoding decoder - uncompressed pixel data.
//!
//! Raw encoding (type 0) transmits pixels without compression in the
//! session's pixel format. The decoder reads `height` rows of
//! `width * bytes_per_pixel` bytes and resolves every pixel through the
//! [`PixelFormat`] before handing the rectangle to the sink.
//!
//! # Wire Format
//!
//! ```text
//! +-------------+
//! | Pixel data  |  width * height * bytes_per_pixel bytes
//! +-------------+
//! ```
//!
//! The row reader in this module is shared with Hextile raw tiles.

use crate::scratch::{sized, ScratchBuffers};
use crate::{
    framing_end, framing_start, Decoder, FramebufferSink, PixelFormat, Rectangle, RfbInStream,
    ENCODING_RAW,
};
use anyhow::{Context, Result};
use rfb_common::Rect;
use tokio::io::AsyncRead;

/// Decoder for raw (uncompressed) pixel data.
///
/// ```
/// # use rfb_encodings::{Decoder, RawDecoder, ENCODING_RAW};
/// assert_eq!(RawDecoder.encoding_type(), ENCODING_RAW);
/// ```
#[derive(Debug, Default, Clone, Copy)]
pub struct RawDecoder;

impl Decoder for RawDecoder {
    fn encoding_type(&self) -> i32 {
        ENCODING_RAW
    }

    async fn decode<R: AsyncRead + Unpin>(
        &self,
        stream: &mut RfbInStream<R>,
        rect: &Rectangle,
        pixel_format: &PixelFormat,
        scratch: &mut ScratchBuffers,
        sink: &mut dyn FramebufferSink,
    ) -> Result<()> {
        let start = framing_start("Raw", rect, stream);
        let dest = rect.rect();

        let drawn = read_raw_pixels(stream, dest, pixel_format, scratch, sink)
            .await
            .context("Failed to decode raw rectangle")?;
        if drawn {
            sink.commit(dest);
        }

        framing_end("Raw", stream, start);
        Ok(())
    }
}

/// Reads `dest.height` rows of raw pixels and writes them to `dest`.
///
/// The bytes are always consumed. Conversion and the sink write only happen
/// when the sink accepts `dest`; the return value says whether it did.
/// Rows are written as they arrive, so at most one row is buffered.
pub(crate) async fn read_raw_pixels<R: AsyncRead + Unpin>(
    stream: &mut RfbInStream<R>,
    dest: Rect,
    pixel_format: &PixelFormat,
    scratch: &mut ScratchBuffers,
    sink: &mut dyn FramebufferSink,
) -> Result<bool> {
    if dest.is_empty() {
        return Ok(false);
    }

    let width = dest.width as usize;
    let row_bytes = width * pixel_format.bytes_per_pixel();
    let valid = sink.valid_draw(dest);

    let ScratchBuffers { bytes, pixels, .. } = scratch;
    let row = sized(bytes, row_bytes);
    let out = sized(pixels, if valid { width } else { 0 });

    for y in 0..dest.height {
        stream
            .read_bytes(row)
            .await
            .context("Failed to read raw pixel row from stream")?;
        if valid {
            pixel_format.pixels_into(row, out)?;
            let line = Rect::new(dest.x, dest.y + y as i32, dest.width, 1);
            sink.image_rect(line, out, width)
                .context("Failed to write raw pixel data to framebuffer")?;
        }
    }

    Ok(valid)
}
