//! Zlib encoding decoder - raw pixels through a persistent deflate stream.
//!
//! Zlib (type 6) is Raw encoding compressed with zlib. The server keeps a
//! single deflate stream for the whole connection, so the inflater here is
//! never reset.
//!
//! # Wire Format
//!
//! ```text
//! +------------------+
//! | length           |  4 bytes (u32 big-endian)
//! +------------------+
//! | zlib_data        |  inflates to exactly width * height * bpp bytes
//! +------------------+
//! ```
//!
//! The payload is inflated one row at a time, so only a single row of
//! pixels is ever buffered.

use crate::inflate::{InflateStream, MAX_COMPRESSED_LEN};
use crate::scratch::{sized, ScratchBuffers};
use crate::{
    framing_end, framing_start, Decoder, FramebufferSink, PixelFormat, Rectangle, RfbInStream,
    ENCODING_ZLIB,
};
use anyhow::{bail, Context, Result};
use parking_lot::Mutex;
use rfb_common::Rect;
use tokio::io::AsyncRead;

/// Decoder for Zlib encoding. Holds the connection's Zlib inflate stream.
#[derive(Debug, Default)]
pub struct ZlibDecoder {
    inflater: Mutex<InflateStream>,
}

impl ZlibDecoder {
    pub fn new() -> Self {
        Self::default()
    }
}

impl Decoder for ZlibDecoder {
    fn encoding_type(&self) -> i32 {
        ENCODING_ZLIB
    }

    async fn decode<R: AsyncRead + Unpin>(
        &self,
        stream: &mut RfbInStream<R>,
        rect: &Rectangle,
        pixel_format: &PixelFormat,
        scratch: &mut ScratchBuffers,
        sink: &mut dyn FramebufferSink,
    ) -> Result<()> {
        let start = framing_start("Zlib", rect, stream);

        let compressed_len = stream
            .read_u32()
            .await
            .context("Zlib: failed to read compressed data length")?;
        if compressed_len > MAX_COMPRESSED_LEN {
            bail!(
                "Zlib decoder: illegal compressed data size {}",
                compressed_len
            );
        }

        let ScratchBuffers {
            bytes,
            pixels,
            inflated,
        } = scratch;
        let compressed = sized(bytes, compressed_len as usize);
        stream
            .read_bytes(compressed)
            .await
            .context("Zlib: failed to read compressed data")?;

        let dest = rect.rect();
        let valid = !dest.is_empty() && sink.valid_draw(dest);
        let width = usize::from(rect.width);
        let row_bytes = width * pixel_format.bytes_per_pixel();
        let row = sized(inflated, row_bytes);
        let out = sized(pixels, if valid { width } else { 0 });

        {
            let mut inflater = self.inflater.lock();
            let mut in_pos = 0;
            for y in 0..dest.height {
                inflater
                    .inflate_next(compressed, &mut in_pos, row)
                    .with_context(|| format!("Zlib: decompression failed at row {}", y))?;
                if valid {
                    pixel_format.pixels_into(row, out)?;
                    let line = Rect::new(dest.x, dest.y + y as i32, dest.width, 1);
                    sink.image_rect(line, out, width)
                        .context("Zlib: failed to write pixels to framebuffer")?;
                }
            }
            inflater
                .finish(compressed, in_pos, row_bytes * usize::from(rect.height))
                .context("Zlib: decompression failed")?;
        }

        if valid {
            sink.commit(dest);
        }

        framing_end("Zlib", stream, start);
        Ok(())
    }
}
