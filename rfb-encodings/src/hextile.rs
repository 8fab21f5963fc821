//! Hextile encoding decoder - tiled encoding with per-tile subencodings.
//!
//! Hextile (type 5) splits a rectangle into 16x16 tiles (smaller along the
//! right and bottom edges), visited row by row. Each tile starts with a
//! subencoding byte whose bits say what follows.
//!
//! # Wire Format
//!
//! ```text
//! +------------------+
//! | subencoding      |  1 byte (bit flags)
//! +------------------+
//! | [raw_pixels]     |  tile_w * tile_h * bpp bytes (if RAW, nothing else follows)
//! +------------------+
//! | [background]     |  bpp bytes (if BACKGROUND_SPECIFIED)
//! +------------------+
//! | [foreground]     |  bpp bytes (if FOREGROUND_SPECIFIED)
//! +------------------+
//! | [num_subrects]   |  1 byte (if ANY_SUBRECTS)
//! +------------------+
//! | [subrects...]    |  For each subrect:
//! |   [pixel]        |    bpp bytes (if SUBRECTS_COLOURED)
//! |   xy             |    1 byte: x=(xy>>4), y=(xy&0xF)
//! |   wh             |    1 byte: w=(wh>>4)+1, h=(wh&0xF)+1
//! +------------------+
//! ```
//!
//! # Running Colours
//!
//! Background and foreground persist from tile to tile **within one
//! rectangle** and start out black for every rectangle. Every non-raw tile is
//! painted with the running background first. A coloured subrectangle also
//! replaces the running foreground.

use crate::raw::read_raw_pixels;
use crate::scratch::{sized, ScratchBuffers};
use crate::{
    framing_end, framing_start, Decoder, FramebufferSink, PixelFormat, Rectangle, RfbInStream,
    ENCODING_HEXTILE,
};
use anyhow::{anyhow, bail, Context, Result};
use bitflags::bitflags;
use rfb_common::Rect;
use tokio::io::AsyncRead;

/// Standard Hextile tile size (tiles at rectangle edges may be smaller).
const TILE_SIZE: u32 = 16;

bitflags! {
    /// Hextile subencoding byte.
    #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
    pub struct HextileFlags: u8 {
        const RAW = 1 << 0;
        const BACKGROUND_SPECIFIED = 1 << 1;
        const FOREGROUND_SPECIFIED = 1 << 2;
        const ANY_SUBRECTS = 1 << 3;
        const SUBRECTS_COLOURED = 1 << 4;
    }
}

/// Decoder for Hextile encoding.
///
/// ```
/// # use rfb_encodings::{Decoder, HextileDecoder, ENCODING_HEXTILE};
/// assert_eq!(HextileDecoder.encoding_type(), ENCODING_HEXTILE);
/// ```
#[derive(Debug, Default, Clone, Copy)]
pub struct HextileDecoder;

impl Decoder for HextileDecoder {
    fn encoding_type(&self) -> i32 {
        ENCODING_HEXTILE
    }

    async fn decode<R: AsyncRead + Unpin>(
        &self,
        stream: &mut RfbInStream<R>,
        rect: &Rectangle,
        pixel_format: &PixelFormat,
        scratch: &mut ScratchBuffers,
        sink: &mut dyn FramebufferSink,
    ) -> Result<()> {
        let start = framing_start("Hextile", rect, stream);
        let dest = rect.rect();
        let bpp = pixel_format.bytes_per_pixel();

        let mut background = 0u32;
        let mut foreground = 0u32;
        let mut pixel = [0u8; 4];
        let pixel = &mut pixel[..bpp];

        for ty in (0..dest.height).step_by(TILE_SIZE as usize) {
            let tile_h = TILE_SIZE.min(dest.height - ty);
            // x range of the current run of drawn tiles in this band
            let mut run: Option<(i32, i32)> = None;

            for tx in (0..dest.width).step_by(TILE_SIZE as usize) {
                let tile_w = TILE_SIZE.min(dest.width - tx);
                let tile = Rect::new(dest.x + tx as i32, dest.y + ty as i32, tile_w, tile_h);

                let raw_flags = stream.read_u8().await.with_context(|| {
                    format!(
                        "Failed to read Hextile subencoding at tile ({}, {}) in rect at ({}, {})",
                        tx, ty, rect.x, rect.y
                    )
                })?;
                let flags = HextileFlags::from_bits(raw_flags).ok_or_else(|| {
                    anyhow!(
                        "Invalid Hextile subencoding 0x{:02x} at tile ({}, {})",
                        raw_flags,
                        tx,
                        ty
                    )
                })?;

                let drawn = if flags.contains(HextileFlags::RAW) {
                    read_raw_pixels(stream, tile, pixel_format, scratch, sink)
                        .await
                        .with_context(|| format!("Failed to decode Hextile raw tile ({}, {})", tx, ty))?
                } else {
                    let valid = sink.valid_draw(tile);

                    if flags.contains(HextileFlags::BACKGROUND_SPECIFIED) {
                        stream
                            .read_bytes(pixel)
                            .await
                            .context("Failed to read Hextile background")?;
                        background = pixel_format.pixel(pixel)?;
                    }
                    if valid {
                        sink.fill_rect(tile, background)?;
                    }

                    if flags.contains(HextileFlags::FOREGROUND_SPECIFIED) {
                        stream
                            .read_bytes(pixel)
                            .await
                            .context("Failed to read Hextile foreground")?;
                        foreground = pixel_format.pixel(pixel)?;
                    }

                    if flags.contains(HextileFlags::ANY_SUBRECTS) {
                        foreground = decode_subrects(
                            stream,
                            tile,
                            flags.contains(HextileFlags::SUBRECTS_COLOURED),
                            foreground,
                            valid,
                            pixel_format,
                            scratch,
                            sink,
                        )
                        .await
                        .with_context(|| format!("Hextile tile ({}, {})", tx, ty))?;
                    }
                    valid
                };

                if drawn {
                    let right = tile.x + tile_w as i32;
                    run = Some(run.map_or((tile.x, right), |(left, _)| (left, right)));
                } else if let Some((left, right)) = run.take() {
                    sink.commit(Rect::new(left, tile.y, (right - left) as u32, tile_h));
                }
            }

            if let Some((left, right)) = run {
                sink.commit(Rect::new(left, dest.y + ty as i32, (right - left) as u32, tile_h));
            }
        }

        framing_end("Hextile", stream, start);
        Ok(())
    }
}

/// Reads and paints one tile's subrectangles, returning the running foreground.
#[allow(clippy::too_many_arguments)]
async fn decode_subrects<R: AsyncRead + Unpin>(
    stream: &mut RfbInStream<R>,
    tile: Rect,
    coloured: bool,
    mut foreground: u32,
    valid: bool,
    pixel_format: &PixelFormat,
    scratch: &mut ScratchBuffers,
    sink: &mut dyn FramebufferSink,
) -> Result<u32> {
    let count = usize::from(
        stream
            .read_u8()
            .await
            .context("Failed to read Hextile subrect count")?,
    );
    let bpp = if coloured {
        pixel_format.bytes_per_pixel()
    } else {
        0
    };
    let record_len = bpp + 2;

    let records = sized(&mut scratch.bytes, count * record_len);
    stream
        .read_bytes(records)
        .await
        .with_context(|| format!("Failed to read {} Hextile subrects", count))?;

    for (i, record) in records.chunks_exact(record_len).enumerate() {
        if coloured {
            foreground = pixel_format.pixel(&record[..bpp])?;
        }
        let (xy, wh) = (record[bpp], record[bpp + 1]);
        let x = u32::from(xy >> 4);
        let y = u32::from(xy & 0x0F);
        let w = u32::from(wh >> 4) + 1;
        let h = u32::from(wh & 0x0F) + 1;

        if x + w > tile.width || y + h > tile.height {
            bail!(
                "subrect {} [{},{} {}x{}] extends beyond {}x{} tile",
                i,
                x,
                y,
                w,
                h,
                tile.width,
                tile.height
            );
        }
        if valid {
            sink.fill_rect(Rect::new(tile.x + x as i32, tile.y + y as i32, w, h), foreground)?;
        }
    }

    Ok(foreground)
}
