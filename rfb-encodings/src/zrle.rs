//! ZRLE encoding decoder - Zlib-compressed RLE with 64x64 tiling.
//!
//! ZRLE (Zlib Run-Length Encoding, type 16) combines zlib compression with
//! palettes and run-length encoding. The rectangle is split into 64x64 tiles
//! (smaller at the edges) and each tile picks its own subencoding.
//!
//! # Wire Format
//!
//! ```text
//! +------------------+
//! | length           |  4 bytes (u32 big-endian), at most 64 MiB
//! +------------------+
//! | zlib_data        |  'length' bytes of zlib-compressed tile data
//! +------------------+
//! ```
//!
//! After decompression, tiles follow in row-major order:
//!
//! ```text
//! +------------------+
//! | subencoding      |  1 byte: bit 7 = RLE flag, bits 0-6 = palette size
//! +------------------+
//! | [palette]        |  palette size * cpixel bytes
//! +------------------+
//! | [tile data]      |  depends on the subencoding
//! +------------------+
//! ```
//!
//! # Tile Modes
//!
//! | palette size | RLE | contents                                             |
//! |--------------|-----|------------------------------------------------------|
//! | 1            | any | solid tile, the palette entry is the colour          |
//! | 0            | no  | raw cpixels                                          |
//! | 0            | yes | `cpixel, run length` pairs                           |
//! | 2..=127      | no  | packed indices, 1/2/4/8 bits each, rows byte-aligned |
//! | 2..=127      | yes | index byte, with a run length when bit 7 is set      |
//!
//! A compact pixel (cpixel) is 3 bytes (`B, G, R`) for 32-bit true-colour
//! formats of depth 24 or less, otherwise the full pixel size.
//!
//! # RLE Length Encoding
//!
//! ```text
//! Length = 1 + byte0 + byte1 + ... + byteN
//!   where every byte except the last is 255
//!
//!   [4]        -> 5
//!   [255, 10]  -> 266
//! ```
//!
//! # Zlib Stream
//!
//! The inflated tile data may not exceed what the rectangle's tiles can hold
//! in their largest form; a stream that inflates further is rejected before
//! it is buffered.
//!
//! Servers keep one deflate stream per connection for ZRLE and sync-flush it
//! after every rectangle. [`ZrleStreamMode::Persistent`] follows that and is
//! the default; [`ZrleStreamMode::PerRectangle`] expects a fresh zlib stream
//! in every rectangle.

use crate::inflate::{InflateStream, MAX_COMPRESSED_LEN};
use crate::scratch::{sized, ScratchBuffers};
use crate::{
    framing_end, framing_start, Decoder, FramebufferSink, PixelFormat, Rectangle, RfbInStream,
    ENCODING_ZRLE,
};
use anyhow::{bail, Context, Result};
use parking_lot::Mutex;
use rfb_common::Rect;
use serde::{Deserialize, Serialize};
use tokio::io::AsyncRead;

/// ZRLE tile size (64x64 pixels, smaller at rectangle edges).
const TILE_SIZE: u32 = 64;

/// How the ZRLE zlib stream carries over between rectangles.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ZrleStreamMode {
    /// One stream for the whole connection.
    #[default]
    Persistent,
    /// Every rectangle starts a new zlib stream.
    PerRectangle,
}

/// Decoder for ZRLE encoding.
///
/// The decoder owns the connection's ZRLE inflate stream, so one instance
/// must serve every ZRLE rectangle of a connection.
///
/// ```
/// # use rfb_encodings::{Decoder, ZRLEDecoder, ENCODING_ZRLE};
/// let decoder = ZRLEDecoder::default();
/// assert_eq!(decoder.encoding_type(), ENCODING_ZRLE);
/// ```
#[derive(Debug, Default)]
pub struct ZRLEDecoder {
    inflater: Mutex<InflateStream>,
    mode: ZrleStreamMode,
}

impl ZRLEDecoder {
    pub fn new(mode: ZrleStreamMode) -> Self {
        Self {
            inflater: Mutex::new(InflateStream::new()),
            mode,
        }
    }

    pub fn mode(&self) -> ZrleStreamMode {
        self.mode
    }

    /// Drops the inflate state; the next rectangle must carry a zlib header.
    pub fn reset(&self) {
        self.inflater.lock().reset();
    }
}

impl Decoder for ZRLEDecoder {
    fn encoding_type(&self) -> i32 {
        ENCODING_ZRLE
    }

    async fn decode<R: AsyncRead + Unpin>(
        &self,
        stream: &mut RfbInStream<R>,
        rect: &Rectangle,
        pixel_format: &PixelFormat,
        scratch: &mut ScratchBuffers,
        sink: &mut dyn FramebufferSink,
    ) -> Result<()> {
        let start = framing_start("ZRLE", rect, stream);

        let compressed_len = stream
            .read_u32()
            .await
            .context("ZRLE: failed to read compressed data length")?;
        if compressed_len > MAX_COMPRESSED_LEN {
            bail!(
                "ZRLE decoder: illegal compressed data size {}",
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
            .context("ZRLE: failed to read compressed data")?;

        inflated.clear();
        {
            let mut inflater = self.inflater.lock();
            if self.mode == ZrleStreamMode::PerRectangle {
                inflater.reset();
            }
            inflater
                .inflate_all(compressed, inflated, max_tile_data(rect, pixel_format))
                .context("ZRLE: zlib decompression failed")?;
        }
        tracing::trace!(
            "ZRLE: {} compressed -> {} tile bytes",
            compressed_len,
            inflated.len()
        );

        let dest = rect.rect();
        let valid = !dest.is_empty() && sink.valid_draw(dest);
        let mut cursor = DataCursor::new(inflated);
        let tiles = TileReader {
            pixel_format,
            cpixel_size: pixel_format.cpixel_size(),
        };

        for ty in (0..dest.height).step_by(TILE_SIZE as usize) {
            let tile_h = TILE_SIZE.min(dest.height - ty);
            for tx in (0..dest.width).step_by(TILE_SIZE as usize) {
                let tile_w = TILE_SIZE.min(dest.width - tx);
                let tile = Rect::new(dest.x + tx as i32, dest.y + ty as i32, tile_w, tile_h);
                tiles
                    .decode_tile(&mut cursor, tile, valid, pixels, sink)
                    .with_context(|| {
                        format!(
                            "ZRLE: failed to decode tile at ({}, {}) size {}x{}",
                            tx, ty, tile_w, tile_h
                        )
                    })?;
            }
        }

        let remaining = cursor.remaining();
        if remaining > 0 {
            bail!(
                "ZRLE: {} trailing bytes after decoding rectangle",
                remaining
            );
        }

        if valid {
            sink.commit(dest);
        }
        framing_end("ZRLE", stream, start);
        Ok(())
    }
}

/// Upper bound on the tile data a rectangle can carry.
///
/// Per tile: the subencoding byte, a full 127-entry palette, and one cpixel
/// plus one run-length byte per pixel, which covers every tile mode.
fn max_tile_data(rect: &Rectangle, pixel_format: &PixelFormat) -> usize {
    let cpixel = pixel_format.cpixel_size() as u64;
    let (width, height) = (u64::from(rect.width), u64::from(rect.height));
    let tiles = width.div_ceil(u64::from(TILE_SIZE)) * height.div_ceil(u64::from(TILE_SIZE));
    let limit = tiles * (1 + 127 * cpixel) + width * height * (cpixel + 1);
    usize::try_from(limit).unwrap_or(usize::MAX)
}

/// Per-rectangle tile parsing state.
struct TileReader<'a> {
    pixel_format: &'a PixelFormat,
    cpixel_size: usize,
}

impl TileReader<'_> {
    fn decode_tile(
        &self,
        cursor: &mut DataCursor,
        tile: Rect,
        valid: bool,
        pixels: &mut Vec<u32>,
        sink: &mut dyn FramebufferSink,
    ) -> Result<()> {
        let mode = cursor.read_u8().context("failed to read subencoding byte")?;
        let rle = mode & 0x80 != 0;
        let pal_size = usize::from(mode & 0x7F);

        let mut palette = [0u32; 128];
        let palette = &mut palette[..pal_size];
        let raw = cursor
            .read_exact(pal_size * self.cpixel_size)
            .context("failed to read tile palette")?;
        self.pixel_format.cpixels_into(raw, palette)?;

        if pal_size == 1 {
            if valid {
                sink.fill_rect(tile, palette[0])?;
            }
            return Ok(());
        }

        let width = tile.width as usize;
        let out = sized(pixels, width * tile.height as usize);
        match (pal_size, rle) {
            (0, false) => {
                let raw = cursor
                    .read_exact(out.len() * self.cpixel_size)
                    .context("failed to read raw tile pixels")?;
                // conversion can fail on palette formats, so only do it when drawing
                if valid {
                    self.pixel_format.cpixels_into(raw, out)?;
                }
            }
            (0, true) => self.plain_rle(cursor, out)?,
            (_, false) => packed_indices(cursor, palette, width, out)?,
            (_, true) => packed_rle(cursor, palette, out)?,
        }

        if valid {
            sink.image_rect(tile, out, width)?;
        }
        Ok(())
    }

    fn plain_rle(&self, cursor: &mut DataCursor, out: &mut [u32]) -> Result<()> {
        let mut pos = 0;
        while pos < out.len() {
            let raw = cursor
                .read_exact(self.cpixel_size)
                .context("failed to read RLE pixel")?;
            let pixel = self.pixel_format.cpixel(raw)?;
            let len = run_length(cursor)?;
            check_run(len, out.len() - pos)?;
            out[pos..pos + len].fill(pixel);
            pos += len;
        }
        Ok(())
    }
}

fn packed_indices(
    cursor: &mut DataCursor,
    palette: &[u32],
    width: usize,
    out: &mut [u32],
) -> Result<()> {
    let bits: usize = if palette.len() > 16 {
        8
    } else if palette.len() > 4 {
        4
    } else if palette.len() > 2 {
        2
    } else {
        1
    };
    let mask = (1u16 << bits) - 1;
    let row_bytes = (width * bits).div_ceil(8);

    for row in out.chunks_exact_mut(width) {
        let packed = cursor
            .read_exact(row_bytes)
            .context("failed to read packed palette row")?;
        // MSB first; each row starts on a byte boundary
        let mut bytes = packed.iter();
        let mut byte = 0u8;
        let mut left = 0;
        for px in row.iter_mut() {
            if left == 0 {
                byte = bytes.next().copied().unwrap_or_default();
                left = 8;
            }
            left -= bits;
            let index = usize::from((u16::from(byte) >> left) & mask);
            *px = lookup(palette, index)?;
        }
    }
    Ok(())
}

fn packed_rle(cursor: &mut DataCursor, palette: &[u32], out: &mut [u32]) -> Result<()> {
    let mut pos = 0;
    while pos < out.len() {
        let code = cursor.read_u8().context("failed to read palette RLE code")?;
        let pixel = lookup(palette, usize::from(code & 0x7F))?;
        let len = if code & 0x80 != 0 {
            run_length(cursor)?
        } else {
            1
        };
        check_run(len, out.len() - pos)?;
        out[pos..pos + len].fill(pixel);
        pos += len;
    }
    Ok(())
}

#[inline]
fn lookup(palette: &[u32], index: usize) -> Result<u32> {
    match palette.get(index) {
        Some(&pixel) => Ok(pixel),
        None => bail!(
            "palette index {} out of range (palette size {})",
            index,
            palette.len()
        ),
    }
}

/// Reads a run length: 1 plus the sum of the length bytes, 255 continuing.
fn run_length(cursor: &mut DataCursor) -> Result<usize> {
    let mut len = 1usize;
    loop {
        let byte = cursor.read_u8().context("failed to read RLE length byte")?;
        len += usize::from(byte);
        if byte != 255 {
            return Ok(len);
        }
    }
}

fn check_run(len: usize, remaining: usize) -> Result<()> {
    if len > remaining {
        bail!(
            "RLE run of {} exceeds the {} pixels left in the tile",
            len,
            remaining
        );
    }
    Ok(())
}

/// Byte cursor over decompressed tile data.
struct DataCursor<'a> {
    data: &'a [u8],
    pos: usize,
}

impl<'a> DataCursor<'a> {
    fn new(data: &'a [u8]) -> Self {
        Self { data, pos: 0 }
    }

    fn remaining(&self) -> usize {
        self.data.len() - self.pos
    }

    fn read_u8(&mut self) -> Result<u8> {
        let value = *self
            .data
            .get(self.pos)
            .ok_or_else(|| anyhow::anyhow!("tile data ended: need 1 byte"))?;
        self.pos += 1;
        Ok(value)
    }

    fn read_exact(&mut self, count: usize) -> Result<&'a [u8]> {
        if count > self.remaining() {
            bail!(
                "tile data ended: need {} bytes, have {}",
                count,
                self.remaining()
            );
        }
        let slice = &self.data[self.pos..self.pos + count];
        self.pos += count;
        Ok(slice)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::inflate::tests::SyncDeflater;
    use crate::test_support::{cpx, region, rgb888};
    use pretty_assertions::assert_eq;
    use rfb_pixelbuffer::{ColourModel, ManagedFramebuffer, PixelBuffer};
    use std::io::Cursor;

    const RED: u32 = 0xFF0000;
    const GREEN: u32 = 0x00FF00;
    const BLUE: u32 = 0x0000FF;

    fn rect(width: u16, height: u16) -> Rectangle {
        Rectangle {
            x: 0,
            y: 0,
            width,
            height,
            encoding: ENCODING_ZRLE,
        }
    }

    fn framed(compressed: &[u8]) -> Vec<u8> {
        let mut data = (compressed.len() as u32).to_be_bytes().to_vec();
        data.extend_from_slice(compressed);
        data
    }

    async fn decode_with(
        decoder: &ZRLEDecoder,
        data: Vec<u8>,
        rect: &Rectangle,
        pf: &PixelFormat,
        fb: &mut ManagedFramebuffer,
    ) -> Result<u64> {
        let mut stream = RfbInStream::new(Cursor::new(data));
        decoder
            .decode(&mut stream, rect, pf, &mut ScratchBuffers::new(), fb)
            .await?;
        Ok(stream.consumed())
    }

    /// Compresses one rectangle's tile data with a fresh stream and decodes it.
    async fn decode_tiles(tiles: &[u8], rect: &Rectangle, fb: &mut ManagedFramebuffer) -> Result<()> {
        let data = framed(&SyncDeflater::new().compress(tiles));
        decode_with(&ZRLEDecoder::default(), data, rect, &rgb888(), fb)
            .await
            .map(|_| ())
    }

    #[tokio::test]
    async fn test_solid_tile_with_rle_bit() {
        let mut tiles = vec![0x81];
        tiles.extend_from_slice(&cpx(RED));
        let mut fb = ManagedFramebuffer::new(8, 8);

        decode_tiles(&tiles, &rect(8, 8), &mut fb).await.unwrap();

        assert!(fb.data().iter().all(|&p| p == RED));
        assert_eq!(fb.take_damage(), vec![Rect::new(0, 0, 8, 8)]);
    }

    #[tokio::test]
    async fn test_raw_tile() {
        let mut tiles = vec![0x00];
        for colour in [RED, GREEN, BLUE, 0x123456] {
            tiles.extend_from_slice(&cpx(colour));
        }
        let mut fb = ManagedFramebuffer::new(2, 2);

        decode_tiles(&tiles, &rect(2, 2), &mut fb).await.unwrap();

        assert_eq!(fb.data(), &[RED, GREEN, BLUE, 0x123456]);
    }

    #[tokio::test]
    async fn test_plain_rle_short_run() {
        let mut tiles = vec![0x80];
        tiles.extend_from_slice(&cpx(GREEN));
        tiles.push(4);
        let mut fb = ManagedFramebuffer::new(5, 1);

        decode_tiles(&tiles, &rect(5, 1), &mut fb).await.unwrap();

        assert_eq!(fb.data(), &[GREEN; 5]);
    }

    #[tokio::test]
    async fn test_plain_rle_continued_run() {
        // 38 x 7 = 266 pixels in one run
        let mut tiles = vec![0x80];
        tiles.extend_from_slice(&cpx(BLUE));
        tiles.extend_from_slice(&[255, 10]);
        let mut fb = ManagedFramebuffer::new(38, 7);

        decode_tiles(&tiles, &rect(38, 7), &mut fb).await.unwrap();

        assert!(fb.data().iter().all(|&p| p == BLUE));
    }

    #[tokio::test]
    async fn test_run_exceeding_tile_fails() {
        let mut tiles = vec![0x80];
        tiles.extend_from_slice(&cpx(BLUE));
        tiles.push(4);
        let mut fb = ManagedFramebuffer::new(2, 2);

        let err = decode_tiles(&tiles, &rect(2, 2), &mut fb).await.unwrap_err();
        assert!(format!("{:?}", err).contains("exceeds the 4 pixels left"));
    }

    #[tokio::test]
    async fn test_packed_palette_rows_are_byte_aligned() {
        // 2 colours -> 1 bit per index; 3 pixels per row padded to a byte
        let mut tiles = vec![0x02];
        tiles.extend_from_slice(&cpx(RED));
        tiles.extend_from_slice(&cpx(BLUE));
        tiles.push(0b1010_0000);
        tiles.push(0b0110_0000);
        let mut fb = ManagedFramebuffer::new(3, 2);

        decode_tiles(&tiles, &rect(3, 2), &mut fb).await.unwrap();

        assert_eq!(fb.data(), &[BLUE, RED, BLUE, RED, BLUE, BLUE]);
    }

    #[tokio::test]
    async fn test_packed_palette_four_bit() {
        let colours = [RED, GREEN, BLUE, 0x111111, 0x222222];
        let mut tiles = vec![colours.len() as u8];
        for colour in colours {
            tiles.extend_from_slice(&cpx(colour));
        }
        tiles.extend_from_slice(&[0x41, 0x20]);
        let mut fb = ManagedFramebuffer::new(3, 1);

        decode_tiles(&tiles, &rect(3, 1), &mut fb).await.unwrap();

        assert_eq!(fb.data(), &[0x222222, GREEN, BLUE]);
    }

    #[tokio::test]
    async fn test_packed_index_past_palette() {
        // 3 colours use 2-bit indices, so index 3 is representable but invalid
        let mut tiles = vec![0x03];
        for colour in [RED, GREEN, BLUE] {
            tiles.extend_from_slice(&cpx(colour));
        }
        tiles.push(0b1100_0000);
        let mut fb = ManagedFramebuffer::new(1, 1);

        let err = decode_tiles(&tiles, &rect(1, 1), &mut fb).await.unwrap_err();
        assert!(format!("{:?}", err).contains("palette index 3 out of range"));
    }

    #[tokio::test]
    async fn test_palette_rle() {
        let mut tiles = vec![0x80 | 2];
        tiles.extend_from_slice(&cpx(RED));
        tiles.extend_from_slice(&cpx(GREEN));
        tiles.push(0x01); // single GREEN
        tiles.extend_from_slice(&[0x80, 2]); // RED x3
        let mut fb = ManagedFramebuffer::new(4, 1);

        decode_tiles(&tiles, &rect(4, 1), &mut fb).await.unwrap();

        assert_eq!(fb.data(), &[GREEN, RED, RED, RED]);
    }

    #[tokio::test]
    async fn test_multiple_tiles() {
        // 65 wide: a 64x1 tile and a 1x1 tile
        let mut tiles = vec![0x01];
        tiles.extend_from_slice(&cpx(RED));
        tiles.push(0x01);
        tiles.extend_from_slice(&cpx(BLUE));
        let mut fb = ManagedFramebuffer::new(65, 1);

        decode_tiles(&tiles, &rect(65, 1), &mut fb).await.unwrap();

        assert_eq!(region(&fb, 62, 0, 3, 1), vec![RED, RED, BLUE]);
    }

    #[tokio::test]
    async fn test_palette_format_cpixels_are_one_byte() {
        let pf = ColourModel::C256.pixel_format();
        let tiles = [0x00, 0x07, 0xC0];
        let data = framed(&SyncDeflater::new().compress(&tiles));
        let mut fb = ManagedFramebuffer::new(2, 1);

        decode_with(&ZRLEDecoder::default(), data, &rect(2, 1), &pf, &mut fb)
            .await
            .unwrap();

        assert_eq!(fb.data(), &[RED, BLUE]);
    }

    #[tokio::test]
    async fn test_persistent_stream_across_rectangles() {
        let mut deflater = SyncDeflater::new();
        let decoder = ZRLEDecoder::new(ZrleStreamMode::Persistent);
        let mut fb = ManagedFramebuffer::new(2, 1);

        for colour in [RED, GREEN] {
            let mut tiles = vec![0x01];
            tiles.extend_from_slice(&cpx(colour));
            let data = framed(&deflater.compress(&tiles));
            decode_with(&decoder, data, &rect(2, 1), &rgb888(), &mut fb)
                .await
                .unwrap();
            assert_eq!(fb.data(), &[colour; 2]);
        }
    }

    #[tokio::test]
    async fn test_per_rectangle_stream_resets() {
        let decoder = ZRLEDecoder::new(ZrleStreamMode::PerRectangle);
        let mut fb = ManagedFramebuffer::new(2, 1);

        for colour in [RED, GREEN] {
            let mut tiles = vec![0x01];
            tiles.extend_from_slice(&cpx(colour));
            // a new zlib stream (with header) per rectangle
            let data = framed(&SyncDeflater::new().compress(&tiles));
            decode_with(&decoder, data, &rect(2, 1), &rgb888(), &mut fb)
                .await
                .unwrap();
            assert_eq!(fb.data(), &[colour; 2]);
        }
    }

    #[tokio::test]
    async fn test_oversized_length_rejected() {
        let data = (MAX_COMPRESSED_LEN + 1).to_be_bytes().to_vec();
        let mut fb = ManagedFramebuffer::new(2, 2);

        let err = decode_with(&ZRLEDecoder::default(), data, &rect(2, 2), &rgb888(), &mut fb)
            .await
            .unwrap_err();
        assert!(err.to_string().contains("illegal compressed data size"));
    }

    #[tokio::test]
    async fn test_trailing_tile_bytes_rejected() {
        let mut tiles = vec![0x01];
        tiles.extend_from_slice(&cpx(RED));
        tiles.push(0x00);
        let mut fb = ManagedFramebuffer::new(1, 1);

        let err = decode_tiles(&tiles, &rect(1, 1), &mut fb).await.unwrap_err();
        assert!(err.to_string().contains("1 trailing bytes"));
    }

    #[tokio::test]
    async fn test_undrawable_rectangle_keeps_stream_in_sync() {
        let mut deflater = SyncDeflater::new();
        let decoder = ZRLEDecoder::default();
        let mut fb = ManagedFramebuffer::new(4, 4);
        fb.set_viewport(Some(Rect::new(0, 0, 2, 2)));

        let mut hidden = vec![0x00];
        for _ in 0..4 {
            hidden.extend_from_slice(&cpx(RED));
        }
        let mut data = framed(&deflater.compress(&hidden));
        let consumed_expected = data.len() as u64;
        let hidden_rect = Rectangle {
            x: 2,
            y: 2,
            ..rect(2, 2)
        };
        data.extend(framed(&deflater.compress(&[0x01, 0x00, 0xFF, 0x00])));

        let mut stream = RfbInStream::new(Cursor::new(data));
        let mut scratch = ScratchBuffers::new();
        decoder
            .decode(&mut stream, &hidden_rect, &rgb888(), &mut scratch, &mut fb)
            .await
            .unwrap();
        assert_eq!(stream.consumed(), consumed_expected);
        assert_eq!(fb.pixel(3, 3), Some(0));

        decoder
            .decode(&mut stream, &rect(2, 2), &rgb888(), &mut scratch, &mut fb)
            .await
            .unwrap();
        assert_eq!(region(&fb, 0, 0, 2, 2), vec![GREEN; 4]);
    }

    #[tokio::test]
    async fn test_inflation_past_rectangle_budget_rejected() {
        // a 1x1 rectangle holds at most a few hundred bytes of tile data
        let compressed = SyncDeflater::new().compress(&vec![0u8; 4 * 1024 * 1024]);
        let data = framed(&compressed);
        let mut stream = RfbInStream::new(Cursor::new(data));
        let mut scratch = ScratchBuffers::new();
        let mut fb = ManagedFramebuffer::new(1, 1);

        let err = ZRLEDecoder::default()
            .decode(&mut stream, &rect(1, 1), &rgb888(), &mut scratch, &mut fb)
            .await
            .unwrap_err();

        assert!(format!("{:?}", err).contains("byte limit"), "{:?}", err);
        assert!(scratch.footprint() < compressed.len() + 64 * 1024);
    }

    #[test]
    fn test_tile_data_budget() {
        let pf = rgb888();
        // one tile: mode + 127 * 3 palette + 4 pixels * (3 + 1)
        assert_eq!(max_tile_data(&rect(2, 2), &pf), 1 + 381 + 16);
        // 65x1 spans two tiles
        assert_eq!(max_tile_data(&rect(65, 1), &pf), 2 * 382 + 65 * 4);
        assert_eq!(max_tile_data(&rect(0, 0), &pf), 0);
    }
}
