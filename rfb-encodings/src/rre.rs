//! RRE and CoRRE encoding decoders.
//!
//! RRE (Rise-and-Run-length Encoding, type 2) describes a rectangle as a
//! background colour plus a list of solid sub-rectangles. CoRRE (type 4) is
//! the same scheme with one-byte sub-rectangle geometry, which limits the
//! enclosing rectangle to 255x255.
//!
//! # Wire Format
//!
//! ```text
//! +------------------+
//! | num_subrects     |  4 bytes (u32, network byte order)
//! +------------------+
//! | background_pixel |  bytes_per_pixel bytes
//! +------------------+
//! | Subrectangle 1   |
//! |   pixel          |  bytes_per_pixel bytes
//! |   x, y, w, h     |  RRE: 4 x u16, CoRRE: 4 x u8
//! +------------------+
//! | ...              |
//! +------------------+
//! ```
//!
//! Sub-rectangle positions are relative to the enclosing rectangle and must
//! lie inside it.

use crate::scratch::ScratchBuffers;
use crate::{
    framing_end, framing_start, Decoder, FramebufferSink, PixelFormat, Rectangle, RfbInStream,
    ENCODING_CORRE, ENCODING_RRE,
};
use anyhow::{bail, Context, Result};
use rfb_common::Rect;
use tokio::io::AsyncRead;

/// Width of the sub-rectangle geometry fields.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum SubrectLayout {
    /// Four u16 fields (RRE).
    Wide,
    /// Four u8 fields (CoRRE).
    Compact,
}

impl SubrectLayout {
    fn name(self) -> &'static str {
        match self {
            Self::Wide => "RRE",
            Self::Compact => "CoRRE",
        }
    }

    fn geometry_len(self) -> usize {
        match self {
            Self::Wide => 8,
            Self::Compact => 4,
        }
    }

    fn parse(self, bytes: &[u8]) -> (u32, u32, u32, u32) {
        match self {
            Self::Wide => {
                let field = |i: usize| u32::from(u16::from_be_bytes([bytes[i], bytes[i + 1]]));
                (field(0), field(2), field(4), field(6))
            }
            Self::Compact => (
                u32::from(bytes[0]),
                u32::from(bytes[1]),
                u32::from(bytes[2]),
                u32::from(bytes[3]),
            ),
        }
    }
}

/// Decoder for RRE encoding.
///
/// ```
/// # use rfb_encodings::{Decoder, RREDecoder, ENCODING_RRE};
/// assert_eq!(RREDecoder.encoding_type(), ENCODING_RRE);
/// ```
#[derive(Debug, Default, Clone, Copy)]
pub struct RREDecoder;

/// Decoder for CoRRE encoding.
#[derive(Debug, Default, Clone, Copy)]
pub struct CoRREDecoder;

impl Decoder for RREDecoder {
    fn encoding_type(&self) -> i32 {
        ENCODING_RRE
    }

    async fn decode<R: AsyncRead + Unpin>(
        &self,
        stream: &mut RfbInStream<R>,
        rect: &Rectangle,
        pixel_format: &PixelFormat,
        _scratch: &mut ScratchBuffers,
        sink: &mut dyn FramebufferSink,
    ) -> Result<()> {
        decode_subrects(stream, rect, pixel_format, sink, SubrectLayout::Wide).await
    }
}

impl Decoder for CoRREDecoder {
    fn encoding_type(&self) -> i32 {
        ENCODING_CORRE
    }

    async fn decode<R: AsyncRead + Unpin>(
        &self,
        stream: &mut RfbInStream<R>,
        rect: &Rectangle,
        pixel_format: &PixelFormat,
        _scratch: &mut ScratchBuffers,
        sink: &mut dyn FramebufferSink,
    ) -> Result<()> {
        decode_subrects(stream, rect, pixel_format, sink, SubrectLayout::Compact).await
    }
}

async fn decode_subrects<R: AsyncRead + Unpin>(
    stream: &mut RfbInStream<R>,
    rect: &Rectangle,
    pixel_format: &PixelFormat,
    sink: &mut dyn FramebufferSink,
    layout: SubrectLayout,
) -> Result<()> {
    let name = layout.name();
    let start = framing_start(name, rect, stream);

    let bpp = pixel_format.bytes_per_pixel();
    let dest = rect.rect();
    let valid = !dest.is_empty() && sink.valid_draw(dest);

    let num_subrects = stream
        .read_u32()
        .await
        .with_context(|| format!("Failed to read {} num_subrects", name))?;

    // pixel (up to 4 bytes) followed by the geometry (up to 8 bytes)
    let mut record = [0u8; 12];
    let bg = &mut record[..bpp];
    stream
        .read_bytes(bg)
        .await
        .with_context(|| format!("Failed to read {} background pixel", name))?;
    if valid {
        let pixel = pixel_format.pixel(bg)?;
        sink.fill_rect(dest, pixel)
            .with_context(|| format!("Failed to fill {} background", name))?;
    }

    let record_len = bpp + layout.geometry_len();
    for i in 0..num_subrects {
        let record = &mut record[..record_len];
        stream
            .read_bytes(record)
            .await
            .with_context(|| format!("Failed to read {} subrect {}", name, i))?;

        let (x, y, w, h) = layout.parse(&record[bpp..]);
        if x + w > dest.width || y + h > dest.height {
            bail!(
                "{} subrect {} [{},{} {}x{}] extends beyond {}x{} rectangle",
                name,
                i,
                x,
                y,
                w,
                h,
                dest.width,
                dest.height
            );
        }

        if valid && w > 0 && h > 0 {
            let pixel = pixel_format.pixel(&record[..bpp])?;
            let subrect = Rect::new(dest.x + x as i32, dest.y + y as i32, w, h);
            sink.fill_rect(subrect, pixel)
                .with_context(|| format!("Failed to fill {} subrect {}", name, i))?;
        }
    }

    if valid {
        sink.commit(dest);
    }
    framing_end(name, stream, start);
    Ok(())
}
