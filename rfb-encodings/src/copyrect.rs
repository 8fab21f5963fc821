//! CopyRect encoding decoder - copy rectangle from another screen location.
//!
//! CopyRect (type 1) tells the client to copy a rectangle it already holds
//! from one position to another, which is how servers express window drags
//! and scrolling.
//!
//! # Wire Format
//!
//! ```text
//! +----------+----------+
//! | src_x    | src_y    |  2 bytes each (u16, network byte order)
//! +----------+----------+
//! ```
//!
//! The rectangle header gives the **destination**; the payload gives the
//! top-left corner of the **source**. Source and destination may overlap, so
//! the copy goes through [`FramebufferSink::copy_rect`] which picks a safe
//! row order.

use crate::scratch::ScratchBuffers;
use crate::{
    framing_end, framing_start, Decoder, FramebufferSink, PixelFormat, Rectangle, RfbInStream,
    ENCODING_COPYRECT,
};
use anyhow::{Context, Result};
use rfb_common::Point;
use tokio::io::AsyncRead;

/// Decoder for CopyRect encoding.
///
/// ```
/// # use rfb_encodings::{CopyRectDecoder, Decoder, ENCODING_COPYRECT};
/// assert_eq!(CopyRectDecoder.encoding_type(), ENCODING_COPYRECT);
/// ```
#[derive(Debug, Default, Clone, Copy)]
pub struct CopyRectDecoder;

impl Decoder for CopyRectDecoder {
    fn encoding_type(&self) -> i32 {
        ENCODING_COPYRECT
    }

    async fn decode<R: AsyncRead + Unpin>(
        &self,
        stream: &mut RfbInStream<R>,
        rect: &Rectangle,
        _pixel_format: &PixelFormat,
        _scratch: &mut ScratchBuffers,
        sink: &mut dyn FramebufferSink,
    ) -> Result<()> {
        let start = framing_start("CopyRect", rect, stream);

        // The source position is on the wire even for empty rectangles.
        let src_x = stream
            .read_u16()
            .await
            .context("Failed to read CopyRect src_x")?;
        let src_y = stream
            .read_u16()
            .await
            .context("Failed to read CopyRect src_y")?;

        let dest = rect.rect();
        if !dest.is_empty() && sink.valid_draw(dest) {
            let offset = Point::new(
                i32::from(src_x) - i32::from(rect.x),
                i32::from(src_y) - i32::from(rect.y),
            );
            sink.copy_rect(dest, offset).with_context(|| {
                format!(
                    "Failed to copy rectangle from ({}, {}) to {:?}",
                    src_x, src_y, dest
                )
            })?;
            sink.commit(dest);
        }

        framing_end("CopyRect", stream, start);
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_support::{region, rgb888};
    use rfb_common::Rect;
    use rfb_pixelbuffer::{ManagedFramebuffer, PixelBuffer};
    use std::io::Cursor;

    fn rect(x: u16, y: u16, width: u16, height: u16) -> Rectangle {
        Rectangle {
            x,
            y,
            width,
            height,
            encoding: ENCODING_COPYRECT,
        }
    }

    fn source(src_x: u16, src_y: u16) -> RfbInStream<Cursor<Vec<u8>>> {
        let mut data = Vec::new();
        data.extend_from_slice(&src_x.to_be_bytes());
        data.extend_from_slice(&src_y.to_be_bytes());
        RfbInStream::new(Cursor::new(data))
    }

    /// 8x8 buffer where every pixel holds its own index.
    fn numbered() -> ManagedFramebuffer {
        let mut fb = ManagedFramebuffer::new(8, 8);
        let pixels: Vec<u32> = (0..64).collect();
        fb.image_rect(Rect::new(0, 0, 8, 8), &pixels, 8).unwrap();
        fb.take_damage();
        fb
    }

    #[tokio::test]
    async fn test_decode_non_overlapping() {
        let mut fb = numbered();
        let expected = region(&fb, 0, 0, 2, 2);
        let mut stream = source(0, 0);

        CopyRectDecoder
            .decode(&mut stream, &rect(5, 5, 2, 2), &rgb888(), &mut ScratchBuffers::new(), &mut fb)
            .await
            .unwrap();

        assert_eq!(region(&fb, 5, 5, 2, 2), expected);
        assert_eq!(fb.take_damage(), vec![Rect::new(5, 5, 2, 2)]);
    }

    #[tokio::test]
    async fn test_decode_overlapping_downwards() {
        let mut fb = numbered();
        let expected = region(&fb, 0, 0, 4, 4);
        let mut stream = source(0, 0);

        CopyRectDecoder
            .decode(&mut stream, &rect(1, 2, 4, 4), &rgb888(), &mut ScratchBuffers::new(), &mut fb)
            .await
            .unwrap();

        assert_eq!(region(&fb, 1, 2, 4, 4), expected);
    }

    #[tokio::test]
    async fn test_empty_rectangle_still_reads_source() {
        let mut fb = numbered();
        let mut stream = source(3, 3);

        CopyRectDecoder
            .decode(&mut stream, &rect(0, 0, 0, 0), &rgb888(), &mut ScratchBuffers::new(), &mut fb)
            .await
            .unwrap();

        assert_eq!(stream.consumed(), 4);
        assert!(fb.take_damage().is_empty());
        assert_eq!(fb.pixel(0, 0), Some(0));
    }

    #[tokio::test]
    async fn test_destination_outside_viewport_is_skipped() {
        let mut fb = numbered();
        fb.set_viewport(Some(Rect::new(0, 0, 4, 4)));
        let mut stream = source(0, 0);

        CopyRectDecoder
            .decode(&mut stream, &rect(6, 6, 2, 2), &rgb888(), &mut ScratchBuffers::new(), &mut fb)
            .await
            .unwrap();

        assert_eq!(stream.consumed(), 4);
        assert_eq!(fb.pixel(6, 6), Some(54));
    }

    #[tokio::test]
    async fn test_source_out_of_bounds() {
        let mut fb = numbered();
        let mut stream = source(7, 7);

        let result = CopyRectDecoder
            .decode(&mut stream, &rect(0, 0, 2, 2), &rgb888(), &mut ScratchBuffers::new(), &mut fb)
            .await;
        assert!(result.is_err());
    }

    #[tokio::test]
    async fn test_decode_eof_error() {
        let mut stream = RfbInStream::new(Cursor::new(vec![0u8, 1]));
        let mut fb = numbered();

        let err = CopyRectDecoder
            .decode(&mut stream, &rect(0, 0, 1, 1), &rgb888(), &mut ScratchBuffers::new(), &mut fb)
            .await
            .unwrap_err();
        assert!(format!("{:?}", err).contains("src_y"));
    }
}
