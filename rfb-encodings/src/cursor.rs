//! Cursor pseudo-encodings.
//!
//! Cursor shapes are accepted but never painted into the framebuffer. Their
//! payloads still have to be consumed to keep the stream aligned.
//!
//! ```text
//! XCursor (-240), only when width * height > 0:
//!   foreground RGB, background RGB   6 bytes
//!   bitmap, mask                     2 * ceil(width / 8) * height bytes
//!
//! RichCursor (-239):
//!   pixels                           width * height * bpp bytes
//!   mask                             ceil(width / 8) * height bytes
//! ```

use crate::{PixelFormat, Rectangle, RfbInStream};
use anyhow::{bail, Context, Result};
use rfb_protocol::messages::types::{PSEUDO_ENCODING_RICH_CURSOR, PSEUDO_ENCODING_X_CURSOR};
use tokio::io::AsyncRead;

/// Number of payload bytes that follow a cursor rectangle header.
pub fn cursor_payload_len(rect: &Rectangle, pixel_format: &PixelFormat) -> Result<usize> {
    let area = rect.area();
    let mask_len = usize::from(rect.width).div_ceil(8) * usize::from(rect.height);
    match rect.encoding {
        PSEUDO_ENCODING_X_CURSOR if area == 0 => Ok(0),
        PSEUDO_ENCODING_X_CURSOR => Ok(6 + 2 * mask_len),
        PSEUDO_ENCODING_RICH_CURSOR => Ok(area * pixel_format.bytes_per_pixel() + mask_len),
        other => bail!("encoding {} is not a cursor shape", other),
    }
}

/// Skips the shape data of an XCursor or RichCursor rectangle.
pub async fn skip_cursor_payload<R: AsyncRead + Unpin>(
    stream: &mut RfbInStream<R>,
    rect: &Rectangle,
    pixel_format: &PixelFormat,
) -> Result<()> {
    let len = cursor_payload_len(rect, pixel_format)?;
    tracing::trace!(
        "skipping {}x{} cursor shape ({} bytes)",
        rect.width,
        rect.height,
        len
    );
    stream
        .skip(len)
        .await
        .context("Failed to skip cursor shape")?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_support::rgb888;
    use rfb_pixelbuffer::ColourModel;
    use std::io::Cursor;

    fn cursor_rect(encoding: i32, width: u16, height: u16) -> Rectangle {
        Rectangle {
            x: 3,
            y: 4,
            width,
            height,
            encoding,
        }
    }

    #[test]
    fn test_payload_lengths() {
        let pf = rgb888();
        // 10 pixels wide -> 2 mask bytes per row
        let x = cursor_rect(PSEUDO_ENCODING_X_CURSOR, 10, 3);
        assert_eq!(cursor_payload_len(&x, &pf).unwrap(), 6 + 2 * 2 * 3);

        let rich = cursor_rect(PSEUDO_ENCODING_RICH_CURSOR, 10, 3);
        assert_eq!(cursor_payload_len(&rich, &pf).unwrap(), 30 * 4 + 2 * 3);

        let rich_c8 = ColourModel::C8.pixel_format();
        assert_eq!(cursor_payload_len(&rich, &rich_c8).unwrap(), 30 + 2 * 3);
    }

    #[test]
    fn test_empty_x_cursor_has_no_colours() {
        let empty = cursor_rect(PSEUDO_ENCODING_X_CURSOR, 0, 0);
        assert_eq!(cursor_payload_len(&empty, &rgb888()).unwrap(), 0);
    }

    #[test]
    fn test_non_cursor_encoding_rejected() {
        let raw = cursor_rect(0, 1, 1);
        assert!(cursor_payload_len(&raw, &rgb888()).is_err());
    }

    #[tokio::test]
    async fn test_skip_leaves_stream_at_next_byte() {
        let rect = cursor_rect(PSEUDO_ENCODING_X_CURSOR, 8, 2);
        let mut data = vec![0u8; 6 + 2 * 2];
        data.push(0x7F);
        let mut stream = RfbInStream::new(Cursor::new(data));

        skip_cursor_payload(&mut stream, &rect, &rgb888()).await.unwrap();
        assert_eq!(stream.read_u8().await.unwrap(), 0x7F);
    }
}
