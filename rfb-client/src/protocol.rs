//! Protocol message helpers for sending/receiving RFB messages.
//!
//! Thin wrappers over the `rfb_protocol::messages` types that add protocol
//! tracing and map I/O failures to [`RfbClientError`]. Every writer flushes.

use crate::errors::RfbClientError;
use crate::protocol_trace;
use rfb_pixelbuffer::PixelFormat;
use rfb_protocol::io::{RfbInStream, RfbOutStream};
use rfb_protocol::messages as msg;
use tokio::io::{AsyncRead, AsyncWrite};

fn read_error(what: &str) -> impl FnOnce(std::io::Error) -> RfbClientError + '_ {
    move |e| {
        if e.kind() == std::io::ErrorKind::UnexpectedEof {
            RfbClientError::Transport(e)
        } else {
            RfbClientError::Protocol(format!("failed to read {}: {}", what, e))
        }
    }
}

/// Read only the next server message type byte.
pub async fn read_message_type<R: AsyncRead + Unpin>(
    instream: &mut RfbInStream<R>,
) -> Result<u8, RfbClientError> {
    let t = instream
        .read_u8()
        .await
        .map_err(read_error("message type"))?;
    protocol_trace::in_msg("ServerMessageType", format_args!("type={}", t));
    Ok(t)
}

/// Read a FramebufferUpdate header (type byte already consumed).
pub async fn read_framebuffer_update<R: AsyncRead + Unpin>(
    instream: &mut RfbInStream<R>,
) -> Result<msg::FramebufferUpdate, RfbClientError> {
    let update = msg::FramebufferUpdate::read_from(instream)
        .await
        .map_err(read_error("FramebufferUpdate"))?;
    protocol_trace::in_msg(
        "FramebufferUpdate",
        format_args!("rects={}", update.num_rectangles),
    );
    Ok(update)
}

/// Read one rectangle header.
pub async fn read_rectangle<R: AsyncRead + Unpin>(
    instream: &mut RfbInStream<R>,
) -> Result<msg::Rectangle, RfbClientError> {
    let rect = msg::Rectangle::read_from(instream)
        .await
        .map_err(read_error("rectangle header"))?;
    protocol_trace::in_msg(
        "Rectangle",
        format_args!(
            "{} [{},{} {}x{}]",
            msg::encoding_name(rect.encoding),
            rect.x,
            rect.y,
            rect.width,
            rect.height
        ),
    );
    Ok(rect)
}

/// Read a ServerCutText body (type byte already consumed).
pub async fn read_server_cut_text<R: AsyncRead + Unpin>(
    instream: &mut RfbInStream<R>,
) -> Result<msg::ServerCutText, RfbClientError> {
    let cut = msg::ServerCutText::read_from(instream)
        .await
        .map_err(read_error("ServerCutText"))?;
    protocol_trace::in_msg("ServerCutText", format_args!("len={}", cut.text.len()));
    protocol_trace::hexdump("  ", &cut.text, 64);
    Ok(cut)
}

/// Read a TextChat body (type byte already consumed).
pub async fn read_text_chat<R: AsyncRead + Unpin>(
    instream: &mut RfbInStream<R>,
) -> Result<msg::TextChat, RfbClientError> {
    let chat = msg::TextChat::read_from(instream)
        .await
        .map_err(read_error("TextChat"))?;
    protocol_trace::in_msg("TextChat", format_args!("{:?}", chat));
    Ok(chat)
}

/// Write SetPixelFormat for `pixel_format` and flush.
pub async fn write_set_pixel_format<W: AsyncWrite + Unpin>(
    outstream: &mut RfbOutStream<W>,
    pixel_format: &PixelFormat,
) -> Result<(), RfbClientError> {
    let message = msg::SetPixelFormat {
        pixel_format: pixel_format.to_wire(),
        greyscale: pixel_format.greyscale,
    };
    protocol_trace::out_msg(
        "SetPixelFormat",
        format_args!(
            "bpp={} depth={} maxes={}/{}/{} shifts={}/{}/{} grey={}",
            message.pixel_format.bits_per_pixel,
            message.pixel_format.depth,
            message.pixel_format.red_max,
            message.pixel_format.green_max,
            message.pixel_format.blue_max,
            message.pixel_format.red_shift,
            message.pixel_format.green_shift,
            message.pixel_format.blue_shift,
            message.greyscale
        ),
    );
    message.write_to(outstream)
        .map_err(|e| RfbClientError::Protocol(format!("failed to write SetPixelFormat: {}", e)))?;
    tracing::debug!(
        "Wrote SetPixelFormat (bpp={}, depth={})",
        message.pixel_format.bits_per_pixel,
        message.pixel_format.depth
    );
    outstream.flush().await.map_err(RfbClientError::Transport)
}

/// Write SetEncodings with preferred encoding order and flush.
pub async fn write_set_encodings<W: AsyncWrite + Unpin>(
    outstream: &mut RfbOutStream<W>,
    encodings: &[i32],
) -> Result<(), RfbClientError> {
    let message = msg::SetEncodings {
        encodings: encodings.to_vec(),
    };
    protocol_trace::out_msg("SetEncodings", format_args!("{:?}", message.encodings));
    tracing::debug!("Wrote SetEncodings: {:?}", message.encodings);
    message.write_to(outstream);
    outstream.flush().await.map_err(RfbClientError::Transport)
}

/// Write a FramebufferUpdateRequest for the whole `width` x `height` screen and flush.
pub async fn write_framebuffer_update_request<W: AsyncWrite + Unpin>(
    outstream: &mut RfbOutStream<W>,
    incremental: bool,
    width: u16,
    height: u16,
) -> Result<(), RfbClientError> {
    let message = msg::FramebufferUpdateRequest {
        incremental,
        x: 0,
        y: 0,
        width,
        height,
    };
    protocol_trace::out_msg(
        "FramebufferUpdateRequest",
        format_args!("inc={} {}x{}", incremental, width, height),
    );
    message.write_to(outstream);
    outstream.flush().await.map_err(RfbClientError::Transport)
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;
    use rfb_pixelbuffer::ColourModel;
    use std::io::Cursor;

    #[tokio::test]
    async fn test_write_set_pixel_format_greyscale_flag() {
        let mut out = RfbOutStream::new(Vec::new());
        write_set_pixel_format(&mut out, &ColourModel::C4.pixel_format())
            .await
            .unwrap();

        let bytes = out.into_inner();
        assert_eq!(bytes.len(), 20);
        assert_eq!(&bytes[..4], &[0, 0, 0, 0]);
        // bpp, depth, big-endian, true-colour
        assert_eq!(&bytes[4..8], &[8, 6, 0, 1]);
        // greyscale rides in the first padding byte
        assert_eq!(&bytes[17..20], &[1, 0, 0]);
    }

    #[tokio::test]
    async fn test_write_update_request() {
        let mut out = RfbOutStream::new(Vec::new());
        write_framebuffer_update_request(&mut out, true, 640, 480)
            .await
            .unwrap();
        assert_eq!(
            out.into_inner(),
            vec![3, 1, 0, 0, 0, 0, 0x02, 0x80, 0x01, 0xE0]
        );
    }

    #[tokio::test]
    async fn test_read_message_type_eof_is_transport_error() {
        let mut stream = RfbInStream::new(Cursor::new(Vec::<u8>::new()));
        let err = read_message_type(&mut stream).await.unwrap_err();
        assert!(err.is_retryable());
    }
}
