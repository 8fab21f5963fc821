//! RFB protocol message types.
//!
//! - **Core types** ([`types`]) - PixelFormat, Rectangle, encoding and message constants
//! - **Server messages** ([`server`]) - messages sent from server to client
//! - **Client messages** ([`client`]) - messages sent from client to server
//!
//! # Wire Format Rules
//!
//! 1. **Big-endian byte order** for all multi-byte integers
//! 2. **Strict boolean validation** - boolean fields must be exactly 0 or 1
//! 3. **Padding validation** - padding bytes must be zero, except where a
//!    padding byte is documented to carry a flag
//! 4. **Fail-fast errors** - invalid data is an error, never patched up
//!
//! FramebufferUpdate rectangles are streamed: the update header is parsed
//! here, while each rectangle's payload is consumed by the decoder for its
//! encoding before the next rectangle header can be read.

pub mod client;
pub mod server;
pub mod types;

#[cfg(test)]
mod proptest_framing;

pub use types::{
    encoding_name, PixelFormat, Rectangle, ENCODING_COPYRECT, ENCODING_CORRE, ENCODING_HEXTILE,
    ENCODING_RAW, ENCODING_RRE, ENCODING_ZLIB, ENCODING_ZRLE,
};

pub use server::{Bell, FramebufferUpdate, ServerCutText, TextChat};

pub use client::{FramebufferUpdateRequest, SetEncodings, SetPixelFormat};

use crate::io::{RfbInStream, RfbOutStream};
use tokio::io::{AsyncRead, AsyncWrite};

/// Any message the decoder session sends to the server.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ClientMessage {
    SetPixelFormat(SetPixelFormat),
    SetEncodings(SetEncodings),
    FramebufferUpdateRequest(FramebufferUpdateRequest),
}

impl ClientMessage {
    /// Reads one complete client message, type byte included.
    pub async fn read_from<R: AsyncRead + Unpin>(
        stream: &mut RfbInStream<R>,
    ) -> std::io::Result<Self> {
        let msg_type = stream.read_u8().await?;
        match msg_type {
            types::MSG_SET_PIXEL_FORMAT => Ok(ClientMessage::SetPixelFormat(
                SetPixelFormat::read_from(stream).await?,
            )),
            types::MSG_SET_ENCODINGS => Ok(ClientMessage::SetEncodings(
                SetEncodings::read_from(stream).await?,
            )),
            types::MSG_FRAMEBUFFER_UPDATE_REQUEST => Ok(ClientMessage::FramebufferUpdateRequest(
                FramebufferUpdateRequest::read_from(stream).await?,
            )),
            _ => Err(std::io::Error::new(
                std::io::ErrorKind::InvalidData,
                format!("unknown client message type: {}", msg_type),
            )),
        }
    }

    pub fn write_to<W: AsyncWrite + Unpin>(
        &self,
        stream: &mut RfbOutStream<W>,
    ) -> std::io::Result<()> {
        match self {
            ClientMessage::SetPixelFormat(msg) => msg.write_to(stream),
            ClientMessage::SetEncodings(msg) => {
                msg.write_to(stream);
                Ok(())
            }
            ClientMessage::FramebufferUpdateRequest(msg) => {
                msg.write_to(stream);
                Ok(())
            }
        }
    }
}
