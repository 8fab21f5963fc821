//! Server-to-client RFB messages.
//!
//! Each `read_from` expects the message-type byte to have been consumed
//! already. The `write_to` counterparts emit the complete message including
//! its type byte and exist mainly to script servers in tests.

use super::types::{MSG_BELL, MSG_FRAMEBUFFER_UPDATE, MSG_SERVER_CUT_TEXT, MSG_TEXT_CHAT};
use crate::io::{RfbInStream, RfbOutStream};
use bytes::Bytes;
use tokio::io::{AsyncRead, AsyncWrite};

/// Header of a FramebufferUpdate.
///
/// Rectangles are not read here: each rectangle header is followed by its
/// encoded payload, so they have to be read one at a time by the decoder.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct FramebufferUpdate {
    pub num_rectangles: u16,
}

impl FramebufferUpdate {
    pub async fn read_from<R: AsyncRead + Unpin>(
        stream: &mut RfbInStream<R>,
    ) -> std::io::Result<Self> {
        stream.skip(1).await?; // padding
        Ok(Self {
            num_rectangles: stream.read_u16().await?,
        })
    }

    pub fn write_to<W: AsyncWrite + Unpin>(&self, stream: &mut RfbOutStream<W>) {
        stream.write_u8(MSG_FRAMEBUFFER_UPDATE);
        stream.write_u8(0); // padding
        stream.write_u16(self.num_rectangles);
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Bell;

impl Bell {
    pub fn write_to<W: AsyncWrite + Unpin>(&self, stream: &mut RfbOutStream<W>) {
        stream.write_u8(MSG_BELL);
    }
}

/// Clipboard contents pushed by the server, Latin-1 encoded on the wire.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ServerCutText {
    pub text: Bytes,
}

impl ServerCutText {
    pub async fn read_from<R: AsyncRead + Unpin>(
        stream: &mut RfbInStream<R>,
    ) -> std::io::Result<Self> {
        stream.skip(3).await?; // padding
        let length = stream.read_u32().await? as usize;
        let text = stream.read_owned(length).await?;
        Ok(Self { text })
    }

    pub fn write_to<W: AsyncWrite + Unpin>(&self, stream: &mut RfbOutStream<W>) {
        stream.write_u8(MSG_SERVER_CUT_TEXT);
        stream.write_bytes(&[0, 0, 0]);
        stream.write_u32(self.text.len() as u32);
        stream.write_bytes(&self.text);
    }

    /// Decodes the Latin-1 payload.
    pub fn to_string_lossy(&self) -> String {
        latin1_to_string(&self.text)
    }
}

/// UltraVNC text chat message.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TextChat {
    Opened,
    Closed,
    Finished,
    Message(Bytes),
}

impl TextChat {
    const OPEN: u32 = 0xFFFF_FFFF;
    const CLOSE: u32 = 0xFFFF_FFFE;
    const FINISHED: u32 = 0xFFFF_FFFD;

    pub async fn read_from<R: AsyncRead + Unpin>(
        stream: &mut RfbInStream<R>,
    ) -> std::io::Result<Self> {
        stream.skip(3).await?; // padding
        Ok(match stream.read_u32().await? {
            Self::OPEN => TextChat::Opened,
            Self::CLOSE => TextChat::Closed,
            Self::FINISHED => TextChat::Finished,
            length => TextChat::Message(stream.read_owned(length as usize).await?),
        })
    }

    pub fn write_to<W: AsyncWrite + Unpin>(&self, stream: &mut RfbOutStream<W>) {
        stream.write_u8(MSG_TEXT_CHAT);
        stream.write_bytes(&[0, 0, 0]);
        match self {
            TextChat::Opened => stream.write_u32(Self::OPEN),
            TextChat::Closed => stream.write_u32(Self::CLOSE),
            TextChat::Finished => stream.write_u32(Self::FINISHED),
            TextChat::Message(text) => {
                stream.write_u32(text.len() as u32);
                stream.write_bytes(text);
            }
        }
    }
}

/// Maps every byte to the code point of the same value.
pub fn latin1_to_string(bytes: &[u8]) -> String {
    bytes.iter().map(|&b| char::from(b)).collect()
}
