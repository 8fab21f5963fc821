//! Client-to-server RFB messages used by the decoder session.
//!
//! `read_from` expects the message-type byte to have been consumed already;
//! it is used by tests that play the server side.

use super::types::{
    PixelFormat, MSG_FRAMEBUFFER_UPDATE_REQUEST, MSG_SET_ENCODINGS, MSG_SET_PIXEL_FORMAT,
};
use crate::io::{RfbInStream, RfbOutStream};
use tokio::io::{AsyncRead, AsyncWrite};

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SetPixelFormat {
    pub pixel_format: PixelFormat,
    /// Sent in the first padding byte of the pixel format.
    pub greyscale: bool,
}

impl SetPixelFormat {
    pub async fn read_from<R: AsyncRead + Unpin>(
        stream: &mut RfbInStream<R>,
    ) -> std::io::Result<Self> {
        stream.skip(3).await?; // padding
        let (pixel_format, greyscale) = PixelFormat::read_with_greyscale(stream).await?;
        Ok(Self {
            pixel_format,
            greyscale,
        })
    }

    pub fn write_to<W: AsyncWrite + Unpin>(
        &self,
        stream: &mut RfbOutStream<W>,
    ) -> std::io::Result<()> {
        stream.write_u8(MSG_SET_PIXEL_FORMAT);
        stream.write_bytes(&[0, 0, 0]);
        self.pixel_format
            .write_with_greyscale(stream, self.greyscale)
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SetEncodings {
    pub encodings: Vec<i32>,
}

impl SetEncodings {
    pub async fn read_from<R: AsyncRead + Unpin>(
        stream: &mut RfbInStream<R>,
    ) -> std::io::Result<Self> {
        stream.skip(1).await?; // padding
        let num_encodings = stream.read_u16().await? as usize;

        let mut encodings = Vec::with_capacity(num_encodings);
        for _ in 0..num_encodings {
            encodings.push(stream.read_i32().await?);
        }

        Ok(Self { encodings })
    }

    pub fn write_to<W: AsyncWrite + Unpin>(&self, stream: &mut RfbOutStream<W>) {
        stream.write_u8(MSG_SET_ENCODINGS);
        stream.write_u8(0); // padding
        stream.write_u16(self.encodings.len() as u16);

        for encoding in &self.encodings {
            stream.write_i32(*encoding);
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct FramebufferUpdateRequest {
    pub incremental: bool,
    pub x: u16,
    pub y: u16,
    pub width: u16,
    pub height: u16,
}

impl FramebufferUpdateRequest {
    pub async fn read_from<R: AsyncRead + Unpin>(
        stream: &mut RfbInStream<R>,
    ) -> std::io::Result<Self> {
        let incremental_flag = stream.read_u8().await?;
        if incremental_flag > 1 {
            return Err(std::io::Error::new(
                std::io::ErrorKind::InvalidData,
                format!("incremental flag must be 0 or 1, got {}", incremental_flag),
            ));
        }

        Ok(Self {
            incremental: incremental_flag == 1,
            x: stream.read_u16().await?,
            y: stream.read_u16().await?,
            width: stream.read_u16().await?,
            height: stream.read_u16().await?,
        })
    }

    pub fn write_to<W: AsyncWrite + Unpin>(&self, stream: &mut RfbOutStream<W>) {
        stream.write_u8(MSG_FRAMEBUFFER_UPDATE_REQUEST);
        stream.write_u8(u8::from(self.incremental));
        stream.write_u16(self.x);
        stream.write_u16(self.y);
        stream.write_u16(self.width);
        stream.write_u16(self.height);
    }
}
