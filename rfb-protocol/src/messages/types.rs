//! Core RFB protocol types.
//!
//! - [`PixelFormat`] - 16-byte wire description of a pixel layout
//! - [`Rectangle`] - rectangle header with encoding type
//! - Encoding, pseudo-encoding and message type constants

use crate::io::{RfbInStream, RfbOutStream};
use rfb_common::Rect;
use tokio::io::{AsyncRead, AsyncWrite};

/// Wire pixel format, as carried by SetPixelFormat.
///
/// Boolean fields are kept as the raw `u8` and validated to be exactly 0 or
/// 1 on both read and write.
///
/// The first of the three trailing padding bytes doubles as a greyscale flag
/// for servers that support it (UltraVNC); use
/// [`write_with_greyscale`](Self::write_with_greyscale) /
/// [`read_with_greyscale`](Self::read_with_greyscale) where that applies.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PixelFormat {
    pub bits_per_pixel: u8,
    pub depth: u8,
    pub big_endian: u8,
    pub true_color: u8,
    pub red_max: u16,
    pub green_max: u16,
    pub blue_max: u16,
    pub red_shift: u8,
    pub green_shift: u8,
    pub blue_shift: u8,
}

impl PixelFormat {
    pub fn bytes_per_pixel(&self) -> u8 {
        self.bits_per_pixel.div_ceil(8)
    }

    /// Reads a pixel format whose padding must be all zero.
    pub async fn read_from<R: AsyncRead + Unpin>(
        stream: &mut RfbInStream<R>,
    ) -> std::io::Result<Self> {
        let (pf, padding) = Self::read_fields(stream).await?;
        if padding != [0, 0, 0] {
            return Err(invalid_data(format!(
                "padding must be zero, got {:?}",
                padding
            )));
        }
        Ok(pf)
    }

    /// Reads a pixel format whose first padding byte carries the greyscale flag.
    pub async fn read_with_greyscale<R: AsyncRead + Unpin>(
        stream: &mut RfbInStream<R>,
    ) -> std::io::Result<(Self, bool)> {
        let (pf, padding) = Self::read_fields(stream).await?;
        if padding[0] > 1 || padding[1..] != [0, 0] {
            return Err(invalid_data(format!(
                "invalid greyscale padding {:?}",
                padding
            )));
        }
        Ok((pf, padding[0] == 1))
    }

    async fn read_fields<R: AsyncRead + Unpin>(
        stream: &mut RfbInStream<R>,
    ) -> std::io::Result<(Self, [u8; 3])> {
        let bits_per_pixel = stream.read_u8().await?;
        let depth = stream.read_u8().await?;
        let big_endian = stream.read_u8().await?;
        let true_color = stream.read_u8().await?;

        if big_endian > 1 {
            return Err(invalid_data(format!(
                "big_endian must be 0 or 1, got {}",
                big_endian
            )));
        }
        if true_color > 1 {
            return Err(invalid_data(format!(
                "true_color must be 0 or 1, got {}",
                true_color
            )));
        }

        let pf = Self {
            bits_per_pixel,
            depth,
            big_endian,
            true_color,
            red_max: stream.read_u16().await?,
            green_max: stream.read_u16().await?,
            blue_max: stream.read_u16().await?,
            red_shift: stream.read_u8().await?,
            green_shift: stream.read_u8().await?,
            blue_shift: stream.read_u8().await?,
        };

        let mut padding = [0u8; 3];
        stream.read_bytes(&mut padding).await?;
        Ok((pf, padding))
    }

    pub fn write_to<W: AsyncWrite + Unpin>(
        &self,
        stream: &mut RfbOutStream<W>,
    ) -> std::io::Result<()> {
        self.write_with_greyscale(stream, false)
    }

    pub fn write_with_greyscale<W: AsyncWrite + Unpin>(
        &self,
        stream: &mut RfbOutStream<W>,
        greyscale: bool,
    ) -> std::io::Result<()> {
        if self.big_endian > 1 {
            return Err(std::io::Error::new(
                std::io::ErrorKind::InvalidInput,
                format!("big_endian must be 0 or 1, got {}", self.big_endian),
            ));
        }
        if self.true_color > 1 {
            return Err(std::io::Error::new(
                std::io::ErrorKind::InvalidInput,
                format!("true_color must be 0 or 1, got {}", self.true_color),
            ));
        }

        stream.write_u8(self.bits_per_pixel);
        stream.write_u8(self.depth);
        stream.write_u8(self.big_endian);
        stream.write_u8(self.true_color);
        stream.write_u16(self.red_max);
        stream.write_u16(self.green_max);
        stream.write_u16(self.blue_max);
        stream.write_u8(self.red_shift);
        stream.write_u8(self.green_shift);
        stream.write_u8(self.blue_shift);
        stream.write_u8(u8::from(greyscale));
        stream.write_u8(0);
        stream.write_u8(0);

        Ok(())
    }
}

fn invalid_data(message: String) -> std::io::Error {
    std::io::Error::new(std::io::ErrorKind::InvalidData, message)
}

/// Rectangle header within a FramebufferUpdate.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Rectangle {
    pub x: u16,
    pub y: u16,
    pub width: u16,
    pub height: u16,
    pub encoding: i32,
}

impl Rectangle {
    pub async fn read_from<R: AsyncRead + Unpin>(
        stream: &mut RfbInStream<R>,
    ) -> std::io::Result<Self> {
        Ok(Self {
            x: stream.read_u16().await?,
            y: stream.read_u16().await?,
            width: stream.read_u16().await?,
            height: stream.read_u16().await?,
            encoding: stream.read_i32().await?,
        })
    }

    pub fn write_to<W: AsyncWrite + Unpin>(&self, stream: &mut RfbOutStream<W>) {
        stream.write_u16(self.x);
        stream.write_u16(self.y);
        stream.write_u16(self.width);
        stream.write_u16(self.height);
        stream.write_i32(self.encoding);
    }

    /// Framebuffer-space geometry of this rectangle.
    pub fn rect(&self) -> Rect {
        Rect::new(
            i32::from(self.x),
            i32::from(self.y),
            u32::from(self.width),
            u32::from(self.height),
        )
    }

    pub fn area(&self) -> usize {
        usize::from(self.width) * usize::from(self.height)
    }
}

//
// Encodings
//

pub const ENCODING_RAW: i32 = 0;
pub const ENCODING_COPYRECT: i32 = 1;
pub const ENCODING_RRE: i32 = 2;
pub const ENCODING_CORRE: i32 = 4;
pub const ENCODING_HEXTILE: i32 = 5;
pub const ENCODING_ZLIB: i32 = 6;
pub const ENCODING_ZRLE: i32 = 16;

//
// Pseudo-encodings
//

/// Marks the end of an update whose rectangle count is not known up front.
pub const PSEUDO_ENCODING_LAST_RECT: i32 = -224;
/// Carries new framebuffer dimensions in the rectangle's width and height.
pub const PSEUDO_ENCODING_DESKTOP_SIZE: i32 = -223;
pub const PSEUDO_ENCODING_POINTER_POS: i32 = -232;
pub const PSEUDO_ENCODING_RICH_CURSOR: i32 = -239;
pub const PSEUDO_ENCODING_X_CURSOR: i32 = -240;
/// Compression level `n` (0-9) is requested as `COMPRESS_LEVEL_0 + n`.
pub const PSEUDO_ENCODING_COMPRESS_LEVEL_0: i32 = -256;
/// JPEG quality `n` (0-9) is requested as `QUALITY_LEVEL_0 + n`.
pub const PSEUDO_ENCODING_QUALITY_LEVEL_0: i32 = -32;

//
// Server-to-client message types
//

pub const MSG_FRAMEBUFFER_UPDATE: u8 = 0;
pub const MSG_SET_COLOUR_MAP_ENTRIES: u8 = 1;
pub const MSG_BELL: u8 = 2;
pub const MSG_SERVER_CUT_TEXT: u8 = 3;
/// UltraVNC text chat.
pub const MSG_TEXT_CHAT: u8 = 11;

//
// Client-to-server message types
//

pub const MSG_SET_PIXEL_FORMAT: u8 = 0;
pub const MSG_SET_ENCODINGS: u8 = 2;
pub const MSG_FRAMEBUFFER_UPDATE_REQUEST: u8 = 3;

/// Human-readable name for an encoding or pseudo-encoding number.
pub fn encoding_name(encoding: i32) -> &'static str {
    match encoding {
        ENCODING_RAW => "Raw",
        ENCODING_COPYRECT => "CopyRect",
        ENCODING_RRE => "RRE",
        ENCODING_CORRE => "CoRRE",
        ENCODING_HEXTILE => "Hextile",
        ENCODING_ZLIB => "Zlib",
        ENCODING_ZRLE => "ZRLE",
        PSEUDO_ENCODING_LAST_RECT => "LastRect",
        PSEUDO_ENCODING_DESKTOP_SIZE => "DesktopSize",
        PSEUDO_ENCODING_POINTER_POS => "PointerPos",
        PSEUDO_ENCODING_RICH_CURSOR => "RichCursor",
        PSEUDO_ENCODING_X_CURSOR => "XCursor",
        e if (PSEUDO_ENCODING_COMPRESS_LEVEL_0..=PSEUDO_ENCODING_COMPRESS_LEVEL_0 + 9)
            .contains(&e) =>
        {
            "CompressLevel"
        }
        e if (PSEUDO_ENCODING_QUALITY_LEVEL_0..=PSEUDO_ENCODING_QUALITY_LEVEL_0 + 9)
            .contains(&e) =>
        {
            "QualityLevel"
        }
        _ => "Unknown",
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Cursor;

    fn rgb888() -> PixelFormat {
        PixelFormat {
            bits_per_pixel: 32,
            depth: 24,
            big_endian: 0,
            true_color: 1,
            red_max: 255,
            green_max: 255,
            blue_max: 255,
            red_shift: 16,
            green_shift: 8,
            blue_shift: 0,
        }
    }

    #[tokio::test]
    async fn test_pixelformat_wire_layout() {
        let mut buffer = Vec::new();
        let mut out = RfbOutStream::new(&mut buffer);
        rgb888().write_to(&mut out).unwrap();
        out.flush().await.unwrap();

        assert_eq!(
            buffer,
            vec![32, 24, 0, 1, 0, 255, 0, 255, 0, 255, 16, 8, 0, 0, 0, 0]
        );
    }

    #[tokio::test]
    async fn test_greyscale_flag_in_first_padding_byte() {
        let mut buffer = Vec::new();
        let mut out = RfbOutStream::new(&mut buffer);
        rgb888().write_with_greyscale(&mut out, true).unwrap();
        out.flush().await.unwrap();
        assert_eq!(&buffer[13..], &[1, 0, 0]);

        let mut strict = RfbInStream::new(Cursor::new(buffer.clone()));
        assert!(PixelFormat::read_from(&mut strict).await.is_err());

        let mut lenient = RfbInStream::new(Cursor::new(buffer));
        let (pf, grey) = PixelFormat::read_with_greyscale(&mut lenient)
            .await
            .unwrap();
        assert_eq!(pf, rgb888());
        assert!(grey);
    }

    #[tokio::test]
    async fn test_pixelformat_invalid_boolean() {
        let data = vec![32, 24, 2, 1, 0, 255, 0, 255, 0, 255, 16, 8, 0, 0, 0, 0];
        let mut stream = RfbInStream::new(Cursor::new(data));
        assert!(PixelFormat::read_from(&mut stream).await.is_err());
    }

    #[tokio::test]
    async fn test_rectangle_header() {
        let data = vec![0, 10, 0, 20, 0, 64, 0, 48, 0xFF, 0xFF, 0xFF, 0x20];
        let mut stream = RfbInStream::new(Cursor::new(data));
        let rect = Rectangle::read_from(&mut stream).await.unwrap();

        assert_eq!(rect.encoding, PSEUDO_ENCODING_LAST_RECT);
        assert_eq!(rect.rect(), Rect::new(10, 20, 64, 48));
        assert_eq!(rect.area(), 64 * 48);
    }

    #[test]
    fn test_encoding_names() {
        assert_eq!(encoding_name(ENCODING_ZRLE), "ZRLE");
        assert_eq!(encoding_name(ENCODING_CORRE), "CoRRE");
        assert_eq!(encoding_name(PSEUDO_ENCODING_COMPRESS_LEVEL_0 + 6), "CompressLevel");
        assert_eq!(encoding_name(PSEUDO_ENCODING_QUALITY_LEVEL_0 + 9), "QualityLevel");
        assert_eq!(encoding_name(7), "Unknown");
    }
}
