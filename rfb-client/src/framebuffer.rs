//! Framebuffer state management and decoder registry.
//!
//! [`FramebufferState`] ties the shared framebuffer to the client pixel
//! format, the decoder registry and the scratch buffers, and applies one
//! rectangle at a time. Pseudo-encodings are handled by the update loop
//! before a rectangle reaches this module.

use crate::config::DecoderConfig;
use crate::errors::RfbClientError;
use rfb_encodings as enc;
use rfb_encodings::{Decoder, RfbInStream, ScratchBuffers};
use rfb_pixelbuffer::{FramebufferSink, PixelFormat, SharedFramebuffer};
use rfb_protocol::messages::types::Rectangle;
use std::collections::HashMap;
use tokio::io::AsyncRead;

/// Registry of decoders keyed by encoding type.
#[derive(Debug, Default)]
pub struct DecoderRegistry {
    decoders: HashMap<i32, DecoderEntry>,
}

impl DecoderRegistry {
    /// Create a registry with every supported encoding registered.
    pub fn with_standard(config: &DecoderConfig) -> Self {
        let mut reg = Self::default();
        reg.register(DecoderEntry::Raw(enc::RawDecoder));
        reg.register(DecoderEntry::CopyRect(enc::CopyRectDecoder));
        reg.register(DecoderEntry::RRE(enc::RREDecoder));
        reg.register(DecoderEntry::CoRRE(enc::CoRREDecoder));
        reg.register(DecoderEntry::Hextile(enc::HextileDecoder));
        reg.register(DecoderEntry::Zlib(enc::ZlibDecoder::new()));
        reg.register(DecoderEntry::ZRLE(enc::ZRLEDecoder::new(config.zrle_stream)));
        reg
    }

    /// Register a decoder entry, replacing any decoder for the same encoding.
    pub fn register(&mut self, decoder: DecoderEntry) {
        self.decoders.insert(decoder.encoding_type(), decoder);
    }

    /// Get a decoder by encoding type.
    pub fn get(&self, encoding: i32) -> Option<&DecoderEntry> {
        self.decoders.get(&encoding)
    }

    pub fn supports(&self, encoding: i32) -> bool {
        self.decoders.contains_key(&encoding)
    }
}

/// A concrete decoder entry wrapper for dispatch over the non-object-safe [`Decoder`].
#[derive(Debug)]
pub enum DecoderEntry {
    Raw(enc::RawDecoder),
    CopyRect(enc::CopyRectDecoder),
    RRE(enc::RREDecoder),
    CoRRE(enc::CoRREDecoder),
    Hextile(enc::HextileDecoder),
    Zlib(enc::ZlibDecoder),
    ZRLE(enc::ZRLEDecoder),
}

impl DecoderEntry {
    pub fn encoding_type(&self) -> i32 {
        match self {
            Self::Raw(d) => d.encoding_type(),
            Self::CopyRect(d) => d.encoding_type(),
            Self::RRE(d) => d.encoding_type(),
            Self::CoRRE(d) => d.encoding_type(),
            Self::Hextile(d) => d.encoding_type(),
            Self::Zlib(d) => d.encoding_type(),
            Self::ZRLE(d) => d.encoding_type(),
        }
    }

    pub async fn decode<R: AsyncRead + Unpin>(
        &self,
        stream: &mut RfbInStream<R>,
        rect: &Rectangle,
        pixel_format: &PixelFormat,
        scratch: &mut ScratchBuffers,
        sink: &mut dyn FramebufferSink,
    ) -> anyhow::Result<()> {
        match self {
            Self::Raw(d) => d.decode(stream, rect, pixel_format, scratch, sink).await,
            Self::CopyRect(d) => d.decode(stream, rect, pixel_format, scratch, sink).await,
            Self::RRE(d) => d.decode(stream, rect, pixel_format, scratch, sink).await,
            Self::CoRRE(d) => d.decode(stream, rect, pixel_format, scratch, sink).await,
            Self::Hextile(d) => d.decode(stream, rect, pixel_format, scratch, sink).await,
            Self::Zlib(d) => d.decode(stream, rect, pixel_format, scratch, sink).await,
            Self::ZRLE(d) => d.decode(stream, rect, pixel_format, scratch, sink).await,
        }
    }
}

/// Framebuffer state and decoder dispatcher.
pub struct FramebufferState {
    /// Decode target, shared with the application.
    framebuffer: SharedFramebuffer,
    /// Client pixel format the server encodes with.
    pixel_format: PixelFormat,
    registry: DecoderRegistry,
    scratch: ScratchBuffers,
}

impl FramebufferState {
    pub fn new(
        framebuffer: SharedFramebuffer,
        pixel_format: PixelFormat,
        config: &DecoderConfig,
    ) -> Self {
        Self {
            framebuffer,
            pixel_format,
            registry: DecoderRegistry::with_standard(config),
            scratch: ScratchBuffers::new(),
        }
    }

    /// Returns the current dimensions.
    pub fn size(&self) -> (u16, u16) {
        let (w, h) = self.framebuffer.dimensions();
        (w as u16, h as u16)
    }

    pub fn framebuffer(&self) -> &SharedFramebuffer {
        &self.framebuffer
    }

    pub fn pixel_format(&self) -> &PixelFormat {
        &self.pixel_format
    }

    /// Switches the format used for subsequent rectangles.
    pub fn set_pixel_format(&mut self, pixel_format: PixelFormat) {
        self.pixel_format = pixel_format;
    }

    /// Resizes and clears the framebuffer.
    pub fn resize(&mut self, width: u16, height: u16) {
        self.framebuffer.resize(u32::from(width), u32::from(height));
    }

    /// Decode a single non-pseudo rectangle from the server.
    pub async fn apply_rectangle<R: AsyncRead + Unpin>(
        &mut self,
        stream: &mut RfbInStream<R>,
        rect: &Rectangle,
    ) -> Result<(), RfbClientError> {
        let decoder = self
            .registry
            .get(rect.encoding)
            .ok_or(RfbClientError::UnsupportedEncoding(rect.encoding))?;

        let sink: &mut dyn FramebufferSink = &mut self.framebuffer;
        decoder
            .decode(stream, rect, &self.pixel_format, &mut self.scratch, sink)
            .await
            .map_err(RfbClientError::Encoding)
    }

    /// Rectangles committed since the last call.
    pub fn take_damage(&self) -> Vec<rfb_common::Rect> {
        self.framebuffer.lock().take_damage()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;
    use rfb_common::Rect;
    use rfb_pixelbuffer::{ColourModel, ManagedFramebuffer, PixelBuffer};
    use std::io::Cursor;

    fn state(model: ColourModel) -> FramebufferState {
        FramebufferState::new(
            SharedFramebuffer::new(ManagedFramebuffer::new(8, 8)),
            model.pixel_format(),
            &DecoderConfig::default(),
        )
    }

    #[test]
    fn test_registry_covers_all_encodings() {
        let reg = DecoderRegistry::with_standard(&DecoderConfig::default());
        for encoding in [0, 1, 2, 4, 5, 6, 16] {
            assert!(reg.supports(encoding), "encoding {}", encoding);
        }
        assert!(!reg.supports(7));
        assert!(!reg.supports(-224));
    }

    #[tokio::test]
    async fn test_apply_raw_rectangle_c256() {
        let mut fb = state(ColourModel::C256);
        let rect = Rectangle {
            x: 1,
            y: 1,
            width: 2,
            height: 1,
            encoding: 0,
        };
        let mut stream = RfbInStream::new(Cursor::new(vec![0x07, 0xC0]));
        fb.apply_rectangle(&mut stream, &rect).await.unwrap();

        let guard = fb.framebuffer().lock();
        assert_eq!(guard.pixel(1, 1), Some(0xFF0000));
        assert_eq!(guard.pixel(2, 1), Some(0x0000FF));
        drop(guard);
        assert_eq!(fb.take_damage(), vec![Rect::new(1, 1, 2, 1)]);
    }

    #[tokio::test]
    async fn test_unknown_encoding_is_unsupported() {
        let mut fb = state(ColourModel::C24bit);
        let rect = Rectangle {
            x: 0,
            y: 0,
            width: 1,
            height: 1,
            encoding: 7,
        };
        let mut stream = RfbInStream::new(Cursor::new(Vec::<u8>::new()));
        let err = fb.apply_rectangle(&mut stream, &rect).await.unwrap_err();
        assert!(matches!(err, RfbClientError::UnsupportedEncoding(7)));
    }

    #[tokio::test]
    async fn test_decode_failure_is_encoding_error() {
        let mut fb = state(ColourModel::C24bit);
        let rect = Rectangle {
            x: 0,
            y: 0,
            width: 2,
            height: 2,
            encoding: 0,
        };
        let mut stream = RfbInStream::new(Cursor::new(vec![0u8; 3]));
        let err = fb.apply_rectangle(&mut stream, &rect).await.unwrap_err();
        assert!(matches!(err, RfbClientError::Encoding(_)));
    }

    #[test]
    fn test_resize_updates_size() {
        let mut fb = state(ColourModel::C24bit);
        fb.resize(32, 16);
        assert_eq!(fb.size(), (32, 16));
    }
}
