//! Pixel-format and encoding negotiation state.
//!
//! A colour-model change requested mid-update only takes effect between
//! updates: [`PixelFormatNegotiator`] holds it as pending until the update
//! loop finishes the current FramebufferUpdate. [`EncodingPreferences`]
//! builds the SetEncodings list and remembers the last list sent so an
//! unchanged list is not re-sent.

use crate::config::EncodingConfig;
use crate::errors::RfbClientError;
use crate::protocol;
use rfb_pixelbuffer::{ColourModel, PixelFormat};
use rfb_protocol::io::RfbOutStream;
use rfb_protocol::messages::types::{
    ENCODING_COPYRECT, ENCODING_CORRE, ENCODING_HEXTILE, ENCODING_RRE, ENCODING_ZLIB,
    ENCODING_ZRLE, PSEUDO_ENCODING_COMPRESS_LEVEL_0, PSEUDO_ENCODING_DESKTOP_SIZE,
    PSEUDO_ENCODING_LAST_RECT, PSEUDO_ENCODING_POINTER_POS, PSEUDO_ENCODING_QUALITY_LEVEL_0,
    PSEUDO_ENCODING_RICH_CURSOR, PSEUDO_ENCODING_X_CURSOR,
};
use tokio::io::AsyncWrite;

/// Tracks the active colour model and at most one pending change.
#[derive(Debug, Clone)]
pub struct PixelFormatNegotiator {
    active: ColourModel,
    pending: Option<ColourModel>,
}

impl PixelFormatNegotiator {
    pub fn new(initial: ColourModel) -> Self {
        Self {
            active: initial,
            pending: None,
        }
    }

    /// The model the framebuffer is currently decoded with.
    pub fn active(&self) -> ColourModel {
        self.active
    }

    pub fn pending(&self) -> Option<ColourModel> {
        self.pending
    }

    /// Records a change for the next update boundary. A later request
    /// replaces an earlier one; asking for the active model cancels it.
    pub fn request(&mut self, model: ColourModel) {
        if model == self.active {
            self.pending = None;
        } else {
            self.pending = Some(model);
        }
    }

    pub fn take_pending(&mut self) -> Option<ColourModel> {
        self.pending.take()
    }

    /// Sends SetPixelFormat for `model` and makes it the active model.
    pub async fn apply<W: AsyncWrite + Unpin>(
        &mut self,
        out: &mut RfbOutStream<W>,
        model: ColourModel,
    ) -> Result<PixelFormat, RfbClientError> {
        let pixel_format = model.pixel_format();
        protocol::write_set_pixel_format(out, &pixel_format).await?;
        tracing::info!("Using colour model {} ({})", model.id(), model.description());
        self.active = model;
        Ok(pixel_format)
    }
}

/// Builds SetEncodings lists and suppresses duplicates.
#[derive(Debug, Clone)]
pub struct EncodingPreferences {
    config: EncodingConfig,
    last_sent: Option<Vec<i32>>,
}

impl EncodingPreferences {
    pub fn new(config: EncodingConfig) -> Self {
        Self {
            config,
            last_sent: None,
        }
    }

    pub fn config(&self) -> &EncodingConfig {
        &self.config
    }

    pub fn update(&mut self, config: EncodingConfig) {
        self.config = config;
    }

    /// The full preference list, most preferred first.
    pub fn encodings(&self) -> Vec<i32> {
        let config = &self.config;
        let mut list = Vec::with_capacity(16);

        list.push(config.preferred);
        if config.use_copy_rect {
            list.push(ENCODING_COPYRECT);
        }
        for encoding in [
            ENCODING_ZRLE,
            ENCODING_HEXTILE,
            ENCODING_ZLIB,
            ENCODING_CORRE,
            ENCODING_RRE,
        ] {
            if encoding != config.preferred {
                list.push(encoding);
            }
        }

        if let Some(level) = config.compress_level {
            list.push(PSEUDO_ENCODING_COMPRESS_LEVEL_0 + i32::from(level));
        }
        if let Some(quality) = config.jpeg_quality {
            list.push(PSEUDO_ENCODING_QUALITY_LEVEL_0 + i32::from(quality));
        }

        if config.request_cursor_updates {
            list.push(PSEUDO_ENCODING_X_CURSOR);
            list.push(PSEUDO_ENCODING_RICH_CURSOR);
        }
        if !config.ignore_cursor_updates {
            list.push(PSEUDO_ENCODING_POINTER_POS);
        }

        list.push(PSEUDO_ENCODING_LAST_RECT);
        list.push(PSEUDO_ENCODING_DESKTOP_SIZE);
        list
    }

    /// True if the current list differs from the last one sent.
    pub fn changed(&self) -> bool {
        self.last_sent.as_deref() != Some(self.encodings().as_slice())
    }

    /// Sends SetEncodings if the list changed. Returns whether it was sent.
    pub async fn send_if_changed<W: AsyncWrite + Unpin>(
        &mut self,
        out: &mut RfbOutStream<W>,
    ) -> Result<bool, RfbClientError> {
        let list = self.encodings();
        if self.last_sent.as_ref() == Some(&list) {
            return Ok(false);
        }
        protocol::write_set_encodings(out, &list).await?;
        self.last_sent = Some(list);
        Ok(true)
    }
}
