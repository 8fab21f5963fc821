//! Configuration types for the decoder session.
//!
//! Every field has a default, so an empty TOML document is a valid
//! configuration:
//!
//! ```toml
//! [session]
//! colour_model = "C256"
//!
//! [encodings]
//! preferred = 5
//! compress_level = 6
//!
//! [decoder]
//! zrle_stream = "per_rectangle"
//!
//! [logging]
//! level = "debug"
//! ```

use crate::errors::RfbClientError;
use rfb_encodings::{
    ZrleStreamMode, ENCODING_CORRE, ENCODING_HEXTILE, ENCODING_RAW, ENCODING_RRE, ENCODING_ZLIB,
    ENCODING_ZRLE,
};
use rfb_pixelbuffer::ColourModel;
use serde::{Deserialize, Serialize};
use std::path::Path;

/// Encodings the decoder registry can handle as a preferred encoding.
pub const DECODABLE_ENCODINGS: [i32; 6] = [
    ENCODING_ZRLE,
    ENCODING_HEXTILE,
    ENCODING_ZLIB,
    ENCODING_CORRE,
    ENCODING_RRE,
    ENCODING_RAW,
];

/// Complete client configuration.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    /// Session settings.
    pub session: SessionConfig,
    /// SetEncodings preferences.
    pub encodings: EncodingConfig,
    /// Decoder tuning.
    pub decoder: DecoderConfig,
    /// Logging settings.
    pub logging: LoggingConfig,
}

/// Session configuration.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct SessionConfig {
    /// Colour model requested at session start.
    pub colour_model: ColourModel,
}

/// Encoding preferences sent with SetEncodings.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct EncodingConfig {
    /// Encoding placed first in the list.
    #[serde(default = "default_preferred")]
    pub preferred: i32,
    /// Advertise CopyRect.
    #[serde(default = "default_true")]
    pub use_copy_rect: bool,
    /// Compression level (0-9), if any.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub compress_level: Option<u8>,
    /// JPEG quality level (0-9), if any.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub jpeg_quality: Option<u8>,
    /// Ask the server for cursor shape updates.
    #[serde(default)]
    pub request_cursor_updates: bool,
    /// Do not ask for pointer position updates.
    #[serde(default)]
    pub ignore_cursor_updates: bool,
}

fn default_preferred() -> i32 {
    ENCODING_ZRLE
}

fn default_true() -> bool {
    true
}

impl Default for EncodingConfig {
    fn default() -> Self {
        Self {
            preferred: default_preferred(),
            use_copy_rect: default_true(),
            compress_level: None,
            jpeg_quality: None,
            request_cursor_updates: false,
            ignore_cursor_updates: false,
        }
    }
}

/// Decoder configuration.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DecoderConfig {
    /// ZRLE zlib stream continuity.
    #[serde(default)]
    pub zrle_stream: ZrleStreamMode,
    /// Initial capacity of the inbound read buffer, in bytes.
    #[serde(default = "default_read_buffer_size")]
    pub read_buffer_size: usize,
}

fn default_read_buffer_size() -> usize {
    64 * 1024
}

impl Default for DecoderConfig {
    fn default() -> Self {
        Self {
            zrle_stream: ZrleStreamMode::default(),
            read_buffer_size: default_read_buffer_size(),
        }
    }
}

/// Logging configuration.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LoggingConfig {
    /// Default filter directive; `RUST_LOG` overrides it.
    #[serde(default = "default_level")]
    pub level: String,
    /// Log every protocol message on the `protocol_trace` target.
    #[serde(default)]
    pub protocol_trace: bool,
}

fn default_level() -> String {
    "info".to_string()
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: default_level(),
            protocol_trace: false,
        }
    }
}

impl Config {
    /// Creates a new configuration builder.
    #[must_use]
    pub fn builder() -> ConfigBuilder {
        ConfigBuilder::default()
    }

    /// Parses and validates a TOML document.
    ///
    /// # Errors
    ///
    /// Returns [`RfbClientError::Config`] for malformed TOML or invalid values.
    pub fn from_toml_str(text: &str) -> Result<Self, RfbClientError> {
        let config: Config =
            toml::from_str(text).map_err(|e| RfbClientError::Config(e.to_string()))?;
        config.validate()?;
        Ok(config)
    }

    /// Reads, parses and validates a TOML file.
    ///
    /// # Errors
    ///
    /// Returns an error if the file cannot be read or its contents are invalid.
    pub fn from_file(path: impl AsRef<Path>) -> Result<Self, RfbClientError> {
        let path = path.as_ref();
        let text = std::fs::read_to_string(path).map_err(|e| {
            RfbClientError::Config(format!("cannot read {}: {}", path.display(), e))
        })?;
        Self::from_toml_str(&text)
    }

    /// Validates the configuration.
    ///
    /// # Errors
    ///
    /// Returns an error if any configuration values are invalid.
    pub fn validate(&self) -> Result<(), RfbClientError> {
        if !DECODABLE_ENCODINGS.contains(&self.encodings.preferred) {
            return Err(RfbClientError::Config(format!(
                "Preferred encoding {} cannot be decoded",
                self.encodings.preferred
            )));
        }

        if self.encodings.compress_level.is_some_and(|level| level > 9) {
            return Err(RfbClientError::Config(
                "Compression level must be between 0 and 9".to_string(),
            ));
        }

        if self.encodings.jpeg_quality.is_some_and(|level| level > 9) {
            return Err(RfbClientError::Config(
                "JPEG quality must be between 0 and 9".to_string(),
            ));
        }

        if self.decoder.read_buffer_size == 0 {
            return Err(RfbClientError::Config(
                "Read buffer size cannot be 0".to_string(),
            ));
        }

        Ok(())
    }
}

/// Builder for creating a `Config`.
#[derive(Default)]
pub struct ConfigBuilder {
    config: Config,
}

impl ConfigBuilder {
    /// Sets the colour model requested at session start.
    #[must_use]
    pub fn colour_model(mut self, model: ColourModel) -> Self {
        self.config.session.colour_model = model;
        self
    }

    /// Sets the encoding placed first in SetEncodings.
    #[must_use]
    pub fn preferred_encoding(mut self, encoding: i32) -> Self {
        self.config.encodings.preferred = encoding;
        self
    }

    #[must_use]
    pub fn use_copy_rect(mut self, enabled: bool) -> Self {
        self.config.encodings.use_copy_rect = enabled;
        self
    }

    #[must_use]
    pub fn compress_level(mut self, level: u8) -> Self {
        self.config.encodings.compress_level = Some(level);
        self
    }

    #[must_use]
    pub fn jpeg_quality(mut self, quality: u8) -> Self {
        self.config.encodings.jpeg_quality = Some(quality);
        self
    }

    #[must_use]
    pub fn zrle_stream(mut self, mode: ZrleStreamMode) -> Self {
        self.config.decoder.zrle_stream = mode;
        self
    }

    #[must_use]
    pub fn protocol_trace(mut self, enabled: bool) -> Self {
        self.config.logging.protocol_trace = enabled;
        self
    }

    /// Builds the configuration.
    ///
    /// # Errors
    ///
    /// Returns an error if the configuration is invalid.
    pub fn build(self) -> Result<Config, RfbClientError> {
        self.config.validate()?;
        Ok(self.config)
    }
}
