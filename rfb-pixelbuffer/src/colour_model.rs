//! Colour-model presets offered to the server through SetPixelFormat.
//!
//! Every preset is requested as a little-endian true-colour format. The
//! one-byte presets are still rendered through a palette: the server packs
//! channel fields into a single byte and the client expands that byte with a
//! precomputed [`Palette`] rather than re-deriving channels per pixel.
//!
//! # Example
//!
//! ```
//! use rfb_pixelbuffer::ColourModel;
//!
//! let model = ColourModel::from_id("C64");
//! assert_eq!(model.bytes_per_pixel(), 1);
//! assert_eq!(model.description(), "64 colors (1 bpp)");
//!
//! // Unknown identifiers fall back to full colour.
//! assert_eq!(ColourModel::from_id("C16"), ColourModel::C24bit);
//! ```

use crate::palette::{self, Palette};
use crate::PixelFormat;
use serde::{Deserialize, Serialize};

/// One of the fixed colour-model presets.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
pub enum ColourModel {
    #[default]
    C24bit,
    C256,
    C64,
    C8,
    C4,
    C2,
}

/// Immutable parameters of a preset.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Preset {
    pub id: &'static str,
    pub description: &'static str,
    pub bits_per_pixel: u8,
    pub depth: u8,
    pub red_max: u16,
    pub green_max: u16,
    pub blue_max: u16,
    pub red_shift: u8,
    pub green_shift: u8,
    pub blue_shift: u8,
    pub greyscale: bool,
}

const PRESETS: [Preset; 6] = [
    Preset {
        id: "C24bit",
        description: "24-bit color (4 bpp)",
        bits_per_pixel: 32,
        depth: 24,
        red_max: 255,
        green_max: 255,
        blue_max: 255,
        red_shift: 16,
        green_shift: 8,
        blue_shift: 0,
        greyscale: false,
    },
    Preset {
        id: "C256",
        description: "256 colors (1 bpp)",
        bits_per_pixel: 8,
        depth: 8,
        red_max: 7,
        green_max: 7,
        blue_max: 3,
        red_shift: 0,
        green_shift: 3,
        blue_shift: 6,
        greyscale: false,
    },
    Preset {
        id: "C64",
        description: "64 colors (1 bpp)",
        bits_per_pixel: 8,
        depth: 6,
        red_max: 3,
        green_max: 3,
        blue_max: 3,
        red_shift: 4,
        green_shift: 2,
        blue_shift: 0,
        greyscale: false,
    },
    Preset {
        id: "C8",
        description: "8 colors (1 bpp)",
        bits_per_pixel: 8,
        depth: 3,
        red_max: 1,
        green_max: 1,
        blue_max: 1,
        red_shift: 2,
        green_shift: 1,
        blue_shift: 0,
        greyscale: false,
    },
    Preset {
        id: "C4",
        description: "Greyscale (1 bpp)",
        bits_per_pixel: 8,
        depth: 6,
        red_max: 3,
        green_max: 3,
        blue_max: 3,
        red_shift: 4,
        green_shift: 2,
        blue_shift: 0,
        greyscale: true,
    },
    Preset {
        id: "C2",
        description: "Black & White (1 bpp)",
        bits_per_pixel: 8,
        depth: 3,
        red_max: 1,
        green_max: 1,
        blue_max: 1,
        red_shift: 2,
        green_shift: 1,
        blue_shift: 0,
        greyscale: true,
    },
];

impl ColourModel {
    pub const ALL: [ColourModel; 6] = [
        ColourModel::C24bit,
        ColourModel::C256,
        ColourModel::C64,
        ColourModel::C8,
        ColourModel::C4,
        ColourModel::C2,
    ];

    /// Looks a preset up by its short identifier (`"C256"`, ...).
    ///
    /// Unknown identifiers resolve to [`ColourModel::C24bit`].
    pub fn from_id(id: &str) -> Self {
        Self::ALL
            .into_iter()
            .find(|model| model.id() == id)
            .unwrap_or_default()
    }

    /// Looks a preset up by its human-readable description.
    pub fn from_description(description: &str) -> Self {
        Self::ALL
            .into_iter()
            .find(|model| model.description() == description)
            .unwrap_or_default()
    }

    pub const fn preset(self) -> &'static Preset {
        &PRESETS[self as usize]
    }

    pub const fn id(self) -> &'static str {
        self.preset().id
    }

    pub const fn description(self) -> &'static str {
        self.preset().description
    }

    /// Bytes per pixel on the wire: 4 for full colour, 1 for every other preset.
    pub const fn bytes_per_pixel(self) -> usize {
        (self.preset().bits_per_pixel / 8) as usize
    }

    pub const fn is_greyscale(self) -> bool {
        self.preset().greyscale
    }

    /// Lookup table used to expand one-byte pixels, `None` for full colour.
    pub fn palette(self) -> Option<&'static Palette> {
        match self {
            ColourModel::C24bit => None,
            ColourModel::C256 => Some(&palette::BGR233),
            ColourModel::C64 | ColourModel::C4 => Some(&palette::RGB222),
            ColourModel::C8 | ColourModel::C2 => Some(&palette::RGB111),
        }
    }

    /// The client pixel format this preset decodes with.
    pub fn pixel_format(self) -> PixelFormat {
        let p = self.preset();
        PixelFormat {
            bits_per_pixel: p.bits_per_pixel,
            depth: p.depth,
            big_endian: false,
            true_color: true,
            red_max: p.red_max,
            green_max: p.green_max,
            blue_max: p.blue_max,
            red_shift: p.red_shift,
            green_shift: p.green_shift,
            blue_shift: p.blue_shift,
            greyscale: p.greyscale,
            palette: self.palette(),
        }
    }
}

impl std::fmt::Display for ColourModel {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.description())
    }
}
