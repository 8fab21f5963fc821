//! Client-side pixel format and wire-pixel conversion.
//!
//! Decoders never hand raw wire bytes to the sink. Every pixel is resolved
//! into a native `0x00RRGGBB` value first:
//!
//! - **1 byte per pixel**: the byte indexes the format's [`Palette`].
//! - **4 bytes per pixel**: little-endian `B, G, R, pad` for the standard
//!   full-colour preset, so the value is `(b2 << 16) | (b1 << 8) | b0`.
//! - **Compact pixels** (ZRLE "CPIXEL"): full-colour formats drop the
//!   padding byte and send three bytes; palette formats still send one.
//!
//! Palette indices past the end of the table are reported as errors rather
//! than silently wrapped.
//!
//! # Example
//!
//! ```
//! use rfb_pixelbuffer::ColourModel;
//!
//! let pf = ColourModel::C24bit.pixel_format();
//! assert_eq!(pf.pixel(&[0x33, 0x22, 0x11, 0x00]).unwrap(), 0x112233);
//! assert_eq!(pf.cpixel(&[0x33, 0x22, 0x11]).unwrap(), 0x112233);
//! ```

use crate::Palette;
use anyhow::{anyhow, bail, Result};
use rfb_protocol::messages::types::PixelFormat as WirePixelFormat;

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct PixelFormat {
    pub bits_per_pixel: u8,
    pub depth: u8,
    pub big_endian: bool,
    pub true_color: bool,
    pub red_max: u16,
    pub green_max: u16,
    pub blue_max: u16,
    pub red_shift: u8,
    pub green_shift: u8,
    pub blue_shift: u8,
    /// Carried in the first padding byte of SetPixelFormat for servers that
    /// understand it; the client still renders through the palette.
    pub greyscale: bool,
    /// Required for one-byte formats.
    pub palette: Option<&'static Palette>,
}

impl PixelFormat {
    pub fn bytes_per_pixel(&self) -> usize {
        usize::from(self.bits_per_pixel.div_ceil(8))
    }

    /// Size of a ZRLE compact pixel.
    pub fn cpixel_size(&self) -> usize {
        if self.bits_per_pixel == 32 && self.depth <= 24 && self.true_color {
            3
        } else {
            self.bytes_per_pixel()
        }
    }

    /// Resolves one wire pixel (exactly [`bytes_per_pixel`](Self::bytes_per_pixel) bytes).
    #[inline]
    pub fn pixel(&self, bytes: &[u8]) -> Result<u32> {
        match *bytes {
            [index] => self.lookup(index),
            [b0, b1, b2, b3] => {
                let value = if self.big_endian {
                    u32::from_be_bytes([b0, b1, b2, b3])
                } else {
                    u32::from_le_bytes([b0, b1, b2, b3])
                };
                Ok(self.rgb_from_value(value))
            }
            _ => bail!(
                "unsupported pixel size {} (format is {} bpp)",
                bytes.len(),
                self.bits_per_pixel
            ),
        }
    }

    /// Resolves one ZRLE compact pixel (exactly [`cpixel_size`](Self::cpixel_size) bytes).
    #[inline]
    pub fn cpixel(&self, bytes: &[u8]) -> Result<u32> {
        match *bytes {
            [b0, b1, b2] => {
                let value = if self.big_endian {
                    u32::from_be_bytes([0, b0, b1, b2])
                } else {
                    u32::from_le_bytes([b0, b1, b2, 0])
                };
                Ok(self.rgb_from_value(value))
            }
            _ => self.pixel(bytes),
        }
    }

    /// Converts a packed run of wire pixels into `dst`, one value per pixel.
    pub fn pixels_into(&self, src: &[u8], dst: &mut [u32]) -> Result<()> {
        let bpp = self.bytes_per_pixel();
        if src.len() != dst.len() * bpp {
            bail!(
                "pixel run length mismatch: {} bytes for {} pixels at {} bpp",
                src.len(),
                dst.len(),
                bpp
            );
        }
        if bpp == 1 {
            for (out, &index) in dst.iter_mut().zip(src) {
                *out = self.lookup(index)?;
            }
        } else {
            for (out, chunk) in dst.iter_mut().zip(src.chunks_exact(bpp)) {
                *out = self.pixel(chunk)?;
            }
        }
        Ok(())
    }

    /// Converts a packed run of compact pixels into `dst`.
    pub fn cpixels_into(&self, src: &[u8], dst: &mut [u32]) -> Result<()> {
        let size = self.cpixel_size();
        if src.len() != dst.len() * size {
            bail!(
                "compact pixel run length mismatch: {} bytes for {} pixels",
                src.len(),
                dst.len()
            );
        }
        for (out, chunk) in dst.iter_mut().zip(src.chunks_exact(size)) {
            *out = self.cpixel(chunk)?;
        }
        Ok(())
    }

    #[inline]
    fn lookup(&self, index: u8) -> Result<u32> {
        let palette = self
            .palette
            .ok_or_else(|| anyhow!("one-byte pixel received but format has no palette"))?;
        palette.get(index).ok_or_else(|| {
            anyhow!(
                "palette index {} out of range ({} entries)",
                index,
                palette.len()
            )
        })
    }

    #[inline]
    fn rgb_from_value(&self, value: u32) -> u32 {
        if self.red_max == 255 && self.green_max == 255 && self.blue_max == 255 {
            let r = (value >> self.red_shift) & 0xFF;
            let g = (value >> self.green_shift) & 0xFF;
            let b = (value >> self.blue_shift) & 0xFF;
            return (r << 16) | (g << 8) | b;
        }
        let scale = |shift: u8, max: u16| {
            let max = u32::from(max.max(1));
            let v = (value >> shift) & max;
            (v * 255 + max / 2) / max
        };
        let r = scale(self.red_shift, self.red_max);
        let g = scale(self.green_shift, self.green_max);
        let b = scale(self.blue_shift, self.blue_max);
        (r << 16) | (g << 8) | b
    }

    /// The 16-byte wire description sent in SetPixelFormat.
    pub fn to_wire(&self) -> WirePixelFormat {
        WirePixelFormat {
            bits_per_pixel: self.bits_per_pixel,
            depth: self.depth,
            big_endian: u8::from(self.big_endian),
            true_color: u8::from(self.true_color),
            red_max: self.red_max,
            green_max: self.green_max,
            blue_max: self.blue_max,
            red_shift: self.red_shift,
            green_shift: self.green_shift,
            blue_shift: self.blue_shift,
        }
    }
}
