//! Precomputed lookup tables for one-byte pixel formats.
//!
//! Entry `i` is the `0x00RRGGBB` colour obtained by splitting `i` into
//! channel fields and scaling each field to 0..=255 with rounding.

use once_cell::sync::Lazy;

/// BGR233 layout used by the 256-colour preset: `index = r | g << 3 | b << 6`.
pub static BGR233: Lazy<Palette> = Lazy::new(|| Palette::derive(256, [7, 7, 3], [0, 3, 6]));

/// RGB222 layout shared by the 64-colour and greyscale presets.
pub static RGB222: Lazy<Palette> = Lazy::new(|| Palette::derive(64, [3, 3, 3], [4, 2, 0]));

/// RGB111 layout shared by the 8-colour and black & white presets.
pub static RGB111: Lazy<Palette> = Lazy::new(|| Palette::derive(8, [1, 1, 1], [2, 1, 0]));

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Palette {
    entries: Vec<u32>,
}

impl Palette {
    /// Builds a table of `len` entries from per-channel maxima and shifts,
    /// both ordered red, green, blue.
    pub fn derive(len: usize, max: [u16; 3], shift: [u8; 3]) -> Self {
        let entries = (0..len as u32)
            .map(|index| {
                let [r, g, b] = [0, 1, 2].map(|c| {
                    let m = u32::from(max[c]);
                    let v = (index >> shift[c]) & m;
                    (v * 255 + m / 2) / m
                });
                (r << 16) | (g << 8) | b
            })
            .collect();
        Self { entries }
    }

    /// Colour for a wire index, `None` when the index is past the table.
    #[inline]
    pub fn get(&self, index: u8) -> Option<u32> {
        self.entries.get(usize::from(index)).copied()
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn entries(&self) -> &[u32] {
        &self.entries
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_table_sizes() {
        assert_eq!(BGR233.len(), 256);
        assert_eq!(RGB222.len(), 64);
        assert_eq!(RGB111.len(), 8);
    }

    #[test]
    fn test_bgr233_channel_layout() {
        assert_eq!(BGR233.get(0), Some(0x000000));
        // r = 7
        assert_eq!(BGR233.get(0b0000_0111), Some(0xFF0000));
        // g = 7
        assert_eq!(BGR233.get(0b0011_1000), Some(0x00FF00));
        // b = 3
        assert_eq!(BGR233.get(0b1100_0000), Some(0x0000FF));
        assert_eq!(BGR233.get(0xFF), Some(0xFFFFFF));
        // r = 1 rounds (255 + 3) / 7 = 36
        assert_eq!(BGR233.get(1), Some(36 << 16));
    }

    #[test]
    fn test_rgb222_scaling() {
        // r = 1, g = 2, b = 3
        let idx = (1 << 4) | (2 << 2) | 3;
        assert_eq!(RGB222.get(idx), Some((85 << 16) | (170 << 8) | 255));
    }

    #[test]
    fn test_rgb111_primaries() {
        assert_eq!(RGB111.get(0b100), Some(0xFF0000));
        assert_eq!(RGB111.get(0b010), Some(0x00FF00));
        assert_eq!(RGB111.get(0b001), Some(0x0000FF));
    }

    #[test]
    fn test_out_of_range_index() {
        assert_eq!(RGB111.get(8), None);
        assert_eq!(RGB222.get(200), None);
    }
}
