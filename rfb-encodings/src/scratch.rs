//! Reusable working memory for the decoders.

/// Grow-on-demand buffers owned by the caller and lent to every decode call.
///
/// Each accessor returns a slice of exactly the requested length. Contents
/// left over from an earlier rectangle are not cleared; decoders overwrite
/// the whole slice before reading from it.
#[derive(Debug, Default)]
pub struct ScratchBuffers {
    /// Wire bytes (rows, subrectangle lists, compressed payloads).
    pub(crate) bytes: Vec<u8>,
    /// Converted `0x00RRGGBB` pixels on their way to the sink.
    pub(crate) pixels: Vec<u32>,
    /// Decompressed Zlib / ZRLE output.
    pub(crate) inflated: Vec<u8>,
}

impl ScratchBuffers {
    pub fn new() -> Self {
        Self::default()
    }

    /// Total memory currently held, in bytes.
    pub fn footprint(&self) -> usize {
        self.bytes.capacity() + self.pixels.capacity() * 4 + self.inflated.capacity()
    }

    /// Drops all held memory.
    pub fn shrink(&mut self) {
        *self = Self::default();
    }
}

/// Returns the first `len` elements of `buf`, growing it when needed.
pub(crate) fn sized<T: Copy + Default>(buf: &mut Vec<T>, len: usize) -> &mut [T] {
    if buf.len() < len {
        buf.resize(len, T::default());
    }
    &mut buf[..len]
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_sized_grows_and_reuses() {
        let mut scratch = ScratchBuffers::new();
        assert_eq!(sized(&mut scratch.bytes, 16).len(), 16);
        sized(&mut scratch.bytes, 16)[3] = 7;
        // a shorter request reuses the allocation and keeps old contents
        assert_eq!(sized(&mut scratch.bytes, 4)[3], 7);
        assert!(scratch.footprint() >= 16);

        scratch.shrink();
        assert_eq!(scratch.footprint(), 0);
    }
}
