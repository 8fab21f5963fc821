//! Streaming zlib decompression shared by the Zlib and ZRLE decoders.
//!
//! Servers compress each encoding into one long-lived deflate stream and
//! sync-flush it at the end of every rectangle, so the dictionary carries over
//! from one rectangle to the next. An [`InflateStream`] therefore lives for
//! the whole connection unless it is explicitly [`reset`](InflateStream::reset).

use anyhow::{bail, Context, Result};
use flate2::{Decompress, FlushDecompress, Status};

const OUTPUT_CHUNK: usize = 64 * 1024;

/// Largest compressed payload accepted for one Zlib or ZRLE rectangle.
pub const MAX_COMPRESSED_LEN: u32 = 64 * 1024 * 1024;

#[derive(Debug)]
pub struct InflateStream {
    inner: Decompress,
}

impl Default for InflateStream {
    fn default() -> Self {
        Self::new()
    }
}

impl InflateStream {
    pub fn new() -> Self {
        Self {
            inner: Decompress::new(true), // zlib wrapper
        }
    }

    /// Discards all stream state. The next input must start with a zlib header.
    pub fn reset(&mut self) {
        self.inner.reset(true);
    }

    pub fn total_in(&self) -> u64 {
        self.inner.total_in()
    }

    pub fn total_out(&self) -> u64 {
        self.inner.total_out()
    }

    /// Feeds `input` and fills `out` completely.
    ///
    /// Fails when the stream cannot produce `out.len()` bytes from this input,
    /// or when the input holds more data than `out` can take. Input that only
    /// carries flush markers is consumed so the stream stays aligned.
    pub fn inflate_exact(&mut self, input: &[u8], out: &mut [u8]) -> Result<()> {
        let mut in_pos = 0;
        self.inflate_next(input, &mut in_pos, out)?;
        self.finish(input, in_pos, out.len())
    }

    /// Fills `out` from `input[*in_pos..]` and advances `in_pos`.
    ///
    /// Call repeatedly to inflate a payload in pieces, then [`finish`](Self::finish).
    pub fn inflate_next(&mut self, input: &[u8], in_pos: &mut usize, out: &mut [u8]) -> Result<()> {
        let mut out_pos = 0;

        while out_pos < out.len() {
            let (consumed, produced, status) = self.step(input, *in_pos, &mut out[out_pos..])?;
            *in_pos += consumed;
            out_pos += produced;

            if (consumed == 0 && produced == 0) || status == Status::StreamEnd {
                break;
            }
        }

        if out_pos < out.len() {
            bail!(
                "zlib stream ended short: produced {} of {} bytes",
                out_pos,
                out.len()
            );
        }
        Ok(())
    }

    /// Consumes what is left of `input`, which must not yield more output.
    ///
    /// `expected` is only used in the error message.
    pub fn finish(&mut self, input: &[u8], mut in_pos: usize, expected: usize) -> Result<()> {
        let mut spare = [0u8; 1];
        while in_pos < input.len() {
            let (consumed, produced, _) = self.step(input, in_pos, &mut spare)?;
            if produced > 0 {
                bail!("zlib stream holds more than the expected {} bytes", expected);
            }
            if consumed == 0 {
                break;
            }
            in_pos += consumed;
        }
        Ok(())
    }

    fn step(&mut self, input: &[u8], in_pos: usize, out: &mut [u8]) -> Result<(usize, usize, Status)> {
        let before_in = self.inner.total_in();
        let before_out = self.inner.total_out();

        let status = self
            .inner
            .decompress(&input[in_pos..], out, FlushDecompress::Sync)
            .with_context(|| {
                format!(
                    "zlib stream corrupt at input offset {} of {}",
                    in_pos,
                    input.len()
                )
            })?;

        let consumed = (self.inner.total_in() - before_in) as usize;
        let produced = (self.inner.total_out() - before_out) as usize;
        Ok((consumed, produced, status))
    }

    /// Feeds all of `input` and appends everything it yields to `out`.
    ///
    /// Fails as soon as `out` would grow past `limit` bytes.
    pub fn inflate_all(&mut self, input: &[u8], out: &mut Vec<u8>, limit: usize) -> Result<()> {
        let mut in_pos = 0;

        loop {
            let start = out.len();
            // one byte past the limit is enough to detect an overrun
            let room = OUTPUT_CHUNK.min(limit.saturating_sub(start).saturating_add(1));
            out.resize(start + room, 0);
            let result = self.step(input, in_pos, &mut out[start..]);
            let (consumed, produced, _) = match result {
                Ok(step) => step,
                Err(err) => {
                    out.truncate(start);
                    return Err(err);
                }
            };
            out.truncate(start + produced);
            in_pos += consumed;

            if out.len() > limit {
                bail!("zlib stream inflates past the {} byte limit", limit);
            }
            // Output space left over means the inflater has nothing pending.
            if in_pos >= input.len() && produced < room {
                break;
            }
            if consumed == 0 && produced == 0 {
                bail!(
                    "zlib stream stalled with {} input bytes left",
                    input.len() - in_pos
                );
            }
        }

        tracing::trace!(
            "inflated {} -> total {} bytes out",
            input.len(),
            self.inner.total_out()
        );
        Ok(())
    }
}
