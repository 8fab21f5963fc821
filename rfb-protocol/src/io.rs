//! Buffered I/O streams for RFB protocol communication.
//!
//! [`RfbInStream`] and [`RfbOutStream`] wrap any `AsyncRead` / `AsyncWrite`
//! transport. All multi-byte integers are big-endian (network byte order),
//! as RFB requires.
//!
//! The input stream counts every byte it hands out through
//! [`RfbInStream::consumed`]. Decoders log that count at the start and end of
//! each rectangle, and tests use it to check that a decoder consumed exactly
//! the bytes its encoding defines.
//!
//! # Example
//!
//! ```no_run
//! use rfb_protocol::io::{RfbInStream, RfbOutStream};
//! use tokio::net::TcpStream;
//!
//! # async fn example() -> std::io::Result<()> {
//! let stream = TcpStream::connect("localhost:5900").await?;
//! let (reader, writer) = stream.into_split();
//!
//! let mut input = RfbInStream::new(reader);
//! let mut output = RfbOutStream::new(writer);
//!
//! let message_type = input.read_u8().await?;
//! output.write_u8(3);
//! output.flush().await?;
//! # let _ = message_type;
//! # Ok(())
//! # }
//! ```

use bytes::{Buf, BufMut, Bytes, BytesMut};
use tokio::io::{AsyncRead, AsyncReadExt, AsyncWrite, AsyncWriteExt};

/// Largest chunk buffered at once by [`RfbInStream::skip`].
const SKIP_CHUNK: usize = 64 * 1024;

/// Buffered input stream for reading RFB protocol data.
///
/// Reads are exact: every method either returns the requested amount or an
/// `UnexpectedEof` error once the transport is exhausted.
pub struct RfbInStream<R> {
    reader: R,
    buffer: BytesMut,
    consumed: u64,
}

impl<R: AsyncRead + Unpin> RfbInStream<R> {
    /// Creates a new input stream with the default 8KB buffer.
    pub fn new(reader: R) -> Self {
        Self::with_capacity(reader, 8192)
    }

    pub fn with_capacity(reader: R, capacity: usize) -> Self {
        Self {
            reader,
            buffer: BytesMut::with_capacity(capacity),
            consumed: 0,
        }
    }

    /// Ensures at least `n` bytes are buffered.
    async fn ensure_bytes(&mut self, n: usize) -> std::io::Result<()> {
        if self.buffer.capacity() < n {
            self.buffer.reserve(n - self.buffer.len());
        }
        while self.buffer.len() < n {
            let bytes_read = self.reader.read_buf(&mut self.buffer).await?;
            if bytes_read == 0 {
                return Err(std::io::Error::new(
                    std::io::ErrorKind::UnexpectedEof,
                    format!("expected {} bytes, got {}", n, self.buffer.len()),
                ));
            }
        }
        Ok(())
    }

    /// Cancel safe: bytes read before the future is dropped stay buffered.
    pub async fn read_u8(&mut self) -> std::io::Result<u8> {
        self.ensure_bytes(1).await?;
        self.consumed += 1;
        Ok(self.buffer.get_u8())
    }

    pub async fn read_u16(&mut self) -> std::io::Result<u16> {
        self.ensure_bytes(2).await?;
        self.consumed += 2;
        Ok(self.buffer.get_u16())
    }

    pub async fn read_u32(&mut self) -> std::io::Result<u32> {
        self.ensure_bytes(4).await?;
        self.consumed += 4;
        Ok(self.buffer.get_u32())
    }

    pub async fn read_i32(&mut self) -> std::io::Result<i32> {
        self.ensure_bytes(4).await?;
        self.consumed += 4;
        Ok(self.buffer.get_i32())
    }

    /// Fills `buf` completely.
    pub async fn read_bytes(&mut self, buf: &mut [u8]) -> std::io::Result<()> {
        self.ensure_bytes(buf.len()).await?;
        self.buffer.copy_to_slice(buf);
        self.consumed += buf.len() as u64;
        Ok(())
    }

    /// Reads exactly `n` bytes into an owned, cheaply cloneable buffer.
    pub async fn read_owned(&mut self, n: usize) -> std::io::Result<Bytes> {
        self.ensure_bytes(n).await?;
        self.consumed += n as u64;
        Ok(self.buffer.split_to(n).freeze())
    }

    /// Discards exactly `n` bytes without buffering more than
    /// 64KB at a time.
    pub async fn skip(&mut self, n: usize) -> std::io::Result<()> {
        let mut remaining = n;
        while remaining > 0 {
            let chunk = remaining.min(SKIP_CHUNK);
            let want = chunk.min(self.buffer.len()).max(1);
            self.ensure_bytes(want).await?;
            let step = chunk.min(self.buffer.len());
            self.buffer.advance(step);
            remaining -= step;
        }
        self.consumed += n as u64;
        Ok(())
    }

    /// Number of bytes already buffered (readable without blocking).
    pub fn available(&self) -> usize {
        self.buffer.len()
    }

    /// Total number of bytes handed out since the stream was created.
    pub fn consumed(&self) -> u64 {
        self.consumed
    }

    pub fn get_ref(&self) -> &R {
        &self.reader
    }

    pub fn get_mut(&mut self) -> &mut R {
        &mut self.reader
    }

    pub fn into_inner(self) -> R {
        self.reader
    }
}

/// Buffered output stream for writing RFB protocol data.
///
/// Writes accumulate in memory until [`flush`](Self::flush), so a complete
/// client message goes out in a single transport write.
pub struct RfbOutStream<W> {
    writer: W,
    buffer: BytesMut,
}

impl<W: AsyncWrite + Unpin> RfbOutStream<W> {
    pub fn new(writer: W) -> Self {
        Self::with_capacity(writer, 8192)
    }

    pub fn with_capacity(writer: W, capacity: usize) -> Self {
        Self {
            writer,
            buffer: BytesMut::with_capacity(capacity),
        }
    }

    pub fn write_u8(&mut self, value: u8) {
        self.buffer.put_u8(value);
    }

    pub fn write_u16(&mut self, value: u16) {
        self.buffer.put_u16(value);
    }

    pub fn write_u32(&mut self, value: u32) {
        self.buffer.put_u32(value);
    }

    pub fn write_i32(&mut self, value: i32) {
        self.buffer.put_i32(value);
    }

    pub fn write_bytes(&mut self, data: &[u8]) {
        self.buffer.extend_from_slice(data);
    }

    /// Writes all buffered data to the transport and flushes it.
    pub async fn flush(&mut self) -> std::io::Result<()> {
        if !self.buffer.is_empty() {
            self.writer.write_all(&self.buffer).await?;
            self.buffer.clear();
        }
        self.writer.flush().await
    }

    pub fn buffered(&self) -> usize {
        self.buffer.len()
    }

    pub fn get_ref(&self) -> &W {
        &self.writer
    }

    pub fn get_mut(&mut self) -> &mut W {
        &mut self.writer
    }

    pub fn into_inner(self) -> W {
        self.writer
    }
}
