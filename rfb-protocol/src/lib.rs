//! RFB (Remote Framebuffer) wire layer for the client-side decoder.
//!
//! This crate provides buffered I/O over an already-established transport
//! and the message types the decoder session reads and writes. Connecting,
//! version exchange and authentication happen before these streams are
//! created and are not handled here.
//!
//! # Modules
//!
//! - [`io`] - Buffered I/O streams (RfbInStream, RfbOutStream)
//! - [`messages`] - Message types, encodings and wire constants
//!
//! # Examples
//!
//! ```
//! use rfb_protocol::messages::Rectangle;
//! use rfb_protocol::RfbInStream;
//!
//! # async fn example() -> std::io::Result<()> {
//! let bytes: &[u8] = &[0, 0, 0, 0, 0, 2, 0, 2, 0, 0, 0, 0];
//! let mut stream = RfbInStream::new(bytes);
//! let rect = Rectangle::read_from(&mut stream).await?;
//! assert_eq!((rect.width, rect.height, rect.encoding), (2, 2, 0));
//! # Ok(())
//! # }
//! ```

pub mod io;
pub mod messages;

pub use io::{RfbInStream, RfbOutStream};
pub use messages::ClientMessage;
