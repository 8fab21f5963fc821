//! Property tests for message framing.
//!
//! Parsing must not depend on how the transport splits the byte stream, so
//! every message here is re-read through a reader that fragments at an
//! arbitrary boundary.

use super::client::*;
use super::server::*;
use super::types::*;
use super::ClientMessage;
use crate::io::{RfbInStream, RfbOutStream};
use bytes::Bytes;
use proptest::prelude::*;

/// Splits the first read at `boundary`, then hands out at most `chunk`
/// bytes per read.
struct FragmentingReader {
    data: Vec<u8>,
    pos: usize,
    boundary: usize,
    chunk: usize,
}

impl FragmentingReader {
    fn new(data: Vec<u8>, boundary: usize, chunk: usize) -> Self {
        let boundary = boundary.min(data.len());
        Self {
            data,
            pos: 0,
            boundary,
            chunk: chunk.max(1),
        }
    }
}

impl tokio::io::AsyncRead for FragmentingReader {
    fn poll_read(
        mut self: std::pin::Pin<&mut Self>,
        _cx: &mut std::task::Context<'_>,
        buf: &mut tokio::io::ReadBuf<'_>,
    ) -> std::task::Poll<std::io::Result<()>> {
        let end = if self.pos < self.boundary {
            self.boundary
        } else {
            (self.pos + self.chunk).min(self.data.len())
        };
        let available = (end - self.pos).min(buf.remaining());
        if available > 0 {
            let start = self.pos;
            buf.put_slice(&self.data[start..start + available]);
            self.pos += available;
        }
        std::task::Poll::Ready(Ok(()))
    }
}

fn arbitrary_rectangle() -> impl Strategy<Value = Rectangle> {
    (
        any::<u16>(),
        any::<u16>(),
        any::<u16>(),
        any::<u16>(),
        prop::sample::select(vec![
            ENCODING_RAW,
            ENCODING_COPYRECT,
            ENCODING_RRE,
            ENCODING_CORRE,
            ENCODING_HEXTILE,
            ENCODING_ZLIB,
            ENCODING_ZRLE,
            PSEUDO_ENCODING_LAST_RECT,
            PSEUDO_ENCODING_DESKTOP_SIZE,
        ]),
    )
        .prop_map(|(x, y, width, height, encoding)| Rectangle {
            x,
            y,
            width,
            height,
            encoding,
        })
}

fn arbitrary_text_chat() -> impl Strategy<Value = TextChat> {
    prop_oneof![
        Just(TextChat::Opened),
        Just(TextChat::Closed),
        Just(TextChat::Finished),
        prop::collection::vec(any::<u8>(), 0..300)
            .prop_map(|text| TextChat::Message(Bytes::from(text))),
    ]
}

async fn encode(write: impl FnOnce(&mut RfbOutStream<&mut Vec<u8>>)) -> Vec<u8> {
    let mut buffer = Vec::new();
    let mut out = RfbOutStream::new(&mut buffer);
    write(&mut out);
    out.flush().await.unwrap();
    drop(out);
    buffer
}

proptest! {
    #[test]
    fn test_update_and_rectangle_headers_fragmentation(
        rectangles in prop::collection::vec(arbitrary_rectangle(), 0..10),
        boundary in 0usize..200,
        chunk in 1usize..16,
    ) {
        let rt = tokio::runtime::Runtime::new().unwrap();
        rt.block_on(async {
            let buffer = encode(|out| {
                FramebufferUpdate { num_rectangles: rectangles.len() as u16 }.write_to(out);
                for rect in &rectangles {
                    rect.write_to(out);
                }
            })
            .await;

            let reader = FragmentingReader::new(buffer[1..].to_vec(), boundary, chunk);
            let mut in_stream = RfbInStream::new(reader);

            let header = FramebufferUpdate::read_from(&mut in_stream).await.unwrap();
            prop_assert_eq!(header.num_rectangles as usize, rectangles.len());
            for expected in &rectangles {
                let parsed = Rectangle::read_from(&mut in_stream).await.unwrap();
                prop_assert_eq!(expected, &parsed);
            }
            prop_assert_eq!(in_stream.consumed() as usize, buffer.len() - 1);
            Ok(())
        })?;
    }

    #[test]
    fn test_server_cut_text_fragmentation(
        text in prop::collection::vec(any::<u8>(), 0..400),
        boundary in 0usize..500,
        chunk in 1usize..64,
    ) {
        let rt = tokio::runtime::Runtime::new().unwrap();
        rt.block_on(async {
            let msg = ServerCutText { text: Bytes::from(text) };
            let buffer = encode(|out| msg.write_to(out)).await;

            let reader = FragmentingReader::new(buffer[1..].to_vec(), boundary, chunk);
            let mut in_stream = RfbInStream::new(reader);

            let parsed = ServerCutText::read_from(&mut in_stream).await.unwrap();
            prop_assert_eq!(msg, parsed);
            Ok(())
        })?;
    }

    #[test]
    fn test_text_chat_fragmentation(
        msg in arbitrary_text_chat(),
        boundary in 0usize..400,
        chunk in 1usize..32,
    ) {
        let rt = tokio::runtime::Runtime::new().unwrap();
        rt.block_on(async {
            let buffer = encode(|out| msg.write_to(out)).await;

            let reader = FragmentingReader::new(buffer[1..].to_vec(), boundary, chunk);
            let mut in_stream = RfbInStream::new(reader);

            let parsed = TextChat::read_from(&mut in_stream).await.unwrap();
            prop_assert_eq!(msg, parsed);
            Ok(())
        })?;
    }

    #[test]
    fn test_client_messages_fragmentation(
        encodings in prop::collection::vec(any::<i32>(), 0..40),
        incremental in any::<bool>(),
        width in 1u16..=4096,
        height in 1u16..=4096,
        boundary in 0usize..200,
        chunk in 1usize..8,
    ) {
        let rt = tokio::runtime::Runtime::new().unwrap();
        rt.block_on(async {
            let messages = vec![
                ClientMessage::SetEncodings(SetEncodings { encodings }),
                ClientMessage::FramebufferUpdateRequest(FramebufferUpdateRequest {
                    incremental,
                    x: 0,
                    y: 0,
                    width,
                    height,
                }),
            ];
            let buffer = encode(|out| {
                for msg in &messages {
                    msg.write_to(out).unwrap();
                }
            })
            .await;

            let reader = FragmentingReader::new(buffer, boundary, chunk);
            let mut in_stream = RfbInStream::new(reader);
            for expected in &messages {
                let parsed = ClientMessage::read_from(&mut in_stream).await.unwrap();
                prop_assert_eq!(expected, &parsed);
            }
            Ok(())
        })?;
    }
}
