//! Application-facing message types for communication between the client and application.

use crate::config::EncodingConfig;
use bytes::Bytes;
use rfb_common::Rect;
use rfb_pixelbuffer::ColourModel;
use rfb_protocol::messages::TextChat;

/// Events sent from the decoder session to the application.
#[derive(Debug, Clone)]
pub enum ServerEvent {
    /// A FramebufferUpdate has been fully decoded.
    ///
    /// The `damage` vector contains every rectangle committed while decoding
    /// it. The application should redraw these regions.
    FramebufferUpdated {
        /// Committed rectangles, in decode order.
        damage: Vec<Rect>,
    },

    /// The server changed the desktop size; the framebuffer was resized and
    /// cleared.
    DesktopResized {
        /// New width in pixels.
        width: u16,
        /// New height in pixels.
        height: u16,
    },

    /// The server reported the pointer position.
    PointerMoved {
        x: u16,
        y: u16,
    },

    /// A colour-model change took effect.
    ColourModelChanged {
        model: ColourModel,
    },

    /// Server sent a bell notification.
    Bell,

    /// Server sent clipboard data (Latin-1 on the wire).
    ServerCutText {
        /// Raw clipboard bytes.
        text: Bytes,
    },

    /// UltraVNC text chat traffic.
    TextChat(TextChat),

    /// The session has ended (gracefully or due to error). Always the last event.
    ConnectionClosed,

    /// The session failed. Followed by [`ServerEvent::ConnectionClosed`].
    Error {
        /// The error message.
        message: String,
    },
}

/// Commands sent from the application to the decoder session.
#[derive(Debug, Clone)]
pub enum ClientCommand {
    /// Switch to another colour model once the current update is decoded.
    SetColourModel(ColourModel),

    /// Replace the encoding preferences; SetEncodings is re-sent if the
    /// resulting list changed.
    SetEncodings(EncodingConfig),

    /// Request a framebuffer update of the whole screen.
    RequestUpdate {
        /// If true, only send updates for changed regions.
        incremental: bool,
    },

    /// Close the session.
    Close,
}
