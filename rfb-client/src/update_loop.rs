//! The decoder session loop.
//!
//! One task owns both halves of the transport. Server messages are read and
//! handled strictly in order; while the loop is idle waiting for the next
//! message type byte it also services [`ClientCommand`]s.

use crate::config::Config;
use crate::errors::RfbClientError;
use crate::framebuffer::FramebufferState;
use crate::messages::{ClientCommand, ServerEvent};
use crate::negotiation::{EncodingPreferences, PixelFormatNegotiator};
use crate::protocol;
use rfb_encodings::cursor::skip_cursor_payload;
use rfb_pixelbuffer::SharedFramebuffer;
use rfb_protocol::io::{RfbInStream, RfbOutStream};
use rfb_protocol::messages::types::{
    Rectangle, MSG_BELL, MSG_FRAMEBUFFER_UPDATE, MSG_SERVER_CUT_TEXT,
    MSG_SET_COLOUR_MAP_ENTRIES, MSG_TEXT_CHAT, PSEUDO_ENCODING_DESKTOP_SIZE,
    PSEUDO_ENCODING_LAST_RECT, PSEUDO_ENCODING_POINTER_POS, PSEUDO_ENCODING_RICH_CURSOR,
    PSEUDO_ENCODING_X_CURSOR,
};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use tokio::io::{AsyncRead, AsyncWrite};

enum Next {
    Command(ClientCommand),
    Message(u8),
    Stop,
}

/// Reads and applies server messages until closed or a fatal error.
pub struct UpdateLoop<R, W> {
    input: RfbInStream<R>,
    output: RfbOutStream<W>,
    state: FramebufferState,
    negotiator: PixelFormatNegotiator,
    encodings: EncodingPreferences,
    commands: flume::Receiver<ClientCommand>,
    events: flume::Sender<ServerEvent>,
    maintain_connection: Arc<AtomicBool>,
    full_update_needed: bool,
}

impl<R, W> UpdateLoop<R, W>
where
    R: AsyncRead + Unpin,
    W: AsyncWrite + Unpin,
{
    /// Creates the loop over an already-initialised transport.
    ///
    /// `framebuffer` must already have the size announced in ServerInit.
    pub fn new(
        config: &Config,
        reader: R,
        writer: W,
        framebuffer: SharedFramebuffer,
        commands: flume::Receiver<ClientCommand>,
        events: flume::Sender<ServerEvent>,
        maintain_connection: Arc<AtomicBool>,
    ) -> Self {
        let model = config.session.colour_model;
        Self {
            input: RfbInStream::with_capacity(reader, config.decoder.read_buffer_size),
            output: RfbOutStream::new(writer),
            state: FramebufferState::new(framebuffer, model.pixel_format(), &config.decoder),
            negotiator: PixelFormatNegotiator::new(model),
            encodings: EncodingPreferences::new(config.encodings.clone()),
            commands,
            events,
            maintain_connection,
            full_update_needed: true,
        }
    }

    /// Runs the session to completion.
    ///
    /// The last event emitted is always [`ServerEvent::ConnectionClosed`],
    /// preceded by [`ServerEvent::Error`] when the session failed.
    pub async fn run(mut self) -> Result<(), RfbClientError> {
        let result = self.session().await;
        self.maintain_connection.store(false, Ordering::Release);

        match &result {
            Ok(()) => tracing::info!("Decoder session closed"),
            Err(e) => {
                tracing::error!("Decoder session failed: {}", e);
                emit(&self.events, ServerEvent::Error {
                    message: e.to_string(),
                })
                .await;
            }
        }
        emit(&self.events, ServerEvent::ConnectionClosed).await;
        result
    }

    async fn session(&mut self) -> Result<(), RfbClientError> {
        self.start().await?;

        while self.maintain_connection.load(Ordering::Acquire) {
            let next = tokio::select! {
                biased;
                cmd = self.commands.recv_async() => match cmd {
                    Ok(ClientCommand::Close) | Err(_) => Next::Stop,
                    Ok(command) => Next::Command(command),
                },
                msg_type = protocol::read_message_type(&mut self.input) => match msg_type {
                    Ok(t) => Next::Message(t),
                    Err(RfbClientError::Transport(e))
                        if e.kind() == std::io::ErrorKind::UnexpectedEof
                            && self.input.available() == 0 =>
                    {
                        tracing::info!("Server closed the connection");
                        Next::Stop
                    }
                    Err(e) => return Err(e),
                },
            };

            match next {
                Next::Command(command) => self.handle_command(command).await?,
                Next::Message(t) => self.dispatch(t).await?,
                Next::Stop => break,
            }
        }
        Ok(())
    }

    async fn start(&mut self) -> Result<(), RfbClientError> {
        let (width, height) = self.state.size();
        tracing::info!(
            "Starting decoder session: {}x{}, colour model {}",
            width,
            height,
            self.negotiator.active().id()
        );

        let model = self.negotiator.active();
        let pixel_format = self.negotiator.apply(&mut self.output, model).await?;
        self.state.set_pixel_format(pixel_format);
        self.encodings.send_if_changed(&mut self.output).await?;
        self.request_update().await
    }

    async fn handle_command(&mut self, command: ClientCommand) -> Result<(), RfbClientError> {
        tracing::debug!("Command: {:?}", command);
        match command {
            ClientCommand::SetColourModel(model) => self.negotiator.request(model),
            ClientCommand::SetEncodings(config) => self.encodings.update(config),
            ClientCommand::RequestUpdate { incremental } => {
                if !incremental {
                    self.full_update_needed = true;
                }
                self.request_update().await?;
            }
            ClientCommand::Close => self.maintain_connection.store(false, Ordering::Release),
        }
        Ok(())
    }

    async fn dispatch(&mut self, msg_type: u8) -> Result<(), RfbClientError> {
        match msg_type {
            MSG_FRAMEBUFFER_UPDATE => self.framebuffer_update().await,
            MSG_SET_COLOUR_MAP_ENTRIES => Err(RfbClientError::UnexpectedMessage(
                "SetColourMapEntries is not supported; the client only uses true-colour formats"
                    .to_string(),
            )),
            MSG_BELL => {
                emit(&self.events, ServerEvent::Bell).await;
                Ok(())
            }
            MSG_SERVER_CUT_TEXT => {
                let cut = protocol::read_server_cut_text(&mut self.input).await?;
                emit(&self.events, ServerEvent::ServerCutText { text: cut.text }).await;
                Ok(())
            }
            MSG_TEXT_CHAT => {
                let chat = protocol::read_text_chat(&mut self.input).await?;
                emit(&self.events, ServerEvent::TextChat(chat)).await;
                Ok(())
            }
            other => Err(RfbClientError::Protocol(format!(
                "unknown RFB message type {}",
                other
            ))),
        }
    }

    async fn framebuffer_update(&mut self) -> Result<(), RfbClientError> {
        let update = protocol::read_framebuffer_update(&mut self.input).await?;

        for _ in 0..update.num_rectangles {
            let rect = protocol::read_rectangle(&mut self.input).await?;
            if !self.apply(&rect).await? {
                break;
            }
        }

        if let Some(model) = self.negotiator.take_pending() {
            let pixel_format = self.negotiator.apply(&mut self.output, model).await?;
            self.state.set_pixel_format(pixel_format);
            self.full_update_needed = true;
            emit(&self.events, ServerEvent::ColourModelChanged { model }).await;
        }
        self.encodings.send_if_changed(&mut self.output).await?;
        self.request_update().await?;

        let damage = self.state.take_damage();
        emit(&self.events, ServerEvent::FramebufferUpdated { damage }).await;
        Ok(())
    }

    /// Applies one rectangle; returns `false` at LastRect.
    async fn apply(&mut self, rect: &Rectangle) -> Result<bool, RfbClientError> {
        match rect.encoding {
            PSEUDO_ENCODING_LAST_RECT => return Ok(false),
            PSEUDO_ENCODING_DESKTOP_SIZE => {
                tracing::info!("Desktop resized to {}x{}", rect.width, rect.height);
                self.state.resize(rect.width, rect.height);
                self.full_update_needed = true;
                emit(&self.events, ServerEvent::DesktopResized {
                    width: rect.width,
                    height: rect.height,
                })
                .await;
            }
            PSEUDO_ENCODING_X_CURSOR | PSEUDO_ENCODING_RICH_CURSOR => {
                skip_cursor_payload(&mut self.input, rect, self.state.pixel_format())
                    .await
                    .map_err(RfbClientError::Encoding)?;
            }
            PSEUDO_ENCODING_POINTER_POS => {
                emit(&self.events, ServerEvent::PointerMoved {
                    x: rect.x,
                    y: rect.y,
                })
                .await;
            }
            _ => self.state.apply_rectangle(&mut self.input, rect).await?,
        }
        Ok(true)
    }

    async fn request_update(&mut self) -> Result<(), RfbClientError> {
        let (width, height) = self.state.size();
        let incremental = !self.full_update_needed;
        protocol::write_framebuffer_update_request(&mut self.output, incremental, width, height)
            .await?;
        self.full_update_needed = false;
        Ok(())
    }
}

async fn emit(events: &flume::Sender<ServerEvent>, event: ServerEvent) {
    if events.send_async(event).await.is_err() {
        tracing::debug!("Event receiver dropped");
    }
}
