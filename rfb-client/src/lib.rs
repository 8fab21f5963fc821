//! Async decoder session for the server-to-client half of RFB.
//!
//! This crate runs on a transport whose handshake (version, security,
//! ClientInit/ServerInit) has already been completed by the caller. It
//! negotiates the client pixel format and encodings, then decodes every
//! FramebufferUpdate into a [`SharedFramebuffer`] and reports what happened
//! as [`ServerEvent`]s.
//!
//! # Quick Start
//!
//! ```no_run
//! use rfb_client::{ClientBuilder, Config, ServerEvent};
//! use rfb_pixelbuffer::ColourModel;
//! use tokio::net::TcpStream;
//!
//! # async fn example(stream: TcpStream) -> anyhow::Result<()> {
//! // `stream` has been through the RFB handshake; ServerInit said 1024x768.
//! let config = Config::builder().colour_model(ColourModel::C256).build()?;
//! let (reader, writer) = stream.into_split();
//! let client = ClientBuilder::new(config)
//!     .framebuffer_size(1024, 768)
//!     .spawn(reader, writer)?;
//!
//! while let Ok(event) = client.handle.events().recv_async().await {
//!     match event {
//!         ServerEvent::FramebufferUpdated { damage } => {
//!             let fb = client.framebuffer.lock();
//!             // repaint `damage` from `fb.data()`
//!             # let _ = (&fb, damage);
//!         }
//!         ServerEvent::ConnectionClosed => break,
//!         _ => {}
//!     }
//! }
//! client.join().await?;
//! # Ok(())
//! # }
//! ```
//!
//! # Error Handling
//!
//! Protocol violations, malformed encodings and transport failures end the
//! session. Bell, clipboard, chat and cursor traffic never do, and a
//! rectangle outside the framebuffer or viewport is consumed without drawing.

#![forbid(unsafe_code)]

pub mod config;
pub mod errors;
pub mod framebuffer;
pub mod logging;
pub mod messages;
pub mod negotiation;
pub mod protocol;
pub mod protocol_trace;
pub mod update_loop;

pub use config::{Config, ConfigBuilder};
pub use errors::RfbClientError;
pub use messages::{ClientCommand, ServerEvent};
pub use rfb_pixelbuffer::{ColourModel, SharedFramebuffer};
pub use update_loop::UpdateLoop;

use rfb_pixelbuffer::ManagedFramebuffer;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use tokio::io::{AsyncRead, AsyncWrite};
use tokio::task::JoinHandle;

/// Builder for a decoder session.
pub struct ClientBuilder {
    config: Config,
    width: u16,
    height: u16,
}

impl ClientBuilder {
    /// Creates a new client builder with the given configuration.
    #[must_use]
    pub fn new(config: Config) -> Self {
        Self {
            config,
            width: 0,
            height: 0,
        }
    }

    /// Sets the framebuffer size announced in ServerInit.
    #[must_use]
    pub fn framebuffer_size(mut self, width: u16, height: u16) -> Self {
        self.width = width;
        self.height = height;
        self
    }

    /// Spawns the session on the current tokio runtime.
    ///
    /// # Errors
    ///
    /// Returns an error if the configuration is invalid or no framebuffer
    /// size was set.
    pub fn spawn<R, W>(self, reader: R, writer: W) -> Result<Client, RfbClientError>
    where
        R: AsyncRead + Unpin + Send + 'static,
        W: AsyncWrite + Unpin + Send + 'static,
    {
        self.config.validate()?;
        if self.width == 0 || self.height == 0 {
            return Err(RfbClientError::Config(
                "Framebuffer size must be set before spawning".to_string(),
            ));
        }

        let (cmd_tx, cmd_rx) = flume::bounded(32);
        let (event_tx, event_rx) = flume::bounded(64);
        let maintain_connection = Arc::new(AtomicBool::new(true));
        let framebuffer = SharedFramebuffer::new(ManagedFramebuffer::new(
            u32::from(self.width),
            u32::from(self.height),
        ));

        let update_loop = UpdateLoop::new(
            &self.config,
            reader,
            writer,
            framebuffer.clone(),
            cmd_rx,
            event_tx,
            Arc::clone(&maintain_connection),
        );
        let task = tokio::spawn(update_loop.run());

        Ok(Client {
            handle: ClientHandle {
                commands: cmd_tx,
                events: event_rx,
                maintain_connection,
            },
            framebuffer,
            task,
        })
    }
}

/// Handle for interacting with a running session.
///
/// It can be cloned and shared across threads.
#[derive(Clone)]
pub struct ClientHandle {
    commands: flume::Sender<ClientCommand>,
    events: flume::Receiver<ServerEvent>,
    maintain_connection: Arc<AtomicBool>,
}

impl ClientHandle {
    /// Queues a command for the session.
    ///
    /// # Errors
    ///
    /// Returns [`RfbClientError::ConnectionClosed`] if the session has ended.
    pub async fn send(&self, cmd: ClientCommand) -> Result<(), RfbClientError> {
        self.commands
            .send_async(cmd)
            .await
            .map_err(|_| RfbClientError::ConnectionClosed)
    }

    /// Switches colour model at the next update boundary.
    pub async fn set_colour_model(&self, model: ColourModel) -> Result<(), RfbClientError> {
        self.send(ClientCommand::SetColourModel(model)).await
    }

    pub async fn request_update(&self, incremental: bool) -> Result<(), RfbClientError> {
        self.send(ClientCommand::RequestUpdate { incremental }).await
    }

    /// Returns the event receiver.
    #[must_use]
    pub fn events(&self) -> &flume::Receiver<ServerEvent> {
        &self.events
    }

    pub fn is_running(&self) -> bool {
        self.maintain_connection.load(Ordering::Acquire)
    }

    /// Stops the session before its next message.
    ///
    /// A message that is already being decoded is finished first. The loop
    /// cannot interrupt a read that is waiting for more rectangle data; drop
    /// the transport for that.
    pub fn close(&self) {
        self.maintain_connection.store(false, Ordering::Release);
        // wakes a loop that is idle waiting for the next message
        let _ = self.commands.try_send(ClientCommand::Close);
    }
}

/// A running decoder session.
pub struct Client {
    /// Command and event channels.
    pub handle: ClientHandle,
    /// The framebuffer the session decodes into.
    pub framebuffer: SharedFramebuffer,
    task: JoinHandle<Result<(), RfbClientError>>,
}

impl Client {
    /// Returns a handle for interacting with the client.
    #[must_use]
    pub fn handle(&self) -> ClientHandle {
        self.handle.clone()
    }

    /// Waits for the session to end and returns its terminal result.
    ///
    /// # Errors
    ///
    /// Returns the error that ended the session, or
    /// [`RfbClientError::Internal`] if the task panicked.
    pub async fn join(self) -> Result<(), RfbClientError> {
        self.task
            .await
            .map_err(|e| RfbClientError::Internal(format!("Client task panicked: {e}")))?
    }
}
