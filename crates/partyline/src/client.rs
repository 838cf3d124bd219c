//! `SessionClient` builder and handle.

use std::sync::Arc;

use partyline_protocol::{ConnectionKind, ControlMessage, InboundEvent, RoomId};
use partyline_session::{
    Navigator, NoopNavigator, SessionStore, SessionView, Subscription, Target,
    TokenProvider, UrlBuilder,
};
use partyline_transport::Dialer;
use tokio::sync::{mpsc, oneshot};

use crate::driver::{Collaborators, Command, Driver, MessageHandler};
use crate::{ClientConfig, ClientError};

/// Builder for a [`SessionClient`].
///
/// # Example
///
/// ```rust,no_run
/// use partyline::prelude::*;
///
/// # async fn run() -> Result<(), ClientError> {
/// let client = SessionClient::builder()
///     .navigator(|route: &Route| println!("go to {route}"))
///     .build(
///         WebSocketDialer::new(),
///         Endpoint::from_origin("https://party.example")?,
///         StaticToken::new("jwt"),
///     );
/// client.connect("AB12", ConnectionKind::Lobby).await?;
/// # Ok(())
/// # }
/// ```
pub struct SessionClientBuilder {
    config: ClientConfig,
    navigator: Arc<dyn Navigator>,
    store: Option<SessionStore>,
}

impl SessionClientBuilder {
    /// Creates a builder with default settings and no router.
    pub fn new() -> Self {
        Self {
            config: ClientConfig::default(),
            navigator: Arc::new(NoopNavigator),
            store: None,
        }
    }

    /// Sets the client configuration.
    pub fn config(mut self, config: ClientConfig) -> Self {
        self.config = config;
        self
    }

    /// Sets the collaborator that receives navigation effects.
    pub fn navigator(mut self, navigator: impl Navigator) -> Self {
        self.navigator = Arc::new(navigator);
        self
    }

    /// Publishes into an existing store instead of a fresh one.
    pub fn store(mut self, store: SessionStore) -> Self {
        self.store = Some(store);
        self
    }

    /// Spawns the session driver and returns a handle to it.
    ///
    /// Must be called from within a Tokio runtime.
    pub fn build<D: Dialer>(
        self,
        dialer: D,
        urls: impl UrlBuilder,
        tokens: impl TokenProvider,
    ) -> SessionClient {
        let store = self.store.unwrap_or_default();
        let (commands, receiver) = mpsc::unbounded_channel();
        let driver = Driver::new(
            dialer,
            Collaborators {
                urls: Arc::new(urls),
                tokens: Arc::new(tokens),
                navigator: self.navigator,
            },
            self.config.validated(),
            store.clone(),
            receiver,
        );
        tokio::spawn(driver.run());

        SessionClient { commands, store }
    }
}

impl Default for SessionClientBuilder {
    fn default() -> Self {
        Self::new()
    }
}

/// Handle to one session.
///
/// Cheap to clone; every clone drives the same session. The session ends
/// when [`dispose`](Self::dispose) is called or the last handle is dropped.
#[derive(Clone)]
pub struct SessionClient {
    commands: mpsc::UnboundedSender<Command>,
    store: SessionStore,
}

impl SessionClient {
    /// Creates a new builder.
    pub fn builder() -> SessionClientBuilder {
        SessionClientBuilder::new()
    }

    /// Connects to `room`, replacing whatever the session was connected or
    /// connecting to.
    ///
    /// Resolves once the transport is open.
    ///
    /// # Errors
    /// - [`ClientError::Unauthenticated`] if no token is available. Nothing
    ///   else changes in that case.
    /// - [`ClientError::HandshakeTimeout`] or [`ClientError::Transport`] if
    ///   the dial fails. A reconnect is scheduled.
    /// - [`ClientError::Superseded`] if another `connect` or a `disconnect`
    ///   arrives first.
    pub async fn connect(
        &self,
        room: impl Into<RoomId>,
        kind: ConnectionKind,
    ) -> Result<(), ClientError> {
        let (reply, rx) = oneshot::channel();
        self.command(Command::Connect {
            target: Target::new(room, kind),
            reply,
        })?;
        rx.await.map_err(|_| ClientError::Shutdown)?
    }

    /// Tears the session down: no transport, no pending reconnect, no
    /// message handler, empty snapshot.
    pub async fn disconnect(&self) -> Result<(), ClientError> {
        let (reply, rx) = oneshot::channel();
        self.command(Command::Disconnect { reply })?;
        rx.await.map_err(|_| ClientError::Shutdown)
    }

    /// Sends a control message on the open transport.
    ///
    /// Resolves once the frame is written. A transport that goes away
    /// first yields [`ClientError::NotConnected`].
    pub async fn send(&self, message: ControlMessage) -> Result<(), ClientError> {
        let (reply, rx) = oneshot::channel();
        self.command(Command::Send { message, reply })?;
        rx.await.map_err(|_| ClientError::NotConnected)?
    }

    /// Registers the application callback for decoded events. It runs
    /// after the snapshot has been published and effects executed.
    pub fn set_message_handler<F>(&self, handler: F) -> Result<(), ClientError>
    where
        F: Fn(&InboundEvent) + Send + Sync + 'static,
    {
        let handler: MessageHandler = Arc::new(handler);
        self.command(Command::SetHandler(Some(handler)))
    }

    pub fn clear_message_handler(&self) -> Result<(), ClientError> {
        self.command(Command::SetHandler(None))
    }

    /// Registers a state listener. It is called immediately with the
    /// current view and then after every change.
    pub fn subscribe<F>(&self, listener: F) -> Subscription
    where
        F: Fn(&SessionView) + Send + Sync + 'static,
    {
        self.store.subscribe(listener)
    }

    /// The latest view.
    pub fn state(&self) -> Arc<SessionView> {
        self.store.current()
    }

    /// The store this session publishes into.
    pub fn store(&self) -> &SessionStore {
        &self.store
    }

    /// Disconnects and stops the driver. Other clones of this handle fail
    /// with [`ClientError::Shutdown`] afterwards.
    pub async fn dispose(self) {
        let (reply, rx) = oneshot::channel();
        if self.command(Command::Shutdown { reply }).is_ok() {
            let _ = rx.await;
        }
    }

    fn command(&self, cmd: Command) -> Result<(), ClientError> {
        self.commands.send(cmd).map_err(|_| ClientError::Shutdown)
    }
}
