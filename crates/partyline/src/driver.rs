//! The session driver: a single Tokio task that owns the connection.
//!
//! Every piece of mutable connection state (the live transport, the pending
//! dial, the reconnect timer, the message handler) lives in [`Driver`] and
//! is touched only from its run loop. Callers reach it through
//! [`Command`]s; helper tasks (one dial, one reader, one writer) report back
//! through [`Event`]s tagged with the attempt or connection they belong to,
//! so a late report from a replaced transport is recognised and dropped.
//!
//! The loop itself never awaits I/O. Outbound frames go through the open
//! transport's writer task, and closes run in the background.
//!
//! A transport only exists while it holds the session's single slot permit.
//! A dial task acquires the permit before dialing and a replaced transport
//! gives it back only once its close has finished, so a new transport can
//! never overlap the one it replaces.
//!
//! ```text
//! SessionClient ──Command──→ ┌────────┐ ──update──→ SessionStore ──→ subscribers
//!                            │ Driver │ ──navigate─→ Navigator
//! dial task ─────Event─────→ │  loop  │ ──on_event─→ message handler
//! reader task ───Event─────→ └────────┘ ──Outgoing──→ writer task
//!                   ▲            │
//!                   └── spawn ───┘
//! ```
//!
//! Each command and event is handled to completion before the next one is
//! looked at, so multi-step operations such as `disconnect` are atomic with
//! respect to everything else the session does.

use std::mem;
use std::sync::Arc;
use std::time::{SystemTime, UNIX_EPOCH};

use partyline_protocol::{ControlMessage, InboundEvent, decode, encode};
use partyline_reconnect::ReconnectPolicy;
use partyline_room::{Effect, Reconciled, SessionSnapshot, apply};
use partyline_session::{
    ConnectionPhase, Navigator, SessionStore, Target, TokenProvider,
    UrlBuilder, with_token,
};
use partyline_transport::{Connection, ConnectionId, Dialer, TransportError};
use tokio::sync::{OwnedSemaphorePermit, Semaphore, mpsc, oneshot};
use tokio::task::JoinHandle;
use tokio::time;

use crate::{ClientConfig, ClientError};

/// Application callback invoked with every decoded inbound event.
pub type MessageHandler = Arc<dyn Fn(&InboundEvent) + Send + Sync>;

type Reply<T> = oneshot::Sender<Result<T, ClientError>>;

/// An open transport together with the slot permit it occupies.
type Slot<C> = (C, OwnedSemaphorePermit);

// ---------------------------------------------------------------------------
// Messages
// ---------------------------------------------------------------------------

/// Requests from [`SessionClient`](crate::SessionClient) handles.
pub(crate) enum Command {
    Connect {
        target: Target,
        reply: Reply<()>,
    },
    Disconnect {
        reply: oneshot::Sender<()>,
    },
    SetHandler(Option<MessageHandler>),
    Send {
        message: ControlMessage,
        reply: Reply<()>,
    },
    Shutdown {
        reply: oneshot::Sender<()>,
    },
}

/// Reports from the driver's helper tasks.
pub(crate) enum Event<C> {
    Dialed {
        attempt: u64,
        result: Result<Slot<C>, ClientError>,
    },
    Frame {
        id: ConnectionId,
        data: Vec<u8>,
    },
    Closed {
        id: ConnectionId,
        error: Option<TransportError>,
    },
}

/// One encoded frame queued on the writer task.
struct Outgoing {
    frame: Vec<u8>,
    reply: Reply<()>,
}

enum Step<C> {
    Command(Option<Command>),
    Event(Event<C>),
    Reconnect(Target),
}

// ---------------------------------------------------------------------------
// Link state
// ---------------------------------------------------------------------------

/// The one transport slot. Replaced wholesale on every transition.
enum Link<C> {
    Idle,
    Dialing {
        attempt: u64,
        target: Target,
        task: JoinHandle<()>,
        /// The explicit `connect` waiting on this dial, if any.
        reply: Option<Reply<()>>,
    },
    Open {
        conn: Arc<C>,
        permit: OwnedSemaphorePermit,
        target: Target,
        reader: JoinHandle<()>,
        writer: JoinHandle<()>,
        outbox: mpsc::UnboundedSender<Outgoing>,
    },
    /// A deliberate disconnect is closing this transport.
    Closing { id: ConnectionId },
}

// ---------------------------------------------------------------------------
// Driver
// ---------------------------------------------------------------------------

pub(crate) struct Collaborators {
    pub(crate) urls: Arc<dyn UrlBuilder>,
    pub(crate) tokens: Arc<dyn TokenProvider>,
    pub(crate) navigator: Arc<dyn Navigator>,
}

pub(crate) struct Driver<D: Dialer> {
    dialer: Arc<D>,
    collab: Collaborators,
    config: ClientConfig,
    store: SessionStore,
    commands: mpsc::UnboundedReceiver<Command>,
    events_tx: mpsc::UnboundedSender<Event<D::Connection>>,
    events_rx: mpsc::UnboundedReceiver<Event<D::Connection>>,
    link: Link<D::Connection>,
    /// One permit; held by whichever transport currently exists.
    slot: Arc<Semaphore>,
    /// The room the session should be in. `None` once torn down, which is
    /// what stops a late close from scheduling a reconnect.
    target: Option<Target>,
    reconnect: ReconnectPolicy<Target>,
    handler: Option<MessageHandler>,
    next_attempt: u64,
}

impl<D: Dialer> Driver<D> {
    pub(crate) fn new(
        dialer: D,
        collab: Collaborators,
        config: ClientConfig,
        store: SessionStore,
        commands: mpsc::UnboundedReceiver<Command>,
    ) -> Self {
        let (events_tx, events_rx) = mpsc::unbounded_channel();
        Self {
            dialer: Arc::new(dialer),
            collab,
            reconnect: ReconnectPolicy::new(config.backoff.clone()),
            config,
            store,
            commands,
            events_tx,
            events_rx,
            link: Link::Idle,
            slot: Arc::new(Semaphore::new(1)),
            target: None,
            handler: None,
            next_attempt: 0,
        }
    }

    /// Runs until shut down or until every client handle is dropped.
    pub(crate) async fn run(mut self) {
        tracing::debug!("session driver started");

        loop {
            let step = tokio::select! {
                biased;
                cmd = self.commands.recv() => Step::Command(cmd),
                Some(event) = self.events_rx.recv() => Step::Event(event),
                target = self.reconnect.wait() => Step::Reconnect(target),
            };

            match step {
                Step::Command(Some(Command::Shutdown { reply })) => {
                    self.shutdown();
                    let _ = reply.send(());
                    break;
                }
                Step::Command(Some(cmd)) => self.handle_command(cmd),
                Step::Command(None) => {
                    self.shutdown();
                    break;
                }
                Step::Event(event) => self.handle_event(event),
                Step::Reconnect(target) => self.reconnect_due(target),
            }
        }

        tracing::debug!("session driver stopped");
    }

    // -----------------------------------------------------------------------
    // Commands
    // -----------------------------------------------------------------------

    fn handle_command(&mut self, cmd: Command) {
        match cmd {
            Command::Connect { target, reply } => self.connect(target, reply),
            Command::Disconnect { reply } => {
                self.disconnect();
                let _ = reply.send(());
            }
            Command::SetHandler(handler) => self.handler = handler,
            Command::Send { message, reply } => self.send(&message, reply),
            Command::Shutdown { .. } => {}
        }
    }

    /// Queues a frame on the open transport's writer. The reply is sent
    /// by the writer once the frame is written.
    fn send(&self, message: &ControlMessage, reply: Reply<()>) {
        let Link::Open { outbox, .. } = &self.link else {
            let _ = reply.send(Err(ClientError::NotConnected));
            return;
        };
        let frame = match encode(message) {
            Ok(frame) => frame,
            Err(e) => {
                let _ = reply.send(Err(e.into()));
                return;
            }
        };
        if let Err(mpsc::error::SendError(outgoing)) =
            outbox.send(Outgoing { frame, reply })
        {
            let _ = outgoing.reply.send(Err(ClientError::NotConnected));
        }
    }

    fn connect(&mut self, target: Target, reply: Reply<()>) {
        let url = match self.transport_url(&target) {
            Ok(url) => url,
            Err(e) => {
                tracing::warn!(%target, error = %e, "connect rejected");
                self.store.update(|v| v.error = Some(e.to_string()));
                let _ = reply.send(Err(e));
                return;
            }
        };

        // A fresh explicit connect starts a new failure streak.
        self.reconnect.reset();
        self.drop_link();

        let same_room = self
            .target
            .as_ref()
            .is_some_and(|current| current.room == target.room);
        if !same_room {
            self.store
                .update(|v| v.snapshot = Arc::new(SessionSnapshot::empty()));
        }
        self.target = Some(target.clone());

        self.dial(target, url, Some(reply));
    }

    /// Tears the session down in one uninterrupted step: cancel the
    /// reconnect timer, close the transport, drop the handler, reset the
    /// snapshot, and forget the target.
    fn disconnect(&mut self) {
        self.reconnect.reset();
        let closing = self.drop_link();
        self.handler = None;
        self.target = None;

        if let Some(id) = closing {
            self.link = Link::Closing { id };
        }
        self.store.update(|v| {
            v.phase = if closing.is_some() {
                ConnectionPhase::Closing
            } else {
                ConnectionPhase::Closed
            };
            v.target = None;
            v.connected = false;
            v.error = None;
            v.reconnect_attempts = 0;
            v.snapshot = Arc::new(SessionSnapshot::empty());
        });

        tracing::info!("session disconnected");
    }

    fn shutdown(&mut self) {
        self.disconnect();
        self.link = Link::Idle;
        self.store.update(|v| v.phase = ConnectionPhase::Idle);
    }

    // -----------------------------------------------------------------------
    // Dialing
    // -----------------------------------------------------------------------

    fn transport_url(&self, target: &Target) -> Result<String, ClientError> {
        let token = self
            .collab
            .tokens
            .token()
            .ok_or(ClientError::Unauthenticated)?;
        let url = self.collab.urls.build_url(&target.room, target.kind)?;
        Ok(with_token(&url, &token)?)
    }

    fn dial(&mut self, target: Target, url: String, reply: Option<Reply<()>>) {
        self.next_attempt += 1;
        let attempt = self.next_attempt;

        let dialer = Arc::clone(&self.dialer);
        let slot = Arc::clone(&self.slot);
        let events = self.events_tx.clone();
        let window = self.config.handshake_timeout;
        let task = tokio::spawn(async move {
            // Waits for the transport being replaced to finish closing.
            let Ok(permit) = slot.acquire_owned().await else {
                return;
            };
            let result = match time::timeout(window, dialer.dial(&url)).await {
                Ok(Ok(conn)) => Ok((conn, permit)),
                Ok(Err(e)) => Err(ClientError::Transport(e)),
                Err(_) => Err(ClientError::HandshakeTimeout(window)),
            };
            let _ = events.send(Event::Dialed { attempt, result });
        });

        tracing::info!(%target, attempt, "dialing");
        self.store.update(|v| {
            v.phase = ConnectionPhase::Connecting;
            v.target = Some(target.clone());
            v.connected = false;
        });
        self.link = Link::Dialing {
            attempt,
            target,
            task,
            reply,
        };
    }

    /// Empties the link. A pending dial is aborted and its caller told it
    /// was superseded; an open transport is closed in the background and
    /// keeps the slot permit until the close completes. Returns the id of
    /// the transport being closed.
    fn drop_link(&mut self) -> Option<ConnectionId> {
        match mem::replace(&mut self.link, Link::Idle) {
            Link::Idle | Link::Closing { .. } => None,
            Link::Dialing {
                attempt,
                task,
                reply,
                ..
            } => {
                task.abort();
                if let Some(reply) = reply {
                    let _ = reply.send(Err(ClientError::Superseded));
                }
                tracing::debug!(attempt, "pending dial abandoned");
                None
            }
            Link::Open {
                conn,
                permit,
                reader,
                writer,
                ..
            } => {
                reader.abort();
                writer.abort();
                Some(self.close_in_background(conn, permit))
            }
        }
    }

    /// Closes `conn`, bounded by the handshake window, and releases its
    /// slot permit afterwards.
    fn close_in_background(
        &self,
        conn: Arc<D::Connection>,
        permit: OwnedSemaphorePermit,
    ) -> ConnectionId {
        let id = conn.id();
        let events = self.events_tx.clone();
        let window = self.config.handshake_timeout;
        tokio::spawn(async move {
            let error = match time::timeout(window, conn.close()).await {
                Ok(result) => result.err(),
                Err(_) => {
                    tracing::warn!(%id, "close did not complete in time");
                    None
                }
            };
            drop(conn);
            drop(permit);
            let _ = events.send(Event::Closed { id, error });
        });
        tracing::debug!(%id, "closing transport");
        id
    }

    /// Writes queued frames in order until the link drops the outbox.
    fn spawn_writer(
        &self,
        conn: Arc<D::Connection>,
    ) -> (mpsc::UnboundedSender<Outgoing>, JoinHandle<()>) {
        let (outbox, mut queue) = mpsc::unbounded_channel::<Outgoing>();
        let writer = tokio::spawn(async move {
            while let Some(Outgoing { frame, reply }) = queue.recv().await {
                let result = conn.send(&frame).await.map_err(ClientError::from);
                let _ = reply.send(result);
            }
        });
        (outbox, writer)
    }

    fn spawn_reader(&self, conn: Arc<D::Connection>) -> JoinHandle<()> {
        let events = self.events_tx.clone();
        tokio::spawn(async move {
            let id = conn.id();
            loop {
                match conn.recv().await {
                    Ok(Some(data)) => {
                        if events.send(Event::Frame { id, data }).is_err() {
                            break;
                        }
                    }
                    Ok(None) => {
                        let _ = events.send(Event::Closed { id, error: None });
                        break;
                    }
                    Err(e) => {
                        let _ =
                            events.send(Event::Closed { id, error: Some(e) });
                        break;
                    }
                }
            }
        })
    }

    // -----------------------------------------------------------------------
    // Events
    // -----------------------------------------------------------------------

    fn handle_event(&mut self, event: Event<D::Connection>) {
        match event {
            Event::Dialed { attempt, result } => self.dialed(attempt, result),
            Event::Frame { id, data } => self.frame(id, &data),
            Event::Closed { id, error } => self.closed(id, error),
        }
    }

    fn dialed(
        &mut self,
        attempt: u64,
        result: Result<Slot<D::Connection>, ClientError>,
    ) {
        let current = matches!(
            &self.link,
            Link::Dialing { attempt: a, .. } if *a == attempt
        );
        if !current {
            tracing::debug!(attempt, "stale dial result");
            if let Ok((conn, permit)) = result {
                self.close_in_background(Arc::new(conn), permit);
            }
            return;
        }

        let Link::Dialing { target, reply, .. } =
            mem::replace(&mut self.link, Link::Idle)
        else {
            return;
        };

        match result {
            Ok((conn, permit)) => {
                let conn = Arc::new(conn);
                let id = conn.id();
                let reader = self.spawn_reader(Arc::clone(&conn));
                let (outbox, writer) = self.spawn_writer(Arc::clone(&conn));
                self.reconnect.reset();
                tracing::info!(%id, %target, "session open");
                self.store.update(|v| {
                    v.phase = ConnectionPhase::Open;
                    v.connected = true;
                    v.error = None;
                    v.reconnect_attempts = 0;
                });
                self.link = Link::Open {
                    conn,
                    permit,
                    target,
                    reader,
                    writer,
                    outbox,
                };
                if let Some(reply) = reply {
                    let _ = reply.send(Ok(()));
                }
            }
            Err(e) => {
                tracing::warn!(%target, attempt, error = %e, "dial failed");
                let message = e.to_string();
                self.store.update(|v| {
                    v.phase = ConnectionPhase::Closed;
                    v.connected = false;
                    v.error = Some(message);
                });
                if let Some(reply) = reply {
                    let _ = reply.send(Err(e));
                }
                self.schedule_reconnect(target);
            }
        }
    }

    fn frame(&mut self, id: ConnectionId, data: &[u8]) {
        let current = matches!(
            &self.link,
            Link::Open { conn, .. } if conn.id() == id
        );
        if !current {
            tracing::debug!(%id, "frame from stale transport dropped");
            return;
        }

        let event = match decode(data) {
            Ok(event) => event,
            Err(e) => {
                tracing::warn!(%id, error = %e, "dropping malformed frame");
                return;
            }
        };
        tracing::debug!(%id, kind = event.kind(), "frame received");

        let view = self.store.current();
        let Reconciled {
            snapshot,
            effects,
            ignored,
        } = apply(&event, &view.snapshot);

        match ignored {
            Some(reason) => tracing::debug!(%id, %reason, "event ignored"),
            None => {
                let snapshot = Arc::new(snapshot.stamped(unix_millis()));
                self.store.update(|v| v.snapshot = snapshot);
            }
        }

        for effect in effects {
            self.run_effect(effect);
        }

        if let Some(handler) = &self.handler {
            handler(&event);
        }
    }

    fn run_effect(&self, effect: Effect) {
        match effect {
            Effect::Navigate(route) => {
                tracing::info!(%route, "navigating");
                self.collab.navigator.navigate(&route);
            }
            Effect::ReportError { code, message } => {
                tracing::warn!(?code, %message, "server reported error");
                let text = match code {
                    Some(code) => format!("{code}: {message}"),
                    None => message,
                };
                self.store.update(|v| v.error = Some(text));
            }
        }
    }

    fn closed(&mut self, id: ConnectionId, error: Option<TransportError>) {
        match &self.link {
            Link::Open { conn, .. } if conn.id() == id => {}
            Link::Closing { id: closing } if *closing == id => {
                self.link = Link::Idle;
                tracing::debug!(%id, "transport closed");
                self.store.update(|v| v.phase = ConnectionPhase::Closed);
                return;
            }
            _ => {
                tracing::debug!(%id, "close from stale transport ignored");
                return;
            }
        }

        let Link::Open { target, writer, .. } =
            mem::replace(&mut self.link, Link::Idle)
        else {
            return;
        };
        writer.abort();

        match &error {
            Some(e) => tracing::warn!(%id, %target, error = %e, "transport lost"),
            None => tracing::info!(%id, %target, "transport closed by server"),
        }
        let message = error.map(|e| e.to_string());
        self.store.update(|v| {
            v.phase = ConnectionPhase::Closed;
            v.connected = false;
            if message.is_some() {
                v.error = message;
            }
        });

        if self.target.is_some() {
            self.schedule_reconnect(target);
        }
    }

    // -----------------------------------------------------------------------
    // Reconnect
    // -----------------------------------------------------------------------

    fn schedule_reconnect(&mut self, target: Target) {
        if self.target.as_ref() != Some(&target) {
            return;
        }
        match self.reconnect.schedule(target.clone()) {
            Ok(delay) => {
                let attempts = self.reconnect.retries();
                tracing::info!(
                    %target,
                    attempt = attempts,
                    delay_ms = delay.as_millis() as u64,
                    "reconnect scheduled"
                );
                self.store.update(|v| v.reconnect_attempts = attempts);
            }
            Err(e) => self.give_up(&target, ClientError::Reconnect(e)),
        }
    }

    fn reconnect_due(&mut self, target: Target) {
        if self.target.as_ref() != Some(&target) {
            tracing::debug!(%target, "reconnect for abandoned target skipped");
            return;
        }
        match self.transport_url(&target) {
            Ok(url) => {
                self.drop_link();
                self.dial(target, url, None);
            }
            Err(e) => self.give_up(&target, e),
        }
    }

    /// Stops retrying. The target is kept so a later explicit `connect`
    /// to the same room keeps the snapshot.
    fn give_up(&mut self, target: &Target, error: ClientError) {
        self.reconnect.cancel();
        tracing::warn!(%target, error = %error, "giving up on reconnect");
        let message = error.to_string();
        self.store.update(|v| {
            v.phase = ConnectionPhase::Closed;
            v.connected = false;
            v.error = Some(message);
        });
    }
}

fn unix_millis() -> u64 {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map(|d| d.as_millis() as u64)
        .unwrap_or_default()
}
