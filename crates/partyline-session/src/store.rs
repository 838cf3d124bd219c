//! The observable session state.
//!
//! [`SessionStore`] holds one immutable [`SessionView`] at a time. Every
//! change builds a new view, swaps it in, and then calls each subscriber
//! synchronously, in subscription order, with the new view.
//!
//! # Locking
//!
//! Two locks are involved. `state` guards the current view and the listener
//! list and is never held while user code runs. `delivery` serializes
//! notification so that views reach every listener in the order they were
//! published, including the initial view handed to a new subscriber.
//!
//! Because of `delivery`, a listener must not call [`SessionStore::update`]
//! or [`SessionStore::subscribe`] on the store that is notifying it.
//! Reading [`SessionStore::current`] or dropping a [`Subscription`] from a
//! listener is fine.

use std::fmt;
use std::sync::{Arc, Mutex, MutexGuard, PoisonError, Weak};

use partyline_protocol::{ConnectionKind, RoomId};
use partyline_room::SessionSnapshot;

// ---------------------------------------------------------------------------
// View types
// ---------------------------------------------------------------------------

/// Where the session is (or was last) connected.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct Target {
    pub room: RoomId,
    pub kind: ConnectionKind,
}

impl Target {
    pub fn new(room: impl Into<RoomId>, kind: ConnectionKind) -> Self {
        Self {
            room: room.into(),
            kind,
        }
    }
}

impl fmt::Display for Target {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}/{}", self.kind, self.room)
    }
}

/// Lifecycle of the session's connection.
///
/// ```text
/// Idle ──connect──→ Connecting ──open──→ Open
///                    ▲      │ fail         │ lost
///              retry │      ▼              │
///                    └─── Closed ←─────────┘
///
/// any ──disconnect──→ Closing ──transport gone──→ Closed
/// ```
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum ConnectionPhase {
    /// Never connected, or disposed.
    #[default]
    Idle,
    /// A dial is in flight (initial attempt or reconnect).
    Connecting,
    /// The transport is open and frames are flowing.
    Open,
    /// A deliberate disconnect is tearing the transport down.
    Closing,
    /// No transport. A reconnect may be pending.
    Closed,
}

impl fmt::Display for ConnectionPhase {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Self::Idle => "idle",
            Self::Connecting => "connecting",
            Self::Open => "open",
            Self::Closing => "closing",
            Self::Closed => "closed",
        })
    }
}

/// Everything a subscriber can observe about a session.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct SessionView {
    pub phase: ConnectionPhase,
    /// The room the session is bound to. `None` after a disconnect.
    pub target: Option<Target>,
    pub connected: bool,
    /// The last connection-level or server-reported error, cleared on a
    /// successful open.
    pub error: Option<String>,
    /// Consecutive reconnect attempts since the last successful open.
    pub reconnect_attempts: u32,
    pub snapshot: Arc<SessionSnapshot>,
}

impl SessionView {
    /// Unix milliseconds of the last frame applied to the snapshot.
    pub fn last_update(&self) -> Option<u64> {
        self.snapshot.last_update
    }
}

// ---------------------------------------------------------------------------
// Store
// ---------------------------------------------------------------------------

type Listener = Arc<dyn Fn(&SessionView) + Send + Sync>;

struct State {
    view: Arc<SessionView>,
    listeners: Vec<(u64, Listener)>,
    next_id: u64,
}

struct Shared {
    state: Mutex<State>,
    delivery: Mutex<()>,
}

/// Publish/subscribe holder of the latest [`SessionView`].
///
/// Cheap to clone; clones share the same view and subscribers.
#[derive(Clone)]
pub struct SessionStore {
    shared: Arc<Shared>,
}

impl Default for SessionStore {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Debug for SessionStore {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let state = self.state();
        f.debug_struct("SessionStore")
            .field("view", &state.view)
            .field("listeners", &state.listeners.len())
            .finish()
    }
}

impl SessionStore {
    pub fn new() -> Self {
        Self {
            shared: Arc::new(Shared {
                state: Mutex::new(State {
                    view: Arc::new(SessionView::default()),
                    listeners: Vec::new(),
                    next_id: 0,
                }),
                delivery: Mutex::new(()),
            }),
        }
    }

    /// The latest view.
    pub fn current(&self) -> Arc<SessionView> {
        Arc::clone(&self.state().view)
    }

    /// Publishes a new view derived from the current one and notifies every
    /// subscriber with it. Returns the published view.
    pub fn update<F>(&self, f: F) -> Arc<SessionView>
    where
        F: FnOnce(&mut SessionView),
    {
        let _delivery = self.delivery();

        let (view, listeners) = {
            let mut state = self.state();
            let mut next = SessionView::clone(&state.view);
            f(&mut next);
            let next = Arc::new(next);
            state.view = Arc::clone(&next);
            let listeners: Vec<Listener> =
                state.listeners.iter().map(|(_, l)| Arc::clone(l)).collect();
            (next, listeners)
        };

        for listener in &listeners {
            listener(&view);
        }
        view
    }

    /// Registers `listener` and immediately calls it with the current view.
    ///
    /// The listener stays registered until the returned [`Subscription`] is
    /// dropped or [`detached`](Subscription::detach).
    pub fn subscribe<F>(&self, listener: F) -> Subscription
    where
        F: Fn(&SessionView) + Send + Sync + 'static,
    {
        let _delivery = self.delivery();

        let listener: Listener = Arc::new(listener);
        let (id, view) = {
            let mut state = self.state();
            let id = state.next_id;
            state.next_id += 1;
            state.listeners.push((id, Arc::clone(&listener)));
            (id, Arc::clone(&state.view))
        };

        listener(&view);

        Subscription {
            id,
            shared: Some(Arc::downgrade(&self.shared)),
        }
    }

    /// Number of registered listeners.
    pub fn subscriber_count(&self) -> usize {
        self.state().listeners.len()
    }

    fn state(&self) -> MutexGuard<'_, State> {
        self.shared
            .state
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
    }

    fn delivery(&self) -> MutexGuard<'_, ()> {
        self.shared
            .delivery
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
    }
}

/// Handle returned by [`SessionStore::subscribe`]. Dropping it unsubscribes.
#[must_use = "dropping a Subscription unsubscribes immediately"]
pub struct Subscription {
    id: u64,
    shared: Option<Weak<Shared>>,
}

impl Subscription {
    /// Removes the listener. Equivalent to dropping the handle.
    pub fn unsubscribe(self) {}

    /// Keeps the listener registered for the lifetime of the store.
    pub fn detach(mut self) {
        self.shared = None;
    }
}

impl fmt::Debug for Subscription {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Subscription")
            .field("id", &self.id)
            .field("attached", &self.shared.is_some())
            .finish()
    }
}

impl Drop for Subscription {
    fn drop(&mut self) {
        let Some(shared) = self.shared.take().and_then(|w| w.upgrade()) else {
            return;
        };
        let mut state =
            shared.state.lock().unwrap_or_else(PoisonError::into_inner);
        state.listeners.retain(|(id, _)| *id != self.id);
    }
}
