//! Integration tests for the observable session state and collaborators.

use std::sync::{Arc, Mutex};

use partyline_protocol::{ConnectionKind, RoomId};
use partyline_room::SessionSnapshot;
use partyline_session::{
    ConnectionPhase, Endpoint, SessionStore, SessionView, Target, UrlBuilder,
    with_token,
};

// =========================================================================
// Helpers
// =========================================================================

type Log = Arc<Mutex<Vec<String>>>;

fn tagged(log: &Log, tag: &'static str) -> impl Fn(&SessionView) + Send + Sync + 'static {
    let log = Arc::clone(log);
    move |view| {
        log.lock()
            .unwrap()
            .push(format!("{tag}:{}", view.phase));
    }
}

// =========================================================================
// SessionStore
// =========================================================================

#[test]
fn test_subscribers_notified_in_subscription_order() {
    let store = SessionStore::new();
    let log: Log = Arc::default();
    let _a = store.subscribe(tagged(&log, "a"));
    let _b = store.subscribe(tagged(&log, "b"));
    let _c = store.subscribe(tagged(&log, "c"));
    log.lock().unwrap().clear();

    store.update(|v| v.phase = ConnectionPhase::Connecting);
    store.update(|v| v.phase = ConnectionPhase::Open);

    assert_eq!(
        *log.lock().unwrap(),
        vec![
            "a:connecting",
            "b:connecting",
            "c:connecting",
            "a:open",
            "b:open",
            "c:open",
        ]
    );
}

#[test]
fn test_late_subscriber_sees_existing_snapshot() {
    let store = SessionStore::new();
    let snapshot = SessionSnapshot::empty().stamped(42);
    store.update(|v| {
        v.phase = ConnectionPhase::Open;
        v.connected = true;
        v.target = Some(Target::new("R1", ConnectionKind::Lobby));
        v.snapshot = Arc::new(snapshot.clone());
    });

    let seen: Arc<Mutex<Option<SessionView>>> = Arc::default();
    let sink = Arc::clone(&seen);
    let _sub = store.subscribe(move |view| {
        *sink.lock().unwrap() = Some(view.clone());
    });

    let view = seen.lock().unwrap().clone().unwrap();
    assert!(view.connected);
    assert_eq!(view.last_update(), Some(42));
    assert_eq!(view.target.unwrap().room, RoomId::from("R1"));
}

#[test]
fn test_listener_may_read_current_and_unsubscribe_itself() {
    let store = SessionStore::new();
    let slot: Arc<Mutex<Option<partyline_session::Subscription>>> =
        Arc::default();
    let calls = Arc::new(Mutex::new(0u32));

    let reader = store.clone();
    let own = Arc::clone(&slot);
    let counter = Arc::clone(&calls);
    let sub = store.subscribe(move |view| {
        assert_eq!(reader.current().phase, view.phase);
        *counter.lock().unwrap() += 1;
        if view.phase == ConnectionPhase::Closed {
            own.lock().unwrap().take();
        }
    });
    *slot.lock().unwrap() = Some(sub);

    store.update(|v| v.phase = ConnectionPhase::Closed);
    store.update(|v| v.phase = ConnectionPhase::Idle);

    // initial + Closed; the Idle update happens after unsubscribing.
    assert_eq!(*calls.lock().unwrap(), 2);
    assert_eq!(store.subscriber_count(), 0);
}

#[test]
fn test_updates_from_another_thread_reach_subscribers() {
    let store = SessionStore::new();
    let log: Log = Arc::default();
    let _sub = store.subscribe(tagged(&log, "ui"));

    let writer = store.clone();
    std::thread::spawn(move || {
        writer.update(|v| v.phase = ConnectionPhase::Open);
    })
    .join()
    .unwrap();

    assert_eq!(*log.lock().unwrap(), vec!["ui:idle", "ui:open"]);
}

// =========================================================================
// URL building
// =========================================================================

#[test]
fn test_full_transport_url() {
    let endpoint = Endpoint::from_origin("https://party.example").unwrap();
    let url = endpoint
        .build_url(&RoomId::from("AB12"), ConnectionKind::Lobby)
        .unwrap();

    assert_eq!(
        with_token(&url, "jwt.part/two").unwrap(),
        "wss://party.example/ws/AB12?token=jwt.part%2Ftwo"
    );
}
