use spawneditor_core::{
    BridgeConfig, EditCommand, EditorSession, LogPresenceTransport, Position, PresenceBridge,
    PresenceSendError, PresenceSnapshot, PresenceState, PresenceTransport, SchemaConfig,
};
use std::sync::{Arc, Mutex};
use std::time::{Duration, Instant};

/// Transport double with scripted failures and a gate the test can hold to
/// keep a send in flight.
#[derive(Default)]
struct ScriptedTransport {
    handshake_failures: Mutex<u32>,
    send_failures: Mutex<u32>,
    gate: Mutex<()>,
    sent: Mutex<Vec<PresenceSnapshot>>,
}

impl ScriptedTransport {
    fn with_handshake_failures(count: u32) -> Self {
        Self {
            handshake_failures: Mutex::new(count),
            ..Self::default()
        }
    }

    fn with_send_failures(count: u32) -> Self {
        Self {
            send_failures: Mutex::new(count),
            ..Self::default()
        }
    }

    fn sent(&self) -> Vec<PresenceSnapshot> {
        self.sent.lock().unwrap().clone()
    }
}

impl PresenceTransport for ScriptedTransport {
    fn handshake(&self) -> Result<(), PresenceSendError> {
        let mut remaining = self.handshake_failures.lock().unwrap();
        if *remaining > 0 {
            *remaining -= 1;
            return Err(PresenceSendError::Unavailable("handshake refused".to_string()));
        }
        Ok(())
    }

    fn send(
        &self,
        snapshot: &PresenceSnapshot,
        _timeout: Duration,
    ) -> Result<(), PresenceSendError> {
        let _held = self.gate.lock().unwrap();
        let mut remaining = self.send_failures.lock().unwrap();
        if *remaining > 0 {
            *remaining -= 1;
            return Err(PresenceSendError::Timeout);
        }
        self.sent.lock().unwrap().push(snapshot.clone());
        Ok(())
    }
}

fn fast_config() -> BridgeConfig {
    BridgeConfig {
        send_timeout: Duration::from_millis(100),
        backoff_start: Duration::from_millis(10),
        backoff_cap: Duration::from_millis(40),
    }
}

fn snapshot(entry_count: usize) -> PresenceSnapshot {
    PresenceSnapshot {
        document_name: "spawns.json".to_string(),
        dirty: true,
        entry_count,
    }
}

fn wait_until(timeout: Duration, mut condition: impl FnMut() -> bool) -> bool {
    let deadline = Instant::now() + timeout;
    while Instant::now() < deadline {
        if condition() {
            return true;
        }
        std::thread::sleep(Duration::from_millis(5));
    }
    condition()
}

#[test]
fn successful_handshake_connects_the_bridge() {
    let transport = Arc::new(ScriptedTransport::default());
    let bridge = PresenceBridge::start(transport.clone(), fast_config());

    assert!(wait_until(Duration::from_secs(2), || bridge.state()
        == PresenceState::Connected));

    bridge.notify(snapshot(1));
    assert!(wait_until(Duration::from_secs(2), || !transport.sent().is_empty()));
    assert_eq!(transport.sent()[0], snapshot(1));
    bridge.close();
}

#[test]
fn unreachable_service_keeps_the_bridge_disconnected() {
    let transport = Arc::new(ScriptedTransport::with_handshake_failures(u32::MAX));
    let bridge = PresenceBridge::start(transport, fast_config());

    std::thread::sleep(Duration::from_millis(100));
    assert_eq!(bridge.state(), PresenceState::Disconnected);

    // Close must interrupt the backoff wait promptly.
    let started = Instant::now();
    bridge.close();
    assert!(started.elapsed() < Duration::from_secs(1));
}

#[test]
fn handshake_retries_until_the_service_appears() {
    let transport = Arc::new(ScriptedTransport::with_handshake_failures(3));
    let bridge = PresenceBridge::start(transport, fast_config());

    assert!(wait_until(Duration::from_secs(2), || bridge.state()
        == PresenceState::Connected));
    bridge.close();
}

#[test]
fn send_failure_degrades_then_next_success_reconnects() {
    let transport = Arc::new(ScriptedTransport::with_send_failures(1));
    // A wide retry delay keeps the Degraded window observable.
    let config = BridgeConfig {
        backoff_start: Duration::from_millis(150),
        ..fast_config()
    };
    let bridge = PresenceBridge::start(transport.clone(), config);
    assert!(wait_until(Duration::from_secs(2), || bridge.state()
        == PresenceState::Connected));

    bridge.notify(snapshot(1));
    assert!(wait_until(Duration::from_secs(2), || bridge.state()
        == PresenceState::Degraded));

    // The failed snapshot is retried after backoff and eventually lands.
    assert!(wait_until(Duration::from_secs(2), || bridge.state()
        == PresenceState::Connected));
    assert!(wait_until(Duration::from_secs(2), || !transport.sent().is_empty()));
    assert_eq!(transport.sent().last().unwrap(), &snapshot(1));
    bridge.close();
}

#[test]
fn rapid_updates_coalesce_to_the_latest_snapshot() {
    let transport = Arc::new(ScriptedTransport::default());
    let bridge = PresenceBridge::start(transport.clone(), fast_config());
    assert!(wait_until(Duration::from_secs(2), || bridge.state()
        == PresenceState::Connected));

    {
        let _held = transport.gate.lock().unwrap();
        for count in 1..=5 {
            bridge.notify(snapshot(count));
        }
        // Give the worker time to pick one snapshot and block on the gate.
        std::thread::sleep(Duration::from_millis(50));
    }

    assert!(wait_until(Duration::from_secs(2), || transport
        .sent()
        .last()
        .map(|last| last == &snapshot(5))
        .unwrap_or(false)));

    std::thread::sleep(Duration::from_millis(50));
    let sent = transport.sent();
    assert!(
        sent.len() <= 2,
        "expected coalesced sends, got {} of {:?}",
        sent.len(),
        sent
    );
    assert_eq!(sent.last().unwrap(), &snapshot(5));
    bridge.close();
}

#[test]
fn presence_failures_never_block_document_edits() {
    let transport = Arc::new(ScriptedTransport::with_send_failures(u32::MAX));
    let bridge = Arc::new(PresenceBridge::start(transport, fast_config()));

    let mut session = EditorSession::create("spawns.json", SchemaConfig::default());
    session.attach_presence(bridge.clone());

    let started = Instant::now();
    for index in 0..20 {
        session
            .execute(EditCommand::add_entry(
                "goblin",
                Position::new(index, index, 0),
            ))
            .unwrap();
    }
    assert!(started.elapsed() < Duration::from_secs(1));
    assert_eq!(session.engine().entry_count(), 20);

    assert!(wait_until(Duration::from_secs(2), || bridge.state()
        == PresenceState::Degraded));
    bridge.close();
}

#[test]
fn log_transport_baseline_connects_and_accepts_updates() {
    let bridge = PresenceBridge::with_default_config(Arc::new(LogPresenceTransport));
    assert!(wait_until(Duration::from_secs(2), || bridge.state()
        == PresenceState::Connected));
    bridge.notify(snapshot(2));
    bridge.close();
    assert_eq!(bridge.state(), PresenceState::Connected);
}

#[test]
fn close_is_idempotent() {
    let transport = Arc::new(ScriptedTransport::default());
    let bridge = PresenceBridge::start(transport, fast_config());
    bridge.close();
    bridge.close();
}
