//! Presence bridge: best-effort status pushes to an external service.
//!
//! # Responsibility
//! - Forward coalesced document snapshots to a `PresenceTransport` from a
//!   background worker.
//! - Track the Disconnected/Connected/Degraded state machine and retry
//!   failed sends with capped exponential backoff.
//!
//! # Invariants
//! - `notify` never blocks the editing path; a slow or failed send is
//!   invisible to document operations.
//! - At most one snapshot is queued at a time; newer snapshots replace
//!   older ones (coalescing).
//! - A send failure transitions to Degraded; the next success transitions
//!   back to Connected.

use crate::edit::DocumentObserver;
use crate::presence::snapshot::PresenceSnapshot;
use log::{error, info, warn};
use std::error::Error;
use std::fmt::{Display, Formatter};
use std::sync::{Arc, Condvar, Mutex, MutexGuard, PoisonError};
use std::thread::JoinHandle;
use std::time::Duration;

/// Health of the link to the external presence service.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PresenceState {
    /// No handshake has succeeded yet.
    Disconnected,
    /// Handshake done; the last send (if any) succeeded.
    Connected,
    /// The last send failed; retrying in the background.
    Degraded,
}

impl PresenceState {
    fn as_label(&self) -> &'static str {
        match self {
            Self::Disconnected => "disconnected",
            Self::Connected => "connected",
            Self::Degraded => "degraded",
        }
    }
}

/// Failure reported by a presence transport.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PresenceSendError {
    /// The external service is unreachable or rejected the payload.
    Unavailable(String),
    /// The send did not complete within the configured timeout.
    Timeout,
}

impl Display for PresenceSendError {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Unavailable(message) => write!(f, "presence service unavailable: {message}"),
            Self::Timeout => f.write_str("presence send timed out"),
        }
    }
}

impl Error for PresenceSendError {}

/// Outbound seam to the external presence service.
///
/// The concrete SDK binding lives outside this crate; any implementation
/// substitutes a different transport without touching the core.
pub trait PresenceTransport: Send + Sync {
    /// Opens the connection to the external service.
    fn handshake(&self) -> Result<(), PresenceSendError>;

    /// Pushes one status payload; must return within `timeout`.
    fn send(&self, snapshot: &PresenceSnapshot, timeout: Duration) -> Result<(), PresenceSendError>;
}

/// Baseline transport that records payloads in the application log.
///
/// Keeps the bridge exercisable without the external SDK present.
#[derive(Debug, Default)]
pub struct LogPresenceTransport;

impl PresenceTransport for LogPresenceTransport {
    fn handshake(&self) -> Result<(), PresenceSendError> {
        info!("event=presence_handshake module=presence status=ok transport=log");
        Ok(())
    }

    fn send(
        &self,
        snapshot: &PresenceSnapshot,
        _timeout: Duration,
    ) -> Result<(), PresenceSendError> {
        match serde_json::to_string(snapshot) {
            Ok(payload) => {
                info!("event=presence_update module=presence status=ok payload={payload}");
                Ok(())
            }
            Err(err) => Err(PresenceSendError::Unavailable(err.to_string())),
        }
    }
}

/// Worker tuning knobs.
#[derive(Debug, Clone, Copy)]
pub struct BridgeConfig {
    /// Budget for one outbound send before it counts as failed.
    pub send_timeout: Duration,
    /// First retry delay after a failure.
    pub backoff_start: Duration,
    /// Retry delay ceiling.
    pub backoff_cap: Duration,
}

impl Default for BridgeConfig {
    fn default() -> Self {
        Self {
            send_timeout: Duration::from_secs(2),
            backoff_start: Duration::from_millis(200),
            backoff_cap: Duration::from_secs(30),
        }
    }
}

struct Slot {
    pending: Option<PresenceSnapshot>,
    state: PresenceState,
    shutdown: bool,
}

struct Shared {
    transport: Arc<dyn PresenceTransport>,
    config: BridgeConfig,
    slot: Mutex<Slot>,
    wakeup: Condvar,
}

impl Shared {
    fn slot(&self) -> MutexGuard<'_, Slot> {
        self.slot.lock().unwrap_or_else(PoisonError::into_inner)
    }

    fn set_state(&self, next: PresenceState) {
        let mut slot = self.slot();
        if slot.state == next {
            return;
        }
        info!(
            "event=presence_state module=presence status=ok from={} to={}",
            slot.state.as_label(),
            next.as_label()
        );
        slot.state = next;
    }

    /// Sleeps up to `delay`, returning early when shutdown is requested.
    /// Returns true when the bridge should stop.
    fn wait_for_shutdown(&self, delay: Duration) -> bool {
        let slot = self.slot();
        let (slot, _timeout) = self
            .wakeup
            .wait_timeout_while(slot, delay, |slot| !slot.shutdown)
            .unwrap_or_else(PoisonError::into_inner);
        slot.shutdown
    }
}

/// Background channel from the edit engine to the presence service.
pub struct PresenceBridge {
    shared: Arc<Shared>,
    worker: Mutex<Option<JoinHandle<()>>>,
}

impl PresenceBridge {
    /// Starts the bridge worker. The bridge begins Disconnected and moves to
    /// Connected once the transport handshake succeeds.
    pub fn start(transport: Arc<dyn PresenceTransport>, config: BridgeConfig) -> Self {
        let shared = Arc::new(Shared {
            transport,
            config,
            slot: Mutex::new(Slot {
                pending: None,
                state: PresenceState::Disconnected,
                shutdown: false,
            }),
            wakeup: Condvar::new(),
        });

        let worker_shared = Arc::clone(&shared);
        let worker = match std::thread::Builder::new()
            .name("presence-bridge".to_string())
            .spawn(move || run_worker(&worker_shared))
        {
            Ok(handle) => Some(handle),
            Err(err) => {
                // Spawn failure leaves the bridge inert; edits proceed without it.
                error!(
                    "event=presence_worker_spawn module=presence status=error error={err}"
                );
                None
            }
        };

        Self {
            shared,
            worker: Mutex::new(worker),
        }
    }

    /// Starts a bridge with the default configuration.
    pub fn with_default_config(transport: Arc<dyn PresenceTransport>) -> Self {
        Self::start(transport, BridgeConfig::default())
    }

    /// Queues a snapshot for delivery, replacing any still-pending one.
    /// Never blocks on the transport.
    pub fn notify(&self, snapshot: PresenceSnapshot) {
        let mut slot = self.shared.slot();
        if slot.shutdown {
            return;
        }
        slot.pending = Some(snapshot);
        drop(slot);
        self.shared.wakeup.notify_all();
    }

    pub fn state(&self) -> PresenceState {
        self.shared.slot().state
    }

    /// Stops the worker and waits for it to finish. Idempotent.
    pub fn close(&self) {
        {
            let mut slot = self.shared.slot();
            slot.shutdown = true;
        }
        self.shared.wakeup.notify_all();

        let handle = self
            .worker
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .take();
        if let Some(handle) = handle {
            if handle.join().is_err() {
                error!("event=presence_worker_join module=presence status=error");
            }
        }
    }
}

impl DocumentObserver for PresenceBridge {
    fn document_changed(&self, snapshot: PresenceSnapshot) {
        self.notify(snapshot);
    }
}

impl Drop for PresenceBridge {
    fn drop(&mut self) {
        self.close();
    }
}

fn run_worker(shared: &Shared) {
    if !connect(shared) {
        return;
    }

    let mut backoff = shared.config.backoff_start;
    loop {
        let Some(snapshot) = next_snapshot(shared) else {
            return;
        };

        match shared.transport.send(&snapshot, shared.config.send_timeout) {
            Ok(()) => {
                shared.set_state(PresenceState::Connected);
                backoff = shared.config.backoff_start;
            }
            Err(err) => {
                shared.set_state(PresenceState::Degraded);
                warn!(
                    "event=presence_send_failed module=presence status=degraded error={err}"
                );
                requeue_if_idle(shared, snapshot);
                if shared.wait_for_shutdown(backoff) {
                    return;
                }
                backoff = next_backoff(backoff, shared.config.backoff_cap);
            }
        }
    }
}

/// Handshakes with retry until connected. Returns false on shutdown.
fn connect(shared: &Shared) -> bool {
    let mut backoff = shared.config.backoff_start;
    loop {
        if shared.slot().shutdown {
            return false;
        }
        match shared.transport.handshake() {
            Ok(()) => {
                shared.set_state(PresenceState::Connected);
                return true;
            }
            Err(err) => {
                warn!(
                    "event=presence_handshake_failed module=presence status=retrying error={err}"
                );
                if shared.wait_for_shutdown(backoff) {
                    return false;
                }
                backoff = next_backoff(backoff, shared.config.backoff_cap);
            }
        }
    }
}

/// Blocks until a snapshot is pending; returns None on shutdown.
fn next_snapshot(shared: &Shared) -> Option<PresenceSnapshot> {
    let slot = shared.slot();
    let mut slot = shared
        .wakeup
        .wait_while(slot, |slot| slot.pending.is_none() && !slot.shutdown)
        .unwrap_or_else(PoisonError::into_inner);
    if slot.shutdown {
        return None;
    }
    slot.pending.take()
}

/// Puts a failed snapshot back for retry unless a newer one already queued.
fn requeue_if_idle(shared: &Shared, snapshot: PresenceSnapshot) {
    let mut slot = shared.slot();
    if slot.pending.is_none() {
        slot.pending = Some(snapshot);
    }
}

fn next_backoff(current: Duration, cap: Duration) -> Duration {
    current.saturating_mul(2).min(cap)
}
