//! Presence bridge and its derived payloads.

mod bridge;
mod snapshot;

pub use bridge::{
    BridgeConfig, LogPresenceTransport, PresenceBridge, PresenceSendError, PresenceState,
    PresenceTransport,
};
pub use snapshot::PresenceSnapshot;
