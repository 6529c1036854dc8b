//! Error taxonomy for the overlay core.
//!
//! None of these cross a session boundary as a panic or a `Result`: they are
//! reported to the session owner and the state machine either self-heals or
//! terminates the affected session.

use crate::lifecycle::HostId;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum OverlayError {
    /// Lifecycle or pointer events arrived outside the guaranteed order, or a
    /// second handoff was requested while one was already pending. The
    /// affected session is forcibly terminated when its own invariants are at
    /// risk.
    #[error("protocol violation on host {host:?}: {detail}")]
    ProtocolViolation { host: HostId, detail: String },

    /// A shadow window or media resource could not be constructed during a
    /// handoff. The handoff aborts; the original session stays dismissed until
    /// the caller re-shows it.
    #[error("resource unavailable for host {host:?}: {reason}")]
    ResourceUnavailable { host: HostId, reason: String },

    /// A geometry or visibility operation was requested with no resolvable
    /// host. Treated as a warning no-op, never a crash.
    #[error("no associated host for `{operation}`")]
    NoAssociatedHost { operation: &'static str },
}
