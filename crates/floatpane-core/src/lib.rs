//! Core services for Floatpane: the single-threaded event loop, the
//! process-wide host lifecycle registry, host-chain resolution, and the
//! shared geometry and error types.

pub mod error;
pub mod geometry;
pub mod host;
pub mod lifecycle;
pub mod runtime;

pub use error::OverlayError;
pub use geometry::{EdgeInsets, Point, Size, WindowGeometry};
pub use host::{resolve_host, ContextNode, HostRef};
pub use lifecycle::{
    HostDesc, HostId, HostKind, HostLifecycleListener, HostLifecycleRegistry, LifecycleStage,
    ListenerId,
};
pub use runtime::{Runtime, RuntimeHandle, TaskRegistration, WakeupScheduler};
