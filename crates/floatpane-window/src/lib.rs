//! Floating overlay windows that survive host transitions.
//!
//! The window keeps rendering and keeps its media session alive while the
//! user navigates between screens: a lifecycle-driven handoff protocol clones
//! the window onto the new host, migrates the exclusive media ownership, and
//! reverses the transfer when the user comes back.

pub mod cache;
pub mod drag;
pub mod filter;
pub mod handoff;
pub mod media;
pub mod session;
pub mod transfer;

pub use cache::WindowCache;
pub use drag::FloatingDragHandler;
pub use filter::FilterSets;
pub use media::{MediaEngine, MediaHandle, SurfaceId};
pub use session::{
    DisplayLayer, OverlayWindow, Presentation, ScreenMode, WindowEnv, WindowFactory,
    WindowObserver,
};
pub use transfer::TransferPayload;
