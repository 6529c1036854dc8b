//! Media engine collaborator contract and the exclusive ownership token.

use floatpane_core::Size;
use std::sync::atomic::{AtomicU64, Ordering};

/// Identifies the rendering surface a presentation exposes for video output.
pub type SurfaceId = u64;

/// Exclusive claim on the embedded media engine.
///
/// The handle is move-only: exactly one window session can hold it at any
/// instant, and a transfer is a plain move inside one lifecycle dispatch, so
/// no partially-transferred state is ever observable.
#[derive(Debug, PartialEq, Eq)]
pub struct MediaHandle {
    token: u64,
}

impl MediaHandle {
    pub fn new() -> Self {
        static NEXT_TOKEN: AtomicU64 = AtomicU64::new(1);
        Self {
            token: NEXT_TOKEN.fetch_add(1, Ordering::Relaxed),
        }
    }

    pub fn token(&self) -> u64 {
        self.token
    }
}

impl Default for MediaHandle {
    fn default() -> Self {
        Self::new()
    }
}

/// The embedded media engine. The core only sequences calls on this; decoding
/// and rendering live entirely behind it.
pub trait MediaEngine {
    fn attach_surface(&self, surface: SurfaceId);
    fn detach_surface(&self);
    fn pause(&self);
    /// `was_playing` restores the play/pause intent captured when the engine
    /// was last paused for a transition.
    fn resume(&self, was_playing: bool);
    fn is_prepared(&self) -> bool;
    /// Native video dimensions, once known. Used for aspect-fit sizing.
    fn video_size(&self) -> Option<Size> {
        None
    }
}
