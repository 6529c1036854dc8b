//! Snapshot moved between window sessions during a handoff.

use crate::filter::FilterSets;
use crate::media::MediaHandle;
use crate::session::ScreenMode;
use floatpane_core::WindowGeometry;

/// Immutable-at-transfer-time bundle produced by the source session and
/// consumed exactly once by the destination. The payload is move-only, and
/// `media` is a move-only token, so producing it clears the source's
/// ownership and consuming it cannot happen twice.
#[derive(Debug)]
pub struct TransferPayload {
    pub geometry: WindowGeometry,
    pub screen_mode: ScreenMode,
    pub media: Option<MediaHandle>,
    /// Whether playback was active before the source paused it for the
    /// transfer.
    pub playback_was_active: bool,
    pub filters: FilterSets,
}
