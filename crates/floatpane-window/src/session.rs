//! Overlay window session state.
//!
//! An [`OverlayWindow`] is a cheap cloneable handle onto one per-host session:
//! geometry, screen mode, filter sets, visibility, and (at most) the exclusive
//! media ownership token. Lifecycle reactions and the handoff protocol live in
//! the session's [`crate::handoff::HandoffController`]; this module is the
//! state it drives.

use crate::filter::FilterSets;
use crate::handoff::HandoffController;
use crate::media::{MediaEngine, MediaHandle, SurfaceId};
use crate::transfer::TransferPayload;
use floatpane_core::{
    EdgeInsets, HostDesc, HostId, HostKind, HostLifecycleRegistry, HostRef, OverlayError,
    RuntimeHandle, Size, WindowGeometry,
};
use std::cell::{Cell, RefCell};
use std::rc::Rc;

/// Fractions of the screen used when sizing the window per mode.
const DEFAULT_WIDTH_FRACTION: f32 = 0.6;
const DEFAULT_HEIGHT_FRACTION: f32 = 0.3;
const MIN_WIDTH_FRACTION: f32 = 0.2;
const MIN_HEIGHT_FRACTION: f32 = 0.1;

#[derive(Clone, Copy, Debug, PartialEq, Eq, Default)]
pub enum ScreenMode {
    #[default]
    Default,
    Minimized,
    Maximized,
}

/// How the window is attached to the display stack. A system-overlay window
/// floats above every host and never participates in handoffs.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Default)]
pub enum DisplayLayer {
    #[default]
    Hosted,
    SystemOverlay,
}

/// Rendering/layout sink for one window. The core pushes geometry and mode
/// changes into it and reads back only visibility and the media surface.
pub trait Presentation {
    fn set_geometry(&self, geometry: WindowGeometry, rotation: f32);
    fn set_screen_mode(&self, mode: ScreenMode);
    fn set_visible(&self, visible: bool);
    fn is_visible(&self) -> bool;
    fn surface(&self) -> SurfaceId;
}

/// Owner-facing notifications forwarded from the lifecycle protocol.
pub trait WindowObserver {
    fn on_host_started(&self, _host: HostId) {}
    fn on_host_resumed(&self, _host: HostId) {}
    fn on_host_paused(&self, _host: HostId) {}
    fn on_host_destroyed(&self, _host: HostId) {}
    fn on_error(&self, _error: &OverlayError) {}
}

/// Capability for building the destination-side window during a handoff,
/// injected at construction instead of any runtime type lookup.
pub trait WindowFactory {
    fn create_window(&self, host: HostDesc) -> Result<OverlayWindow, OverlayError>;
}

/// Everything a window needs from its embedder.
#[derive(Clone)]
pub struct WindowEnv {
    pub runtime: RuntimeHandle,
    pub registry: HostLifecycleRegistry,
    pub engine: Rc<dyn MediaEngine>,
    pub presentation: Rc<dyn Presentation>,
    pub factory: Rc<dyn WindowFactory>,
    /// Full extents of the screen the window floats over.
    pub screen: Size,
}

#[derive(Clone)]
pub struct OverlayWindow {
    inner: Rc<WindowInner>,
}

pub(crate) struct WindowInner {
    pub(crate) env: WindowEnv,
    context: RefCell<HostRef>,
    pub(crate) host: Cell<Option<HostDesc>>,
    geometry: Cell<WindowGeometry>,
    rotation: Cell<f32>,
    screen_mode: Cell<ScreenMode>,
    pub(crate) border: Cell<EdgeInsets>,
    pub(crate) filters: RefCell<FilterSets>,
    pub(crate) layer: Cell<DisplayLayer>,
    pub(crate) showing: Cell<bool>,
    /// Play/pause intent, preserved across transitions.
    pub(crate) started: Cell<bool>,
    pub(crate) media: RefCell<Option<MediaHandle>>,
    observer: RefCell<Option<Rc<dyn WindowObserver>>>,
    controller: RefCell<Option<Rc<HandoffController>>>,
}

impl core::fmt::Debug for OverlayWindow {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        f.debug_struct("OverlayWindow").finish_non_exhaustive()
    }
}

impl OverlayWindow {
    pub fn new(env: WindowEnv, context: HostRef) -> Self {
        let geometry = initial_geometry(env.screen, EdgeInsets::default());
        let inner = Rc::new(WindowInner {
            env,
            context: RefCell::new(context),
            host: Cell::new(None),
            geometry: Cell::new(geometry),
            rotation: Cell::new(0.0),
            screen_mode: Cell::new(ScreenMode::Default),
            border: Cell::new(EdgeInsets::default()),
            filters: RefCell::new(FilterSets::new()),
            layer: Cell::new(DisplayLayer::Hosted),
            showing: Cell::new(false),
            started: Cell::new(false),
            media: RefCell::new(None),
            observer: RefCell::new(None),
            controller: RefCell::new(None),
        });
        let controller = HandoffController::new(&inner);
        *inner.controller.borrow_mut() = Some(controller);
        Self { inner }
    }

    /// Resolves the associated host and brings the window up: presentation
    /// visible, geometry pushed, media surface attached when owning, and the
    /// session registered for lifecycle events. A no-op with a reported
    /// warning when no host resolves.
    pub fn show(&self) {
        let controller = self.inner.controller();
        if controller.is_terminated() {
            log::warn!("show on a terminated window is ignored");
            return;
        }
        if controller.is_pending() {
            log::warn!("show ignored while a handoff is in flight");
            return;
        }
        let Some(host) = self.inner.context.borrow().resolve() else {
            self.inner
                .report(OverlayError::NoAssociatedHost { operation: "show" });
            return;
        };
        self.inner.show_presentation();
        controller.bind(host);
    }

    /// User-driven dismissal: tears the session down for good.
    pub fn dismiss(&self) {
        self.inner.controller().terminate("dismissed by owner");
    }

    /// Grants this session the exclusive media ownership token.
    pub fn adopt_media(&self, handle: MediaHandle) {
        *self.inner.media.borrow_mut() = Some(handle);
        if self.inner.showing.get() {
            self.inner.attach_media_if_owning();
        }
    }

    pub fn owns_media(&self) -> bool {
        self.inner.media.borrow().is_some()
    }

    /// Current play/pause intent (survives handoffs as `playback_was_active`).
    pub fn playback_started(&self) -> bool {
        self.inner.started.get()
    }

    /// Play/pause control; the intent survives handoffs.
    pub fn set_playback(&self, play: bool) {
        self.inner.started.set(play);
        if self.inner.media.borrow().is_some() {
            if play {
                if self.inner.env.engine.is_prepared() {
                    self.inner.env.engine.resume(true);
                }
            } else {
                self.inner.env.engine.pause();
            }
        }
    }

    pub fn set_observer(&self, observer: Rc<dyn WindowObserver>) {
        *self.inner.observer.borrow_mut() = Some(observer);
    }

    pub fn set_layer(&self, layer: DisplayLayer) {
        self.inner.layer.set(layer);
    }

    // ------------------------------------------------------------------
    // Geometry
    // ------------------------------------------------------------------

    pub fn geometry(&self) -> WindowGeometry {
        self.inner.geometry.get()
    }

    pub fn rotation(&self) -> f32 {
        self.inner.rotation.get()
    }

    pub fn set_geometry(&self, geometry: WindowGeometry) {
        self.inner.geometry.set(geometry);
        self.inner.push_geometry();
    }

    pub fn move_by(&self, dx: f32, dy: f32) {
        let mut geometry = self.inner.geometry.get();
        geometry.x += dx;
        geometry.y += dy;
        self.inner.geometry.set(geometry);
        self.inner.push_geometry();
    }

    /// Pinch resize around the window center, clamped between the minimized
    /// footprint and the full screen.
    pub fn scale_by(&self, factor: f32) {
        if !factor.is_finite() || factor <= 0.0 {
            return;
        }
        let screen = self.inner.env.screen;
        let mut geometry = self.inner.geometry.get();
        let new_width =
            (geometry.width * factor).clamp(screen.width * MIN_WIDTH_FRACTION, screen.width);
        let new_height =
            (geometry.height * factor).clamp(screen.height * MIN_HEIGHT_FRACTION, screen.height);
        geometry.x -= (new_width - geometry.width) / 2.0;
        geometry.y -= (new_height - geometry.height) / 2.0;
        geometry.width = new_width;
        geometry.height = new_height;
        self.inner.geometry.set(geometry);
        self.inner.push_geometry();
    }

    /// Settles the window onto the nearest horizontal edge and clamps it
    /// vertically inside the border insets.
    pub fn snap_to_border(&self) {
        let screen = self.inner.env.screen;
        let border = self.inner.border.get();
        let mut geometry = self.inner.geometry.get();
        geometry.x = if geometry.x + geometry.width / 2.0 > screen.width / 2.0 {
            screen.width - geometry.width - border.right
        } else {
            border.left
        };
        geometry.y = if geometry.y + geometry.height > screen.height - border.bottom {
            screen.height - geometry.height - border.bottom
        } else if geometry.y < border.top {
            border.top
        } else {
            geometry.y
        };
        self.inner.geometry.set(geometry);
        self.inner.push_geometry();
    }

    /// Throws the window toward the fling's horizontal edge; the snap clamps
    /// it back inside the border.
    pub fn fling_toward(&self, velocity_x: f32) {
        let screen = self.inner.env.screen;
        let mut geometry = self.inner.geometry.get();
        geometry.x = if velocity_x > 0.0 {
            screen.width
        } else {
            -geometry.width
        };
        self.inner.geometry.set(geometry);
        self.snap_to_border();
    }

    pub fn set_border(&self, border: EdgeInsets) {
        self.inner.border.set(border);
        if self.inner.showing.get() && self.inner.screen_mode.get() != ScreenMode::Maximized {
            self.snap_to_border();
        }
    }

    /// Recomputes geometry for the requested mode: aspect-fit against the
    /// engine's video size, centered when maximized (rotated 90° for
    /// landscape video), snapped to the border otherwise.
    pub fn set_screen_mode(&self, mode: ScreenMode) {
        let inner = &self.inner;
        let screen = inner.env.screen;
        let bounds = match mode {
            ScreenMode::Maximized => screen,
            ScreenMode::Minimized => Size::new(
                screen.width * MIN_WIDTH_FRACTION,
                screen.height * MIN_HEIGHT_FRACTION,
            ),
            ScreenMode::Default => Size::new(
                screen.width * DEFAULT_WIDTH_FRACTION,
                screen.height * DEFAULT_HEIGHT_FRACTION,
            ),
        };
        let video = inner.env.engine.video_size();
        let rotate = mode == ScreenMode::Maximized
            && video.map(|v| v.width > v.height).unwrap_or(false);
        let bounds = if rotate { bounds.transposed() } else { bounds };
        let size = aspect_fit(video, bounds);

        let mut geometry = inner.geometry.get();
        geometry.width = size.width;
        geometry.height = size.height;
        if mode == ScreenMode::Maximized {
            geometry.x = if rotate {
                (screen.width - size.width) / 2.0
            } else {
                0.0
            };
            geometry.y = (screen.height - size.height) / 2.0;
        }
        inner.geometry.set(geometry);
        inner.rotation.set(if rotate { 90.0 } else { 0.0 });
        inner.screen_mode.set(mode);
        inner.env.presentation.set_screen_mode(mode);
        inner.push_geometry();
        if mode != ScreenMode::Maximized {
            self.snap_to_border();
        }
    }

    // ------------------------------------------------------------------
    // Filters
    // ------------------------------------------------------------------

    pub fn filters(&self) -> FilterSets {
        self.inner.filters.borrow().clone()
    }

    pub fn add_blacklisted(&self, kind: HostKind) {
        self.inner.filters.borrow_mut().add_blacklisted(kind);
    }

    pub fn add_intercepted(&self, kind: HostKind) {
        self.inner.filters.borrow_mut().add_intercepted(kind);
    }

    pub fn remove_blacklisted(&self, kind: HostKind) -> bool {
        self.inner.filters.borrow_mut().remove_blacklisted(kind)
    }

    pub fn remove_intercepted(&self, kind: HostKind) -> bool {
        self.inner.filters.borrow_mut().remove_intercepted(kind)
    }

    // ------------------------------------------------------------------
    // Introspection
    // ------------------------------------------------------------------

    pub fn screen_mode(&self) -> ScreenMode {
        self.inner.screen_mode.get()
    }

    pub fn is_showing(&self) -> bool {
        self.inner.showing.get()
    }

    pub fn is_registered(&self) -> bool {
        self.inner.controller().is_registered()
    }

    pub fn is_handoff_pending(&self) -> bool {
        self.inner.controller().is_pending()
    }

    pub fn is_terminated(&self) -> bool {
        self.inner.controller().is_terminated()
    }

    pub fn host(&self) -> Option<HostDesc> {
        self.inner.host.get()
    }

    pub(crate) fn inner(&self) -> &Rc<WindowInner> {
        &self.inner
    }
}

impl WindowInner {
    pub(crate) fn controller(&self) -> Rc<HandoffController> {
        self.controller
            .borrow()
            .clone()
            .expect("controller installed at construction")
    }

    pub(crate) fn show_presentation(&self) {
        self.showing.set(true);
        self.env.presentation.set_screen_mode(self.screen_mode.get());
        self.push_geometry();
        self.env.presentation.set_visible(true);
        self.attach_media_if_owning();
    }

    pub(crate) fn hide_presentation(&self) {
        self.showing.set(false);
        self.env.presentation.set_visible(false);
    }

    pub(crate) fn push_geometry(&self) {
        self.env
            .presentation
            .set_geometry(self.geometry.get(), self.rotation.get());
    }

    pub(crate) fn attach_media_if_owning(&self) {
        if self.media.borrow().is_some() {
            self.env.engine.attach_surface(self.env.presentation.surface());
            if self.env.engine.is_prepared() {
                self.env.engine.resume(self.started.get());
            }
        }
    }

    /// Pauses playback, detaches the surface, and packages everything the
    /// destination session needs. Clears this session's media ownership.
    pub(crate) fn begin_transfer(&self) -> TransferPayload {
        let playback_was_active = self.started.get();
        let media = self.media.borrow_mut().take();
        if media.is_some() {
            self.env.engine.pause();
            self.env.engine.detach_surface();
            self.started.set(false);
        }
        TransferPayload {
            geometry: self.geometry.get(),
            screen_mode: self.screen_mode.get(),
            media,
            playback_was_active,
            filters: self.filters.borrow().clone(),
        }
    }

    /// Consumes a payload: geometry, mode, filters (union), playback intent,
    /// and media ownership move over in one step.
    pub(crate) fn adopt_transfer(&self, payload: TransferPayload) {
        self.geometry.set(payload.geometry);
        self.screen_mode.set(payload.screen_mode);
        self.filters.borrow_mut().union(&payload.filters);
        self.started.set(payload.playback_was_active);
        if let Some(handle) = payload.media {
            *self.media.borrow_mut() = Some(handle);
        }
        if self.showing.get() {
            self.env.presentation.set_screen_mode(self.screen_mode.get());
            self.push_geometry();
            self.attach_media_if_owning();
        }
    }

    /// Drops media ownership entirely (termination path).
    pub(crate) fn release_media(&self) {
        if self.media.borrow_mut().take().is_some() {
            self.env.engine.pause();
            self.env.engine.detach_surface();
        }
    }

    pub(crate) fn report(&self, error: OverlayError) {
        log::warn!("{error}");
        if let Some(observer) = self.observer_rc() {
            observer.on_error(&error);
        }
    }

    pub(crate) fn observer_rc(&self) -> Option<Rc<dyn WindowObserver>> {
        self.observer.borrow().clone()
    }

    pub(crate) fn notify_started(&self, host: HostId) {
        if let Some(observer) = self.observer_rc() {
            observer.on_host_started(host);
        }
    }

    pub(crate) fn notify_resumed(&self, host: HostId) {
        if let Some(observer) = self.observer_rc() {
            observer.on_host_resumed(host);
        }
    }

    pub(crate) fn notify_paused(&self, host: HostId) {
        if let Some(observer) = self.observer_rc() {
            observer.on_host_paused(host);
        }
    }

    pub(crate) fn notify_destroyed(&self, host: HostId) {
        if let Some(observer) = self.observer_rc() {
            observer.on_host_destroyed(host);
        }
    }
}

fn initial_geometry(screen: Size, border: EdgeInsets) -> WindowGeometry {
    WindowGeometry {
        x: border.left,
        y: border.top,
        width: screen.width * DEFAULT_WIDTH_FRACTION,
        height: screen.height * DEFAULT_HEIGHT_FRACTION,
    }
}

/// Largest size with the video's aspect ratio that fits inside `bounds`.
/// Unknown or degenerate video dimensions fall back to the bounds.
fn aspect_fit(video: Option<Size>, bounds: Size) -> Size {
    let Some(video) = video else { return bounds };
    if video.width <= 0.0 || video.height <= 0.0 {
        log::warn!("unusable video dimensions {video:?}");
        return bounds;
    }
    let w = video.width * bounds.height;
    let h = video.height * bounds.width;
    if w < h {
        Size::new(w / video.height, bounds.height)
    } else if w > h {
        Size::new(bounds.width, h / video.width)
    } else {
        bounds
    }
}
