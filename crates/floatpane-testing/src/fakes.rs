//! Recording fakes for the window collaborators, plus a ready-made harness
//! wiring them to a runtime and a host world.

use crate::hosts::HostWorld;
use floatpane_core::{HostDesc, OverlayError, Runtime, Size, WindowGeometry};
use floatpane_window::{
    MediaEngine, OverlayWindow, Presentation, ScreenMode, SurfaceId, WindowEnv, WindowFactory,
};
use std::cell::{Cell, RefCell};
use std::rc::{Rc, Weak};

/// One sequenced call observed on the media engine.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum EngineCall {
    AttachSurface(SurfaceId),
    DetachSurface,
    Pause,
    Resume(bool),
}

/// Media engine fake that records the exact call sequence.
#[derive(Clone, Default)]
pub struct RecordingEngine {
    inner: Rc<EngineState>,
}

#[derive(Default)]
struct EngineState {
    calls: RefCell<Vec<EngineCall>>,
    attached: Cell<Option<SurfaceId>>,
    playing: Cell<bool>,
    prepared: Cell<bool>,
    video: Cell<Option<Size>>,
}

impl RecordingEngine {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn prepared() -> Self {
        let engine = Self::default();
        engine.inner.prepared.set(true);
        engine
    }

    pub fn set_prepared(&self, prepared: bool) {
        self.inner.prepared.set(prepared);
    }

    pub fn set_video_size(&self, size: Size) {
        self.inner.video.set(Some(size));
    }

    pub fn calls(&self) -> Vec<EngineCall> {
        self.inner.calls.borrow().clone()
    }

    pub fn clear_calls(&self) {
        self.inner.calls.borrow_mut().clear();
    }

    pub fn attached_surface(&self) -> Option<SurfaceId> {
        self.inner.attached.get()
    }

    pub fn is_playing(&self) -> bool {
        self.inner.playing.get()
    }
}

impl MediaEngine for RecordingEngine {
    fn attach_surface(&self, surface: SurfaceId) {
        self.inner.attached.set(Some(surface));
        self.inner
            .calls
            .borrow_mut()
            .push(EngineCall::AttachSurface(surface));
    }

    fn detach_surface(&self) {
        self.inner.attached.set(None);
        self.inner.calls.borrow_mut().push(EngineCall::DetachSurface);
    }

    fn pause(&self) {
        self.inner.playing.set(false);
        self.inner.calls.borrow_mut().push(EngineCall::Pause);
    }

    fn resume(&self, was_playing: bool) {
        self.inner.playing.set(was_playing);
        self.inner
            .calls
            .borrow_mut()
            .push(EngineCall::Resume(was_playing));
    }

    fn is_prepared(&self) -> bool {
        self.inner.prepared.get()
    }

    fn video_size(&self) -> Option<Size> {
        self.inner.video.get()
    }
}

/// Presentation fake exposing the last pushed state.
#[derive(Clone)]
pub struct RecordingPresentation {
    inner: Rc<PresentationState>,
}

struct PresentationState {
    surface: SurfaceId,
    visible: Cell<bool>,
    geometry: Cell<WindowGeometry>,
    rotation: Cell<f32>,
    mode: Cell<ScreenMode>,
}

impl RecordingPresentation {
    pub fn new(surface: SurfaceId) -> Self {
        Self {
            inner: Rc::new(PresentationState {
                surface,
                visible: Cell::new(false),
                geometry: Cell::new(WindowGeometry::default()),
                rotation: Cell::new(0.0),
                mode: Cell::new(ScreenMode::Default),
            }),
        }
    }

    pub fn geometry(&self) -> WindowGeometry {
        self.inner.geometry.get()
    }

    pub fn rotation(&self) -> f32 {
        self.inner.rotation.get()
    }

    pub fn mode(&self) -> ScreenMode {
        self.inner.mode.get()
    }
}

impl Presentation for RecordingPresentation {
    fn set_geometry(&self, geometry: WindowGeometry, rotation: f32) {
        self.inner.geometry.set(geometry);
        self.inner.rotation.set(rotation);
    }

    fn set_screen_mode(&self, mode: ScreenMode) {
        self.inner.mode.set(mode);
    }

    fn set_visible(&self, visible: bool) {
        self.inner.visible.set(visible);
    }

    fn is_visible(&self) -> bool {
        self.inner.visible.get()
    }

    fn surface(&self) -> SurfaceId {
        self.inner.surface
    }
}

/// A window built by the harness factory, kept for inspection.
#[derive(Clone)]
pub struct BuiltWindow {
    pub host: HostDesc,
    pub window: OverlayWindow,
    pub presentation: RecordingPresentation,
}

struct HarnessFactory {
    self_ref: Weak<HarnessFactory>,
    runtime: floatpane_core::RuntimeHandle,
    world: HostWorld,
    engine: RecordingEngine,
    screen: Size,
    next_surface: Cell<SurfaceId>,
    built: RefCell<Vec<BuiltWindow>>,
    fail_next: Cell<bool>,
}

impl WindowFactory for HarnessFactory {
    fn create_window(&self, host: HostDesc) -> Result<OverlayWindow, OverlayError> {
        if self.fail_next.replace(false) {
            return Err(OverlayError::ResourceUnavailable {
                host: host.id,
                reason: "window construction refused by test".into(),
            });
        }
        let surface = self.next_surface.get();
        self.next_surface.set(surface + 1);
        let presentation = RecordingPresentation::new(surface);
        let factory: Rc<dyn WindowFactory> = self
            .self_ref
            .upgrade()
            .expect("factory alive while creating windows");
        let env = WindowEnv {
            runtime: self.runtime.clone(),
            registry: self.world.registry(),
            engine: Rc::new(self.engine.clone()),
            presentation: Rc::new(presentation.clone()),
            factory,
            screen: self.screen,
        };
        let window = OverlayWindow::new(env, self.world.context_for(host));
        self.built.borrow_mut().push(BuiltWindow {
            host,
            window: window.clone(),
            presentation,
        });
        Ok(window)
    }
}

/// Everything a window integration test needs, wired together: runtime, host
/// world, shared recording engine, and a factory producing windows with fresh
/// recording presentations.
pub struct OverlayHarness {
    pub runtime: Runtime,
    pub world: HostWorld,
    pub engine: RecordingEngine,
    factory: Rc<HarnessFactory>,
}

impl OverlayHarness {
    pub fn new(screen: Size) -> Self {
        let runtime = Runtime::new();
        let world = HostWorld::new();
        let engine = RecordingEngine::prepared();
        let factory = Rc::new_cyclic(|self_ref| HarnessFactory {
            self_ref: self_ref.clone(),
            runtime: runtime.handle(),
            world: world.clone(),
            engine: engine.clone(),
            screen,
            next_surface: Cell::new(1),
            built: RefCell::new(Vec::new()),
            fail_next: Cell::new(false),
        });
        Self {
            runtime,
            world,
            engine,
            factory,
        }
    }

    /// Builds a window bound to `host` through the same factory handoffs use.
    pub fn window_for(&self, host: HostDesc) -> BuiltWindow {
        self.factory
            .create_window(host)
            .expect("harness factory does not fail unless asked");
        self.built().last().cloned().expect("just built")
    }

    /// Makes the next `create_window` fail with `ResourceUnavailable`.
    pub fn fail_next_create(&self) {
        self.factory.fail_next.set(true);
    }

    /// Every window the factory has built, in creation order.
    pub fn built(&self) -> Vec<BuiltWindow> {
        self.factory.built.borrow().clone()
    }

    /// Windows built after the given count, i.e. shadows created by handoffs.
    pub fn built_after(&self, count: usize) -> Vec<BuiltWindow> {
        self.factory.built.borrow()[count..].to_vec()
    }
}
