//! Ownership handoff across host transitions.
//!
//! Each window owns one controller, registered on the host lifecycle registry
//! while the window is alive on screen. When a foreign host is created the
//! controller builds a shadow window there, moves the transfer payload (and
//! with it the exclusive media ownership) across, and hides the source. When
//! the original host comes back the transfer is reversed and the shadow is
//! discarded; if the user dismissed the shadow in the meantime the handoff is
//! aborted and the original stays hidden until re-shown.
//!
//! Everything here runs synchronously inside one lifecycle dispatch, except
//! the unregister-after-destroy, which is deferred one loop tick so
//! notifications still in flight for the dying host are delivered first.

use crate::session::{DisplayLayer, OverlayWindow, WindowInner};
use floatpane_core::{
    HostDesc, HostLifecycleListener, HostLifecycleRegistry, LifecycleStage, ListenerId,
    OverlayError, RuntimeHandle, TaskRegistration,
};
use std::cell::{Cell, RefCell};
use std::rc::{Rc, Weak};

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
enum Phase {
    /// Not registered; hidden.
    Idle,
    /// Registered for lifecycle events. `showing` may still be false
    /// (blacklisted host, or an aborted shadow construction).
    Bound,
    /// A shadow window holds the payload; we are hidden but registered,
    /// waiting for our host to come back.
    Pending,
    Terminated,
}

pub(crate) struct HandoffController {
    self_ref: Weak<HandoffController>,
    window: Weak<WindowInner>,
    registry: HostLifecycleRegistry,
    runtime: RuntimeHandle,
    phase: Cell<Phase>,
    pending: RefCell<Option<OverlayWindow>>,
    registration: Cell<Option<ListenerId>>,
    last_stage: Cell<Option<LifecycleStage>>,
    deferred_unregister: RefCell<Option<TaskRegistration>>,
}

impl HandoffController {
    pub(crate) fn new(window: &Rc<WindowInner>) -> Rc<Self> {
        Rc::new_cyclic(|self_ref| Self {
            self_ref: self_ref.clone(),
            window: Rc::downgrade(window),
            registry: window.env.registry.clone(),
            runtime: window.env.runtime.clone(),
            phase: Cell::new(Phase::Idle),
            pending: RefCell::new(None),
            registration: Cell::new(None),
            last_stage: Cell::new(None),
            deferred_unregister: RefCell::new(None),
        })
    }

    pub(crate) fn is_registered(&self) -> bool {
        self.registration.get().is_some()
    }

    pub(crate) fn is_pending(&self) -> bool {
        self.phase.get() == Phase::Pending
    }

    pub(crate) fn is_terminated(&self) -> bool {
        self.phase.get() == Phase::Terminated
    }

    /// Associates the window with `host` and registers for lifecycle events.
    /// Idempotent while already registered.
    pub(crate) fn bind(&self, host: HostDesc) {
        let Some(window) = self.window.upgrade() else {
            return;
        };
        window.host.set(Some(host));
        if self.registration.get().is_none() {
            if let Some(this) = self.self_ref.upgrade() {
                let id = self.registry.register(this);
                self.registration.set(Some(id));
            }
        }
        if self.phase.get() == Phase::Idle {
            self.phase.set(Phase::Bound);
        }
    }

    fn unbind(&self) {
        if let Some(id) = self.registration.take() {
            self.registry.unregister(id);
        }
    }

    /// Full teardown: hides the presentation, drops media ownership, and
    /// unregisters. A pending shadow keeps running standalone; only the
    /// reference to it is dropped.
    pub(crate) fn terminate(&self, reason: &str) {
        if self.phase.get() == Phase::Terminated {
            return;
        }
        log::debug!("terminating overlay window: {reason}");
        if let Some(window) = self.window.upgrade() {
            window.hide_presentation();
            window.release_media();
        }
        self.pending.borrow_mut().take();
        self.deferred_unregister.borrow_mut().take();
        self.unbind();
        self.phase.set(Phase::Terminated);
    }

    /// Validates the fixed per-host stage order. On a violation the error is
    /// reported and the session is forcibly terminated.
    fn note_stage(&self, window: &Rc<WindowInner>, host: HostDesc, stage: LifecycleStage) -> bool {
        let prev = self.last_stage.get();
        if !stage.follows(prev) {
            window.report(OverlayError::ProtocolViolation {
                host: host.id,
                detail: format!("lifecycle stage {stage:?} after {prev:?}"),
            });
            self.terminate("lifecycle order violated");
            return false;
        }
        self.last_stage.set(Some(stage));
        true
    }

    fn is_own_host(&self, window: &Rc<WindowInner>, host: HostDesc) -> bool {
        window.host.get().map(|own| own.id) == Some(host.id)
    }

    fn start_handoff(&self, window: &Rc<WindowInner>, host: HostDesc) {
        window.hide_presentation();
        let shadow = match window.env.factory.create_window(host) {
            Ok(shadow) => shadow,
            Err(error) => {
                // No retry loop: the source stays hidden but registered until
                // the caller re-shows it.
                window.report(error);
                return;
            }
        };
        shadow.inner().border.set(window.border.get());
        shadow.inner().layer.set(window.layer.get());
        let payload = window.begin_transfer();
        shadow.inner().adopt_transfer(payload);
        let hidden = shadow.inner().filters.borrow().hides(host.kind);
        shadow.inner().controller().bind(host);
        if !hidden {
            shadow.inner().show_presentation();
        }
        *self.pending.borrow_mut() = Some(shadow);
        self.phase.set(Phase::Pending);
    }

    /// Reverse transfer when the original host restarts. The pending
    /// reference is already cleared by the caller.
    fn finish_handoff(&self, window: &Rc<WindowInner>, host: HostDesc, shadow: OverlayWindow) {
        if shadow.is_registered() {
            window
                .filters
                .borrow_mut()
                .union(&shadow.inner().filters.borrow());
            let payload = shadow.inner().begin_transfer();
            window.adopt_transfer(payload);
            shadow.inner().controller().terminate("handoff merged back");
            self.phase.set(Phase::Bound);
            if !window.filters.borrow().hides(host.kind) {
                // Mirror the dialog flow: unregister, re-show, re-bind.
                self.unbind();
                window.show_presentation();
                self.bind(host);
            }
            // On a blacklisted host the window stays hidden but registered,
            // dormant and watching.
        } else {
            // The user dismissed the shadow: handoff aborted, the original
            // stays hidden until its owner re-shows it.
            self.unbind();
            self.phase.set(Phase::Idle);
        }
    }
}

impl HostLifecycleListener for HandoffController {
    fn on_host_created(&self, host: HostDesc) {
        let Some(window) = self.window.upgrade() else {
            return;
        };
        if self.phase.get() == Phase::Terminated {
            return;
        }
        if self.is_own_host(&window, host) {
            self.note_stage(&window, host, LifecycleStage::Created);
            return;
        }
        if self.pending.borrow().is_some() {
            // At most one handoff may be pending per session.
            window.report(OverlayError::ProtocolViolation {
                host: host.id,
                detail: "host created while a handoff is already pending".into(),
            });
            return;
        }
        if window.layer.get() == DisplayLayer::SystemOverlay {
            // Always-on-top windows need no host binding.
            return;
        }
        if window.filters.borrow().intercepts(host.kind) {
            self.terminate("created host is intercepted");
            return;
        }
        self.start_handoff(&window, host);
    }

    fn on_host_started(&self, host: HostDesc) {
        let Some(window) = self.window.upgrade() else {
            return;
        };
        if self.phase.get() == Phase::Terminated || !self.is_own_host(&window, host) {
            return;
        }
        if !self.note_stage(&window, host, LifecycleStage::Started) {
            return;
        }
        // Forwarded regardless of the merge outcome below.
        window.notify_started(host.id);
        let shadow = self.pending.borrow_mut().take();
        if let Some(shadow) = shadow {
            self.finish_handoff(&window, host, shadow);
        }
    }

    fn on_host_resumed(&self, host: HostDesc) {
        let Some(window) = self.window.upgrade() else {
            return;
        };
        if self.phase.get() == Phase::Terminated || !self.is_own_host(&window, host) {
            return;
        }
        if !self.note_stage(&window, host, LifecycleStage::Resumed) {
            return;
        }
        window.notify_resumed(host.id);
        if window.showing.get() && window.media.borrow().is_some() && window.env.engine.is_prepared()
        {
            window.env.engine.resume(window.started.get());
        }
    }

    fn on_host_paused(&self, host: HostDesc) {
        let Some(window) = self.window.upgrade() else {
            return;
        };
        if self.phase.get() == Phase::Terminated || !self.is_own_host(&window, host) {
            return;
        }
        if !self.note_stage(&window, host, LifecycleStage::Paused) {
            return;
        }
        window.notify_paused(host.id);
        if window.showing.get() && window.media.borrow().is_some() {
            window.env.engine.pause();
        }
    }

    fn on_host_stopped(&self, host: HostDesc) {
        let Some(window) = self.window.upgrade() else {
            return;
        };
        if self.phase.get() == Phase::Terminated || !self.is_own_host(&window, host) {
            return;
        }
        self.note_stage(&window, host, LifecycleStage::Stopped);
    }

    fn on_host_destroyed(&self, host: HostDesc) {
        let Some(window) = self.window.upgrade() else {
            return;
        };
        if self.phase.get() == Phase::Terminated || !self.is_own_host(&window, host) {
            return;
        }
        if !self.note_stage(&window, host, LifecycleStage::Destroyed) {
            return;
        }
        window.notify_destroyed(host.id);
        window.hide_presentation();
        window.release_media();
        // A pending shadow has its own controller and keeps running.
        self.pending.borrow_mut().take();
        self.phase.set(Phase::Terminated);
        // Deferred so any notifications already in flight for this host are
        // still delivered before the listener disappears.
        let weak = self.self_ref.clone();
        let registration = self.runtime.post(move || {
            if let Some(controller) = weak.upgrade() {
                controller.unbind();
            }
        });
        *self.deferred_unregister.borrow_mut() = registration;
    }
}
