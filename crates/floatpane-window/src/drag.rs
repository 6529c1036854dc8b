//! Drag/resize wiring from the gesture layer onto a window session.
//!
//! Semantic gesture callbacks become geometry mutations: single-finger drags
//! move the window, pinches resize it, a release settles it onto the nearest
//! edge, and a fling throws it toward the fling's horizontal side. In
//! maximized mode the window ignores drags entirely and only taps get
//! through.

use crate::session::{OverlayWindow, ScreenMode};
use floatpane_gesture::{GestureHandler, Motion, PointerFrame, Velocity};

pub struct FloatingDragHandler {
    window: OverlayWindow,
    on_tap: Option<Box<dyn Fn()>>,
}

impl FloatingDragHandler {
    pub fn new(window: OverlayWindow) -> Self {
        Self {
            window,
            on_tap: None,
        }
    }

    /// Callback invoked on a tap, typically toggling the controls overlay.
    pub fn with_tap(mut self, on_tap: impl Fn() + 'static) -> Self {
        self.on_tap = Some(Box::new(on_tap));
        self
    }

    pub fn window(&self) -> &OverlayWindow {
        &self.window
    }

    fn maximized(&self) -> bool {
        self.window.screen_mode() == ScreenMode::Maximized
    }
}

impl GestureHandler for FloatingDragHandler {
    fn on_start(&mut self, frame: &PointerFrame) -> bool {
        // Maximized consumes the whole screen; otherwise only touches that
        // land on the window take the stream.
        self.maximized() || self.window.geometry().contains(frame.primary().position)
    }

    fn on_move(&mut self, motion: &Motion, _frame: &PointerFrame) -> bool {
        if self.maximized() {
            return false;
        }
        self.window.move_by(motion.rel_dx, motion.rel_dy);
        true
    }

    fn on_transform(&mut self, motion: &Motion, _frame: &PointerFrame) -> bool {
        if self.maximized() {
            return false;
        }
        self.window.scale_by(motion.rel_scale);
        true
    }

    fn on_end(&mut self, _frame: &PointerFrame) {
        if !self.maximized() {
            self.window.snap_to_border();
        }
    }

    fn on_click(&mut self) {
        if let Some(on_tap) = &self.on_tap {
            on_tap();
        }
    }

    fn on_fling(&mut self, velocity: Velocity) {
        if self.maximized() {
            return;
        }
        self.window.fling_toward(velocity.x);
    }
}
