//! Scripted pointer input for recognizer tests.
//!
//! Every event carries an explicit timestamp and the script drives the event
//! loop to exactly that instant, so long-press timers, deferred taps, and
//! velocity estimates are fully deterministic.

use floatpane_core::{Point, Runtime};
use floatpane_gesture::{
    GestureConfig, GestureHandler, GestureRecognizer, Motion, PointerEventKind, PointerFrame,
    PointerId, PointerSampler, RawPointerEvent, Velocity,
};
use std::cell::RefCell;
use std::rc::Rc;

/// One observed gesture callback.
#[derive(Clone, Copy, Debug, PartialEq)]
pub enum GestureEvent {
    Start,
    End,
    Click,
    LongPress,
    Move {
        rel_dx: f32,
        rel_dy: f32,
        abs_dx: f32,
        abs_dy: f32,
    },
    Transform {
        rel_scale: f32,
        abs_scale: f32,
        rel_rotation: f32,
        abs_rotation: f32,
    },
    Fling {
        x: f32,
        y: f32,
    },
}

/// Handler that records every callback; clones share the same log.
#[derive(Clone)]
pub struct RecordingHandler {
    log: Rc<RefCell<Vec<GestureEvent>>>,
    accept: bool,
    consume_long_press: bool,
}

impl RecordingHandler {
    pub fn new() -> Self {
        Self {
            log: Rc::new(RefCell::new(Vec::new())),
            accept: true,
            consume_long_press: false,
        }
    }

    /// Declines the stream at `on_start`.
    pub fn declining(mut self) -> Self {
        self.accept = false;
        self
    }

    /// Consumes long-presses, suppressing the rest of the gesture.
    pub fn consuming_long_press(mut self) -> Self {
        self.consume_long_press = true;
        self
    }

    pub fn log(&self) -> Rc<RefCell<Vec<GestureEvent>>> {
        self.log.clone()
    }

    pub fn events(&self) -> Vec<GestureEvent> {
        self.log.borrow().clone()
    }
}

impl Default for RecordingHandler {
    fn default() -> Self {
        Self::new()
    }
}

impl GestureHandler for RecordingHandler {
    fn on_start(&mut self, _frame: &PointerFrame) -> bool {
        self.log.borrow_mut().push(GestureEvent::Start);
        self.accept
    }

    fn on_end(&mut self, _frame: &PointerFrame) {
        self.log.borrow_mut().push(GestureEvent::End);
    }

    fn on_click(&mut self) {
        self.log.borrow_mut().push(GestureEvent::Click);
    }

    fn on_long_press(&mut self) -> bool {
        self.log.borrow_mut().push(GestureEvent::LongPress);
        self.consume_long_press
    }

    fn on_move(&mut self, motion: &Motion, _frame: &PointerFrame) -> bool {
        self.log.borrow_mut().push(GestureEvent::Move {
            rel_dx: motion.rel_dx,
            rel_dy: motion.rel_dy,
            abs_dx: motion.abs_dx,
            abs_dy: motion.abs_dy,
        });
        true
    }

    fn on_transform(&mut self, motion: &Motion, _frame: &PointerFrame) -> bool {
        self.log.borrow_mut().push(GestureEvent::Transform {
            rel_scale: motion.rel_scale,
            abs_scale: motion.abs_scale,
            rel_rotation: motion.rel_rotation,
            abs_rotation: motion.abs_rotation,
        });
        true
    }

    fn on_fling(&mut self, velocity: Velocity) {
        self.log.borrow_mut().push(GestureEvent::Fling {
            x: velocity.x,
            y: velocity.y,
        });
    }
}

/// Drives a sampler + recognizer pair with scripted raw events.
pub struct GestureScript<H: GestureHandler + 'static> {
    runtime: Runtime,
    sampler: PointerSampler,
    recognizer: GestureRecognizer<H>,
}

impl<H: GestureHandler + 'static> GestureScript<H> {
    pub fn new(handler: H) -> Self {
        Self::with_config(GestureConfig::default(), handler)
    }

    pub fn with_config(config: GestureConfig, handler: H) -> Self {
        let runtime = Runtime::new();
        let recognizer = GestureRecognizer::new(runtime.handle(), config, handler);
        Self {
            runtime,
            sampler: PointerSampler::new(),
            recognizer,
        }
    }

    pub fn recognizer(&self) -> &GestureRecognizer<H> {
        &self.recognizer
    }

    pub fn down(&mut self, t: i64, id: PointerId, x: f32, y: f32) -> bool {
        self.feed(t, id, PointerEventKind::Down, x, y)
    }

    pub fn move_to(&mut self, t: i64, id: PointerId, x: f32, y: f32) -> bool {
        self.feed(t, id, PointerEventKind::Move, x, y)
    }

    pub fn up(&mut self, t: i64, id: PointerId, x: f32, y: f32) -> bool {
        self.feed(t, id, PointerEventKind::Up, x, y)
    }

    pub fn cancel(&mut self, t: i64, id: PointerId) {
        self.feed(t, id, PointerEventKind::Cancel, 0.0, 0.0);
    }

    /// Lets loop time advance with no input, firing due timers.
    pub fn idle(&mut self, t: i64) {
        self.runtime.advance_to(t);
    }

    fn feed(&mut self, t: i64, id: PointerId, kind: PointerEventKind, x: f32, y: f32) -> bool {
        let raw = RawPointerEvent {
            id,
            kind,
            position: Point::new(x, y),
            timestamp_ms: t,
        };
        let consumed = match self.sampler.sample(raw) {
            Some(frame) => self.recognizer.handle(&frame),
            None => false,
        };
        self.runtime.advance_to(t);
        consumed
    }
}
