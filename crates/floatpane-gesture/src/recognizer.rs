//! Gesture classification state machine.
//!
//! One session per touch stream: first down opens it, last up or cancel closes
//! it. In between the recognizer arbitrates between tap, long-press, drag,
//! and two-finger transform using a slop threshold, and evaluates a fling on
//! lift from the velocity estimator.
//!
//! Two deferral points exist, both cancellable tasks on the shared event loop:
//! the long-press timer armed at down, and the tap dispatch posted at up.
//! Everything else is synchronous with the incoming frame.

use crate::constants;
use crate::pointer::{FrameKind, PointerFrame};
use crate::velocity::{Velocity, VelocityEstimator};
use floatpane_core::{Point, RuntimeHandle, TaskRegistration};
use std::cell::RefCell;
use std::rc::{Rc, Weak};

/// Tunable thresholds for one recognizer.
#[derive(Clone, Copy, Debug)]
pub struct GestureConfig {
    pub touch_slop: f32,
    pub long_press_timeout_ms: i64,
    pub tap_timeout_ms: i64,
    pub min_fling_velocity: f32,
    pub max_fling_velocity: f32,
}

impl Default for GestureConfig {
    fn default() -> Self {
        Self {
            touch_slop: constants::TOUCH_SLOP,
            long_press_timeout_ms: constants::LONG_PRESS_TIMEOUT_MS,
            tap_timeout_ms: constants::TAP_TIMEOUT_MS,
            min_fling_velocity: constants::MIN_FLING_VELOCITY,
            max_fling_velocity: constants::MAX_FLING_VELOCITY,
        }
    }
}

/// Derived motion quantities for the current frame, computed by the
/// recognizer from the two outermost pointers. Handlers never recompute
/// these.
#[derive(Clone, Copy, Debug)]
pub struct Motion {
    /// Primary-pointer delta since the previous dispatched sample.
    pub rel_dx: f32,
    pub rel_dy: f32,
    /// Primary-pointer delta since the down anchor.
    pub abs_dx: f32,
    pub abs_dy: f32,
    /// Distance between the two outermost pointers (0 for one pointer).
    pub spacing: f32,
    /// Angle of the outermost-pointer pair, in degrees.
    pub degree: f32,
    /// Spacing ratio against the previous sample / the down anchors.
    pub rel_scale: f32,
    pub abs_scale: f32,
    /// Angle change against the previous sample / the down anchors, degrees.
    pub rel_rotation: f32,
    pub abs_rotation: f32,
}

/// Semantic gesture callbacks. All methods except `on_start` default to
/// "not interested" so handlers implement only what they consume.
///
/// Handlers must not feed frames back into the recognizer from inside a
/// callback.
pub trait GestureHandler {
    /// First finger down. Returning false declines the stream: no long-press
    /// is armed, no velocity is tracked, and no tap can fire.
    fn on_start(&mut self, frame: &PointerFrame) -> bool;

    /// Last up or cancel. Not called when the session degrades on malformed
    /// input.
    fn on_end(&mut self, _frame: &PointerFrame) {}

    fn on_click(&mut self) {}

    /// Return true to consume the rest of the gesture: further moves are
    /// swallowed and velocity tracking stops.
    fn on_long_press(&mut self) -> bool {
        false
    }

    /// Single-pointer motion outside slop. Return value is the consumed flag.
    fn on_move(&mut self, _motion: &Motion, _frame: &PointerFrame) -> bool {
        false
    }

    /// Multi-pointer motion outside slop (pinch / rotate).
    fn on_transform(&mut self, _motion: &Motion, _frame: &PointerFrame) -> bool {
        false
    }

    fn on_fling(&mut self, _velocity: Velocity) {}
}

struct Session {
    primary_down: Point,
    secondary_down: Point,
    prev_primary: Point,
    prev_secondary: Point,
    down_timestamp_ms: i64,
    accepted: bool,
    in_slop: bool,
    in_click_slop: bool,
    click_cancelled: bool,
    long_press_fired: bool,
}

impl Session {
    fn new(primary: Point, timestamp_ms: i64) -> Self {
        Self {
            primary_down: primary,
            secondary_down: primary,
            prev_primary: primary,
            prev_secondary: primary,
            down_timestamp_ms: timestamp_ms,
            accepted: false,
            in_slop: true,
            in_click_slop: true,
            click_cancelled: false,
            long_press_fired: false,
        }
    }
}

enum MoveDispatch {
    Consume,
    Move(Motion),
    Transform(Motion),
}

pub struct GestureRecognizer<H: GestureHandler + 'static> {
    inner: Rc<RecognizerInner<H>>,
}

struct RecognizerInner<H> {
    config: GestureConfig,
    runtime: RuntimeHandle,
    handler: RefCell<H>,
    session: RefCell<Option<Session>>,
    velocity: RefCell<VelocityEstimator>,
    long_press: RefCell<Option<TaskRegistration>>,
    pending_tap: RefCell<Option<TaskRegistration>>,
}

impl<H: GestureHandler + 'static> GestureRecognizer<H> {
    pub fn new(runtime: RuntimeHandle, config: GestureConfig, handler: H) -> Self {
        Self {
            inner: Rc::new(RecognizerInner {
                config,
                runtime,
                handler: RefCell::new(handler),
                session: RefCell::new(None),
                velocity: RefCell::new(VelocityEstimator::new()),
                long_press: RefCell::new(None),
                pending_tap: RefCell::new(None),
            }),
        }
    }

    /// Feeds one frame through the state machine. The return value is the
    /// consumed flag, mirroring platform touch dispatch.
    pub fn handle(&self, frame: &PointerFrame) -> bool {
        match frame.kind {
            FrameKind::Down => RecognizerInner::handle_down(&self.inner, frame),
            FrameKind::PointerDown => self.inner.handle_pointer_down(frame),
            FrameKind::Move => self.inner.handle_move(frame),
            FrameKind::PointerUp => self.inner.handle_pointer_up(frame),
            FrameKind::Up => RecognizerInner::handle_up(&self.inner, frame),
            FrameKind::Cancel => self.inner.handle_cancel(frame),
        }
    }

    pub fn is_active(&self) -> bool {
        self.inner.session.borrow().is_some()
    }

    pub fn config(&self) -> GestureConfig {
        self.inner.config
    }

    pub fn with_handler<R>(&self, f: impl FnOnce(&mut H) -> R) -> R {
        f(&mut self.inner.handler.borrow_mut())
    }
}

impl<H: GestureHandler + 'static> RecognizerInner<H> {
    fn handle_down(inner: &Rc<Self>, frame: &PointerFrame) -> bool {
        inner.pending_tap.borrow_mut().take();
        if inner.session.borrow().is_some() {
            log::warn!("down while a gesture session is active; restarting");
            inner.abort_session();
        }

        let primary = frame.primary().position;
        *inner.session.borrow_mut() = Some(Session::new(primary, frame.timestamp_ms));

        let accepted = inner.handler.borrow_mut().on_start(frame);

        let mut session_slot = inner.session.borrow_mut();
        let Some(session) = session_slot.as_mut() else {
            return false;
        };
        session.accepted = accepted;
        session.click_cancelled = !accepted;
        drop(session_slot);

        if accepted {
            let mut velocity = inner.velocity.borrow_mut();
            velocity.clear();
            velocity.track(frame);
            drop(velocity);
            Self::arm_long_press(inner, frame.timestamp_ms);
        }
        accepted
    }

    fn handle_pointer_down(&self, frame: &PointerFrame) -> bool {
        if frame.pointer_count() < 2 {
            log::warn!("structurally impossible extra down; ending session");
            self.abort_session();
            return false;
        }
        let mut session_slot = self.session.borrow_mut();
        let Some(session) = session_slot.as_mut() else {
            return false;
        };
        session.click_cancelled = true;
        let outer = frame.outermost().position;
        session.secondary_down = outer;
        session.prev_secondary = outer;
        drop(session_slot);
        self.long_press.borrow_mut().take();
        false
    }

    fn handle_move(&self, frame: &PointerFrame) -> bool {
        let dispatch = {
            let mut session_slot = self.session.borrow_mut();
            let Some(session) = session_slot.as_mut() else {
                return false;
            };
            if frame.pointer_count() == 0 {
                drop(session_slot);
                self.abort_session();
                return false;
            }
            if !session.accepted {
                // A declined stream gets no further classification, matching
                // platforms that stop delivering after an unconsumed down.
                return false;
            }
            if session.long_press_fired {
                self.velocity.borrow_mut().clear();
                MoveDispatch::Consume
            } else {
                self.velocity.borrow_mut().track(frame);

                let primary = frame.primary().position;
                if session.in_click_slop {
                    let slop = self.config.touch_slop;
                    let moved = (primary.x - session.primary_down.x).abs() >= slop
                        || (primary.y - session.primary_down.y).abs() >= slop;
                    if moved {
                        session.in_click_slop = false;
                        session.click_cancelled = true;
                        self.long_press.borrow_mut().take();
                    }
                }
                if session.in_slop {
                    session.in_slop = frame.pointer_count() == 1 && session.in_click_slop;
                }

                if session.in_slop {
                    Self::rebase(session, frame);
                    MoveDispatch::Consume
                } else {
                    let motion = Self::compute_motion(session, frame);
                    Self::rebase(session, frame);
                    if frame.pointer_count() == 1 {
                        MoveDispatch::Move(motion)
                    } else {
                        MoveDispatch::Transform(motion)
                    }
                }
            }
        };

        match dispatch {
            MoveDispatch::Consume => true,
            MoveDispatch::Move(motion) => self.handler.borrow_mut().on_move(&motion, frame),
            MoveDispatch::Transform(motion) => {
                self.handler.borrow_mut().on_transform(&motion, frame)
            }
        }
    }

    fn handle_pointer_up(&self, frame: &PointerFrame) -> bool {
        let accepted = {
            let mut session_slot = self.session.borrow_mut();
            let Some(session) = session_slot.as_mut() else {
                return false;
            };
            let count = frame.pointer_count();
            if count < 2 || frame.action_index >= count {
                drop(session_slot);
                log::warn!("structurally impossible partial lift; ending session");
                self.abort_session();
                return false;
            }
            // The gesture re-bases onto the surviving pointers rather than
            // resetting.
            if frame.action_index == 0 {
                let next_primary = frame.pointers[1].position;
                session.primary_down = next_primary;
                session.prev_primary = next_primary;
            } else if frame.action_index == count - 1 {
                let next_secondary = frame.pointers[count - 2].position;
                session.secondary_down = next_secondary;
                session.prev_secondary = next_secondary;
            }
            session.accepted
        };
        if accepted {
            self.velocity
                .borrow_mut()
                .cancel_opposing(frame, self.config.max_fling_velocity);
        }
        false
    }

    fn handle_up(inner: &Rc<Self>, frame: &PointerFrame) -> bool {
        let Some(mut session) = inner.session.borrow_mut().take() else {
            return false;
        };
        if frame.pointer_count() == 0 {
            inner.abort_session();
            return false;
        }
        inner.long_press.borrow_mut().take();

        let up_position = frame.primary().position;
        if session.in_click_slop {
            let slop = inner.config.touch_slop;
            if (up_position.x - session.primary_down.x).abs() >= slop
                || (up_position.y - session.primary_down.y).abs() >= slop
            {
                session.click_cancelled = true;
            }
        }

        if !session.click_cancelled
            && frame.timestamp_ms - session.down_timestamp_ms < inner.config.tap_timeout_ms
        {
            Self::schedule_tap(inner);
        }

        if session.accepted && !session.in_slop {
            let mut velocity = inner.velocity.borrow_mut();
            velocity.track(frame);
            let estimate = velocity.velocity(frame.primary().id, inner.config.max_fling_velocity);
            drop(velocity);
            if estimate.x.abs() > inner.config.min_fling_velocity
                || estimate.y.abs() > inner.config.min_fling_velocity
            {
                inner.handler.borrow_mut().on_fling(estimate);
            }
        }
        inner.velocity.borrow_mut().clear();
        inner.handler.borrow_mut().on_end(frame);
        false
    }

    fn handle_cancel(&self, frame: &PointerFrame) -> bool {
        if self.session.borrow_mut().take().is_none() {
            return false;
        }
        self.long_press.borrow_mut().take();
        self.velocity.borrow_mut().clear();
        self.handler.borrow_mut().on_end(frame);
        false
    }

    /// Ends the session without further callbacks; used when the input stream
    /// is structurally impossible.
    fn abort_session(&self) {
        self.session.borrow_mut().take();
        self.long_press.borrow_mut().take();
        self.velocity.borrow_mut().clear();
    }

    fn arm_long_press(inner: &Rc<Self>, down_timestamp_ms: i64) {
        let weak: Weak<Self> = Rc::downgrade(inner);
        let deadline = down_timestamp_ms + inner.config.long_press_timeout_ms;
        let registration = inner.runtime.post_at(deadline, move || {
            let Some(inner) = weak.upgrade() else { return };
            if inner.session.borrow().is_none() {
                return;
            }
            let consumed = inner.handler.borrow_mut().on_long_press();
            if let Some(session) = inner.session.borrow_mut().as_mut() {
                session.long_press_fired = consumed;
            };
        });
        *inner.long_press.borrow_mut() = registration;
    }

    /// Tap dispatch is deferred to the next loop tick; eligibility against the
    /// tap timeout was already decided from event timestamps at up-time.
    fn schedule_tap(inner: &Rc<Self>) {
        let weak: Weak<Self> = Rc::downgrade(inner);
        let registration = inner.runtime.post(move || {
            if let Some(inner) = weak.upgrade() {
                inner.handler.borrow_mut().on_click();
            }
        });
        *inner.pending_tap.borrow_mut() = registration;
    }

    fn rebase(session: &mut Session, frame: &PointerFrame) {
        session.prev_primary = frame.primary().position;
        session.prev_secondary = frame.outermost().position;
    }

    fn compute_motion(session: &Session, frame: &PointerFrame) -> Motion {
        let primary = frame.primary().position;
        let mut motion = Motion {
            rel_dx: primary.x - session.prev_primary.x,
            rel_dy: primary.y - session.prev_primary.y,
            abs_dx: primary.x - session.primary_down.x,
            abs_dy: primary.y - session.primary_down.y,
            spacing: 0.0,
            degree: 0.0,
            rel_scale: 1.0,
            abs_scale: 1.0,
            rel_rotation: 0.0,
            abs_rotation: 0.0,
        };
        if frame.pointer_count() >= 2 {
            let outer = frame.outermost().position;
            let spacing = primary.distance(outer);
            let degree = degrees_between(primary, outer);
            let prev_spacing = session.prev_primary.distance(session.prev_secondary);
            let down_spacing = session.primary_down.distance(session.secondary_down);
            motion.spacing = spacing;
            motion.degree = degree;
            motion.rel_scale = if prev_spacing > 0.0 {
                spacing / prev_spacing
            } else {
                1.0
            };
            motion.abs_scale = if down_spacing > 0.0 {
                spacing / down_spacing
            } else {
                1.0
            };
            motion.rel_rotation =
                degree - degrees_between(session.prev_primary, session.prev_secondary);
            motion.abs_rotation =
                degree - degrees_between(session.primary_down, session.secondary_down);
        }
        motion
    }
}

/// Angle of the segment from `b` to `a`, in degrees.
fn degrees_between(a: Point, b: Point) -> f32 {
    (a.y - b.y).atan2(a.x - b.x).to_degrees()
}
