//! Multi-touch gesture recognition.
//!
//! Raw per-pointer events are folded into [`pointer::PointerFrame`]s, which
//! drive a single-session classification state machine emitting tap,
//! long-press, drag, pinch/rotate, and fling callbacks.

pub mod constants;
pub mod pointer;
pub mod recognizer;
pub mod velocity;

pub use pointer::{
    FrameKind, PointerEventKind, PointerFrame, PointerId, PointerSample, PointerSampler,
    RawPointerEvent,
};
pub use recognizer::{GestureConfig, GestureHandler, GestureRecognizer, Motion};
pub use velocity::{Velocity, VelocityEstimator};
