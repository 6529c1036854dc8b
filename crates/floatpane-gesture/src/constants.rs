//! Shared gesture thresholds.
//!
//! Values are in logical pixels and milliseconds and follow common platform
//! conventions for touch handling. Embedders with very high density screens
//! can override all of them through `GestureConfig`.

/// Movement threshold below which pointer motion is not yet an intentional
/// drag. A single consistent value for slop and click cancellation avoids the
/// dead zone where content visibly drags but a tap still fires on release.
/// 8px matches the usual mobile touch-slop convention.
pub const TOUCH_SLOP: f32 = 8.0;

/// Delay before a held press becomes a long-press.
pub const LONG_PRESS_TIMEOUT_MS: i64 = 400;

/// A release later than this after the down is no longer a tap.
pub const TAP_TIMEOUT_MS: i64 = 100;

/// Minimum lift velocity, in px/sec on either axis, to report a fling.
pub const MIN_FLING_VELOCITY: f32 = 50.0;

/// Cap applied to estimated velocities, in px/sec per axis.
pub const MAX_FLING_VELOCITY: f32 = 8_000.0;
