//! Per-pointer velocity estimation.
//!
//! Each active pointer gets a ring buffer of recent positions; velocity is
//! derived with an impulse strategy, treating the gesture as kinetic energy
//! imparted to a unit mass. Samples older than a short horizon, or separated
//! by a gap long enough to mean the finger stopped, are excluded.
//!
//! The estimator also owns the multi-finger disambiguation rule: when a
//! pointer lifts while others remain, an opposing velocity (negative dot
//! product) means the gesture was a pinch-like pair ending, so the whole
//! history is cleared and no fling is reported on final lift.

use crate::pointer::{PointerFrame, PointerId};
use floatpane_core::Point;
use smallvec::SmallVec;

/// Ring buffer capacity per pointer.
const HISTORY_SIZE: usize = 20;

/// Samples older than this relative to the newest are ignored.
const HORIZON_MS: i64 = 100;

/// A gap this long between samples means the pointer stopped moving.
pub const ASSUME_STOPPED_MS: i64 = 40;

/// Estimated velocity in px/sec.
#[derive(Clone, Copy, Debug, Default, PartialEq)]
pub struct Velocity {
    pub x: f32,
    pub y: f32,
}

impl Velocity {
    pub fn dot(self, other: Velocity) -> f32 {
        self.x * other.x + self.y * other.y
    }

    fn clamped(self, max: f32) -> Velocity {
        if !max.is_finite() || max <= 0.0 {
            return Velocity::default();
        }
        Velocity {
            x: self.x.clamp(-max, max),
            y: self.y.clamp(-max, max),
        }
    }
}

#[derive(Clone, Copy)]
struct HistorySample {
    time_ms: i64,
    x: f32,
    y: f32,
}

#[derive(Clone)]
struct PointerHistory {
    samples: [Option<HistorySample>; HISTORY_SIZE],
    index: usize,
}

impl PointerHistory {
    fn new() -> Self {
        Self {
            samples: [None; HISTORY_SIZE],
            index: 0,
        }
    }

    fn push(&mut self, time_ms: i64, position: Point) {
        self.index = (self.index + 1) % HISTORY_SIZE;
        self.samples[self.index] = Some(HistorySample {
            time_ms,
            x: position.x,
            y: position.y,
        });
    }

    /// Gathers usable samples newest-first and runs the impulse estimate on
    /// both axes. Returns zero when fewer than two samples qualify.
    fn velocity(&self) -> Velocity {
        let mut times = [0.0f32; HISTORY_SIZE];
        let mut xs = [0.0f32; HISTORY_SIZE];
        let mut ys = [0.0f32; HISTORY_SIZE];
        let mut count = 0;

        let Some(newest) = self.samples[self.index] else {
            return Velocity::default();
        };
        let mut accepted_time = newest.time_ms;
        let mut cursor = self.index;
        while let Some(sample) = self.samples[cursor] {
            let age = newest.time_ms - sample.time_ms;
            let gap = accepted_time - sample.time_ms;
            if age > HORIZON_MS || gap > ASSUME_STOPPED_MS {
                break;
            }
            accepted_time = sample.time_ms;
            times[count] = -(age as f32);
            xs[count] = sample.x;
            ys[count] = sample.y;
            cursor = if cursor == 0 { HISTORY_SIZE - 1 } else { cursor - 1 };
            count += 1;
            if count >= HISTORY_SIZE {
                break;
            }
        }

        if count < 2 {
            return Velocity::default();
        }
        Velocity {
            x: impulse_velocity(&times, &xs, count) * 1000.0,
            y: impulse_velocity(&times, &ys, count) * 1000.0,
        }
    }
}

/// Impulse velocity over one axis, in units per millisecond. `data` and
/// `times` are newest-first; `times` are non-positive offsets from the newest
/// sample.
fn impulse_velocity(times: &[f32; HISTORY_SIZE], data: &[f32; HISTORY_SIZE], count: usize) -> f32 {
    let mut work = 0.0f32;
    let oldest = count - 1;
    let mut next_time = times[oldest];
    for i in (1..=oldest).rev() {
        let current_time = next_time;
        next_time = times[i - 1];
        if current_time == next_time {
            continue;
        }
        let delta = data[i - 1] - data[i];
        let v_curr = delta / (next_time - current_time);
        let v_prev = energy_to_velocity(work);
        work += (v_curr - v_prev) * v_curr.abs();
        if i == oldest {
            work *= 0.5;
        }
    }
    energy_to_velocity(work)
}

/// E = ½·m·v² with m = 1, keeping the sign of the accumulated work.
#[inline]
fn energy_to_velocity(energy: f32) -> f32 {
    energy.signum() * (2.0 * energy.abs()).sqrt()
}

/// Velocity histories for every pointer in the active gesture.
#[derive(Default)]
pub struct VelocityEstimator {
    pointers: SmallVec<[(PointerId, PointerHistory); 4]>,
}

impl VelocityEstimator {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn is_tracking(&self) -> bool {
        !self.pointers.is_empty()
    }

    /// Records every pointer in the frame at the frame timestamp. Histories of
    /// pointers no longer in the stream are pruned.
    pub fn track(&mut self, frame: &PointerFrame) {
        self.pointers
            .retain(|(id, _)| frame.pointers.iter().any(|sample| sample.id == *id));
        for sample in &frame.pointers {
            let index = match self.pointers.iter().position(|(id, _)| *id == sample.id) {
                Some(index) => index,
                None => {
                    self.pointers.push((sample.id, PointerHistory::new()));
                    self.pointers.len() - 1
                }
            };
            self.pointers[index].1.push(frame.timestamp_ms, sample.position);
        }
    }

    /// Estimated velocity for one pointer, with both axes clamped to `max`.
    pub fn velocity(&self, id: PointerId, max: f32) -> Velocity {
        self.pointers
            .iter()
            .find(|(tracked, _)| *tracked == id)
            .map(|(_, history)| history.velocity().clamped(max))
            .unwrap_or_default()
    }

    /// Partial-lift disambiguation: if the lifting pointer's velocity opposes
    /// any surviving pointer's, the entire history is cleared so the final
    /// lift reports no fling. Returns true when the history was cleared.
    pub fn cancel_opposing(&mut self, frame: &PointerFrame, max: f32) -> bool {
        if frame.action_index >= frame.pointers.len() {
            return false;
        }
        let lifted = self.velocity(frame.acted().id, max);
        for (index, sample) in frame.pointers.iter().enumerate() {
            if index == frame.action_index {
                continue;
            }
            if lifted.dot(self.velocity(sample.id, max)) < 0.0 {
                self.clear();
                return true;
            }
        }
        false
    }

    pub fn clear(&mut self) {
        self.pointers.clear();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::pointer::{FrameKind, PointerSample};
    use smallvec::smallvec;

    fn frame(kind: FrameKind, action_index: usize, t: i64, points: &[(PointerId, f32, f32)]) -> PointerFrame {
        PointerFrame {
            kind,
            action_index,
            pointers: points
                .iter()
                .map(|&(id, x, y)| PointerSample {
                    id,
                    position: Point::new(x, y),
                    timestamp_ms: t,
                })
                .collect(),
            timestamp_ms: t,
        }
    }

    fn move_frame(t: i64, points: &[(PointerId, f32, f32)]) -> PointerFrame {
        frame(FrameKind::Move, 0, t, points)
    }

    #[test]
    fn empty_estimator_reports_zero() {
        let estimator = VelocityEstimator::new();
        assert_eq!(estimator.velocity(1, 8_000.0), Velocity::default());
    }

    #[test]
    fn constant_velocity_is_recovered() {
        let mut estimator = VelocityEstimator::new();
        // 100 px per 10 ms => 10_000 px/s, beyond the cap.
        for step in 0..4 {
            estimator.track(&move_frame(step * 10, &[(1, step as f32 * 100.0, 0.0)]));
        }
        let capped = estimator.velocity(1, 8_000.0);
        assert_eq!(capped.x, 8_000.0);
        let free = estimator.velocity(1, 50_000.0);
        assert!((free.x - 10_000.0).abs() < 1_000.0, "got {}", free.x);
        assert_eq!(free.y, 0.0);
    }

    #[test]
    fn backwards_motion_is_negative() {
        let mut estimator = VelocityEstimator::new();
        for step in 0..4 {
            estimator.track(&move_frame(step * 10, &[(1, 300.0 - step as f32 * 100.0, 0.0)]));
        }
        assert!(estimator.velocity(1, 50_000.0).x < 0.0);
    }

    #[test]
    fn single_sample_reports_zero() {
        let mut estimator = VelocityEstimator::new();
        estimator.track(&move_frame(0, &[(1, 100.0, 0.0)]));
        assert_eq!(estimator.velocity(1, 8_000.0), Velocity::default());
    }

    #[test]
    fn long_gap_means_stopped() {
        let mut estimator = VelocityEstimator::new();
        estimator.track(&move_frame(0, &[(1, 0.0, 0.0)]));
        estimator.track(&move_frame(ASSUME_STOPPED_MS + 1, &[(1, 100.0, 0.0)]));
        assert_eq!(estimator.velocity(1, 8_000.0), Velocity::default());
    }

    #[test]
    fn samples_beyond_horizon_are_ignored() {
        let mut estimator = VelocityEstimator::new();
        estimator.track(&move_frame(0, &[(1, 0.0, 0.0)]));
        for step in 0..3 {
            estimator.track(&move_frame(150 + step * 10, &[(1, step as f32 * 100.0, 0.0)]));
        }
        assert!(estimator.velocity(1, 50_000.0).x.abs() > 0.0);
    }

    #[test]
    fn opposing_lift_clears_history() {
        let mut estimator = VelocityEstimator::new();
        // Pointer 1 sweeps right, pointer 2 sweeps left: a pinch ending.
        for step in 0..4i64 {
            estimator.track(&move_frame(
                step * 10,
                &[
                    (1, step as f32 * 50.0, 0.0),
                    (2, 500.0 - step as f32 * 50.0, 0.0),
                ],
            ));
        }
        let lift = frame(FrameKind::PointerUp, 1, 40, &[(1, 200.0, 0.0), (2, 300.0, 0.0)]);
        assert!(estimator.cancel_opposing(&lift, 8_000.0));
        assert!(!estimator.is_tracking());
        assert_eq!(estimator.velocity(1, 8_000.0), Velocity::default());
    }

    #[test]
    fn aligned_lift_keeps_history() {
        let mut estimator = VelocityEstimator::new();
        for step in 0..4i64 {
            estimator.track(&move_frame(
                step * 10,
                &[
                    (1, step as f32 * 50.0, 0.0),
                    (2, 100.0 + step as f32 * 50.0, 0.0),
                ],
            ));
        }
        let lift = frame(FrameKind::PointerUp, 1, 40, &[(1, 200.0, 0.0), (2, 300.0, 0.0)]);
        assert!(!estimator.cancel_opposing(&lift, 8_000.0));
        assert!(estimator.velocity(1, 8_000.0).x > 0.0);
    }

    #[test]
    fn departed_pointers_are_pruned() {
        let mut estimator = VelocityEstimator::new();
        estimator.track(&move_frame(0, &[(1, 0.0, 0.0), (2, 10.0, 0.0)]));
        estimator.track(&move_frame(10, &[(1, 5.0, 0.0)]));
        assert_eq!(estimator.velocity(2, 8_000.0), Velocity::default());
    }

    #[test]
    fn smallvec_frame_helper_is_consistent() {
        let f: PointerFrame = PointerFrame {
            kind: FrameKind::Move,
            action_index: 0,
            pointers: smallvec![PointerSample {
                id: 1,
                position: Point::ZERO,
                timestamp_ms: 0,
            }],
            timestamp_ms: 0,
        };
        assert_eq!(f.primary().id, f.acted().id);
    }
}
