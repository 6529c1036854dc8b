//! Typed pointer samples and frame assembly.
//!
//! Platforms report pointer activity one pointer at a time; the recognizer
//! wants a snapshot of *every* active pointer per event. [`PointerSampler`]
//! bridges the two: it folds raw events into [`PointerFrame`]s carrying all
//! active pointers in down order plus which transition produced the frame.

use floatpane_core::Point;
use smallvec::SmallVec;

pub type PointerId = u64;

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum PointerEventKind {
    Down,
    Move,
    Up,
    Cancel,
}

/// One platform-level pointer report.
#[derive(Clone, Copy, Debug)]
pub struct RawPointerEvent {
    pub id: PointerId,
    pub kind: PointerEventKind,
    pub position: Point,
    pub timestamp_ms: i64,
}

/// Position of one active pointer at a point in time.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct PointerSample {
    pub id: PointerId,
    pub position: Point,
    pub timestamp_ms: i64,
}

/// Which pointer transition produced a frame.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum FrameKind {
    /// First finger down.
    Down,
    /// An additional finger down.
    PointerDown,
    Move,
    /// A finger lifted with others still down.
    PointerUp,
    /// The last finger lifted.
    Up,
    Cancel,
}

/// Snapshot of the full touch stream at one event.
#[derive(Clone, Debug)]
pub struct PointerFrame {
    pub kind: FrameKind,
    /// Index into `pointers` of the pointer that triggered this frame. A
    /// lifting pointer is still present in its `PointerUp`/`Up` frame.
    pub action_index: usize,
    /// All active pointers, ordered by when they went down.
    pub pointers: SmallVec<[PointerSample; 4]>,
    pub timestamp_ms: i64,
}

impl PointerFrame {
    pub fn pointer_count(&self) -> usize {
        self.pointers.len()
    }

    /// The earliest-down pointer still active.
    pub fn primary(&self) -> &PointerSample {
        &self.pointers[0]
    }

    /// The latest-down pointer still active.
    pub fn outermost(&self) -> &PointerSample {
        &self.pointers[self.pointers.len() - 1]
    }

    /// The pointer that produced this frame.
    pub fn acted(&self) -> &PointerSample {
        &self.pointers[self.action_index]
    }
}

/// Folds raw per-pointer events into frames. Structurally impossible input
/// (moves or lifts for unknown ids, duplicate downs) yields `None` with a
/// diagnostic rather than a panic, and leaves the tracked stream untouched.
#[derive(Default)]
pub struct PointerSampler {
    pointers: SmallVec<[PointerSample; 4]>,
}

impl PointerSampler {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn active_count(&self) -> usize {
        self.pointers.len()
    }

    pub fn reset(&mut self) {
        self.pointers.clear();
    }

    pub fn sample(&mut self, raw: RawPointerEvent) -> Option<PointerFrame> {
        match raw.kind {
            PointerEventKind::Down => {
                if self.index_of(raw.id).is_some() {
                    log::warn!("duplicate down for pointer {}", raw.id);
                    return None;
                }
                self.pointers.push(PointerSample {
                    id: raw.id,
                    position: raw.position,
                    timestamp_ms: raw.timestamp_ms,
                });
                let action_index = self.pointers.len() - 1;
                let kind = if action_index == 0 {
                    FrameKind::Down
                } else {
                    FrameKind::PointerDown
                };
                Some(self.frame(kind, action_index, raw.timestamp_ms))
            }
            PointerEventKind::Move => {
                let index = self.known_index(raw.id, "move")?;
                self.pointers[index].position = raw.position;
                self.pointers[index].timestamp_ms = raw.timestamp_ms;
                Some(self.frame(FrameKind::Move, index, raw.timestamp_ms))
            }
            PointerEventKind::Up => {
                let index = self.known_index(raw.id, "up")?;
                self.pointers[index].position = raw.position;
                self.pointers[index].timestamp_ms = raw.timestamp_ms;
                let kind = if self.pointers.len() == 1 {
                    FrameKind::Up
                } else {
                    FrameKind::PointerUp
                };
                let frame = self.frame(kind, index, raw.timestamp_ms);
                self.pointers.remove(index);
                Some(frame)
            }
            PointerEventKind::Cancel => {
                if self.pointers.is_empty() {
                    return None;
                }
                let frame = self.frame(FrameKind::Cancel, 0, raw.timestamp_ms);
                self.pointers.clear();
                Some(frame)
            }
        }
    }

    fn frame(&self, kind: FrameKind, action_index: usize, timestamp_ms: i64) -> PointerFrame {
        PointerFrame {
            kind,
            action_index,
            pointers: self.pointers.clone(),
            timestamp_ms,
        }
    }

    fn index_of(&self, id: PointerId) -> Option<usize> {
        self.pointers.iter().position(|sample| sample.id == id)
    }

    fn known_index(&self, id: PointerId, action: &str) -> Option<usize> {
        let index = self.index_of(id);
        if index.is_none() {
            log::warn!("{action} for untracked pointer {id}");
        }
        index
    }
}
