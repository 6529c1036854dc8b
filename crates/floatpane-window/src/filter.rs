//! Per-window host filtering policy.
//!
//! Two sets of host kinds: `blacklist` hides the window on matching hosts
//! while keeping it tracked, `intercept` dismisses it outright. During a
//! handoff the sets only ever grow (union); the explicit `remove_*` calls are
//! the single shrink path and belong to the caller.

use floatpane_core::HostKind;
use rustc_hash::FxHashSet;

#[derive(Clone, Debug, Default)]
pub struct FilterSets {
    blacklist: FxHashSet<HostKind>,
    intercept: FxHashSet<HostKind>,
}

impl FilterSets {
    pub fn new() -> Self {
        Self::default()
    }

    /// The window must stay hidden (but tracked) on hosts of this kind.
    pub fn hides(&self, kind: HostKind) -> bool {
        self.blacklist.contains(&kind)
    }

    /// The window must be dismissed entirely on hosts of this kind.
    pub fn intercepts(&self, kind: HostKind) -> bool {
        self.intercept.contains(&kind)
    }

    pub fn add_blacklisted(&mut self, kind: HostKind) {
        self.blacklist.insert(kind);
    }

    pub fn add_intercepted(&mut self, kind: HostKind) {
        self.intercept.insert(kind);
    }

    pub fn remove_blacklisted(&mut self, kind: HostKind) -> bool {
        self.blacklist.remove(&kind)
    }

    pub fn remove_intercepted(&mut self, kind: HostKind) -> bool {
        self.intercept.remove(&kind)
    }

    /// Grow-only merge used while transferring between sessions.
    pub fn union(&mut self, other: &FilterSets) {
        self.blacklist.extend(other.blacklist.iter().copied());
        self.intercept.extend(other.intercept.iter().copied());
    }

    pub fn blacklist_len(&self) -> usize {
        self.blacklist.len()
    }

    pub fn intercept_len(&self) -> usize {
        self.intercept.len()
    }
}
