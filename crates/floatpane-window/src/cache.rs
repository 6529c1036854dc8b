//! Host-keyed window reuse.
//!
//! `obtain` resolves the caller's context to a host and hands back the window
//! already bound there, building one only on a miss. Terminated windows are
//! replaced transparently.

use crate::session::OverlayWindow;
use floatpane_core::{HostDesc, HostId, HostRef, OverlayError};
use rustc_hash::FxHashMap;
use std::cell::RefCell;
use std::rc::Rc;

#[derive(Clone, Default)]
pub struct WindowCache {
    inner: Rc<RefCell<FxHashMap<HostId, OverlayWindow>>>,
}

impl WindowCache {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn obtain(
        &self,
        context: &HostRef,
        build: impl FnOnce(HostDesc) -> OverlayWindow,
    ) -> Result<OverlayWindow, OverlayError> {
        let host = context
            .resolve()
            .ok_or(OverlayError::NoAssociatedHost { operation: "obtain" })?;
        if let Some(window) = self.inner.borrow().get(&host.id) {
            if !window.is_terminated() {
                return Ok(window.clone());
            }
        }
        let window = build(host);
        self.inner.borrow_mut().insert(host.id, window.clone());
        Ok(window)
    }

    pub fn remove(&self, host: HostId) -> Option<OverlayWindow> {
        self.inner.borrow_mut().remove(&host)
    }

    pub fn len(&self) -> usize {
        self.inner.borrow().len()
    }

    pub fn is_empty(&self) -> bool {
        self.inner.borrow().is_empty()
    }
}
