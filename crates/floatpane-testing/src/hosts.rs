//! Scripted host world.
//!
//! Creates hosts, exposes context chains for them, and drives the lifecycle
//! registry in the same interleavings a real platform produces when the user
//! navigates between screens.

use floatpane_core::{
    ContextNode, HostDesc, HostId, HostKind, HostLifecycleRegistry, HostRef, LifecycleStage,
};
use std::cell::{Cell, RefCell};
use std::collections::HashMap;
use std::rc::Rc;

struct HostNode {
    desc: HostDesc,
}

impl ContextNode for HostNode {
    fn as_host(&self) -> Option<HostDesc> {
        Some(self.desc)
    }
    fn parent(&self) -> Option<Rc<dyn ContextNode>> {
        None
    }
}

#[derive(Clone)]
pub struct HostWorld {
    inner: Rc<WorldState>,
}

struct WorldState {
    registry: HostLifecycleRegistry,
    next_id: Cell<u64>,
    nodes: RefCell<HashMap<HostId, Rc<dyn ContextNode>>>,
}

impl HostWorld {
    pub fn new() -> Self {
        Self {
            inner: Rc::new(WorldState {
                registry: HostLifecycleRegistry::new(),
                next_id: Cell::new(1),
                nodes: RefCell::new(HashMap::new()),
            }),
        }
    }

    pub fn registry(&self) -> HostLifecycleRegistry {
        self.inner.registry.clone()
    }

    /// Context chain for a live host; detached once the host is destroyed.
    pub fn context_for(&self, host: HostDesc) -> HostRef {
        match self.inner.nodes.borrow().get(&host.id) {
            Some(node) => HostRef::new(node),
            None => HostRef::detached(),
        }
    }

    pub fn create_host(&self, kind: HostKind) -> HostDesc {
        let id = HostId(self.inner.next_id.get());
        self.inner.next_id.set(id.0 + 1);
        let desc = HostDesc { id, kind };
        self.inner
            .nodes
            .borrow_mut()
            .insert(id, Rc::new(HostNode { desc }));
        self.inner.registry.dispatch(desc, LifecycleStage::Created);
        desc
    }

    pub fn start(&self, host: HostDesc) {
        self.inner.registry.dispatch(host, LifecycleStage::Started);
    }

    pub fn resume(&self, host: HostDesc) {
        self.inner.registry.dispatch(host, LifecycleStage::Resumed);
    }

    pub fn pause(&self, host: HostDesc) {
        self.inner.registry.dispatch(host, LifecycleStage::Paused);
    }

    pub fn stop(&self, host: HostDesc) {
        self.inner.registry.dispatch(host, LifecycleStage::Stopped);
    }

    pub fn destroy(&self, host: HostDesc) {
        self.inner.registry.dispatch(host, LifecycleStage::Destroyed);
        self.inner.nodes.borrow_mut().remove(&host.id);
    }

    /// Created + started + resumed, the way a fresh foreground host appears.
    pub fn launch(&self, kind: HostKind) -> HostDesc {
        let host = self.create_host(kind);
        self.start(host);
        self.resume(host);
        host
    }

    /// Forward navigation: `from` pauses, the new host comes up, `from`
    /// stops.
    pub fn navigate(&self, from: HostDesc, to_kind: HostKind) -> HostDesc {
        self.pause(from);
        let to = self.create_host(to_kind);
        self.start(to);
        self.resume(to);
        self.stop(from);
        to
    }

    /// Back navigation: `from` pauses and is torn down, `to` restarts.
    pub fn navigate_back(&self, from: HostDesc, to: HostDesc) {
        self.pause(from);
        self.start(to);
        self.resume(to);
        self.stop(from);
        self.destroy(from);
    }
}

impl Default for HostWorld {
    fn default() -> Self {
        Self::new()
    }
}
