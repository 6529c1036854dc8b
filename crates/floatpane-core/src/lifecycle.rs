//! Process-wide host lifecycle registry.
//!
//! Hosts (foreground screens) move through a fixed per-host stage order:
//! created → started → resumed → paused → stopped → destroyed, with the legal
//! return edges paused → resumed and stopped → started. The registry fans each
//! stage notification out to every registered listener in registration order.
//!
//! The registry is deliberately not a global: embedders create one at process
//! start and pass the handle into whatever needs it. Listeners self-unregister,
//! so no teardown pass is required.

use indexmap::IndexMap;
use std::cell::{Cell, RefCell};
use std::rc::Rc;

/// Identity of one host instance. Ids are never reused.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub struct HostId(pub u64);

/// The screen *type* of a host, shared by every instance of that screen.
/// Filter sets match on kinds, not ids.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub struct HostKind(pub u32);

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct HostDesc {
    pub id: HostId,
    pub kind: HostKind,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum LifecycleStage {
    Created,
    Started,
    Resumed,
    Paused,
    Stopped,
    Destroyed,
}

impl LifecycleStage {
    /// Whether `self` may legally follow `prev` for a single host. An unknown
    /// previous stage accepts anything, since observers usually attach after
    /// the host already exists.
    pub fn follows(self, prev: Option<LifecycleStage>) -> bool {
        use LifecycleStage::*;
        let Some(prev) = prev else { return true };
        matches!(
            (prev, self),
            (Created, Started)
                | (Started, Resumed)
                | (Resumed, Paused)
                | (Paused, Resumed)
                | (Paused, Stopped)
                | (Stopped, Started)
                | (Stopped, Destroyed)
        )
    }
}

/// Callbacks delivered in the fixed stage order above. All methods default to
/// no-ops so listeners implement only what they watch.
pub trait HostLifecycleListener {
    fn on_host_created(&self, _host: HostDesc) {}
    fn on_host_started(&self, _host: HostDesc) {}
    fn on_host_resumed(&self, _host: HostDesc) {}
    fn on_host_paused(&self, _host: HostDesc) {}
    fn on_host_stopped(&self, _host: HostDesc) {}
    fn on_host_destroyed(&self, _host: HostDesc) {}
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub struct ListenerId(u64);

#[derive(Clone)]
pub struct HostLifecycleRegistry {
    inner: Rc<RegistryInner>,
}

struct RegistryInner {
    listeners: RefCell<IndexMap<ListenerId, Rc<dyn HostLifecycleListener>>>,
    next_id: Cell<u64>,
}

impl HostLifecycleRegistry {
    pub fn new() -> Self {
        Self {
            inner: Rc::new(RegistryInner {
                listeners: RefCell::new(IndexMap::new()),
                next_id: Cell::new(1),
            }),
        }
    }

    pub fn register(&self, listener: Rc<dyn HostLifecycleListener>) -> ListenerId {
        let id = ListenerId(self.inner.next_id.get());
        self.inner.next_id.set(self.inner.next_id.get() + 1);
        self.inner.listeners.borrow_mut().insert(id, listener);
        id
    }

    /// Returns false when the id was already gone.
    pub fn unregister(&self, id: ListenerId) -> bool {
        self.inner.listeners.borrow_mut().shift_remove(&id).is_some()
    }

    pub fn is_registered(&self, id: ListenerId) -> bool {
        self.inner.listeners.borrow().contains_key(&id)
    }

    pub fn listener_count(&self) -> usize {
        self.inner.listeners.borrow().len()
    }

    /// Delivers one stage notification to every listener, in registration
    /// order. The listener list is snapshotted first: listeners may register
    /// or unregister while the dispatch is in flight, newly registered
    /// listeners do not observe the event being dispatched, and listeners
    /// unregistered mid-dispatch are skipped.
    pub fn dispatch(&self, host: HostDesc, stage: LifecycleStage) {
        let snapshot: Vec<(ListenerId, Rc<dyn HostLifecycleListener>)> = self
            .inner
            .listeners
            .borrow()
            .iter()
            .map(|(id, listener)| (*id, listener.clone()))
            .collect();
        for (id, listener) in snapshot {
            if !self.is_registered(id) {
                continue;
            }
            match stage {
                LifecycleStage::Created => listener.on_host_created(host),
                LifecycleStage::Started => listener.on_host_started(host),
                LifecycleStage::Resumed => listener.on_host_resumed(host),
                LifecycleStage::Paused => listener.on_host_paused(host),
                LifecycleStage::Stopped => listener.on_host_stopped(host),
                LifecycleStage::Destroyed => listener.on_host_destroyed(host),
            }
        }
    }
}

impl Default for HostLifecycleRegistry {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::cell::RefCell;

    struct Recorder {
        log: Rc<RefCell<Vec<(u64, LifecycleStage)>>>,
    }

    impl HostLifecycleListener for Recorder {
        fn on_host_created(&self, host: HostDesc) {
            self.log.borrow_mut().push((host.id.0, LifecycleStage::Created));
        }
        fn on_host_started(&self, host: HostDesc) {
            self.log.borrow_mut().push((host.id.0, LifecycleStage::Started));
        }
    }

    fn host(id: u64) -> HostDesc {
        HostDesc {
            id: HostId(id),
            kind: HostKind(0),
        }
    }

    #[test]
    fn dispatch_reaches_listeners_in_registration_order() {
        let registry = HostLifecycleRegistry::new();
        let log = Rc::new(RefCell::new(Vec::new()));
        let first = registry.register(Rc::new(Recorder { log: log.clone() }));
        registry.register(Rc::new(Recorder { log: log.clone() }));
        registry.dispatch(host(1), LifecycleStage::Created);
        assert_eq!(log.borrow().len(), 2);
        assert!(registry.unregister(first));
        registry.dispatch(host(1), LifecycleStage::Started);
        assert_eq!(log.borrow().len(), 3);
    }

    #[test]
    fn listener_registered_during_dispatch_skips_current_event() {
        struct Registrar {
            registry: HostLifecycleRegistry,
            log: Rc<RefCell<Vec<(u64, LifecycleStage)>>>,
        }
        impl HostLifecycleListener for Registrar {
            fn on_host_created(&self, _host: HostDesc) {
                self.registry.register(Rc::new(Recorder {
                    log: self.log.clone(),
                }));
            }
        }

        let registry = HostLifecycleRegistry::new();
        let log = Rc::new(RefCell::new(Vec::new()));
        registry.register(Rc::new(Registrar {
            registry: registry.clone(),
            log: log.clone(),
        }));
        registry.dispatch(host(1), LifecycleStage::Created);
        assert!(log.borrow().is_empty());
        registry.dispatch(host(1), LifecycleStage::Started);
        assert_eq!(*log.borrow(), vec![(1, LifecycleStage::Started)]);
    }

    #[test]
    fn stage_order_validation() {
        use LifecycleStage::*;
        assert!(Started.follows(Some(Created)));
        assert!(Resumed.follows(Some(Paused)));
        assert!(Started.follows(Some(Stopped)));
        assert!(Started.follows(None));
        assert!(!Created.follows(Some(Destroyed)));
        assert!(!Resumed.follows(Some(Created)));
        assert!(!Destroyed.follows(Some(Resumed)));
    }
}
