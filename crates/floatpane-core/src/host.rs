//! Host resolution over an opaque context chain.
//!
//! A floating window is handed a context, not a screen. Resolution walks the
//! enclosing-context chain until some node identifies as a host or the chain
//! runs out.

use crate::lifecycle::HostDesc;
use std::rc::{Rc, Weak};

/// One link in an enclosing-context chain.
pub trait ContextNode {
    /// The host identity of this node, if it is a screen.
    fn as_host(&self) -> Option<HostDesc>;
    /// The enclosing context, if any.
    fn parent(&self) -> Option<Rc<dyn ContextNode>>;
}

/// Walks the chain starting at `node`; `None` means no associated host.
pub fn resolve_host(node: Rc<dyn ContextNode>) -> Option<HostDesc> {
    let mut current = Some(node);
    while let Some(node) = current {
        if let Some(host) = node.as_host() {
            return Some(host);
        }
        current = node.parent();
    }
    None
}

/// Non-owning handle to the context chain a window was created with. The
/// chain is resolved lazily, so a host that has gone away simply resolves to
/// `None` instead of being kept alive by the window.
#[derive(Clone)]
pub struct HostRef {
    node: Option<Weak<dyn ContextNode>>,
}

impl HostRef {
    pub fn new(node: &Rc<dyn ContextNode>) -> Self {
        Self {
            node: Some(Rc::downgrade(node)),
        }
    }

    /// A handle with no chain at all; always resolves to `None`.
    pub fn detached() -> Self {
        Self { node: None }
    }

    pub fn resolve(&self) -> Option<HostDesc> {
        let node = self.node.as_ref()?.upgrade()?;
        resolve_host(node)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::lifecycle::{HostId, HostKind};

    struct Screen(HostDesc);
    impl ContextNode for Screen {
        fn as_host(&self) -> Option<HostDesc> {
            Some(self.0)
        }
        fn parent(&self) -> Option<Rc<dyn ContextNode>> {
            None
        }
    }

    struct Wrapper(Option<Rc<dyn ContextNode>>);
    impl ContextNode for Wrapper {
        fn as_host(&self) -> Option<HostDesc> {
            None
        }
        fn parent(&self) -> Option<Rc<dyn ContextNode>> {
            self.0.clone()
        }
    }

    #[test]
    fn resolves_through_wrappers() {
        let screen: Rc<dyn ContextNode> = Rc::new(Screen(HostDesc {
            id: HostId(7),
            kind: HostKind(1),
        }));
        let wrapped: Rc<dyn ContextNode> = Rc::new(Wrapper(Some(screen)));
        let outer: Rc<dyn ContextNode> = Rc::new(Wrapper(Some(wrapped)));
        let host_ref = HostRef::new(&outer);
        assert_eq!(host_ref.resolve().map(|h| h.id), Some(HostId(7)));
    }

    #[test]
    fn exhausted_chain_resolves_to_none() {
        let orphan: Rc<dyn ContextNode> = Rc::new(Wrapper(None));
        assert!(HostRef::new(&orphan).resolve().is_none());
        assert!(HostRef::detached().resolve().is_none());
    }

    #[test]
    fn dropped_chain_resolves_to_none() {
        let screen: Rc<dyn ContextNode> = Rc::new(Screen(HostDesc {
            id: HostId(1),
            kind: HostKind(0),
        }));
        let host_ref = HostRef::new(&screen);
        drop(screen);
        assert!(host_ref.resolve().is_none());
    }
}
