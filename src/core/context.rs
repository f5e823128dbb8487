//! Per-stage error channel.
//!
//! Every derived stage owns a [`Context`] whose parent is the upstream stage's
//! context. A fault recorded anywhere along the chain is visible to every
//! stage below it, without threading the error through the data values.

use std::cell::OnceCell;
use std::rc::Rc;

use crate::error::Error;

/// A node in the error-propagation tree.
///
/// The error slot is write-once: the first recorded fault wins and is never
/// cleared. Reading resolves the node's own error first, then its ancestors.
#[derive(Debug, Default)]
pub struct Context {
    err: OnceCell<Error>,
    parent: Option<Rc<Context>>,
}

impl Context {
    /// Create a root context with no parent.
    pub(crate) fn root() -> Rc<Self> {
        Rc::new(Self::default())
    }

    /// Create a child of `parent`.
    pub(crate) fn child(parent: &Rc<Context>) -> Rc<Self> {
        Rc::new(Self {
            err: OnceCell::new(),
            parent: Some(parent.clone()),
        })
    }

    /// The first fault recorded on this node or any of its ancestors.
    pub fn err(&self) -> Option<&Error> {
        match self.err.get() {
            Some(err) => Some(err),
            None => self.parent.as_ref().and_then(|parent| parent.err()),
        }
    }

    /// Whether a fault is visible from this node.
    pub fn has_err(&self) -> bool {
        self.err().is_some()
    }

    /// Record a fault on this node. Later faults on the same node are dropped.
    pub(crate) fn set_err(&self, err: Error) {
        match self.err.set(err) {
            Ok(()) => {
                if let Some(err) = self.err.get() {
                    tracing::debug!(error = %err, "fault recorded in pipeline context");
                }
            }
            Err(dropped) => {
                tracing::trace!(error = %dropped, "context already faulted, dropping later fault");
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_child_sees_parent_error() {
        let root = Context::root();
        let child = Context::child(&root);
        let grandchild = Context::child(&child);

        assert!(!grandchild.has_err());
        child.set_err(Error::custom("upstream"));

        assert_eq!(grandchild.err(), Some(&Error::custom("upstream")));
        assert!(child.has_err());
        assert!(!root.has_err());
    }

    #[test]
    fn test_error_is_write_once() {
        let ctx = Context::root();
        ctx.set_err(Error::custom("first"));
        ctx.set_err(Error::custom("second"));
        assert_eq!(ctx.err(), Some(&Error::custom("first")));
    }

    #[test]
    fn test_own_error_shadows_parent() {
        let root = Context::root();
        let child = Context::child(&root);
        child.set_err(Error::custom("own"));
        root.set_err(Error::custom("parent"));
        assert_eq!(child.err(), Some(&Error::custom("own")));
    }
}
