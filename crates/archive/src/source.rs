//! The capability interface the walker consumes.

use crate::Result;
use std::io::Read;
use std::ops::{Deref, DerefMut};
use tracing::trace;

/// Handle to a node inside one [`ArchiveSource`].
///
/// Only meaningful for the source that produced it, and only while that
/// source is open.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct NodeId(usize);

impl NodeId {
    /// The index of the node in its source.
    pub fn index(&self) -> usize {
        self.0
    }
}

impl From<usize> for NodeId {
    fn from(index: usize) -> Self {
        NodeId(index)
    }
}

/// An open, zip-structured archive presented as a tree of nodes.
pub trait ArchiveSource {
    /// The unnamed root node.
    fn root(&self) -> NodeId;

    /// Children of a node, in the order the archive lists them.
    fn children(&self, node: NodeId) -> &[NodeId];

    /// The node's own name (a single path segment; empty for the root).
    fn name(&self, node: NodeId) -> &str;

    /// Whether the node is a directory.
    fn is_directory(&self, node: NodeId) -> bool;

    /// Uncompressed size of a file node, zero for directories.
    fn size(&self, node: NodeId) -> u64;

    /// Open a file node's content as a byte stream.
    fn open_entry(&mut self, node: NodeId) -> Result<Box<dyn Read + '_>>;

    /// Release the underlying stream. Further reads fail with
    /// [`ArchiveError::Closed`](crate::ArchiveError::Closed).
    fn close(&mut self);
}

impl<S: ArchiveSource + ?Sized> ArchiveSource for Box<S> {
    fn root(&self) -> NodeId {
        (**self).root()
    }

    fn children(&self, node: NodeId) -> &[NodeId] {
        (**self).children(node)
    }

    fn name(&self, node: NodeId) -> &str {
        (**self).name(node)
    }

    fn is_directory(&self, node: NodeId) -> bool {
        (**self).is_directory(node)
    }

    fn size(&self, node: NodeId) -> u64 {
        (**self).size(node)
    }

    fn open_entry(&mut self, node: NodeId) -> Result<Box<dyn Read + '_>> {
        (**self).open_entry(node)
    }

    fn close(&mut self) {
        (**self).close()
    }
}

/// Owns a source and closes it exactly once when dropped.
pub struct SourceGuard<S: ArchiveSource> {
    source: S,
}

impl<S: ArchiveSource> SourceGuard<S> {
    pub fn new(source: S) -> Self {
        Self { source }
    }
}

impl<S: ArchiveSource> Deref for SourceGuard<S> {
    type Target = S;

    fn deref(&self) -> &S {
        &self.source
    }
}

impl<S: ArchiveSource> DerefMut for SourceGuard<S> {
    fn deref_mut(&mut self) -> &mut S {
        &mut self.source
    }
}

impl<S: ArchiveSource> Drop for SourceGuard<S> {
    fn drop(&mut self) {
        trace!("Closing archive source");
        self.source.close();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::cell::Cell;
    use std::rc::Rc;

    struct CountingSource {
        closed: Rc<Cell<usize>>,
    }

    impl ArchiveSource for CountingSource {
        fn root(&self) -> NodeId {
            NodeId(0)
        }

        fn children(&self, _node: NodeId) -> &[NodeId] {
            &[]
        }

        fn name(&self, _node: NodeId) -> &str {
            ""
        }

        fn is_directory(&self, _node: NodeId) -> bool {
            true
        }

        fn size(&self, _node: NodeId) -> u64 {
            0
        }

        fn open_entry(&mut self, node: NodeId) -> Result<Box<dyn Read + '_>> {
            Err(crate::ArchiveError::NotAFile(format!("#{}", node.index())))
        }

        fn close(&mut self) {
            self.closed.set(self.closed.get() + 1);
        }
    }

    #[test]
    fn test_guard_closes_once_on_drop() {
        let closed = Rc::new(Cell::new(0));
        {
            let guard = SourceGuard::new(CountingSource {
                closed: closed.clone(),
            });
            assert_eq!(guard.root(), NodeId(0));
            assert_eq!(closed.get(), 0);
        }
        assert_eq!(closed.get(), 1);
    }

    #[test]
    fn test_guard_closes_on_unwind() {
        let closed = Rc::new(Cell::new(0));
        let inner = closed.clone();
        let result = std::panic::catch_unwind(std::panic::AssertUnwindSafe(move || {
            let _guard = SourceGuard::new(CountingSource { closed: inner });
            panic!("traversal aborted");
        }));
        assert!(result.is_err());
        assert_eq!(closed.get(), 1);
    }

    #[test]
    fn test_boxed_source_delegates() {
        let closed = Rc::new(Cell::new(0));
        let boxed: Box<dyn ArchiveSource> = Box::new(CountingSource {
            closed: closed.clone(),
        });
        drop(SourceGuard::new(boxed));
        assert_eq!(closed.get(), 1);
    }
}
