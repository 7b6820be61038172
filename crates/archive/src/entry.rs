//! Records produced by a traversal.

use crate::NodeId;
use std::fmt;

/// A file found while walking a content package.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Entry {
    label: String,
    path: String,
    size: u64,
    node: NodeId,
}

impl Entry {
    pub fn new(label: impl Into<String>, path: impl Into<String>, node: NodeId, size: u64) -> Self {
        Self {
            label: label.into(),
            path: path.into(),
            size,
            node,
        }
    }

    /// Label of the archive the entry was found in.
    pub fn label(&self) -> &str {
        &self.label
    }

    /// Root-relative path, `/`-separated and starting with `/`.
    pub fn path(&self) -> &str {
        &self.path
    }

    /// Always false: a traversal only emits files, directories are
    /// descended into but never recorded.
    pub fn is_directory(&self) -> bool {
        false
    }

    pub fn size(&self) -> u64 {
        self.size
    }

    /// Handle into the owning source; valid only while it is open.
    pub fn node(&self) -> NodeId {
        self.node
    }
}

impl fmt::Display for Entry {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "[{}] {}", self.label, self.path)
    }
}

/// An archive (or subpackage) that could not be opened or read.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ArchiveFailure {
    /// Label of the archive containing the failed entry, or of the archive
    /// itself for a top-level failure.
    pub label: String,
    /// Path of the subpackage entry; empty for the top-level archive.
    pub path: String,
    pub message: String,
}

impl fmt::Display for ArchiveFailure {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.path.is_empty() {
            write!(f, "[{}] unable to open archive: {}", self.label, self.message)
        } else {
            write!(
                f,
                "[{}] unable to extract subpackage {}: {}",
                self.label, self.path, self.message
            )
        }
    }
}
