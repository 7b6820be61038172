//! Depth-first traversal with transparent subpackage expansion.
//!
//! Entries are emitted in pre-order, children in archive order. When a file
//! entry matches the subpackage pattern, its content is opened as a zip of
//! its own and walked in place: the subpackage's entries follow the
//! subpackage entry directly, before any of its siblings.
//!
//! Each source is owned by the frame that opened it and closed by a
//! [`SourceGuard`] once that frame, and every frame nested below it, is done.

use crate::entry::{ArchiveFailure, Entry};
use crate::source::{ArchiveSource, NodeId, SourceGuard};
use crate::zip_source::ZipSource;
use crate::ArchiveError;
use cpvalidate_common::PathPattern;
use std::io::Read;
use std::path::Path;
use tracing::{debug, error};

/// Largest subpackage that is read into memory for expansion.
pub const DEFAULT_MAX_SUBPACKAGE_SIZE: u64 = 1024 * 1024 * 1024;

/// Deepest chain of subpackages inside subpackages that is expanded.
pub const DEFAULT_MAX_DEPTH: usize = 16;

/// Traversal settings.
#[derive(Debug, Clone)]
pub struct WalkOptions {
    /// Entries whose path matches are expanded as nested archives.
    pub subpackage_pattern: PathPattern,
    /// Subpackages larger than this, by header or by content, are not expanded.
    pub max_subpackage_size: u64,
    /// Subpackages nested deeper than this are not expanded.
    pub max_depth: usize,
}

impl Default for WalkOptions {
    fn default() -> Self {
        Self {
            subpackage_pattern: PathPattern::default(),
            max_subpackage_size: DEFAULT_MAX_SUBPACKAGE_SIZE,
            max_depth: DEFAULT_MAX_DEPTH,
        }
    }
}

/// Everything a traversal produced.
#[derive(Debug, Default)]
pub struct Walk {
    pub entries: Vec<Entry>,
    /// Archives that could not be opened; their subtrees contributed nothing.
    pub failures: Vec<ArchiveFailure>,
}

impl Walk {
    pub fn is_complete(&self) -> bool {
        self.failures.is_empty()
    }

    fn record_failure(&mut self, label: &str, path: &str, message: String) {
        self.failures.push(ArchiveFailure {
            label: label.to_string(),
            path: path.to_string(),
            message,
        });
    }
}

/// Walks content packages.
#[derive(Debug, Clone, Default)]
pub struct Walker {
    options: WalkOptions,
}

impl Walker {
    pub fn new(options: WalkOptions) -> Self {
        Self { options }
    }

    pub fn options(&self) -> &WalkOptions {
        &self.options
    }

    /// Open and walk a zip file, labelling its entries with the file name.
    ///
    /// Never fails: an unreadable file yields an empty walk carrying the
    /// failure.
    pub fn walk_file(&self, path: &Path) -> Walk {
        let label = path
            .file_name()
            .map(|n| n.to_string_lossy().to_string())
            .unwrap_or_else(|| path.display().to_string());

        match ZipSource::open_file(path) {
            Ok(source) => self.walk(source, &label),
            Err(e) => {
                error!("Failed to open content package {}: {}", label, e);
                let mut walk = Walk::default();
                walk.record_failure(&label, "", e.to_string());
                walk
            }
        }
    }

    /// Walk an already opened source. The source is closed before returning.
    pub fn walk<S: ArchiveSource>(&self, source: S, label: &str) -> Walk {
        let mut walk = Walk::default();
        self.walk_nested(source, label, 0, &mut walk);
        walk
    }

    fn walk_nested<S: ArchiveSource>(
        &self,
        source: S,
        label: &str,
        depth: usize,
        walk: &mut Walk,
    ) {
        let mut source = SourceGuard::new(source);
        let root = source.root();
        let frame = Frame { label, depth };
        self.visit(&mut *source, root, String::new(), &frame, walk);
    }

    fn visit(
        &self,
        source: &mut dyn ArchiveSource,
        node: NodeId,
        path: String,
        frame: &Frame<'_>,
        walk: &mut Walk,
    ) {
        let label = frame.label;
        let is_directory = source.is_directory(node);

        if !is_directory {
            let size = source.size(node);
            walk.entries.push(Entry::new(label, path.clone(), node, size));

            if self.options.subpackage_pattern.matches(&path) {
                self.expand_subpackage(source, node, &path, frame, walk);
            }
        }

        let children = source.children(node).to_vec();
        for child in children {
            let child_path = format!("{}/{}", path, source.name(child));
            debug!("Checking node {} in archive {}", child_path, label);
            self.visit(source, child, child_path, frame, walk);
        }
    }

    fn expand_subpackage(
        &self,
        source: &mut dyn ArchiveSource,
        node: NodeId,
        path: &str,
        frame: &Frame<'_>,
        walk: &mut Walk,
    ) {
        let label = frame.label;
        let depth = frame.depth + 1;
        if depth > self.options.max_depth {
            error!(
                "Subpackage {} in {} nested deeper than {} levels",
                path, label, self.options.max_depth
            );
            walk.record_failure(
                label,
                path,
                format!("subpackage nesting exceeds {} levels", self.options.max_depth),
            );
            return;
        }

        let nested_label = format!("{}:{}", label, path);
        debug!("Descending into subpackage {}", nested_label);

        let opened = read_entry(source, node, self.options.max_subpackage_size)
            .and_then(ZipSource::from_bytes);
        match opened {
            Ok(nested) => self.walk_nested(nested, &nested_label, depth, walk),
            Err(e) => {
                error!("Error while extracting subpackage {} in {}: {}", path, label, e);
                walk.record_failure(label, path, e.to_string());
            }
        }
    }
}

/// Where in the subpackage chain a traversal frame is.
struct Frame<'a> {
    label: &'a str,
    depth: usize,
}

/// Read a file node, refusing anything larger than `limit` bytes. The size
/// in the header is checked up front but never trusted for allocation.
fn read_entry(
    source: &mut dyn ArchiveSource,
    node: NodeId,
    limit: u64,
) -> crate::Result<Vec<u8>> {
    let declared = source.size(node);
    if declared > limit {
        return Err(ArchiveError::TooLarge { size: declared, limit });
    }

    let mut content = Vec::new();
    source
        .open_entry(node)?
        .take(limit.saturating_add(1))
        .read_to_end(&mut content)?;

    if content.len() as u64 > limit {
        return Err(ArchiveError::TooLarge {
            size: content.len() as u64,
            limit,
        });
    }
    Ok(content)
}
