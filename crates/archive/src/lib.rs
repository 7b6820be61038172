//! Content package traversal.
//!
//! A content package is a zip file whose entries form a tree rooted at an
//! unnamed root node. Packages may embed further packages ("subpackages");
//! the [`Walker`] expands those transparently and attributes every entry to
//! the archive it was found in through a colon-joined label.

pub mod entry;
pub mod source;
pub mod walker;
pub mod zip_source;

pub use entry::{ArchiveFailure, Entry};
pub use source::{ArchiveSource, NodeId, SourceGuard};
pub use walker::{Walk, WalkOptions, Walker, DEFAULT_MAX_DEPTH, DEFAULT_MAX_SUBPACKAGE_SIZE};
pub use zip_source::ZipSource;

use thiserror::Error;

/// Errors raised while opening or reading an archive.
#[derive(Error, Debug)]
pub enum ArchiveError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Zip error: {0}")]
    Zip(#[from] zip::result::ZipError),

    #[error("Archive is already closed")]
    Closed,

    #[error("Not a file entry: {0}")]
    NotAFile(String),

    #[error("Entry of {size} bytes exceeds the {limit} byte limit")]
    TooLarge { size: u64, limit: u64 },
}

/// Result type alias for archive operations.
pub type Result<T> = std::result::Result<T, ArchiveError>;
