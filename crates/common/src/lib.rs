//! Common utilities and types shared across cpvalidate crates.

pub mod error;
pub mod pattern;
pub mod target;

pub use error::{Error, Result};
pub use pattern::PathPattern;
pub use target::{resolve_target, TARGET_EXTENSION};

/// Structural pattern identifying an embedded content package.
pub const DEFAULT_SUBPACKAGE_PATTERN: &str = r"/jcr_root/etc/packages/.*\.zip";
