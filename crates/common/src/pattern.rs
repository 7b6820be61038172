//! Anchored path patterns.
//!
//! Paths are always matched as a whole: `/apps/.*` matches `/apps/foo` but
//! `apps` does not match `/apps/foo`.

use crate::{Error, Result};
use regex::Regex;
use std::fmt;
use std::sync::LazyLock;

static SUBPACKAGES: LazyLock<PathPattern> =
    LazyLock::new(|| PathPattern::new(crate::DEFAULT_SUBPACKAGE_PATTERN).unwrap());

/// A regular expression that must match an entire entry path.
#[derive(Debug, Clone)]
pub struct PathPattern {
    source: String,
    regex: Regex,
}

impl PathPattern {
    /// Compile a pattern. The expression is wrapped in `^(?:...)$`.
    pub fn new(source: &str) -> Result<Self> {
        let regex = Regex::new(&format!("^(?:{})$", source)).map_err(|e| {
            Error::InvalidPattern {
                pattern: source.to_string(),
                reason: e.to_string(),
            }
        })?;

        Ok(Self {
            source: source.to_string(),
            regex,
        })
    }

    /// Check whether the whole path matches.
    pub fn matches(&self, path: &str) -> bool {
        self.regex.is_match(path)
    }

    /// The pattern as it was written.
    pub fn source(&self) -> &str {
        &self.source
    }

    /// The default subpackage pattern.
    pub fn subpackages() -> Self {
        SUBPACKAGES.clone()
    }
}

impl Default for PathPattern {
    fn default() -> Self {
        Self::subpackages()
    }
}

impl fmt::Display for PathPattern {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.source)
    }
}
