//! Violation records.

use serde::{Deserialize, Serialize};
use std::fmt;

/// Why an entry was rejected.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum ViolationReason {
    PathNotAllowed,
    PathExplicitlyDenied,
    SubpackageNotPermitted,
}

/// One rejected entry.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct ViolationRecord {
    /// Label of the archive containing the entry.
    pub label: String,
    pub path: String,
    pub reason: ViolationReason,
    /// The deny rule responsible, as written in the configuration.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub rule: Option<String>,
}

impl ViolationRecord {
    /// Human-readable message for build logs.
    pub fn message(&self) -> String {
        match self.reason {
            ViolationReason::PathNotAllowed | ViolationReason::PathExplicitlyDenied => format!(
                "[{}] detected violation of path rules: {}",
                self.label, self.path
            ),
            ViolationReason::SubpackageNotPermitted => {
                format!("detected subpackage at: {}", self.path)
            }
        }
    }
}

impl fmt::Display for ViolationRecord {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.message())
    }
}
