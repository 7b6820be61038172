//! Validation reports.

use crate::ValidateError;
use chrono::{DateTime, Utc};
use cpvalidate_archive::ArchiveFailure;
use cpvalidate_policy::ViolationRecord;
use serde::Serialize;
use std::str::FromStr;
use tracing::{error, info, warn};

/// A failure to read part of the package, as recorded in a report.
#[derive(Debug, Clone, Serialize)]
pub struct FailureRecord {
    pub label: String,
    pub path: String,
    pub message: String,
}

impl From<&ArchiveFailure> for FailureRecord {
    fn from(failure: &ArchiveFailure) -> Self {
        Self {
            label: failure.label.clone(),
            path: failure.path.clone(),
            message: failure.message.clone(),
        }
    }
}

/// Outcome of validating one package.
#[derive(Debug, Clone, Serialize)]
pub struct ValidationReport {
    /// The resolved package path.
    pub archive: String,
    pub generated_at: DateTime<Utc>,
    pub policy: String,
    pub entries_checked: usize,
    pub violations: Vec<ViolationRecord>,
    pub failures: Vec<FailureRecord>,
    /// The policy could not reject anything, so the package was not read.
    pub skipped: bool,
}

impl ValidationReport {
    pub fn is_clean(&self) -> bool {
        self.violations.is_empty()
    }

    /// Violation messages in entry order.
    pub fn messages(&self) -> Vec<String> {
        self.violations.iter().map(|v| v.message()).collect()
    }

    pub fn summary(&self) -> String {
        format!(
            "{} violation(s) against policy ({})",
            self.violations.len(),
            self.policy
        )
    }

    /// Write the report to the log.
    pub fn log(&self) {
        for failure in &self.failures {
            error!(
                "Could not read {} in {}: {}",
                display_path(&failure.path),
                failure.label,
                failure.message
            );
        }

        if self.is_clean() {
            info!("No policy violations in {} entries", self.entries_checked);
            return;
        }

        warn!("{}", self.summary());
        for message in self.messages() {
            warn!("{}", message);
        }
    }

    /// Fail when violations exist and the build is configured to break.
    pub fn enforce(&self, break_build: bool) -> Result<(), ValidateError> {
        if break_build && !self.is_clean() {
            return Err(ValidateError::PolicyViolation {
                count: self.violations.len(),
            });
        }
        Ok(())
    }

    pub fn render(&self, format: OutputFormat) -> Result<String, ValidateError> {
        match format {
            OutputFormat::Text => Ok(self.render_text()),
            OutputFormat::Json => Ok(serde_json::to_string_pretty(self)?),
        }
    }

    fn render_text(&self) -> String {
        let mut out = String::new();

        if self.skipped {
            out.push_str("Validation skipped: policy permits every entry\n");
            return out;
        }

        out.push_str(&format!("Package: {}\n", self.archive));
        out.push_str(&format!("Entries checked: {}\n", self.entries_checked));
        out.push_str(&format!("{}\n", self.summary()));
        for message in self.messages() {
            out.push_str(&format!("  {}\n", message));
        }

        if !self.failures.is_empty() {
            out.push_str("Unreadable archives:\n");
            for failure in &self.failures {
                out.push_str(&format!(
                    "  [{}] {}: {}\n",
                    failure.label,
                    display_path(&failure.path),
                    failure.message
                ));
            }
        }

        out
    }
}

fn display_path(path: &str) -> &str {
    if path.is_empty() {
        "<archive>"
    } else {
        path
    }
}

/// Report output format.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum OutputFormat {
    #[default]
    Text,
    Json,
}

impl OutputFormat {
    /// Whether findings also go to the log. Text output already lists them.
    pub fn logs_findings(self) -> bool {
        self == OutputFormat::Json
    }
}

impl FromStr for OutputFormat {
    type Err = ValidateError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "text" => Ok(OutputFormat::Text),
            "json" => Ok(OutputFormat::Json),
            _ => Err(ValidateError::InvalidFormat(s.to_string())),
        }
    }
}
