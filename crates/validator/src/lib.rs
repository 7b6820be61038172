//! cpvalidate Validator - Walk a content package and check it against a
//! path policy.

pub mod config;
pub mod report;

pub use config::{load_config, ValidationConfig};
pub use report::{FailureRecord, OutputFormat, ValidationReport};

use chrono::Utc;
use cpvalidate_archive::{Walk, WalkOptions, Walker};
use cpvalidate_common::{resolve_target, PathPattern};
use cpvalidate_policy::{Evaluator, PolicyError};
use std::path::{Path, PathBuf};
use thiserror::Error;
use tracing::{debug, info};

/// Errors surfaced to the caller of a validation run.
#[derive(Error, Debug)]
pub enum ValidateError {
    #[error("File {} does not exist", .0.display())]
    TargetMissing(PathBuf),

    #[error("Invalid policy: {0}")]
    Policy(#[from] PolicyError),

    #[error(transparent)]
    Common(#[from] cpvalidate_common::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("Invalid output format: {0}")]
    InvalidFormat(String),

    #[error("policy violation detected ({count} violation(s)), please check build logs")]
    PolicyViolation { count: usize },
}

/// Run the full validation pipeline for one package.
///
/// Archive read failures do not fail the run; they are listed in the
/// report. A missing package is an error so the caller can decide how
/// strict to be about it.
pub fn run_validation(config: &ValidationConfig) -> Result<ValidationReport, ValidateError> {
    config.validate()?;
    let target = resolve_target(&config.target);

    if config.is_trivially_permissive() {
        info!("No path rules configured and subpackages allowed, skipping validation");
        return Ok(ValidationReport {
            archive: target.display().to_string(),
            generated_at: Utc::now(),
            policy: config.policy_string(),
            entries_checked: 0,
            violations: vec![],
            failures: vec![],
            skipped: true,
        });
    }

    // Step 1: Compile the policy before touching the package
    let rules = config.rule_set()?;
    let subpackage_pattern = config.subpackage_pattern()?;

    // Step 2: Walk the package
    let walk = walk_target(&target, subpackage_pattern.clone())?;

    // Step 3: Evaluate
    let evaluator = Evaluator::new(rules, config.allow_subpackages)
        .with_subpackage_pattern(subpackage_pattern);
    let violations = evaluator.evaluate(&walk.entries);

    Ok(ValidationReport {
        archive: target.display().to_string(),
        generated_at: Utc::now(),
        policy: config.policy_string(),
        entries_checked: walk.entries.len(),
        violations,
        failures: walk.failures.iter().map(FailureRecord::from).collect(),
        skipped: false,
    })
}

/// Walk a package without evaluating it, for listing its content.
pub fn dump_content(target: &Path, subpackage_pattern: PathPattern) -> Result<Walk, ValidateError> {
    walk_target(&resolve_target(target), subpackage_pattern)
}

fn walk_target(target: &Path, subpackage_pattern: PathPattern) -> Result<Walk, ValidateError> {
    if !target.exists() {
        return Err(ValidateError::TargetMissing(target.to_path_buf()));
    }

    debug!("Using {} as input", target.display());

    let walker = Walker::new(WalkOptions {
        subpackage_pattern,
        ..Default::default()
    });
    let walk = walker.walk_file(target);

    info!(
        "Walked {} entries in {} ({} unreadable archive(s))",
        walk.entries.len(),
        target.display(),
        walk.failures.len()
    );
    Ok(walk)
}
