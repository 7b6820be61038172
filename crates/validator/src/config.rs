//! Validation configuration.

use cpvalidate_common::{Error, PathPattern, Result, DEFAULT_SUBPACKAGE_PATTERN};
use cpvalidate_policy::{RuleMode, RuleSet};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

/// Settings for one validation run.
///
/// Loadable from YAML or JSON; every field has a default so a file only
/// needs the keys it changes.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ValidationConfig {
    /// Package to validate. `.zip` is appended when missing.
    pub target: PathBuf,
    /// Path rules, written in the convention selected by `mode`.
    pub rules: Vec<String>,
    pub mode: RuleMode,
    /// Turn a non-empty violation list into a failed run.
    pub break_build_on_violation: bool,
    pub allow_subpackages: bool,
    /// Entries matching this pattern are expanded as nested packages.
    pub subpackage_pattern: String,
    /// Treat a missing target as a failed run instead of a no-op.
    pub fail_on_missing_target: bool,
}

impl Default for ValidationConfig {
    fn default() -> Self {
        Self {
            target: PathBuf::new(),
            rules: Vec::new(),
            mode: RuleMode::default(),
            break_build_on_violation: false,
            allow_subpackages: true,
            subpackage_pattern: DEFAULT_SUBPACKAGE_PATTERN.to_string(),
            fail_on_missing_target: false,
        }
    }
}

impl ValidationConfig {
    /// Reject settings no run can use, wherever they came from.
    pub fn validate(&self) -> Result<()> {
        if self.subpackage_pattern.is_empty() {
            return Err(Error::Config("subpackage_pattern must not be empty".to_string()));
        }
        Ok(())
    }

    /// No rule can produce a violation.
    pub fn is_trivially_permissive(&self) -> bool {
        self.rules.is_empty() && self.allow_subpackages
    }

    pub fn rule_set(&self) -> std::result::Result<RuleSet, cpvalidate_policy::PolicyError> {
        RuleSet::compile(self.mode, &self.rules)
    }

    pub fn subpackage_pattern(&self) -> Result<PathPattern> {
        PathPattern::new(&self.subpackage_pattern)
    }

    /// One-line description of the policy for report headers.
    pub fn policy_string(&self) -> String {
        format!(
            "rules = [{}], mode = {}, allowSubpackages = {}",
            self.rules.join(","),
            self.mode,
            self.allow_subpackages
        )
    }
}

/// Load a configuration file. `.json` files are read as JSON, anything
/// else as YAML.
pub fn load_config(path: &Path) -> Result<ValidationConfig> {
    let content = std::fs::read_to_string(path)?;

    let is_json = path
        .extension()
        .map(|e| e.eq_ignore_ascii_case("json"))
        .unwrap_or(false);

    let config: ValidationConfig = if is_json {
        serde_json::from_str(&content)?
    } else {
        serde_yaml::from_str(&content)?
    };

    config.validate()?;
    Ok(config)
}

#[cfg(test)]
mod tests {
    use super::*;
    use assert_fs::prelude::*;

    #[test]
    fn test_defaults() {
        let config = ValidationConfig::default();
        assert!(config.allow_subpackages);
        assert!(!config.break_build_on_violation);
        assert!(!config.fail_on_missing_target);
        assert_eq!(config.mode, RuleMode::AllowList);
        assert_eq!(config.subpackage_pattern, DEFAULT_SUBPACKAGE_PATTERN);
        assert!(config.is_trivially_permissive());
    }

    #[test]
    fn test_trivially_permissive() {
        let config = ValidationConfig {
            allow_subpackages: false,
            ..Default::default()
        };
        assert!(!config.is_trivially_permissive());

        let config = ValidationConfig {
            rules: vec!["/jcr_root/.*".to_string()],
            ..Default::default()
        };
        assert!(!config.is_trivially_permissive());
    }

    #[test]
    fn test_policy_string() {
        let config = ValidationConfig {
            rules: vec!["/jcr_root/apps/.*".to_string(), "!.*\\.jsp".to_string()],
            allow_subpackages: false,
            ..Default::default()
        };
        assert_eq!(
            config.policy_string(),
            "rules = [/jcr_root/apps/.*,!.*\\.jsp], mode = allow-list, allowSubpackages = false"
        );
    }

    #[test]
    fn test_load_yaml_config() {
        let dir = assert_fs::TempDir::new().unwrap();
        let file = dir.child("validation.yaml");
        file.write_str(
            r#"
target: target/site
mode: deny-list
rules:
  - ".*\\.jsp"
  - "/jcr_root/libs/.*"
break_build_on_violation: true
allow_subpackages: false
"#,
        )
        .unwrap();

        let config = load_config(file.path()).unwrap();
        assert_eq!(config.target, PathBuf::from("target/site"));
        assert_eq!(config.mode, RuleMode::DenyList);
        assert_eq!(config.rules, vec![".*\\.jsp", "/jcr_root/libs/.*"]);
        assert!(config.break_build_on_violation);
        assert!(!config.allow_subpackages);
        assert_eq!(config.subpackage_pattern, DEFAULT_SUBPACKAGE_PATTERN);
    }

    #[test]
    fn test_load_json_config() {
        let dir = assert_fs::TempDir::new().unwrap();
        let file = dir.child("validation.json");
        file.write_str(r#"{"rules": ["/jcr_root/.*"], "subpackage_pattern": "/bundles/.*"}"#)
            .unwrap();

        let config = load_config(file.path()).unwrap();
        assert_eq!(config.rules, vec!["/jcr_root/.*"]);
        assert_eq!(config.mode, RuleMode::AllowList);
        assert!(config.subpackage_pattern().unwrap().matches("/bundles/a.jar"));
    }

    #[test]
    fn test_load_rejects_empty_subpackage_pattern() {
        let dir = assert_fs::TempDir::new().unwrap();
        let file = dir.child("validation.yaml");
        file.write_str("subpackage_pattern: \"\"\n").unwrap();

        assert!(matches!(load_config(file.path()), Err(Error::Config(_))));
    }

    #[test]
    fn test_validate_empty_subpackage_pattern() {
        assert!(ValidationConfig::default().validate().is_ok());

        let config = ValidationConfig {
            subpackage_pattern: String::new(),
            ..Default::default()
        };
        assert!(matches!(config.validate(), Err(Error::Config(_))));
    }

    #[test]
    fn test_load_rejects_unknown_mode() {
        let dir = assert_fs::TempDir::new().unwrap();
        let file = dir.child("validation.yaml");
        file.write_str("mode: whitelist\n").unwrap();

        assert!(matches!(load_config(file.path()), Err(Error::Yaml(_))));
    }
}
