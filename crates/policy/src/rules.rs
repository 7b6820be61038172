//! Rule model.
//!
//! Two conventions exist for writing path rules:
//!
//! * **allow-list** (default): plain patterns allow, patterns prefixed with
//!   `!` deny. A path passes when at least one allow rule matches and no
//!   deny rule does. Without allow rules nothing passes.
//! * **deny-list** (legacy): every pattern denies. A path passes when no
//!   rule matches.
//!
//! Both compile into the same [`RuleSet`]; the mode is always explicit.

use crate::{PolicyError, Result};
use cpvalidate_common::PathPattern;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// Prefix marking a deny rule in allow-list mode.
pub const NEGATION_MARKER: char = '!';

/// Which rule convention a rule list is written in.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum RuleMode {
    #[default]
    AllowList,
    DenyList,
}

impl fmt::Display for RuleMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            RuleMode::AllowList => write!(f, "allow-list"),
            RuleMode::DenyList => write!(f, "deny-list"),
        }
    }
}

impl FromStr for RuleMode {
    type Err = PolicyError;

    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "allow-list" | "allowlist" | "allow" => Ok(RuleMode::AllowList),
            "deny-list" | "denylist" | "deny" => Ok(RuleMode::DenyList),
            _ => Err(PolicyError::InvalidMode(s.to_string())),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Polarity {
    Allow,
    Deny,
}

/// A compiled path rule.
#[derive(Debug, Clone)]
pub struct Rule {
    pattern: PathPattern,
    polarity: Polarity,
    source: String,
}

impl Rule {
    pub fn allow(pattern: &str) -> Result<Self> {
        Ok(Self {
            pattern: PathPattern::new(pattern)?,
            polarity: Polarity::Allow,
            source: pattern.to_string(),
        })
    }

    pub fn deny(pattern: &str) -> Result<Self> {
        Ok(Self {
            pattern: PathPattern::new(pattern)?,
            polarity: Polarity::Deny,
            source: pattern.to_string(),
        })
    }

    pub fn polarity(&self) -> Polarity {
        self.polarity
    }

    /// The rule as written in the configuration, including any marker.
    pub fn source(&self) -> &str {
        &self.source
    }

    pub fn matches(&self, path: &str) -> bool {
        self.pattern.matches(path)
    }
}

/// Outcome of checking one path.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Verdict {
    Compliant,
    /// Allow-list mode: no allow rule matched, or `denied_by` matched.
    NotAllowed { denied_by: Option<String> },
    /// Deny-list mode: `rule` matched.
    Denied { rule: String },
}

impl Verdict {
    pub fn is_compliant(&self) -> bool {
        matches!(self, Verdict::Compliant)
    }
}

/// An ordered, compiled rule list.
#[derive(Debug, Clone, Default)]
pub struct RuleSet {
    mode: RuleMode,
    rules: Vec<Rule>,
}

impl RuleSet {
    /// Compile rules written in the given convention.
    pub fn compile<S: AsRef<str>>(mode: RuleMode, rules: &[S]) -> Result<Self> {
        let rules = rules
            .iter()
            .map(|r| compile_rule(mode, r.as_ref()))
            .collect::<Result<Vec<_>>>()?;

        Ok(Self { mode, rules })
    }

    pub fn mode(&self) -> RuleMode {
        self.mode
    }

    pub fn rules(&self) -> &[Rule] {
        &self.rules
    }

    pub fn is_empty(&self) -> bool {
        self.rules.is_empty()
    }

    /// Decide whether a path complies. Rule order never changes the outcome;
    /// it only decides which deny rule is reported.
    pub fn check(&self, path: &str) -> Verdict {
        let denied_by = self
            .rules
            .iter()
            .find(|r| r.polarity == Polarity::Deny && r.matches(path))
            .map(|r| r.source.clone());

        match self.mode {
            RuleMode::AllowList => {
                let allowed = self
                    .rules
                    .iter()
                    .any(|r| r.polarity == Polarity::Allow && r.matches(path));
                if allowed && denied_by.is_none() {
                    Verdict::Compliant
                } else {
                    Verdict::NotAllowed { denied_by }
                }
            }
            RuleMode::DenyList => match denied_by {
                Some(rule) => Verdict::Denied { rule },
                None => Verdict::Compliant,
            },
        }
    }
}

fn compile_rule(mode: RuleMode, rule: &str) -> Result<Rule> {
    match (mode, rule.strip_prefix(NEGATION_MARKER)) {
        (RuleMode::AllowList, Some(negated)) => Ok(Rule {
            pattern: PathPattern::new(negated)?,
            polarity: Polarity::Deny,
            source: rule.to_string(),
        }),
        (RuleMode::AllowList, None) => Rule::allow(rule),
        (RuleMode::DenyList, Some(_)) => Err(PolicyError::NegationInDenyList(rule.to_string())),
        (RuleMode::DenyList, None) => Rule::deny(rule),
    }
}
