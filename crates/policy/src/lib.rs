//! Path policies for content packages.
//!
//! A [`RuleSet`] decides, per entry path, whether the path may ship. The
//! [`Evaluator`] applies it to a walked package together with the
//! subpackage permission and produces [`ViolationRecord`]s in entry order.

pub mod evaluator;
pub mod rules;
pub mod violation;

pub use evaluator::{evaluate, Evaluator};
pub use rules::{Polarity, Rule, RuleMode, RuleSet, Verdict, NEGATION_MARKER};
pub use violation::{ViolationReason, ViolationRecord};

use thiserror::Error;

/// Policy configuration errors.
#[derive(Error, Debug)]
pub enum PolicyError {
    #[error(transparent)]
    Pattern(#[from] cpvalidate_common::Error),

    #[error("Negated rule '{0}' is not supported in deny-list mode")]
    NegationInDenyList(String),

    #[error("Invalid rule mode: {0}")]
    InvalidMode(String),
}

/// Result type alias for policy operations.
pub type Result<T> = std::result::Result<T, PolicyError>;
