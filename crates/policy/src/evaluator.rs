//! Applies a rule set and the subpackage permission to walked entries.

use crate::rules::{RuleSet, Verdict};
use crate::violation::{ViolationReason, ViolationRecord};
use cpvalidate_archive::Entry;
use cpvalidate_common::PathPattern;
use tracing::debug;

/// Policy evaluator.
#[derive(Debug, Clone)]
pub struct Evaluator {
    rules: RuleSet,
    allow_subpackages: bool,
    subpackage_pattern: PathPattern,
}

impl Evaluator {
    pub fn new(rules: RuleSet, allow_subpackages: bool) -> Self {
        Self {
            rules,
            allow_subpackages,
            subpackage_pattern: PathPattern::subpackages(),
        }
    }

    /// Use a different pattern to recognise subpackages.
    pub fn with_subpackage_pattern(mut self, pattern: PathPattern) -> Self {
        self.subpackage_pattern = pattern;
        self
    }

    pub fn rules(&self) -> &RuleSet {
        &self.rules
    }

    /// Check every entry. Violations come out in entry order; for a single
    /// entry the path violation precedes the subpackage violation.
    pub fn evaluate(&self, entries: &[Entry]) -> Vec<ViolationRecord> {
        let mut violations = Vec::new();

        for entry in entries {
            if let Some(violation) = self.check_path(entry) {
                debug!("{}", violation);
                violations.push(violation);
            }
            if let Some(violation) = self.check_subpackage(entry) {
                debug!("{}", violation);
                violations.push(violation);
            }
        }

        violations
    }

    fn check_path(&self, entry: &Entry) -> Option<ViolationRecord> {
        let (reason, rule) = match self.rules.check(entry.path()) {
            Verdict::Compliant => return None,
            Verdict::NotAllowed { denied_by } => (ViolationReason::PathNotAllowed, denied_by),
            Verdict::Denied { rule } => (ViolationReason::PathExplicitlyDenied, Some(rule)),
        };

        Some(ViolationRecord {
            label: entry.label().to_string(),
            path: entry.path().to_string(),
            reason,
            rule,
        })
    }

    fn check_subpackage(&self, entry: &Entry) -> Option<ViolationRecord> {
        if self.allow_subpackages || !self.subpackage_pattern.matches(entry.path()) {
            return None;
        }

        Some(ViolationRecord {
            label: entry.label().to_string(),
            path: entry.path().to_string(),
            reason: ViolationReason::SubpackageNotPermitted,
            rule: None,
        })
    }
}

/// Evaluate entries with the default subpackage pattern.
pub fn evaluate(
    entries: &[Entry],
    rules: &RuleSet,
    allow_subpackages: bool,
) -> Vec<ViolationRecord> {
    Evaluator::new(rules.clone(), allow_subpackages).evaluate(entries)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::rules::RuleMode;
    use cpvalidate_archive::NodeId;
    use pretty_assertions::assert_eq;
    use proptest::prelude::*;

    fn entry(label: &str, path: &str) -> Entry {
        Entry::new(label, path, NodeId::from(0), 0)
    }

    fn reasons(violations: &[ViolationRecord]) -> Vec<(&str, ViolationReason)> {
        violations
            .iter()
            .map(|v| (v.path.as_str(), v.reason))
            .collect()
    }

    const SUBPACKAGE: &str = "/jcr_root/etc/packages/inner.zip";

    #[test]
    fn test_deny_list_jsp() {
        let rules = RuleSet::compile(RuleMode::DenyList, &[".*\\.jsp$"]).unwrap();
        let entries = vec![
            entry("site.zip", "/jcr_root/apps/site/page.jsp"),
            entry("site.zip", "/jcr_root/apps/site/page.html"),
        ];

        let violations = evaluate(&entries, &rules, true);

        assert_eq!(
            violations,
            vec![ViolationRecord {
                label: "site.zip".to_string(),
                path: "/jcr_root/apps/site/page.jsp".to_string(),
                reason: ViolationReason::PathExplicitlyDenied,
                rule: Some(".*\\.jsp$".to_string()),
            }]
        );
    }

    #[test]
    fn test_allow_list_with_negation() {
        let rules =
            RuleSet::compile(RuleMode::AllowList, &["/jcr_root/apps/.*", "!.*\\.jsp"]).unwrap();
        let entries = vec![
            entry("site.zip", "/jcr_root/apps/site/page.html"),
            entry("site.zip", "/jcr_root/apps/site/page.jsp"),
            entry("site.zip", "/jcr_root/content/site/page.html"),
        ];

        let violations = evaluate(&entries, &rules, true);

        assert_eq!(
            reasons(&violations),
            vec![
                ("/jcr_root/apps/site/page.jsp", ViolationReason::PathNotAllowed),
                ("/jcr_root/content/site/page.html", ViolationReason::PathNotAllowed),
            ]
        );
        assert_eq!(violations[0].rule.as_deref(), Some("!.*\\.jsp"));
        assert_eq!(violations[1].rule, None);
    }

    #[test]
    fn test_subpackage_reported_even_when_path_allowed() {
        let rules = RuleSet::compile(RuleMode::AllowList, &["/jcr_root/.*"]).unwrap();
        let entries = vec![entry("outer.zip", SUBPACKAGE)];

        let violations = evaluate(&entries, &rules, false);

        assert_eq!(
            reasons(&violations),
            vec![(SUBPACKAGE, ViolationReason::SubpackageNotPermitted)]
        );
    }

    #[test]
    fn test_subpackage_still_path_checked() {
        let rules = RuleSet::compile(RuleMode::AllowList, &["/jcr_root/apps/.*"]).unwrap();
        let entries = vec![entry("outer.zip", SUBPACKAGE)];

        let violations = evaluate(&entries, &rules, false);
        assert_eq!(
            reasons(&violations),
            vec![
                (SUBPACKAGE, ViolationReason::PathNotAllowed),
                (SUBPACKAGE, ViolationReason::SubpackageNotPermitted),
            ]
        );

        let violations = evaluate(&entries, &rules, true);
        assert_eq!(
            reasons(&violations),
            vec![(SUBPACKAGE, ViolationReason::PathNotAllowed)]
        );
    }

    #[test]
    fn test_custom_subpackage_pattern() {
        let rules = RuleSet::compile(RuleMode::DenyList, &["/nothing"]).unwrap();
        let evaluator = Evaluator::new(rules, false)
            .with_subpackage_pattern(PathPattern::new(r"/bundles/.*\.jar").unwrap());
        let entries = vec![entry("app.zip", "/bundles/a.jar"), entry("app.zip", SUBPACKAGE)];

        let violations = evaluator.evaluate(&entries);

        assert_eq!(
            reasons(&violations),
            vec![("/bundles/a.jar", ViolationReason::SubpackageNotPermitted)]
        );
    }

    #[test]
    fn test_labels_carried_into_violations() {
        let rules = RuleSet::compile(RuleMode::DenyList, &[".*"]).unwrap();
        let label = "outer.zip:/jcr_root/etc/packages/inner.zip";
        let violations = evaluate(&[entry(label, "/jcr_root/content/page.html")], &rules, true);

        assert_eq!(violations[0].label, label);
        assert_eq!(
            violations[0].message(),
            "[outer.zip:/jcr_root/etc/packages/inner.zip] detected violation of path rules: /jcr_root/content/page.html"
        );
    }

    fn path_strategy() -> impl Strategy<Value = String> {
        prop_oneof![
            "(/[a-z_]{1,6}){1,5}(\\.(html|jsp|xml|zip))?",
            "/jcr_root/etc/packages(/[a-z_]{1,6}){1,2}\\.zip",
        ]
    }

    fn entries_strategy() -> impl Strategy<Value = Vec<Entry>> {
        prop::collection::vec(path_strategy(), 0..20).prop_map(|paths| {
            paths
                .iter()
                .map(|p| entry("site.zip", p))
                .collect::<Vec<_>>()
        })
    }

    proptest! {
        #[test]
        fn prop_no_positive_rules_rejects_every_entry(
            entries in entries_strategy(),
            negated in prop::collection::vec("![a-z/.*]{1,8}", 0..4),
        ) {
            prop_assume!(negated.iter().all(|r| RuleSet::compile(RuleMode::AllowList, &[r]).is_ok()));
            let rules = RuleSet::compile(RuleMode::AllowList, &negated).unwrap();

            let violations = evaluate(&entries, &rules, true);

            prop_assert_eq!(violations.len(), entries.len());
            prop_assert!(violations.iter().all(|v| v.reason == ViolationReason::PathNotAllowed));
        }

        #[test]
        fn prop_negative_overrides_positive(path in path_strategy()) {
            let rules = RuleSet::compile(RuleMode::AllowList, &[".*", "!.*"]).unwrap();

            let violations = evaluate(&[entry("site.zip", &path)], &rules, true);

            prop_assert_eq!(violations.len(), 1);
            prop_assert_eq!(violations[0].reason, ViolationReason::PathNotAllowed);
            prop_assert_eq!(violations[0].rule.as_deref(), Some("!.*"));
        }

        #[test]
        fn prop_only_subpackages_reported_as_subpackages(entries in entries_strategy()) {
            let rules = RuleSet::compile(RuleMode::AllowList, &[".*"]).unwrap();
            let subpackages = PathPattern::subpackages();

            let violations = evaluate(&entries, &rules, false);

            for v in &violations {
                prop_assert_eq!(v.reason, ViolationReason::SubpackageNotPermitted);
                prop_assert!(subpackages.matches(&v.path));
            }
        }

        #[test]
        fn prop_evaluation_is_idempotent(
            entries in entries_strategy(),
            allow_subpackages in any::<bool>(),
        ) {
            let rules = RuleSet::compile(
                RuleMode::AllowList,
                &["/[a-m].*", "!.*\\.jsp", "/jcr_root/.*"],
            )
            .unwrap();

            let first = evaluate(&entries, &rules, allow_subpackages);
            let second = evaluate(&entries, &rules, allow_subpackages);

            prop_assert_eq!(first, second);
        }
    }
}
