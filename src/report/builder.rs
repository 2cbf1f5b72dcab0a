use super::types::*;
use crate::engine::RunMode;
use std::collections::HashSet;

/// Accumulates the results of one run and produces the final [`Report`]
pub(crate) struct ReportBuilder {
    report: Report,
    seen: HashSet<(String, Scope)>,
}

impl ReportBuilder {
    pub(crate) fn new(database: impl Into<String>, mode: RunMode) -> Self {
        Self {
            report: Report::new(database.into(), mode),
            seen: HashSet::new(),
        }
    }

    /// Append a finding and return its index, or `None` if the same rule
    /// already reported this scope.
    pub(crate) fn add_finding(&mut self, finding: Finding) -> Option<usize> {
        let key = (finding.rule_id.clone(), finding.scope.clone());
        if !self.seen.insert(key) {
            return None;
        }
        self.report.findings.push(finding);
        Some(self.report.findings.len() - 1)
    }

    /// Record a fix outcome. Outcomes are only accepted for existing
    /// fixable findings, at most one per finding.
    pub(crate) fn add_fix_outcome(&mut self, outcome: FixOutcome) -> bool {
        let fixable = self
            .report
            .findings
            .get(outcome.finding_index)
            .is_some_and(|f| f.fixable);
        if !fixable || self.report.outcome_for(outcome.finding_index).is_some() {
            return false;
        }
        self.report.fix_outcomes.push(outcome);
        true
    }

    pub(crate) fn add_rule_failure(&mut self, failure: RuleFailure) {
        self.report.rule_failures.push(failure);
    }

    /// Finish the report, deriving the summary from its contents
    pub(crate) fn build(self) -> Report {
        let mut report = self.report;

        let count = |severity: Severity| {
            report
                .findings
                .iter()
                .filter(|f| f.severity == severity)
                .count()
        };
        let info_count = count(Severity::Info);
        let warning_count = count(Severity::Warning);
        let error_count = count(Severity::Error);
        let fixes_applied = report.fix_outcomes.iter().filter(|o| o.applied).count();

        report.summary = Summary {
            status: if error_count > 0 {
                ReportStatus::Error
            } else if warning_count > 0 || !report.rule_failures.is_empty() {
                ReportStatus::Warning
            } else {
                ReportStatus::Clean
            },
            findings_count: report.findings.len(),
            info_count,
            warning_count,
            error_count,
            fixes_applied,
            fixes_failed: report.fix_outcomes.len() - fixes_applied,
            rule_failures: report.rule_failures.len(),
        };

        report
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    fn finding(rule_id: &str, column: &str, severity: Severity, fixable: bool) -> Finding {
        Finding {
            rule_id: rule_id.to_string(),
            scope: Scope::Column(ColumnRef::new("t", column)),
            severity,
            message: "msg".to_string(),
            fixable,
        }
    }

    #[test]
    fn test_builder_empty_report() {
        let report = ReportBuilder::new("db", RunMode::Lint).build();

        assert_eq!(report.summary().status, ReportStatus::Clean);
        assert_eq!(report.summary().findings_count, 0);
        assert!(report.findings().is_empty());
    }

    #[test]
    fn test_builder_rejects_duplicate_scope() {
        let mut builder = ReportBuilder::new("db", RunMode::Lint);
        assert_eq!(
            builder.add_finding(finding("L0001", "a", Severity::Warning, true)),
            Some(0)
        );
        assert_eq!(
            builder.add_finding(finding("L0001", "a", Severity::Warning, true)),
            None
        );
        assert_eq!(
            builder.add_finding(finding("L0002", "a", Severity::Warning, true)),
            Some(1)
        );
        assert_eq!(builder.build().findings().len(), 2);
    }

    #[test]
    fn test_builder_outcome_requires_fixable_finding() {
        let mut builder = ReportBuilder::new("db", RunMode::Fix);
        builder.add_finding(finding("L0003", "a", Severity::Error, false));
        builder.add_finding(finding("L0002", "b", Severity::Warning, true));

        let outcome = |index| FixOutcome {
            finding_index: index,
            applied: true,
            error: None,
            rows_affected: 1,
        };
        assert!(!builder.add_fix_outcome(outcome(0)));
        assert!(!builder.add_fix_outcome(outcome(5)));
        assert!(builder.add_fix_outcome(outcome(1)));
        assert!(!builder.add_fix_outcome(outcome(1)));
    }

    #[test]
    fn test_builder_summary_counts() {
        let mut builder = ReportBuilder::new("db", RunMode::Fix);
        builder.add_finding(finding("L0001", "a", Severity::Warning, true));
        builder.add_finding(finding("L0002", "b", Severity::Warning, true));
        builder.add_finding(finding("X", "c", Severity::Info, false));
        builder.add_fix_outcome(FixOutcome {
            finding_index: 0,
            applied: false,
            error: Some("boom".to_string()),
            rows_affected: 0,
        });
        builder.add_fix_outcome(FixOutcome {
            finding_index: 1,
            applied: true,
            error: None,
            rows_affected: 2,
        });

        let report = builder.build();
        let summary = report.summary();
        assert_eq!(summary.status, ReportStatus::Warning);
        assert_eq!(summary.findings_count, 3);
        assert_eq!(summary.warning_count, 2);
        assert_eq!(summary.info_count, 1);
        assert_eq!(summary.fixes_applied, 1);
        assert_eq!(summary.fixes_failed, 1);
    }

    #[test]
    fn test_builder_status_escalation() {
        let mut builder = ReportBuilder::new("db", RunMode::Lint);
        builder.add_finding(finding("L0001", "a", Severity::Warning, true));
        builder.add_finding(finding("L0003", "b", Severity::Error, false));

        assert_eq!(builder.build().summary().status, ReportStatus::Error);
    }

    #[test]
    fn test_builder_rule_failure_marks_warning() {
        let mut builder = ReportBuilder::new("db", RunMode::Lint);
        builder.add_rule_failure(RuleFailure {
            rule_id: "L0001".to_string(),
            scope: Scope::Database,
            error: "closed".to_string(),
        });

        let report = builder.build();
        assert_eq!(report.summary().status, ReportStatus::Warning);
        assert_eq!(report.summary().rule_failures, 1);
        assert!(!report.is_clean());
    }
}
