use crate::engine::RunMode;
use serde::{Deserialize, Serialize};
use std::fmt;

/// Result of one engine run.
///
/// Only [`ReportBuilder`](super::ReportBuilder) creates reports; the summary
/// is derived from the findings, fix outcomes and rule failures when the
/// builder finishes and is never edited afterwards.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Report {
    pub(super) report_version: String,
    pub(super) report_id: String,
    pub(super) generated_at: String,
    pub(super) database: String,
    pub(super) mode: RunMode,
    pub(super) summary: Summary,
    pub(super) findings: Vec<Finding>,
    pub(super) fix_outcomes: Vec<FixOutcome>,
    pub(super) rule_failures: Vec<RuleFailure>,
}

impl Report {
    pub(super) fn new(database: String, mode: RunMode) -> Self {
        Self {
            report_version: "1.0.0".to_string(),
            report_id: uuid::Uuid::new_v4().to_string(),
            generated_at: chrono::Utc::now().to_rfc3339(),
            database,
            mode,
            summary: Summary::default(),
            findings: Vec::new(),
            fix_outcomes: Vec::new(),
            rule_failures: Vec::new(),
        }
    }

    pub fn report_version(&self) -> &str {
        &self.report_version
    }

    pub fn report_id(&self) -> &str {
        &self.report_id
    }

    pub fn generated_at(&self) -> &str {
        &self.generated_at
    }

    /// Label of the audited database
    pub fn database(&self) -> &str {
        &self.database
    }

    pub fn mode(&self) -> RunMode {
        self.mode
    }

    pub fn summary(&self) -> &Summary {
        &self.summary
    }

    pub fn findings(&self) -> &[Finding] {
        &self.findings
    }

    pub fn fix_outcomes(&self) -> &[FixOutcome] {
        &self.fix_outcomes
    }

    pub fn rule_failures(&self) -> &[RuleFailure] {
        &self.rule_failures
    }

    /// Outcome attached to the finding at `index`, if a fix was attempted
    pub fn outcome_for(&self, index: usize) -> Option<&FixOutcome> {
        self.fix_outcomes.iter().find(|o| o.finding_index == index)
    }

    pub fn is_clean(&self) -> bool {
        self.findings.is_empty() && self.rule_failures.is_empty()
    }
}

/// Report summary, derived from the report contents
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq, Eq)]
pub struct Summary {
    pub status: ReportStatus,
    pub findings_count: usize,
    pub info_count: usize,
    pub warning_count: usize,
    pub error_count: usize,
    pub fixes_applied: usize,
    pub fixes_failed: usize,
    pub rule_failures: usize,
}

/// Overall report status
#[derive(Debug, Clone, Copy, Default, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum ReportStatus {
    #[default]
    Clean,
    Warning,
    Error,
}

/// A `(table, column)` pair
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct ColumnRef {
    pub table: String,
    pub column: String,
}

impl ColumnRef {
    pub fn new(table: impl Into<String>, column: impl Into<String>) -> Self {
        Self {
            table: table.into(),
            column: column.into(),
        }
    }
}

impl fmt::Display for ColumnRef {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}.{}", self.table, self.column)
    }
}

/// Unit a rule was invoked on
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "lowercase")]
pub enum Scope {
    Database,
    Table { table: String },
    Column(ColumnRef),
}

impl Scope {
    pub fn table(&self) -> Option<&str> {
        match self {
            Scope::Database => None,
            Scope::Table { table } => Some(table),
            Scope::Column(col) => Some(&col.table),
        }
    }

    pub fn column(&self) -> Option<&ColumnRef> {
        match self {
            Scope::Column(col) => Some(col),
            _ => None,
        }
    }
}

impl fmt::Display for Scope {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Scope::Database => f.write_str("<database>"),
            Scope::Table { table } => f.write_str(table),
            Scope::Column(col) => write!(f, "{}", col),
        }
    }
}

/// Finding severity level
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, PartialOrd, Ord, Hash)]
#[serde(rename_all = "lowercase")]
pub enum Severity {
    Info,
    Warning,
    Error,
}

impl fmt::Display for Severity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Severity::Info => f.write_str("INFO"),
            Severity::Warning => f.write_str("WARNING"),
            Severity::Error => f.write_str("ERROR"),
        }
    }
}

/// One detected violation
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Finding {
    pub rule_id: String,
    pub scope: Scope,
    pub severity: Severity,
    pub message: String,
    pub fixable: bool,
}

/// Result of attempting the fix for a finding
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct FixOutcome {
    pub finding_index: usize,
    pub applied: bool,
    pub error: Option<String>,
    #[serde(default)]
    pub rows_affected: usize,
}

/// A check that failed unexpectedly; no finding was produced
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct RuleFailure {
    pub rule_id: String,
    pub scope: Scope,
    pub error: String,
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    fn sample_finding() -> Finding {
        Finding {
            rule_id: "L0002".to_string(),
            scope: Scope::Column(ColumnRef::new("t", "a")),
            severity: Severity::Warning,
            message: "Column t.a contains null-like strings".to_string(),
            fixable: true,
        }
    }

    #[test]
    fn test_report_json_roundtrip() {
        let mut report = Report::new("test.sqlite".to_string(), RunMode::Lint);
        report.findings.push(sample_finding());

        let json = serde_json::to_string_pretty(&report).unwrap();
        let parsed: Report = serde_json::from_str(&json).unwrap();

        assert_eq!(report, parsed);
    }

    #[test]
    fn test_report_default_values() {
        let report = Report::new(":memory:".to_string(), RunMode::Fix);

        assert_eq!(report.report_version(), "1.0.0");
        assert_eq!(report.summary().status, ReportStatus::Clean);
        assert_eq!(report.mode(), RunMode::Fix);
        assert!(report.is_clean());
        assert!(report.generated_at().contains('T'));
    }

    #[test]
    fn test_severity_serialization() {
        assert_eq!(serde_json::to_string(&Severity::Info).unwrap(), "\"info\"");
        assert_eq!(
            serde_json::to_string(&Severity::Warning).unwrap(),
            "\"warning\""
        );
        assert_eq!(serde_json::to_string(&Severity::Error).unwrap(), "\"error\"");
    }

    #[test]
    fn test_scope_serialization() {
        let json = serde_json::to_value(Scope::Column(ColumnRef::new("t", "a"))).unwrap();
        assert_eq!(
            json,
            serde_json::json!({"kind": "column", "table": "t", "column": "a"})
        );

        let json = serde_json::to_value(Scope::Table {
            table: "t".to_string(),
        })
        .unwrap();
        assert_eq!(json, serde_json::json!({"kind": "table", "table": "t"}));

        let json = serde_json::to_value(Scope::Database).unwrap();
        assert_eq!(json, serde_json::json!({"kind": "database"}));
    }

    #[test]
    fn test_finding_serialization_keys() {
        let json = serde_json::to_value(sample_finding()).unwrap();
        let keys: Vec<&str> = json.as_object().unwrap().keys().map(|k| k.as_str()).collect();
        for key in ["rule_id", "scope", "severity", "message", "fixable"] {
            assert!(keys.contains(&key), "missing {}", key);
        }
    }

    #[test]
    fn test_fix_outcome_serializes_missing_error_as_null() {
        let outcome = FixOutcome {
            finding_index: 0,
            applied: true,
            error: None,
            rows_affected: 3,
        };
        let value = serde_json::to_value(&outcome).unwrap();
        assert_eq!(value["finding_index"], 0);
        assert!(value.get("error").is_some_and(|e| e.is_null()));
    }

    #[test]
    fn test_scope_display() {
        assert_eq!(Scope::Column(ColumnRef::new("t", "a")).to_string(), "t.a");
        assert_eq!(Scope::Database.to_string(), "<database>");
        assert_eq!(
            Scope::Table {
                table: "t".to_string()
            }
            .table(),
            Some("t")
        );
    }
}
