use crate::report::Report;
use anyhow::{Context, Result};
use std::path::Path;

/// Serialize a report as pretty-printed JSON
pub fn to_json(report: &Report) -> Result<String> {
    serde_json::to_string_pretty(report).context("Failed to serialize report to JSON")
}

pub fn write_report(report: &Report, path: &Path) -> Result<()> {
    std::fs::write(path, to_json(report)?)
        .with_context(|| format!("Failed to write report to {}", path.display()))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::engine::RunMode;
    use crate::report::{ColumnRef, Finding, FixOutcome, ReportBuilder, Scope, Severity};
    use pretty_assertions::assert_eq;
    use tempfile::TempDir;

    fn fixed_report() -> Report {
        let mut builder = ReportBuilder::new("test.sqlite", RunMode::Fix);
        let index = builder
            .add_finding(Finding {
                rule_id: "L0002".to_string(),
                scope: Scope::Column(ColumnRef::new("t", "a")),
                severity: Severity::Warning,
                message: "Column t.a contains 1 distinct null-like string value(s): 'null'"
                    .to_string(),
                fixable: true,
            })
            .unwrap();
        builder.add_fix_outcome(FixOutcome {
            finding_index: index,
            applied: true,
            error: None,
            rows_affected: 2,
        });
        builder.build()
    }

    #[test]
    fn test_write_report_reads_back() {
        let report = fixed_report();
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("report.json");

        write_report(&report, &path).unwrap();

        let content = std::fs::read_to_string(&path).unwrap();
        assert!(content.contains('\n'));
        let parsed: Report = serde_json::from_str(&content).unwrap();
        assert_eq!(report, parsed);
    }

    #[test]
    fn test_write_report_missing_dir() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("nope").join("report.json");
        let err = write_report(&fixed_report(), &path).unwrap_err();
        assert!(err.to_string().contains("Failed to write report"));
    }

    #[test]
    fn test_json_keys() {
        let json = to_json(&fixed_report()).unwrap();
        let value: serde_json::Value = serde_json::from_str(&json).unwrap();

        for key in [
            "report_version",
            "report_id",
            "generated_at",
            "database",
            "mode",
            "summary",
            "findings",
            "fix_outcomes",
            "rule_failures",
        ] {
            assert!(value.get(key).is_some(), "missing key {}", key);
        }
        assert_eq!(value["mode"], "fix");
        assert_eq!(value["summary"]["status"], "warning");
        assert_eq!(value["findings"][0]["scope"]["kind"], "column");
        assert_eq!(value["findings"][0]["scope"]["table"], "t");
        assert_eq!(value["findings"][0]["severity"], "warning");
        assert_eq!(value["fix_outcomes"][0]["rows_affected"], 2);
        assert!(value["fix_outcomes"][0]
            .get("error")
            .is_some_and(|e| e.is_null()));
    }
}
