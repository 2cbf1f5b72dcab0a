use crate::engine::RunMode;
use crate::report::{Report, ReportStatus, Severity};
use std::fmt::Write;

/// Print human-readable summary to stdout
pub fn print_summary(report: &Report, output_path: Option<&str>) {
    println!();
    println!("╭───────────────────────────────────────────────────────────────╮");
    println!("│                 sqlite-clean Report Summary                   │");
    println!("╰───────────────────────────────────────────────────────────────╯");
    println!();
    print!("{}", format_summary(report));

    if let Some(path) = output_path {
        println!();
        println!("Full report written to: {}", path);
    }
    println!();
}

/// Closing line printed for a run; `None` when the run was not clean
pub fn clean_message(report: &Report, fixed_path: &str) -> Option<String> {
    match report.mode() {
        RunMode::Lint if report.summary().findings_count == 0 => {
            Some("Database linted, no issues detected!".to_string())
        }
        RunMode::Fix
            if report.summary().fixes_failed == 0 && report.rule_failures().is_empty() =>
        {
            Some(format!("Database fixed at {}!", fixed_path))
        }
        _ => None,
    }
}

fn truncate(s: &str, max_len: usize) -> String {
    if s.chars().count() > max_len {
        let kept: String = s.chars().take(max_len - 3).collect();
        format!("{}...", kept)
    } else {
        s.to_string()
    }
}

/// Format summary as string
pub fn format_summary(report: &Report) -> String {
    let mut output = String::new();
    let summary = report.summary();

    let _ = writeln!(output, "Database: {} ({})", report.database(), report.mode());
    let _ = writeln!(output, "Generated: {}", report.generated_at());
    let status = match summary.status {
        ReportStatus::Clean => "CLEAN",
        ReportStatus::Warning => "WARNING",
        ReportStatus::Error => "ERROR",
    };
    let _ = writeln!(output, "Status: {}", status);
    let _ = writeln!(
        output,
        "Findings: {} ({} error, {} warning, {} info)",
        summary.findings_count, summary.error_count, summary.warning_count, summary.info_count
    );

    for (index, finding) in report.findings().iter().enumerate() {
        let icon = match finding.severity {
            Severity::Error => "✖",
            Severity::Warning => "⚠",
            Severity::Info => "ℹ",
        };
        let _ = writeln!(
            output,
            "  {} [{}] {} {}: {}",
            icon,
            finding.rule_id,
            finding.severity,
            finding.scope,
            truncate(&finding.message, 120)
        );
        if let Some(outcome) = report.outcome_for(index) {
            match &outcome.error {
                None => {
                    let _ = writeln!(output, "      fixed ({} row(s))", outcome.rows_affected);
                }
                Some(err) => {
                    let _ = writeln!(output, "      fix failed: {}", err);
                }
            }
        }
    }

    if report.mode() == RunMode::Fix {
        let _ = writeln!(
            output,
            "Fixes: {} applied, {} failed",
            summary.fixes_applied, summary.fixes_failed
        );
    }

    if !report.rule_failures().is_empty() {
        let _ = writeln!(output, "Rule failures:");
        for failure in report.rule_failures() {
            let _ = writeln!(
                output,
                "  [{}] {}: {}",
                failure.rule_id, failure.scope, failure.error
            );
        }
    }

    output
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::report::{ColumnRef, Finding, FixOutcome, ReportBuilder, RuleFailure, Scope};

    fn finding(severity: Severity) -> Finding {
        Finding {
            rule_id: "L0001".to_string(),
            scope: Scope::Column(ColumnRef::new("t", "b")),
            severity,
            message: "Column t.b has INTEGER affinity".to_string(),
            fixable: true,
        }
    }

    #[test]
    fn test_format_summary_clean() {
        let report = ReportBuilder::new("test.sqlite", RunMode::Lint).build();
        let output = format_summary(&report);

        assert!(output.contains("Status: CLEAN"));
        assert!(output.contains("Findings: 0"));
        assert_eq!(
            clean_message(&report, "test.sqlite").as_deref(),
            Some("Database linted, no issues detected!")
        );
    }

    #[test]
    fn test_format_summary_with_findings() {
        let mut builder = ReportBuilder::new("test.sqlite", RunMode::Lint);
        builder.add_finding(finding(Severity::Warning));
        let report = builder.build();

        let output = format_summary(&report);
        assert!(output.contains("Status: WARNING"));
        assert!(output.contains("[L0001] WARNING t.b"));
        assert!(!output.contains("Fixes:"));
        assert_eq!(clean_message(&report, "test.sqlite"), None);
    }

    #[test]
    fn test_format_summary_fix_outcomes() {
        let mut builder = ReportBuilder::new("test.sqlite", RunMode::Fix);
        builder.add_finding(finding(Severity::Warning));
        builder.add_fix_outcome(FixOutcome {
            finding_index: 0,
            applied: false,
            error: Some("Cannot losslessly coerce 'abc' to NUMERIC affinity".to_string()),
            rows_affected: 0,
        });
        builder.add_rule_failure(RuleFailure {
            rule_id: "L0002".to_string(),
            scope: Scope::Table {
                table: "t".to_string(),
            },
            error: "boom".to_string(),
        });
        let report = builder.build();

        let output = format_summary(&report);
        assert!(output.contains("fix failed: Cannot losslessly coerce"));
        assert!(output.contains("Fixes: 0 applied, 1 failed"));
        assert!(output.contains("[L0002] t: boom"));
        assert_eq!(clean_message(&report, "out.sqlite"), None);
    }

    #[test]
    fn test_clean_fix_message() {
        let mut builder = ReportBuilder::new("test.sqlite", RunMode::Fix);
        builder.add_finding(finding(Severity::Warning));
        builder.add_fix_outcome(FixOutcome {
            finding_index: 0,
            applied: true,
            error: None,
            rows_affected: 2,
        });
        let report = builder.build();

        assert!(format_summary(&report).contains("fixed (2 row(s))"));
        assert_eq!(
            clean_message(&report, "out.sqlite").as_deref(),
            Some("Database fixed at out.sqlite!")
        );
    }

    #[test]
    fn test_truncate() {
        assert_eq!(truncate("short", 10), "short");
        assert_eq!(truncate("this is a long string", 10), "this is...");
    }
}
