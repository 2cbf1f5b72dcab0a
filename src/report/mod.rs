mod builder;
mod types;

pub(crate) use builder::ReportBuilder;
pub use types::{
    ColumnRef, Finding, FixOutcome, Report, ReportStatus, RuleFailure, Scope, Severity, Summary,
};
