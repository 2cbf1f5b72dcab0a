//! Run driver: applies a rule catalog to a database and builds the report.
//!
//! A run captures the schema once, then makes a detection pass over every
//! scope unit, rule by rule in catalog order. In fix mode a repair pass
//! follows, applying each fixable finding's fix in its own transaction, in
//! finding order. Checks therefore always observe the database as it was
//! before any fix of the same run.

use crate::db::{ColumnInfo, ConnectionAdapter};
use crate::error::{ConfigError, EngineError};
use crate::report::{ColumnRef, Finding, FixOutcome, Report, ReportBuilder, RuleFailure, Scope};
use crate::rules::{Rule, RuleCatalog, RuleContext, ScopeKind, SchemaSnapshot, TableSchema};
use serde::{Deserialize, Serialize};
use std::collections::HashSet;
use std::fmt;
use std::str::FromStr;
use tracing::{debug, error, info, warn};

/// Default number of distinct values sampled per column
pub const DEFAULT_SAMPLE_LIMIT: usize = 10_000;

/// Whether a run may mutate the database
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum RunMode {
    /// Detection only
    Lint,
    /// Detection plus fixes for fixable findings
    Fix,
}

impl FromStr for RunMode {
    type Err = ConfigError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "lint" => Ok(RunMode::Lint),
            "fix" => Ok(RunMode::Fix),
            _ => Err(ConfigError::InvalidMode(s.to_string())),
        }
    }
}

impl fmt::Display for RunMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            RunMode::Lint => f.write_str("lint"),
            RunMode::Fix => f.write_str("fix"),
        }
    }
}

/// Restricts a run to some tables, columns or rules. Empty lists mean "all".
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct TargetFilter {
    pub tables: Vec<String>,
    pub columns: Vec<String>,
    /// Rule ids or tags
    pub rules: Vec<String>,
}

impl TargetFilter {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn table(mut self, name: impl Into<String>) -> Self {
        self.tables.push(name.into());
        self
    }

    pub fn column(mut self, name: impl Into<String>) -> Self {
        self.columns.push(name.into());
        self
    }

    pub fn rule(mut self, selector: impl Into<String>) -> Self {
        self.rules.push(selector.into());
        self
    }

    pub fn is_empty(&self) -> bool {
        self.tables.is_empty() && self.columns.is_empty() && self.rules.is_empty()
    }
}

/// One invocation target
struct ScopeUnit<'s> {
    scope: Scope,
    table: Option<&'s TableSchema>,
    column: Option<&'s ColumnInfo>,
}

/// Scope units of each kind, in enumeration order
struct Targets<'s> {
    database: Vec<ScopeUnit<'s>>,
    tables: Vec<ScopeUnit<'s>>,
    columns: Vec<ScopeUnit<'s>>,
}

impl<'s> Targets<'s> {
    fn resolve(snapshot: &'s SchemaSnapshot, filter: &TargetFilter) -> Result<Self, ConfigError> {
        let mut selected: Vec<&TableSchema> = Vec::new();
        if filter.tables.is_empty() {
            selected.extend(snapshot.tables.iter());
        } else {
            for name in &filter.tables {
                let table = snapshot
                    .table(name)
                    .ok_or_else(|| ConfigError::UnknownTable(name.clone()))?;
                if !selected.iter().any(|t| t.name == table.name) {
                    selected.push(table);
                }
            }
        }

        for name in &filter.columns {
            if !selected.iter().any(|t| t.column(name).is_some()) {
                return Err(ConfigError::UnknownColumn(name.clone()));
            }
        }

        let mut tables = Vec::new();
        let mut columns = Vec::new();
        for table in selected {
            tables.push(ScopeUnit {
                scope: Scope::Table {
                    table: table.name.clone(),
                },
                table: Some(table),
                column: None,
            });
            for column in &table.columns {
                let wanted = filter.columns.is_empty()
                    || filter
                        .columns
                        .iter()
                        .any(|c| c.eq_ignore_ascii_case(&column.name));
                if wanted {
                    columns.push(ScopeUnit {
                        scope: Scope::Column(ColumnRef::new(&table.name, &column.name)),
                        table: Some(table),
                        column: Some(column),
                    });
                }
            }
        }

        Ok(Self {
            database: vec![ScopeUnit {
                scope: Scope::Database,
                table: None,
                column: None,
            }],
            tables,
            columns,
        })
    }

    fn of_kind(&self, kind: ScopeKind) -> &[ScopeUnit<'s>] {
        match kind {
            ScopeKind::Database => &self.database,
            ScopeKind::Table => &self.tables,
            ScopeKind::Column => &self.columns,
        }
    }
}

/// A fixable finding awaiting the repair pass
struct PendingFix<'r, 'u, 's> {
    finding_index: usize,
    rule: &'r dyn Rule,
    unit: &'u ScopeUnit<'s>,
}

/// Applies rule catalogs to one database
pub struct Engine<'a> {
    adapter: &'a dyn ConnectionAdapter,
    label: String,
    sample_limit: usize,
}

impl<'a> Engine<'a> {
    pub fn new(adapter: &'a dyn ConnectionAdapter) -> Self {
        Self {
            adapter,
            label: String::from("database"),
            sample_limit: DEFAULT_SAMPLE_LIMIT,
        }
    }

    /// Name recorded in reports for the audited database
    pub fn with_label(mut self, label: impl Into<String>) -> Self {
        self.label = label.into();
        self
    }

    pub fn with_sample_limit(mut self, limit: usize) -> Self {
        self.sample_limit = limit;
        self
    }

    /// Run `catalog` against the database.
    ///
    /// Fails only on invalid configuration or when the schema cannot be
    /// read; rule failures and failed fixes are recorded in the report.
    pub fn run(
        &self,
        catalog: &RuleCatalog,
        mode: RunMode,
        filter: Option<&TargetFilter>,
    ) -> Result<Report, EngineError> {
        let default_filter = TargetFilter::default();
        let filter = filter.unwrap_or(&default_filter);
        let rules = self.select_rules(catalog, filter)?;

        info!(
            database = %self.label,
            mode = %mode,
            rules = rules.len(),
            "Starting run"
        );

        let snapshot = self.snapshot()?;
        let targets = Targets::resolve(&snapshot, filter)?;
        debug!(
            tables = targets.tables.len(),
            columns = targets.columns.len(),
            "Captured schema snapshot"
        );

        let mut builder = ReportBuilder::new(self.label.clone(), mode);
        let mut pending = Vec::new();

        for rule in &rules {
            for unit in targets.of_kind(rule.scope_kind()) {
                let ctx = self.context(&snapshot, unit);
                if !rule.applies_to(&ctx) {
                    continue;
                }
                debug!(rule = rule.id(), scope = %unit.scope, "Checking");

                match rule.check(&ctx) {
                    Ok(Some(violation)) => {
                        warn!(
                            rule = rule.id(),
                            scope = %unit.scope,
                            "{}",
                            violation.message
                        );
                        let finding = Finding {
                            rule_id: rule.id().to_string(),
                            scope: unit.scope.clone(),
                            severity: violation.severity,
                            message: violation.message,
                            fixable: rule.fixable(),
                        };
                        let Some(index) = builder.add_finding(finding) else {
                            continue;
                        };
                        if mode == RunMode::Fix && rule.fixable() {
                            pending.push(PendingFix {
                                finding_index: index,
                                rule: *rule,
                                unit,
                            });
                        }
                    }
                    Ok(None) => {}
                    Err(err) => {
                        error!(rule = rule.id(), scope = %unit.scope, error = %err, "Rule check failed");
                        builder.add_rule_failure(RuleFailure {
                            rule_id: rule.id().to_string(),
                            scope: unit.scope.clone(),
                            error: err.to_string(),
                        });
                    }
                }
            }
        }

        for fix in pending {
            let outcome = self.apply_fix(&snapshot, &fix);
            builder.add_fix_outcome(outcome);
        }

        let report = builder.build();
        info!(
            findings = report.summary().findings_count,
            fixes_applied = report.summary().fixes_applied,
            fixes_failed = report.summary().fixes_failed,
            rule_failures = report.summary().rule_failures,
            "Run complete"
        );
        Ok(report)
    }

    /// Check everything `run` would reject without running any rule
    pub fn validate(
        &self,
        catalog: &RuleCatalog,
        filter: Option<&TargetFilter>,
    ) -> Result<(), EngineError> {
        let default_filter = TargetFilter::default();
        let filter = filter.unwrap_or(&default_filter);
        self.select_rules(catalog, filter)?;
        let snapshot = self.snapshot()?;
        Targets::resolve(&snapshot, filter)?;
        Ok(())
    }

    fn snapshot(&self) -> Result<SchemaSnapshot, EngineError> {
        SchemaSnapshot::capture(self.adapter).map_err(EngineError::SchemaIntrospection)
    }

    /// Enabled rules, narrowed to the filter's rule selectors
    fn select_rules<'c>(
        &self,
        catalog: &'c RuleCatalog,
        filter: &TargetFilter,
    ) -> Result<Vec<&'c dyn Rule>, ConfigError> {
        if self.sample_limit == 0 {
            return Err(ConfigError::InvalidSampleLimit);
        }
        let mut wanted: HashSet<String> = HashSet::new();
        for selector in &filter.rules {
            wanted.extend(catalog.resolve(selector)?);
        }
        Ok(catalog
            .enabled()
            .filter(|r| wanted.is_empty() || wanted.contains(r.id()))
            .collect())
    }

    fn context<'u>(&'u self, snapshot: &'u SchemaSnapshot, unit: &'u ScopeUnit<'_>) -> RuleContext<'u> {
        RuleContext {
            adapter: self.adapter,
            schema: snapshot,
            scope: &unit.scope,
            table: unit.table,
            column: unit.column,
            sample_limit: self.sample_limit,
        }
    }

    fn apply_fix(&self, snapshot: &SchemaSnapshot, fix: &PendingFix<'_, '_, '_>) -> FixOutcome {
        let ctx = self.context(snapshot, fix.unit);
        let rule_id = fix.rule.id();

        let result = fix
            .rule
            .fix(&ctx)
            .map_err(|e| e.to_string())
            .and_then(|plan| {
                self.adapter
                    .execute_in_transaction(&plan)
                    .map_err(|e| e.to_string())
            });

        match result {
            Ok(rows) => {
                info!(rule = rule_id, scope = %fix.unit.scope, rows, "Fix applied");
                FixOutcome {
                    finding_index: fix.finding_index,
                    applied: true,
                    error: None,
                    rows_affected: rows,
                }
            }
            Err(err) => {
                error!(rule = rule_id, scope = %fix.unit.scope, error = %err, "Fix failed");
                FixOutcome {
                    finding_index: fix.finding_index,
                    applied: false,
                    error: Some(err),
                    rows_affected: 0,
                }
            }
        }
    }
}
