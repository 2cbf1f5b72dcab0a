use super::context::RuleContext;
use crate::db::Statement;
use crate::error::{ConfigError, RuleError};
use crate::report::Severity;
use serde::Serialize;
use std::collections::HashSet;

/// Granularity a rule is invoked at
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum ScopeKind {
    Database,
    Table,
    Column,
}

/// What a check reports when the scope violates the rule
#[derive(Debug, Clone, PartialEq)]
pub struct Violation {
    pub severity: Severity,
    pub message: String,
}

impl Violation {
    pub fn warning(message: impl Into<String>) -> Self {
        Self {
            severity: Severity::Warning,
            message: message.into(),
        }
    }

    pub fn error(message: impl Into<String>) -> Self {
        Self {
            severity: Severity::Error,
            message: message.into(),
        }
    }
}

/// A check, and optionally a fix, bound to one scope kind.
///
/// Rules hold configuration but no per-run state. `fix` returns the
/// statements that repair the scope; the engine runs them in a transaction.
pub trait Rule: Send + Sync {
    /// Unique identifier within a catalog
    fn id(&self) -> &str;

    /// Human-readable name
    fn name(&self) -> &str;

    fn description(&self) -> &str {
        ""
    }

    /// Tags usable to enable or disable groups of rules
    fn tags(&self) -> &[&'static str] {
        &[]
    }

    fn scope_kind(&self) -> ScopeKind;

    /// Whether `fix` may be invoked for findings of this rule
    fn fixable(&self) -> bool {
        false
    }

    /// Whether the rule is relevant for the scope at all
    fn applies_to(&self, _ctx: &RuleContext<'_>) -> bool {
        true
    }

    fn check(&self, ctx: &RuleContext<'_>) -> Result<Option<Violation>, RuleError>;

    fn fix(&self, _ctx: &RuleContext<'_>) -> Result<Vec<Statement>, RuleError> {
        Err(RuleError::NotFixable(self.id().to_string()))
    }
}

/// Serializable listing entry for a registered rule
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct RuleDescriptor {
    pub id: String,
    pub name: String,
    pub description: String,
    pub scope: ScopeKind,
    pub fixable: bool,
    pub tags: Vec<String>,
    pub enabled: bool,
}

/// Ordered set of rules used for a run
#[derive(Default)]
pub struct RuleCatalog {
    rules: Vec<Box<dyn Rule>>,
    disabled: HashSet<String>,
}

impl RuleCatalog {
    /// Create a new empty catalog
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a rule. Registration order is execution order.
    pub fn register(&mut self, rule: Box<dyn Rule>) -> Result<(), ConfigError> {
        if self.get(rule.id()).is_some() {
            return Err(ConfigError::DuplicateRule(rule.id().to_string()));
        }
        self.rules.push(rule);
        Ok(())
    }

    /// Builder-style [`register`](Self::register)
    pub fn with_rule(mut self, rule: Box<dyn Rule>) -> Result<Self, ConfigError> {
        self.register(rule)?;
        Ok(self)
    }

    pub fn get(&self, id: &str) -> Option<&dyn Rule> {
        self.rules.iter().find(|r| r.id() == id).map(|r| r.as_ref())
    }

    pub fn contains(&self, id: &str) -> bool {
        self.get(id).is_some()
    }

    /// Ids of the rules matching a rule id or a tag, ignoring ASCII case
    pub fn resolve(&self, selector: &str) -> Result<Vec<String>, ConfigError> {
        let ids: Vec<String> = self
            .rules
            .iter()
            .filter(|r| {
                r.id().eq_ignore_ascii_case(selector)
                    || r.tags().iter().any(|t| t.eq_ignore_ascii_case(selector))
            })
            .map(|r| r.id().to_string())
            .collect();
        if ids.is_empty() {
            return Err(ConfigError::UnknownRule(selector.to_string()));
        }
        Ok(ids)
    }

    /// Disable the rules matching `selector` (id or tag)
    pub fn disable(&mut self, selector: &str) -> Result<(), ConfigError> {
        for id in self.resolve(selector)? {
            self.disabled.insert(id);
        }
        Ok(())
    }

    /// Re-enable the rules matching `selector` (id or tag)
    pub fn enable(&mut self, selector: &str) -> Result<(), ConfigError> {
        for id in self.resolve(selector)? {
            self.disabled.remove(&id);
        }
        Ok(())
    }

    /// Keep only the rules matching any of `selectors` enabled.
    /// An empty selector list leaves the catalog unchanged.
    pub fn enable_only<S: AsRef<str>>(&mut self, selectors: &[S]) -> Result<(), ConfigError> {
        if selectors.is_empty() {
            return Ok(());
        }
        let mut keep = HashSet::new();
        for selector in selectors {
            keep.extend(self.resolve(selector.as_ref())?);
        }
        self.disabled = self
            .rules
            .iter()
            .map(|r| r.id().to_string())
            .filter(|id| !keep.contains(id))
            .collect();
        Ok(())
    }

    pub fn is_enabled(&self, id: &str) -> bool {
        self.contains(id) && !self.disabled.contains(id)
    }

    /// Enabled rules in registration order
    pub fn enabled(&self) -> impl Iterator<Item = &dyn Rule> {
        self.rules
            .iter()
            .filter(|r| !self.disabled.contains(r.id()))
            .map(|r| r.as_ref())
    }

    /// Get list of registered rule IDs
    pub fn rule_ids(&self) -> Vec<&str> {
        self.rules.iter().map(|r| r.id()).collect()
    }

    pub fn describe(&self) -> Vec<RuleDescriptor> {
        self.rules
            .iter()
            .map(|r| RuleDescriptor {
                id: r.id().to_string(),
                name: r.name().to_string(),
                description: r.description().to_string(),
                scope: r.scope_kind(),
                fixable: r.fixable(),
                tags: r.tags().iter().map(|t| t.to_string()).collect(),
                enabled: !self.disabled.contains(r.id()),
            })
            .collect()
    }

    /// Get the number of registered rules
    pub fn len(&self) -> usize {
        self.rules.len()
    }

    /// Check if catalog is empty
    pub fn is_empty(&self) -> bool {
        self.rules.is_empty()
    }
}
