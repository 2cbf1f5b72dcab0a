use super::{Rule, RuleContext, ScopeKind, Violation};
use crate::db::{quote_ident, Statement, StoredValue, ValueFilter};
use crate::error::RuleError;

/// Default strings treated as stand-ins for NULL
pub const DEFAULT_LIKE_NULLS: &[&str] = &["null", "none", "nan"];

/// Case-insensitive set of null sentinel tokens.
///
/// Folding is ASCII-only, the same as SQLite's built-in `lower()`, so the
/// Rust-side check and the SQL-side fix always agree on what matches.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NullTokens {
    tokens: Vec<String>,
}

impl NullTokens {
    pub fn new<S: AsRef<str>>(tokens: &[S]) -> Self {
        let mut folded: Vec<String> = Vec::new();
        for token in tokens {
            let token = token.as_ref().to_ascii_lowercase();
            if !folded.contains(&token) {
                folded.push(token);
            }
        }
        Self { tokens: folded }
    }

    pub fn matches(&self, text: &str) -> bool {
        self.tokens.iter().any(|t| t.eq_ignore_ascii_case(text))
    }

    pub fn tokens(&self) -> &[String] {
        &self.tokens
    }

    pub fn is_empty(&self) -> bool {
        self.tokens.is_empty()
    }

    /// Distinct sampled text values of the column matching a token
    fn sample_matches(&self, ctx: &RuleContext<'_>, rule_id: &str) -> Result<Vec<String>, RuleError> {
        if self.tokens.is_empty() {
            return Ok(Vec::new());
        }
        let filter = ValueFilter::new().text_in(self.tokens.as_slice());
        let values = ctx.sample_column(rule_id, &filter)?;
        Ok(values
            .into_iter()
            .filter_map(|v| match v {
                StoredValue::Text(text) => Some(text),
                _ => None,
            })
            .collect())
    }
}

impl Default for NullTokens {
    fn default() -> Self {
        Self::new(DEFAULT_LIKE_NULLS)
    }
}

fn describe_matches(ctx: &RuleContext<'_>, matches: &[String]) -> String {
    let quoted: Vec<String> = matches.iter().map(|m| format!("'{}'", m)).collect();
    format!(
        "Column {} contains {} distinct null-like string value(s): {}",
        ctx.scope,
        matches.len(),
        quoted.join(", ")
    )
}

/// Flags text values like `'null'` in columns that accept real NULLs, and
/// rewrites them to NULL
pub struct NullLikeStringRule {
    tokens: NullTokens,
}

impl NullLikeStringRule {
    pub const ID: &'static str = "L0002";

    pub fn new(tokens: NullTokens) -> Self {
        Self { tokens }
    }
}

impl Default for NullLikeStringRule {
    fn default() -> Self {
        Self::new(NullTokens::default())
    }
}

impl Rule for NullLikeStringRule {
    fn id(&self) -> &str {
        Self::ID
    }

    fn name(&self) -> &str {
        "Null-like Strings"
    }

    fn description(&self) -> &str {
        "Contains string data storage class values which appear to be null-like values. \
         Consider using SQLite NULL values instead."
    }

    fn tags(&self) -> &[&'static str] {
        &["nulls"]
    }

    fn scope_kind(&self) -> ScopeKind {
        ScopeKind::Column
    }

    fn fixable(&self) -> bool {
        true
    }

    fn applies_to(&self, ctx: &RuleContext<'_>) -> bool {
        !self.tokens.is_empty() && ctx.column.is_some_and(|c| c.nullable)
    }

    fn check(&self, ctx: &RuleContext<'_>) -> Result<Option<Violation>, RuleError> {
        let matches = self.tokens.sample_matches(ctx, Self::ID)?;
        if matches.is_empty() {
            return Ok(None);
        }
        Ok(Some(Violation::warning(describe_matches(ctx, &matches))))
    }

    fn fix(&self, ctx: &RuleContext<'_>) -> Result<Vec<Statement>, RuleError> {
        let (table, column) = ctx.require_column(Self::ID)?;
        if self.tokens.is_empty() {
            return Ok(Vec::new());
        }

        let placeholders: Vec<String> = (1..=self.tokens.tokens().len())
            .map(|i| format!("?{}", i))
            .collect();
        let sql = format!(
            "UPDATE {table} SET {col} = NULL WHERE typeof({col}) = 'text' AND lower({col}) IN ({list})",
            table = quote_ident(&table.name),
            col = quote_ident(&column.name),
            list = placeholders.join(", "),
        );
        let params = self
            .tokens
            .tokens()
            .iter()
            .map(|t| StoredValue::Text(t.clone()))
            .collect();
        Ok(vec![Statement::with_params(sql, params)])
    }
}

/// Flags null-like text in NOT NULL columns. Repair would need a schema
/// change, so this rule only reports.
pub struct NotNullLikeStringRule {
    tokens: NullTokens,
}

impl NotNullLikeStringRule {
    pub const ID: &'static str = "L0003";

    pub fn new(tokens: NullTokens) -> Self {
        Self { tokens }
    }
}

impl Default for NotNullLikeStringRule {
    fn default() -> Self {
        Self::new(NullTokens::default())
    }
}

impl Rule for NotNullLikeStringRule {
    fn id(&self) -> &str {
        Self::ID
    }

    fn name(&self) -> &str {
        "Null-like Strings in NOT NULL Column"
    }

    fn description(&self) -> &str {
        "Contains null-like string values in a column declared NOT NULL. \
         Dropping the constraint is required before they can become NULL."
    }

    fn tags(&self) -> &[&'static str] {
        &["nulls"]
    }

    fn scope_kind(&self) -> ScopeKind {
        ScopeKind::Column
    }

    fn applies_to(&self, ctx: &RuleContext<'_>) -> bool {
        !self.tokens.is_empty() && ctx.column.is_some_and(|c| !c.nullable)
    }

    fn check(&self, ctx: &RuleContext<'_>) -> Result<Option<Violation>, RuleError> {
        let matches = self.tokens.sample_matches(ctx, Self::ID)?;
        if matches.is_empty() {
            return Ok(None);
        }
        Ok(Some(Violation::error(format!(
            "{} (column is NOT NULL)",
            describe_matches(ctx, &matches)
        ))))
    }
}
