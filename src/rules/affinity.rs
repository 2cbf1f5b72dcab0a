//! Declared column affinity versus actual storage class.
//!
//! See <https://www.sqlite.org/datatype3.html> for SQLite's affinity rules.

use super::{NullTokens, Rule, RuleContext, ScopeKind, Violation};
use crate::db::{quote_ident, ColumnInfo, Statement, StorageClass, StoredValue, ValueFilter};
use crate::error::RuleError;
use serde::Serialize;
use std::collections::BTreeSet;
use std::fmt;

/// Largest integer magnitude an f64 represents exactly
const MAX_EXACT_F64_INT: i64 = 1 << 53;

/// Significant decimal digits an f64 is guaranteed to round-trip
const MAX_REAL_DIGITS: usize = 15;

/// Column type affinity resolved from a declared type
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum Affinity {
    Text,
    Numeric,
    Integer,
    Real,
    Blob,
}

impl Affinity {
    /// Resolve the affinity of a declared type, first matching rule wins:
    ///
    /// 1. contains `INT` => INTEGER
    /// 2. contains `CHAR`, `CLOB` or `TEXT` => TEXT
    /// 3. contains `BLOB`, or no type => BLOB
    /// 4. contains `REAL`, `FLOA` or `DOUB` => REAL
    /// 5. otherwise => NUMERIC
    pub fn from_declared_type(declared: &str) -> Self {
        let upper = declared.to_ascii_uppercase();
        let has = |needle: &str| upper.contains(needle);

        if has("INT") {
            Affinity::Integer
        } else if has("CHAR") || has("CLOB") || has("TEXT") {
            Affinity::Text
        } else if has("BLOB") || upper.trim().is_empty() {
            Affinity::Blob
        } else if has("REAL") || has("FLOA") || has("DOUB") {
            Affinity::Real
        } else {
            Affinity::Numeric
        }
    }

    /// Whether a value of `class` is consistent with this affinity
    pub fn accepts(&self, class: StorageClass) -> bool {
        match (self, class) {
            (_, StorageClass::Null) => true,
            (Affinity::Integer, StorageClass::Integer) => true,
            (Affinity::Real, StorageClass::Real) => true,
            (Affinity::Numeric, StorageClass::Integer | StorageClass::Real) => true,
            (Affinity::Text, StorageClass::Text) => true,
            (Affinity::Blob, StorageClass::Blob) => true,
            _ => false,
        }
    }

    /// Convert `value` to a storage class this affinity accepts without
    /// losing information, or `None` when no such conversion exists.
    pub fn coerce(&self, value: &StoredValue) -> Option<StoredValue> {
        if self.accepts(value.storage_class()) {
            return Some(value.clone());
        }
        match (self, value) {
            (Affinity::Integer, StoredValue::Real(r)) => real_to_integer(*r),
            (Affinity::Integer, StoredValue::Text(t)) => match parse_number(t)? {
                StoredValue::Real(r) => real_to_integer(r),
                integer => Some(integer),
            },
            (Affinity::Real, StoredValue::Integer(i)) => integer_to_real(*i),
            (Affinity::Real, StoredValue::Text(t)) => parse_real(t).map(StoredValue::Real),
            (Affinity::Numeric, StoredValue::Text(t)) => parse_number(t),
            (Affinity::Text, StoredValue::Integer(i)) => Some(StoredValue::Text(i.to_string())),
            (Affinity::Text, StoredValue::Real(r)) => Some(StoredValue::Text(format!("{:?}", r))),
            (Affinity::Blob, StoredValue::Text(t)) => Some(StoredValue::Blob(t.as_bytes().to_vec())),
            (
                Affinity::Integer | Affinity::Real | Affinity::Numeric | Affinity::Text,
                StoredValue::Blob(b),
            ) => {
                let text = std::str::from_utf8(b).ok()?;
                self.coerce(&StoredValue::Text(text.to_string()))
            }
            _ => None,
        }
    }
}

impl fmt::Display for Affinity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Affinity::Text => "TEXT",
            Affinity::Numeric => "NUMERIC",
            Affinity::Integer => "INTEGER",
            Affinity::Real => "REAL",
            Affinity::Blob => "BLOB",
        };
        f.write_str(name)
    }
}

fn is_integer_literal(text: &str) -> bool {
    let digits = text.strip_prefix(['+', '-']).unwrap_or(text);
    !digits.is_empty() && digits.bytes().all(|b| b.is_ascii_digit())
}

/// Significant digits of a decimal literal's mantissa
fn significant_digits(text: &str) -> usize {
    let mantissa = text.split(['e', 'E']).next().unwrap_or_default();
    let digits: String = mantissa.chars().filter(|c| c.is_ascii_digit()).collect();
    digits.trim_start_matches('0').trim_end_matches('0').len()
}

/// Integer text becomes INTEGER (and must fit i64), other numeric text REAL
fn parse_number(text: &str) -> Option<StoredValue> {
    let text = text.trim();
    if is_integer_literal(text) {
        return text.parse::<i64>().ok().map(StoredValue::Integer);
    }
    parse_real(text).map(StoredValue::Real)
}

fn parse_real(text: &str) -> Option<f64> {
    let text = text.trim();
    let value = text.parse::<f64>().ok()?;
    (value.is_finite() && significant_digits(text) <= MAX_REAL_DIGITS).then_some(value)
}

fn real_to_integer(value: f64) -> Option<StoredValue> {
    let in_range = value >= -(MAX_EXACT_F64_INT as f64) && value <= MAX_EXACT_F64_INT as f64;
    (value.fract() == 0.0 && in_range).then(|| StoredValue::Integer(value as i64))
}

fn integer_to_real(value: i64) -> Option<StoredValue> {
    (value.unsigned_abs() <= MAX_EXACT_F64_INT as u64).then(|| StoredValue::Real(value as f64))
}

/// Flags columns holding values whose storage class conflicts with the
/// column's declared affinity.
///
/// Null-like text in nullable columns is left to the null-like rule, which
/// rewrites it to NULL.
#[derive(Default)]
pub struct AffinityMismatchRule {
    tokens: NullTokens,
}

impl AffinityMismatchRule {
    pub const ID: &'static str = "L0001";

    pub fn new(tokens: NullTokens) -> Self {
        Self { tokens }
    }

    fn value_filter(&self, affinity: Affinity, column: &ColumnInfo) -> ValueFilter {
        let accepted = StorageClass::ALL
            .into_iter()
            .filter(|class| affinity.accepts(*class));
        let filter = ValueFilter::new().excluding_classes(accepted);
        if column.nullable {
            filter.text_not_in(self.tokens.tokens())
        } else {
            filter
        }
    }

    /// Distinct mismatching values; every one of them when `scan_all`
    fn mismatches(
        &self,
        ctx: &RuleContext<'_>,
        scan_all: bool,
    ) -> Result<(Affinity, Vec<StoredValue>), RuleError> {
        let (_, column) = ctx.require_column(Self::ID)?;
        let affinity = Affinity::from_declared_type(&column.declared_type);
        let filter = self.value_filter(affinity, column);
        let values = if scan_all {
            ctx.scan_column(Self::ID, &filter)?
        } else {
            ctx.sample_column(Self::ID, &filter)?
        };
        Ok((affinity, values))
    }
}

impl Rule for AffinityMismatchRule {
    fn id(&self) -> &str {
        Self::ID
    }

    fn name(&self) -> &str {
        "Affinity Mismatch"
    }

    fn description(&self) -> &str {
        "Contains conflicting column affinity type vs column data storage class. \
         See https://www.sqlite.org/datatype3.html for more information"
    }

    fn tags(&self) -> &[&'static str] {
        &["affinity", "types"]
    }

    fn scope_kind(&self) -> ScopeKind {
        ScopeKind::Column
    }

    fn fixable(&self) -> bool {
        true
    }

    // Untyped columns have no storage preference
    fn applies_to(&self, ctx: &RuleContext<'_>) -> bool {
        ctx.column
            .is_some_and(|c| !c.declared_type.trim().is_empty())
    }

    fn check(&self, ctx: &RuleContext<'_>) -> Result<Option<Violation>, RuleError> {
        let (affinity, values) = self.mismatches(ctx, false)?;
        if values.is_empty() {
            return Ok(None);
        }

        let classes: BTreeSet<String> = values
            .iter()
            .map(|v| v.storage_class().to_string())
            .collect();
        Ok(Some(Violation::warning(format!(
            "Column {} has {} affinity but holds {} distinct value(s) stored as {}",
            ctx.scope,
            affinity,
            values.len(),
            classes.into_iter().collect::<Vec<_>>().join(", ")
        ))))
    }

    fn fix(&self, ctx: &RuleContext<'_>) -> Result<Vec<Statement>, RuleError> {
        let (table, column) = ctx.require_column(Self::ID)?;
        let (affinity, values) = self.mismatches(ctx, true)?;

        // Plan every rewrite before touching anything
        let mut rewrites = Vec::with_capacity(values.len());
        for value in values {
            match affinity.coerce(&value) {
                Some(coerced) => rewrites.push((value, coerced)),
                None => {
                    return Err(RuleError::NotCoercible {
                        value: value.to_string(),
                        affinity: affinity.to_string(),
                    })
                }
            }
        }

        // quote() on both sides compares by exact storage class and value,
        // sidestepping the column affinity applied to plain comparisons
        let sql = format!(
            "UPDATE {table} SET {col} = ?1 WHERE quote({col}) = quote(?2)",
            table = quote_ident(&table.name),
            col = quote_ident(&column.name),
        );
        Ok(rewrites
            .into_iter()
            .map(|(original, coerced)| {
                Statement::with_params(sql.clone(), vec![coerced, original]).expecting_rows(1)
            })
            .collect())
    }
}
