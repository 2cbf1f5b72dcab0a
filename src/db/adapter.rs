use super::value::{StorageClass, StoredValue};
use crate::error::DatabaseError;

/// Column metadata as declared in the schema
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ColumnInfo {
    pub name: String,
    /// Declared type string, possibly empty
    pub declared_type: String,
    pub nullable: bool,
    pub primary_key: bool,
}

impl ColumnInfo {
    pub fn new(name: impl Into<String>, declared_type: impl Into<String>, nullable: bool) -> Self {
        Self {
            name: name.into(),
            declared_type: declared_type.into(),
            nullable,
            primary_key: false,
        }
    }
}

/// A mutating statement with positional parameters
#[derive(Debug, Clone, PartialEq)]
pub struct Statement {
    pub sql: String,
    pub params: Vec<StoredValue>,
    /// Fewer changed rows than this fails the whole transaction
    pub min_rows: usize,
}

impl Statement {
    pub fn new(sql: impl Into<String>) -> Self {
        Self::with_params(sql, Vec::new())
    }

    pub fn with_params(sql: impl Into<String>, params: Vec<StoredValue>) -> Self {
        Self {
            sql: sql.into(),
            params,
            min_rows: 0,
        }
    }

    /// Require the statement to change at least `rows` rows
    pub fn expecting_rows(mut self, rows: usize) -> Self {
        self.min_rows = rows;
        self
    }
}

/// Which stored values a column scan returns. The default keeps everything.
///
/// Text matching compares the ASCII-lowercased value, like SQLite `lower()`,
/// so listed tokens must already be lowercase.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ValueFilter {
    /// Skip values of these storage classes
    pub exclude_classes: Vec<StorageClass>,
    /// If non-empty, keep only text values listed here
    pub text_in: Vec<String>,
    /// Skip text values listed here
    pub text_not_in: Vec<String>,
}

impl ValueFilter {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn excluding_classes(mut self, classes: impl IntoIterator<Item = StorageClass>) -> Self {
        self.exclude_classes.extend(classes);
        self
    }

    pub fn text_in<S: AsRef<str>>(mut self, tokens: &[S]) -> Self {
        self.text_in
            .extend(tokens.iter().map(|t| t.as_ref().to_ascii_lowercase()));
        self
    }

    pub fn text_not_in<S: AsRef<str>>(mut self, tokens: &[S]) -> Self {
        self.text_not_in
            .extend(tokens.iter().map(|t| t.as_ref().to_ascii_lowercase()));
        self
    }
}

/// Minimal database capability consumed by the engine and rules.
///
/// Implementations must make `execute_in_transaction` atomic: either every
/// statement is applied or the database is left untouched.
pub trait ConnectionAdapter {
    /// Table names in catalog order
    fn list_tables(&self) -> Result<Vec<String>, DatabaseError>;

    /// Columns of `table` in declaration order
    fn list_columns(&self, table: &str) -> Result<Vec<ColumnInfo>, DatabaseError>;

    /// Distinct stored values of `table.column` passing `filter`, at most
    /// `limit` of them when given. Each call re-queries the database.
    fn sample_values(
        &self,
        table: &str,
        column: &str,
        filter: &ValueFilter,
        limit: Option<usize>,
    ) -> Result<Vec<StoredValue>, DatabaseError>;

    /// Apply `statements` in one transaction and return the number of
    /// changed rows. Any failure, including a statement changing fewer than
    /// its `min_rows`, rolls the whole group back.
    fn execute_in_transaction(&self, statements: &[Statement]) -> Result<usize, DatabaseError>;
}

/// Quote an identifier for use in generated SQL
pub fn quote_ident(name: &str) -> String {
    format!("\"{}\"", name.replace('"', "\"\""))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_quote_ident_plain() {
        assert_eq!(quote_ident("events"), "\"events\"");
    }

    #[test]
    fn test_quote_ident_escapes_quotes() {
        assert_eq!(quote_ident("we\"ird"), "\"we\"\"ird\"");
    }

    #[test]
    fn test_statement_with_params() {
        let stmt = Statement::with_params("UPDATE t SET a = ?1", vec![StoredValue::Null]);
        assert_eq!(stmt.params.len(), 1);
        assert!(Statement::new("DELETE FROM t").params.is_empty());
        assert_eq!(stmt.min_rows, 0);
        assert_eq!(stmt.expecting_rows(1).min_rows, 1);
    }

    #[test]
    fn test_value_filter_folds_tokens() {
        let filter = ValueFilter::new()
            .excluding_classes([StorageClass::Null])
            .text_in(&["NULL", "None"])
            .text_not_in(&["NaN"]);
        assert_eq!(filter.exclude_classes, vec![StorageClass::Null]);
        assert_eq!(filter.text_in, vec!["null", "none"]);
        assert_eq!(filter.text_not_in, vec!["nan"]);
    }
}
