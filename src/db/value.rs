use rusqlite::types::{ToSql, ToSqlOutput, Value, ValueRef};
use serde::{Deserialize, Serialize};
use std::fmt;

/// Runtime storage class of a stored value
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum StorageClass {
    Null,
    Integer,
    Real,
    Text,
    Blob,
}

impl StorageClass {
    pub const ALL: [StorageClass; 5] = [
        StorageClass::Null,
        StorageClass::Integer,
        StorageClass::Real,
        StorageClass::Text,
        StorageClass::Blob,
    ];

    /// Classify a stored value. Every value has exactly one class.
    pub fn of(value: &StoredValue) -> Self {
        match value {
            StoredValue::Null => StorageClass::Null,
            StoredValue::Integer(_) => StorageClass::Integer,
            StoredValue::Real(_) => StorageClass::Real,
            StoredValue::Text(_) => StorageClass::Text,
            StoredValue::Blob(_) => StorageClass::Blob,
        }
    }

    /// Name as reported by SQLite's `typeof()`
    pub fn as_str(&self) -> &'static str {
        match self {
            StorageClass::Null => "null",
            StorageClass::Integer => "integer",
            StorageClass::Real => "real",
            StorageClass::Text => "text",
            StorageClass::Blob => "blob",
        }
    }
}

impl fmt::Display for StorageClass {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.as_str().to_uppercase())
    }
}

/// A raw value as stored in a column
#[derive(Debug, Clone, PartialEq)]
pub enum StoredValue {
    Null,
    Integer(i64),
    Real(f64),
    Text(String),
    Blob(Vec<u8>),
}

impl StoredValue {
    pub fn storage_class(&self) -> StorageClass {
        StorageClass::of(self)
    }

    pub fn as_text(&self) -> Option<&str> {
        match self {
            StoredValue::Text(s) => Some(s),
            _ => None,
        }
    }
}

impl fmt::Display for StoredValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            StoredValue::Null => f.write_str("NULL"),
            StoredValue::Integer(i) => write!(f, "{}", i),
            StoredValue::Real(r) => write!(f, "{:?}", r),
            StoredValue::Text(s) => write!(f, "'{}'", s.replace('\'', "''")),
            StoredValue::Blob(b) => {
                f.write_str("X'")?;
                for byte in b {
                    write!(f, "{:02X}", byte)?;
                }
                f.write_str("'")
            }
        }
    }
}

impl From<ValueRef<'_>> for StoredValue {
    fn from(value: ValueRef<'_>) -> Self {
        match value {
            ValueRef::Null => StoredValue::Null,
            ValueRef::Integer(i) => StoredValue::Integer(i),
            ValueRef::Real(r) => StoredValue::Real(r),
            ValueRef::Text(t) => StoredValue::Text(String::from_utf8_lossy(t).into_owned()),
            ValueRef::Blob(b) => StoredValue::Blob(b.to_vec()),
        }
    }
}

impl From<Value> for StoredValue {
    fn from(value: Value) -> Self {
        match value {
            Value::Null => StoredValue::Null,
            Value::Integer(i) => StoredValue::Integer(i),
            Value::Real(r) => StoredValue::Real(r),
            Value::Text(t) => StoredValue::Text(t),
            Value::Blob(b) => StoredValue::Blob(b),
        }
    }
}

impl ToSql for StoredValue {
    fn to_sql(&self) -> rusqlite::Result<ToSqlOutput<'_>> {
        let value = match self {
            StoredValue::Null => ValueRef::Null,
            StoredValue::Integer(i) => ValueRef::Integer(*i),
            StoredValue::Real(r) => ValueRef::Real(*r),
            StoredValue::Text(s) => ValueRef::Text(s.as_bytes()),
            StoredValue::Blob(b) => ValueRef::Blob(b),
        };
        Ok(ToSqlOutput::Borrowed(value))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_storage_class_of_every_variant() {
        assert_eq!(StorageClass::of(&StoredValue::Null), StorageClass::Null);
        assert_eq!(StorageClass::of(&StoredValue::Integer(1)), StorageClass::Integer);
        assert_eq!(StorageClass::of(&StoredValue::Real(0.5)), StorageClass::Real);
        assert_eq!(
            StorageClass::of(&StoredValue::Text("a".to_string())),
            StorageClass::Text
        );
        assert_eq!(StorageClass::of(&StoredValue::Blob(vec![1])), StorageClass::Blob);
    }

    #[test]
    fn test_storage_class_matches_typeof_names() {
        assert_eq!(StorageClass::Integer.as_str(), "integer");
        assert_eq!(StorageClass::Blob.to_string(), "BLOB");
        assert_eq!(
            serde_json::to_string(&StorageClass::Real).unwrap(),
            "\"real\""
        );
    }

    #[test]
    fn test_display_quotes_like_sql_literals() {
        assert_eq!(StoredValue::Text("it's".to_string()).to_string(), "'it''s'");
        assert_eq!(StoredValue::Blob(vec![0xAB, 0x01]).to_string(), "X'AB01'");
        assert_eq!(StoredValue::Real(1.0).to_string(), "1.0");
        assert_eq!(StoredValue::Null.to_string(), "NULL");
    }

    #[test]
    fn test_from_value_ref() {
        assert_eq!(
            StoredValue::from(ValueRef::Text(b"abc")),
            StoredValue::Text("abc".to_string())
        );
        assert_eq!(StoredValue::from(ValueRef::Integer(7)), StoredValue::Integer(7));
    }
}
