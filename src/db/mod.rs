mod adapter;
mod sqlite;
mod value;

pub use adapter::{quote_ident, ColumnInfo, ConnectionAdapter, Statement, ValueFilter};
pub use sqlite::SqliteAdapter;
pub use value::{StorageClass, StoredValue};
