use thiserror::Error;

/// Failure reported by a connection adapter
#[derive(Debug, Error)]
pub enum DatabaseError {
    #[error("SQLite error: {0}")]
    Sqlite(#[from] rusqlite::Error),

    #[error("Connection is closed")]
    Closed,

    #[error("{0}")]
    Other(String),
}

/// Invalid run configuration, detected before any rule executes
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("Rule id '{0}' is already registered")]
    DuplicateRule(String),

    #[error("Unknown rule or tag '{0}'")]
    UnknownRule(String),

    #[error("Table '{0}' does not exist")]
    UnknownTable(String),

    #[error("Column '{0}' does not exist in the selected tables")]
    UnknownColumn(String),

    #[error("Invalid mode '{0}' (expected 'lint' or 'fix')")]
    InvalidMode(String),

    #[error("sample_limit must be greater than zero")]
    InvalidSampleLimit,

    #[error("Failed to read config file {path}: {source}")]
    Read {
        path: String,
        #[source]
        source: std::io::Error,
    },

    #[error("Failed to parse config: {0}")]
    Parse(#[from] toml::de::Error),
}

/// Failure raised by a rule's check or fix logic
#[derive(Debug, Error)]
pub enum RuleError {
    #[error(transparent)]
    Database(#[from] DatabaseError),

    #[error("Cannot losslessly coerce {value} to {affinity} affinity")]
    NotCoercible { value: String, affinity: String },

    #[error("Rule '{0}' does not provide a fix")]
    NotFixable(String),

    #[error("Rule '{rule_id}' requires a {expected} scope")]
    WrongScope {
        rule_id: String,
        expected: &'static str,
    },
}

/// Run-aborting engine errors; everything else is recorded in the report
#[derive(Debug, Error)]
pub enum EngineError {
    #[error("Schema introspection failed: {0}")]
    SchemaIntrospection(#[source] DatabaseError),

    #[error("Configuration error: {0}")]
    Configuration(#[from] ConfigError),
}
