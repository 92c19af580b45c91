/// Top-level protgraph error type.
///
/// All fallible operations in `protgraph-core` return [`Result<T, ProtGraphError>`](Result).
/// Each variant wraps a layer-specific error enum, allowing callers to
/// match on the error source without losing type information.
#[derive(thiserror::Error, Debug)]
pub enum ProtGraphError {
    /// Error from the graph store layer (`SQLite` operations, migrations).
    #[error("Store error: {0}")]
    Store(#[from] StoreError),

    /// Error while reading or normalizing the input table.
    #[error("Normalization error: {0}")]
    Normalize(#[from] NormalizeError),

    /// Error while building the similarity graph.
    #[error("Build error: {0}")]
    Build(#[from] BuildError),

    /// Error during label propagation or evaluation.
    #[error("Annotation error: {0}")]
    Annotate(#[from] AnnotateError),

    /// Error in configuration parsing or validation.
    #[error("Configuration error: {0}")]
    Config(#[from] ConfigError),
}

impl ProtGraphError {
    /// True when the failure means the store could not be reached at all,
    /// as opposed to a query that ran and found nothing.
    pub fn is_store_unavailable(&self) -> bool {
        matches!(self, Self::Store(StoreError::Unavailable(_)))
    }
}

/// Errors from the SQLite-backed graph store.
#[derive(thiserror::Error, Debug)]
pub enum StoreError {
    /// The store could not be opened or its connection handle is unusable.
    #[error("Store unavailable: {0}")]
    Unavailable(String),

    /// Underlying `SQLite` operation failed.
    #[error("SQLite error: {0}")]
    Sqlite(#[from] rusqlite::Error),

    /// Schema migration failed (version mismatch or DDL error).
    #[error("Migration failed: {0}")]
    Migration(String),

    /// JSON serialization/deserialization of stored values failed.
    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),
}

impl StoreError {
    /// Classify a raw `SQLite` error: connection-level failures become
    /// [`StoreError::Unavailable`], everything else stays a query error.
    pub fn classify(err: rusqlite::Error) -> Self {
        use rusqlite::ErrorCode;

        match err.sqlite_error_code() {
            Some(
                ErrorCode::CannotOpen
                | ErrorCode::DatabaseBusy
                | ErrorCode::DatabaseLocked
                | ErrorCode::NotADatabase
                | ErrorCode::PermissionDenied,
            ) => Self::Unavailable(err.to_string()),
            _ => Self::Sqlite(err),
        }
    }
}

/// Errors while reading the tab-separated input table.
#[derive(thiserror::Error, Debug)]
pub enum NormalizeError {
    /// Filesystem I/O error reading the table.
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// The header row has no column with this name.
    #[error("Missing required column: {0}")]
    MissingColumn(String),

    /// The input has no header row at all.
    #[error("Input table has no header row")]
    EmptyHeader,
}

/// Errors while building the similarity graph.
#[derive(thiserror::Error, Debug)]
pub enum BuildError {
    /// Threshold is NaN or outside `[0, 1]`.
    #[error("Similarity threshold must be within [0, 1], got {0}")]
    InvalidThreshold(f64),
}

/// Errors during label propagation and evaluation.
#[derive(thiserror::Error, Debug)]
pub enum AnnotateError {
    /// A propagation parameter is out of range.
    #[error("Invalid parameter: {0}")]
    InvalidParameter(String),
}

/// Errors in protgraph configuration parsing and validation.
#[derive(thiserror::Error, Debug)]
pub enum ConfigError {
    /// The configuration file does not exist at the expected path.
    #[error("Config file not found: {0}")]
    NotFound(String),

    /// Configuration values are present but semantically invalid.
    #[error("Invalid config: {0}")]
    Invalid(String),

    /// Configuration file syntax could not be parsed (TOML error).
    #[error("Parse error: {0}")]
    Parse(String),
}

/// Convenience alias for `Result<T, ProtGraphError>`.
pub type Result<T> = std::result::Result<T, ProtGraphError>;
