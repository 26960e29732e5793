//! Error taxonomy for catalog operations

use rusqlite::ffi;
use thiserror::Error;

/// Result type alias for catalog operations
pub type Result<T, E = CatalogError> = std::result::Result<T, E>;

#[derive(Debug, Error)]
pub enum CatalogError {
    /// Pool exhausted, shut down, or a connection could not be opened
    #[error("Connection error: {0}")]
    Connection(String),

    /// The body of a scoped transaction failed; the transaction was rolled back
    #[error("Transaction rolled back: {0}")]
    Transaction(#[source] Box<CatalogError>),

    /// A caller-supplied value failed a precondition
    #[error("Validation error: {0}")]
    Validation(String),

    /// A uniqueness constraint was violated
    #[error("Duplicate {resource}: {detail}")]
    DuplicateResource { resource: String, detail: String },

    #[error("{resource} {id} not found")]
    ResourceNotFound { resource: &'static str, id: i64 },

    /// The database file was written by a newer schema than this build knows
    #[error("Schema version {found} is newer than supported version {supported}")]
    IncompatibleSchema { found: i64, supported: i64 },

    #[error("Database error: {0}")]
    Database(#[source] rusqlite::Error),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

impl CatalogError {
    pub(crate) fn validation(msg: impl Into<String>) -> Self {
        Self::Validation(msg.into())
    }

    pub(crate) fn not_found(resource: &'static str, id: i64) -> Self {
        Self::ResourceNotFound { resource, id }
    }
}

impl From<rusqlite::Error> for CatalogError {
    fn from(err: rusqlite::Error) -> Self {
        if let rusqlite::Error::SqliteFailure(code, msg) = &err {
            if code.extended_code == ffi::SQLITE_CONSTRAINT_UNIQUE
                || code.extended_code == ffi::SQLITE_CONSTRAINT_PRIMARYKEY
            {
                let (resource, detail) = parse_unique_violation(msg.as_deref());
                return Self::DuplicateResource { resource, detail };
            }
        }
        Self::Database(err)
    }
}

/// Split SQLite's "UNIQUE constraint failed: files.project_id, files.rel_path"
/// into the table name and the list of columns.
fn parse_unique_violation(msg: Option<&str>) -> (String, String) {
    let Some(columns) = msg.and_then(|m| m.split_once(": ").map(|(_, cols)| cols)) else {
        return ("resource".to_string(), msg.unwrap_or("constraint failed").to_string());
    };

    let table = columns
        .split(',')
        .next()
        .and_then(|c| c.trim().split_once('.'))
        .map(|(table, _)| table.to_string())
        .unwrap_or_else(|| "resource".to_string());

    let detail = columns
        .split(',')
        .map(|c| c.trim().rsplit('.').next().unwrap_or(c.trim()))
        .collect::<Vec<_>>()
        .join(", ");

    (table, detail)
}
