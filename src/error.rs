//! Errors from provisioning and querying a Yeast-base database.

use std::path::PathBuf;

use rusqlite::ErrorCode;
use thiserror::Error;

//-----------------------------------------------------------------------------

/// An error from building or reading a Yeast-base database.
///
/// Errors are never retried.
/// If provisioning fails, the database file is in an unspecified state and should be discarded.
#[derive(Debug, Error)]
pub enum Error {
    /// The target path cannot be resolved to an absolute filesystem path.
    #[error("Malformed database path: {0}")]
    MalformedPath(String),

    /// The parent directory of the target path does not exist.
    #[error("Parent directory of {} does not exist", .0.display())]
    MissingParentDirectory(PathBuf),

    /// The target database already contains a conflicting table, index, or view.
    #[error("Schema conflict: {0}")]
    SchemaConflict(String),

    /// A row-set does not fit the target table or violates a constraint.
    #[error("Failed to load table {table}: {message}")]
    Load {
        /// Name of the target table.
        table: String,
        /// What went wrong.
        message: String,
    },

    /// An existing database does not have the expected tables and views.
    #[error("Not a Yeast-base database: {0}")]
    InvalidDatabase(String),

    /// A failure in the underlying SQLite engine.
    #[error("Database error: {0}")]
    Engine(#[from] rusqlite::Error),

    /// The resource provider could not supply a dataset.
    #[error("Resource error: {0}")]
    Resource(String),

    /// A dataset is not well-formed tabular text.
    #[error("Parse error: {0}")]
    Parse(String),
}

impl Error {
    /// Creates a load error for the given table.
    pub fn load<T: Into<String>, M: Into<String>>(table: T, message: M) -> Self {
        Error::Load { table: table.into(), message: message.into() }
    }

    // Classifies an engine error from inserting a row: constraint violations are load errors.
    pub(crate) fn from_insert(table: &str, row: usize, error: rusqlite::Error) -> Self {
        match error.sqlite_error_code() {
            Some(ErrorCode::ConstraintViolation) => Error::load(table, format!("Row {}: {}", row, error)),
            _ => Error::Engine(error),
        }
    }
}

//-----------------------------------------------------------------------------


//-----------------------------------------------------------------------------
