//! Error types for incident-report.
//!
//! This module defines the crate-wide error type. Widget-scoped failures that
//! are shown to the user inline live next to their widget (see
//! [`crate::upload::UploadError`]) and never flow through here.

use std::path::PathBuf;
use thiserror::Error;

/// The main error type for incident-report operations.
#[derive(Error, Debug)]
pub enum Error {
    // === Storage Errors ===
    /// Failed to open or create the state database.
    #[error("failed to open database at {path}: {source}")]
    DatabaseOpen {
        /// Path to the database file.
        path: PathBuf,
        /// The underlying error.
        #[source]
        source: rusqlite::Error,
    },

    /// A database query failed.
    #[error("database query failed: {0}")]
    DatabaseQuery(#[from] rusqlite::Error),

    /// Failed to run database migrations.
    #[error("database migration failed: {message}")]
    DatabaseMigration {
        /// Description of what went wrong.
        message: String,
    },

    // === Configuration Errors ===
    /// Failed to load configuration.
    #[error("failed to load configuration: {0}")]
    ConfigLoad(Box<figment::Error>),

    /// Configuration validation failed.
    #[error("invalid configuration: {message}")]
    ConfigValidation {
        /// Description of the validation failure.
        message: String,
    },

    // === Document Errors ===
    /// A dotted field path could not be applied to the document.
    #[error("invalid field path '{path}': {message}")]
    FieldPath {
        /// The offending path.
        path: String,
        /// Why it was rejected.
        message: String,
    },

    /// A field value given on the command line could not be interpreted.
    #[error("invalid value for '{field}': {message}")]
    FieldValue {
        /// The field being set.
        field: String,
        /// Why it was rejected.
        message: String,
    },

    // === I/O Errors ===
    /// Failed to create a required directory.
    #[error("failed to create directory {path}: {source}")]
    DirectoryCreate {
        /// Path that couldn't be created.
        path: PathBuf,
        /// The underlying error.
        #[source]
        source: std::io::Error,
    },

    // === Serialization Errors ===
    /// JSON serialization/deserialization failed.
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),
}

/// A specialized Result type for incident-report operations.
pub type Result<T> = std::result::Result<T, Error>;

impl From<figment::Error> for Error {
    fn from(err: figment::Error) -> Self {
        Self::ConfigLoad(Box::new(err))
    }
}

impl Error {
    /// Create a field path error.
    #[must_use]
    pub fn field_path(path: impl Into<String>, message: impl Into<String>) -> Self {
        Self::FieldPath {
            path: path.into(),
            message: message.into(),
        }
    }

    /// Create a field value error.
    #[must_use]
    pub fn field_value(field: impl Into<String>, message: impl Into<String>) -> Self {
        Self::FieldValue {
            field: field.into(),
            message: message.into(),
        }
    }

    /// Check if this error came from the storage layer.
    #[must_use]
    pub fn is_storage_error(&self) -> bool {
        matches!(
            self,
            Self::DatabaseOpen { .. } | Self::DatabaseQuery(_) | Self::DatabaseMigration { .. }
        )
    }
}
