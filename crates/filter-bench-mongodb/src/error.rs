//! Error types for the MongoDB side of the benchmark.

use thiserror::Error;

/// Errors that can occur while provisioning, loading or querying MongoDB.
#[derive(Error, Debug)]
pub enum BenchError {
    /// MongoDB connection or query error.
    #[error("MongoDB error: {0}")]
    MongoDB(#[from] mongodb::error::Error),

    /// The ephemeral instance could not be started or stopped.
    #[error("Provisioning error: {0}")]
    Provision(String),

    /// Fewer documents were inserted than generated.
    #[error("Insert error: expected {expected} documents, inserted {inserted}")]
    Insert { expected: usize, inserted: usize },

    /// A strategy returned a result that breaks its contract.
    #[error("Verification error ({strategy}): {message}")]
    Verification { strategy: String, message: String },

    /// Configuration error.
    #[error("Configuration error: {0}")]
    Config(String),
}
