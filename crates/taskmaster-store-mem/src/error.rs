//! Error types for in-memory remote operations.

use taskmaster_core::id::TaskId;
use taskmaster_core::validate::ValidationErrors;
use thiserror::Error;

use crate::RemoteOp;

/// Errors that can occur during `MemoryRemote` operations.
#[derive(Error, Debug)]
pub enum MemoryRemoteError {
    /// No row with the given id.
    #[error("Task not found: {0}")]
    TaskNotFound(TaskId),

    /// A row broke one of the table's CHECK constraints.
    #[error("Check constraint violated: {0}")]
    CheckViolation(String),

    /// Failure scheduled with `fail_next`.
    #[error("Injected failure for {0}")]
    Injected(RemoteOp),

    /// A seed record failed storage validation.
    #[error("Invalid seed record #{index}: {errors}")]
    InvalidSeed {
        /// Position in the seed array.
        index: usize,
        /// Validation messages.
        errors: ValidationErrors,
    },

    /// A seed record is well formed but breaks a table constraint.
    #[error("Seed record #{index} violates a check constraint: {reason}")]
    SeedCheckViolation {
        /// Position in the seed array.
        index: usize,
        /// Violated constraints.
        reason: String,
    },

    /// Seed data was not a JSON array.
    #[error("Seed data must be a JSON array of task records")]
    SeedNotArray,

    /// Seed data was not valid JSON.
    #[error("Failed to parse seed: {0}")]
    SeedParseError(#[from] serde_json::Error),

    /// I/O operation failed.
    #[error("I/O error: {0}")]
    IoError(#[from] std::io::Error),

    /// Failed to acquire the table lock.
    #[error("Store lock error")]
    LockError,
}
