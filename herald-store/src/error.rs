//! Error types for the herald-store crate.

use std::io;

use herald_common::{Kind, ResourceKey};
use thiserror::Error;

/// Top-level store error type.
#[derive(Debug, Error)]
pub enum StoreError {
    /// No object of this kind exists under the key.
    #[error("{kind} {key} not found")]
    NotFound { kind: Kind, key: ResourceKey },

    /// The object changed since it was read.
    #[error("Conflict writing {kind} {key}: read resourceVersion {expected}, current is {actual}")]
    Conflict {
        kind: Kind,
        key: ResourceKey,
        expected: u64,
        actual: u64,
    },

    /// Status write against a kind that has no status.
    #[error("{0} has no status")]
    NoStatus(Kind),

    /// A typed fetch found an object of a different kind.
    #[error("Expected {expected}, found {found}")]
    KindMismatch { expected: Kind, found: Kind },

    /// Reading a seed manifest failed.
    #[error("I/O error: {0}")]
    Io(#[from] io::Error),

    /// A seed manifest could not be parsed.
    #[error("Invalid manifest: {0}")]
    Manifest(#[from] serde_json::Error),

    /// Store unavailable or internally inconsistent (lock poisoning, etc.).
    #[error("Internal error: {0}")]
    Internal(String),
}

impl StoreError {
    #[must_use]
    pub const fn is_not_found(&self) -> bool {
        matches!(self, Self::NotFound { .. })
    }

    #[must_use]
    pub const fn is_conflict(&self) -> bool {
        matches!(self, Self::Conflict { .. })
    }
}

impl<T> From<std::sync::PoisonError<T>> for StoreError {
    fn from(e: std::sync::PoisonError<T>) -> Self {
        Self::Internal(format!("Lock poisoned: {e}"))
    }
}

/// Result type for store operations.
pub type Result<T> = std::result::Result<T, StoreError>;
