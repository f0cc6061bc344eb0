//! Error types for access-surface
//!
//! This module defines the error hierarchy used throughout the crate.
//! We use `thiserror` for library-style errors that are part of the API;
//! the binary wraps them in `anyhow` at the boundary.

use crate::access_control::types::{AccessTarget, Operation};
use crate::entity::EntityKind;
use thiserror::Error;

/// Boxed cause carried by a failing access predicate
pub type PredicateFailure = Box<dyn std::error::Error + Send + Sync + 'static>;

/// Top-level application error
#[derive(Error, Debug)]
pub enum AppError {
    #[error("Configuration error: {0}")]
    Config(#[from] ConfigError),

    #[error("Access computation failed: {0}")]
    Access(#[from] AccessError),

    #[error("Storage error: {0}")]
    Storage(#[from] StorageError),
}

/// Configuration-related errors
#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("Failed to load configuration: {0}")]
    Load(String),

    #[error("Invalid configuration: {message}")]
    Invalid { message: String },

    #[error("Missing required configuration: {field}")]
    Missing { field: String },

    #[error("Invalid regex pattern '{pattern}': {reason}")]
    InvalidPattern { pattern: String, reason: String },

    #[error(transparent)]
    Grammar(#[from] GrammarError),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

/// Slug grammar violations
///
/// Raised while building a registry, and by the aggregator if a formatted
/// identifier collision slips through.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum GrammarError {
    #[error("{kind} slug '{slug}' has no valid external identifier")]
    InvalidSlug { kind: EntityKind, slug: String },

    #[error("{kind} slug '{slug}' is registered more than once")]
    DuplicateSlug { kind: EntityKind, slug: String },

    #[error("{kind} slugs '{first}' and '{second}' both format to '{formatted}'")]
    Collision {
        kind: EntityKind,
        first: String,
        second: String,
        formatted: String,
    },
}

/// Predicate output that is neither a boolean nor a filter object
#[derive(Error, Debug, Clone, PartialEq, Eq)]
#[error("access decision must be a boolean or a JSON object, got {found}")]
pub struct InvalidDecision {
    pub found: &'static str,
}

impl InvalidDecision {
    pub(crate) fn new(found: &'static str) -> Self {
        Self { found }
    }
}

/// A configured access predicate failed
#[derive(Error, Debug)]
#[error("access predicate for {target}{} operation '{operation}' failed: {source}", field_suffix(.field_path))]
pub struct PredicateExecutionError {
    pub target: AccessTarget,
    pub field_path: Option<String>,
    pub operation: Operation,
    #[source]
    pub source: PredicateFailure,
}

fn field_suffix(path: &Option<String>) -> String {
    match path {
        Some(path) => format!(" field '{}'", path),
        None => String::new(),
    }
}

impl PredicateExecutionError {
    pub fn new(
        target: AccessTarget,
        field_path: Option<String>,
        operation: Operation,
        source: PredicateFailure,
    ) -> Self {
        Self {
            target,
            field_path,
            operation,
            source,
        }
    }
}

/// The isolation context could not obtain a transaction
#[derive(Error, Debug)]
pub enum IsolationError {
    #[error("failed to open an isolated transaction: {0}")]
    Begin(#[source] StorageError),

    #[error("failed to probe transaction {transaction}: {source}")]
    Probe {
        transaction: String,
        #[source]
        source: StorageError,
    },
}

/// Errors surfaced by a storage engine
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum StorageError {
    #[error("transaction {0} is not active")]
    UnknownTransaction(String),

    #[error("storage backend unavailable: {0}")]
    Unavailable(String),

    #[error("storage error: {0}")]
    Backend(String),
}

/// Aggregation-level failure; the caller never sees a partial response
#[derive(Error, Debug)]
pub enum AccessError {
    #[error(transparent)]
    Predicate(#[from] PredicateExecutionError),

    #[error(transparent)]
    Isolation(#[from] IsolationError),

    #[error(transparent)]
    Grammar(#[from] GrammarError),

    #[error("access computation was cancelled")]
    Cancelled,

    #[error("access computation timed out after {timeout_ms} ms")]
    TimedOut { timeout_ms: u64 },
}

/// Result type alias for the application
pub type Result<T> = std::result::Result<T, AppError>;

/// Result type alias for access computations
pub type AccessResult<T> = std::result::Result<T, AccessError>;

/// Result type alias for storage operations
pub type StorageResult<T> = std::result::Result<T, StorageError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_predicate_error_display_with_field() {
        let err = PredicateExecutionError::new(
            AccessTarget::Collection("pages".to_string()),
            Some("meta.title".to_string()),
            Operation::Read,
            "boom".into(),
        );
        let message = err.to_string();
        assert!(message.contains("collection 'pages'"));
        assert!(message.contains("field 'meta.title'"));
        assert!(message.contains("'read'"));
        assert!(message.contains("boom"));
    }

    #[test]
    fn test_predicate_error_display_entity_level() {
        let err = PredicateExecutionError::new(
            AccessTarget::Global("header".to_string()),
            None,
            Operation::Update,
            "nope".into(),
        );
        let message = err.to_string();
        assert!(message.contains("global 'header'"));
        assert!(!message.contains("field"));
    }

    #[test]
    fn test_grammar_error_converts_to_access_error() {
        let err: AccessError = GrammarError::Collision {
            kind: EntityKind::Collection,
            first: "blog-posts".into(),
            second: "blog_posts".into(),
            formatted: "BlogPosts".into(),
        }
        .into();
        assert!(matches!(err, AccessError::Grammar(_)));
        assert!(err.to_string().contains("BlogPosts"));
    }
}
