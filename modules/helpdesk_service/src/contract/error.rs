//! Contract error types for the helpdesk service
//!
//! These errors are transport-agnostic; the REST layer maps them to
//! Problem Details.

use std::collections::BTreeMap;
use thiserror::Error;

/// Errors raised while building or running a query against the store
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum QueryError {
    #[error("unknown filter operator '{0}'")]
    UnknownOperator(String),

    #[error("invalid projection '{select}': {reason}")]
    InvalidProjection { select: String, reason: String },

    #[error("unknown table '{0}'")]
    UnknownTable(String),

    #[error("unknown column '{column}' on table '{table}'")]
    UnknownColumn { table: String, column: String },

    #[error("unknown relation '{relation}' on table '{table}'")]
    UnknownRelation { table: String, relation: String },

    #[error("invalid value for '{column}': {reason}")]
    InvalidValue { column: String, reason: String },

    #[error("operator '{operator}' is not supported on this backend")]
    UnsupportedOperator { operator: String },

    #[error("no rows returned from '{table}'")]
    NoRows { table: String },

    #[error("expected a single row from '{table}', got {count}")]
    MultipleRows { table: String, count: usize },

    #[error("failed to decode row from '{table}': {reason}")]
    Decode { table: String, reason: String },

    /// Backend failure, message carried verbatim
    #[error("{0}")]
    Backend(String),
}

/// Per-field validation messages, keyed by form field name
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct FieldErrors(BTreeMap<String, Vec<String>>);

impl FieldErrors {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn single(field: &str, message: impl Into<String>) -> Self {
        let mut errors = Self::new();
        errors.add(field, message);
        errors
    }

    pub fn add(&mut self, field: &str, message: impl Into<String>) {
        self.0
            .entry(field.to_string())
            .or_default()
            .push(message.into());
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    pub fn get(&self, field: &str) -> Option<&[String]> {
        self.0.get(field).map(Vec::as_slice)
    }

    pub fn into_map(self) -> BTreeMap<String, Vec<String>> {
        self.0
    }

    /// `Ok(value)` when no errors were recorded
    pub fn into_result<T>(self, value: T) -> Result<T, HelpdeskError> {
        if self.is_empty() {
            Ok(value)
        } else {
            Err(HelpdeskError::Validation(self))
        }
    }
}

impl std::fmt::Display for FieldErrors {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let mut first = true;
        for (field, messages) in &self.0 {
            for message in messages {
                if !first {
                    f.write_str("; ")?;
                }
                write!(f, "{field}: {message}")?;
                first = false;
            }
        }
        Ok(())
    }
}

/// Helpdesk domain errors
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum HelpdeskError {
    /// One or more form fields failed validation
    #[error("validation failed: {0}")]
    Validation(FieldErrors),

    /// No authenticated identity (or no profile) on the request
    #[error("authentication required")]
    Unauthenticated,

    /// Authenticated but not allowed to touch the resource
    #[error("forbidden: {reason}")]
    Forbidden { reason: String },

    #[error("{resource} not found: {id}")]
    NotFound { resource: String, id: String },

    /// Store, identity provider or object storage failure
    #[error("{message}")]
    Backend { message: String },

    #[error("internal error")]
    Internal,
}

impl HelpdeskError {
    pub fn not_found(resource: &str, id: impl ToString) -> Self {
        Self::NotFound {
            resource: resource.to_string(),
            id: id.to_string(),
        }
    }

    pub fn forbidden(reason: impl Into<String>) -> Self {
        Self::Forbidden {
            reason: reason.into(),
        }
    }

    pub fn backend(message: impl ToString) -> Self {
        Self::Backend {
            message: message.to_string(),
        }
    }

    pub fn field(field: &str, message: impl Into<String>) -> Self {
        Self::Validation(FieldErrors::single(field, message))
    }
}

impl From<QueryError> for HelpdeskError {
    fn from(error: QueryError) -> Self {
        match error {
            QueryError::NoRows { table } => Self::NotFound {
                resource: table,
                id: String::new(),
            },
            other => Self::backend(other),
        }
    }
}

/// Identity provider failures
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum AuthError {
    /// The provider answered with an error status
    #[error("{message}")]
    Rejected { status: u16, message: String },

    #[error("identity provider unreachable: {0}")]
    Transport(String),

    #[error("unexpected identity provider response: {0}")]
    Decode(String),

    #[error("identity provider is missing configuration: {0}")]
    NotConfigured(String),
}

impl From<AuthError> for HelpdeskError {
    fn from(error: AuthError) -> Self {
        Self::backend(error)
    }
}

/// Object storage failures
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum StorageError {
    #[error("upload rejected ({status}): {message}")]
    Rejected { status: u16, message: String },

    #[error("object storage unreachable: {0}")]
    Transport(String),
}

impl From<StorageError> for HelpdeskError {
    fn from(error: StorageError) -> Self {
        Self::backend(error)
    }
}
