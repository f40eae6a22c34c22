use std::borrow::Cow;

use thiserror::Error;

/// Top-level error type returned by portal operations.
#[derive(Debug, Error)]
pub enum PortalError {
    /// Validation failed for one or more fields.
    #[error("validation failed")]
    Validation(#[from] ValidationError),

    /// Underlying SQLite call failed outside of a record save.
    #[error("storage error: {0}")]
    Storage(#[from] rusqlite::Error),

    /// Caller role or ownership does not permit the operation.
    ///
    /// Carries no detail, so a missing record and a foreign record look the same.
    #[error("unauthorized")]
    Unauthorized,

    /// Target record was not found.
    #[error("{entity} not found")]
    NotFound { entity: String, id: Option<i64> },

    /// A unique value (email, field name, column) is already taken.
    #[error("{entity} already exists: {key}")]
    AlreadyExists { entity: String, key: String },

    /// Storage schema and field metadata disagree after a schema change.
    #[error("schema and field metadata are inconsistent: {detail}")]
    Inconsistent { detail: String },

    /// Insert or update was rolled back by the storage layer.
    #[error("save failed: {message}")]
    SaveFailed { message: String },

    /// A report could not be rendered as CSV.
    #[error("csv export failed: {0}")]
    Export(#[from] csv::Error),

    /// Configuration could not be loaded or is invalid.
    #[error("configuration error: {message}")]
    Config { message: String },

    #[error("{message}")]
    Other { message: Cow<'static, str> },
}

impl PortalError {
    pub fn not_found(entity: impl Into<String>, id: Option<i64>) -> Self {
        Self::NotFound {
            entity: entity.into(),
            id,
        }
    }

    pub fn already_exists(entity: impl Into<String>, key: impl Into<String>) -> Self {
        Self::AlreadyExists {
            entity: entity.into(),
            key: key.into(),
        }
    }

    pub fn save_failed(err: impl std::fmt::Display) -> Self {
        Self::SaveFailed {
            message: err.to_string(),
        }
    }
}

/// Collection of validation issues encountered while preparing a mutation.
#[derive(Debug, Error)]
#[error("validation errors: {issues:?}")]
pub struct ValidationError {
    pub issues: Vec<ValidationIssue>,
}

impl ValidationError {
    pub fn new<I>(issues: I) -> Self
    where
        I: IntoIterator<Item = ValidationIssue>,
    {
        Self {
            issues: issues.into_iter().collect(),
        }
    }

    /// Convenience helper for constructing a single-field validation error.
    pub fn single(field: impl Into<String>, code: impl Into<String>, message: impl Into<String>) -> Self {
        Self::new([ValidationIssue::new(field, code, message)])
    }

    pub fn is_empty(&self) -> bool {
        self.issues.is_empty()
    }

    /// Returns `true` if any issue carries the given code.
    pub fn has_code(&self, code: &str) -> bool {
        self.issues.iter().any(|issue| issue.code == code)
    }
}

/// Detailed validation failure for a single field or logical path.
#[derive(Debug, Clone)]
pub struct ValidationIssue {
    pub field: String,
    pub code: String,
    pub message: String,
}

impl ValidationIssue {
    pub fn new(field: impl Into<String>, code: impl Into<String>, message: impl Into<String>) -> Self {
        Self {
            field: field.into(),
            code: code.into(),
            message: message.into(),
        }
    }
}

/// Returns `true` when the SQLite error is a constraint violation (unique, check, foreign key).
pub(crate) fn is_constraint_violation(err: &rusqlite::Error) -> bool {
    matches!(
        err,
        rusqlite::Error::SqliteFailure(failure, _) if failure.code == rusqlite::ErrorCode::ConstraintViolation
    )
}

/// Returns `true` when an `ALTER TABLE ... ADD COLUMN` lost a race to an identical alter.
pub(crate) fn is_duplicate_column(err: &rusqlite::Error) -> bool {
    err.to_string().contains("duplicate column name")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn single_issue_carries_code() {
        let err = ValidationError::single("title", "validation.required", "title is required");
        assert!(!err.is_empty());
        assert!(err.has_code("validation.required"));
        assert!(!err.has_code("validation.length"));
    }

    #[test]
    fn unauthorized_message_has_no_detail() {
        assert_eq!(PortalError::Unauthorized.to_string(), "unauthorized");
    }
}
