use sea_orm::error::{DbErr, SqlErr};
use serde::Serialize;

#[derive(Debug, thiserror::Error, Serialize)]
pub enum ServiceError {
    #[error("Database error: {0}")]
    DatabaseError(
        #[from]
        #[serde(skip)]
        DbErr,
    ),

    #[error("Not found: {0}")]
    NotFound(String),

    #[error("Conflict: {0}")]
    Conflict(String),

    #[error("Referential integrity violation: {0}")]
    ReferentialIntegrity(String),

    #[error("Validation error: {0}")]
    ValidationError(String),

    #[error("Invalid input: {0}")]
    InvalidInput(String),

    #[error("Forbidden: {0}")]
    Forbidden(String),

    #[error("Internal error: {0}")]
    InternalError(String),
}

impl From<validator::ValidationErrors> for ServiceError {
    fn from(err: validator::ValidationErrors) -> Self {
        ServiceError::ValidationError(err.to_string())
    }
}

impl ServiceError {
    /// Classifies a database error, surfacing constraint violations as the
    /// matching domain error and everything else as a store failure.
    pub fn from_db_constraint(error: DbErr, context: impl Into<String>) -> Self {
        match error.sql_err() {
            Some(SqlErr::UniqueConstraintViolation(_)) => ServiceError::Conflict(context.into()),
            Some(SqlErr::ForeignKeyConstraintViolation(_)) => {
                ServiceError::ReferentialIntegrity(context.into())
            }
            _ => ServiceError::DatabaseError(error),
        }
    }

    /// Returns the HTTP status code for this error.
    /// This is the single source of truth for error-to-status mapping.
    pub fn status_code(&self) -> u16 {
        match self {
            Self::NotFound(_) => 404,
            Self::Conflict(_) => 409,
            Self::ReferentialIntegrity(_) | Self::ValidationError(_) => 422,
            Self::InvalidInput(_) => 400,
            Self::Forbidden(_) => 403,
            Self::DatabaseError(_) | Self::InternalError(_) => 500,
        }
    }

    /// Machine-readable code for the request layer.
    pub fn error_code(&self) -> &'static str {
        match self {
            Self::NotFound(_) => "resource_not_found",
            Self::Conflict(_) => "conflict",
            Self::ReferentialIntegrity(_) => "referential_integrity",
            Self::ValidationError(_) => "validation_error",
            Self::InvalidInput(_) => "invalid_input",
            Self::Forbidden(_) => "forbidden",
            Self::DatabaseError(_) => "store_failure",
            Self::InternalError(_) => "internal_error",
        }
    }

    /// Returns the error message suitable for responses.
    /// Internal errors return generic messages to avoid leaking implementation details.
    pub fn response_message(&self) -> String {
        match self {
            Self::DatabaseError(_) => "Database error".to_string(),
            Self::InternalError(_) => "Internal server error".to_string(),
            _ => self.to_string(),
        }
    }
}
