use std::collections::HashMap;
use thiserror::Error;

use crate::auth::CredentialError;
use crate::database::StoreError;
use crate::filter::FilterError;
use crate::middleware::auth::GateRejection;
use crate::services::avatar::AvatarError;

pub type FieldErrors = HashMap<String, String>;

/// Domain error taxonomy shared by every identity and task operation.
#[derive(Debug, Error)]
pub enum ServiceError {
    #[error("{message}")]
    Validation { message: String, field_errors: FieldErrors },

    /// Same message whether the email or the password was wrong.
    #[error("Unable to Login")]
    Auth,

    #[error("Unauthorized: {}", .0.reason())]
    Unauthorized(GateRejection),

    /// Used both for absent records and records owned by someone else.
    #[error("Not found")]
    NotFound,

    #[error("{message}")]
    Conflict { field: &'static str, message: String },

    #[error("{0}")]
    PayloadTooLarge(String),

    #[error("Internal error: {0}")]
    Internal(String),
}

impl ServiceError {
    pub fn validation(message: impl Into<String>, field_errors: FieldErrors) -> Self {
        ServiceError::Validation {
            message: message.into(),
            field_errors,
        }
    }

    pub fn field(field: &str, error: impl Into<String>) -> Self {
        let mut field_errors = FieldErrors::new();
        field_errors.insert(field.to_string(), error.into());
        Self::validation("Validation failed", field_errors)
    }

    pub fn invalid_updates() -> Self {
        Self::validation("Invalid Updates!", FieldErrors::new())
    }

    pub fn internal(message: impl Into<String>) -> Self {
        ServiceError::Internal(message.into())
    }
}

impl From<StoreError> for ServiceError {
    fn from(err: StoreError) -> Self {
        match err {
            StoreError::Duplicate(field) => ServiceError::Conflict {
                field,
                message: format!("An account with this {} already exists", field),
            },
            StoreError::NotFound => ServiceError::NotFound,
            StoreError::MissingOwner => ServiceError::Unauthorized(GateRejection::UnknownIdentity),
            StoreError::Fault(msg) => {
                tracing::error!("Storage fault: {}", msg);
                ServiceError::internal(msg)
            }
            StoreError::Database(db) => {
                tracing::error!("Database error: {}", db);
                ServiceError::internal(db.to_string())
            }
        }
    }
}

impl From<CredentialError> for ServiceError {
    fn from(err: CredentialError) -> Self {
        tracing::error!("Credential store error: {}", err);
        ServiceError::internal(err.to_string())
    }
}

impl From<FilterError> for ServiceError {
    fn from(err: FilterError) -> Self {
        ServiceError::field(err.field(), err.to_string())
    }
}

impl From<AvatarError> for ServiceError {
    fn from(err: AvatarError) -> Self {
        match err {
            AvatarError::TooLarge { .. } => ServiceError::PayloadTooLarge(err.to_string()),
            AvatarError::UnsupportedType(_) | AvatarError::Decode(_) => ServiceError::field("avatar", err.to_string()),
            AvatarError::Encode(_) => {
                tracing::error!("Avatar encoding failed: {}", err);
                ServiceError::internal(err.to_string())
            }
        }
    }
}

impl From<tokio::task::JoinError> for ServiceError {
    fn from(err: tokio::task::JoinError) -> Self {
        tracing::error!("Blocking task failed: {}", err);
        ServiceError::internal(err.to_string())
    }
}
