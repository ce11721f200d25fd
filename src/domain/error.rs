use thiserror::Error;

#[derive(Debug, Error)]
pub enum DomainError {
    #[error("domain entity `{entity}` not found")]
    NotFound { entity: &'static str },
    #[error("domain validation failed: {message}")]
    Validation { message: String },
    #[error("`{entity}` rejected the change: {message}")]
    Conflict {
        entity: &'static str,
        message: String,
    },
}

impl DomainError {
    pub fn not_found(entity: &'static str) -> Self {
        Self::NotFound { entity }
    }

    pub fn validation(message: impl Into<String>) -> Self {
        Self::Validation {
            message: message.into(),
        }
    }

    pub fn conflict(entity: &'static str, message: impl Into<String>) -> Self {
        Self::Conflict {
            entity,
            message: message.into(),
        }
    }
}
