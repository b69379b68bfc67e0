use thiserror::Error;

#[derive(Debug, Error)]
pub enum DomainError {
    #[error("domain entity `{entity}` not found")]
    NotFound { entity: &'static str },
    #[error("domain validation failed: {message}")]
    Validation { message: String },
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

    /// Reject blank required text fields.
    pub fn require(value: &str, field: &'static str) -> Result<(), Self> {
        if value.trim().is_empty() {
            Err(Self::validation(format!("{field} is required")))
        } else {
            Ok(())
        }
    }
}
