//! Core error types for the Familyfolio engine.
//!
//! The engine is pure computation, so the taxonomy is narrow: lookups that
//! miss, registry conflicts, and invalid input or configuration. Bad numbers
//! inside holdings are clamped rather than reported.

use thiserror::Error;

/// Type alias for Result using our Error type.
pub type Result<T> = std::result::Result<T, Error>;

/// Root error type for the engine.
#[derive(Error, Debug)]
pub enum Error {
    #[error("Input validation failed: {0}")]
    Validation(#[from] ValidationError),

    #[error("Family member not found: {0}")]
    MemberNotFound(String),

    #[error("Family member already exists: {0}")]
    DuplicateMember(String),

    #[error("Holding {holding_id} not found for member {member_id}")]
    HoldingNotFound {
        member_id: String,
        holding_id: String,
    },

    #[error("Holding {holding_id} already exists for member {member_id}")]
    DuplicateHolding {
        member_id: String,
        holding_id: String,
    },

    #[error("Invalid analysis configuration: {0}")]
    InvalidConfig(String),

    #[error("Unexpected error: {0}")]
    Unexpected(String),
}

/// Validation errors for caller input and label parsing.
#[derive(Error, Debug)]
pub enum ValidationError {
    #[error("Invalid input: {0}")]
    InvalidInput(String),

    #[error("Required field '{0}' is missing")]
    MissingField(String),

    #[error("Failed to parse decimal number: {0}")]
    DecimalParse(#[from] rust_decimal::Error),
}

impl Error {
    pub(crate) fn holding_not_found(member_id: &str, holding_id: &str) -> Self {
        Self::HoldingNotFound {
            member_id: member_id.to_string(),
            holding_id: holding_id.to_string(),
        }
    }

    pub(crate) fn duplicate_holding(member_id: &str, holding_id: &str) -> Self {
        Self::DuplicateHolding {
            member_id: member_id.to_string(),
            holding_id: holding_id.to_string(),
        }
    }
}

impl From<rust_decimal::Error> for Error {
    fn from(err: rust_decimal::Error) -> Self {
        Error::Validation(ValidationError::DecimalParse(err))
    }
}

impl From<serde_json::Error> for Error {
    fn from(err: serde_json::Error) -> Self {
        Error::Validation(ValidationError::InvalidInput(err.to_string()))
    }
}

impl From<Error> for String {
    fn from(err: Error) -> Self {
        err.to_string()
    }
}
