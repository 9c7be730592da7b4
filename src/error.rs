// ⚠️ Registry Errors
// One taxonomy for validation, lookup and storage failures

use thiserror::Error;

#[derive(Debug, Error)]
pub enum RegistryError {
    #[error("invalid SWIFT code format: {0}")]
    InvalidFormat(String),

    #[error("headquarter flag {flag} is inconsistent with SWIFT code {code}")]
    InconsistentHeadquarterFlag { code: String, flag: bool },

    /// Format validation should make this unreachable; a corrupt candidate got through.
    #[error("SWIFT code {0} is too short to derive a headquarter code")]
    CodeTooShortForDerivation(String),

    #[error("{field} must not be empty")]
    FieldEmpty { field: &'static str },

    #[error("{field} must be at most {max} characters")]
    FieldTooLong { field: &'static str, max: usize },

    #[error("country ISO2 code must be exactly two letters: {0}")]
    InvalidCountryCode(String),

    #[error("not found: {0}")]
    NotFound(String),

    #[error("SWIFT code already exists: {0}")]
    AlreadyExists(String),

    #[error("storage error: {0}")]
    Storage(#[from] rusqlite::Error),

    #[error("internal: {0}")]
    Internal(#[from] anyhow::Error),
}

impl RegistryError {
    /// Stable machine-readable kind, used in API error bodies.
    pub fn kind(&self) -> &'static str {
        match self {
            Self::InvalidFormat(_) => "InvalidFormat",
            Self::InconsistentHeadquarterFlag { .. } => "InconsistentHeadquarterFlag",
            Self::CodeTooShortForDerivation(_) => "CodeTooShortForDerivation",
            Self::FieldEmpty { .. } => "FieldEmpty",
            Self::FieldTooLong { .. } => "FieldTooLong",
            Self::InvalidCountryCode(_) => "InvalidCountryCode",
            Self::NotFound(_) => "NotFound",
            Self::AlreadyExists(_) => "AlreadyExists",
            Self::Storage(_) => "Storage",
            Self::Internal(_) => "Internal",
        }
    }

    /// True for errors caused by the caller's candidate, detected before any write.
    pub fn is_validation(&self) -> bool {
        matches!(
            self,
            Self::InvalidFormat(_)
                | Self::InconsistentHeadquarterFlag { .. }
                | Self::CodeTooShortForDerivation(_)
                | Self::FieldEmpty { .. }
                | Self::FieldTooLong { .. }
                | Self::InvalidCountryCode(_)
        )
    }

    pub fn http_status(&self) -> u16 {
        match self {
            e if e.is_validation() => 400,
            Self::NotFound(_) => 404,
            Self::AlreadyExists(_) => 409,
            _ => 500,
        }
    }
}

pub type Result<T> = std::result::Result<T, RegistryError>;
