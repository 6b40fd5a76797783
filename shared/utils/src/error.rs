use bomsheet_database::StoreError;
use serde::{Deserialize, Serialize};
use thiserror::Error;

#[derive(Error, Debug, Clone, Serialize, Deserialize, PartialEq)]
pub enum BomsheetError {
    #[error("Validation error: {field} - {message}")]
    Validation { field: String, message: String },

    #[error("Not found: {resource}")]
    NotFound { resource: String },

    #[error("Storage error: {message}")]
    Storage { message: String },

    #[error("Configuration error: {message}")]
    Configuration { message: String },

    #[error("Internal server error: {message}")]
    Internal { message: String },
}

impl BomsheetError {
    pub fn validation(field: impl Into<String>, message: impl Into<String>) -> Self {
        Self::Validation {
            field: field.into(),
            message: message.into(),
        }
    }

    pub fn not_found(resource: impl Into<String>) -> Self {
        Self::NotFound {
            resource: resource.into(),
        }
    }

    pub fn storage(message: impl Into<String>) -> Self {
        Self::Storage {
            message: message.into(),
        }
    }

    pub fn configuration(message: impl Into<String>) -> Self {
        Self::Configuration {
            message: message.into(),
        }
    }

    pub fn internal(message: impl Into<String>) -> Self {
        Self::Internal {
            message: message.into(),
        }
    }

    pub fn error_code(&self) -> &'static str {
        match self {
            Self::Validation { .. } => "VALIDATION_ERROR",
            Self::NotFound { .. } => "NOT_FOUND",
            Self::Storage { .. } => "STORAGE_ERROR",
            Self::Configuration { .. } => "CONFIGURATION_ERROR",
            Self::Internal { .. } => "INTERNAL_SERVER_ERROR",
        }
    }

    pub fn http_status_code(&self) -> u16 {
        match self {
            Self::Validation { .. } => 400,
            Self::NotFound { .. } => 404,
            Self::Storage { .. } => 500,
            Self::Configuration { .. } => 500,
            Self::Internal { .. } => 500,
        }
    }

    /// Text placed in the `message` field of the response envelope.
    pub fn client_message(&self) -> String {
        match self {
            Self::Validation { message, .. } => message.clone(),
            Self::NotFound { resource } => format!("{} not found", resource),
            Self::Storage { message }
            | Self::Configuration { message }
            | Self::Internal { message } => message.clone(),
        }
    }
}

pub type BomsheetResult<T> = Result<T, BomsheetError>;

impl From<StoreError> for BomsheetError {
    fn from(error: StoreError) -> Self {
        Self::storage(error.to_string())
    }
}

/// Repository failures arrive as `anyhow` chains; the full chain becomes the message.
impl From<anyhow::Error> for BomsheetError {
    fn from(error: anyhow::Error) -> Self {
        Self::storage(format!("{:#}", error))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use anyhow::Context;

    #[test]
    fn test_status_codes() {
        assert_eq!(BomsheetError::validation("action", "x").http_status_code(), 400);
        assert_eq!(BomsheetError::not_found("Measurement").http_status_code(), 404);
        assert_eq!(BomsheetError::storage("disk").error_code(), "STORAGE_ERROR");
    }

    #[test]
    fn test_anyhow_chain_is_kept() {
        let err: anyhow::Result<()> = Err(StoreError::TableNotFound("bom".to_string()))
            .context("Unable to retrieve BOM data");
        let err = BomsheetError::from(err.unwrap_err());

        assert_eq!(
            err.client_message(),
            "Unable to retrieve BOM data: table 'bom' not found"
        );
    }

    #[test]
    fn test_not_found_message() {
        assert_eq!(
            BomsheetError::not_found("Measurement with id 7").client_message(),
            "Measurement with id 7 not found"
        );
    }
}
