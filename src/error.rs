//! Error types for MindOS.

use crate::onboarding::step::{ProfileField, StepId};

/// Top-level error type.
#[derive(Debug, thiserror::Error)]
pub enum Error {
    #[error("Configuration error: {0}")]
    Config(#[from] ConfigError),

    #[error("Storage error: {0}")]
    Storage(#[from] StorageError),

    #[error("Wizard error: {0}")]
    Wizard(#[from] WizardError),

    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),
}

/// Configuration-related errors.
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("Invalid configuration value for {key}: {message}")]
    InvalidValue { key: String, message: String },
}

/// Key-value storage errors.
#[derive(Debug, thiserror::Error)]
pub enum StorageError {
    #[error("Failed to open store: {0}")]
    Open(String),

    #[error("Query failed: {0}")]
    Query(String),

    #[error("Migration failed: {0}")]
    Migration(String),

    #[error("Store unavailable: {0}")]
    Unavailable(String),
}

/// Rejected wizard operations.
///
/// `Gated` and `AtTerminal` are ordinary outcomes of a UI pressing "next"
/// too early. The rest indicate a caller bound the wrong field or step.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum WizardError {
    #[error("Step {step} is not complete yet")]
    Gated { step: StepId },

    #[error("Step {step} is the last step; call complete() instead")]
    AtTerminal { step: StepId },

    #[error("Step {step} is not the last step")]
    NotTerminal { step: StepId },

    #[error("Step {step} does not accept field {field}")]
    FieldMismatch { step: StepId, field: ProfileField },

    #[error("Option {option:?} is not offered by step {step}")]
    UnknownOption { step: StepId, option: String },

    #[error("Profile is missing {missing}")]
    IncompleteProfile { missing: ProfileField },

    #[error("Onboarding already completed")]
    AlreadyComplete,
}

/// Result type alias for MindOS.
pub type Result<T> = std::result::Result<T, Error>;
