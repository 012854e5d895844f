//! Layered error definitions
//!
//! Categorized by source: config / source / wire

use thiserror::Error;

/// Unified error type
#[derive(Debug, Error)]
pub enum ContractError {
    // ===== Configuration Errors =====
    /// Configuration parse error
    #[error("config parse error: {message}")]
    ConfigParse {
        message: String,
        #[source]
        source: Option<Box<dyn std::error::Error + Send + Sync>>,
    },

    /// Configuration validation error
    #[error("config validation error at '{field}': {message}")]
    ConfigValidation { field: String, message: String },

    // ===== Source Errors =====
    /// Source started twice
    #[error("frame source '{source_name}' is already running")]
    SourceAlreadyRunning { source_name: String },

    /// Source failed to start
    #[error("frame source '{source_name}' failed to start: {message}")]
    SourceStart {
        source_name: String,
        message: String,
    },

    // ===== Wire Errors =====
    /// Message too short to carry the frame index
    #[error("malformed message: expected at least {expected_min} bytes, got {actual}")]
    MalformedMessage { expected_min: usize, actual: usize },

    /// Message published under a different topic
    #[error("message does not match topic '{expected}'")]
    TopicMismatch { expected: String },

    // ===== General Errors =====
    /// IO error
    #[error("io error: {0}")]
    Io(#[from] std::io::Error),

    /// Other error
    #[error("{0}")]
    Other(String),
}

impl ContractError {
    /// Create configuration parse error
    pub fn config_parse(message: impl Into<String>) -> Self {
        Self::ConfigParse {
            message: message.into(),
            source: None,
        }
    }

    /// Create configuration validation error
    pub fn config_validation(field: impl Into<String>, message: impl Into<String>) -> Self {
        Self::ConfigValidation {
            field: field.into(),
            message: message.into(),
        }
    }

    /// Create source start error
    pub fn source_start(source_name: impl Into<String>, message: impl Into<String>) -> Self {
        Self::SourceStart {
            source_name: source_name.into(),
            message: message.into(),
        }
    }
}
