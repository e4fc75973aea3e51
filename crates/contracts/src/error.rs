//! Layered error definitions
//!
//! Categorized by source: config / bus / camera / upload

use thiserror::Error;

/// Configuration and general errors
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
}

/// Message bus errors
#[derive(Debug, Error)]
pub enum BusError {
    /// Publish request could not be queued or sent
    #[error("publish to '{topic}' failed: {message}")]
    Publish { topic: String, message: String },

    /// Subscribe request was rejected by the client
    #[error("subscribe to '{topic}' failed: {message}")]
    Subscribe { topic: String, message: String },

    /// Connection to the broker is gone
    #[error("bus disconnected: {message}")]
    Disconnected { message: String },
}

impl BusError {
    /// Create publish error
    pub fn publish(topic: impl Into<String>, message: impl Into<String>) -> Self {
        Self::Publish {
            topic: topic.into(),
            message: message.into(),
        }
    }
}

/// Camera errors
#[derive(Debug, Error)]
pub enum CaptureError {
    /// Driver reported a failure
    #[error("camera '{camera}' failed: {message}")]
    Driver { camera: String, message: String },

    /// Still frame could not be encoded
    #[error("failed to encode still frame: {message}")]
    Encode { message: String },

    /// IO error
    #[error("io error: {0}")]
    Io(#[from] std::io::Error),
}

impl CaptureError {
    /// Create driver error
    pub fn driver(camera: impl Into<String>, message: impl Into<String>) -> Self {
        Self::Driver {
            camera: camera.into(),
            message: message.into(),
        }
    }
}

/// Cloud storage errors
#[derive(Debug, Error)]
pub enum UploadError {
    /// Credentials could not be loaded or a token could not be minted
    #[error("credentials error: {message}")]
    Credentials { message: String },

    /// Store settings missing from the configuration
    #[error("store configuration error: {message}")]
    Config { message: String },

    /// Transport level failure
    #[error("upload of '{name}' failed: {message}")]
    Request { name: String, message: String },

    /// Server answered with a non-success status
    #[error("upload of '{name}' rejected with status {status}: {body}")]
    Rejected {
        name: String,
        status: u16,
        body: String,
    },

    /// IO error
    #[error("io error: {0}")]
    Io(#[from] std::io::Error),
}

impl UploadError {
    /// Create credentials error
    pub fn credentials(message: impl Into<String>) -> Self {
        Self::Credentials {
            message: message.into(),
        }
    }

    /// Create store configuration error
    pub fn config(message: impl Into<String>) -> Self {
        Self::Config {
            message: message.into(),
        }
    }

    /// Create request error
    pub fn request(name: impl Into<String>, message: impl Into<String>) -> Self {
        Self::Request {
            name: name.into(),
            message: message.into(),
        }
    }
}
