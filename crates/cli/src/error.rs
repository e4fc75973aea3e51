//! Error types for CLI operations.

use std::path::{Path, PathBuf};

use thiserror::Error;

/// CLI-specific error types
#[derive(Error, Debug)]
pub enum CliError {
    /// Configuration file not found
    #[error("Configuration file not found: {}", path.display())]
    ConfigNotFound { path: PathBuf },

    /// A component could not be built before the tasks start
    #[error("Failed to start {component}: {message}")]
    Startup { component: String, message: String },

    /// A background task ended abnormally
    #[error("Task '{task}' failed: {message}")]
    Task { task: String, message: String },
}

impl CliError {
    pub fn config_not_found(path: &Path) -> Self {
        Self::ConfigNotFound {
            path: path.to_path_buf(),
        }
    }

    pub fn startup(component: impl Into<String>, message: impl ToString) -> Self {
        Self::Startup {
            component: component.into(),
            message: message.to_string(),
        }
    }

    pub fn task(task: impl Into<String>, message: impl ToString) -> Self {
        Self::Task {
            task: task.into(),
            message: message.to_string(),
        }
    }
}
