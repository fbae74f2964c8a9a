//! Unified error type hierarchy for the cross toolchain builder
//!
//! Provides structured error handling with ConfigError, FetchError, BuildError
//! and the AppError umbrella.

use std::io;
use thiserror::Error;

use crate::models::{BuildStep, Component};

/// Configuration and argument validation errors.
#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("Unknown architecture '{0}' (supported: {1})")]
    UnknownArchitecture(String, String),

    #[error("Invalid install mode '{0}': expected 'yes' or 'no'")]
    InvalidInstallMode(String),

    #[error("Invalid core count: {0}")]
    InvalidCores(String),

    #[error("Manifest file not found: {0}")]
    FileNotFound(String),

    #[error("Invalid JSON in manifest: {0}")]
    InvalidJson(#[from] serde_json::Error),

    #[error("Configuration validation failed: {0}")]
    ValidationFailed(String),

    #[error("IO error during config operations: {0}")]
    IoError(#[from] io::Error),
}

/// Source download and integrity errors.
#[derive(Error, Debug)]
pub enum FetchError {
    #[error("Download of {url} failed: {reason}")]
    Http { url: String, reason: String },

    #[error("Download of {url} returned HTTP {status}")]
    Status { url: String, status: u16 },

    #[error("Wrong checksum for {tarball}: expected {expected}, got {actual}")]
    ChecksumMismatch {
        tarball: String,
        expected: String,
        actual: String,
    },

    #[error("IO error during download: {0}")]
    IoError(#[from] io::Error),
}

/// Build pipeline execution errors.
#[derive(Error, Debug)]
pub enum BuildError {
    #[error("Preflight check failed: {0}")]
    PreflightFailed(String),

    #[error("Preparation failed: {0}")]
    PreparationFailed(String),

    #[error("Unpacking {tarball} failed: {reason}")]
    UnpackFailed { tarball: String, reason: String },

    #[error("{component} {step} failed: {reason}")]
    StepFailed {
        component: Component,
        step: BuildStep,
        reason: String,
    },

    #[error("Invalid stage transition: {0}")]
    InvalidTransition(String),
}

/// Global error type for the builder.
///
/// The binary reports `user_message()` and exits non-zero.
#[derive(Error, Debug)]
pub enum AppError {
    #[error(transparent)]
    Config(#[from] ConfigError),

    #[error(transparent)]
    Fetch(#[from] FetchError),

    #[error(transparent)]
    Build(#[from] BuildError),

    #[error("I/O error: {0}")]
    Io(#[from] io::Error),
}

impl AppError {
    /// One-line message for the final report
    pub fn user_message(&self) -> String {
        match self {
            AppError::Config(e) => format!("Configuration error: {}", e),
            AppError::Fetch(e) => format!("Source download failed: {}", e),
            AppError::Build(e) => format!("Build failed: {}", e),
            AppError::Io(e) => format!("File operation failed: {}", e),
        }
    }
}

/// Top-level result type for operations that may fail.
pub type Result<T> = std::result::Result<T, AppError>;
