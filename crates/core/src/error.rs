//! Error types for the lumina-core library.
//!
//! This module provides granular error variants for different failure modes,
//! enabling precise error handling and user-friendly error messages.

use thiserror::Error;

/// Message used when a response carries no inline image part.
pub const NO_IMAGE_DATA: &str = "No image data found in the response.";

/// Message used when a failed call gives nothing better to report.
pub const GENERIC_FAILURE: &str = "Failed to generate image.";

/// Errors that can occur within the lumina-core library.
///
/// Each variant represents a specific failure mode with contextual information
/// to help diagnose and handle errors appropriately.
#[derive(Error, Debug)]
pub enum AppError {
    /// Configuration-related errors (missing keys, invalid values).
    #[error("Configuration error: {0}")]
    Config(String),

    /// A required environment variable was not found.
    #[error("Missing required environment variable: {0}")]
    MissingEnvVar(String),

    /// User input rejected before any request was made.
    #[error("{0}")]
    Validation(String),

    /// Uploaded reference image exceeds the size limit.
    #[error("Image size too large. Please use an image under {}MB.", megabytes(.limit))]
    ImageTooLarge {
        /// Size of the rejected file in bytes.
        size: u64,
        /// Maximum accepted size in bytes.
        limit: u64,
    },

    /// Uploaded file is not an image format we recognize.
    #[error("Unsupported image: {0}")]
    UnsupportedImage(String),

    /// A string that should have been a base64 data URI was not.
    #[error("Invalid data URI: {0}")]
    InvalidDataUri(String),

    /// The API answered, but without any inline image.
    #[error("{}", NO_IMAGE_DATA)]
    NoImageData,

    /// General Gemini API error.
    #[error("{0}")]
    GeminiApi(String),

    /// Rate limited or out of quota.
    #[error("{0}")]
    RateLimited(String),

    /// Transport-level failure talking to the API.
    #[error("{0}")]
    Http(#[from] reqwest::Error),

    /// Standard I/O error.
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// JSON serialization/deserialization error.
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    /// An unclassified error.
    #[error("Unknown error: {0}")]
    Unknown(String),
}

/// Coarse classification of failures, as presented to the user.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorKind {
    /// Caught before any request; shown inline, history untouched.
    Validation,
    /// Missing or unusable credential; leads to key selection.
    Credential,
    /// The generation call itself failed.
    Api,
}

impl AppError {
    /// Creates a configuration error with the given message.
    pub fn config(msg: impl Into<String>) -> Self {
        Self::Config(msg.into())
    }

    /// Creates a validation error with the given message.
    pub fn validation(msg: impl Into<String>) -> Self {
        Self::Validation(msg.into())
    }

    /// Creates a Gemini API error with the given message.
    pub fn gemini(msg: impl Into<String>) -> Self {
        Self::GeminiApi(msg.into())
    }

    /// Creates an invalid data URI error with the given message.
    pub fn data_uri(msg: impl Into<String>) -> Self {
        Self::InvalidDataUri(msg.into())
    }

    /// Returns which part of the error taxonomy this error belongs to.
    pub fn kind(&self) -> ErrorKind {
        match self {
            Self::Validation(_)
            | Self::ImageTooLarge { .. }
            | Self::UnsupportedImage(_)
            | Self::InvalidDataUri(_) => ErrorKind::Validation,
            Self::Config(_) | Self::MissingEnvVar(_) => ErrorKind::Credential,
            _ => ErrorKind::Api,
        }
    }
}

fn megabytes(bytes: &u64) -> u64 {
    bytes / (1024 * 1024)
}

/// A convenient alias for Result with [`AppError`].
pub type Result<T> = std::result::Result<T, AppError>;
