//! Error types for the directlink resolver
//!
//! Provides a comprehensive error enum with human-readable messages
//! and Tauri-compatible serialization.

use serde::{Serialize, Serializer};
use thiserror::Error;

/// Error type for all directlink operations
///
/// Implements Display for human-readable messages and Serialize
/// for Tauri command compatibility.
#[derive(Error, Debug)]
pub enum DirectlinkError {
    /// HTTP request failed before a response was received
    #[error("HTTP request failed: {0}")]
    HttpError(#[from] reqwest::Error),

    /// Page fetch answered with a non-success status
    #[error("HTTP {status} for {url}")]
    Transport { status: u16, url: String },

    /// Bot-mitigation page served instead of the real content
    #[error("Challenge page detected ({0})")]
    ChallengePage(String),

    /// License code is missing digits, malformed or too short
    #[error("Invalid license code: {0}")]
    InvalidLicenseCode(String),

    /// Extraction and ranking finished without a usable media URL
    #[error("No media URL found")]
    NoCandidateFound { title: Option<String> },

    /// Invalid URL format
    #[error("Invalid URL: {0}")]
    InvalidUrl(String),

    /// A bounded request ran out of time
    #[error("Request timed out after {0} seconds")]
    Timeout(u64),

    /// Configuration could not be applied
    #[error("Configuration error: {0}")]
    Config(String),
}

impl DirectlinkError {
    /// Title recovered before the failure, if the error carries one
    pub fn title(&self) -> Option<&str> {
        match self {
            DirectlinkError::NoCandidateFound { title } => title.as_deref(),
            _ => None,
        }
    }
}

impl Serialize for DirectlinkError {
    fn serialize<S>(&self, serializer: S) -> std::result::Result<S::Ok, S::Error>
    where
        S: Serializer,
    {
        serializer.serialize_str(&self.to_string())
    }
}

/// Result type alias for directlink operations
pub type Result<T> = std::result::Result<T, DirectlinkError>;
