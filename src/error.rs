//! Error types for message content decoding.

use thiserror::Error;

/// Failures surfaced by the decoding pipeline.
///
/// Absent metadata fields are not represented here: they simply become
/// `None` on the normalized [`ProductCard`](crate::product::ProductCard).
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum ContentError {
    /// Assistant content is not valid JSON or lacks the `body.response2` shape.
    #[error("Malformed payload: {reason}")]
    MalformedPayload {
        /// What was wrong with the payload.
        reason: String,
    },

    /// A `product_image` value looks JSON-encoded but cannot be decoded.
    #[error("Malformed image reference: {reason}")]
    MalformedImageRef {
        /// The raw `product_image` text as received.
        raw: String,
        /// Why it could not be decoded.
        reason: String,
    },

    /// Configuration could not be loaded.
    #[error("Configuration error: {0}")]
    Config(String),
}

impl ContentError {
    pub(crate) fn malformed_payload(reason: impl Into<String>) -> Self {
        Self::MalformedPayload {
            reason: reason.into(),
        }
    }

    /// Short machine-readable code for this error kind.
    #[must_use]
    pub fn code(&self) -> &'static str {
        match self {
            Self::MalformedPayload { .. } => "malformed_payload",
            Self::MalformedImageRef { .. } => "malformed_image_ref",
            Self::Config(_) => "config",
        }
    }
}

impl From<config::ConfigError> for ContentError {
    fn from(err: config::ConfigError) -> Self {
        Self::Config(err.to_string())
    }
}

/// Result type alias for content decoding.
pub type Result<T> = std::result::Result<T, ContentError>;
