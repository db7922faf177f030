//! Injectable observability hook for the decoding pipeline.
//!
//! The pipeline never writes message content to a global sink. Data-quality
//! conditions and decode outcomes are reported as [`ContentEvent`]s to a
//! [`ContentObserver`] supplied by the host. The default is [`NoopObserver`],
//! which discards everything; [`TracingObserver`] forwards events to `tracing`.

use tracing::Level;

/// Something the pipeline noticed while decoding a message.
///
/// Events carry identifiers, counts and reasons only, never message content.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ContentEvent {
    /// A user message was passed through as literal text.
    PlainText {
        /// Message identity.
        message_id: String,
    },
    /// A structured payload was decoded.
    PayloadDecoded {
        /// Message identity.
        message_id: String,
        /// Length of the markdown body in bytes.
        body_len: usize,
        /// Number of product cards produced.
        product_count: usize,
    },
    /// Payload decoding failed.
    MalformedPayload {
        /// Message identity.
        message_id: String,
        /// Why decoding failed.
        reason: String,
    },
    /// A product image reference looked like JSON but could not be decoded.
    MalformedImageRef {
        /// Position of the product in the payload.
        product_index: usize,
        /// Why decoding failed.
        reason: String,
    },
    /// A product image reference was used as a direct URL but does not parse as one.
    UnverifiedImageRef {
        /// Position of the product in the payload.
        product_index: usize,
    },
    /// A fallback policy replaced a failed decode.
    FallbackApplied {
        /// Message identity.
        message_id: String,
        /// Name of the applied policy.
        policy: &'static str,
    },
}

impl ContentEvent {
    /// Stable event name.
    #[must_use]
    pub fn name(&self) -> &'static str {
        match self {
            Self::PlainText { .. } => "content.plain_text",
            Self::PayloadDecoded { .. } => "content.payload_decoded",
            Self::MalformedPayload { .. } => "content.malformed_payload",
            Self::MalformedImageRef { .. } => "content.malformed_image_ref",
            Self::UnverifiedImageRef { .. } => "content.unverified_image_ref",
            Self::FallbackApplied { .. } => "content.fallback_applied",
        }
    }

    /// Severity the pipeline assigns to this event.
    #[must_use]
    pub fn level(&self) -> Level {
        match self {
            Self::MalformedPayload { .. }
            | Self::MalformedImageRef { .. }
            | Self::UnverifiedImageRef { .. } => Level::WARN,
            Self::FallbackApplied { .. } => Level::INFO,
            Self::PlainText { .. } | Self::PayloadDecoded { .. } => Level::DEBUG,
        }
    }
}

/// Receiver for pipeline events.
pub trait ContentObserver: Send + Sync + std::fmt::Debug {
    /// Called once per event, in the order events occur.
    fn observe(&self, level: Level, event: &ContentEvent);
}

/// Observer that discards every event.
#[derive(Debug, Clone, Copy, Default)]
pub struct NoopObserver;

impl ContentObserver for NoopObserver {
    fn observe(&self, _level: Level, _event: &ContentEvent) {}
}

/// Observer that forwards events to `tracing`.
#[derive(Debug, Clone, Copy, Default)]
pub struct TracingObserver;

impl ContentObserver for TracingObserver {
    fn observe(&self, level: Level, event: &ContentEvent) {
        let name = event.name();
        match level {
            Level::ERROR => tracing::error!(event = name, detail = ?event, "content event"),
            Level::WARN => tracing::warn!(event = name, detail = ?event, "content event"),
            Level::INFO => tracing::info!(event = name, detail = ?event, "content event"),
            Level::DEBUG => tracing::debug!(event = name, detail = ?event, "content event"),
            _ => tracing::trace!(event = name, detail = ?event, "content event"),
        }
    }
}

/// Report an event at its default level.
pub(crate) fn emit(observer: &dyn ContentObserver, event: &ContentEvent) {
    observer.observe(event.level(), event);
}
