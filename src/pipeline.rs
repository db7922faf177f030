//! Per-message decoding pipeline.
//!
//! ```text
//! Start ─┬─ user ──────────────────────────────► PlainText ─► Ready
//!        └─ other ─► StructuredPayload ─► ExtractProducts ──► Ready
//!                          │
//!                          └─ malformed ─► Failed
//! ```
//!
//! Every run is a pure function of the message: the same content always
//! yields the same body, products and segment keys. [`MemoizedPipeline`]
//! relies on that to reuse results across re-renders.
//!
//! # Example
//!
//! ```rust
//! use chat_message_content::message::Message;
//! use chat_message_content::pipeline::MessageContentPipeline;
//!
//! let pipeline = MessageContentPipeline::new();
//! let msg = Message::assistant(r#"{"body":{"response2":"Hi `there`"}}"#);
//! let decoded = pipeline.decode(&msg).unwrap();
//! assert_eq!(decoded.markdown_body, "Hi `there`");
//! assert_eq!(decoded.code_segments.len(), 1);
//! ```

use std::collections::HashMap;
use std::sync::{Arc, PoisonError, RwLock};

use serde::{Deserialize, Serialize};

use crate::code::KeyedSegment;
use crate::error::{ContentError, Result};
use crate::markdown::{self, MarkdownTraversal, PulldownTraversal, SyntaxExtension};
use crate::message::{Message, MessageRole};
use crate::observe::{self, ContentEvent, ContentObserver, NoopObserver};
use crate::payload::{self, ParsedContent};
use crate::product::{self, ProductCard};

/// Default capacity of the memoization cache.
pub const DEFAULT_CACHE_CAPACITY: usize = 256;

/// Stages of a single pipeline run.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PipelineState {
    Start,
    PlainText,
    StructuredPayload,
    ExtractProducts,
    Ready,
    Failed,
}

/// What the caller wants done when a payload cannot be decoded.
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum FallbackPolicy {
    /// Return the error to the caller.
    Surface,
    /// Show the raw content as plain text.
    #[default]
    RawContent,
    /// Show a fixed placeholder.
    Placeholder(String),
}

impl FallbackPolicy {
    /// Policy name, as used in configuration.
    #[must_use]
    pub fn name(&self) -> &'static str {
        match self {
            Self::Surface => "surface",
            Self::RawContent => "raw_content",
            Self::Placeholder(_) => "placeholder",
        }
    }
}

/// How the decoded body was obtained.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ContentKind {
    /// Literal user text.
    PlainText,
    /// Decoded assistant payload.
    Structured,
    /// Substituted by a [`FallbackPolicy`] after a decode failure.
    Fallback,
}

/// Output of a successful run, handed to the presentation layer.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DecodedMessage {
    pub message_id: String,
    pub role: MessageRole,
    pub kind: ContentKind,
    /// Markdown text to render.
    pub markdown_body: String,
    /// Normalized products, in payload order.
    pub products: Vec<ProductCard>,
    /// Code segments of `markdown_body`, in document order.
    pub code_segments: Vec<KeyedSegment>,
}

/// Terminal result of a run.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PipelineOutcome {
    Ready(DecodedMessage),
    Failed {
        message_id: String,
        error: ContentError,
    },
}

impl PipelineOutcome {
    /// Terminal state this outcome corresponds to.
    #[must_use]
    pub fn state(&self) -> PipelineState {
        match self {
            Self::Ready(_) => PipelineState::Ready,
            Self::Failed { .. } => PipelineState::Failed,
        }
    }

    pub fn into_result(self) -> Result<DecodedMessage> {
        match self {
            Self::Ready(decoded) => Ok(decoded),
            Self::Failed { error, .. } => Err(error),
        }
    }
}

/// Orchestrates payload parsing, product extraction and code classification.
#[derive(Debug, Clone)]
pub struct MessageContentPipeline {
    extensions: Vec<SyntaxExtension>,
    fallback: FallbackPolicy,
    observer: Arc<dyn ContentObserver>,
    traversal: Arc<dyn MarkdownTraversal>,
}

impl Default for MessageContentPipeline {
    fn default() -> Self {
        Self::new()
    }
}

impl MessageContentPipeline {
    /// Pipeline with default extensions, raw-content fallback and no observer output.
    #[must_use]
    pub fn new() -> Self {
        Self {
            extensions: SyntaxExtension::DEFAULT.to_vec(),
            fallback: FallbackPolicy::default(),
            observer: Arc::new(NoopObserver),
            traversal: Arc::new(PulldownTraversal),
        }
    }

    #[must_use]
    pub fn with_extensions(mut self, extensions: Vec<SyntaxExtension>) -> Self {
        self.extensions = extensions;
        self
    }

    #[must_use]
    pub fn with_fallback(mut self, fallback: FallbackPolicy) -> Self {
        self.fallback = fallback;
        self
    }

    #[must_use]
    pub fn with_observer(mut self, observer: Arc<dyn ContentObserver>) -> Self {
        self.observer = observer;
        self
    }

    #[must_use]
    pub fn with_traversal(mut self, traversal: Arc<dyn MarkdownTraversal>) -> Self {
        self.traversal = traversal;
        self
    }

    #[must_use]
    pub fn extensions(&self) -> &[SyntaxExtension] {
        &self.extensions
    }

    #[must_use]
    pub fn fallback(&self) -> &FallbackPolicy {
        &self.fallback
    }

    /// Run the pipeline on one message.
    pub fn run(&self, message: &Message) -> PipelineOutcome {
        tracing::trace!(
            message_id = %message.id,
            role = message.role.as_str(),
            content_length = message.content.len(),
            state = ?PipelineState::Start,
            "Decoding message"
        );

        let parsed = match payload::parse(message) {
            Ok(parsed) => parsed,
            Err(error) => {
                tracing::debug!(
                    message_id = %message.id,
                    error_code = error.code(),
                    state = ?PipelineState::Failed,
                    "Payload rejected"
                );
                observe::emit(
                    self.observer.as_ref(),
                    &ContentEvent::MalformedPayload {
                        message_id: message.id.clone(),
                        reason: error.to_string(),
                    },
                );
                return PipelineOutcome::Failed {
                    message_id: message.id.clone(),
                    error,
                };
            }
        };

        tracing::trace!(
            message_id = %message.id,
            state = ?branch_state(&parsed),
            "Payload classified"
        );

        let decoded = match parsed {
            ParsedContent::PlainText(text) => {
                observe::emit(
                    self.observer.as_ref(),
                    &ContentEvent::PlainText {
                        message_id: message.id.clone(),
                    },
                );
                self.assemble(message, ContentKind::PlainText, text, Vec::new())
            }
            ParsedContent::Structured(structured) => {
                tracing::trace!(
                    message_id = %message.id,
                    product_count = structured.products.len(),
                    state = ?PipelineState::ExtractProducts,
                    "Extracting products"
                );
                let products = product::extract(&structured.products, self.observer.as_ref());
                observe::emit(
                    self.observer.as_ref(),
                    &ContentEvent::PayloadDecoded {
                        message_id: message.id.clone(),
                        body_len: structured.markdown_body.len(),
                        product_count: products.len(),
                    },
                );
                self.assemble(
                    message,
                    ContentKind::Structured,
                    structured.markdown_body,
                    products,
                )
            }
        };

        tracing::debug!(
            message_id = %decoded.message_id,
            kind = ?decoded.kind,
            product_count = decoded.products.len(),
            segment_count = decoded.code_segments.len(),
            state = ?PipelineState::Ready,
            "Message decoded"
        );
        PipelineOutcome::Ready(decoded)
    }

    /// Run the pipeline, returning decode failures as errors.
    pub fn decode(&self, message: &Message) -> Result<DecodedMessage> {
        self.run(message).into_result()
    }

    /// Run the pipeline and apply the configured [`FallbackPolicy`] on failure.
    pub fn decode_or_fallback(&self, message: &Message) -> Result<DecodedMessage> {
        let error = match self.run(message) {
            PipelineOutcome::Ready(decoded) => return Ok(decoded),
            PipelineOutcome::Failed { error, .. } => error,
        };

        let body = match &self.fallback {
            FallbackPolicy::Surface => return Err(error),
            FallbackPolicy::RawContent => message.content.clone(),
            FallbackPolicy::Placeholder(text) => text.clone(),
        };

        observe::emit(
            self.observer.as_ref(),
            &ContentEvent::FallbackApplied {
                message_id: message.id.clone(),
                policy: self.fallback.name(),
            },
        );
        Ok(self.assemble(message, ContentKind::Fallback, body, Vec::new()))
    }

    fn assemble(
        &self,
        message: &Message,
        kind: ContentKind,
        markdown_body: String,
        products: Vec<ProductCard>,
    ) -> DecodedMessage {
        let code_segments = markdown::code_segments(
            self.traversal.as_ref(),
            &markdown_body,
            &self.extensions,
            &message.id,
        );
        DecodedMessage {
            message_id: message.id.clone(),
            role: message.role,
            kind,
            markdown_body,
            products,
            code_segments,
        }
    }
}

/// State entered right after classification.
fn branch_state(parsed: &ParsedContent) -> PipelineState {
    match parsed {
        ParsedContent::PlainText(_) => PipelineState::PlainText,
        ParsedContent::Structured(_) => PipelineState::StructuredPayload,
    }
}

/// Pipeline wrapper that reuses results for unchanged messages.
///
/// Entries are keyed on message identity and content, so a message that
/// receives new streamed tokens is decoded afresh. Failures are never cached.
/// When the cache reaches capacity it is cleared before the next insert.
#[derive(Debug)]
pub struct MemoizedPipeline {
    pipeline: MessageContentPipeline,
    capacity: usize,
    cache: RwLock<HashMap<(String, String), Arc<DecodedMessage>>>,
}

impl MemoizedPipeline {
    pub fn new(pipeline: MessageContentPipeline, capacity: usize) -> Self {
        Self {
            pipeline,
            capacity: capacity.max(1),
            cache: RwLock::new(HashMap::new()),
        }
    }

    #[must_use]
    pub fn pipeline(&self) -> &MessageContentPipeline {
        &self.pipeline
    }

    /// Decode with fallback, reusing a cached result when available.
    pub fn decode(&self, message: &Message) -> Result<Arc<DecodedMessage>> {
        let key = (message.id.clone(), message.content.clone());

        if let Some(hit) = self
            .cache
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .get(&key)
        {
            tracing::trace!(message_id = %message.id, "Decode cache hit");
            return Ok(Arc::clone(hit));
        }

        let decoded = Arc::new(self.pipeline.decode_or_fallback(message)?);
        if decoded.kind == ContentKind::Fallback {
            return Ok(decoded);
        }

        let mut cache = self.cache.write().unwrap_or_else(PoisonError::into_inner);
        if cache.len() >= self.capacity {
            tracing::debug!(entries = cache.len(), "Decode cache full, clearing");
            cache.clear();
        }
        cache.insert(key, Arc::clone(&decoded));
        Ok(decoded)
    }

    /// Number of cached entries.
    pub fn len(&self) -> usize {
        self.cache.read().unwrap_or_else(PoisonError::into_inner).len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Drop every cached entry.
    pub fn clear(&self) {
        self.cache
            .write()
            .unwrap_or_else(PoisonError::into_inner)
            .clear();
    }
}
