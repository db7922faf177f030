//! Chat message content decoding.
//!
//! Turns one raw chat message into what a presentation layer needs: a
//! markdown body, the classified code segments inside it, and a normalized
//! list of product cards.
//!
//! # Architecture
//!
//! - **Payload parsing**: user text passes through untouched; every other
//!   role carries a JSON payload with a markdown body and optional products
//! - **Product extraction**: schema-less catalog metadata normalized into cards
//! - **Code classification**: inline code, code blocks and streaming cursors
//! - **Pipeline**: orchestration, fallback policy and memoized reuse
//!
//! # Modules
//!
//! - [`message`]: Transcript message model
//! - [`payload`]: Raw content classification
//! - [`product`]: Product metadata and normalized cards
//! - [`image`]: Product image reference resolution
//! - [`code`]: Code node classification
//! - [`markdown`]: Markdown traversal seam
//! - [`observe`]: Injectable observability hook
//! - [`pipeline`]: Per-message orchestration
//!
//! # Example
//!
//! ```rust
//! use chat_message_content::{Message, MessageContentPipeline};
//!
//! let content = r#"{"body":{"response2":"Try these","products":[{"metadata":{"brand_name":"Acme","price":10}}]}}"#;
//! let decoded = MessageContentPipeline::new()
//!     .decode(&Message::assistant(content))
//!     .unwrap();
//! assert_eq!(decoded.markdown_body, "Try these");
//! assert_eq!(decoded.products[0].brand_name.as_deref(), Some("Acme"));
//! ```

// Allow pedantic clippy warnings that don't add value for this codebase
#![allow(clippy::missing_fields_in_debug)]
#![allow(clippy::match_same_arms)]
#![allow(clippy::cargo_common_metadata)]
#![allow(clippy::multiple_crate_versions)]

pub mod code;
pub mod config;
pub mod error;
pub mod image;
pub mod markdown;
pub mod message;
pub mod observe;
pub mod payload;
pub mod pipeline;
pub mod product;
pub mod telemetry;

pub use error::{ContentError, Result};
pub use message::{Message, MessageRole};
pub use pipeline::{DecodedMessage, MemoizedPipeline, MessageContentPipeline, PipelineOutcome};
pub use product::ProductCard;
