//! Classification of raw message content.
//!
//! User messages are literal text and are never parsed. Every other role
//! carries a JSON payload of the form:
//!
//! ```json
//! { "body": { "response2": "<markdown>", "products": [ { "metadata": { } } ] } }
//! ```
//!
//! Unknown fields are ignored at every level. `products` may be absent or
//! `null`; any other non-array value is a malformed payload.

use serde_json::Value;

use crate::error::{ContentError, Result};
use crate::message::Message;
use crate::product::ProductEnvelope;

/// A decoded assistant payload.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct StructuredPayload {
    /// Markdown document from `body.response2`.
    pub markdown_body: String,
    /// Raw product records from `body.products`, in order.
    pub products: Vec<ProductEnvelope>,
}

/// Result of classifying a message.
#[derive(Debug, Clone, PartialEq)]
pub enum ParsedContent {
    /// Literal user text.
    PlainText(String),
    /// Decoded assistant payload.
    Structured(StructuredPayload),
}

impl ParsedContent {
    /// Markdown text to hand to the renderer.
    #[must_use]
    pub fn markdown(&self) -> &str {
        match self {
            Self::PlainText(text) => text,
            Self::Structured(payload) => &payload.markdown_body,
        }
    }
}

/// Classify a message and decode its payload when it carries one.
pub fn parse(message: &Message) -> Result<ParsedContent> {
    if !message.role.carries_payload() {
        return Ok(ParsedContent::PlainText(message.content.clone()));
    }
    parse_payload(&message.content).map(ParsedContent::Structured)
}

/// Decode payload text, independent of role.
pub fn parse_payload(content: &str) -> Result<StructuredPayload> {
    let root: Value = serde_json::from_str(content)
        .map_err(|e| ContentError::malformed_payload(format!("invalid JSON: {e}")))?;

    let body = root
        .get("body")
        .filter(|b| b.is_object())
        .ok_or_else(|| ContentError::malformed_payload("missing `body` object"))?;

    let markdown_body = body
        .get("response2")
        .and_then(Value::as_str)
        .ok_or_else(|| ContentError::malformed_payload("missing string `body.response2`"))?
        .to_string();

    let products = match body.get("products") {
        None | Some(Value::Null) => Vec::new(),
        Some(Value::Array(items)) => items.iter().map(ProductEnvelope::from_value).collect(),
        Some(_) => {
            return Err(ContentError::malformed_payload(
                "`body.products` is not an array",
            ));
        }
    };

    Ok(StructuredPayload {
        markdown_body,
        products,
    })
}
