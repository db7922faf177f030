//! Classification of code nodes found in a markdown body.
//!
//! Streaming output appends a cursor glyph (`▍`) while tokens are still
//! arriving. A code node whose entire content is that glyph is an animation
//! marker, not code. A backtick-quoted glyph inside real content is unquoted
//! so it is not escaped twice when redisplayed.

use std::fmt;

use serde::{Deserialize, Serialize};

/// Cursor glyph inserted by the token stream.
pub const STREAM_CURSOR: &str = "▍";

const QUOTED_CURSOR: &str = "`▍`";
const LANGUAGE_CLASS_PREFIX: &str = "language-";

/// A code-like node as reported by the markdown renderer.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct CodeNode {
    /// Whether the parser marked this node as inline code.
    pub inline: bool,
    /// Class string, e.g. `language-rust`.
    pub class_name: Option<String>,
    /// Text runs in document order.
    pub children: Vec<String>,
}

impl CodeNode {
    /// An inline code span.
    pub fn inline(text: impl Into<String>) -> Self {
        Self {
            inline: true,
            class_name: None,
            children: vec![text.into()],
        }
    }

    /// A code block with an optional class string.
    pub fn block(class_name: Option<&str>, children: Vec<String>) -> Self {
        Self {
            inline: false,
            class_name: class_name.map(str::to_string),
            children,
        }
    }
}

/// A classified unit of code content.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum CodeSegment {
    /// Inline code, rendered without block chrome.
    InlineCode { content: String },
    /// Pending-stream marker.
    StreamCursor,
    /// A code block. `language` is empty when no tag was given.
    CodeBlock { language: String, content: String },
}

/// Stable identity of a segment: owning message plus document-order index.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SegmentKey {
    pub message_id: String,
    pub index: usize,
}

impl fmt::Display for SegmentKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}:code:{}", self.message_id, self.index)
    }
}

/// A classified segment together with its stable key.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct KeyedSegment {
    pub key: SegmentKey,
    #[serde(flatten)]
    pub segment: CodeSegment,
}

/// Classify one code node.
pub fn classify(node: &CodeNode) -> CodeSegment {
    if !node.children.is_empty() && node.children.concat() == STREAM_CURSOR {
        return CodeSegment::StreamCursor;
    }

    let mut runs = node.children.iter();
    let mut content = runs
        .next()
        .map(|first| first.replacen(QUOTED_CURSOR, STREAM_CURSOR, 1))
        .unwrap_or_default();
    for run in runs {
        content.push_str(run);
    }

    if node.inline {
        return CodeSegment::InlineCode { content };
    }

    if content.ends_with('\n') {
        content.pop();
    }

    CodeSegment::CodeBlock {
        language: language_tag(node.class_name.as_deref().unwrap_or_default()).to_string(),
        content,
    }
}

/// Extract `<name>` from the first `language-<name>` in a class string.
///
/// `<name>` is a non-empty run of ASCII letters, digits and underscores.
pub fn language_tag(class_name: &str) -> &str {
    for (start, _) in class_name.match_indices(LANGUAGE_CLASS_PREFIX) {
        let rest = &class_name[start + LANGUAGE_CLASS_PREFIX.len()..];
        let end = rest
            .find(|c: char| !(c.is_ascii_alphanumeric() || c == '_'))
            .unwrap_or(rest.len());
        if end > 0 {
            return &rest[..end];
        }
    }
    ""
}
