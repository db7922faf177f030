//! Markdown traversal seam.
//!
//! Rendering markdown is the host's job. The pipeline only needs a traversal
//! engine that understands a list of syntax extensions and reports every
//! code-like node, in document order, to a callback. [`PulldownTraversal`]
//! provides that on top of `pulldown-cmark`.

use std::str::FromStr;

use pulldown_cmark::{CodeBlockKind, Event, Options, Parser, Tag, TagEnd};
use serde::{Deserialize, Serialize};

use crate::code::{self, CodeNode, KeyedSegment, SegmentKey};
use crate::error::ContentError;

/// Markdown dialect extensions.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SyntaxExtension {
    /// GitHub-flavored tables, strikethrough and task lists.
    Gfm,
    /// Inline and display math.
    Math,
}

impl SyntaxExtension {
    /// Extensions enabled when none are configured.
    pub const DEFAULT: [Self; 2] = [Self::Gfm, Self::Math];

    fn options(self) -> Options {
        match self {
            Self::Gfm => {
                Options::ENABLE_TABLES | Options::ENABLE_STRIKETHROUGH | Options::ENABLE_TASKLISTS
            }
            Self::Math => Options::ENABLE_MATH,
        }
    }
}

impl FromStr for SyntaxExtension {
    type Err = ContentError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "gfm" => Ok(Self::Gfm),
            "math" => Ok(Self::Math),
            other => Err(ContentError::Config(format!(
                "unknown markdown extension: {other}"
            ))),
        }
    }
}

/// A traversal engine that reports code nodes in document order.
pub trait MarkdownTraversal: Send + Sync + std::fmt::Debug {
    /// Walk `body`, calling `on_code` once per code node.
    fn traverse(
        &self,
        body: &str,
        extensions: &[SyntaxExtension],
        on_code: &mut dyn FnMut(CodeNode),
    );
}

/// `pulldown-cmark` backed traversal.
#[derive(Debug, Clone, Copy, Default)]
pub struct PulldownTraversal;

impl MarkdownTraversal for PulldownTraversal {
    fn traverse(
        &self,
        body: &str,
        extensions: &[SyntaxExtension],
        on_code: &mut dyn FnMut(CodeNode),
    ) {
        let options = extensions
            .iter()
            .fold(Options::empty(), |acc, ext| acc | ext.options());

        let mut open_block: Option<CodeNode> = None;

        for event in Parser::new_ext(body, options) {
            match event {
                Event::Start(Tag::CodeBlock(kind)) => {
                    let class_name = match kind {
                        CodeBlockKind::Fenced(info) => info
                            .split_whitespace()
                            .next()
                            .map(|lang| format!("language-{lang}")),
                        CodeBlockKind::Indented => None,
                    };
                    open_block = Some(CodeNode {
                        inline: false,
                        class_name,
                        children: Vec::new(),
                    });
                }
                Event::Text(text) => {
                    if let Some(node) = open_block.as_mut() {
                        node.children.push(text.into_string());
                    }
                }
                Event::End(TagEnd::CodeBlock) => {
                    if let Some(node) = open_block.take() {
                        on_code(node);
                    }
                }
                Event::Code(text) => on_code(CodeNode::inline(text.into_string())),
                _ => {}
            }
        }
    }
}

/// Classify every code node in `body`, keyed by message identity and position.
pub fn code_segments(
    traversal: &dyn MarkdownTraversal,
    body: &str,
    extensions: &[SyntaxExtension],
    message_id: &str,
) -> Vec<KeyedSegment> {
    let mut segments = Vec::new();
    traversal.traverse(body, extensions, &mut |node: CodeNode| {
        let key = SegmentKey {
            message_id: message_id.to_string(),
            index: segments.len(),
        };
        segments.push(KeyedSegment {
            key,
            segment: code::classify(&node),
        });
    });
    segments
}
