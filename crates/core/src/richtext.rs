//! Structured rich-text descriptions.
//!
//! Documents are stored as a tree with a single `root` whose children are
//! block nodes, each block holding inline runs. Only the node kinds listed
//! below are recognised; anything else deserializes to an `Unsupported`
//! variant so a new editor feature never fails a read.

use serde::{Deserialize, Serialize};
use serde_json::Value;

/// A complete rich-text document.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct RichText {
    #[serde(default)]
    pub root: RootNode,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct RootNode {
    #[serde(default)]
    pub children: Vec<BlockNode>,
}

/// Top-level block of a document.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "lowercase")]
pub enum BlockNode {
    Paragraph {
        #[serde(default)]
        children: Vec<InlineNode>,
    },
    Heading {
        #[serde(default, skip_serializing_if = "Option::is_none")]
        tag: Option<String>,
        #[serde(default)]
        children: Vec<InlineNode>,
    },
    List {
        #[serde(default)]
        children: Vec<Value>,
    },
    Quote {
        #[serde(default)]
        children: Vec<InlineNode>,
    },
    Upload {
        #[serde(default, skip_serializing_if = "Option::is_none")]
        value: Option<Value>,
    },
    Horizontalrule,
    #[serde(other)]
    Unsupported,
}

/// Inline run inside a block.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "lowercase")]
pub enum InlineNode {
    Text {
        #[serde(default)]
        text: String,
    },
    Linebreak,
    Tab,
    Link {
        #[serde(default)]
        children: Vec<InlineNode>,
    },
    #[serde(other)]
    Unsupported,
}

impl RichText {
    /// Builds a document with one paragraph per entry.
    pub fn from_paragraphs<I, S>(paragraphs: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        let children = paragraphs
            .into_iter()
            .map(|text| BlockNode::Paragraph {
                children: vec![InlineNode::Text { text: text.into() }],
            })
            .collect();
        Self {
            root: RootNode { children },
        }
    }

    /// Builds a document from plain text, splitting paragraphs on blank lines.
    pub fn from_plain_text(text: &str) -> Self {
        Self::from_paragraphs(
            text.split("\n\n")
                .map(str::trim)
                .filter(|chunk| !chunk.is_empty()),
        )
    }

    /// Returns the text of every top-level paragraph, in document order.
    ///
    /// Each paragraph is the concatenation of its text runs. Blocks other than
    /// paragraphs are dropped.
    pub fn paragraphs(&self) -> Vec<String> {
        self.root
            .children
            .iter()
            .filter_map(|block| match block {
                BlockNode::Paragraph { children } => Some(concat_text_runs(children)),
                BlockNode::Heading { .. }
                | BlockNode::List { .. }
                | BlockNode::Quote { .. }
                | BlockNode::Upload { .. }
                | BlockNode::Horizontalrule
                | BlockNode::Unsupported => None,
            })
            .collect()
    }
}

fn concat_text_runs(children: &[InlineNode]) -> String {
    let mut out = String::new();
    for child in children {
        match child {
            InlineNode::Text { text } => out.push_str(text),
            InlineNode::Linebreak
            | InlineNode::Tab
            | InlineNode::Link { .. }
            | InlineNode::Unsupported => {}
        }
    }
    out
}
