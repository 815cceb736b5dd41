use serde::Serialize;

use crate::tree::{Element, Node};

#[derive(Clone, Copy, Debug, Eq, PartialEq, Serialize)]
pub enum BlockKind {
    Heading1,
    Heading2,
    Heading3,
    Paragraph,
}

impl BlockKind {
    pub fn tag(self) -> &'static str {
        match self {
            BlockKind::Heading1 => "h1",
            BlockKind::Heading2 => "h2",
            BlockKind::Heading3 => "h3",
            BlockKind::Paragraph => "p",
        }
    }
}

/// One paragraph-level unit of a legacy plain-text post.
#[derive(Clone, Debug, Eq, PartialEq, Serialize)]
pub struct Block {
    pub kind: BlockKind,
    pub text: String,
}

impl Block {
    pub fn new(kind: BlockKind, text: impl Into<String>) -> Self {
        Self {
            kind,
            text: text.into(),
        }
    }

    /// Native element for this block; the text is never interpreted as markup.
    pub fn to_node(&self) -> Node {
        Node::Element(Element::new(self.kind.tag()).with_child(Node::text(self.text.clone())))
    }
}

/// Lazily splits legacy content into blocks on blank lines.
pub fn legacy_blocks(raw: &str) -> LegacyBlocks<'_> {
    LegacyBlocks { rest: raw }
}

pub struct LegacyBlocks<'a> {
    rest: &'a str,
}

impl Iterator for LegacyBlocks<'_> {
    type Item = Block;

    fn next(&mut self) -> Option<Block> {
        while !self.rest.is_empty() {
            let (segment, rest) = split_paragraph(self.rest);
            self.rest = rest;
            if let Some(block) = parse_segment(segment) {
                return Some(block);
            }
        }
        None
    }
}

/// Splits off everything up to the next blank line (a line holding only
/// whitespace).
fn split_paragraph(text: &str) -> (&str, &str) {
    let mut offset = 0;
    for line in text.split_inclusive('\n') {
        let line_end = offset + line.len();
        if offset > 0 && line.trim().is_empty() {
            return (&text[..offset], &text[line_end..]);
        }
        offset = line_end;
    }
    (text, "")
}

fn parse_segment(segment: &str) -> Option<Block> {
    let trimmed = segment.trim();
    if trimmed.is_empty() {
        return None;
    }
    let block = if let Some(text) = trimmed.strip_prefix("### ") {
        Block::new(BlockKind::Heading3, text.trim())
    } else if let Some(text) = trimmed.strip_prefix("## ") {
        Block::new(BlockKind::Heading2, text.trim())
    } else if let Some(text) = trimmed.strip_prefix("# ") {
        Block::new(BlockKind::Heading1, text.trim())
    } else {
        Block::new(BlockKind::Paragraph, trimmed.replace("\r\n", "\n"))
    };
    Some(block)
}
