//! Segmentation: split extracted text into a paragraph/section tree.
//!
//! Paragraphs are separated by one or more blank lines (`\n\s*\n`). Each
//! chunk is trimmed and empty chunks are dropped.
//!
//! In [`StructureLevel::Advanced`] mode a chunk is treated as a heading when
//! it is shorter than [`HEADING_MAX_CHARS`] characters, starts with an
//! ASCII uppercase letter or digit and does not end in sentence punctuation
//! (`.`, `!`, `?`). The heuristic still misfires on short unpunctuated lines
//! and on all-caps body text.
//!
//! Ids are the 1-based position of the chunk in the raw split, headings
//! included. Dropped empty chunks keep their position, so leading blank
//! lines shift every id: `"\n\nA\n\nb"` yields `p2` and `p3`.
//! `"1. Introduction\n\nThis is text."` becomes section `s1` holding
//! paragraph `p2`.
//!
//! Page boundaries are not detected: all content lands on one page.

use crate::document::{Block, DocumentTree, Page, Paragraph, RawDocument, Section};
use crate::output::StructureLevel;
use once_cell::sync::Lazy;
use regex::Regex;

/// Headings are strictly shorter than this many characters.
pub const HEADING_MAX_CHARS: usize = 100;

static RE_BLANK_LINES: Lazy<Regex> = Lazy::new(|| Regex::new(r"\n\s*\n").unwrap());

/// Split `text` into trimmed, non-empty paragraph strings, each paired
/// with its 1-based position in the raw split.
pub fn split_paragraphs(text: &str) -> Vec<(u32, &str)> {
    RE_BLANK_LINES
        .split(text)
        .zip(1u32..)
        .map(|(chunk, id)| (id, chunk.trim()))
        .filter(|(_, p)| !p.is_empty())
        .collect()
}

/// Heading heuristic applied in advanced mode. Expects trimmed input.
pub fn is_heading(paragraph: &str) -> bool {
    paragraph.chars().count() < HEADING_MAX_CHARS
        && paragraph
            .chars()
            .next()
            .is_some_and(|c| c.is_ascii_uppercase() || c.is_ascii_digit())
        && !paragraph.ends_with(['.', '!', '?'])
}

/// Build the document tree for `raw` at the requested structure level.
pub fn segment(raw: &RawDocument, level: StructureLevel) -> DocumentTree {
    let paragraphs = split_paragraphs(&raw.text);
    let page = match level {
        StructureLevel::Basic => segment_basic(&paragraphs),
        StructureLevel::Advanced => segment_advanced(&paragraphs),
    };
    DocumentTree { pages: vec![page] }
}

fn segment_basic(paragraphs: &[(u32, &str)]) -> Page {
    let blocks = paragraphs
        .iter()
        .map(|&(id, text)| {
            Block::Paragraph(Paragraph {
                id,
                text: text.to_string(),
            })
        })
        .collect();

    Page {
        number: 1,
        implicit: true,
        blocks,
    }
}

fn segment_advanced(paragraphs: &[(u32, &str)]) -> Page {
    let mut blocks: Vec<Block> = Vec::new();
    // Index into `blocks` of the section that body text attaches to.
    let mut current_section: Option<usize> = None;

    for &(id, text) in paragraphs {
        let text = text.to_string();
        if is_heading(&text) {
            blocks.push(Block::Section(Section {
                id,
                heading: text,
                paragraphs: Vec::new(),
            }));
            current_section = Some(blocks.len() - 1);
            continue;
        }

        let paragraph = Paragraph { id, text };
        match current_section.and_then(|i| blocks.get_mut(i)) {
            Some(Block::Section(section)) => section.paragraphs.push(paragraph),
            _ => blocks.push(Block::Paragraph(paragraph)),
        }
    }

    Page {
        number: 1,
        implicit: false,
        blocks,
    }
}
