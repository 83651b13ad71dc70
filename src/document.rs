//! In-memory document model produced by segmentation.
//!
//! ```text
//! DocumentTree
//!  └─ Page (number, implicit?)
//!      ├─ Block::Paragraph  { id, text }
//!      └─ Block::Section    { id, heading, paragraphs: [Paragraph] }
//! ```
//!
//! Ids come from one counter shared by sections and paragraphs, so they are
//! unique and strictly increasing in traversal order no matter how deeply a
//! paragraph is nested.

use serde::Serialize;

/// Plain text as returned by the text extractor.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct RawDocument {
    pub text: String,
}

impl RawDocument {
    pub fn new(text: impl Into<String>) -> Self {
        Self { text: text.into() }
    }
}

/// A run of body text.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Paragraph {
    pub id: u32,
    pub text: String,
}

/// A heading plus the body paragraphs that follow it.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Section {
    pub id: u32,
    pub heading: String,
    pub paragraphs: Vec<Paragraph>,
}

/// Top-level content of a page.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "kind", rename_all = "lowercase")]
pub enum Block {
    Paragraph(Paragraph),
    Section(Section),
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Page {
    /// 1-indexed page number.
    pub number: u32,
    /// An implicit page groups content without being rendered as `<page>`.
    pub implicit: bool,
    pub blocks: Vec<Block>,
}

#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize)]
pub struct DocumentTree {
    pub pages: Vec<Page>,
}

impl DocumentTree {
    pub fn page_count(&self) -> usize {
        self.pages.len()
    }

    /// Every id in traversal order: sections before their paragraphs,
    /// pages in order.
    pub fn ids(&self) -> Vec<u32> {
        let mut ids = Vec::new();
        for page in &self.pages {
            for block in &page.blocks {
                match block {
                    Block::Paragraph(p) => ids.push(p.id),
                    Block::Section(s) => {
                        ids.push(s.id);
                        ids.extend(s.paragraphs.iter().map(|p| p.id));
                    }
                }
            }
        }
        ids
    }

    /// All paragraphs in traversal order, including those nested in sections.
    pub fn paragraphs(&self) -> impl Iterator<Item = &Paragraph> {
        self.pages
            .iter()
            .flat_map(|page| page.blocks.iter())
            .flat_map(|block| match block {
                Block::Paragraph(p) => std::slice::from_ref(p).iter(),
                Block::Section(s) => s.paragraphs.iter(),
            })
    }

    pub fn sections(&self) -> impl Iterator<Item = &Section> {
        self.pages
            .iter()
            .flat_map(|page| page.blocks.iter())
            .filter_map(|block| match block {
                Block::Section(s) => Some(s),
                Block::Paragraph(_) => None,
            })
    }
}
