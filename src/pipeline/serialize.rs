//! Serialization: document tree → pretty-printed XML.
//!
//! ```xml
//! <?xml version="1.0"?>
//! <document>
//!   <page number="1">
//!     <paragraph id="p1">Preamble</paragraph>
//!     <section id="s2">
//!       <heading>1. Introduction</heading>
//!       <paragraph id="p3">This is text.</paragraph>
//!     </section>
//!   </page>
//! </document>
//! ```
//!
//! Implicit pages (basic mode) emit their paragraphs directly under
//! `<document>`. Escaping is left to `quick-xml`; on top of that, characters
//! that XML 1.0 forbids outright (NUL, form feed, other C0 controls) are
//! dropped, since no escape makes them legal and extracted PDF text contains
//! them regularly.

use crate::document::{Block, DocumentTree, Page, Paragraph, Section};
use crate::error::ConvertError;
use quick_xml::events::{BytesDecl, BytesEnd, BytesStart, BytesText, Event};
use quick_xml::Writer;
use std::borrow::Cow;

const INDENT_SIZE: usize = 2;

/// Render `tree` as a pretty-printed XML document.
pub fn to_xml(tree: &DocumentTree) -> Result<String, ConvertError> {
    let mut writer = XmlWriter::new(Writer::new_with_indent(Vec::new(), b' ', INDENT_SIZE));

    writer.event(Event::Decl(BytesDecl::new("1.0", None, None)))?;
    writer.start(BytesStart::new("document"))?;
    for page in &tree.pages {
        write_page(&mut writer, page)?;
    }
    writer.end("document")?;

    writer.finish()
}

fn write_page(w: &mut XmlWriter, page: &Page) -> Result<(), ConvertError> {
    if page.implicit {
        return write_blocks(w, &page.blocks);
    }
    let number = page.number.to_string();
    w.start(BytesStart::new("page").with_attributes([("number", number.as_str())]))?;
    write_blocks(w, &page.blocks)?;
    w.end("page")
}

fn write_blocks(w: &mut XmlWriter, blocks: &[Block]) -> Result<(), ConvertError> {
    for block in blocks {
        match block {
            Block::Paragraph(p) => write_paragraph(w, p)?,
            Block::Section(s) => write_section(w, s)?,
        }
    }
    Ok(())
}

fn write_section(w: &mut XmlWriter, section: &Section) -> Result<(), ConvertError> {
    let id = format!("s{}", section.id);
    w.start(BytesStart::new("section").with_attributes([("id", id.as_str())]))?;
    w.text_element(BytesStart::new("heading"), &section.heading)?;
    for p in &section.paragraphs {
        write_paragraph(w, p)?;
    }
    w.end("section")
}

fn write_paragraph(w: &mut XmlWriter, p: &Paragraph) -> Result<(), ConvertError> {
    let id = format!("p{}", p.id);
    w.text_element(
        BytesStart::new("paragraph").with_attributes([("id", id.as_str())]),
        &p.text,
    )
}

/// Drop characters outside the XML 1.0 `Char` production.
pub fn xml_safe(text: &str) -> Cow<'_, str> {
    if text.chars().all(is_xml_char) {
        Cow::Borrowed(text)
    } else {
        Cow::Owned(text.chars().filter(|&c| is_xml_char(c)).collect())
    }
}

fn is_xml_char(c: char) -> bool {
    matches!(
        c,
        '\t' | '\n' | '\r' | '\u{20}'..='\u{D7FF}' | '\u{E000}'..='\u{FFFD}' | '\u{10000}'..='\u{10FFFF}'
    )
}

/// Thin wrapper that maps encoder errors into [`ConvertError`].
pub(crate) struct XmlWriter {
    inner: Writer<Vec<u8>>,
}

impl XmlWriter {
    pub(crate) fn new(inner: Writer<Vec<u8>>) -> Self {
        Self { inner }
    }

    pub(crate) fn event(&mut self, event: Event<'_>) -> Result<(), ConvertError> {
        self.inner
            .write_event(event)
            .map_err(|e| ConvertError::SerializationError(e.to_string()))
    }

    pub(crate) fn start(&mut self, start: BytesStart<'_>) -> Result<(), ConvertError> {
        self.event(Event::Start(start))
    }

    pub(crate) fn end(&mut self, name: &str) -> Result<(), ConvertError> {
        self.event(Event::End(BytesEnd::new(name)))
    }

    /// `<name attrs>text</name>`, with `text` sanitised and escaped.
    pub(crate) fn text_element(
        &mut self,
        start: BytesStart<'_>,
        text: &str,
    ) -> Result<(), ConvertError> {
        let name = String::from_utf8_lossy(start.name().as_ref()).into_owned();
        self.start(start)?;
        let text = xml_safe(text);
        if !text.is_empty() {
            self.event(Event::Text(BytesText::new(&text)))?;
        }
        self.end(&name)
    }

    pub(crate) fn finish(self) -> Result<String, ConvertError> {
        String::from_utf8(self.inner.into_inner())
            .map_err(|e| ConvertError::SerializationError(e.to_string()))
    }
}
