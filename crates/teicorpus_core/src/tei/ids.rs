//! Stable identifier stamping for `<w>` tokens.
//!
//! # Responsibility
//! - Give every `<w>` without `xml:id` a `<prefix>_w<NNNN>` identifier.
//! - Leave every other byte of the document as it was.
//!
//! # Invariants
//! - Existing identifiers are never changed and never consume a counter value.
//! - Generated identifiers never collide with identifiers already present in
//!   the document; a colliding candidate is skipped.
//! - Running the stamping twice is a no-op the second time.

use super::{element_namespace, is_tei_namespace, XmlResult};
use quick_xml::events::{BytesStart, Event};
use quick_xml::{NsReader, Reader, Writer};
use serde::Serialize;
use std::collections::HashSet;

const XML_ID_KEY: &[u8] = b"xml:id";

/// Outcome of stamping one document.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct AssignReport {
    /// `<w>` elements seen.
    pub tokens: usize,
    /// `<w>` elements that received a new identifier.
    pub assigned: usize,
}

/// Formats the identifier for the `counter`-th stamped token.
pub fn format_token_id(prefix: &str, counter: usize) -> String {
    format!("{prefix}_w{counter:04}")
}

/// Rewrites `input`, stamping missing `xml:id` values on `<w>` tokens.
///
/// # Errors
/// - Returns `XmlError` when the input is not well-formed.
pub fn assign_ids(input: &[u8], prefix: &str) -> XmlResult<(Vec<u8>, AssignReport)> {
    let mut allocator = IdAllocator::new(prefix, collect_existing_ids(input)?);
    let mut report = AssignReport::default();

    let mut reader = NsReader::from_reader(input);
    let mut writer = Writer::new(Vec::with_capacity(input.len() + 64));
    let mut buf = Vec::new();

    loop {
        let (resolved, event) = reader.read_resolved_event_into(&mut buf)?;
        let in_tei_scope = is_tei_namespace(element_namespace(&resolved).as_deref());
        match event {
            Event::Start(start) => {
                let start = stamp_token(start, in_tei_scope, &mut allocator, &mut report)?;
                writer.write_event(Event::Start(start))?;
            }
            Event::Empty(start) => {
                let start = stamp_token(start, in_tei_scope, &mut allocator, &mut report)?;
                writer.write_event(Event::Empty(start))?;
            }
            Event::Eof => break,
            other => writer.write_event(other)?,
        }
        buf.clear();
    }

    Ok((writer.into_inner(), report))
}

struct IdAllocator<'p> {
    prefix: &'p str,
    counter: usize,
    taken: HashSet<String>,
}

impl<'p> IdAllocator<'p> {
    fn new(prefix: &'p str, taken: HashSet<String>) -> Self {
        Self {
            prefix,
            counter: 0,
            taken,
        }
    }

    fn allocate(&mut self) -> String {
        loop {
            self.counter += 1;
            let candidate = format_token_id(self.prefix, self.counter);
            if self.taken.insert(candidate.clone()) {
                return candidate;
            }
        }
    }
}

fn stamp_token<'b>(
    start: BytesStart<'b>,
    in_tei_scope: bool,
    allocator: &mut IdAllocator<'_>,
    report: &mut AssignReport,
) -> XmlResult<BytesStart<'b>> {
    if !in_tei_scope || start.local_name().as_ref() != b"w" {
        return Ok(start);
    }

    report.tokens += 1;
    if existing_id(&start)?.is_some() {
        return Ok(start);
    }

    let id = allocator.allocate();
    let mut start = start;
    start.push_attribute(("xml:id", id.as_str()));
    report.assigned += 1;
    Ok(start)
}

fn existing_id(start: &BytesStart<'_>) -> XmlResult<Option<String>> {
    for attr in start.attributes() {
        let attr = attr?;
        if attr.key.as_ref() == XML_ID_KEY {
            return Ok(Some(attr.unescape_value()?.into_owned()));
        }
    }
    Ok(None)
}

fn collect_existing_ids(input: &[u8]) -> XmlResult<HashSet<String>> {
    let mut reader = Reader::from_reader(input);
    let mut buf = Vec::new();
    let mut ids = HashSet::new();

    loop {
        match reader.read_event_into(&mut buf)? {
            Event::Start(start) | Event::Empty(start) => {
                if let Some(id) = existing_id(&start)? {
                    ids.insert(id);
                }
            }
            Event::Eof => break,
            _ => {}
        }
        buf.clear();
    }

    Ok(ids)
}

#[cfg(test)]
mod tests {
    use super::{assign_ids, format_token_id};
    use crate::tei::tree::DocumentTree;
    use crate::tei::XmlError;

    const DOC: &str = r#"<?xml version="1.0" encoding="UTF-8"?>
<TEI xmlns="http://www.tei-c.org/ns/1.0">
  <text><body><p><w lemma="a">A</w> <w xml:id="keep">B</w> <w>C</w><note>x</note><w/></p></body></text>
</TEI>
"#;

    fn ids_of(bytes: &[u8]) -> Vec<Option<String>> {
        let tree = DocumentTree::parse(bytes).unwrap();
        tree.root()
            .descendants()
            .filter(|element| element.is("w"))
            .map(|element| element.xml_id().map(str::to_string))
            .collect()
    }

    #[test]
    fn counter_is_zero_padded_and_widens() {
        assert_eq!(format_token_id("doc1", 1), "doc1_w0001");
        assert_eq!(format_token_id("doc1", 12345), "doc1_w12345");
    }

    #[test]
    fn stamps_only_missing_ids_in_document_order() {
        let (out, report) = assign_ids(DOC.as_bytes(), "doc1").unwrap();

        assert_eq!(report.tokens, 4);
        assert_eq!(report.assigned, 3);
        assert_eq!(
            ids_of(&out),
            vec![
                Some("doc1_w0001".to_string()),
                Some("keep".to_string()),
                Some("doc1_w0002".to_string()),
                Some("doc1_w0003".to_string()),
            ]
        );
    }

    #[test]
    fn output_keeps_declaration_and_untouched_markup() {
        let (out, _) = assign_ids(DOC.as_bytes(), "doc1").unwrap();
        let text = String::from_utf8(out).unwrap();
        assert!(text.starts_with(r#"<?xml version="1.0" encoding="UTF-8"?>"#));
        assert!(text.contains(r#"<w xml:id="keep">B</w>"#));
        assert!(text.contains("<note>x</note>"));
    }

    #[test]
    fn second_run_is_a_no_op() {
        let (first, _) = assign_ids(DOC.as_bytes(), "doc1").unwrap();
        let (second, report) = assign_ids(&first, "doc1").unwrap();
        assert_eq!(report.assigned, 0);
        assert_eq!(report.tokens, 4);
        assert_eq!(first, second);
    }

    #[test]
    fn generated_ids_skip_values_already_in_use() {
        let doc = r#"<TEI xmlns="http://www.tei-c.org/ns/1.0"><text><body><w>x</w><w xml:id="d_w0001">y</w><w>z</w></body></text></TEI>"#;
        let (out, report) = assign_ids(doc.as_bytes(), "d").unwrap();

        assert_eq!(report.assigned, 2);
        assert_eq!(
            ids_of(&out),
            vec![
                Some("d_w0002".to_string()),
                Some("d_w0001".to_string()),
                Some("d_w0003".to_string()),
            ]
        );
    }

    #[test]
    fn foreign_namespace_w_elements_are_ignored() {
        let doc = r#"<TEI xmlns="http://www.tei-c.org/ns/1.0" xmlns:o="urn:other"><o:w>x</o:w><w>y</w></TEI>"#;
        let (_, report) = assign_ids(doc.as_bytes(), "d").unwrap();
        assert_eq!(report.tokens, 1);
        assert_eq!(report.assigned, 1);
    }

    #[test]
    fn undeclared_prefix_tokens_are_not_stamped() {
        let doc = r#"<TEI><body><u:w>x</u:w><w>y</w></body></TEI>"#;
        let (output, report) = assign_ids(doc.as_bytes(), "d").unwrap();
        assert_eq!(report.tokens, 1);
        assert_eq!(ids_of(&output), vec![Some("d_w0001".to_string())]);
    }

    #[test]
    fn malformed_input_is_an_error() {
        let err = assign_ids(b"<TEI><w></TEI>", "d").unwrap_err();
        assert!(matches!(err, XmlError::Syntax(_)));
    }
}
