//! Multi-word expression linking.
//!
//! # Responsibility
//! - Turn a `<span type="baseForm">` into one phraseme row.
//! - Link the phraseme to its member words in target order.
//!
//! # Invariants
//! - Positions are 1-based and contiguous over the resolved targets.
//! - Lookups are scoped to the phraseme's own text.
//! - An unresolved target skips one link; the phraseme is always kept.

use crate::model::corpus::{NewPhraseme, PhrasemeId, PhrasemeWordLink, TextId};
use crate::repo::corpus_repo::{CorpusRepository, RepoResult};
use crate::tei::tree::Element;
use log::warn;
use serde::Serialize;

/// `type` attribute value marking a span as a phraseme.
pub const BASE_FORM_SPAN_TYPE: &str = "baseForm";

/// Attribute-level view of one phraseme span.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct SpanDescriptor {
    /// Token ids in span order, fragment marker stripped.
    pub targets: Vec<String>,
    pub normalized_form: String,
    pub concept_url: Option<String>,
}

impl SpanDescriptor {
    /// Returns the descriptor when `element` is a base-form span.
    pub fn from_element(element: &Element) -> Option<Self> {
        if !element.is("span") || element.attr("type") != Some(BASE_FORM_SPAN_TYPE) {
            return None;
        }

        Some(Self {
            targets: parse_targets(element.attr("target").unwrap_or_default()),
            normalized_form: element.attr("n").unwrap_or_default().to_string(),
            concept_url: element
                .attr("ana")
                .map(str::trim)
                .filter(|value| !value.is_empty())
                .map(str::to_string),
        })
    }
}

/// Result of linking one span.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct LinkOutcome {
    pub phraseme_id: PhrasemeId,
    pub linked: usize,
    /// Target ids with no word in the text, in span order.
    pub unresolved: Vec<String>,
}

/// Splits a `target` attribute into bare token ids.
pub fn parse_targets(target: &str) -> Vec<String> {
    target
        .split_whitespace()
        .map(|reference| reference.trim_start_matches('#'))
        .filter(|reference| !reference.is_empty())
        .map(str::to_string)
        .collect()
}

/// Creates the phraseme for `span` and links every resolvable target.
///
/// # Errors
/// - Storage failures only; missing targets are reported in the outcome.
pub fn link_phraseme<R>(repo: &R, text_id: TextId, span: &SpanDescriptor) -> RepoResult<LinkOutcome>
where
    R: CorpusRepository + ?Sized,
{
    let phraseme_id = repo.create_phraseme(&NewPhraseme {
        text_id,
        normalized_form: span.normalized_form.clone(),
        concept_url: span.concept_url.clone(),
    })?;

    let mut position: u32 = 0;
    let mut unresolved = Vec::new();
    for xml_id in &span.targets {
        let Some(word_id) = repo.find_word_by_stable_id(text_id, xml_id)? else {
            warn!(
                "event=phraseme_link module=service status=skipped text_id={} phraseme_id={} xml_id={}",
                text_id, phraseme_id, xml_id
            );
            unresolved.push(xml_id.clone());
            continue;
        };

        position += 1;
        repo.create_phraseme_word_link(&PhrasemeWordLink {
            phraseme_id,
            word_id,
            position,
        })?;
    }

    Ok(LinkOutcome {
        phraseme_id,
        linked: position as usize,
        unresolved,
    })
}

#[cfg(test)]
mod tests {
    use super::{parse_targets, SpanDescriptor};
    use crate::tei::tree::DocumentTree;

    #[test]
    fn targets_lose_fragment_markers() {
        assert_eq!(parse_targets("#t1  #t9\n#t2"), vec!["t1", "t9", "t2"]);
        assert_eq!(parse_targets("t1 # ##t2"), vec!["t1", "t2"]);
        assert!(parse_targets("").is_empty());
    }

    #[test]
    fn only_base_form_spans_are_descriptors() {
        let tree = DocumentTree::parse(
            br##"<body><span type="baseForm" target="#a #b" n="a b" ana=" "/><span type="other" target="#a"/></body>"##,
        )
        .unwrap();
        let spans: Vec<SpanDescriptor> = tree
            .root()
            .descendants()
            .filter_map(SpanDescriptor::from_element)
            .collect();

        assert_eq!(spans.len(), 1);
        assert_eq!(spans[0].targets, vec!["a", "b"]);
        assert_eq!(spans[0].normalized_form, "a b");
        assert_eq!(spans[0].concept_url, None);
    }
}
