//! Body linearization and context windows.
//!
//! # Responsibility
//! - Flatten every text node inside a body into one whitespace-split stream.
//! - Locate each `<w>` token inside that stream.
//! - Render the neighborhood of a token as a space-joined context string.
//!
//! # Invariants
//! - Text nodes are visited in document order; trailing text of an element
//!   follows its descendants.
//! - Each text node is split on its own, so every element boundary is a
//!   word break: `<w>l'</w><w>homme</w>` yields two stream words.
//! - A token's position is the stream length when its `<w>` opens, and its
//!   word count is the number of stream words its subtree adds.
//! - Windows are clamped to `[0, len)` and never padded.

use super::tree::{Element, Node};

/// Words of left and right context recorded per occurrence.
pub const DEFAULT_WINDOW: usize = 25;

/// Whitespace-split words of a linearized body.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct TokenStream {
    words: Vec<String>,
}

impl TokenStream {
    pub fn from_words<I, S>(words: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self {
            words: words.into_iter().map(Into::into).collect(),
        }
    }

    pub fn len(&self) -> usize {
        self.words.len()
    }

    pub fn is_empty(&self) -> bool {
        self.words.is_empty()
    }

    pub fn words(&self) -> &[String] {
        &self.words
    }

    /// Context for a token starting at `position` and spanning `span` words.
    ///
    /// Returns the words in `[position - window, position + span + window)`,
    /// clamped to the stream, joined by single spaces.
    pub fn context(&self, position: usize, span: usize, window: usize) -> String {
        let len = self.words.len();
        let end = position.saturating_add(span).saturating_add(window).min(len);
        let start = position.saturating_sub(window).min(end);
        self.words[start..end].join(" ")
    }
}

/// One `<w>` element located in the stream.
#[derive(Debug, Clone)]
pub struct TokenOccurrence<'a> {
    pub element: &'a Element,
    /// Index of the token's first word in the stream.
    pub position: usize,
    /// Trimmed text content of the element.
    pub surface: String,
    /// Stream words contributed by the element's text.
    pub word_count: usize,
}

/// Stream plus every located token of one body.
#[derive(Debug, Clone)]
pub struct BodyLinearization<'a> {
    pub stream: TokenStream,
    pub tokens: Vec<TokenOccurrence<'a>>,
}

impl BodyLinearization<'_> {
    /// Context string for the token at `index` in `self.tokens`.
    pub fn context_for(&self, index: usize, window: usize) -> Option<String> {
        let token = self.tokens.get(index)?;
        Some(
            self.stream
                .context(token.position, token.word_count, window),
        )
    }
}

/// Linearizes `body` and locates every `<w>` element inside it.
pub fn linearize_body(body: &Element) -> BodyLinearization<'_> {
    let mut words = Vec::new();
    let mut tokens = Vec::new();
    walk(body, &mut words, &mut tokens);

    BodyLinearization {
        stream: TokenStream { words },
        tokens,
    }
}

fn walk<'a>(
    element: &'a Element,
    words: &mut Vec<String>,
    tokens: &mut Vec<TokenOccurrence<'a>>,
) {
    for child in &element.children {
        match child {
            Node::Text(fragment) => {
                words.extend(fragment.split_whitespace().map(str::to_string));
            }
            Node::Element(inner) if inner.is("w") => {
                let position = words.len();
                let slot = tokens.len();
                tokens.push(TokenOccurrence {
                    element: inner,
                    position,
                    surface: inner.text_content().trim().to_string(),
                    word_count: 0,
                });
                walk(inner, words, tokens);
                tokens[slot].word_count = words.len() - position;
            }
            Node::Element(inner) => walk(inner, words, tokens),
        }
    }
}
