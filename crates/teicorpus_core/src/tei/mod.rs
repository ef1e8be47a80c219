//! TEI document access: tree parsing, id stamping, header and body readers.
//!
//! # Responsibility
//! - Turn raw TEI bytes into an owned, namespace-resolved element tree.
//! - Provide the read-side helpers the extraction pipeline needs.
//! - Rewrite documents to stamp missing `xml:id` values on `<w>` tokens.
//!
//! # Invariants
//! - TEI elements are matched in the TEI namespace or with no namespace.
//!   An element whose prefix was never declared is never a TEI element.
//! - `xml:id` is always read from the XML namespace.

use quick_xml::name::ResolveResult;
use std::error::Error;
use std::fmt::{Display, Formatter};

pub mod context;
pub mod ids;
pub mod metadata;
pub mod tree;

/// TEI P5 namespace.
pub const TEI_NS: &str = "http://www.tei-c.org/ns/1.0";
/// Namespace bound to the reserved `xml` prefix.
pub const XML_NS: &str = "http://www.w3.org/XML/1998/namespace";

/// Owned namespace of a resolved element name.
///
/// An undeclared prefix resolves to the bare prefix, which never equals
/// [`TEI_NS`].
pub(crate) fn element_namespace(resolved: &ResolveResult<'_>) -> Option<String> {
    match resolved {
        ResolveResult::Bound(ns) => Some(String::from_utf8_lossy(ns.as_ref()).into_owned()),
        ResolveResult::Unbound => None,
        ResolveResult::Unknown(prefix) => Some(String::from_utf8_lossy(prefix).into_owned()),
    }
}

/// Whether an element in `namespace` may be a TEI element.
pub(crate) fn is_tei_namespace(namespace: Option<&str>) -> bool {
    namespace.map_or(true, |ns| ns == TEI_NS)
}

pub type XmlResult<T> = Result<T, XmlError>;

/// Errors raised while reading or rewriting TEI markup.
#[derive(Debug)]
pub enum XmlError {
    /// Markup is not well-formed.
    Syntax(quick_xml::Error),
    /// Malformed attribute list on some element.
    Attribute(quick_xml::events::attributes::AttrError),
    /// Output could not be written.
    Io(std::io::Error),
    /// Name or text is not valid UTF-8.
    Utf8(std::str::Utf8Error),
    /// Document has no root element.
    MissingRoot,
    /// A closing tag appeared with no open element.
    UnbalancedEnd,
    /// Input ended while elements were still open.
    UnclosedElement(String),
}

impl Display for XmlError {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Syntax(err) => write!(f, "malformed xml: {err}"),
            Self::Attribute(err) => write!(f, "malformed attribute: {err}"),
            Self::Io(err) => write!(f, "{err}"),
            Self::Utf8(err) => write!(f, "invalid utf-8 in xml: {err}"),
            Self::MissingRoot => write!(f, "document has no root element"),
            Self::UnbalancedEnd => write!(f, "closing tag without matching start tag"),
            Self::UnclosedElement(name) => write!(f, "element `{name}` is never closed"),
        }
    }
}

impl Error for XmlError {
    fn source(&self) -> Option<&(dyn Error + 'static)> {
        match self {
            Self::Syntax(err) => Some(err),
            Self::Attribute(err) => Some(err),
            Self::Io(err) => Some(err),
            Self::Utf8(err) => Some(err),
            Self::MissingRoot => None,
            Self::UnbalancedEnd => None,
            Self::UnclosedElement(_) => None,
        }
    }
}

impl From<quick_xml::Error> for XmlError {
    fn from(value: quick_xml::Error) -> Self {
        Self::Syntax(value)
    }
}

impl From<quick_xml::events::attributes::AttrError> for XmlError {
    fn from(value: quick_xml::events::attributes::AttrError) -> Self {
        Self::Attribute(value)
    }
}

impl From<std::io::Error> for XmlError {
    fn from(value: std::io::Error) -> Self {
        Self::Io(value)
    }
}

impl From<std::str::Utf8Error> for XmlError {
    fn from(value: std::str::Utf8Error) -> Self {
        Self::Utf8(value)
    }
}

impl From<std::string::FromUtf8Error> for XmlError {
    fn from(value: std::string::FromUtf8Error) -> Self {
        Self::Utf8(value.utf8_error())
    }
}
