//! `teiHeader` metadata extraction.
//!
//! Absent header, elements or attributes all map to empty strings; metadata
//! gaps are expected in the corpus and never abort a document.

use super::tree::Element;
use crate::model::corpus::TextMetadata;

/// Reads title, author and origin date bounds from the document root.
pub fn extract_metadata(root: &Element) -> TextMetadata {
    let Some(header) = find_self_or_descendant(root, "teiHeader") else {
        return TextMetadata::default();
    };

    let orig_date = header.find_path(&["origin", "origDate"]);
    TextMetadata {
        title: element_text(header.find_path(&["titleStmt", "title"])),
        author: element_text(header.find_path(&["titleStmt", "author"])),
        not_before: date_bound(orig_date, "notBefore"),
        not_after: date_bound(orig_date, "notAfter"),
    }
}

fn find_self_or_descendant<'a>(root: &'a Element, local_name: &str) -> Option<&'a Element> {
    if root.is(local_name) {
        return Some(root);
    }
    root.find_descendant(local_name)
}

fn element_text(element: Option<&Element>) -> String {
    element
        .map(|element| collapse_whitespace(&element.text_content()))
        .unwrap_or_default()
}

fn date_bound(orig_date: Option<&Element>, attr: &str) -> String {
    orig_date
        .and_then(|element| element.attr(attr))
        .map(str::trim)
        .unwrap_or_default()
        .to_string()
}

fn collapse_whitespace(value: &str) -> String {
    value.split_whitespace().collect::<Vec<_>>().join(" ")
}

#[cfg(test)]
mod tests {
    use super::extract_metadata;
    use crate::tei::tree::DocumentTree;

    #[test]
    fn reads_all_fields_when_present() {
        let tree = DocumentTree::parse(
            br#"<TEI xmlns="http://www.tei-c.org/ns/1.0">
                <teiHeader>
                  <fileDesc>
                    <titleStmt><title>De  rerum
                      natura</title><author>Lucretius</author></titleStmt>
                    <sourceDesc><msDesc><history><origin>
                      <origDate notBefore="-0099" notAfter="-0055"/>
                    </origin></history></msDesc></sourceDesc>
                  </fileDesc>
                </teiHeader>
                <text><body/></text>
              </TEI>"#,
        )
        .unwrap();

        let meta = extract_metadata(tree.root());
        assert_eq!(meta.title, "De rerum natura");
        assert_eq!(meta.author, "Lucretius");
        assert_eq!(meta.not_before, "-0099");
        assert_eq!(meta.not_after, "-0055");
    }

    #[test]
    fn missing_fields_become_empty_strings() {
        let tree = DocumentTree::parse(
            br#"<TEI xmlns="http://www.tei-c.org/ns/1.0">
                <teiHeader><fileDesc><titleStmt><title>Only title</title></titleStmt></fileDesc>
                <profileDesc><origin><origDate notBefore="1200"/></origin></profileDesc>
                </teiHeader></TEI>"#,
        )
        .unwrap();

        let meta = extract_metadata(tree.root());
        assert_eq!(meta.title, "Only title");
        assert_eq!(meta.author, "");
        assert_eq!(meta.not_before, "1200");
        assert_eq!(meta.not_after, "");
    }

    #[test]
    fn missing_header_yields_default_metadata() {
        let tree = DocumentTree::parse(b"<TEI><text><body/></text></TEI>").unwrap();
        let meta = extract_metadata(tree.root());
        assert!(meta.title.is_empty());
        assert!(meta.author.is_empty());
        assert!(meta.not_before.is_empty());
        assert!(meta.not_after.is_empty());
    }
}
