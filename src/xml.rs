//! XML namespace table and parsing helpers shared by the descriptor,
//! navigation and cover-page parsers.

use roxmltree::{Document, Node, ParsingOptions};

use crate::error::{ConvertError, Result};

/// Namespace URIs used across EPUB documents.
///
/// Built once per run and passed by reference to every parse call so the
/// descriptor and navigation parsers can never disagree on a URI.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Namespaces {
    pub container: &'static str,
    pub opf: &'static str,
    pub dc: &'static str,
    pub ncx: &'static str,
    pub xhtml: &'static str,
    pub svg: &'static str,
    pub xlink: &'static str,
}

impl Default for Namespaces {
    fn default() -> Self {
        Self {
            container: "urn:oasis:names:tc:opendocument:xmlns:container",
            opf: "http://www.idpf.org/2007/opf",
            dc: "http://purl.org/dc/elements/1.1/",
            ncx: "http://www.daisy.org/z3986/2005/ncx/",
            xhtml: "http://www.w3.org/1999/xhtml",
            svg: "http://www.w3.org/2000/svg",
            xlink: "http://www.w3.org/1999/xlink",
        }
    }
}

/// Parse `bytes` (the archive entry at `path`) into a DOM.
///
/// DOCTYPE declarations are allowed since XHTML content documents usually
/// carry one, and a leading byte-order mark is ignored.
pub fn parse_document<'a>(path: &str, bytes: &'a [u8]) -> Result<Document<'a>> {
    let text = std::str::from_utf8(bytes).map_err(|e| ConvertError::xml(path, e))?;
    let text = text.strip_prefix('\u{feff}').unwrap_or(text);

    let options = ParsingOptions {
        allow_dtd: true,
        ..ParsingOptions::default()
    };
    Document::parse_with_options(text, options).map_err(|e| ConvertError::xml(path, e))
}

/// True if `node` is an element named `name` in namespace `ns`.
///
/// Elements without any namespace also match; plenty of real-world files
/// omit the default namespace declaration.
pub fn is_element(node: Node<'_, '_>, ns: &str, name: &str) -> bool {
    if !node.is_element() {
        return false;
    }
    let tag = node.tag_name();
    tag.name() == name && tag.namespace().map_or(true, |uri| uri == ns)
}

/// First child element of `node` matching `ns`/`name`.
pub fn child<'a, 'input>(node: Node<'a, 'input>, ns: &str, name: &str) -> Option<Node<'a, 'input>> {
    node.children().find(|n| is_element(*n, ns, name))
}

/// First descendant element of `node` (including itself) matching `ns`/`name`.
pub fn descendant<'a, 'input>(
    node: Node<'a, 'input>,
    ns: &str,
    name: &str,
) -> Option<Node<'a, 'input>> {
    node.descendants().find(|n| is_element(*n, ns, name))
}

/// Concatenated, trimmed text of `node`; `None` when blank.
pub fn text_of(node: Node<'_, '_>) -> Option<String> {
    let text: String = node
        .descendants()
        .filter(|n| n.is_text())
        .filter_map(|n| n.text())
        .collect();
    let trimmed = text.trim();
    if trimmed.is_empty() {
        None
    } else {
        Some(trimmed.to_string())
    }
}
