//! NCX table-of-contents parsing.

use std::collections::HashMap;

use log::warn;

use crate::error::Result;
use crate::xml::{self, Namespaces};

/// Chapter titles mapped to their content source, in first-seen order.
///
/// Inserting a title that is already present replaces its source but keeps
/// its original position (last write wins).
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct NavigationMap {
    entries: Vec<(String, String)>,
    index: HashMap<String, usize>,
}

impl NavigationMap {
    pub fn new() -> Self {
        Self::default()
    }

    /// Parse an NCX document, walking every `navPoint` (nested ones included)
    /// in document order.
    pub fn parse(path: &str, bytes: &[u8], ns: &Namespaces) -> Result<Self> {
        let doc = xml::parse_document(path, bytes)?;
        let mut map = Self::new();

        for point in doc
            .descendants()
            .filter(|n| xml::is_element(*n, ns.ncx, "navPoint"))
        {
            let label = xml::child(point, ns.ncx, "navLabel")
                .and_then(|label| xml::child(label, ns.ncx, "text"))
                .and_then(xml::text_of);
            let src = xml::child(point, ns.ncx, "content").and_then(|c| c.attribute("src"));

            match (label, src) {
                (Some(label), Some(src)) => map.insert(label, src.to_string()),
                _ => warn!("Skipping navPoint without label or content in {path}"),
            }
        }

        Ok(map)
    }

    /// Like [`NavigationMap::parse`], but a malformed document yields an
    /// empty map so chapters still get generic names.
    pub fn parse_or_empty(path: &str, bytes: &[u8], ns: &Namespaces) -> Self {
        Self::parse(path, bytes, ns).unwrap_or_else(|e| {
            warn!("Ignoring navigation document: {e}");
            Self::new()
        })
    }

    pub fn insert(&mut self, title: String, source: String) {
        match self.index.get(&title) {
            Some(&i) => self.entries[i].1 = source,
            None => {
                self.index.insert(title.clone(), self.entries.len());
                self.entries.push((title, source));
            }
        }
    }

    pub fn get(&self, title: &str) -> Option<&str> {
        self.index.get(title).map(|&i| self.entries[i].1.as_str())
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &str)> + '_ {
        self.entries.iter().map(|(t, s)| (t.as_str(), s.as_str()))
    }

    /// Title of the first entry whose source contains `needle`.
    pub fn find_by_source_fragment(&self, needle: &str) -> Option<&str> {
        self.iter()
            .find(|(_, source)| source.contains(needle))
            .map(|(title, _)| title)
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}
