//! Package descriptor (OPF) location and parsing.

use std::collections::HashMap;

use log::{debug, warn};

use crate::archive::{parent_dir, resolve_href, Archive, EntryHint};
use crate::error::{ConvertError, Result};
use crate::xml::{self, Namespaces};

const CONTAINER_PATH: &str = "META-INF/container.xml";

/// Content kind of a manifest item, decided once from its media type.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum MediaKind {
    Document,
    Image,
    Style,
    Font,
    Navigation,
    Other,
}

impl MediaKind {
    pub fn from_media_type(media_type: &str) -> Self {
        let essence = media_type
            .split(';')
            .next()
            .unwrap_or_default()
            .trim()
            .to_ascii_lowercase();

        match essence.as_str() {
            "application/xhtml+xml" => Self::Document,
            "text/css" => Self::Style,
            "application/x-dtbncx+xml" => Self::Navigation,
            "application/font-woff"
            | "application/font-sfnt"
            | "application/vnd.ms-opentype"
            | "application/x-font-ttf"
            | "application/x-font-otf"
            | "application/x-font-truetype"
            | "application/x-font-opentype" => Self::Font,
            s if s.starts_with("image/") => Self::Image,
            s if s.starts_with("font/") => Self::Font,
            _ => Self::Other,
        }
    }

    /// Kinds copied verbatim into the output folder.
    pub fn is_extracted(self) -> bool {
        matches!(self, Self::Document | Self::Image | Self::Style | Self::Font)
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ManifestItem {
    pub id: String,
    /// Relative to the descriptor's directory
    pub href: String,
    pub media_type: String,
    pub kind: MediaKind,
    pub properties: Vec<String>,
}

impl ManifestItem {
    pub fn has_property(&self, property: &str) -> bool {
        self.properties.iter().any(|p| p == property)
    }
}

/// Parsed package descriptor: metadata, manifest and spine.
#[derive(Debug, Clone)]
pub struct PackageDescriptor {
    path: String,
    title: Option<String>,
    creator: Option<String>,
    meta: Vec<(String, String)>,
    manifest: Vec<ManifestItem>,
    index: HashMap<String, usize>,
    spine: Vec<String>,
}

type LocateStrategy = fn(&Archive, &Namespaces) -> Option<String>;

/// Find the archive path of the package descriptor.
///
/// The container pointer is consulted first; without a usable one the first
/// `.opf` entry in archive order wins.
pub fn locate(archive: &Archive, ns: &Namespaces) -> Result<String> {
    const STRATEGIES: [LocateStrategy; 2] = [from_container_pointer, from_entry_scan];

    STRATEGIES
        .iter()
        .find_map(|strategy| strategy(archive, ns))
        .ok_or_else(|| {
            ConvertError::MalformedContainer("no package descriptor found in archive".to_string())
        })
}

fn from_container_pointer(archive: &Archive, ns: &Namespaces) -> Option<String> {
    let bytes = archive.read(CONTAINER_PATH).ok()?;
    let doc = match xml::parse_document(CONTAINER_PATH, bytes) {
        Ok(doc) => doc,
        Err(e) => {
            warn!("Ignoring unreadable container pointer: {e}");
            return None;
        }
    };

    let full_path = xml::descendant(doc.root(), ns.container, "rootfile")?
        .attribute("full-path")?
        .replace('\\', "/");
    let full_path = full_path.trim_start_matches('/').to_string();

    if archive.contains(&full_path) {
        Some(full_path)
    } else {
        warn!("Container points at missing descriptor {full_path}");
        None
    }
}

fn from_entry_scan(archive: &Archive, _ns: &Namespaces) -> Option<String> {
    archive
        .entries()
        .find(|(_, hint)| *hint == EntryHint::Descriptor)
        .map(|(path, _)| path.to_string())
}

impl PackageDescriptor {
    /// Parse the descriptor found at archive path `path`.
    pub fn parse(path: &str, bytes: &[u8], ns: &Namespaces) -> Result<Self> {
        let doc = xml::parse_document(path, bytes)?;
        let root = doc.root_element();

        let mut title = None;
        let mut creator = None;
        let mut meta = Vec::new();

        if let Some(metadata) = xml::descendant(root, ns.opf, "metadata") {
            title = xml::descendant(metadata, ns.dc, "title").and_then(xml::text_of);
            creator = xml::descendant(metadata, ns.dc, "creator").and_then(xml::text_of);

            for node in metadata
                .descendants()
                .filter(|n| xml::is_element(*n, ns.opf, "meta"))
            {
                if let (Some(name), Some(content)) =
                    (node.attribute("name"), node.attribute("content"))
                {
                    meta.push((name.to_string(), content.to_string()));
                }
            }
        }

        let mut manifest = Vec::new();
        let mut index = HashMap::new();
        if let Some(node) = xml::descendant(root, ns.opf, "manifest") {
            for item in node.children().filter(|n| xml::is_element(*n, ns.opf, "item")) {
                let (Some(id), Some(href)) = (item.attribute("id"), item.attribute("href")) else {
                    warn!("Skipping manifest item without id or href in {path}");
                    continue;
                };
                if index.contains_key(id) {
                    warn!("Duplicate manifest id {id} in {path}; keeping the first");
                    continue;
                }

                let media_type = item.attribute("media-type").unwrap_or_default();
                index.insert(id.to_string(), manifest.len());
                manifest.push(ManifestItem {
                    id: id.to_string(),
                    href: href.to_string(),
                    media_type: media_type.to_string(),
                    kind: MediaKind::from_media_type(media_type),
                    properties: item
                        .attribute("properties")
                        .map(|p| p.split_whitespace().map(str::to_string).collect())
                        .unwrap_or_default(),
                });
            }
        }

        let spine: Vec<String> = xml::descendant(root, ns.opf, "spine")
            .map(|node| {
                node.children()
                    .filter(|n| xml::is_element(*n, ns.opf, "itemref"))
                    .filter_map(|n| n.attribute("idref"))
                    .map(str::to_string)
                    .collect()
            })
            .unwrap_or_default();

        debug!(
            "Parsed descriptor {path}: {} manifest items, {} spine entries",
            manifest.len(),
            spine.len()
        );

        Ok(Self {
            path: path.to_string(),
            title,
            creator,
            meta,
            manifest,
            index,
            spine,
        })
    }

    pub fn path(&self) -> &str {
        &self.path
    }

    /// Directory hrefs in this descriptor are relative to.
    pub fn base_dir(&self) -> &str {
        parent_dir(&self.path)
    }

    pub fn title(&self) -> Option<&str> {
        self.title.as_deref()
    }

    pub fn creator(&self) -> Option<&str> {
        self.creator.as_deref()
    }

    /// Content of the first `<meta name=... content=...>` entry named `name`.
    pub fn meta(&self, name: &str) -> Option<&str> {
        self.meta
            .iter()
            .find(|(n, _)| n == name)
            .map(|(_, content)| content.as_str())
    }

    pub fn item(&self, id: &str) -> Option<&ManifestItem> {
        self.index.get(id).map(|&i| &self.manifest[i])
    }

    pub fn items(&self) -> &[ManifestItem] {
        &self.manifest
    }

    pub fn spine(&self) -> &[String] {
        &self.spine
    }

    /// Spine references resolved to manifest items, in reading order.
    pub fn spine_items(&self) -> impl Iterator<Item = &ManifestItem> + '_ {
        self.spine.iter().filter_map(move |idref| {
            let item = self.item(idref);
            if item.is_none() {
                warn!("Spine references unknown manifest id {idref}");
            }
            item
        })
    }

    /// Archive path of a manifest item.
    pub fn item_path(&self, item: &ManifestItem) -> String {
        resolve_href(self.base_dir(), &item.href)
    }
}
