use std::fs;
use std::path::{Path, PathBuf};

use serde::Serialize;

use crate::archive::file_name;
use crate::error::{ConvertError, Result};
use crate::navigation::NavigationMap;
use crate::package::{MediaKind, PackageDescriptor};

pub const DEFAULT_TITLE: &str = "Unknown EPUB";
pub const GENRE_PLACEHOLDER: &str = "light novel";
pub const SUMMARY_PLACEHOLDER: &str = "N/A";
pub const METADATA_FILE: &str = "metadata.json";

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ChapterEntry {
    pub name: String,
    pub path: String,
}

/// The manifest handed to reading-app front ends as `metadata.json`.
///
/// Field order here is the serialized order.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct BookMetadata {
    pub url: String,
    pub title: String,
    pub cover: Option<String>,
    pub genre: String,
    pub summary: String,
    pub authors: String,
    pub artist: String,
    pub chapters: Vec<ChapterEntry>,
}

/// Book title with the default applied.
pub fn resolved_title(descriptor: &PackageDescriptor) -> &str {
    descriptor.title().unwrap_or(DEFAULT_TITLE)
}

pub fn assemble(
    descriptor: &PackageDescriptor,
    cover: Option<String>,
    navigation: &NavigationMap,
    output_folder: &Path,
) -> BookMetadata {
    BookMetadata {
        url: output_folder.to_string_lossy().into_owned(),
        title: resolved_title(descriptor).to_string(),
        cover,
        genre: GENRE_PLACEHOLDER.to_string(),
        summary: SUMMARY_PLACEHOLDER.to_string(),
        authors: descriptor.creator().unwrap_or_default().to_string(),
        artist: String::new(),
        chapters: chapters(descriptor, navigation),
    }
}

/// One entry per spine document. A document is named after the first
/// navigation entry whose source contains its file name, decoded or as
/// written in the manifest; a plain substring test, so `ch1.xhtml` also
/// matches a source of `xch1.xhtml`.
fn chapters(descriptor: &PackageDescriptor, navigation: &NavigationMap) -> Vec<ChapterEntry> {
    descriptor
        .spine_items()
        .filter(|item| item.kind == MediaKind::Document)
        .enumerate()
        .map(|(i, item)| {
            let path = descriptor.item_path(item);
            let name = navigation
                .find_by_source_fragment(file_name(&path))
                .or_else(|| navigation.find_by_source_fragment(file_name(&item.href)))
                .map_or_else(|| format!("Unnamed Chapter {i}"), str::to_string);
            ChapterEntry { name, path }
        })
        .collect()
}

/// Serialize `metadata` into `folder/metadata.json`: UTF-8, four-space
/// indentation, non-ASCII kept literal.
pub fn write_metadata(metadata: &BookMetadata, folder: &Path) -> Result<PathBuf> {
    let mut json = Vec::new();
    let formatter = serde_json::ser::PrettyFormatter::with_indent(b"    ");
    let mut serializer = serde_json::Serializer::with_formatter(&mut json, formatter);
    metadata.serialize(&mut serializer)?;

    let path = folder.join(METADATA_FILE);
    fs::write(&path, json).map_err(|e| ConvertError::filesystem(&path, e))?;
    Ok(path)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::xml::Namespaces;
    use tempfile::TempDir;

    fn descriptor(metadata: &str) -> PackageDescriptor {
        let xml = format!(
            r#"<package xmlns="http://www.idpf.org/2007/opf" xmlns:dc="http://purl.org/dc/elements/1.1/">
<metadata>{metadata}</metadata>
<manifest>
  <item id="c1" href="ch1.xhtml" media-type="application/xhtml+xml"/>
  <item id="img" href="pic.png" media-type="image/png"/>
  <item id="c2" href="ch2.xhtml" media-type="application/xhtml+xml"/>
</manifest>
<spine><itemref idref="c1"/><itemref idref="img"/><itemref idref="c2"/></spine>
</package>"#
        );
        PackageDescriptor::parse("content.opf", xml.as_bytes(), &Namespaces::default()).unwrap()
    }

    #[test]
    fn test_chapter_naming_with_fallback() {
        let mut navigation = NavigationMap::new();
        navigation.insert("Intro".to_string(), "ch1.xhtml#top".to_string());

        let metadata = assemble(&descriptor(""), None, &navigation, Path::new("out"));

        assert_eq!(
            metadata.chapters,
            vec![
                ChapterEntry {
                    name: "Intro".to_string(),
                    path: "ch1.xhtml".to_string()
                },
                ChapterEntry {
                    name: "Unnamed Chapter 1".to_string(),
                    path: "ch2.xhtml".to_string()
                },
            ]
        );
    }

    #[test]
    fn test_chapter_naming_with_encoded_hrefs() {
        let xml = r#"<package xmlns="http://www.idpf.org/2007/opf">
<manifest><item id="c1" href="Text/Chapter%201.xhtml" media-type="application/xhtml+xml"/></manifest>
<spine><itemref idref="c1"/></spine>
</package>"#;
        let opf = PackageDescriptor::parse("OEBPS/content.opf", xml.as_bytes(), &Namespaces::default())
            .unwrap();
        let mut navigation = NavigationMap::new();
        navigation.insert("First".to_string(), "Text/Chapter%201.xhtml#start".to_string());

        let metadata = assemble(&opf, None, &navigation, Path::new("out"));

        assert_eq!(
            metadata.chapters,
            vec![ChapterEntry {
                name: "First".to_string(),
                path: "OEBPS/Text/Chapter 1.xhtml".to_string()
            }]
        );
    }

    #[test]
    fn test_defaults_when_metadata_absent() {
        let metadata = assemble(&descriptor(""), None, &NavigationMap::new(), Path::new("out"));
        assert_eq!(metadata.title, DEFAULT_TITLE);
        assert_eq!(metadata.authors, "");
        assert_eq!(metadata.artist, "");
        assert_eq!(metadata.genre, GENRE_PLACEHOLDER);
        assert_eq!(metadata.summary, SUMMARY_PLACEHOLDER);
        assert_eq!(metadata.cover, None);
        assert_eq!(metadata.url, "out");
    }

    #[test]
    fn test_present_metadata() {
        let opf = descriptor("<dc:title>Title</dc:title><dc:creator>Author</dc:creator>");
        let metadata = assemble(&opf, Some("Images/c.jpg".to_string()), &NavigationMap::new(), Path::new("out"));
        assert_eq!(metadata.title, "Title");
        assert_eq!(metadata.authors, "Author");
        assert_eq!(metadata.cover.as_deref(), Some("Images/c.jpg"));
    }

    #[test]
    fn test_write_metadata_format() {
        let dir = TempDir::new().unwrap();
        let opf = descriptor("<dc:title>Ünïcödé 書</dc:title>");
        let metadata = assemble(&opf, None, &NavigationMap::new(), Path::new("out"));

        let path = write_metadata(&metadata, dir.path()).unwrap();
        let json = fs::read_to_string(path).unwrap();

        assert!(json.contains("\"title\": \"Ünïcödé 書\""), "{json}");
        assert!(json.contains("\n    \"url\": \"out\""), "{json}");
        assert!(json.contains("\"cover\": null"), "{json}");

        let keys = ["\"url\"", "\"title\"", "\"cover\"", "\"genre\"", "\"summary\"", "\"authors\"", "\"artist\"", "\"chapters\""];
        let positions: Vec<usize> = keys.iter().map(|k| json.find(k).unwrap()).collect();
        assert!(positions.windows(2).all(|w| w[0] < w[1]), "{json}");
    }
}
