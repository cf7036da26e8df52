//! In-memory view of an EPUB zip container.

use std::collections::HashMap;
use std::fs::File;
use std::io::{BufReader, Read, Seek};
use std::path::Path;

use log::{debug, warn};
use zip::result::ZipError;
use zip::ZipArchive;

use crate::error::{ConvertError, Result};

/// Largest uncompressed entry accepted, in bytes.
pub const MAX_ENTRY_SIZE: u64 = 100_000_000;

/// Coarse content kind guessed from an entry's file extension.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EntryHint {
    Descriptor,
    Navigation,
    Markup,
    Image,
    Style,
    Font,
    Other,
}

impl EntryHint {
    pub fn from_path(path: &str) -> Self {
        let ext = file_name(path)
            .rsplit_once('.')
            .map(|(_, ext)| ext.to_ascii_lowercase())
            .unwrap_or_default();
        match ext.as_str() {
            "opf" => Self::Descriptor,
            "ncx" => Self::Navigation,
            "xhtml" | "html" | "htm" | "xml" => Self::Markup,
            "jpg" | "jpeg" | "png" | "gif" | "svg" | "webp" | "bmp" => Self::Image,
            "css" => Self::Style,
            "ttf" | "otf" | "woff" | "woff2" => Self::Font,
            _ => Self::Other,
        }
    }
}

/// Every file entry of the container, in enumeration order, indexed by path.
///
/// Read-only once loaded.
pub struct Archive {
    entries: Vec<(String, Vec<u8>)>,
    index: HashMap<String, usize>,
}

impl Archive {
    pub fn open(path: &Path) -> Result<Self> {
        let file = File::open(path).map_err(ZipError::Io)?;
        Self::from_reader(BufReader::new(file))
    }

    pub fn from_reader<R: Read + Seek>(reader: R) -> Result<Self> {
        Self::from_reader_with_limit(reader, MAX_ENTRY_SIZE)
    }

    /// Like [`Archive::from_reader`], rejecting any entry larger than
    /// `max_entry_size` bytes, whether declared or actually decompressed.
    pub fn from_reader_with_limit<R: Read + Seek>(reader: R, max_entry_size: u64) -> Result<Self> {
        let mut zip = ZipArchive::new(reader)?;
        let mut entries = Vec::with_capacity(zip.len());

        for i in 0..zip.len() {
            let mut file = zip.by_index(i)?;
            if file.is_dir() {
                continue;
            }
            if file.encrypted() {
                return Err(ZipError::UnsupportedArchive("encrypted entries are not supported").into());
            }

            let name = file.name().replace('\\', "/");
            if file.size() > max_entry_size {
                return Err(oversized(&name, file.size()));
            }

            let mut contents = Vec::new();
            (&mut file)
                .take(max_entry_size + 1)
                .read_to_end(&mut contents)
                .map_err(ZipError::Io)?;
            if contents.len() as u64 > max_entry_size {
                return Err(oversized(&name, contents.len() as u64));
            }
            entries.push((name, contents));
        }

        debug!("Loaded {} archive entries", entries.len());
        Ok(Self::from_entries(entries))
    }

    /// Build an archive from already-decompressed entries.
    ///
    /// A repeated path keeps its first occurrence for lookups.
    pub fn from_entries<I, S>(entries: I) -> Self
    where
        I: IntoIterator<Item = (S, Vec<u8>)>,
        S: Into<String>,
    {
        let entries: Vec<(String, Vec<u8>)> = entries
            .into_iter()
            .map(|(path, bytes)| (path.into(), bytes))
            .collect();
        let mut index = HashMap::with_capacity(entries.len());
        for (i, (path, _)) in entries.iter().enumerate() {
            index.entry(path.clone()).or_insert(i);
        }
        Self { entries, index }
    }

    pub fn entries(&self) -> impl Iterator<Item = (&str, EntryHint)> + '_ {
        self.entries
            .iter()
            .map(|(path, _)| (path.as_str(), EntryHint::from_path(path)))
    }

    pub fn read(&self, path: &str) -> Result<&[u8]> {
        self.index
            .get(path)
            .map(|&i| self.entries[i].1.as_slice())
            .ok_or_else(|| ConvertError::NotFound(path.to_string()))
    }

    pub fn contains(&self, path: &str) -> bool {
        self.index.contains_key(path)
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

fn oversized(name: &str, size: u64) -> ConvertError {
    warn!("Entry {name} is {size} bytes, above the size limit");
    ZipError::UnsupportedArchive("entry exceeds the size limit").into()
}

/// Directory part of an archive path, `""` for top-level entries.
pub fn parent_dir(path: &str) -> &str {
    path.rsplit_once('/').map_or("", |(dir, _)| dir)
}

/// Last segment of an archive path.
pub fn file_name(path: &str) -> &str {
    path.rsplit_once('/').map_or(path, |(_, name)| name)
}

/// Join a relative `href` onto `base_dir`, yielding an archive path.
///
/// Any `#fragment` is stripped and percent-escapes are decoded (an href that
/// does not decode to UTF-8 is used as written). Backslashes become forward
/// slashes, `.` segments are dropped and `..` pops a segment.
pub fn resolve_href(base_dir: &str, href: &str) -> String {
    let href = href.split('#').next().unwrap_or_default();
    let href = urlencoding::decode(href).map_or_else(|_| href.to_string(), |d| d.into_owned());
    let href = href.replace('\\', "/");
    let base_dir = base_dir.replace('\\', "/");

    let mut segments: Vec<&str> = Vec::new();
    if !href.starts_with('/') {
        for segment in base_dir.split('/') {
            push_segment(&mut segments, segment);
        }
    }
    for segment in href.split('/') {
        push_segment(&mut segments, segment);
    }
    segments.join("/")
}

fn push_segment<'a>(segments: &mut Vec<&'a str>, segment: &'a str) {
    match segment {
        "" | "." => {}
        ".." => {
            segments.pop();
        }
        other => segments.push(other),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::{Cursor, Write};
    use zip::write::SimpleFileOptions;
    use zip::unstable::write::FileOptionsExt;
    use zip::ZipWriter;

    fn zip_bytes(files: &[(&str, &[u8])]) -> Vec<u8> {
        let mut zip = ZipWriter::new(Cursor::new(Vec::new()));
        zip.add_directory("OEBPS/", SimpleFileOptions::default())
            .unwrap();
        for (name, data) in files {
            zip.start_file(*name, SimpleFileOptions::default()).unwrap();
            zip.write_all(data).unwrap();
        }
        zip.finish().unwrap().into_inner()
    }

    #[test]
    fn test_from_reader_skips_directories_and_keeps_order() {
        let bytes = zip_bytes(&[
            ("mimetype", b"application/epub+zip"),
            ("OEBPS/content.opf", b"<package/>"),
            ("OEBPS/ch1.xhtml", b"<html/>"),
        ]);
        let archive = Archive::from_reader(Cursor::new(bytes)).unwrap();

        let paths: Vec<&str> = archive.entries().map(|(p, _)| p).collect();
        assert_eq!(paths, vec!["mimetype", "OEBPS/content.opf", "OEBPS/ch1.xhtml"]);
        assert_eq!(archive.read("OEBPS/ch1.xhtml").unwrap(), b"<html/>");
    }

    #[test]
    fn test_from_reader_rejects_non_zip() {
        let err = Archive::from_reader(Cursor::new(b"definitely not a zip".to_vec()));
        assert!(matches!(err, Err(ConvertError::Archive(_))));
    }

    #[test]
    fn test_read_missing_entry() {
        let archive = Archive::from_entries(vec![("a.txt", b"a".to_vec())]);
        assert!(matches!(archive.read("b.txt"), Err(ConvertError::NotFound(p)) if p == "b.txt"));
        assert!(archive.contains("a.txt"));
        assert_eq!(archive.len(), 1);
    }

    #[test]
    fn test_entry_hints() {
        assert_eq!(EntryHint::from_path("OEBPS/content.OPF"), EntryHint::Descriptor);
        assert_eq!(EntryHint::from_path("toc.ncx"), EntryHint::Navigation);
        assert_eq!(EntryHint::from_path("Text/ch1.xhtml"), EntryHint::Markup);
        assert_eq!(EntryHint::from_path("Images/cover.JPG"), EntryHint::Image);
        assert_eq!(EntryHint::from_path("Styles/main.css"), EntryHint::Style);
        assert_eq!(EntryHint::from_path("Fonts/serif.otf"), EntryHint::Font);
        assert_eq!(EntryHint::from_path("mimetype"), EntryHint::Other);
    }

    #[test]
    fn test_resolve_href() {
        assert_eq!(resolve_href("OEBPS", "Images/cover.jpg"), "OEBPS/Images/cover.jpg");
        assert_eq!(resolve_href("", "cover.jpg"), "cover.jpg");
        assert_eq!(resolve_href("OEBPS/Text", "../Images/c.png"), "OEBPS/Images/c.png");
        assert_eq!(resolve_href("OEBPS", "Text\\ch1.xhtml"), "OEBPS/Text/ch1.xhtml");
        assert_eq!(resolve_href("OEBPS", "./ch1.xhtml#top"), "OEBPS/ch1.xhtml");
        assert_eq!(resolve_href("OEBPS", "/root.xhtml"), "root.xhtml");
    }

    #[test]
    fn test_resolve_href_percent_decodes() {
        assert_eq!(resolve_href("OEBPS", "Text/Chapter%201.xhtml"), "OEBPS/Text/Chapter 1.xhtml");
        assert_eq!(resolve_href("OEBPS", "Images/%E8%A1%A8%E7%B4%99.jpg#x"), "OEBPS/Images/表紙.jpg");
        // invalid UTF-8 after decoding is kept as written
        assert_eq!(resolve_href("", "bad%FF.xhtml"), "bad%FF.xhtml");
    }

    #[test]
    fn test_from_reader_rejects_oversized_entries() {
        let bytes = zip_bytes(&[("small.txt", b"tiny"), ("big.txt", b"0123456789")]);
        let err = Archive::from_reader_with_limit(Cursor::new(bytes.clone()), 8);
        assert!(matches!(err, Err(ConvertError::Archive(_))));

        let archive = Archive::from_reader_with_limit(Cursor::new(bytes), 10).unwrap();
        assert_eq!(archive.read("big.txt").unwrap(), b"0123456789");
    }

    #[test]
    fn test_from_reader_rejects_encrypted_entries() {
        let mut zip = ZipWriter::new(Cursor::new(Vec::new()));
        zip.start_file("mimetype", SimpleFileOptions::default()).unwrap();
        zip.write_all(b"application/epub+zip").unwrap();
        zip.start_file(
            "OEBPS/content.opf",
            SimpleFileOptions::default().with_deprecated_encryption(b"secret"),
        )
        .unwrap();
        zip.write_all(b"<package/>").unwrap();
        let bytes = zip.finish().unwrap().into_inner();

        let err = Archive::from_reader(Cursor::new(bytes));
        assert!(matches!(err, Err(ConvertError::Archive(_))));
    }

    #[test]
    fn test_path_parts() {
        assert_eq!(parent_dir("OEBPS/content.opf"), "OEBPS");
        assert_eq!(parent_dir("content.opf"), "");
        assert_eq!(file_name("OEBPS/Text/ch1.xhtml"), "ch1.xhtml");
        assert_eq!(file_name("ch1.xhtml"), "ch1.xhtml");
    }
}
