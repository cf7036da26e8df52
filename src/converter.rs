use std::fs;
use std::path::{Path, PathBuf};

use log::info;

use crate::archive::Archive;
use crate::cover;
use crate::error::{ConvertError, Result};
use crate::extract;
use crate::metadata::{self, DEFAULT_TITLE};
use crate::package::{self, PackageDescriptor};
use crate::xml::Namespaces;

/// Folder under the destination root that holds one folder per book.
pub const CONVERTED_DIR: &str = "convertedEpubs";

/// Unpack `epub_path` into `dest_dir/convertedEpubs/<title>/` and write its
/// `metadata.json`. Returns the book's output folder.
pub fn convert(epub_path: &Path, dest_dir: &Path) -> Result<PathBuf> {
    let ns = Namespaces::default();
    convert_with(epub_path, dest_dir, &ns)
}

pub fn convert_with(epub_path: &Path, dest_dir: &Path, ns: &Namespaces) -> Result<PathBuf> {
    let archive = Archive::open(epub_path)?;

    let descriptor_path = package::locate(&archive, ns)?;
    let descriptor =
        PackageDescriptor::parse(&descriptor_path, archive.read(&descriptor_path)?, ns)?;

    let output_folder = output_folder(dest_dir, metadata::resolved_title(&descriptor));
    fs::create_dir_all(&output_folder)
        .map_err(|e| ConvertError::filesystem(&output_folder, e))?;

    let cover = cover::resolve(&archive, &descriptor, ns);
    let extraction = extract::extract(&archive, &descriptor, &output_folder, ns)?;
    let book = metadata::assemble(&descriptor, cover, &extraction.navigation, &output_folder);
    metadata::write_metadata(&book, &output_folder)?;

    info!(
        "Extracted {} files and {} chapters to {}",
        extraction.written.len(),
        book.chapters.len(),
        output_folder.display()
    );

    Ok(output_folder)
}

/// `dest_dir/convertedEpubs/<sanitized title>`
pub fn output_folder(dest_dir: &Path, title: &str) -> PathBuf {
    dest_dir.join(CONVERTED_DIR).join(sanitize_title(title))
}

/// Strip characters that are invalid in directory names on common
/// filesystems: `< > : " / \ | ? *` and control characters below U+0020.
///
/// Falls back to the default title when nothing usable remains. Distinct
/// titles may still collide after sanitizing.
pub fn sanitize_title(title: &str) -> String {
    let cleaned: String = title
        .chars()
        .filter(|c| !matches!(c, '<' | '>' | ':' | '"' | '/' | '\\' | '|' | '?' | '*'))
        .filter(|c| u32::from(*c) > 0x1f)
        .collect();

    if cleaned.trim().trim_matches('.').trim().is_empty() {
        DEFAULT_TITLE.to_string()
    } else {
        cleaned
    }
}
