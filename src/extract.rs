//! Manifest walk: copies servable assets into the output folder and picks
//! up the navigation document on the way.

use std::fs;
use std::path::{Component, Path, PathBuf};

use log::{debug, warn};

use crate::archive::Archive;
use crate::error::{ConvertError, Result};
use crate::navigation::NavigationMap;
use crate::package::{MediaKind, PackageDescriptor};
use crate::xml::Namespaces;

/// One manifest item bound for the output folder.
#[derive(Debug)]
pub struct OutputItem<'a> {
    /// Relative to the output folder, `/`-separated
    pub path: String,
    pub bytes: &'a [u8],
    pub kind: MediaKind,
}

/// What a manifest walk produced.
#[derive(Debug, Default)]
pub struct Extraction {
    pub navigation: NavigationMap,
    pub written: Vec<PathBuf>,
}

/// Walk the manifest in order and dispatch every item by kind.
///
/// Documents, images, styles and fonts are written verbatim at their
/// archive path; the first navigation document is parsed instead of
/// written; everything else is skipped. A write failure aborts the walk
/// and leaves whatever was already written in place.
pub fn extract(
    archive: &Archive,
    descriptor: &PackageDescriptor,
    output_folder: &Path,
    ns: &Namespaces,
) -> Result<Extraction> {
    let mut extraction = Extraction::default();
    let mut navigation_seen = false;

    for item in descriptor.items() {
        let path = descriptor.item_path(item);
        let bytes = match archive.read(&path) {
            Ok(bytes) => bytes,
            Err(e) => {
                warn!("Skipping manifest item {}: {e}", item.id);
                continue;
            }
        };

        match item.kind {
            MediaKind::Document | MediaKind::Image | MediaKind::Style | MediaKind::Font => {
                let output = OutputItem {
                    path,
                    bytes,
                    kind: item.kind,
                };
                extraction.written.push(write_item(output_folder, &output)?);
            }
            MediaKind::Navigation if !navigation_seen => {
                navigation_seen = true;
                extraction.navigation = NavigationMap::parse_or_empty(&path, bytes, ns);
                debug!("Navigation {path}: {} entries", extraction.navigation.len());
            }
            MediaKind::Navigation => debug!("Ignoring extra navigation document {path}"),
            MediaKind::Other => {
                debug!("Skipping {path} ({})", item.media_type);
            }
        }
    }

    Ok(extraction)
}

/// Write one item below `output_folder`, creating parent directories.
pub fn write_item(output_folder: &Path, item: &OutputItem<'_>) -> Result<PathBuf> {
    let relative = sanitize_path(&item.path).ok_or_else(|| {
        ConvertError::filesystem(
            output_folder.join(&item.path),
            std::io::Error::new(std::io::ErrorKind::InvalidInput, "unusable entry path"),
        )
    })?;
    let target = output_folder.join(relative);

    if let Some(parent) = target.parent() {
        fs::create_dir_all(parent).map_err(|e| ConvertError::filesystem(parent, e))?;
    }
    fs::write(&target, item.bytes).map_err(|e| ConvertError::filesystem(&target, e))?;

    debug!("Wrote {:?} {}", item.kind, target.display());
    Ok(target)
}

/// Keep only normal components so an entry can never land outside the
/// output folder. `None` if nothing is left.
fn sanitize_path(path: &str) -> Option<PathBuf> {
    let normalized = path.replace('\\', "/");
    let mut sanitized = PathBuf::new();

    for component in Path::new(&normalized).components() {
        if let Component::Normal(part) = component {
            sanitized.push(part);
        }
    }

    if sanitized.as_os_str().is_empty() {
        None
    } else {
        Some(sanitized)
    }
}
