//! Cover image resolution.
//!
//! Three conventions are tried in order and the first hit wins:
//!
//! 1. EPUB 2 `<meta name="cover" content="item-id"/>`
//! 2. EPUB 3 manifest item with `properties="cover-image"`
//! 3. a spine entry with id `cover` whose page embeds the image
//!
//! A miss in every tier is normal for some books and yields `None`.

use log::debug;

use crate::archive::{parent_dir, resolve_href, Archive};
use crate::package::PackageDescriptor;
use crate::xml::{self, Namespaces};

type CoverTier = fn(&Archive, &PackageDescriptor, &Namespaces) -> Option<String>;

const TIERS: [(&str, CoverTier); 3] = [
    ("meta cover", from_meta_cover),
    ("cover-image property", from_cover_image_property),
    ("spine cover page", from_spine_cover_page),
];

/// Archive path of the cover image, if the book declares one.
pub fn resolve(archive: &Archive, descriptor: &PackageDescriptor, ns: &Namespaces) -> Option<String> {
    for (name, tier) in TIERS {
        if let Some(path) = tier(archive, descriptor, ns) {
            debug!("Cover resolved via {name}: {path}");
            return Some(path);
        }
    }
    debug!("No cover declared");
    None
}

fn from_meta_cover(_: &Archive, descriptor: &PackageDescriptor, _: &Namespaces) -> Option<String> {
    let id = descriptor.meta("cover")?;
    let item = descriptor.item(id)?;
    Some(resolve_href(descriptor.base_dir(), &item.href))
}

fn from_cover_image_property(
    _: &Archive,
    descriptor: &PackageDescriptor,
    _: &Namespaces,
) -> Option<String> {
    let item = descriptor
        .items()
        .iter()
        .find(|item| item.has_property("cover-image"))?;
    Some(resolve_href(descriptor.base_dir(), &item.href))
}

fn from_spine_cover_page(
    archive: &Archive,
    descriptor: &PackageDescriptor,
    ns: &Namespaces,
) -> Option<String> {
    let idref = descriptor.spine().iter().find(|idref| *idref == "cover")?;
    let item = descriptor.item(idref)?;
    let page_path = descriptor.item_path(item);
    let bytes = archive.read(&page_path).ok()?;

    let doc = match xml::parse_document(&page_path, bytes) {
        Ok(doc) => doc,
        Err(e) => {
            debug!("Cover page unreadable: {e}");
            return None;
        }
    };

    // The image reference is relative to the cover page itself.
    let src = doc.descendants().find_map(|node| {
        if xml::is_element(node, ns.xhtml, "img") {
            node.attribute("src")
        } else if xml::is_element(node, ns.svg, "image") {
            node.attribute((ns.xlink, "href")).or_else(|| node.attribute("href"))
        } else {
            None
        }
    })?;
    Some(resolve_href(parent_dir(&page_path), src))
}
