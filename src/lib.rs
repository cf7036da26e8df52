//! Unpacks EPUB books into plain, directly-servable files plus a
//! `metadata.json` manifest (title, author, cover and chapter list) for
//! reading-app front ends.
//!
//! ```no_run
//! use std::path::Path;
//!
//! let folder = epub2dir::convert(Path::new("book.epub"), Path::new("/srv/library")).unwrap();
//! println!("unpacked into {}", folder.display());
//! ```

pub mod archive;
pub mod converter;
pub mod cover;
pub mod error;
pub mod extract;
pub mod metadata;
pub mod navigation;
pub mod package;
pub mod xml;

pub use converter::{convert, convert_with, sanitize_title};
pub use error::{ConvertError, Result};
pub use metadata::{BookMetadata, ChapterEntry};
pub use xml::Namespaces;
