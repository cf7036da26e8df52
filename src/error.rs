/// Error types for EPUB extraction
use std::io;
use std::path::PathBuf;

/// Result type alias for extraction operations
pub type Result<T> = std::result::Result<T, ConvertError>;

/// Errors that can abort a conversion run
#[derive(Debug, thiserror::Error)]
pub enum ConvertError {
    /// Input is not a readable zip container
    #[error("Invalid EPUB archive: {0}")]
    Archive(#[from] zip::result::ZipError),

    /// Entry not present in the archive
    #[error("Missing archive entry: {0}")]
    NotFound(String),

    /// No package descriptor could be located
    #[error("Malformed container: {0}")]
    MalformedContainer(String),

    /// XML document is not well-formed
    #[error("Failed to parse XML in {path}: {message}")]
    XmlParse { path: String, message: String },

    /// Directory creation or file write failed
    #[error("Failed to write {}: {source}", .path.display())]
    Filesystem {
        path: PathBuf,
        #[source]
        source: io::Error,
    },

    /// Metadata serialization failed
    #[error("Failed to serialize metadata: {0}")]
    Json(#[from] serde_json::Error),
}

impl ConvertError {
    pub(crate) fn filesystem(path: impl Into<PathBuf>, source: io::Error) -> Self {
        Self::Filesystem {
            path: path.into(),
            source,
        }
    }

    pub(crate) fn xml(path: &str, message: impl ToString) -> Self {
        Self::XmlParse {
            path: path.to_string(),
            message: message.to_string(),
        }
    }
}
