use clap::Parser;
use std::path::PathBuf;

/// Unpack an EPUB into loose files plus a metadata.json manifest
#[derive(Parser, Debug)]
#[command(name = "epub2dir", version, about)]
pub struct Cli {
    /// Path to the input EPUB file
    pub input: PathBuf,

    /// Destination root. The book lands in <DEST_DIR>/convertedEpubs/<title>/
    #[arg(default_value = ".")]
    pub dest_dir: PathBuf,
}
