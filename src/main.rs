mod cli;

use anyhow::{Context, Result};
use clap::Parser;

fn main() -> Result<()> {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info"))
        .target(env_logger::Target::Stderr)
        .init();

    let cli = cli::Cli::parse();
    let folder = epub2dir::convert(&cli.input, &cli.dest_dir)
        .with_context(|| format!("Failed to convert EPUB: {}", cli.input.display()))?;

    println!("{}", folder.display());
    Ok(())
}
