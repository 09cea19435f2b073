//! drivesite CLI: publish Drive folders as a crosslinked static site.
//!
//! Lists the configured folders, converts a bounded batch of new documents,
//! renames them from a keyword list, and regenerates the index and footers.

mod commands;

use clap::Parser;
use color_eyre::eyre::Result;

use commands::Cli;

#[tokio::main]
async fn main() -> Result<()> {
    color_eyre::install()?;
    let cli = Cli::parse();
    commands::init_tracing(&cli);
    commands::run(cli).await
}
