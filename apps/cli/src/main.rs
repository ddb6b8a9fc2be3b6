//! chatdesk CLI — customer-support chat and knowledge-base administration.
//!
//! Runs an embeddable-chat session against the support backend, and gives
//! administrators the department CRUD and knowledge-ingestion staging tools.

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
