//! Outreach CLI: personalized outreach messages from a company website and a
//! lead profile.
//!
//! Crawls the company site, summarizes it, indexes its text for retrieval and
//! writes a message tailored to one lead. Every intermediate result is cached
//! per company and per lead, so reruns resume where they stopped.

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
