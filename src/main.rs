mod ai_client;
mod ai_imagery;
mod ai_summarizer;
mod ai_writer;
mod app;
mod config;
mod dashboards;
mod error;
mod extractor;
mod logger;
mod models;
mod pipeline;
mod retriever;
mod session;
mod trends;
mod utils;

use std::path::PathBuf;

use anyhow::Result;
use clap::Parser;

use crate::app::Command;

#[derive(Parser)]
#[command(name = "trendspot")]
#[command(about = "Trending search terms, news summaries and marketing copy")]
struct Cli {
    /// Read the config from this file instead of the XDG location
    #[arg(long, global = true)]
    config: Option<PathBuf>,

    /// Also log debug output to the console
    #[arg(short, long, global = true)]
    verbose: bool,

    #[command(subcommand)]
    command: Command,
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();
    app::run(cli.command, cli.config, cli.verbose).await
}
