mod ai_client;
mod app;
mod category;
mod config;
mod content;
mod error;
mod fetcher;
mod image;
mod logger;
mod models;
mod publisher;
mod sequence;
mod template;

use std::path::PathBuf;

use anyhow::Result;
use clap::Parser;

#[derive(Parser)]
#[command(name = "dailypost")]
#[command(about = "Daily market news post generator")]
struct Cli {
    /// Settings document (defaults to the XDG config location)
    #[arg(long)]
    settings: Option<PathBuf>,

    /// Use this weekday's category instead of today's (0 = Monday)
    #[arg(long, value_parser = clap::value_parser!(u8).range(0..=6))]
    weekday: Option<u8>,

    /// Skip image generation (image filenames are still recorded)
    #[arg(long)]
    no_image: bool,

    /// Print info-level logs to the console
    #[arg(short, long)]
    verbose: bool,
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();
    app::run_generator(app::RunOptions {
        settings_path: cli.settings,
        weekday: cli.weekday.map(usize::from),
        no_image: cli.no_image,
        verbose: cli.verbose,
    })
    .await
}
