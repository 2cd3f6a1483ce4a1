mod app;
mod attachment;
mod avatar;
mod config;
mod conversation;
mod gateway;
mod gemini;
mod input;
mod logging;
mod model;
mod mood;
mod persona;
mod render;
mod sim;

use anyhow::Result;
use clap::Parser;

#[tokio::main]
async fn main() -> Result<()> {
    let cli = config::Cli::parse();
    app::run(cli).await
}
