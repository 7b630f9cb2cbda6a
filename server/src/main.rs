// server/src/main.rs

// Entry point for the stroke-risk binary. Argument parsing and dispatch
// live in the cli module.

use anyhow::Result;
use stroke_risk_server::cli::cli::start_cli;

#[tokio::main]
async fn main() -> Result<()> {
    start_cli().await
}
