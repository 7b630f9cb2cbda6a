// server/src/cli/cli.rs

use anyhow::{Context, Result};
use clap::Parser;
use env_logger::Env;
use log::debug;

use lib::config::{AppConfig, AppEnvironment};

use crate::cli::commands::{CliArgs, StrokeCommand};
use crate::cli::handlers;

/// `APP_ENV` picks the default filter; `RUST_LOG` overrides it.
fn init_logging() {
    let environment = std::env::var("APP_ENV")
        .ok()
        .and_then(|value| value.parse::<AppEnvironment>().ok())
        .unwrap_or(AppEnvironment::Development);
    let _ = env_logger::Builder::from_env(Env::default().default_filter_or(environment.default_log_filter()))
        .try_init();
}

async fn load_config(args: &CliArgs) -> Result<AppConfig> {
    let mut config = AppConfig::load(args.config.as_deref())
        .await
        .context("Failed to load configuration")?;
    args.overrides.apply(&mut config);
    if let StrokeCommand::Serve { host, port, .. } = &args.command {
        if let Some(host) = host {
            config.server.host = host.clone();
        }
        if let Some(port) = port {
            config.server.port = *port;
        }
    }
    let config = config.validate().context("Invalid command-line override")?;
    debug!("Running with {:?}", config);
    Ok(config)
}

// CLI entry point for stroke-risk
pub async fn start_cli() -> Result<()> {
    // .env has to be read before logging picks its filter.
    let _ = dotenv::dotenv();
    init_logging();

    let args = CliArgs::parse();
    let config = load_config(&args).await?;

    match args.command {
        StrokeCommand::Serve { seed, .. } => handlers::handle_serve(config, seed).await,
        StrokeCommand::Seed => handlers::handle_seed(&config).await,
        StrokeCommand::CreateUser {
            email,
            password,
            name,
            role,
        } => handlers::handle_create_user(&config, email, password, name, role).await,
        StrokeCommand::Rescore => handlers::handle_rescore(&config).await,
        StrokeCommand::Stats { analytics } => handlers::handle_stats(&config, analytics).await,
    }
}
