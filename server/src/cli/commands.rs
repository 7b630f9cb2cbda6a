// server/src/cli/commands.rs

// Command-line arguments and subcommands for the stroke-risk binary.
use clap::{Args, Parser, Subcommand, ValueEnum};
use std::path::PathBuf;

use lib::config::{AppConfig, ScorerKind, StorageEngineType};
use models::medical::Role;

#[derive(Debug, Parser)]
#[command(name = "stroke-risk")]
#[command(version = "0.1.0")]
#[command(about = "Stroke risk patient records and predictions")]
pub struct CliArgs {
    /// YAML configuration file.
    #[arg(long, short = 'c', env = "STROKE_CONFIG", global = true)]
    pub config: Option<PathBuf>,

    #[command(flatten)]
    pub overrides: ConfigOverrides,

    #[command(subcommand)]
    pub command: StrokeCommand,
}

/// Flags that win over the file and the environment.
#[derive(Debug, Default, Args, PartialEq)]
pub struct ConfigOverrides {
    /// Directory of the embedded database.
    #[arg(long, global = true)]
    pub data_dir: Option<PathBuf>,
    /// Model artifact (JSON).
    #[arg(long, global = true)]
    pub model: Option<PathBuf>,
    #[arg(long, value_enum, global = true)]
    pub scorer: Option<ScorerArg>,
    /// Keep everything in memory; nothing survives the process.
    #[arg(long, global = true)]
    pub in_memory: bool,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum ScorerArg {
    Model,
    Points,
}

impl From<ScorerArg> for ScorerKind {
    fn from(arg: ScorerArg) -> Self {
        match arg {
            ScorerArg::Model => ScorerKind::Model,
            ScorerArg::Points => ScorerKind::Points,
        }
    }
}

impl ConfigOverrides {
    pub fn apply(&self, config: &mut AppConfig) {
        if let Some(dir) = &self.data_dir {
            config.storage.data_directory = dir.clone();
        }
        if let Some(model) = &self.model {
            config.model.artifact_path = model.clone();
        }
        if let Some(scorer) = self.scorer {
            config.model.scorer = scorer.into();
        }
        if self.in_memory {
            config.storage.engine_type = StorageEngineType::InMemory;
        }
    }
}

#[derive(Debug, Subcommand, PartialEq)]
pub enum StrokeCommand {
    /// Run the HTTP API until Ctrl-C.
    Serve {
        #[arg(long)]
        host: Option<String>,
        #[arg(long, short = 'p')]
        port: Option<u16>,
        /// Load the sample patients first if the store is empty.
        #[arg(long)]
        seed: bool,
    },
    /// Load the sample patients into an empty store.
    Seed,
    /// Create a user account.
    CreateUser {
        #[arg(long)]
        email: String,
        #[arg(long)]
        password: String,
        #[arg(long)]
        name: String,
        #[arg(long, default_value = "doctor")]
        role: Role,
    },
    /// Recompute every stored prediction with the current scorer.
    Rescore,
    /// Print dashboard figures as JSON.
    Stats {
        #[arg(long)]
        analytics: bool,
    },
}
