pub mod commands;
pub mod config;
pub mod error;

use std::path::PathBuf;

use buildtask_core::{job::JobRenderer, lifecycle::Lifecycle};
use clap::{Parser, Subcommand};
use factory::factories::observability::Observability;
use tracing::info;

use crate::{
    commands::{
        crd::cmd_crd,
        evaluate::{cmd_evaluate, parse_now, read_observation},
        read_manifest,
        render::cmd_render,
        validate::cmd_validate,
    },
    config::Config,
};

/// Validate, render and step BuildTask resources
#[derive(Parser)]
#[command(name = "buildtask")]
#[command(author, version, about, long_about = None)]
struct Cli {
    /// JSON config file
    #[arg(short, long, global = true, env = "CONFIG")]
    config: Option<PathBuf>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Print the BuildTask CustomResourceDefinition
    Crd,

    /// Check a BuildTask manifest and list every violation
    Validate { manifest: PathBuf },

    /// Print the Job the manifest's current trigger would create
    Render { manifest: PathBuf },

    /// Run one lifecycle step against the status embedded in the manifest
    Evaluate {
        manifest: PathBuf,

        /// Observed execution unit (YAML/JSON); omit when the Job does not exist
        #[arg(short, long)]
        observation: Option<PathBuf>,

        /// Evaluation time (RFC 3339), defaults to now
        #[arg(long)]
        now: Option<String>,
    },
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // These are baked at COMPILE time
    let cargo_crate_name = env!("CARGO_CRATE_NAME");
    let cargo_pkg_version = env!("CARGO_PKG_VERSION");

    dotenvy::dotenv().ok();

    let cli = Cli::parse();
    let cfg = Config::init(cli.config.as_deref()).await?;

    let _guard = Observability::init(&cfg.observability, cargo_crate_name, cargo_pkg_version).await?;

    info!("🚀 {} v{} starting", cargo_crate_name, cargo_pkg_version);

    let output = match cli.command {
        Commands::Crd => cmd_crd()?,
        Commands::Validate { manifest } => cmd_validate(&read_manifest(&manifest)?)?,
        Commands::Render { manifest } => {
            cmd_render(&JobRenderer::new(cfg.render), &read_manifest(&manifest)?)?
        }
        Commands::Evaluate {
            manifest,
            observation,
            now,
        } => {
            let task = read_manifest(&manifest)?;
            let observation = observation.as_deref().map(read_observation).transpose()?;
            let now = parse_now(now.as_deref())?;

            let evaluation = cmd_evaluate(Lifecycle::new(cfg.render), &task, observation, now)?;
            serde_yaml::to_string(&evaluation)?
        }
    };

    print!("{}", output);

    Ok(())
}
