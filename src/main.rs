use std::path::PathBuf;
use std::sync::Arc;

use anyhow::Context;
use chrono::{DateTime, Utc};
use clap::{Args, Parser, Subcommand};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use content_packs::catalog::catalog_location;
use content_packs::manifest::ManifestResolver;
use content_packs::transport::{self, DefaultTransport, RetryPolicy};
use content_packs::{BootstrapConfig, Environment};

#[derive(Parser)]
#[command(name = "cpk")]
#[command(about = "Inspect content pack manifests and catalog staging plans")]
struct Cli {
    /// JSON config file (defaults to the platform config directory)
    #[arg(long, global = true)]
    config: Option<PathBuf>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Args)]
struct Target {
    /// Base URL or local directory holding packs.json
    base: Option<String>,

    /// Environment: development allows local bases
    #[arg(short, long, value_parser = parse_environment)]
    env: Option<Environment>,

    /// Evaluate eligibility at this RFC 3339 instant instead of now
    #[arg(long)]
    at: Option<DateTime<Utc>>,
}

#[derive(Subcommand)]
enum Commands {
    /// List every pack in the manifest with its eligibility
    Packs {
        #[command(flatten)]
        target: Target,

        /// Print the manifest as JSON
        #[arg(long)]
        json: bool,
    },
    /// Show where each eligible pack's catalog would be staged from
    Plan {
        #[command(flatten)]
        target: Target,
    },
}

fn parse_environment(s: &str) -> Result<Environment, String> {
    Environment::from_str(s).ok_or_else(|| format!("unknown environment '{}'", s))
}

/// Logs go to stderr so stdout carries only command output.
fn init_tracing() {
    let filter = tracing_subscriber::EnvFilter::new(
        std::env::var("RUST_LOG").unwrap_or_else(|_| "content_packs=info,cpk=info".into()),
    );

    tracing_subscriber::registry()
        .with(filter)
        .with(tracing_subscriber::fmt::layer().with_writer(std::io::stderr))
        .init();
}

fn load_config(path: Option<&PathBuf>, target: &Target) -> anyhow::Result<BootstrapConfig> {
    let mut config = match path {
        Some(path) => {
            let mut config = BootstrapConfig::load_file(path)?;
            config.apply_env();
            config
        }
        None => BootstrapConfig::load()?,
    };
    if let Some(base) = &target.base {
        config.base_location = base.clone();
    }
    if let Some(env) = target.env {
        config.environment = env;
    }
    Ok(config)
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();
    init_tracing();

    let target = match &cli.command {
        Commands::Packs { target, .. } | Commands::Plan { target } => target,
    };
    let config = load_config(cli.config.as_ref(), target)?;
    let base = transport::resolve_base(&config.base_location, &config.project_root())
        .context("No base location given (argument, config file or CONTENT_PACKS_BASE)")?;
    let now = target.at.unwrap_or_else(Utc::now);

    let resolver = ManifestResolver::new(
        Arc::new(DefaultTransport::new()),
        config.environment,
        RetryPolicy::from(&config.transport),
    );

    match cli.command {
        Commands::Packs { json, .. } => {
            let manifest = resolver.load_manifest(&base).await?;
            if json {
                println!("{}", serde_json::to_string_pretty(&manifest)?);
                return Ok(());
            }
            println!("manifest version {} ({} packs)", manifest.version, manifest.packs.len());
            for pack in &manifest.packs {
                let status = match pack.release_at() {
                    None => "invalid-date",
                    Some(_) if pack.is_released(now) => "released",
                    Some(_) => "scheduled",
                };
                println!(
                    "{:<12} {:<26} {:<12} {}",
                    pack.id, pack.release_timestamp, status, pack.title
                );
            }
        }
        Commands::Plan { .. } => match resolver.load_eligible(&base, now).await {
            Ok(packs) => {
                for pack in &packs {
                    println!("{} -> {}", pack.id, catalog_location(&base, pack));
                }
            }
            Err(e) if e.is_terminal_notice() => {
                println!("{}", e);
            }
            Err(e) => return Err(e.into()),
        },
    }

    Ok(())
}
