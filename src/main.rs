//! CareGrid resilience monitor
//!
//! Runs breakers, probes, synthetic transactions and alerting behind the
//! admin HTTP API until interrupted.

#![allow(missing_docs)]

use anyhow::Context;
use caregrid_resilience::server::HttpServer;
use caregrid_resilience::utils::init_tracing;
use caregrid_resilience::{Config, MonitoringSystem};
use clap::Parser;
use std::path::PathBuf;
use std::process::ExitCode;
use tracing::info;

const DEFAULT_CONFIG_PATH: &str = "config/resilience.yaml";

#[derive(Debug, Parser)]
#[command(name = "resilience-monitor", version, about)]
struct Cli {
    /// YAML configuration file
    #[arg(short, long, env = "RESILIENCE_CONFIG")]
    config: Option<PathBuf>,

    /// Override the admin API bind host
    #[arg(long)]
    host: Option<String>,

    /// Override the admin API port
    #[arg(short, long)]
    port: Option<u16>,

    /// Print the effective configuration and exit
    #[arg(long)]
    print_config: bool,
}

async fn load_config(cli: &Cli) -> anyhow::Result<Config> {
    let mut config = match &cli.config {
        Some(path) => Config::from_file(path)
            .await
            .with_context(|| format!("loading {}", path.display()))?,
        None if tokio::fs::try_exists(DEFAULT_CONFIG_PATH).await.unwrap_or(false) => {
            Config::from_file(DEFAULT_CONFIG_PATH)
                .await
                .with_context(|| format!("loading {}", DEFAULT_CONFIG_PATH))?
        }
        None => Config::default(),
    };

    config.apply_env().context("applying environment overrides")?;
    if let Some(host) = &cli.host {
        config.server.host = host.clone();
    }
    if let Some(port) = cli.port {
        config.server.port = port;
    }
    config.validate().context("validating configuration")?;
    Ok(config)
}

async fn run(cli: Cli) -> anyhow::Result<()> {
    let config = load_config(&cli).await?;

    if cli.print_config {
        print!("{}", config.to_yaml()?);
        return Ok(());
    }

    init_tracing(&config.logging);
    info!(
        "Starting {} v{}",
        caregrid_resilience::NAME,
        caregrid_resilience::VERSION
    );

    let monitoring = MonitoringSystem::new(&config).context("building monitoring system")?;
    monitoring.start();

    let served = HttpServer::new(&config.server, monitoring.clone())
        .start_with_shutdown(async {
            let _ = tokio::signal::ctrl_c().await;
        })
        .await;

    monitoring.stop();
    served.context("admin API")?;
    Ok(())
}

#[tokio::main]
async fn main() -> ExitCode {
    dotenvy::dotenv().ok();

    match run(Cli::parse()).await {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            eprintln!("Error: {:#}", e);
            ExitCode::FAILURE
        }
    }
}
