//! repodesk - serve a browser IDE over local clones of GitHub repositories

use std::path::PathBuf;

use anyhow::Context;
use clap::Parser;
use colored::Colorize;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

use repodesk::config::AppConfig;

/// Clone GitHub repositories, edit their files and chat about the code
#[derive(Parser)]
#[command(name = "repodesk")]
#[command(author, version, about, long_about = None)]
struct Cli {
    /// Path to the YAML configuration file
    #[arg(short, long, default_value = "config.yaml")]
    config: PathBuf,

    /// Address to bind (overrides app.host)
    #[arg(long)]
    host: Option<String>,

    /// Port to listen on (overrides app.port)
    #[arg(short, long)]
    port: Option<u16>,

    /// Directory holding cloned repositories (overrides github.repos_directory)
    #[arg(long)]
    repos_dir: Option<PathBuf>,

    /// Enable debug logging
    #[arg(short, long)]
    verbose: bool,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    let mut config = match AppConfig::load(&cli.config) {
        Ok(config) => {
            init_logging(cli.verbose || config.app.debug)?;
            config
        }
        Err(e) => {
            init_logging(cli.verbose)?;
            return Err(e).context("failed to load configuration");
        }
    };
    if !cli.config.exists() {
        tracing::warn!(
            "Configuration file not found at {}, using defaults",
            cli.config.display()
        );
    }
    config.apply_env();

    if let Some(host) = cli.host {
        config.app.host = host;
    }
    if let Some(port) = cli.port {
        config.app.port = port;
    }
    if let Some(dir) = cli.repos_dir {
        config.github.repos_directory = dir;
    }

    print_banner(&config);
    repodesk::server::run(config).await
}

fn init_logging(debug: bool) -> anyhow::Result<()> {
    let default = if debug {
        "repodesk=debug,tower_http=debug"
    } else {
        "repodesk=info"
    };
    let filter = EnvFilter::try_from_default_env().or_else(|_| EnvFilter::try_new(default))?;

    tracing_subscriber::registry()
        .with(tracing_subscriber::fmt::layer().with_target(false))
        .with(filter)
        .init();
    Ok(())
}

fn print_banner(config: &AppConfig) {
    println!();
    println!("  {}", "repodesk".cyan().bold());
    println!(
        "  {} http://{}:{}",
        "Listening on".dimmed(),
        config.app.host,
        config.app.port
    );
    println!(
        "  {} {}",
        "Repositories:".dimmed(),
        config.github.repos_directory.display()
    );
    if config.openrouter.api_key.is_empty() {
        println!(
            "  {} chat disabled, set OPENROUTER_API_KEY to enable it",
            "!".yellow()
        );
    } else {
        println!("  {} chat model {}", "✓".green(), config.openrouter.default_model);
    }
    println!();
}
