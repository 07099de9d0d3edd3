mod config;
mod diff;
mod error;
mod gh;
mod github;
mod server;
mod types;

use anyhow::{Context, Result};
use clap::Parser;
use std::net::{IpAddr, SocketAddr};
use std::path::PathBuf;
use std::sync::Arc;
use tracing_subscriber::EnvFilter;

use crate::config::Config;
use crate::gh::{check_gh_cli, GhCli};
use crate::server::{routes, AppState};

const LOGO: &str = r#"
  指摘
  shiteki
"#;

#[derive(Parser)]
#[command(name = "shiteki")]
#[command(about = "Browse unresolved review comments on your PRs in the current repository")]
#[command(version)]
struct Args {
    /// Port to listen on (overrides SHITEKI_PORT / PORT and the config file)
    #[arg(short, long)]
    port: Option<u16>,

    /// Address to bind
    #[arg(long)]
    host: Option<String>,

    /// Default PR state filter: open, closed, merged or all
    #[arg(short, long)]
    state: Option<String>,

    /// Config file (default: ~/.config/shiteki/config.toml)
    #[arg(short, long)]
    config: Option<PathBuf>,
}

fn init_logging() {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    let _ = tracing_subscriber::fmt().with_env_filter(filter).try_init();
}

/// Defaults, then the config file, then the environment, then flags
fn load_config(args: &Args) -> Result<Config> {
    let mut config = match &args.config {
        Some(path) => Config::load_from(path),
        None => Config::load(),
    };
    config.apply_env(|key| std::env::var(key).ok());

    if let Some(port) = args.port {
        config.server.port = port;
    }
    if let Some(host) = &args.host {
        config.server.host = host.clone();
    }
    if let Some(state) = &args.state {
        config.listing.default_state = state.clone();
    }

    // Fail at startup rather than on every page load.
    config.default_state()?;
    Ok(config)
}

#[tokio::main]
async fn main() -> Result<()> {
    let args = Args::parse();
    init_logging();

    eprintln!("{}", LOGO);

    let config = load_config(&args)?;

    // Check gh CLI is available
    let gh = Arc::new(GhCli::default());
    check_gh_cli(gh.as_ref()).await?;

    let ip: IpAddr = config
        .server
        .host
        .parse()
        .with_context(|| format!("invalid host address '{}'", config.server.host))?;
    let addr = SocketAddr::new(ip, config.server.port);

    let state = AppState::new(gh, config).context("failed to load page templates")?;
    let (bound, server) = warp::serve(routes(state))
        .try_bind_ephemeral(addr)
        .with_context(|| format!("failed to bind {}", addr))?;

    tracing::info!(addr = %bound, "serving review comments");
    eprintln!("Open http://{} in your browser", bound);

    server.await;
    Ok(())
}
