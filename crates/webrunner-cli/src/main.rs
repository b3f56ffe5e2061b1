use std::path::PathBuf;
use std::sync::Arc;

use anyhow::{Context, Result};
use clap::{Parser, ValueEnum};
use tracing_subscriber::{EnvFilter, fmt};
use webrunner_core::{EventBus, Platform, RunnerConfig};
use webrunner_runtime::{BackingServer, Collaborators, WebRunner};

mod driver;
mod output;
mod server;
mod stubs;

use server::StaticServer;
use stubs::{LoggingPrompter, StdoutView, StubMessaging};

#[derive(Debug, Clone, Copy, ValueEnum)]
enum PlatformArg {
    Android,
    Ios,
}

impl From<PlatformArg> for Platform {
    fn from(arg: PlatformArg) -> Self {
        match arg {
            PlatformArg::Android => Platform::Android,
            PlatformArg::Ios => Platform::Ios,
        }
    }
}

#[derive(Parser)]
#[command(
    name = "webrunner",
    about = "WebRunner headless driver — reads envelopes and host commands on stdin, writes view effects and events to stdout"
)]
struct Cli {
    /// Path to webrunner.toml (default: ~/.webrunner/webrunner.toml)
    #[arg(long)]
    config: Option<PathBuf>,

    /// Override the host platform from the config file
    #[arg(long, value_enum)]
    platform: Option<PlatformArg>,

    /// Directory served under /site when running as ios
    #[arg(long)]
    bundle_dir: Option<PathBuf>,

    /// Wait for an explicit :activate instead of activating on startup
    #[arg(long)]
    no_activate: bool,
}

#[tokio::main]
async fn main() -> Result<()> {
    // Logs go to stderr so stdout stays a clean line protocol
    fmt()
        .with_env_filter(EnvFilter::from_env("WEBRUNNER_LOG"))
        .with_writer(std::io::stderr)
        .init();

    let cli = Cli::parse();

    let config_path = cli.config.unwrap_or_else(RunnerConfig::default_path);
    let mut config = RunnerConfig::load_or_default(&config_path)
        .with_context(|| format!("failed to load config from {}", config_path.display()))?;
    if let Some(platform) = cli.platform {
        config.host.platform = platform.into();
    }

    tracing::info!(
        platform = %config.host.platform,
        config = %config_path.display(),
        "Starting WebRunner headless driver"
    );

    let server: Option<Arc<dyn BackingServer>> = match config.host.platform {
        Platform::Ios => {
            let server = StaticServer::new(config.host.server_port, cli.bundle_dir);
            Some(Arc::new(server) as Arc<dyn BackingServer>)
        }
        Platform::Android => None,
    };
    let host = Collaborators {
        view: Arc::new(StdoutView),
        server,
        messaging: Arc::new(StubMessaging),
        prompter: Arc::new(LoggingPrompter),
    };

    let bus = EventBus::new();
    let events = bus.subscribe();
    let (runner, task) = WebRunner::spawn(config, host, bus);
    if !cli.no_activate {
        runner.activate()?;
    }

    driver::run(&runner, events).await?;

    drop(runner);
    task.await.context("runner task panicked")?;
    tracing::info!("WebRunner headless driver shutting down");
    Ok(())
}
