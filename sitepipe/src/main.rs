use anyhow::Context;
use clap::Parser;
use sitepipe::app::App;
use sitepipe::config::{AppOptions, SiteConfig};
use sitepipe::observability::init_tracing;
use std::path::PathBuf;
use tracing::info;

#[derive(Parser)]
#[command(name = "sitepipe")]
#[command(about = "Serve a template and static file site through the sitepipe pipeline", long_about = None)]
struct Cli {
    /// TOML configuration file.
    #[arg(short, long)]
    config: Option<PathBuf>,

    /// Site root; overrides `router.base_path`.
    #[arg(short, long)]
    base_path: Option<PathBuf>,

    /// Listen host; overrides `listen.host`.
    #[arg(long)]
    host: Option<String>,

    /// Listen port; overrides `listen.port`.
    #[arg(short, long)]
    port: Option<u16>,

    /// Write logs as JSON lines.
    #[arg(long)]
    json_logs: bool,
}

impl Cli {
    fn site_config(&self) -> anyhow::Result<SiteConfig> {
        let mut config = match &self.config {
            Some(path) => SiteConfig::load(path)
                .with_context(|| format!("loading config from {}", path.display()))?,
            None => SiteConfig::default(),
        };

        if let Some(base_path) = &self.base_path {
            config.router.base_path.clone_from(base_path);
        }
        if let Some(host) = &self.host {
            config.listen.host.clone_from(host);
        }
        if let Some(port) = self.port {
            config.listen.port = port;
        }
        Ok(config)
    }
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();
    init_tracing(cli.json_logs);

    let config = cli.site_config()?;
    let mut app = App::new(AppOptions::from_config(config)).context("building app")?;
    let addr = app.start().await.context("starting listener")?;
    info!(address = %addr, "Press Ctrl+C to stop");

    tokio::signal::ctrl_c()
        .await
        .context("waiting for shutdown signal")?;
    info!("Shutdown signal received");

    app.stop().await.context("stopping listener")?;
    Ok(())
}
