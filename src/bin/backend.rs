use std::{net::SocketAddr, path::PathBuf, sync::Arc};

use anyhow::{Context, Result};
use clap::Parser;
use mediagrab::{
    api::{AppState, router},
    config::{DEFAULT_CONFIG_PATH, load_server_config_from},
    download::Downloader,
    engine::ExtractionEngine,
    instagram::InstagramGraphql,
    resolver::Resolvers,
    ytdlp::YtDlp,
};
use tokio::signal;
use tracing::{info, warn};
use tracing_subscriber::EnvFilter;

#[derive(Parser, Debug)]
#[command(
    author,
    version,
    about = "HTTP API resolving and downloading Instagram and YouTube media."
)]
struct Cli {
    #[arg(
        long = "config",
        value_name = "PATH",
        default_value = DEFAULT_CONFIG_PATH,
        help = "Path to the config file"
    )]
    config: PathBuf,
    #[arg(long = "host", value_name = "ADDR", help = "Override the listen address")]
    host: Option<String>,
    #[arg(short = 'p', long = "port", value_name = "PORT", help = "Override the listen port")]
    port: Option<u16>,
}

#[tokio::main]
async fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| EnvFilter::new("mediagrab=info,backend=info,tower_http=info")),
        )
        .init();

    let cli = Cli::parse();
    let mut config = load_server_config_from(&cli.config)
        .with_context(|| format!("loading {}", cli.config.display()))?;
    if let Some(host) = cli.host {
        config.api_host = host;
    }
    if let Some(port) = cli.port {
        config.api_port = port;
    }

    let mut temp = tempfile::Builder::new();
    temp.prefix("mediagrab-");
    let temp_dir = match &config.temp_root {
        Some(root) => temp
            .tempdir_in(root)
            .with_context(|| format!("creating temp dir in {}", root.display()))?,
        None => temp.tempdir().context("creating temp dir")?,
    };
    info!("Temporary directory: {}", temp_dir.path().display());

    let ytdlp = YtDlp::new(&config.ytdlp_path).with_cookies(config.cookies_file.clone());
    match ytdlp.version() {
        Ok(version) => info!("using yt-dlp {version}"),
        Err(err) => warn!("{err:#}"),
    }
    let engine: Arc<dyn ExtractionEngine> = Arc::new(ytdlp);
    let posts = Arc::new(InstagramGraphql::new(config.instagram_doc_id.clone()));

    let state = AppState::new(
        Resolvers::new(engine.clone(), posts),
        Downloader::new(engine, temp_dir.path()),
    );
    let app = router(state, &config.allowed_origins);

    let addr = SocketAddr::new(
        config
            .api_host
            .parse()
            .with_context(|| format!("parsing listen address {}", config.api_host))?,
        config.api_port,
    );
    let listener = tokio::net::TcpListener::bind(addr)
        .await
        .with_context(|| format!("binding to {}", addr))?;
    info!("Video Downloader API listening on http://{}", addr);

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await
        .context("running API server")?;

    // Dropping the guard removes everything downloaded during this run.
    drop(temp_dir);
    Ok(())
}

async fn shutdown_signal() {
    if let Err(err) = signal::ctrl_c().await {
        warn!("Failed to install Ctrl+C handler: {}", err);
    }
}
