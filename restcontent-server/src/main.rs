use anyhow::Result;
use clap::Parser;
use metrics_exporter_prometheus::PrometheusBuilder;
use std::sync::Arc;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

use restcontent::api::{ApiServer, KeyChecker};
use restcontent::media::MediaLibrary;
use restcontent::store::Store;
use restcontent::{BackupService, Config};

#[derive(Parser, Debug)]
#[command(name = "restcontent-server")]
#[command(about = "Backup and restore server for restcontent sites")]
#[command(version)]
struct Args {
    /// Configuration file path
    #[arg(short, long, default_value = "./conf/restcontent.toml")]
    config: String,

    /// Host to bind to, overrides server.bind_addr
    #[arg(long)]
    host: Option<String>,

    /// Port to listen on, overrides server.bind_addr
    #[arg(short, long)]
    port: Option<u16>,
}

fn init_tracing(config: &Config) {
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(&config.observability.log_level));
    let format = std::env::var("LOG_FORMAT")
        .unwrap_or_else(|_| config.observability.log_format.clone());

    let registry = tracing_subscriber::registry().with(filter);
    if format.eq_ignore_ascii_case("json") {
        registry.with(tracing_subscriber::fmt::layer().json()).init();
    } else {
        registry.with(tracing_subscriber::fmt::layer()).init();
    }
}

fn bind_addr(config: &Config, args: &Args) -> String {
    let (default_host, default_port) = config
        .server
        .bind_addr
        .rsplit_once(':')
        .unwrap_or((config.server.bind_addr.as_str(), "8080"));
    let host = args.host.as_deref().unwrap_or(default_host);
    match args.port {
        Some(port) => format!("{host}:{port}"),
        None => format!("{host}:{default_port}"),
    }
}

#[tokio::main]
async fn main() -> Result<()> {
    let args = Args::parse();

    let config = Config::load_or_create(std::path::Path::new(&args.config))?;
    init_tracing(&config);
    config.ensure_dirs()?;

    tracing::info!("Config file: {}", args.config);

    let store = Store::open(&config.store.database_path)?;
    let storage = restcontent_storage::create_storage(&config.storage_config())?;
    tracing::info!(
        "Media stored on {} at {}",
        storage.backend_name(),
        config.media.upload_dir.display()
    );
    let media = Arc::new(MediaLibrary::new(storage, &config.media.prefix));

    let service = Arc::new(BackupService::new(store, media, &config));
    let checker = KeyChecker::new(&config.security, &config.media.prefix);
    let server = ApiServer::new(service, &config.server, checker);

    let addr = bind_addr(&config, &args);
    if config.security.enabled {
        tracing::info!("API key authentication enabled ({} keys)", config.security.api_keys.len());
    }

    if config.observability.metrics_enabled {
        let handle = PrometheusBuilder::new().install_recorder()?;
        let metrics = axum::Router::new().route(
            "/metrics",
            axum::routing::get(move || {
                let handle = handle.clone();
                async move { handle.render() }
            }),
        );
        server.serve_with(&addr, metrics).await?;
    } else {
        server.serve(&addr).await?;
    }

    Ok(())
}
