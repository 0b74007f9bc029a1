use std::path::PathBuf;

use clap::Parser;
use tracing_subscriber::EnvFilter;

use callbridge::routes::build_router;
use callbridge::{AppState, ServerConfig};

#[derive(Debug, Parser)]
#[command(name = "callbridge", version, about = "Telephony to realtime-AI voice bridge")]
struct Cli {
    /// Path to a YAML configuration file; environment variables fill any gaps
    #[arg(short, long, value_name = "FILE")]
    config: Option<PathBuf>,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    dotenvy::dotenv().ok();

    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| EnvFilter::new("callbridge=info,tower_http=info")),
        )
        .init();

    // rustls 0.23 wants an explicit process-wide crypto provider when more
    // than one backend is linked.
    let _ = rustls::crypto::ring::default_provider().install_default();

    let cli = Cli::parse();
    let config = match &cli.config {
        Some(path) => ServerConfig::from_file(path)?,
        None => ServerConfig::from_env()?,
    };

    let address = config.address();
    let app = build_router(AppState::new(config));
    let listener = tokio::net::TcpListener::bind(&address).await?;
    tracing::info!("callbridge listening on {address}");
    axum::serve(listener, app).await?;
    Ok(())
}
