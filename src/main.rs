use clap::Parser;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

mod config;
mod error;
mod lineart;
mod server;

#[derive(Parser, Debug)]
#[command(name = "lineart-server")]
#[command(about = "Converts photographs into black-and-white line art over HTTP")]
#[command(version)]
pub struct Args {
    /// Host address to bind to
    #[arg(long, env = "LINEART_HOST", default_value = "0.0.0.0")]
    pub host: String,

    /// Port to listen on
    #[arg(long, env = "LINEART_PORT", default_value = "8000")]
    pub port: u16,

    /// Maximum request body size in bytes (default: 50MB)
    #[arg(long, env = "LINEART_MAX_BODY_SIZE", default_value = "52428800")]
    pub max_body_size: usize,

    /// Allowed CORS origins, comma separated ("*" allows any origin)
    #[arg(
        long,
        env = "LINEART_CORS_ORIGINS",
        value_delimiter = ',',
        default_value = "*"
    )]
    pub cors_origins: Vec<String>,

    /// Give up on a conversion after this many seconds
    #[arg(long, env = "LINEART_CONVERSION_TIMEOUT", default_value = "60")]
    pub conversion_timeout_secs: u64,

    /// Log level (trace, debug, info, warn, error)
    #[arg(long, env = "RUST_LOG", default_value = "info")]
    pub log_level: String,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let args = Args::parse();

    // Initialize tracing
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| args.log_level.clone().into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    let config = config::Config::from(args);

    tracing::info!("Starting lineart-server v{}", env!("CARGO_PKG_VERSION"));
    tracing::info!("Binding to {}:{}", config.host, config.port);

    server::run(config).await
}
