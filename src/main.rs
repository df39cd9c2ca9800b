use anyhow::{Context, Result};
use clap::Parser;
use std::path::PathBuf;
use std::sync::Arc;
use tracing::{info, level_filters::LevelFilter};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

use mellow_server::image_host::{HttpImageHost, ImageHost};
use mellow_server::mailer::LogMailer;
use mellow_server::{run_server, RequestsLoggingLevel, ServerConfig, SqliteUserStore};

fn parse_path(s: &str) -> Result<PathBuf> {
    let path_buf = PathBuf::from(s);
    let original_path = match path_buf.canonicalize() {
        Ok(path) => path,
        Err(msg) => {
            if msg.kind() == std::io::ErrorKind::NotFound {
                path_buf
            } else {
                return Err(msg).with_context(|| format!("Error resolving path: {}", s));
            }
        }
    };
    if original_path.is_absolute() {
        return Ok(original_path);
    }
    let cwd = std::env::current_dir()?;
    Ok(cwd.join(original_path))
}

#[derive(Parser, Debug)]
struct CliArgs {
    /// Path to the SQLite database file to use for user storage.
    #[clap(value_parser = parse_path)]
    pub user_store_file_path: PathBuf,

    /// The port to listen on.
    #[clap(short, long, default_value_t = 5000)]
    pub port: u16,

    /// Externally visible base URL, used in verification email links.
    #[clap(long, default_value = "http://localhost:5000")]
    pub public_base_url: String,

    /// The level of logging to perform on each request.
    #[clap(long, default_value = "path")]
    pub logging_level: RequestsLoggingLevel,

    /// Path to the frontend directory to be statically served.
    #[clap(long)]
    pub frontend_dir_path: Option<String>,

    /// Base URL of the image hosting service for avatar uploads.
    #[clap(long)]
    pub image_host_url: Option<String>,

    /// Timeout in seconds for image host requests.
    #[clap(long, default_value_t = 60)]
    pub image_host_timeout_sec: u64,
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli_args = CliArgs::parse();

    tracing_subscriber::registry()
        .with(tracing_subscriber::fmt::layer())
        .with(
            EnvFilter::builder()
                .with_default_directive(LevelFilter::INFO.into())
                .with_env_var("LOG_LEVEL")
                .from_env_lossy(),
        )
        .try_init()
        .unwrap();

    let jwt_secret =
        std::env::var("JWT_SECRET").context("JWT_SECRET environment variable is not set")?;

    info!(
        "Opening SQLite user database at {:?}...",
        cli_args.user_store_file_path
    );
    let user_store = Arc::new(SqliteUserStore::new(&cli_args.user_store_file_path)?);

    let image_host: Option<Arc<dyn ImageHost>> = cli_args.image_host_url.map(|url| {
        info!("Image host configured at {}", url);
        Arc::new(HttpImageHost::new(url, cli_args.image_host_timeout_sec)) as Arc<dyn ImageHost>
    });

    let config = ServerConfig {
        port: cli_args.port,
        requests_logging_level: cli_args.logging_level,
        public_base_url: cli_args.public_base_url,
        frontend_dir_path: cli_args.frontend_dir_path,
    };

    info!("Ready to serve at port {}!", config.port);
    run_server(
        config,
        user_store,
        jwt_secret.as_bytes(),
        Arc::new(LogMailer),
        image_host,
    )
    .await
}
