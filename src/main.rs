use anyhow::Result;
use clap::Parser;
use tracing_subscriber::EnvFilter;

use client_manager::cli::{self, Cli};
use client_manager::{config, db};

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    // Load configuration
    let config = config::init(cli.database_url.clone())?;

    let env_filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(&config.log_level));
    tracing_subscriber::fmt()
        .with_env_filter(env_filter)
        .with_writer(std::io::stderr)
        .init();

    let db = db::init(&config).await?;
    tracing::debug!("database connection established");

    let result = cli::run(&db, cli.command).await;

    db.close().await;

    result
}
