use anyhow::Result;
use tracing::info;
use tracing_subscriber::EnvFilter;

use connpass_notify::config::Config;

fn main() -> Result<()> {
    dotenvy::dotenv().ok();
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .init();

    let config = Config::from_env()?;
    let summary = connpass_notify::run(&config)?;
    info!(
        fetched = summary.fetched,
        fresh = summary.fresh,
        delivered = summary.delivered,
        pruned = summary.pruned,
        "notification run complete"
    );
    Ok(())
}
