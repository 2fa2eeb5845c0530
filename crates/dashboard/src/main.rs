mod client;
mod config;
mod error;
mod report;

use std::sync::Arc;

use chrono::Utc;
use store::StoreRegistry;
use tokio::sync::watch;

use crate::{client::HttpBackend, error::Result};

#[tokio::main]
async fn main() -> Result<()> {
    let config = config::load()?;

    tracing_subscriber::fmt()
        .with_env_filter(format!(
            "dashboard={level},store={level}",
            level = config.level
        ))
        .init();

    let owner = config.owner()?;
    let tz = config.tz()?;

    let (cancel_tx, cancel) = watch::channel(false);
    tokio::spawn(async move {
        if tokio::signal::ctrl_c().await.is_ok() {
            tracing::info!("interrupted, cancelling pending requests");
            cancel_tx.send_replace(true);
        }
    });

    let backend = Arc::new(HttpBackend::new(&config.base_url, &config.token, cancel)?);
    let registry = StoreRegistry::new(backend);
    registry.sign_in(owner).await;

    if !registry.refresh_all(true).await {
        tracing::warn!("some stores could not be refreshed");
    }

    let today = Utc::now().with_timezone(&tz).date_naive();
    let summary = report::collect(&registry, today).await;
    report::render(&summary, &mut std::io::stdout().lock())?;

    registry.sign_out().await;
    Ok(())
}
