use anyhow::Result;

mod api;
mod domain;
mod market_data;
mod refresh;
mod settings;
mod store;
mod summary;
#[cfg(test)]
mod test_support;

use api::AppState;
use market_data::YahooClient;
use refresh::{AssetRefreshService, RefreshScheduler};
use settings::Settings;
use std::sync::Arc;
use std::time::Duration;
use store::JsonStore;
use summary::{OpenAiGenerator, SummaryGenerator};
use tokio::sync::watch;
use tracing::subscriber::set_global_default;
use tracing::{info, warn};
use tracing_log::LogTracer;
use tracing_subscriber::{EnvFilter, FmtSubscriber};

async fn shutdown_signal(tx: watch::Sender<bool>) {
    if let Err(e) = tokio::signal::ctrl_c().await {
        warn!("Failed to listen for shutdown signal. Error: {}", e);
    }
    info!("Shutdown requested");
    let _ = tx.send(true);
}

#[tokio::main]
async fn main() -> Result<()> {
    let _ = dotenv::dotenv();
    let subscriber = FmtSubscriber::builder()
        .with_env_filter(EnvFilter::from_default_env())
        .finish();
    set_global_default(subscriber)?;
    LogTracer::init()?;
    let settings = Settings::new()?;
    let app = &settings.app;

    info!(db_path = %app.db_path, "Starting market-pulse");
    let store = Arc::new(JsonStore::open(&app.db_path, &app.default_symbols)?);
    let market_data = Arc::new(YahooClient::new(settings.market_data.base_url.as_str()));
    let service = Arc::new(AssetRefreshService::new(
        store,
        market_data,
        app.history_limit,
        Duration::from_secs(app.fetch_timeout_secs),
    ));
    if settings.llm.api_key.is_none() {
        warn!("LLM__API_KEY is not set, /summary will fail");
    }
    let generator = Arc::new(OpenAiGenerator::new(
        &settings.llm.base_url,
        settings.llm.api_key.clone(),
        &settings.llm.model,
        settings.llm.temperature,
    ));
    let summary = Arc::new(SummaryGenerator::new(
        service.clone(),
        generator,
        app.summary_limit,
        Duration::from_secs(settings.llm.timeout_secs),
    ));

    let (tx, rx) = watch::channel(false);
    tokio::spawn(shutdown_signal(tx));
    let scheduler = if app.refresh_interval_secs > 0 {
        let period = Duration::from_secs(app.refresh_interval_secs);
        Some(tokio::spawn(
            RefreshScheduler::new(service.clone(), period, rx.clone()).run(),
        ))
    } else {
        None
    };

    let router = api::router(Arc::new(AppState { service, summary }));
    let listener = tokio::net::TcpListener::bind(&app.bind_addr).await?;
    info!("Listening on {}", app.bind_addr);
    let mut server_rx = rx;
    axum::serve(listener, router)
        .with_graceful_shutdown(async move {
            let _ = server_rx.wait_for(|stop| *stop).await;
        })
        .await?;
    if let Some(handle) = scheduler {
        handle.await?;
    }
    Ok(())
}
