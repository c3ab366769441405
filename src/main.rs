use std::sync::Arc;

use goalboard::api::router;
use goalboard::cache::{LocalCache, SqliteCache};
use goalboard::config::AppConfig;
use goalboard::state::AppState;
use goalboard::store::{MemoryStore, RemoteStore, RtdbClient};
use tracing::{info, warn};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    dotenvy::dotenv().ok();

    tracing_subscriber::registry()
        .with(tracing_subscriber::EnvFilter::new(
            std::env::var("RUST_LOG").unwrap_or_else(|_| "goalboard=debug".to_string()),
        ))
        .with(tracing_subscriber::fmt::layer())
        .init();

    let config = AppConfig::from_env()?;

    let cache: Arc<dyn LocalCache> = Arc::new(SqliteCache::connect(&config.database_url).await?);

    let store: Arc<dyn RemoteStore> = match config.store.clone() {
        Some(store_config) => {
            info!("using remote store at {}", store_config.base_url);
            Arc::new(RtdbClient::new(store_config)?)
        }
        None => {
            warn!("STORE_URL not set, data lives in memory and is lost on exit");
            Arc::new(MemoryStore::new())
        }
    };

    let state = AppState::start(store, cache).await;
    let app = router(state.clone());

    info!("listening on http://{}", config.bind_addr);
    let listener = tokio::net::TcpListener::bind(config.bind_addr).await?;
    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await?;

    state.shutdown();
    info!("shut down");
    Ok(())
}

async fn shutdown_signal() {
    if let Err(e) = tokio::signal::ctrl_c().await {
        warn!("could not listen for ctrl-c: {}", e);
    }
}
