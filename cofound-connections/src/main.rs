use std::sync::Arc;

use cofound_connections::config::{AppConfig, StoreBackend};
use cofound_connections::directory::{MemoryProfileDirectory, PgProfileDirectory, ProfileDirectory};
use cofound_connections::events::{NoopEmitter, NotificationEmitter, RabbitMqEmitter};
use cofound_connections::store::{ConnectionStore, MemoryConnectionStore, PgConnectionStore};
use cofound_connections::{build_router, AppState};
use cofound_shared::clients::db::create_pool;
use cofound_shared::clients::rabbitmq::RabbitMQClient;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    cofound_shared::middleware::init_tracing("cofound-connections");

    let config = AppConfig::load()?;
    let port = config.port;

    let metrics_handle = cofound_shared::middleware::init_metrics()?;

    let (store, directory, emitter): (
        Arc<dyn ConnectionStore>,
        Arc<dyn ProfileDirectory>,
        Arc<dyn NotificationEmitter>,
    ) = match config.store_backend {
        StoreBackend::Postgres => {
            let pool = create_pool(&config.database_url, config.db_pool_size)?;
            let rabbitmq = RabbitMQClient::connect(&config.rabbitmq_url).await?;
            (
                Arc::new(PgConnectionStore::new(pool.clone())),
                Arc::new(PgProfileDirectory::new(pool)),
                Arc::new(RabbitMqEmitter::new(rabbitmq)),
            )
        }
        StoreBackend::Memory => {
            tracing::warn!("using in-memory store; connections are lost on restart");
            (
                Arc::new(MemoryConnectionStore::new()),
                Arc::new(MemoryProfileDirectory::new()),
                Arc::new(NoopEmitter),
            )
        }
    };

    let state = Arc::new(AppState::new(config, store, directory, emitter, Some(metrics_handle)));
    let app = build_router(state);

    let addr = format!("0.0.0.0:{port}");
    tracing::info!(addr = %addr, "cofound-connections starting");

    let listener = tokio::net::TcpListener::bind(&addr).await?;
    axum::serve(listener, app).await?;

    Ok(())
}
