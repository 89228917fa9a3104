use std::sync::Arc;
use std::time::Duration;

use quoteflow::api::AppState;
use quoteflow::core::checkpoint::{CheckpointStore, FileCheckpointStore, MemoryCheckpointStore};
use quoteflow::delivery::{BlobStore, FileBlobStore, MemoryBlobStore};
use quoteflow::delivery::{ReqwestTransport, RetryPolicy, WebhookDispatcher};
use quoteflow::security::HostAllowList;
use quoteflow::{create_router, EngineConfig, RuntimeContext, WorkflowRunner};

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("info")),
        )
        .init();

    let config = EngineConfig::from_env()?;
    tracing::info!(config = %config.redacted_summary(), "starting quoteflow");

    let context = RuntimeContext::default();

    let store: Arc<dyn CheckpointStore> = match &config.checkpoint_dir {
        Some(dir) => Arc::new(FileCheckpointStore::new(dir)?),
        None => Arc::new(MemoryCheckpointStore::new()),
    };

    let blob_store: Arc<dyn BlobStore> = match config.storage_prefix.strip_prefix("file://") {
        Some(dir) => Arc::new(FileBlobStore::new(dir, context.time_provider.clone())?),
        None => Arc::new(MemoryBlobStore::new(
            config.storage_prefix.clone(),
            context.time_provider.clone(),
        )),
    };

    let policy = RetryPolicy {
        max_attempts: config.max_delivery_attempts,
        base_delay: config.delivery_base_backoff,
        max_delay: config.delivery_max_backoff,
        jitter_cap: Duration::from_millis(500),
    };
    let transport = Arc::new(ReqwestTransport::new(config.attempt_timeout)?);
    let dispatcher = Arc::new(WebhookDispatcher::new(
        config.webhook_url.clone(),
        config.webhook_secret.clone(),
        HostAllowList::new(config.allowed_hosts.clone()),
        policy,
        transport,
        context.clone(),
    ));

    let runner = Arc::new(
        WorkflowRunner::builder(store.clone())
            .context(context)
            .blob_store(blob_store)
            .dispatcher(dispatcher)
            .build()?,
    );

    let app = create_router(AppState {
        runner,
        store,
        expose_errors: config.expose_errors,
    });

    let listener = tokio::net::TcpListener::bind(&config.bind_addr).await?;
    tracing::info!(addr = %config.bind_addr, "listening");
    axum::serve(listener, app).await?;
    Ok(())
}
