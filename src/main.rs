use anyhow::Context;
use batchledger::{
    api, config::Config, db::init_db, BatchLogEngine, BatchRegistry, SignalProcessor,
    SqliteRepository, TradeLedger,
};
use std::net::SocketAddr;
use std::sync::Arc;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::from_default_env()
                .add_directive(tracing_subscriber::filter::LevelFilter::INFO.into()),
        )
        .init();

    let config = Config::from_env().context("configuration error")?;
    let port = config.port;

    let pool = init_db(&config.database_path)
        .await
        .context("failed to initialize database")?;
    let repo = Arc::new(SqliteRepository::new(pool));

    let ledger = TradeLedger::new(repo.clone());
    let engine = Arc::new(BatchLogEngine::new(repo.clone(), repo.clone()));
    let processor = Arc::new(SignalProcessor::new(ledger, engine.clone(), repo.clone()));
    let registry = Arc::new(BatchRegistry::new(
        repo.clone(),
        engine,
        config.default_capital,
    ));

    let app = api::create_router(api::AppState {
        repo,
        processor,
        registry,
    });

    let addr = SocketAddr::from(([127, 0, 0, 1], port));
    let listener = tokio::net::TcpListener::bind(&addr)
        .await
        .with_context(|| format!("failed to bind to {}", addr))?;

    tracing::info!("Server listening on {}", addr);

    axum::serve(listener, app).await.context("server error")?;
    Ok(())
}
