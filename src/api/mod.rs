pub mod analytics;
pub mod batches;
pub mod health;
pub mod signals;
pub mod trades;

use crate::db::SqliteRepository;
use crate::orchestration::{BatchRegistry, SignalProcessor};
use axum::{
    routing::{delete, get, post, put},
    Router,
};
use std::sync::Arc;
use tower_http::cors::{Any, CorsLayer};

#[derive(Clone)]
pub struct AppState {
    pub repo: Arc<SqliteRepository>,
    pub processor: Arc<SignalProcessor>,
    pub registry: Arc<BatchRegistry>,
}

pub fn create_router(state: AppState) -> Router {
    let cors = CorsLayer::new()
        .allow_origin(Any)
        .allow_methods(Any)
        .allow_headers(Any);

    Router::new()
        .route("/health", get(health::health))
        .route("/ready", get(health::ready))
        .route("/webhook", post(signals::post_webhook))
        .route("/v1/trades", get(trades::get_trades))
        .route(
            "/v1/batches",
            post(batches::create_batch).get(batches::list_batches),
        )
        .route(
            "/v1/batches/:id",
            get(batches::get_batch)
                .patch(batches::update_batch)
                .delete(batches::delete_batch),
        )
        .route(
            "/v1/batches/:id/symbols",
            put(batches::replace_symbols).post(batches::add_symbol),
        )
        .route(
            "/v1/batches/:id/symbols/:symbol",
            delete(batches::remove_symbol),
        )
        .route("/v1/batches/:id/summary", get(analytics::get_summary))
        .route("/v1/batches/:id/log", get(analytics::get_log))
        .route("/v1/batches/:id/capital", get(analytics::get_capital))
        .route(
            "/v1/batches/:id/capital/daily",
            get(analytics::get_capital_daily),
        )
        .route(
            "/v1/batches/:id/trades-per-day",
            get(analytics::get_trades_per_day),
        )
        .route(
            "/v1/batches/:id/trade-count",
            get(analytics::get_trade_count),
        )
        .route(
            "/v1/batches/:id/symbols/breakdown",
            get(analytics::get_symbol_breakdown),
        )
        .route("/v1/batches/:id/drawdown", get(analytics::get_drawdown))
        .route("/v1/batches/:id/export.csv", get(analytics::export_csv))
        .layer(cors)
        .with_state(state)
}
