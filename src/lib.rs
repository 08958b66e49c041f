use std::sync::Arc;

use axum::{middleware, routing::get, Router};
use tower_http::trace::TraceLayer;

pub mod auth;
pub mod config;
pub mod db;
pub mod error;
pub mod money;
pub mod query;
pub mod routes;

use auth::AuthConfig;
use db::DbPool;
use query::{CollectionQueryService, CollectionStore, SqliteCollectionStore};

#[derive(Clone)]
pub struct AppState {
    pub db: DbPool,
    pub collections: CollectionQueryService,
    pub auth: Arc<AuthConfig>,
}

impl AppState {
    /// Filtered listings run against the same pool as everything else.
    pub fn new(db: DbPool, auth: AuthConfig) -> Self {
        let store = Arc::new(SqliteCollectionStore::new(db.clone()));
        Self::with_store(db, auth, store)
    }

    pub fn with_store(db: DbPool, auth: AuthConfig, store: Arc<dyn CollectionStore>) -> Self {
        AppState {
            db,
            collections: CollectionQueryService::new(store),
            auth: Arc::new(auth),
        }
    }
}

/// The application router without transport concerns (CORS, rate limiting,
/// response headers), which the binary layers on top.
pub fn app(state: AppState) -> Router {
    Router::new()
        .route("/health", get(health_check))
        .merge(routes::api_routes())
        .layer(middleware::from_fn_with_state(state.clone(), auth::require_auth))
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}

async fn health_check() -> &'static str {
    "OK"
}
