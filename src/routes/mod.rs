use axum::{
    extract::{rejection::JsonRejection, FromRequest, Request},
    routing::{get, post},
    Json, Router,
};

use crate::auth;
use crate::error::ApiError;
use crate::AppState;

pub mod collections;
pub mod contributors;
pub mod validation;

/// `Json` whose rejections render as `{"message": ...}` like every other error.
pub struct ApiJson<T>(pub T);

impl<S, T> FromRequest<S> for ApiJson<T>
where
    Json<T>: FromRequest<S, Rejection = JsonRejection>,
    S: Send + Sync,
{
    type Rejection = ApiError;

    async fn from_request(req: Request, state: &S) -> Result<Self, Self::Rejection> {
        let Json(value) = Json::<T>::from_request(req, state).await?;
        Ok(ApiJson(value))
    }
}

/// Every `/api` route. Authentication is applied by the caller as a layer.
pub fn api_routes() -> Router<AppState> {
    Router::new()
        .route("/api/signup", post(auth::signup))
        .route("/api/login", post(auth::login))
        .route("/api/me", get(auth::me))
        .route(
            "/api/collections",
            get(collections::list_collections).post(collections::create_collection),
        )
        .route(
            "/api/collections/{id}",
            get(collections::show_collection)
                .put(collections::replace_collection)
                .patch(collections::update_collection)
                .delete(collections::delete_collection),
        )
        .route("/api/collections/{id}/contributors", post(collections::add_contributor))
        .route("/api/contributors", get(contributors::list_contributors))
        .route(
            "/api/contributors/{id}",
            get(contributors::show_contributor)
                .put(contributors::replace_contributor)
                .patch(contributors::update_contributor)
                .delete(contributors::delete_contributor),
        )
}
