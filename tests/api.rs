use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;

use async_trait::async_trait;
use axum::body::Body;
use axum::http::{header, Method, Request, StatusCode};
use axum::Router;
use http_body_util::BodyExt;
use serde_json::{json, Value};
use tower::ServiceExt;

use crowdfund_tracker::auth::{create_jwt, AuthConfig};
use crowdfund_tracker::db::{self, models::CollectionSummary, models::User, DbPool};
use crowdfund_tracker::query::{
    AggregationQuery, CollectionStore, QueryError, SqliteCollectionStore,
};
use crowdfund_tracker::{app, AppState};

fn auth_config() -> AuthConfig {
    AuthConfig {
        secret: "integration-secret".into(),
        ttl: chrono::Duration::hours(1),
        issuer: None,
        audience: None,
    }
}

fn token() -> String {
    let user = User {
        id: 1,
        name: "Tester".into(),
        email: "tester@example.org".into(),
        password_hash: String::new(),
        created_at: chrono::Utc::now(),
    };
    create_jwt(&auth_config(), &user).expect("token")
}

/// Delegates to SQLite and counts how many queries reached storage.
struct CountingStore {
    inner: SqliteCollectionStore,
    calls: Arc<AtomicUsize>,
}

#[async_trait]
impl CollectionStore for CountingStore {
    async fn fetch_aggregated(
        &self,
        query: &AggregationQuery,
    ) -> Result<Vec<CollectionSummary>, QueryError> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        self.inner.fetch_aggregated(query).await
    }
}

async fn test_app() -> (Router, DbPool, Arc<AtomicUsize>) {
    let pool = db::memory_pool().await.expect("pool");
    let calls = Arc::new(AtomicUsize::new(0));
    let store = CountingStore {
        inner: SqliteCollectionStore::new(pool.clone()),
        calls: calls.clone(),
    };
    let state = AppState::with_store(pool.clone(), auth_config(), Arc::new(store));
    (app(state), pool, calls)
}

async fn send(
    app: &Router,
    method: Method,
    uri: &str,
    token: Option<&str>,
    body: Option<Value>,
) -> (StatusCode, Value) {
    let content_type = body.as_ref().map(|_| "application/json");
    let body = body.map(|b| b.to_string()).unwrap_or_default();
    send_raw(app, method, uri, token, content_type, body).await
}

/// Like [`send`], with the body and content type left exactly as given.
async fn send_raw(
    app: &Router,
    method: Method,
    uri: &str,
    token: Option<&str>,
    content_type: Option<&str>,
    body: String,
) -> (StatusCode, Value) {
    let mut builder = Request::builder().method(method).uri(uri);
    if let Some(token) = token {
        builder = builder.header(header::AUTHORIZATION, format!("Bearer {}", token));
    }
    if let Some(content_type) = content_type {
        builder = builder.header(header::CONTENT_TYPE, content_type);
    }
    let request = builder.body(Body::from(body)).expect("request");

    let response = app.clone().oneshot(request).await.expect("response");
    let status = response.status();
    let bytes = response.into_body().collect().await.expect("body").to_bytes();
    let value = if bytes.is_empty() {
        Value::Null
    } else {
        serde_json::from_slice(&bytes).expect("json body")
    };
    (status, value)
}

async fn create_collection(app: &Router, token: &str, title: &str, target: i64) -> i64 {
    let (status, body) = send(
        app,
        Method::POST,
        "/api/collections",
        Some(token),
        Some(json!({
            "title": title,
            "description": format!("{} fundraiser", title),
            "targetAmount": target,
            "link": "https://example.org/campaign",
        })),
    )
    .await;
    assert_eq!(status, StatusCode::CREATED, "{}", body);
    body["data"]["id"].as_i64().expect("id")
}

async fn contribute(
    app: &Router,
    token: &str,
    collection_id: i64,
    amount: Value,
) -> (StatusCode, Value) {
    send(
        app,
        Method::POST,
        &format!("/api/collections/{}/contributors", collection_id),
        Some(token),
        Some(json!({ "userName": "Grace", "amount": amount })),
    )
    .await
}

#[tokio::test]
async fn health_is_public() {
    let (app, _, _) = test_app().await;
    let response = app
        .oneshot(Request::builder().uri("/health").body(Body::empty()).expect("request"))
        .await
        .expect("response");
    assert_eq!(response.status(), StatusCode::OK);
}

#[tokio::test]
async fn api_requires_a_bearer_token() {
    let (app, _, _) = test_app().await;

    let (status, body) = send(&app, Method::GET, "/api/collections", None, None).await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);
    assert_eq!(body["message"], "Unauthenticated.");

    let (status, _) = send(&app, Method::GET, "/api/collections", Some("not-a-jwt"), None).await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);
}

#[tokio::test]
async fn signup_then_login_issues_a_working_token() {
    let (app, _, _) = test_app().await;
    let credentials = json!({ "email": "ada@example.org", "password": "Secr3t!pass" });

    let (status, body) = send(
        &app,
        Method::POST,
        "/api/signup",
        None,
        Some(json!({ "name": "Ada", "email": "ada@example.org", "password": "Secr3t!pass" })),
    )
    .await;
    assert_eq!(status, StatusCode::CREATED, "{}", body);

    let (status, _) = send(
        &app,
        Method::POST,
        "/api/signup",
        None,
        Some(json!({ "name": "Ada", "email": "ada@example.org", "password": "Secr3t!pass" })),
    )
    .await;
    assert_eq!(status, StatusCode::UNPROCESSABLE_ENTITY);

    let (status, body) = send(
        &app,
        Method::POST,
        "/api/login",
        None,
        Some(json!({ "email": "ada@example.org", "password": "wrong" })),
    )
    .await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);
    assert_eq!(body["message"], "Logging is failed.");

    let (status, body) = send(&app, Method::POST, "/api/login", None, Some(credentials)).await;
    assert_eq!(status, StatusCode::OK);
    let token = body["token"].as_str().expect("token").to_string();

    let (status, body) = send(&app, Method::GET, "/api/me", Some(&token), None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["data"]["email"], "ada@example.org");
    assert_eq!(body["data"]["name"], "Ada");
}

#[tokio::test]
async fn weak_passwords_are_rejected() {
    let (app, _, _) = test_app().await;
    let (status, body) = send(
        &app,
        Method::POST,
        "/api/signup",
        None,
        Some(json!({ "name": "Bob", "email": "bob@example.org", "password": "password" })),
    )
    .await;
    assert_eq!(status, StatusCode::UNPROCESSABLE_ENTITY);
    assert!(body["message"].as_str().expect("message").contains("password"));
}

#[tokio::test]
async fn filtered_listing_returns_totals() {
    let (app, _, calls) = test_app().await;
    let token = token();

    let under = create_collection(&app, &token, "Roof", 1000).await;
    let funded = create_collection(&app, &token, "Well", 1000).await;
    let empty = create_collection(&app, &token, "Library", 500).await;
    assert_eq!(contribute(&app, &token, under, json!(700)).await.0, StatusCode::CREATED);
    assert_eq!(contribute(&app, &token, funded, json!(700)).await.0, StatusCode::CREATED);
    assert_eq!(contribute(&app, &token, funded, json!(300)).await.0, StatusCode::CREATED);

    let uri = "/api/collections?isLessThanTargetAmount=true";
    let (status, body) = send(&app, Method::GET, uri, Some(&token), None).await;
    assert_eq!(status, StatusCode::OK);
    let data = body["data"].as_array().expect("data");
    let ids: Vec<i64> = data.iter().map(|c| c["id"].as_i64().expect("id")).collect();
    assert_eq!(ids, vec![under, empty]);
    assert_eq!(data[0]["totalContributed"], json!(700));
    assert_eq!(data[0]["remainingAmount"], json!(300));

    let uri = "/api/collections?remainingAmount%5Beq%5D=500";
    let (status, body) = send(&app, Method::GET, uri, Some(&token), None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["data"][0]["id"], json!(empty));
    assert_eq!(body["data"].as_array().expect("data").len(), 1);

    assert_eq!(calls.load(Ordering::SeqCst), 2);
}

#[tokio::test]
async fn ambiguous_filter_is_rejected_before_querying() {
    let (app, _, calls) = test_app().await;
    let token = token();

    for uri in [
        "/api/collections?remainingAmount%5Blt%5D=5&remainingAmount%5Bgt%5D=1",
        "/api/collections?remainingAmount%5Bbetween%5D=5",
        "/api/collections?remainingAmount%5Beq%5D=five",
    ] {
        let (status, body) = send(&app, Method::GET, uri, Some(&token), None).await;
        assert_eq!(status, StatusCode::UNPROCESSABLE_ENTITY, "{}", uri);
        assert!(body["message"].is_string());
    }
    assert_eq!(calls.load(Ordering::SeqCst), 0);
}

#[tokio::test]
async fn collection_lifecycle() {
    let (app, pool, _) = test_app().await;
    let token = token();
    let id = create_collection(&app, &token, "Bridge", 2000).await;
    let (status, body) = contribute(&app, &token, id, json!("150.25")).await;
    assert_eq!(status, StatusCode::CREATED);
    let contributor_id = body["data"]["id"].as_i64().expect("id");

    let uri = format!("/api/collections/{}", id);
    let (status, body) = send(&app, Method::GET, &uri, Some(&token), None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["data"]["contributors"].as_array().expect("contributors").len(), 1);
    assert_eq!(body["data"]["totalContributed"], json!(150.25));

    let patch = json!({ "title": "Footbridge" });
    let (status, _) = send(&app, Method::PATCH, &uri, Some(&token), Some(patch)).await;
    assert_eq!(status, StatusCode::OK);
    let partial = json!({ "title": "Only a title" });
    let (status, _) = send(&app, Method::PUT, &uri, Some(&token), Some(partial)).await;
    assert_eq!(status, StatusCode::UNPROCESSABLE_ENTITY);
    let bad_link = json!({ "link": "ftp://nope" });
    let (status, _) = send(&app, Method::PATCH, &uri, Some(&token), Some(bad_link)).await;
    assert_eq!(status, StatusCode::UNPROCESSABLE_ENTITY);

    let (_, body) = send(&app, Method::GET, &uri, Some(&token), None).await;
    assert_eq!(body["data"]["title"], "Footbridge");

    let (status, _) = send(&app, Method::DELETE, &uri, Some(&token), None).await;
    assert_eq!(status, StatusCode::NO_CONTENT);
    let (status, body) = send(&app, Method::GET, &uri, Some(&token), None).await;
    assert_eq!(status, StatusCode::NOT_FOUND);
    assert_eq!(body["message"], "Collection not found.");
    let (status, _) = send(&app, Method::DELETE, &uri, Some(&token), None).await;
    assert_eq!(status, StatusCode::NOT_FOUND);

    assert!(db::get_contributor(&pool, contributor_id).await.expect("lookup").is_none());
}

#[tokio::test]
async fn contributor_routes() {
    let (app, _, _) = test_app().await;
    let token = token();

    let (status, body) = contribute(&app, &token, 999, json!(10)).await;
    assert_eq!(status, StatusCode::NOT_FOUND);
    assert_eq!(body["message"], "Collection not found.");

    let id = create_collection(&app, &token, "Park", 100).await;
    let (_, body) = contribute(&app, &token, id, json!(10)).await;
    let contributor_id = body["data"]["id"].as_i64().expect("id");
    let uri = format!("/api/contributors/{}", contributor_id);

    let replacement = json!({ "userName": "Alan", "amount": 25 });
    let (status, _) = send(&app, Method::PUT, &uri, Some(&token), Some(replacement)).await;
    assert_eq!(status, StatusCode::OK);
    let patch = json!({ "amount": 30 });
    let (status, _) = send(&app, Method::PATCH, &uri, Some(&token), Some(patch)).await;
    assert_eq!(status, StatusCode::OK);

    let (status, body) = send(&app, Method::GET, &uri, Some(&token), None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["data"]["userName"], "Alan");
    assert_eq!(body["data"]["amount"], json!(30));
    assert_eq!(body["data"]["collectionId"], json!(id));

    let (_, body) = send(&app, Method::GET, "/api/contributors", Some(&token), None).await;
    assert_eq!(body["data"].as_array().expect("data").len(), 1);

    let (status, _) = send(&app, Method::DELETE, &uri, Some(&token), None).await;
    assert_eq!(status, StatusCode::NO_CONTENT);
    let (status, body) = send(&app, Method::GET, &uri, Some(&token), None).await;
    assert_eq!(status, StatusCode::NOT_FOUND);
    assert_eq!(body["message"], "Contributor not found.");
}

#[tokio::test]
async fn oversized_contributions_are_rejected_and_listing_keeps_working() {
    let (app, _, _) = test_app().await;
    let token = token();
    let id = create_collection(&app, &token, "Dam", 1000).await;

    for amount in [json!("90000000000000000"), json!("-90000000000000000")] {
        let (status, body) = contribute(&app, &token, id, amount.clone()).await;
        assert_eq!(status, StatusCode::UNPROCESSABLE_ENTITY, "{}", amount);
        assert!(body["message"].as_str().expect("message").contains("amount"));
    }
    assert_eq!(contribute(&app, &token, id, json!(100)).await.0, StatusCode::CREATED);

    let (_, body) = contribute(&app, &token, id, json!(100)).await;
    let uri = format!("/api/contributors/{}", body["data"]["id"]);
    let patch = json!({ "amount": "90000000000000000" });
    let (status, _) = send(&app, Method::PATCH, &uri, Some(&token), Some(patch)).await;
    assert_eq!(status, StatusCode::UNPROCESSABLE_ENTITY);

    let (status, body) = send(&app, Method::GET, "/api/collections", Some(&token), None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["data"][0]["totalContributed"], json!(200));
}

#[tokio::test]
async fn malformed_bodies_get_json_errors() {
    let (app, _, _) = test_app().await;
    let token = token();

    let payload = json!({
        "title": "Roof",
        "description": "Roof fundraiser",
        "targetAmount": "abc",
        "link": "https://example.org/campaign",
    });
    let (status, body) =
        send(&app, Method::POST, "/api/collections", Some(&token), Some(payload)).await;
    assert_eq!(status, StatusCode::UNPROCESSABLE_ENTITY);
    let message = body["message"].as_str().expect("message");
    assert!(message.contains("targetAmount"), "{}", message);
    assert!(!message.contains("line 1"), "{}", message);

    let (status, body) = send_raw(
        &app,
        Method::POST,
        "/api/collections",
        Some(&token),
        Some("application/json"),
        "{not json".into(),
    )
    .await;
    assert_eq!(status, StatusCode::UNPROCESSABLE_ENTITY);
    assert_eq!(body["message"], "The request body is not valid JSON.");

    let (status, body) =
        send_raw(&app, Method::POST, "/api/collections", Some(&token), None, String::new()).await;
    assert_eq!(status, StatusCode::UNSUPPORTED_MEDIA_TYPE);
    assert_eq!(body["message"], "The request body must be JSON.");

    let (status, body) =
        send_raw(&app, Method::POST, "/api/login", None, Some("text/plain"), "x".into()).await;
    assert_eq!(status, StatusCode::UNSUPPORTED_MEDIA_TYPE);
    assert!(body["message"].is_string());
}

#[tokio::test]
async fn sub_cent_and_exponent_filters_are_accepted() {
    let (app, _, calls) = test_app().await;
    let token = token();
    let open = create_collection(&app, &token, "Roof", 1000).await;
    let funded = create_collection(&app, &token, "Well", 10).await;
    assert_eq!(contribute(&app, &token, funded, json!(10)).await.0, StatusCode::CREATED);

    let uri = "/api/collections?remainingAmount%5Bgt%5D=0.005";
    let (status, body) = send(&app, Method::GET, uri, Some(&token), None).await;
    assert_eq!(status, StatusCode::OK, "{}", body);
    assert_eq!(body["data"].as_array().expect("data").len(), 1);
    assert_eq!(body["data"][0]["id"], json!(open));

    let uri = "/api/collections?remainingAmount%5Beq%5D=1e3";
    let (status, body) = send(&app, Method::GET, uri, Some(&token), None).await;
    assert_eq!(status, StatusCode::OK, "{}", body);
    assert_eq!(body["data"][0]["id"], json!(open));

    let uri = "/api/collections?remainingAmount%5Beq%5D=0.005";
    let (status, body) = send(&app, Method::GET, uri, Some(&token), None).await;
    assert_eq!(status, StatusCode::OK);
    assert!(body["data"].as_array().expect("data").is_empty());

    assert_eq!(calls.load(Ordering::SeqCst), 3);
}
