use axum::{
    extract::{FromRequestParts, Json, Request, State},
    http::{header, request::Parts, HeaderMap, Method, StatusCode},
    middleware::Next,
    response::{IntoResponse, Response},
};
use chrono::Utc;
use jsonwebtoken::{decode, encode, DecodingKey, EncodingKey, Header, Validation};
use rand::RngCore;
use regex::Regex;
use serde::{Deserialize, Serialize};
use serde_json::json;
use sha2::Sha256;
use std::fmt;
use std::sync::LazyLock;

use crate::error::ApiError;
use crate::routes::ApiJson;
use crate::AppState;

const PBKDF2_ROUNDS: u32 = 100_000;
const HASH_SCHEME: &str = "pbkdf2-sha256";

/// `/api/` routes reachable without a token.
const PUBLIC_API_PATHS: &[&str] = &["/api/signup", "/api/login"];

static EMAIL_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^[^@\s]+@[^@\s]+\.[^@\s]+$").expect("email regex"));

#[derive(Clone)]
pub struct AuthConfig {
    pub secret: String,
    pub ttl: chrono::Duration,
    pub issuer: Option<String>,
    pub audience: Option<String>,
}

impl fmt::Debug for AuthConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("AuthConfig")
            .field("secret", &"<redacted>")
            .field("ttl", &self.ttl)
            .field("issuer", &self.issuer)
            .field("audience", &self.audience)
            .finish()
    }
}

#[derive(Debug, Serialize, Deserialize)]
struct Claims {
    sub: String,
    exp: usize,
    email: String,
    name: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    iss: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    aud: Option<String>,
}

#[derive(Debug, Clone, Serialize, PartialEq)]
pub struct AuthenticatedUser {
    pub id: i64,
    pub email: String,
    pub name: String,
}

impl FromRequestParts<AppState> for AuthenticatedUser {
    type Rejection = ApiError;

    async fn from_request_parts(
        parts: &mut Parts,
        state: &AppState,
    ) -> Result<Self, Self::Rejection> {
        if let Some(user) = parts.extensions.get::<AuthenticatedUser>() {
            return Ok(user.clone());
        }
        let token = extract_token(&parts.headers).ok_or(ApiError::Unauthenticated)?;
        validate_token(&state.auth, &token)
    }
}

/// Rejects `/api/` requests without a valid bearer token and stashes the
/// caller in the request extensions for downstream extractors.
pub async fn require_auth(State(state): State<AppState>, mut req: Request, next: Next) -> Response {
    let path = req.uri().path();
    let public = req.method() == Method::OPTIONS
        || !path.starts_with("/api/")
        || PUBLIC_API_PATHS.contains(&path);
    if public {
        return next.run(req).await;
    }

    match extract_token(req.headers()).map(|token| validate_token(&state.auth, &token)) {
        Some(Ok(user)) => {
            req.extensions_mut().insert(user);
            next.run(req).await
        }
        Some(Err(e)) => e.into_response(),
        None => ApiError::Unauthenticated.into_response(),
    }
}

pub fn extract_token(headers: &HeaderMap) -> Option<String> {
    headers
        .get(header::AUTHORIZATION)
        .and_then(|h| h.to_str().ok())
        .and_then(|h| h.strip_prefix("Bearer "))
        .map(|t| t.trim().to_string())
        .filter(|t| !t.is_empty())
}

fn validation(config: &AuthConfig) -> Validation {
    let mut validation = Validation::default();
    validation.validate_exp = true;
    if let Some(issuer) = &config.issuer {
        validation.set_issuer(&[issuer.as_str()]);
    }
    match &config.audience {
        Some(audience) => validation.set_audience(&[audience.as_str()]),
        None => validation.validate_aud = false,
    }
    validation
}

pub fn validate_token(config: &AuthConfig, token: &str) -> Result<AuthenticatedUser, ApiError> {
    let key = DecodingKey::from_secret(config.secret.as_bytes());
    let data = decode::<Claims>(token, &key, &validation(config)).map_err(|e| {
        tracing::debug!("Token rejected: {}", e);
        ApiError::Unauthenticated
    })?;
    let id = data.claims.sub.parse::<i64>().map_err(|_| ApiError::Unauthenticated)?;
    Ok(AuthenticatedUser {
        id,
        email: data.claims.email,
        name: data.claims.name,
    })
}

pub fn create_jwt(config: &AuthConfig, user: &crate::db::models::User) -> anyhow::Result<String> {
    let expiration = Utc::now()
        .checked_add_signed(config.ttl)
        .ok_or_else(|| anyhow::anyhow!("token expiry out of range"))?
        .timestamp();

    let claims = Claims {
        sub: user.id.to_string(),
        exp: expiration as usize,
        email: user.email.clone(),
        name: user.name.clone(),
        iss: config.issuer.clone(),
        aud: config.audience.clone(),
    };
    let key = EncodingKey::from_secret(config.secret.as_bytes());
    Ok(encode(&Header::default(), &claims, &key)?)
}

/// Salted PBKDF2-HMAC-SHA256, encoded as `pbkdf2-sha256$<rounds>$<salt hex>$<hash hex>`.
pub fn hash_password(password: &str) -> String {
    let mut salt = [0u8; 16];
    rand::thread_rng().fill_bytes(&mut salt);
    let mut hash = [0u8; 32];
    pbkdf2::pbkdf2_hmac::<Sha256>(password.as_bytes(), &salt, PBKDF2_ROUNDS, &mut hash);
    format!("{}${}${}${}", HASH_SCHEME, PBKDF2_ROUNDS, hex::encode(salt), hex::encode(hash))
}

pub fn verify_password(password: &str, stored: &str) -> bool {
    let parts: Vec<&str> = stored.split('$').collect();
    let [scheme, rounds, salt, expected] = parts.as_slice() else {
        return false;
    };
    if *scheme != HASH_SCHEME {
        return false;
    }
    let parsed = (rounds.parse::<u32>(), hex::decode(salt), hex::decode(expected));
    let (Ok(rounds), Ok(salt), Ok(expected)) = parsed else {
        return false;
    };
    if rounds == 0 || expected.is_empty() {
        return false;
    }

    let mut actual = vec![0u8; expected.len()];
    pbkdf2::pbkdf2_hmac::<Sha256>(password.as_bytes(), &salt, rounds, &mut actual);
    actual.iter().zip(&expected).fold(0u8, |acc, (a, b)| acc | (a ^ b)) == 0
}

/// Minimum 6 characters with lower- and upper-case letters, a digit and a symbol.
fn password_problem(password: &str) -> Option<&'static str> {
    if password.chars().count() < 6 {
        return Some("The password field must be at least 6 characters.");
    }
    if !password.chars().any(|c| c.is_lowercase()) || !password.chars().any(|c| c.is_uppercase()) {
        return Some(
            "The password field must contain at least one uppercase and one lowercase letter.",
        );
    }
    if !password.chars().any(|c| c.is_ascii_digit()) {
        return Some("The password field must contain at least one number.");
    }
    if password.chars().all(|c| c.is_alphanumeric()) {
        return Some("The password field must contain at least one symbol.");
    }
    None
}

async fn hash_off_thread(password: String) -> Result<String, ApiError> {
    tokio::task::spawn_blocking(move || hash_password(&password))
        .await
        .map_err(|e| ApiError::Internal(e.to_string()))
}

#[derive(Deserialize)]
pub struct SignupRequest {
    name: Option<String>,
    email: Option<String>,
    password: Option<String>,
}

#[derive(Deserialize)]
pub struct LoginRequest {
    email: Option<String>,
    password: Option<String>,
}

pub async fn signup(
    State(state): State<AppState>,
    ApiJson(payload): ApiJson<SignupRequest>,
) -> Result<impl IntoResponse, ApiError> {
    let name = payload
        .name
        .map(|n| n.trim().to_string())
        .filter(|n| !n.is_empty())
        .ok_or_else(|| ApiError::validation("The name field is required."))?;
    let email = payload
        .email
        .map(|e| e.trim().to_lowercase())
        .filter(|e| !e.is_empty())
        .ok_or_else(|| ApiError::validation("The email field is required."))?;
    if !EMAIL_RE.is_match(&email) {
        return Err(ApiError::validation("The email field must be a valid email address."));
    }
    let password = payload
        .password
        .filter(|p| !p.is_empty())
        .ok_or_else(|| ApiError::validation("The password field is required."))?;
    if let Some(problem) = password_problem(&password) {
        return Err(ApiError::validation(problem));
    }

    let password_hash = hash_off_thread(password).await?;
    match crate::db::create_user(&state.db, name, email, password_hash, Utc::now()).await? {
        Some(user) => {
            tracing::info!(user_id = user.id, "user signed up");
            Ok((StatusCode::CREATED, Json(json!({ "message": "User created successfully." }))))
        }
        None => Err(ApiError::validation("The email has already been taken.")),
    }
}

pub async fn login(
    State(state): State<AppState>,
    ApiJson(payload): ApiJson<LoginRequest>,
) -> Result<impl IntoResponse, ApiError> {
    let (Some(email), Some(password)) = (payload.email, payload.password) else {
        return Err(ApiError::validation("The email and password fields are required."));
    };
    let email = email.trim().to_lowercase();

    let Some(user) = crate::db::find_user_by_email(&state.db, email).await? else {
        return Err(ApiError::Unauthorized("Logging is failed."));
    };
    let stored = user.password_hash.clone();
    let verified = tokio::task::spawn_blocking(move || verify_password(&password, &stored))
        .await
        .map_err(|e| ApiError::Internal(e.to_string()))?;
    if !verified {
        tracing::warn!(user_id = user.id, "login with wrong password");
        return Err(ApiError::Unauthorized("Logging is failed."));
    }

    let token = create_jwt(&state.auth, &user).map_err(|e| ApiError::Internal(e.to_string()))?;
    Ok(Json(json!({
        "message": "User logged in successfully.",
        "token": token,
    })))
}

pub async fn me(user: AuthenticatedUser) -> impl IntoResponse {
    Json(json!({ "data": user }))
}
