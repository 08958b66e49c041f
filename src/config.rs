use std::env;
use std::net::SocketAddr;
use std::path::PathBuf;

use crate::auth::AuthConfig;

/// Runtime settings, read from the environment (and `.env` when present).
#[derive(Debug, Clone)]
pub struct Config {
    pub database_path: PathBuf,
    pub db_pool_size: u32,
    pub bind_addr: SocketAddr,
    pub auth: AuthConfig,
    pub rate_limit_per_second: u64,
    pub rate_limit_burst: u32,
    pub allowed_origins: Vec<String>,
    pub production: bool,
}

fn parsed_or<T: std::str::FromStr>(key: &str, default: T) -> T {
    env::var(key).ok().and_then(|v| v.parse::<T>().ok()).unwrap_or(default)
}

impl Config {
    pub fn from_env() -> anyhow::Result<Self> {
        let production = env::var("RUST_ENV").map(|v| v == "production").unwrap_or(false);

        let jwt_secret =
            env::var("JWT_SECRET").map_err(|_| anyhow::anyhow!("JWT_SECRET must be set"))?;
        if jwt_secret.trim().is_empty() {
            anyhow::bail!("JWT_SECRET must not be empty");
        }

        let bind_addr = env::var("BIND_ADDR").unwrap_or_else(|_| "0.0.0.0:8080".to_string());
        let bind_addr: SocketAddr = bind_addr
            .parse()
            .map_err(|e| anyhow::anyhow!("Invalid BIND_ADDR '{}': {}", bind_addr, e))?;

        let allowed_origins: Vec<String> = env::var("ALLOWED_ORIGINS")
            .unwrap_or_default()
            .split(',')
            .map(|s| s.trim().to_string())
            .filter(|s| !s.is_empty())
            .collect();
        if production && allowed_origins.is_empty() {
            anyhow::bail!("ALLOWED_ORIGINS must be set in production");
        }

        Ok(Config {
            database_path: env::var("DATABASE_PATH")
                .map(PathBuf::from)
                .unwrap_or_else(|_| PathBuf::from("crowdfund.db")),
            db_pool_size: parsed_or("DB_POOL_SIZE", 10),
            bind_addr,
            auth: AuthConfig {
                secret: jwt_secret,
                ttl: chrono::Duration::hours(parsed_or("JWT_TTL_HOURS", 24)),
                issuer: env::var("JWT_ISSUER").ok(),
                audience: env::var("JWT_AUDIENCE").ok(),
            },
            rate_limit_per_second: parsed_or("RATE_LIMIT_PER_SECOND", 50),
            rate_limit_burst: parsed_or("RATE_LIMIT_BURST", 100),
            allowed_origins,
            production,
        })
    }
}
