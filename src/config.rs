use anyhow::{Context, Result};
use sqlx::postgres::{PgConnectOptions, PgSslMode};
use std::str::FromStr;
use std::time::Duration;

// ============================================================================
// Service Configuration
// ============================================================================
//
// Read from the environment, after loading `.env` if one exists. Every
// option has a default; a value that is set but unparsable is an error.
//
// ============================================================================

#[derive(Debug, Clone)]
pub struct Config {
    pub grpc_port: u16,
    pub grpc_request_timeout: Duration,
    pub metrics_port: u16,

    pub kafka_brokers: String,
    pub kafka_topic_order_created: String,
    pub kafka_publish_timeout: Duration,

    pub database: DatabaseConfig,
    pub db_max_connections: u32,
}

#[derive(Clone)]
pub enum DatabaseConfig {
    Url(String),
    Parts {
        host: String,
        port: u16,
        user: String,
        password: String,
        name: String,
    },
}

impl std::fmt::Debug for DatabaseConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            DatabaseConfig::Url(_) => f.write_str("Url(<redacted>)"),
            DatabaseConfig::Parts {
                host, port, user, name, ..
            } => f
                .debug_struct("Parts")
                .field("host", host)
                .field("port", port)
                .field("user", user)
                .field("name", name)
                .finish_non_exhaustive(),
        }
    }
}

impl DatabaseConfig {
    pub fn connect_options(&self) -> Result<PgConnectOptions> {
        match self {
            DatabaseConfig::Url(url) => {
                PgConnectOptions::from_str(url).context("DATABASE_URL is not a valid connection URL")
            }
            DatabaseConfig::Parts {
                host,
                port,
                user,
                password,
                name,
            } => Ok(PgConnectOptions::new()
                .host(host)
                .port(*port)
                .username(user)
                .password(password)
                .database(name)
                .ssl_mode(PgSslMode::Disable)),
        }
    }
}

impl Config {
    pub fn from_env() -> Result<Self> {
        if let Ok(path) = dotenvy::dotenv() {
            tracing::debug!(path = %path.display(), "Loaded .env");
        }
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Build from any key lookup; empty values count as unset.
    pub fn from_lookup<F>(lookup: F) -> Result<Self>
    where
        F: Fn(&str) -> Option<String>,
    {
        let get = |key: &str| lookup(key).filter(|v| !v.trim().is_empty());
        let string = |key: &str, default: &str| get(key).unwrap_or_else(|| default.to_string());

        let database = match get("DATABASE_URL") {
            Some(url) => DatabaseConfig::Url(url),
            None => DatabaseConfig::Parts {
                host: string("DB_HOST", "localhost"),
                port: parse(&get, "DB_PORT", 5432)?,
                user: string("DB_USER", "postgres"),
                password: string("DB_PASSWORD", "postgres"),
                name: string("DB_NAME", "orderdb"),
            },
        };

        Ok(Self {
            grpc_port: parse(&get, "GRPC_PORT", 5001)?,
            grpc_request_timeout: Duration::from_secs(parse(&get, "GRPC_REQUEST_TIMEOUT_SECS", 30)?),
            metrics_port: parse(&get, "METRICS_PORT", 9090)?,
            kafka_brokers: string("KAFKA_BROKERS", "localhost:9092"),
            kafka_topic_order_created: string("KAFKA_TOPIC_ORDER_CREATED", "order.created"),
            kafka_publish_timeout: Duration::from_secs(parse(&get, "KAFKA_PUBLISH_TIMEOUT_SECS", 15)?),
            database,
            db_max_connections: parse(&get, "DB_MAX_CONNECTIONS", 10)?,
        })
    }
}

fn parse<T, G>(get: &G, key: &str, default: T) -> Result<T>
where
    T: FromStr,
    T::Err: std::error::Error + Send + Sync + 'static,
    G: Fn(&str) -> Option<String>,
{
    match get(key) {
        Some(raw) => raw
            .trim()
            .parse()
            .with_context(|| format!("{key} has invalid value {raw:?}")),
        None => Ok(default),
    }
}
