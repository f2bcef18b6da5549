//! Configuration module
//!
//! Loads configuration from environment variables, following a fixed naming
//! convention across the write/read/fraud database roles and the message
//! broker and cache connections.

use std::env;

/// Application configuration, assembled once at process start and handed to
/// every binary (the HTTP server and the standalone consumers/scanner).
#[derive(Debug, Clone)]
pub struct Config {
    /// Three logical Postgres roles: the event log +
    /// saga table live on the write role, the read models on the read role,
    /// fraud tables on their own role. All three may point at the same
    /// physical database in a single-node deployment — the separation is
    /// enforced in code (three distinct pools, three distinct store types)
    /// rather than assumed from physical isolation.
    pub db_write_url: String,
    pub db_read_url: String,
    pub db_fraud_url: String,
    pub database_max_connections: u32,

    pub rabbitmq_host: String,
    pub rabbitmq_port: u16,
    pub rabbitmq_user: String,
    pub rabbitmq_password: String,

    pub redis_host: String,
    pub redis_port: u16,

    /// Idempotency record TTL.
    pub idempotency_ttl_seconds: u64,

    pub host: String,
    pub port: u16,

    pub environment: String,
}

impl Config {
    pub fn from_env() -> Result<Self, ConfigError> {
        let db_write_url = env::var("DB_WRITE_URL").or_else(|_| postgres_url_from_parts("DB_WRITE"))?;
        let db_read_url = env::var("DB_READ_URL").or_else(|_| postgres_url_from_parts("DB_READ"))?;
        let db_fraud_url = env::var("DB_FRAUD_URL").or_else(|_| postgres_url_from_parts("DB_FRAUD"))?;

        let database_max_connections = parse_env_or("DATABASE_MAX_CONNECTIONS", 10)?;

        let rabbitmq_host = env::var("RABBITMQ_HOST").unwrap_or_else(|_| "localhost".to_string());
        let rabbitmq_port = parse_env_or("RABBITMQ_PORT", 5672)?;
        let rabbitmq_user = env::var("RABBITMQ_USER").unwrap_or_else(|_| "guest".to_string());
        let rabbitmq_password = env::var("RABBITMQ_PASSWORD").unwrap_or_else(|_| "guest".to_string());

        let redis_host = env::var("REDIS_HOST").unwrap_or_else(|_| "localhost".to_string());
        let redis_port = parse_env_or("REDIS_PORT", 6379)?;

        let idempotency_ttl_seconds = parse_env_or("IDEMPOTENCY_TTL_SECONDS", 24 * 60 * 60)?;

        let host = env::var("HOST").unwrap_or_else(|_| "127.0.0.1".to_string());
        let port = parse_env_or("PORT", 3000)?;

        let environment = env::var("ENVIRONMENT").unwrap_or_else(|_| "development".to_string());

        Ok(Self {
            db_write_url,
            db_read_url,
            db_fraud_url,
            database_max_connections,
            rabbitmq_host,
            rabbitmq_port,
            rabbitmq_user,
            rabbitmq_password,
            redis_host,
            redis_port,
            idempotency_ttl_seconds,
            host,
            port,
            environment,
        })
    }

    pub fn is_production(&self) -> bool {
        self.environment == "production"
    }

    /// AMQP connection string built from the discrete `RABBITMQ_*` variables.
    pub fn rabbitmq_url(&self) -> String {
        format!(
            "amqp://{}:{}@{}:{}/%2f",
            self.rabbitmq_user, self.rabbitmq_password, self.rabbitmq_host, self.rabbitmq_port
        )
    }

    pub fn redis_url(&self) -> String {
        format!("redis://{}:{}", self.redis_host, self.redis_port)
    }
}

/// Builds a Postgres URL from `{prefix}_HOST/PORT/USER/PASSWORD/NAME`, for
/// deployments that prefer discrete variables over a single DSN per role.
fn postgres_url_from_parts(prefix: &str) -> Result<String, ConfigError> {
    let host = env::var(format!("{prefix}_HOST")).map_err(|_| ConfigError::MissingEnv("DB_WRITE_URL/DB_READ_URL/DB_FRAUD_URL or *_HOST"))?;
    let port = env::var(format!("{prefix}_PORT")).unwrap_or_else(|_| "5432".to_string());
    let user = env::var(format!("{prefix}_USER")).unwrap_or_else(|_| "postgres".to_string());
    let password = env::var(format!("{prefix}_PASSWORD")).unwrap_or_else(|_| "postgres".to_string());
    let name = env::var(format!("{prefix}_NAME")).unwrap_or_else(|_| "wallet_ledger".to_string());
    Ok(format!("postgres://{user}:{password}@{host}:{port}/{name}"))
}

fn parse_env_or<T: std::str::FromStr>(key: &'static str, default: T) -> Result<T, ConfigError> {
    match env::var(key) {
        Ok(raw) => raw.parse().map_err(|_| ConfigError::InvalidValue(key)),
        Err(_) => Ok(default),
    }
}

#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("missing environment variable: {0}")]
    MissingEnv(&'static str),

    #[error("invalid value for environment variable: {0}")]
    InvalidValue(&'static str),
}
