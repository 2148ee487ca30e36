//! Application settings loaded from environment variables.

use std::env;

use super::constants::{
    DEFAULT_DATABASE_URL, DEFAULT_JWT_AUDIENCE, DEFAULT_JWT_EXPIRATION_MINUTES,
    DEFAULT_JWT_ISSUER, DEFAULT_SERVER_HOST, DEFAULT_SERVER_PORT,
    DEFAULT_TOKEN_SWEEP_INTERVAL_SECONDS, MAX_JWT_EXPIRATION_MINUTES, MIN_JWT_SECRET_LENGTH,
};
use crate::errors::{AppError, AppResult};

/// Application configuration
#[derive(Clone)]
pub struct Config {
    pub database_url: String,
    jwt_secret: String,
    pub jwt_issuer: String,
    pub jwt_audience: String,
    pub jwt_expiration_minutes: i64,
    pub token_sweep_interval_seconds: u64,
    pub server_host: String,
    pub server_port: u16,
}

impl std::fmt::Debug for Config {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Config")
            .field("database_url", &"[REDACTED]")
            .field("jwt_secret", &"[REDACTED]")
            .field("jwt_issuer", &self.jwt_issuer)
            .field("jwt_audience", &self.jwt_audience)
            .field("jwt_expiration_minutes", &self.jwt_expiration_minutes)
            .field("token_sweep_interval_seconds", &self.token_sweep_interval_seconds)
            .field("server_host", &self.server_host)
            .field("server_port", &self.server_port)
            .finish()
    }
}

impl Config {
    /// Load configuration from environment variables.
    ///
    /// A `.env` file in the working directory is read first when present.
    ///
    /// # Errors
    /// Fails if JWT_SECRET is missing in a release build or is too short, or
    /// if JWT_EXPIRATION_MINUTES is outside `1..=MAX_JWT_EXPIRATION_MINUTES`.
    pub fn from_env() -> AppResult<Self> {
        dotenvy::dotenv().ok();

        let jwt_secret = match env::var("JWT_SECRET") {
            Ok(secret) => secret,
            Err(_) if cfg!(debug_assertions) => {
                tracing::warn!("JWT_SECRET not set, using insecure default for development");
                "dev-secret-key-minimum-32-chars!!".to_string()
            }
            Err(_) => {
                return Err(AppError::internal(
                    "JWT_SECRET environment variable must be set in production",
                ))
            }
        };

        Self::builder(jwt_secret)
            .database_url(env::var("DATABASE_URL").unwrap_or_else(|_| DEFAULT_DATABASE_URL.to_string()))
            .issuer(env::var("JWT_ISSUER").unwrap_or_else(|_| DEFAULT_JWT_ISSUER.to_string()))
            .audience(env::var("JWT_AUDIENCE").unwrap_or_else(|_| DEFAULT_JWT_AUDIENCE.to_string()))
            .expiration_minutes(parse_var("JWT_EXPIRATION_MINUTES", DEFAULT_JWT_EXPIRATION_MINUTES))
            .sweep_interval_seconds(parse_var(
                "TOKEN_SWEEP_INTERVAL_SECONDS",
                DEFAULT_TOKEN_SWEEP_INTERVAL_SECONDS,
            ))
            .server(
                env::var("SERVER_HOST").unwrap_or_else(|_| DEFAULT_SERVER_HOST.to_string()),
                parse_var("SERVER_PORT", DEFAULT_SERVER_PORT),
            )
            .build()
    }

    /// Start a configuration from defaults with the given signing secret.
    ///
    /// Used by tests and embedders that do not read the environment.
    pub fn builder(jwt_secret: impl Into<String>) -> ConfigBuilder {
        ConfigBuilder {
            config: Config {
                database_url: DEFAULT_DATABASE_URL.to_string(),
                jwt_secret: jwt_secret.into(),
                jwt_issuer: DEFAULT_JWT_ISSUER.to_string(),
                jwt_audience: DEFAULT_JWT_AUDIENCE.to_string(),
                jwt_expiration_minutes: DEFAULT_JWT_EXPIRATION_MINUTES,
                token_sweep_interval_seconds: DEFAULT_TOKEN_SWEEP_INTERVAL_SECONDS,
                server_host: DEFAULT_SERVER_HOST.to_string(),
                server_port: DEFAULT_SERVER_PORT,
            },
        }
    }

    /// Get JWT secret bytes for token signing/verification.
    pub fn jwt_secret_bytes(&self) -> &[u8] {
        self.jwt_secret.as_bytes()
    }

    /// Get the full server address.
    pub fn server_addr(&self) -> String {
        format!("{}:{}", self.server_host, self.server_port)
    }
}

/// Fluent construction of a [`Config`] with validation at `build()`.
pub struct ConfigBuilder {
    config: Config,
}

impl ConfigBuilder {
    pub fn database_url(mut self, url: impl Into<String>) -> Self {
        self.config.database_url = url.into();
        self
    }

    pub fn issuer(mut self, issuer: impl Into<String>) -> Self {
        self.config.jwt_issuer = issuer.into();
        self
    }

    pub fn audience(mut self, audience: impl Into<String>) -> Self {
        self.config.jwt_audience = audience.into();
        self
    }

    pub fn expiration_minutes(mut self, minutes: i64) -> Self {
        self.config.jwt_expiration_minutes = minutes;
        self
    }

    pub fn sweep_interval_seconds(mut self, seconds: u64) -> Self {
        self.config.token_sweep_interval_seconds = seconds;
        self
    }

    pub fn server(mut self, host: impl Into<String>, port: u16) -> Self {
        self.config.server_host = host.into();
        self.config.server_port = port;
        self
    }

    /// Validate and return the configuration.
    pub fn build(self) -> AppResult<Config> {
        if self.config.jwt_secret.len() < MIN_JWT_SECRET_LENGTH {
            return Err(AppError::internal(format!(
                "JWT_SECRET must be at least {} characters long",
                MIN_JWT_SECRET_LENGTH
            )));
        }
        if !(1..=MAX_JWT_EXPIRATION_MINUTES).contains(&self.config.jwt_expiration_minutes) {
            return Err(AppError::internal(format!(
                "JWT_EXPIRATION_MINUTES must be between 1 and {}",
                MAX_JWT_EXPIRATION_MINUTES
            )));
        }
        Ok(self.config)
    }
}

fn parse_var<T: std::str::FromStr>(name: &str, default: T) -> T {
    env::var(name)
        .ok()
        .and_then(|v| v.parse().ok())
        .unwrap_or(default)
}
