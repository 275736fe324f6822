//! Process configuration, read from environment variables.

use std::time::Duration;

use thiserror::Error;

const DEFAULT_PORT: u16 = 8081;
const DEFAULT_CACHE_TTL_SECS: u64 = 300;
const MAX_CACHE_TTL_SECS: u64 = 30 * 24 * 60 * 60;
const DEFAULT_TOKEN_TTL_HOURS: i64 = 24;
const MAX_TOKEN_TTL_HOURS: i64 = 365 * 24;
const DEFAULT_FRONTEND_URL: &str = "http://localhost:3000";
const DEVELOPMENT_JWT_SECRET: &str = "development-only-secret-change-me";

#[derive(Debug, Error, PartialEq, Eq)]
pub enum ConfigError {
    #[error("missing required environment variable {0}")]
    Missing(&'static str),

    #[error("invalid value for {name}: {reason}")]
    Invalid { name: &'static str, reason: String },
}

/// Credentials of the administrator account created at startup when absent.
#[derive(Clone, PartialEq, Eq)]
pub struct SeedAdmin {
    pub name: String,
    pub email: String,
    pub password: String,
}

impl core::fmt::Debug for SeedAdmin {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        f.debug_struct("SeedAdmin")
            .field("name", &self.name)
            .field("email", &self.email)
            .field("password", &"<redacted>")
            .finish()
    }
}

#[derive(Clone)]
pub struct AppConfig {
    pub port: u16,
    pub jwt_secret: String,
    /// Postgres connection string. In-memory storage is used when absent.
    pub database_url: Option<String>,
    /// Redis connection string. An in-process cache is used when absent.
    pub redis_url: Option<String>,
    /// Browser origins allowed to call the API with credentials.
    pub allowed_origins: Vec<String>,
    pub cache_ttl: Duration,
    pub token_ttl: chrono::Duration,
    /// Adds the `Secure` attribute to the session cookie.
    pub cookie_secure: bool,
    pub seed_admin: Option<SeedAdmin>,
}

impl core::fmt::Debug for AppConfig {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        f.debug_struct("AppConfig")
            .field("port", &self.port)
            .field("jwt_secret", &"<redacted>")
            .field("database_url", &self.database_url.as_ref().map(|_| "<set>"))
            .field("redis_url", &self.redis_url.as_ref().map(|_| "<set>"))
            .field("allowed_origins", &self.allowed_origins)
            .field("cache_ttl", &self.cache_ttl)
            .field("token_ttl", &self.token_ttl)
            .field("cookie_secure", &self.cookie_secure)
            .field("seed_admin", &self.seed_admin)
            .finish()
    }
}

impl AppConfig {
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_lookup(|name| std::env::var(name).ok())
    }

    /// Build the configuration from an arbitrary variable source.
    pub fn from_lookup<F>(lookup: F) -> Result<Self, ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let var = |name: &str| lookup(name).map(|v| v.trim().to_string()).filter(|v| !v.is_empty());

        let development = var("APP_ENV").is_some_and(|env| env.eq_ignore_ascii_case("development"));

        let jwt_secret = match var("JWT_SECRET") {
            Some(secret) => secret,
            None if development => {
                tracing::warn!("JWT_SECRET not set; using the development fallback secret");
                DEVELOPMENT_JWT_SECRET.to_string()
            }
            None => return Err(ConfigError::Missing("JWT_SECRET")),
        };

        let port = parse_or("PORT", var("PORT"), DEFAULT_PORT)?;
        let cache_ttl_secs = parse_or("CACHE_TTL_SECS", var("CACHE_TTL_SECS"), DEFAULT_CACHE_TTL_SECS)?;
        if !(1..=MAX_CACHE_TTL_SECS).contains(&cache_ttl_secs) {
            return Err(ConfigError::Invalid {
                name: "CACHE_TTL_SECS",
                reason: format!("must be between 1 and {MAX_CACHE_TTL_SECS} seconds"),
            });
        }
        let token_ttl_hours = parse_or("TOKEN_TTL_HOURS", var("TOKEN_TTL_HOURS"), DEFAULT_TOKEN_TTL_HOURS)?;
        let token_ttl = Some(token_ttl_hours)
            .filter(|hours| (1..=MAX_TOKEN_TTL_HOURS).contains(hours))
            .and_then(chrono::Duration::try_hours)
            .ok_or_else(|| ConfigError::Invalid {
                name: "TOKEN_TTL_HOURS",
                reason: format!("must be between 1 and {MAX_TOKEN_TTL_HOURS} hours"),
            })?;
        let cookie_secure = parse_or("COOKIE_SECURE", var("COOKIE_SECURE"), false)?;

        let allowed_origins = var("FRONTEND_URL")
            .unwrap_or_else(|| DEFAULT_FRONTEND_URL.to_string())
            .split(',')
            .map(str::trim)
            .filter(|o| !o.is_empty())
            .map(str::to_string)
            .collect();

        let seed_admin = match (var("SEED_ADMIN_EMAIL"), var("SEED_ADMIN_PASSWORD")) {
            (Some(email), Some(password)) => Some(SeedAdmin {
                name: var("SEED_ADMIN_NAME").unwrap_or_else(|| "Administrator".to_string()),
                email: email.to_lowercase(),
                password,
            }),
            (None, None) => None,
            (Some(_), None) => return Err(ConfigError::Missing("SEED_ADMIN_PASSWORD")),
            (None, Some(_)) => return Err(ConfigError::Missing("SEED_ADMIN_EMAIL")),
        };

        Ok(Self {
            port,
            jwt_secret,
            database_url: var("DATABASE_URL"),
            redis_url: var("REDIS_URL"),
            allowed_origins,
            cache_ttl: Duration::from_secs(cache_ttl_secs),
            token_ttl,
            cookie_secure,
            seed_admin,
        })
    }

    /// In-memory configuration with the given signing secret.
    pub fn for_tests(jwt_secret: impl Into<String>) -> Self {
        Self {
            port: 0,
            jwt_secret: jwt_secret.into(),
            database_url: None,
            redis_url: None,
            allowed_origins: vec![DEFAULT_FRONTEND_URL.to_string()],
            cache_ttl: Duration::from_secs(DEFAULT_CACHE_TTL_SECS),
            token_ttl: chrono::Duration::hours(DEFAULT_TOKEN_TTL_HOURS),
            cookie_secure: false,
            seed_admin: None,
        }
    }
}

fn parse_or<T>(name: &'static str, raw: Option<String>, default: T) -> Result<T, ConfigError>
where
    T: core::str::FromStr,
    T::Err: core::fmt::Display,
{
    match raw {
        None => Ok(default),
        Some(raw) => raw.parse().map_err(|e: T::Err| ConfigError::Invalid {
            name,
            reason: e.to_string(),
        }),
    }
}
