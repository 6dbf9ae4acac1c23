use std::{env, fmt, str::FromStr, sync::Arc, time::Duration};

use crate::error::{AppError, Res};

#[derive(Clone, Debug)]
/// Configuration struct for the server.
///
/// Built once at startup and handed to every component that needs it,
/// either by reference or through `web::Data<Arc<Config>>`.
/// It covers the HTTP listener, JWT verification, logging
/// and the backing store used for usage counters.
pub struct Config {
    // environment
    pub environment: String, // development or production
    /// Configuration for JWT (JSON Web Token) authentication.
    pub jwt_config: JwtConfig,
    /// The hostname or IP address the server will bind to.
    pub server_host: String,
    /// The port number the server will listen on.
    pub server_port: u16,
    /// The number of worker threads to spawn for handling requests.
    pub num_workers: usize,
    /// The allowed origin for CORS (Cross-Origin Resource Sharing).
    pub cors_allowed_origin: String,
    /// Mirror log records to stdout. The log file is always written.
    pub console_logging_enabled: bool,
    /// Path of the file the logger mirrors console output into.
    pub log_file: String,
    /// Where usage counters live.
    pub usage_store: UsageStoreConfig,
    /// Delay before the single retry of a failed usage store call.
    pub usage_retry_backoff: Duration,
    /// What a read-only gate check does when the usage store is unreachable.
    pub quota_read_policy: FailurePolicy,
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub enum UsageStoreConfig {
    /// Process-local counters. Lost on restart, not shared between instances.
    Memory,
    Redis { url: String },
    Postgres { url: String },
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum FailurePolicy {
    FailClosed,
    FailOpen,
}

impl FromStr for FailurePolicy {
    type Err = AppError;

    fn from_str(s: &str) -> Res<Self> {
        match s.to_lowercase().as_str() {
            "fail_closed" | "closed" => Ok(FailurePolicy::FailClosed),
            "fail_open" | "open" => Ok(FailurePolicy::FailOpen),
            other => Err(AppError::Config(format!(
                "QUOTA_READ_POLICY must be 'fail_closed' or 'fail_open', got '{}'",
                other
            ))),
        }
    }
}

impl fmt::Display for UsageStoreConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            UsageStoreConfig::Memory => write!(f, "memory"),
            UsageStoreConfig::Redis { .. } => write!(f, "redis"),
            UsageStoreConfig::Postgres { .. } => write!(f, "postgres"),
        }
    }
}

#[derive(Clone, Debug)]
/// Configuration for JSON Web Token (JWT) verification.
///
/// Tokens are issued by the auth provider; this service only checks
/// their signature and expiry.
pub struct JwtConfig {
    /// The secret key used to verify JWTs.
    pub secret: String,
}

impl JwtConfig {
    /// Reads `JWT_SECRET` (required).
    pub fn try_from_env() -> Res<Self> {
        Ok(JwtConfig {
            secret: required("JWT_SECRET")?,
        })
    }
}

impl Config {
    /// Creates a new `Config` instance from environment variables.
    ///
    /// # Environment Variables
    ///
    /// Required:
    /// - `ENVIRONMENT`: `development` or `production`
    /// - `JWT_SECRET`: Secret key for JWT verification
    /// - `REDIS_URL` when `USAGE_STORE=redis`, `DATABASE_URL` when `USAGE_STORE=postgres`
    ///
    /// Optional (with defaults):
    /// - `IP`: Server host (default: "127.0.0.1")
    /// - `PORT`: Server port (default: 8080)
    /// - `WORKERS`: Number of worker threads (default: 4)
    /// - `CORS_ALLOWED_ORIGIN`: Allowed CORS origin (default: "http://localhost:3000")
    /// - `ENABLE_CONSOLE_LOGGING`: Mirror logs to stdout; the log file is always written (default: true)
    /// - `LOG_FILE`: Log file path (default: "gatekeeper.log")
    /// - `USAGE_STORE`: `memory`, `redis` or `postgres` (default: memory)
    /// - `USAGE_RETRY_BACKOFF_MS`: Backoff before retrying the usage store (default: 50)
    /// - `QUOTA_READ_POLICY`: `fail_closed` or `fail_open` (default: fail_closed)
    pub fn try_from_env() -> Res<Arc<Self>> {
        dotenvy::dotenv().ok();

        let usage_store = match env::var("USAGE_STORE")
            .unwrap_or_else(|_| "memory".to_string())
            .to_lowercase()
            .as_str()
        {
            "memory" => UsageStoreConfig::Memory,
            "redis" => UsageStoreConfig::Redis {
                url: required("REDIS_URL")?,
            },
            "postgres" => UsageStoreConfig::Postgres {
                url: required("DATABASE_URL")?,
            },
            other => {
                return Err(AppError::Config(format!(
                    "USAGE_STORE must be one of memory, redis, postgres; got '{}'",
                    other
                )));
            }
        };

        Ok(Arc::new(Config {
            environment: required("ENVIRONMENT")?,
            jwt_config: JwtConfig::try_from_env()?,
            server_host: env::var("IP").unwrap_or_else(|_| "127.0.0.1".to_string()),
            server_port: parsed("PORT", 8080)?,
            num_workers: parsed("WORKERS", 4)?,
            cors_allowed_origin: env::var("CORS_ALLOWED_ORIGIN")
                .unwrap_or_else(|_| "http://localhost:3000".to_string()),
            console_logging_enabled: env::var("ENABLE_CONSOLE_LOGGING")
                .unwrap_or_else(|_| "true".to_string())
                .to_lowercase()
                == "true",
            log_file: env::var("LOG_FILE").unwrap_or_else(|_| "gatekeeper.log".to_string()),
            usage_store,
            usage_retry_backoff: Duration::from_millis(parsed("USAGE_RETRY_BACKOFF_MS", 50)?),
            quota_read_policy: match env::var("QUOTA_READ_POLICY") {
                Ok(value) => value.parse()?,
                Err(_) => FailurePolicy::FailClosed,
            },
        }))
    }

    /// Same as [`Config::try_from_env`], for the startup path.
    ///
    /// # Panics
    ///
    /// Panics if a required variable is missing or a value cannot be parsed.
    pub fn from_env() -> Arc<Self> {
        match Self::try_from_env() {
            Ok(config) => config,
            Err(e) => panic!("Invalid configuration: {}", e),
        }
    }

    pub fn is_production(&self) -> bool {
        self.environment == "production"
    }
}

fn required(key: &str) -> Res<String> {
    env::var(key).map_err(|_| AppError::Config(format!("{} must be set", key)))
}

fn parsed<T: FromStr>(key: &str, default: T) -> Res<T> {
    match env::var(key) {
        Ok(value) => value
            .parse()
            .map_err(|_| AppError::Config(format!("{} must be a valid number", key))),
        Err(_) => Ok(default),
    }
}
