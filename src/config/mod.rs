use serde::{Deserialize, Serialize};
use std::env;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("Missing required configuration: {0}")]
    Missing(&'static str),

    #[error("Invalid value for {name}: {value}")]
    Invalid { name: &'static str, value: String },
}

/// Longest accepted token lifetime (one leap year).
pub const MAX_JWT_EXPIRY_HOURS: u64 = 24 * 366;

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AppConfig {
    pub environment: Environment,
    pub server: ServerConfig,
    pub filter: FilterConfig,
    pub database: DatabaseConfig,
    pub avatar: AvatarConfig,
    pub security: SecurityConfig,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum Environment {
    Development,
    Staging,
    Production,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ServerConfig {
    pub port: u16,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FilterConfig {
    /// Upper bound applied to an explicit `limit`; `None` disables the cap.
    pub max_limit: Option<u32>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DatabaseConfig {
    pub url: Option<String>,
    pub max_connections: u32,
    pub connection_timeout: u64,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AvatarConfig {
    pub max_upload_bytes: usize,
    pub dimension: u32,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SecurityConfig {
    #[serde(skip_serializing)]
    pub jwt_secret: String,
    pub jwt_expiry_hours: u64,
    pub argon2_memory_kib: u32,
    pub argon2_iterations: u32,
    pub argon2_parallelism: u32,
    pub enable_cors: bool,
}

impl AppConfig {
    /// Builds the configuration from the process environment.
    ///
    /// `JWT_SECRET` must be present and non-empty; every other value falls
    /// back to the defaults of the selected `APP_ENV` profile.
    pub fn from_env() -> Result<Self, ConfigError> {
        let environment = match env::var("APP_ENV").as_deref() {
            Ok("production") | Ok("prod") => Environment::Production,
            Ok("staging") | Ok("stage") => Environment::Staging,
            _ => Environment::Development,
        };

        let secret = env::var("JWT_SECRET").unwrap_or_default();

        Self::for_environment(environment, secret)?.with_env_overrides()
    }

    /// Profile defaults with an explicitly supplied signing secret.
    pub fn for_environment(environment: Environment, jwt_secret: impl Into<String>) -> Result<Self, ConfigError> {
        let jwt_secret = jwt_secret.into();
        if jwt_secret.trim().is_empty() {
            return Err(ConfigError::Missing("JWT_SECRET"));
        }

        let mut config = match environment {
            Environment::Production => Self::production(),
            Environment::Staging => Self::staging(),
            Environment::Development => Self::development(),
        };
        config.security.jwt_secret = jwt_secret;
        Ok(config)
    }

    fn with_env_overrides(mut self) -> Result<Self, ConfigError> {
        // Server overrides
        if let Some(v) = env::var("TASK_API_PORT").ok().or_else(|| env::var("PORT").ok()) {
            self.server.port = parse_var("PORT", &v)?;
        }

        // Filter overrides
        if let Ok(v) = env::var("FILTER_MAX_LIMIT") {
            self.filter.max_limit = v.parse().ok();
        }

        // Database overrides
        if let Ok(v) = env::var("DATABASE_URL") {
            self.database.url = Some(v);
        }
        if let Ok(v) = env::var("DATABASE_MAX_CONNECTIONS") {
            self.database.max_connections = v.parse().unwrap_or(self.database.max_connections);
        }
        if let Ok(v) = env::var("DATABASE_CONNECTION_TIMEOUT") {
            self.database.connection_timeout = v.parse().unwrap_or(self.database.connection_timeout);
        }

        // Avatar overrides
        if let Ok(v) = env::var("AVATAR_MAX_UPLOAD_BYTES") {
            self.avatar.max_upload_bytes = v.parse().unwrap_or(self.avatar.max_upload_bytes);
        }

        // Security overrides
        if let Ok(v) = env::var("SECURITY_JWT_EXPIRY_HOURS") {
            self.security.jwt_expiry_hours = parse_expiry_hours(&v)?;
        }
        if let Ok(v) = env::var("SECURITY_ARGON2_MEMORY_KIB") {
            self.security.argon2_memory_kib = parse_var("SECURITY_ARGON2_MEMORY_KIB", &v)?;
        }
        if let Ok(v) = env::var("SECURITY_ARGON2_ITERATIONS") {
            self.security.argon2_iterations = parse_var("SECURITY_ARGON2_ITERATIONS", &v)?;
        }
        if let Ok(v) = env::var("SECURITY_ARGON2_PARALLELISM") {
            self.security.argon2_parallelism = parse_var("SECURITY_ARGON2_PARALLELISM", &v)?;
        }
        if let Ok(v) = env::var("SECURITY_ENABLE_CORS") {
            self.security.enable_cors = v.parse().unwrap_or(self.security.enable_cors);
        }

        Ok(self)
    }

    fn development() -> Self {
        Self {
            environment: Environment::Development,
            server: ServerConfig { port: 3000 },
            filter: FilterConfig { max_limit: Some(1000) },
            database: DatabaseConfig {
                url: None,
                max_connections: 10,
                connection_timeout: 30,
            },
            avatar: AvatarConfig {
                max_upload_bytes: 1_000_000,
                dimension: 250,
            },
            security: SecurityConfig {
                jwt_secret: String::new(),
                jwt_expiry_hours: 24 * 7, // 1 week
                argon2_memory_kib: 19_456,
                argon2_iterations: 2,
                argon2_parallelism: 1,
                enable_cors: true,
            },
        }
    }

    fn staging() -> Self {
        Self {
            environment: Environment::Staging,
            filter: FilterConfig { max_limit: Some(500) },
            database: DatabaseConfig {
                url: None,
                max_connections: 20,
                connection_timeout: 10,
            },
            security: SecurityConfig {
                jwt_expiry_hours: 24,
                ..Self::development().security
            },
            ..Self::development()
        }
    }

    fn production() -> Self {
        Self {
            environment: Environment::Production,
            filter: FilterConfig { max_limit: Some(100) },
            database: DatabaseConfig {
                url: None,
                max_connections: 50,
                connection_timeout: 5,
            },
            security: SecurityConfig {
                jwt_expiry_hours: 4,
                argon2_memory_kib: 65_536,
                argon2_iterations: 3,
                enable_cors: false,
                ..Self::development().security
            },
            ..Self::development()
        }
    }
}

fn parse_var<T: std::str::FromStr>(name: &'static str, value: &str) -> Result<T, ConfigError> {
    value.trim().parse().map_err(|_| ConfigError::Invalid {
        name,
        value: value.to_string(),
    })
}

fn parse_expiry_hours(value: &str) -> Result<u64, ConfigError> {
    let hours: u64 = parse_var("SECURITY_JWT_EXPIRY_HOURS", value)?;
    if hours == 0 || hours > MAX_JWT_EXPIRY_HOURS {
        return Err(ConfigError::Invalid {
            name: "SECURITY_JWT_EXPIRY_HOURS",
            value: value.to_string(),
        });
    }
    Ok(hours)
}

#[cfg(test)]
impl AppConfig {
    /// Cheap hashing parameters so unit tests don't spend seconds in Argon2.
    pub fn for_tests() -> Self {
        let mut config = Self::development();
        config.security.jwt_secret = "test-signing-secret".to_string();
        config.security.argon2_memory_kib = 1024;
        config.security.argon2_iterations = 1;
        config
    }
}
