use once_cell::sync::Lazy;
use serde::{Deserialize, Serialize};
use std::env;
use std::str::FromStr;
use std::time::Duration;

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AppConfig {
    pub environment: Environment,
    pub filter: FilterConfig,
    pub database: DatabaseConfig,
    pub tenancy: TenancyConfig,
    pub feed: FeedConfig,
    pub storage: StorageConfig,
    pub api: ApiConfig,
    pub security: SecurityConfig,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub enum Environment {
    Development,
    Staging,
    Production,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FilterConfig {
    pub max_limit: Option<i64>,
    pub debug_logging: bool,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DatabaseConfig {
    pub url: Option<String>,
    pub max_connections: u32,
    /// Seconds to wait for a pooled connection
    pub connection_timeout: u64,
    /// Seconds any single store operation may take
    pub operation_timeout: u64,
    /// Seconds the startup backfill transaction may take
    pub migration_timeout: u64,
    pub enable_query_logging: bool,
}

impl DatabaseConfig {
    pub fn connection_timeout(&self) -> Duration {
        Duration::from_secs(self.connection_timeout)
    }

    pub fn operation_timeout(&self) -> Duration {
        Duration::from_secs(self.operation_timeout)
    }

    pub fn migration_timeout(&self) -> Duration {
        Duration::from_secs(self.migration_timeout)
    }
}

/// Tenant stamped onto legacy records by the startup backfill
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TenancyConfig {
    pub default_app_id: String,
    pub default_org_id: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FeedConfig {
    pub base_url: String,
    pub bearer_token: String,
    pub cache_ttl_secs: u64,
    pub request_timeout_secs: u64,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StorageConfig {
    pub root: String,
    pub public_base_url: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ApiConfig {
    pub port: u16,
    pub max_request_size_bytes: usize,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SecurityConfig {
    pub jwt_secret: String,
    pub jwt_expiry_hours: u64,
    pub admin_permission: String,
    pub cors_origins: Vec<String>,
}

impl AppConfig {
    pub fn from_env() -> Self {
        let environment = match env::var("APP_ENV").as_deref() {
            Ok("production") | Ok("prod") => Environment::Production,
            Ok("staging") | Ok("stage") => Environment::Staging,
            _ => Environment::Development,
        };

        // Set defaults based on environment, then override with specific env vars
        match environment {
            Environment::Production => Self::production(),
            Environment::Staging => Self::staging(),
            Environment::Development => Self::development(),
        }
        .with_env_overrides()
    }

    fn with_env_overrides(mut self) -> Self {
        if let Some(limit) = parsed("FILTER_MAX_LIMIT") {
            self.filter.max_limit = Some(limit);
        }
        override_parsed("FILTER_DEBUG_LOGGING", &mut self.filter.debug_logging);

        if let Ok(url) = env::var("DATABASE_URL") {
            self.database.url = Some(url);
        }
        override_parsed("DATABASE_MAX_CONNECTIONS", &mut self.database.max_connections);
        override_parsed("DATABASE_CONNECTION_TIMEOUT", &mut self.database.connection_timeout);
        override_parsed("DATABASE_OPERATION_TIMEOUT", &mut self.database.operation_timeout);
        override_parsed("DATABASE_MIGRATION_TIMEOUT", &mut self.database.migration_timeout);
        override_parsed("DATABASE_ENABLE_QUERY_LOGGING", &mut self.database.enable_query_logging);

        override_parsed("TENANCY_DEFAULT_APP_ID", &mut self.tenancy.default_app_id);
        override_parsed("TENANCY_DEFAULT_ORG_ID", &mut self.tenancy.default_org_id);

        override_parsed("FEED_BASE_URL", &mut self.feed.base_url);
        override_parsed("FEED_BEARER_TOKEN", &mut self.feed.bearer_token);
        override_parsed("FEED_CACHE_TTL_SECS", &mut self.feed.cache_ttl_secs);
        override_parsed("FEED_REQUEST_TIMEOUT_SECS", &mut self.feed.request_timeout_secs);

        override_parsed("STORAGE_ROOT", &mut self.storage.root);
        override_parsed("STORAGE_PUBLIC_BASE_URL", &mut self.storage.public_base_url);

        // CONTENT_API_PORT wins over the platform-provided PORT
        if let Some(port) = parsed("CONTENT_API_PORT").or_else(|| parsed("PORT")) {
            self.api.port = port;
        }
        override_parsed("API_MAX_REQUEST_SIZE_BYTES", &mut self.api.max_request_size_bytes);

        override_parsed("SECURITY_JWT_SECRET", &mut self.security.jwt_secret);
        override_parsed("SECURITY_JWT_EXPIRY_HOURS", &mut self.security.jwt_expiry_hours);
        override_parsed("SECURITY_ADMIN_PERMISSION", &mut self.security.admin_permission);
        if let Ok(origins) = env::var("SECURITY_CORS_ORIGINS") {
            self.security.cors_origins = split_origins(&origins);
        }

        self
    }

    fn development() -> Self {
        Self {
            environment: Environment::Development,
            filter: FilterConfig {
                max_limit: Some(1000),
                debug_logging: true,
            },
            database: DatabaseConfig {
                url: None,
                max_connections: 10,
                connection_timeout: 30,
                operation_timeout: 30,
                migration_timeout: 120,
                enable_query_logging: true,
            },
            tenancy: TenancyConfig::default(),
            feed: FeedConfig {
                base_url: "https://api.twitter.com/2".to_string(),
                bearer_token: String::new(),
                cache_ttl_secs: 300,
                request_timeout_secs: 10,
            },
            storage: StorageConfig {
                root: "./data/objects".to_string(),
                public_base_url: "http://localhost:3000/content/files".to_string(),
            },
            api: ApiConfig {
                port: 3000,
                max_request_size_bytes: 10 * 1024 * 1024, // 10MB
            },
            security: SecurityConfig {
                jwt_secret: "development-secret".to_string(),
                jwt_expiry_hours: 24 * 7, // 1 week
                admin_permission: "content_admin".to_string(),
                cors_origins: vec!["http://localhost:3000".to_string(), "http://localhost:5173".to_string()],
            },
        }
    }

    fn staging() -> Self {
        Self {
            environment: Environment::Staging,
            filter: FilterConfig {
                max_limit: Some(500),
                debug_logging: false,
            },
            database: DatabaseConfig {
                url: None,
                max_connections: 20,
                connection_timeout: 10,
                operation_timeout: 15,
                migration_timeout: 300,
                enable_query_logging: true,
            },
            tenancy: TenancyConfig::default(),
            feed: FeedConfig {
                base_url: "https://api.twitter.com/2".to_string(),
                bearer_token: String::new(),
                cache_ttl_secs: 300,
                request_timeout_secs: 5,
            },
            storage: StorageConfig {
                root: "/var/lib/content-api/objects".to_string(),
                public_base_url: "https://staging.example.com/content/files".to_string(),
            },
            api: ApiConfig {
                port: 3000,
                max_request_size_bytes: 5 * 1024 * 1024, // 5MB
            },
            security: SecurityConfig {
                jwt_secret: String::new(),
                jwt_expiry_hours: 24,
                admin_permission: "content_admin".to_string(),
                cors_origins: vec!["https://staging.example.com".to_string()],
            },
        }
    }

    fn production() -> Self {
        Self {
            environment: Environment::Production,
            filter: FilterConfig {
                max_limit: Some(100),
                debug_logging: false,
            },
            database: DatabaseConfig {
                url: None,
                max_connections: 50,
                connection_timeout: 5,
                operation_timeout: 10,
                migration_timeout: 600,
                enable_query_logging: false,
            },
            tenancy: TenancyConfig::default(),
            feed: FeedConfig {
                base_url: "https://api.twitter.com/2".to_string(),
                bearer_token: String::new(),
                cache_ttl_secs: 300,
                request_timeout_secs: 5,
            },
            storage: StorageConfig {
                root: "/var/lib/content-api/objects".to_string(),
                public_base_url: "https://app.example.com/content/files".to_string(),
            },
            api: ApiConfig {
                port: 3000,
                max_request_size_bytes: 2 * 1024 * 1024, // 2MB
            },
            security: SecurityConfig {
                jwt_secret: String::new(),
                jwt_expiry_hours: 4,
                admin_permission: "content_admin".to_string(),
                cors_origins: vec!["https://app.example.com".to_string()],
            },
        }
    }
}

/// Unset or unparsable variables yield `None`
fn parsed<T: FromStr>(key: &str) -> Option<T> {
    env::var(key).ok().and_then(|v| v.trim().parse().ok())
}

fn override_parsed<T: FromStr>(key: &str, target: &mut T) {
    if let Some(value) = parsed(key) {
        *target = value;
    }
}

fn split_origins(raw: &str) -> Vec<String> {
    raw.split(',').map(str::trim).filter(|o| !o.is_empty()).map(String::from).collect()
}

impl Default for TenancyConfig {
    fn default() -> Self {
        Self {
            default_app_id: "default".to_string(),
            default_org_id: "default".to_string(),
        }
    }
}

// Global singleton config - initialized once at startup
pub static CONFIG: Lazy<AppConfig> = Lazy::new(AppConfig::from_env);

// Convenience function for accessing config
pub fn config() -> &'static AppConfig {
    &CONFIG
}

#[macro_export]
macro_rules! is_production {
    () => {
        matches!($crate::config::CONFIG.environment, $crate::config::Environment::Production)
    };
}
