use std::env;
use std::str::FromStr;
use std::time::Duration;

fn env_string(key: &str, default: &str) -> String {
    env::var(key).unwrap_or_else(|_| default.to_string())
}

/// Parsed value of `key`, or `default` when unset or unparsable
fn env_or<T: FromStr>(key: &str, default: T) -> T {
    env::var(key).ok().and_then(|s| s.parse().ok()).unwrap_or(default)
}

/// Database configuration
#[derive(Debug, Clone)]
pub struct DatabaseConfig {
    pub url: String,
    pub max_connections: u32,
    pub acquire_timeout_secs: u64,
    pub idle_timeout_secs: u64,
    pub max_lifetime_secs: u64,
    pub test_before_acquire: bool,
}

/// Which `DraftStore` implementation the service runs on
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StoreBackend {
    Postgres,
    Memory,
}

impl StoreBackend {
    fn parse(s: &str) -> Result<Self, String> {
        match s.to_lowercase().as_str() {
            "postgres" | "postgresql" => Ok(StoreBackend::Postgres),
            "memory" => Ok(StoreBackend::Memory),
            other => Err(format!(
                "Invalid STORE_BACKEND: {}. Must be one of: [\"postgres\", \"memory\"]",
                other
            )),
        }
    }
}

/// Champion roster source and cache settings
#[derive(Debug, Clone)]
pub struct ChampionConfig {
    pub data_url: String,
    pub cache_ttl_secs: u64,
    pub fallback_version: String,
}

impl ChampionConfig {
    pub fn from_env() -> Self {
        let defaults = Self::default();

        Self {
            data_url: env_or("CHAMPION_DATA_URL", defaults.data_url),
            cache_ttl_secs: env_or("CHAMPION_CACHE_TTL_SECS", defaults.cache_ttl_secs),
            fallback_version: env_or("CHAMPION_FALLBACK_VERSION", defaults.fallback_version),
        }
    }

    pub fn cache_ttl(&self) -> Duration {
        Duration::from_secs(self.cache_ttl_secs)
    }
}

impl Default for ChampionConfig {
    fn default() -> Self {
        Self {
            data_url: "https://ddragon.leagueoflegends.com".to_string(),
            cache_ttl_secs: 21600, // 6 hours
            fallback_version: "14.1.1".to_string(),
        }
    }
}

/// Bounded exponential backoff for transient store failures
#[derive(Debug, Clone)]
pub struct RetryConfig {
    pub max_attempts: u32,
    pub initial_delay_ms: u64,
}

impl RetryConfig {
    pub fn from_env() -> Self {
        let defaults = Self::default();

        Self {
            max_attempts: env_or("RETRY_MAX_ATTEMPTS", defaults.max_attempts),
            initial_delay_ms: env_or("RETRY_INITIAL_DELAY_MS", defaults.initial_delay_ms),
        }
    }

    pub fn initial_delay(&self) -> Duration {
        Duration::from_millis(self.initial_delay_ms)
    }
}

impl Default for RetryConfig {
    fn default() -> Self {
        Self {
            max_attempts: 3,
            initial_delay_ms: 1000,
        }
    }
}

/// Application configuration
#[derive(Debug, Clone)]
pub struct AppConfig {
    pub store_backend: StoreBackend,
    pub database: DatabaseConfig,
    pub champions: ChampionConfig,
    pub retry: RetryConfig,
    pub log_level: String,
    pub log_json: bool,
    pub ws_port: u16,
    pub audit_log_dir: String,
    pub environment: String,
}

impl DatabaseConfig {
    /// Create database config from environment variables
    pub fn from_env() -> Result<Self, String> {
        let url = env::var("DATABASE_URL")
            .map_err(|_| "DATABASE_URL environment variable is required")?;

        let defaults = Self::default();
        let max_connections = env_or("DATABASE_MAX_CONNECTIONS", defaults.max_connections);
        let acquire_timeout_secs =
            env_or("DATABASE_ACQUIRE_TIMEOUT_SECS", defaults.acquire_timeout_secs);
        let idle_timeout_secs = env_or("DATABASE_IDLE_TIMEOUT_SECS", defaults.idle_timeout_secs);
        let max_lifetime_secs = env_or("DATABASE_MAX_LIFETIME_SECS", defaults.max_lifetime_secs);
        let test_before_acquire =
            env_or("DATABASE_TEST_BEFORE_ACQUIRE", defaults.test_before_acquire);

        if max_connections == 0 {
            return Err("DATABASE_MAX_CONNECTIONS must be greater than 0".to_string());
        }

        if acquire_timeout_secs == 0 {
            return Err("DATABASE_ACQUIRE_TIMEOUT_SECS must be greater than 0".to_string());
        }

        Ok(Self {
            url,
            max_connections,
            acquire_timeout_secs,
            idle_timeout_secs,
            max_lifetime_secs,
            test_before_acquire,
        })
    }

    /// Get acquire timeout as Duration
    pub fn acquire_timeout(&self) -> Duration {
        Duration::from_secs(self.acquire_timeout_secs)
    }

    /// Get idle timeout as Duration
    pub fn idle_timeout(&self) -> Duration {
        Duration::from_secs(self.idle_timeout_secs)
    }

    /// Get max lifetime as Duration
    pub fn max_lifetime(&self) -> Duration {
        Duration::from_secs(self.max_lifetime_secs)
    }
}

impl Default for DatabaseConfig {
    fn default() -> Self {
        Self {
            url: "postgresql://localhost/pickem".to_string(),
            max_connections: 10,
            acquire_timeout_secs: 30,
            idle_timeout_secs: 600,
            max_lifetime_secs: 1800,
            test_before_acquire: true,
        }
    }
}

impl AppConfig {
    /// Create application config from environment variables
    pub fn from_env() -> Result<Self, String> {
        let store_backend = StoreBackend::parse(
            &env_string("STORE_BACKEND", "postgres"),
        )?;

        // The memory backend never opens a pool, so DATABASE_URL is optional there
        let database = match store_backend {
            StoreBackend::Postgres => DatabaseConfig::from_env()?,
            StoreBackend::Memory => DatabaseConfig::default(),
        };

        let log_level = env_string("LOG_LEVEL", "info");
        let log_format = env_string("LOG_FORMAT", "pretty");
        let ws_port: u16 = env_or("WS_PORT", 8080);
        let audit_log_dir = env_string("AUDIT_LOG_DIR", "./logs");
        let environment = env_string("ENVIRONMENT", "development");

        // Validate log level
        let valid_log_levels = ["trace", "debug", "info", "warn", "error"];
        if !valid_log_levels.contains(&log_level.to_lowercase().as_str()) {
            return Err(format!(
                "Invalid LOG_LEVEL: {}. Must be one of: {:?}",
                log_level, valid_log_levels
            ));
        }

        let valid_log_formats = ["pretty", "json"];
        if !valid_log_formats.contains(&log_format.to_lowercase().as_str()) {
            return Err(format!(
                "Invalid LOG_FORMAT: {}. Must be one of: {:?}",
                log_format, valid_log_formats
            ));
        }

        // Validate environment
        let valid_environments = ["development", "staging", "production"];
        if !valid_environments.contains(&environment.to_lowercase().as_str()) {
            return Err(format!(
                "Invalid ENVIRONMENT: {}. Must be one of: {:?}",
                environment, valid_environments
            ));
        }

        Ok(Self {
            store_backend,
            database,
            champions: ChampionConfig::from_env(),
            retry: RetryConfig::from_env(),
            log_level: log_level.to_lowercase(),
            log_json: log_format.eq_ignore_ascii_case("json"),
            ws_port,
            audit_log_dir,
            environment: environment.to_lowercase(),
        })
    }

    /// Check if running in production
    pub fn is_production(&self) -> bool {
        self.environment == "production"
    }

    /// Check if running in development
    pub fn is_development(&self) -> bool {
        self.environment == "development"
    }
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            store_backend: StoreBackend::Postgres,
            database: DatabaseConfig::default(),
            champions: ChampionConfig::default(),
            retry: RetryConfig::default(),
            log_level: "info".to_string(),
            log_json: false,
            ws_port: 8080,
            audit_log_dir: "./logs".to_string(),
            environment: "development".to_string(),
        }
    }
}
