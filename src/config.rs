use std::env;
use std::fmt::Display;
use std::str::FromStr;
use std::time::Duration;

use crate::scan::KeyPatternSet;
use crate::snapshot::MergePolicy;

// --- ERROR ---

#[derive(Debug, Clone, PartialEq)]
pub struct ConfigError {
    pub key: String,
    pub reason: String,
}

impl std::fmt::Display for ConfigError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "Config error: {} {}", self.key, self.reason)
    }
}

impl std::error::Error for ConfigError {}

// --- CONFIG AGGREGATOR ---

#[derive(Debug, Clone)]
pub struct Config {
    pub server: ServerConfig,
    pub store: StoreConfig,
    pub scan: ScanConfig,
}

impl Config {
    /// Process environment, after `.env` if one is present.
    pub fn load() -> Result<Self, ConfigError> {
        dotenv::dotenv().ok();
        Self::from_lookup(|key| env::var(key).ok())
    }

    /// Loads from any key lookup. Unset and empty values both fall back to the default.
    pub fn from_lookup<F>(lookup: F) -> Result<Self, ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let env = Env(&lookup);
        Ok(Self {
            server: ServerConfig::load(&env)?,
            store: StoreConfig::load(&env)?,
            scan: ScanConfig::load(&env)?,
        })
    }
}

impl Default for Config {
    fn default() -> Self {
        Self {
            server: ServerConfig {
                host: "0.0.0.0".to_string(),
                port: 8001,
                log_level: "info".to_string(),
            },
            store: StoreConfig {
                addr: "127.0.0.1:6379".to_string(),
                timeout_ms: 5000,
            },
            scan: ScanConfig {
                key_patterns: KeyPatternSet::default(),
                merge_policy: MergePolicy::default(),
            },
        }
    }
}

// --- MODULES ---

// SERVER
#[derive(Debug, Clone)]
pub struct ServerConfig {
    pub host: String,
    pub port: u16,
    pub log_level: String,
}

impl ServerConfig {
    fn load(env: &Env<'_>) -> Result<Self, ConfigError> {
        Ok(Self {
            host:      env.get("HOST", "0.0.0.0")?,
            port:      env.get("PORT", "8001")?,
            log_level: env.get("EXPORTER_LOG", "info")?,
        })
    }

    pub fn listen_addr(&self) -> String {
        format!("{}:{}", self.host, self.port)
    }
}

// STORE
#[derive(Debug, Clone)]
pub struct StoreConfig {
    pub addr: String,
    pub timeout_ms: u64,
}

impl StoreConfig {
    fn load(env: &Env<'_>) -> Result<Self, ConfigError> {
        let config = Self {
            addr:       env.get("REDIS_ADDR", "127.0.0.1:6379")?,
            timeout_ms: env.get("REDIS_TIMEOUT_MS", "5000")?,
        };
        if config.timeout_ms == 0 {
            return Err(ConfigError {
                key: "REDIS_TIMEOUT_MS".to_string(),
                reason: "must be greater than zero".to_string(),
            });
        }
        Ok(config)
    }

    pub fn timeout(&self) -> Duration {
        Duration::from_millis(self.timeout_ms)
    }
}

// SCAN
#[derive(Debug, Clone)]
pub struct ScanConfig {
    pub key_patterns: KeyPatternSet,
    pub merge_policy: MergePolicy,
}

impl ScanConfig {
    fn load(env: &Env<'_>) -> Result<Self, ConfigError> {
        Ok(Self {
            key_patterns: env.get("REDIS_KEY_PATTERNS", "*")?,
            merge_policy: env.get("MERGE_POLICY", "zero-reset")?,
        })
    }
}

// --- PRIVATE HELPER ---

struct Env<'a>(&'a dyn Fn(&str) -> Option<String>);

impl Env<'_> {
    fn get<T>(&self, key: &str, default: &str) -> Result<T, ConfigError>
    where
        T: FromStr,
        T::Err: Display,
    {
        let raw = (self.0)(key).filter(|v| !v.trim().is_empty());
        raw.as_deref()
            .unwrap_or(default)
            .trim()
            .parse()
            .map_err(|err| ConfigError {
                key: key.to_string(),
                reason: format!("must be valid: {}", err),
            })
    }
}
