use figment::{
    providers::{Env, Format, Toml},
    Figment,
};
use serde::{Deserialize, Serialize};

pub const DEFAULT_PORT: u16 = 8787;
pub const DEFAULT_BIND: &str = "127.0.0.1";
/// Lifetime of a request-scoped cache entry.
pub const DEFAULT_CACHE_TTL_MS: i64 = 5_000;
pub const DEFAULT_PROXY_HEADER: &str = "x-user-id";

/// Top-level config (shiftlog.toml + SHIFTLOG_* env overrides).
#[derive(Debug, Clone, Serialize, Deserialize, Default)]
pub struct ShiftlogConfig {
    #[serde(default)]
    pub gateway: GatewayConfig,
    #[serde(default)]
    pub database: DatabaseConfig,
    #[serde(default)]
    pub auth: AuthConfig,
    #[serde(default)]
    pub cache: CacheConfig,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct GatewayConfig {
    #[serde(default = "default_port")]
    pub port: u16,
    #[serde(default = "default_bind")]
    pub bind: String,
}

impl Default for GatewayConfig {
    fn default() -> Self {
        Self {
            port: DEFAULT_PORT,
            bind: DEFAULT_BIND.to_string(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DatabaseConfig {
    #[serde(default = "default_db_path")]
    pub path: String,
}

impl Default for DatabaseConfig {
    fn default() -> Self {
        Self {
            path: default_db_path(),
        }
    }
}

/// How the gateway learns who is calling.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq, Default)]
#[serde(rename_all = "kebab-case")]
pub enum AuthMode {
    /// `Authorization: Bearer <token>` looked up in `auth.tokens`.
    #[default]
    Token,
    /// Identity injected by an authenticating reverse proxy in `auth.proxy_header`.
    TrustedProxy,
    /// Every request runs as `auth.dev_user`. Local use only.
    None,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TokenEntry {
    pub token: String,
    pub user_id: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AuthConfig {
    #[serde(default)]
    pub mode: AuthMode,
    #[serde(default)]
    pub tokens: Vec<TokenEntry>,
    #[serde(default = "default_proxy_header")]
    pub proxy_header: String,
    pub dev_user: Option<String>,
}

impl Default for AuthConfig {
    fn default() -> Self {
        Self {
            mode: AuthMode::Token,
            tokens: Vec::new(),
            proxy_header: default_proxy_header(),
            dev_user: None,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CacheConfig {
    #[serde(default = "default_cache_ttl_ms")]
    pub ttl_ms: i64,
}

impl Default for CacheConfig {
    fn default() -> Self {
        Self {
            ttl_ms: DEFAULT_CACHE_TTL_MS,
        }
    }
}

fn default_port() -> u16 {
    DEFAULT_PORT
}
fn default_bind() -> String {
    DEFAULT_BIND.to_string()
}
fn default_proxy_header() -> String {
    DEFAULT_PROXY_HEADER.to_string()
}
fn default_cache_ttl_ms() -> i64 {
    DEFAULT_CACHE_TTL_MS
}
fn default_db_path() -> String {
    let home = std::env::var("HOME").unwrap_or_else(|_| ".".to_string());
    format!("{}/.shiftlog/shiftlog.db", home)
}

impl ShiftlogConfig {
    /// Load config from a TOML file with SHIFTLOG_* env var overrides.
    ///
    /// Path: explicit argument, else ~/.shiftlog/shiftlog.toml. A missing file
    /// is not an error; every section has defaults.
    pub fn load(config_path: Option<&str>) -> crate::error::Result<Self> {
        let path = config_path
            .map(String::from)
            .unwrap_or_else(default_config_path);
        tracing::debug!(path = %path, "loading config");

        let config: ShiftlogConfig = Figment::new()
            .merge(Toml::file(&path))
            .merge(Env::prefixed("SHIFTLOG_").map(|key| env_key(key.as_str()).into()))
            .extract()
            .map_err(|e| crate::error::ShiftlogError::Config(e.to_string()))?;

        config.validate()?;
        Ok(config)
    }

    fn validate(&self) -> crate::error::Result<()> {
        if self.cache.ttl_ms < 0 {
            return Err(crate::error::ShiftlogError::Config(format!(
                "cache.ttl_ms must be >= 0, got {}",
                self.cache.ttl_ms
            )));
        }
        if self.auth.mode == AuthMode::None && self.auth.dev_user.is_none() {
            return Err(crate::error::ShiftlogError::Config(
                "auth.mode = \"none\" requires auth.dev_user".to_string(),
            ));
        }
        Ok(())
    }
}

/// Top-level tables that `SHIFTLOG_<SECTION>_<FIELD>` variables address.
const ENV_SECTIONS: &[&str] = &["gateway", "database", "auth", "cache"];

/// Map an env key (prefix stripped) to a config path. Only the first `_`
/// separates section from field, so `CACHE_TTL_MS` becomes `cache.ttl_ms`.
fn env_key(raw: &str) -> String {
    let key = raw.to_ascii_lowercase();
    if let Some((section, field)) = key.split_once('_') {
        if ENV_SECTIONS.contains(&section) {
            return format!("{section}.{field}");
        }
    }
    key
}

fn default_config_path() -> String {
    let home = std::env::var("HOME").unwrap_or_else(|_| ".".to_string());
    format!("{}/.shiftlog/shiftlog.toml", home)
}
