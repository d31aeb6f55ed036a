use figment::{
    providers::{Env, Format, Toml},
    Figment,
};
use serde::{Deserialize, Serialize};

pub const DEFAULT_PORT: u16 = 3100;
pub const DEFAULT_BIND: &str = "127.0.0.1";

/// Top-level config (txr.toml + TXR_* env overrides).
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct TxrConfig {
    #[serde(default)]
    pub gateway: GatewayConfig,
    #[serde(default)]
    pub database: DatabaseConfig,
    #[serde(default)]
    pub scheduler: SchedulerConfig,
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

/// Scheduler subsystem configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SchedulerConfig {
    /// Re-arm every ACTIVE sequence when the process starts (default: true).
    #[serde(default = "bool_true")]
    pub restore_on_start: bool,
}

impl Default for SchedulerConfig {
    fn default() -> Self {
        Self {
            restore_on_start: true,
        }
    }
}

fn bool_true() -> bool {
    true
}
fn default_port() -> u16 {
    DEFAULT_PORT
}
fn default_bind() -> String {
    DEFAULT_BIND.to_string()
}
fn default_db_path() -> String {
    let home = std::env::var("HOME").unwrap_or_else(|_| ".".to_string());
    format!("{}/.txr/txr.db", home)
}

impl TxrConfig {
    /// Load config from a TOML file with TXR_* env var overrides.
    ///
    /// Uses the explicit path when given, otherwise `~/.txr/txr.toml`.
    /// A missing file is not an error; every field has a default.
    pub fn load(config_path: Option<&str>) -> crate::error::Result<Self> {
        let path = config_path
            .map(String::from)
            .unwrap_or_else(default_config_path);

        let config: TxrConfig = Figment::new()
            .merge(Toml::file(&path))
            .merge(Env::prefixed("TXR_").split("_"))
            .extract()
            .map_err(|e| crate::error::TxrError::Config(e.to_string()))?;

        Ok(config)
    }
}

fn default_config_path() -> String {
    let home = std::env::var("HOME").unwrap_or_else(|_| ".".to_string());
    format!("{}/.txr/txr.toml", home)
}
