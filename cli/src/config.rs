use serde::{Deserialize, Serialize};
use std::fs;

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Config {
    pub db_path: String,
    pub admin_host: String,
    pub admin_port: u16,
    pub score_limit: i32,
    pub session_ttl_secs: u64,
    pub sweep_interval_secs: u64,
    pub default_category: String,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            db_path: "tunequiz.db".into(),
            admin_host: "127.0.0.1".into(),
            admin_port: 8080,
            score_limit: 5,
            session_ttl_secs: 30 * 60,
            sweep_interval_secs: 10,
            default_category: "any".into(),
        }
    }
}

#[derive(Debug)]
pub enum ConfigError {
    Io(std::io::Error),
    Parse(toml::de::Error),
    Invalid(String),
}

impl From<std::io::Error> for ConfigError {
    fn from(e: std::io::Error) -> Self {
        ConfigError::Io(e)
    }
}
impl From<toml::de::Error> for ConfigError {
    fn from(e: toml::de::Error) -> Self {
        ConfigError::Parse(e)
    }
}

impl std::fmt::Display for ConfigError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{:?}", self)
    }
}

pub fn load() -> Result<Config, ConfigError> {
    let mut cfg = Config::default();
    if let Ok(path) = std::env::var("TQ_CONFIG") {
        let s = fs::read_to_string(path)?;
        let f: FileConfig = toml::from_str(&s)?;
        apply_file(&mut cfg, f);
    }

    if let Ok(db) = std::env::var("TQ_DB_PATH") {
        if !db.is_empty() {
            cfg.db_path = db;
        }
    }
    if let Ok(host) = std::env::var("TQ_ADMIN_HOST") {
        if !host.is_empty() {
            cfg.admin_host = host;
        }
    }
    if let Ok(port) = std::env::var("TQ_ADMIN_PORT") {
        if !port.is_empty() {
            cfg.admin_port = port
                .parse()
                .map_err(|_| ConfigError::Invalid("Invalid admin port".into()))?;
        }
    }
    if let Ok(limit) = std::env::var("TQ_SCORE_LIMIT") {
        if !limit.is_empty() {
            cfg.score_limit = limit
                .parse()
                .map_err(|_| ConfigError::Invalid("Invalid score limit".into()))?;
        }
    }
    if let Ok(ttl) = std::env::var("TQ_SESSION_TTL_SECS") {
        if !ttl.is_empty() {
            cfg.session_ttl_secs = ttl
                .parse()
                .map_err(|_| ConfigError::Invalid("Invalid session ttl".into()))?;
        }
    }
    if let Ok(interval) = std::env::var("TQ_SWEEP_INTERVAL_SECS") {
        if !interval.is_empty() {
            cfg.sweep_interval_secs = interval
                .parse()
                .map_err(|_| ConfigError::Invalid("Invalid sweep interval".into()))?;
        }
    }
    if let Ok(category) = std::env::var("TQ_DEFAULT_CATEGORY") {
        if !category.is_empty() {
            cfg.default_category = category;
        }
    }

    validate(&cfg)?;
    Ok(cfg)
}

#[derive(Debug, Deserialize)]
struct FileConfig {
    #[serde(default)]
    db_path: Option<String>,
    #[serde(default)]
    admin_host: Option<String>,
    #[serde(default)]
    admin_port: Option<u16>,
    #[serde(default)]
    score_limit: Option<i32>,
    #[serde(default)]
    session_ttl_secs: Option<u64>,
    #[serde(default)]
    sweep_interval_secs: Option<u64>,
    #[serde(default)]
    default_category: Option<String>,
}

fn apply_file(cfg: &mut Config, f: FileConfig) {
    if let Some(v) = f.db_path {
        cfg.db_path = v;
    }
    if let Some(v) = f.admin_host {
        cfg.admin_host = v;
    }
    if let Some(v) = f.admin_port {
        cfg.admin_port = v;
    }
    if let Some(v) = f.score_limit {
        cfg.score_limit = v;
    }
    if let Some(v) = f.session_ttl_secs {
        cfg.session_ttl_secs = v;
    }
    if let Some(v) = f.sweep_interval_secs {
        cfg.sweep_interval_secs = v;
    }
    if let Some(v) = f.default_category {
        cfg.default_category = v;
    }
}

fn validate(cfg: &Config) -> Result<(), ConfigError> {
    if cfg.score_limit < 1 {
        return Err(ConfigError::Invalid(
            "Invalid configuration: score_limit must be >=1".into(),
        ));
    }
    if cfg.session_ttl_secs == 0 {
        return Err(ConfigError::Invalid(
            "Invalid configuration: session_ttl_secs must be >0".into(),
        ));
    }
    if cfg.sweep_interval_secs == 0 {
        return Err(ConfigError::Invalid(
            "Invalid configuration: sweep_interval_secs must be >0".into(),
        ));
    }
    Ok(())
}
