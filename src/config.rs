use anyhow::{bail, Context, Result};
use serde::Deserialize;
use std::path::{Path, PathBuf};
use std::time::Duration;
use tracing::info;

/// Default namespace pattern: two to eight `/`-separated path segments.
pub const DEFAULT_NAMESPACE_PATTERN: &str = r"^[a-zA-Z0-9_.-]+(/[a-zA-Z0-9_.-]+){1,7}$";

#[derive(Debug, Deserialize, Clone)]
#[serde(default)]
pub struct MemoryConfig {
    pub server: ServerConfig,
    pub storage: StorageConfig,
    pub memory: RetrievalConfig,
    pub lifecycle: LifecycleConfig,
}

#[derive(Debug, Deserialize, Clone)]
#[serde(default)]
pub struct ServerConfig {
    pub name: String,
    pub log_level: String,
}

#[derive(Debug, Deserialize, Clone)]
#[serde(default)]
pub struct StorageConfig {
    pub db_path: String,
}

#[derive(Debug, Deserialize, Clone)]
#[serde(default)]
pub struct RetrievalConfig {
    pub namespace_pattern: String,
    pub default_short_ttl_hours: i64,
    pub default_search_k: i64,
    pub max_context_pack_items: i64,
}

#[derive(Debug, Deserialize, Clone)]
#[serde(default)]
pub struct LifecycleConfig {
    pub ttl_check_interval_seconds: u64,
}

impl Default for MemoryConfig {
    fn default() -> Self {
        Self {
            server: ServerConfig::default(),
            storage: StorageConfig::default(),
            memory: RetrievalConfig::default(),
            lifecycle: LifecycleConfig::default(),
        }
    }
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            name: "memory-mcp".into(),
            log_level: "info".into(),
        }
    }
}

impl Default for StorageConfig {
    fn default() -> Self {
        let db_path = default_data_dir()
            .join("memories.db")
            .to_string_lossy()
            .into_owned();
        Self { db_path }
    }
}

impl Default for RetrievalConfig {
    fn default() -> Self {
        Self {
            namespace_pattern: DEFAULT_NAMESPACE_PATTERN.into(),
            default_short_ttl_hours: 48,
            default_search_k: 10,
            max_context_pack_items: 8,
        }
    }
}

impl Default for LifecycleConfig {
    fn default() -> Self {
        Self {
            ttl_check_interval_seconds: 60,
        }
    }
}

/// Returns `~/.memory-mcp/`, or `./.memory-mcp/` when no home directory is known.
pub fn default_data_dir() -> PathBuf {
    dirs::home_dir()
        .unwrap_or_else(|| PathBuf::from("."))
        .join(".memory-mcp")
}

/// Returns the default config file path: `~/.memory-mcp/config.toml`
pub fn default_config_path() -> PathBuf {
    default_data_dir().join("config.toml")
}

impl MemoryConfig {
    /// Load config from the default TOML file (if it exists) then apply env var overrides.
    pub fn load() -> Result<Self> {
        Self::load_from(default_config_path())
    }

    /// Load from a specific path, apply env var overrides, then validate.
    pub fn load_from(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        let mut config = if path.exists() {
            let contents =
                std::fs::read_to_string(path).context("failed to read config file")?;
            toml::from_str(&contents).context("failed to parse config TOML")?
        } else {
            info!("no config file at {}, using defaults", path.display());
            MemoryConfig::default()
        };

        config.apply_env_overrides();
        config.validate()?;
        Ok(config)
    }

    /// Apply environment variable overrides (MEMORY_MCP_DB, MEMORY_MCP_LOG_LEVEL).
    fn apply_env_overrides(&mut self) {
        if let Ok(val) = std::env::var("MEMORY_MCP_DB") {
            self.storage.db_path = val;
        }
        if let Ok(val) = std::env::var("MEMORY_MCP_LOG_LEVEL") {
            self.server.log_level = val;
        }
    }

    /// Check configuration sanity.
    pub fn validate(&self) -> Result<()> {
        if self.server.name.trim().is_empty() {
            bail!("server.name must not be empty");
        }
        if self.storage.db_path.trim().is_empty() {
            bail!("storage.db_path must not be empty");
        }
        if self.memory.default_short_ttl_hours <= 0 {
            bail!("memory.default_short_ttl_hours must be > 0");
        }
        if self.memory.default_search_k <= 0 {
            bail!("memory.default_search_k must be > 0");
        }
        if self.memory.max_context_pack_items <= 0 {
            bail!("memory.max_context_pack_items must be > 0");
        }
        if self.lifecycle.ttl_check_interval_seconds == 0 {
            bail!("lifecycle.ttl_check_interval_seconds must be > 0");
        }
        regex::Regex::new(&self.memory.namespace_pattern)
            .context("invalid memory.namespace_pattern")?;
        Ok(())
    }

    /// Resolve the database path, expanding `~` if needed.
    pub fn resolved_db_path(&self) -> PathBuf {
        expand_tilde(&self.storage.db_path)
    }

    pub fn sweep_interval(&self) -> Duration {
        Duration::from_secs(self.lifecycle.ttl_check_interval_seconds)
    }
}

pub fn expand_tilde(path: &str) -> PathBuf {
    let home = || dirs::home_dir().unwrap_or_else(|| PathBuf::from("."));
    if path == "~" {
        home()
    } else if let Some(rest) = path.strip_prefix("~/") {
        home().join(rest)
    } else {
        PathBuf::from(path)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_config_is_valid() {
        let config = MemoryConfig::default();
        assert_eq!(config.server.name, "memory-mcp");
        assert_eq!(config.server.log_level, "info");
        assert_eq!(config.memory.default_short_ttl_hours, 48);
        assert_eq!(config.memory.default_search_k, 10);
        assert_eq!(config.memory.max_context_pack_items, 8);
        assert_eq!(config.lifecycle.ttl_check_interval_seconds, 60);
        assert!(config.storage.db_path.ends_with("memories.db"));
        config.validate().unwrap();
    }

    #[test]
    fn parse_toml_config() {
        let toml_str = r#"
[server]
log_level = "debug"

[storage]
db_path = "/tmp/test.db"

[memory]
default_search_k = 25
"#;
        let config: MemoryConfig = toml::from_str(toml_str).unwrap();
        assert_eq!(config.server.log_level, "debug");
        assert_eq!(config.storage.db_path, "/tmp/test.db");
        assert_eq!(config.memory.default_search_k, 25);
        // defaults still apply for unset fields
        assert_eq!(config.memory.default_short_ttl_hours, 48);
        assert_eq!(config.memory.namespace_pattern, DEFAULT_NAMESPACE_PATTERN);
    }

    #[test]
    fn validate_rejects_bad_values() {
        let mut config = MemoryConfig::default();
        config.memory.default_short_ttl_hours = 0;
        assert!(config.validate().is_err());

        let mut config = MemoryConfig::default();
        config.memory.namespace_pattern = "([unclosed".into();
        let err = config.validate().unwrap_err();
        assert!(err.to_string().contains("namespace_pattern"));

        let mut config = MemoryConfig::default();
        config.lifecycle.ttl_check_interval_seconds = 0;
        assert!(config.validate().is_err());
    }

    #[test]
    fn missing_file_yields_defaults() {
        let tmp = tempfile::TempDir::new().unwrap();
        let config = MemoryConfig::load_from(tmp.path().join("absent.toml")).unwrap();
        assert_eq!(config.memory.default_search_k, 10);
    }

    #[test]
    fn expand_tilde_leaves_absolute_paths() {
        assert_eq!(expand_tilde("/var/db.sqlite"), PathBuf::from("/var/db.sqlite"));
        assert!(expand_tilde("~/x.db").ends_with("x.db"));
    }
}
