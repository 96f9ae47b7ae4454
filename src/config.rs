// Configuration File Support
//
// Harness settings come from a TOML file, environment variables and CLI flags.
// The file lives in the XDG config directory: ~/.config/mcp-harness/config.toml
// Precedence: CLI flag > environment > file > default.

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fs;
use std::path::{Path, PathBuf};
use std::time::Duration;

use crate::mcp::protocol::DEFAULT_PROTOCOL_VERSION;

/// Main configuration structure
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct Config {
    /// Logging configuration
    pub logging: LoggingConfig,

    /// Target server
    pub server: ServerConfig,

    /// Run behaviour
    pub harness: HarnessConfig,
}

/// Logging configuration
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct LoggingConfig {
    /// Log level (trace, debug, info, warn, error)
    pub level: String,

    /// Log format (json, pretty, compact)
    pub format: String,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: "info".to_string(),
            format: "compact".to_string(),
        }
    }
}

/// Target server configuration
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct ServerConfig {
    /// Streamable HTTP endpoint
    pub url: String,

    /// Whole-run deadline in seconds (0 disables it)
    pub timeout_secs: u64,

    /// Per-request HTTP timeout in seconds
    pub request_timeout_secs: u64,

    /// Protocol revision requested during `initialize`
    pub protocol_version: String,

    /// Extra headers sent with every request
    pub headers: BTreeMap<String, String>,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            url: "http://localhost:8080/mcp".to_string(),
            timeout_secs: 60,
            request_timeout_secs: 30,
            protocol_version: DEFAULT_PROTOCOL_VERSION.to_string(),
            headers: BTreeMap::new(),
        }
    }
}

/// Run behaviour
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct HarnessConfig {
    /// Routine to run (`all` or a routine name)
    pub tool: String,

    /// Exit with a failing status when any case fails
    pub fail_on_error: bool,

    /// Maximum lines of text printed per content item
    pub preview_lines: usize,

    /// Maximum characters of text printed per content item
    pub preview_chars: usize,
}

impl Default for HarnessConfig {
    fn default() -> Self {
        Self {
            tool: "all".to_string(),
            fail_on_error: false,
            preview_lines: 10,
            preview_chars: 2000,
        }
    }
}

impl Config {
    /// Load configuration from the default XDG config directory
    ///
    /// Returns the default configuration when the file does not exist.
    pub fn load() -> Result<Self> {
        Self::load_from_path(Self::config_path())
    }

    /// Load configuration from a specific path
    ///
    /// # Errors
    ///
    /// Returns an error if the file exists but cannot be read or parsed. A
    /// missing file yields the defaults (with env overrides). The result is
    /// not validated: CLI flags still go on top, so call [`Config::validate`]
    /// once every layer is applied.
    pub fn load_from_path<P: AsRef<Path>>(path: P) -> Result<Self> {
        let path = path.as_ref();

        let config = if path.exists() {
            let content = fs::read_to_string(path)
                .with_context(|| format!("Failed to read config file from {:?}", path))?;
            let config: Config = toml::from_str(&content)
                .with_context(|| format!("Failed to parse config file from {:?}", path))?;
            tracing::debug!("Loaded configuration from {:?}", path);
            config
        } else {
            tracing::debug!("Config file not found at {:?}, using defaults", path);
            Self::default()
        };

        Ok(config.apply_env_overrides())
    }

    /// Get the default configuration file path
    ///
    /// Returns `~/.config/mcp-harness/config.toml` on Linux
    pub fn config_path() -> PathBuf {
        if let Some(proj_dirs) = directories::ProjectDirs::from("dev", "mcp-harness", "mcp-harness")
        {
            proj_dirs.config_dir().join("config.toml")
        } else {
            let home = std::env::var("HOME").unwrap_or_else(|_| ".".to_string());
            PathBuf::from(home)
                .join(".config")
                .join("mcp-harness")
                .join("config.toml")
        }
    }

    /// Apply environment variable overrides
    ///
    /// - MCP_HARNESS_URL
    /// - MCP_HARNESS_TIMEOUT_SECS
    /// - MCP_HARNESS_LOG_LEVEL
    /// - MCP_HARNESS_LOG_FORMAT
    fn apply_env_overrides(mut self) -> Self {
        if let Ok(url) = std::env::var("MCP_HARNESS_URL") {
            if !url.trim().is_empty() {
                self.server.url = url;
            }
        }
        if let Ok(secs) = std::env::var("MCP_HARNESS_TIMEOUT_SECS") {
            if let Ok(secs) = secs.parse::<u64>() {
                self.server.timeout_secs = secs;
            }
        }
        if let Ok(level) = std::env::var("MCP_HARNESS_LOG_LEVEL") {
            self.logging.level = level;
        }
        if let Ok(format) = std::env::var("MCP_HARNESS_LOG_FORMAT") {
            self.logging.format = format;
        }
        self
    }

    /// Validate the configuration
    pub fn validate(&self) -> Result<()> {
        match self.logging.level.to_lowercase().as_str() {
            "trace" | "debug" | "info" | "warn" | "error" => {}
            _ => anyhow::bail!(
                "Invalid log level: {}. Must be one of: trace, debug, info, warn, error",
                self.logging.level
            ),
        }

        match self.logging.format.to_lowercase().as_str() {
            "json" | "pretty" | "compact" => {}
            _ => anyhow::bail!(
                "Invalid log format: {}. Must be one of: json, pretty, compact",
                self.logging.format
            ),
        }

        let url = self.server.url.to_lowercase();
        if !(url.starts_with("http://") || url.starts_with("https://")) {
            anyhow::bail!(
                "Server URL must start with http:// or https://, got: {}",
                self.server.url
            );
        }

        if self.server.request_timeout_secs == 0 {
            anyhow::bail!("Request timeout must be > 0 seconds");
        }

        if self.server.protocol_version.trim().is_empty() {
            anyhow::bail!("Protocol version must not be empty");
        }

        if self.harness.preview_lines == 0 || self.harness.preview_chars == 0 {
            anyhow::bail!("Preview limits must be > 0");
        }

        Ok(())
    }

    /// Convert log level string to tracing::Level
    pub fn log_level(&self) -> Result<tracing::Level> {
        self.logging
            .level
            .to_lowercase()
            .parse()
            .map_err(|e| anyhow::anyhow!("Failed to parse log level: {}", e))
    }

    /// Whole-run deadline, `None` when disabled
    pub fn run_timeout(&self) -> Option<Duration> {
        match self.server.timeout_secs {
            0 => None,
            secs => Some(Duration::from_secs(secs)),
        }
    }

    /// Per-request HTTP timeout
    pub fn request_timeout(&self) -> Duration {
        Duration::from_secs(self.server.request_timeout_secs)
    }
}

/// Parse a `KEY=VALUE` header flag
pub fn parse_header(raw: &str) -> Result<(String, String)> {
    let (key, value) = raw
        .split_once('=')
        .ok_or_else(|| anyhow::anyhow!("Header must be KEY=VALUE, got: {}", raw))?;
    let key = key.trim();
    if key.is_empty() {
        anyhow::bail!("Header name must not be empty: {}", raw);
    }
    Ok((key.to_string(), value.trim().to_string()))
}

#[cfg(test)]
mod tests {
    use super::*;
    use serial_test::serial;
    use tempfile::NamedTempFile;

    const ENV_VARS: [&str; 4] = [
        "MCP_HARNESS_URL",
        "MCP_HARNESS_TIMEOUT_SECS",
        "MCP_HARNESS_LOG_LEVEL",
        "MCP_HARNESS_LOG_FORMAT",
    ];

    fn clear_env() {
        for var in ENV_VARS {
            std::env::remove_var(var);
        }
    }

    #[test]
    fn test_default_config() {
        let config = Config::default();
        assert_eq!(config.logging.level, "info");
        assert_eq!(config.server.url, "http://localhost:8080/mcp");
        assert_eq!(config.server.timeout_secs, 60);
        assert_eq!(config.harness.tool, "all");
        assert!(!config.harness.fail_on_error);
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_config_validation_invalid_log_level() {
        let mut config = Config::default();
        config.logging.level = "loud".to_string();
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_config_validation_invalid_log_format() {
        let mut config = Config::default();
        config.logging.format = "xml".to_string();
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_config_validation_invalid_url() {
        let mut config = Config::default();
        config.server.url = "ws://localhost:8080/mcp".to_string();
        let err = config.validate().unwrap_err();
        assert!(err.to_string().contains("http://"));
    }

    #[test]
    fn test_config_validation_zero_request_timeout() {
        let mut config = Config::default();
        config.server.request_timeout_secs = 0;
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_run_timeout_zero_disables_deadline() {
        let mut config = Config::default();
        assert_eq!(config.run_timeout(), Some(Duration::from_secs(60)));
        config.server.timeout_secs = 0;
        assert_eq!(config.run_timeout(), None);
    }

    #[test]
    #[serial]
    fn test_load_from_nonexistent_file() {
        clear_env();
        let temp_file = NamedTempFile::new().unwrap();
        let path = temp_file.path().with_extension("nonexistent");
        let config = Config::load_from_path(&path).unwrap();
        assert_eq!(config, Config::default());
    }

    #[test]
    #[serial]
    fn test_load_valid_toml_config() {
        clear_env();
        let temp_file = NamedTempFile::new().unwrap();
        let toml_content = r#"
[logging]
level = "debug"
format = "json"

[server]
url = "https://tools.internal:9443/mcp"
timeout_secs = 120
protocol_version = "2024-11-05"

[server.headers]
Authorization = "Bearer token"

[harness]
tool = "shell"
fail_on_error = true
"#;
        fs::write(temp_file.path(), toml_content).unwrap();

        let config = Config::load_from_path(temp_file.path()).unwrap();
        assert_eq!(config.logging.level, "debug");
        assert_eq!(config.logging.format, "json");
        assert_eq!(config.server.url, "https://tools.internal:9443/mcp");
        assert_eq!(config.server.timeout_secs, 120);
        assert_eq!(config.server.request_timeout_secs, 30);
        assert_eq!(config.server.protocol_version, "2024-11-05");
        assert_eq!(
            config.server.headers.get("Authorization").map(String::as_str),
            Some("Bearer token")
        );
        assert_eq!(config.harness.tool, "shell");
        assert!(config.harness.fail_on_error);
        assert_eq!(config.harness.preview_lines, 10);
    }

    #[test]
    #[serial]
    fn test_load_leaves_validation_to_caller() {
        clear_env();
        let temp_file = NamedTempFile::new().unwrap();
        fs::write(temp_file.path(), "[server]\nurl = \"localhost:8080/mcp\"\n").unwrap();

        let config = Config::load_from_path(temp_file.path()).unwrap();
        assert_eq!(config.server.url, "localhost:8080/mcp");
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_load_invalid_toml_config() {
        let temp_file = NamedTempFile::new().unwrap();
        fs::write(temp_file.path(), "[server\nurl = 1").unwrap();
        assert!(Config::load_from_path(temp_file.path()).is_err());
    }

    #[test]
    #[serial]
    fn test_env_overrides() {
        clear_env();
        std::env::set_var("MCP_HARNESS_URL", "http://10.0.0.5:3000/mcp");
        std::env::set_var("MCP_HARNESS_TIMEOUT_SECS", "15");
        std::env::set_var("MCP_HARNESS_LOG_LEVEL", "trace");

        let config = Config::default().apply_env_overrides();
        assert_eq!(config.server.url, "http://10.0.0.5:3000/mcp");
        assert_eq!(config.server.timeout_secs, 15);
        assert_eq!(config.logging.level, "trace");

        clear_env();
    }

    #[test]
    #[serial]
    fn test_env_overrides_invalid_values() {
        clear_env();
        std::env::set_var("MCP_HARNESS_TIMEOUT_SECS", "soon");
        std::env::set_var("MCP_HARNESS_URL", "  ");

        let config = Config::default().apply_env_overrides();
        assert_eq!(config.server.timeout_secs, 60);
        assert_eq!(config.server.url, "http://localhost:8080/mcp");

        clear_env();
    }

    #[test]
    fn test_log_level_parsing() {
        let mut config = Config::default();
        config.logging.level = "DEBUG".to_string();
        assert_eq!(config.log_level().unwrap(), tracing::Level::DEBUG);

        config.logging.level = "nope".to_string();
        assert!(config.log_level().is_err());
    }

    #[test]
    fn test_config_path() {
        assert!(Config::config_path().ends_with("config.toml"));
    }

    #[test]
    fn test_parse_header() {
        assert_eq!(
            parse_header("Authorization=Bearer a=b").unwrap(),
            ("Authorization".to_string(), "Bearer a=b".to_string())
        );
        assert!(parse_header("no-equals").is_err());
        assert!(parse_header("=value").is_err());
    }
}
