//! Configuration file support

use anyhow::Context;
use ragline_core::{FileStorage, Settings};
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};
use std::time::Duration;

/// Configuration for ragline
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    /// Default query endpoint
    pub endpoint: Option<String>,
    /// Stream answers by default
    pub streaming: Option<bool>,
    /// Use mock answers by default
    pub mock: Option<bool>,
    /// Origin relative source URLs resolve against
    pub origin: Option<String>,
    /// Where history and settings are stored
    pub data_dir: Option<PathBuf>,
    /// Simulated latency of mock answers
    pub mock_delay_ms: Option<u64>,
    /// Whether to use TUI mode by default
    pub tui: Option<bool>,
}

impl Config {
    /// Get the config directory
    pub fn config_dir() -> PathBuf {
        dirs::config_dir()
            .unwrap_or_else(|| PathBuf::from("."))
            .join("ragline")
    }

    /// Get the config file path
    pub fn config_path() -> PathBuf {
        if let Ok(path) = std::env::var("RAGLINE_CONFIG_PATH") {
            return PathBuf::from(path);
        }
        Self::config_dir().join("config.toml")
    }

    /// Load config from the default path
    pub fn load() -> anyhow::Result<Self> {
        Self::load_from(&Self::config_path())
    }

    /// Load config from `path`. A missing file yields the defaults.
    pub fn load_from(path: &Path) -> anyhow::Result<Self> {
        if !path.exists() {
            return Ok(Self::default());
        }

        let content = fs::read_to_string(path)
            .with_context(|| format!("Failed to read config file {}", path.display()))?;
        toml::from_str(&content)
            .with_context(|| format!("Failed to parse config file {}", path.display()))
    }

    /// Write the example config to `path` unless a file already exists
    pub fn init_at(path: &Path) -> std::io::Result<()> {
        if path.exists() {
            return Ok(());
        }
        if let Some(dir) = path.parent() {
            fs::create_dir_all(dir)?;
        }
        fs::write(path, example_config())
    }

    /// Settings used where the persisted record has no value
    pub fn default_settings(&self) -> Settings {
        let mut settings = Settings::default();
        if let Some(endpoint) = self.endpoint.as_deref().map(str::trim) {
            if !endpoint.is_empty() {
                settings.endpoint = endpoint.to_string();
            }
        }
        if let Some(streaming) = self.streaming {
            settings.use_streaming = streaming;
        }
        if let Some(mock) = self.mock {
            settings.use_mock = mock;
        }
        settings
    }

    /// Data directory for history and settings
    pub fn data_dir(&self) -> PathBuf {
        self.data_dir.clone().unwrap_or_else(FileStorage::default_dir)
    }

    /// Mock answer latency, 500 ms unless configured
    pub fn mock_delay(&self) -> Duration {
        Duration::from_millis(self.mock_delay_ms.unwrap_or(500))
    }
}

/// Generate example config content
pub fn example_config() -> &'static str {
    r#"# ragline configuration file
# Place at ~/.config/ragline/config.toml (Linux) or set RAGLINE_CONFIG_PATH

# endpoint, streaming and mock only seed the saved settings. After the first
# question they are stored with the conversation data, and later edits here
# are ignored. Change them with --endpoint/--stream/--mock or /endpoint,
# /stream and /mock instead.

# Query endpoint (POST {"query": "..."}); the stream endpoint is derived from it
endpoint = "http://localhost:8000/query"

# Receive answers incrementally as server-sent events
streaming = false

# Answer locally with dummy data, without touching the network
mock = false

# Origin that relative source links are resolved against
# origin = "http://localhost:8000/"

# Where history and settings are kept (defaults to the platform data dir)
# data_dir = "/home/me/.local/share/ragline"

# Latency of mock answers in milliseconds
mock_delay_ms = 500

# Whether to use TUI mode by default
# Set to false for simple stdin/stdout mode
tui = true
"#
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[test]
    fn test_example_config_parses() {
        let config: Config = toml::from_str(example_config()).unwrap();
        assert_eq!(config.endpoint.as_deref(), Some("http://localhost:8000/query"));
        assert_eq!(config.streaming, Some(false));
        assert_eq!(config.tui, Some(true));
        assert_eq!(config.mock_delay(), Duration::from_millis(500));
    }

    #[test]
    fn test_example_config_explains_saved_settings() {
        let text = example_config();
        assert!(text.contains("only seed the saved settings"));
        assert!(text.contains("--endpoint/--stream/--mock"));
    }

    #[test]
    fn test_missing_file_is_default() {
        let dir = TempDir::new().unwrap();
        let config = Config::load_from(&dir.path().join("nope.toml")).unwrap();
        assert_eq!(config, Config::default());
    }

    #[test]
    fn test_invalid_file_is_error() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("config.toml");
        fs::write(&path, "endpoint = [").unwrap();
        let err = Config::load_from(&path).unwrap_err();
        assert!(err.to_string().contains("Failed to parse"), "{}", err);
    }

    #[test]
    fn test_init_writes_once() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("sub").join("config.toml");
        Config::init_at(&path).unwrap();
        assert!(fs::read_to_string(&path).unwrap().contains("endpoint"));

        fs::write(&path, "mock = true").unwrap();
        Config::init_at(&path).unwrap();
        assert_eq!(fs::read_to_string(&path).unwrap(), "mock = true");
    }

    #[test]
    fn test_default_settings_from_config() {
        let config = Config {
            endpoint: Some(" https://rag.test/query ".to_string()),
            streaming: Some(true),
            ..Default::default()
        };
        let settings = config.default_settings();
        assert_eq!(settings.endpoint, "https://rag.test/query");
        assert!(settings.use_streaming);
        assert!(!settings.use_mock);

        let blank = Config {
            endpoint: Some("  ".to_string()),
            ..Default::default()
        };
        assert_eq!(blank.default_settings(), Settings::default());
    }
}
