use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};

use crate::error::Error;
use crate::types::PrState;

/// HTTP server settings
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ServerSettings {
    /// Address to bind. Keep on loopback: the page shows private repo data.
    pub host: String,

    /// Port to listen on
    pub port: u16,
}

impl Default for ServerSettings {
    fn default() -> Self {
        Self {
            host: "127.0.0.1".to_string(),
            port: 5000,
        }
    }
}

/// PR listing settings
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ListingSettings {
    /// Default lifecycle filter: "open", "closed", "merged" or "all"
    pub default_state: String,

    /// Maximum number of PRs to list
    pub limit: u32,
}

impl Default for ListingSettings {
    fn default() -> Self {
        Self {
            default_state: "open".to_string(),
            limit: 100,
        }
    }
}

/// Application configuration
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    /// Server settings
    pub server: ServerSettings,

    /// PR listing settings
    pub listing: ListingSettings,
}

impl Config {
    /// Get the config file path (~/.config/shiteki/config.toml)
    pub fn config_path() -> Option<PathBuf> {
        dirs::config_dir().map(|p| p.join("shiteki").join("config.toml"))
    }

    /// Load configuration from the default path, or return default if not found
    pub fn load() -> Self {
        match Self::config_path() {
            Some(path) => Self::load_from(&path),
            None => Self::default(),
        }
    }

    /// Load configuration from `path`, falling back to defaults when the file
    /// is missing or unreadable
    pub fn load_from(path: &Path) -> Self {
        if !path.exists() {
            return Self::default();
        }

        match fs::read_to_string(path) {
            Ok(content) => toml::from_str(&content).unwrap_or_else(|e| {
                tracing::warn!(path = %path.display(), "ignoring invalid config: {}", e);
                Self::default()
            }),
            Err(e) => {
                tracing::warn!(path = %path.display(), "could not read config: {}", e);
                Self::default()
            }
        }
    }

    /// Apply environment overrides. `SHITEKI_PORT` wins over `PORT`.
    pub fn apply_env<F>(&mut self, var: F)
    where
        F: Fn(&str) -> Option<String>,
    {
        if let Some(host) = var("SHITEKI_HOST").filter(|h| !h.trim().is_empty()) {
            self.server.host = host.trim().to_string();
        }

        let port = var("SHITEKI_PORT").or_else(|| var("PORT"));
        if let Some(port) = port {
            match port.trim().parse() {
                Ok(port) => self.server.port = port,
                Err(_) => tracing::warn!(value = %port, "ignoring invalid port override"),
            }
        }
    }

    /// The configured default lifecycle filter
    pub fn default_state(&self) -> Result<PrState, Error> {
        self.listing.default_state.parse()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;
    use std::io::Write;

    fn env(pairs: &[(&str, &str)]) -> impl Fn(&str) -> Option<String> {
        let map: HashMap<String, String> = pairs
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        move |key: &str| map.get(key).cloned()
    }

    #[test]
    fn test_default_config() {
        let config = Config::default();
        assert_eq!(config.server.host, "127.0.0.1");
        assert_eq!(config.server.port, 5000);
        assert_eq!(config.listing.default_state, "open");
        assert_eq!(config.listing.limit, 100);
        assert_eq!(config.default_state().unwrap(), PrState::Open);
    }

    #[test]
    fn test_parse_toml() {
        let toml_str = r#"
[server]
port = 8080

[listing]
default_state = "all"
limit = 20
"#;

        let config: Config = toml::from_str(toml_str).unwrap();
        assert_eq!(config.server.port, 8080);
        assert_eq!(config.server.host, "127.0.0.1"); // Default
        assert_eq!(config.default_state().unwrap(), PrState::All);
        assert_eq!(config.listing.limit, 20);
    }

    #[test]
    fn test_parse_toml_partial() {
        let config: Config = toml::from_str("[listing]\ndefault_state = \"merged\"\n").unwrap();
        assert_eq!(config.server.port, 5000);
        assert_eq!(config.default_state().unwrap(), PrState::Merged);
    }

    #[test]
    fn test_invalid_default_state() {
        let config: Config = toml::from_str("[listing]\ndefault_state = \"draft\"\n").unwrap();
        assert!(matches!(
            config.default_state(),
            Err(Error::InvalidState { .. })
        ));
    }

    #[test]
    fn test_load_from_file() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        writeln!(file, "[server]\nport = 9000").unwrap();

        let config = Config::load_from(file.path());
        assert_eq!(config.server.port, 9000);
    }

    #[test]
    fn test_load_from_missing_or_invalid_file() {
        let dir = tempfile::tempdir().unwrap();
        let config = Config::load_from(&dir.path().join("nope.toml"));
        assert_eq!(config.server.port, 5000);

        let path = dir.path().join("bad.toml");
        fs::write(&path, "this is = = not toml").unwrap();
        assert_eq!(Config::load_from(&path).server.port, 5000);
    }

    #[test]
    fn test_env_port_override() {
        let mut config = Config::default();
        config.apply_env(env(&[("PORT", "7000")]));
        assert_eq!(config.server.port, 7000);

        config.apply_env(env(&[("PORT", "7001"), ("SHITEKI_PORT", "7002")]));
        assert_eq!(config.server.port, 7002);
    }

    #[test]
    fn test_env_invalid_port_ignored() {
        let mut config = Config::default();
        config.apply_env(env(&[("PORT", "eighty")]));
        assert_eq!(config.server.port, 5000);
    }

    #[test]
    fn test_env_host_override() {
        let mut config = Config::default();
        config.apply_env(env(&[("SHITEKI_HOST", "0.0.0.0")]));
        assert_eq!(config.server.host, "0.0.0.0");

        config.apply_env(env(&[("SHITEKI_HOST", "  ")]));
        assert_eq!(config.server.host, "0.0.0.0");
    }
}
