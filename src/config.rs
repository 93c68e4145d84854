//! Server configuration, loaded from TOML.
//!
//! ```toml
//! [server]
//! host = "0.0.0.0"
//! port = 8080
//!
//! [backend]
//! kind = "api"
//! api_categories = ["web", "news"]
//!
//! [pipeline]
//! max_content_bytes = 4000
//! strip_menus = true
//! ```
//!
//! `GLEANER_BACKEND`, `GLEANER_HOST` and `GLEANER_PORT` override the file;
//! `GLEANER_API_KEY` fills in a missing key.

use std::path::{Path, PathBuf};

use gleaner_search::{BackendConfig, BackendKind, PipelineConfig};
use serde::{Deserialize, Serialize};

use crate::error::{Result, ServerError};

/// Environment variable consulted when the config file carries no API key.
pub const API_KEY_ENV: &str = "GLEANER_API_KEY";
/// Overrides `backend.kind`.
pub const BACKEND_ENV: &str = "GLEANER_BACKEND";
/// Overrides `server.host`.
pub const HOST_ENV: &str = "GLEANER_HOST";
/// Overrides `server.port`.
pub const PORT_ENV: &str = "GLEANER_PORT";

/// Top-level configuration.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct ServerConfig {
    /// Listener settings.
    pub server: ListenConfig,
    /// Search backend selection and credentials.
    pub backend: BackendConfig,
    /// Fetching, normalisation and filtering.
    pub pipeline: PipelineConfig,
}

/// Where the HTTP listener binds and how large a request may be.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ListenConfig {
    /// Host address to bind to.
    pub host: String,
    /// Port to listen on (0 = auto-assign).
    pub port: u16,
    /// Requests asking for more results than this are clamped to it.
    pub max_results: usize,
}

impl Default for ListenConfig {
    fn default() -> Self {
        Self {
            host: "0.0.0.0".to_owned(),
            port: 8080,
            max_results: 100,
        }
    }
}

impl ListenConfig {
    /// `host:port` string suitable for binding.
    pub fn bind_addr(&self) -> String {
        if self.host.contains(':') {
            format!("[{}]:{}", self.host, self.port)
        } else {
            format!("{}:{}", self.host, self.port)
        }
    }

    /// Override host and port from a `HOST:PORT` string.
    ///
    /// # Errors
    ///
    /// Returns [`ServerError::Config`] if the string has no port or the port
    /// is not a number.
    pub fn apply_host_override(&mut self, host_port: &str) -> Result<()> {
        let (host, port) = host_port
            .rsplit_once(':')
            .ok_or_else(|| ServerError::Config(format!("expected HOST:PORT, got `{host_port}`")))?;
        let port = port
            .parse::<u16>()
            .map_err(|_| ServerError::Config(format!("invalid port in `{host_port}`")))?;
        if !host.is_empty() {
            self.host = host.trim_start_matches('[').trim_end_matches(']').to_owned();
        }
        self.port = port;
        Ok(())
    }
}

impl ServerConfig {
    /// Load configuration from a TOML file.
    ///
    /// # Errors
    ///
    /// Returns an error if the file cannot be read or parsed.
    pub fn from_file(path: &Path) -> Result<Self> {
        let content = std::fs::read_to_string(path)?;
        toml::from_str(&content).map_err(|e| ServerError::Config(format!("{}: {e}", path.display())))
    }

    /// Save configuration to a TOML file, creating parent directories as needed.
    ///
    /// # Errors
    ///
    /// Returns an error if the file cannot be written or the config cannot be serialized.
    pub fn save_to_file(&self, path: &Path) -> Result<()> {
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)?;
        }
        let content = toml::to_string_pretty(self).map_err(|e| ServerError::Config(e.to_string()))?;
        std::fs::write(path, content)?;
        Ok(())
    }

    /// Returns the default config file path: `~/.config/gleaner/config.toml`.
    pub fn default_config_path() -> PathBuf {
        if let Some(config) = std::env::var_os("XDG_CONFIG_HOME") {
            PathBuf::from(config).join("gleaner").join("config.toml")
        } else if let Some(home) = std::env::var_os("HOME") {
            PathBuf::from(home)
                .join(".config")
                .join("gleaner")
                .join("config.toml")
        } else {
            PathBuf::from("/tmp/gleaner-config/config.toml")
        }
    }

    /// Load from `path`, or from the default path if it exists, or fall back
    /// to defaults, then apply environment overrides (see [`Self::apply_env`]).
    ///
    /// # Errors
    ///
    /// Returns an error if an explicitly given file cannot be loaded, if the
    /// default file exists but is invalid, or if an override is malformed.
    pub fn load(path: Option<&Path>) -> Result<Self> {
        let mut config = match path {
            Some(path) => Self::from_file(path)?,
            None => {
                let default_path = Self::default_config_path();
                if default_path.exists() {
                    tracing::debug!(path = %default_path.display(), "loading default config");
                    Self::from_file(&default_path)?
                } else {
                    Self::default()
                }
            }
        };
        config.apply_env(|name| std::env::var(name).ok())?;
        Ok(config)
    }

    /// Apply overrides read through `lookup`.
    ///
    /// [`BACKEND_ENV`], [`HOST_ENV`] and [`PORT_ENV`] replace the file's
    /// values; [`API_KEY_ENV`] is only used when the file has no key. Blank
    /// values are ignored.
    ///
    /// # Errors
    ///
    /// Returns [`ServerError::Config`] for an unknown backend or a port that
    /// is not a number.
    pub fn apply_env(&mut self, lookup: impl Fn(&str) -> Option<String>) -> Result<()> {
        let var = |name: &str| lookup(name).filter(|v| !v.trim().is_empty());

        if let Some(kind) = var(BACKEND_ENV) {
            self.backend.kind = kind
                .parse::<BackendKind>()
                .map_err(|e| ServerError::Config(format!("{BACKEND_ENV}: {e}")))?;
        }
        if let Some(host) = var(HOST_ENV) {
            self.server.host = host.trim().to_owned();
        }
        if let Some(port) = var(PORT_ENV) {
            self.server.port = port
                .trim()
                .parse::<u16>()
                .map_err(|_| ServerError::Config(format!("{PORT_ENV}: invalid port `{port}`")))?;
        }
        self.resolve_api_key(var(API_KEY_ENV));
        Ok(())
    }

    /// Use `from_env` as the API key when the file carries none.
    pub fn resolve_api_key(&mut self, from_env: Option<String>) {
        if self.backend.api_key().is_some() {
            return;
        }
        if let Some(key) = from_env.filter(|k| !k.trim().is_empty()) {
            self.backend.api_key = Some(key);
        }
    }

    /// Validates this configuration, returning an error if any field is invalid.
    ///
    /// # Errors
    ///
    /// Returns [`ServerError::Config`] for listener problems and
    /// [`ServerError::Search`] for pipeline or backend problems.
    pub fn validate(&self) -> Result<()> {
        if self.server.host.trim().is_empty() {
            return Err(ServerError::Config("server.host must not be empty".into()));
        }
        if self.server.max_results == 0 {
            return Err(ServerError::Config(
                "server.max_results must be greater than 0".into(),
            ));
        }
        self.pipeline.validate()?;
        self.backend.validate()?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    #![allow(clippy::unwrap_used, clippy::expect_used, clippy::panic)]

    use super::*;
    use gleaner_search::{ApiCategory, SearchError};

    #[test]
    fn default_config_is_valid() {
        let config = ServerConfig::default();
        assert_eq!(config.server.port, 8080);
        assert_eq!(config.server.max_results, 100);
        assert_eq!(config.backend.kind, BackendKind::Scrape);
        assert!(config.validate().is_ok());
    }

    #[test]
    fn partial_toml_fills_defaults() {
        let config: ServerConfig = toml::from_str(
            r#"
[server]
port = 9090

[backend]
kind = "api"
api_key = "secret"
api_categories = ["news", "web"]

[pipeline]
max_content_bytes = 4000
strip_menus = true
"#,
        )
        .expect("parse");

        assert_eq!(config.server.port, 9090);
        assert_eq!(config.server.host, "0.0.0.0");
        assert_eq!(config.backend.kind, BackendKind::Api);
        assert_eq!(config.backend.api_categories, vec![ApiCategory::News, ApiCategory::Web]);
        assert_eq!(config.pipeline.max_content_bytes, Some(4000));
        assert!(config.pipeline.strip_menus);
        assert_eq!(config.pipeline.fetch_concurrency, 4);
        assert!(config.validate().is_ok());
    }

    #[test]
    fn unknown_backend_kind_rejected() {
        let result: std::result::Result<ServerConfig, _> = toml::from_str("[backend]\nkind = \"bing\"\n");
        assert!(result.is_err());
    }

    #[test]
    fn api_backend_without_key_is_invalid() {
        let mut config = ServerConfig::default();
        config.backend.kind = BackendKind::Api;
        let err = config.validate().unwrap_err();
        assert!(matches!(err, ServerError::Search(SearchError::Config(_))));
    }

    #[test]
    fn env_key_used_only_when_file_has_none() {
        let mut config = ServerConfig::default();
        config.resolve_api_key(Some("from-env".into()));
        assert_eq!(config.backend.api_key(), Some("from-env"));

        config.backend.api_key = Some("from-file".into());
        config.resolve_api_key(Some("other".into()));
        assert_eq!(config.backend.api_key(), Some("from-file"));
    }

    #[test]
    fn blank_env_key_ignored() {
        let mut config = ServerConfig::default();
        config.resolve_api_key(Some("   ".into()));
        assert_eq!(config.backend.api_key(), None);
    }

    fn env_from(vars: &[(&str, &str)]) -> impl Fn(&str) -> Option<String> {
        let vars: Vec<(String, String)> = vars
            .iter()
            .map(|(k, v)| ((*k).to_owned(), (*v).to_owned()))
            .collect();
        move |name: &str| vars.iter().find(|(k, _)| k == name).map(|(_, v)| v.clone())
    }

    #[test]
    fn env_overrides_backend_and_listener() {
        let mut config = ServerConfig::default();
        config
            .apply_env(env_from(&[
                (BACKEND_ENV, "Description"),
                (HOST_ENV, "127.0.0.1"),
                (PORT_ENV, "9000"),
            ]))
            .expect("apply");
        assert_eq!(config.backend.kind, BackendKind::Description);
        assert_eq!(config.server.bind_addr(), "127.0.0.1:9000");
        assert!(config.validate().is_ok());
    }

    #[test]
    fn env_api_backend_picks_up_env_key() {
        let mut config = ServerConfig::default();
        config
            .apply_env(env_from(&[(BACKEND_ENV, "api"), (API_KEY_ENV, "k")]))
            .expect("apply");
        assert_eq!(config.backend.kind, BackendKind::Api);
        assert_eq!(config.backend.api_key(), Some("k"));
        assert!(config.validate().is_ok());
    }

    #[test]
    fn env_overrides_reject_bad_values() {
        let mut config = ServerConfig::default();
        assert!(config.apply_env(env_from(&[(BACKEND_ENV, "bing")])).is_err());
        assert!(config.apply_env(env_from(&[(PORT_ENV, "http")])).is_err());
    }

    #[test]
    fn blank_env_values_ignored() {
        let mut config = ServerConfig::default();
        config
            .apply_env(env_from(&[(BACKEND_ENV, " "), (HOST_ENV, ""), (PORT_ENV, "  ")]))
            .expect("apply");
        assert_eq!(config.backend.kind, BackendKind::Scrape);
        assert_eq!(config.server.bind_addr(), "0.0.0.0:8080");
    }

    #[test]
    fn zero_max_results_invalid() {
        let mut config = ServerConfig::default();
        config.server.max_results = 0;
        assert!(matches!(config.validate(), Err(ServerError::Config(_))));
    }

    #[test]
    fn host_override_parses_host_and_port() {
        let mut listen = ListenConfig::default();
        listen.apply_host_override("127.0.0.1:3000").expect("override");
        assert_eq!(listen.bind_addr(), "127.0.0.1:3000");

        listen.apply_host_override(":4000").expect("port only");
        assert_eq!(listen.bind_addr(), "127.0.0.1:4000");

        listen.apply_host_override("[::1]:5000").expect("ipv6");
        assert_eq!(listen.host, "::1");
        assert_eq!(listen.bind_addr(), "[::1]:5000");
    }

    #[test]
    fn host_override_rejects_bad_input() {
        let mut listen = ListenConfig::default();
        assert!(listen.apply_host_override("localhost").is_err());
        assert!(listen.apply_host_override("localhost:http").is_err());
    }

    #[test]
    fn config_round_trips_through_file() {
        let dir = tempfile::tempdir().expect("tempdir");
        let path = dir.path().join("nested").join("config.toml");

        let mut config = ServerConfig::default();
        config.server.port = 0;
        config.pipeline.max_content_bytes = Some(2048);
        config.save_to_file(&path).expect("save");

        let loaded = ServerConfig::from_file(&path).expect("load");
        assert_eq!(loaded.server.port, 0);
        assert_eq!(loaded.pipeline.max_content_bytes, Some(2048));
    }

    #[test]
    fn missing_explicit_file_is_io_error() {
        let dir = tempfile::tempdir().expect("tempdir");
        let err = ServerConfig::load(Some(&dir.path().join("absent.toml"))).unwrap_err();
        assert!(matches!(err, ServerError::Io(_)));
    }
}
