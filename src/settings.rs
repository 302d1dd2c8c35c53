//! Runtime configuration.
//!
//! Layered with the `config` crate: serde defaults, then an optional TOML
//! file, then `TVRELAY_*` environment variables (`__` separates sections,
//! e.g. `TVRELAY_SERVER__PORT`). The conventional `PORT` variable is honored
//! too. Command-line flags are applied on top by the binary.

use std::path::PathBuf;
use std::time::Duration;

use config::Config;
use serde::Deserialize;

use crate::fetcher::DEFAULT_USER_AGENT;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize, clap::ValueEnum)]
#[serde(rename_all = "lowercase")]
pub enum Mode {
    Production,
    Development,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct Settings {
    #[serde(default)]
    pub server: ServerConfig,
    #[serde(default)]
    pub proxy: ProxyConfig,
    #[serde(default)]
    pub relay: RelayConfig,
    #[serde(default)]
    pub catalog: CatalogConfig,
}

#[derive(Debug, Clone, Deserialize)]
pub struct ServerConfig {
    #[serde(default = "default_host")]
    pub host: String,
    #[serde(default = "default_port")]
    pub port: u16,
    #[serde(default = "default_mode")]
    pub mode: Mode,
    #[serde(default = "default_static_dir")]
    pub static_dir: PathBuf,
}

fn default_host() -> String {
    "0.0.0.0".to_string()
}

fn default_port() -> u16 {
    3000
}

fn default_mode() -> Mode {
    Mode::Development
}

fn default_static_dir() -> PathBuf {
    PathBuf::from("dist")
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            host: default_host(),
            port: default_port(),
            mode: default_mode(),
            static_dir: default_static_dir(),
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
pub struct ProxyConfig {
    #[serde(default = "default_proxy_path")]
    pub path: String,
    /// Outbound fetch bound in seconds; `0` disables it.
    #[serde(default = "default_timeout_secs")]
    pub timeout_secs: u64,
    #[serde(default = "default_user_agent")]
    pub user_agent: String,
}

fn default_proxy_path() -> String {
    "/proxy".to_string()
}

fn default_timeout_secs() -> u64 {
    15
}

fn default_user_agent() -> String {
    DEFAULT_USER_AGENT.to_string()
}

impl Default for ProxyConfig {
    fn default() -> Self {
        Self {
            path: default_proxy_path(),
            timeout_secs: default_timeout_secs(),
            user_agent: default_user_agent(),
        }
    }
}

impl ProxyConfig {
    pub fn timeout(&self) -> Option<Duration> {
        (self.timeout_secs > 0).then(|| Duration::from_secs(self.timeout_secs))
    }
}

#[derive(Debug, Clone, Deserialize)]
pub struct RelayConfig {
    #[serde(default = "default_relay_path")]
    pub path: String,
    /// Dedicated listener port. Unset: the relay shares the HTTP listener.
    #[serde(default)]
    pub port: Option<u16>,
}

fn default_relay_path() -> String {
    "/ws".to_string()
}

impl Default for RelayConfig {
    fn default() -> Self {
        Self {
            path: default_relay_path(),
            port: None,
        }
    }
}

impl RelayConfig {
    pub fn colocated(&self) -> bool {
        self.port.is_none()
    }
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct CatalogConfig {
    #[serde(default)]
    pub path: Option<PathBuf>,
}

impl Settings {
    /// Load settings from an optional file plus the environment.
    pub fn load(path: &str) -> Result<Self, config::ConfigError> {
        let mut builder = Config::builder()
            .add_source(config::File::with_name(path).required(false))
            .add_source(
                config::Environment::with_prefix("TVRELAY")
                    .prefix_separator("_")
                    .separator("__"),
            );
        if let Ok(port) = std::env::var("PORT") {
            builder = builder.set_override("server.port", port)?;
        }
        builder.build()?.try_deserialize()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    #[test]
    fn test_defaults() {
        let settings = Settings::default();
        assert_eq!(settings.server.port, 3000);
        assert_eq!(settings.server.mode, Mode::Development);
        assert_eq!(settings.proxy.path, "/proxy");
        assert_eq!(settings.proxy.timeout(), Some(Duration::from_secs(15)));
        assert!(settings.relay.colocated());
        assert!(settings.catalog.path.is_none());
    }

    #[test]
    fn test_load_from_file() {
        let mut file = tempfile::Builder::new().suffix(".toml").tempfile().unwrap();
        writeln!(
            file,
            r#"
[server]
port = 8080
mode = "production"

[proxy]
path = "/api/proxy"
timeout_secs = 0

[relay]
port = 3001
"#
        )
        .unwrap();

        let settings = Settings::load(file.path().to_str().unwrap()).unwrap();
        assert_eq!(settings.server.mode, Mode::Production);
        assert_eq!(settings.server.host, "0.0.0.0");
        assert_eq!(settings.proxy.path, "/api/proxy");
        assert_eq!(settings.proxy.timeout(), None);
        assert_eq!(settings.relay.port, Some(3001));
        assert!(!settings.relay.colocated());
    }

    #[test]
    fn test_missing_file_uses_defaults() {
        let settings = Settings::load("/nonexistent/tvrelay-config").unwrap();
        assert_eq!(settings.proxy.user_agent, DEFAULT_USER_AGENT);
    }
}
