use std::fs;
use std::net::{IpAddr, Ipv4Addr, SocketAddr};
use std::path::Path;
use std::time::Duration;

use anyhow::Context;
use serde::Deserialize;

use crate::tftp::core::{DEFAULT_RETRIES, DEFAULT_TIMEOUT, RetryPolicy};

/// Well-known TFTP server port
pub const DEFAULT_PORT: u16 = 69;

/// TFTP client configuration
///
/// # Example
///
/// ```rust
/// use tinytftp::tftp::client::ClientConfig;
/// use std::time::Duration;
///
/// let config = ClientConfig::new("192.168.1.100:1069".parse().unwrap())
///     .with_timeout(Duration::from_secs(2))
///     .with_retries(3);
/// ```
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ClientConfig {
    /// Server endpoint the request is sent to
    pub server: SocketAddr,
    /// Reply timeout and retransmission budget
    pub retry: RetryPolicy,
}

impl ClientConfig {
    /// Create new client configuration
    ///
    /// # Arguments
    ///
    /// * `server` - Server endpoint (usually port 69)
    pub fn new(server: SocketAddr) -> Self {
        Self {
            server,
            retry: RetryPolicy::default(),
        }
    }

    /// Set timeout duration
    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.retry.timeout = timeout;
        self
    }

    /// Set how many times an unanswered packet is sent again
    pub fn with_retries(mut self, retries: u32) -> Self {
        self.retry.max_retries = retries;
        self
    }
}

impl Default for ClientConfig {
    fn default() -> Self {
        Self::new(SocketAddr::new(IpAddr::V4(Ipv4Addr::LOCALHOST), DEFAULT_PORT))
    }
}

/// Settings read from a TOML file
///
/// ```toml
/// port = 1069
/// timeout = "3s"
/// retries = 5
/// ```
///
/// Missing keys fall back to the defaults.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct Settings {
    pub port: u16,
    #[serde(with = "humantime_serde")]
    pub timeout: Duration,
    pub retries: u32,
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            port: DEFAULT_PORT,
            timeout: DEFAULT_TIMEOUT,
            retries: DEFAULT_RETRIES,
        }
    }
}

impl Settings {
    pub fn load(path: &Path) -> anyhow::Result<Self> {
        let text = fs::read_to_string(path)
            .with_context(|| format!("Failed to read config file {}", path.display()))?;

        Self::from_toml(&text).with_context(|| format!("Invalid config file {}", path.display()))
    }

    pub fn from_toml(text: &str) -> anyhow::Result<Self> {
        let settings: Settings = toml::from_str(text)?;
        settings.validate()?;
        Ok(settings)
    }

    /// Apply command-line overrides on top of these settings
    pub fn merge_cli(
        mut self,
        port: Option<u16>,
        timeout: Option<Duration>,
        retries: Option<u32>,
    ) -> anyhow::Result<Self> {
        if let Some(port) = port {
            self.port = port;
        }
        if let Some(timeout) = timeout {
            self.timeout = timeout;
        }
        if let Some(retries) = retries {
            self.retries = retries;
        }

        self.validate()?;
        Ok(self)
    }

    pub fn client_config(&self, server: SocketAddr) -> ClientConfig {
        ClientConfig::new(server)
            .with_timeout(self.timeout)
            .with_retries(self.retries)
    }

    fn validate(&self) -> anyhow::Result<()> {
        if self.timeout.is_zero() {
            anyhow::bail!("timeout must be greater than zero");
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults() {
        let config = ClientConfig::default();
        assert_eq!(config.server.port(), 69);
        assert_eq!(config.retry, RetryPolicy::default());

        let settings = Settings::from_toml("").unwrap();
        assert_eq!(settings, Settings::default());
        assert_eq!(settings.port, 69);
        assert_eq!(settings.timeout, Duration::from_secs(5));
        assert_eq!(settings.retries, 5);
    }

    #[test]
    fn parse_file() {
        let settings = Settings::from_toml(
            r#"
            port = 1069
            timeout = "1s 500ms"
            retries = 2
            "#,
        )
        .unwrap();

        assert_eq!(settings.port, 1069);
        assert_eq!(settings.timeout, Duration::from_millis(1500));
        assert_eq!(settings.retries, 2);
    }

    #[test]
    fn reject_bad_files() {
        assert!(Settings::from_toml("port = 70000").is_err());
        assert!(Settings::from_toml("timeout = 5").is_err());
        assert!(Settings::from_toml("timeout = \"0s\"").is_err());
        assert!(Settings::from_toml("blksize = 1024").is_err());
    }

    #[test]
    fn cli_overrides_file() {
        let settings = Settings::from_toml("port = 1069\nretries = 9")
            .unwrap()
            .merge_cli(None, Some(Duration::from_millis(250)), Some(1))
            .unwrap();

        assert_eq!(settings.port, 1069);
        assert_eq!(settings.timeout, Duration::from_millis(250));
        assert_eq!(settings.retries, 1);

        let config = settings.client_config("10.0.0.1:1069".parse().unwrap());
        assert_eq!(config.retry, RetryPolicy::new(Duration::from_millis(250), 1));

        assert!(Settings::default().merge_cli(None, Some(Duration::ZERO), None).is_err());
    }

    #[test]
    fn load_from_disk() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("tftp.toml");
        fs::write(&path, "timeout = \"3s\"\n").unwrap();

        let settings = Settings::load(&path).unwrap();
        assert_eq!(settings.timeout, Duration::from_secs(3));

        let missing = Settings::load(&dir.path().join("missing.toml")).unwrap_err();
        assert!(missing.to_string().contains("Failed to read config file"));
    }
}
