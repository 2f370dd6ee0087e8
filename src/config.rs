// src/config.rs

//! Configuration file
//!
//! # Example config.toml
//!
//! ```toml
//! [device]
//! host = "bigip.example.net"
//! username = "admin"
//! password = "secret"
//! # request_timeout_secs = 120
//!
//! [upgrade]
//! min_free_space_gb = 6.0
//! install_timeout_secs = 900
//! install_poll_secs = 20
//! reboot_timeout_secs = 600
//! reboot_poll_secs = 5
//! chunk_size = 524288
//! ```
//!
//! Every `[upgrade]` key is optional. Device settings can also come from the
//! command line.

use crate::error::{Error, Result};
use crate::install::{INSTALL_POLL_INTERVAL, INSTALL_TIMEOUT, InstallSettings, MIN_FREE_SPACE_GB};
use crate::poll::PollPolicy;
use crate::reboot::{REBOOT_POLL_INTERVAL, REBOOT_TIMEOUT};
use crate::session::Credentials;
use crate::transfer::UPLOAD_CHUNK_SIZE;
use serde::{Deserialize, Serialize};
use std::path::Path;
use std::time::Duration;

/// Default location of the configuration file
pub const DEFAULT_CONFIG_PATH: &str = "/etc/tmos-upgrade/config.toml";

/// Top-level configuration
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Config {
    #[serde(default)]
    pub device: DeviceConfig,

    #[serde(default)]
    pub upgrade: UpgradeConfig,
}

/// Appliance address and credentials
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct DeviceConfig {
    pub host: Option<String>,
    pub username: Option<String>,
    pub password: Option<String>,

    /// Per-request timeout for management calls; unset means none
    pub request_timeout_secs: Option<u64>,
}

/// Upgrade tunables
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct UpgradeConfig {
    #[serde(default = "default_min_free_space")]
    pub min_free_space_gb: f64,

    #[serde(default = "default_install_timeout")]
    pub install_timeout_secs: u64,

    #[serde(default = "default_install_poll")]
    pub install_poll_secs: u64,

    #[serde(default = "default_reboot_timeout")]
    pub reboot_timeout_secs: u64,

    #[serde(default = "default_reboot_poll")]
    pub reboot_poll_secs: u64,

    #[serde(default = "default_chunk_size")]
    pub chunk_size: usize,
}

fn default_min_free_space() -> f64 {
    MIN_FREE_SPACE_GB
}

fn default_install_timeout() -> u64 {
    INSTALL_TIMEOUT.as_secs()
}

fn default_install_poll() -> u64 {
    INSTALL_POLL_INTERVAL.as_secs()
}

fn default_reboot_timeout() -> u64 {
    REBOOT_TIMEOUT.as_secs()
}

fn default_reboot_poll() -> u64 {
    REBOOT_POLL_INTERVAL.as_secs()
}

fn default_chunk_size() -> usize {
    UPLOAD_CHUNK_SIZE
}

impl Default for UpgradeConfig {
    fn default() -> Self {
        Self {
            min_free_space_gb: default_min_free_space(),
            install_timeout_secs: default_install_timeout(),
            install_poll_secs: default_install_poll(),
            reboot_timeout_secs: default_reboot_timeout(),
            reboot_poll_secs: default_reboot_poll(),
            chunk_size: default_chunk_size(),
        }
    }
}

impl Config {
    /// Parse a configuration from a TOML string
    pub fn parse_str(content: &str) -> Result<Self> {
        let config: Config = toml::from_str(content)
            .map_err(|e| Error::ConfigError(format!("Failed to parse config: {e}")))?;
        config.validate()?;
        Ok(config)
    }

    /// Load a configuration file
    pub fn load(path: &Path) -> Result<Self> {
        let content = std::fs::read_to_string(path).map_err(|e| {
            Error::ConfigError(format!("Failed to read {}: {e}", path.display()))
        })?;
        Self::parse_str(&content)
    }

    /// Load `path` if given, else the default file if present, else defaults
    pub fn load_or_default(path: Option<&Path>) -> Result<Self> {
        match path {
            Some(path) => Self::load(path),
            None => {
                let default = Path::new(DEFAULT_CONFIG_PATH);
                if default.exists() {
                    Self::load(default)
                } else {
                    Ok(Self::default())
                }
            }
        }
    }

    fn validate(&self) -> Result<()> {
        let u = &self.upgrade;
        if u.install_poll_secs == 0 || u.reboot_poll_secs == 0 {
            return Err(Error::ConfigError(
                "poll intervals must be at least one second".to_string(),
            ));
        }
        if u.chunk_size == 0 {
            return Err(Error::ConfigError("chunk_size must be non-zero".to_string()));
        }
        if u.min_free_space_gb.is_nan() || u.min_free_space_gb < 0.0 {
            return Err(Error::ConfigError(format!(
                "min_free_space_gb must be non-negative, got {}",
                u.min_free_space_gb
            )));
        }
        Ok(())
    }

    /// Apply command-line overrides on top of the file
    pub fn with_overrides(
        mut self,
        host: Option<String>,
        username: Option<String>,
        password: Option<String>,
    ) -> Self {
        if host.is_some() {
            self.device.host = host;
        }
        if username.is_some() {
            self.device.username = username;
        }
        if password.is_some() {
            self.device.password = password;
        }
        self
    }

    /// Host and credentials, all of which must be set
    pub fn credentials(&self) -> Result<Credentials> {
        let missing = |what: &str| Error::ConfigError(format!("no {what} configured"));
        Ok(Credentials {
            host: self.device.host.clone().ok_or_else(|| missing("host"))?,
            username: self.device.username.clone().ok_or_else(|| missing("username"))?,
            password: self.device.password.clone().ok_or_else(|| missing("password"))?,
        })
    }

    pub fn request_timeout(&self) -> Option<Duration> {
        self.device.request_timeout_secs.map(Duration::from_secs)
    }

    pub fn install_settings(&self) -> InstallSettings {
        InstallSettings {
            min_free_space_gb: self.upgrade.min_free_space_gb,
            policy: PollPolicy::new(
                Duration::from_secs(self.upgrade.install_poll_secs),
                Duration::from_secs(self.upgrade.install_timeout_secs),
            ),
        }
    }

    pub fn reboot_policy(&self) -> PollPolicy {
        PollPolicy::new(
            Duration::from_secs(self.upgrade.reboot_poll_secs),
            Duration::from_secs(self.upgrade.reboot_timeout_secs),
        )
    }
}
