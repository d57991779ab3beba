use std::{env, net::IpAddr, path::PathBuf, time::Duration};

use thiserror::Error;

use crate::domain::store::{ExpiryPolicy, StoreConfig};

pub const DEFAULT_PORT: u16 = 8000;
pub const DEFAULT_PORT_ATTEMPTS: u32 = 10;
pub const DEFAULT_EXPIRY_SECS: u64 = 300;
pub const DEFAULT_MAX_BODY_BYTES: usize = 256 * 1024 * 1024;
pub const DEFAULT_MESSAGE_CAPACITY: usize = 200;

#[derive(Debug, Clone)]
pub struct Config {
    pub bind_addr: String,
    pub port: u16,
    pub port_attempts: u32,
    pub storage_root: PathBuf,
    pub inbound_dir: String,
    pub outbound_dir: String,
    pub static_root: PathBuf,
    pub landing_page: String,
    pub expiry: ExpiryPolicy,
    pub max_body_bytes: usize,
    pub sweep_interval: Option<Duration>,
    pub message_capacity: usize,
}

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("SNAP_SEND_PORT must be a valid u16")]
    InvalidPort,
    #[error("SNAP_SEND_PORT_ATTEMPTS must be a positive integer")]
    InvalidPortAttempts,
    #[error("SNAP_SEND_EXPIRY_SECS must be a positive integer")]
    InvalidExpiry,
    #[error("SNAP_SEND_EXPIRY_POLICY must be one of: ttl, rolling")]
    InvalidExpiryPolicy,
    #[error("SNAP_SEND_MAX_BODY_BYTES must be a positive integer")]
    InvalidBodyLimit,
    #[error("SNAP_SEND_SWEEP_INTERVAL_SECS must be a positive integer")]
    InvalidSweepInterval,
    #[error("SNAP_SEND_MESSAGE_CAPACITY must be a positive integer")]
    InvalidMessageCapacity,
    #[error("{0} must be a single directory name")]
    InvalidDirectoryName(&'static str),
    #[error("invalid bind address")]
    InvalidBindAddr,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            bind_addr: "0.0.0.0".to_string(),
            port: DEFAULT_PORT,
            port_attempts: DEFAULT_PORT_ATTEMPTS,
            storage_root: PathBuf::from("."),
            inbound_dir: "received_files".to_string(),
            outbound_dir: "shared_files".to_string(),
            static_root: PathBuf::from("."),
            landing_page: "desktop.html".to_string(),
            expiry: ExpiryPolicy::Ttl(Duration::from_secs(DEFAULT_EXPIRY_SECS)),
            max_body_bytes: DEFAULT_MAX_BODY_BYTES,
            sweep_interval: None,
            message_capacity: DEFAULT_MESSAGE_CAPACITY,
        }
    }
}

impl Config {
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_lookup(|key| env::var(key).ok())
    }

    /// Builds the configuration from any key lookup, trimming values and
    /// treating empty ones as unset.
    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Result<Self, ConfigError> {
        let read = |key: &str| {
            lookup(key)
                .map(|value| value.trim().to_string())
                .filter(|value| !value.is_empty())
        };
        let defaults = Self::default();

        let bind_addr = read("SNAP_SEND_BIND_ADDR").unwrap_or(defaults.bind_addr);
        let port = read("SNAP_SEND_PORT")
            .map(|value| value.parse::<u16>().map_err(|_| ConfigError::InvalidPort))
            .transpose()?
            .unwrap_or(defaults.port);
        let port_attempts = read("SNAP_SEND_PORT_ATTEMPTS")
            .map(|value| parse_positive::<u32>(&value, ConfigError::InvalidPortAttempts))
            .transpose()?
            .unwrap_or(defaults.port_attempts);
        let storage_root = read("SNAP_SEND_STORAGE_ROOT")
            .map(PathBuf::from)
            .unwrap_or(defaults.storage_root);
        let inbound_dir = read("SNAP_SEND_INBOUND_DIR")
            .map(|value| directory_name(value, "SNAP_SEND_INBOUND_DIR"))
            .transpose()?
            .unwrap_or(defaults.inbound_dir);
        let outbound_dir = read("SNAP_SEND_OUTBOUND_DIR")
            .map(|value| directory_name(value, "SNAP_SEND_OUTBOUND_DIR"))
            .transpose()?
            .unwrap_or(defaults.outbound_dir);
        let static_root = read("SNAP_SEND_STATIC_ROOT")
            .map(PathBuf::from)
            .unwrap_or(defaults.static_root);
        let landing_page = read("SNAP_SEND_LANDING_PAGE").unwrap_or(defaults.landing_page);

        let window = read("SNAP_SEND_EXPIRY_SECS")
            .map(|value| parse_positive::<u64>(&value, ConfigError::InvalidExpiry))
            .transpose()?
            .map(Duration::from_secs)
            .unwrap_or(defaults.expiry.window());
        let expiry = match read("SNAP_SEND_EXPIRY_POLICY")
            .map(|value| value.to_ascii_lowercase())
            .as_deref()
        {
            None | Some("ttl") => ExpiryPolicy::Ttl(window),
            Some("rolling") => ExpiryPolicy::RollingCutoff(window),
            Some(_) => return Err(ConfigError::InvalidExpiryPolicy),
        };

        let max_body_bytes = read("SNAP_SEND_MAX_BODY_BYTES")
            .map(|value| parse_positive::<usize>(&value, ConfigError::InvalidBodyLimit))
            .transpose()?
            .unwrap_or(defaults.max_body_bytes);
        let sweep_interval = read("SNAP_SEND_SWEEP_INTERVAL_SECS")
            .map(|value| parse_positive::<u64>(&value, ConfigError::InvalidSweepInterval))
            .transpose()?
            .map(Duration::from_secs);
        let message_capacity = read("SNAP_SEND_MESSAGE_CAPACITY")
            .map(|value| parse_positive::<usize>(&value, ConfigError::InvalidMessageCapacity))
            .transpose()?
            .unwrap_or(defaults.message_capacity);

        let config = Self {
            bind_addr,
            port,
            port_attempts,
            storage_root,
            inbound_dir,
            outbound_dir,
            static_root,
            landing_page,
            expiry,
            max_body_bytes,
            sweep_interval,
            message_capacity,
        };

        let _ = config.bind_ip()?;
        Ok(config)
    }

    pub fn bind_ip(&self) -> Result<IpAddr, ConfigError> {
        self.bind_addr
            .parse::<IpAddr>()
            .map_err(|_| ConfigError::InvalidBindAddr)
    }

    pub fn store_config(&self) -> StoreConfig {
        StoreConfig {
            inbound_dir: self.storage_root.join(&self.inbound_dir),
            outbound_dir: self.storage_root.join(&self.outbound_dir),
            expiry: self.expiry,
        }
    }
}

fn parse_positive<T>(value: &str, error: ConfigError) -> Result<T, ConfigError>
where
    T: std::str::FromStr + PartialOrd + Default,
{
    match value.parse::<T>() {
        Ok(parsed) if parsed > T::default() => Ok(parsed),
        _ => Err(error),
    }
}

fn directory_name(value: String, key: &'static str) -> Result<String, ConfigError> {
    crate::domain::utils::validate_file_name(&value)
        .map(str::to_string)
        .map_err(|_| ConfigError::InvalidDirectoryName(key))
}
