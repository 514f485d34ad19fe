//! Pool configuration.
//!
//! Values come from a [`PoolConfig`] built in code or from the environment:
//!
//! | Variable                  | Meaning                                   |
//! |---------------------------|-------------------------------------------|
//! | `UDIDS`                   | comma-separated allow-list of device ids  |
//! | `DEVICE_POOL_RESCAN_SECS` | discovery interval in seconds (default 10)|
//! | `DEVICE_CONFIG_PATH`      | absolute path to a device list            |

use std::path::{Path, PathBuf};
use std::time::Duration;

use serde::{Deserialize, Serialize};

use crate::error::{Error, Result};

pub const UDIDS_ENV: &str = "UDIDS";
pub const RESCAN_SECS_ENV: &str = "DEVICE_POOL_RESCAN_SECS";
pub const DEVICE_CONFIG_PATH_ENV: &str = "DEVICE_CONFIG_PATH";

pub const DEFAULT_RESCAN_INTERVAL: Duration = Duration::from_secs(10);

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct PoolConfig {
	/// Restricts the pool to these devices and disables rescanning.
	pub udids: Option<Vec<String>>,
	pub rescan_interval: Duration,
	/// Whether iOS discovery sources are consulted.
	pub ios_host: bool,
	pub device_config_path: Option<PathBuf>,
}

impl Default for PoolConfig {
	fn default() -> Self {
		Self {
			udids: None,
			rescan_interval: DEFAULT_RESCAN_INTERVAL,
			ios_host: cfg!(target_os = "macos"),
			device_config_path: None,
		}
	}
}

impl PoolConfig {
	pub fn from_env() -> Result<Self> {
		Self::from_lookup(|key| std::env::var(key).ok())
	}

	/// Builds a config from an arbitrary variable lookup.
	pub fn from_lookup<F>(lookup: F) -> Result<Self>
	where
		F: Fn(&str) -> Option<String>,
	{
		let mut config = Self::default();

		config.udids = lookup(UDIDS_ENV).and_then(|raw| parse_udids(&raw));

		if let Some(raw) = lookup(RESCAN_SECS_ENV) {
			config.rescan_interval = parse_interval(&raw)?;
		}

		if let Some(raw) = lookup(DEVICE_CONFIG_PATH_ENV).filter(|v| !v.trim().is_empty()) {
			config.device_config_path = Some(validate_device_config_path(Path::new(raw.trim()))?);
		}

		Ok(config)
	}

	pub fn with_udids<I, S>(mut self, udids: I) -> Self
	where
		I: IntoIterator<Item = S>,
		S: Into<String>,
	{
		self.udids = Some(udids.into_iter().map(Into::into).collect());
		self
	}

	pub fn with_rescan_interval(mut self, interval: Duration) -> Self {
		self.rescan_interval = interval;
		self
	}

	pub fn with_ios_host(mut self, ios_host: bool) -> Self {
		self.ios_host = ios_host;
		self
	}

	pub fn with_device_config_path(mut self, path: impl AsRef<Path>) -> Result<Self> {
		self.device_config_path = Some(validate_device_config_path(path.as_ref())?);
		Ok(self)
	}

	/// Allow-list, if one is configured and non-empty.
	pub fn allow_list(&self) -> Option<&[String]> {
		self.udids.as_deref().filter(|u| !u.is_empty())
	}
}

/// Splits a comma-separated UDID list. Blank entries are dropped.
pub fn parse_udids(raw: &str) -> Option<Vec<String>> {
	let udids: Vec<String> = raw
		.split(',')
		.map(str::trim)
		.filter(|u| !u.is_empty())
		.map(str::to_string)
		.collect();
	(!udids.is_empty()).then_some(udids)
}

fn parse_interval(raw: &str) -> Result<Duration> {
	match raw.trim().parse::<u64>() {
		Ok(secs) if secs > 0 => Ok(Duration::from_secs(secs)),
		_ => Err(Error::InvalidConfig(format!(
			"{RESCAN_SECS_ENV} must be a positive number of seconds, got {raw:?}"
		))),
	}
}

/// Accepts only absolute device config paths.
pub fn validate_device_config_path(path: &Path) -> Result<PathBuf> {
	if path.is_absolute() {
		Ok(path.to_path_buf())
	} else {
		Err(Error::ConfigPathNotAbsolute {
			path: path.to_path_buf(),
		})
	}
}
