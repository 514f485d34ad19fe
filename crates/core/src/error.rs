//! Error types for the device pool.

use std::path::PathBuf;

use thiserror::Error;

use crate::allocation::DeviceFilter;

/// Result type alias for pool operations.
pub type Result<T> = std::result::Result<T, Error>;

/// Errors surfaced by the device pool.
#[derive(Debug, Error)]
pub enum Error {
	/// Device config path was relative.
	#[error("Device Config Path {} should be absolute", path.display())]
	ConfigPathNotAbsolute { path: PathBuf },

	/// A configuration value could not be parsed.
	#[error("Invalid configuration: {0}")]
	InvalidConfig(String),

	/// Platform string was neither android nor iOS.
	#[error("Unknown platform: {0}")]
	UnknownPlatform(String),

	/// No free device matched the requested filter.
	#[error("No device found for filters: {}", filter.to_json())]
	NoDeviceFound { filter: DeviceFilter },

	/// A discovery source failed to enumerate devices.
	#[error("Discovery failed for {source_name}: {message}")]
	Discovery { source_name: String, message: String },

	#[error("I/O error: {0}")]
	Io(#[from] std::io::Error),

	#[error("JSON error: {0}")]
	Json(#[from] serde_json::Error),
}

impl Error {
	pub fn discovery(source_name: impl Into<String>, message: impl std::fmt::Display) -> Self {
		Error::Discovery {
			source_name: source_name.into(),
			message: message.to_string(),
		}
	}

	/// Returns true if this is an allocation exhaustion error.
	pub fn is_no_device_found(&self) -> bool {
		matches!(self, Error::NoDeviceFound { .. })
	}

	/// Returns true if this error comes from invalid configuration.
	pub fn is_config_error(&self) -> bool {
		matches!(
			self,
			Error::ConfigPathNotAbsolute { .. } | Error::InvalidConfig(_) | Error::UnknownPlatform(_)
		)
	}

	/// The filter that failed to match, for exhaustion errors.
	pub fn filter(&self) -> Option<&DeviceFilter> {
		match self {
			Error::NoDeviceFound { filter } => Some(filter),
			_ => None,
		}
	}
}
