use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::error::Error;

/// Platform family a device belongs to.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Platform {
	#[serde(rename = "android", alias = "Android")]
	Android,
	#[serde(rename = "iOS", alias = "ios")]
	Ios,
}

impl Platform {
	pub fn as_str(&self) -> &'static str {
		match self {
			Platform::Android => "android",
			Platform::Ios => "iOS",
		}
	}
}

impl fmt::Display for Platform {
	fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
		f.write_str(self.as_str())
	}
}

impl FromStr for Platform {
	type Err = Error;

	fn from_str(s: &str) -> Result<Self, Self::Err> {
		match s.trim().to_lowercase().as_str() {
			"android" => Ok(Platform::Android),
			"ios" => Ok(Platform::Ios),
			_ => Err(Error::UnknownPlatform(s.to_string())),
		}
	}
}

/// A device as reported by a discovery source, without any lease state.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DiscoveredDevice {
	pub udid: String,
	pub platform: Platform,
	#[serde(default)]
	pub name: String,
	#[serde(default)]
	pub real_device: bool,
	#[serde(default)]
	pub sdk: String,
	#[serde(default)]
	pub state: String,
}

impl DiscoveredDevice {
	pub fn new(udid: impl Into<String>, platform: Platform) -> Self {
		Self {
			udid: udid.into(),
			platform,
			name: String::new(),
			real_device: false,
			sdk: String::new(),
			state: String::new(),
		}
	}

	pub fn with_name(mut self, name: impl Into<String>) -> Self {
		self.name = name.into();
		self
	}

	pub fn with_real_device(mut self, real_device: bool) -> Self {
		self.real_device = real_device;
		self
	}

	pub fn with_sdk(mut self, sdk: impl Into<String>) -> Self {
		self.sdk = sdk.into();
		self
	}

	pub fn with_state(mut self, state: impl Into<String>) -> Self {
		self.state = state.into();
		self
	}

	/// Whether pool membership for this category is re-derived from every scan.
	///
	/// Android devices and real iOS devices can disappear at any time;
	/// simulators cannot.
	pub fn is_ephemeral(&self) -> bool {
		is_ephemeral(self.platform, self.real_device)
	}
}

/// A tracked device together with its lease state.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Device {
	pub udid: String,
	pub platform: Platform,
	pub name: String,
	pub real_device: bool,
	pub sdk: String,
	pub state: String,
	pub busy: bool,
	pub session_id: Option<String>,
	#[serde(default)]
	pub offline: bool,
}

impl Device {
	/// Builds the pool record for a freshly discovered device.
	///
	/// Lease fields come from `prior` when the device was already known and
	/// default to free/unbound otherwise. Everything else comes from the scan.
	pub fn from_discovered(discovered: DiscoveredDevice, prior: Option<&Device>) -> Self {
		Self {
			udid: discovered.udid,
			platform: discovered.platform,
			name: discovered.name,
			real_device: discovered.real_device,
			sdk: discovered.sdk,
			state: discovered.state,
			busy: prior.is_some_and(|d| d.busy),
			session_id: prior.and_then(|d| d.session_id.clone()),
			offline: prior.is_some_and(|d| d.offline),
		}
	}

	pub fn is_ephemeral(&self) -> bool {
		is_ephemeral(self.platform, self.real_device)
	}

	pub fn is_leased(&self) -> bool {
		self.busy && self.session_id.is_some()
	}
}

impl From<DiscoveredDevice> for Device {
	fn from(discovered: DiscoveredDevice) -> Self {
		Device::from_discovered(discovered, None)
	}
}

fn is_ephemeral(platform: Platform, real_device: bool) -> bool {
	match platform {
		Platform::Android => true,
		Platform::Ios => real_device,
	}
}
