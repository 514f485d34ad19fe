//! Lease operations over the device pool.
//!
//! `get_free_device` followed by `block_device` mirrors the two-step flow of
//! the session layer but is not atomic on its own. Callers that race for
//! devices should use [`DevicePool::acquire`], which finds, blocks, and
//! optionally binds under a single write lock.

use serde::{Deserialize, Serialize};
use tracing::{debug, info};

use crate::device::Device;
use crate::error::{Error, Result};
use crate::pool::DevicePool;

/// Optional narrowing for free-device lookups.
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct FreeDeviceOptions {
	/// Substring that the device name must contain.
	pub simulator: Option<String>,
}

impl FreeDeviceOptions {
	pub fn simulator(name: impl Into<String>) -> Self {
		Self {
			simulator: Some(name.into()),
		}
	}
}

/// Effective filter for a free-device lookup.
///
/// Serialized field order is part of the exhaustion error message.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct DeviceFilter {
	/// Lowercased requested platform.
	pub platform: String,
	/// Required name substring; empty matches every name.
	pub name: String,
	pub busy: bool,
	pub offline: bool,
}

impl DeviceFilter {
	pub fn new(platform: &str, options: Option<&FreeDeviceOptions>) -> Self {
		Self {
			platform: platform.to_lowercase(),
			name: options
				.and_then(|o| o.simulator.clone())
				.unwrap_or_default(),
			busy: false,
			offline: false,
		}
	}

	pub fn matches(&self, device: &Device) -> bool {
		!device.busy
			&& device.platform.as_str().to_lowercase() == self.platform
			&& device.name.contains(&self.name)
	}

	pub fn to_json(&self) -> String {
		serde_json::to_string(self).unwrap_or_default()
	}
}

impl DevicePool {
	/// First free device for `platform`, in insertion order.
	pub fn get_free_device(&self, platform: &str, options: Option<&FreeDeviceOptions>) -> Option<Device> {
		let filter = DeviceFilter::new(platform, options);
		debug!(target = "devpool.pool", platform = %filter.platform, name = %filter.name, "finding free device");
		self.find(|device| filter.matches(device))
	}

	/// Like [`get_free_device`](Self::get_free_device) but reports exhaustion
	/// as [`Error::NoDeviceFound`].
	pub fn require_free_device(&self, platform: &str, options: Option<&FreeDeviceOptions>) -> Result<Device> {
		let filter = DeviceFilter::new(platform, options);
		self.find(|device| filter.matches(device))
			.ok_or(Error::NoDeviceFound { filter })
	}

	/// Marks the device with the same UDID as busy.
	///
	/// Returns `None` when the UDID is not in the pool or is already busy, so
	/// of two callers that found the same free device only one wins.
	pub fn block_device(&self, device: &Device) -> Option<Device> {
		let blocked = self.update_if(&device.udid, |d| !d.busy, |d| d.busy = true);
		if blocked.is_none() {
			debug!(target = "devpool.pool", udid = %device.udid, "block refused; device missing or busy");
		}
		blocked
	}

	/// Marks the device with the same UDID as free.
	///
	/// The session binding is left as is; use [`release`](Self::release) for a
	/// full lease teardown.
	pub fn unblock_device(&self, device: &Device) -> Option<Device> {
		self.update(&device.udid, |d| d.busy = false)
	}

	/// Binds the device with the same UDID to `session_id`.
	pub fn update_device(&self, device: &Device, session_id: impl Into<String>) -> Option<Device> {
		let session_id = session_id.into();
		self.update(&device.udid, move |d| d.session_id = Some(session_id))
	}

	/// Device currently bound to `session_id`, if any.
	pub fn get_device_for_session(&self, session_id: &str) -> Option<Device> {
		self.find(|device| device.session_id.as_deref() == Some(session_id))
	}

	/// Finds a free device matching `filter`, blocks it, and binds it to
	/// `session_id` in one critical section.
	pub fn acquire(&self, filter: &DeviceFilter, session_id: Option<&str>) -> Result<Device> {
		let mut state = self.write();
		let udid = state
			.find(|device| filter.matches(device))
			.map(|device| device.udid.clone())
			.ok_or_else(|| Error::NoDeviceFound { filter: filter.clone() })?;

		let Some(device) = state.get_mut(&udid) else {
			return Err(Error::NoDeviceFound { filter: filter.clone() });
		};
		device.busy = true;
		if let Some(session_id) = session_id {
			device.session_id = Some(session_id.to_string());
		}
		let leased = device.clone();
		drop(state);

		info!(
			target = "devpool.pool",
			udid = %leased.udid,
			platform = %leased.platform,
			session_id = leased.session_id.as_deref().unwrap_or(""),
			"device leased"
		);
		Ok(leased)
	}

	/// Clears both `busy` and the session binding.
	pub fn release(&self, udid: &str) -> Option<Device> {
		let released = self.update(udid, |d| {
			d.busy = false;
			d.session_id = None;
		});
		if released.is_some() {
			info!(target = "devpool.pool", udid, "device released");
		}
		released
	}
}
