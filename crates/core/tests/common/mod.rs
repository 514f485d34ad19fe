#![allow(dead_code)]

use std::sync::Arc;

use devpool::{DiscoveredDevice, DiscoverySource, Error, Result, async_trait};
use parking_lot::Mutex;

/// In-memory source whose snapshot can be swapped between scans.
#[derive(Clone)]
pub struct FakeSource {
	name: &'static str,
	devices: Arc<Mutex<Vec<DiscoveredDevice>>>,
	fail: Arc<Mutex<bool>>,
	ios: bool,
	rescan: bool,
}

impl FakeSource {
	pub fn new(name: &'static str, devices: Vec<DiscoveredDevice>) -> Self {
		Self {
			name,
			devices: Arc::new(Mutex::new(devices)),
			fail: Arc::new(Mutex::new(false)),
			ios: false,
			rescan: true,
		}
	}

	pub fn ios(mut self) -> Self {
		self.ios = true;
		self
	}

	pub fn initial_only(mut self) -> Self {
		self.rescan = false;
		self
	}

	pub fn set(&self, devices: Vec<DiscoveredDevice>) {
		*self.devices.lock() = devices;
	}

	pub fn set_failing(&self, fail: bool) {
		*self.fail.lock() = fail;
	}
}

#[async_trait]
impl DiscoverySource for FakeSource {
	fn name(&self) -> &str {
		self.name
	}

	fn requires_ios_host(&self) -> bool {
		self.ios
	}

	fn rescan(&self) -> bool {
		self.rescan
	}

	async fn get_devices(&self) -> Result<Vec<DiscoveredDevice>> {
		if *self.fail.lock() {
			return Err(Error::discovery(self.name, "enumeration failed"));
		}
		Ok(self.devices.lock().clone())
	}
}
