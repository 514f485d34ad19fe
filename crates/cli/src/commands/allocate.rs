use devpool::{Device, DeviceFilter, FreeDeviceOptions, Platform, PoolLifecycle};
use tracing::info;

use crate::error::Result;

pub async fn execute(
	lifecycle: &PoolLifecycle,
	platform: &str,
	simulator: Option<&str>,
	session: Option<&str>,
) -> Result<Device> {
	platform.parse::<Platform>()?;
	let options = simulator.map(FreeDeviceOptions::simulator);
	let filter = DeviceFilter::new(platform, options.as_ref());

	let pool = lifecycle.pool().await;
	let device = pool.acquire(&filter, session)?;
	info!(target = "devpool.cli", udid = %device.udid, "allocated device");
	Ok(device)
}
