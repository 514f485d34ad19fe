use devpool::{Device, PoolLifecycle};
use serde::Serialize;

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ListData {
	pub count: usize,
	pub rescanning: bool,
	pub devices: Vec<Device>,
}

pub async fn execute(lifecycle: &PoolLifecycle) -> ListData {
	lifecycle.pool().await;
	let devices = lifecycle.list_all_devices();
	ListData {
		count: devices.len(),
		rescanning: lifecycle.is_rescanning(),
		devices,
	}
}
