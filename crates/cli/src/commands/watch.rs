use devpool::{CycleReport, Device, PoolLifecycle};
use serde::Serialize;
use tracing::info;

use super::emit;
use crate::output::OutputFormat;

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct CycleData {
	pub cycle: u64,
	pub added: usize,
	pub retained: usize,
	pub removed: usize,
	pub failed_sources: usize,
	pub devices: Vec<Device>,
}

impl CycleData {
	fn new(report: CycleReport, devices: Vec<Device>) -> Self {
		Self {
			cycle: report.cycle,
			added: report.summary.added,
			retained: report.summary.retained,
			removed: report.summary.removed,
			failed_sources: report.failed_sources,
			devices,
		}
	}
}

/// Prints the pool after every discovery cycle until Ctrl-C or `max_cycles`.
pub async fn execute(lifecycle: &PoolLifecycle, max_cycles: Option<u64>, format: OutputFormat) {
	lifecycle.pool().await;
	emit("watch", CycleData::new(CycleReport::default(), lifecycle.list_all_devices()), format);

	let Some(mut reports) = lifecycle.cycle_reports() else {
		info!(target = "devpool.cli", "allow-list configured; nothing to watch");
		return;
	};

	loop {
		tokio::select! {
			changed = reports.changed() => {
				if changed.is_err() {
					break;
				}
				let report = *reports.borrow_and_update();
				emit("watch", CycleData::new(report, lifecycle.list_all_devices()), format);
				if max_cycles.is_some_and(|max| report.cycle >= max) {
					break;
				}
			}
			_ = tokio::signal::ctrl_c() => {
				info!(target = "devpool.cli", "received Ctrl+C, stopping");
				break;
			}
		}
	}
}
