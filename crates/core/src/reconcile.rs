//! Merges a discovery snapshot into the pool without losing leases.

use std::collections::HashSet;

use tracing::debug;

use crate::device::{Device, DiscoveredDevice};
use crate::discovery::merge_snapshots;
use crate::pool::DevicePool;

/// Outcome of one reconciliation cycle.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct ReconcileSummary {
	/// Devices seen for the first time.
	pub added: usize,
	/// Devices that were already known and were rediscovered.
	pub retained: usize,
	/// Ephemeral devices dropped because the scan no longer reports them.
	pub removed: usize,
}

/// Applies `discovered` to `pool`.
///
/// A UDID reported more than once counts once; its last record wins.
///
/// Lease fields of rediscovered devices are carried over; every other field
/// takes the scanned value. All android devices and real iOS devices that the
/// scan does not report are dropped. Simulators are never dropped.
///
/// The whole merge runs under one write lock, so allocation callers see
/// either the state before the cycle or the state after it.
pub fn reconcile(pool: &DevicePool, discovered: Vec<DiscoveredDevice>) -> ReconcileSummary {
	let discovered = merge_snapshots([discovered]);
	let mut state = pool.write();
	let mut summary = ReconcileSummary::default();

	let effective: Vec<Device> = discovered
		.into_iter()
		.map(|d| {
			let prior = state.get(&d.udid);
			if prior.is_some() {
				summary.retained += 1;
			} else {
				summary.added += 1;
			}
			Device::from_discovered(d, prior)
		})
		.collect();

	let rediscovered: HashSet<&str> = effective.iter().map(|d| d.udid.as_str()).collect();
	let evicted = state.remove_where(Device::is_ephemeral);
	summary.removed = evicted
		.iter()
		.filter(|d| !rediscovered.contains(d.udid.as_str()))
		.count();

	for device in effective {
		state.put(device);
	}
	drop(state);

	debug!(
		target = "devpool.pool",
		added = summary.added,
		retained = summary.retained,
		removed = summary.removed,
		"reconciled discovery snapshot"
	);
	summary
}

#[cfg(test)]
mod tests {
	use super::*;
	use crate::device::Platform;

	fn android(udid: &str) -> DiscoveredDevice {
		DiscoveredDevice::new(udid, Platform::Android)
	}

	fn real_ios(udid: &str) -> DiscoveredDevice {
		DiscoveredDevice::new(udid, Platform::Ios).with_real_device(true)
	}

	fn simulator(udid: &str) -> DiscoveredDevice {
		DiscoveredDevice::new(udid, Platform::Ios).with_name("iPhone 15")
	}

	#[test]
	fn lease_survives_rediscovery() {
		let pool = DevicePool::with_devices([Device::from(android("A1"))]);
		let device = pool.get("A1").unwrap();
		pool.block_device(&device);
		pool.update_device(&device, "sess-9");

		let summary = reconcile(&pool, vec![android("A1").with_state("device").with_sdk("14")]);

		let after = pool.get("A1").unwrap();
		assert!(after.busy);
		assert_eq!(after.session_id.as_deref(), Some("sess-9"));
		assert_eq!(after.state, "device");
		assert_eq!(after.sdk, "14");
		assert_eq!(summary, ReconcileSummary { added: 0, retained: 1, removed: 0 });
	}

	#[test]
	fn vanished_ephemeral_devices_are_dropped() {
		let pool = DevicePool::with_devices([
			Device::from(android("A1")),
			Device::from(android("A2")),
			Device::from(real_ios("R1")),
			Device::from(simulator("S1")),
		]);

		let summary = reconcile(&pool, vec![android("A2"), android("A3")]);

		assert!(pool.get("A1").is_none());
		assert!(pool.get("R1").is_none());
		assert!(pool.get("A2").is_some());
		assert!(pool.get("A3").is_some());
		assert!(pool.get("S1").is_some());
		assert_eq!(summary, ReconcileSummary { added: 1, retained: 1, removed: 2 });
	}

	#[test]
	fn new_devices_start_free() {
		let pool = DevicePool::new();
		reconcile(&pool, vec![android("A1"), simulator("S1")]);
		assert!(pool.list().iter().all(|d| !d.busy && d.session_id.is_none()));
		assert_eq!(pool.len(), 2);
	}

	#[test]
	fn leased_device_missing_from_scan_is_dropped() {
		let pool = DevicePool::with_devices([Device::from(android("A1"))]);
		pool.block_device(&pool.get("A1").unwrap());

		reconcile(&pool, Vec::new());
		assert!(pool.is_empty());
	}

	#[test]
	fn duplicate_udids_in_snapshot_stay_unique() {
		let pool = DevicePool::new();
		let summary = reconcile(&pool, vec![android("A1").with_state("offline"), android("A1").with_state("device")]);
		assert_eq!(pool.len(), 1);
		assert_eq!(pool.get("A1").unwrap().state, "device");
		assert_eq!(summary, ReconcileSummary { added: 1, retained: 0, removed: 0 });
	}

	#[test]
	fn duplicate_known_udid_counts_as_one_retained() {
		let pool = DevicePool::with_devices([Device::from(android("A1"))]);
		let summary = reconcile(&pool, vec![android("A1"), android("A2"), android("A1")]);
		assert_eq!(summary, ReconcileSummary { added: 1, retained: 1, removed: 0 });
		assert_eq!(pool.len(), 2);
	}
}
