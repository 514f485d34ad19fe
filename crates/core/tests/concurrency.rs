//! Allocation racing with other allocations and with rescans.

use std::collections::HashSet;
use std::sync::Arc;

use devpool::{Device, DeviceFilter, DevicePool, DiscoveredDevice, Platform, reconcile};

fn android_pool(count: usize) -> DevicePool {
	DevicePool::with_devices((0..count).map(|i| Device::from(DiscoveredDevice::new(format!("A{i}"), Platform::Android))))
}

#[test]
fn concurrent_acquires_never_share_a_device() {
	let pool = android_pool(8);
	let filter = Arc::new(DeviceFilter::new("android", None));

	let handles: Vec<_> = (0..32)
		.map(|i| {
			let pool = pool.clone();
			let filter = Arc::clone(&filter);
			std::thread::spawn(move || pool.acquire(&filter, Some(format!("sess-{i}").as_str())).ok())
		})
		.collect();

	let leased: Vec<Device> = handles
		.into_iter()
		.filter_map(|h| h.join().unwrap())
		.collect();

	assert_eq!(leased.len(), 8);
	let unique: HashSet<_> = leased.iter().map(|d| d.udid.clone()).collect();
	assert_eq!(unique.len(), 8);
	assert!(pool.list().iter().all(|d| d.busy));
}

#[test]
fn two_step_find_then_block_has_one_winner() {
	let pool = android_pool(1);
	let barrier = Arc::new(std::sync::Barrier::new(8));

	let handles: Vec<_> = (0..8)
		.map(|_| {
			let pool = pool.clone();
			let barrier = Arc::clone(&barrier);
			std::thread::spawn(move || {
				let found = pool.get_free_device("android", None);
				barrier.wait();
				found.and_then(|device| pool.block_device(&device))
			})
		})
		.collect();

	let winners: Vec<Device> = handles
		.into_iter()
		.filter_map(|h| h.join().unwrap())
		.collect();

	assert_eq!(winners.len(), 1);
	assert_eq!(winners[0].udid, "A0");
	assert!(pool.get("A0").unwrap().busy);
}

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn leases_survive_concurrent_rescans() {
	let pool = android_pool(16);
	let snapshot: Vec<DiscoveredDevice> = (0..16)
		.map(|i| DiscoveredDevice::new(format!("A{i}"), Platform::Android).with_state("device"))
		.collect();

	let rescanner = {
		let pool = pool.clone();
		let snapshot = snapshot.clone();
		tokio::spawn(async move {
			for _ in 0..200 {
				reconcile(&pool, snapshot.clone());
				tokio::task::yield_now().await;
			}
		})
	};

	let filter = DeviceFilter::new("android", None);
	let mut sessions = Vec::new();
	for i in 0..16 {
		let session = format!("sess-{i}");
		let device = pool.acquire(&filter, Some(session.as_str())).unwrap();
		sessions.push((device.udid, session));
		tokio::task::yield_now().await;
	}

	rescanner.await.unwrap();

	assert_eq!(pool.len(), 16);
	for (udid, session) in sessions {
		let device = pool.get(&udid).unwrap();
		assert!(device.busy, "{udid} lost its lease");
		assert_eq!(device.session_id.as_deref(), Some(session.as_str()));
		assert_eq!(pool.get_device_for_session(&session).unwrap().udid, udid);
	}
}

#[test]
fn readers_never_see_a_half_applied_merge() {
	let pool = android_pool(4);
	let snapshot: Vec<DiscoveredDevice> = (0..4)
		.map(|i| DiscoveredDevice::new(format!("A{i}"), Platform::Android))
		.collect();

	let writer = {
		let pool = pool.clone();
		std::thread::spawn(move || {
			for _ in 0..500 {
				reconcile(&pool, snapshot.clone());
			}
		})
	};

	for _ in 0..500 {
		assert_eq!(pool.find_all(|d| d.platform == Platform::Android).len(), 4);
	}
	writer.join().unwrap();
}
