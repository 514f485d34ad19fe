//! One-time pool construction.
//!
//! A [`PoolLifecycle`] owns the configuration and discovery sources and
//! builds the pool on first use. With an allow-list the pool holds exactly
//! the listed devices and is never rescanned; otherwise every discovered
//! device is tracked and a [`DiscoveryScheduler`] keeps the pool current.

use parking_lot::Mutex;
use tokio::sync::OnceCell;
use tracing::{info, warn};

use crate::config::PoolConfig;
use crate::device::{Device, DiscoveredDevice};
use crate::discovery::{DiscoverySources, ScanPhase};
use crate::pool::DevicePool;
use crate::scheduler::{CycleReport, DiscoveryScheduler, SchedulerHandle};

pub struct PoolLifecycle {
	config: PoolConfig,
	sources: DiscoverySources,
	align_rescans: bool,
	pool: OnceCell<DevicePool>,
	scheduler: Mutex<Option<SchedulerHandle>>,
}

impl std::fmt::Debug for PoolLifecycle {
	fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
		f.debug_struct("PoolLifecycle")
			.field("config", &self.config)
			.field("sources", &self.sources)
			.field("initialized", &self.pool.initialized())
			.finish()
	}
}

impl PoolLifecycle {
	pub fn new(config: PoolConfig, sources: DiscoverySources) -> Self {
		Self {
			config,
			sources,
			align_rescans: true,
			pool: OnceCell::new(),
			scheduler: Mutex::new(None),
		}
	}

	/// See [`DiscoveryScheduler::with_wall_clock_alignment`].
	pub fn with_wall_clock_alignment(mut self, align: bool) -> Self {
		self.align_rescans = align;
		self
	}

	pub fn config(&self) -> &PoolConfig {
		&self.config
	}

	/// Returns the pool, building it on the first call.
	///
	/// Concurrent first callers wait for a single initialization.
	pub async fn pool(&self) -> &DevicePool {
		self.pool.get_or_init(|| self.initialize()).await
	}

	pub fn is_initialized(&self) -> bool {
		self.pool.initialized()
	}

	/// Whether background rescanning is active.
	pub fn is_rescanning(&self) -> bool {
		self.scheduler
			.lock()
			.as_ref()
			.is_some_and(SchedulerHandle::is_running)
	}

	/// Cycle reports from the background scheduler, when one is running.
	pub fn cycle_reports(&self) -> Option<tokio::sync::watch::Receiver<CycleReport>> {
		self.scheduler.lock().as_ref().map(SchedulerHandle::reports)
	}

	/// Every device currently tracked, or nothing before initialization.
	pub fn list_all_devices(&self) -> Vec<Device> {
		self.pool.get().map(DevicePool::list).unwrap_or_default()
	}

	/// Stops background rescanning. The pool stays usable.
	pub async fn shutdown(&self) {
		let handle = self.scheduler.lock().take();
		if let Some(handle) = handle {
			handle.shutdown().await;
		}
	}

	async fn initialize(&self) -> DevicePool {
		let sources = self.sources.for_host(self.config.ios_host);
		let discovered = sources.discover(ScanPhase::Initial).await;

		if let Some(udids) = self.config.allow_list() {
			let devices = filter_allow_listed(udids, discovered);
			info!(
				target = "devpool",
				requested = udids.len(),
				tracked = devices.len(),
				"device pool initialized from allow-list; rescanning disabled"
			);
			return DevicePool::with_devices(devices);
		}

		let pool = DevicePool::with_devices(discovered.into_iter().map(Device::from));
		info!(target = "devpool", tracked = pool.len(), "device pool initialized from discovery");

		let handle = DiscoveryScheduler::new(pool.clone(), sources, self.config.rescan_interval)
			.with_wall_clock_alignment(self.align_rescans)
			.spawn();
		*self.scheduler.lock() = Some(handle);
		pool
	}
}

/// Picks the allow-listed devices out of a scan, in allow-list order.
///
/// Identifiers missing from the scan are skipped with a warning.
pub fn filter_allow_listed(udids: &[String], available: Vec<DiscoveredDevice>) -> Vec<Device> {
	let mut devices = Vec::with_capacity(udids.len());
	for udid in udids {
		match available.iter().find(|d| &d.udid == udid) {
			Some(found) => devices.push(Device::from(found.clone())),
			None => warn!(target = "devpool", udid = %udid, "allow-listed device not found in discovery"),
		}
	}
	devices
}
