//! Fixed-interval discovery loop.

use std::time::{Duration, SystemTime, UNIX_EPOCH};

use tokio::sync::watch;
use tokio::task::JoinHandle;
use tokio::time::{Instant, MissedTickBehavior};
use tracing::{debug, info, warn};

use crate::discovery::{DiscoverySources, ScanPhase};
use crate::pool::DevicePool;
use crate::reconcile::{ReconcileSummary, reconcile};

/// Shortest period the scheduler accepts; shorter intervals are raised to it.
pub const MIN_RESCAN_INTERVAL: Duration = Duration::from_millis(100);

/// Result of the most recent completed cycle.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct CycleReport {
	/// Number of completed cycles, starting at 1.
	pub cycle: u64,
	pub summary: ReconcileSummary,
	/// Sources that failed during this cycle.
	pub failed_sources: usize,
}

/// Rescans discovery sources on a fixed cadence and reconciles the pool.
///
/// A cycle runs to completion before the next tick is awaited, so cycles
/// never overlap; ticks that fall inside a running cycle are skipped.
#[derive(Debug)]
pub struct DiscoveryScheduler {
	pool: DevicePool,
	sources: DiscoverySources,
	interval: Duration,
	align_to_wall_clock: bool,
}

impl DiscoveryScheduler {
	pub fn new(pool: DevicePool, sources: DiscoverySources, interval: Duration) -> Self {
		if interval < MIN_RESCAN_INTERVAL {
			warn!(
				target = "devpool.discovery",
				requested_ms = interval.as_millis() as u64,
				min_ms = MIN_RESCAN_INTERVAL.as_millis() as u64,
				"rescan interval too short; using minimum"
			);
		}
		let interval = interval.max(MIN_RESCAN_INTERVAL);
		Self {
			pool,
			sources,
			interval,
			align_to_wall_clock: true,
		}
	}

	/// When enabled (the default), the first tick lands on the next multiple
	/// of the interval since the Unix epoch, so a 10 second interval fires at
	/// :00, :10, ..., :50 of each minute.
	pub fn with_wall_clock_alignment(mut self, align: bool) -> Self {
		self.align_to_wall_clock = align;
		self
	}

	pub fn interval(&self) -> Duration {
		self.interval
	}

	/// Runs one discovery and reconciliation cycle. Never fails.
	pub async fn run_cycle(&self) -> (ReconcileSummary, usize) {
		let (devices, errors) = self.sources.scan(ScanPhase::Rescan).await;
		let summary = reconcile(&self.pool, devices);
		(summary, errors.len())
	}

	/// Starts the background loop.
	pub fn spawn(self) -> SchedulerHandle {
		let (shutdown_tx, shutdown_rx) = watch::channel(false);
		let (report_tx, report_rx) = watch::channel(CycleReport::default());
		let task = tokio::spawn(self.run(shutdown_rx, report_tx));
		SchedulerHandle {
			shutdown_tx,
			report_rx,
			task,
		}
	}

	async fn run(self, mut shutdown_rx: watch::Receiver<bool>, report_tx: watch::Sender<CycleReport>) {
		let delay = if self.align_to_wall_clock {
			delay_to_boundary(SystemTime::now(), self.interval)
		} else {
			self.interval
		};
		let mut ticker = tokio::time::interval_at(Instant::now() + delay, self.interval);
		ticker.set_missed_tick_behavior(MissedTickBehavior::Skip);

		info!(
			target = "devpool.discovery",
			interval_ms = self.interval.as_millis() as u64,
			sources = self.sources.len(),
			"discovery scheduler started"
		);

		let mut cycle = 0u64;
		loop {
			tokio::select! {
				changed = shutdown_rx.changed() => {
					if changed.is_err() || *shutdown_rx.borrow() {
						break;
					}
				}
				_ = ticker.tick() => {
					let (summary, failed_sources) = self.run_cycle().await;
					cycle += 1;
					debug!(target = "devpool.discovery", cycle, failed_sources, "discovery cycle complete");
					report_tx.send_replace(CycleReport { cycle, summary, failed_sources });
				}
			}
		}

		info!(target = "devpool.discovery", cycles = cycle, "discovery scheduler stopped");
	}
}

/// Handle to a running [`DiscoveryScheduler`].
///
/// Dropping the handle stops the loop after the current cycle.
#[derive(Debug)]
pub struct SchedulerHandle {
	shutdown_tx: watch::Sender<bool>,
	report_rx: watch::Receiver<CycleReport>,
	task: JoinHandle<()>,
}

impl SchedulerHandle {
	/// Receiver that changes after every completed cycle.
	pub fn reports(&self) -> watch::Receiver<CycleReport> {
		self.report_rx.clone()
	}

	pub fn is_running(&self) -> bool {
		!self.task.is_finished()
	}

	/// Signals the loop to stop and waits for it to exit.
	pub async fn shutdown(self) {
		let _ = self.shutdown_tx.send(true);
		let _ = self.task.await;
	}
}

fn delay_to_boundary(now: SystemTime, interval: Duration) -> Duration {
	let period = interval.as_millis();
	if period == 0 {
		return Duration::ZERO;
	}
	let since_epoch = now.duration_since(UNIX_EPOCH).unwrap_or_default().as_millis();
	let remainder = since_epoch % period;
	if remainder == 0 {
		Duration::ZERO
	} else {
		Duration::from_millis((period - remainder) as u64)
	}
}

#[cfg(test)]
mod tests {
	use std::sync::Arc;
	use std::sync::atomic::{AtomicUsize, Ordering};

	use async_trait::async_trait;

	use super::*;
	use crate::device::{Device, DiscoveredDevice, Platform};
	use crate::discovery::DiscoverySource;
	use crate::error::Result;

	struct Counting {
		calls: Arc<AtomicUsize>,
	}

	#[async_trait]
	impl DiscoverySource for Counting {
		fn name(&self) -> &str {
			"counting"
		}

		async fn get_devices(&self) -> Result<Vec<DiscoveredDevice>> {
			let n = self.calls.fetch_add(1, Ordering::SeqCst);
			Ok(vec![DiscoveredDevice::new(format!("A{n}"), Platform::Android)])
		}
	}

	#[test]
	fn boundary_delay_lands_on_interval_marks() {
		let interval = Duration::from_secs(10);
		let at = |secs: u64, millis: u64| UNIX_EPOCH + Duration::from_secs(secs) + Duration::from_millis(millis);

		assert_eq!(delay_to_boundary(at(1_700_000_000, 0), interval), Duration::ZERO);
		assert_eq!(delay_to_boundary(at(1_700_000_003, 0), interval), Duration::from_secs(7));
		assert_eq!(delay_to_boundary(at(1_700_000_009, 500), interval), Duration::from_millis(500));
	}

	#[tokio::test(start_paused = true)]
	async fn scheduler_reconciles_every_interval() {
		let calls = Arc::new(AtomicUsize::new(0));
		let pool = DevicePool::with_devices([Device::from(DiscoveredDevice::new("stale", Platform::Android))]);
		let sources = DiscoverySources::new().with_source(Counting { calls: calls.clone() });

		let handle = DiscoveryScheduler::new(pool.clone(), sources, Duration::from_secs(10))
			.with_wall_clock_alignment(false)
			.spawn();
		let mut reports = handle.reports();

		reports.changed().await.unwrap();
		assert_eq!(reports.borrow().cycle, 1);
		assert!(pool.get("stale").is_none());
		assert!(pool.get("A0").is_some());

		reports.changed().await.unwrap();
		assert_eq!(reports.borrow().cycle, 2);
		assert!(pool.get("A0").is_none());
		assert!(pool.get("A1").is_some());

		handle.shutdown().await;
		assert_eq!(calls.load(Ordering::SeqCst), 2);
	}

	#[tokio::test(start_paused = true)]
	async fn zero_interval_is_raised_to_minimum() {
		let calls = Arc::new(AtomicUsize::new(0));
		let sources = DiscoverySources::new().with_source(Counting { calls: calls.clone() });
		let scheduler = DiscoveryScheduler::new(DevicePool::new(), sources, Duration::ZERO).with_wall_clock_alignment(false);
		assert_eq!(scheduler.interval(), MIN_RESCAN_INTERVAL);

		let handle = scheduler.spawn();
		let mut reports = handle.reports();
		reports.changed().await.unwrap();
		assert_eq!(reports.borrow().cycle, 1);
		assert!(handle.is_running());

		handle.shutdown().await;
		assert_eq!(calls.load(Ordering::SeqCst), 1);
	}

	#[tokio::test(start_paused = true)]
	async fn shutdown_before_first_tick() {
		let calls = Arc::new(AtomicUsize::new(0));
		let sources = DiscoverySources::new().with_source(Counting { calls: calls.clone() });
		let handle = DiscoveryScheduler::new(DevicePool::new(), sources, Duration::from_secs(60))
			.with_wall_clock_alignment(false)
			.spawn();

		assert!(handle.is_running());
		handle.shutdown().await;
		assert_eq!(calls.load(Ordering::SeqCst), 0);
	}
}
