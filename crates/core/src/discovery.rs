//! Discovery sources and snapshot merging.
//!
//! A [`DiscoverySource`] reports the devices currently visible to the host.
//! Platform enumeration itself lives outside this crate; [`FileSource`] is the
//! one built-in source and reads a JSON device list from disk on every scan.

use std::collections::HashMap;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use async_trait::async_trait;
use futures_util::future::join_all;
use tracing::{debug, warn};

use crate::config::validate_device_config_path;
use crate::device::DiscoveredDevice;
use crate::error::{Error, Result};

/// Something that can enumerate the devices visible right now.
#[async_trait]
pub trait DiscoverySource: Send + Sync {
	/// Label used in logs and errors.
	fn name(&self) -> &str;

	/// Whether this source enumerates iOS targets and therefore needs an
	/// iOS-capable host.
	fn requires_ios_host(&self) -> bool {
		false
	}

	/// Whether the scheduler should poll this source on every cycle.
	///
	/// Sources returning `false` only contribute to the initial scan.
	fn rescan(&self) -> bool {
		true
	}

	async fn get_devices(&self) -> Result<Vec<DiscoveredDevice>>;
}

/// Which sources a scan consults.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum ScanPhase {
	/// Startup pass: every registered source.
	Initial,
	/// Scheduler cycle: only sources that opt into rescanning.
	Rescan,
}

/// The set of discovery sources in registration order.
#[derive(Clone, Default)]
pub struct DiscoverySources {
	sources: Vec<Arc<dyn DiscoverySource>>,
}

impl std::fmt::Debug for DiscoverySources {
	fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
		f.debug_list().entries(self.sources.iter().map(|s| s.name())).finish()
	}
}

impl DiscoverySources {
	pub fn new() -> Self {
		Self::default()
	}

	pub fn with_source(mut self, source: impl DiscoverySource + 'static) -> Self {
		self.sources.push(Arc::new(source));
		self
	}

	pub fn push(&mut self, source: Arc<dyn DiscoverySource>) {
		self.sources.push(source);
	}

	pub fn len(&self) -> usize {
		self.sources.len()
	}

	pub fn is_empty(&self) -> bool {
		self.sources.is_empty()
	}

	/// Drops iOS sources when the host cannot enumerate iOS targets.
	pub fn for_host(&self, ios_host: bool) -> Self {
		Self {
			sources: self
				.sources
				.iter()
				.filter(|s| ios_host || !s.requires_ios_host())
				.cloned()
				.collect(),
		}
	}

	/// Queries the sources for `phase` concurrently and merges their results.
	///
	/// A failing source contributes nothing; its error is logged and returned
	/// alongside the merged snapshot.
	pub async fn scan(&self, phase: ScanPhase) -> (Vec<DiscoveredDevice>, Vec<Error>) {
		let active: Vec<&Arc<dyn DiscoverySource>> = self
			.sources
			.iter()
			.filter(|s| phase == ScanPhase::Initial || s.rescan())
			.collect();

		let results = join_all(active.iter().map(|source| source.get_devices())).await;

		let mut snapshots = Vec::with_capacity(results.len());
		let mut errors = Vec::new();
		for (source, result) in active.iter().zip(results) {
			match result {
				Ok(devices) => {
					debug!(target = "devpool.discovery", source = source.name(), count = devices.len(), "source scanned");
					snapshots.push(devices);
				}
				Err(err) => {
					warn!(target = "devpool.discovery", source = source.name(), error = %err, "discovery source failed");
					errors.push(match err {
						err @ Error::Discovery { .. } => err,
						other => Error::discovery(source.name(), other),
					});
				}
			}
		}

		(merge_snapshots(snapshots), errors)
	}

	/// Fail-soft scan that only returns the merged snapshot.
	pub async fn discover(&self, phase: ScanPhase) -> Vec<DiscoveredDevice> {
		self.scan(phase).await.0
	}
}

/// Combines per-source snapshots into one list keyed by UDID.
///
/// The first sighting fixes the position; a later record for the same UDID
/// replaces the earlier one.
pub fn merge_snapshots(snapshots: impl IntoIterator<Item = Vec<DiscoveredDevice>>) -> Vec<DiscoveredDevice> {
	let mut merged: Vec<DiscoveredDevice> = Vec::new();
	let mut index: HashMap<String, usize> = HashMap::new();

	for device in snapshots.into_iter().flatten() {
		match index.get(&device.udid) {
			Some(&pos) => merged[pos] = device,
			None => {
				index.insert(device.udid.clone(), merged.len());
				merged.push(device);
			}
		}
	}
	merged
}

/// Reads a JSON array of devices from an absolute path on every scan.
#[derive(Clone, Debug)]
pub struct FileSource {
	name: String,
	path: PathBuf,
	ios: bool,
}

impl FileSource {
	pub fn new(path: impl AsRef<Path>) -> Result<Self> {
		let path = validate_device_config_path(path.as_ref())?;
		Ok(Self {
			name: format!("file:{}", path.display()),
			path,
			ios: false,
		})
	}

	/// Marks the file as listing iOS targets, so it is skipped on non-iOS hosts.
	pub fn with_ios(mut self, ios: bool) -> Self {
		self.ios = ios;
		self
	}

	pub fn path(&self) -> &Path {
		&self.path
	}
}

#[async_trait]
impl DiscoverySource for FileSource {
	fn name(&self) -> &str {
		&self.name
	}

	fn requires_ios_host(&self) -> bool {
		self.ios
	}

	async fn get_devices(&self) -> Result<Vec<DiscoveredDevice>> {
		let raw = tokio::fs::read_to_string(&self.path)
			.await
			.map_err(|e| Error::discovery(&self.name, e))?;
		serde_json::from_str(&raw).map_err(|e| Error::discovery(&self.name, e))
	}
}

#[cfg(test)]
mod tests {
	use std::io::Write;

	use super::*;
	use crate::device::Platform;

	struct Fixed {
		name: &'static str,
		devices: Vec<DiscoveredDevice>,
		rescan: bool,
		ios: bool,
	}

	#[async_trait]
	impl DiscoverySource for Fixed {
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
			Ok(self.devices.clone())
		}
	}

	struct Broken;

	#[async_trait]
	impl DiscoverySource for Broken {
		fn name(&self) -> &str {
			"broken"
		}

		async fn get_devices(&self) -> Result<Vec<DiscoveredDevice>> {
			Err(Error::discovery("broken", "adb exited with status 1"))
		}
	}

	fn fixed(name: &'static str, udids: &[&str]) -> Fixed {
		Fixed {
			name,
			devices: udids.iter().map(|u| DiscoveredDevice::new(*u, Platform::Android)).collect(),
			rescan: true,
			ios: false,
		}
	}

	#[test]
	fn merge_keeps_first_position_and_last_record() {
		let merged = merge_snapshots([
			vec![
				DiscoveredDevice::new("A", Platform::Android).with_state("offline"),
				DiscoveredDevice::new("B", Platform::Android),
			],
			vec![DiscoveredDevice::new("A", Platform::Android).with_state("device")],
		]);
		assert_eq!(merged.len(), 2);
		assert_eq!(merged[0].udid, "A");
		assert_eq!(merged[0].state, "device");
	}

	#[tokio::test]
	async fn failing_source_contributes_nothing() {
		let sources = DiscoverySources::new()
			.with_source(fixed("one", &["A1"]))
			.with_source(Broken)
			.with_source(fixed("two", &["A2"]));

		let (devices, errors) = sources.scan(ScanPhase::Rescan).await;
		let udids: Vec<_> = devices.iter().map(|d| d.udid.as_str()).collect();
		assert_eq!(udids, ["A1", "A2"]);
		assert_eq!(errors.len(), 1);
		assert!(errors[0].to_string().contains("broken"));
	}

	#[tokio::test]
	async fn rescan_skips_initial_only_sources() {
		let mut sims = fixed("sims", &["S1"]);
		sims.rescan = false;
		let sources = DiscoverySources::new().with_source(sims).with_source(fixed("adb", &["A1"]));

		assert_eq!(sources.discover(ScanPhase::Initial).await.len(), 2);
		assert_eq!(sources.discover(ScanPhase::Rescan).await.len(), 1);
	}

	#[test]
	fn host_filter_drops_ios_sources() {
		let mut ios = fixed("ios", &["R1"]);
		ios.ios = true;
		let sources = DiscoverySources::new().with_source(ios).with_source(fixed("adb", &["A1"]));

		assert_eq!(sources.for_host(false).len(), 1);
		assert_eq!(sources.for_host(true).len(), 2);
	}

	#[tokio::test]
	async fn file_source_reads_json_devices() {
		let mut file = tempfile::NamedTempFile::new().unwrap();
		write!(
			file,
			r#"[{{"udid":"A1","platform":"android","name":"Pixel 7","sdk":"14","state":"device"}},
			   {{"udid":"R1","platform":"iOS","realDevice":true}}]"#
		)
		.unwrap();

		let source = FileSource::new(file.path()).unwrap();
		let devices = source.get_devices().await.unwrap();
		assert_eq!(devices.len(), 2);
		assert_eq!(devices[0].name, "Pixel 7");
		assert!(devices[1].real_device);
	}

	#[tokio::test]
	async fn file_source_reports_missing_file() {
		let dir = tempfile::tempdir().unwrap();
		let source = FileSource::new(dir.path().join("absent.json")).unwrap();
		let err = source.get_devices().await.unwrap_err();
		assert!(matches!(err, Error::Discovery { .. }));
	}

	#[test]
	fn file_source_rejects_relative_path() {
		let err = FileSource::new("devices.json").unwrap_err();
		assert!(err.is_config_error());
	}
}
