//! Authoritative in-memory device registry.
//!
//! Devices are keyed by UDID and remember the order in which they were first
//! inserted, so "first match" queries are stable. Every operation takes the
//! pool lock exactly once; reads share a read lock and mutations serialize on
//! the write lock.

use std::collections::{BTreeMap, HashMap};
use std::sync::Arc;

use parking_lot::{RwLock, RwLockWriteGuard};

use crate::device::Device;

#[derive(Debug)]
struct Slot {
	seq: u64,
	device: Device,
}

/// Lock-protected pool contents.
#[derive(Debug, Default)]
pub(crate) struct PoolState {
	next_seq: u64,
	/// Insertion sequence -> UDID.
	order: BTreeMap<u64, String>,
	slots: HashMap<String, Slot>,
}

impl PoolState {
	pub(crate) fn get(&self, udid: &str) -> Option<&Device> {
		self.slots.get(udid).map(|slot| &slot.device)
	}

	pub(crate) fn get_mut(&mut self, udid: &str) -> Option<&mut Device> {
		self.slots.get_mut(udid).map(|slot| &mut slot.device)
	}

	pub(crate) fn iter(&self) -> impl Iterator<Item = &Device> {
		self.order.values().filter_map(|udid| self.get(udid))
	}

	pub(crate) fn find<P>(&self, mut predicate: P) -> Option<&Device>
	where
		P: FnMut(&Device) -> bool,
	{
		self.iter().find(|device| predicate(device))
	}

	pub(crate) fn len(&self) -> usize {
		self.slots.len()
	}

	/// Inserts a new device, or refreshes the non-lease fields of a known one.
	pub(crate) fn upsert(&mut self, device: Device) {
		if let Some(existing) = self.get_mut(&device.udid) {
			existing.platform = device.platform;
			existing.name = device.name;
			existing.state = device.state;
			existing.sdk = device.sdk;
			existing.real_device = device.real_device;
			return;
		}
		self.insert_new(device);
	}

	/// Inserts `device` as given, replacing any record with the same UDID.
	///
	/// A replaced record keeps its position.
	pub(crate) fn put(&mut self, device: Device) {
		match self.slots.get_mut(&device.udid) {
			Some(slot) => slot.device = device,
			None => self.insert_new(device),
		}
	}

	fn insert_new(&mut self, device: Device) {
		let seq = self.next_seq;
		self.next_seq += 1;
		self.order.insert(seq, device.udid.clone());
		self.slots.insert(device.udid.clone(), Slot { seq, device });
	}

	pub(crate) fn remove_where<P>(&mut self, mut predicate: P) -> Vec<Device>
	where
		P: FnMut(&Device) -> bool,
	{
		let doomed: Vec<String> = self
			.iter()
			.filter(|device| predicate(device))
			.map(|device| device.udid.clone())
			.collect();

		let mut removed = Vec::with_capacity(doomed.len());
		for udid in doomed {
			if let Some(slot) = self.slots.remove(&udid) {
				self.order.remove(&slot.seq);
				removed.push(slot.device);
			}
		}
		removed
	}

	pub(crate) fn clear(&mut self) {
		self.order.clear();
		self.slots.clear();
	}
}

/// Shared handle to the device registry.
///
/// Cloning is cheap; all clones observe the same devices.
#[derive(Clone, Default)]
pub struct DevicePool {
	state: Arc<RwLock<PoolState>>,
}

impl std::fmt::Debug for DevicePool {
	fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
		f.debug_struct("DevicePool").field("devices", &self.len()).finish()
	}
}

impl DevicePool {
	pub fn new() -> Self {
		Self::default()
	}

	/// Creates a pool holding exactly `devices`, in order.
	pub fn with_devices(devices: impl IntoIterator<Item = Device>) -> Self {
		let pool = Self::new();
		pool.replace_all(devices);
		pool
	}

	pub fn get(&self, udid: &str) -> Option<Device> {
		self.state.read().get(udid).cloned()
	}

	/// First device matching `predicate`, in insertion order.
	pub fn find<P>(&self, predicate: P) -> Option<Device>
	where
		P: FnMut(&Device) -> bool,
	{
		self.state.read().find(predicate).cloned()
	}

	pub fn find_all<P>(&self, mut predicate: P) -> Vec<Device>
	where
		P: FnMut(&Device) -> bool,
	{
		self.state
			.read()
			.iter()
			.filter(|device| predicate(device))
			.cloned()
			.collect()
	}

	/// Inserts `device` if its UDID is unknown.
	///
	/// For a known UDID the platform, name, state, sdk, and real-device flag
	/// are replaced while `busy` and `session_id` are kept.
	pub fn upsert(&self, device: Device) {
		self.state.write().upsert(device);
	}

	/// Removes every device matching `predicate` and returns them.
	pub fn remove_where<P>(&self, predicate: P) -> Vec<Device>
	where
		P: FnMut(&Device) -> bool,
	{
		self.state.write().remove_where(predicate)
	}

	/// Replaces the whole pool. Duplicate UDIDs collapse to the last record.
	pub fn replace_all(&self, devices: impl IntoIterator<Item = Device>) {
		let mut state = self.state.write();
		state.clear();
		for device in devices {
			state.put(device);
		}
	}

	/// Snapshot of every device in insertion order.
	pub fn list(&self) -> Vec<Device> {
		self.state.read().iter().cloned().collect()
	}

	pub fn len(&self) -> usize {
		self.state.read().len()
	}

	pub fn is_empty(&self) -> bool {
		self.len() == 0
	}

	/// Applies `update` to the device with `udid` and returns the result.
	pub(crate) fn update<F>(&self, udid: &str, update: F) -> Option<Device>
	where
		F: FnOnce(&mut Device),
	{
		let mut state = self.state.write();
		let device = state.get_mut(udid)?;
		update(device);
		Some(device.clone())
	}

	/// Like [`update`](Self::update), but only when `guard` accepts the
	/// current record. The check and the change share one write lock.
	pub(crate) fn update_if<G, F>(&self, udid: &str, guard: G, update: F) -> Option<Device>
	where
		G: FnOnce(&Device) -> bool,
		F: FnOnce(&mut Device),
	{
		let mut state = self.state.write();
		let device = state.get_mut(udid)?;
		if !guard(device) {
			return None;
		}
		update(device);
		Some(device.clone())
	}

	pub(crate) fn write(&self) -> RwLockWriteGuard<'_, PoolState> {
		self.state.write()
	}
}
