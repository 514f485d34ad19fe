//! Device pool for mobile test farms.
//!
//! Tracks android and iOS test devices, keeps the pool in step with periodic
//! discovery scans, and hands out exclusive session-bound leases.
//!
//! - **Device pool**: [`DevicePool`], the shared registry keyed by UDID
//! - **Discovery**: [`DiscoverySource`] implementations merged by [`DiscoverySources`]
//! - **Reconciliation**: [`reconcile`], the lease-preserving merge of a scan
//! - **Scheduling**: [`DiscoveryScheduler`], the fixed-interval rescan loop
//! - **Allocation**: free-device lookup, block/unblock, and session binding on [`DevicePool`]
//! - **Lifecycle**: [`PoolLifecycle`], initialize-once construction from [`PoolConfig`]
//!
//! ```text
//! DiscoverySource(s) ─▶ DiscoveryScheduler ─▶ reconcile ─▶ DevicePool ◀─ allocation calls
//! ```

pub mod allocation;
pub mod config;
pub mod device;
pub mod discovery;
pub mod error;
pub mod lifecycle;
pub mod pool;
pub mod reconcile;
pub mod scheduler;

pub use allocation::{DeviceFilter, FreeDeviceOptions};
pub use async_trait::async_trait;
pub use config::{PoolConfig, validate_device_config_path};
pub use device::{Device, DiscoveredDevice, Platform};
pub use discovery::{DiscoverySource, DiscoverySources, FileSource, ScanPhase, merge_snapshots};
pub use error::{Error, Result};
pub use lifecycle::{PoolLifecycle, filter_allow_listed};
pub use pool::DevicePool;
pub use reconcile::{ReconcileSummary, reconcile};
pub use scheduler::{CycleReport, DiscoveryScheduler, MIN_RESCAN_INTERVAL, SchedulerHandle};
