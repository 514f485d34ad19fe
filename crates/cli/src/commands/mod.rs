mod allocate;
mod list;
mod watch;

use std::time::Duration;

use devpool::config::parse_udids;
use devpool::{DiscoverySources, FileSource, PoolConfig, PoolLifecycle};
use serde::Serialize;

use crate::cli::{Cli, Commands};
use crate::error::{CliError, Result};
use crate::output::{OutputFormat, ResultBuilder, print_result};

pub async fn dispatch(cli: Cli, format: OutputFormat) -> Result<()> {
	match cli.command {
		Commands::List => {
			let lifecycle = build_lifecycle(&cli, None)?;
			let data = list::execute(&lifecycle).await;
			lifecycle.shutdown().await;
			emit("list", data, format);
		}
		Commands::Allocate {
			ref platform,
			ref simulator,
			ref session,
		} => {
			let lifecycle = build_lifecycle(&cli, None)?;
			let result = allocate::execute(&lifecycle, platform, simulator.as_deref(), session.as_deref()).await;
			lifecycle.shutdown().await;
			emit("allocate", result?, format);
		}
		Commands::Watch { interval, cycles } => {
			let lifecycle = build_lifecycle(&cli, Some(Duration::from_secs(interval.max(1))))?;
			watch::execute(&lifecycle, cycles, format).await;
			lifecycle.shutdown().await;
		}
	}
	Ok(())
}

/// Assembles the pool from CLI flags, falling back to the environment.
fn build_lifecycle(cli: &Cli, rescan_interval: Option<Duration>) -> Result<PoolLifecycle> {
	let mut config = PoolConfig::from_env()?;
	if let Some(raw) = &cli.udids {
		config.udids = parse_udids(raw);
	}
	if let Some(interval) = rescan_interval {
		config = config.with_rescan_interval(interval);
	}

	let path = cli
		.devices
		.clone()
		.or_else(|| config.device_config_path.clone())
		.ok_or(CliError::NoSources)?;
	config = config.with_device_config_path(&path)?;

	let sources = DiscoverySources::new().with_source(FileSource::new(&path)?);
	Ok(PoolLifecycle::new(config, sources))
}

pub(crate) fn emit<T: Serialize>(command: &str, data: T, format: OutputFormat) {
	let result = ResultBuilder::new(command).data(data).build();
	print_result(&result, format);
}
