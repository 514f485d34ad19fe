use std::path::PathBuf;

use clap::{Parser, Subcommand};

use crate::output::OutputFormat;

#[derive(Parser, Debug)]
#[command(name = "devpool")]
#[command(about = "Device pool for mobile test farms - inspect and lease test devices")]
#[command(version)]
pub struct Cli {
	/// Increase verbosity (-v info, -vv debug)
	#[arg(short, long, global = true, action = clap::ArgAction::Count)]
	pub verbose: u8,

	/// Output format: json (default), ndjson, or text
	#[arg(short = 'f', long, global = true, value_enum, default_value = "json")]
	pub format: OutputFormat,

	/// Absolute path to a JSON device list used as the discovery source
	#[arg(long, global = true, value_name = "FILE", env = "DEVICE_CONFIG_PATH")]
	pub devices: Option<PathBuf>,

	/// Comma-separated allow-list of device UDIDs (disables rescanning)
	#[arg(long, global = true, value_name = "UDIDS", env = "UDIDS")]
	pub udids: Option<String>,

	#[command(subcommand)]
	pub command: Commands,
}

#[derive(Subcommand, Debug)]
pub enum Commands {
	/// List every device in the pool
	List,

	/// Lease one free device
	Allocate {
		/// Platform to allocate for (android or ios, any casing)
		#[arg(short, long)]
		platform: String,

		/// Only consider devices whose name contains this text
		#[arg(short, long)]
		simulator: Option<String>,

		/// Session id to bind the device to
		#[arg(long)]
		session: Option<String>,
	},

	/// Keep the pool in sync with discovery, printing it after every cycle
	Watch {
		/// Seconds between discovery cycles
		#[arg(short, long, default_value_t = 10)]
		interval: u64,

		/// Stop after this many cycles
		#[arg(short = 'n', long)]
		cycles: Option<u64>,
	},
}
