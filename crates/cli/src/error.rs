use thiserror::Error;

use crate::output::{CommandError, ErrorCode};

pub type Result<T> = std::result::Result<T, CliError>;

#[derive(Debug, Error)]
pub enum CliError {
	#[error("no discovery source configured; pass --devices or set DEVICE_CONFIG_PATH")]
	NoSources,

	#[error(transparent)]
	Pool(#[from] devpool::Error),
}

impl CliError {
	/// Convert this error to a CommandError for structured output
	pub fn to_command_error(&self) -> CommandError {
		let (code, details) = match self {
			CliError::NoSources => (ErrorCode::InvalidConfig, None),
			CliError::Pool(err) => match err {
				devpool::Error::NoDeviceFound { filter } => (ErrorCode::NoDeviceFound, serde_json::to_value(filter).ok()),
				devpool::Error::ConfigPathNotAbsolute { path } => {
					(ErrorCode::InvalidConfig, Some(serde_json::json!({ "path": path })))
				}
				devpool::Error::InvalidConfig(_) | devpool::Error::UnknownPlatform(_) => (ErrorCode::InvalidConfig, None),
				devpool::Error::Discovery { source_name, .. } => {
					(ErrorCode::IoError, Some(serde_json::json!({ "source": source_name })))
				}
				devpool::Error::Io(_) => (ErrorCode::IoError, None),
				devpool::Error::Json(_) => (ErrorCode::InternalError, None),
			},
		};

		CommandError {
			code,
			message: self.to_string(),
			details,
		}
	}
}
