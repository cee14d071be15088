use std::io::Error as IoError;

use quarry_core::err::Error as CoreError;
use serde_json::Error as JsonError;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum Error {
	#[error("The database connection string '{0}' is not supported")]
	Unsupported(String),

	#[error("The logging filter is invalid: {0}")]
	LogFilter(String),

	#[error("{0}")]
	Core(#[from] CoreError),

	#[error("There was a problem with IO: {0}")]
	Io(#[from] IoError),

	#[error("There was a problem with JSON: {0}")]
	Json(#[from] JsonError),
}
