use std::io::Error as IoError;

use serde_json::Error as JsonError;
use thiserror::Error;
use toml::de::Error as TomlError;

/// An error originating from the quarry engine.
#[derive(Error, Debug)]
#[non_exhaustive]
pub enum Error {
	/// The requested role is not present in the role table
	#[error("The role '{0}' is not defined")]
	RoleNotDefined(String),

	/// The query is not registered, or does not match its registration
	#[error("The requested query was not found")]
	NotFound,

	/// A dynamic order variable is missing, is not a string, or names no variant
	#[error("Invalid value for variable '{name}': {reason}")]
	InvalidVariableValue {
		name: String,
		reason: String,
	},

	/// The request variables could not be parsed
	#[error("The request variables are not a valid JSON object: {0}")]
	InvalidVariables(String),

	/// A variable required by the compiled statement was not supplied
	#[error("Required variable not set: {0}")]
	MissingVariable(String),

	/// A schema discovery query failed
	#[error("Schema discovery failed: {0}")]
	DiscoveryFailed(String),

	/// The backend failed to compile the query or generate its statement
	#[error("Failed to compile the query: {0}")]
	CompileFailed(String),

	/// A table lookup failed
	#[error("The table '{schema}.{table}' was not found")]
	TableNotFound {
		schema: String,
		table: String,
	},

	/// A column lookup failed
	#[error("The column '{schema}.{table}.{column}' was not found")]
	ColumnNotFound {
		schema: String,
		table: String,
		column: String,
	},

	/// A blocklist entry is not a valid regular expression
	#[error("The blocklist entry '{pattern}' is invalid: {message}")]
	InvalidBlocklist {
		pattern: String,
		message: String,
	},

	/// The same role was defined more than once
	#[error("The role '{0}' is defined more than once")]
	DuplicateRole(String),

	/// The configuration is invalid
	#[error("Invalid configuration: {0}")]
	Config(String),

	/// There was an error reading from the filesystem
	#[error("I/O error: {0}")]
	Io(#[from] IoError),

	/// The configuration file could not be parsed
	#[error("Unable to parse the configuration file: {0}")]
	Toml(#[from] TomlError),
}

impl Error {
	/// Whether this error belongs to the request path, as opposed to the
	/// rebuild path of the engine
	pub fn is_request_error(&self) -> bool {
		matches!(
			self,
			Error::RoleNotDefined(_)
				| Error::NotFound
				| Error::InvalidVariableValue { .. }
				| Error::InvalidVariables(_)
				| Error::MissingVariable(_)
				| Error::CompileFailed(_)
		)
	}

	pub(crate) fn invalid_variable(name: &str, reason: impl Into<String>) -> Self {
		Error::InvalidVariableValue {
			name: name.to_owned(),
			reason: reason.into(),
		}
	}
}

impl From<JsonError> for Error {
	fn from(err: JsonError) -> Error {
		Error::InvalidVariables(err.to_string())
	}
}

#[cfg(any(feature = "postgres", feature = "mysql"))]
impl From<sqlx::Error> for Error {
	fn from(err: sqlx::Error) -> Error {
		Error::DiscoveryFailed(err.to_string())
	}
}
