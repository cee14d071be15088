//! The file configuration of an engine, read from `quarry.toml`.

use std::time::Duration;

use serde::{Deserialize, Serialize};

use crate::cnf::{SCHEMA_POLL_DEFAULT_SECS, SCHEMA_POLL_FALLBACK, SCHEMA_POLL_MIN_SECS};
use crate::err::Error;
use crate::iam::RoleConfig;
use crate::schema::Blocklist;

#[derive(Clone, Debug, Eq, PartialEq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct Config {
	/// Enforce the allow-list and cache compiled statements
	pub production: bool,
	/// Accept any query, even in production
	pub disable_allow_list: bool,
	/// Seconds between schema polls. Negative values disable polling.
	pub db_schema_poll_duration: i64,
	/// Whole-name patterns of tables, columns and functions to block
	pub blocklist: Vec<String>,
	pub roles: Vec<RoleConfig>,
	/// Block every table the anonymous role does not list
	pub default_block: bool,
}

impl Default for Config {
	fn default() -> Self {
		Self {
			production: false,
			disable_allow_list: false,
			db_schema_poll_duration: SCHEMA_POLL_DEFAULT_SECS,
			blocklist: Vec::new(),
			roles: Vec::new(),
			default_block: false,
		}
	}
}

impl Config {
	/// Parses a configuration document
	pub fn parse(text: &str) -> Result<Self, Error> {
		Ok(toml::from_str(text)?)
	}

	/// Whether only allow-listed queries may run
	pub fn restricted(&self) -> bool {
		self.production && !self.disable_allow_list
	}

	/// The schema poll interval, or `None` when polling is disabled.
	///
	/// Polling runs outside restricted mode only. Intervals below the
	/// minimum fall back to a safe default.
	pub fn poll_interval(&self) -> Option<Duration> {
		if self.restricted() {
			return None;
		}
		match self.db_schema_poll_duration {
			d if d < 0 => None,
			d if d < SCHEMA_POLL_MIN_SECS => Some(SCHEMA_POLL_FALLBACK),
			d => Some(Duration::from_secs(d as u64)),
		}
	}

	/// Compiles the blocklist patterns
	pub fn blocklist(&self) -> Result<Blocklist, Error> {
		Blocklist::new(self.blocklist.iter().cloned())
	}
}

#[cfg(test)]
mod tests {
	use super::*;

	#[test]
	fn empty_document_yields_defaults() {
		let config = Config::parse("").unwrap();
		assert_eq!(config, Config::default());
		assert_eq!(config.poll_interval(), Some(Duration::from_secs(10)));
	}

	#[test]
	fn parses_a_full_document() {
		let config = Config::parse(
			r#"
			production = true
			disable_allow_list = true
			db_schema_poll_duration = 30
			blocklist = ["password", "secret_.*"]
			default_block = true

			[[roles]]
			name = "admin"
			match = "id = 1"

			[[roles.tables]]
			name = "users"
			read_only = true
			"#,
		)
		.unwrap();
		assert!(!config.restricted());
		assert_eq!(config.poll_interval(), Some(Duration::from_secs(30)));
		assert_eq!(config.roles.len(), 1);
		assert_eq!(config.roles[0].tables[0].name, "users");
		assert!(config.blocklist().unwrap().is_blocked("secret_key"));
	}

	#[test]
	fn clamps_and_disables_polling() {
		let mut config = Config {
			db_schema_poll_duration: 2,
			..Default::default()
		};
		assert_eq!(config.poll_interval(), Some(SCHEMA_POLL_FALLBACK));
		config.db_schema_poll_duration = -1;
		assert_eq!(config.poll_interval(), None);
		config.db_schema_poll_duration = 60;
		config.production = true;
		assert_eq!(config.poll_interval(), None);
		config.disable_allow_list = true;
		assert_eq!(config.poll_interval(), Some(Duration::from_secs(60)));
	}

	#[test]
	fn rejects_unknown_fields() {
		assert!(matches!(Config::parse("prod = true"), Err(Error::Toml(_))));
	}
}
