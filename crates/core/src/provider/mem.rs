use std::path::{Path, PathBuf};
use std::sync::Mutex;

use async_trait::async_trait;

use super::Provider;
use crate::allow::AllowRecord;
use crate::conf::Config;
use crate::err::Error;

#[derive(Debug, Default)]
struct State {
	config: Config,
	records: Vec<AllowRecord>,
	failure: Option<String>,
}

/// A provider holding its configuration in memory
#[derive(Debug, Default)]
pub struct MemoryProvider {
	state: Mutex<State>,
	root: Option<PathBuf>,
}

impl MemoryProvider {
	pub fn new(config: Config, records: Vec<AllowRecord>) -> Self {
		Self {
			state: Mutex::new(State {
				config,
				records,
				failure: None,
			}),
			root: None,
		}
	}

	/// Reports a directory to watch, without reading from it
	pub fn with_watch_root(mut self, root: impl Into<PathBuf>) -> Self {
		self.root = Some(root.into());
		self
	}

	pub fn set_config(&self, config: Config) {
		self.lock().config = config;
	}

	pub fn set_records(&self, records: Vec<AllowRecord>) {
		self.lock().records = records;
	}

	/// Makes reading the configuration fail with the given message, or succeed again
	pub fn set_failure(&self, message: Option<&str>) {
		self.lock().failure = message.map(str::to_owned);
	}

	fn lock(&self) -> std::sync::MutexGuard<'_, State> {
		self.state.lock().unwrap_or_else(|e| e.into_inner())
	}
}

#[async_trait]
impl Provider for MemoryProvider {
	async fn config(&self) -> Result<Config, Error> {
		let state = self.lock();
		match &state.failure {
			Some(message) => Err(Error::Config(message.clone())),
			None => Ok(state.config.clone()),
		}
	}

	async fn allow_list(&self) -> Result<Vec<AllowRecord>, Error> {
		Ok(self.lock().records.clone())
	}

	fn watch_root(&self) -> Option<&Path> {
		self.root.as_deref()
	}
}
