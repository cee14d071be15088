use std::time::Duration;

use crate::cnf::RELOAD_DEBOUNCE_MS;

/// Runtime options of a [`Reloader`](crate::reload::Reloader)
#[derive(Clone, Copy, Debug)]
pub struct EngineOptions {
	/// How long the watched directories must stay quiet before a reload
	pub reload_debounce: Duration,
	/// Whether the filesystem watcher runs
	pub watch: bool,
}

impl Default for EngineOptions {
	fn default() -> Self {
		Self {
			reload_debounce: Duration::from_millis(*RELOAD_DEBOUNCE_MS),
			watch: true,
		}
	}
}

impl EngineOptions {
	pub fn with_reload_debounce(mut self, debounce: Duration) -> Self {
		self.reload_debounce = debounce;
		self
	}

	pub fn with_watch(mut self, watch: bool) -> Self {
		self.watch = watch;
		self
	}
}
