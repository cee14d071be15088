//! Where an engine's configuration and allow-list come from.

mod fs;
mod mem;

use std::path::Path;

use async_trait::async_trait;

use crate::allow::AllowRecord;
use crate::conf::Config;
use crate::err::Error;

pub use self::fs::FsProvider;
pub use self::mem::MemoryProvider;

/// A source of configuration, read afresh on every reload
#[async_trait]
pub trait Provider: Send + Sync + 'static {
	/// Reads the current configuration
	async fn config(&self) -> Result<Config, Error>;

	/// Reads the allow-listed queries, in registration order
	async fn allow_list(&self) -> Result<Vec<AllowRecord>, Error>;

	/// The directory whose changes should trigger a reload, if any
	fn watch_root(&self) -> Option<&Path>;
}
