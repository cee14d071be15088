//! Keeps the active engine snapshot fresh.
//!
//! The [`Reloader`] owns the single swappable reference to the active
//! [`Engine`]. Readers load it once per request. A reload builds a whole new
//! snapshot off to the side and publishes it with one atomic store, so a
//! failed reload leaves the previous snapshot serving.

mod debounce;
pub mod tasks;
mod watcher;

use std::sync::Arc;
use std::time::Instant;

use arc_swap::ArcSwap;
use tokio::sync::Mutex;

use crate::allow::AllowList;
use crate::engine::{Backend, Compiled, Engine, Request};
use crate::err::Error;
use crate::provider::Provider;
use crate::schema::{SchemaSource, discover};

pub struct Reloader<B: Backend> {
	active: ArcSwap<Engine<B>>,
	source: Arc<dyn SchemaSource>,
	provider: Arc<dyn Provider>,
	backend: Arc<B>,
	/// Serialises rebuilds
	lock: Mutex<()>,
}

impl<B: Backend> Reloader<B> {
	/// Builds and publishes the first snapshot
	pub async fn new(
		source: Arc<dyn SchemaSource>,
		provider: Arc<dyn Provider>,
		backend: Arc<B>,
	) -> Result<Self, Error> {
		let engine = build(source.as_ref(), provider.as_ref(), &backend, 0).await?;
		info!(
			"Started with {} tables and {} allow-listed queries",
			engine.schema().tables.len(),
			engine.cache().map_or(0, |c| c.len())
		);
		Ok(Self {
			active: ArcSwap::from_pointee(engine),
			source,
			provider,
			backend,
			lock: Mutex::new(()),
		})
	}

	/// The active snapshot. Hold on to it for the duration of one operation.
	pub fn engine(&self) -> Arc<Engine<B>> {
		self.active.load_full()
	}

	/// Compiles a request against the active snapshot
	pub fn compile(&self, req: &Request) -> Result<Compiled<B>, Error> {
		self.engine().compile(req)
	}

	pub fn provider(&self) -> &Arc<dyn Provider> {
		&self.provider
	}

	/// Rebuilds the schema model, the role table and the statement cache,
	/// then publishes the new snapshot.
	///
	/// On failure the active snapshot is left untouched.
	pub async fn reload(&self) -> Result<(), Error> {
		let _guard = self.lock.lock().await;
		let start = Instant::now();
		let generation = self.active.load().generation() + 1;
		let engine =
			build(self.source.as_ref(), self.provider.as_ref(), &self.backend, generation).await?;
		let hash = engine.schema().hash();
		self.active.store(Arc::new(engine));
		info!("Published engine snapshot {generation} (schema hash {hash:016x}) in {:?}", start.elapsed());
		Ok(())
	}

	/// Discovers the schema once and reloads when it has drifted from the
	/// active snapshot. Returns whether a reload happened.
	pub async fn check_schema(&self) -> Result<bool, Error> {
		let current = self.engine();
		let schema = discover(self.source.as_ref(), current.blocklist()).await?;
		if schema.hash() == current.schema().hash() {
			trace!("Schema unchanged (hash {:016x})", schema.hash());
			return Ok(false);
		}
		info!(
			"Schema changed (hash {:016x} -> {:016x}), reloading",
			current.schema().hash(),
			schema.hash()
		);
		self.reload().await?;
		Ok(true)
	}
}

async fn build<B: Backend>(
	source: &dyn SchemaSource,
	provider: &dyn Provider,
	backend: &Arc<B>,
	generation: u64,
) -> Result<Engine<B>, Error> {
	let config = provider.config().await?;
	let blocklist = config.blocklist()?;
	let schema = discover(source, &blocklist).await?;
	let allow = match config.disable_allow_list {
		true => AllowList::default(),
		false => AllowList::new(provider.allow_list().await?),
	};
	Engine::new(Arc::new(schema), &config, &allow, backend.clone(), generation)
}
