//! The background triggers of a [`Reloader`].

use std::future::Future;
use std::pin::Pin;
use std::sync::Arc;
use std::time::Duration;

use futures::StreamExt;
use tokio::spawn;
use tokio_stream::wrappers::IntervalStream;
use tokio_util::sync::CancellationToken;

use super::Reloader;
use super::debounce::debounce;
use super::watcher::FsWatcher;
use crate::engine::Backend;
use crate::err::Error;
use crate::options::EngineOptions;

type Task = Pin<Box<dyn Future<Output = Result<(), tokio::task::JoinError>> + Send + 'static>>;

/// Handles to the running background tasks
pub struct Tasks(Vec<Task>);

impl Tasks {
	/// The number of running tasks
	pub fn len(&self) -> usize {
		self.0.len()
	}

	pub fn is_empty(&self) -> bool {
		self.0.is_empty()
	}

	/// Waits for every task to exit
	pub async fn resolve(self) -> Result<(), Error> {
		for task in self.0.into_iter() {
			let _ = task.await;
		}
		Ok(())
	}
}

/// Starts the schema poller and the filesystem watcher.
///
/// The poller runs when the active configuration has a poll interval. The
/// watcher runs when enabled in the options and the provider has a
/// directory to watch. Both exit when `canceller` is cancelled.
pub fn init<B: Backend>(
	reloader: Arc<Reloader<B>>,
	canceller: CancellationToken,
	opts: &EngineOptions,
) -> Tasks {
	let mut tasks = Vec::with_capacity(2);
	match reloader.engine().config().poll_interval() {
		Some(interval) => {
			tasks.push(spawn_task_schema_poll(reloader.clone(), canceller.clone(), interval))
		}
		None => debug!("Schema polling is disabled"),
	}
	if opts.watch {
		if let Some(task) = spawn_task_config_watch(reloader, canceller, opts) {
			tasks.push(task);
		}
	}
	Tasks(tasks)
}

fn spawn_task_schema_poll<B: Backend>(
	reloader: Arc<Reloader<B>>,
	canceller: CancellationToken,
	interval: Duration,
) -> Task {
	Box::pin(spawn(async move {
		// Log the interval frequency
		trace!("Checking the database schema for changes every {interval:?}");
		// Create a new time-based interval ticket
		let mut ticker = interval_ticker(interval).await;
		// Loop continuously until the task is cancelled
		loop {
			tokio::select! {
				biased;
				// Check if this has shutdown
				_ = canceller.cancelled() => break,
				// Receive a notification on the channel
				Some(_) = ticker.next() => {
					if let Err(e) = reloader.check_schema().await {
						error!("Error checking the database schema: {e}");
					}
				}
			}
		}
		trace!("Background task exited: Checking the database schema for changes");
	}))
}

fn spawn_task_config_watch<B: Backend>(
	reloader: Arc<Reloader<B>>,
	canceller: CancellationToken,
	opts: &EngineOptions,
) -> Option<Task> {
	let root = reloader.provider().watch_root()?.to_path_buf();
	let (watcher, events) = match FsWatcher::new(&root) {
		Ok(v) => v,
		Err(e) => {
			warn!("Configuration changes will not be picked up: {e}");
			return None;
		}
	};
	let window = opts.reload_debounce;
	Some(Box::pin(spawn(async move {
		trace!("Watching {:?} for configuration changes", watcher.paths);
		debounce(events, window, canceller, move || {
			let reloader = reloader.clone();
			async move {
				info!("Configuration changed, reloading");
				if let Err(e) = reloader.reload().await {
					error!("Error reloading the engine: {e}");
				}
			}
		})
		.await;
		drop(watcher);
		trace!("Background task exited: Watching for configuration changes");
	})))
}

async fn interval_ticker(interval: Duration) -> IntervalStream {
	use tokio::{time, time::MissedTickBehavior};
	// Create a new interval timer
	let mut interval = time::interval(interval);
	// Don't bombard the database if we miss some ticks
	interval.set_missed_tick_behavior(MissedTickBehavior::Delay);
	interval.tick().await;
	IntervalStream::new(interval)
}
