use std::path::{Path, PathBuf};

use notify::{Event, EventKind, RecommendedWatcher, RecursiveMode, Watcher};
use tokio::sync::mpsc::{self, Receiver};

use crate::cnf::{WATCHED_DIRS, WATCHER_CHANNEL_SIZE};
use crate::err::Error;

/// A filesystem watcher feeding change notifications into a channel.
///
/// The channel closes when the watcher is dropped.
pub(super) struct FsWatcher {
	// Keeps the platform watcher alive
	_watcher: RecommendedWatcher,
	pub paths: Vec<PathBuf>,
}

impl FsWatcher {
	/// Watches the configuration root and its well-known sub-directories.
	/// Paths which cannot be watched are skipped. Fails only when nothing
	/// at all can be watched.
	pub fn new(root: &Path) -> Result<(Self, Receiver<()>), Error> {
		let (tx, rx) = mpsc::channel(*WATCHER_CHANNEL_SIZE);
		let mut watcher = notify::recommended_watcher(move |res: notify::Result<Event>| match res {
			Ok(event) if matches!(event.kind, EventKind::Access(_)) => {}
			Ok(event) => {
				trace!("Filesystem event {:?} on {:?}", event.kind, event.paths);
				// A full channel already holds a pending change
				let _ = tx.try_send(());
			}
			Err(e) => error!("Error watching the configuration directory: {e}"),
		})
		.map_err(|e| Error::Config(format!("unable to create a filesystem watcher: {e}")))?;
		let mut paths = Vec::new();
		let targets = std::iter::once((root.to_path_buf(), RecursiveMode::NonRecursive))
			.chain(WATCHED_DIRS.iter().map(|d| (root.join(d), RecursiveMode::Recursive)));
		for (path, mode) in targets {
			match watcher.watch(&path, mode) {
				Ok(()) => paths.push(path),
				Err(e) => debug!("Not watching {}: {e}", path.display()),
			}
		}
		if paths.is_empty() {
			return Err(Error::Config(format!("unable to watch {}", root.display())));
		}
		Ok((
			Self {
				_watcher: watcher,
				paths,
			},
			rx,
		))
	}
}
