use std::future::Future;
use std::time::Duration;

use tokio::sync::mpsc::Receiver;
use tokio::time::{Instant, sleep};
use tokio_util::sync::CancellationToken;

/// Runs `action` once the event channel has been quiet for `window`.
///
/// Every event restarts the window, so a burst of events collapses into a
/// single call. Returns when the channel closes or the task is cancelled.
pub(super) async fn debounce<T, F, Fut>(
	mut events: Receiver<T>,
	window: Duration,
	canceller: CancellationToken,
	mut action: F,
) where
	F: FnMut() -> Fut,
	Fut: Future<Output = ()>,
{
	let timer = sleep(window);
	tokio::pin!(timer);
	let mut armed = false;
	loop {
		tokio::select! {
			biased;
			// Check if this has shutdown
			_ = canceller.cancelled() => break,
			// Restart the window on every event
			event = events.recv() => match event {
				Some(_) => {
					timer.as_mut().reset(Instant::now() + window);
					armed = true;
				}
				None => break,
			},
			// The window elapsed without further events
			() = &mut timer, if armed => {
				armed = false;
				action().await;
			}
		}
	}
}
