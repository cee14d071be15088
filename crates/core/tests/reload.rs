//! Rebuilding and publishing engine snapshots

#![allow(clippy::unwrap_used)]

mod common;

use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};
use std::time::Duration;

use quarry_core::conf::Config;
use quarry_core::provider::{FsProvider, MemoryProvider};
use quarry_core::reload::tasks;
use quarry_core::schema::ColumnRow;
use quarry_core::{EngineOptions, Error, Reloader, Request};
use tokio::task::JoinSet;
use tokio_util::sync::CancellationToken;

use common::*;

fn wider_users() -> Vec<ColumnRow> {
	let mut columns = users();
	columns.push(column("users", "created_at"));
	columns
}

#[test_log::test(tokio::test)]
async fn unchanged_schema_does_not_reload() {
	let source = source(users());
	let provider = Arc::new(MemoryProvider::new(Config::default(), vec![]));
	let reloader = reloader(source.clone(), provider, Arc::default()).await;
	let before = reloader.engine();
	assert!(!reloader.check_schema().await.unwrap());
	assert!(!reloader.check_schema().await.unwrap());
	let after = reloader.engine();
	assert!(Arc::ptr_eq(&before, &after));
	assert_eq!(after.generation(), 0);
	assert_eq!(source.discoveries(), 3);

	source.set_columns(wider_users());
	assert!(reloader.check_schema().await.unwrap());
	let after = reloader.engine();
	assert_eq!(after.generation(), 1);
	assert_ne!(after.schema().hash(), before.schema().hash());
	assert!(after.schema().column("public", "users", "created_at").is_ok());
	// The previous snapshot is unaffected
	assert!(before.schema().column("public", "users", "created_at").is_err());
}

#[test_log::test(tokio::test)]
async fn failed_reload_keeps_the_active_snapshot() {
	let source = source(users());
	let provider = Arc::new(MemoryProvider::new(production(), vec![record("users", USERS)]));
	let reloader = reloader(source.clone(), provider.clone(), Arc::default()).await;
	let before = reloader.engine();

	provider.set_failure(Some("unexpected key"));
	let err = reloader.reload().await.unwrap_err();
	assert!(matches!(err, Error::Config(ref m) if m == "unexpected key"));
	assert!(!err.is_request_error());
	assert!(Arc::ptr_eq(&before, &reloader.engine()));
	provider.set_failure(None);

	source.set_columns(wider_users());
	source.set_failure(Some("connection reset"));
	assert!(matches!(reloader.check_schema().await, Err(Error::DiscoveryFailed(_))));
	assert!(matches!(reloader.reload().await, Err(Error::DiscoveryFailed(_))));
	assert!(Arc::ptr_eq(&before, &reloader.engine()));
	reloader.compile(&Request::new("users", USERS, "user")).unwrap();

	source.set_failure(None);
	assert!(reloader.check_schema().await.unwrap());
	assert_eq!(reloader.engine().generation(), 1);
}

#[test_log::test(tokio::test)]
async fn reload_picks_up_the_allow_list() {
	let provider = Arc::new(MemoryProvider::new(production(), vec![record("users", USERS)]));
	let reloader = reloader(source(users()), provider.clone(), Arc::default()).await;
	let accounts = "query accounts { users { email } }";
	let old = reloader.engine();
	assert!(matches!(
		reloader.compile(&Request::new("accounts", accounts, "user")),
		Err(Error::NotFound)
	));
	provider.set_records(vec![record("accounts", accounts)]);
	reloader.reload().await.unwrap();
	reloader.compile(&Request::new("accounts", accounts, "user")).unwrap();
	assert!(matches!(
		reloader.compile(&Request::new("users", USERS, "user")),
		Err(Error::NotFound)
	));
	// A snapshot held across the reload keeps serving its own allow-list
	old.compile(&Request::new("users", USERS, "user")).unwrap();
}

#[test_log::test(tokio::test(flavor = "multi_thread"))]
async fn slow_compile_does_not_delay_publication() {
	let backend = Arc::new(CountingBackend::slow(Duration::from_millis(500)));
	let source = source(users());
	let provider = Arc::new(MemoryProvider::new(production(), vec![record("users", USERS)]));
	let reloader = reloader(source.clone(), provider, backend.clone()).await;
	let before = reloader.engine().schema().hash();
	let compiling = {
		let reloader = reloader.clone();
		tokio::task::spawn_blocking(move || reloader.compile(&Request::new("users", USERS, "user")))
	};
	while backend.count() == 0 {
		tokio::time::sleep(Duration::from_millis(5)).await;
	}
	source.set_columns(wider_users());
	reloader.reload().await.unwrap();
	assert!(!compiling.is_finished());
	assert_eq!(reloader.engine().generation(), 1);
	// The request finishes against the snapshot it started with
	let compiled = compiling.await.unwrap().unwrap();
	assert_eq!(compiled.statement.plan.schema_hash, before);
	assert_ne!(reloader.engine().schema().hash(), before);
}

#[test_log::test(tokio::test(flavor = "multi_thread", worker_threads = 4))]
async fn readers_never_observe_a_mixed_snapshot() {
	const READERS: usize = 4;
	const RELOADS: usize = 100;
	let source = source(users());
	let provider = Arc::new(MemoryProvider::new(production(), vec![record("users", USERS)]));
	let reloader = reloader(source.clone(), provider, Arc::default()).await;
	let done = Arc::new(AtomicBool::new(false));
	let mut readers = JoinSet::new();
	for _ in 0..READERS {
		let reloader = reloader.clone();
		let done = done.clone();
		readers.spawn(async move {
			let mut last = 0;
			let mut reads = 0usize;
			loop {
				let engine = reloader.engine();
				assert!(engine.generation() >= last);
				last = engine.generation();
				let compiled = engine.compile(&Request::new("users", USERS, "user")).unwrap();
				assert_eq!(compiled.statement.plan.schema_hash, engine.schema().hash());
				reads += 1;
				if done.load(Ordering::Acquire) {
					break reads;
				}
				tokio::task::yield_now().await;
			}
		});
	}
	for i in 0..RELOADS {
		source.set_columns(match i % 2 {
			0 => wider_users(),
			_ => users(),
		});
		reloader.reload().await.unwrap();
	}
	done.store(true, Ordering::Release);
	while let Some(reads) = readers.join_next().await {
		assert!(reads.unwrap() > 0);
	}
	assert_eq!(reloader.engine().generation(), RELOADS as u64);
}

#[test_log::test(tokio::test(start_paused = true))]
async fn poller_reloads_on_drift() {
	let source = source(users());
	let provider = Arc::new(MemoryProvider::new(Config::default(), vec![]));
	let reloader = reloader(source.clone(), provider, Arc::default()).await;
	let canceller = CancellationToken::new();
	let opts = EngineOptions::default().with_watch(false);
	let tasks = tasks::init(reloader.clone(), canceller.clone(), &opts);
	assert_eq!(tasks.len(), 1);

	tokio::time::sleep(Duration::from_secs(25)).await;
	assert!(source.discoveries() >= 3);
	assert_eq!(reloader.engine().generation(), 0);

	source.set_columns(wider_users());
	tokio::time::sleep(Duration::from_secs(10)).await;
	assert_eq!(reloader.engine().generation(), 1);

	canceller.cancel();
	tasks.resolve().await.unwrap();
}

#[test_log::test(tokio::test)]
async fn restricted_mode_does_not_poll() {
	let provider = Arc::new(MemoryProvider::new(production(), vec![]));
	let reloader = reloader(source(users()), provider, Arc::default()).await;
	let opts = EngineOptions::default().with_watch(false);
	let tasks = tasks::init(reloader, CancellationToken::new(), &opts);
	assert!(tasks.is_empty());
}

#[test_log::test(tokio::test(flavor = "multi_thread"))]
async fn watcher_reloads_on_file_changes() {
	let dir = tempfile::tempdir().unwrap();
	std::fs::write(dir.path().join("quarry.toml"), "db_schema_poll_duration = -1\n").unwrap();
	std::fs::create_dir(dir.path().join("queries")).unwrap();
	let provider = Arc::new(FsProvider::new(dir.path()));
	let backend = Arc::new(CountingBackend::default());
	let reloader = Arc::new(Reloader::new(source(users()), provider, backend).await.unwrap());
	assert_eq!(reloader.engine().cache().unwrap().len(), 0);

	let canceller = CancellationToken::new();
	let opts = EngineOptions::default().with_reload_debounce(Duration::from_millis(200));
	let tasks = tasks::init(reloader.clone(), canceller.clone(), &opts);
	assert_eq!(tasks.len(), 1);

	std::fs::write(dir.path().join("queries").join("users.gql"), USERS).unwrap();
	let published = tokio::time::timeout(Duration::from_secs(10), async {
		while reloader.engine().generation() == 0 {
			tokio::time::sleep(Duration::from_millis(50)).await;
		}
	})
	.await;
	assert!(published.is_ok(), "no reload after the query file was written");
	let engine = reloader.engine();
	let cache = engine.cache().unwrap();
	assert!(cache.get("users", "user").is_some());
	assert!(cache.get("users", "anon").is_some());

	canceller.cancel();
	tasks.resolve().await.unwrap();
}
