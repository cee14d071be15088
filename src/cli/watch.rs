use std::sync::Arc;
use std::time::Duration;

use anyhow::bail;
use clap::Args;
use quarry_core::engine::{Backend, Metadata, Variables};
use quarry_core::iam::Role;
use quarry_core::reload::tasks;
use quarry_core::{EngineOptions, Reloader, SchemaModel};
use tokio_util::sync::CancellationToken;

use crate::dbs::DatabaseArguments;
use crate::err::Error;

#[derive(Args, Debug)]
pub struct WatchCommandArguments {
	#[command(flatten)]
	db: DatabaseArguments,
	#[arg(help = "How long the configuration directory must stay quiet before a reload")]
	#[arg(env = "QUARRY_RELOAD_DEBOUNCE", long = "debounce", value_parser = parse_millis)]
	debounce: Option<Duration>,
	#[arg(help = "Only poll the database, without watching the configuration directory")]
	#[arg(long = "no-watch", default_value_t = false)]
	no_watch: bool,
}

fn parse_millis(value: &str) -> Result<Duration, String> {
	value.trim().parse().map(Duration::from_millis).map_err(|e| format!("{e} (expected milliseconds)"))
}

impl WatchCommandArguments {
	fn options(&self) -> EngineOptions {
		let opts = EngineOptions::default().with_watch(!self.no_watch);
		match self.debounce {
			Some(debounce) => opts.with_reload_debounce(debounce),
			None => opts,
		}
	}
}

/// A backend for snapshots which are only inspected, never queried
#[derive(Debug, Default)]
pub struct Detached;

impl Backend for Detached {
	type Plan = ();

	fn compile(
		&self,
		_query: &str,
		_vars: &Variables,
		_role: &Role,
		_schema: &SchemaModel,
	) -> anyhow::Result<()> {
		bail!("no query compiler is attached")
	}

	fn generate(&self, _: &(), _: &SchemaModel, _: &mut String) -> anyhow::Result<Metadata> {
		Ok(Metadata::default())
	}
}

pub async fn init(args: WatchCommandArguments) -> Result<(), Error> {
	let opts = args.options();
	let source = args.db.connect().await?;
	let provider = Arc::new(args.db.provider());
	let reloader = Arc::new(Reloader::new(source, provider, Arc::new(Detached)).await?);
	let canceller = CancellationToken::new();
	let tasks = tasks::init(reloader.clone(), canceller.clone(), &opts);
	if tasks.is_empty() {
		warn!("Neither schema polling nor the configuration watcher is enabled");
	}
	let engine = reloader.engine();
	info!(
		"Watching {} (generation {}, schema hash {:016x}), press Ctrl-C to stop",
		args.db.config.display(),
		engine.generation(),
		engine.schema().hash()
	);
	drop(engine);
	tokio::signal::ctrl_c().await?;
	info!("Stopping the reload tasks");
	canceller.cancel();
	tasks.resolve().await?;
	info!("Stopped at generation {}", reloader.engine().generation());
	Ok(())
}
