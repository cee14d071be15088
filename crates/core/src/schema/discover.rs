use std::time::Instant;

use super::block::Blocklist;
use super::source::SchemaSource;
use super::SchemaModel;
use crate::err::Error;

/// Runs the discovery queries concurrently and builds a new model.
///
/// The first failing query fails the whole discovery and the remaining
/// queries are abandoned, so no partial model is ever produced.
pub async fn discover(source: &dyn SchemaSource, blocklist: &Blocklist) -> Result<SchemaModel, Error> {
	let start = Instant::now();
	let (info, columns, functions, indices) = futures::try_join!(
		source.server_info(),
		source.columns(),
		source.functions(),
		source.indices(),
	)?;
	trace!(
		"Fetched {} column rows, {} function rows and {} index rows in {:?}",
		columns.len(),
		functions.len(),
		indices.len(),
		start.elapsed()
	);
	let model = SchemaModel::new(source.kind(), info, columns, functions, indices, blocklist);
	debug!(
		"Discovered {} tables and {} functions in {}.{} (hash {:016x})",
		model.tables.len(),
		model.functions.len(),
		model.name,
		model.schema,
		model.hash()
	);
	Ok(model)
}
