use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Mutex;

use async_trait::async_trait;

use super::source::{ColumnRow, DatabaseKind, FunctionRow, IndexRow, SchemaSource, ServerInfo};
use crate::err::Error;

#[derive(Clone, Debug, Default)]
struct Rows {
	info: ServerInfo,
	columns: Vec<ColumnRow>,
	functions: Vec<FunctionRow>,
	indices: Vec<IndexRow>,
	failure: Option<String>,
}

/// A schema source serving rows held in memory.
///
/// The rows can be replaced at any time, which makes the next discovery
/// observe a different database.
#[derive(Debug, Default)]
pub struct MemorySource {
	kind: DatabaseKind,
	rows: Mutex<Rows>,
	calls: AtomicUsize,
}

impl MemorySource {
	pub fn new(kind: DatabaseKind, info: ServerInfo) -> Self {
		Self {
			kind,
			rows: Mutex::new(Rows {
				info,
				..Default::default()
			}),
			calls: AtomicUsize::new(0),
		}
	}

	pub fn with_columns(self, columns: Vec<ColumnRow>) -> Self {
		self.set_columns(columns);
		self
	}

	pub fn with_functions(self, functions: Vec<FunctionRow>) -> Self {
		self.lock().functions = functions;
		self
	}

	pub fn with_indices(self, indices: Vec<IndexRow>) -> Self {
		self.lock().indices = indices;
		self
	}

	/// Replaces the column rows served by this source
	pub fn set_columns(&self, columns: Vec<ColumnRow>) {
		self.lock().columns = columns;
	}

	/// Makes the column query fail with the given message, or succeed again
	pub fn set_failure(&self, message: Option<&str>) {
		self.lock().failure = message.map(str::to_owned);
	}

	/// The number of completed discovery round trips
	pub fn discoveries(&self) -> usize {
		self.calls.load(Ordering::Acquire)
	}

	fn lock(&self) -> std::sync::MutexGuard<'_, Rows> {
		self.rows.lock().unwrap_or_else(|e| e.into_inner())
	}
}

#[async_trait]
impl SchemaSource for MemorySource {
	fn kind(&self) -> DatabaseKind {
		self.kind
	}

	async fn server_info(&self) -> Result<ServerInfo, Error> {
		self.calls.fetch_add(1, Ordering::AcqRel);
		Ok(self.lock().info.clone())
	}

	async fn columns(&self) -> Result<Vec<ColumnRow>, Error> {
		let rows = self.lock();
		match &rows.failure {
			Some(message) => Err(Error::DiscoveryFailed(message.clone())),
			None => Ok(rows.columns.clone()),
		}
	}

	async fn functions(&self) -> Result<Vec<FunctionRow>, Error> {
		Ok(self.lock().functions.clone())
	}

	async fn indices(&self) -> Result<Vec<IndexRow>, Error> {
		Ok(self.lock().indices.clone())
	}
}

#[cfg(test)]
mod tests {
	use super::*;
	use crate::schema::tests::{col, info};
	use crate::schema::{discover, Blocklist};

	#[test_log::test(tokio::test)]
	async fn discovers_from_memory() {
		let source = MemorySource::new(DatabaseKind::Postgres, info())
			.with_columns(vec![col("users", "id"), col("posts", "id")]);
		let model = discover(&source, &Blocklist::default()).await.unwrap();
		assert_eq!(model.tables.len(), 2);
		assert_eq!(model.name, "app");
		assert_eq!(source.discoveries(), 1);
	}

	#[test_log::test(tokio::test)]
	async fn failed_query_fails_discovery() {
		let source = MemorySource::new(DatabaseKind::Postgres, info())
			.with_columns(vec![col("users", "id")]);
		source.set_failure(Some("connection reset"));
		let err = discover(&source, &Blocklist::default()).await.unwrap_err();
		assert!(matches!(err, Error::DiscoveryFailed(m) if m == "connection reset"));
		source.set_failure(None);
		assert!(discover(&source, &Blocklist::default()).await.is_ok());
	}

	#[test_log::test(tokio::test)]
	async fn unchanged_database_hashes_equal() {
		let source = MemorySource::new(DatabaseKind::Postgres, info())
			.with_columns(vec![col("users", "id"), col("users", "email")]);
		let a = discover(&source, &Blocklist::default()).await.unwrap();
		let b = discover(&source, &Blocklist::default()).await.unwrap();
		assert_eq!(a.hash(), b.hash());
		source.set_columns(vec![col("users", "id")]);
		let c = discover(&source, &Blocklist::default()).await.unwrap();
		assert_ne!(a.hash(), c.hash());
	}
}
