#![allow(clippy::unwrap_used, dead_code)]

use std::sync::Arc;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::time::Duration;

use anyhow::bail;
use quarry_core::allow::AllowRecord;
use quarry_core::conf::Config;
use quarry_core::engine::{Backend, Metadata, Placeholder, Variables};
use quarry_core::iam::Role;
use quarry_core::provider::MemoryProvider;
use quarry_core::schema::{ColumnRow, DatabaseKind, MemorySource, ServerInfo};
use quarry_core::{Reloader, SchemaModel};

/// The plan of the counting backend: the role, the order value and the
/// schema hash the query was compiled against
#[derive(Debug, Clone)]
pub struct Plan {
	pub role: String,
	pub order: Option<String>,
	pub schema_hash: u64,
}

/// A backend which counts its compilations and can be slowed down
#[derive(Debug, Default)]
pub struct CountingBackend {
	pub compiles: AtomicUsize,
	pub delay: Duration,
}

impl CountingBackend {
	pub fn slow(delay: Duration) -> Self {
		Self {
			compiles: AtomicUsize::new(0),
			delay,
		}
	}

	pub fn count(&self) -> usize {
		self.compiles.load(Ordering::SeqCst)
	}
}

impl Backend for CountingBackend {
	type Plan = Plan;

	fn compile(
		&self,
		query: &str,
		vars: &Variables,
		role: &Role,
		schema: &SchemaModel,
	) -> anyhow::Result<Plan> {
		self.compiles.fetch_add(1, Ordering::SeqCst);
		if !self.delay.is_zero() {
			std::thread::sleep(self.delay);
		}
		if query.contains("broken") {
			bail!("unexpected token");
		}
		Ok(Plan {
			role: role.name.clone(),
			order: vars.get("sort").and_then(|v| v.as_str()).map(str::to_owned),
			schema_hash: schema.hash(),
		})
	}

	fn generate(&self, plan: &Plan, schema: &SchemaModel, out: &mut String) -> anyhow::Result<Metadata> {
		let table = schema.tables.first().map(|t| t.name.as_str()).unwrap_or("dual");
		out.push_str(&format!("SELECT * FROM {table} /* {} */", plan.role));
		if let Some(order) = &plan.order {
			out.push_str(&format!(" ORDER BY id {order}"));
		}
		Ok(Metadata {
			params: vec![Placeholder {
				name: "limit".into(),
				kind: "integer".into(),
			}],
		})
	}
}

pub fn info() -> ServerInfo {
	ServerInfo {
		version: 160002,
		schema: "public".into(),
		name: "quarry".into(),
	}
}

pub fn column(table: &str, name: &str) -> ColumnRow {
	ColumnRow {
		schema: "public".into(),
		table: table.into(),
		name: name.into(),
		kind: "integer".into(),
		table_kind: "r".into(),
		..Default::default()
	}
}

pub fn users() -> Vec<ColumnRow> {
	let mut id = column("users", "id");
	id.primary_key = true;
	vec![id, column("users", "email")]
}

pub fn source(columns: Vec<ColumnRow>) -> Arc<MemorySource> {
	Arc::new(MemorySource::new(DatabaseKind::Postgres, info()).with_columns(columns))
}

pub fn record(name: &str, query: &str) -> AllowRecord {
	AllowRecord {
		name: name.into(),
		service: "tests".into(),
		query: query.into(),
		vars: String::new(),
	}
}

pub fn production() -> Config {
	Config {
		production: true,
		..Default::default()
	}
}

pub const USERS: &str = "query users { users { id email } }";

pub const SORTED_USERS: &str = "
/* @order sort: asc, desc */
query sortedUsers { users(order_by: { id: $sort }) { id } }";

pub async fn reloader(
	source: Arc<MemorySource>,
	provider: Arc<MemoryProvider>,
	backend: Arc<CountingBackend>,
) -> Arc<Reloader<CountingBackend>> {
	Arc::new(Reloader::new(source, provider, backend).await.unwrap())
}
