//! The normalized model of a relational database's structure.
//!
//! A [`SchemaModel`] is built once from the rows returned by a
//! [`SchemaSource`], and is never mutated afterwards. Every rebuild produces
//! a new model, which is compared to the previous one via its structural
//! hash to detect drift.

mod block;
mod column;
mod discover;
mod function;
pub(crate) mod hash;
mod index;
mod mem;
#[cfg(feature = "mysql")]
mod mysql;
#[cfg(feature = "postgres")]
mod postgres;
mod source;
mod table;

use std::collections::HashMap;

use serde::Serialize;

use crate::cnf::INTERNAL_TABLE_PREFIX;
use crate::err::Error;

pub use self::block::Blocklist;
pub use self::column::{Column, ForeignKey};
pub use self::discover::discover;
pub use self::function::{Function, Param};
pub use self::index::{Index, TableIndexes};
pub use self::mem::MemorySource;
#[cfg(feature = "mysql")]
pub use self::mysql::MySqlSource;
#[cfg(feature = "postgres")]
pub use self::postgres::PostgresSource;
pub use self::source::{ColumnRow, DatabaseKind, FunctionRow, IndexRow, SchemaSource, ServerInfo};
pub use self::table::{Table, TableKind};

/// The normalized structure of a database
#[derive(Clone, Debug, Serialize)]
pub struct SchemaModel {
	pub kind: DatabaseKind,
	pub version: i64,
	pub schema: String,
	pub name: String,
	pub tables: Vec<Table>,
	pub functions: Vec<Function>,
	#[serde(skip)]
	table_map: HashMap<String, HashMap<String, usize>>,
	hash: u64,
}

impl SchemaModel {
	/// Builds the model from raw discovery rows
	pub fn new(
		kind: DatabaseKind,
		info: ServerInfo,
		columns: Vec<ColumnRow>,
		functions: Vec<FunctionRow>,
		indices: Vec<IndexRow>,
		blocklist: &Blocklist,
	) -> Self {
		let merged = column::merge_columns(columns, blocklist);
		let mut indexes = index::group_indices(indices);
		// Group the columns of each table, keeping discovery order
		let mut order: Vec<(String, String)> = Vec::new();
		let mut groups: HashMap<(String, String), (String, Vec<Column>)> = HashMap::new();
		for m in merged {
			let key = (m.column.schema.clone(), m.column.table.clone());
			let group = groups.entry(key).or_insert_with_key(|k| {
				order.push(k.clone());
				(String::new(), Vec::new())
			});
			if group.0.is_empty() {
				group.0 = m.table_kind;
			}
			group.1.push(m.column);
		}
		let mut tables = Vec::with_capacity(order.len());
		for key in order {
			let Some((table_kind, columns)) = groups.remove(&key) else {
				continue;
			};
			let (schema, name) = key;
			if name.starts_with(INTERNAL_TABLE_PREFIX) {
				trace!("Excluding internal table {schema}.{name}");
				continue;
			}
			let idx = indexes.remove(&(schema.clone(), name.clone())).unwrap_or_default();
			let blocked = blocklist.is_blocked(&name);
			tables.push(Table::new(
				schema,
				name,
				TableKind::from_catalog(&table_kind),
				columns,
				idx,
				blocked,
			));
		}
		tables.sort_by(|a, b| (&a.schema, &a.name).cmp(&(&b.schema, &b.name)));
		let mut table_map: HashMap<String, HashMap<String, usize>> = HashMap::new();
		for (i, t) in tables.iter().enumerate() {
			table_map.entry(t.schema.clone()).or_default().insert(t.name.clone(), i);
		}
		let functions = function::group_functions(functions, blocklist);
		let mut model = Self {
			kind,
			version: info.version,
			schema: info.schema,
			name: info.name,
			tables,
			functions,
			table_map,
			hash: 0,
		};
		// Hash last, once the model is fully populated
		model.hash = model.compute_hash();
		model
	}

	fn compute_hash(&self) -> u64 {
		hash::hash_one(&(
			self.kind,
			self.version,
			&self.schema,
			&self.name,
			hash::hash_set(&self.tables),
			hash::hash_set(&self.functions),
		))
	}

	/// The structural hash of the normalized model
	pub fn hash(&self) -> u64 {
		self.hash
	}

	/// Looks up a table by schema and name
	pub fn table(&self, schema: &str, table: &str) -> Result<&Table, Error> {
		self.table_map
			.get(schema)
			.and_then(|t| t.get(table))
			.map(|i| &self.tables[*i])
			.ok_or_else(|| Error::TableNotFound {
				schema: schema.to_owned(),
				table: table.to_owned(),
			})
	}

	/// Looks up a column by schema, table and name
	pub fn column(&self, schema: &str, table: &str, column: &str) -> Result<&Column, Error> {
		self.table(schema, table)?.column(column).ok_or_else(|| Error::ColumnNotFound {
			schema: schema.to_owned(),
			table: table.to_owned(),
			column: column.to_owned(),
		})
	}

	/// Finds a table by name in any schema, preferring the current schema
	pub fn find_table(&self, name: &str) -> Option<&Table> {
		self.table(&self.schema, name)
			.ok()
			.or_else(|| self.tables.iter().find(|t| t.name == name))
	}

	/// Looks up a function by name. Overloads return the first match.
	pub fn function(&self, name: &str) -> Option<&Function> {
		self.functions.iter().find(|f| f.name == name)
	}
}

#[cfg(test)]
pub(crate) mod tests {
	use super::*;

	pub(crate) fn info() -> ServerInfo {
		ServerInfo {
			version: 150000,
			schema: "public".into(),
			name: "app".into(),
		}
	}

	pub(crate) fn col(table: &str, name: &str) -> ColumnRow {
		ColumnRow {
			schema: "public".into(),
			table: table.into(),
			name: name.into(),
			kind: "text".into(),
			table_kind: "r".into(),
			..Default::default()
		}
	}

	fn model(columns: Vec<ColumnRow>) -> SchemaModel {
		SchemaModel::new(
			DatabaseKind::Postgres,
			info(),
			columns,
			vec![],
			vec![],
			&Blocklist::default(),
		)
	}

	#[test]
	fn builds_tables_and_lookups() {
		let mut id = col("users", "id");
		id.primary_key = true;
		let m = model(vec![id, col("users", "email"), col("posts", "id")]);
		assert_eq!(m.tables.len(), 2);
		assert_eq!(m.table("public", "users").unwrap().columns.len(), 2);
		assert!(m.column("public", "users", "id").unwrap().primary_key);
		assert!(matches!(m.table("public", "tags"), Err(Error::TableNotFound { .. })));
		assert!(matches!(
			m.column("public", "users", "name"),
			Err(Error::ColumnNotFound { .. })
		));
		assert_eq!(m.find_table("posts").unwrap().name, "posts");
	}

	#[test]
	fn excludes_internal_tables() {
		let internal = format!("{INTERNAL_TABLE_PREFIX}migrations");
		let m = model(vec![col("users", "id"), col(&internal, "id")]);
		assert_eq!(m.tables.len(), 1);
		assert!(m.table("public", &internal).is_err());
	}

	#[test]
	fn empty_model_is_valid() {
		let m = model(vec![]);
		assert!(m.tables.is_empty());
		assert_eq!(m.hash(), model(vec![]).hash());
	}

	#[test]
	fn hash_ignores_row_order() {
		let a = model(vec![col("users", "id"), col("users", "email"), col("posts", "id")]);
		let b = model(vec![col("posts", "id"), col("users", "email"), col("users", "id")]);
		assert_eq!(a.hash(), b.hash());
	}

	#[test]
	fn hash_changes_with_structure() {
		let base = model(vec![col("users", "id"), col("users", "email")]);
		// A flag
		let mut flagged = col("users", "email");
		flagged.not_null = true;
		assert_ne!(base.hash(), model(vec![col("users", "id"), flagged]).hash());
		// A name
		assert_ne!(base.hash(), model(vec![col("users", "id"), col("users", "mail")]).hash());
		// A foreign key
		let mut fk = col("users", "email");
		fk.fkey_schema = "public".into();
		fk.fkey_table = "emails".into();
		fk.fkey_column = "address".into();
		assert_ne!(base.hash(), model(vec![col("users", "id"), fk]).hash());
	}

	#[test]
	fn blocklist_marks_tables_and_columns() {
		let list = Blocklist::new(["secrets", "password"]).unwrap();
		let m = SchemaModel::new(
			DatabaseKind::Postgres,
			info(),
			vec![col("users", "password"), col("secrets", "id")],
			vec![],
			vec![],
			&list,
		);
		assert!(m.column("public", "users", "password").unwrap().blocked);
		assert!(m.table("public", "secrets").unwrap().blocked);
	}
}
