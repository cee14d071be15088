use std::collections::HashMap;
use std::fmt;
use std::hash::{Hash, Hasher};

use serde::Serialize;

use super::column::Column;
use super::hash::hash_set;
use super::index::TableIndexes;

#[derive(Clone, Copy, Debug, Default, Eq, PartialEq, Hash, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum TableKind {
	#[default]
	Table,
	View,
	MaterializedView,
}

impl TableKind {
	/// Maps the catalog's relation kind onto a table kind. Anything
	/// unrecognised is treated as a plain table.
	pub fn from_catalog(kind: &str) -> Self {
		match kind.to_ascii_lowercase().as_str() {
			"v" | "view" | "system view" => TableKind::View,
			"m" | "materialized view" | "materialized_view" => TableKind::MaterializedView,
			_ => TableKind::Table,
		}
	}
}

impl fmt::Display for TableKind {
	fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
		match self {
			TableKind::Table => f.write_str("table"),
			TableKind::View => f.write_str("view"),
			TableKind::MaterializedView => f.write_str("materialized view"),
		}
	}
}

/// A table, view or materialized view and its columns
#[derive(Clone, Debug, Serialize)]
pub struct Table {
	pub schema: String,
	pub name: String,
	pub kind: TableKind,
	pub columns: Vec<Column>,
	/// Position of the primary key column, if the table has one
	pub primary: Option<usize>,
	/// Positions of the full-text searchable columns
	pub full_text: Vec<usize>,
	pub indexes: TableIndexes,
	pub blocked: bool,
	#[serde(skip)]
	col_map: HashMap<String, usize>,
}

impl Table {
	pub(crate) fn new(
		schema: String,
		name: String,
		kind: TableKind,
		columns: Vec<Column>,
		indexes: TableIndexes,
		blocked: bool,
	) -> Self {
		let mut primary = None;
		let mut full_text = Vec::new();
		let mut col_map = HashMap::with_capacity(columns.len());
		for (i, c) in columns.iter().enumerate() {
			if c.full_text {
				full_text.push(i);
			} else if c.primary_key && primary.is_none() {
				primary = Some(i);
			}
			col_map.insert(c.name.clone(), i);
		}
		Self {
			schema,
			name,
			kind,
			columns,
			primary,
			full_text,
			indexes,
			blocked,
			col_map,
		}
	}

	/// Looks up a column of this table by name
	pub fn column(&self, name: &str) -> Option<&Column> {
		self.col_map.get(name).map(|i| &self.columns[*i])
	}

	pub fn primary_column(&self) -> Option<&Column> {
		self.primary.map(|i| &self.columns[i])
	}

	pub fn full_text_columns(&self) -> impl Iterator<Item = &Column> {
		self.full_text.iter().map(|i| &self.columns[*i])
	}
}

impl Hash for Table {
	fn hash<H: Hasher>(&self, state: &mut H) {
		self.schema.hash(state);
		self.name.hash(state);
		self.kind.hash(state);
		hash_set(&self.columns).hash(state);
		self.indexes.hash(state);
		self.blocked.hash(state);
	}
}
