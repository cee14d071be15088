use std::collections::HashMap;
use std::collections::hash_map::Entry;
use std::hash::{Hash, Hasher};

use serde::Serialize;

use super::block::Blocklist;
use super::source::ColumnRow;

/// The target of a foreign key
#[derive(Clone, Debug, Eq, PartialEq, Hash, Serialize)]
pub struct ForeignKey {
	pub schema: String,
	pub table: String,
	pub column: String,
}

/// A normalized column of a table
#[derive(Clone, Debug, Default, Eq, PartialEq, Serialize)]
pub struct Column {
	/// Position of the column in discovery order. Not part of the structure.
	pub id: u32,
	pub schema: String,
	pub table: String,
	pub name: String,
	#[serde(rename = "type")]
	pub kind: String,
	pub array: bool,
	pub not_null: bool,
	pub primary_key: bool,
	pub unique_key: bool,
	pub full_text: bool,
	pub foreign_key: Option<ForeignKey>,
	pub blocked: bool,
}

impl Hash for Column {
	fn hash<H: Hasher>(&self, state: &mut H) {
		self.schema.hash(state);
		self.table.hash(state);
		self.name.hash(state);
		self.kind.hash(state);
		self.array.hash(state);
		self.not_null.hash(state);
		self.primary_key.hash(state);
		self.unique_key.hash(state);
		self.full_text.hash(state);
		self.foreign_key.hash(state);
		self.blocked.hash(state);
	}
}

impl Column {
	fn from_row(id: u32, row: ColumnRow, blocklist: &Blocklist) -> Self {
		let mut column = Column {
			id,
			blocked: blocklist.is_blocked(&row.name),
			..Default::default()
		};
		column.absorb_flags(&row);
		column.schema = row.schema;
		column.table = row.table;
		column.name = row.name;
		column.kind = row.kind;
		column.foreign_key = foreign_key(row.fkey_schema, row.fkey_table, row.fkey_column);
		column
	}

	fn absorb_flags(&mut self, row: &ColumnRow) {
		self.not_null |= row.not_null;
		self.primary_key |= row.primary_key;
		// A primary key is always unique
		self.unique_key |= row.unique_key || row.primary_key;
		self.array |= row.array;
		self.full_text |= row.full_text;
	}

	fn merge(&mut self, row: ColumnRow) {
		self.absorb_flags(&row);
		if self.kind.is_empty() && !row.kind.is_empty() {
			self.kind = row.kind;
		}
		if self.foreign_key.is_none() {
			self.foreign_key = foreign_key(row.fkey_schema, row.fkey_table, row.fkey_column);
		}
	}
}

fn foreign_key(schema: String, table: String, column: String) -> Option<ForeignKey> {
	if table.is_empty() || column.is_empty() {
		return None;
	}
	Some(ForeignKey {
		schema,
		table,
		column,
	})
}

/// A column together with the kind of the table which owns it
pub(crate) struct MergedColumn {
	pub column: Column,
	pub table_kind: String,
}

/// Deduplicates discovery rows by `(schema, table, name)`.
///
/// Flags are merged with a logical OR, the first non-empty type and the
/// first foreign key target win. The output keeps the order in which each
/// logical column was first seen.
pub(crate) fn merge_columns(rows: Vec<ColumnRow>, blocklist: &Blocklist) -> Vec<MergedColumn> {
	let mut index: HashMap<(String, String, String), usize> = HashMap::with_capacity(rows.len());
	let mut merged: Vec<MergedColumn> = Vec::with_capacity(rows.len());
	for row in rows {
		let key = (row.schema.clone(), row.table.clone(), row.name.clone());
		match index.entry(key) {
			Entry::Occupied(e) => {
				let existing = &mut merged[*e.get()];
				if existing.table_kind.is_empty() && !row.table_kind.is_empty() {
					existing.table_kind.clone_from(&row.table_kind);
				}
				existing.column.merge(row);
			}
			Entry::Vacant(e) => {
				let id = merged.len() as u32;
				e.insert(merged.len());
				let table_kind = row.table_kind.clone();
				merged.push(MergedColumn {
					column: Column::from_row(id, row, blocklist),
					table_kind,
				});
			}
		}
	}
	trace!("Merged column metadata into {} columns", merged.len());
	merged
}
