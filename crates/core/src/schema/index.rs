use std::collections::{BTreeMap, HashMap};
use std::hash::{Hash, Hasher};

use serde::Serialize;

use super::hash::hash_set;
use super::source::IndexRow;

/// One column's membership in an index or constraint
#[derive(Clone, Debug, Eq, PartialEq, Hash, Serialize)]
pub struct Index {
	pub schema: String,
	pub constraint: String,
	pub table: String,
	#[serde(rename = "type")]
	pub kind: String,
	pub column: String,
	/// Whether the constraint spans more than one column
	pub composite: bool,
}

/// The index metadata of one table, keyed both ways
#[derive(Clone, Debug, Default, Eq, PartialEq, Serialize)]
pub struct TableIndexes {
	pub by_column: BTreeMap<String, Vec<Index>>,
	pub by_constraint: BTreeMap<String, Vec<Index>>,
}

impl TableIndexes {
	/// The indexes covering a column
	pub fn column(&self, name: &str) -> &[Index] {
		self.by_column.get(name).map(Vec::as_slice).unwrap_or_default()
	}

	/// The columns of a constraint
	pub fn constraint(&self, name: &str) -> &[Index] {
		self.by_constraint.get(name).map(Vec::as_slice).unwrap_or_default()
	}

	pub fn is_empty(&self) -> bool {
		self.by_constraint.is_empty()
	}
}

impl Hash for TableIndexes {
	fn hash<H: Hasher>(&self, state: &mut H) {
		// The by-column map is a view over the same entries
		hash_set(self.by_constraint.values().flatten()).hash(state);
	}
}

/// Groups index rows by `(schema, table)`
pub(crate) fn group_indices(rows: Vec<IndexRow>) -> HashMap<(String, String), TableIndexes> {
	let mut widths: HashMap<(String, String, String), usize> = HashMap::new();
	for row in &rows {
		*widths
			.entry((row.schema.clone(), row.table.clone(), row.constraint.clone()))
			.or_default() += 1;
	}
	let mut out: HashMap<(String, String), TableIndexes> = HashMap::new();
	for row in rows {
		let width = widths
			.get(&(row.schema.clone(), row.table.clone(), row.constraint.clone()))
			.copied()
			.unwrap_or(1);
		let index = Index {
			composite: width > 1,
			schema: row.schema,
			constraint: row.constraint,
			table: row.table,
			kind: row.kind,
			column: row.column,
		};
		let entry = out.entry((index.schema.clone(), index.table.clone())).or_default();
		entry.by_column.entry(index.column.clone()).or_default().push(index.clone());
		entry.by_constraint.entry(index.constraint.clone()).or_default().push(index);
	}
	out
}
