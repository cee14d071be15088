//! The allow-list of pre-approved queries.
//!
//! Records come from a [`Provider`](crate::provider::Provider) as raw
//! documents, and are split into their sections here before the engine
//! registers them in its statement cache.

mod item;

use serde::{Deserialize, Serialize};

pub use self::item::{Fragment, Item, Operation, Order, parse_item, query_name, same_text};

/// One allow-listed query as stored by the configuration source
#[derive(Clone, Debug, Default, Eq, PartialEq, Serialize, Deserialize)]
pub struct AllowRecord {
	pub name: String,
	#[serde(default)]
	pub service: String,
	pub query: String,
	#[serde(default)]
	pub vars: String,
}

/// A parsed allow-list record
#[derive(Clone, Debug, Serialize)]
pub struct AllowEntry {
	pub name: String,
	pub service: String,
	pub operation: Operation,
	/// The document as registered
	pub text: String,
	pub vars: String,
	pub item: Item,
}

/// The parsed allow-list, in load order
#[derive(Clone, Debug, Default, Serialize)]
pub struct AllowList {
	entries: Vec<AllowEntry>,
}

impl AllowList {
	/// Parses every record. Records without a usable operation are
	/// skipped with a warning.
	pub fn new(records: Vec<AllowRecord>) -> Self {
		let mut entries = Vec::with_capacity(records.len());
		for record in records {
			if record.query.trim().is_empty() {
				continue;
			}
			let item = parse_item(&record.query);
			let Some(operation) = item.operation else {
				warn!("Skipping allow-listed query '{}': no operation found", record.name);
				continue;
			};
			// The record's own variables win over the ones embedded in the document
			let vars = if record.vars.trim().is_empty() {
				item.vars.clone()
			} else {
				record.vars
			};
			let name = if record.name.is_empty() {
				item.name.clone()
			} else {
				record.name
			};
			trace!("Parsed allow-listed {operation} '{name}'");
			entries.push(AllowEntry {
				name,
				service: record.service,
				operation,
				text: record.query,
				vars,
				item,
			});
		}
		Self {
			entries,
		}
	}

	pub fn entries(&self) -> &[AllowEntry] {
		&self.entries
	}

	pub fn len(&self) -> usize {
		self.entries.len()
	}

	pub fn is_empty(&self) -> bool {
		self.entries.is_empty()
	}
}

#[cfg(test)]
mod tests {
	use super::*;

	fn record(name: &str, query: &str) -> AllowRecord {
		AllowRecord {
			name: name.into(),
			service: "app".into(),
			query: query.into(),
			vars: String::new(),
		}
	}

	#[test]
	fn parses_records_in_order() {
		let list = AllowList::new(vec![
			record("getUsers", "query getUsers { users { id } }"),
			record("", "mutation addUser { user(insert: $data) { id } }"),
			record("empty", "  "),
			record("broken", "not a query"),
		]);
		assert_eq!(list.len(), 2);
		assert_eq!(list.entries()[0].name, "getUsers");
		assert_eq!(list.entries()[1].name, "addUser");
		assert_eq!(list.entries()[1].operation, Operation::Mutation);
	}

	#[test]
	fn record_variables_override_document_variables() {
		let mut r = record("q", "variables { \"a\": 1 } query q { users { id } }");
		let list = AllowList::new(vec![r.clone()]);
		assert_eq!(list.entries()[0].vars, "{ \"a\": 1 }");
		r.vars = "{\"a\": 2}".into();
		let list = AllowList::new(vec![r]);
		assert_eq!(list.entries()[0].vars, "{\"a\": 2}");
	}
}
