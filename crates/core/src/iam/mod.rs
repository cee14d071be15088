//! Named access profiles, and the table of roles an engine compiles for.

use std::collections::HashMap;
use std::collections::hash_map::Entry;
use std::sync::Arc;

use serde::{Deserialize, Serialize};

use crate::cnf::DEFAULT_ROLES;
use crate::err::Error;
use crate::schema::SchemaModel;

/// The configuration of one role
#[derive(Clone, Debug, Default, Eq, PartialEq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct RoleConfig {
	pub name: String,
	/// The condition under which a user is given this role
	#[serde(rename = "match")]
	pub filter: String,
	pub tables: Vec<RoleTableConfig>,
}

/// The per-table settings of one role
#[derive(Clone, Debug, Default, Eq, PartialEq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct RoleTableConfig {
	/// The schema of the table, or the current schema when empty
	pub schema: String,
	pub name: String,
	pub read_only: bool,
	pub blocked: bool,
}

/// The settings a role applies to one table
#[derive(Clone, Debug, Default, Eq, PartialEq, Serialize)]
pub struct TablePolicy {
	pub read_only: bool,
	pub blocked: bool,
}

#[derive(Clone, Debug, Default, Serialize)]
pub struct Role {
	pub name: String,
	pub filter: String,
	tables: HashMap<String, TablePolicy>,
	/// Tables missing from the role are blocked
	default_block: bool,
}

impl Role {
	fn new(name: &str) -> Self {
		Self {
			name: name.to_owned(),
			..Default::default()
		}
	}

	/// The policy for a table, when the role names it
	pub fn table(&self, name: &str) -> Option<&TablePolicy> {
		self.tables.get(name)
	}

	/// Whether the role may read from a table
	pub fn can_read(&self, name: &str) -> bool {
		match self.tables.get(name) {
			Some(policy) => !policy.blocked,
			None => !self.default_block,
		}
	}

	/// Whether the role may write to a table
	pub fn can_write(&self, name: &str) -> bool {
		match self.tables.get(name) {
			Some(policy) => !policy.blocked && !policy.read_only,
			None => !self.default_block,
		}
	}
}

/// The roles an engine knows about
#[derive(Clone, Debug, Default)]
pub struct RoleTable {
	roles: HashMap<String, Arc<Role>>,
}

impl RoleTable {
	/// Builds the role table from its configuration.
	///
	/// The default `user` and `anon` roles are always present. A role name
	/// configured twice is an error. Tables which do not exist in the
	/// schema are kept, and logged.
	pub fn build(
		configs: &[RoleConfig],
		schema: &SchemaModel,
		default_block: bool,
	) -> Result<Self, Error> {
		let mut roles: HashMap<String, Role> = HashMap::new();
		for config in configs {
			let mut role = Role::new(&config.name);
			role.filter.clone_from(&config.filter);
			for t in &config.tables {
				let table_schema = if t.schema.is_empty() {
					&schema.schema
				} else {
					&t.schema
				};
				if schema.table(table_schema, &t.name).is_err() {
					warn!(
						"Role '{}' references the table '{table_schema}.{}' which does not exist",
						config.name, t.name
					);
				}
				role.tables.insert(
					t.name.clone(),
					TablePolicy {
						read_only: t.read_only,
						blocked: t.blocked,
					},
				);
			}
			match roles.entry(config.name.clone()) {
				Entry::Occupied(_) => return Err(Error::DuplicateRole(config.name.clone())),
				Entry::Vacant(e) => {
					e.insert(role);
				}
			}
		}
		for name in DEFAULT_ROLES {
			roles.entry(name.to_owned()).or_insert_with(|| Role::new(name));
		}
		// Only the anonymous role is locked down when roles are configured
		if default_block && !configs.is_empty() {
			if let Some(anon) = roles.get_mut("anon") {
				anon.default_block = true;
			}
		}
		debug!("Built a role table with {} roles", roles.len());
		Ok(Self {
			roles: roles.into_iter().map(|(k, v)| (k, Arc::new(v))).collect(),
		})
	}

	/// Looks up a role by name
	pub fn get(&self, name: &str) -> Result<&Arc<Role>, Error> {
		self.roles.get(name).ok_or_else(|| Error::RoleNotDefined(name.to_owned()))
	}

	pub fn contains(&self, name: &str) -> bool {
		self.roles.contains_key(name)
	}

	/// The role names, sorted
	pub fn names(&self) -> Vec<&str> {
		let mut names: Vec<&str> = self.roles.keys().map(String::as_str).collect();
		names.sort_unstable();
		names
	}
}
