use std::collections::HashMap;
use std::sync::Arc;

use arc_swap::ArcSwapOption;
use once_cell::sync::OnceCell;
use serde_json::Value;

use super::backend::{Backend, Metadata, Variables};
use super::validator::Validator;
use crate::allow::{AllowEntry, AllowList, Item};
use crate::err::Error;
use crate::iam::{Role, RoleTable};

/// A compiled statement, bound to the role it was compiled for
pub struct Statement<B: Backend> {
	pub role: Arc<Role>,
	pub plan: B::Plan,
	pub metadata: Metadata,
	pub validator: Validator,
	pub sql: String,
}

/// The registration of one allow-listed query for one role
pub struct CacheEntry<B: Backend> {
	source: Arc<AllowEntry>,
	role: String,
	/// The order variable and the value this variant was registered for
	order: Option<(String, String)>,
	variants: Option<Variants<B>>,
	statement: OnceCell<Arc<Statement<B>>>,
	vars: ArcSwapOption<Variables>,
}

/// The precompiled variants of an entry with a dynamic order variable
struct Variants<B: Backend> {
	var: String,
	entries: HashMap<String, Arc<CacheEntry<B>>>,
}

impl<B: Backend> CacheEntry<B> {
	fn new(source: Arc<AllowEntry>, role: &str, order: Option<(String, String)>) -> Self {
		Self {
			source,
			role: role.to_owned(),
			order,
			variants: None,
			statement: OnceCell::new(),
			vars: ArcSwapOption::empty(),
		}
	}

	pub fn name(&self) -> &str {
		&self.source.name
	}

	pub fn role(&self) -> &str {
		&self.role
	}

	pub fn service(&self) -> &str {
		&self.source.service
	}

	/// The full registered document, which is what gets compiled
	pub fn text(&self) -> &str {
		&self.source.text
	}

	/// The registered document split into sections
	pub fn item(&self) -> &Item {
		&self.source.item
	}

	/// The order variable and value of a variant entry
	pub fn order(&self) -> Option<(&str, &str)> {
		self.order.as_ref().map(|(var, value)| (var.as_str(), value.as_str()))
	}

	/// The order variable an entry selects its variants by
	pub fn order_var(&self) -> Option<&str> {
		self.variants.as_ref().map(|v| v.var.as_str())
	}

	/// The values of the order variable with a precompiled variant, sorted
	pub fn order_values(&self) -> Vec<&str> {
		let mut values: Vec<&str> = match &self.variants {
			Some(v) => v.entries.keys().map(String::as_str).collect(),
			None => Vec::new(),
		};
		values.sort_unstable();
		values
	}

	/// Picks the variant selected by the order variable, or this entry
	/// when it has no order variable
	pub(crate) fn resolve(self: &Arc<Self>, vars: &Variables) -> Result<Arc<Self>, Error> {
		let Some(variants) = &self.variants else {
			return Ok(self.clone());
		};
		let value = match vars.get(&variants.var) {
			Some(Value::String(v)) if !v.is_empty() => v,
			_ => return Err(Error::invalid_variable(&variants.var, "required variable not set")),
		};
		variants.entries.get(value).cloned().ok_or_else(|| {
			Error::invalid_variable(&variants.var, format!("no statement for the value '{value}'"))
		})
	}

	/// The compiled statement, if one was compiled already
	pub fn compiled(&self) -> Option<&Arc<Statement<B>>> {
		self.statement.get()
	}

	/// Returns the statement, compiling it on first use.
	///
	/// Concurrent first callers wait for the single compiling caller. A
	/// failed compilation is not kept, so a later call tries again.
	pub(crate) fn statement<F>(&self, compile: F) -> Result<Arc<Statement<B>>, Error>
	where
		F: FnOnce() -> Result<Statement<B>, Error>,
	{
		self.statement.get_or_try_init(|| compile().map(Arc::new)).cloned()
	}

	/// The variables of the last request which resolved to this entry
	pub fn last_vars(&self) -> Option<Arc<Variables>> {
		self.vars.load_full()
	}

	pub(crate) fn store_vars(&self, vars: Variables) {
		self.vars.store(Some(Arc::new(vars)));
	}
}

/// The statement cache of one engine snapshot, keyed by query name and role
pub struct QueryCache<B: Backend> {
	entries: HashMap<String, HashMap<String, Arc<CacheEntry<B>>>>,
}

impl<B: Backend> QueryCache<B> {
	/// Registers every allow-listed query for every role. Nothing is
	/// compiled yet.
	pub fn build(list: &AllowList, roles: &RoleTable) -> Self {
		let mut entries: HashMap<String, HashMap<String, Arc<CacheEntry<B>>>> = HashMap::new();
		let names = roles.names();
		for source in list.entries() {
			let source = Arc::new(source.clone());
			for role in &names {
				let mut entry = CacheEntry::new(source.clone(), role, None);
				if let Some(order) = &source.item.order {
					let variants = order
						.values
						.iter()
						.map(|value| {
							let order = Some((order.var.clone(), value.clone()));
							(value.clone(), Arc::new(CacheEntry::new(source.clone(), role, order)))
						})
						.collect();
					entry.variants = Some(Variants {
						var: order.var.clone(),
						entries: variants,
					});
				}
				let by_role = entries.entry(source.name.clone()).or_default();
				if let Some(previous) = by_role.insert((*role).to_owned(), Arc::new(entry)) {
					warn!(
						"The query '{}' for role '{role}' from service '{}' replaces the one from service '{}'",
						source.name,
						source.service,
						previous.service()
					);
				}
			}
		}
		trace!("Registered {} allow-listed queries for {} roles", entries.len(), names.len());
		Self {
			entries,
		}
	}

	/// Looks up the registration of a query for a role
	pub fn get(&self, name: &str, role: &str) -> Option<&Arc<CacheEntry<B>>> {
		self.entries.get(name)?.get(role)
	}

	/// The number of registered query names
	pub fn len(&self) -> usize {
		self.entries.len()
	}

	pub fn is_empty(&self) -> bool {
		self.entries.is_empty()
	}

	/// Iterates over every registration
	pub fn iter(&self) -> impl Iterator<Item = &Arc<CacheEntry<B>>> {
		self.entries.values().flat_map(HashMap::values)
	}
}
