//! One immutable engine snapshot: the schema model, the role table and the
//! statement cache, and the compile path which runs against them.

mod backend;
mod cache;
mod validator;

use std::sync::Arc;

use serde_json::Value;

use crate::allow::{AllowList, parse_item, same_text};
use crate::conf::Config;
use crate::err::Error;
use crate::iam::{Role, RoleTable};
use crate::schema::{Blocklist, SchemaModel};

pub use self::backend::{Backend, Metadata, Placeholder, Variables};
pub use self::cache::{CacheEntry, QueryCache, Statement};
pub use self::validator::Validator;

/// A compile request
#[derive(Clone, Debug, Default)]
pub struct Request {
	/// The registered name of the query
	pub name: String,
	/// The query document
	pub query: String,
	/// The variables as a JSON object
	pub vars: Option<String>,
	pub role: String,
	/// A dynamic order variable and the value to compile it with
	pub order: Option<(String, String)>,
}

impl Request {
	pub fn new(name: impl Into<String>, query: impl Into<String>, role: impl Into<String>) -> Self {
		Self {
			name: name.into(),
			query: query.into(),
			role: role.into(),
			..Default::default()
		}
	}

	pub fn with_vars(mut self, vars: impl Into<String>) -> Self {
		self.vars = Some(vars.into());
		self
	}

	pub fn with_order(mut self, var: impl Into<String>, value: impl Into<String>) -> Self {
		self.order = Some((var.into(), value.into()));
		self
	}
}

/// The result of a compile request
pub struct Compiled<B: Backend> {
	pub statement: Arc<Statement<B>>,
	pub variables: Variables,
}

impl<B: Backend> Compiled<B> {
	/// The generated statement text
	pub fn sql(&self) -> &str {
		&self.statement.sql
	}

	/// The role the statement was compiled for
	pub fn role(&self) -> &Role {
		&self.statement.role
	}

	/// Checks the request variables against the statement's parameters
	pub fn validate(&self) -> Result<(), Error> {
		self.statement.validator.validate(&self.variables)
	}
}

/// An immutable engine snapshot
pub struct Engine<B: Backend> {
	config: Config,
	blocklist: Blocklist,
	schema: Arc<SchemaModel>,
	roles: RoleTable,
	cache: Option<QueryCache<B>>,
	production: bool,
	backend: Arc<B>,
	generation: u64,
}

impl<B: Backend> Engine<B> {
	/// Builds a snapshot. The allow-list is registered unless the
	/// configuration disables it, and nothing is compiled yet.
	pub fn new(
		schema: Arc<SchemaModel>,
		config: &Config,
		allow: &AllowList,
		backend: Arc<B>,
		generation: u64,
	) -> Result<Self, Error> {
		let roles = RoleTable::build(&config.roles, &schema, config.default_block)?;
		let cache = match config.disable_allow_list {
			true => None,
			false => Some(QueryCache::build(allow, &roles)),
		};
		Ok(Self {
			config: config.clone(),
			blocklist: config.blocklist()?,
			schema,
			roles,
			cache,
			production: config.production,
			backend,
			generation,
		})
	}

	/// The configuration this snapshot was built from
	pub fn config(&self) -> &Config {
		&self.config
	}

	pub fn blocklist(&self) -> &Blocklist {
		&self.blocklist
	}

	pub fn schema(&self) -> &Arc<SchemaModel> {
		&self.schema
	}

	pub fn roles(&self) -> &RoleTable {
		&self.roles
	}

	/// The statement cache, unless the allow-list is disabled
	pub fn cache(&self) -> Option<&QueryCache<B>> {
		self.cache.as_ref()
	}

	/// Counts the snapshots published before this one
	pub fn generation(&self) -> u64 {
		self.generation
	}

	/// Whether only allow-listed queries may be compiled
	pub fn restricted(&self) -> bool {
		self.production && self.cache.is_some()
	}

	/// Compiles a request against this snapshot
	pub fn compile(&self, req: &Request) -> Result<Compiled<B>, Error> {
		let vars = parse_vars(req.vars.as_deref())?;
		match &self.cache {
			Some(cache) if self.production => self.compile_restricted(cache, req, vars),
			_ => {
				let statement =
					self.compile_statement(&req.query, vars.clone(), &req.role, req.order.as_ref())?;
				Ok(Compiled {
					statement: Arc::new(statement),
					variables: vars,
				})
			}
		}
	}

	fn compile_restricted(
		&self,
		cache: &QueryCache<B>,
		req: &Request,
		vars: Variables,
	) -> Result<Compiled<B>, Error> {
		if !self.roles.contains(&req.role) {
			return Err(Error::RoleNotDefined(req.role.clone()));
		}
		let incoming = parse_item(&req.query);
		// A request without a name is looked up by its operation name
		let name = match req.name.is_empty() {
			true => incoming.name.as_str(),
			false => req.name.as_str(),
		};
		let Some(entry) = cache.get(name, &req.role) else {
			debug!("The query '{name}' is not allow-listed for role '{}'", req.role);
			return Err(Error::NotFound);
		};
		if !same_text(&incoming.query, &entry.item().query) {
			debug!(
				"The query '{name}' does not match its registration\nstored:\n{}\nincoming:\n{}",
				entry.item().query,
				incoming.query
			);
			return Err(Error::NotFound);
		}
		if !incoming.fragments_match(entry.item()) {
			debug!("The fragments of query '{name}' do not match its registration");
			return Err(Error::NotFound);
		}
		let entry = entry.resolve(&vars)?;
		// The latest submission replaces the previous one, even when empty
		entry.store_vars(vars.clone());
		let statement = entry.statement(|| {
			trace!("Compiling allow-listed query '{}' for role '{}'", entry.name(), entry.role());
			let order = entry.order().map(|(var, value)| (var.to_owned(), value.to_owned()));
			self.compile_statement(entry.text(), vars.clone(), &req.role, order.as_ref())
		})?;
		Ok(Compiled {
			statement,
			variables: vars,
		})
	}

	fn compile_statement(
		&self,
		query: &str,
		mut vars: Variables,
		role: &str,
		order: Option<&(String, String)>,
	) -> Result<Statement<B>, Error> {
		let role = self.roles.get(role)?.clone();
		if let Some((var, value)) = order {
			vars.insert(var.clone(), Value::String(value.clone()));
		}
		let plan = self
			.backend
			.compile(query, &vars, &role, &self.schema)
			.map_err(|e| Error::CompileFailed(format!("{e:#}")))?;
		let mut sql = String::new();
		let metadata = self
			.backend
			.generate(&plan, &self.schema, &mut sql)
			.map_err(|e| Error::CompileFailed(format!("{e:#}")))?;
		Ok(Statement {
			role,
			plan,
			validator: Validator::new(&metadata),
			metadata,
			sql,
		})
	}
}

fn parse_vars(vars: Option<&str>) -> Result<Variables, Error> {
	match vars.map(str::trim) {
		None | Some("") => Ok(Variables::new()),
		Some(text) => match serde_json::from_str(text)? {
			Value::Object(map) => Ok(map),
			Value::Null => Ok(Variables::new()),
			_ => Err(Error::InvalidVariables("expected an object".to_owned())),
		},
	}
}
