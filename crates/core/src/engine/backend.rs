use serde::Serialize;
use serde_json::{Map, Value};

use crate::iam::Role;
use crate::schema::SchemaModel;

/// The variables of a request, by name
pub type Variables = Map<String, Value>;

/// A parameter bound by a generated statement
#[derive(Clone, Debug, Default, Eq, PartialEq, Serialize)]
pub struct Placeholder {
	pub name: String,
	#[serde(rename = "type")]
	pub kind: String,
}

/// What the generator reports about a statement
#[derive(Clone, Debug, Default, Eq, PartialEq, Serialize)]
pub struct Metadata {
	pub params: Vec<Placeholder>,
}

/// The grammar compiler and the statement generator an engine runs.
///
/// Both steps are synchronous and may be slow. The engine never calls
/// them while holding a lock shared by other statements.
pub trait Backend: Send + Sync + 'static {
	/// The compiled form of a query
	type Plan: Send + Sync + 'static;

	/// Compiles a query for a role against the schema
	fn compile(
		&self,
		query: &str,
		vars: &Variables,
		role: &Role,
		schema: &SchemaModel,
	) -> anyhow::Result<Self::Plan>;

	/// Writes the statement for a plan into `out`
	fn generate(
		&self,
		plan: &Self::Plan,
		schema: &SchemaModel,
		out: &mut String,
	) -> anyhow::Result<Metadata>;
}
