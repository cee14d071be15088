use std::fmt;
use std::str::FromStr;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};

use crate::err::Error;

/// The relational database engines the catalog queries are written for
#[derive(Clone, Copy, Debug, Default, Eq, PartialEq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum DatabaseKind {
	#[default]
	Postgres,
	Mysql,
}

impl fmt::Display for DatabaseKind {
	fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
		match self {
			DatabaseKind::Postgres => f.write_str("postgres"),
			DatabaseKind::Mysql => f.write_str("mysql"),
		}
	}
}

impl FromStr for DatabaseKind {
	type Err = Error;

	fn from_str(s: &str) -> Result<Self, Self::Err> {
		match s.to_ascii_lowercase().as_str() {
			"postgres" | "postgresql" => Ok(DatabaseKind::Postgres),
			"mysql" | "mariadb" => Ok(DatabaseKind::Mysql),
			v => Err(Error::Config(format!("unsupported database type '{v}'"))),
		}
	}
}

/// The identity of the database server
#[derive(Clone, Debug, Default, Eq, PartialEq, Hash, Serialize, Deserialize)]
pub struct ServerInfo {
	pub version: i64,
	pub schema: String,
	pub name: String,
}

/// One row of column metadata. A column with several foreign keys or
/// constraints appears once per key.
#[derive(Clone, Debug, Default, Eq, PartialEq, Serialize, Deserialize)]
pub struct ColumnRow {
	pub schema: String,
	pub table: String,
	pub name: String,
	#[serde(rename = "type")]
	pub kind: String,
	#[serde(default)]
	pub table_kind: String,
	#[serde(default)]
	pub not_null: bool,
	#[serde(default)]
	pub primary_key: bool,
	#[serde(default)]
	pub unique_key: bool,
	#[serde(default)]
	pub array: bool,
	#[serde(default)]
	pub full_text: bool,
	#[serde(default)]
	pub fkey_schema: String,
	#[serde(default)]
	pub fkey_table: String,
	#[serde(default)]
	pub fkey_column: String,
}

/// One row of function metadata, one per parameter
#[derive(Clone, Debug, Default, Eq, PartialEq, Serialize, Deserialize)]
pub struct FunctionRow {
	/// The catalog identifier of the function, unique across overloads
	pub id: String,
	pub name: String,
	#[serde(default)]
	pub param_position: Option<i32>,
	#[serde(default)]
	pub param_name: Option<String>,
	#[serde(default)]
	pub param_kind: String,
}

/// One row of index metadata, one per indexed column
#[derive(Clone, Debug, Default, Eq, PartialEq, Serialize, Deserialize)]
pub struct IndexRow {
	pub schema: String,
	pub constraint: String,
	pub table: String,
	#[serde(rename = "type")]
	pub kind: String,
	pub column: String,
}

/// A live connection able to answer the catalog queries schema discovery
/// needs. Every method is read-only.
#[async_trait]
pub trait SchemaSource: Send + Sync + 'static {
	/// The database engine behind this source
	fn kind(&self) -> DatabaseKind;

	/// Fetch the server version and the current schema and database names
	async fn server_info(&self) -> Result<ServerInfo, Error>;

	/// Fetch column metadata for every visible table
	async fn columns(&self) -> Result<Vec<ColumnRow>, Error>;

	/// Fetch function metadata for every visible function
	async fn functions(&self) -> Result<Vec<FunctionRow>, Error>;

	/// Fetch index metadata for every visible table
	async fn indices(&self) -> Result<Vec<IndexRow>, Error>;
}
