use async_trait::async_trait;
use sqlx::mysql::{MySqlPool, MySqlPoolOptions, MySqlRow};
use sqlx::Row;

use super::source::{ColumnRow, DatabaseKind, FunctionRow, IndexRow, SchemaSource, ServerInfo};
use crate::err::Error;

const INFO: &str = "
SELECT
	CAST(REPLACE(SUBSTRING_INDEX(VERSION(), '-', 1), '.', '') AS SIGNED) AS version,
	CAST(DATABASE() AS CHAR) AS `schema`,
	CAST(DATABASE() AS CHAR) AS name";

// MySQL reports boolean expressions as integers
const COLUMNS: &str = "
SELECT
	CAST(c.TABLE_SCHEMA AS CHAR) AS `schema`,
	CAST(c.TABLE_NAME AS CHAR) AS `table`,
	CAST(c.COLUMN_NAME AS CHAR) AS name,
	CAST(c.DATA_TYPE AS CHAR) AS type,
	CAST(t.TABLE_TYPE AS CHAR) AS table_kind,
	CAST(c.IS_NULLABLE = 'NO' AS SIGNED) AS not_null,
	CAST(COALESCE(tc.CONSTRAINT_TYPE = 'PRIMARY KEY', 0) AS SIGNED) AS primary_key,
	CAST(COALESCE(tc.CONSTRAINT_TYPE = 'UNIQUE', 0) AS SIGNED) AS unique_key,
	CAST(c.DATA_TYPE = 'json' AS SIGNED) AS `array`,
	CAST(EXISTS (
		SELECT 1 FROM information_schema.STATISTICS s
		WHERE s.TABLE_SCHEMA = c.TABLE_SCHEMA AND s.TABLE_NAME = c.TABLE_NAME
			AND s.COLUMN_NAME = c.COLUMN_NAME AND s.INDEX_TYPE = 'FULLTEXT'
	) AS SIGNED) AS full_text,
	CAST(COALESCE(k.REFERENCED_TABLE_SCHEMA, '') AS CHAR) AS fkey_schema,
	CAST(COALESCE(k.REFERENCED_TABLE_NAME, '') AS CHAR) AS fkey_table,
	CAST(COALESCE(k.REFERENCED_COLUMN_NAME, '') AS CHAR) AS fkey_column
FROM information_schema.COLUMNS c
	JOIN information_schema.TABLES t
		ON t.TABLE_SCHEMA = c.TABLE_SCHEMA AND t.TABLE_NAME = c.TABLE_NAME
	LEFT JOIN information_schema.KEY_COLUMN_USAGE k
		ON k.TABLE_SCHEMA = c.TABLE_SCHEMA AND k.TABLE_NAME = c.TABLE_NAME
			AND k.COLUMN_NAME = c.COLUMN_NAME
	LEFT JOIN information_schema.TABLE_CONSTRAINTS tc
		ON tc.CONSTRAINT_SCHEMA = k.CONSTRAINT_SCHEMA AND tc.TABLE_NAME = k.TABLE_NAME
			AND tc.CONSTRAINT_NAME = k.CONSTRAINT_NAME
WHERE c.TABLE_SCHEMA = DATABASE()
ORDER BY c.TABLE_NAME, c.ORDINAL_POSITION";

const FUNCTIONS: &str = "
SELECT
	CAST(r.SPECIFIC_NAME AS CHAR) AS id,
	CAST(r.ROUTINE_NAME AS CHAR) AS name,
	CAST(p.ORDINAL_POSITION AS SIGNED) AS param_position,
	CAST(p.PARAMETER_NAME AS CHAR) AS param_name,
	CAST(COALESCE(p.DATA_TYPE, '') AS CHAR) AS param_kind
FROM information_schema.ROUTINES r
	LEFT JOIN information_schema.PARAMETERS p
		ON p.SPECIFIC_SCHEMA = r.ROUTINE_SCHEMA AND p.SPECIFIC_NAME = r.SPECIFIC_NAME
			AND p.ORDINAL_POSITION > 0
WHERE r.ROUTINE_SCHEMA = DATABASE() AND r.ROUTINE_TYPE = 'FUNCTION'
ORDER BY r.SPECIFIC_NAME, p.ORDINAL_POSITION";

const INDICES: &str = "
SELECT
	CAST(s.TABLE_SCHEMA AS CHAR) AS `schema`,
	CAST(s.INDEX_NAME AS CHAR) AS `constraint`,
	CAST(s.TABLE_NAME AS CHAR) AS `table`,
	CAST(s.INDEX_TYPE AS CHAR) AS type,
	CAST(s.COLUMN_NAME AS CHAR) AS `column`
FROM information_schema.STATISTICS s
WHERE s.TABLE_SCHEMA = DATABASE()
ORDER BY s.TABLE_NAME, s.INDEX_NAME, s.SEQ_IN_INDEX";

/// Discovers the schema of a MySQL or MariaDB database
#[derive(Clone, Debug)]
pub struct MySqlSource {
	pool: MySqlPool,
}

impl MySqlSource {
	pub fn new(pool: MySqlPool) -> Self {
		Self {
			pool,
		}
	}

	/// Opens a small read-only pool for discovery
	pub async fn connect(url: &str) -> Result<Self, Error> {
		let pool = MySqlPoolOptions::new().max_connections(4).connect(url).await?;
		Ok(Self::new(pool))
	}
}

fn flag(row: &MySqlRow, name: &str) -> Result<bool, sqlx::Error> {
	Ok(row.try_get::<Option<i64>, _>(name)?.unwrap_or_default() != 0)
}

fn column(row: MySqlRow) -> Result<ColumnRow, sqlx::Error> {
	Ok(ColumnRow {
		schema: row.try_get("schema")?,
		table: row.try_get("table")?,
		name: row.try_get("name")?,
		kind: row.try_get("type")?,
		table_kind: row.try_get("table_kind")?,
		not_null: flag(&row, "not_null")?,
		primary_key: flag(&row, "primary_key")?,
		unique_key: flag(&row, "unique_key")?,
		array: flag(&row, "array")?,
		full_text: flag(&row, "full_text")?,
		fkey_schema: row.try_get("fkey_schema")?,
		fkey_table: row.try_get("fkey_table")?,
		fkey_column: row.try_get("fkey_column")?,
	})
}

fn function(row: MySqlRow) -> Result<FunctionRow, sqlx::Error> {
	let position: Option<i64> = row.try_get("param_position")?;
	Ok(FunctionRow {
		id: row.try_get("id")?,
		name: row.try_get("name")?,
		param_position: position.map(|p| p as i32),
		param_name: row.try_get("param_name")?,
		param_kind: row.try_get("param_kind")?,
	})
}

fn index(row: MySqlRow) -> Result<IndexRow, sqlx::Error> {
	Ok(IndexRow {
		schema: row.try_get("schema")?,
		constraint: row.try_get("constraint")?,
		table: row.try_get("table")?,
		kind: row.try_get("type")?,
		column: row.try_get("column")?,
	})
}

#[async_trait]
impl SchemaSource for MySqlSource {
	fn kind(&self) -> DatabaseKind {
		DatabaseKind::Mysql
	}

	async fn server_info(&self) -> Result<ServerInfo, Error> {
		let row = sqlx::query(INFO).fetch_one(&self.pool).await?;
		Ok(ServerInfo {
			version: row.try_get::<Option<i64>, _>("version")?.unwrap_or_default(),
			schema: row.try_get::<Option<String>, _>("schema")?.unwrap_or_default(),
			name: row.try_get::<Option<String>, _>("name")?.unwrap_or_default(),
		})
	}

	async fn columns(&self) -> Result<Vec<ColumnRow>, Error> {
		let rows = sqlx::query(COLUMNS).fetch_all(&self.pool).await?;
		Ok(rows.into_iter().map(column).collect::<Result<_, _>>()?)
	}

	async fn functions(&self) -> Result<Vec<FunctionRow>, Error> {
		let rows = sqlx::query(FUNCTIONS).fetch_all(&self.pool).await?;
		Ok(rows.into_iter().map(function).collect::<Result<_, _>>()?)
	}

	async fn indices(&self) -> Result<Vec<IndexRow>, Error> {
		let rows = sqlx::query(INDICES).fetch_all(&self.pool).await?;
		Ok(rows.into_iter().map(index).collect::<Result<_, _>>()?)
	}
}
