use async_trait::async_trait;
use sqlx::postgres::{PgPool, PgPoolOptions, PgRow};
use sqlx::Row;

use super::source::{ColumnRow, DatabaseKind, FunctionRow, IndexRow, SchemaSource, ServerInfo};
use crate::err::Error;

const INFO: &str = "
SELECT
	current_setting('server_version_num')::bigint AS version,
	current_schema()::text AS schema,
	current_database()::text AS name";

const COLUMNS: &str = "
SELECT
	n.nspname::text AS schema,
	c.relname::text AS table,
	f.attname::text AS name,
	pg_catalog.format_type(f.atttypid, NULL)::text AS type,
	c.relkind::text AS table_kind,
	f.attnotnull AS not_null,
	COALESCE(p.contype = 'p', false) AS primary_key,
	COALESCE(p.contype = 'u', false) AS unique_key,
	f.attndims != 0 OR t.typcategory = 'A' AS array,
	COALESCE(t.typname = 'tsvector', false) AS full_text,
	COALESCE(fn.nspname::text, '') AS fkey_schema,
	COALESCE(fc.relname::text, '') AS fkey_table,
	COALESCE(fa.attname::text, '') AS fkey_column
FROM pg_catalog.pg_attribute f
	JOIN pg_catalog.pg_class c ON c.oid = f.attrelid
	JOIN pg_catalog.pg_namespace n ON n.oid = c.relnamespace
	JOIN pg_catalog.pg_type t ON t.oid = f.atttypid
	LEFT JOIN pg_catalog.pg_constraint p
		ON p.conrelid = c.oid AND f.attnum = ANY (p.conkey)
	LEFT JOIN pg_catalog.pg_class fc ON fc.oid = p.confrelid AND p.contype = 'f'
	LEFT JOIN pg_catalog.pg_namespace fn ON fn.oid = fc.relnamespace
	LEFT JOIN pg_catalog.pg_attribute fa
		ON fa.attrelid = p.confrelid AND fa.attnum = p.confkey[1] AND p.contype = 'f'
WHERE c.relkind IN ('r', 'v', 'm', 'f', 'p')
	AND n.nspname NOT IN ('pg_catalog', 'information_schema')
	AND n.nspname NOT LIKE 'pg_toast%'
	AND f.attnum > 0
	AND NOT f.attisdropped
ORDER BY schema, \"table\", f.attnum";

const FUNCTIONS: &str = "
SELECT
	p.oid::text AS id,
	p.proname::text AS name,
	a.ordinality::int4 AS param_position,
	NULLIF(a.name, '') AS param_name,
	COALESCE(pg_catalog.format_type(a.typ, NULL), '') AS param_kind
FROM pg_catalog.pg_proc p
	JOIN pg_catalog.pg_namespace n ON n.oid = p.pronamespace
	LEFT JOIN LATERAL unnest(
		p.proargtypes::oid[],
		COALESCE(p.proargnames[1:p.pronargs], ARRAY[]::text[])
	) WITH ORDINALITY AS a(typ, name, ordinality) ON true
WHERE n.nspname NOT IN ('pg_catalog', 'information_schema')
	AND p.prokind = 'f'
ORDER BY p.oid, a.ordinality";

const INDICES: &str = "
SELECT
	n.nspname::text AS schema,
	i.relname::text AS constraint,
	c.relname::text AS table,
	am.amname::text AS type,
	a.attname::text AS column
FROM pg_catalog.pg_index x
	JOIN pg_catalog.pg_class c ON c.oid = x.indrelid
	JOIN pg_catalog.pg_class i ON i.oid = x.indexrelid
	JOIN pg_catalog.pg_namespace n ON n.oid = c.relnamespace
	JOIN pg_catalog.pg_am am ON am.oid = i.relam
	JOIN pg_catalog.pg_attribute a ON a.attrelid = c.oid AND a.attnum = ANY (x.indkey)
WHERE n.nspname NOT IN ('pg_catalog', 'information_schema')
	AND n.nspname NOT LIKE 'pg_toast%'
ORDER BY schema, \"table\", \"constraint\"";

/// Discovers the schema of a PostgreSQL database
#[derive(Clone, Debug)]
pub struct PostgresSource {
	pool: PgPool,
}

impl PostgresSource {
	pub fn new(pool: PgPool) -> Self {
		Self {
			pool,
		}
	}

	/// Opens a small read-only pool for discovery
	pub async fn connect(url: &str) -> Result<Self, Error> {
		let pool = PgPoolOptions::new().max_connections(4).connect(url).await?;
		Ok(Self::new(pool))
	}
}

fn column(row: PgRow) -> Result<ColumnRow, sqlx::Error> {
	Ok(ColumnRow {
		schema: row.try_get("schema")?,
		table: row.try_get("table")?,
		name: row.try_get("name")?,
		kind: row.try_get("type")?,
		table_kind: row.try_get("table_kind")?,
		not_null: row.try_get("not_null")?,
		primary_key: row.try_get("primary_key")?,
		unique_key: row.try_get("unique_key")?,
		array: row.try_get("array")?,
		full_text: row.try_get("full_text")?,
		fkey_schema: row.try_get("fkey_schema")?,
		fkey_table: row.try_get("fkey_table")?,
		fkey_column: row.try_get("fkey_column")?,
	})
}

fn function(row: PgRow) -> Result<FunctionRow, sqlx::Error> {
	Ok(FunctionRow {
		id: row.try_get("id")?,
		name: row.try_get("name")?,
		param_position: row.try_get("param_position")?,
		param_name: row.try_get("param_name")?,
		param_kind: row.try_get("param_kind")?,
	})
}

fn index(row: PgRow) -> Result<IndexRow, sqlx::Error> {
	Ok(IndexRow {
		schema: row.try_get("schema")?,
		constraint: row.try_get("constraint")?,
		table: row.try_get("table")?,
		kind: row.try_get("type")?,
		column: row.try_get("column")?,
	})
}

#[async_trait]
impl SchemaSource for PostgresSource {
	fn kind(&self) -> DatabaseKind {
		DatabaseKind::Postgres
	}

	async fn server_info(&self) -> Result<ServerInfo, Error> {
		let row = sqlx::query(INFO).fetch_one(&self.pool).await?;
		Ok(ServerInfo {
			version: row.try_get("version")?,
			schema: row.try_get("schema")?,
			name: row.try_get("name")?,
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
