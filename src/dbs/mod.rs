use std::path::PathBuf;
use std::sync::Arc;

use clap::Args;
use quarry_core::SchemaSource;
use quarry_core::provider::FsProvider;
use quarry_core::schema::DatabaseKind;

use crate::err::Error;

#[derive(Args, Debug)]
pub struct DatabaseArguments {
	#[arg(help = "Connection string of the database to inspect")]
	#[arg(env = "QUARRY_DB", long = "db")]
	pub endpoint: String,
	#[arg(help = "Directory holding quarry.toml and the queries directory")]
	#[arg(env = "QUARRY_CONFIG", long = "config", default_value = ".")]
	pub config: PathBuf,
}

impl DatabaseArguments {
	/// The database engine named by the connection string scheme
	pub fn kind(&self) -> Result<DatabaseKind, Error> {
		let Some((scheme, _)) = self.endpoint.split_once("://") else {
			return Err(Error::Unsupported(self.endpoint.clone()));
		};
		scheme.parse().map_err(|_| Error::Unsupported(self.endpoint.clone()))
	}

	/// Opens a schema source for the connection string
	pub async fn connect(&self) -> Result<Arc<dyn SchemaSource>, Error> {
		let kind = self.kind()?;
		debug!("Connecting to the {kind} database");
		match kind {
			#[cfg(feature = "postgres")]
			DatabaseKind::Postgres => {
				let source = quarry_core::schema::PostgresSource::connect(&self.endpoint).await?;
				Ok(Arc::new(source))
			}
			#[cfg(feature = "mysql")]
			DatabaseKind::Mysql => {
				let source = quarry_core::schema::MySqlSource::connect(&self.endpoint).await?;
				Ok(Arc::new(source))
			}
			#[allow(unreachable_patterns)]
			_ => Err(Error::Unsupported(self.endpoint.clone())),
		}
	}

	/// A provider reading the configuration directory
	pub fn provider(&self) -> FsProvider {
		FsProvider::new(&self.config)
	}
}
