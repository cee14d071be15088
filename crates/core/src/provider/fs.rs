use std::io::ErrorKind;
use std::path::{Path, PathBuf};

use async_trait::async_trait;
use tokio::fs;

use super::Provider;
use crate::allow::AllowRecord;
use crate::cnf::{CONFIG_FILE, QUERIES_DIR, QUERY_FILE_EXTENSIONS};
use crate::conf::Config;
use crate::err::Error;

/// Reads `quarry.toml` and the `queries` directory from a configuration root
#[derive(Clone, Debug)]
pub struct FsProvider {
	root: PathBuf,
}

impl FsProvider {
	pub fn new(root: impl Into<PathBuf>) -> Self {
		Self {
			root: root.into(),
		}
	}

	pub fn root(&self) -> &Path {
		&self.root
	}
}

#[async_trait]
impl Provider for FsProvider {
	async fn config(&self) -> Result<Config, Error> {
		let path = self.root.join(CONFIG_FILE);
		match fs::read_to_string(&path).await {
			Ok(text) => Config::parse(&text),
			Err(e) if e.kind() == ErrorKind::NotFound => {
				debug!("No configuration file at {}, using defaults", path.display());
				Ok(Config::default())
			}
			Err(e) => Err(e.into()),
		}
	}

	async fn allow_list(&self) -> Result<Vec<AllowRecord>, Error> {
		let dir = self.root.join(QUERIES_DIR);
		let mut entries = match fs::read_dir(&dir).await {
			Ok(entries) => entries,
			Err(e) if e.kind() == ErrorKind::NotFound => return Ok(Vec::new()),
			Err(e) => return Err(e.into()),
		};
		let mut paths = Vec::new();
		while let Some(entry) = entries.next_entry().await? {
			let path = entry.path();
			let known = path
				.extension()
				.and_then(|e| e.to_str())
				.is_some_and(|e| QUERY_FILE_EXTENSIONS.contains(&e));
			if known && entry.file_type().await?.is_file() {
				paths.push(path);
			}
		}
		// Directory order is not stable across platforms
		paths.sort();
		let mut records = Vec::with_capacity(paths.len());
		for path in paths {
			let Some(name) = path.file_stem().and_then(|s| s.to_str()) else {
				continue;
			};
			records.push(AllowRecord {
				name: name.to_owned(),
				service: String::new(),
				query: fs::read_to_string(&path).await?,
				vars: String::new(),
			});
		}
		trace!("Read {} allow-listed queries from {}", records.len(), dir.display());
		Ok(records)
	}

	fn watch_root(&self) -> Option<&Path> {
		Some(&self.root)
	}
}
