use std::sync::LazyLock;
use std::time::Duration;

/// Tables whose name starts with this prefix belong to the engine itself
/// and are never visible to compilation
pub const INTERNAL_TABLE_PREFIX: &str = "_qy_";

/// The name of the configuration file inside the configuration root
pub const CONFIG_FILE: &str = "quarry.toml";

/// The directory holding allow-listed query files inside the configuration root
pub const QUERIES_DIR: &str = "queries";

/// The sub-directories of the configuration root which trigger a reload on change
pub const WATCHED_DIRS: [&str; 4] = ["fragments", "queries", "scripts", "keys"];

/// Query files inside the queries directory must have one of these extensions
pub const QUERY_FILE_EXTENSIONS: [&str; 2] = ["gql", "graphql"];

/// Roles which are always present in the role table
pub const DEFAULT_ROLES: [&str; 2] = ["user", "anon"];

/// Poll intervals below this many seconds are considered unsafe
pub const SCHEMA_POLL_MIN_SECS: i64 = 5;

/// The interval used when the configured poll interval is below the minimum
pub const SCHEMA_POLL_FALLBACK: Duration = Duration::from_secs(10);

/// The default schema poll interval in seconds
pub const SCHEMA_POLL_DEFAULT_SECS: i64 = 10;

/// How long the filesystem must be quiet before a reload is triggered (defaults to 10 seconds)
pub static RELOAD_DEBOUNCE_MS: LazyLock<u64> =
	lazy_env_parse!("QUARRY_RELOAD_DEBOUNCE_MS", u64, 10_000);

/// The capacity of the channel carrying filesystem events to the watcher task
pub static WATCHER_CHANNEL_SIZE: LazyLock<usize> =
	lazy_env_parse!("QUARRY_WATCHER_CHANNEL_SIZE", usize, 256);
