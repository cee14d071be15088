use std::sync::LazyLock;

/// The publicly visible name of the binary
pub const PKG_NAME: &str = "quarry";

/// The default log filter when neither `--log` nor `QUARRY_LOG` is set
pub const DEFAULT_LOG: &str = "info";

/// The version of the binary, with the build metadata when one was given
pub static PKG_VERSION: LazyLock<String> = LazyLock::new(|| {
	let version = option_env!("QUARRY_BUILD_VERSION").unwrap_or(env!("CARGO_PKG_VERSION"));
	match option_env!("QUARRY_BUILD_METADATA") {
		Some(metadata) if !metadata.trim().is_empty() => format!("{version}+{metadata}"),
		_ => version.to_owned(),
	}
});

/// Stores the current release identifier
pub static RELEASE: LazyLock<String> = LazyLock::new(|| {
	format!("{PKG_NAME} {} for {} on {}", *PKG_VERSION, std::env::consts::OS, std::env::consts::ARCH)
});
