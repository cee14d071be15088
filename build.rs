use std::env;
use std::process::Command;

use semver::{BuildMetadata, Version};

const VERSION_VAR: &str = "QUARRY_BUILD_VERSION";
const METADATA_VAR: &str = "QUARRY_BUILD_METADATA";

fn main() {
	for var in [VERSION_VAR, METADATA_VAR] {
		println!("cargo:rerun-if-env-changed={var}");
	}
	for path in ["src", "crates/core/src", "build.rs", "Cargo.toml"] {
		println!("cargo:rerun-if-changed={path}");
	}
	if let Some(version) = release_version() {
		println!("cargo:rustc-env={VERSION_VAR}={version}");
	}
	if let Some(metadata) = release_metadata() {
		println!("cargo:rustc-env={METADATA_VAR}={metadata}");
	}
}

/// A release version overriding the package version, without build metadata
fn release_version() -> Option<String> {
	let input = env::var(VERSION_VAR).ok().filter(|v| !v.trim().is_empty())?;
	let version = Version::parse(input.trim())
		.unwrap_or_else(|e| panic!("{VERSION_VAR}=`{input}` is not a SemVer version: {e}"));
	if !version.build.is_empty() {
		panic!("{VERSION_VAR}=`{input}` carries build metadata, set {METADATA_VAR} instead");
	}
	Some(version.to_string())
}

/// The build metadata from the environment, or the date and revision of
/// the git checkout
fn release_metadata() -> Option<String> {
	if let Ok(input) = env::var(METADATA_VAR) {
		let metadata = BuildMetadata::new(input.trim())
			.unwrap_or_else(|e| panic!("{METADATA_VAR}=`{input}` is invalid: {e}"));
		return Some(metadata.to_string());
	}
	let date = git(&["show", "--no-patch", "--format=%ad", "--date=format:%Y%m%d"])?;
	let rev = git(&["rev-parse", "--short", "HEAD"])?;
	let clean = Command::new("git").args(["diff", "--quiet"]).status().is_ok_and(|s| s.success());
	Some(match clean {
		true => format!("{date}.{rev}"),
		false => format!("{date}.{rev}.dirty"),
	})
}

fn git(args: &[&str]) -> Option<String> {
	let output = Command::new("git").args(args).output().ok()?;
	if !output.status.success() {
		return None;
	}
	let text = String::from_utf8(output.stdout).ok()?;
	Some(text.trim().to_owned()).filter(|t| !t.is_empty())
}
