/// Lazily reads a value from an environment variable, falling back to
/// `$default` when the variable is unset or does not parse as `$t`.
macro_rules! lazy_env_parse {
	($key:expr, $t:ty, $default:expr) => {
		std::sync::LazyLock::new(|| match std::env::var($key) {
			Ok(v) => v.trim().parse::<$t>().unwrap_or_else(|_| {
				warn!("Ignoring invalid value '{v}' for {}", $key);
				$default
			}),
			Err(_) => $default,
		})
	};
}
