use tracing::Subscriber;
use tracing_subscriber::EnvFilter;
use tracing_subscriber::fmt::format::FmtSpan;
use tracing_subscriber::prelude::*;
use tracing_subscriber::util::SubscriberInitExt;

use crate::cnf::DEFAULT_LOG;
use crate::err::Error;

#[derive(Default, Debug, Clone)]
pub struct Builder {
	log_level: Option<String>,
}

pub fn builder() -> Builder {
	Builder::default()
}

impl Builder {
	/// Set the log level on the builder
	pub fn with_log_level(mut self, log_level: &str) -> Self {
		self.log_level = Some(log_level.to_owned());
		self
	}

	/// Build a tracing dispatcher with a compact fmt layer writing to stderr
	pub fn build(self) -> Result<Box<dyn Subscriber + Send + Sync + 'static>, Error> {
		let level = self.log_level.as_deref().unwrap_or(DEFAULT_LOG);
		let filter = filter(level)?;
		let registry = tracing_subscriber::registry().with(
			tracing_subscriber::fmt::layer()
				.compact()
				.with_ansi(true)
				.with_target(true)
				.with_span_events(FmtSpan::NONE)
				.with_writer(std::io::stderr)
				.with_filter(filter),
		);
		Ok(Box::new(registry))
	}

	/// Install the tracing pipeline
	pub fn init(self) -> Result<(), Error> {
		self.build()?.init();
		Ok(())
	}
}

/// Expands a bare level into a filter for the quarry crates only, and
/// accepts any other value as a full filter directive
fn filter(level: &str) -> Result<EnvFilter, Error> {
	let directive = match level {
		"error" | "warn" | "info" | "debug" | "trace" => {
			format!("error,quarry={level},quarry_core={level}")
		}
		"full" => "trace".to_owned(),
		_ => level.to_owned(),
	};
	EnvFilter::builder().parse(directive).map_err(|e| Error::LogFilter(e.to_string()))
}

#[cfg(test)]
mod tests {
	use tracing_subscriber::filter::LevelFilter;

	use super::*;

	#[test]
	fn bare_levels_target_quarry_crates() {
		let debug = filter("debug").unwrap();
		assert_eq!(debug.max_level_hint(), Some(LevelFilter::DEBUG));
		let full = filter("full").unwrap();
		assert_eq!(full.max_level_hint(), Some(LevelFilter::TRACE));
	}

	#[test]
	fn custom_directives_pass_through() {
		assert!(filter("quarry_core::reload=trace").is_ok());
		assert!(matches!(filter("quarry=loud"), Err(Error::LogFilter(_))));
	}
}
