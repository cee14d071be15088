use regex::RegexSet;

use crate::err::Error;

/// A set of whole-string regular expressions naming tables, columns and
/// functions which are excluded by policy.
#[derive(Clone, Debug)]
pub struct Blocklist {
	patterns: Vec<String>,
	set: RegexSet,
}

impl Default for Blocklist {
	fn default() -> Self {
		Self {
			patterns: Vec::new(),
			set: RegexSet::empty(),
		}
	}
}

impl Blocklist {
	/// Compiles the blocklist, anchoring every pattern at both ends
	pub fn new<I, S>(patterns: I) -> Result<Self, Error>
	where
		I: IntoIterator<Item = S>,
		S: Into<String>,
	{
		let patterns: Vec<String> = patterns.into_iter().map(Into::into).collect();
		for pattern in &patterns {
			// Validate each entry on its own so the error names the culprit
			if let Err(e) = regex::Regex::new(&anchor(pattern)) {
				return Err(Error::InvalidBlocklist {
					pattern: pattern.clone(),
					message: e.to_string(),
				});
			}
		}
		let set = RegexSet::new(patterns.iter().map(|p| anchor(p))).map_err(|e| {
			Error::InvalidBlocklist {
				pattern: patterns.join(", "),
				message: e.to_string(),
			}
		})?;
		Ok(Self {
			patterns,
			set,
		})
	}

	/// Checks whether the whole of `name` matches any entry
	pub fn is_blocked(&self, name: &str) -> bool {
		self.set.is_match(name)
	}

	pub fn patterns(&self) -> &[String] {
		&self.patterns
	}

	pub fn is_empty(&self) -> bool {
		self.patterns.is_empty()
	}
}

fn anchor(pattern: &str) -> String {
	format!("^(?:{pattern})$")
}
