use super::backend::{Metadata, Variables};
use crate::err::Error;

/// Checks request variables against what a statement binds
#[derive(Clone, Debug, Default)]
pub struct Validator {
	required: Vec<String>,
}

impl Validator {
	pub fn new(metadata: &Metadata) -> Self {
		let mut required: Vec<String> = Vec::with_capacity(metadata.params.len());
		for p in &metadata.params {
			if !required.contains(&p.name) {
				required.push(p.name.clone());
			}
		}
		Self {
			required,
		}
	}

	/// Fails on the first bound parameter without a value
	pub fn validate(&self, vars: &Variables) -> Result<(), Error> {
		match self.required.iter().find(|name| !vars.contains_key(name.as_str())) {
			Some(name) => Err(Error::MissingVariable(name.clone())),
			None => Ok(()),
		}
	}

	pub fn required(&self) -> &[String] {
		&self.required
	}
}
