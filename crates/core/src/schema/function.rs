use std::collections::HashMap;
use std::hash::{Hash, Hasher};

use serde::Serialize;

use super::block::Blocklist;
use super::source::FunctionRow;

/// A parameter of a database function
#[derive(Clone, Debug, Eq, PartialEq, Hash, Serialize)]
pub struct Param {
	pub position: i32,
	/// The declared name, or a 1-based index when the catalog has none
	pub name: String,
	#[serde(rename = "type")]
	pub kind: String,
}

/// A database function and its ordered parameters
#[derive(Clone, Debug, Eq, PartialEq, Serialize)]
pub struct Function {
	pub name: String,
	pub params: Vec<Param>,
}

impl Hash for Function {
	fn hash<H: Hasher>(&self, state: &mut H) {
		self.name.hash(state);
		// Parameter order is significant
		self.params.hash(state);
	}
}

impl Function {
	/// Looks up a parameter by its declared or synthesized name
	pub fn param(&self, name: &str) -> Option<&Param> {
		self.params.iter().find(|p| p.name == name)
	}
}

/// Groups parameter rows into functions, keyed by the catalog identifier
/// so overloads stay apart. Blocked functions are dropped.
pub(crate) fn group_functions(rows: Vec<FunctionRow>, blocklist: &Blocklist) -> Vec<Function> {
	let mut index: HashMap<String, usize> = HashMap::new();
	let mut grouped: Vec<(Function, Vec<(i32, Option<String>, String)>)> = Vec::new();
	for row in rows {
		let i = match index.get(&row.id) {
			Some(i) => *i,
			None => {
				if blocklist.is_blocked(&row.name) {
					trace!("Skipping blocked function {}", row.name);
					continue;
				}
				index.insert(row.id.clone(), grouped.len());
				grouped.push((
					Function {
						name: row.name.clone(),
						params: Vec::new(),
					},
					Vec::new(),
				));
				grouped.len() - 1
			}
		};
		// A function without parameters is reported with an empty position
		if let Some(position) = row.param_position {
			grouped[i].1.push((position, row.param_name, row.param_kind));
		}
	}
	grouped
		.into_iter()
		.map(|(mut function, mut params)| {
			params.sort_by_key(|(position, _, _)| *position);
			function.params = params
				.into_iter()
				.enumerate()
				.map(|(n, (position, name, kind))| Param {
					position,
					name: match name {
						Some(name) if !name.is_empty() => name,
						_ => (n + 1).to_string(),
					},
					kind,
				})
				.collect();
			function
		})
		.collect()
}

#[cfg(test)]
mod tests {
	use super::*;

	fn row(id: &str, name: &str, position: i32, param: Option<&str>) -> FunctionRow {
		FunctionRow {
			id: id.into(),
			name: name.into(),
			param_position: Some(position),
			param_name: param.map(Into::into),
			param_kind: "integer".into(),
		}
	}

	#[test]
	fn groups_and_orders_parameters() {
		let functions = group_functions(
			vec![row("1", "add", 2, Some("b")), row("1", "add", 1, Some("a"))],
			&Blocklist::default(),
		);
		assert_eq!(functions.len(), 1);
		let names: Vec<_> = functions[0].params.iter().map(|p| p.name.as_str()).collect();
		assert_eq!(names, ["a", "b"]);
	}

	#[test]
	fn synthesizes_missing_parameter_names_per_function() {
		let functions = group_functions(
			vec![
				row("1", "add", 1, None),
				row("1", "add", 2, None),
				row("2", "neg", 1, None),
			],
			&Blocklist::default(),
		);
		assert_eq!(functions[0].param("1").unwrap().position, 1);
		assert_eq!(functions[0].param("2").unwrap().position, 2);
		assert_eq!(functions[1].params[0].name, "1");
	}

	#[test]
	fn keeps_overloads_apart() {
		let functions = group_functions(
			vec![row("1", "add", 1, Some("a")), row("2", "add", 1, Some("x"))],
			&Blocklist::default(),
		);
		assert_eq!(functions.len(), 2);
	}

	#[test]
	fn drops_blocked_functions() {
		let list = Blocklist::new(["pg_.*"]).unwrap();
		let functions = group_functions(
			vec![row("1", "pg_sleep", 1, None), row("2", "add", 1, None)],
			&list,
		);
		assert_eq!(functions.len(), 1);
		assert_eq!(functions[0].name, "add");
	}

	#[test]
	fn functions_without_parameters() {
		let functions = group_functions(
			vec![FunctionRow {
				id: "7".into(),
				name: "now".into(),
				..Default::default()
			}],
			&Blocklist::default(),
		);
		assert_eq!(functions.len(), 1);
		assert!(functions[0].params.is_empty());
	}
}
