use std::fmt;

use serde::Serialize;

/// The kind of a graph operation
#[derive(Clone, Copy, Debug, Default, Eq, PartialEq, Hash, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum Operation {
	#[default]
	Query,
	Mutation,
	Subscription,
}

impl Operation {
	/// Detects the operation from the first keyword of a query. A query
	/// which starts with a selection set is a plain query.
	pub fn detect(query: &str) -> Option<Self> {
		let query = query.trim_start();
		if query.starts_with('{') {
			return Some(Operation::Query);
		}
		Self::from_keyword(leading_word(query))
	}

	fn from_keyword(word: &str) -> Option<Self> {
		match word {
			"query" => Some(Operation::Query),
			"mutation" => Some(Operation::Mutation),
			"subscription" => Some(Operation::Subscription),
			_ => None,
		}
	}
}

impl fmt::Display for Operation {
	fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
		match self {
			Operation::Query => f.write_str("query"),
			Operation::Mutation => f.write_str("mutation"),
			Operation::Subscription => f.write_str("subscription"),
		}
	}
}

/// A named fragment definition
#[derive(Clone, Debug, Default, Eq, PartialEq, Serialize)]
pub struct Fragment {
	pub name: String,
	pub value: String,
}

/// The dynamic order variable of an item and its precompiled values
#[derive(Clone, Debug, Default, Eq, PartialEq, Serialize)]
pub struct Order {
	pub var: String,
	pub values: Vec<String>,
}

/// A query document split into its sections
#[derive(Clone, Debug, Default, Eq, PartialEq, Serialize)]
pub struct Item {
	pub comment: String,
	pub vars: String,
	pub query: String,
	pub fragments: Vec<Fragment>,
	pub name: String,
	pub operation: Option<Operation>,
	pub order: Option<Order>,
}

impl Item {
	/// Checks that both items define the same fragments, compared as a
	/// mapping from name to normalized value. Repeated fragments count.
	pub fn fragments_match(&self, other: &Item) -> bool {
		if self.fragments.len() != other.fragments.len() {
			return false;
		}
		fragment_keys(&self.fragments) == fragment_keys(&other.fragments)
	}
}

/// The fragments as sorted (name, normalized value) pairs
fn fragment_keys(fragments: &[Fragment]) -> Vec<(&str, String)> {
	let mut keys: Vec<(&str, String)> = fragments
		.iter()
		.map(|f| (f.name.as_str(), f.value.chars().filter(char::is_ascii_alphanumeric).collect()))
		.collect();
	keys.sort_unstable();
	keys
}

/// Compares two query texts ignoring every character which is not an
/// ASCII letter or digit
pub fn same_text(a: &str, b: &str) -> bool {
	let keep = |c: &u8| c.is_ascii_alphanumeric();
	a.bytes().filter(keep).eq(b.bytes().filter(keep))
}

/// Extracts the name of an operation or fragment, the identifier which
/// follows its keyword
pub fn query_name(text: &str) -> String {
	let text = text.trim_start();
	let keyword = leading_word(text);
	if keyword.is_empty() {
		return String::new();
	}
	leading_word(text[keyword.len()..].trim_start()).to_owned()
}

#[derive(Clone, Copy, Debug, Eq, PartialEq)]
enum Section {
	Vars,
	Query,
	Fragment,
}

impl Section {
	fn from_keyword(word: &str) -> Option<Self> {
		match word {
			"variables" => Some(Section::Vars),
			"fragment" => Some(Section::Fragment),
			w if Operation::from_keyword(w).is_some() => Some(Section::Query),
			_ => None,
		}
	}
}

/// An open section: its kind, where its value starts, and where the last
/// top-level closing brace seen inside it ends
struct Open {
	section: Section,
	start: usize,
	end: Option<usize>,
}

/// Splits a document into an [`Item`].
///
/// Section markers are only recognised at brace depth zero and outside
/// string literals and comments. Each section's value ends at its last
/// top-level closing brace. Parsing never fails: text which matches no
/// section is ignored.
pub fn parse_item(text: &str) -> Item {
	let bytes = text.as_bytes();
	let mut item = Item::default();
	let mut comments: Vec<&str> = Vec::new();
	let mut open: Option<Open> = None;
	let mut depth = 0usize;
	let mut parens = 0usize;
	let mut i = 0;
	while i < bytes.len() {
		match bytes[i] {
			b'"' => {
				i = skip_string(bytes, i);
				continue;
			}
			b'#' => {
				let end = text[i..].find('\n').map_or(bytes.len(), |n| i + n);
				if depth == 0 {
					comments.push(text[i + 1..end].trim());
				}
				i = end;
				continue;
			}
			b'/' if bytes.get(i + 1) == Some(&b'*') => {
				let (inner, end) = match text[i + 2..].find("*/") {
					Some(n) => (i + 2 + n, i + 4 + n),
					None => (bytes.len(), bytes.len()),
				};
				if depth == 0 {
					comments.push(text[i + 2..inner].trim());
				}
				i = end;
				continue;
			}
			b'{' => {
				// An anonymous query starts with its selection set
				if depth == 0 && open.is_none() {
					open = Some(Open {
						section: Section::Query,
						start: i,
						end: None,
					});
				}
				depth += 1;
			}
			b'(' => parens += 1,
			b')' => parens = parens.saturating_sub(1),
			b'}' => {
				depth = depth.saturating_sub(1);
				if depth == 0 {
					if let Some(o) = open.as_mut() {
						o.end = Some(i + 1);
					}
				}
			}
			c if depth == 0 && parens == 0 && is_ident(c) && (i == 0 || !is_word(bytes[i - 1])) => {
				let word = leading_word(&text[i..]);
				if let Some(section) = Section::from_keyword(word) {
					close(text, open.take(), &mut item);
					let start = match section {
						Section::Vars => i + word.len(),
						_ => i,
					};
					open = Some(Open {
						section,
						start,
						end: None,
					});
				}
				i += word.len().max(1);
				continue;
			}
			_ => {}
		}
		i += 1;
	}
	close(text, open, &mut item);
	item.comment = comments.join("\n");
	item.order = parse_order(&item.comment);
	item.name = query_name(&item.query);
	item.operation = Operation::detect(&item.query);
	item
}

fn close(text: &str, open: Option<Open>, item: &mut Item) {
	let Some(open) = open else {
		return;
	};
	let Some(end) = open.end else {
		return;
	};
	let value = text[open.start..end].trim();
	match open.section {
		Section::Vars => item.vars = value.to_owned(),
		Section::Query => item.query = value.to_owned(),
		Section::Fragment => item.fragments.push(Fragment {
			name: query_name(value),
			value: value.to_owned(),
		}),
	}
}

/// Reads the `@order <var>: <value>, <value>` directive from a comment
fn parse_order(comment: &str) -> Option<Order> {
	comment.lines().find_map(|line| {
		let rest = line.trim().strip_prefix("@order")?;
		let (var, values) = rest.split_once(':')?;
		let var = var.trim().trim_start_matches('$');
		if var.is_empty() {
			return None;
		}
		let values: Vec<String> = values
			.split(',')
			.map(|v| v.trim().trim_matches('"'))
			.filter(|v| !v.is_empty())
			.map(str::to_owned)
			.collect();
		Some(Order {
			var: var.to_owned(),
			values,
		})
	})
}

fn skip_string(bytes: &[u8], start: usize) -> usize {
	// Block strings run until the next triple quote
	if bytes[start..].starts_with(b"\"\"\"") {
		let mut i = start + 3;
		while i < bytes.len() {
			if bytes[i..].starts_with(b"\"\"\"") && bytes[i - 1] != b'\\' {
				return i + 3;
			}
			i += 1;
		}
		return bytes.len();
	}
	let mut i = start + 1;
	while i < bytes.len() {
		match bytes[i] {
			b'\\' => i += 2,
			b'"' => return i + 1,
			b'\n' => return i,
			_ => i += 1,
		}
	}
	bytes.len()
}

fn is_ident(c: u8) -> bool {
	c.is_ascii_alphanumeric() || c == b'_'
}

// Variables and directives are never section markers
fn is_word(c: u8) -> bool {
	is_ident(c) || c == b'$' || c == b'@'
}

fn leading_word(text: &str) -> &str {
	let end = text.bytes().position(|c| !is_ident(c)).unwrap_or(text.len());
	&text[..end]
}

#[cfg(test)]
mod tests {
	use super::*;

	const DOCUMENT: &str = r#"
/* Fetch users
@order sort: asc, desc */
variables {
	"limit": 10,
	"where": { "name": "}" }
}
query getUsers($limit: Int) {
	users(limit: $limit, where: { name: { eq: "{fragment}" } }) {
		...UserFields
	}
}
fragment UserFields on users {
	id
	email
}
"#;

	#[test]
	fn splits_a_document_into_sections() {
		let item = parse_item(DOCUMENT);
		assert!(item.comment.starts_with("Fetch users"));
		assert!(item.vars.starts_with('{'));
		assert!(item.vars.ends_with('}'));
		assert!(item.vars.contains("\"limit\": 10"));
		assert!(item.query.starts_with("query getUsers"));
		assert!(item.query.ends_with('}'));
		assert!(item.query.contains("{fragment}"));
		assert_eq!(item.name, "getUsers");
		assert_eq!(item.operation, Some(Operation::Query));
		assert_eq!(item.fragments.len(), 1);
		assert_eq!(item.fragments[0].name, "UserFields");
		assert!(item.fragments[0].value.ends_with('}'));
	}

	#[test]
	fn reads_the_order_directive() {
		let item = parse_item(DOCUMENT);
		let order = item.order.unwrap();
		assert_eq!(order.var, "sort");
		assert_eq!(order.values, ["asc", "desc"]);
	}

	#[test]
	fn parses_bare_queries() {
		let item = parse_item("mutation createUser { user(insert: $data) { id } }");
		assert_eq!(item.operation, Some(Operation::Mutation));
		assert_eq!(item.name, "createUser");
		assert!(item.vars.is_empty());
		assert!(item.fragments.is_empty());
		assert!(item.order.is_none());
		let item = parse_item("{ users { id } }");
		assert_eq!(item.query, "{ users { id } }");
		assert_eq!(item.operation, Some(Operation::Query));
		assert_eq!(item.name, "");
	}

	#[test]
	fn ignores_keywords_inside_selections() {
		let item = parse_item("query q { query { fragment } subscription }");
		assert_eq!(item.query, "query q { query { fragment } subscription }");
		assert!(item.fragments.is_empty());
	}

	#[test]
	fn ignores_keywords_in_arguments() {
		let item = parse_item("query q($query: String) { users(where: $query) { id } }");
		assert_eq!(item.name, "q");
		assert!(item.query.ends_with("{ id } }"));
	}

	#[test]
	fn unterminated_sections_are_dropped() {
		let item = parse_item("query broken { users { id }");
		assert!(item.query.is_empty());
		assert!(item.operation.is_none());
	}

	#[test]
	fn compares_text_ignoring_punctuation() {
		let registered = "query { users {id} }";
		assert!(same_text("query { users { id } }", registered));
		assert!(same_text("query{users{id}}", registered));
		assert!(!same_text("query { users { id email } }", registered));
		assert!(!same_text("query { Users { id } }", registered));
	}

	#[test]
	fn fragments_match_by_name_and_value() {
		let a = parse_item("query q { ...A ...B } fragment A on t { id } fragment B on t { name }");
		let b = parse_item("query q { ...A ...B } fragment B on t {name} fragment A on t {id}");
		let c = parse_item("query q { ...A ...B } fragment A on t { name } fragment B on t { id }");
		let d = parse_item("query q { ...A } fragment A on t { id }");
		assert!(a.fragments_match(&b));
		assert!(!a.fragments_match(&c));
		assert!(!a.fragments_match(&d));
		// Repeating one fragment does not stand in for another
		let e = parse_item("query q { ...A } fragment A on t { id } fragment A on t { id }");
		assert!(!e.fragments_match(&a));
		assert!(!a.fragments_match(&e));
		let f = parse_item("query q { ...A ...B } fragment A on t { id } fragment A on t { id } fragment B on t { name }");
		let g = parse_item("query q { ...A ...B } fragment A on t { id } fragment B on t { name } fragment B on t { name }");
		assert!(!f.fragments_match(&g));
		assert!(f.fragments_match(&f));
	}

	#[test]
	fn detects_operations() {
		assert_eq!(Operation::detect("  subscription s { x }"), Some(Operation::Subscription));
		assert_eq!(Operation::detect("queryish { x }"), None);
		assert_eq!(query_name("fragment Foo on bar { id }"), "Foo");
	}
}
