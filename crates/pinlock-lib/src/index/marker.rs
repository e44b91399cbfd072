//! Environment markers, the `; python_version < "3.8"` part of a requirement.

use std::collections::BTreeSet;

use indexmap::IndexMap;

use super::specifier::{Operator, Specifier};
use super::Version;

/// Values for marker variables such as `python_version` or `sys_platform`.
///
/// Variables that were never set evaluate to an empty string.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Environment {
	variables: IndexMap<String, String>,
}

impl Environment {
	pub fn new() -> Self {
		Self::default()
	}

	/// An environment for the given Python version, e.g. `3.11.4`.
	///
	/// Sets `python_full_version`, `python_version` and `implementation_name`.
	pub fn python(full_version: &str) -> Self {
		let short: Vec<&str> = full_version.split('.').take(2).collect();
		Self::new()
			.with("python_full_version", full_version)
			.with("python_version", &short.join("."))
			.with("implementation_name", "cpython")
	}

	pub fn with(mut self, name: &str, value: &str) -> Self {
		self.set(name, value);
		self
	}

	pub fn set(&mut self, name: &str, value: &str) {
		self.variables.insert(name.to_string(), value.to_string());
	}

	pub fn get(&self, name: &str) -> &str {
		self.variables.get(name).map_or("", String::as_str)
	}

	/// The running Python version, preferring `python_full_version`.
	pub fn python_version(&self) -> Option<Version> {
		["python_full_version", "python_version"].into_iter()
			.map(|name| self.get(name))
			.find(|v| !v.is_empty())
			.and_then(|v| Version::new(v).ok())
	}
}

impl<K: Into<String>, V: Into<String>> FromIterator<(K, V)> for Environment {
	fn from_iter<T: IntoIterator<Item = (K, V)>>(iter: T) -> Self {
		Self {
			variables: iter.into_iter().map(|(k, v)| (k.into(), v.into())).collect(),
		}
	}
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Value {
	Variable(String),
	Literal(String),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MarkerOperator {
	Version(Operator),
	In,
	NotIn,
}

/// A parsed marker expression.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Marker {
	Expression {
		left: Value,
		operator: MarkerOperator,
		right: Value,
	},
	And(Box<Marker>, Box<Marker>),
	Or(Box<Marker>, Box<Marker>),
}

#[derive(Debug, Clone, PartialEq)]
enum Token {
	Open,
	Close,
	Quoted(String),
	Word(String),
	Operator(String),
}

fn tokenize(s: &str) -> crate::Result<Vec<Token>> {
	use crate::Error::Parse;
	let mut tokens = Vec::new();
	let mut chars = s.chars().peekable();
	while let Some(&c) = chars.peek() {
		match c {
			c if c.is_whitespace() => { chars.next(); },
			'(' => { chars.next(); tokens.push(Token::Open); },
			')' => { chars.next(); tokens.push(Token::Close); },
			'"' | '\'' => {
				chars.next();
				let mut text = String::new();
				loop {
					match chars.next() {
						Some(q) if q == c => break,
						Some(ch) => text.push(ch),
						None => return Err(Parse(format!("unterminated string in marker `{}`", s))),
					}
				}
				tokens.push(Token::Quoted(text));
			},
			'<' | '>' | '=' | '!' | '~' => {
				let mut op = String::new();
				while let Some(&ch) = chars.peek() {
					if !matches!(ch, '<' | '>' | '=' | '!' | '~') { break }
					op.push(ch);
					chars.next();
				}
				tokens.push(Token::Operator(op));
			},
			c if c.is_ascii_alphanumeric() || c == '_' || c == '.' => {
				let mut word = String::new();
				while let Some(&ch) = chars.peek() {
					if !(ch.is_ascii_alphanumeric() || ch == '_' || ch == '.') { break }
					word.push(ch);
					chars.next();
				}
				tokens.push(Token::Word(word));
			},
			_ => return Err(Parse(format!("unexpected `{}` in marker `{}`", c, s))),
		}
	}
	Ok(tokens)
}

const VARIABLES: &[&str] = &[
	"python_version", "python_full_version", "os_name", "sys_platform", "platform_release",
	"platform_system", "platform_version", "platform_machine", "platform_python_implementation",
	"implementation_name", "implementation_version", "extra",
];

struct Parser<'a> {
	source: &'a str,
	tokens: Vec<Token>,
	position: usize,
}

impl<'a> Parser<'a> {
	fn error(&self, message: &str) -> crate::Error {
		crate::Error::Parse(format!("{} at token {} in marker `{}`", message, self.position, self.source))
	}

	fn peek(&self) -> Option<&Token> {
		self.tokens.get(self.position)
	}

	fn next(&mut self) -> Option<Token> {
		let token = self.tokens.get(self.position).cloned();
		self.position += 1;
		token
	}

	fn eat_word(&mut self, word: &str) -> bool {
		if matches!(self.peek(), Some(Token::Word(w)) if w == word) {
			self.position += 1;
			true
		} else {
			false
		}
	}

	fn parse_or(&mut self) -> crate::Result<Marker> {
		let mut marker = self.parse_and()?;
		while self.eat_word("or") {
			marker = Marker::Or(Box::new(marker), Box::new(self.parse_and()?));
		}
		Ok(marker)
	}

	fn parse_and(&mut self) -> crate::Result<Marker> {
		let mut marker = self.parse_atom()?;
		while self.eat_word("and") {
			marker = Marker::And(Box::new(marker), Box::new(self.parse_atom()?));
		}
		Ok(marker)
	}

	fn parse_atom(&mut self) -> crate::Result<Marker> {
		if self.peek() == Some(&Token::Open) {
			self.position += 1;
			let marker = self.parse_or()?;
			if self.next() != Some(Token::Close) {
				return Err(self.error("expected `)`"));
			}
			return Ok(marker);
		}
		let left = self.parse_value()?;
		let operator = self.parse_operator()?;
		let right = self.parse_value()?;
		Ok(Marker::Expression { left, operator, right })
	}

	fn parse_value(&mut self) -> crate::Result<Value> {
		match self.next() {
			Some(Token::Quoted(s)) => Ok(Value::Literal(s)),
			Some(Token::Word(w)) if VARIABLES.contains(&w.as_str()) => Ok(Value::Variable(w)),
			_ => Err(self.error("expected a marker variable or quoted string")),
		}
	}

	fn parse_operator(&mut self) -> crate::Result<MarkerOperator> {
		match self.next() {
			Some(Token::Operator(op)) => Operator::new(&op).map(MarkerOperator::Version),
			Some(Token::Word(w)) if w == "in" => Ok(MarkerOperator::In),
			Some(Token::Word(w)) if w == "not" && self.eat_word("in") => Ok(MarkerOperator::NotIn),
			_ => Err(self.error("expected a comparison operator")),
		}
	}
}

impl Marker {
	pub fn parse(s: &str) -> crate::Result<Self> {
		let mut parser = Parser { source: s, tokens: tokenize(s)?, position: 0 };
		let marker = parser.parse_or()?;
		if parser.position < parser.tokens.len() {
			return Err(parser.error("unexpected trailing input"));
		}
		Ok(marker)
	}

	/// Evaluates the marker, `extras` are the extras requested for the package being expanded.
	pub fn evaluate(&self, environment: &Environment, extras: &BTreeSet<String>) -> bool {
		match self {
			Marker::And(a, b) => a.evaluate(environment, extras) && b.evaluate(environment, extras),
			Marker::Or(a, b) => a.evaluate(environment, extras) || b.evaluate(environment, extras),
			Marker::Expression { left, operator, right } => {
				match (left, right) {
					(Value::Variable(v), Value::Literal(l)) | (Value::Literal(l), Value::Variable(v)) if v == "extra" => {
						let requested = extras.contains(&super::normalize_name(l));
						match operator {
							MarkerOperator::Version(Operator::Equal) => requested,
							MarkerOperator::Version(Operator::NotEqual) => !requested,
							_ => false,
						}
					},
					_ => compare(resolve(left, environment), *operator, resolve(right, environment)),
				}
			},
		}
	}
}

fn resolve<'a>(value: &'a Value, environment: &'a Environment) -> &'a str {
	match value {
		Value::Variable(name) => environment.get(name),
		Value::Literal(s) => s,
	}
}

fn compare(left: &str, operator: MarkerOperator, right: &str) -> bool {
	match operator {
		MarkerOperator::In => right.contains(left),
		MarkerOperator::NotIn => !right.contains(left),
		MarkerOperator::Version(op) => {
			if let (Ok(version), Ok(spec)) = (Version::new(left), Specifier::new(op, right)) {
				return spec.contains(&version);
			}
			match op {
				Operator::Equal | Operator::Arbitrary => left == right,
				Operator::NotEqual => left != right,
				_ => false,
			}
		},
	}
}

impl std::fmt::Display for Value {
	fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
		match self {
			Value::Variable(v) => write!(f, "{}", v),
			/* PEP 508 strings have no escapes, so switch quotes instead */
			Value::Literal(s) if s.contains('"') => write!(f, "'{}'", s),
			Value::Literal(s) => write!(f, "\"{}\"", s),
		}
	}
}

impl std::fmt::Display for Marker {
	fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
		match self {
			Marker::Expression { left, operator, right } => {
				let op = match operator {
					MarkerOperator::Version(op) => op.as_str(),
					MarkerOperator::In => "in",
					MarkerOperator::NotIn => "not in",
				};
				write!(f, "{} {} {}", left, op, right)
			},
			Marker::Or(a, b) => write!(f, "{} or {}", a, b),
			Marker::And(a, b) => {
				for (i, side) in [a, b].into_iter().enumerate() {
					if i > 0 {
						write!(f, " and ")?;
					}
					match side.as_ref() {
						Marker::Or(..) => write!(f, "({})", side)?,
						_ => write!(f, "{}", side)?,
					}
				}
				Ok(())
			},
		}
	}
}

impl std::str::FromStr for Marker {
	type Err = crate::Error;
	fn from_str(s: &str) -> Result<Self, Self::Err> { Self::parse(s) }
}

#[cfg(test)]
mod tests {
	use super::*;

	fn py38() -> Environment {
		Environment::python("3.8.10").with("sys_platform", "linux")
	}

	fn eval(marker: &str) -> bool {
		Marker::parse(marker).unwrap().evaluate(&py38(), &BTreeSet::new())
	}

	fn eval_extras(marker: &str, extras: &[&str]) -> bool {
		let extras = extras.iter().map(|s| s.to_string()).collect();
		Marker::parse(marker).unwrap().evaluate(&py38(), &extras)
	}

	#[test] fn version_comparison() { assert!(eval("python_version >= '3.6'")); assert!(!eval("python_version < '3.8'")) }
	#[test] fn versions_compare_numerically() { assert!(!eval("python_version > '3.10'")); assert!(eval("python_full_version < '3.10'")) }
	#[test] fn string_equality() { assert!(eval("sys_platform == 'linux'")); assert!(eval("sys_platform != \"win32\"")) }
	#[test] fn non_version_ordering_is_false() { assert!(!eval("sys_platform < 'zzz'")) }
	#[test] fn membership() { assert!(eval("'linux' in sys_platform")); assert!(eval("sys_platform not in 'win32 cygwin'")) }
	#[test] fn reversed_operands() { assert!(eval("'3.6' <= python_version")) }
	#[test] fn undefined_variables_are_empty() { assert!(eval("platform_machine == ''")) }
	#[test] fn and_binds_tighter_than_or() { assert!(eval("sys_platform == 'win32' and python_version < '3' or python_version >= '3'")) }
	#[test] fn parentheses() { assert!(!eval("sys_platform == 'win32' and (python_version < '3' or python_version >= '3')")) }
	#[test] fn extra_matches_requested() { assert!(eval_extras("extra == 'socks'", &["socks"])); assert!(!eval_extras("extra == 'socks'", &[])) }
	#[test] fn extra_names_are_normalized() { assert!(eval_extras("extra == 'Security_Tools'", &["security-tools"])) }
	#[test] fn unknown_variable_is_rejected() { assert!(Marker::parse("shoe_size == '9'").is_err()) }
	#[test] fn unterminated_string_is_rejected() { assert!(Marker::parse("os_name == 'nt").is_err()) }
	#[test] fn trailing_input_is_rejected() { assert!(Marker::parse("os_name == 'nt' os_name").is_err()) }
	#[test] fn missing_paren_is_rejected() { assert!(Marker::parse("(os_name == 'nt'").is_err()) }
	#[test] fn display() { assert_eq!(Marker::parse("os_name=='nt' and (extra == 'a' or extra=='b')").unwrap().to_string(), "os_name == \"nt\" and (extra == \"a\" or extra == \"b\")") }
	#[test] fn display_keeps_double_quotes_parseable() { let m = Marker::parse("os_name == 'a\"b'").unwrap(); assert_eq!(m.to_string(), "os_name == 'a\"b'"); assert_eq!(Marker::parse(&m.to_string()).unwrap(), m) }
	#[test] fn python_version_prefers_full() { assert_eq!(py38().python_version().unwrap().to_string(), "3.8.10") }
}
