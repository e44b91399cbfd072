use std::collections::BTreeSet;
use std::sync::OnceLock;

use regex::Regex;
use serde::{Serialize, Deserialize};

use super::{Marker, SpecifierSet, Version};

/// Lowercases a project or extra name and collapses runs of `-`, `_` and `.` into `-`.
pub fn normalize_name(name: &str) -> String {
	static SEPARATORS: OnceLock<Regex> = OnceLock::new();
	SEPARATORS.get_or_init(|| Regex::new(r"[-_.]+").expect("separator pattern failed to compile"))
		.replace_all(name.trim(), "-")
		.to_ascii_lowercase()
}

/// Key used to group requirements and candidates, `name` or `name[extra1,extra2]`.
///
/// Each set of extras is resolved as its own dependency.
fn identifier(name: &str, extras: &BTreeSet<String>) -> String {
	if extras.is_empty() {
		name.to_string()
	} else {
		format!("{}[{}]", name, extras.iter().cloned().collect::<Vec<_>>().join(","))
	}
}

/// A dependency on a project, e.g. `requests[socks]>=2.0; python_version >= "3.7"`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Requirement {
	/// Normalized project name.
	pub name: String,
	pub extras: BTreeSet<String>,
	pub specifier: SpecifierSet,
	/// When present the requirement only applies where the marker evaluates to true.
	pub marker: Option<Marker>,
}

fn pattern() -> &'static Regex {
	static PATTERN: OnceLock<Regex> = OnceLock::new();
	PATTERN.get_or_init(|| {
		Regex::new(r"(?x)^\s*
			(?P<name>[A-Za-z0-9](?:[A-Za-z0-9._-]*[A-Za-z0-9])?)\s*
			(?:\[(?P<extras>[^\]]*)\])?\s*
			(?P<specifier>[^;]*?)\s*
			(?:;\s*(?P<marker>.*?))?\s*$").expect("requirement pattern failed to compile")
	})
}

impl Requirement {
	/// Any version of `name`.
	pub fn new(name: &str) -> Self {
		Self {
			name: normalize_name(name),
			extras: BTreeSet::new(),
			specifier: SpecifierSet::default(),
			marker: None,
		}
	}

	/// Exactly `version` of `name`.
	pub fn pinned(name: &str, version: &Version) -> Self {
		Self {
			specifier: SpecifierSet::exact(version),
			..Self::new(name)
		}
	}

	/// # Errors
	/// [`Parse`](crate::Error::Parse) when the name, specifiers or marker are malformed.
	/// Direct URL references (`name @ url`) are not supported.
	pub fn parse(s: &str) -> crate::Result<Self> {
		use crate::Error::Parse;
		let caps = pattern().captures(s).ok_or_else(|| Parse(format!("invalid requirement `{}`", s)))?;
		let name = caps.name("name").map_or("", |m| m.as_str());

		let extras = caps.name("extras")
			.map(|m| m.as_str().split(',').map(str::trim).filter(|e| !e.is_empty()).map(normalize_name).collect())
			.unwrap_or_default();

		let mut specifier = caps.name("specifier").map_or("", |m| m.as_str()).trim();
		if specifier.starts_with('@') {
			return Err(Parse(format!("direct references are not supported: `{}`", s)));
		}
		/* Old style `name (>=1.0)` */
		if let Some(inner) = specifier.strip_prefix('(').and_then(|s| s.strip_suffix(')')) {
			specifier = inner;
		}

		let marker = match caps.name("marker").map(|m| m.as_str().trim()) {
			Some(m) if !m.is_empty() => Some(Marker::parse(m)?),
			_ => None,
		};

		Ok(Self {
			name: normalize_name(name),
			extras,
			specifier: SpecifierSet::parse(specifier)?,
			marker,
		})
	}

	pub fn identifier(&self) -> String {
		identifier(&self.name, &self.extras)
	}
}

impl std::str::FromStr for Requirement {
	type Err = crate::Error;
	fn from_str(s: &str) -> Result<Self, Self::Err> { Self::parse(s) }
}

impl std::fmt::Display for Requirement {
	fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
		write!(f, "{}{}", self.identifier(), self.specifier)?;
		if let Some(marker) = &self.marker {
			write!(f, "; {}", marker)?;
		}
		Ok(())
	}
}

/// A concrete release of a project, with the extras it was requested with.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Candidate {
	pub name: String,
	pub version: Version,
	#[serde(default, skip_serializing_if = "BTreeSet::is_empty")]
	pub extras: BTreeSet<String>,
}

impl Candidate {
	pub fn new(name: &str, version: Version) -> Self {
		Self {
			name: normalize_name(name),
			version,
			extras: BTreeSet::new(),
		}
	}

	pub fn identifier(&self) -> String {
		identifier(&self.name, &self.extras)
	}
}

impl std::fmt::Display for Candidate {
	fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
		write!(f, "{}=={}", self.identifier(), self.version)
	}
}
