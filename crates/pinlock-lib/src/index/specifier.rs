//! Version constraints such as `>=1.0,!=1.3.*`.

use std::sync::OnceLock;

use regex::Regex;
use serde::{Serialize, Deserialize};

use super::Version;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Operator {
	/// `~=`
	Compatible,
	Equal,
	NotEqual,
	LessEqual,
	GreaterEqual,
	Less,
	Greater,
	/// `===`, compares the version text as a plain string.
	Arbitrary,
}

impl Operator {
	pub fn new(s: &str) -> crate::Result<Self> {
		Ok(match s {
			"~=" => Operator::Compatible,
			"==" => Operator::Equal,
			"!=" => Operator::NotEqual,
			"<=" => Operator::LessEqual,
			">=" => Operator::GreaterEqual,
			"<" => Operator::Less,
			">" => Operator::Greater,
			"===" => Operator::Arbitrary,
			_ => return Err(crate::Error::Parse(format!("unknown version operator `{}`", s))),
		})
	}

	pub fn as_str(&self) -> &'static str {
		match self {
			Operator::Compatible => "~=",
			Operator::Equal => "==",
			Operator::NotEqual => "!=",
			Operator::LessEqual => "<=",
			Operator::GreaterEqual => ">=",
			Operator::Less => "<",
			Operator::Greater => ">",
			Operator::Arbitrary => "===",
		}
	}
}

impl std::fmt::Display for Operator {
	fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
		f.write_str(self.as_str())
	}
}

/// A single operator and version, e.g. `>=1.0` or `==2.*`.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct Specifier {
	operator: Operator,
	/// The version as written, without any `.*` suffix.
	text: String,
	/// `None` only for `===` against something that is not a valid version.
	version: Option<Version>,
	wildcard: bool,
}

fn pattern() -> &'static Regex {
	static PATTERN: OnceLock<Regex> = OnceLock::new();
	PATTERN.get_or_init(|| Regex::new(r"^\s*(~=|===|==|!=|<=|>=|<|>)\s*([^\s,;]+)\s*$").expect("specifier pattern failed to compile"))
}

/// Whether `version` starts with the release segments `prefix`, padding `version` with zeros.
fn matches_prefix(version: &Version, epoch: u64, prefix: &[u64]) -> bool {
	version.epoch() == epoch
		&& prefix.iter().enumerate().all(|(i, n)| version.release().get(i).copied().unwrap_or(0) == *n)
}

impl Specifier {
	/// # Errors
	/// [`Parse`](crate::Error::Parse) when the version is invalid, a wildcard is used with an operator
	/// other than `==`/`!=`, or `~=` has a single release segment.
	pub fn new(operator: Operator, version: impl AsRef<str>) -> crate::Result<Self> {
		use crate::Error::Parse;
		let version = version.as_ref().trim();
		let (text, wildcard) = match version.strip_suffix(".*") {
			Some(prefix) => match operator {
				Operator::Equal | Operator::NotEqual => (prefix, true),
				_ => return Err(Parse(format!("wildcard not allowed with `{}{}`", operator, version))),
			},
			None => (version, false),
		};
		let parsed = match operator {
			Operator::Arbitrary => Version::new(text).ok(),
			_ => Some(Version::new(text)?),
		};
		if let (Operator::Compatible, Some(v)) = (operator, &parsed) {
			if v.release().len() < 2 {
				return Err(Parse(format!("`~={}` needs at least two release segments", text)));
			}
		}
		Ok(Self {
			operator,
			text: text.to_string(),
			version: parsed,
			wildcard,
		})
	}

	pub fn parse(s: &str) -> crate::Result<Self> {
		let caps = pattern().captures(s)
			.ok_or_else(|| crate::Error::Parse(format!("invalid version specifier `{}`", s)))?;
		let operator = Operator::new(caps.get(1).map_or("", |m| m.as_str()))?;
		Self::new(operator, caps.get(2).map_or("", |m| m.as_str()))
	}

	/// `==version`
	pub fn exact(version: &Version) -> Self {
		Self {
			operator: Operator::Equal,
			text: version.to_string(),
			version: Some(version.clone()),
			wildcard: false,
		}
	}

	pub fn operator(&self) -> Operator {
		self.operator
	}

	pub fn version(&self) -> Option<&Version> {
		self.version.as_ref()
	}

	pub fn is_wildcard(&self) -> bool {
		self.wildcard
	}

	/// Whether this specifier explicitly asks for a pre-release, which allows pre-releases for the whole set.
	pub fn names_prerelease(&self) -> bool {
		match self.operator {
			Operator::Equal | Operator::GreaterEqual | Operator::LessEqual | Operator::Compatible | Operator::Arbitrary => {
				self.version.as_ref().is_some_and(Version::is_prerelease)
			},
			_ => false,
		}
	}

	/// Whether `candidate` satisfies this specifier, regardless of pre-release policy.
	pub fn contains(&self, candidate: &Version) -> bool {
		let spec = match (&self.version, self.operator) {
			(_, Operator::Arbitrary) => return candidate.to_string().eq_ignore_ascii_case(&self.text),
			(Some(spec), _) => spec,
			(None, _) => return false,
		};
		match self.operator {
			Operator::Equal => self.equals(candidate, spec),
			Operator::NotEqual => !self.equals(candidate, spec),
			Operator::LessEqual => candidate.public() <= *spec,
			Operator::GreaterEqual => candidate.public() >= *spec,
			Operator::Less => {
				let public = candidate.public();
				/* `<1.0` must not let in `1.0rc1` */
				public < *spec
					&& !(!spec.is_prerelease() && public.is_prerelease() && public.base() == spec.base())
			},
			Operator::Greater => {
				let public = candidate.public();
				public > *spec
					&& !(!spec.is_postrelease() && public.is_postrelease() && public.base() == spec.base())
					&& !(candidate.local().is_some() && candidate.base() == spec.base())
			},
			Operator::Compatible => {
				let release = spec.release();
				candidate.public() >= *spec && matches_prefix(candidate, spec.epoch(), &release[..release.len() - 1])
			},
			Operator::Arbitrary => false,
		}
	}

	fn equals(&self, candidate: &Version, spec: &Version) -> bool {
		if self.wildcard {
			matches_prefix(candidate, spec.epoch(), spec.release())
		} else if spec.local().is_none() {
			candidate.public() == *spec
		} else {
			candidate == spec
		}
	}
}

impl std::str::FromStr for Specifier {
	type Err = crate::Error;
	fn from_str(s: &str) -> Result<Self, Self::Err> { Self::parse(s) }
}

impl std::fmt::Display for Specifier {
	fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
		write!(f, "{}{}", self.operator, self.text)?;
		if self.wildcard {
			write!(f, ".*")?;
		}
		Ok(())
	}
}

/// A conjunction of [`Specifier`]s. Empty means any version.
#[derive(Debug, Clone, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct SpecifierSet(Vec<Specifier>);

impl SpecifierSet {
	/// Parses a comma separated list of specifiers.
	pub fn parse(s: &str) -> crate::Result<Self> {
		s.split(',')
			.map(str::trim)
			.filter(|s| !s.is_empty())
			.map(Specifier::parse)
			.collect::<crate::Result<Vec<_>>>()
			.map(SpecifierSet)
	}

	pub fn exact(version: &Version) -> Self {
		Self(vec![Specifier::exact(version)])
	}

	pub fn is_empty(&self) -> bool {
		self.0.is_empty()
	}

	pub fn iter(&self) -> impl Iterator<Item = &Specifier> + '_ {
		self.0.iter()
	}

	/// A single `==` without a wildcard.
	pub fn is_exact(&self) -> bool {
		matches!(self.0.as_slice(), [s] if s.operator == Operator::Equal && !s.wildcard)
	}

	fn allows_prereleases(&self, allow_prereleases: bool) -> bool {
		allow_prereleases || self.0.iter().any(Specifier::names_prerelease)
	}

	/// Whether `version` satisfies every specifier.
	///
	/// Pre-releases never match unless `allow_prereleases` is set or one of the specifiers names one.
	pub fn contains(&self, version: &Version, allow_prereleases: bool) -> bool {
		if version.is_prerelease() && !self.allows_prereleases(allow_prereleases) {
			return false;
		}
		self.0.iter().all(|s| s.contains(version))
	}

	/// The versions satisfying the set, keeping their order.
	///
	/// Works like [`SpecifierSet::contains`] except that pre-releases are returned when they are the only matches.
	pub fn filter<'a>(&self, versions: impl IntoIterator<Item = &'a Version>, allow_prereleases: bool) -> Vec<&'a Version> {
		let allowed = self.allows_prereleases(allow_prereleases);
		let mut found = Vec::new();
		let mut held = Vec::new();
		for version in versions {
			if !self.0.iter().all(|s| s.contains(version)) {
				continue;
			}
			if version.is_prerelease() && !allowed {
				held.push(version);
			} else {
				found.push(version);
			}
		}
		if found.is_empty() { held } else { found }
	}
}

impl std::str::FromStr for SpecifierSet {
	type Err = crate::Error;
	fn from_str(s: &str) -> Result<Self, Self::Err> { Self::parse(s) }
}

impl TryFrom<String> for SpecifierSet {
	type Error = crate::Error;
	fn try_from(value: String) -> Result<Self, Self::Error> { Self::parse(&value) }
}

impl From<SpecifierSet> for String {
	fn from(value: SpecifierSet) -> Self { value.to_string() }
}

impl std::fmt::Display for SpecifierSet {
	fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
		let parts: Vec<String> = self.0.iter().map(|s| s.to_string()).collect();
		write!(f, "{}", parts.join(","))
	}
}
