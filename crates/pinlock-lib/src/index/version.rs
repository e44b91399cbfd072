use std::cmp::Ordering;
use std::hash::{Hash, Hasher};
use std::sync::OnceLock;

use regex::Regex;
use serde::{Serialize, Deserialize};

/// The version of a Python package.
///
/// # Format
/// Versions follow the format `[N!]N(.N)*[{a|b|rc}N][.postN][.devN][+local]`.
/// - `epoch` (`N!`) is used to correct errors in versioning schemes.
/// - Pre-release labels also accept the spellings `alpha`, `beta`, `c`, `pre` and `preview`.
/// - `-N` is shorthand for `.postN`.
/// - `local` is a free-form label for downstream patches, compared segment by segment.
///
/// # Eq & Ord
/// Trailing zeros in the release are ignored, `1.0 == 1.0.0`.
/// For the same release, dev-only versions sort before pre-releases which sort before the final
/// release, post-releases come after it.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct Version {
	epoch: u64,
	release: Vec<u64>,
	pre: Option<(PreKind, u64)>,
	post: Option<u64>,
	dev: Option<u64>,
	local: Option<String>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum PreKind {
	Alpha,
	Beta,
	ReleaseCandidate,
}

impl PreKind {
	fn from_label(label: &str) -> Self {
		match label.to_ascii_lowercase().as_str() {
			"a" | "alpha" => PreKind::Alpha,
			"b" | "beta" => PreKind::Beta,
			_ => PreKind::ReleaseCandidate,
		}
	}
}

impl std::fmt::Display for PreKind {
	fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
		f.write_str(match self {
			PreKind::Alpha => "a",
			PreKind::Beta => "b",
			PreKind::ReleaseCandidate => "rc",
		})
	}
}

/* Declaration order is sort order */
#[derive(Debug, PartialEq, Eq, PartialOrd, Ord, Hash)]
enum PreKey {
	DevOnly,
	Pre(PreKind, u64),
	Final,
}

#[derive(Debug, PartialEq, Eq, PartialOrd, Ord, Hash)]
enum LocalSegment<'a> {
	Text(&'a str),
	Number(u64),
}

fn pattern() -> &'static Regex {
	static PATTERN: OnceLock<Regex> = OnceLock::new();
	PATTERN.get_or_init(|| {
		Regex::new(r"(?ix)^\s*v?
			(?:(?P<epoch>[0-9]+)!)?
			(?P<release>[0-9]+(?:\.[0-9]+)*)
			(?:[-_.]?(?P<pre_l>alpha|a|beta|b|preview|pre|c|rc)[-_.]?(?P<pre_n>[0-9]+)?)?
			(?:-(?P<post_n1>[0-9]+)|[-_.]?(?P<post_l>post|rev|r)[-_.]?(?P<post_n2>[0-9]+)?)?
			(?:[-_.]?(?P<dev_l>dev)[-_.]?(?P<dev_n>[0-9]+)?)?
			(?:\+(?P<local>[a-z0-9]+(?:[-_.][a-z0-9]+)*))?
			\s*$").expect("version pattern failed to compile")
	})
}

impl Version {
	/// Create a new [`Version`] from a version string.
	///
	/// # Errors
	/// Returns a [`Parse`](crate::Error::Parse) error when the input does not follow the format
	/// or a component does not fit in a `u64`.
	pub fn new(s: impl AsRef<str>) -> crate::Result<Self> {
		use crate::Error::Parse;
		let s = s.as_ref();
		let caps = pattern().captures(s).ok_or_else(|| Parse(format!("invalid version `{}`", s)))?;

		let parse_number = |n: &str| n.parse::<u64>().map_err(|e| Parse(format!("component `{}` of version `{}`: {}", n, s, e)));
		let number = |group: &str| caps.name(group).map(|m| parse_number(m.as_str())).transpose();

		let release = caps.name("release")
			.map_or("", |m| m.as_str())
			.split('.')
			.map(parse_number)
			.collect::<crate::Result<Vec<_>>>()?;

		let pre = match caps.name("pre_l") {
			Some(label) => Some((PreKind::from_label(label.as_str()), number("pre_n")?.unwrap_or(0))),
			None => None,
		};
		let post = if caps.name("post_n1").is_some() {
			number("post_n1")?
		} else if caps.name("post_l").is_some() {
			Some(number("post_n2")?.unwrap_or(0))
		} else {
			None
		};
		let dev = match caps.name("dev_l") {
			Some(_) => Some(number("dev_n")?.unwrap_or(0)),
			None => None,
		};

		Ok(Version {
			epoch: number("epoch")?.unwrap_or(0),
			release,
			pre,
			post,
			dev,
			local: caps.name("local").map(|m| m.as_str().to_ascii_lowercase().replace(['-', '_'], ".")),
		})
	}

	pub fn epoch(&self) -> u64 {
		self.epoch
	}

	pub fn release(&self) -> &[u64] {
		&self.release
	}

	pub fn local(&self) -> Option<&str> {
		self.local.as_deref()
	}

	pub fn is_prerelease(&self) -> bool {
		self.pre.is_some() || self.is_devrelease()
	}

	pub fn is_postrelease(&self) -> bool {
		self.post.is_some()
	}

	pub fn is_devrelease(&self) -> bool {
		self.dev.is_some()
	}

	/// This version without the local label.
	pub fn public(&self) -> Version {
		Version { local: None, ..self.clone() }
	}

	/// Only the epoch and release, e.g. `1.2rc1.post3` -> `1.2`.
	pub fn base(&self) -> Version {
		Version {
			epoch: self.epoch,
			release: self.release.clone(),
			pre: None,
			post: None,
			dev: None,
			local: None,
		}
	}

	fn trimmed_release(&self) -> &[u64] {
		let end = self.release.iter().rposition(|n| *n != 0).map_or(0, |i| i + 1);
		&self.release[..end]
	}

	fn pre_key(&self) -> PreKey {
		match (self.pre, self.post, self.dev) {
			(Some((kind, n)), _, _) => PreKey::Pre(kind, n),
			(None, None, Some(_)) => PreKey::DevOnly,
			_ => PreKey::Final,
		}
	}

	/// Versions without a dev segment sort after those with one.
	fn dev_key(&self) -> (bool, u64) {
		(self.dev.is_none(), self.dev.unwrap_or(0))
	}

	fn local_key(&self) -> Option<Vec<LocalSegment<'_>>> {
		self.local.as_ref().map(|l| l.split('.')
			.map(|s| s.parse::<u64>().map_or(LocalSegment::Text(s), LocalSegment::Number))
			.collect())
	}
}

impl std::str::FromStr for Version {
	type Err = crate::Error;
	fn from_str(s: &str) -> Result<Self, Self::Err> { Self::new(s) }
}

impl TryFrom<String> for Version {
	type Error = crate::Error;
	fn try_from(value: String) -> Result<Self, Self::Error> { Self::new(value) }
}

impl From<Version> for String {
	fn from(value: Version) -> Self { value.to_string() }
}

impl Ord for Version {
	fn cmp(&self, other: &Self) -> Ordering {
		self.epoch.cmp(&other.epoch)
			.then_with(|| self.trimmed_release().cmp(other.trimmed_release()))
			.then_with(|| self.pre_key().cmp(&other.pre_key()))
			.then_with(|| self.post.cmp(&other.post))
			.then_with(|| self.dev_key().cmp(&other.dev_key()))
			.then_with(|| self.local_key().cmp(&other.local_key()))
	}
}

impl PartialOrd for Version {
	fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
		Some(self.cmp(other))
	}
}

impl PartialEq for Version {
	fn eq(&self, other: &Self) -> bool {
		self.cmp(other) == Ordering::Equal
	}
}

impl Eq for Version {}

impl Hash for Version {
	fn hash<H: Hasher>(&self, state: &mut H) {
		self.epoch.hash(state);
		self.trimmed_release().hash(state);
		self.pre_key().hash(state);
		self.post.hash(state);
		self.dev_key().hash(state);
		self.local_key().hash(state);
	}
}

impl std::fmt::Display for Version {
	fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
		if self.epoch != 0 {
			write!(f, "{}!", self.epoch)?;
		}
		let release: Vec<String> = self.release.iter().map(|n| n.to_string()).collect();
		write!(f, "{}", release.join("."))?;
		if let Some((kind, n)) = self.pre {
			write!(f, "{}{}", kind, n)?;
		}
		if let Some(n) = self.post {
			write!(f, ".post{}", n)?;
		}
		if let Some(n) = self.dev {
			write!(f, ".dev{}", n)?;
		}
		if let Some(local) = &self.local {
			write!(f, "+{}", local)?;
		}
		Ok(())
	}
}

#[cfg(test)]
mod test {
	use super::*;

	fn v(s: &str) -> Version { Version::new(s).unwrap() }

	#[test] fn release_is_not_compared_lexically() { assert!(v("1.2.4") < v("1.2.10")) }
	#[test] fn trailing_zeros_are_ignored() { assert_eq!(v("1.0"), v("1.0.0")) }
	#[test] fn short_release_is_lt() { assert!(v("1.2") < v("1.2.1")) }
	#[test] fn prefix_is_supported() { assert_eq!(v("v1.2.3"), v("1.2.3")) }
	#[test] fn epoch_is_respected() { assert!(v("2.0") < v("1!0.1")) }
	#[test] fn pre_releases_sort_before_final() { assert!(v("1.0a1") < v("1.0b2") && v("1.0b2") < v("1.0rc1") && v("1.0rc1") < v("1.0")) }
	#[test] fn dev_only_sorts_before_pre() { assert!(v("1.0.dev1") < v("1.0a1")) }
	#[test] fn pre_dev_sorts_before_pre() { assert!(v("1.0a1.dev1") < v("1.0a1")) }
	#[test] fn post_sorts_after_final() { assert!(v("1.0") < v("1.0.post1") && v("1.0.post1") < v("1.1.dev0")) }
	#[test] fn implicit_post() { assert_eq!(v("1.0-2"), v("1.0.post2")) }
	#[test] fn local_sorts_after_public() { assert!(v("1.0") < v("1.0+abc") && v("1.0+abc") < v("1.0+5")) }
	#[test] fn alternate_spellings() { assert_eq!(v("1.0-ALPHA.1"), v("1.0a1")); assert_eq!(v("1.0preview2"), v("1.0rc2")); assert_eq!(v("1.0-rev3"), v("1.0.post3")) }
	#[test] fn prerelease_flags() { assert!(v("1.0rc1").is_prerelease() && v("1.0.dev0").is_prerelease() && !v("1.0.post1").is_prerelease()) }
	#[test] fn display_is_normalized() { assert_eq!(v("1!1.0-ALPHA.1.post-2_dev3+Ubuntu-1").to_string(), "1!1.0a1.post2.dev3+ubuntu.1") }
	#[test] fn public_drops_local() { assert_eq!(v("1.0+x").public().to_string(), "1.0") }
	#[test] fn base_is_release_only() { assert_eq!(v("1!2.3rc1.post2").base().to_string(), "1!2.3") }
	#[test] fn garbage_is_rejected() { assert!(matches!(Version::new("one.two"), Err(crate::Error::Parse(_)))) }
	#[test] fn equal_versions_hash_equal() { let s: std::collections::HashSet<Version> = [v("1.0"), v("1.0.0"), v("1")].into_iter().collect(); assert_eq!(s.len(), 1) }
	#[test] fn serde_uses_strings() { assert_eq!(serde_json::to_string(&v("1.2rc1")).unwrap(), "\"1.2rc1\""); assert_eq!(serde_json::from_str::<Version>("\"2.0\"").unwrap(), v("2.0")) }
}
