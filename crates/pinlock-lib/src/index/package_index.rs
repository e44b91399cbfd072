use indexmap::IndexMap;
use serde::{Serialize, Deserialize};

use super::{normalize_name, SpecifierSet, Version};

/// A single published version of a project.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Release {
	pub version: Version,
	/// Requirement strings, e.g. `idna>=2.5; python_version >= "3"`.
	#[serde(default)]
	pub dependencies: Vec<String>,
	/// Python versions this release supports, `None` means all of them.
	#[serde(default, skip_serializing_if = "Option::is_none")]
	pub requires_python: Option<SpecifierSet>,
	/// Yanked releases are only used when pinned exactly.
	#[serde(default)]
	pub yanked: bool,
}

impl Release {
	pub fn new(version: Version) -> Self {
		Self {
			version,
			dependencies: Vec::new(),
			requires_python: None,
			yanked: false,
		}
	}

	pub fn with_dependencies<S: Into<String>>(mut self, dependencies: impl IntoIterator<Item = S>) -> Self {
		self.dependencies.extend(dependencies.into_iter().map(Into::into));
		self
	}

	pub fn with_requires_python(mut self, requires_python: SpecifierSet) -> Self {
		self.requires_python = Some(requires_python);
		self
	}

	pub fn yanked(mut self) -> Self {
		self.yanked = true;
		self
	}
}

type RawIndex = IndexMap<String, Vec<Release>>;

/// Every known release, keyed by normalized project name.
///
/// # JSON
/// ```json
/// { "requests": [ { "version": "2.31.0", "dependencies": ["idna>=2.5"], "requires_python": ">=3.7" } ] }
/// ```
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(from = "RawIndex", into = "RawIndex")]
pub struct PackageIndex {
	projects: RawIndex,
}

impl From<RawIndex> for PackageIndex {
	fn from(raw: RawIndex) -> Self {
		let mut index = Self::new();
		for (name, releases) in raw {
			for release in releases {
				index.add_release(&name, release);
			}
		}
		index
	}
}

impl From<PackageIndex> for RawIndex {
	fn from(index: PackageIndex) -> Self {
		index.projects
	}
}

impl PackageIndex {
	pub fn new() -> Self {
		Self::default()
	}

	pub fn from_json(json: &str) -> crate::Result<Self> {
		let index: Self = serde_json::from_str(json)?;
		log::debug!("Loaded {} projects into package index", index.len());
		Ok(index)
	}

	pub fn to_json(&self) -> crate::Result<String> {
		Ok(serde_json::to_string_pretty(self)?)
	}

	/// Adds a release, replacing any release of the same project with an equal version.
	///
	/// Releases are kept in ascending version order.
	pub fn add_release(&mut self, name: &str, release: Release) {
		let releases = self.projects.entry(normalize_name(name)).or_default();
		match releases.binary_search_by(|r| r.version.cmp(&release.version)) {
			Ok(i) => {
				log::trace!("Replacing release {} {}", name, release.version);
				releases[i] = release;
			},
			Err(i) => releases.insert(i, release),
		}
	}

	/// Releases of a project in ascending version order. Empty for unknown projects.
	pub fn releases(&self, name: &str) -> &[Release] {
		self.projects.get(&normalize_name(name)).map(Vec::as_slice).unwrap_or_default()
	}

	pub fn release(&self, name: &str, version: &Version) -> Option<&Release> {
		let releases = self.releases(name);
		releases.binary_search_by(|r| r.version.cmp(version)).ok().map(|i| &releases[i])
	}

	/// Normalized project names in the order they were first added.
	pub fn projects(&self) -> impl Iterator<Item = &str> + '_ {
		self.projects.keys().map(String::as_str)
	}

	pub fn len(&self) -> usize {
		self.projects.len()
	}

	pub fn is_empty(&self) -> bool {
		self.projects.is_empty()
	}
}

#[cfg(test)]
mod tests {
	use super::*;

	fn v(s: &str) -> Version { Version::new(s).unwrap() }

	#[test]
	fn json_names_are_normalized_and_versions_sorted() {
		let index = PackageIndex::from_json(r#"{
			"Zope.Interface": [
				{ "version": "5.0" },
				{ "version": "4.7.1", "dependencies": ["setuptools"], "yanked": true }
			]
		}"#).unwrap();
		assert_eq!(index.projects().collect::<Vec<_>>(), vec!["zope-interface"]);
		let versions: Vec<String> = index.releases("zope_interface").iter().map(|r| r.version.to_string()).collect();
		assert_eq!(versions, vec!["4.7.1", "5.0"]);
		assert!(index.release("ZOPE-interface", &v("4.7.1")).unwrap().yanked);
		assert!(!index.release("zope-interface", &v("5.0.0")).unwrap().yanked);
	}

	#[test]
	fn equal_versions_are_replaced() {
		let mut index = PackageIndex::new();
		index.add_release("a", Release::new(v("1.0")));
		index.add_release("A", Release::new(v("1.0.0")).with_dependencies(["b"]));
		assert_eq!(index.releases("a").len(), 1);
		assert_eq!(index.releases("a")[0].dependencies, vec!["b".to_string()]);
	}

	#[test]
	fn unknown_project_has_no_releases() {
		assert!(PackageIndex::new().releases("nothing").is_empty());
		assert!(PackageIndex::new().release("nothing", &v("1.0")).is_none());
	}

	#[test]
	fn invalid_versions_are_json_errors() {
		assert!(matches!(PackageIndex::from_json(r#"{"a": [{"version": "not a version"}]}"#), Err(crate::Error::SerdeJSON(_))));
		assert!(matches!(PackageIndex::from_json(r#"{"a": [{"version": "1.0", "requires_python": ">>3"}]}"#), Err(crate::Error::SerdeJSON(_))));
	}

	#[test]
	fn json_round_trip_keeps_releases() {
		let mut index = PackageIndex::new();
		index.add_release("a", Release::new(v("1.0")).with_requires_python(SpecifierSet::parse(">=3.7").unwrap()));
		let copy = PackageIndex::from_json(&index.to_json().unwrap()).unwrap();
		assert_eq!(copy.releases("a"), index.releases("a"));
	}
}
