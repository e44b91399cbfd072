use std::cell::RefCell;

use indexmap::{IndexMap, IndexSet};

use super::{Candidate, Environment, PackageIndex, Release, Requirement, Version};
use crate::locker::Lock;
use crate::provider::Provider;
use crate::resolver::RequirementInformation;

/// Projects that are part of the installer itself and never pinned.
pub const EXCLUDED_PROJECTS: &[&str] = &["pip", "setuptools"];

/// Resolves against an in-memory [`PackageIndex`] for one target [`Environment`].
#[derive(Debug, Clone)]
pub struct IndexProvider {
	index: PackageIndex,
	environment: Environment,
	python: Option<Version>,
	allow_prereleases: bool,
}

impl IndexProvider {
	pub fn new(index: PackageIndex, environment: Environment) -> Self {
		let python = environment.python_version();
		if python.is_none() {
			log::debug!("Environment has no Python version, requires_python is ignored");
		}
		Self {
			index,
			environment,
			python,
			allow_prereleases: false,
		}
	}

	/// Lets every requirement match pre-releases, not only those that name one.
	pub fn allow_prereleases(mut self, allow: bool) -> Self {
		self.allow_prereleases = allow;
		self
	}

	pub fn index(&self) -> &PackageIndex {
		&self.index
	}

	pub fn environment(&self) -> &Environment {
		&self.environment
	}

	fn supports_python(&self, release: &Release) -> bool {
		match (&release.requires_python, &self.python) {
			(Some(requires), Some(python)) => requires.contains(python, true),
			_ => true,
		}
	}
}

impl Provider for IndexProvider {
	type Requirement = Requirement;
	type Candidate = Candidate;
	type Identifier = String;
	type Preference = usize;
	type Err = crate::Error;

	fn identify_requirement(&self, requirement: &Requirement) -> String {
		requirement.identifier()
	}

	fn identify_candidate(&self, candidate: &Candidate) -> String {
		candidate.identifier()
	}

	/// Fewest remaining candidates first, they are the most likely to conflict.
	fn get_preference(&self, _resolution: Option<&Candidate>, candidates: &[Candidate], _information: &[RequirementInformation<Requirement, Candidate>]) -> usize {
		candidates.len()
	}

	fn find_matches(&self, requirement: &Requirement) -> crate::Result<Vec<Candidate>> {
		let exact = requirement.specifier.is_exact();
		let usable: Vec<&Release> = self.index.releases(&requirement.name).iter()
			.filter(|r| {
				if r.yanked && !exact {
					log::trace!("Skipping yanked {} {}", requirement.name, r.version);
					return false;
				}
				self.supports_python(r)
			})
			.collect();

		let versions = requirement.specifier.filter(usable.iter().map(|r| &r.version), self.allow_prereleases);
		log::trace!("{} matches {} of {} releases", requirement, versions.len(), usable.len());
		Ok(versions.into_iter()
			.map(|version| Candidate {
				name: requirement.name.clone(),
				version: version.clone(),
				extras: requirement.extras.clone(),
			})
			.collect())
	}

	fn is_satisfied_by(&self, requirement: &Requirement, candidate: &Candidate) -> bool {
		requirement.name == candidate.name && requirement.specifier.contains(&candidate.version, true)
	}

	fn get_dependencies(&self, candidate: &Candidate) -> crate::Result<Vec<Requirement>> {
		let release = self.index.release(&candidate.name, &candidate.version)
			.ok_or_else(|| crate::Error::CandidateNotFound(candidate.to_string()))?;

		let mut dependencies = Vec::new();
		/* Keeps every extras variant of a project on the same version */
		if !candidate.extras.is_empty() {
			dependencies.push(Requirement::pinned(&candidate.name, &candidate.version));
		}
		for line in &release.dependencies {
			let requirement = Requirement::parse(line)?;
			if let Some(marker) = &requirement.marker {
				if !marker.evaluate(&self.environment, &candidate.extras) {
					log::trace!("Skipping {} for {}, marker does not apply", requirement, candidate);
					continue;
				}
			}
			if EXCLUDED_PROJECTS.contains(&requirement.name.as_str()) {
				continue;
			}
			dependencies.push(requirement);
		}
		Ok(dependencies)
	}
}

/// Prefers previously pinned candidates, e.g. from an existing lock, so that relocking
/// only changes what it has to.
#[derive(Debug, Clone)]
pub struct PinReuseProvider<P: Provider> {
	inner: P,
	preferred: RefCell<IndexMap<P::Identifier, P::Candidate>>,
}

impl<P: Provider> PinReuseProvider<P> {
	pub fn new(inner: P, preferred: impl IntoIterator<Item = (P::Identifier, P::Candidate)>) -> Self {
		Self {
			inner,
			preferred: RefCell::new(preferred.into_iter().collect()),
		}
	}

	/// Prefers every pin of `lock`.
	pub fn from_lock(inner: P, lock: &Lock<P::Identifier, P::Candidate>) -> Self {
		Self::new(inner, lock.pins().clone())
	}

	pub fn inner(&self) -> &P {
		&self.inner
	}

	/// Stops preferring the pin of `key`, returning it.
	fn release(&self, key: &P::Identifier) -> Option<P::Candidate> {
		self.preferred.borrow_mut().shift_remove(key)
	}
}

impl<P> PinReuseProvider<P>
where P: Provider, P::Candidate: PartialEq,
{
	/// Moves the preferred pin for `requirement` to the end of `candidates`.
	///
	/// Returns the pin when that put it ahead of a candidate the inner provider preferred.
	fn promote(&self, requirement: &P::Requirement, candidates: &mut Vec<P::Candidate>) -> Option<P::Candidate> {
		let key = self.inner.identify_requirement(requirement);
		let pin = self.preferred.borrow().get(&key).cloned()?;
		if !self.inner.is_satisfied_by(requirement, &pin) {
			return None;
		}
		let already_last = candidates.last() == Some(&pin);
		candidates.retain(|c| c != &pin);
		candidates.push(pin.clone());
		(!already_last).then_some(pin)
	}
}

impl<P> Provider for PinReuseProvider<P>
where P: Provider, P::Candidate: PartialEq,
{
	type Requirement = P::Requirement;
	type Candidate = P::Candidate;
	type Identifier = P::Identifier;
	type Preference = P::Preference;
	type Err = P::Err;

	fn identify_requirement(&self, requirement: &Self::Requirement) -> Self::Identifier {
		self.inner.identify_requirement(requirement)
	}

	fn identify_candidate(&self, candidate: &Self::Candidate) -> Self::Identifier {
		self.inner.identify_candidate(candidate)
	}

	fn get_preference(
		&self,
		resolution: Option<&Self::Candidate>,
		candidates: &[Self::Candidate],
		information: &[RequirementInformation<Self::Requirement, Self::Candidate>],
	) -> Self::Preference {
		self.inner.get_preference(resolution, candidates, information)
	}

	/// Moves the preferred pin to the end of the list when it satisfies `requirement`.
	fn find_matches(&self, requirement: &Self::Requirement) -> Result<Vec<Self::Candidate>, Self::Err> {
		let mut candidates = self.inner.find_matches(requirement)?;
		self.promote(requirement, &mut candidates);
		Ok(candidates)
	}

	fn is_satisfied_by(&self, requirement: &Self::Requirement, candidate: &Self::Candidate) -> bool {
		self.inner.is_satisfied_by(requirement, candidate)
	}

	fn get_dependencies(&self, candidate: &Self::Candidate) -> Result<Vec<Self::Requirement>, Self::Err> {
		self.inner.get_dependencies(candidate)
	}
}

/// Upgrades the tracked projects and, recursively, everything they depend on, while every
/// other project keeps its preferred pin where possible.
///
/// Tracked projects lose their preferred pins. Whenever a tracked candidate is expanded, its
/// dependencies become tracked too. Tracked projects are worked on before anything else.
#[derive(Debug, Clone)]
pub struct EagerUpgradeProvider<P: Provider> {
	reuse: PinReuseProvider<P>,
	tracked: RefCell<IndexSet<P::Identifier>>,
	/* Pins already moved ahead of newer candidates, stale once their project is tracked */
	promoted: RefCell<IndexMap<P::Identifier, P::Candidate>>,
}

impl<P> EagerUpgradeProvider<P>
where P: Provider, P::Candidate: PartialEq,
{
	pub fn new(reuse: PinReuseProvider<P>, tracked: impl IntoIterator<Item = P::Identifier>) -> Self {
		let tracked: IndexSet<P::Identifier> = tracked.into_iter().collect();
		for key in &tracked {
			reuse.release(key);
		}
		Self {
			reuse,
			tracked: RefCell::new(tracked),
			promoted: RefCell::new(IndexMap::new()),
		}
	}

	/// Prefers every pin of `lock` except those of `tracked` and their dependencies.
	pub fn from_lock(inner: P, lock: &Lock<P::Identifier, P::Candidate>, tracked: impl IntoIterator<Item = P::Identifier>) -> Self {
		Self::new(PinReuseProvider::from_lock(inner, lock), tracked)
	}

	pub fn inner(&self) -> &P {
		self.reuse.inner()
	}

	pub fn is_tracked(&self, key: &P::Identifier) -> bool {
		self.tracked.borrow().contains(key)
	}

	fn track(&self, key: P::Identifier) {
		if self.reuse.release(&key).is_some() {
			log::debug!("Releasing pin of {:?} for upgrade", key);
		}
		self.tracked.borrow_mut().insert(key);
	}
}

impl<P> Provider for EagerUpgradeProvider<P>
where P: Provider, P::Candidate: PartialEq,
{
	type Requirement = P::Requirement;
	type Candidate = P::Candidate;
	type Identifier = P::Identifier;
	/// Tracked projects (`false`) sort first.
	type Preference = (bool, P::Preference);
	type Err = P::Err;

	fn identify_requirement(&self, requirement: &Self::Requirement) -> Self::Identifier {
		self.reuse.identify_requirement(requirement)
	}

	fn identify_candidate(&self, candidate: &Self::Candidate) -> Self::Identifier {
		self.reuse.identify_candidate(candidate)
	}

	fn get_preference(
		&self,
		resolution: Option<&Self::Candidate>,
		candidates: &[Self::Candidate],
		information: &[RequirementInformation<Self::Requirement, Self::Candidate>],
	) -> Self::Preference {
		let tracked = information.first()
			.is_some_and(|i| self.is_tracked(&self.identify_requirement(&i.requirement)));
		(!tracked, self.reuse.get_preference(resolution, candidates, information))
	}

	fn find_matches(&self, requirement: &Self::Requirement) -> Result<Vec<Self::Candidate>, Self::Err> {
		let mut candidates = self.reuse.inner().find_matches(requirement)?;
		if let Some(pin) = self.reuse.promote(requirement, &mut candidates) {
			self.promoted.borrow_mut().insert(self.identify_requirement(requirement), pin);
		}
		Ok(candidates)
	}

	/// Rejects a promoted pin once its project is tracked, so the newer candidates get their turn.
	fn is_satisfied_by(&self, requirement: &Self::Requirement, candidate: &Self::Candidate) -> bool {
		let key = self.identify_requirement(requirement);
		if self.is_tracked(&key) && self.promoted.borrow().get(&key) == Some(candidate) {
			log::trace!("Not reusing {:?}, {:?} is being upgraded", candidate, key);
			return false;
		}
		self.reuse.is_satisfied_by(requirement, candidate)
	}

	fn get_dependencies(&self, candidate: &Self::Candidate) -> Result<Vec<Self::Requirement>, Self::Err> {
		let dependencies = self.reuse.get_dependencies(candidate)?;
		if self.is_tracked(&self.identify_candidate(candidate)) {
			for dependency in &dependencies {
				self.track(self.identify_requirement(dependency));
			}
		}
		Ok(dependencies)
	}
}
