use std::rc::Rc;

use super::ResolutionError;
use crate::provider::Provider;

/// A requirement along with the candidate that introduced it.
#[derive(Debug, Clone, PartialEq)]
pub struct RequirementInformation<R, C> {
	pub requirement: R,
	/// `None` for requirements given by the user.
	pub parent: Option<C>,
}

impl<R, C> RequirementInformation<R, C> {
	pub fn new(requirement: R, parent: Option<C>) -> Self {
		Self { requirement, parent }
	}
}

/// Everything known about a single identifier during a resolve.
///
/// - `information` records every requirement contributing to this criterion and where it came from.
/// - `candidates` holds the candidates satisfying all of those requirements. It is never empty.
///
/// Criteria are never modified, narrowing one produces a new criterion. This keeps the old one
/// intact for the resolver to fall back on.
#[derive(Debug, Clone)]
pub struct Criterion<R, C> {
	candidates: Vec<C>,
	information: Vec<RequirementInformation<R, C>>,
}

/// Adding a requirement to `criterion` would leave it without candidates.
///
/// Handled inside [`Resolution`](super::Resolution), a resolve never returns this.
#[derive(Debug, thiserror::Error)]
#[error("requirements conflicted")]
pub struct RequirementsConflicted<R, C> {
	criterion: Rc<Criterion<R, C>>,
}

impl<R, C> RequirementsConflicted<R, C> {
	/// The criterion as it was before the conflicting requirement.
	pub fn criterion(&self) -> &Criterion<R, C> {
		&self.criterion
	}
}

impl<R: Clone, C: Clone> Criterion<R, C> {
	/// Builds a criterion from the first requirement seen for an identifier.
	///
	/// Fails with [`ResolutionError::NoVersionsAvailable`] when the provider has no candidates for it.
	pub fn from_requirement<P>(provider: &P, requirement: R, parent: Option<C>) -> Result<Self, ResolutionError<P>>
	where P: Provider<Requirement = R, Candidate = C>,
	{
		let candidates = provider.find_matches(&requirement).map_err(ResolutionError::Provider)?;
		if candidates.is_empty() {
			return Err(ResolutionError::NoVersionsAvailable { requirement, parent });
		}
		Ok(Self {
			candidates,
			information: vec![RequirementInformation::new(requirement, parent)],
		})
	}

	/// Builds a new criterion narrowed by an additional requirement. `self` is left untouched.
	pub fn merged_with<P>(self: &Rc<Self>, provider: &P, requirement: R, parent: Option<C>) -> Result<Self, RequirementsConflicted<R, C>>
	where P: Provider<Requirement = R, Candidate = C>,
	{
		let candidates: Vec<C> = self.candidates.iter()
			.filter(|c| provider.is_satisfied_by(&requirement, c))
			.cloned()
			.collect();
		if candidates.is_empty() {
			return Err(RequirementsConflicted { criterion: Rc::clone(self) });
		}
		let mut information = self.information.clone();
		information.push(RequirementInformation::new(requirement, parent));
		Ok(Self { candidates, information })
	}
}

impl<R, C> Criterion<R, C> {
	/// Remaining candidates, least preferred first.
	pub fn candidates(&self) -> &[C] {
		&self.candidates
	}

	pub fn information(&self) -> &[RequirementInformation<R, C>] {
		&self.information
	}

	pub fn iter_requirement(&self) -> impl Iterator<Item = &R> + '_ {
		self.information.iter().map(|i| &i.requirement)
	}

	pub fn iter_parent(&self) -> impl Iterator<Item = Option<&C>> + '_ {
		self.information.iter().map(|i| i.parent.as_ref())
	}
}
