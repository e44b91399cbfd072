//! The interface the resolver uses to learn about requirements and candidates.

use std::error::Error;
use std::fmt::Debug;
use std::hash::Hash;

use crate::resolver::RequirementInformation;

/// Supplies package knowledge to the [`Resolver`](crate::Resolver).
///
/// The resolver never looks inside requirements or candidates, every question about them goes
/// through this trait. Apart from errors, implementations should behave as pure functions:
/// the same inputs must produce the same answers for the lifetime of a resolve.
pub trait Provider {
	/// A constraint on a single logical dependency, e.g. `requests>=2.0`.
	type Requirement: Clone + Debug;
	/// One concrete installable version of a dependency.
	type Candidate: Clone + Debug;
	/// Groups requirements and candidates that refer to the same dependency.
	type Identifier: Clone + Eq + Hash + Debug;
	/// Sort key returned by [`Provider::get_preference`]. Smaller is resolved first.
	type Preference: Ord;
	/// Returning this from a fallible method aborts the whole resolve.
	type Err: Error + 'static;

	/// Identifier of a requirement. Must agree with [`Provider::identify_candidate`].
	fn identify_requirement(&self, requirement: &Self::Requirement) -> Self::Identifier;

	/// Identifier of a candidate. Must agree with [`Provider::identify_requirement`].
	fn identify_candidate(&self, candidate: &Self::Candidate) -> Self::Identifier;

	/// Produces a sort key deciding which outstanding dependency is worked on first.
	///
	/// - `resolution` is the candidate currently pinned for this dependency, if any.
	/// - `candidates` are the candidates still possible.
	/// - `information` lists every requirement contributing to this dependency and the candidate
	/// that introduced it (`None` for user requirements).
	fn get_preference(
		&self,
		resolution: Option<&Self::Candidate>,
		candidates: &[Self::Candidate],
		information: &[RequirementInformation<Self::Requirement, Self::Candidate>],
	) -> Self::Preference;

	/// Every candidate that satisfies `requirement`.
	///
	/// The resolver tries candidates from the **end** of the list, so the most preferred
	/// candidate must come last. An empty list means nothing is available and is not an error.
	fn find_matches(&self, requirement: &Self::Requirement) -> Result<Vec<Self::Candidate>, Self::Err>;

	/// Whether `candidate` is an acceptable solution for `requirement`.
	fn is_satisfied_by(&self, requirement: &Self::Requirement, candidate: &Self::Candidate) -> bool;

	/// The requirements `candidate` depends on.
	fn get_dependencies(&self, candidate: &Self::Candidate) -> Result<Vec<Self::Requirement>, Self::Err>;
}
