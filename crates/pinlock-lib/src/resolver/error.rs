use std::fmt;

use super::{RequirementInformation, RequirementsConflicted};
use crate::provider::Provider;

type Information<P> = RequirementInformation<<P as Provider>::Requirement, <P as Provider>::Candidate>;

/// Reasons a resolve can fail.
#[derive(thiserror::Error)]
pub enum ResolutionError<P: Provider> {
	/// The provider found nothing at all for a requirement.
	#[error("no versions available for {requirement:?}")]
	NoVersionsAvailable {
		requirement: P::Requirement,
		/// `None` when the requirement was given by the user.
		parent: Option<P::Candidate>,
	},
	/// Every candidate of some dependency was rejected.
	#[error("could not find a combination of candidates satisfying {}", describe_causes(.causes))]
	ResolutionImpossible {
		/// The requirements that could not be satisfied together.
		causes: Vec<Information<P>>,
	},
	/// Resolution did not settle within the allowed number of rounds.
	#[error("resolution did not settle after {round_count} rounds")]
	ResolutionTooDeep {
		round_count: usize,
	},
	/// The provider returned an error, it is passed through untouched.
	#[error("provider failed: {0}")]
	Provider(#[source] P::Err),
	/// A resolution object can only be used once.
	#[error("resolution has already been run")]
	AlreadyResolved,
}

fn describe_causes<R: fmt::Debug, C: fmt::Debug>(causes: &[RequirementInformation<R, C>]) -> String {
	causes.iter()
		.map(|i| match &i.parent {
			Some(parent) => format!("{:?} (from {:?})", i.requirement, parent),
			None => format!("{:?}", i.requirement),
		})
		.collect::<Vec<_>>()
		.join(", ")
}

impl<P: Provider> ResolutionError<P> {
	/// The requirements involved in the failure, empty when the failure is not about requirements.
	pub fn requirements(&self) -> Vec<&P::Requirement> {
		match self {
			Self::NoVersionsAvailable { requirement, .. } => vec![requirement],
			Self::ResolutionImpossible { causes } => causes.iter().map(|i| &i.requirement).collect(),
			_ => vec![],
		}
	}
}

impl<P: Provider> fmt::Debug for ResolutionError<P> {
	fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
		match self {
			Self::NoVersionsAvailable { requirement, parent } => f.debug_struct("NoVersionsAvailable")
				.field("requirement", requirement)
				.field("parent", parent)
				.finish(),
			Self::ResolutionImpossible { causes } => f.debug_struct("ResolutionImpossible")
				.field("causes", causes)
				.finish(),
			Self::ResolutionTooDeep { round_count } => f.debug_struct("ResolutionTooDeep")
				.field("round_count", round_count)
				.finish(),
			Self::Provider(e) => f.debug_tuple("Provider").field(e).finish(),
			Self::AlreadyResolved => write!(f, "AlreadyResolved"),
		}
	}
}

/// Why adding a requirement to the criteria failed.
pub(super) enum Contribution<P: Provider> {
	/// The requirement rules out every remaining candidate.
	Conflicted(RequirementsConflicted<P::Requirement, P::Candidate>),
	Failed(ResolutionError<P>),
}
