//! Finds a consistent set of pinned candidates for a list of requirements.
//!
//! # Usage
//! 1. Implement [`Provider`] for your package source.
//! 1. Create a [`Resolver`] from the provider and a [`Reporter`] ([`BaseReporter`](crate::BaseReporter) if progress is not needed).
//! 1. [`Resolver::resolve()`] the user requirements.
//! 1. Read the pins from [`State::mapping`] and why each was needed from [`State::graph`].
//!
//! # Process
//! Every requirement is grouped by its identifier into a [`Criterion`] holding the candidates that are
//! still possible. Resolution then runs in rounds, each round trying to pin every criterion whose current
//! pin is missing or no longer acceptable. A candidate is only pinned if all of its dependencies can be
//! merged into the existing criteria, otherwise the criteria are rolled back and the next candidate is tried.
//! Resolution stops at the first round that does not add a pin.

use std::hash::Hash;

use indexmap::IndexMap;
use serde::{Serialize, Deserialize};

use crate::directed_graph::DirectedGraph;
use crate::provider::Provider;
use crate::reporter::Reporter;

mod criterion;
pub use criterion::Criterion;
pub use criterion::RequirementInformation;
pub use criterion::RequirementsConflicted;

mod error;
pub use error::ResolutionError;

mod resolution;
pub use resolution::Resolution;

/// State of the resolve after a round.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(bound(
	serialize = "K: Serialize, C: Serialize",
	deserialize = "K: Deserialize<'de> + Eq + Hash + std::fmt::Debug, C: Deserialize<'de>",
))]
pub struct State<K, C> {
	/// The candidate pinned for each identifier.
	pub mapping: IndexMap<K, C>,
	/// Why each identifier is included. `None` is the parent of user requirements.
	pub graph: DirectedGraph<Option<K>>,
}

impl<K, C> State<K, C>
where K: Clone + Eq + Hash + std::fmt::Debug,
{
	/// An empty state containing only the root.
	pub fn new() -> Self {
		let mut graph = DirectedGraph::new();
		graph.add(None);
		Self {
			mapping: IndexMap::new(),
			graph,
		}
	}
}

impl<K, C> Default for State<K, C>
where K: Clone + Eq + Hash + std::fmt::Debug,
{
	fn default() -> Self {
		Self::new()
	}
}

/// The final state of a resolve using provider `P`.
pub type ResolvedState<P> = State<<P as Provider>::Identifier, <P as Provider>::Candidate>;

/// The thing that performs the actual resolution work.
#[derive(Debug)]
pub struct Resolver<P, R = crate::BaseReporter> {
	provider: P,
	reporter: R,
}

impl<P, R> Resolver<P, R>
where P: Provider, R: Reporter<P::Identifier, P::Candidate>,
{
	pub fn new(provider: P, reporter: R) -> Self {
		Self { provider, reporter }
	}

	pub fn provider(&self) -> &P {
		&self.provider
	}

	pub fn reporter(&self) -> &R {
		&self.reporter
	}

	pub fn into_parts(self) -> (P, R) {
		(self.provider, self.reporter)
	}

	/// Takes a collection of requirements and produces the pins satisfying all of them.
	///
	/// # Errors
	/// - [`ResolutionError::NoVersionsAvailable`]: A user requirement has no candidates at all.
	/// - [`ResolutionError::ResolutionImpossible`]: No combination of candidates satisfies the requirements.
	/// - [`ResolutionError::ResolutionTooDeep`]: No stable result within `max_rounds` rounds.
	/// This is usually caused by a circular dependency, raising `max_rounds` may help.
	/// - [`ResolutionError::Provider`]: The provider failed, the error is passed through untouched.
	pub fn resolve(&mut self, requirements: impl IntoIterator<Item = P::Requirement>, max_rounds: usize) -> Result<ResolvedState<P>, ResolutionError<P>> {
		let mut resolution = Resolution::new(&self.provider, &mut self.reporter);
		let state = resolution.resolve(requirements, max_rounds)?;
		Ok(state.clone())
	}
}
