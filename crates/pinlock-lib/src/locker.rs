//! Turns a resolve into a lock: the pins plus the paths that made each one necessary.

use std::hash::Hash;

use indexmap::{IndexMap, IndexSet};
use serde::{Serialize, Deserialize};

use crate::config::ResolverOptions;
use crate::directed_graph::trace_graph;
use crate::provider::Provider;
use crate::reporter::{BaseReporter, Reporter};
use crate::resolver::{ResolutionError, Resolver, State};

pub type Traces<K> = IndexMap<Option<K>, Vec<Vec<Option<K>>>>;

/// Result of a successful resolve.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(bound(
	serialize = "K: Serialize, C: Serialize",
	deserialize = "K: Deserialize<'de> + Eq + Hash + std::fmt::Debug, C: Deserialize<'de>",
))]
pub struct Lock<K, C> {
	pub state: State<K, C>,
	/// Paths from the root to every pinned identifier, see [`trace_graph`].
	#[serde(with = "indexmap::map::serde_seq")]
	pub traces: Traces<K>,
}

impl<K, C> Lock<K, C>
where K: Clone + Eq + Hash + std::fmt::Debug, C: Clone,
{
	pub fn from_state(state: State<K, C>) -> Self {
		let traces = trace_graph(&state.graph);
		Self { state, traces }
	}

	pub fn pins(&self) -> &IndexMap<K, C> {
		&self.state.mapping
	}

	/// The pins that are present because of the top level identifiers `roots`.
	///
	/// A pin is included when it is one of `roots` or when any path to it passes through one of them
	/// directly below the root. A single lock can be split into sections this way, e.g.
	/// default and development packages.
	pub fn derived_from<'a>(&self, roots: impl IntoIterator<Item = &'a K>) -> IndexMap<K, C>
	where K: 'a,
	{
		let roots: IndexSet<&K> = roots.into_iter().collect();
		self.state.mapping.iter()
			.filter(|(key, _)| {
				roots.contains(key) || self.traces.get(&Some((*key).clone()))
					.is_some_and(|paths| paths.iter().any(|path| {
						matches!(path.get(1), Some(Some(top)) if roots.contains(top))
					}))
			})
			.map(|(k, c)| (k.clone(), c.clone()))
			.collect()
	}
}

/// Resolves requirements into a [`Lock`] using the configured options.
#[derive(Debug)]
pub struct Locker<P, R = BaseReporter> {
	resolver: Resolver<P, R>,
	options: ResolverOptions,
}

impl<P, R> Locker<P, R>
where P: Provider, R: Reporter<P::Identifier, P::Candidate>,
{
	pub fn new(provider: P, reporter: R, options: ResolverOptions) -> Self {
		Self {
			resolver: Resolver::new(provider, reporter),
			options,
		}
	}

	pub fn options(&self) -> &ResolverOptions {
		&self.options
	}

	pub fn resolver(&self) -> &Resolver<P, R> {
		&self.resolver
	}

	pub fn lock(&mut self, requirements: impl IntoIterator<Item = P::Requirement>) -> Result<Lock<P::Identifier, P::Candidate>, ResolutionError<P>> {
		let state = self.resolver.resolve(requirements, self.options.max_rounds())?;
		log::debug!("Locked {} packages", state.mapping.len());
		Ok(Lock::from_state(state))
	}
}
