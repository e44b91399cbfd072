use std::fmt::Debug;
use std::hash::Hash;

use indexmap::IndexMap;

use super::Reporter;
use crate::resolver::State;

/// Writes the pins made each round to the [`log`] facade.
///
/// New pins are logged at `info`, changed pins at `debug`, along with the packages that
/// required them.
#[derive(Debug, Clone)]
pub struct LogReporter<K, C> {
	previous: Option<IndexMap<K, C>>,
}

impl<K, C> Default for LogReporter<K, C> {
	fn default() -> Self {
		Self { previous: None }
	}
}

impl<K, C> LogReporter<K, C> {
	pub fn new() -> Self {
		Self::default()
	}
}

fn describe_parents<K, C>(state: &State<K, C>, key: &K) -> String
where K: Clone + Eq + Hash + Debug, C: Debug,
{
	let parents: Vec<String> = state.graph.iter_parents(&Some(key.clone()))
		.map(|p| match p {
			None => "(user)".to_string(),
			Some(p) => match state.mapping.get(p) {
				Some(c) => format!("{:?}", c),
				None => format!("{:?}", p),
			},
		})
		.collect();
	parents.join(", ")
}

impl<K, C> Reporter<K, C> for LogReporter<K, C>
where K: Clone + Eq + Hash + Debug, C: Clone + PartialEq + Debug,
{
	fn starting(&mut self) {
		log::debug!("Starting resolution");
		self.previous = None;
	}

	fn ending_round(&mut self, index: usize, state: &State<K, C>) {
		let mut added = 0;
		let mut changed = 0;
		for (key, candidate) in &state.mapping {
			match self.previous.as_ref().and_then(|p| p.get(key)) {
				None => {
					added += 1;
					log::info!("New pin {:?} <= {}", candidate, describe_parents(state, key));
				},
				Some(old) if old != candidate => {
					changed += 1;
					log::debug!("Changed pin {:?} -> {:?} <= {}", old, candidate, describe_parents(state, key));
				},
				Some(_) => {},
			}
		}
		log::info!("Round {} complete: {} new, {} changed, {} pinned", index, added, changed, state.mapping.len());
		self.previous = Some(state.mapping.clone());
	}

	fn ending(&mut self, state: &State<K, C>) {
		log::info!("Resolution complete with {} pins", state.mapping.len());
	}
}
