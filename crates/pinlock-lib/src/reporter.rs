//! Observers for resolution progress.
//!
//! Reporters only watch, nothing they do can change the outcome of a resolve.

use crate::resolver::State;

mod log_reporter;
pub use log_reporter::LogReporter;

/// Lifecycle callbacks fired by a resolve. Every method defaults to doing nothing.
pub trait Reporter<K, C> {
	/// Called once the user requirements have been read and rounds are about to start.
	fn starting(&mut self) {}

	/// Called before round `index` starts pinning.
	fn starting_round(&mut self, _index: usize) {}

	/// Called after round `index` made progress, with the state it produced.
	fn ending_round(&mut self, _index: usize, _state: &State<K, C>) {}

	/// Called with the final state once a resolve is complete.
	fn ending(&mut self, _state: &State<K, C>) {}
}

/// Reporter that ignores every event.
#[derive(Debug, Default, Clone, Copy)]
pub struct BaseReporter;

impl<K, C> Reporter<K, C> for BaseReporter {}

impl<K, C, R: Reporter<K, C> + ?Sized> Reporter<K, C> for &mut R {
	fn starting(&mut self) {
		(**self).starting()
	}

	fn starting_round(&mut self, index: usize) {
		(**self).starting_round(index)
	}

	fn ending_round(&mut self, index: usize, state: &State<K, C>) {
		(**self).ending_round(index, state)
	}

	fn ending(&mut self, state: &State<K, C>) {
		(**self).ending(state)
	}
}
