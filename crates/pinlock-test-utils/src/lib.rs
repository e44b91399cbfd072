//! Various helper functions for testing
//!
//! functions in this module should use results and not use any panics to avoid confusion in callers

use pinlock::index::{Environment, IndexProvider, PackageIndex, Requirement};
use pinlock::{Reporter, State};

const INDEX_JSON: &str = include_str!("../test-data/index.json");

/// Gets the package index used in testing.
///
/// Contains a slice of a real index: `requests`, `flask` and `pytest` with their dependencies,
/// plus `legacy-client` which depends on a `urllib3` version that does not exist.
pub fn get_package_index() -> pinlock::Result<PackageIndex> {
	PackageIndex::from_json(INDEX_JSON)
}

/// CPython 3.10 on Linux.
pub fn get_environment() -> Environment {
	Environment::python("3.10.12")
		.with("sys_platform", "linux")
		.with("platform_system", "Linux")
		.with("os_name", "posix")
}

/// Provider over [`get_package_index`] for [`get_environment`].
pub fn get_provider() -> pinlock::Result<IndexProvider> {
	Ok(IndexProvider::new(get_package_index()?, get_environment()))
}

/// Parses a list of requirement strings.
pub fn requirements(lines: &[&str]) -> pinlock::Result<Vec<Requirement>> {
	lines.iter().map(|l| Requirement::parse(l)).collect()
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Event {
	Starting,
	StartingRound(usize),
	/// Round index and number of pins at the end of it.
	EndingRound(usize, usize),
	/// Number of pins in the final state.
	Ending(usize),
}

/// Reporter that records every event it receives.
#[derive(Debug, Default)]
pub struct RecordingReporter {
	pub events: Vec<Event>,
}

impl<K, C> Reporter<K, C> for RecordingReporter {
	fn starting(&mut self) {
		self.events.push(Event::Starting);
	}

	fn starting_round(&mut self, index: usize) {
		self.events.push(Event::StartingRound(index));
	}

	fn ending_round(&mut self, index: usize, state: &State<K, C>) {
		self.events.push(Event::EndingRound(index, state.mapping.len()));
	}

	fn ending(&mut self, state: &State<K, C>) {
		self.events.push(Event::Ending(state.mapping.len()));
	}
}
