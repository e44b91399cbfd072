use std::rc::Rc;

use indexmap::{IndexMap, IndexSet};

use super::error::Contribution;
use super::{Criterion, RequirementInformation, ResolutionError, ResolvedState, State};
use crate::provider::Provider;
use crate::reporter::Reporter;

type Criteria<P> = IndexMap<
	<P as Provider>::Identifier,
	Rc<Criterion<<P as Provider>::Requirement, <P as Provider>::Candidate>>,
>;
type CriterionOf<P> = Criterion<<P as Provider>::Requirement, <P as Provider>::Candidate>;

/// A single resolve in progress.
///
/// Most users want [`Resolver`](super::Resolver), this type is for callers that need to look at
/// the last state after a failure.
pub struct Resolution<'a, P: Provider, R> {
	provider: &'a P,
	reporter: &'a mut R,
	/// Criteria are shared between snapshots and replaced rather than modified,
	/// so cloning the map is enough to roll back.
	criteria: Criteria<P>,
	states: Vec<ResolvedState<P>>,
	resolved: bool,
}

impl<'a, P, R> Resolution<'a, P, R>
where P: Provider, R: Reporter<P::Identifier, P::Candidate>,
{
	pub fn new(provider: &'a P, reporter: &'a mut R) -> Self {
		Self {
			provider,
			reporter,
			criteria: IndexMap::new(),
			states: Vec::new(),
			resolved: false,
		}
	}

	/// The state at the end of the last round that made progress.
	pub fn state(&self) -> Option<&ResolvedState<P>> {
		self.states.last()
	}

	fn contribute_to_criteria(&mut self, name: P::Identifier, requirement: P::Requirement, parent: Option<P::Candidate>) -> Result<(), Contribution<P>> {
		let criterion = match self.criteria.get(&name) {
			Some(existing) => existing.merged_with(self.provider, requirement, parent).map_err(Contribution::Conflicted)?,
			None => Criterion::from_requirement(self.provider, requirement, parent).map_err(Contribution::Failed)?,
		};
		self.criteria.insert(name, Rc::new(criterion));
		Ok(())
	}

	fn get_preference(&self, state: &ResolvedState<P>, name: &P::Identifier, criterion: &CriterionOf<P>) -> P::Preference {
		self.provider.get_preference(
			state.mapping.get(name),
			criterion.candidates(),
			criterion.information(),
		)
	}

	fn is_current_pin_satisfying(&self, state: &ResolvedState<P>, name: &P::Identifier, criterion: &CriterionOf<P>) -> bool {
		match state.mapping.get(name) {
			Some(pin) => criterion.iter_requirement().all(|r| self.provider.is_satisfied_by(r, pin)),
			None => false,
		}
	}

	/// Merges the dependencies of `candidate` into the criteria.
	///
	/// Returns the identifiers of the dependencies on success. If any dependency can not be merged
	/// the criteria are restored to exactly what they were and `None` is returned.
	fn check_pinnability(&mut self, candidate: &P::Candidate, dependencies: Vec<P::Requirement>) -> Result<Option<IndexSet<P::Identifier>>, ResolutionError<P>> {
		let backup = self.criteria.clone();
		let mut contributed = IndexSet::new();
		for dependency in dependencies {
			let key = self.provider.identify_requirement(&dependency);
			let Err(e) = self.contribute_to_criteria(key.clone(), dependency, Some(candidate.clone())) else {
				contributed.insert(key);
				continue;
			};
			self.criteria = backup;
			return match e {
				Contribution::Conflicted(conflict) => {
					log::debug!("{:?} conflicts with {} existing requirements on {:?}", candidate, conflict.criterion().information().len(), key);
					Ok(None)
				},
				/* A dependency nobody can provide only rules out this candidate */
				Contribution::Failed(ResolutionError::NoVersionsAvailable { requirement, .. }) => {
					log::debug!("{:?} requires {:?} which has no versions", candidate, requirement);
					Ok(None)
				},
				Contribution::Failed(e) => Err(e),
			};
		}
		Ok(Some(contributed))
	}

	fn pin_candidate(&self, state: &mut ResolvedState<P>, name: &P::Identifier, criterion: &CriterionOf<P>, candidate: P::Candidate, child_names: &IndexSet<P::Identifier>) {
		let node = Some(name.clone());
		if state.graph.remove(&node).is_ok() {
			log::trace!("Replacing pin {:?} with {:?}", state.mapping.get(name), candidate);
		}
		state.mapping.insert(name.clone(), candidate);
		state.graph.add(node.clone());

		/* Endpoints that are not pinned yet get connected when they are */
		for parent in criterion.iter_parent() {
			let parent_node = parent.map(|p| self.provider.identify_candidate(p));
			if state.graph.connect(&parent_node, &node).is_err() {
				log::trace!("Parent {:?} of {:?} is not pinned yet", parent_node, name);
			}
		}
		for child in child_names {
			if state.graph.connect(&node, &Some(child.clone())).is_err() {
				log::trace!("Dependency {:?} of {:?} is not pinned yet", child, name);
			}
		}
	}

	/// One round: tries to pin every criterion without a satisfying pin.
	fn pin_criteria(&mut self, state: &mut ResolvedState<P>) -> Result<(), ResolutionError<P>> {
		let mut names: Vec<(P::Preference, P::Identifier)> = self.criteria.iter()
			.map(|(name, criterion)| (self.get_preference(state, name, criterion), name.clone()))
			.collect();
		/* Stable so ties keep the order criteria were first seen in */
		names.sort_by(|a, b| a.0.cmp(&b.0));

		for (_, name) in names {
			/* Re-read, pins earlier in this round may have narrowed it */
			let Some(criterion) = self.criteria.get(&name).cloned() else {
				continue;
			};
			if self.is_current_pin_satisfying(state, &name, &criterion) {
				continue;
			}

			let mut pinned = false;
			for candidate in criterion.candidates().iter().rev() {
				log::trace!("Trying {:?}", candidate);
				let dependencies = self.provider.get_dependencies(candidate).map_err(ResolutionError::Provider)?;
				let Some(child_names) = self.check_pinnability(candidate, dependencies)? else {
					continue;
				};
				log::debug!("Pinned {:?}", candidate);
				self.pin_candidate(state, &name, &criterion, candidate.clone(), &child_names);
				pinned = true;
				break;
			}

			if !pinned {
				log::debug!("Every candidate for {:?} was rejected", name);
				return Err(ResolutionError::ResolutionImpossible {
					causes: criterion.information().to_vec(),
				});
			}
		}
		Ok(())
	}

	/// Runs the resolve. Can only be called once.
	pub fn resolve(&mut self, requirements: impl IntoIterator<Item = P::Requirement>, max_rounds: usize) -> Result<&ResolvedState<P>, ResolutionError<P>> {
		if self.resolved {
			return Err(ResolutionError::AlreadyResolved);
		}
		self.resolved = true;

		for requirement in requirements {
			let name = self.provider.identify_requirement(&requirement);
			match self.contribute_to_criteria(name, requirement.clone(), None) {
				Ok(()) => {},
				/* User requirements can never be rolled back */
				Err(Contribution::Conflicted(conflict)) => {
					let mut causes = conflict.criterion().information().to_vec();
					causes.push(RequirementInformation::new(requirement, None));
					return Err(ResolutionError::ResolutionImpossible { causes });
				},
				Err(Contribution::Failed(e)) => return Err(e),
			}
		}
		log::debug!("Resolving {} user requirements", self.criteria.len());

		self.reporter.starting();
		for round_index in 0..max_rounds {
			self.reporter.starting_round(round_index);
			log::trace!("Round {}", round_index);

			let mut state = match self.states.last() {
				Some(last) => last.clone(),
				None => State::new(),
			};
			self.pin_criteria(&mut state)?;

			/* Nothing new was pinned, the previous round is the answer */
			let converged = self.states.last().is_some_and(|last| last.mapping.len() == state.mapping.len());
			if converged {
				let last = &self.states[self.states.len() - 1];
				log::debug!("Resolved {} pins in {} rounds", last.mapping.len(), round_index + 1);
				self.reporter.ending(last);
				return Ok(last);
			}

			self.reporter.ending_round(round_index, &state);
			self.states.push(state);
		}

		Err(ResolutionError::ResolutionTooDeep { round_count: max_rounds })
	}
}

#[cfg(test)]
mod tests {
	use std::cell::RefCell;
	use std::collections::HashMap;

	use super::*;
	use crate::resolver::Resolver;

	#[derive(Debug, Clone, PartialEq)]
	struct Req {
		name: &'static str,
		min: u32,
		max: u32,
	}

	fn req(name: &'static str, min: u32, max: u32) -> Req {
		Req { name, min, max }
	}

	fn any(name: &'static str) -> Req {
		req(name, 0, u32::MAX)
	}

	#[derive(Debug, Clone, PartialEq)]
	struct Cand {
		name: &'static str,
		version: u32,
	}

	/// In memory index of `name -> [(version, dependencies)]`.
	#[derive(Default)]
	struct Toy {
		index: HashMap<&'static str, Vec<(u32, Vec<Req>)>>,
		/// `get_dependencies` fails for this package.
		broken: Option<&'static str>,
		dependency_calls: RefCell<Vec<Cand>>,
	}

	impl Toy {
		fn with(mut self, name: &'static str, version: u32, dependencies: Vec<Req>) -> Self {
			self.index.entry(name).or_default().push((version, dependencies));
			self
		}
	}

	impl Provider for Toy {
		type Requirement = Req;
		type Candidate = Cand;
		type Identifier = &'static str;
		type Preference = usize;
		type Err = std::io::Error;

		fn identify_requirement(&self, r: &Req) -> &'static str { r.name }
		fn identify_candidate(&self, c: &Cand) -> &'static str { c.name }

		fn get_preference(&self, _: Option<&Cand>, candidates: &[Cand], _: &[RequirementInformation<Req, Cand>]) -> usize {
			candidates.len()
		}

		fn find_matches(&self, r: &Req) -> Result<Vec<Cand>, std::io::Error> {
			let mut versions: Vec<u32> = self.index.get(r.name)
				.map(|v| v.iter().map(|(version, _)| *version).collect())
				.unwrap_or_default();
			versions.sort();
			Ok(versions.into_iter()
				.map(|version| Cand { name: r.name, version })
				.filter(|c| self.is_satisfied_by(r, c))
				.collect())
		}

		fn is_satisfied_by(&self, r: &Req, c: &Cand) -> bool {
			r.name == c.name && r.min <= c.version && c.version <= r.max
		}

		fn get_dependencies(&self, c: &Cand) -> Result<Vec<Req>, std::io::Error> {
			self.dependency_calls.borrow_mut().push(c.clone());
			if self.broken == Some(c.name) {
				return Err(std::io::Error::new(std::io::ErrorKind::Other, "index unavailable"));
			}
			Ok(self.index.get(c.name)
				.and_then(|v| v.iter().find(|(version, _)| *version == c.version))
				.map(|(_, d)| d.clone())
				.unwrap_or_default())
		}
	}

	#[derive(Debug, Default)]
	struct Recording {
		events: Vec<String>,
		rounds: Vec<IndexMap<&'static str, Cand>>,
	}

	impl Reporter<&'static str, Cand> for Recording {
		fn starting(&mut self) {
			self.events.push("starting".into());
		}
		fn starting_round(&mut self, index: usize) {
			self.events.push(format!("starting_round {}", index));
		}
		fn ending_round(&mut self, index: usize, state: &State<&'static str, Cand>) {
			self.events.push(format!("ending_round {}", index));
			self.rounds.push(state.mapping.clone());
		}
		fn ending(&mut self, _: &State<&'static str, Cand>) {
			self.events.push("ending".into());
		}
	}

	fn pins(state: &State<&'static str, Cand>) -> Vec<(&'static str, u32)> {
		state.mapping.iter().map(|(k, c)| (*k, c.version)).collect()
	}

	#[test]
	fn chain_is_pinned_with_edges() {
		let toy = Toy::default()
			.with("a", 1, vec![any("b")])
			.with("b", 1, vec![]);
		let mut resolver = Resolver::new(toy, Recording::default());
		let state = resolver.resolve(vec![any("a")], 20).unwrap();

		assert_eq!(pins(&state), vec![("a", 1), ("b", 1)]);
		assert_eq!(state.graph.iter_children(&None).collect::<Vec<_>>(), vec![&Some("a")]);
		assert_eq!(state.graph.iter_children(&Some("a")).collect::<Vec<_>>(), vec![&Some("b")]);
		assert_eq!(state.graph.iter_parents(&Some("b")).collect::<Vec<_>>(), vec![&Some("a")]);
	}

	#[test]
	fn stops_at_first_round_without_progress() {
		let toy = Toy::default()
			.with("a", 1, vec![any("b")])
			.with("b", 1, vec![]);
		let mut resolver = Resolver::new(toy, Recording::default());
		resolver.resolve(vec![any("a")], 20).unwrap();

		let (toy, reporter) = resolver.into_parts();
		assert_eq!(reporter.events, vec![
			"starting", "starting_round 0", "ending_round 0",
			"starting_round 1", "ending_round 1",
			"starting_round 2", "ending",
		]);
		/* The final round found every pin satisfying and asked for nothing */
		assert_eq!(toy.dependency_calls.borrow().len(), 2);
	}

	#[test]
	fn dependencies_found_mid_round_wait_for_next_round() {
		let toy = Toy::default()
			.with("a", 1, vec![any("b")])
			.with("b", 1, vec![]);
		let mut resolver = Resolver::new(toy, Recording::default());
		resolver.resolve(vec![any("a")], 20).unwrap();

		let rounds = &resolver.reporter().rounds;
		assert_eq!(rounds[0].keys().collect::<Vec<_>>(), vec![&"a"]);
		assert_eq!(rounds[1].keys().collect::<Vec<_>>(), vec![&"a", &"b"]);
	}

	#[test]
	fn criteria_narrowed_mid_round_are_reread() {
		/* `a` sorts first with one candidate and narrows `c` before `c` is pinned */
		let toy = Toy::default()
			.with("a", 1, vec![req("c", 1, 1)])
			.with("c", 1, vec![])
			.with("c", 2, vec![]);
		let mut resolver = Resolver::new(toy, Recording::default());
		let state = resolver.resolve(vec![any("a"), any("c")], 20).unwrap();

		assert_eq!(pins(&state), vec![("a", 1), ("c", 1)]);
		let rounds = &resolver.reporter().rounds;
		assert_eq!(rounds.len(), 1);
		assert_eq!(rounds[0]["c"].version, 1);
	}

	#[test]
	fn preference_order_is_fixed_for_the_round() {
		/* Sorted as b (2 candidates), x (3), a (4). Pinning `b` leaves `a` with one
		 * candidate but `a` is still handled after `x`. */
		let toy = Toy::default()
			.with("a", 1, vec![])
			.with("a", 2, vec![])
			.with("a", 3, vec![])
			.with("a", 4, vec![])
			.with("x", 1, vec![])
			.with("x", 2, vec![])
			.with("x", 3, vec![])
			.with("b", 1, vec![])
			.with("b", 2, vec![req("a", 1, 1)]);
		let mut resolver = Resolver::new(toy, Recording::default());
		let state = resolver.resolve(vec![any("a"), any("x"), any("b")], 20).unwrap();

		assert_eq!(pins(&state), vec![("b", 2), ("x", 3), ("a", 1)]);
		assert_eq!(resolver.reporter().rounds.len(), 1);
	}

	#[test]
	fn conflicting_user_requirements_are_impossible() {
		let toy = Toy::default().with("a", 1, vec![]).with("a", 2, vec![]);
		let mut resolver = Resolver::new(toy, Recording::default());
		match resolver.resolve(vec![req("a", 2, 9), req("a", 0, 1)], 20) {
			Err(ResolutionError::ResolutionImpossible { causes }) => {
				assert_eq!(causes, vec![
					RequirementInformation::new(req("a", 2, 9), None),
					RequirementInformation::new(req("a", 0, 1), None),
				]);
			},
			other => panic!("unexpected {:?}", other),
		}
		assert!(resolver.reporter().events.is_empty());
	}

	#[test]
	fn unknown_user_requirement_has_no_versions() {
		let mut resolver = Resolver::new(Toy::default(), Recording::default());
		match resolver.resolve(vec![any("x")], 20) {
			Err(ResolutionError::NoVersionsAvailable { requirement, parent }) => {
				assert_eq!(requirement, any("x"));
				assert_eq!(parent, None);
			},
			other => panic!("unexpected {:?}", other),
		}
	}

	#[test]
	fn candidate_with_missing_dependency_is_skipped() {
		let toy = Toy::default()
			.with("a", 1, vec![])
			.with("a", 2, vec![req("b", 1, 1)]);
		let mut resolver = Resolver::new(toy, Recording::default());
		let state = resolver.resolve(vec![any("a")], 20).unwrap();

		assert_eq!(pins(&state), vec![("a", 1)]);
		assert!(!state.graph.contains(&Some("b")));
	}

	#[test]
	fn dependency_conflict_falls_back_to_older_candidate() {
		let toy = Toy::default()
			.with("a", 1, vec![any("c")])
			.with("a", 2, vec![req("c", 2, 2)])
			.with("c", 1, vec![])
			.with("c", 2, vec![]);
		let mut resolver = Resolver::new(toy, Recording::default());
		let state = resolver.resolve(vec![any("a"), req("c", 1, 1)], 20).unwrap();

		assert_eq!(state.mapping["a"].version, 1);
		assert_eq!(state.mapping["c"].version, 1);
	}

	#[test]
	fn every_candidate_rejected_is_impossible() {
		let toy = Toy::default()
			.with("a", 1, vec![req("c", 2, 2)])
			.with("c", 1, vec![])
			.with("c", 2, vec![]);
		let mut resolver = Resolver::new(toy, Recording::default());
		match resolver.resolve(vec![req("c", 1, 1), any("a")], 20) {
			Err(ResolutionError::ResolutionImpossible { causes }) => {
				assert_eq!(causes, vec![RequirementInformation::new(any("a"), None)]);
			},
			other => panic!("unexpected {:?}", other),
		}
	}

	#[test]
	fn rejected_candidate_leaves_criteria_untouched() {
		let toy = Toy::default()
			.with("a", 1, vec![])
			.with("a", 2, vec![any("b"), req("c", 2, 2)])
			.with("b", 1, vec![])
			.with("c", 1, vec![])
			.with("c", 2, vec![]);
		let mut reporter = Recording::default();
		let mut resolution = Resolution::new(&toy, &mut reporter);
		resolution.contribute_to_criteria("a", any("a"), None).ok().unwrap();
		resolution.contribute_to_criteria("c", req("c", 1, 1), None).ok().unwrap();
		let before = resolution.criteria.clone();

		let a2 = Cand { name: "a", version: 2 };
		let dependencies = toy.get_dependencies(&a2).unwrap();
		assert!(resolution.check_pinnability(&a2, dependencies).unwrap().is_none());

		assert_eq!(resolution.criteria.keys().collect::<Vec<_>>(), before.keys().collect::<Vec<_>>());
		for (name, criterion) in &before {
			assert!(Rc::ptr_eq(criterion, &resolution.criteria[name]));
		}
	}

	#[test]
	fn accepted_candidate_reports_its_dependencies() {
		let toy = Toy::default()
			.with("a", 1, vec![any("b"), any("c"), any("b")])
			.with("b", 1, vec![])
			.with("c", 1, vec![]);
		let mut reporter = Recording::default();
		let mut resolution = Resolution::new(&toy, &mut reporter);

		let a1 = Cand { name: "a", version: 1 };
		let dependencies = toy.get_dependencies(&a1).unwrap();
		let children = resolution.check_pinnability(&a1, dependencies).unwrap().unwrap();
		assert_eq!(children.into_iter().collect::<Vec<_>>(), vec!["b", "c"]);
		assert_eq!(resolution.criteria["b"].information().len(), 2);
	}

	#[test]
	fn too_few_rounds_is_too_deep() {
		let toy = Toy::default()
			.with("a", 1, vec![any("b")])
			.with("b", 1, vec![]);
		let mut resolver = Resolver::new(toy, Recording::default());
		match resolver.resolve(vec![any("a")], 1) {
			Err(ResolutionError::ResolutionTooDeep { round_count }) => assert_eq!(round_count, 1),
			other => panic!("unexpected {:?}", other),
		}
		assert_eq!(resolver.reporter().events.last().map(String::as_str), Some("ending_round 0"));
	}

	#[test]
	fn empty_requirements_need_two_rounds() {
		let mut resolver = Resolver::new(Toy::default(), Recording::default());
		assert!(matches!(resolver.resolve(vec![], 1), Err(ResolutionError::ResolutionTooDeep { round_count: 1 })));

		let state = resolver.resolve(vec![], 2).unwrap();
		assert!(state.mapping.is_empty());
		assert_eq!(state.graph.len(), 1);
	}

	#[test]
	fn cycles_settle() {
		let toy = Toy::default()
			.with("a", 1, vec![any("b")])
			.with("b", 1, vec![any("a")]);
		let mut resolver = Resolver::new(toy, Recording::default());
		let state = resolver.resolve(vec![any("a")], 20).unwrap();

		assert_eq!(pins(&state), vec![("a", 1), ("b", 1)]);
		assert_eq!(state.graph.iter_children(&Some("b")).collect::<Vec<_>>(), vec![&Some("a")]);
		assert_eq!(state.graph.iter_children(&Some("a")).collect::<Vec<_>>(), vec![&Some("b")]);
	}

	#[test]
	fn provider_errors_pass_through() {
		let toy = Toy {
			broken: Some("b"),
			..Toy::default()
				.with("a", 1, vec![any("b")])
				.with("b", 1, vec![])
		};
		let mut resolver = Resolver::new(toy, Recording::default());
		match resolver.resolve(vec![any("a")], 20) {
			Err(ResolutionError::Provider(e)) => assert_eq!(e.to_string(), "index unavailable"),
			other => panic!("unexpected {:?}", other),
		}
	}

	#[test]
	fn resolution_runs_once() {
		let toy = Toy::default().with("a", 1, vec![]);
		let mut reporter = Recording::default();
		let mut resolution = Resolution::new(&toy, &mut reporter);
		assert!(resolution.resolve(vec![any("a")], 20).is_ok());
		assert!(matches!(resolution.resolve(vec![any("a")], 20), Err(ResolutionError::AlreadyResolved)));
		assert_eq!(resolution.state().map(|s| s.mapping.len()), Some(1));
	}

	#[test]
	fn same_input_same_output() {
		let build = || Toy::default()
			.with("a", 1, vec![any("c"), any("b")])
			.with("a", 2, vec![any("b"), req("c", 1, 1)])
			.with("b", 1, vec![any("d")])
			.with("c", 1, vec![any("d")])
			.with("c", 2, vec![])
			.with("d", 1, vec![]);
		let first = Resolver::new(build(), Recording::default()).resolve(vec![any("a")], 20).unwrap();
		let second = Resolver::new(build(), Recording::default()).resolve(vec![any("a")], 20).unwrap();

		assert_eq!(first.mapping, second.mapping);
		assert_eq!(first.mapping.keys().collect::<Vec<_>>(), second.mapping.keys().collect::<Vec<_>>());
		for node in first.graph.iter() {
			assert_eq!(
				first.graph.iter_children(node).collect::<Vec<_>>(),
				second.graph.iter_children(node).collect::<Vec<_>>(),
			);
		}
	}

	#[test]
	fn user_requirements_hang_off_the_root() {
		let toy = Toy::default()
			.with("a", 1, vec![any("b")])
			.with("b", 1, vec![]);
		let mut resolver = Resolver::new(toy, Recording::default());
		let state = resolver.resolve(vec![any("a"), any("b")], 20).unwrap();

		let mut roots: Vec<_> = state.graph.iter_children(&None).cloned().collect();
		roots.sort();
		assert_eq!(roots, vec![Some("a"), Some("b")]);
		assert_eq!(state.graph.iter_parents(&Some("b")).count(), 2);
	}
}
