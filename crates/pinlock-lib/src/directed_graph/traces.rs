//! Walks a resolution graph to explain how each package was reached.

use std::hash::Hash;

use indexmap::IndexMap;

use super::DirectedGraph;

/// Every path from the root (`None`) to each vertex of `graph`.
///
/// A path lists the vertices visited before reaching the target, beginning with `None`.
/// A package required directly by the user therefore has the path `[None]`,
/// and the root itself maps to no paths at all.
pub fn trace_graph<K>(graph: &DirectedGraph<Option<K>>) -> IndexMap<Option<K>, Vec<Vec<Option<K>>>>
where K: Clone + Eq + Hash + std::fmt::Debug,
{
	let mut result = IndexMap::new();
	result.insert(None, Vec::new());

	for vertex in graph.iter() {
		let mut paths = Vec::new();
		for root in graph.iter_children(&None) {
			let mut path = vec![None];
			visit(graph, root, vertex, &mut path, &mut paths);
		}
		result.insert(vertex.clone(), paths);
	}

	result
}

fn visit<K>(graph: &DirectedGraph<Option<K>>, current: &Option<K>, target: &Option<K>, path: &mut Vec<Option<K>>, paths: &mut Vec<Vec<Option<K>>>)
where K: Clone + Eq + Hash + std::fmt::Debug,
{
	if current == target {
		paths.push(path.clone());
		return;
	}
	path.push(current.clone());
	for child in graph.iter_children(current) {
		/* Anything already on the path would be a cycle */
		if path.contains(child) {
			continue;
		}
		visit(graph, child, target, path, paths);
	}
	path.pop();
}
