//! A minimal keyed directed graph used to record why a package is part of a resolve.
//!
//! Nodes are addressed by their key rather than by index; the index bookkeeping is kept
//! internal so callers can treat the graph as a set of keys with parent/child edges.

use std::hash::Hash;

use indexmap::IndexMap;
use petgraph::prelude::*;
use serde::{Serialize, Deserialize};

pub mod traces;
pub use traces::trace_graph;

/// Directed graph keyed by `K`.
///
/// `Clone` produces a fully independent copy, mutating one never affects the other.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(
	bound(
		serialize = "K: Serialize",
		deserialize = "K: Deserialize<'de> + Eq + Hash + std::fmt::Debug",
	),
	try_from = "RawGraph<K>",
)]
pub struct DirectedGraph<K> {
	graph: StableDiGraph<K, ()>,
	/* As pairs, keys such as `Option<K>` can not be JSON object keys */
	#[serde(with = "indexmap::map::serde_seq")]
	indices: IndexMap<K, NodeIndex>,
}

/// Serialized form of [`DirectedGraph`], checked before use.
#[derive(Deserialize)]
#[serde(bound(deserialize = "K: Deserialize<'de> + Eq + Hash"))]
struct RawGraph<K> {
	graph: StableDiGraph<K, ()>,
	#[serde(with = "indexmap::map::serde_seq")]
	indices: IndexMap<K, NodeIndex>,
}

impl<K> TryFrom<RawGraph<K>> for DirectedGraph<K>
where K: Eq + Hash + std::fmt::Debug,
{
	type Error = crate::Error;

	/// Every node must be indexed exactly once, under its own key.
	fn try_from(raw: RawGraph<K>) -> crate::Result<Self> {
		if raw.indices.len() != raw.graph.node_count() {
			return Err(crate::Error::Validation(format!(
				"graph has {} nodes but {} indices",
				raw.graph.node_count(),
				raw.indices.len(),
			)));
		}
		for (key, i) in &raw.indices {
			if raw.graph.node_weight(*i) != Some(key) {
				return Err(crate::Error::Validation(format!("index of {:?} does not point at its node", key)));
			}
		}
		Ok(Self {
			graph: raw.graph,
			indices: raw.indices,
		})
	}
}

impl<K> Default for DirectedGraph<K> {
	fn default() -> Self {
		Self {
			graph: StableDiGraph::default(),
			indices: IndexMap::new(),
		}
	}
}

impl<K> DirectedGraph<K>
where K: Clone + Eq + Hash + std::fmt::Debug,
{
	pub fn new() -> Self {
		Self::default()
	}

	pub fn len(&self) -> usize {
		self.indices.len()
	}

	pub fn is_empty(&self) -> bool {
		self.indices.is_empty()
	}

	pub fn contains(&self, node: &K) -> bool {
		self.indices.contains_key(node)
	}

	/// Nodes in insertion order.
	pub fn iter(&self) -> impl Iterator<Item = &K> + '_ {
		self.indices.keys()
	}

	/// Adds a node without any edges. Does nothing if it is already present.
	pub fn add(&mut self, node: K) {
		if self.indices.contains_key(&node) {
			return;
		}
		let i = self.graph.add_node(node.clone());
		self.indices.insert(node, i);
	}

	/// Removes a node along with every edge into or out of it.
	pub fn remove(&mut self, node: &K) -> crate::Result<()> {
		let i = self.indices.shift_remove(node)
			.ok_or_else(|| crate::Error::NodeNotFound(format!("{:?}", node)))?;
		self.graph.remove_node(i);
		Ok(())
	}

	/// Adds an edge from `parent` to `child`, both must already be in the graph.
	pub fn connect(&mut self, parent: &K, child: &K) -> crate::Result<()> {
		let a = self.index_of(parent)?;
		let b = self.index_of(child)?;
		self.graph.update_edge(a, b, ());
		Ok(())
	}

	/// Children of `node`. Empty when the node is not in the graph.
	pub fn iter_children<'a>(&'a self, node: &K) -> impl Iterator<Item = &'a K> + 'a {
		self.iter_neighbors(node, Outgoing)
	}

	/// Parents of `node`. Empty when the node is not in the graph.
	pub fn iter_parents<'a>(&'a self, node: &K) -> impl Iterator<Item = &'a K> + 'a {
		self.iter_neighbors(node, Incoming)
	}

	fn iter_neighbors<'a>(&'a self, node: &K, direction: petgraph::Direction) -> impl Iterator<Item = &'a K> + 'a {
		self.indices.get(node)
			.copied()
			.into_iter()
			.flat_map(move |i| self.graph.neighbors_directed(i, direction))
			.map(move |i| &self.graph[i])
	}

	fn index_of(&self, node: &K) -> crate::Result<NodeIndex> {
		self.indices.get(node)
			.copied()
			.ok_or_else(|| crate::Error::NodeNotFound(format!("{:?}", node)))
	}
}
