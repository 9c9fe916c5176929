//! Interference graph
//!
//! One node per value-holding symbol and one undirected edge per pair of
//! symbols live at the same time. A definition interferes with everything
//! live across it, including when the defined value is never read, because
//! the write still occupies a register at that point. A table also
//! interferes with its own entries, since it is created before they are
//! read.

use super::liveness::Liveness;
use crate::compiler::error::CompileResult;
use crate::compiler::ir::{Block, SymId, Syms};
use std::collections::{BTreeMap, BTreeSet};
use std::fmt::Write;

/// Undirected interference graph with ordered adjacency
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct InterferenceGraph {
    adjacency: BTreeMap<SymId, BTreeSet<SymId>>,
}

impl InterferenceGraph {
    /// Create an empty graph
    pub fn new() -> Self {
        Self::default()
    }

    /// Build the graph for `blocks`
    ///
    /// With `debug` set, the nodes and edges are logged at debug level.
    pub fn build(blocks: &[Block], syms: &Syms, debug: bool) -> CompileResult<Self> {
        let liveness = Liveness::compute(blocks, syms)?;
        let mut graph = Self::new();

        for point in liveness.iter() {
            if let Some(def) = point.def {
                graph.add_node(def);
                for other in &point.live_after {
                    graph.add_edge(def, *other);
                }
                if point.early_def {
                    for operand in &point.uses {
                        graph.add_edge(def, *operand);
                    }
                }
            }
        }

        log::debug!(
            "interference graph: {} node(s), {} edge(s), max pressure {}",
            graph.node_count(),
            graph.edge_count(),
            liveness.max_pressure()
        );
        if debug {
            for line in graph.dump(syms).lines() {
                log::debug!("  {}", line);
            }
        }
        Ok(graph)
    }

    /// Add a node without edges
    pub fn add_node(&mut self, sym: SymId) {
        self.adjacency.entry(sym).or_default();
    }

    /// Add an undirected edge; self-edges are ignored
    pub fn add_edge(&mut self, a: SymId, b: SymId) {
        if a == b {
            self.add_node(a);
            return;
        }
        self.adjacency.entry(a).or_default().insert(b);
        self.adjacency.entry(b).or_default().insert(a);
    }

    /// Remove a node and its edges
    pub fn remove_node(&mut self, sym: SymId) {
        if let Some(neighbors) = self.adjacency.remove(&sym) {
            for n in neighbors {
                if let Some(set) = self.adjacency.get_mut(&n) {
                    set.remove(&sym);
                }
            }
        }
    }

    /// Check if two symbols interfere
    pub fn interferes(&self, a: SymId, b: SymId) -> bool {
        self.adjacency.get(&a).is_some_and(|s| s.contains(&b))
    }

    /// Neighbors of a node, in id order
    pub fn neighbors(&self, sym: SymId) -> impl Iterator<Item = SymId> + '_ {
        self.adjacency.get(&sym).into_iter().flatten().copied()
    }

    /// Number of neighbors of a node
    pub fn degree(&self, sym: SymId) -> usize {
        self.adjacency.get(&sym).map_or(0, BTreeSet::len)
    }

    /// Check if a symbol is a node
    pub fn contains(&self, sym: SymId) -> bool {
        self.adjacency.contains_key(&sym)
    }

    /// All nodes, in id order
    pub fn nodes(&self) -> impl DoubleEndedIterator<Item = SymId> + '_ {
        self.adjacency.keys().copied()
    }

    /// All edges as `(low, high)` pairs, in order
    pub fn edges(&self) -> impl Iterator<Item = (SymId, SymId)> + '_ {
        self.adjacency
            .iter()
            .flat_map(|(a, set)| set.iter().filter(move |b| a < *b).map(move |b| (*a, *b)))
    }

    /// Number of nodes
    pub fn node_count(&self) -> usize {
        self.adjacency.len()
    }

    /// Number of undirected edges
    pub fn edge_count(&self) -> usize {
        self.adjacency.values().map(BTreeSet::len).sum::<usize>() / 2
    }

    /// Check if the graph has no nodes
    pub fn is_empty(&self) -> bool {
        self.adjacency.is_empty()
    }

    /// Render one line per node: `x: t0, t3`
    pub fn dump(&self, syms: &Syms) -> String {
        let mut out = String::new();
        for (sym, neighbors) in &self.adjacency {
            let names: Vec<String> = neighbors.iter().map(|n| syms.name(*n)).collect();
            let _ = writeln!(out, "{}: {}", syms.name(*sym), names.join(", "));
        }
        out
    }
}
