//! Simplify/select graph coloring
//!
//! Simplify removes nodes of degree below K onto a stack, lowest id first.
//! When every remaining node has degree K or more, the node with the
//! highest degree (lowest id on ties) is pushed as a forced spill candidate.
//! Select pops the stack and gives each node the lowest register unused by
//! its colored neighbors; a node with no free register gets the next spill
//! slot. Candidates are colored optimistically, so a forced spill may still
//! end up in a register.

use super::interference::InterferenceGraph;
use crate::compiler::error::{CompileError, CompileResult};
use crate::compiler::ir::SymId;
use crate::compiler::options::MAX_REGISTERS;
use std::collections::{BTreeMap, BTreeSet};

/// Where a symbol lives at runtime
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum Location {
    /// Physical register `r{n}`, below K
    Register(u8),
    /// Indexed spill slot
    Spill(u32),
}

impl std::fmt::Display for Location {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Location::Register(r) => write!(f, "r{}", r),
            Location::Spill(s) => write!(f, "slot{}", s),
        }
    }
}

/// Result of register allocation
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Allocation {
    /// Location of every graph node
    pub locations: BTreeMap<SymId, Location>,
    /// Nodes picked as spill candidates during simplify
    pub forced_spills: BTreeSet<SymId>,
}

impl Allocation {
    /// Location of a symbol
    pub fn get(&self, sym: SymId) -> Option<Location> {
        self.locations.get(&sym).copied()
    }

    /// Registers used (highest register index plus one)
    pub fn register_count(&self) -> usize {
        self.locations
            .values()
            .filter_map(|l| match l {
                Location::Register(r) => Some(*r as usize + 1),
                Location::Spill(_) => None,
            })
            .max()
            .unwrap_or(0)
    }

    /// Spill slots used
    pub fn slot_count(&self) -> usize {
        self.locations
            .values()
            .filter(|l| matches!(l, Location::Spill(_)))
            .count()
    }

    /// Symbols that ended up in a spill slot
    pub fn spilled(&self) -> impl Iterator<Item = SymId> + '_ {
        self.locations
            .iter()
            .filter(|(_, l)| matches!(l, Location::Spill(_)))
            .map(|(s, _)| *s)
    }
}

/// Graph-coloring register allocator with a palette of K registers
#[derive(Debug, Clone, Copy)]
pub struct RegisterAllocator {
    k: usize,
}

impl RegisterAllocator {
    /// Create an allocator for `k` registers (1 to 253)
    pub fn new(k: usize) -> CompileResult<Self> {
        if k == 0 || k > MAX_REGISTERS as usize {
            return Err(CompileError::InvalidConfig {
                message: format!("register count must be between 1 and {}, got {}", MAX_REGISTERS, k),
            });
        }
        Ok(Self { k })
    }

    /// Palette size
    pub fn k(&self) -> usize {
        self.k
    }

    /// Color `graph`
    pub fn allocate(&self, graph: &InterferenceGraph) -> Allocation {
        let (stack, forced_spills) = self.simplify(graph);
        let locations = self.select(graph, stack);

        let allocation = Allocation {
            locations,
            forced_spills,
        };
        log::debug!(
            "allocated {} symbol(s): {} register(s), {} spill slot(s), {} forced candidate(s)",
            allocation.locations.len(),
            allocation.register_count(),
            allocation.slot_count(),
            allocation.forced_spills.len()
        );
        allocation
    }

    fn simplify(&self, graph: &InterferenceGraph) -> (Vec<SymId>, BTreeSet<SymId>) {
        let mut work = graph.clone();
        let mut stack = Vec::with_capacity(work.node_count());
        let mut forced = BTreeSet::new();

        while !work.is_empty() {
            let trivial = work.nodes().find(|n| work.degree(*n) < self.k);
            let node = match trivial {
                Some(node) => node,
                None => {
                    // max_by_key keeps the last maximum; scan in reverse so
                    // the lowest id wins a tie
                    let Some(node) = work.nodes().rev().max_by_key(|n| work.degree(*n)) else {
                        break;
                    };
                    log::trace!("spill candidate {} (degree {})", node, work.degree(node));
                    forced.insert(node);
                    node
                }
            };
            work.remove_node(node);
            stack.push(node);
        }
        (stack, forced)
    }

    fn select(&self, graph: &InterferenceGraph, mut stack: Vec<SymId>) -> BTreeMap<SymId, Location> {
        let mut locations = BTreeMap::new();
        let mut next_slot = 0u32;

        while let Some(node) = stack.pop() {
            let taken: BTreeSet<u8> = graph
                .neighbors(node)
                .filter_map(|n| match locations.get(&n) {
                    Some(Location::Register(r)) => Some(*r),
                    _ => None,
                })
                .collect();

            let free = (0..self.k).map(|r| r as u8).find(|r| !taken.contains(r));
            let location = match free {
                Some(r) => Location::Register(r),
                None => {
                    let slot = next_slot;
                    next_slot += 1;
                    Location::Spill(slot)
                }
            };
            locations.insert(node, location);
        }
        locations
    }
}
