//! `ReferenceTracker` (spec §4.6): a directed multigraph of relations
//! between symbols — calls, uses, imports, implements, extends — with
//! BFS traversal for caller/callee queries.
//!
//! Built on `petgraph::graphmap::DiGraphMap` keyed directly by
//! `SymbolId`, so no separate node-index bookkeeping is needed; edges
//! carry a small `Reference` payload and the graph is a multigraph in
//! effect because a `Vec<Reference>` is stored per edge slot.

use std::collections::{HashSet, VecDeque};

use petgraph::graphmap::DiGraphMap;

use crate::ids::SymbolId;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, serde::Serialize, serde::Deserialize)]
pub enum ReferenceKind {
    Call,
    Use,
    Import,
    Implements,
    Extends,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, serde::Serialize, serde::Deserialize)]
pub enum ReferenceQuality {
    /// Resolved to an exact, unambiguous symbol definition.
    Exact,
    /// Resolved by name only, with more than one candidate definition.
    Heuristic,
}

/// One edge in the reference graph: `from` refers to `to` via `kind`.
#[derive(Debug, Clone, serde::Serialize, serde::Deserialize)]
pub struct Reference {
    pub from: SymbolId,
    pub to: SymbolId,
    pub kind: ReferenceKind,
    pub quality: ReferenceQuality,
    /// Relative confidence in this edge, e.g. down-weighted for a
    /// same-name-different-type heuristic match. `1.0` for `Exact`.
    pub strength: f32,
}

#[derive(Debug, Default)]
pub struct ReferenceTracker {
    graph: DiGraphMap<SymbolId, Vec<Reference>>,
}

impl ReferenceTracker {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn add_reference(&mut self, reference: Reference) {
        let (from, to) = (reference.from, reference.to);
        self.graph
            .edge_weight_mut(from, to)
            .map(|edges| edges.push(reference.clone()))
            .unwrap_or_else(|| {
                self.graph.add_edge(from, to, vec![reference]);
            });
    }

    pub fn edges_between(&self, from: SymbolId, to: SymbolId) -> &[Reference] {
        self.graph
            .edge_weight(from, to)
            .map(|v| v.as_slice())
            .unwrap_or(&[])
    }

    /// Symbols reachable from `symbol` by following reference edges
    /// forward, breadth-first, up to `max_depth` hops. Includes
    /// `symbol` itself at depth 0, so `get_callees(s, 0) == [s]` and
    /// every deeper call is a strict superset of the shallower one.
    /// Cycle-safe: a symbol already visited is never re-queued, so
    /// cyclic call graphs (mutual recursion) terminate.
    pub fn get_callees(&self, symbol: SymbolId, max_depth: u32) -> Vec<SymbolId> {
        self.bfs(symbol, max_depth, Direction::Outgoing)
    }

    /// Symbols that refer to `symbol`, same traversal in reverse.
    pub fn get_callers(&self, symbol: SymbolId, max_depth: u32) -> Vec<SymbolId> {
        self.bfs(symbol, max_depth, Direction::Incoming)
    }

    /// Whether `target` is reachable from `start` within `max_depth`
    /// hops, following reference edges forward.
    pub fn can_reach(&self, start: SymbolId, target: SymbolId, max_depth: u32) -> bool {
        self.get_callees(start, max_depth).contains(&target)
    }

    fn bfs(&self, start: SymbolId, max_depth: u32, direction: Direction) -> Vec<SymbolId> {
        let mut visited = HashSet::new();
        visited.insert(start);
        let mut result = vec![start];
        let mut queue = VecDeque::new();
        queue.push_back((start, 0u32));

        while let Some((node, depth)) = queue.pop_front() {
            if depth >= max_depth {
                continue;
            }
            let neighbors: Vec<SymbolId> = match direction {
                Direction::Outgoing => self
                    .graph
                    .neighbors_directed(node, petgraph::Direction::Outgoing)
                    .collect(),
                Direction::Incoming => self
                    .graph
                    .neighbors_directed(node, petgraph::Direction::Incoming)
                    .collect(),
            };
            // Deterministic order: petgraph's GraphMap neighbor order
            // follows insertion, but we additionally sort so repeated
            // queries are stable regardless of edge insertion order.
            let mut neighbors = neighbors;
            neighbors.sort_unstable();
            for next in neighbors {
                if visited.insert(next) {
                    result.push(next);
                    queue.push_back((next, depth + 1));
                }
            }
        }
        result
    }

    pub fn reference_count(&self) -> usize {
        self.graph.all_edges().map(|(_, _, v)| v.len()).sum()
    }
}

#[derive(Clone, Copy)]
enum Direction {
    Outgoing,
    Incoming,
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ids::{FileId, LocalSymbolId};

    fn sym(file: u32, local: u32) -> SymbolId {
        SymbolId::new(FileId(file), LocalSymbolId(local))
    }

    fn exact_ref(from: SymbolId, to: SymbolId, kind: ReferenceKind) -> Reference {
        Reference {
            from,
            to,
            kind,
            quality: ReferenceQuality::Exact,
            strength: 1.0,
        }
    }

    #[test]
    fn get_callees_finds_direct_call() {
        let mut tracker = ReferenceTracker::new();
        let a = sym(1, 1);
        let b = sym(1, 2);
        tracker.add_reference(exact_ref(a, b, ReferenceKind::Call));

        assert_eq!(tracker.get_callees(a, 5), vec![a, b]);
        assert!(tracker.get_callers(b, 5).contains(&a));
    }

    #[test]
    fn get_callees_at_depth_zero_is_just_the_seed() {
        let mut tracker = ReferenceTracker::new();
        let a = sym(1, 1);
        let b = sym(1, 2);
        tracker.add_reference(exact_ref(a, b, ReferenceKind::Call));

        assert_eq!(tracker.get_callees(a, 0), vec![a]);
    }

    #[test]
    fn bfs_is_cycle_safe_on_mutual_recursion() {
        let mut tracker = ReferenceTracker::new();
        let a = sym(1, 1);
        let b = sym(1, 2);
        tracker.add_reference(exact_ref(a, b, ReferenceKind::Call));
        tracker.add_reference(exact_ref(b, a, ReferenceKind::Call));

        // a appears exactly once (the seed); the cycle back to a from
        // b must not cause it to be revisited or loop forever.
        let callees = tracker.get_callees(a, 10);
        assert_eq!(callees, vec![a, b]);
        assert_eq!(callees.iter().filter(|&&s| s == a).count(), 1);
    }

    #[test]
    fn depth_limit_is_respected() {
        let mut tracker = ReferenceTracker::new();
        let a = sym(1, 1);
        let b = sym(1, 2);
        let c = sym(1, 3);
        tracker.add_reference(exact_ref(a, b, ReferenceKind::Call));
        tracker.add_reference(exact_ref(b, c, ReferenceKind::Call));

        assert_eq!(tracker.get_callees(a, 1), vec![a, b]);
        assert_eq!(tracker.get_callees(a, 2), vec![a, b, c]);
    }

    #[test]
    fn can_reach_self_trivially() {
        let tracker = ReferenceTracker::new();
        let a = sym(1, 1);
        assert!(tracker.can_reach(a, a, 0));
    }

    #[test]
    fn multiple_edges_between_same_pair_are_both_kept() {
        let mut tracker = ReferenceTracker::new();
        let a = sym(1, 1);
        let b = sym(1, 2);
        tracker.add_reference(exact_ref(a, b, ReferenceKind::Call));
        tracker.add_reference(exact_ref(a, b, ReferenceKind::Use));

        assert_eq!(tracker.edges_between(a, b).len(), 2);
    }
}
