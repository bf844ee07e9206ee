//! Adjacency construction, Kahn's-algorithm topological sort, and cycle
//! detection.
//!
//! Tie-breaking among zero-in-degree nodes follows insertion order of the
//! input node list, not a hash-based set, so that emission order (and
//! therefore emitted text) is deterministic across runs.

use crate::ir::{Edge, Node, NodeId};
use std::collections::{HashMap, HashSet, VecDeque};
use thiserror::Error;

/// What went wrong while building or ordering a graph.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum GraphErrorKind {
    /// An edge referenced a node id that isn't in the node list.
    UnknownNode,
    /// Kahn's algorithm produced fewer nodes than the input: the graph has a
    /// cycle.
    Cycle,
}

/// An error encountered while ordering a graph.
#[derive(Clone, Debug, Error, PartialEq, Eq)]
#[error("{}", describe(kind, node))]
pub struct GraphError {
    pub kind: GraphErrorKind,
    pub node: Option<NodeId>,
}

fn describe(kind: &GraphErrorKind, node: &Option<NodeId>) -> String {
    match kind {
        GraphErrorKind::UnknownNode => format!(
            "edge references unknown node {:?}",
            node.as_deref().unwrap_or("?")
        ),
        GraphErrorKind::Cycle => "cycle detected in graph".to_string(),
    }
}

impl GraphError {
    fn unknown_node(node: impl Into<NodeId>) -> Self {
        GraphError {
            kind: GraphErrorKind::UnknownNode,
            node: Some(node.into()),
        }
    }

    fn cycle() -> Self {
        GraphError {
            kind: GraphErrorKind::Cycle,
            node: None,
        }
    }
}

/// A resolved `(from, to)` connection, independent of whether it came from an
/// explicit edge list or a positional `inputs` fallback.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct Connection<'a> {
    pub from: &'a str,
    pub to: &'a str,
}

/// Yield the graph's connections: from `edges` if non-empty, else derived
/// from each node's positional `inputs` list in node order.
pub fn connections<'a>(nodes: &'a [Node], edges: &'a [Edge]) -> Vec<Connection<'a>> {
    if !edges.is_empty() {
        edges
            .iter()
            .map(|e| Connection {
                from: &e.from,
                to: &e.to,
            })
            .collect()
    } else {
        nodes
            .iter()
            .flat_map(|n| n.inputs.iter().map(move |src| Connection {
                from: src.as_str(),
                to: n.id.as_str(),
            }))
            .collect()
    }
}

/// Build out-adjacency and in-degree for `nodes` given `conns`, preserving
/// insertion order within each adjacency list.
///
/// Returns an error if any connection references a node id absent from
/// `nodes`.
fn build_adjacency(
    nodes: &[Node],
    conns: &[Connection],
) -> Result<(HashMap<NodeId, Vec<NodeId>>, HashMap<NodeId, usize>), GraphError> {
    let ids: HashSet<&str> = nodes.iter().map(|n| n.id.as_str()).collect();
    let mut adj: HashMap<NodeId, Vec<NodeId>> =
        nodes.iter().map(|n| (n.id.clone(), Vec::new())).collect();
    let mut indeg: HashMap<NodeId, usize> = nodes.iter().map(|n| (n.id.clone(), 0)).collect();
    for c in conns {
        if !ids.contains(c.from) {
            return Err(GraphError::unknown_node(c.from));
        }
        if !ids.contains(c.to) {
            return Err(GraphError::unknown_node(c.to));
        }
        adj.get_mut(c.from).unwrap().push(c.to.to_string());
        *indeg.get_mut(c.to).unwrap() += 1;
    }
    Ok((adj, indeg))
}

/// Produce a topological order of `nodes` given `conns`, using Kahn's
/// algorithm with insertion-order tie-breaking.
pub fn topo_order(nodes: &[Node], conns: &[Connection]) -> Result<Vec<NodeId>, GraphError> {
    let (adj, mut indeg) = build_adjacency(nodes, conns)?;
    let mut queue: VecDeque<NodeId> = nodes
        .iter()
        .filter(|n| indeg[&n.id] == 0)
        .map(|n| n.id.clone())
        .collect();
    let mut order = Vec::with_capacity(nodes.len());
    while let Some(n) = queue.pop_front() {
        order.push(n.clone());
        for m in &adj[&n] {
            let d = indeg.get_mut(m).unwrap();
            *d -= 1;
            if *d == 0 {
                queue.push_back(m.clone());
            }
        }
    }
    if order.len() != nodes.len() {
        return Err(GraphError::cycle());
    }
    Ok(order)
}

/// Topologically sort `nodes`, deriving connections from `edges` (or each
/// node's `inputs` when `edges` is empty).
pub fn topo_sort(nodes: &[Node], edges: &[Edge]) -> Result<Vec<NodeId>, GraphError> {
    let conns = connections(nodes, edges);
    topo_order(nodes, &conns)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ir::Node;
    use serde_json::Map;

    fn node(id: &str) -> Node {
        Node {
            id: id.to_string(),
            ty: "Literal".to_string(),
            properties: Map::new(),
            inputs: Vec::new(),
            outputs: Vec::new(),
        }
    }

    #[test]
    fn linear_chain_orders_correctly() {
        let nodes = vec![node("a"), node("b"), node("c")];
        let edges = vec![Edge::new("a", "b"), Edge::new("b", "c")];
        let order = topo_sort(&nodes, &edges).unwrap();
        assert_eq!(order, vec!["a", "b", "c"]);
    }

    #[test]
    fn two_cycle_is_rejected() {
        let nodes = vec![node("x"), node("y")];
        let edges = vec![Edge::new("x", "y"), Edge::new("y", "x")];
        let err = topo_sort(&nodes, &edges).unwrap_err();
        assert_eq!(err.kind, GraphErrorKind::Cycle);
    }

    #[test]
    fn unknown_endpoint_is_reported() {
        let nodes = vec![node("a")];
        let edges = vec![Edge::new("a", "ghost")];
        let err = topo_sort(&nodes, &edges).unwrap_err();
        assert_eq!(err.kind, GraphErrorKind::UnknownNode);
    }

    #[test]
    fn tie_break_uses_insertion_order() {
        // b and c both have no dependencies; insertion order is b, c, a.
        let nodes = vec![node("b"), node("c"), node("a")];
        let order = topo_sort(&nodes, &[]).unwrap();
        assert_eq!(order, vec!["b", "c", "a"]);
    }

    #[test]
    fn falls_back_to_positional_inputs_when_edges_empty() {
        let mut b = node("b");
        b.inputs = vec!["a".to_string()];
        let nodes = vec![node("a"), b];
        let order = topo_sort(&nodes, &[]).unwrap();
        assert_eq!(order, vec!["a", "b"]);
    }
}
