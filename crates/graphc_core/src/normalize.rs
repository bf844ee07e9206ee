//! Reconciles the IR's two equivalent edge representations — an explicit
//! edge list, or per-node positional `inputs` arrays — into one canonical
//! form where both are present and agree.

use crate::ir::{Edge, Ir, Node, NodeId};
use std::collections::{HashMap, HashSet};

/// Normalize `ir` in place: if `edges` is non-empty it is treated as
/// canonical (dropping any edge with an unknown endpoint) and each node's
/// `inputs`/`outputs` are rebuilt from it; otherwise edges are synthesized
/// from each node's `inputs`, de-duplicated, and `outputs` derived from the
/// result. Function subgraphs are normalized independently of the top-level
/// graph and of each other.
///
/// Idempotent: `normalize(normalize(ir)) == normalize(ir)`.
pub fn normalize(ir: &mut Ir) {
    normalize_graph(&mut ir.nodes, &mut ir.edges);
    for f in &mut ir.functions {
        normalize_graph(&mut f.graph.nodes, &mut f.graph.edges);
    }
}

/// Owned-value convenience wrapper around [`normalize`].
pub fn normalized(mut ir: Ir) -> Ir {
    normalize(&mut ir);
    ir
}

fn normalize_graph(nodes: &mut [Node], edges: &mut Vec<Edge>) {
    let ids: HashSet<NodeId> = nodes.iter().map(|n| n.id.clone()).collect();

    if !edges.is_empty() {
        edges.retain(|e| ids.contains(&e.from) && ids.contains(&e.to));
    } else {
        let mut seen: HashSet<(NodeId, NodeId)> = HashSet::new();
        let mut synthesized = Vec::new();
        for n in nodes.iter() {
            for src in &n.inputs {
                if !ids.contains(src) {
                    continue;
                }
                let key = (src.clone(), n.id.clone());
                if seen.insert(key) {
                    synthesized.push(Edge::new(src.clone(), n.id.clone()));
                }
            }
        }
        *edges = synthesized;
    }

    rebuild_ports(nodes, edges);
}

/// Rebuild each node's `inputs`/`outputs` from the (now canonical) edge
/// list, preserving edge order and de-duplicating per destination/source.
fn rebuild_ports(nodes: &mut [Node], edges: &[Edge]) {
    let mut inputs: HashMap<NodeId, Vec<NodeId>> = HashMap::new();
    let mut inputs_seen: HashMap<NodeId, HashSet<NodeId>> = HashMap::new();
    let mut outputs: HashMap<NodeId, Vec<NodeId>> = HashMap::new();
    let mut outputs_seen: HashMap<NodeId, HashSet<NodeId>> = HashMap::new();
    for n in nodes.iter() {
        inputs.insert(n.id.clone(), Vec::new());
        inputs_seen.insert(n.id.clone(), HashSet::new());
        outputs.insert(n.id.clone(), Vec::new());
        outputs_seen.insert(n.id.clone(), HashSet::new());
    }
    for e in edges {
        if let Some(seen) = inputs_seen.get_mut(&e.to) {
            if seen.insert(e.from.clone()) {
                inputs.get_mut(&e.to).unwrap().push(e.from.clone());
            }
        }
        if let Some(seen) = outputs_seen.get_mut(&e.from) {
            if seen.insert(e.to.clone()) {
                outputs.get_mut(&e.from).unwrap().push(e.to.clone());
            }
        }
    }
    for n in nodes.iter_mut() {
        n.inputs = inputs.remove(&n.id).unwrap_or_default();
        n.outputs = outputs.remove(&n.id).unwrap_or_default();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
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
    fn edges_are_canonical_and_populate_ports() {
        let mut ir = Ir {
            nodes: vec![node("a"), node("b")],
            edges: vec![Edge::new("a", "b")],
            ..Default::default()
        };
        normalize(&mut ir);
        assert_eq!(ir.nodes[1].inputs, vec!["a".to_string()]);
        assert_eq!(ir.nodes[0].outputs, vec!["b".to_string()]);
    }

    #[test]
    fn duplicate_source_collapses_to_one_input_entry() {
        let mut ir = Ir {
            nodes: vec![node("l"), node("add")],
            edges: vec![
                Edge {
                    from: "l".into(),
                    to: "add".into(),
                    from_port: None,
                    to_port: Some("a".into()),
                },
                Edge {
                    from: "l".into(),
                    to: "add".into(),
                    from_port: None,
                    to_port: Some("b".into()),
                },
            ],
            ..Default::default()
        };
        normalize(&mut ir);
        assert_eq!(ir.nodes[1].inputs, vec!["l".to_string()]);
    }

    #[test]
    fn empty_edges_are_synthesized_from_inputs() {
        let mut b = node("b");
        b.inputs = vec!["a".to_string()];
        let mut ir = Ir {
            nodes: vec![node("a"), b],
            edges: Vec::new(),
            ..Default::default()
        };
        normalize(&mut ir);
        assert_eq!(ir.edges, vec![Edge::new("a", "b")]);
        assert_eq!(ir.nodes[0].outputs, vec!["b".to_string()]);
    }

    #[test]
    fn unknown_edge_endpoints_are_dropped() {
        let mut ir = Ir {
            nodes: vec![node("a")],
            edges: vec![Edge::new("a", "ghost")],
            ..Default::default()
        };
        normalize(&mut ir);
        assert!(ir.edges.is_empty());
        assert!(ir.nodes[0].outputs.is_empty());
    }

    #[test]
    fn normalize_is_idempotent() {
        let mut ir = Ir {
            nodes: vec![node("a"), node("b"), node("c")],
            edges: vec![Edge::new("a", "c"), Edge::new("b", "c")],
            ..Default::default()
        };
        normalize(&mut ir);
        let once = serde_json::to_value(&ir).unwrap();
        normalize(&mut ir);
        let twice = serde_json::to_value(&ir).unwrap();
        assert_eq!(once, twice);
    }

    #[test]
    fn function_graphs_normalize_independently() {
        use crate::ir::{FnGraph, FunctionDef};
        let mut a = node("pa");
        a.ty = "Param".to_string();
        let mut ir = Ir {
            functions: vec![FunctionDef {
                name: "f".to_string(),
                params: Vec::new(),
                return_type: "double".to_string(),
                graph: FnGraph {
                    nodes: vec![a, node("lit")],
                    edges: Vec::new(),
                    return_node: None,
                },
            }],
            ..Default::default()
        };
        normalize(&mut ir);
        assert!(ir.functions[0].graph.edges.is_empty());
    }
}
