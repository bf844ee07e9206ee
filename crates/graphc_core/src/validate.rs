//! Type existence, port binding, and assignability checking.
//!
//! Validation is total: the first failure aborts and is returned to the
//! caller. It never batches diagnostics — that is left to callers that want
//! to re-run after fixing each issue in turn.

use crate::graph::{self, Connection};
use crate::ir::{Catalog, Edge, Node, NodeId};
use crate::types::{infer_literal_type, is_assignable};
use thiserror::Error;

/// Why validation rejected a graph.
#[derive(Clone, Debug, Error, PartialEq, Eq)]
pub enum ValidationError {
    #[error("node {node_id:?} has unknown type {node_type:?}")]
    UnknownNodeType { node_id: NodeId, node_type: String },

    #[error("edge references unknown node {node_id:?}")]
    UnknownEndpoint { node_id: NodeId },

    #[error("graph has a cycle")]
    Cycle,

    #[error("node {node_id:?} has no input port {missing_input_port:?} (valid ports: {valid_ports:?})")]
    MissingInputPort {
        node_id: NodeId,
        missing_input_port: String,
        valid_ports: Vec<String>,
    },

    #[error("node {node_id:?} has no output port {missing_output_port:?} (valid ports: {valid_ports:?})")]
    MissingOutputPort {
        node_id: NodeId,
        missing_output_port: String,
        valid_ports: Vec<String>,
    },

    #[error("{to:?}.{to_port:?} expected {expected} but {from:?} produces {actual}")]
    TypeMismatch {
        from: NodeId,
        to: NodeId,
        to_port: Option<String>,
        expected: String,
        actual: String,
        suggested_cast: String,
    },
}

/// Validate `nodes`/`edges` against `catalog`. See module docs for the
/// ordering of checks; the first violation found is returned.
pub fn validate(nodes: &[Node], edges: &[Edge], catalog: &Catalog) -> Result<(), ValidationError> {
    for n in nodes {
        if !catalog.contains_key(&n.ty) && !is_builtin(&n.ty) {
            return Err(ValidationError::UnknownNodeType {
                node_id: n.id.clone(),
                node_type: n.ty.clone(),
            });
        }
    }

    graph::topo_sort(nodes, edges).map_err(|e| match e.kind {
        crate::graph::GraphErrorKind::UnknownNode => ValidationError::UnknownEndpoint {
            node_id: e.node.unwrap_or_default(),
        },
        crate::graph::GraphErrorKind::Cycle => ValidationError::Cycle,
    })?;

    let output_types = output_type_table(nodes, catalog);
    let conns = graph::connections(nodes, edges);

    let mut by_dest: Vec<(NodeId, Vec<Connection>)> = Vec::new();
    for c in &conns {
        match by_dest.iter_mut().find(|(id, _)| id.as_str() == c.to) {
            Some((_, v)) => v.push(*c),
            None => by_dest.push((c.to.to_string(), vec![*c])),
        }
    }

    for (dest_id, dest_conns) in &by_dest {
        let dest = node_by_id(nodes, dest_id).ok_or_else(|| ValidationError::UnknownEndpoint {
            node_id: dest_id.clone(),
        })?;
        let dest_def = catalog.get(&dest.ty);
        let dest_ports = dest_def.map(|d| d.inputs.as_slice()).unwrap_or(&[]);

        for (idx, c) in dest_conns.iter().enumerate() {
            let (expected, to_port) = match edge_to_port(edges, c) {
                Some(port) => {
                    let p = dest_ports.iter().find(|p| p.name == port);
                    match p {
                        Some(p) => (p.ty.clone(), Some(port.to_string())),
                        None => {
                            return Err(ValidationError::MissingInputPort {
                                node_id: dest_id.clone(),
                                missing_input_port: port.to_string(),
                                valid_ports: dest_ports.iter().map(|p| p.name.clone()).collect(),
                            })
                        }
                    }
                }
                None => match dest_ports.get(idx) {
                    Some(p) => (p.ty.clone(), Some(p.name.clone())),
                    None => ("any".to_string(), None),
                },
            };

            let source = node_by_id(nodes, c.from).ok_or_else(|| ValidationError::UnknownEndpoint {
                node_id: c.from.to_string(),
            })?;
            let source_def = catalog.get(&source.ty);
            let source_ports = source_def.map(|d| d.outputs.as_slice()).unwrap_or(&[]);

            let actual = match edge_from_port(edges, c) {
                Some(port) => {
                    let p = source_ports.iter().find(|p| p.name == port);
                    match p {
                        Some(p) => p.ty.clone(),
                        None => {
                            return Err(ValidationError::MissingOutputPort {
                                node_id: source.id.clone(),
                                missing_output_port: port.to_string(),
                                valid_ports: source_ports.iter().map(|p| p.name.clone()).collect(),
                            })
                        }
                    }
                }
                None => output_types
                    .get(&source.id)
                    .cloned()
                    .unwrap_or_else(|| "any".to_string()),
            };

            if !is_assignable(&expected, &actual) {
                return Err(ValidationError::TypeMismatch {
                    from: source.id.clone(),
                    to: dest_id.clone(),
                    to_port,
                    expected: expected.clone(),
                    actual,
                    suggested_cast: expected,
                });
            }
        }
    }

    Ok(())
}

/// Built-in kinds recognized without a catalog entry.
fn is_builtin(ty: &str) -> bool {
    use crate::ir::kind::*;
    matches!(ty, LITERAL | PARAM | ADD | SUB | MUL | DIV | CAST | PRINT | CALL)
}

/// The inferred or declared output type of every node, keyed by node id. Kept
/// as the raw declared (or inferred) type string, not a canonicalized family
/// name, so it can be surfaced verbatim in a [`ValidationError::TypeMismatch`].
fn output_type_table(nodes: &[Node], catalog: &Catalog) -> std::collections::HashMap<NodeId, String> {
    let mut table = std::collections::HashMap::new();
    for n in nodes {
        let ty = if n.ty == crate::ir::kind::LITERAL {
            infer_literal_type(n.property("value")).name().to_string()
        } else {
            catalog
                .get(&n.ty)
                .and_then(|d| d.outputs.first())
                .map(|p| p.ty.clone())
                .unwrap_or_else(|| "any".to_string())
        };
        table.insert(n.id.clone(), ty);
    }
    table
}

fn node_by_id<'a>(nodes: &'a [Node], id: &str) -> Option<&'a Node> {
    nodes.iter().find(|n| n.id == id)
}

/// Find the edge underlying a connection and return its `toPort`, if any.
/// `edges` is empty for the positional-inputs fallback, in which case there
/// is never a named port.
fn edge_to_port<'a>(edges: &'a [Edge], c: &Connection) -> Option<&'a str> {
    edges
        .iter()
        .find(|e| e.from == c.from && e.to == c.to)
        .and_then(|e| e.to_port.as_deref())
}

fn edge_from_port<'a>(edges: &'a [Edge], c: &Connection) -> Option<&'a str> {
    edges
        .iter()
        .find(|e| e.from == c.from && e.to == c.to)
        .and_then(|e| e.from_port.as_deref())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ir::{LibDef, NodeDef, PortDef};
    use serde_json::{json, Map};

    fn node(id: &str, ty: &str, props: Map<String, serde_json::Value>) -> Node {
        Node {
            id: id.to_string(),
            ty: ty.to_string(),
            properties: props,
            inputs: Vec::new(),
            outputs: Vec::new(),
        }
    }

    fn props(pairs: &[(&str, serde_json::Value)]) -> Map<String, serde_json::Value> {
        pairs.iter().map(|(k, v)| (k.to_string(), v.clone())).collect()
    }

    #[test]
    fn unknown_node_type_is_rejected() {
        let nodes = vec![node("a", "Mystery", Map::new())];
        let err = validate(&nodes, &[], &Catalog::new()).unwrap_err();
        assert!(matches!(err, ValidationError::UnknownNodeType { .. }));
    }

    #[test]
    fn widening_int_to_double_is_accepted() {
        let nodes = vec![
            node("l", "Literal", props(&[("value", json!(2))])),
            node("a", "Param", Map::new()),
        ];
        let mut catalog = Catalog::new();
        catalog.insert(
            "Param".to_string(),
            NodeDef {
                inputs: vec![PortDef {
                    name: "in".into(),
                    ty: "double".into(),
                }],
                outputs: vec![],
                lib: None,
            },
        );
        let edges = vec![Edge::new("l", "a")];
        assert!(validate(&nodes, &edges, &catalog).is_ok());
    }

    #[test]
    fn narrowing_double_to_int_is_rejected() {
        let nodes = vec![
            node("l", "Literal", props(&[("value", json!(2.5))])),
            node("a", "Param", Map::new()),
        ];
        let mut catalog = Catalog::new();
        catalog.insert(
            "Param".to_string(),
            NodeDef {
                inputs: vec![PortDef {
                    name: "in".into(),
                    ty: "int".into(),
                }],
                outputs: vec![],
                lib: None,
            },
        );
        let edges = vec![Edge::new("l", "a")];
        let err = validate(&nodes, &edges, &catalog).unwrap_err();
        match err {
            ValidationError::TypeMismatch { suggested_cast, .. } => {
                assert_eq!(suggested_cast, "int")
            }
            other => panic!("unexpected {other:?}"),
        }
    }

    #[test]
    fn unknown_to_port_reports_valid_ports() {
        let nodes = vec![
            node("l", "Literal", props(&[("value", json!(1))])),
            node("a", "Extern", Map::new()),
        ];
        let mut catalog = Catalog::new();
        catalog.insert(
            "Extern".to_string(),
            NodeDef {
                inputs: vec![PortDef {
                    name: "x".into(),
                    ty: "double".into(),
                }],
                outputs: vec![],
                lib: Some(LibDef {
                    include: "extern.h".into(),
                    name: "extern_fn".into(),
                }),
            },
        );
        let mut edge = Edge::new("l", "a");
        edge.to_port = Some("ghost".to_string());
        let err = validate(&nodes, &[edge], &catalog).unwrap_err();
        match err {
            ValidationError::MissingInputPort { valid_ports, .. } => {
                assert_eq!(valid_ports, vec!["x".to_string()])
            }
            other => panic!("unexpected {other:?}"),
        }
    }

    #[test]
    fn cycle_is_rejected_before_type_checking() {
        let nodes = vec![node("x", "Add", Map::new()), node("y", "Add", Map::new())];
        let edges = vec![Edge::new("x", "y"), Edge::new("y", "x")];
        let err = validate(&nodes, &edges, &Catalog::new()).unwrap_err();
        assert_eq!(err, ValidationError::Cycle);
    }
}
