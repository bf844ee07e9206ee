//! Walks a validated, normalized IR in topological order and emits a single
//! C++ translation unit, recording a mapping entry for every node-attributed
//! span along the way.

pub mod error;
pub mod fragment;
pub mod node_emit;
pub mod scope;

pub use error::EmitError;
pub use node_emit::{EmittedLine, EmittedMark};
pub use scope::Scope;

use crate::graph;
use crate::ir::{kind, Catalog, Edge, FunctionDef, Ir, Node, NodeId, Param};
use crate::mapping::{self, MappingEntry};
use std::collections::{BTreeSet, HashMap};

/// The result of a successful emission: the C++ source and its source map.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Emitted {
    pub cpp: String,
    pub mapping: Vec<MappingEntry>,
}

/// Emit `ir` against `catalog` as a single C++ translation unit.
///
/// Callers are expected to have already run [`crate::normalize::normalize`]
/// and [`crate::validate::validate`]; this function does not re-validate,
/// though it degrades gracefully (a warning comment, not an abort) if a
/// scope's graph turns out to contain a cycle.
pub fn emit(ir: &Ir, catalog: &Catalog) -> Result<Emitted, EmitError> {
    let functions_by_name: HashMap<&str, &FunctionDef> =
        ir.functions.iter().map(|f| (f.name.as_str(), f)).collect();

    let mut includes: BTreeSet<String> = BTreeSet::new();
    let mut body = Vec::new();

    for f in &ir.functions {
        let mut scope = Scope::function(f.name.clone());
        bind_params(&f.graph.nodes, &f.params, &mut scope);
        let (lines, warn) = emit_scope(
            &f.graph.nodes,
            &f.graph.edges,
            catalog,
            &functions_by_name,
            &mut scope,
            &mut includes,
        )?;

        let params_sig = f
            .params
            .iter()
            .map(|p| format!("{} {}", crate::types::CanonicalType::canonicalize(&p.ty).cpp_type(), p.name))
            .collect::<Vec<_>>()
            .join(", ");
        let ret_type = crate::types::CanonicalType::canonicalize(&f.return_type).cpp_type();

        body.push(RawLine::plain(format!("{ret_type} {}({params_sig}) {{", f.name)));
        if warn {
            body.push(RawLine::plain("    // warning: cycle detected, emitting nodes in insertion order".to_string()));
        }
        body.extend(lines);

        if !f.return_type.eq_ignore_ascii_case("void") {
            let return_node = resolve_return_node(f)?;
            let var = scope_var_readonly(&mut scope, &return_node);
            let mut entry = MappingEntry::coarse(
                crate::return_node_id(&f.name),
                Some(f.name.clone()),
                0,
                0,
            );
            entry.port = Some("value".to_string());
            body.push(RawLine::marked_whole(format!("    return {var};"), entry));
        }
        body.push(RawLine::plain("}".to_string()));
        body.push(RawLine::plain(String::new()));
    }

    let mut main_scope = Scope::top_level();
    let (main_lines, main_warn) = emit_scope(
        &ir.nodes,
        &ir.edges,
        catalog,
        &functions_by_name,
        &mut main_scope,
        &mut includes,
    )?;
    body.push(RawLine::plain("int main() {".to_string()));
    if main_warn {
        body.push(RawLine::plain("    // warning: cycle detected, emitting nodes in insertion order".to_string()));
    }
    body.extend(main_lines);
    body.push(RawLine::plain("    return 0;".to_string()));
    body.push(RawLine::plain("}".to_string()));

    let mut include_lines: BTreeSet<String> =
        ir.imports.iter().map(|inc| format!("#include {inc}")).collect();
    for inc in &includes {
        include_lines.insert(format!("#include {inc}"));
    }
    if !include_lines.iter().any(|l| l.contains("iostream")) {
        include_lines.insert("#include <iostream>".to_string());
    }

    let mut cpp = String::new();
    let mut current_line = 1usize;
    let mut mapping = Vec::new();

    for inc in &include_lines {
        cpp.push_str(inc);
        cpp.push('\n');
        current_line += 1;
    }
    cpp.push('\n');
    current_line += 1;

    for raw in body {
        cpp.push_str(&raw.text);
        cpp.push('\n');
        for mark in raw.marks {
            mapping.push(mark.into_entry(current_line));
        }
        current_line += 1;
    }

    mapping::finalize(&mut mapping, &cpp);

    Ok(Emitted { cpp, mapping })
}

/// A fully-formed output line plus any mapping contributions it carries,
/// already resolved to text (includes/headers, function braces) or still
/// holding column-relative marks from [`node_emit::emit_node`].
struct RawLine {
    text: String,
    marks: Vec<PendingMark>,
}

enum PendingMark {
    Fine {
        node_id: String,
        function: Option<String>,
        port: Option<String>,
        start_col: usize,
        end_col: usize,
    },
    Coarse {
        node_id: String,
        function: Option<String>,
        port: Option<String>,
    },
    /// A mapping entry whose line is filled in at assembly time, used for
    /// synthesized statements (e.g. `return`) that aren't node emissions.
    WholeLine(MappingEntry),
}

impl PendingMark {
    fn into_entry(self, line: usize) -> MappingEntry {
        match self {
            PendingMark::Fine {
                node_id,
                function,
                port,
                start_col,
                end_col,
            } => MappingEntry::fragment(node_id, function, line, start_col, end_col, port),
            PendingMark::Coarse {
                node_id,
                function,
                port,
            } => {
                let mut e = MappingEntry::coarse(node_id, function, line, line);
                e.port = port;
                e
            }
            PendingMark::WholeLine(mut e) => {
                e.start_line = line;
                e.end_line = line;
                e
            }
        }
    }
}

impl RawLine {
    fn plain(text: String) -> Self {
        RawLine { text, marks: Vec::new() }
    }

    fn marked_whole(text: String, entry: MappingEntry) -> Self {
        RawLine {
            text,
            marks: vec![PendingMark::WholeLine(entry)],
        }
    }
}

/// Emit every node in `nodes` (topologically ordered, falling back to
/// insertion order on a cycle) into a sequence of [`RawLine`]s, returning
/// whether the fallback was used.
fn emit_scope(
    nodes: &[Node],
    edges: &[Edge],
    catalog: &Catalog,
    functions_by_name: &HashMap<&str, &FunctionDef>,
    scope: &mut Scope,
    includes: &mut BTreeSet<String>,
) -> Result<(Vec<RawLine>, bool), EmitError> {
    let conns = graph::connections(nodes, edges);
    let (order, had_cycle) = match graph::topo_order(nodes, &conns) {
        Ok(order) => (order, false),
        Err(_) => (nodes.iter().map(|n| n.id.clone()).collect(), true),
    };

    let mut out = Vec::new();
    for node_id in &order {
        let Some(node) = nodes.iter().find(|n| n.id.as_str() == node_id.as_str()) else {
            continue;
        };
        let function = scope.function_name();
        let lines = node_emit::emit_node(node, catalog, functions_by_name, edges, &conns, scope, includes)?;
        let mut raw_lines: Vec<RawLine> = Vec::with_capacity(lines.len());
        for line in lines {
            let EmittedLine { text, marks } = line;
            let marks = marks
                .into_iter()
                .map(|m| match m {
                    EmittedMark::Fine {
                        node_id,
                        port,
                        start_col,
                        end_col,
                    } => PendingMark::Fine {
                        node_id,
                        function: function.clone(),
                        port,
                        start_col,
                        end_col,
                    },
                    EmittedMark::Coarse { node_id } => PendingMark::Coarse {
                        node_id,
                        function: function.clone(),
                        port: None,
                    },
                })
                .collect();
            raw_lines.push(RawLine { text, marks });
        }
        // Every node also gets a coarse whole-statement entry in addition to
        // any fine-grained fragment marks its own emission recorded, so a
        // diagnostic that lands outside a fragment's columns still resolves.
        if node.ty.as_str() != kind::PARAM {
            if let Some(last) = raw_lines.last_mut() {
                last.marks.push(PendingMark::Coarse {
                    node_id: node.id.clone(),
                    function: function.clone(),
                    port: None,
                });
            }
        }
        out.extend(raw_lines);
    }
    Ok((out, had_cycle))
}

/// Bind each `Param` node in a function's graph to its parameter name:
/// matched first by the node's `name` property, then positionally among
/// parameters not yet claimed.
fn bind_params(graph_nodes: &[Node], params: &[Param], scope: &mut Scope) {
    let param_nodes: Vec<&Node> = graph_nodes.iter().filter(|n| n.ty == kind::PARAM).collect();
    let mut used_param_idx = vec![false; params.len()];
    let mut bound_node = vec![false; param_nodes.len()];

    for (ni, n) in param_nodes.iter().enumerate() {
        if let Some(name) = n.name_property() {
            if let Some(pi) = params.iter().position(|p| p.name == name) {
                if !used_param_idx[pi] {
                    scope.bind(&n.id, params[pi].name.clone());
                    used_param_idx[pi] = true;
                    bound_node[ni] = true;
                }
            }
        }
    }

    let mut remaining_params = params
        .iter()
        .enumerate()
        .filter(|(i, _)| !used_param_idx[*i])
        .map(|(_, p)| p);
    for (ni, n) in param_nodes.iter().enumerate() {
        if bound_node[ni] {
            continue;
        }
        if let Some(p) = remaining_params.next() {
            scope.bind(&n.id, p.name.clone());
        }
    }
}

/// The node whose value a function returns: the explicit `graph.return`,
/// else the last non-`Param` node in declaration order.
fn resolve_return_node(f: &FunctionDef) -> Result<NodeId, EmitError> {
    if let Some(explicit) = &f.graph.return_node {
        if !f.graph.nodes.iter().any(|n| n.id.as_str() == explicit.as_str()) {
            return Err(EmitError::UnknownReturnNode {
                function: f.name.clone(),
                node_id: explicit.clone(),
            });
        }
        return Ok(explicit.clone());
    }
    f.graph
        .nodes
        .iter()
        .rev()
        .find(|n| n.ty != kind::PARAM)
        .map(|n| n.id.clone())
        .ok_or_else(|| EmitError::UnknownReturnNode {
            function: f.name.clone(),
            node_id: String::new(),
        })
}

/// Look up (without allocating a fresh one) the variable bound to a node
/// that has necessarily already been emitted earlier in topological order.
fn scope_var_readonly(scope: &mut Scope, node_id: &str) -> String {
    scope.var_for(node_id)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ir::{Edge, FnGraph, Node};
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
    fn sum_of_3_and_4_emits_and_prints() {
        let ir = Ir {
            imports: Vec::new(),
            nodes: vec![
                node("L3", "Literal", props(&[("value", json!(3))])),
                node("L4", "Literal", props(&[("value", json!(4))])),
                node("A", "Add", Map::new()),
                node("P", "Print", Map::new()),
            ],
            edges: vec![
                Edge::new("L3", "A"),
                Edge::new("L4", "A"),
                Edge::new("A", "P"),
            ],
            functions: Vec::new(),
        };
        let emitted = emit(&ir, &Catalog::new()).unwrap();
        assert!(emitted.cpp.contains("double v_A = v_L3 + v_L4;"));
        assert!(emitted.cpp.contains("std::cout << v_A << std::endl;"));
        assert!(emitted.cpp.contains("#include <iostream>"));
    }

    #[test]
    fn user_function_emits_header_and_call() {
        let ir = Ir {
            imports: Vec::new(),
            nodes: vec![
                node("C", "Call", props(&[("name", json!("addK"))])),
                node("P", "Print", Map::new()),
            ],
            edges: vec![Edge::new("C", "P")],
            functions: vec![FunctionDef {
                name: "addK".to_string(),
                params: vec![
                    Param { name: "a".into(), ty: "number".into() },
                    Param { name: "b".into(), ty: "number".into() },
                ],
                return_type: "number".to_string(),
                graph: FnGraph {
                    nodes: vec![
                        node("pa", "Param", props(&[("name", json!("a"))])),
                        node("pb", "Param", props(&[("name", json!("b"))])),
                        node("sum", "Add", Map::new()),
                    ],
                    edges: vec![Edge::new("pa", "sum"), Edge::new("pb", "sum")],
                    return_node: None,
                },
            }],
        };
        let emitted = emit(&ir, &Catalog::new()).unwrap();
        assert!(emitted.cpp.contains("double addK(double a, double b) {"));
        assert!(emitted.cpp.contains("double v_sum = a + b;"));
        assert!(emitted.cpp.contains("return v_sum;"));
        assert!(emitted.cpp.contains("addK("));
    }

    #[test]
    fn cycle_falls_back_to_insertion_order_with_warning() {
        let ir = Ir {
            imports: Vec::new(),
            nodes: vec![node("x", "Add", Map::new()), node("y", "Add", Map::new())],
            edges: vec![Edge::new("x", "y"), Edge::new("y", "x")],
            functions: Vec::new(),
        };
        let emitted = emit(&ir, &Catalog::new()).unwrap();
        assert!(emitted.cpp.contains("cycle detected"));
    }
}
