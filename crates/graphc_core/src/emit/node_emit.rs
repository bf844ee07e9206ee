//! The single polymorphic per-node emission routine: one code path per node
//! kind, shared by the top-level scope and every function scope.

use super::error::EmitError;
use super::fragment::Line;
use super::scope::Scope;
use crate::graph::Connection;
use crate::ir::{kind, Catalog, Edge, FunctionDef, Node};
use crate::types::{CanonicalType, Scalar};
use std::collections::BTreeSet;

/// Statement indentation inside `main()`/a function body. There is only one
/// nesting level in the emitted output, so this is a fixed prefix rather
/// than a tracked indent level.
const INDENT: &str = "    ";

/// One emitted C++ line plus the spans it contributes to the mapping table.
pub struct EmittedLine {
    pub text: String,
    pub marks: Vec<EmittedMark>,
}

/// A span attached to an [`EmittedLine`]: either a column-resolved fragment,
/// or a whole-line marker finalized later against the assembled source.
pub enum EmittedMark {
    Fine {
        node_id: String,
        port: Option<String>,
        start_col: usize,
        end_col: usize,
    },
    Coarse {
        node_id: String,
    },
}

fn from_fragments(line: Line) -> EmittedLine {
    let (text, spans) = line.build();
    let marks = spans
        .into_iter()
        .map(|s| EmittedMark::Fine {
            node_id: s.node_id,
            port: s.port,
            start_col: s.start_col,
            end_col: s.end_col,
        })
        .collect();
    EmittedLine { text, marks }
}

/// Emit `node`, returning zero lines (`Param`), or one or more C++ lines
/// with their mapping spans. `conns` is the scope's full connection list
/// (from [`crate::graph::connections`]); `edges` is the scope's canonical
/// edge list, consulted for named port bindings.
#[allow(clippy::too_many_arguments)]
pub fn emit_node(
    node: &Node,
    catalog: &Catalog,
    functions_by_name: &std::collections::HashMap<&str, &FunctionDef>,
    edges: &[Edge],
    conns: &[Connection],
    scope: &mut Scope,
    includes: &mut BTreeSet<String>,
) -> Result<Vec<EmittedLine>, EmitError> {
    match node.ty.as_str() {
        kind::PARAM => Ok(Vec::new()),
        kind::LITERAL => emit_literal(node, scope, includes),
        kind::CAST => emit_cast(node, edges, conns, scope, includes),
        t if kind::is_arith(t) => emit_arith(node, edges, conns, scope),
        kind::PRINT => emit_print(node, edges, conns, scope),
        kind::CALL => emit_call(node, functions_by_name, edges, conns, scope),
        other => emit_catalog_or_unhandled(node, other, catalog, edges, conns, scope, includes),
    }
}

fn emit_literal(node: &Node, scope: &mut Scope, includes: &mut BTreeSet<String>) -> Result<Vec<EmittedLine>, EmitError> {
    let value = node.property("value");
    let scalar = Scalar::from_json(value);
    let (text, cpp_type) = match &scalar {
        Scalar::Bool(b) => (b.to_string(), "bool".to_string()),
        Scalar::Int(i) => (i.to_string(), "double".to_string()),
        Scalar::Float(f) => (format_float(*f), "double".to_string()),
        Scalar::Text(s) => {
            includes.insert("<string>".to_string());
            (format!("{s:?}"), "std::string".to_string())
        }
        Scalar::Other => (
            value.map(|v| v.to_string()).unwrap_or_else(|| "0".to_string()),
            "auto".to_string(),
        ),
    };
    let v = scope.var_for(&node.id);
    let line = Line::new()
        .text(format!("{INDENT}{cpp_type} {v} = "))
        .marked(text, node.id.clone(), Some("out".to_string()))
        .text(";");
    Ok(vec![from_fragments(line)])
}

fn format_float(f: f64) -> String {
    if f.fract() == 0.0 && f.is_finite() {
        format!("{f:.1}")
    } else {
        f.to_string()
    }
}

fn emit_cast(
    node: &Node,
    edges: &[Edge],
    conns: &[Connection],
    scope: &mut Scope,
    includes: &mut BTreeSet<String>,
) -> Result<Vec<EmittedLine>, EmitError> {
    let target_raw = node
        .property("targetType")
        .and_then(|v| v.as_str())
        .ok_or_else(|| EmitError::MissingProperty {
            node_id: node.id.clone(),
            node_type: node.ty.clone(),
            property: "targetType".to_string(),
        })?;
    let target = CanonicalType::canonicalize(target_raw);
    let cpp_type = target.cpp_type();

    let slots = bind_slots(&node.id, edges, conns, &["in"]);
    let src = slots[0].unwrap_or(node.id.as_str());
    let x = scope.var_for(src);

    let expr = if target == CanonicalType::String {
        includes.insert("<string>".to_string());
        format!("std::to_string({x})")
    } else {
        format!("static_cast<{cpp_type}>({x})")
    };

    let v = scope.var_for(&node.id);
    let line = Line::new()
        .text(format!("{INDENT}{cpp_type} {v} = "))
        .marked(expr, node.id.clone(), Some("in".to_string()))
        .text(";");
    Ok(vec![from_fragments(line)])
}

fn emit_arith(
    node: &Node,
    edges: &[Edge],
    conns: &[Connection],
    scope: &mut Scope,
) -> Result<Vec<EmittedLine>, EmitError> {
    let slots = bind_slots(&node.id, edges, conns, &["a", "b"]);
    let a_src = slots[0].unwrap_or(node.id.as_str());
    let b_src = slots[1].unwrap_or(node.id.as_str());
    let a_text = scope.var_for(a_src);
    let b_text = scope.var_for(b_src);
    let op = kind::op_symbol(&node.ty);
    let v = scope.var_for(&node.id);

    let line = Line::new()
        .text(format!("{INDENT}double {v} = "))
        .marked(a_text, node.id.clone(), Some("a".to_string()))
        .text(format!(" {op} "))
        .marked(b_text, node.id.clone(), Some("b".to_string()))
        .text(";");
    Ok(vec![from_fragments(line)])
}

fn emit_print(
    node: &Node,
    edges: &[Edge],
    conns: &[Connection],
    scope: &mut Scope,
) -> Result<Vec<EmittedLine>, EmitError> {
    let slots = bind_slots(&node.id, edges, conns, &["value"]);
    let src = slots[0].unwrap_or(node.id.as_str());
    let x = scope.var_for(src);
    let line = Line::new()
        .text(format!("{INDENT}std::cout << "))
        .marked(x, node.id.clone(), Some("value".to_string()))
        .text(" << std::endl;");
    Ok(vec![from_fragments(line)])
}

fn emit_call(
    node: &Node,
    functions_by_name: &std::collections::HashMap<&str, &FunctionDef>,
    edges: &[Edge],
    conns: &[Connection],
    scope: &mut Scope,
) -> Result<Vec<EmittedLine>, EmitError> {
    let fname = node
        .property("name")
        .and_then(|v| v.as_str())
        .ok_or_else(|| EmitError::MissingProperty {
            node_id: node.id.clone(),
            node_type: node.ty.clone(),
            property: "name".to_string(),
        })?;

    let func = functions_by_name.get(fname).copied();
    let ret_type = func
        .map(|f| CanonicalType::canonicalize(&f.return_type).cpp_type())
        .unwrap_or_else(|| "auto".to_string());

    let mut line = Line::new();
    let v = scope.var_for(&node.id);
    line = line.text(format!("{INDENT}{ret_type} {v} = {fname}("));

    match func {
        Some(f) => {
            let slot_names: Vec<&str> = f.params.iter().map(|p| p.name.as_str()).collect();
            let slots = bind_slots(&node.id, edges, conns, &slot_names);
            for (i, slot) in slots.iter().enumerate() {
                if i > 0 {
                    line = line.text(", ");
                }
                let src = slot.unwrap_or(node.id.as_str());
                let text = scope.var_for(src);
                line = line.marked(text, node.id.clone(), Some(slot_names[i].to_string()));
            }
        }
        None => {
            let incoming: Vec<&Connection> = conns.iter().filter(|c| c.to == node.id).collect();
            for (i, c) in incoming.iter().enumerate() {
                if i > 0 {
                    line = line.text(", ");
                }
                let text = scope.var_for(c.from);
                line = line.marked(text, node.id.clone(), Some(format!("arg{i}")));
            }
        }
    }
    line = line.text(");");
    Ok(vec![from_fragments(line)])
}

fn emit_catalog_or_unhandled(
    node: &Node,
    ty: &str,
    catalog: &Catalog,
    edges: &[Edge],
    conns: &[Connection],
    scope: &mut Scope,
    includes: &mut BTreeSet<String>,
) -> Result<Vec<EmittedLine>, EmitError> {
    let Some(def) = catalog.get(ty) else {
        let v = node.id.clone();
        let text = format!("{INDENT}// Unhandled node {v} of type {ty}");
        return Ok(vec![EmittedLine {
            text,
            marks: vec![EmittedMark::Coarse { node_id: node.id.clone() }],
        }]);
    };

    if let Some(lib) = &def.lib {
        includes.insert(format!("<{}>", lib.include.trim_matches(|c| c == '<' || c == '>')));
    }

    let out_type = def
        .outputs
        .first()
        .map(|p| CanonicalType::canonicalize(&p.ty).cpp_type())
        .unwrap_or_else(|| "double".to_string());

    let fn_name = def.lib.as_ref().map(|l| l.name.clone()).unwrap_or_else(|| ty.to_string());
    let slot_names: Vec<&str> = def.inputs.iter().map(|p| p.name.as_str()).collect();
    let slots = bind_slots(&node.id, edges, conns, &slot_names);

    let v = scope.var_for(&node.id);
    let mut line = Line::new().text(format!("{INDENT}{out_type} {v} = {fn_name}("));
    for (i, slot) in slots.iter().enumerate() {
        if i > 0 {
            line = line.text(", ");
        }
        let src = slot.unwrap_or(node.id.as_str());
        let text = scope.var_for(src);
        line = line.marked(text, node.id.clone(), Some(slot_names[i].to_string()));
    }
    line = line.text(");");
    Ok(vec![from_fragments(line)])
}

/// Resolve a node's incoming connections against an ordered list of named
/// slots: a connection whose edge names a `toPort` matching a slot fills
/// that slot directly; remaining connections fill the remaining slots, in
/// order, by position. Mirrors the validator's own port-binding rule.
fn bind_slots<'a>(
    node_id: &str,
    edges: &[Edge],
    conns: &[Connection<'a>],
    slot_names: &[&str],
) -> Vec<Option<&'a str>> {
    let incoming: Vec<&Connection<'a>> = conns.iter().filter(|c| c.to == node_id).collect();
    let mut slots: Vec<Option<&'a str>> = vec![None; slot_names.len()];
    let mut positional: Vec<&Connection<'a>> = Vec::new();

    for c in incoming.iter().copied() {
        let port = edges
            .iter()
            .find(|e| e.from == c.from && e.to == c.to)
            .and_then(|e| e.to_port.as_deref());
        match port.and_then(|p| slot_names.iter().position(|s| *s == p)) {
            Some(idx) => slots[idx] = Some(c.from),
            None => positional.push(c),
        }
    }

    let mut pos_iter = positional.into_iter();
    for slot in slots.iter_mut() {
        if slot.is_none() {
            if let Some(c) = pos_iter.next() {
                *slot = Some(c.from);
            }
        }
    }
    slots
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::graph;
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
    fn literal_int_widens_to_double() {
        let n = node("L3", "Literal", props(&[("value", json!(3))]));
        let mut scope = Scope::top_level();
        let mut includes = BTreeSet::new();
        let lines = emit_literal(&n, &mut scope, &mut includes).unwrap();
        assert_eq!(lines[0].text, "    double v_L3 = 3;");
    }

    #[test]
    fn duplicate_operand_yields_disjoint_spans() {
        let nodes = vec![
            node("L", "Literal", props(&[("value", json!(7))])),
            node("A", "Add", Map::new()),
        ];
        let edges = vec![Edge::new("L", "A"), Edge::new("L", "A")];
        let conns = graph::connections(&nodes, &edges);
        let mut scope = Scope::top_level();
        scope.bind("L", "v_L");
        let lines = emit_arith(&nodes[1], &edges, &conns, &mut scope).unwrap();
        let marks = &lines[0].marks;
        assert_eq!(marks.len(), 2);
        match (&marks[0], &marks[1]) {
            (
                EmittedMark::Fine { start_col: s1, end_col: e1, .. },
                EmittedMark::Fine { start_col: s2, .. },
            ) => assert!(e1 < s2),
            _ => panic!("expected two fine spans"),
        }
    }

    #[test]
    fn cast_to_string_uses_to_string() {
        let nodes = vec![
            node("S", "Literal", props(&[("value", json!("1"))])),
            node("C", "Cast", props(&[("targetType", json!("string"))])),
        ];
        let edges = vec![Edge::new("S", "C")];
        let conns = graph::connections(&nodes, &edges);
        let mut scope = Scope::top_level();
        scope.bind("S", "v_S");
        let mut includes = BTreeSet::new();
        let lines = emit_cast(&nodes[1], &edges, &conns, &mut scope, &mut includes).unwrap();
        assert!(lines[0].text.contains("std::to_string(v_S)"));
        assert!(includes.contains("<string>"));
    }
}
