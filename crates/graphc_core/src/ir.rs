//! The IR data model: nodes, edges, functions, and the node-definitions
//! catalog.

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use std::collections::BTreeMap;

/// A node's opaque identifier, as it appears in the IR document.
pub type NodeId = String;

/// Names of the built-in node kinds recognized by the validator and emitter.
/// Anything else is either a `lib`-backed catalog entry or an unhandled
/// marker.
pub mod kind {
    pub const LITERAL: &str = "Literal";
    pub const PARAM: &str = "Param";
    pub const ADD: &str = "Add";
    pub const SUB: &str = "Sub";
    pub const MUL: &str = "Mul";
    pub const DIV: &str = "Div";
    pub const CAST: &str = "Cast";
    pub const PRINT: &str = "Print";
    pub const CALL: &str = "Call";

    /// Whether `ty` names one of the arithmetic binary ops.
    pub fn is_arith(ty: &str) -> bool {
        matches!(ty, ADD | SUB | MUL | DIV)
    }

    /// The C++ infix operator for an arithmetic node type.
    pub fn op_symbol(ty: &str) -> &'static str {
        match ty {
            ADD => "+",
            SUB => "-",
            MUL => "*",
            DIV => "/",
            _ => unreachable!("op_symbol called on non-arithmetic type {ty}"),
        }
    }
}

/// A connection between a source node's output port and a destination node's
/// input port.
///
/// An edge without `to_port` is positional: its index within the
/// destination's incoming-edge list (in IR order) determines which input
/// port it binds.
#[derive(Clone, Debug, PartialEq, Eq, Deserialize, Serialize)]
pub struct Edge {
    pub from: NodeId,
    pub to: NodeId,
    #[serde(default, rename = "fromPort", skip_serializing_if = "Option::is_none")]
    pub from_port: Option<String>,
    #[serde(default, rename = "toPort", skip_serializing_if = "Option::is_none")]
    pub to_port: Option<String>,
}

impl Edge {
    pub fn new(from: impl Into<NodeId>, to: impl Into<NodeId>) -> Self {
        Edge {
            from: from.into(),
            to: to.into(),
            from_port: None,
            to_port: None,
        }
    }
}

/// A single node in the graph.
#[derive(Clone, Debug, Deserialize, Serialize)]
pub struct Node {
    pub id: NodeId,
    #[serde(rename = "type")]
    pub ty: String,
    #[serde(default, skip_serializing_if = "Map::is_empty")]
    pub properties: Map<String, Value>,
    /// Ordered, de-duplicated sources feeding this node, populated by
    /// [`crate::normalize::normalize`].
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub inputs: Vec<NodeId>,
    /// Ordered, de-duplicated destinations this node feeds, populated by
    /// [`crate::normalize::normalize`].
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub outputs: Vec<NodeId>,
}

impl Node {
    /// Look up a named property as a raw JSON value.
    pub fn property(&self, name: &str) -> Option<&Value> {
        self.properties.get(name)
    }

    /// The `properties.name` string, used by `Param` and `Call` nodes.
    pub fn name_property(&self) -> Option<&str> {
        self.property("name").and_then(Value::as_str)
    }
}

/// A named, typed port descriptor.
#[derive(Clone, Debug, PartialEq, Eq, Deserialize, Serialize)]
pub struct PortDef {
    pub name: String,
    #[serde(rename = "type")]
    pub ty: String,
}

/// A C++ header/function binding for a catalog-extension node type.
#[derive(Clone, Debug, PartialEq, Eq, Deserialize, Serialize)]
pub struct LibDef {
    pub include: String,
    pub name: String,
}

/// A catalog entry describing one node type's port signature and optional
/// library binding.
#[derive(Clone, Debug, Default, Deserialize, Serialize)]
pub struct NodeDef {
    #[serde(default)]
    pub inputs: Vec<PortDef>,
    #[serde(default)]
    pub outputs: Vec<PortDef>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub lib: Option<LibDef>,
}

/// The read-only node-definitions catalog: node-type name to descriptor.
pub type Catalog = BTreeMap<String, NodeDef>;

/// A function parameter: name and declared type.
#[derive(Clone, Debug, PartialEq, Eq, Deserialize, Serialize)]
pub struct Param {
    pub name: String,
    #[serde(rename = "type")]
    pub ty: String,
}

/// A user-defined subgraph's body: its own nodes, edges, and optional
/// explicit return node.
#[derive(Clone, Debug, Default, Deserialize, Serialize)]
pub struct FnGraph {
    #[serde(default)]
    pub nodes: Vec<Node>,
    #[serde(default)]
    pub edges: Vec<Edge>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    #[serde(rename = "return")]
    pub return_node: Option<NodeId>,
}

/// A user-defined function: name, parameters, return type, and body graph.
#[derive(Clone, Debug, Deserialize, Serialize)]
pub struct FunctionDef {
    pub name: String,
    #[serde(default)]
    pub params: Vec<Param>,
    #[serde(rename = "returnType")]
    pub return_type: String,
    pub graph: FnGraph,
}

/// The top-level IR document.
#[derive(Clone, Debug, Default, Deserialize, Serialize)]
pub struct Ir {
    #[serde(default)]
    pub imports: Vec<String>,
    #[serde(default)]
    pub nodes: Vec<Node>,
    #[serde(default)]
    pub edges: Vec<Edge>,
    #[serde(default)]
    pub functions: Vec<FunctionDef>,
}
