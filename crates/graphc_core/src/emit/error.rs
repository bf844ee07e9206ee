//! Emission error taxonomy.

use crate::ir::NodeId;
use thiserror::Error;

/// What went wrong while emitting a node. Emission is otherwise soft —
/// these are reserved for structurally malformed nodes that should have
/// been caught by validation but weren't (e.g. emitting a graph that was
/// never validated).
#[derive(Clone, Debug, Error, PartialEq, Eq)]
pub enum EmitError {
    #[error("node {node_id:?} of type {node_type:?} is missing required property {property:?}")]
    MissingProperty {
        node_id: NodeId,
        node_type: String,
        property: String,
    },

    #[error("function {function:?} names unknown return node {node_id:?}")]
    UnknownReturnNode { function: String, node_id: NodeId },
}
