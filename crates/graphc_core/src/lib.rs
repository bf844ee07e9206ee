//! Compiles a dataflow node graph IR into C++ source, with validation and
//! source-mapped diagnostics.
//!
//! The pipeline is: [`normalize`] the IR into canonical edge/port form,
//! [`validate::validate`] it against a [`ir::Catalog`], [`emit::emit`] C++
//! source with an accompanying [`mapping::MappingEntry`] table, then (outside
//! this crate) compile and run the result and resolve any diagnostics with
//! [`diagnostics`].

pub use diagnostics::{map_diagnostics, parse_diagnostics, Diagnostic, MappedDiagnostic};
pub use emit::{emit, EmitError, Emitted};
pub use graph::{GraphError, GraphErrorKind};
pub use ir::{Catalog, Edge, FunctionDef, Ir, LibDef, Node, NodeDef, Param, PortDef};
pub use mapping::MappingEntry;
pub use normalize::normalize;
pub use types::{infer_literal_type, is_assignable, CanonicalType, Scalar};
pub use validate::{validate, ValidationError};

pub mod diagnostics;
pub mod emit;
pub mod graph;
pub mod ir;
pub mod mapping;
pub mod normalize;
pub mod types;
pub mod validate;

/// The node id used for a function's synthesized `return` statement mapping
/// entry, in the form `"<function>::return"`.
pub fn return_node_id(function: &str) -> String {
    format!("{function}::return")
}
