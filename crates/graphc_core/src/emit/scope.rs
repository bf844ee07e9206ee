//! Per-scope variable naming: a node's emitted identifier is derived from
//! its id (sanitized, prefixed, de-duplicated); `Param` nodes bind directly
//! to their parameter name instead.

use crate::ir::NodeId;
use std::collections::HashMap;

/// Which C++ construct a scope's nodes emit into: the synthesized `main`
/// entry point, or a named user function.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum ScopeKind {
    TopLevel,
    Function(String),
}

/// Owns one scope's variable-name table and collision counters. Shared by
/// the single polymorphic node-emission routine for both the top-level
/// scope and every function scope.
pub struct Scope {
    pub kind: ScopeKind,
    names: HashMap<NodeId, String>,
    used: HashMap<String, usize>,
}

impl Scope {
    pub fn top_level() -> Self {
        Scope {
            kind: ScopeKind::TopLevel,
            names: HashMap::new(),
            used: HashMap::new(),
        }
    }

    pub fn function(name: impl Into<String>) -> Self {
        Scope {
            kind: ScopeKind::Function(name.into()),
            names: HashMap::new(),
            used: HashMap::new(),
        }
    }

    /// The enclosing function's name, for mapping entries; `None` at top
    /// level.
    pub fn function_name(&self) -> Option<String> {
        match &self.kind {
            ScopeKind::TopLevel => None,
            ScopeKind::Function(name) => Some(name.clone()),
        }
    }

    /// Directly bind `node_id` to `name`, bypassing sanitization and the
    /// collision counter. Used for `Param` nodes, whose variable *is* the
    /// parameter name.
    pub fn bind(&mut self, node_id: &str, name: impl Into<String>) {
        self.names.insert(node_id.to_string(), name.into());
    }

    /// The variable name for `node_id`: its existing binding if one was
    /// already allocated (by a prior call, or by [`bind`](Self::bind)),
    /// otherwise a freshly sanitized and de-duplicated one.
    pub fn var_for(&mut self, node_id: &str) -> String {
        if let Some(existing) = self.names.get(node_id) {
            return existing.clone();
        }
        let base = format!("v_{}", sanitize(node_id));
        let counter = self.used.entry(base.clone()).or_insert(0);
        let name = if *counter == 0 {
            base.clone()
        } else {
            format!("{base}_{counter}")
        };
        *counter += 1;
        self.names.insert(node_id.to_string(), name.clone());
        name
    }
}

/// Sanitize a raw node id into a valid C++ identifier fragment: non-word
/// characters become `_`, and a leading digit is prefixed with `_`.
fn sanitize(raw: &str) -> String {
    let mut out: String = raw
        .chars()
        .map(|c| if c.is_ascii_alphanumeric() || c == '_' { c } else { '_' })
        .collect();
    if out.chars().next().map(|c| c.is_ascii_digit()).unwrap_or(false) {
        out.insert(0, '_');
    }
    out
}
