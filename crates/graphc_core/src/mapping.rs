//! Source-map entries: per-node/port `(line, column)` spans recorded during
//! emission, later consulted to resolve compiler diagnostics back to graph
//! elements.

use serde::{Deserialize, Serialize};

/// A single mapped span: the node (and, for function bodies, the function)
/// it belongs to, its line range, and — once finalized — its column range.
///
/// Lines and columns are 1-based. `start_col`/`end_col` are `None` for a
/// coarse entry until [`finalize`] fills them in from the emitted text.
#[derive(Clone, Debug, PartialEq, Eq, Deserialize, Serialize)]
pub struct MappingEntry {
    pub node_id: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub function: Option<String>,
    pub start_line: usize,
    pub end_line: usize,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub start_col: Option<usize>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub end_col: Option<usize>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub port: Option<String>,
}

impl MappingEntry {
    /// A fine-grained, already-columned entry for a fragment marker.
    pub fn fragment(
        node_id: impl Into<String>,
        function: Option<String>,
        line: usize,
        start_col: usize,
        end_col: usize,
        port: Option<String>,
    ) -> Self {
        MappingEntry {
            node_id: node_id.into(),
            function,
            start_line: line,
            end_line: line,
            start_col: Some(start_col),
            end_col: Some(end_col),
            port,
        }
    }

    /// A coarse, whole-statement entry whose columns are filled in later by
    /// [`finalize`].
    pub fn coarse(
        node_id: impl Into<String>,
        function: Option<String>,
        start_line: usize,
        end_line: usize,
    ) -> Self {
        MappingEntry {
            node_id: node_id.into(),
            function,
            start_line,
            end_line,
            start_col: None,
            end_col: None,
            port: None,
        }
    }

    /// Whether `(line, col)` falls within this entry's line and (if set)
    /// column range.
    pub fn contains(&self, line: usize, col: Option<usize>) -> bool {
        if line < self.start_line || line > self.end_line {
            return false;
        }
        match (self.start_col, self.end_col, col) {
            (Some(s), Some(e), Some(c)) => c >= s && c <= e,
            _ => true,
        }
    }

    /// Whether this entry has an explicit column range.
    pub fn has_columns(&self) -> bool {
        self.start_col.is_some() && self.end_col.is_some()
    }

    /// `(line_span, col_span)`, used to rank candidate spans by area — the
    /// innermost (smallest) span wins when several contain the same point.
    pub fn span_area(&self) -> (usize, usize) {
        let line_span = self.end_line - self.start_line;
        let col_span = match (self.start_col, self.end_col) {
            (Some(s), Some(e)) => e.saturating_sub(s),
            _ => usize::MAX,
        };
        (line_span, col_span)
    }
}

/// Fill in `start_col`/`end_col` for every coarse entry, given the full
/// emitted source text: `start_col` is the column of the first non-space
/// character on the entry's line, `end_col` is the column of the line's last
/// character.
pub fn finalize(entries: &mut [MappingEntry], source: &str) {
    let lines: Vec<&str> = source.lines().collect();
    for entry in entries.iter_mut() {
        if entry.has_columns() {
            continue;
        }
        if let Some(line) = lines.get(entry.start_line.saturating_sub(1)) {
            let start = line
                .char_indices()
                .find(|(_, c)| !c.is_whitespace())
                .map(|(i, _)| i + 1)
                .unwrap_or(1);
            let end = line.chars().count().max(1);
            entry.start_col = Some(start);
            entry.end_col = Some(end);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn finalize_fills_coarse_span_from_line_text() {
        let mut entries = vec![MappingEntry::coarse("n", None, 2, 2)];
        let src = "int main() {\n  double v = 1;\n}\n";
        finalize(&mut entries, src);
        assert_eq!(entries[0].start_col, Some(3));
        assert_eq!(entries[0].end_col, Some(15));
    }

    #[test]
    fn fragment_entries_are_left_untouched_by_finalize() {
        let mut entries = vec![MappingEntry::fragment("n", None, 2, 5, 9, Some("a".into()))];
        finalize(&mut entries, "a\nbb\n");
        assert_eq!(entries[0].start_col, Some(5));
        assert_eq!(entries[0].end_col, Some(9));
    }

    #[test]
    fn smallest_area_wins_among_overlapping_entries() {
        let outer = MappingEntry::coarse("outer", None, 1, 1);
        let mut outer = outer;
        outer.start_col = Some(1);
        outer.end_col = Some(20);
        let inner = MappingEntry::fragment("inner", None, 1, 5, 7, None);
        assert!(inner.span_area() < outer.span_area());
    }
}
