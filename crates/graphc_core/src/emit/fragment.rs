//! Builds a single emitted line as an ordered sequence of text fragments,
//! resolving each marked fragment's column span in the same pass that
//! concatenates the line's text.

/// A marked fragment's resolved span, 1-based and inclusive on both ends.
pub struct MarkedSpan {
    pub node_id: String,
    pub port: Option<String>,
    pub start_col: usize,
    pub end_col: usize,
}

struct Fragment {
    text: String,
    marker: Option<(String, Option<String>)>,
}

/// A line under construction, composed of unmarked and marked fragments.
#[derive(Default)]
pub struct Line {
    fragments: Vec<Fragment>,
}

impl Line {
    pub fn new() -> Self {
        Self::default()
    }

    /// Append unmarked text.
    pub fn text(mut self, text: impl Into<String>) -> Self {
        self.fragments.push(Fragment {
            text: text.into(),
            marker: None,
        });
        self
    }

    /// Append text whose character range should be recorded as a span
    /// attributed to `node_id`/`port`.
    pub fn marked(mut self, text: impl Into<String>, node_id: impl Into<String>, port: Option<String>) -> Self {
        self.fragments.push(Fragment {
            text: text.into(),
            marker: Some((node_id.into(), port)),
        });
        self
    }

    /// Concatenate all fragments into the line's text and resolve every
    /// marked fragment's `(start_col, end_col)`.
    pub fn build(self) -> (String, Vec<MarkedSpan>) {
        let mut out = String::new();
        let mut spans = Vec::new();
        for frag in self.fragments {
            let start_col = out.chars().count() + 1;
            out.push_str(&frag.text);
            let end_col = out.chars().count();
            if let Some((node_id, port)) = frag.marker {
                spans.push(MarkedSpan {
                    node_id,
                    port,
                    start_col,
                    end_col,
                });
            }
        }
        (out, spans)
    }
}
