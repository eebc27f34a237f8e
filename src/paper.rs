use serde::Serialize;

/// Most papers any single lookup hands back.
pub const MAX_PAPERS: usize = 5;

/// A normalized paper reference: what every provider decodes into.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct PaperRecord {
    pub title: String,
    pub summary: String,
    pub link: String,
}

impl PaperRecord {
    pub fn new(
        title: impl Into<String>,
        summary: impl Into<String>,
        link: impl Into<String>,
    ) -> Self {
        Self {
            title: title.into(),
            summary: summary.into(),
            link: link.into(),
        }
    }
}

/// Collapse runs of whitespace (including the hard wraps arXiv puts in titles) into single spaces.
pub(crate) fn normalize_whitespace(s: &str) -> String {
    s.split_whitespace().collect::<Vec<_>>().join(" ")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn normalize_collapses_wrapped_lines() {
        assert_eq!(
            normalize_whitespace("  Attention Is\n  All You   Need \n"),
            "Attention Is All You Need"
        );
        assert_eq!(normalize_whitespace(""), "");
    }

    #[test]
    fn record_serializes_with_plain_field_names() {
        let record = PaperRecord::new("T", "S", "https://arxiv.org/abs/1");
        let json = serde_json::to_value(&record).unwrap();
        assert_eq!(
            json,
            serde_json::json!({"title": "T", "summary": "S", "link": "https://arxiv.org/abs/1"})
        );
    }
}
