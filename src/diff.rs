//! Diff hunk classification and HTML rendering for comment context.

/// Type of a line in a review comment's diff hunk
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LineKind {
    /// `@@ -a,b +c,d @@`
    Header,
    /// `--- a/file` or `+++ b/file`
    FileMarker,
    Addition,
    Deletion,
    Context,
}

impl LineKind {
    /// CSS class the page styles this kind with
    pub fn css_class(&self) -> &'static str {
        match self {
            LineKind::Header => "diff-header",
            LineKind::FileMarker => "diff-file",
            LineKind::Addition => "diff-add",
            LineKind::Deletion => "diff-del",
            LineKind::Context => "diff-context",
        }
    }
}

/// A single line of a hunk with its classification
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DiffLine<'a> {
    pub kind: LineKind,
    pub content: &'a str,
}

/// Classify a diff line by its leading characters.
///
/// File markers are checked before single `+`/`-` so `+++ b/x` never counts
/// as an addition.
pub fn classify_line(line: &str) -> LineKind {
    if line.starts_with("@@") {
        LineKind::Header
    } else if line.starts_with("+++") || line.starts_with("---") {
        LineKind::FileMarker
    } else if line.starts_with('+') {
        LineKind::Addition
    } else if line.starts_with('-') {
        LineKind::Deletion
    } else {
        LineKind::Context
    }
}

/// Split a hunk into classified lines, preserving order and content.
pub fn parse_hunk(hunk: &str) -> Vec<DiffLine<'_>> {
    let hunk = hunk.strip_suffix('\n').unwrap_or(hunk);
    if hunk.is_empty() {
        return Vec::new();
    }

    hunk.split('\n')
        .map(|content| DiffLine {
            kind: classify_line(content),
            content,
        })
        .collect()
}

/// Escape text for safe inclusion in HTML element content or attributes
pub fn escape_html(text: &str) -> String {
    let mut escaped = String::with_capacity(text.len());
    for ch in text.chars() {
        match ch {
            '&' => escaped.push_str("&amp;"),
            '<' => escaped.push_str("&lt;"),
            '>' => escaped.push_str("&gt;"),
            '"' => escaped.push_str("&quot;"),
            '\'' => escaped.push_str("&#39;"),
            _ => escaped.push(ch),
        }
    }
    escaped
}

/// Render a hunk as one escaped `<span>` per line, classed by line kind.
pub fn render_hunk(hunk: &str) -> String {
    parse_hunk(hunk)
        .iter()
        .map(|line| {
            format!(
                "<span class=\"diff-line {}\">{}</span>",
                line.kind.css_class(),
                escape_html(line.content)
            )
        })
        .collect()
}
