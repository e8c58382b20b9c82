//! Masked views of a template
//!
//! Every view has the same byte length and line breaks as the original
//! text, so offsets found in a view index the original directly.

use crate::types::FileKind;

/// Byte offset → 1-based line lookup
#[derive(Debug, Clone)]
pub struct LineIndex {
    starts: Vec<usize>,
}

impl LineIndex {
    pub fn new(text: &str) -> Self {
        let mut starts = vec![0];
        starts.extend(
            text.bytes()
                .enumerate()
                .filter(|(_, b)| *b == b'\n')
                .map(|(i, _)| i + 1),
        );
        Self { starts }
    }

    pub fn line_of(&self, offset: usize) -> usize {
        self.starts.partition_point(|&start| start <= offset)
    }
}

/// Original text plus its masked views
pub struct SourceView<'a> {
    pub text: &'a str,
    pub kind: FileKind,
    /// JSP comments blanked
    pub code: String,
    /// Additionally HTML comments, scripting elements and
    /// `<script>`/`<style>` bodies blanked
    pub markup: String,
    pub lines: LineIndex,
}

impl<'a> SourceView<'a> {
    pub fn new(text: &'a str, kind: FileKind) -> Self {
        let code = mask_delimited(text, "<%--", "--%>");

        let mut markup = mask_delimited(&code, "<!--", "-->");
        markup = mask_delimited(&markup, "<%", "%>");
        for tag in ["script", "style"] {
            markup = mask_element_bodies(&markup, tag);
        }

        Self {
            text,
            kind,
            code,
            markup,
            lines: LineIndex::new(text),
        }
    }

    pub fn line_of(&self, offset: usize) -> usize {
        self.lines.line_of(offset)
    }

    /// Original text of `start..end`
    pub fn slice(&self, start: usize, end: usize) -> &'a str {
        self.text.get(start..end).unwrap_or_default()
    }
}

/// Blank `open ... close` spans, delimiters included. An unterminated span
/// runs to the end of the text.
pub fn mask_delimited(text: &str, open: &str, close: &str) -> String {
    let mut bytes = text.as_bytes().to_vec();
    let mut pos = 0;

    while let Some(found) = text[pos..].find(open) {
        let start = pos + found;
        let end = text[start + open.len()..]
            .find(close)
            .map(|i| start + open.len() + i + close.len())
            .unwrap_or(text.len());
        blank(&mut bytes, start, end);
        pos = end;
    }

    into_string(bytes)
}

/// Blank the content between `<tag ...>` and `</tag`, keeping the tags
fn mask_element_bodies(text: &str, tag: &str) -> String {
    let lower = text.to_ascii_lowercase();
    let open = format!("<{}", tag);
    let close = format!("</{}", tag);
    let mut bytes = text.as_bytes().to_vec();
    let mut pos = 0;

    while let Some(found) = lower[pos..].find(&open) {
        let start = pos + found;
        let after_name = start + open.len();
        let boundary = lower[after_name..]
            .chars()
            .next()
            .is_none_or(|c| c.is_whitespace() || c == '>' || c == '/');
        if !boundary {
            pos = after_name;
            continue;
        }

        let Some(gt) = lower[after_name..].find('>') else {
            break;
        };
        let body_start = after_name + gt + 1;
        let body_end = lower[body_start..]
            .find(&close)
            .map(|i| body_start + i)
            .unwrap_or(text.len());
        blank(&mut bytes, body_start, body_end);
        pos = body_end;
    }

    into_string(bytes)
}

fn blank(bytes: &mut [u8], start: usize, end: usize) {
    for b in &mut bytes[start..end] {
        if *b != b'\n' && *b != b'\r' {
            *b = b' ';
        }
    }
}

// Spans always start and end on char boundaries, so this never replaces
fn into_string(bytes: Vec<u8>) -> String {
    String::from_utf8_lossy(&bytes).into_owned()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_line_index() {
        let index = LineIndex::new("a\nbc\n\nd");
        assert_eq!(index.line_of(0), 1);
        assert_eq!(index.line_of(2), 2);
        assert_eq!(index.line_of(5), 3);
        assert_eq!(index.line_of(6), 4);
    }

    #[test]
    fn test_jsp_comment_masking_keeps_layout() {
        let text = "<%-- <%@ include file=\"x.jsp\" %>\nnote --%>ok";
        let view = SourceView::new(text, FileKind::Jsp);
        assert_eq!(view.code.len(), text.len());
        assert!(!view.code.contains("include"));
        assert_eq!(view.code.matches('\n').count(), 1);
        assert!(view.code.ends_with("ok"));
    }

    #[test]
    fn test_multibyte_masking() {
        let text = "<!-- 日本語 -->\n<form>";
        let view = SourceView::new(text, FileKind::Jsp);
        assert_eq!(view.markup.len(), text.len());
        assert!(view.markup.ends_with("\n<form>"));
    }

    #[test]
    fn test_markup_view_blanks_scripts() {
        let text = "<script type=\"x\">if (a<b) {}</script><form action=\"<%= u %>\">";
        let view = SourceView::new(text, FileKind::Jsp);
        assert!(view.markup.starts_with("<script type=\"x\">"));
        assert!(!view.markup.contains("a<b"));
        assert!(!view.markup.contains("<%="));
        assert!(view.markup.contains("</script><form action=\""));
        assert!(view.code.contains("<%= u %>"));
    }

    #[test]
    fn test_unterminated_comment_runs_to_end() {
        assert_eq!(mask_delimited("a<%--b", "<%--", "--%>"), "a     ");
    }
}
