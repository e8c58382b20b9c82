//! Form and custom tag detection
//!
//! The structure strategy walks markup events from `quick-xml` over the
//! markup view, where comments, scripting elements and script bodies are
//! already blanked. It tolerates unclosed and mismatched tags; anything
//! the reader rejects outright is handed back as an error and the caller
//! uses the pattern strategy for that file.

use super::patterns;
use super::view::SourceView;
use crate::types::{Construct, Result};

pub trait MarkupStrategy: Send + Sync {
    fn name(&self) -> &'static str;

    /// `Form` constructs followed by their `FormField` constructs
    fn forms(&self, view: &SourceView<'_>) -> Result<Vec<Construct>>;

    fn custom_tags(&self, view: &SourceView<'_>) -> Result<Vec<Construct>>;
}

#[derive(Debug, Default, Clone, Copy)]
pub struct PatternMarkup;

impl MarkupStrategy for PatternMarkup {
    fn name(&self) -> &'static str {
        "pattern"
    }

    fn forms(&self, view: &SourceView<'_>) -> Result<Vec<Construct>> {
        patterns::forms(view)
    }

    fn custom_tags(&self, view: &SourceView<'_>) -> Result<Vec<Construct>> {
        patterns::custom_tags(view)
    }
}

#[cfg(feature = "markup")]
pub use structure::StructureMarkup;

#[cfg(feature = "markup")]
mod structure {
    use quick_xml::Reader;
    use quick_xml::events::{BytesStart, Event};

    use super::MarkupStrategy;
    use crate::analyzer::extractor::patterns;
    use crate::analyzer::extractor::view::SourceView;
    use crate::types::{Construct, ConstructPayload, FieldElement, JspError, Result};

    /// Markup event walker backed by `quick-xml`
    #[derive(Debug, Default, Clone, Copy)]
    pub struct StructureMarkup;

    enum Tag<'a> {
        Open(BytesStart<'a>),
        Empty(BytesStart<'a>),
        Close(Vec<u8>),
    }

    /// Walk start, empty and end tags with their byte spans
    fn walk_tags(
        markup: &str,
        mut on_tag: impl FnMut(Tag<'_>, usize, usize) -> Result<()>,
    ) -> Result<()> {
        let mut reader = Reader::from_str(markup);
        reader.trim_text(false);
        reader.check_end_names(false);

        loop {
            let start = reader.buffer_position();
            let event = reader
                .read_event()
                .map_err(|e| JspError::Markup(format!("at byte {}: {}", start, e)))?;
            let end = reader.buffer_position();

            match event {
                Event::Start(tag) => on_tag(Tag::Open(tag), start, end)?,
                Event::Empty(tag) => on_tag(Tag::Empty(tag), start, end)?,
                Event::End(tag) => on_tag(Tag::Close(tag.name().as_ref().to_vec()), start, end)?,
                Event::Eof => break,
                _ => {}
            }
        }

        Ok(())
    }

    fn tag_name(tag: &BytesStart<'_>) -> String {
        String::from_utf8_lossy(tag.name().as_ref()).to_ascii_lowercase()
    }

    impl MarkupStrategy for StructureMarkup {
        fn name(&self) -> &'static str {
            "structure"
        }

        fn forms(&self, view: &SourceView<'_>) -> Result<Vec<Construct>> {
            let mut found = Vec::new();
            let mut forms = 0;
            let mut open_form: Option<usize> = None;

            walk_tags(&view.markup, |tag, start, end| {
                let self_closing = matches!(tag, Tag::Empty(_));
                match tag {
                    Tag::Open(t) | Tag::Empty(t) if tag_name(&t) == "form" => {
                        let index = forms;
                        forms += 1;
                        found.push(patterns::form_construct(view, index, start, end)?);
                        open_form = (!self_closing).then_some(index);
                    }
                    Tag::Open(t) | Tag::Empty(t) => {
                        if let (Some(form), Some(element)) =
                            (open_form, FieldElement::parse(&tag_name(&t)))
                        {
                            found.push(patterns::field_construct(view, form, element, start, end)?);
                        }
                    }
                    Tag::Close(name) if name.eq_ignore_ascii_case(b"form") => open_form = None,
                    Tag::Close(_) => {}
                }
                Ok(())
            })?;

            Ok(found)
        }

        fn custom_tags(&self, view: &SourceView<'_>) -> Result<Vec<Construct>> {
            let mut found = Vec::new();

            walk_tags(&view.markup, |tag, start, end| {
                if let Tag::Open(t) | Tag::Empty(t) = tag {
                    let name = String::from_utf8_lossy(t.name().as_ref()).into_owned();
                    if let Some((prefix, local)) = name.split_once(':')
                        && !prefix.is_empty()
                        && !local.is_empty()
                        && !patterns::is_standard_prefix(prefix)
                    {
                        found.push(Construct::new(
                            view.line_of(start),
                            start,
                            view.slice(start, end),
                            ConstructPayload::CustomTag {
                                prefix: prefix.to_string(),
                                tag: local.to_string(),
                            },
                        ));
                    }
                }
                Ok(())
            })?;

            Ok(found)
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::{ConstructKind, ConstructPayload, FileKind};

    const PAGE: &str = r#"<%@ taglib prefix="ui" tagdir="/WEB-INF/tags" %>
<html><body>
<!-- <form action="old"></form> -->
<form action="/login" method="post">
  <input type="text" name="user">
  <input type="password" name="pass"/>
  <br>
  <ui:captcha size="4"/>
</form>
<script>var s = "<form>";</script>
<ui:footer></ui:footer>
</body></html>"#;

    fn field_names(constructs: &[Construct]) -> Vec<String> {
        constructs
            .iter()
            .filter_map(|c| match &c.payload {
                ConstructPayload::FormField(f) => f.name.clone(),
                _ => None,
            })
            .collect()
    }

    #[test]
    fn test_pattern_markup() {
        let view = SourceView::new(PAGE, FileKind::Jsp);
        let forms = PatternMarkup.forms(&view).unwrap();
        assert_eq!(forms.iter().filter(|c| c.kind() == ConstructKind::Form).count(), 1);
        assert_eq!(field_names(&forms), vec!["user", "pass"]);
        assert_eq!(forms[0].line, 4);
    }

    #[cfg(feature = "markup")]
    #[test]
    fn test_structure_markup_matches_pattern() {
        let view = SourceView::new(PAGE, FileKind::Jsp);
        let forms = StructureMarkup.forms(&view).unwrap();
        assert_eq!(forms.iter().filter(|c| c.kind() == ConstructKind::Form).count(), 1);
        assert_eq!(field_names(&forms), vec!["user", "pass"]);
        assert_eq!(forms[0].line, 4);

        let tags = StructureMarkup.custom_tags(&view).unwrap();
        let names: Vec<_> = tags
            .iter()
            .map(|c| match &c.payload {
                ConstructPayload::CustomTag { prefix, tag } => format!("{}:{}", prefix, tag),
                _ => unreachable!(),
            })
            .collect();
        assert_eq!(names, vec!["ui:captcha", "ui:footer"]);
    }

    #[cfg(feature = "markup")]
    #[test]
    fn test_structure_counts_unclosed_form_fields() {
        let view = SourceView::new("<form><input name=\"a\"><select name=\"b\">", FileKind::Jsp);
        let forms = StructureMarkup.forms(&view).unwrap();
        assert_eq!(field_names(&forms), vec!["a", "b"]);
        assert!(PatternMarkup.forms(&view).unwrap().is_empty());
    }
}
