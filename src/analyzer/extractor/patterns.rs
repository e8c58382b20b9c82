//! Pattern-based construct extraction
//!
//! Regexes are compiled once per process. A pattern that fails to compile
//! is reported per construct kind, never as a panic.

use regex::Regex;
use std::collections::BTreeMap;
use std::sync::OnceLock;

use super::view::SourceView;
use crate::constants::extraction::{DYNAMIC_MARKERS, JS_NON_CALLS, STANDARD_PREFIXES};
use crate::types::{
    AttributeOperation, Construct, ConstructKind, ConstructPayload, DbOperationKind, DirectiveKind,
    FieldElement, FileKind, Form, FormField, FrontendInventory, IncludeMechanism, IncludeRef,
    JspError, JstlLibrary, MarkupProfile, ResponseOperation, Result,
};

pub(crate) type PatternResult = std::result::Result<&'static Regex, String>;

pub(crate) fn cached(cell: &'static OnceLock<std::result::Result<Regex, String>>, pattern: &str) -> PatternResult {
    cell.get_or_init(|| Regex::new(pattern).map_err(|e| e.to_string()))
        .as_ref()
        .map_err(Clone::clone)
}

/// Declare a lazily compiled regex accessor
macro_rules! regex_fn {
    ($name:ident, $pattern:expr) => {
        pub(crate) fn $name() -> $crate::analyzer::extractor::patterns::PatternResult {
            static RE: ::std::sync::OnceLock<::std::result::Result<::regex::Regex, String>> =
                ::std::sync::OnceLock::new();
            $crate::analyzer::extractor::patterns::cached(&RE, $pattern)
        }
    };
}
pub(crate) use regex_fn;

/// Resolve a pattern, attributing a failure to `kind`
pub(crate) fn pattern(kind: ConstructKind, accessor: fn() -> PatternResult) -> Result<&'static Regex> {
    accessor().map_err(|message| JspError::Pattern { kind, message })
}

// =============================================================================
// Patterns
// =============================================================================

// attribute values may embed scripting elements: page="<%= x %>"
const TAG_BODY: &str = r#"((?:<%.*?%>|"[^"]*"|'[^']*'|[^>])*)"#;

regex_fn!(regex_attribute, r#"([\w:.-]+)\s*=\s*(?:"([^"]*)"|'([^']*)'|([^\s>]+))"#);
regex_fn!(regex_directive, r"(?s)<%@\s*([\w.]+)(.*?)%>");
regex_fn!(regex_xml_directive, &format!(r"(?s)<jsp:directive\.(\w+)\b{}>", TAG_BODY));
regex_fn!(regex_include_directive, r"(?s)<%@\s*include\b(.*?)%>");
regex_fn!(regex_include_action, &format!(r"(?s)<jsp:include\b{}>", TAG_BODY));
regex_fn!(regex_import_tag, &format!(r"(?s)<c:import\b{}>", TAG_BODY));
regex_fn!(regex_scripting, r"(?s)<%(.*?)%>");
regex_fn!(
    regex_xml_scripting,
    r"(?s)<jsp:(scriptlet|expression|declaration)\s*>(.*?)</jsp:(?:scriptlet|expression|declaration)\s*>"
);
regex_fn!(regex_el, r"([$#])\{([^}]+)\}");
regex_fn!(regex_jstl_tag, r"<(c|fmt|sql|x):(\w+)");
regex_fn!(regex_jstl_function, r"\bfn:(\w+)\(");
regex_fn!(regex_custom_tag, r"<([A-Za-z0-9_]+):([A-Za-z0-9_-]+)");
regex_fn!(
    regex_action,
    &format!(r"(?s)<jsp:(useBean|setProperty|getProperty|forward|param)\b{}>", TAG_BODY)
);
regex_fn!(regex_form, r"(?is)<form\b([^>]*)>(.*?)</form\s*>");
regex_fn!(regex_field, r"(?i)<(input|select|textarea)\b([^>]*)>");
regex_fn!(
    regex_session,
    r#"session\.(getAttribute|setAttribute|removeAttribute)\(\s*["']([^"']+)["']|\$\{\s*sessionScope\.(\w+)"#
);
regex_fn!(
    regex_request,
    r#"request\.(getParameter|getAttribute|setAttribute)\(\s*["']([^"']+)["']|\$\{\s*param\.(\w+)"#
);
regex_fn!(
    regex_response,
    r#"response\.(sendRedirect|setContentType)\(\s*(?:["']([^"']*)["'])?"#
);
regex_fn!(
    regex_db_connection,
    r"\b(?:(\w+)\.getConnection\s*\(|DataSource\s+\w+\s*=)"
);
regex_fn!(
    regex_db_statement,
    r#"\.(executeQuery|executeUpdate|executeBatch|execute|prepareStatement|prepareCall)\s*\(\s*(?:"([^"]*)"|'([^']*)')?"#
);

// markup profile
regex_fn!(regex_html_element, r"<[A-Za-z][^>]*>");
regex_fn!(regex_script_block, r"(?i)<script\b[^>]*>");
regex_fn!(regex_style_block, r"(?i)<style\b[^>]*>");
regex_fn!(regex_html_comment, r"(?s)<!--.*?-->");
regex_fn!(regex_jsp_comment, r"(?s)<%--.*?--%>");
regex_fn!(
    regex_class_attribute,
    r#"<([A-Za-z][\w:.-]*)[^>]*?\sclass\s*=\s*(?:"([^"]*)"|'([^']*)')"#
);
regex_fn!(regex_el_span, r"[$#]\{[^}]*\}");
regex_fn!(regex_script_body, r"(?is)<script\b[^>]*>(.*?)</script\s*>");
regex_fn!(regex_event_handler, r#"(?i)\son\w+\s*=\s*(?:"([^"]*)"|'([^']*)')"#);
regex_fn!(
    regex_js_function,
    r"\bfunction\s+([A-Za-z_$][\w$]*)\s*\(|([A-Za-z_$][\w$]*)\s*[:=]\s*function\b"
);
regex_fn!(
    regex_js_call,
    r"\bfunction\s+[A-Za-z_$][\w$]*\s*\(|([A-Za-z_$][\w$]*)\s*\("
);

// =============================================================================
// Helpers
// =============================================================================

/// Parse `name="value"` pairs; later duplicates win
pub fn parse_attributes(raw: &str, kind: ConstructKind) -> Result<BTreeMap<String, String>> {
    let re = pattern(kind, regex_attribute)?;
    Ok(re
        .captures_iter(raw)
        .map(|caps| {
            let value = caps
                .get(2)
                .or_else(|| caps.get(3))
                .or_else(|| caps.get(4))
                .map(|m| m.as_str())
                .unwrap_or_default();
            (caps[1].to_string(), value.to_string())
        })
        .collect())
}

/// Case-insensitive attribute lookup, for HTML
pub fn attribute_ci<'m>(attributes: &'m BTreeMap<String, String>, name: &str) -> Option<&'m str> {
    attributes
        .iter()
        .find(|(key, _)| key.eq_ignore_ascii_case(name))
        .map(|(_, value)| value.as_str())
}

pub fn is_dynamic(target: &str) -> bool {
    DYNAMIC_MARKERS.iter().any(|marker| target.contains(marker))
}

pub fn is_standard_prefix(prefix: &str) -> bool {
    STANDARD_PREFIXES.contains(&prefix)
}

fn construct(view: &SourceView<'_>, start: usize, end: usize, payload: ConstructPayload) -> Construct {
    Construct::new(view.line_of(start), start, view.slice(start, end), payload)
}

// =============================================================================
// Extraction
// =============================================================================

/// Page, include, taglib, tag, attribute and variable directives, in both
/// `<%@ %>` and `<jsp:directive.* />` syntax
pub fn directives(view: &SourceView<'_>) -> Result<Vec<Construct>> {
    let kind = ConstructKind::Directive;
    let mut found = Vec::new();

    for re in [pattern(kind, regex_directive)?, pattern(kind, regex_xml_directive)?] {
        for caps in re.captures_iter(&view.code) {
            let Some(directive) = DirectiveKind::parse(&caps[1]) else {
                continue;
            };
            let whole = caps.get(0).map_or(0..0, |m| m.range());
            let attributes = parse_attributes(&caps[2], kind)?;
            found.push(construct(
                view,
                whole.start,
                whole.end,
                ConstructPayload::Directive {
                    directive,
                    attributes,
                },
            ));
        }
    }

    Ok(found)
}

/// All three include mechanisms. A tag without its target attribute is
/// not an include.
pub fn includes(view: &SourceView<'_>) -> Result<Vec<Construct>> {
    let kind = ConstructKind::Include;
    // the XML directive pattern captures the directive name first
    let sources: [(fn() -> PatternResult, IncludeMechanism, &str, bool); 4] = [
        (regex_include_directive, IncludeMechanism::Directive, "file", false),
        (regex_xml_directive, IncludeMechanism::Directive, "file", true),
        (regex_include_action, IncludeMechanism::Action, "page", false),
        (regex_import_tag, IncludeMechanism::Import, "url", false),
    ];

    let mut found = Vec::new();
    for (accessor, mechanism, attribute, named) in sources {
        let re = pattern(kind, accessor)?;
        for caps in re.captures_iter(&view.code) {
            let body = if named {
                if &caps[1] != "include" {
                    continue;
                }
                &caps[2]
            } else {
                &caps[1]
            };

            let attributes = parse_attributes(body, kind)?;
            let Some(target) = attributes.get(attribute).map(|t| t.trim()) else {
                continue;
            };
            if target.is_empty() {
                continue;
            }

            let whole = caps.get(0).map_or(0..0, |m| m.range());
            found.push(construct(
                view,
                whole.start,
                whole.end,
                ConstructPayload::Include(IncludeRef {
                    mechanism,
                    target: target.to_string(),
                    dynamic: is_dynamic(target),
                }),
            ));
        }
    }

    Ok(found)
}

/// Scripting element before scoring
#[derive(Debug, Clone, PartialEq)]
pub struct ScriptingElement {
    pub kind: ConstructKind,
    pub offset: usize,
    pub end: usize,
    pub body: String,
}

/// Scriptlets, declarations and expressions. XML-syntax elements
/// (`<jsp:scriptlet>`) are recognised in `.tagx` documents.
pub fn scripting_elements(view: &SourceView<'_>) -> Result<Vec<ScriptingElement>> {
    let mut found = Vec::new();

    let re = pattern(ConstructKind::Scriptlet, regex_scripting)?;
    for caps in re.captures_iter(&view.code) {
        let (Some(whole), Some(inner)) = (caps.get(0), caps.get(1)) else {
            continue;
        };
        let inner = inner.as_str();
        let (kind, body) = match inner.chars().next() {
            Some('@') => continue,
            Some('=') => (ConstructKind::Expression, &inner[1..]),
            Some('!') => (ConstructKind::Declaration, &inner[1..]),
            _ => (ConstructKind::Scriptlet, inner),
        };
        if kind == ConstructKind::Scriptlet && body.trim().is_empty() {
            continue;
        }
        found.push(ScriptingElement {
            kind,
            offset: whole.start(),
            end: whole.end(),
            body: body.trim().to_string(),
        });
    }

    if view.kind == FileKind::Tagx {
        let re = pattern(ConstructKind::Scriptlet, regex_xml_scripting)?;
        for caps in re.captures_iter(&view.code) {
            let kind = match &caps[1] {
                "expression" => ConstructKind::Expression,
                "declaration" => ConstructKind::Declaration,
                _ => ConstructKind::Scriptlet,
            };
            let whole = caps.get(0).map_or(0..0, |m| m.range());
            found.push(ScriptingElement {
                kind,
                offset: whole.start,
                end: whole.end,
                body: caps[2].trim().to_string(),
            });
        }
    }

    Ok(found)
}

/// `${...}` and deferred `#{...}` expressions
pub fn el_expressions(view: &SourceView<'_>) -> Result<Vec<Construct>> {
    let re = pattern(ConstructKind::ElExpression, regex_el)?;
    Ok(re
        .captures_iter(&view.code)
        .filter_map(|caps| {
            let whole = caps.get(0)?;
            Some(construct(
                view,
                whole.start(),
                whole.end(),
                ConstructPayload::ElExpression {
                    expression: caps[2].trim().to_string(),
                    deferred: &caps[1] == "#",
                },
            ))
        })
        .collect())
}

/// Core, fmt, sql and xml tags plus `fn:` function calls
pub fn jstl_tags(view: &SourceView<'_>) -> Result<Vec<Construct>> {
    let kind = ConstructKind::JstlTag;
    let mut found = Vec::new();

    for caps in pattern(kind, regex_jstl_tag)?.captures_iter(&view.code) {
        let (Some(whole), Some(library)) = (caps.get(0), JstlLibrary::from_prefix(&caps[1])) else {
            continue;
        };
        found.push(construct(
            view,
            whole.start(),
            whole.end(),
            ConstructPayload::JstlTag {
                library,
                tag: caps[2].to_string(),
            },
        ));
    }

    for caps in pattern(kind, regex_jstl_function)?.captures_iter(&view.code) {
        let Some(whole) = caps.get(0) else {
            continue;
        };
        found.push(construct(
            view,
            whole.start(),
            whole.end(),
            ConstructPayload::JstlTag {
                library: JstlLibrary::Functions,
                tag: caps[1].to_string(),
            },
        ));
    }

    Ok(found)
}

/// `prefix:name` tags outside the standard libraries
pub fn custom_tags(view: &SourceView<'_>) -> Result<Vec<Construct>> {
    let re = pattern(ConstructKind::CustomTag, regex_custom_tag)?;
    Ok(re
        .captures_iter(&view.code)
        .filter(|caps| !is_standard_prefix(&caps[1]))
        .filter_map(|caps| {
            let whole = caps.get(0)?;
            Some(construct(
                view,
                whole.start(),
                whole.end(),
                ConstructPayload::CustomTag {
                    prefix: caps[1].to_string(),
                    tag: caps[2].to_string(),
                },
            ))
        })
        .collect())
}

/// Standard actions other than `jsp:include`
pub fn actions(view: &SourceView<'_>) -> Result<Vec<Construct>> {
    let kind = ConstructKind::Action;
    let mut found = Vec::new();

    for caps in pattern(kind, regex_action)?.captures_iter(&view.code) {
        let Some(whole) = caps.get(0) else {
            continue;
        };
        let body = caps[2].trim_end().trim_end_matches('/');
        found.push(construct(
            view,
            whole.start(),
            whole.end(),
            ConstructPayload::Action {
                action: caps[1].to_string(),
                attributes: parse_attributes(body, kind)?,
            },
        ));
    }

    Ok(found)
}

/// Build a form construct from the original text of its opening tag
pub fn form_construct(view: &SourceView<'_>, index: usize, start: usize, end: usize) -> Result<Construct> {
    let attributes = parse_attributes(view.slice(start, end), ConstructKind::Form)?;
    let action = attribute_ci(&attributes, "action").unwrap_or_default().to_string();
    let method = attribute_ci(&attributes, "method")
        .filter(|m| !m.trim().is_empty())
        .unwrap_or("get")
        .trim()
        .to_lowercase();

    Ok(construct(
        view,
        start,
        end,
        ConstructPayload::Form(Form {
            index,
            action,
            method,
        }),
    ))
}

/// Build a field construct from the original text of its tag
pub fn field_construct(
    view: &SourceView<'_>,
    form: usize,
    element: FieldElement,
    start: usize,
    end: usize,
) -> Result<Construct> {
    let attributes = parse_attributes(view.slice(start, end), ConstructKind::FormField)?;
    let non_empty = |name: &str| {
        attribute_ci(&attributes, name)
            .filter(|v| !v.is_empty())
            .map(str::to_string)
    };

    Ok(construct(
        view,
        start,
        end,
        ConstructPayload::FormField(FormField {
            form,
            element,
            name: non_empty("name"),
            field_type: non_empty("type"),
        }),
    ))
}

/// Forms with a closing tag and the fields inside them
pub fn forms(view: &SourceView<'_>) -> Result<Vec<Construct>> {
    let form_re = pattern(ConstructKind::Form, regex_form)?;
    let field_re = pattern(ConstructKind::FormField, regex_field)?;
    let mut found = Vec::new();

    for (index, caps) in form_re.captures_iter(&view.markup).enumerate() {
        let (Some(open), Some(body)) = (caps.get(1), caps.get(2)) else {
            continue;
        };
        // opening tag is `<form` + attributes + `>`
        let tag_start = open.start() - "<form".len();
        found.push(form_construct(view, index, tag_start, open.end() + 1)?);

        for field in field_re.captures_iter(body.as_str()) {
            let (Some(whole), Some(element)) = (
                field.get(0),
                FieldElement::parse(&field[1]),
            ) else {
                continue;
            };
            let start = body.start() + whole.start();
            let end = body.start() + whole.end();
            found.push(field_construct(view, index, element, start, end)?);
        }
    }

    Ok(found)
}

/// Session attribute reads, writes and removals
pub fn session_accesses(view: &SourceView<'_>) -> Result<Vec<Construct>> {
    let re = pattern(ConstructKind::SessionAccess, regex_session)?;
    Ok(attribute_accesses(view, re, |attribute, operation| {
        ConstructPayload::SessionAccess {
            attribute,
            operation,
        }
    }))
}

/// Request parameter and attribute accesses
pub fn request_accesses(view: &SourceView<'_>) -> Result<Vec<Construct>> {
    let re = pattern(ConstructKind::RequestAccess, regex_request)?;
    Ok(attribute_accesses(view, re, |attribute, operation| {
        ConstructPayload::RequestAccess {
            attribute,
            operation,
        }
    }))
}

fn attribute_accesses(
    view: &SourceView<'_>,
    re: &Regex,
    payload: impl Fn(String, AttributeOperation) -> ConstructPayload,
) -> Vec<Construct> {
    re.captures_iter(&view.code)
        .filter_map(|caps| {
            let whole = caps.get(0)?;
            let (operation, attribute) = match (caps.get(1), caps.get(2), caps.get(3)) {
                (Some(method), Some(name), _) => {
                    let operation = match method.as_str() {
                        "getParameter" => AttributeOperation::Parameter,
                        "setAttribute" => AttributeOperation::Set,
                        "removeAttribute" => AttributeOperation::Remove,
                        _ => AttributeOperation::Get,
                    };
                    (operation, name.as_str())
                }
                // ${sessionScope.x} reads, ${param.x} is a parameter
                (_, _, Some(name)) if whole.as_str().contains("param.") => {
                    (AttributeOperation::Parameter, name.as_str())
                }
                (_, _, Some(name)) => (AttributeOperation::Get, name.as_str()),
                _ => return None,
            };
            Some(construct(
                view,
                whole.start(),
                whole.end(),
                payload(attribute.to_string(), operation),
            ))
        })
        .collect()
}

/// Redirects and content type changes
pub fn response_accesses(view: &SourceView<'_>) -> Result<Vec<Construct>> {
    let re = pattern(ConstructKind::ResponseAccess, regex_response)?;
    Ok(re
        .captures_iter(&view.code)
        .filter_map(|caps| {
            let whole = caps.get(0)?;
            let operation = match &caps[1] {
                "sendRedirect" => ResponseOperation::Redirect,
                _ => ResponseOperation::ContentType,
            };
            Some(construct(
                view,
                whole.start(),
                whole.end(),
                ConstructPayload::ResponseAccess {
                    operation,
                    value: caps.get(2).map(|m| m.as_str().to_string()).unwrap_or_default(),
                },
            ))
        })
        .collect())
}

/// JDBC connections, statements and queries. Literal SQL decides query
/// versus update; without one the method name does.
pub fn db_operations(view: &SourceView<'_>) -> Result<Vec<Construct>> {
    let kind = ConstructKind::DbOperation;
    let mut found = Vec::new();

    for caps in pattern(kind, regex_db_connection)?.captures_iter(&view.code) {
        let Some(whole) = caps.get(0) else {
            continue;
        };
        let method = match caps.get(1) {
            Some(receiver) => format!("{}.getConnection", receiver.as_str()),
            None => "DataSource".to_string(),
        };
        found.push(construct(
            view,
            whole.start(),
            whole.end(),
            ConstructPayload::DbOperation {
                operation: DbOperationKind::Connection,
                method,
                sql: None,
            },
        ));
    }

    for caps in pattern(kind, regex_db_statement)?.captures_iter(&view.code) {
        let Some(whole) = caps.get(0) else {
            continue;
        };
        let method = &caps[1];
        let sql = caps.get(2).or_else(|| caps.get(3)).map(|m| m.as_str().to_string());
        let operation = match (&sql, method) {
            (Some(sql), _) if sql.to_ascii_lowercase().contains("select") => DbOperationKind::Query,
            (Some(_), _) => DbOperationKind::Update,
            (None, "executeQuery") => DbOperationKind::Query,
            (None, "executeUpdate" | "executeBatch") => DbOperationKind::Update,
            (None, _) => DbOperationKind::Statement,
        };
        // offset of the method name, after the leading dot
        let start = whole.start() + 1;
        found.push(construct(
            view,
            start,
            whole.end(),
            ConstructPayload::DbOperation {
                operation,
                method: method.to_string(),
                sql,
            },
        ));
    }

    found.sort_by_key(|c| c.offset);
    Ok(found)
}

/// Markup counts plus the CSS classes and JavaScript names of a page.
/// Pattern failures are attributed to custom tags, the closest construct.
pub fn markup_profile(view: &SourceView<'_>) -> Result<MarkupProfile> {
    let kind = ConstructKind::CustomTag;
    let count = |accessor: fn() -> PatternResult, text: &str| -> Result<usize> {
        Ok(pattern(kind, accessor)?.find_iter(text).count())
    };

    Ok(MarkupProfile {
        html_elements: count(regex_html_element, view.markup.as_str())?,
        script_blocks: count(regex_script_block, view.markup.as_str())?,
        style_blocks: count(regex_style_block, view.markup.as_str())?,
        html_comments: count(regex_html_comment, view.code.as_str())?,
        jsp_comments: count(regex_jsp_comment, view.text)?,
        frontend: frontend_inventory(view)?,
    })
}

fn frontend_inventory(view: &SourceView<'_>) -> Result<FrontendInventory> {
    let kind = ConstructKind::CustomTag;
    let mut inventory = FrontendInventory::default();

    let el_span = pattern(kind, regex_el_span)?;
    for caps in pattern(kind, regex_class_attribute)?.captures_iter(&view.markup) {
        // jsp:useBean class= names a Java type
        if caps[1].starts_with("jsp:") {
            continue;
        }
        let Some(value) = caps.get(2).or_else(|| caps.get(3)) else {
            continue;
        };
        let value = el_span.replace_all(value.as_str(), " ");
        inventory.css_classes.extend(
            value
                .split_whitespace()
                .filter(|name| name.chars().all(|c| c.is_alphanumeric() || c == '-' || c == '_'))
                .map(str::to_string),
        );
    }

    let mut scripts: Vec<&str> = pattern(kind, regex_script_body)?
        .captures_iter(&view.code)
        .filter_map(|caps| caps.get(1).map(|m| m.as_str()))
        .collect();
    let definitions = pattern(kind, regex_js_function)?;
    for script in &scripts {
        for caps in definitions.captures_iter(script) {
            if let Some(name) = caps.get(1).or_else(|| caps.get(2)) {
                inventory.js_functions.insert(name.as_str().to_string());
            }
        }
    }

    scripts.extend(
        pattern(kind, regex_event_handler)?
            .captures_iter(&view.markup)
            .filter_map(|caps| caps.get(1).or_else(|| caps.get(2)).map(|m| m.as_str())),
    );
    let calls = pattern(kind, regex_js_call)?;
    for script in &scripts {
        for caps in calls.captures_iter(script) {
            let Some(name) = caps.get(1).map(|m| m.as_str()) else {
                continue;
            };
            if !JS_NON_CALLS.contains(&name) {
                inventory.js_calls.insert(name.to_string());
            }
        }
    }

    Ok(inventory)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn view(text: &str) -> SourceView<'_> {
        SourceView::new(text, FileKind::Jsp)
    }

    fn mechanisms(text: &str) -> Vec<(IncludeMechanism, String, bool)> {
        let mut found = includes(&view(text)).unwrap();
        found.sort_by_key(|c| c.offset);
        found
            .iter()
            .filter_map(|c| c.as_include())
            .map(|i| (i.mechanism, i.target.clone(), i.dynamic))
            .collect()
    }

    #[test]
    fn test_all_patterns_compile() {
        let accessors: [fn() -> PatternResult; 31] = [
            regex_attribute,
            regex_directive,
            regex_xml_directive,
            regex_include_directive,
            regex_include_action,
            regex_import_tag,
            regex_scripting,
            regex_xml_scripting,
            regex_el,
            regex_jstl_tag,
            regex_jstl_function,
            regex_custom_tag,
            regex_action,
            regex_form,
            regex_field,
            regex_session,
            regex_request,
            regex_response,
            regex_db_connection,
            regex_db_statement,
            regex_html_element,
            regex_script_block,
            regex_style_block,
            regex_html_comment,
            regex_jsp_comment,
            regex_class_attribute,
            regex_el_span,
            regex_script_body,
            regex_event_handler,
            regex_js_function,
            regex_js_call,
        ];
        for accessor in accessors {
            assert!(accessor().is_ok());
        }
    }

    #[test]
    fn test_three_include_mechanisms() {
        let text = r#"<%@ include file="header.jspf" %>
<jsp:include page="menu.jsp"/>
<c:import url="/WEB-INF/footer.jsp"></c:import>"#;
        assert_eq!(
            mechanisms(text),
            vec![
                (IncludeMechanism::Directive, "header.jspf".to_string(), false),
                (IncludeMechanism::Action, "menu.jsp".to_string(), false),
                (IncludeMechanism::Import, "/WEB-INF/footer.jsp".to_string(), false),
            ]
        );
    }

    #[test]
    fn test_dynamic_targets() {
        let text = r#"<jsp:include page="<%= tile %>" flush="true"/>
<c:import url="${base}/nav.jsp"/>"#;
        let found = mechanisms(text);
        assert_eq!(found.len(), 2);
        assert!(found.iter().all(|(_, _, dynamic)| *dynamic));
        assert_eq!(found[0].1, "<%= tile %>");
    }

    #[test]
    fn test_xml_include_directive_and_no_includes() {
        let found = mechanisms(r#"<jsp:directive.include file="a.jspf"/>"#);
        assert_eq!(found, vec![(IncludeMechanism::Directive, "a.jspf".to_string(), false)]);
        assert!(mechanisms("<html><body>plain</body></html>").is_empty());
    }

    #[test]
    fn test_commented_include_ignored() {
        assert!(mechanisms(r#"<%-- <jsp:include page="old.jsp"/> --%>"#).is_empty());
    }

    #[test]
    fn test_directives() {
        let text = r#"<%@ page contentType="text/html; charset=UTF-8" import="java.util.*" %>
<%@ taglib prefix="c" uri="http://java.sun.com/jsp/jstl/core" %>
<%@ bogus x="1" %>"#;
        let found = directives(&view(text)).unwrap();
        assert_eq!(found.len(), 2);
        match &found[1].payload {
            ConstructPayload::Directive {
                directive,
                attributes,
            } => {
                assert_eq!(*directive, DirectiveKind::Taglib);
                assert_eq!(attributes.get("prefix").map(String::as_str), Some("c"));
            }
            other => panic!("unexpected payload {:?}", other),
        }
        assert_eq!(found[1].line, 2);
    }

    #[test]
    fn test_scripting_classification() {
        let text = "<%@ page x=\"1\" %><% int a = 1; %><%= a %><%! int b; %><%  %>";
        let found = scripting_elements(&view(text)).unwrap();
        let kinds: Vec<_> = found.iter().map(|e| e.kind).collect();
        assert_eq!(
            kinds,
            vec![
                ConstructKind::Scriptlet,
                ConstructKind::Expression,
                ConstructKind::Declaration,
            ]
        );
        assert_eq!(found[1].body, "a");
    }

    #[test]
    fn test_xml_scripting_only_in_tagx() {
        let text = "<jsp:scriptlet>int a = 1;</jsp:scriptlet>";
        assert!(scripting_elements(&view(text)).unwrap().is_empty());
        let tagx = SourceView::new(text, FileKind::Tagx);
        assert_eq!(scripting_elements(&tagx).unwrap().len(), 1);
    }

    #[test]
    fn test_el_and_jstl() {
        let text = r#"<c:if test="${not empty user}">${fn:length(items)} #{bean.value}</c:if>
<fmt:message key="k"/>"#;
        let v = view(text);
        let el = el_expressions(&v).unwrap();
        assert_eq!(el.len(), 3);
        assert!(matches!(
            el[2].payload,
            ConstructPayload::ElExpression { deferred: true, .. }
        ));

        let jstl = jstl_tags(&v).unwrap();
        let tags: Vec<_> = jstl
            .iter()
            .map(|c| match &c.payload {
                ConstructPayload::JstlTag { library, tag } => (*library, tag.clone()),
                _ => unreachable!(),
            })
            .collect();
        assert!(tags.contains(&(JstlLibrary::Core, "if".to_string())));
        assert!(tags.contains(&(JstlLibrary::Fmt, "message".to_string())));
        assert!(tags.contains(&(JstlLibrary::Functions, "length".to_string())));
    }

    #[test]
    fn test_custom_tags_exclude_standard() {
        let text = r#"<c:out value="x"/><jsp:useBean id="b"/><my:grid rows="3"/><ui:date-picker/>"#;
        let found = custom_tags(&view(text)).unwrap();
        assert_eq!(found.len(), 2);
        assert!(matches!(
            &found[1].payload,
            ConstructPayload::CustomTag { prefix, tag } if prefix == "ui" && tag == "date-picker"
        ));
    }

    #[test]
    fn test_actions() {
        let text = r#"<jsp:useBean id="cart" class="shop.Cart" scope="session"/>
<jsp:forward page="done.jsp"/>"#;
        let found = actions(&view(text)).unwrap();
        assert_eq!(found.len(), 2);
        match &found[0].payload {
            ConstructPayload::Action { action, attributes } => {
                assert_eq!(action, "useBean");
                assert_eq!(attributes.get("scope").map(String::as_str), Some("session"));
            }
            _ => unreachable!(),
        }
    }

    #[test]
    fn test_forms_pattern() {
        let text = r#"<FORM action="<%= url %>/save" METHOD="POST">
  <input type="text" name="user">
  <!-- <input name="old"> -->
  <select name="role"></select>
</FORM>
<form><textarea name="note"></textarea></form>"#;
        let found = forms(&view(text)).unwrap();
        let forms: Vec<_> = found
            .iter()
            .filter_map(|c| match &c.payload {
                ConstructPayload::Form(f) => Some(f.clone()),
                _ => None,
            })
            .collect();
        assert_eq!(forms.len(), 2);
        assert_eq!(forms[0].action, "<%= url %>/save");
        assert_eq!(forms[0].method, "post");
        assert_eq!(forms[1].method, "get");

        let fields = found.iter().filter(|c| c.kind() == ConstructKind::FormField).count();
        assert_eq!(fields, 3);
    }

    #[test]
    fn test_session_request_response() {
        let text = r#"<% session.setAttribute("user", u);
Object o = session.getAttribute("user");
session.removeAttribute('cart');
String q = request.getParameter("q");
response.sendRedirect("login.jsp");
response.setContentType("text/csv"); %>${sessionScope.user} ${param.page}"#;
        let v = view(text);

        let session = session_accesses(&v).unwrap();
        let ops: Vec<_> = session
            .iter()
            .map(|c| match &c.payload {
                ConstructPayload::SessionAccess { operation, .. } => *operation,
                _ => unreachable!(),
            })
            .collect();
        assert_eq!(
            ops,
            vec![
                AttributeOperation::Set,
                AttributeOperation::Get,
                AttributeOperation::Remove,
                AttributeOperation::Get,
            ]
        );

        let request = request_accesses(&v).unwrap();
        assert_eq!(request.len(), 2);
        assert!(request.iter().all(|c| matches!(
            c.payload,
            ConstructPayload::RequestAccess {
                operation: AttributeOperation::Parameter,
                ..
            }
        )));

        let response = response_accesses(&v).unwrap();
        assert_eq!(response.len(), 2);
        assert!(matches!(
            &response[0].payload,
            ConstructPayload::ResponseAccess { operation: ResponseOperation::Redirect, value } if value == "login.jsp"
        ));
    }

    #[test]
    fn test_db_operations() {
        let text = r#"<% Connection conn = DriverManager.getConnection(url);
DataSource ds = (DataSource) ctx.lookup("jdbc/app");
ResultSet rs = stmt.executeQuery("SELECT * FROM users");
ps = conn.prepareStatement('update t set a = ?');
stmt.executeUpdate(sql);
cs = conn.prepareCall(proc); %>
<%-- stmt.execute("drop table t") --%>"#;
        let found = db_operations(&view(text)).unwrap();
        let ops: Vec<_> = found
            .iter()
            .map(|c| match &c.payload {
                ConstructPayload::DbOperation { operation, method, .. } => (c.line, *operation, method.clone()),
                _ => unreachable!(),
            })
            .collect();
        assert_eq!(
            ops,
            vec![
                (1, DbOperationKind::Connection, "DriverManager.getConnection".to_string()),
                (2, DbOperationKind::Connection, "DataSource".to_string()),
                (3, DbOperationKind::Query, "executeQuery".to_string()),
                (4, DbOperationKind::Update, "prepareStatement".to_string()),
                (5, DbOperationKind::Update, "executeUpdate".to_string()),
                (6, DbOperationKind::Statement, "prepareCall".to_string()),
            ]
        );
        assert!(found[2].raw.starts_with("executeQuery("));
    }

    #[test]
    fn test_markup_profile_counts() {
        let text = r#"<%-- hidden <div> --%>
<html><head>
<style type="text/css">.a > .b { color: red }</style>
<script src="app.js"></script>
<SCRIPT>if (x < y) { go(); }</SCRIPT>
</head>
<!-- <p>old</p> -->
<body><% if (a < b) { %><p>x</p><% } %></body></html>"#;
        let profile = markup_profile(&view(text)).unwrap();
        assert_eq!(profile.jsp_comments, 1);
        assert_eq!(profile.html_comments, 1);
        assert_eq!(profile.script_blocks, 2);
        assert_eq!(profile.style_blocks, 1);
        // html head style script SCRIPT body p
        assert_eq!(profile.html_elements, 7);
    }

    #[test]
    fn test_frontend_inventory() {
        let text = r#"<jsp:useBean id="cart" class="shop.Cart"/>
<div class="row  ${active ? 'on' : ''} main-panel" onclick="toggle(this); return false">
<span class='badge'></span>
<script>
function toggle(el) { if (el) { show(el.id); } }
var hide = function (el) { el.style.display = 'none'; };
</script>
<%-- <script>function ghost() {}</script> --%>"#;
        let inventory = markup_profile(&view(text)).unwrap().frontend;
        let classes: Vec<_> = inventory.css_classes.iter().map(String::as_str).collect();
        assert_eq!(classes, vec!["badge", "main-panel", "row"]);
        let functions: Vec<_> = inventory.js_functions.iter().map(String::as_str).collect();
        assert_eq!(functions, vec!["hide", "toggle"]);
        let calls: Vec<_> = inventory.js_calls.iter().map(String::as_str).collect();
        assert_eq!(calls, vec!["show", "toggle"]);
    }
}
