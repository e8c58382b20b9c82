use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, BTreeSet};
use std::fmt;

use super::diagnostic::Diagnostic;
use super::metrics::ScriptletComplexity;

/// Discriminant of [`ConstructPayload`], used for counting and diagnostics
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ConstructKind {
    Directive,
    Include,
    Scriptlet,
    Declaration,
    Expression,
    ElExpression,
    JstlTag,
    CustomTag,
    Action,
    Form,
    FormField,
    SessionAccess,
    RequestAccess,
    ResponseAccess,
    DbOperation,
}

impl ConstructKind {
    pub const ALL: [ConstructKind; 15] = [
        Self::Directive,
        Self::Include,
        Self::Scriptlet,
        Self::Declaration,
        Self::Expression,
        Self::ElExpression,
        Self::JstlTag,
        Self::CustomTag,
        Self::Action,
        Self::Form,
        Self::FormField,
        Self::SessionAccess,
        Self::RequestAccess,
        Self::ResponseAccess,
        Self::DbOperation,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Directive => "directive",
            Self::Include => "include",
            Self::Scriptlet => "scriptlet",
            Self::Declaration => "declaration",
            Self::Expression => "expression",
            Self::ElExpression => "el_expression",
            Self::JstlTag => "jstl_tag",
            Self::CustomTag => "custom_tag",
            Self::Action => "action",
            Self::Form => "form",
            Self::FormField => "form_field",
            Self::SessionAccess => "session_access",
            Self::RequestAccess => "request_access",
            Self::ResponseAccess => "response_access",
            Self::DbOperation => "db_operation",
        }
    }
}

impl fmt::Display for ConstructKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

// =============================================================================
// Include
// =============================================================================

/// Syntax that pulled another file in
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub enum IncludeMechanism {
    /// `<%@ include file=".." %>` or `<jsp:directive.include file=".."/>`
    #[serde(rename = "directive")]
    Directive,
    /// `<jsp:include page=".."/>`
    #[serde(rename = "jsp:include")]
    Action,
    /// `<c:import url=".."/>`
    #[serde(rename = "c:import")]
    Import,
}

impl IncludeMechanism {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Directive => "directive",
            Self::Action => "jsp:include",
            Self::Import => "c:import",
        }
    }
}

impl fmt::Display for IncludeMechanism {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct IncludeRef {
    pub mechanism: IncludeMechanism,
    pub target: String,
    /// Target is a runtime expression and is never resolved to a file
    pub dynamic: bool,
}

// =============================================================================
// Payload Types
// =============================================================================

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum DirectiveKind {
    Page,
    Include,
    Taglib,
    Tag,
    Attribute,
    Variable,
}

impl DirectiveKind {
    pub fn parse(name: &str) -> Option<Self> {
        match name {
            "page" => Some(Self::Page),
            "include" => Some(Self::Include),
            "taglib" => Some(Self::Taglib),
            "tag" => Some(Self::Tag),
            "attribute" => Some(Self::Attribute),
            "variable" => Some(Self::Variable),
            _ => None,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum JstlLibrary {
    Core,
    Fmt,
    Sql,
    Xml,
    Functions,
}

impl JstlLibrary {
    pub fn from_prefix(prefix: &str) -> Option<Self> {
        match prefix {
            "c" => Some(Self::Core),
            "fmt" => Some(Self::Fmt),
            "sql" => Some(Self::Sql),
            "x" => Some(Self::Xml),
            "fn" => Some(Self::Functions),
            _ => None,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum FieldElement {
    Input,
    Select,
    Textarea,
}

impl FieldElement {
    pub fn parse(name: &str) -> Option<Self> {
        match name.to_ascii_lowercase().as_str() {
            "input" => Some(Self::Input),
            "select" => Some(Self::Select),
            "textarea" => Some(Self::Textarea),
            _ => None,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum AttributeOperation {
    Get,
    Set,
    Remove,
    Parameter,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ResponseOperation {
    Redirect,
    ContentType,
}

/// What a JDBC call in a scriptlet does
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum DbOperationKind {
    /// `DriverManager.getConnection(..)`, `ds.getConnection()` or a
    /// `DataSource` declaration
    Connection,
    /// Literal SQL containing `select`, or `executeQuery` without one
    Query,
    /// Literal SQL without `select`, or `executeUpdate` without one
    Update,
    /// `prepareStatement`/`prepareCall`/`execute` with no literal SQL
    Statement,
}

impl DbOperationKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Connection => "connection",
            Self::Query => "query",
            Self::Update => "update",
            Self::Statement => "statement",
        }
    }
}

impl fmt::Display for DbOperationKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Scriptlet {
    pub code: String,
    pub lines: usize,
    pub complexity: ScriptletComplexity,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Form {
    /// Position of the form within its file, starting at 0
    pub index: usize,
    pub action: String,
    pub method: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FormField {
    pub form: usize,
    pub element: FieldElement,
    pub name: Option<String>,
    pub field_type: Option<String>,
}

/// Kind-specific data of a [`Construct`]
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum ConstructPayload {
    Directive {
        directive: DirectiveKind,
        attributes: BTreeMap<String, String>,
    },
    Include(IncludeRef),
    Scriptlet(Scriptlet),
    Declaration {
        code: String,
    },
    Expression {
        code: String,
    },
    ElExpression {
        expression: String,
        deferred: bool,
    },
    JstlTag {
        library: JstlLibrary,
        tag: String,
    },
    CustomTag {
        prefix: String,
        tag: String,
    },
    Action {
        action: String,
        attributes: BTreeMap<String, String>,
    },
    Form(Form),
    FormField(FormField),
    SessionAccess {
        attribute: String,
        operation: AttributeOperation,
    },
    RequestAccess {
        attribute: String,
        operation: AttributeOperation,
    },
    ResponseAccess {
        operation: ResponseOperation,
        value: String,
    },
    DbOperation {
        operation: DbOperationKind,
        /// JDBC method or declaration that matched
        method: String,
        /// Leading string literal argument, when there is one
        #[serde(skip_serializing_if = "Option::is_none")]
        sql: Option<String>,
    },
}

// =============================================================================
// Construct
// =============================================================================

/// One extracted construct. Value object; never mutated after extraction.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Construct {
    /// 1-based source line
    pub line: usize,
    /// Byte offset of the match in the decoded text
    pub offset: usize,
    /// Matched text, for diagnostics
    pub raw: String,
    pub payload: ConstructPayload,
}

impl Construct {
    pub fn new(line: usize, offset: usize, raw: impl Into<String>, payload: ConstructPayload) -> Self {
        Self {
            line,
            offset,
            raw: raw.into(),
            payload,
        }
    }

    pub fn kind(&self) -> ConstructKind {
        match &self.payload {
            ConstructPayload::Directive { .. } => ConstructKind::Directive,
            ConstructPayload::Include(_) => ConstructKind::Include,
            ConstructPayload::Scriptlet(_) => ConstructKind::Scriptlet,
            ConstructPayload::Declaration { .. } => ConstructKind::Declaration,
            ConstructPayload::Expression { .. } => ConstructKind::Expression,
            ConstructPayload::ElExpression { .. } => ConstructKind::ElExpression,
            ConstructPayload::JstlTag { .. } => ConstructKind::JstlTag,
            ConstructPayload::CustomTag { .. } => ConstructKind::CustomTag,
            ConstructPayload::Action { .. } => ConstructKind::Action,
            ConstructPayload::Form(_) => ConstructKind::Form,
            ConstructPayload::FormField(_) => ConstructKind::FormField,
            ConstructPayload::SessionAccess { .. } => ConstructKind::SessionAccess,
            ConstructPayload::RequestAccess { .. } => ConstructKind::RequestAccess,
            ConstructPayload::ResponseAccess { .. } => ConstructKind::ResponseAccess,
            ConstructPayload::DbOperation { .. } => ConstructKind::DbOperation,
        }
    }

    pub fn as_include(&self) -> Option<&IncludeRef> {
        match &self.payload {
            ConstructPayload::Include(include) => Some(include),
            _ => None,
        }
    }

    pub fn as_scriptlet(&self) -> Option<&Scriptlet> {
        match &self.payload {
            ConstructPayload::Scriptlet(scriptlet) => Some(scriptlet),
            _ => None,
        }
    }
}

/// Names the page defines or uses on the client side
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct FrontendInventory {
    /// Static class names from `class` attributes
    pub css_classes: BTreeSet<String>,
    /// JavaScript functions defined in `<script>` blocks
    pub js_functions: BTreeSet<String>,
    /// Functions called from `<script>` blocks and `on*` handlers
    pub js_calls: BTreeSet<String>,
}

impl FrontendInventory {
    pub fn is_empty(&self) -> bool {
        self.css_classes.is_empty() && self.js_functions.is_empty() && self.js_calls.is_empty()
    }
}

/// Markup counts of one file. JSP comments are never counted as markup;
/// HTML elements and blocks also skip HTML comments and scripting elements.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct MarkupProfile {
    /// Opening tags, custom and JSTL tags included
    pub html_elements: usize,
    pub script_blocks: usize,
    pub style_blocks: usize,
    pub html_comments: usize,
    pub jsp_comments: usize,
    pub frontend: FrontendInventory,
}

/// Extraction result for one file
#[derive(Debug, Clone, Default)]
pub struct ConstructSet {
    pub constructs: Vec<Construct>,
    pub profile: MarkupProfile,
    pub diagnostics: Vec<Diagnostic>,
}

impl ConstructSet {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn extend(&mut self, constructs: impl IntoIterator<Item = Construct>) {
        self.constructs.extend(constructs);
    }

    /// Order constructs by position; kind breaks ties so the order is stable
    pub fn sort(&mut self) {
        self.constructs
            .sort_by(|a, b| (a.offset, a.kind()).cmp(&(b.offset, b.kind())));
    }

    pub fn of_kind(&self, kind: ConstructKind) -> impl Iterator<Item = &Construct> {
        self.constructs.iter().filter(move |c| c.kind() == kind)
    }

    pub fn count(&self, kind: ConstructKind) -> usize {
        self.of_kind(kind).count()
    }

    pub fn includes(&self) -> impl Iterator<Item = (&Construct, &IncludeRef)> {
        self.constructs
            .iter()
            .filter_map(|c| c.as_include().map(|include| (c, include)))
    }

    pub fn scriptlets(&self) -> impl Iterator<Item = &Scriptlet> {
        self.constructs.iter().filter_map(Construct::as_scriptlet)
    }

    /// `(prefix, tag)` of every custom tag, in source order
    pub fn custom_tags(&self) -> impl Iterator<Item = (&str, &str)> {
        self.constructs.iter().filter_map(|c| match &c.payload {
            ConstructPayload::CustomTag { prefix, tag } => Some((prefix.as_str(), tag.as_str())),
            _ => None,
        })
    }

    /// Attributes of every taglib directive
    pub fn taglibs(&self) -> impl Iterator<Item = &BTreeMap<String, String>> {
        self.constructs.iter().filter_map(|c| match &c.payload {
            ConstructPayload::Directive {
                directive: DirectiveKind::Taglib,
                attributes,
            } => Some(attributes),
            _ => None,
        })
    }

    pub fn is_degraded(&self) -> bool {
        !self.diagnostics.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn include(offset: usize, mechanism: IncludeMechanism) -> Construct {
        Construct::new(
            1,
            offset,
            "raw",
            ConstructPayload::Include(IncludeRef {
                mechanism,
                target: "a.jspf".to_string(),
                dynamic: false,
            }),
        )
    }

    #[test]
    fn test_kind_matches_payload() {
        let c = include(0, IncludeMechanism::Import);
        assert_eq!(c.kind(), ConstructKind::Include);
        assert!(c.as_include().is_some());
        assert!(c.as_scriptlet().is_none());
    }

    #[test]
    fn test_sort_by_offset() {
        let mut set = ConstructSet::new();
        set.extend([
            include(40, IncludeMechanism::Action),
            include(3, IncludeMechanism::Directive),
        ]);
        set.sort();
        let mechanisms: Vec<_> = set.includes().map(|(_, i)| i.mechanism).collect();
        assert_eq!(
            mechanisms,
            vec![IncludeMechanism::Directive, IncludeMechanism::Action]
        );
        assert_eq!(set.count(ConstructKind::Include), 2);
        assert_eq!(set.count(ConstructKind::Scriptlet), 0);
    }

    #[test]
    fn test_db_operation_payload() {
        let c = Construct::new(
            2,
            10,
            "executeQuery(\"select 1\"",
            ConstructPayload::DbOperation {
                operation: DbOperationKind::Query,
                method: "executeQuery".to_string(),
                sql: Some("select 1".to_string()),
            },
        );
        assert_eq!(c.kind(), ConstructKind::DbOperation);
        let json = serde_json::to_value(&c.payload).unwrap();
        assert_eq!(json["kind"], "db_operation");
        assert_eq!(json["operation"], "query");
    }

    #[test]
    fn test_mechanism_serialization() {
        let json = serde_json::to_string(&IncludeMechanism::Import).unwrap();
        assert_eq!(json, "\"c:import\"");
        assert_eq!(IncludeMechanism::Action.to_string(), "jsp:include");
    }
}
