//! Scriptlet complexity scoring
//!
//! Two strategies share one formula: decision points, `&&`/`||`
//! operators, ternaries and nesting. The pattern strategy works on tokens
//! and braces; the AST strategy parses the body as a Java method body.

use crate::types::{Result, ScriptAnalysis, ScriptletComplexity};

pub trait ScriptStrategy: Send + Sync {
    fn name(&self) -> &'static str;

    /// Score one scriptlet body. An error means this body should be scored
    /// by the pattern strategy instead.
    fn score(&self, code: &str) -> Result<ScriptletComplexity>;
}

/// Replace string and char literals with empty ones and drop comments
pub fn strip_literals(code: &str) -> String {
    let mut out = String::with_capacity(code.len());
    let mut chars = code.chars().peekable();

    while let Some(c) = chars.next() {
        match c {
            '"' | '\'' => {
                out.push(c);
                while let Some(inner) = chars.next() {
                    match inner {
                        '\\' => {
                            chars.next();
                        }
                        _ if inner == c => break,
                        '\n' => {
                            out.push('\n');
                            break;
                        }
                        _ => {}
                    }
                }
                out.push(c);
            }
            '/' if chars.peek() == Some(&'/') => {
                for inner in chars.by_ref() {
                    if inner == '\n' {
                        out.push('\n');
                        break;
                    }
                }
            }
            '/' if chars.peek() == Some(&'*') => {
                chars.next();
                let mut prev = '\0';
                for inner in chars.by_ref() {
                    if inner == '\n' {
                        out.push('\n');
                    }
                    if prev == '*' && inner == '/' {
                        break;
                    }
                    prev = inner;
                }
                out.push(' ');
            }
            _ => out.push(c),
        }
    }

    out
}

/// Braces never close below zero and end at zero
pub fn balanced(clean: &str) -> bool {
    let mut depth: i64 = 0;
    for c in clean.chars() {
        match c {
            '{' => depth += 1,
            '}' => {
                depth -= 1;
                if depth < 0 {
                    return false;
                }
            }
            _ => {}
        }
    }
    depth == 0
}

// =============================================================================
// Pattern Strategy
// =============================================================================

/// Keywords counted as decision points (case-insensitive, whole words)
const DECISION_KEYWORDS: &[&str] = &["if", "for", "while", "switch", "case", "catch", "else"];

/// Token and brace heuristic. Works on fragments such as `} else {` that
/// do not parse on their own.
#[derive(Debug, Default, Clone, Copy)]
pub struct PatternScript;

impl PatternScript {
    pub fn analyze(code: &str) -> ScriptletComplexity {
        let clean = strip_literals(code);

        let decisions = clean
            .split(|c: char| !(c.is_ascii_alphanumeric() || c == '_'))
            .filter(|word| {
                DECISION_KEYWORDS
                    .iter()
                    .any(|keyword| word.eq_ignore_ascii_case(keyword))
            })
            .count();
        let logical_ops = clean.matches("&&").count() + clean.matches("||").count();
        let ternaries = clean.matches('?').count();

        let mut depth: u32 = 0;
        let mut max_nesting: u32 = 0;
        for c in clean.chars() {
            match c {
                '{' => {
                    depth += 1;
                    max_nesting = max_nesting.max(depth);
                }
                '}' => depth = depth.saturating_sub(1),
                _ => {}
            }
        }

        ScriptletComplexity {
            decisions: decisions as u32,
            logical_ops: logical_ops as u32,
            ternaries: ternaries as u32,
            max_nesting,
            analysis: ScriptAnalysis::Pattern,
        }
    }
}

impl ScriptStrategy for PatternScript {
    fn name(&self) -> &'static str {
        "pattern"
    }

    fn score(&self, code: &str) -> Result<ScriptletComplexity> {
        Ok(Self::analyze(code))
    }
}

// =============================================================================
// AST Strategy
// =============================================================================

#[cfg(feature = "java-ast")]
pub use ast::JavaAstScript;

#[cfg(feature = "java-ast")]
mod ast {
    use tree_sitter::{Node, Parser as TsParser};

    use super::{ScriptStrategy, balanced, strip_literals};
    use crate::types::{JspError, Result, ScriptAnalysis, ScriptletComplexity};

    const DECISION_KINDS: &[&str] = &[
        "if_statement",
        "for_statement",
        "enhanced_for_statement",
        "while_statement",
        "do_statement",
        "switch_expression",
        "try_statement",
        "try_with_resources_statement",
    ];

    /// Parses each body wrapped in a synthetic method with tree-sitter-java
    pub struct JavaAstScript;

    impl JavaAstScript {
        /// Fails when the grammar cannot be loaded into a parser
        pub fn new() -> Result<Self> {
            create_parser()?;
            Ok(Self)
        }
    }

    fn create_parser() -> Result<TsParser> {
        let mut parser = TsParser::new();
        parser
            .set_language(&tree_sitter_java::LANGUAGE.into())
            .map_err(|e| JspError::Script(format!("Failed to set Java language: {}", e)))?;
        Ok(parser)
    }

    #[derive(Default)]
    struct Tally {
        decisions: u32,
        logical_ops: u32,
        ternaries: u32,
        max_blocks: u32,
    }

    const WRAPPER_TAIL: &str = " }";

    /// The wrapper must parse as one class holding exactly one method whose
    /// body closes at the wrapper's own brace. A fragment like `} else {`
    /// closes the method early and reparses as other members.
    fn single_method_body(root: Node<'_>, wrapped_len: usize) -> bool {
        let mut cursor = root.walk();
        let class: Vec<_> = root.named_children(&mut cursor).collect();
        let [class] = class.as_slice() else {
            return false;
        };
        if class.kind() != "class_declaration" {
            return false;
        }
        let Some(body) = class.child_by_field_name("body") else {
            return false;
        };

        let mut cursor = body.walk();
        let members: Vec<_> = body.named_children(&mut cursor).collect();
        let [method] = members.as_slice() else {
            return false;
        };
        method.kind() == "method_declaration"
            && method
                .child_by_field_name("body")
                .is_some_and(|block| block.end_byte() + WRAPPER_TAIL.len() == wrapped_len)
    }

    fn visit(node: Node<'_>, blocks: u32, tally: &mut Tally) {
        let kind = node.kind();
        let mut blocks = blocks;

        if DECISION_KINDS.contains(&kind) {
            tally.decisions += 1;
        } else if kind == "ternary_expression" {
            tally.ternaries += 1;
        } else if kind == "binary_expression"
            && node
                .child_by_field_name("operator")
                .is_some_and(|op| matches!(op.kind(), "&&" | "||"))
        {
            tally.logical_ops += 1;
        } else if kind == "block" {
            blocks += 1;
            tally.max_blocks = tally.max_blocks.max(blocks);
        }

        let mut cursor = node.walk();
        for child in node.named_children(&mut cursor) {
            visit(child, blocks, tally);
        }
    }

    impl ScriptStrategy for JavaAstScript {
        fn name(&self) -> &'static str {
            "java-ast"
        }

        fn score(&self, code: &str) -> Result<ScriptletComplexity> {
            let clean = strip_literals(code);
            if !balanced(&clean) {
                return Err(JspError::Script("Scriptlet has unbalanced braces".to_string()));
            }
            let wrapped = format!("class X {{ void m() {{ {} }}{}", clean, WRAPPER_TAIL);

            let mut parser = create_parser()?;
            let tree = parser
                .parse(&wrapped, None)
                .ok_or_else(|| JspError::Script("Failed to parse scriptlet".to_string()))?;
            let root = tree.root_node();
            if root.has_error() || !single_method_body(root, wrapped.len()) {
                return Err(JspError::Script(
                    "Scriptlet is not a complete statement sequence".to_string(),
                ));
            }

            let mut tally = Tally::default();
            visit(root, 0, &mut tally);

            Ok(ScriptletComplexity {
                decisions: tally.decisions,
                logical_ops: tally.logical_ops,
                ternaries: tally.ternaries,
                // the method body is the outermost block
                max_nesting: tally.max_blocks.saturating_sub(1),
                analysis: ScriptAnalysis::Ast,
            })
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_strip_literals() {
        let code = r#"String s = "if (x) { }"; // while
char c = '{'; /* for */ int i;"#;
        let clean = strip_literals(code);
        assert!(!clean.contains("if"));
        assert!(!clean.contains("while"));
        assert!(!clean.contains("for"));
        assert!(!clean.contains('{'));
        assert!(clean.contains("int i;"));
        assert_eq!(clean.matches('\n').count(), 1);
    }

    #[test]
    fn test_pattern_counts() {
        let code = r#"
if (a && b) {
    for (int i = 0; i < n; i++) {
        x = i > 2 ? 1 : 0;
    }
} else if (c || d) {
    log("case");
}"#;
        let c = PatternScript::analyze(code);
        assert_eq!(c.decisions, 4);
        assert_eq!(c.logical_ops, 2);
        assert_eq!(c.ternaries, 1);
        assert_eq!(c.max_nesting, 2);
        assert_eq!(c.analysis, ScriptAnalysis::Pattern);
        assert_eq!(c.score(), 8);
    }

    #[test]
    fn test_pattern_fragment_tolerated() {
        let c = PatternScript::analyze("} else {");
        assert_eq!(c.decisions, 1);
        assert_eq!(c.max_nesting, 1);
    }

    #[test]
    fn test_keyword_is_whole_word() {
        let c = PatternScript::analyze("iffy = format(forEach, elsewhere);");
        assert_eq!(c.decisions, 0);
        assert_eq!(c.score(), 1);
    }

    #[cfg(feature = "java-ast")]
    #[test]
    fn test_ast_counts() {
        let script = JavaAstScript::new().unwrap();
        let code = r#"
if (a && b) {
    for (String s : items) {
        x = s.isEmpty() ? 1 : 0;
    }
}
while (c || d) { d = false; }"#;
        let c = script.score(code).unwrap();
        assert_eq!(c.analysis, ScriptAnalysis::Ast);
        assert_eq!(c.decisions, 3);
        assert_eq!(c.logical_ops, 2);
        assert_eq!(c.ternaries, 1);
        assert_eq!(c.max_nesting, 2);
    }

    #[cfg(feature = "java-ast")]
    #[test]
    fn test_ast_rejects_fragment() {
        let script = JavaAstScript::new().unwrap();
        assert!(script.score("if (user != null) {").is_err());
    }

    #[test]
    fn test_balanced() {
        assert!(balanced("if (a) { x(); } else { y(); }"));
        assert!(balanced(""));
        assert!(!balanced("} else {"));
        assert!(!balanced("if (a) {"));
        assert!(!balanced("}"));
    }

    #[cfg(feature = "java-ast")]
    #[test]
    fn test_ast_rejects_split_branches() {
        let script = JavaAstScript::new().unwrap();
        for fragment in ["} else {", "} else { if (a && b) { x(); }", "}", "} void n() {"] {
            assert!(script.score(fragment).is_err(), "{}", fragment);
        }

        // the pattern strategy still sees the else and the inner branch
        let c = PatternScript::analyze("} else { if (a && b) { x(); }");
        assert_eq!(c.decisions, 2);
        assert_eq!(c.logical_ops, 1);
        assert_eq!(c.max_nesting, 2);
    }

    #[cfg(feature = "java-ast")]
    #[test]
    fn test_ast_accepts_complete_body() {
        let script = JavaAstScript::new().unwrap();
        let c = script.score("int n = 0; { n++; } if (n > 0) { n--; }").unwrap();
        assert_eq!(c.analysis, ScriptAnalysis::Ast);
        assert_eq!(c.decisions, 1);
        assert_eq!(c.max_nesting, 1);
    }
}
