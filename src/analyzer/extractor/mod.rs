//! Construct Extraction
//!
//! Turns decoded template text into a [`ConstructSet`]. Pattern extraction
//! is always available; a markup parser and a Java parser refine forms,
//! custom tags and scriptlet scoring when compiled in. Every file also gets
//! a markup profile: element and comment counts plus its front-end names.
//!
//! Extraction never fails as a whole. A construct kind whose extractor
//! fails comes back empty with an `ExtractionDegraded` diagnostic.

pub mod markup;
pub mod patterns;
pub mod script;
pub mod view;

use std::sync::Once;
use tracing::{debug, trace, warn};

use crate::config::AnalysisConfig;
use crate::types::{
    Construct, ConstructKind, ConstructPayload, ConstructSet, Diagnostic, DiagnosticKind, FileKind,
    Result, Scriptlet,
};

pub use markup::{MarkupStrategy, PatternMarkup};
pub use script::{PatternScript, ScriptStrategy};
pub use view::{LineIndex, SourceView};

#[cfg(feature = "markup")]
pub use markup::StructureMarkup;
#[cfg(feature = "java-ast")]
pub use script::JavaAstScript;

#[cfg(not(feature = "markup"))]
static MARKUP_UNAVAILABLE: Once = Once::new();
static SCRIPT_UNAVAILABLE: Once = Once::new();

/// Optional parsers, either compiled in or requested
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Capabilities {
    pub markup_parser: bool,
    pub script_parser: bool,
}

impl Capabilities {
    /// Parsers compiled into this build
    pub fn detect() -> Self {
        Self {
            markup_parser: cfg!(feature = "markup"),
            script_parser: cfg!(feature = "java-ast"),
        }
    }

    pub fn pattern_only() -> Self {
        Self {
            markup_parser: false,
            script_parser: false,
        }
    }

    /// Parsers the configuration asks for
    pub fn requested(config: &AnalysisConfig) -> Self {
        Self {
            markup_parser: config.use_markup_parser,
            script_parser: config.use_script_parser,
        }
    }
}

pub struct Extractor {
    markup: Box<dyn MarkupStrategy>,
    script: Box<dyn ScriptStrategy>,
}

impl Default for Extractor {
    fn default() -> Self {
        Self::new(Capabilities::detect())
    }
}

impl Extractor {
    /// Pick strategies once. A requested parser that is not available
    /// logs a single warning per process and the pattern strategy is used.
    pub fn new(requested: Capabilities) -> Self {
        Self {
            markup: select_markup(requested.markup_parser),
            script: select_script(requested.script_parser),
        }
    }

    pub fn markup_strategy(&self) -> &'static str {
        self.markup.name()
    }

    pub fn script_strategy(&self) -> &'static str {
        self.script.name()
    }

    pub fn extract(&self, text: &str, kind: FileKind) -> ConstructSet {
        let view = SourceView::new(text, kind);
        let mut set = assemble(self.parts(&view));

        match patterns::markup_profile(&view) {
            Ok(profile) => set.profile = profile,
            Err(e) => {
                warn!("Markup profile degraded: {}", e);
                set.diagnostics.push(Diagnostic::new(
                    DiagnosticKind::ExtractionDegraded,
                    None,
                    format!("markup profile: {}", e),
                ));
            }
        }
        set
    }

    /// Every extractor's result, tagged with the kinds it produces
    fn parts(&self, view: &SourceView<'_>) -> Vec<Part> {
        let custom_tags = self.markup.custom_tags(view).or_else(|e| {
            debug!("{} markup failed for custom tags: {}", self.markup.name(), e);
            PatternMarkup.custom_tags(view)
        });
        let forms = self.markup.forms(view).or_else(|e| {
            debug!("{} markup failed for forms: {}", self.markup.name(), e);
            PatternMarkup.forms(view)
        });

        let parts: [Part; 12] = [
            (&[ConstructKind::Directive], patterns::directives(view)),
            (&[ConstructKind::Include], patterns::includes(view)),
            (
                &[
                    ConstructKind::Scriptlet,
                    ConstructKind::Declaration,
                    ConstructKind::Expression,
                ],
                self.scripting(view),
            ),
            (&[ConstructKind::ElExpression], patterns::el_expressions(view)),
            (&[ConstructKind::JstlTag], patterns::jstl_tags(view)),
            (&[ConstructKind::Action], patterns::actions(view)),
            (&[ConstructKind::CustomTag], custom_tags),
            (&[ConstructKind::Form, ConstructKind::FormField], forms),
            (&[ConstructKind::SessionAccess], patterns::session_accesses(view)),
            (&[ConstructKind::RequestAccess], patterns::request_accesses(view)),
            (&[ConstructKind::ResponseAccess], patterns::response_accesses(view)),
            (&[ConstructKind::DbOperation], patterns::db_operations(view)),
        ];
        Vec::from(parts)
    }

    fn scripting(&self, view: &SourceView<'_>) -> Result<Vec<Construct>> {
        let elements = patterns::scripting_elements(view)?;

        Ok(elements
            .into_iter()
            .map(|element| {
                let payload = match element.kind {
                    ConstructKind::Declaration => ConstructPayload::Declaration { code: element.body },
                    ConstructKind::Expression => ConstructPayload::Expression { code: element.body },
                    _ => {
                        let complexity = self.script.score(&element.body).unwrap_or_else(|e| {
                            trace!("Scriptlet at byte {} scored by pattern: {}", element.offset, e);
                            PatternScript::analyze(&element.body)
                        });
                        ConstructPayload::Scriptlet(Scriptlet {
                            lines: element.body.lines().count(),
                            code: element.body,
                            complexity,
                        })
                    }
                };
                Construct::new(
                    view.line_of(element.offset),
                    element.offset,
                    view.slice(element.offset, element.end),
                    payload,
                )
            })
            .collect())
    }
}

type Part = (&'static [ConstructKind], Result<Vec<Construct>>);

fn assemble(parts: Vec<Part>) -> ConstructSet {
    let mut set = ConstructSet::new();
    for (kinds, result) in parts {
        absorb(&mut set, kinds, result);
    }
    set.sort();
    set
}

fn absorb(set: &mut ConstructSet, kinds: &[ConstructKind], result: Result<Vec<Construct>>) {
    match result {
        Ok(constructs) => set.extend(constructs),
        Err(e) => {
            for &kind in kinds {
                warn!("Extraction of {} degraded: {}", kind, e);
                set.diagnostics.push(Diagnostic::degraded(kind, e.to_string()));
            }
        }
    }
}

fn select_markup(requested: bool) -> Box<dyn MarkupStrategy> {
    if requested {
        #[cfg(feature = "markup")]
        return Box::new(StructureMarkup);

        #[cfg(not(feature = "markup"))]
        MARKUP_UNAVAILABLE.call_once(|| {
            warn!("Markup parser not available in this build; using pattern extraction for forms and custom tags")
        });
    }
    Box::new(PatternMarkup)
}

fn select_script(requested: bool) -> Box<dyn ScriptStrategy> {
    if requested {
        #[cfg(feature = "java-ast")]
        match JavaAstScript::new() {
            Ok(script) => return Box::new(script),
            Err(e) => SCRIPT_UNAVAILABLE.call_once(|| {
                warn!("Java parser unavailable ({}); using pattern scriptlet scoring", e)
            }),
        }

        #[cfg(not(feature = "java-ast"))]
        SCRIPT_UNAVAILABLE.call_once(|| {
            warn!("Java parser not available in this build; using pattern scriptlet scoring")
        });
    }
    Box::new(PatternScript)
}
