//! Composable predicates over a declaration or source unit.
//!
//! Predicates are pure data evaluated against an element and the model:
//! no external state, no side effects, same element always produces the same
//! verdict. That purity is what makes rules independently testable and lets
//! the engine evaluate elements in any order.
//!
//! Structural checks read the model records; textual checks scan the raw
//! source text of the owning unit. Textual matching is a deliberate escape
//! hatch for properties the structural model cannot express, and is meant to
//! be paired with a structural scope filter that bounds its blast radius.

use crate::model::{Modifier, Role, SourceModel, SourceUnit, UnitPath};
use crate::pattern::{ImportPattern, NamePattern, TextPattern};
use crate::scope::Element;

/// Where a textual predicate searches within the owning unit.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum TextWindow {
    /// Search the whole unit text.
    #[default]
    WholeUnit,
    /// Search only the declaration's recorded body span.
    ///
    /// Falls back to the whole unit when the model carries no span for the
    /// declaration, or when the element is a unit.
    DeclarationBody,
}

/// Evaluation errors.
///
/// A predicate never fails on its own inputs (patterns are validated at
/// construction); the only failure mode is a model inconsistency, which the
/// engine reports as a per-rule model error instead of crashing the run.
#[derive(Debug, Clone, thiserror::Error)]
pub enum EvalError {
    /// A declaration's back-reference points outside the model.
    #[error("declaration `{name}` references unknown unit `{path}`")]
    UnknownUnit {
        /// Qualified name of the dangling declaration.
        name: String,
        /// The unresolved unit path.
        path: UnitPath,
    },
}

/// Result of evaluating one predicate against one element.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Verdict {
    holds: bool,
    detail: Option<String>,
}

impl Verdict {
    /// A satisfied verdict without detail.
    #[must_use]
    pub fn satisfied() -> Self {
        Self {
            holds: true,
            detail: None,
        }
    }

    /// A satisfied verdict carrying a matched fragment or explanation.
    #[must_use]
    pub fn satisfied_with(detail: impl Into<String>) -> Self {
        Self {
            holds: true,
            detail: Some(detail.into()),
        }
    }

    /// An unsatisfied verdict without detail.
    #[must_use]
    pub fn unsatisfied() -> Self {
        Self {
            holds: false,
            detail: None,
        }
    }

    /// An unsatisfied verdict carrying an explanatory fragment.
    #[must_use]
    pub fn unsatisfied_with(detail: impl Into<String>) -> Self {
        Self {
            holds: false,
            detail: Some(detail.into()),
        }
    }

    /// Returns true if the predicate held.
    #[must_use]
    pub fn holds(&self) -> bool {
        self.holds
    }

    /// Returns the explanatory fragment, if any.
    #[must_use]
    pub fn detail(&self) -> Option<&str> {
        self.detail.as_deref()
    }
}

/// A composable boolean predicate over one element.
#[derive(Debug, Clone)]
pub enum Predicate {
    /// Declaration name matches a pattern.
    NameMatches(NamePattern),
    /// Declaration carries a structural modifier.
    HasModifier(Modifier),
    /// Declaration does not carry a structural modifier.
    LacksModifier(Modifier),
    /// Declaration carries an architectural role tag.
    ///
    /// Roles are resolved once at model construction, so this checks a
    /// recorded capability instead of re-deriving naming conventions per
    /// rule.
    HasRole(Role),
    /// Declaration's package path contains a fragment.
    InPackage(String),
    /// Declaration carries an annotation by name.
    HasAnnotation(String),
    /// Declared return-type name contains a fragment.
    ReturnTypeContains(String),
    /// Declaration is documented.
    HasDocs,
    /// Owning unit imports a name matching a pattern.
    ImportsMatching(ImportPattern),
    /// Raw text of the owning unit matches a pattern within a window.
    TextContains {
        /// The textual pattern.
        pattern: TextPattern,
        /// Where to search.
        window: TextWindow,
    },
    /// Negation.
    Not(Box<Predicate>),
    /// Conjunction; short-circuits in declaration order.
    AllOf(Vec<Predicate>),
    /// Disjunction; short-circuits in declaration order.
    AnyOf(Vec<Predicate>),
}

impl Predicate {
    /// Combines two predicates conjunctively.
    #[must_use]
    pub fn and(self, other: Predicate) -> Predicate {
        match self {
            Predicate::AllOf(mut preds) => {
                preds.push(other);
                Predicate::AllOf(preds)
            }
            first => Predicate::AllOf(vec![first, other]),
        }
    }

    /// Combines two predicates disjunctively.
    #[must_use]
    pub fn or(self, other: Predicate) -> Predicate {
        match self {
            Predicate::AnyOf(mut preds) => {
                preds.push(other);
                Predicate::AnyOf(preds)
            }
            first => Predicate::AnyOf(vec![first, other]),
        }
    }

    /// Negates this predicate.
    #[must_use]
    pub fn negate(self) -> Predicate {
        Predicate::Not(Box::new(self))
    }

    /// Evaluates this predicate against one element.
    ///
    /// # Errors
    ///
    /// Returns [`EvalError::UnknownUnit`] when a declaration's back-reference
    /// cannot be resolved against the model.
    pub fn eval(&self, model: &SourceModel, element: Element<'_>) -> Result<Verdict, EvalError> {
        match self {
            Self::NameMatches(pattern) => Ok(match element {
                Element::Decl(decl) => {
                    if pattern.is_match(decl.name()) {
                        Verdict::satisfied()
                    } else {
                        Verdict::unsatisfied_with(format!(
                            "name `{}` does not match `{}`",
                            decl.name(),
                            pattern.as_str()
                        ))
                    }
                }
                Element::Unit(unit) => declarations_only(unit, "name matching"),
            }),

            Self::HasModifier(modifier) => Ok(match element {
                Element::Decl(decl) => {
                    if decl.has_modifier(*modifier) {
                        Verdict::satisfied_with(format!("has modifier `{modifier}`"))
                    } else {
                        Verdict::unsatisfied_with(format!("missing modifier `{modifier}`"))
                    }
                }
                Element::Unit(unit) => declarations_only(unit, "modifier checks"),
            }),

            Self::LacksModifier(modifier) => Ok(match element {
                Element::Decl(decl) => {
                    if decl.has_modifier(*modifier) {
                        Verdict::unsatisfied_with(format!("carries modifier `{modifier}`"))
                    } else {
                        Verdict::satisfied()
                    }
                }
                Element::Unit(unit) => declarations_only(unit, "modifier checks"),
            }),

            Self::HasRole(role) => Ok(match element {
                Element::Decl(decl) => match decl.role() {
                    Some(actual) if actual == *role => {
                        Verdict::satisfied_with(format!("has role `{role}`"))
                    }
                    Some(actual) => {
                        Verdict::unsatisfied_with(format!("role is `{actual}`, not `{role}`"))
                    }
                    None => Verdict::unsatisfied_with(format!("no role, expected `{role}`")),
                },
                Element::Unit(unit) => declarations_only(unit, "role checks"),
            }),

            Self::InPackage(fragment) => Ok(match element {
                Element::Decl(decl) => {
                    if decl.package().contains(fragment.as_str()) {
                        Verdict::satisfied()
                    } else {
                        Verdict::unsatisfied_with(format!(
                            "package `{}` does not contain `{fragment}`",
                            decl.package()
                        ))
                    }
                }
                Element::Unit(unit) => declarations_only(unit, "package checks"),
            }),

            Self::HasAnnotation(name) => Ok(match element {
                Element::Decl(decl) => {
                    if decl.has_annotation(name) {
                        Verdict::satisfied_with(format!("annotated with `{name}`"))
                    } else {
                        Verdict::unsatisfied_with(format!("missing annotation `{name}`"))
                    }
                }
                Element::Unit(unit) => declarations_only(unit, "annotation checks"),
            }),

            Self::ReturnTypeContains(fragment) => Ok(match element {
                Element::Decl(decl) => match decl.return_type() {
                    Some(ty) if ty.contains(fragment.as_str()) => {
                        Verdict::satisfied_with(format!("return type `{ty}`"))
                    }
                    Some(ty) => Verdict::unsatisfied_with(format!(
                        "return type `{ty}` does not contain `{fragment}`"
                    )),
                    None => Verdict::unsatisfied_with("no declared return type"),
                },
                Element::Unit(unit) => declarations_only(unit, "return-type checks"),
            }),

            Self::HasDocs => Ok(match element {
                Element::Decl(decl) => {
                    if decl.has_docs() {
                        Verdict::satisfied()
                    } else {
                        Verdict::unsatisfied_with("undocumented")
                    }
                }
                Element::Unit(unit) => declarations_only(unit, "documentation checks"),
            }),

            Self::ImportsMatching(pattern) => {
                let unit = owning_unit(model, element)?;
                Ok(
                    match unit.imports().iter().find(|i| pattern.matches(i.as_str())) {
                        Some(import) => Verdict::satisfied_with(format!("imports `{import}`")),
                        None => Verdict::unsatisfied_with(format!(
                            "no import matches `{}`",
                            pattern.as_str()
                        )),
                    },
                )
            }

            Self::TextContains { pattern, window } => {
                let unit = owning_unit(model, element)?;
                let haystack = window_text(unit, element, *window);
                Ok(match pattern.find_in(haystack) {
                    Some((_, fragment)) => {
                        Verdict::satisfied_with(format!("matched `{fragment}`"))
                    }
                    None => Verdict::unsatisfied_with(format!(
                        "text does not match `{}`",
                        pattern.as_str()
                    )),
                })
            }

            Self::Not(inner) => {
                let verdict = inner.eval(model, element)?;
                // Keep the inner detail: when NOT fails, the inner match is
                // exactly what the reader needs to see.
                Ok(Verdict {
                    holds: !verdict.holds,
                    detail: verdict.detail,
                })
            }

            Self::AllOf(preds) => {
                for pred in preds {
                    let verdict = pred.eval(model, element)?;
                    if !verdict.holds() {
                        return Ok(verdict);
                    }
                }
                Ok(Verdict::satisfied())
            }

            Self::AnyOf(preds) => {
                for pred in preds {
                    let verdict = pred.eval(model, element)?;
                    if verdict.holds() {
                        return Ok(verdict);
                    }
                }
                Ok(Verdict::unsatisfied_with(format!(
                    "none of {} alternatives matched",
                    preds.len()
                )))
            }
        }
    }
}

fn declarations_only(unit: &SourceUnit, what: &str) -> Verdict {
    Verdict::unsatisfied_with(format!(
        "{what} applies to declarations; `{}` is a source unit",
        unit.path()
    ))
}

/// Resolves the owning unit of an element against the model.
fn owning_unit<'m>(
    model: &'m SourceModel,
    element: Element<'m>,
) -> Result<&'m SourceUnit, EvalError> {
    match element {
        Element::Unit(unit) => Ok(unit),
        Element::Decl(decl) => model.unit(decl.unit()).ok_or_else(|| EvalError::UnknownUnit {
            name: decl.qualified_name(),
            path: decl.unit().clone(),
        }),
    }
}

/// Slices the search window out of the unit text, falling back to the whole
/// text when no usable span is recorded.
fn window_text<'m>(unit: &'m SourceUnit, element: Element<'m>, window: TextWindow) -> &'m str {
    let text = unit.text();
    if window == TextWindow::WholeUnit {
        return text;
    }
    let Element::Decl(decl) = element else {
        return text;
    };
    let Some((start, end)) = decl.body_span() else {
        return text;
    };
    if start > end {
        return text;
    }
    text.get(start..end).unwrap_or(text)
}
