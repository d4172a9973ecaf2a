//! Quantified conformance rules.
//!
//! A rule binds a scope, a quantifier, and a predicate: "ALL declarations
//! under `src/main/domain` must be documented". Rules are plain data; the
//! engine in [`crate::engine`] evaluates them against a model.

use crate::model::SourceModel;
use crate::predicate::Predicate;
use crate::scope::{Element, ScopeSpec};
use std::fmt;

/// How many in-scope elements must satisfy the predicate.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Quantifier {
    /// Every element must satisfy the predicate.
    All {
        /// Treat an empty scope as a skipped rule instead of a vacuous pass.
        require_non_empty: bool,
    },
    /// No element may satisfy the predicate.
    None,
    /// At least one element must satisfy the predicate.
    Any,
    /// Exactly this many elements must satisfy the predicate.
    Exactly(usize),
}

impl fmt::Display for Quantifier {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::All { .. } => write!(f, "all"),
            Self::None => write!(f, "none"),
            Self::Any => write!(f, "any"),
            Self::Exactly(count) => write!(f, "exactly {count}"),
        }
    }
}

/// How a rule's failures are treated.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Enforcement {
    /// Failures are hard failures.
    #[default]
    Enforced,
    /// The rule is evaluated and reported, but never fails the run.
    Informational,
    /// The rule is not evaluated at all.
    Disabled,
}

impl fmt::Display for Enforcement {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            Self::Enforced => "enforced",
            Self::Informational => "informational",
            Self::Disabled => "disabled",
        };
        write!(f, "{s}")
    }
}

/// Exemptions remove elements from a rule's scope before quantification.
///
/// An exempted element is invisible to the rule: it neither violates an
/// `all`/`none` rule nor counts toward `any`/`exactly` satisfaction.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Exemptions {
    ids: Vec<String>,
    marker: Option<String>,
}

impl Exemptions {
    /// No exemptions.
    #[must_use]
    pub fn none() -> Self {
        Self::default()
    }

    /// Exempts an element by identifier.
    ///
    /// Declarations match on their qualified name; units match on their
    /// normalized path. Both also match on a path suffix, so `Order.kt`
    /// exempts `src/main/domain/Order.kt`.
    #[must_use]
    pub fn with_id(mut self, id: impl Into<String>) -> Self {
        self.ids.push(id.into());
        self
    }

    /// Exempts elements whose source carries a marker token in a comment.
    ///
    /// For declarations, the marker is looked for on the declaration's own
    /// line and the line directly above it. For units, any comment line in
    /// the unit counts.
    #[must_use]
    pub fn with_marker(mut self, marker: impl Into<String>) -> Self {
        self.marker = Some(marker.into());
        self
    }

    /// Returns true when no exemptions are configured.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.ids.is_empty() && self.marker.is_none()
    }

    /// Returns the exempted identifiers.
    #[must_use]
    pub fn ids(&self) -> &[String] {
        &self.ids
    }

    /// Returns the marker token, if configured.
    #[must_use]
    pub fn marker(&self) -> Option<&str> {
        self.marker.as_deref()
    }

    /// Tests whether an element is exempted.
    #[must_use]
    pub fn covers(&self, model: &SourceModel, element: Element<'_>) -> bool {
        if self.is_empty() {
            return false;
        }
        if self.ids.iter().any(|id| id_matches(id, element)) {
            return true;
        }
        if let Some(marker) = &self.marker {
            return marker_covers(marker, model, element);
        }
        false
    }
}

fn id_matches(id: &str, element: Element<'_>) -> bool {
    match element {
        Element::Unit(unit) => {
            let path = unit.path().as_str();
            path == id || path_suffix_matches(path, id)
        }
        Element::Decl(decl) => {
            if decl.qualified_name() == id {
                return true;
            }
            let path = decl.unit().as_str();
            path == id || path_suffix_matches(path, id)
        }
    }
}

/// Suffix match aligned to a `/` boundary, so `Order.kt` does not exempt
/// `BackOrder.kt`.
fn path_suffix_matches(path: &str, suffix: &str) -> bool {
    path.strip_suffix(suffix)
        .is_some_and(|rest| rest.is_empty() || rest.ends_with('/'))
}

fn marker_covers(marker: &str, model: &SourceModel, element: Element<'_>) -> bool {
    match element {
        Element::Unit(unit) => unit.text().lines().any(|line| line_has_marker(line, marker)),
        Element::Decl(decl) => {
            let Some(unit) = model.unit(decl.unit()) else {
                return false;
            };
            let Some(line) = decl.line() else {
                return false;
            };
            let lines: Vec<&str> = unit.text().lines().collect();
            // 1-based declaration line; also check the line directly above
            let own = line.checked_sub(1).and_then(|i| lines.get(i));
            let above = line.checked_sub(2).and_then(|i| lines.get(i));
            own.is_some_and(|l| line_has_marker(l, marker))
                || above.is_some_and(|l| line_has_marker(l, marker))
        }
    }
}

/// A marker counts only inside a comment, so the token appearing in code or
/// string literals does not silently exempt an element.
///
/// Comment introducers inside double-quoted string content (a URL, say) are
/// skipped: only an introducer outside a string starts a comment.
fn line_has_marker(line: &str, marker: &str) -> bool {
    let mut in_string = false;
    let mut escaped = false;
    for (i, c) in line.char_indices() {
        if escaped {
            escaped = false;
            continue;
        }
        match c {
            '\\' if in_string => escaped = true,
            '"' => in_string = !in_string,
            '#' if !in_string => return line[i..].contains(marker),
            '/' if !in_string => {
                let rest = &line[i..];
                if rest.starts_with("//") || rest.starts_with("/*") {
                    return rest.contains(marker);
                }
            }
            _ => {}
        }
    }
    false
}

/// Errors in rule construction.
#[derive(Debug, Clone, thiserror::Error)]
pub enum RuleError {
    /// Rule name is empty.
    #[error("rule name must not be empty")]
    EmptyRuleName,

    /// Failure message is empty.
    #[error("rule `{name}`: message must not be empty")]
    EmptyMessage {
        /// The offending rule.
        name: String,
    },

    /// No scope was given.
    #[error("rule `{name}`: scope is required")]
    MissingScope {
        /// The offending rule.
        name: String,
    },

    /// No predicate was given.
    #[error("rule `{name}`: predicate is required")]
    MissingPredicate {
        /// The offending rule.
        name: String,
    },

    /// `require_non_empty` was set on a non-`all` quantifier.
    #[error("rule `{name}`: require-non-empty only applies to the `all` quantifier")]
    RequireNonEmptyOnlyForAll {
        /// The offending rule.
        name: String,
    },
}

/// A single conformance rule.
#[derive(Debug, Clone)]
pub struct Rule {
    name: String,
    scope: ScopeSpec,
    quantifier: Quantifier,
    predicate: Predicate,
    message: String,
    exemptions: Exemptions,
    enforcement: Enforcement,
}

impl Rule {
    /// Starts building a rule.
    #[must_use]
    pub fn builder(name: impl Into<String>) -> RuleBuilder {
        RuleBuilder::new(name)
    }

    /// Returns the rule name.
    #[must_use]
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Returns the scope specification.
    #[must_use]
    pub fn scope(&self) -> &ScopeSpec {
        &self.scope
    }

    /// Returns the quantifier.
    #[must_use]
    pub fn quantifier(&self) -> Quantifier {
        self.quantifier
    }

    /// Returns the predicate.
    #[must_use]
    pub fn predicate(&self) -> &Predicate {
        &self.predicate
    }

    /// Returns the failure message.
    #[must_use]
    pub fn message(&self) -> &str {
        &self.message
    }

    /// Returns the exemptions.
    #[must_use]
    pub fn exemptions(&self) -> &Exemptions {
        &self.exemptions
    }

    /// Returns the enforcement mode.
    #[must_use]
    pub fn enforcement(&self) -> Enforcement {
        self.enforcement
    }
}

/// Builder for [`Rule`].
#[derive(Debug)]
pub struct RuleBuilder {
    name: String,
    scope: Option<ScopeSpec>,
    quantifier: Quantifier,
    require_non_empty: bool,
    predicate: Option<Predicate>,
    message: Option<String>,
    exemptions: Exemptions,
    enforcement: Enforcement,
}

impl RuleBuilder {
    fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            scope: None,
            quantifier: Quantifier::All {
                require_non_empty: false,
            },
            require_non_empty: false,
            predicate: None,
            message: None,
            exemptions: Exemptions::none(),
            enforcement: Enforcement::default(),
        }
    }

    /// Sets the scope.
    #[must_use]
    pub fn scope(mut self, scope: ScopeSpec) -> Self {
        self.scope = Some(scope);
        self
    }

    /// Sets the quantifier. Defaults to `all`.
    #[must_use]
    pub fn quantifier(mut self, quantifier: Quantifier) -> Self {
        self.quantifier = quantifier;
        self
    }

    /// For `all` rules, treats an empty scope as a skip instead of a pass.
    #[must_use]
    pub fn require_non_empty(mut self, require: bool) -> Self {
        self.require_non_empty = require;
        self
    }

    /// Sets the predicate.
    #[must_use]
    pub fn predicate(mut self, predicate: Predicate) -> Self {
        self.predicate = Some(predicate);
        self
    }

    /// Sets the failure message shown for each violation.
    #[must_use]
    pub fn message(mut self, message: impl Into<String>) -> Self {
        self.message = Some(message.into());
        self
    }

    /// Sets the exemptions.
    #[must_use]
    pub fn exemptions(mut self, exemptions: Exemptions) -> Self {
        self.exemptions = exemptions;
        self
    }

    /// Sets the enforcement mode.
    #[must_use]
    pub fn enforcement(mut self, enforcement: Enforcement) -> Self {
        self.enforcement = enforcement;
        self
    }

    /// Finalizes the rule.
    ///
    /// # Errors
    ///
    /// Returns an error when the name or message is empty, scope or predicate
    /// is missing, or `require_non_empty` is combined with a quantifier other
    /// than `all`.
    pub fn build(self) -> Result<Rule, RuleError> {
        if self.name.is_empty() {
            return Err(RuleError::EmptyRuleName);
        }
        let name = self.name;
        // A flag already carried by the quantifier value must survive; the
        // builder method can only strengthen it, never silently reset it.
        let quantifier = match (self.quantifier, self.require_non_empty) {
            (Quantifier::All { require_non_empty }, flag) => Quantifier::All {
                require_non_empty: require_non_empty || flag,
            },
            (other, false) => other,
            (_, true) => return Err(RuleError::RequireNonEmptyOnlyForAll { name }),
        };
        let scope = self
            .scope
            .ok_or_else(|| RuleError::MissingScope { name: name.clone() })?;
        let predicate = self
            .predicate
            .ok_or_else(|| RuleError::MissingPredicate { name: name.clone() })?;
        let message = match self.message {
            Some(m) if !m.is_empty() => m,
            _ => return Err(RuleError::EmptyMessage { name }),
        };
        Ok(Rule {
            name,
            scope,
            quantifier,
            predicate,
            message,
            exemptions: self.exemptions,
            enforcement: self.enforcement,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::{DeclKind, Declaration, SourceModel, SourceUnit, UnitPath};
    use crate::pattern::NamePattern;

    fn path(s: &str) -> UnitPath {
        UnitPath::new(s).unwrap()
    }

    fn minimal_rule() -> RuleBuilder {
        Rule::builder("ports-are-interfaces")
            .scope(ScopeSpec::declarations().build())
            .predicate(Predicate::NameMatches(NamePattern::new("Port$").unwrap()))
            .message("ports must follow the naming convention")
    }

    #[test]
    fn builder_produces_rule() {
        let rule = minimal_rule().build().unwrap();
        assert_eq!(rule.name(), "ports-are-interfaces");
        assert_eq!(
            rule.quantifier(),
            Quantifier::All {
                require_non_empty: false
            }
        );
        assert_eq!(rule.enforcement(), Enforcement::Enforced);
        assert!(rule.exemptions().is_empty());
    }

    #[test]
    fn builder_rejects_missing_parts() {
        assert!(matches!(
            Rule::builder("").build(),
            Err(RuleError::EmptyRuleName)
        ));
        assert!(matches!(
            Rule::builder("r")
                .predicate(Predicate::HasDocs)
                .message("m")
                .build(),
            Err(RuleError::MissingScope { .. })
        ));
        assert!(matches!(
            Rule::builder("r")
                .scope(ScopeSpec::units().build())
                .message("m")
                .build(),
            Err(RuleError::MissingPredicate { .. })
        ));
        assert!(matches!(
            Rule::builder("r")
                .scope(ScopeSpec::units().build())
                .predicate(Predicate::HasDocs)
                .build(),
            Err(RuleError::EmptyMessage { .. })
        ));
    }

    #[test]
    fn require_non_empty_only_for_all() {
        let err = minimal_rule()
            .quantifier(Quantifier::Any)
            .require_non_empty(true)
            .build()
            .unwrap_err();
        assert!(matches!(err, RuleError::RequireNonEmptyOnlyForAll { .. }));

        let rule = minimal_rule().require_non_empty(true).build().unwrap();
        assert_eq!(
            rule.quantifier(),
            Quantifier::All {
                require_non_empty: true
            }
        );
    }

    #[test]
    fn require_non_empty_inside_quantifier_value_survives_build() {
        let rule = minimal_rule()
            .quantifier(Quantifier::All {
                require_non_empty: true,
            })
            .build()
            .unwrap();
        assert_eq!(
            rule.quantifier(),
            Quantifier::All {
                require_non_empty: true
            }
        );
    }

    #[test]
    fn quantifier_display() {
        assert_eq!(
            Quantifier::All {
                require_non_empty: true
            }
            .to_string(),
            "all"
        );
        assert_eq!(Quantifier::None.to_string(), "none");
        assert_eq!(Quantifier::Any.to_string(), "any");
        assert_eq!(Quantifier::Exactly(2).to_string(), "exactly 2");
    }

    // -- Exemptions --

    fn model_one_unit() -> SourceModel {
        let unit_path = path("src/main/domain/Order.kt");
        SourceModel::builder()
            .unit(
                SourceUnit::builder(unit_path.clone())
                    .text("package com.acme.domain\n\n// conformance-exempt: legacy\nclass Order\nclass Invoice\n")
                    .declaration(
                        Declaration::builder("Order", DeclKind::Class, unit_path.clone())
                            .package("com.acme.domain")
                            .line(4)
                            .build()
                            .unwrap(),
                    )
                    .declaration(
                        Declaration::builder("Invoice", DeclKind::Class, unit_path)
                            .package("com.acme.domain")
                            .line(5)
                            .build()
                            .unwrap(),
                    )
                    .build(),
            )
            .build()
            .unwrap()
    }

    #[test]
    fn empty_exemptions_cover_nothing() {
        let model = model_one_unit();
        let unit = &model.units()[0];
        assert!(!Exemptions::none().covers(&model, Element::Unit(unit)));
    }

    #[test]
    fn id_exemption_matches_qualified_name() {
        let model = model_one_unit();
        let order = &model.units()[0].declarations()[0];
        let invoice = &model.units()[0].declarations()[1];
        let ex = Exemptions::none().with_id("com.acme.domain.Order");
        assert!(ex.covers(&model, Element::Decl(order)));
        assert!(!ex.covers(&model, Element::Decl(invoice)));
    }

    #[test]
    fn id_exemption_matches_path_suffix_on_boundary() {
        let model = model_one_unit();
        let unit = &model.units()[0];
        assert!(Exemptions::none()
            .with_id("domain/Order.kt")
            .covers(&model, Element::Unit(unit)));
        assert!(Exemptions::none()
            .with_id("Order.kt")
            .covers(&model, Element::Unit(unit)));
        // No boundary: `der.kt` is not a component suffix
        assert!(!Exemptions::none()
            .with_id("der.kt")
            .covers(&model, Element::Unit(unit)));
    }

    #[test]
    fn marker_exemption_checks_line_above_declaration() {
        let model = model_one_unit();
        let order = &model.units()[0].declarations()[0];
        let invoice = &model.units()[0].declarations()[1];
        let ex = Exemptions::none().with_marker("conformance-exempt");
        // Marker comment sits directly above `class Order` (line 4)
        assert!(ex.covers(&model, Element::Decl(order)));
        assert!(!ex.covers(&model, Element::Decl(invoice)));
    }

    #[test]
    fn marker_exemption_any_comment_line_for_units() {
        let model = model_one_unit();
        let unit = &model.units()[0];
        let ex = Exemptions::none().with_marker("conformance-exempt");
        assert!(ex.covers(&model, Element::Unit(unit)));
    }

    #[test]
    fn marker_in_code_does_not_count() {
        let unit_path = path("src/main/S.kt");
        let model = SourceModel::builder()
            .unit(
                SourceUnit::builder(unit_path.clone())
                    .text("val s = \"conformance-exempt\"\nclass S\n")
                    .declaration(
                        Declaration::builder("S", DeclKind::Class, unit_path)
                            .line(2)
                            .build()
                            .unwrap(),
                    )
                    .build(),
            )
            .build()
            .unwrap();
        let decl = &model.units()[0].declarations()[0];
        let ex = Exemptions::none().with_marker("conformance-exempt");
        assert!(!ex.covers(&model, Element::Decl(decl)));
        assert!(!ex.covers(&model, Element::Unit(&model.units()[0])));
    }

    #[test]
    fn introducer_inside_string_does_not_start_a_comment() {
        let unit_path = path("src/main/U.kt");
        let model = SourceModel::builder()
            .unit(
                SourceUnit::builder(unit_path.clone())
                    .text(concat!(
                        "val url = \"http://acme.dev/conformance-exempt\"\n",
                        "class S\n",
                        "val y = \"//\" // conformance-exempt\n",
                        "class T\n",
                    ))
                    .declaration(
                        Declaration::builder("S", DeclKind::Class, unit_path.clone())
                            .line(2)
                            .build()
                            .unwrap(),
                    )
                    .declaration(
                        Declaration::builder("T", DeclKind::Class, unit_path)
                            .line(4)
                            .build()
                            .unwrap(),
                    )
                    .build(),
            )
            .build()
            .unwrap();
        let ex = Exemptions::none().with_marker("conformance-exempt");

        // URL content above `class S` is string data, not a comment
        let s = &model.units()[0].declarations()[0];
        assert!(!ex.covers(&model, Element::Decl(s)));

        // A real comment after a closed string literal still counts
        let t = &model.units()[0].declarations()[1];
        assert!(ex.covers(&model, Element::Decl(t)));
    }
}
