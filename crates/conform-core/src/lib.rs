//! # conform-core
//!
//! Core engine for architecture conformance checking over a language-neutral
//! source model.
//!
//! A caller builds a [`SourceModel`] describing units and declarations, then
//! checks quantified rules against it:
//!
//! - [`ScopeSpec`] selects the elements a rule applies to
//! - [`Predicate`] is a composable structural or textual condition
//! - [`Rule`] binds scope, quantifier, and predicate with a message
//! - [`Engine`] evaluates rules and aggregates a deterministic [`Report`]
//!
//! ## Example
//!
//! ```
//! use conform_core::{
//!     DeclKind, Engine, NamePattern, Predicate, Rule, ScopeSpec, SourceModel,
//! };
//!
//! # fn main() -> Result<(), Box<dyn std::error::Error>> {
//! let model = SourceModel::empty();
//! let rule = Rule::builder("port-naming")
//!     .scope(ScopeSpec::declarations().kind(DeclKind::Interface).build())
//!     .predicate(Predicate::NameMatches(NamePattern::new("Port$")?))
//!     .message("interfaces in this layer are ports and must be named *Port")
//!     .build()?;
//!
//! let report = Engine::builder().rule(rule).build().check(&model);
//! assert!(!report.has_failures());
//! # Ok(())
//! # }
//! ```

#![forbid(unsafe_code)]
#![warn(missing_docs)]

mod engine;
mod model;
mod pattern;
mod predicate;
mod report;
mod rule;
mod scope;

/// Declarative TOML rule definitions.
pub mod declarative;

pub use engine::{CancelToken, Engine, EngineBuilder};
pub use model::{
    Annotation, DeclKind, Declaration, DeclarationBuilder, ElementId, Import, Modifier,
    ModelError, Role, SourceModel, SourceModelBuilder, SourceUnit, SourceUnitBuilder, UnitPath,
};
pub use pattern::{ImportPattern, NamePattern, PathPattern, PatternError, TextPattern};
pub use predicate::{EvalError, Predicate, TextWindow, Verdict};
pub use report::{Location, Outcome, Report, RuleReport, Violation};
pub use rule::{Enforcement, Exemptions, Quantifier, Rule, RuleBuilder, RuleError};
pub use scope::{Element, Scope, ScopeSpec, ScopeSpecBuilder, ScopeTarget};
