//! Declarative TOML rule definitions.
//!
//! Rules can be written as data instead of builder calls: a TOML document
//! with `[[rules]]` tables, each carrying a scope table and a predicate
//! table. [`load_rules_from_toml`] converts the document into the same
//! validated [`crate::rule::Rule`] values the builder API produces.

mod dto;
mod loader;

pub use dto::{PredicateDto, RuleDto, RuleSetDto, ScopeDto, TextContainsDto};
pub use loader::{load_rules_from_toml, LoadError};
