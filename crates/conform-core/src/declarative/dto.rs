//! Serde DTOs for the TOML rule surface.
//!
//! These structs mirror the TOML document shape and nothing else. All
//! validation, keyword parsing, and pattern compilation happens in the
//! loader, which converts DTOs into domain values.

use serde::Deserialize;

/// Top-level document: a list of `[[rules]]` tables.
#[derive(Debug, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub struct RuleSetDto {
    /// The declared rules, in document order.
    #[serde(default)]
    pub rules: Vec<RuleDto>,
}

/// One `[[rules]]` table.
#[derive(Debug, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub struct RuleDto {
    /// Unique rule name.
    pub name: String,
    /// Quantifier keyword: `all`, `none`, `any`, or `exactly`.
    #[serde(default)]
    pub quantifier: Option<String>,
    /// Required count, only meaningful with `quantifier = "exactly"`.
    #[serde(default)]
    pub count: Option<usize>,
    /// Failure message attached to every violation.
    pub message: String,
    /// Enforcement keyword: `enforced`, `informational`, or `disabled`.
    #[serde(default)]
    pub mode: Option<String>,
    /// For `all` rules, skip instead of vacuously passing on an empty scope.
    #[serde(default)]
    pub require_non_empty: Option<bool>,
    /// Exempted element identifiers.
    #[serde(default)]
    pub exempt: Vec<String>,
    /// Exemption comment marker token.
    #[serde(default)]
    pub exempt_marker: Option<String>,
    /// The `[rules.scope]` table.
    pub scope: ScopeDto,
    /// The `[rules.predicate]` table.
    pub predicate: PredicateDto,
}

/// A `[rules.scope]` table.
#[derive(Debug, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub struct ScopeDto {
    /// Selection target: `units` or `declarations`.
    pub target: String,
    /// Declaration kind keyword.
    #[serde(default)]
    pub kind: Option<String>,
    /// Path substring filters (any may match).
    #[serde(default)]
    pub path_contains: Vec<String>,
    /// Path suffix filters (any may match).
    #[serde(default)]
    pub path_ends_with: Vec<String>,
    /// Directory root the unit path must sit under.
    #[serde(default)]
    pub under: Option<String>,
    /// Glob filters over unit paths (any may match).
    #[serde(default)]
    pub path_glob: Vec<String>,
    /// Declaration-name regex filter.
    #[serde(default)]
    pub name_matches: Option<String>,
    /// Path substrings that exclude an element.
    #[serde(default)]
    pub exclude_path_contains: Vec<String>,
    /// Excludes test paths.
    #[serde(default)]
    pub exclude_tests: bool,
}

/// A predicate table: exactly one key must be set.
#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub struct PredicateDto {
    /// `name-matches = "<regex>"`
    #[serde(default)]
    pub name_matches: Option<String>,
    /// `has-modifier = "<modifier>"`
    #[serde(default)]
    pub has_modifier: Option<String>,
    /// `lacks-modifier = "<modifier>"`
    #[serde(default)]
    pub lacks_modifier: Option<String>,
    /// `has-role = "<role>"`
    #[serde(default)]
    pub has_role: Option<String>,
    /// `in-package = "<fragment>"`
    #[serde(default)]
    pub in_package: Option<String>,
    /// `has-annotation = "<name>"`
    #[serde(default)]
    pub has_annotation: Option<String>,
    /// `return-type-contains = "<fragment>"`
    #[serde(default)]
    pub return_type_contains: Option<String>,
    /// `has-docs = true|false`
    #[serde(default)]
    pub has_docs: Option<bool>,
    /// `imports-matching = "<segment pattern>"`
    #[serde(default)]
    pub imports_matching: Option<String>,
    /// `imports-containing = "<fragment>"`
    #[serde(default)]
    pub imports_containing: Option<String>,
    /// `text-contains = { pattern = "<regex>", window = "unit"|"body" }`
    #[serde(default)]
    pub text_contains: Option<TextContainsDto>,
    /// `not = { <predicate> }`
    #[serde(default)]
    pub not: Option<Box<PredicateDto>>,
    /// `all-of = [{ <predicate> }, ...]`
    #[serde(default)]
    pub all_of: Option<Vec<PredicateDto>>,
    /// `any-of = [{ <predicate> }, ...]`
    #[serde(default)]
    pub any_of: Option<Vec<PredicateDto>>,
}

/// The `text-contains` inline table.
#[derive(Debug, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub struct TextContainsDto {
    /// The regex to search for.
    pub pattern: String,
    /// Search window keyword: `unit` (default) or `body`.
    #[serde(default)]
    pub window: Option<String>,
}
