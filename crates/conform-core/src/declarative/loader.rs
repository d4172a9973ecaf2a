//! DTO to domain conversion.
//!
//! Everything fails fast: an unknown keyword, an invalid pattern, or an
//! ambiguous predicate table is a load error with the rule's position and
//! name in the message, never a silently vacuous rule.

use super::dto::{PredicateDto, RuleDto, RuleSetDto, ScopeDto, TextContainsDto};
use crate::model::{DeclKind, Modifier, Role};
use crate::pattern::{ImportPattern, NamePattern, PathPattern, PatternError, TextPattern};
use crate::predicate::{Predicate, TextWindow};
use crate::rule::{Enforcement, Exemptions, Quantifier, Rule, RuleError};
use crate::scope::{ScopeSpec, ScopeSpecBuilder};

/// Errors turning a TOML document into rules.
#[derive(Debug, thiserror::Error)]
pub enum LoadError {
    /// The document is not valid TOML or does not match the schema.
    #[error("invalid rules document: {message}")]
    Toml {
        /// Parser diagnostics.
        message: String,
    },

    /// A pattern failed to compile.
    #[error("{context}: {source}")]
    Pattern {
        /// Which rule and field.
        context: String,
        /// The underlying pattern error.
        source: PatternError,
    },

    /// A predicate table had zero or more than one key.
    #[error("{context}: predicate table must have exactly one key, found {found}")]
    AmbiguousPredicate {
        /// Which rule and field.
        context: String,
        /// How many keys were set.
        found: usize,
    },

    /// Unrecognized quantifier keyword.
    #[error("{context}: unknown quantifier `{value}` (expected all, none, any, exactly)")]
    UnknownQuantifier {
        /// Which rule.
        context: String,
        /// The offending keyword.
        value: String,
    },

    /// Unrecognized enforcement keyword.
    #[error("{context}: unknown mode `{value}` (expected enforced, informational, disabled)")]
    UnknownMode {
        /// Which rule.
        context: String,
        /// The offending keyword.
        value: String,
    },

    /// Unrecognized scope target keyword.
    #[error("{context}: unknown target `{value}` (expected units, declarations)")]
    UnknownTarget {
        /// Which rule.
        context: String,
        /// The offending keyword.
        value: String,
    },

    /// Unrecognized declaration kind keyword.
    #[error(
        "{context}: unknown kind `{value}` (expected class, interface, function, property, object)"
    )]
    UnknownKind {
        /// Which rule.
        context: String,
        /// The offending keyword.
        value: String,
    },

    /// Unrecognized modifier keyword.
    #[error("{context}: unknown modifier `{value}`")]
    UnknownModifier {
        /// Which rule.
        context: String,
        /// The offending keyword.
        value: String,
    },

    /// Unrecognized role keyword.
    #[error(
        "{context}: unknown role `{value}` (expected port, adapter, handler, service, repository)"
    )]
    UnknownRole {
        /// Which rule.
        context: String,
        /// The offending keyword.
        value: String,
    },

    /// Unrecognized text window keyword.
    #[error("{context}: unknown window `{value}` (expected unit, body)")]
    UnknownWindow {
        /// Which rule.
        context: String,
        /// The offending keyword.
        value: String,
    },

    /// `quantifier = "exactly"` without a count.
    #[error("{context}: quantifier `exactly` requires a `count`")]
    MissingCount {
        /// Which rule.
        context: String,
    },

    /// A `count` on a quantifier that does not take one.
    #[error("{context}: `count` only applies to quantifier `exactly`")]
    UnexpectedCount {
        /// Which rule.
        context: String,
    },

    /// Rule-level validation failed after conversion.
    #[error(transparent)]
    Rule(#[from] RuleError),
}

/// Parses a TOML rules document into validated rules.
///
/// # Errors
///
/// Returns a [`LoadError`] naming the offending rule when the document is
/// malformed, a keyword is unrecognized, a pattern does not compile, or a
/// predicate table is ambiguous.
pub fn load_rules_from_toml(document: &str) -> Result<Vec<Rule>, LoadError> {
    let dto: RuleSetDto = toml::from_str(document).map_err(|e| LoadError::Toml {
        message: e.to_string(),
    })?;
    tracing::debug!(rules = dto.rules.len(), "parsed rules document");

    dto.rules
        .into_iter()
        .enumerate()
        .map(|(index, rule)| {
            let context = format!("rules[{index}] `{}`", rule.name);
            convert_rule(rule, &context)
        })
        .collect()
}

fn convert_rule(dto: RuleDto, context: &str) -> Result<Rule, LoadError> {
    let quantifier = convert_quantifier(dto.quantifier.as_deref(), dto.count, context)?;
    let enforcement = convert_mode(dto.mode.as_deref(), context)?;
    let scope = convert_scope(dto.scope, context)?;
    let predicate = convert_predicate(&dto.predicate, context)?;

    let mut exemptions = Exemptions::none();
    for id in dto.exempt {
        exemptions = exemptions.with_id(id);
    }
    if let Some(marker) = dto.exempt_marker {
        exemptions = exemptions.with_marker(marker);
    }

    Ok(Rule::builder(dto.name)
        .scope(scope)
        .quantifier(quantifier)
        .require_non_empty(dto.require_non_empty.unwrap_or(false))
        .predicate(predicate)
        .message(dto.message)
        .exemptions(exemptions)
        .enforcement(enforcement)
        .build()?)
}

fn convert_quantifier(
    keyword: Option<&str>,
    count: Option<usize>,
    context: &str,
) -> Result<Quantifier, LoadError> {
    let keyword = keyword.unwrap_or("all");
    let quantifier = match keyword {
        "all" => Quantifier::All {
            require_non_empty: false,
        },
        "none" => Quantifier::None,
        "any" => Quantifier::Any,
        "exactly" => {
            return count.map(Quantifier::Exactly).ok_or(LoadError::MissingCount {
                context: context.to_string(),
            })
        }
        other => {
            return Err(LoadError::UnknownQuantifier {
                context: context.to_string(),
                value: other.to_string(),
            })
        }
    };
    if count.is_some() {
        return Err(LoadError::UnexpectedCount {
            context: context.to_string(),
        });
    }
    Ok(quantifier)
}

fn convert_mode(keyword: Option<&str>, context: &str) -> Result<Enforcement, LoadError> {
    match keyword {
        None | Some("enforced") => Ok(Enforcement::Enforced),
        Some("informational") => Ok(Enforcement::Informational),
        Some("disabled") => Ok(Enforcement::Disabled),
        Some(other) => Err(LoadError::UnknownMode {
            context: context.to_string(),
            value: other.to_string(),
        }),
    }
}

fn convert_scope(dto: ScopeDto, context: &str) -> Result<ScopeSpec, LoadError> {
    let mut builder: ScopeSpecBuilder = match dto.target.as_str() {
        "units" => ScopeSpec::units(),
        "declarations" => ScopeSpec::declarations(),
        other => {
            return Err(LoadError::UnknownTarget {
                context: context.to_string(),
                value: other.to_string(),
            })
        }
    };

    if let Some(kind) = dto.kind.as_deref() {
        builder = builder.kind(convert_kind(kind, context)?);
    }
    for fragment in dto.path_contains {
        builder = builder.path_contains(fragment);
    }
    for suffix in dto.path_ends_with {
        builder = builder.path_ends_with(suffix);
    }
    if let Some(root) = dto.under {
        builder = builder.under(root);
    }
    for pattern in dto.path_glob {
        builder = builder.path_glob(compile(PathPattern::new(&pattern), context, "path-glob")?);
    }
    if let Some(pattern) = dto.name_matches.as_deref() {
        builder = builder.name_matches(compile(
            NamePattern::new(pattern),
            context,
            "scope name-matches",
        )?);
    }
    for fragment in dto.exclude_path_contains {
        builder = builder.exclude_path_contains(fragment);
    }
    if dto.exclude_tests {
        builder = builder.exclude_tests();
    }
    Ok(builder.build())
}

fn convert_kind(keyword: &str, context: &str) -> Result<DeclKind, LoadError> {
    match keyword {
        "class" => Ok(DeclKind::Class),
        "interface" => Ok(DeclKind::Interface),
        "function" => Ok(DeclKind::Function),
        "property" => Ok(DeclKind::Property),
        "object" => Ok(DeclKind::Object),
        other => Err(LoadError::UnknownKind {
            context: context.to_string(),
            value: other.to_string(),
        }),
    }
}

fn convert_modifier(keyword: &str, context: &str) -> Result<Modifier, LoadError> {
    match keyword {
        "sealed" => Ok(Modifier::Sealed),
        "abstract" => Ok(Modifier::Abstract),
        "immutable" => Ok(Modifier::Immutable),
        "open" => Ok(Modifier::Open),
        "public" => Ok(Modifier::Public),
        "internal" => Ok(Modifier::Internal),
        "protected" => Ok(Modifier::Protected),
        "private" => Ok(Modifier::Private),
        other => Err(LoadError::UnknownModifier {
            context: context.to_string(),
            value: other.to_string(),
        }),
    }
}

fn convert_role(keyword: &str, context: &str) -> Result<Role, LoadError> {
    match keyword {
        "port" => Ok(Role::Port),
        "adapter" => Ok(Role::Adapter),
        "handler" => Ok(Role::Handler),
        "service" => Ok(Role::Service),
        "repository" => Ok(Role::Repository),
        other => Err(LoadError::UnknownRole {
            context: context.to_string(),
            value: other.to_string(),
        }),
    }
}

fn convert_window(keyword: Option<&str>, context: &str) -> Result<TextWindow, LoadError> {
    match keyword {
        None | Some("unit") => Ok(TextWindow::WholeUnit),
        Some("body") => Ok(TextWindow::DeclarationBody),
        Some(other) => Err(LoadError::UnknownWindow {
            context: context.to_string(),
            value: other.to_string(),
        }),
    }
}

fn convert_predicate(dto: &PredicateDto, context: &str) -> Result<Predicate, LoadError> {
    let keys_set = [
        dto.name_matches.is_some(),
        dto.has_modifier.is_some(),
        dto.lacks_modifier.is_some(),
        dto.has_role.is_some(),
        dto.in_package.is_some(),
        dto.has_annotation.is_some(),
        dto.return_type_contains.is_some(),
        dto.has_docs.is_some(),
        dto.imports_matching.is_some(),
        dto.imports_containing.is_some(),
        dto.text_contains.is_some(),
        dto.not.is_some(),
        dto.all_of.is_some(),
        dto.any_of.is_some(),
    ]
    .iter()
    .filter(|set| **set)
    .count();
    if keys_set != 1 {
        return Err(LoadError::AmbiguousPredicate {
            context: context.to_string(),
            found: keys_set,
        });
    }

    if let Some(pattern) = dto.name_matches.as_deref() {
        return Ok(Predicate::NameMatches(compile(
            NamePattern::new(pattern),
            context,
            "name-matches",
        )?));
    }
    if let Some(modifier) = dto.has_modifier.as_deref() {
        return Ok(Predicate::HasModifier(convert_modifier(modifier, context)?));
    }
    if let Some(modifier) = dto.lacks_modifier.as_deref() {
        return Ok(Predicate::LacksModifier(convert_modifier(
            modifier, context,
        )?));
    }
    if let Some(role) = dto.has_role.as_deref() {
        return Ok(Predicate::HasRole(convert_role(role, context)?));
    }
    if let Some(fragment) = &dto.in_package {
        return Ok(Predicate::InPackage(fragment.clone()));
    }
    if let Some(name) = &dto.has_annotation {
        return Ok(Predicate::HasAnnotation(name.clone()));
    }
    if let Some(fragment) = &dto.return_type_contains {
        return Ok(Predicate::ReturnTypeContains(fragment.clone()));
    }
    if let Some(documented) = dto.has_docs {
        return Ok(if documented {
            Predicate::HasDocs
        } else {
            Predicate::HasDocs.negate()
        });
    }
    if let Some(pattern) = dto.imports_matching.as_deref() {
        return Ok(Predicate::ImportsMatching(compile(
            ImportPattern::new(pattern),
            context,
            "imports-matching",
        )?));
    }
    if let Some(fragment) = dto.imports_containing.as_deref() {
        return Ok(Predicate::ImportsMatching(compile(
            ImportPattern::containing(fragment),
            context,
            "imports-containing",
        )?));
    }
    if let Some(TextContainsDto { pattern, window }) = &dto.text_contains {
        return Ok(Predicate::TextContains {
            pattern: compile(TextPattern::new(pattern), context, "text-contains")?,
            window: convert_window(window.as_deref(), context)?,
        });
    }
    if let Some(inner) = &dto.not {
        return Ok(convert_predicate(inner, context)?.negate());
    }
    if let Some(parts) = &dto.all_of {
        let preds = parts
            .iter()
            .map(|p| convert_predicate(p, context))
            .collect::<Result<Vec<_>, _>>()?;
        return Ok(Predicate::AllOf(preds));
    }
    if let Some(parts) = &dto.any_of {
        let preds = parts
            .iter()
            .map(|p| convert_predicate(p, context))
            .collect::<Result<Vec<_>, _>>()?;
        return Ok(Predicate::AnyOf(preds));
    }
    unreachable!("exactly one predicate key was verified above")
}

fn compile<T>(
    result: Result<T, PatternError>,
    context: &str,
    field: &str,
) -> Result<T, LoadError> {
    result.map_err(|source| LoadError::Pattern {
        context: format!("{context} {field}"),
        source,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::scope::ScopeTarget;

    #[test]
    fn loads_a_complete_rule() {
        let rules = load_rules_from_toml(
            r#"
            [[rules]]
            name = "ports-are-named-port"
            quantifier = "all"
            message = "ports must follow the *Port naming convention"
            require-non-empty = true
            exempt = ["com.acme.LegacyGateway", "legacy/Old.kt"]
            exempt-marker = "conform:allow"

            [rules.scope]
            target = "declarations"
            kind = "interface"
            path-contains = ["domain"]
            exclude-tests = true

            [rules.predicate]
            name-matches = "^[A-Z][a-zA-Z]+Port$"
            "#,
        )
        .unwrap();

        assert_eq!(rules.len(), 1);
        let rule = &rules[0];
        assert_eq!(rule.name(), "ports-are-named-port");
        assert_eq!(
            rule.quantifier(),
            Quantifier::All {
                require_non_empty: true
            }
        );
        assert_eq!(rule.enforcement(), Enforcement::Enforced);
        assert_eq!(rule.scope().target(), ScopeTarget::Declarations);
        assert_eq!(rule.exemptions().ids().len(), 2);
        assert_eq!(rule.exemptions().marker(), Some("conform:allow"));
    }

    #[test]
    fn quantifier_defaults_to_all() {
        let rules = load_rules_from_toml(
            r#"
            [[rules]]
            name = "r"
            message = "m"
            [rules.scope]
            target = "units"
            [rules.predicate]
            has-docs = true
            "#,
        )
        .unwrap();
        assert_eq!(
            rules[0].quantifier(),
            Quantifier::All {
                require_non_empty: false
            }
        );
    }

    #[test]
    fn exactly_requires_count() {
        let err = load_rules_from_toml(
            r#"
            [[rules]]
            name = "counted"
            quantifier = "exactly"
            message = "m"
            [rules.scope]
            target = "units"
            [rules.predicate]
            has-docs = true
            "#,
        )
        .unwrap_err();
        assert!(matches!(err, LoadError::MissingCount { .. }));
        assert!(err.to_string().contains("rules[0] `counted`"));
    }

    #[test]
    fn count_rejected_outside_exactly() {
        let err = load_rules_from_toml(
            r#"
            [[rules]]
            name = "r"
            quantifier = "none"
            count = 2
            message = "m"
            [rules.scope]
            target = "units"
            [rules.predicate]
            has-docs = true
            "#,
        )
        .unwrap_err();
        assert!(matches!(err, LoadError::UnexpectedCount { .. }));
    }

    #[test]
    fn unknown_keywords_are_rejected() {
        let base = |quantifier: &str, mode: &str, target: &str| {
            format!(
                r#"
                [[rules]]
                name = "r"
                quantifier = "{quantifier}"
                mode = "{mode}"
                message = "m"
                [rules.scope]
                target = "{target}"
                [rules.predicate]
                has-docs = true
                "#
            )
        };
        assert!(matches!(
            load_rules_from_toml(&base("sometimes", "enforced", "units")).unwrap_err(),
            LoadError::UnknownQuantifier { .. }
        ));
        assert!(matches!(
            load_rules_from_toml(&base("all", "strict", "units")).unwrap_err(),
            LoadError::UnknownMode { .. }
        ));
        assert!(matches!(
            load_rules_from_toml(&base("all", "enforced", "files")).unwrap_err(),
            LoadError::UnknownTarget { .. }
        ));
    }

    #[test]
    fn predicate_table_must_have_exactly_one_key() {
        let empty = load_rules_from_toml(
            r#"
            [[rules]]
            name = "r"
            message = "m"
            [rules.scope]
            target = "units"
            [rules.predicate]
            "#,
        )
        .unwrap_err();
        assert!(matches!(
            empty,
            LoadError::AmbiguousPredicate { found: 0, .. }
        ));

        let doubled = load_rules_from_toml(
            r#"
            [[rules]]
            name = "r"
            message = "m"
            [rules.scope]
            target = "declarations"
            [rules.predicate]
            has-docs = true
            name-matches = "x"
            "#,
        )
        .unwrap_err();
        assert!(matches!(
            doubled,
            LoadError::AmbiguousPredicate { found: 2, .. }
        ));
    }

    #[test]
    fn nested_predicates_convert() {
        let rules = load_rules_from_toml(
            r#"
            [[rules]]
            name = "sealed-or-abstract-ports"
            message = "ports must be sealed or abstract"
            [rules.scope]
            target = "declarations"
            [rules.predicate]
            all-of = [
                { name-matches = "Port$" },
                { any-of = [{ has-modifier = "sealed" }, { has-modifier = "abstract" }] },
                { not = { has-annotation = "Deprecated" } },
            ]
            "#,
        )
        .unwrap();
        let Predicate::AllOf(parts) = rules[0].predicate() else {
            panic!("expected all-of");
        };
        assert_eq!(parts.len(), 3);
        assert!(matches!(parts[1], Predicate::AnyOf(_)));
        assert!(matches!(parts[2], Predicate::Not(_)));
    }

    #[test]
    fn role_keyword_converts() {
        let rules = load_rules_from_toml(
            r#"
            [[rules]]
            name = "ports-are-sealed"
            message = "m"
            [rules.scope]
            target = "declarations"
            [rules.predicate]
            has-role = "port"
            "#,
        )
        .unwrap();
        assert!(matches!(rules[0].predicate(), Predicate::HasRole(Role::Port)));

        let err = load_rules_from_toml(
            r#"
            [[rules]]
            name = "r"
            message = "m"
            [rules.scope]
            target = "declarations"
            [rules.predicate]
            has-role = "gateway"
            "#,
        )
        .unwrap_err();
        assert!(matches!(err, LoadError::UnknownRole { .. }));
    }

    #[test]
    fn has_docs_false_negates() {
        let rules = load_rules_from_toml(
            r#"
            [[rules]]
            name = "undocumented"
            quantifier = "none"
            message = "m"
            [rules.scope]
            target = "declarations"
            [rules.predicate]
            has-docs = false
            "#,
        )
        .unwrap();
        assert!(matches!(rules[0].predicate(), Predicate::Not(_)));
    }

    #[test]
    fn text_contains_window_keyword() {
        let rules = load_rules_from_toml(
            r#"
            [[rules]]
            name = "no-sleeps"
            quantifier = "none"
            message = "m"
            [rules.scope]
            target = "declarations"
            [rules.predicate]
            text-contains = { pattern = "Thread\\.sleep", window = "body" }
            "#,
        )
        .unwrap();
        assert!(matches!(
            rules[0].predicate(),
            Predicate::TextContains {
                window: TextWindow::DeclarationBody,
                ..
            }
        ));

        let err = load_rules_from_toml(
            r#"
            [[rules]]
            name = "r"
            message = "m"
            [rules.scope]
            target = "units"
            [rules.predicate]
            text-contains = { pattern = "x", window = "paragraph" }
            "#,
        )
        .unwrap_err();
        assert!(matches!(err, LoadError::UnknownWindow { .. }));
    }

    #[test]
    fn invalid_regex_is_a_load_error_with_context() {
        let err = load_rules_from_toml(
            r#"
            [[rules]]
            name = "broken"
            message = "m"
            [rules.scope]
            target = "declarations"
            [rules.predicate]
            name-matches = "(unclosed"
            "#,
        )
        .unwrap_err();
        let LoadError::Pattern { context, .. } = &err else {
            panic!("expected pattern error, got {err}");
        };
        assert_eq!(context, "rules[0] `broken` name-matches");
    }

    #[test]
    fn require_non_empty_on_none_is_rejected() {
        let err = load_rules_from_toml(
            r#"
            [[rules]]
            name = "r"
            quantifier = "none"
            require-non-empty = true
            message = "m"
            [rules.scope]
            target = "units"
            [rules.predicate]
            has-docs = true
            "#,
        )
        .unwrap_err();
        assert!(matches!(
            err,
            LoadError::Rule(RuleError::RequireNonEmptyOnlyForAll { .. })
        ));
    }

    #[test]
    fn malformed_toml_is_reported() {
        let err = load_rules_from_toml("[[rules]\nname=").unwrap_err();
        assert!(matches!(err, LoadError::Toml { .. }));
    }

    #[test]
    fn empty_document_loads_no_rules() {
        assert!(load_rules_from_toml("").unwrap().is_empty());
    }
}
