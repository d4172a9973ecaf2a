//! Test-harness entry points.
//!
//! `run_check` is meant to be called from a test: it evaluates a TOML rules
//! document against a model and panics with the formatted report when the
//! run fails, so the conformance report becomes the test failure output.

use conform_core::declarative::{load_rules_from_toml, LoadError};
use conform_core::{Engine, Report, SourceModel};
use serde::Deserialize;

/// Runner settings read from the same TOML document as the rules.
///
/// Unknown keys (including the `[[rules]]` tables) are ignored here; the
/// rules themselves go through the declarative loader.
#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub struct RunnerConfig {
    /// What fails the run: `failures` (default) or `warnings`.
    #[serde(default)]
    pub fail_on: Option<String>,
}

/// What outcome severity fails a `run_check` call.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum FailOn {
    /// Only enforced rule failures fail the run.
    #[default]
    Failures,
    /// Informational findings fail the run too.
    Warnings,
}

/// Evaluates a TOML rules document against a model.
///
/// # Errors
///
/// Returns a [`LoadError`] when the document cannot be parsed into rules.
pub fn run_rules(model: &SourceModel, document: &str) -> Result<Report, LoadError> {
    let rules = load_rules_from_toml(document)?;
    Ok(Engine::builder().rules(rules).build().check(model))
}

/// Runs a rules document as part of `cargo test`.
///
/// # Panics
///
/// Panics with the formatted report when the run fails at the configured
/// `fail-on` level, or with a load error when the document is invalid.
pub fn run_check(model: &SourceModel, document: &str) {
    let config = parse_runner_config(document);
    let fail_on = resolve_fail_on(&config);

    let report = run_rules(model, document)
        .unwrap_or_else(|e| panic!("conform: failed to load rules: {e}"));

    let failing = match fail_on {
        FailOn::Failures => report.has_failures(),
        FailOn::Warnings => report.has_failures() || report.warning_count() > 0,
    };
    if failing {
        panic!("{}", report.format());
    }
}

/// Parses runner settings, ignoring the rule tables.
fn parse_runner_config(document: &str) -> RunnerConfig {
    if document.is_empty() {
        return RunnerConfig::default();
    }
    toml::from_str(document)
        .unwrap_or_else(|e| panic!("conform: failed to parse runner config: {e}"))
}

/// Resolves the effective `fail-on` level. Defaults to `failures`.
fn resolve_fail_on(config: &RunnerConfig) -> FailOn {
    match config.fail_on.as_deref() {
        None | Some("failures") => FailOn::Failures,
        Some("warnings") => FailOn::Warnings,
        Some(other) => {
            panic!("conform: unknown fail-on `{other}`. Valid values: failures, warnings")
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn fail_on_defaults_to_failures() {
        let config = RunnerConfig::default();
        assert_eq!(resolve_fail_on(&config), FailOn::Failures);
    }

    #[test]
    fn fail_on_from_config() {
        let config = RunnerConfig {
            fail_on: Some("warnings".to_string()),
        };
        assert_eq!(resolve_fail_on(&config), FailOn::Warnings);
    }

    #[test]
    #[should_panic(expected = "unknown fail-on")]
    fn fail_on_invalid_panics() {
        let config = RunnerConfig {
            fail_on: Some("everything".to_string()),
        };
        resolve_fail_on(&config);
    }

    #[test]
    fn runner_config_ignores_rule_tables() {
        let config = parse_runner_config(
            r#"
            fail-on = "warnings"

            [[rules]]
            name = "r"
            message = "m"
            [rules.scope]
            target = "units"
            [rules.predicate]
            has-docs = true
            "#,
        );
        assert_eq!(config.fail_on.as_deref(), Some("warnings"));
    }

    #[test]
    fn empty_document_yields_default_config() {
        let config = parse_runner_config("");
        assert!(config.fail_on.is_none());
    }
}
