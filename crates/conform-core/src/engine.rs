//! The rule evaluation engine.
//!
//! The engine owns a list of rules and checks them against a model passed to
//! every run. Rules are isolated: a model inconsistency inside one rule is
//! reported for that rule alone and never aborts the others.

use crate::model::SourceModel;
use crate::predicate::Verdict;
use crate::report::{Location, Outcome, Report, RuleReport, Violation};
use crate::rule::{Enforcement, Quantifier, Rule};
use crate::scope::Element;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

/// Cooperative cancellation for long runs.
///
/// Cloning shares the flag; cancelling from any clone stops the run at the
/// next rule boundary.
#[derive(Debug, Clone, Default)]
pub struct CancelToken {
    flag: Arc<AtomicBool>,
}

impl CancelToken {
    /// Creates a fresh, uncancelled token.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Requests cancellation.
    pub fn cancel(&self) {
        self.flag.store(true, Ordering::Relaxed);
    }

    /// Returns true once cancellation was requested.
    #[must_use]
    pub fn is_cancelled(&self) -> bool {
        self.flag.load(Ordering::Relaxed)
    }
}

/// Checks conformance rules against a source model.
#[derive(Debug, Default)]
pub struct Engine {
    rules: Vec<Rule>,
}

impl Engine {
    /// Starts building an engine.
    #[must_use]
    pub fn builder() -> EngineBuilder {
        EngineBuilder::default()
    }

    /// Returns the configured rules in declaration order.
    #[must_use]
    pub fn rules(&self) -> &[Rule] {
        &self.rules
    }

    /// Checks every rule against the model.
    #[must_use]
    pub fn check(&self, model: &SourceModel) -> Report {
        self.check_cancellable(model, &CancelToken::new())
    }

    /// Checks every rule, honoring a cancellation token between rules.
    ///
    /// Rules not yet started when cancellation is observed are reported as
    /// skipped, so the report always has one entry per rule.
    #[must_use]
    pub fn check_cancellable(&self, model: &SourceModel, cancel: &CancelToken) -> Report {
        tracing::info!(rules = self.rules.len(), units = model.len(), "starting check");
        let mut entries = Vec::with_capacity(self.rules.len());
        for rule in &self.rules {
            if cancel.is_cancelled() {
                tracing::warn!(rule = rule.name(), "run cancelled");
                entries.push(RuleReport::skipped(
                    rule.name(),
                    rule.enforcement(),
                    "run cancelled before this rule",
                ));
                continue;
            }
            entries.push(self.check_rule(model, rule));
        }
        let report = Report::new(entries);
        tracing::info!(
            failures = report.has_failures(),
            violations = report.violation_count(),
            "check finished"
        );
        report
    }

    fn check_rule(&self, model: &SourceModel, rule: &Rule) -> RuleReport {
        if rule.enforcement() == Enforcement::Disabled {
            tracing::debug!(rule = rule.name(), "disabled, not evaluated");
            return RuleReport::disabled(rule.name());
        }

        let scope = rule.scope().select(model);
        let in_scope: Vec<Element<'_>> = scope
            .iter()
            .filter(|element| !rule.exemptions().covers(model, *element))
            .collect();
        let exempted = scope.len() - in_scope.len();
        tracing::debug!(
            rule = rule.name(),
            selected = scope.len(),
            exempted,
            "scope selected"
        );

        // Evaluate everything up front so one model inconsistency fails the
        // whole rule uniformly instead of producing a half-evaluated verdict.
        let mut verdicts: Vec<(Element<'_>, Verdict)> = Vec::with_capacity(in_scope.len());
        for element in in_scope {
            match rule.predicate().eval(model, element) {
                Ok(verdict) => verdicts.push((element, verdict)),
                Err(err) => {
                    tracing::warn!(rule = rule.name(), error = %err, "model inconsistency");
                    return RuleReport::model_error(
                        rule.name(),
                        rule.enforcement(),
                        err.to_string(),
                    );
                }
            }
        }

        let entry = aggregate(rule, &verdicts, exempted);
        if entry.outcome() == Outcome::Failed {
            tracing::info!(
                rule = rule.name(),
                violations = entry.violations().len(),
                "rule failed"
            );
        }
        entry
    }
}

/// Applies the rule's quantifier to the collected verdicts.
fn aggregate(rule: &Rule, verdicts: &[(Element<'_>, Verdict)], exempted: usize) -> RuleReport {
    let satisfied = verdicts.iter().filter(|(_, v)| v.holds()).count();

    let entry = match rule.quantifier() {
        Quantifier::All { require_non_empty } => {
            if verdicts.is_empty() && require_non_empty {
                return note_exempted(
                    RuleReport::skipped(
                        rule.name(),
                        rule.enforcement(),
                        "scope selected no elements",
                    ),
                    exempted,
                );
            }
            if verdicts.is_empty() {
                RuleReport::passed(rule.name(), rule.enforcement())
                    .with_note("scope selected no elements, rule holds vacuously")
            } else if satisfied == verdicts.len() {
                RuleReport::passed(rule.name(), rule.enforcement())
            } else {
                let violations = violations_for(rule, verdicts, |v| !v.holds());
                RuleReport::failed(rule.name(), rule.enforcement(), violations)
            }
        }

        Quantifier::None => {
            if satisfied == 0 {
                RuleReport::passed(rule.name(), rule.enforcement())
            } else {
                let violations = violations_for(rule, verdicts, Verdict::holds);
                RuleReport::failed(rule.name(), rule.enforcement(), violations)
            }
        }

        Quantifier::Any => {
            if satisfied > 0 {
                RuleReport::passed(rule.name(), rule.enforcement())
            } else {
                // Scope-level failure: no single element is at fault when
                // nothing satisfies the predicate.
                RuleReport::failed(rule.name(), rule.enforcement(), Vec::new()).with_note(format!(
                    "expected at least one of {} elements to satisfy the predicate, none did",
                    verdicts.len()
                ))
            }
        }

        Quantifier::Exactly(expected) => {
            if satisfied == expected {
                RuleReport::passed(rule.name(), rule.enforcement())
            } else {
                RuleReport::failed(rule.name(), rule.enforcement(), Vec::new()).with_note(format!(
                    "expected exactly {expected} satisfying elements, found {satisfied} of {}",
                    verdicts.len()
                ))
            }
        }
    };
    note_exempted(entry, exempted)
}

fn note_exempted(entry: RuleReport, exempted: usize) -> RuleReport {
    if exempted == 0 {
        entry
    } else {
        entry.with_note(format!("{exempted} exempted elements not considered"))
    }
}

/// Builds per-element violations for the elements selected by `offending`.
fn violations_for(
    rule: &Rule,
    verdicts: &[(Element<'_>, Verdict)],
    offending: impl Fn(&Verdict) -> bool,
) -> Vec<Violation> {
    verdicts
        .iter()
        .filter(|(_, verdict)| offending(verdict))
        .map(|(element, verdict)| {
            let location = Location::new(element.unit_path().as_str(), element.line());
            let violation = Violation::new(rule.name(), element.id(), location, rule.message());
            match verdict.detail() {
                Some(detail) => violation.with_detail(detail),
                None => violation,
            }
        })
        .collect()
}

/// Builder for [`Engine`].
#[derive(Debug, Default)]
pub struct EngineBuilder {
    rules: Vec<Rule>,
}

impl EngineBuilder {
    /// Adds one rule.
    #[must_use]
    pub fn rule(mut self, rule: Rule) -> Self {
        self.rules.push(rule);
        self
    }

    /// Adds a batch of rules, preserving order.
    #[must_use]
    pub fn rules(mut self, rules: impl IntoIterator<Item = Rule>) -> Self {
        self.rules.extend(rules);
        self
    }

    /// Finalizes the engine.
    #[must_use]
    pub fn build(self) -> Engine {
        Engine { rules: self.rules }
    }
}
