//! Check outcomes, violations, and report rendering.
//!
//! Reports are deterministic: entries appear in rule declaration order,
//! violations in model traversal order, and [`Report::format`] renders the
//! same bytes for the same inputs.

use crate::model::ElementId;
use crate::rule::Enforcement;
use std::fmt;

/// A source location attached to a violation.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Location {
    /// Normalized unit path.
    pub path: String,
    /// 1-based line, when the model recorded one.
    pub line: Option<usize>,
}

impl Location {
    /// Creates a location.
    #[must_use]
    pub fn new(path: impl Into<String>, line: Option<usize>) -> Self {
        Self {
            path: path.into(),
            line,
        }
    }
}

impl fmt::Display for Location {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.line {
            Some(line) => write!(f, "{}:{line}", self.path),
            None => write!(f, "{}", self.path),
        }
    }
}

/// One element failing one rule.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("[{rule}] {location}: {element}: {message}")]
pub struct Violation {
    /// Name of the violated rule.
    pub rule: String,
    /// Identity of the offending element.
    pub element: ElementId,
    /// Where the element lives.
    pub location: Location,
    /// The rule's failure message.
    pub message: String,
    /// Optional evaluation detail, e.g. the matched fragment.
    pub detail: Option<String>,
}

impl Violation {
    /// Creates a violation without detail.
    #[must_use]
    pub fn new(
        rule: impl Into<String>,
        element: ElementId,
        location: Location,
        message: impl Into<String>,
    ) -> Self {
        Self {
            rule: rule.into(),
            element,
            location,
            message: message.into(),
            detail: None,
        }
    }

    /// Attaches an evaluation detail.
    #[must_use]
    pub fn with_detail(mut self, detail: impl Into<String>) -> Self {
        self.detail = Some(detail.into());
        self
    }
}

impl miette::Diagnostic for Violation {
    fn code<'a>(&'a self) -> Option<Box<dyn fmt::Display + 'a>> {
        Some(Box::new(&self.rule))
    }

    fn help<'a>(&'a self) -> Option<Box<dyn fmt::Display + 'a>> {
        self.detail
            .as_ref()
            .map(|d| Box::new(d) as Box<dyn fmt::Display + 'a>)
    }
}

/// Outcome of checking one rule.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Outcome {
    /// The quantified assertion held.
    Passed,
    /// The quantified assertion did not hold.
    Failed,
    /// The rule was not applicable, e.g. an empty scope with
    /// require-non-empty.
    Skipped,
    /// The rule is disabled and was not evaluated.
    Disabled,
    /// Evaluation hit a model inconsistency.
    ModelError,
}

impl fmt::Display for Outcome {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            Self::Passed => "passed",
            Self::Failed => "failed",
            Self::Skipped => "skipped",
            Self::Disabled => "disabled",
            Self::ModelError => "model-error",
        };
        write!(f, "{s}")
    }
}

/// Per-rule section of a report.
#[derive(Debug, Clone)]
pub struct RuleReport {
    rule: String,
    enforcement: Enforcement,
    outcome: Outcome,
    violations: Vec<Violation>,
    notes: Vec<String>,
}

impl RuleReport {
    /// A passed rule.
    #[must_use]
    pub fn passed(rule: impl Into<String>, enforcement: Enforcement) -> Self {
        Self {
            rule: rule.into(),
            enforcement,
            outcome: Outcome::Passed,
            violations: Vec::new(),
            notes: Vec::new(),
        }
    }

    /// A failed rule with its violations.
    #[must_use]
    pub fn failed(
        rule: impl Into<String>,
        enforcement: Enforcement,
        violations: Vec<Violation>,
    ) -> Self {
        Self {
            rule: rule.into(),
            enforcement,
            outcome: Outcome::Failed,
            violations,
            notes: Vec::new(),
        }
    }

    /// A skipped rule, with the reason as a note.
    #[must_use]
    pub fn skipped(
        rule: impl Into<String>,
        enforcement: Enforcement,
        reason: impl Into<String>,
    ) -> Self {
        Self {
            rule: rule.into(),
            enforcement,
            outcome: Outcome::Skipped,
            violations: Vec::new(),
            notes: vec![reason.into()],
        }
    }

    /// A disabled rule.
    #[must_use]
    pub fn disabled(rule: impl Into<String>) -> Self {
        Self {
            rule: rule.into(),
            enforcement: Enforcement::Disabled,
            outcome: Outcome::Disabled,
            violations: Vec::new(),
            notes: Vec::new(),
        }
    }

    /// A rule whose evaluation hit a model inconsistency.
    #[must_use]
    pub fn model_error(
        rule: impl Into<String>,
        enforcement: Enforcement,
        reason: impl Into<String>,
    ) -> Self {
        Self {
            rule: rule.into(),
            enforcement,
            outcome: Outcome::ModelError,
            violations: Vec::new(),
            notes: vec![reason.into()],
        }
    }

    /// Appends an explanatory note.
    #[must_use]
    pub fn with_note(mut self, note: impl Into<String>) -> Self {
        self.notes.push(note.into());
        self
    }

    /// Returns the rule name.
    #[must_use]
    pub fn rule(&self) -> &str {
        &self.rule
    }

    /// Returns the enforcement mode the rule ran under.
    #[must_use]
    pub fn enforcement(&self) -> Enforcement {
        self.enforcement
    }

    /// Returns the outcome.
    #[must_use]
    pub fn outcome(&self) -> Outcome {
        self.outcome
    }

    /// Returns the violations, in model order.
    #[must_use]
    pub fn violations(&self) -> &[Violation] {
        &self.violations
    }

    /// Returns the explanatory notes.
    #[must_use]
    pub fn notes(&self) -> &[String] {
        &self.notes
    }

    /// True when this entry fails the run: a failed or errored rule under
    /// enforced mode.
    #[must_use]
    pub fn is_hard_failure(&self) -> bool {
        matches!(self.outcome, Outcome::Failed | Outcome::ModelError)
            && self.enforcement == Enforcement::Enforced
    }
}

/// The aggregated result of one engine run.
#[derive(Debug, Clone, Default)]
pub struct Report {
    entries: Vec<RuleReport>,
}

impl Report {
    /// Creates a report from per-rule entries, preserving their order.
    #[must_use]
    pub fn new(entries: Vec<RuleReport>) -> Self {
        Self { entries }
    }

    /// Returns all entries in rule declaration order.
    #[must_use]
    pub fn entries(&self) -> &[RuleReport] {
        &self.entries
    }

    /// Looks up an entry by rule name.
    #[must_use]
    pub fn entry(&self, rule: &str) -> Option<&RuleReport> {
        self.entries.iter().find(|e| e.rule() == rule)
    }

    /// True when any enforced rule failed or hit a model error.
    #[must_use]
    pub fn has_failures(&self) -> bool {
        self.entries.iter().any(RuleReport::is_hard_failure)
    }

    /// Number of informational rules that did not pass.
    #[must_use]
    pub fn warning_count(&self) -> usize {
        self.entries
            .iter()
            .filter(|e| {
                e.enforcement() == Enforcement::Informational
                    && matches!(e.outcome(), Outcome::Failed | Outcome::ModelError)
            })
            .count()
    }

    /// Total number of violations across all entries.
    #[must_use]
    pub fn violation_count(&self) -> usize {
        self.entries.iter().map(|e| e.violations().len()).sum()
    }

    /// Process exit code: 0 on success, 1 when enforced rules failed.
    #[must_use]
    pub fn exit_code(&self) -> i32 {
        i32::from(self.has_failures())
    }

    /// Renders the report as text.
    ///
    /// Byte-identical output for identical inputs.
    #[must_use]
    pub fn format(&self) -> String {
        use std::fmt::Write as _;

        let mut out = String::new();
        for entry in &self.entries {
            let suffix = match entry.enforcement() {
                Enforcement::Informational => " (informational)",
                Enforcement::Enforced | Enforcement::Disabled => "",
            };
            let _ = writeln!(out, "[{}] {}{suffix}", entry.outcome(), entry.rule());
            for violation in entry.violations() {
                let _ = writeln!(
                    out,
                    "  {}: {}: {}",
                    violation.location, violation.element, violation.message
                );
                if let Some(detail) = &violation.detail {
                    let _ = writeln!(out, "    = because: {detail}");
                }
            }
            for note in entry.notes() {
                let _ = writeln!(out, "  = note: {note}");
            }
        }

        let checked = self
            .entries
            .iter()
            .filter(|e| e.outcome() != Outcome::Disabled)
            .count();
        let failed = self.entries.iter().filter(|e| e.is_hard_failure()).count();
        let _ = writeln!(
            out,
            "{} checked, {failed} failed, {}, {}",
            counted(checked, "rule"),
            counted(self.violation_count(), "violation"),
            counted(self.warning_count(), "warning")
        );
        out
    }
}

fn counted(count: usize, noun: &str) -> String {
    if count == 1 {
        format!("{count} {noun}")
    } else {
        format!("{count} {noun}s")
    }
}

impl fmt::Display for Report {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.format())
    }
}
