//! Facade-level checks: the runner evaluating a TOML document end to end.

use conform::runner::{run_check, run_rules};
use conform::{DeclKind, Declaration, Outcome, SourceModel, SourceUnit, UnitPath};

fn path(s: &str) -> UnitPath {
    UnitPath::new(s).unwrap()
}

fn model() -> SourceModel {
    let ports = path("src/main/domain/Ports.kt");
    SourceModel::builder()
        .unit(
            SourceUnit::builder(ports.clone())
                .text("package com.acme.domain\n\ninterface FooPort\nfun helper() {}\n")
                .declaration(
                    Declaration::builder("FooPort", DeclKind::Interface, ports.clone())
                        .package("com.acme.domain")
                        .line(3)
                        .build()
                        .unwrap(),
                )
                .declaration(
                    Declaration::builder("helper", DeclKind::Function, ports.clone())
                        .package("com.acme.domain")
                        .line(4)
                        .build()
                        .unwrap(),
                )
                .build(),
        )
        .build()
        .unwrap()
}

const FAILING_RULES: &str = r#"
[[rules]]
name = "port-naming"
message = "declarations in the ports file must be named like ports"

[rules.scope]
target = "declarations"
path-ends-with = ["Ports.kt"]

[rules.predicate]
name-matches = "Port$"
"#;

const PASSING_RULES: &str = r#"
[[rules]]
name = "port-naming"
message = "interfaces in the ports file must be named like ports"

[rules.scope]
target = "declarations"
kind = "interface"

[rules.predicate]
name-matches = "Port$"
"#;

#[test]
fn run_rules_returns_the_report() {
    let report = run_rules(&model(), FAILING_RULES).unwrap();
    let entry = report.entry("port-naming").unwrap();
    assert_eq!(entry.outcome(), Outcome::Failed);
    assert_eq!(entry.violations().len(), 1);
}

#[test]
fn run_rules_surfaces_load_errors() {
    assert!(run_rules(&model(), "[[rules]]\nname = \"broken\"").is_err());
}

#[test]
fn run_check_passes_silently() {
    run_check(&model(), PASSING_RULES);
}

#[test]
#[should_panic(expected = "port-naming")]
fn run_check_panics_with_the_report() {
    run_check(&model(), FAILING_RULES);
}

#[test]
fn informational_findings_pass_by_default() {
    let document = r#"
    [[rules]]
    name = "docs-suggested"
    mode = "informational"
    message = "declarations should be documented"
    [rules.scope]
    target = "declarations"
    [rules.predicate]
    has-docs = true
    "#;
    run_check(&model(), document);
}

#[test]
#[should_panic(expected = "docs-suggested")]
fn fail_on_warnings_escalates_informational_findings() {
    let document = r#"
    fail-on = "warnings"

    [[rules]]
    name = "docs-suggested"
    mode = "informational"
    message = "declarations should be documented"
    [rules.scope]
    target = "declarations"
    [rules.predicate]
    has-docs = true
    "#;
    run_check(&model(), document);
}
