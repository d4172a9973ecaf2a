//! Scope selection: turning a model plus a selection spec into an ordered,
//! deduplicated working set of units or declarations.
//!
//! Selection is pure: the same model and spec always produce the same scope,
//! in the same order, so reports are deterministic and scopes are cacheable.

use crate::model::{DeclKind, Declaration, ElementId, SourceModel, SourceUnit, UnitPath};
use crate::pattern::{NamePattern, PathPattern};
use std::collections::HashSet;

/// What a scope selects from the model.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ScopeTarget {
    /// Whole source units.
    Units,
    /// Declarations, including nested members.
    Declarations,
}

/// One element of a scope, borrowing the model it was selected from.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum Element<'m> {
    /// A source unit.
    Unit(&'m SourceUnit),
    /// A declaration.
    Decl(&'m Declaration),
}

impl Element<'_> {
    /// Returns the identity of this element.
    #[must_use]
    pub fn id(&self) -> ElementId {
        match self {
            Self::Unit(unit) => unit.id(),
            Self::Decl(decl) => decl.id(),
        }
    }

    /// Returns the unit path the element lives in.
    #[must_use]
    pub fn unit_path(&self) -> &UnitPath {
        match self {
            Self::Unit(unit) => unit.path(),
            Self::Decl(decl) => decl.unit(),
        }
    }

    /// Returns the 1-indexed line of the element, if known.
    #[must_use]
    pub fn line(&self) -> Option<usize> {
        match self {
            Self::Unit(_) => None,
            Self::Decl(decl) => decl.line(),
        }
    }
}

/// An ordered, deduplicated sequence of selected elements.
///
/// Insertion order follows model order (units as registered, declarations in
/// unit order, members depth-first), so violation lists are stable.
#[derive(Debug, Clone)]
pub struct Scope<'m> {
    elements: Vec<Element<'m>>,
}

impl<'m> Scope<'m> {
    /// Returns the selected elements in order.
    #[must_use]
    pub fn elements(&self) -> &[Element<'m>] {
        &self.elements
    }

    /// Returns the number of elements.
    #[must_use]
    pub fn len(&self) -> usize {
        self.elements.len()
    }

    /// Returns true if nothing was selected. An empty scope is not an error;
    /// quantifier policy decides what it means for a rule.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.elements.is_empty()
    }

    /// Iterates over the elements.
    pub fn iter(&self) -> impl Iterator<Item = Element<'m>> + '_ {
        self.elements.iter().copied()
    }
}

/// Selection specification for a scope.
///
/// Filtering is conjunctive across filter categories: an element is included
/// only when it matches every configured positive filter and no exclude.
/// Within one category (e.g. several `path_contains` fragments), any match
/// suffices.
#[derive(Debug, Clone)]
pub struct ScopeSpec {
    target: ScopeTarget,
    kind: Option<DeclKind>,
    path_contains: Vec<String>,
    path_ends_with: Vec<String>,
    under: Option<String>,
    path_globs: Vec<PathPattern>,
    name_matches: Option<NamePattern>,
    exclude_path_contains: Vec<String>,
    exclude_tests: bool,
}

impl ScopeSpec {
    /// Starts a spec selecting whole source units.
    #[must_use]
    pub fn units() -> ScopeSpecBuilder {
        ScopeSpecBuilder::new(ScopeTarget::Units)
    }

    /// Starts a spec selecting declarations.
    #[must_use]
    pub fn declarations() -> ScopeSpecBuilder {
        ScopeSpecBuilder::new(ScopeTarget::Declarations)
    }

    /// Returns the selection target.
    #[must_use]
    pub fn target(&self) -> ScopeTarget {
        self.target
    }

    /// Selects the scope from a model.
    ///
    /// Pure and order-stable: iterates units in model order and declarations
    /// in unit order, deduplicating by element identity.
    #[must_use]
    pub fn select<'m>(&self, model: &'m SourceModel) -> Scope<'m> {
        let mut seen: HashSet<ElementId> = HashSet::new();
        let mut elements = Vec::new();

        for unit in model.units() {
            if !self.path_matches(unit.path()) {
                continue;
            }
            match self.target {
                ScopeTarget::Units => {
                    if seen.insert(unit.id()) {
                        elements.push(Element::Unit(unit));
                    }
                }
                ScopeTarget::Declarations => {
                    let mut decls = Vec::new();
                    collect_declarations(unit.declarations(), &mut decls);
                    for decl in decls {
                        if !self.declaration_matches(decl) {
                            continue;
                        }
                        if seen.insert(decl.id()) {
                            elements.push(Element::Decl(decl));
                        }
                    }
                }
            }
        }

        Scope { elements }
    }

    fn path_matches(&self, path: &UnitPath) -> bool {
        let s = path.as_str();

        if !self.path_contains.is_empty() && !self.path_contains.iter().any(|f| s.contains(f)) {
            return false;
        }
        if !self.path_ends_with.is_empty()
            && !self.path_ends_with.iter().any(|f| s.ends_with(f.as_str()))
        {
            return false;
        }
        if let Some(root) = &self.under {
            if !path.under(root) {
                return false;
            }
        }
        if !self.path_globs.is_empty() && !self.path_globs.iter().any(|g| g.matches(s)) {
            return false;
        }
        if self.exclude_path_contains.iter().any(|f| s.contains(f)) {
            return false;
        }
        if self.exclude_tests && path.is_test_path() {
            return false;
        }
        true
    }

    fn declaration_matches(&self, decl: &Declaration) -> bool {
        if let Some(kind) = self.kind {
            if decl.kind() != kind {
                return false;
            }
        }
        if let Some(pattern) = &self.name_matches {
            if !pattern.is_match(decl.name()) {
                return false;
            }
        }
        true
    }
}

fn collect_declarations<'m>(decls: &'m [Declaration], out: &mut Vec<&'m Declaration>) {
    for decl in decls {
        out.push(decl);
        collect_declarations(decl.members(), out);
    }
}

/// Builder for [`ScopeSpec`].
#[derive(Debug, Clone)]
pub struct ScopeSpecBuilder {
    spec: ScopeSpec,
}

impl ScopeSpecBuilder {
    fn new(target: ScopeTarget) -> Self {
        Self {
            spec: ScopeSpec {
                target,
                kind: None,
                path_contains: Vec::new(),
                path_ends_with: Vec::new(),
                under: None,
                path_globs: Vec::new(),
                name_matches: None,
                exclude_path_contains: Vec::new(),
                exclude_tests: false,
            },
        }
    }

    /// Restricts declarations to a single kind.
    #[must_use]
    pub fn kind(mut self, kind: DeclKind) -> Self {
        self.spec.kind = Some(kind);
        self
    }

    /// Adds a path-contains fragment.
    #[must_use]
    pub fn path_contains(mut self, fragment: impl Into<String>) -> Self {
        self.spec.path_contains.push(fragment.into());
        self
    }

    /// Adds a path-ends-with suffix.
    #[must_use]
    pub fn path_ends_with(mut self, suffix: impl Into<String>) -> Self {
        self.spec.path_ends_with.push(suffix.into());
        self
    }

    /// Restricts selection to paths under a directory root.
    #[must_use]
    pub fn under(mut self, root: impl Into<String>) -> Self {
        self.spec.under = Some(root.into());
        self
    }

    /// Adds a path glob pattern.
    #[must_use]
    pub fn path_glob(mut self, pattern: PathPattern) -> Self {
        self.spec.path_globs.push(pattern);
        self
    }

    /// Restricts declarations to names matching a pattern.
    #[must_use]
    pub fn name_matches(mut self, pattern: NamePattern) -> Self {
        self.spec.name_matches = Some(pattern);
        self
    }

    /// Adds an exclude fragment; matching paths are dropped.
    #[must_use]
    pub fn exclude_path_contains(mut self, fragment: impl Into<String>) -> Self {
        self.spec.exclude_path_contains.push(fragment.into());
        self
    }

    /// Drops test-path units from the selection.
    #[must_use]
    pub fn exclude_tests(mut self) -> Self {
        self.spec.exclude_tests = true;
        self
    }

    /// Builds the spec.
    #[must_use]
    pub fn build(self) -> ScopeSpec {
        self.spec
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::{DeclKind, Declaration, SourceUnit, UnitPath};

    fn path(s: &str) -> UnitPath {
        UnitPath::new(s).unwrap()
    }

    fn decl(name: &str, kind: DeclKind, unit: &str) -> Declaration {
        Declaration::builder(name, kind, path(unit)).build().unwrap()
    }

    fn sample_model() -> SourceModel {
        SourceModel::builder()
            .unit(
                SourceUnit::builder(path("src/main/domain/Ports.kt"))
                    .declaration(decl("FooPort", DeclKind::Interface, "src/main/domain/Ports.kt"))
                    .declaration(decl("BarPort", DeclKind::Interface, "src/main/domain/Ports.kt"))
                    .build(),
            )
            .unit(
                SourceUnit::builder(path("src/main/app/Helpers.kt"))
                    .declaration(decl("bazHelper", DeclKind::Function, "src/main/app/Helpers.kt"))
                    .build(),
            )
            .unit(
                SourceUnit::builder(path("src/test/domain/PortsTest.kt"))
                    .declaration(decl("FooPortTest", DeclKind::Class, "src/test/domain/PortsTest.kt"))
                    .build(),
            )
            .build()
            .unwrap()
    }

    fn ids(scope: &Scope<'_>) -> Vec<String> {
        scope.iter().map(|e| e.id().to_string()).collect()
    }

    #[test]
    fn selects_units_by_path_contains() {
        let model = sample_model();
        let spec = ScopeSpec::units().path_contains("domain").build();
        let scope = spec.select(&model);
        assert_eq!(
            ids(&scope),
            vec!["src/main/domain/Ports.kt", "src/test/domain/PortsTest.kt"]
        );
    }

    #[test]
    fn exclude_tests_drops_test_paths() {
        let model = sample_model();
        let spec = ScopeSpec::units()
            .path_contains("domain")
            .exclude_tests()
            .build();
        let scope = spec.select(&model);
        assert_eq!(ids(&scope), vec!["src/main/domain/Ports.kt"]);
    }

    #[test]
    fn filters_are_conjunctive() {
        let model = sample_model();
        // "domain" matches two units, but "under src/main" drops the test one
        let spec = ScopeSpec::units()
            .path_contains("domain")
            .under("src/main")
            .build();
        let scope = spec.select(&model);
        assert_eq!(ids(&scope), vec!["src/main/domain/Ports.kt"]);
    }

    #[test]
    fn selects_declarations_with_kind_filter() {
        let model = sample_model();
        let spec = ScopeSpec::declarations()
            .kind(DeclKind::Interface)
            .build();
        let scope = spec.select(&model);
        assert_eq!(scope.len(), 2);
        assert!(ids(&scope)[0].starts_with("FooPort"));
    }

    #[test]
    fn selects_declarations_with_name_filter() {
        let model = sample_model();
        let spec = ScopeSpec::declarations()
            .name_matches(NamePattern::new("Helper$").unwrap())
            .build();
        let scope = spec.select(&model);
        assert_eq!(scope.len(), 1);
        assert_eq!(ids(&scope), vec!["bazHelper (src/main/app/Helpers.kt)"]);
    }

    #[test]
    fn includes_nested_members() {
        let inner = decl("validate", DeclKind::Function, "src/main/A.kt");
        let outer = Declaration::builder("OrderService", DeclKind::Class, path("src/main/A.kt"))
            .member(inner)
            .build()
            .unwrap();
        let model = SourceModel::builder()
            .unit(
                SourceUnit::builder(path("src/main/A.kt"))
                    .declaration(outer)
                    .build(),
            )
            .build()
            .unwrap();

        let spec = ScopeSpec::declarations().build();
        let scope = spec.select(&model);
        assert_eq!(scope.len(), 2);

        let spec = ScopeSpec::declarations().kind(DeclKind::Function).build();
        assert_eq!(spec.select(&model).len(), 1);
    }

    #[test]
    fn deduplicates_by_identity() {
        // Same declaration appearing twice in a unit collapses to one element
        let d = decl("FooPort", DeclKind::Interface, "src/main/A.kt");
        let model = SourceModel::builder()
            .unit(
                SourceUnit::builder(path("src/main/A.kt"))
                    .declaration(d.clone())
                    .declaration(d)
                    .build(),
            )
            .build()
            .unwrap();
        let scope = ScopeSpec::declarations().build().select(&model);
        assert_eq!(scope.len(), 1);
    }

    #[test]
    fn empty_selection_is_not_an_error() {
        let model = sample_model();
        let spec = ScopeSpec::units().path_contains("nonexistent").build();
        let scope = spec.select(&model);
        assert!(scope.is_empty());
    }

    #[test]
    fn selection_is_stable_across_runs() {
        let model = sample_model();
        let spec = ScopeSpec::declarations().build();
        assert_eq!(ids(&spec.select(&model)), ids(&spec.select(&model)));
    }

    #[test]
    fn path_glob_and_ends_with() {
        let model = sample_model();
        let spec = ScopeSpec::units()
            .path_glob(PathPattern::new("src/main/**").unwrap())
            .path_ends_with(".kt")
            .build();
        let scope = spec.select(&model);
        assert_eq!(
            ids(&scope),
            vec!["src/main/domain/Ports.kt", "src/main/app/Helpers.kt"]
        );
    }
}
