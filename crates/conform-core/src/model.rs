//! Codebase model consumed by the conformance engine.
//!
//! The model is an immutable snapshot produced by an external ingestion
//! provider. The engine never parses source text into syntax trees; it only
//! reads the records defined here (and scans raw text with patterns).
//!
//! Structural properties are explicit capability flags resolved once at
//! model construction ([`Modifier`], [`Role`]), never derived by runtime
//! introspection during rule evaluation.

use std::collections::HashMap;
use std::fmt;

/// Errors in model construction.
#[derive(Debug, Clone, thiserror::Error)]
pub enum ModelError {
    /// Unit path is empty.
    #[error("unit path must not be empty")]
    EmptyUnitPath,

    /// Declaration name is empty.
    #[error("declaration name must not be empty")]
    EmptyDeclarationName,

    /// Two units share the same normalized path.
    #[error("duplicate unit path `{path}`")]
    DuplicateUnit {
        /// The conflicting path.
        path: String,
    },
}

// ────────────────────────────────────────────
// Paths and identities
// ────────────────────────────────────────────

/// A normalized source-unit path.
///
/// Separators are unified to `/` and a leading `./` is stripped, so rules
/// written against the path are portable across environments.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct UnitPath(String);

impl UnitPath {
    /// Creates a normalized unit path.
    ///
    /// # Errors
    ///
    /// Returns an error if the path is empty.
    pub fn new(path: &str) -> Result<Self, ModelError> {
        if path.is_empty() {
            return Err(ModelError::EmptyUnitPath);
        }
        let mut normalized = path.replace('\\', "/");
        while let Some(rest) = normalized.strip_prefix("./") {
            normalized = rest.to_string();
        }
        if normalized.is_empty() {
            return Err(ModelError::EmptyUnitPath);
        }
        Ok(Self(normalized))
    }

    /// Returns the normalized path as a string slice.
    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// Returns the final path component.
    #[must_use]
    pub fn file_name(&self) -> &str {
        self.0.rsplit('/').next().unwrap_or(&self.0)
    }

    /// Tests whether the path starts with the given directory root.
    ///
    /// Matching is component-aligned: `src/main` covers `src/main/Foo.kt`
    /// but not `src/mainline/Foo.kt`.
    #[must_use]
    pub fn under(&self, root: &str) -> bool {
        let root = root.replace('\\', "/");
        let root = root.trim_end_matches('/');
        if root.is_empty() {
            return true;
        }
        self.0 == root
            || (self.0.starts_with(root)
                && self.0.as_bytes().get(root.len()).is_some_and(|&b| b == b'/'))
    }

    /// Tests whether this path looks like a test source path.
    ///
    /// A path is a test path when any component is `test` or `tests`, or the
    /// file stem follows a test naming convention (`FooTest`, `foo_test`,
    /// `test_foo`).
    #[must_use]
    pub fn is_test_path(&self) -> bool {
        if self.0.split('/').any(|c| c == "test" || c == "tests") {
            return true;
        }
        let stem = self
            .file_name()
            .split('.')
            .next()
            .unwrap_or_default();
        stem.ends_with("Test")
            || stem.ends_with("Tests")
            || stem.ends_with("_test")
            || stem.starts_with("test_")
    }
}

impl fmt::Display for UnitPath {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Qualified identity of a model element.
///
/// Used by exemption allow-lists and by violations, which must reference an
/// element without holding onto the model.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum ElementId {
    /// A source unit, identified by its normalized path.
    Unit(UnitPath),
    /// A declaration, identified by owning unit and qualified name.
    Decl {
        /// Path of the owning unit.
        unit: UnitPath,
        /// Package-qualified declaration name (e.g. `com.acme.FooPort`).
        qualified_name: String,
    },
}

impl ElementId {
    /// Returns the unit path this identity belongs to.
    #[must_use]
    pub fn path(&self) -> &UnitPath {
        match self {
            Self::Unit(path) | Self::Decl { unit: path, .. } => path,
        }
    }

    /// Returns the qualified declaration name, if this is a declaration.
    #[must_use]
    pub fn qualified_name(&self) -> Option<&str> {
        match self {
            Self::Unit(_) => None,
            Self::Decl { qualified_name, .. } => Some(qualified_name),
        }
    }
}

impl fmt::Display for ElementId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Unit(path) => write!(f, "{path}"),
            Self::Decl {
                unit,
                qualified_name,
            } => write!(f, "{qualified_name} ({unit})"),
        }
    }
}

// ────────────────────────────────────────────
// Declaration attributes
// ────────────────────────────────────────────

/// Kind of a declaration.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum DeclKind {
    /// A class declaration.
    Class,
    /// An interface declaration.
    Interface,
    /// A free or member function.
    Function,
    /// A property declaration.
    Property,
    /// An object (singleton) declaration.
    Object,
}

impl fmt::Display for DeclKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            Self::Class => "class",
            Self::Interface => "interface",
            Self::Function => "function",
            Self::Property => "property",
            Self::Object => "object",
        };
        write!(f, "{s}")
    }
}

/// Structural modifier flags attached to a declaration at model construction.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Modifier {
    /// Sealed type hierarchy.
    Sealed,
    /// Abstract declaration.
    Abstract,
    /// Data-like / immutable value declaration.
    Immutable,
    /// Open for extension.
    Open,
    /// Public visibility.
    Public,
    /// Module-internal visibility.
    Internal,
    /// Protected visibility.
    Protected,
    /// Private visibility.
    Private,
}

impl fmt::Display for Modifier {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            Self::Sealed => "sealed",
            Self::Abstract => "abstract",
            Self::Immutable => "immutable",
            Self::Open => "open",
            Self::Public => "public",
            Self::Internal => "internal",
            Self::Protected => "protected",
            Self::Private => "private",
        };
        write!(f, "{s}")
    }
}

/// Architectural role tag, resolved once by naming or annotation convention.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Role {
    /// Inbound or outbound port.
    Port,
    /// Adapter implementing a port.
    Adapter,
    /// Request or event handler.
    Handler,
    /// Application service.
    Service,
    /// Persistence repository.
    Repository,
}

impl Role {
    /// Resolves a role from a declaration's simple name by suffix convention.
    #[must_use]
    pub fn from_name(name: &str) -> Option<Self> {
        if name.ends_with("Port") {
            Some(Self::Port)
        } else if name.ends_with("Adapter") {
            Some(Self::Adapter)
        } else if name.ends_with("Handler") {
            Some(Self::Handler)
        } else if name.ends_with("Service") {
            Some(Self::Service)
        } else if name.ends_with("Repository") {
            Some(Self::Repository)
        } else {
            None
        }
    }
}

impl fmt::Display for Role {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            Self::Port => "port",
            Self::Adapter => "adapter",
            Self::Handler => "handler",
            Self::Service => "service",
            Self::Repository => "repository",
        };
        write!(f, "{s}")
    }
}

/// An annotation attached to a declaration.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Annotation {
    /// Annotation name without decoration (e.g. `Deprecated`).
    pub name: String,
    /// Raw argument fragments, in declaration order.
    pub arguments: Vec<String>,
}

impl Annotation {
    /// Creates an annotation without arguments.
    #[must_use]
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            arguments: Vec::new(),
        }
    }

    /// Adds an argument fragment.
    #[must_use]
    pub fn with_argument(mut self, argument: impl Into<String>) -> Self {
        self.arguments.push(argument.into());
        self
    }
}

/// A fully qualified name imported by a source unit. Pure data.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct Import(String);

impl Import {
    /// Creates an import reference.
    #[must_use]
    pub fn new(name: impl Into<String>) -> Self {
        Self(name.into())
    }

    /// Returns the imported name.
    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for Import {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

// ────────────────────────────────────────────
// Declarations
// ────────────────────────────────────────────

/// A declaration within a source unit.
///
/// Holds a back-reference to its owning unit by path; resolution against the
/// model happens at evaluation time, so a dangling back-reference surfaces as
/// a model error for the affected rule rather than a crash.
#[derive(Debug, Clone, PartialEq)]
pub struct Declaration {
    name: String,
    kind: DeclKind,
    package: String,
    modifiers: Vec<Modifier>,
    annotations: Vec<Annotation>,
    has_docs: bool,
    return_type: Option<String>,
    role: Option<Role>,
    unit: UnitPath,
    line: Option<usize>,
    body_span: Option<(usize, usize)>,
    members: Vec<Declaration>,
}

impl Declaration {
    /// Creates a builder for a declaration.
    #[must_use]
    pub fn builder(name: impl Into<String>, kind: DeclKind, unit: UnitPath) -> DeclarationBuilder {
        DeclarationBuilder::new(name, kind, unit)
    }

    /// Returns the simple name.
    #[must_use]
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Returns the declaration kind.
    #[must_use]
    pub fn kind(&self) -> DeclKind {
        self.kind
    }

    /// Returns the enclosing package path (may be empty).
    #[must_use]
    pub fn package(&self) -> &str {
        &self.package
    }

    /// Returns the structural modifiers.
    #[must_use]
    pub fn modifiers(&self) -> &[Modifier] {
        &self.modifiers
    }

    /// Tests whether the declaration carries a modifier.
    #[must_use]
    pub fn has_modifier(&self, modifier: Modifier) -> bool {
        self.modifiers.contains(&modifier)
    }

    /// Returns the annotations.
    #[must_use]
    pub fn annotations(&self) -> &[Annotation] {
        &self.annotations
    }

    /// Tests whether an annotation with the given name is present.
    #[must_use]
    pub fn has_annotation(&self, name: &str) -> bool {
        self.annotations.iter().any(|a| a.name == name)
    }

    /// Returns true if the declaration has documentation.
    #[must_use]
    pub fn has_docs(&self) -> bool {
        self.has_docs
    }

    /// Returns the declared return-type name, if any.
    #[must_use]
    pub fn return_type(&self) -> Option<&str> {
        self.return_type.as_deref()
    }

    /// Returns the architectural role tag, if resolved.
    #[must_use]
    pub fn role(&self) -> Option<Role> {
        self.role
    }

    /// Returns the owning unit path (back-reference, not ownership).
    #[must_use]
    pub fn unit(&self) -> &UnitPath {
        &self.unit
    }

    /// Returns the 1-indexed declaration line, if known.
    #[must_use]
    pub fn line(&self) -> Option<usize> {
        self.line
    }

    /// Returns the byte range of the declaration body in the unit text.
    #[must_use]
    pub fn body_span(&self) -> Option<(usize, usize)> {
        self.body_span
    }

    /// Returns nested member declarations.
    #[must_use]
    pub fn members(&self) -> &[Declaration] {
        &self.members
    }

    /// Returns the package-qualified name.
    #[must_use]
    pub fn qualified_name(&self) -> String {
        if self.package.is_empty() {
            self.name.clone()
        } else {
            format!("{}.{}", self.package, self.name)
        }
    }

    /// Returns the identity of this declaration.
    #[must_use]
    pub fn id(&self) -> ElementId {
        ElementId::Decl {
            unit: self.unit.clone(),
            qualified_name: self.qualified_name(),
        }
    }
}

/// Builder for [`Declaration`].
#[derive(Debug, Clone)]
pub struct DeclarationBuilder {
    name: String,
    kind: DeclKind,
    unit: UnitPath,
    package: String,
    modifiers: Vec<Modifier>,
    annotations: Vec<Annotation>,
    has_docs: bool,
    return_type: Option<String>,
    role: Option<Role>,
    line: Option<usize>,
    body_span: Option<(usize, usize)>,
    members: Vec<Declaration>,
}

impl DeclarationBuilder {
    /// Creates a new builder.
    #[must_use]
    pub fn new(name: impl Into<String>, kind: DeclKind, unit: UnitPath) -> Self {
        Self {
            name: name.into(),
            kind,
            unit,
            package: String::new(),
            modifiers: Vec::new(),
            annotations: Vec::new(),
            has_docs: false,
            return_type: None,
            role: None,
            line: None,
            body_span: None,
            members: Vec::new(),
        }
    }

    /// Sets the enclosing package path.
    #[must_use]
    pub fn package(mut self, package: impl Into<String>) -> Self {
        self.package = package.into();
        self
    }

    /// Adds a structural modifier.
    #[must_use]
    pub fn modifier(mut self, modifier: Modifier) -> Self {
        if !self.modifiers.contains(&modifier) {
            self.modifiers.push(modifier);
        }
        self
    }

    /// Adds an annotation.
    #[must_use]
    pub fn annotation(mut self, annotation: Annotation) -> Self {
        self.annotations.push(annotation);
        self
    }

    /// Marks the declaration as documented.
    #[must_use]
    pub fn documented(mut self) -> Self {
        self.has_docs = true;
        self
    }

    /// Sets the declared return-type name.
    #[must_use]
    pub fn return_type(mut self, name: impl Into<String>) -> Self {
        self.return_type = Some(name.into());
        self
    }

    /// Sets the architectural role explicitly, overriding name inference.
    #[must_use]
    pub fn role(mut self, role: Role) -> Self {
        self.role = Some(role);
        self
    }

    /// Sets the 1-indexed declaration line.
    #[must_use]
    pub fn line(mut self, line: usize) -> Self {
        self.line = Some(line);
        self
    }

    /// Sets the byte range of the declaration body in the unit text.
    #[must_use]
    pub fn body_span(mut self, start: usize, end: usize) -> Self {
        self.body_span = Some((start, end));
        self
    }

    /// Adds a nested member declaration.
    #[must_use]
    pub fn member(mut self, member: Declaration) -> Self {
        self.members.push(member);
        self
    }

    /// Builds the declaration.
    ///
    /// The role tag is inferred from the name convention when not set
    /// explicitly, so it is resolved exactly once.
    ///
    /// # Errors
    ///
    /// Returns an error if the name is empty.
    pub fn build(self) -> Result<Declaration, ModelError> {
        if self.name.is_empty() {
            return Err(ModelError::EmptyDeclarationName);
        }
        let role = self.role.or_else(|| Role::from_name(&self.name));
        Ok(Declaration {
            name: self.name,
            kind: self.kind,
            package: self.package,
            modifiers: self.modifiers,
            annotations: self.annotations,
            has_docs: self.has_docs,
            return_type: self.return_type,
            role,
            unit: self.unit,
            line: self.line,
            body_span: self.body_span,
            members: self.members,
        })
    }
}

// ────────────────────────────────────────────
// Source units and model
// ────────────────────────────────────────────

/// A source unit: one file of the modeled codebase.
#[derive(Debug, Clone, PartialEq)]
pub struct SourceUnit {
    path: UnitPath,
    text: String,
    imports: Vec<Import>,
    declarations: Vec<Declaration>,
}

impl SourceUnit {
    /// Creates a builder for a source unit.
    #[must_use]
    pub fn builder(path: UnitPath) -> SourceUnitBuilder {
        SourceUnitBuilder::new(path)
    }

    /// Returns the normalized path.
    #[must_use]
    pub fn path(&self) -> &UnitPath {
        &self.path
    }

    /// Returns the raw source text.
    #[must_use]
    pub fn text(&self) -> &str {
        &self.text
    }

    /// Returns the resolved imports.
    #[must_use]
    pub fn imports(&self) -> &[Import] {
        &self.imports
    }

    /// Returns the top-level declarations.
    #[must_use]
    pub fn declarations(&self) -> &[Declaration] {
        &self.declarations
    }

    /// Returns the identity of this unit.
    #[must_use]
    pub fn id(&self) -> ElementId {
        ElementId::Unit(self.path.clone())
    }
}

/// Builder for [`SourceUnit`].
#[derive(Debug, Clone)]
pub struct SourceUnitBuilder {
    path: UnitPath,
    text: String,
    imports: Vec<Import>,
    declarations: Vec<Declaration>,
}

impl SourceUnitBuilder {
    /// Creates a new builder.
    #[must_use]
    pub fn new(path: UnitPath) -> Self {
        Self {
            path,
            text: String::new(),
            imports: Vec::new(),
            declarations: Vec::new(),
        }
    }

    /// Sets the raw source text.
    #[must_use]
    pub fn text(mut self, text: impl Into<String>) -> Self {
        self.text = text.into();
        self
    }

    /// Adds an imported name.
    #[must_use]
    pub fn import(mut self, name: impl Into<String>) -> Self {
        self.imports.push(Import::new(name));
        self
    }

    /// Adds a top-level declaration.
    #[must_use]
    pub fn declaration(mut self, declaration: Declaration) -> Self {
        self.declarations.push(declaration);
        self
    }

    /// Builds the source unit.
    #[must_use]
    pub fn build(self) -> SourceUnit {
        SourceUnit {
            path: self.path,
            text: self.text,
            imports: self.imports,
            declarations: self.declarations,
        }
    }
}

/// Immutable snapshot of a codebase: ordered source units indexed by path.
///
/// The engine takes the model as an explicit argument everywhere; there is no
/// process-wide singleton, so one process can evaluate several models.
#[derive(Debug, Clone)]
pub struct SourceModel {
    units: Vec<SourceUnit>,
    index: HashMap<UnitPath, usize>,
}

impl SourceModel {
    /// Creates a builder for a source model.
    #[must_use]
    pub fn builder() -> SourceModelBuilder {
        SourceModelBuilder::default()
    }

    /// Creates an empty model.
    #[must_use]
    pub fn empty() -> Self {
        Self {
            units: Vec::new(),
            index: HashMap::new(),
        }
    }

    /// Returns all units in insertion order.
    #[must_use]
    pub fn units(&self) -> &[SourceUnit] {
        &self.units
    }

    /// Resolves a unit by path.
    #[must_use]
    pub fn unit(&self, path: &UnitPath) -> Option<&SourceUnit> {
        self.index.get(path).map(|&i| &self.units[i])
    }

    /// Returns the number of units.
    #[must_use]
    pub fn len(&self) -> usize {
        self.units.len()
    }

    /// Returns true if the model contains no units.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.units.is_empty()
    }
}

/// Builder for [`SourceModel`].
#[derive(Debug, Clone, Default)]
pub struct SourceModelBuilder {
    units: Vec<SourceUnit>,
}

impl SourceModelBuilder {
    /// Adds a source unit.
    #[must_use]
    pub fn unit(mut self, unit: SourceUnit) -> Self {
        self.units.push(unit);
        self
    }

    /// Builds the model.
    ///
    /// # Errors
    ///
    /// Returns an error if two units share the same normalized path.
    pub fn build(self) -> Result<SourceModel, ModelError> {
        let mut index = HashMap::with_capacity(self.units.len());
        for (i, unit) in self.units.iter().enumerate() {
            if index.insert(unit.path().clone(), i).is_some() {
                return Err(ModelError::DuplicateUnit {
                    path: unit.path().to_string(),
                });
            }
        }
        Ok(SourceModel {
            units: self.units,
            index,
        })
    }
}
