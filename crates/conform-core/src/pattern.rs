//! Validated pattern newtypes.
//!
//! All patterns compile at construction and are reused for every match call.
//! An invalid pattern is a configuration error surfaced before any rule runs;
//! evaluation itself can never fail on a malformed pattern.

use std::fmt;

/// Errors in pattern construction.
#[derive(Debug, Clone, thiserror::Error)]
pub enum PatternError {
    /// Pattern string is empty.
    #[error("pattern must not be empty")]
    Empty,

    /// Regular expression failed to compile.
    #[error("invalid regex `{pattern}`: {reason}")]
    InvalidRegex {
        /// The invalid pattern.
        pattern: String,
        /// Why it failed to compile.
        reason: String,
    },

    /// Glob pattern has invalid syntax.
    #[error("invalid glob `{pattern}`: {reason}")]
    InvalidGlob {
        /// The invalid pattern.
        pattern: String,
        /// Why it failed to compile.
        reason: String,
    },
}

/// A validated name-shape pattern, matched against a declaration's simple name.
#[derive(Debug, Clone)]
pub struct NamePattern {
    raw: String,
    compiled: regex::Regex,
}

impl NamePattern {
    /// Creates a new name pattern.
    ///
    /// # Errors
    ///
    /// Returns an error if the pattern is empty or is not a valid regex.
    pub fn new(pattern: &str) -> Result<Self, PatternError> {
        if pattern.is_empty() {
            return Err(PatternError::Empty);
        }
        let compiled = regex::Regex::new(pattern).map_err(|e| PatternError::InvalidRegex {
            pattern: pattern.to_string(),
            reason: e.to_string(),
        })?;
        Ok(Self {
            raw: pattern.to_string(),
            compiled,
        })
    }

    /// Tests whether a name matches this pattern.
    #[must_use]
    pub fn is_match(&self, name: &str) -> bool {
        self.compiled.is_match(name)
    }

    /// Returns the pattern source.
    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.raw
    }
}

impl PartialEq for NamePattern {
    fn eq(&self, other: &Self) -> bool {
        self.raw == other.raw
    }
}

impl Eq for NamePattern {}

/// A validated textual pattern, searched over raw source text.
#[derive(Debug, Clone)]
pub struct TextPattern {
    raw: String,
    compiled: regex::Regex,
}

impl TextPattern {
    /// Creates a new text pattern.
    ///
    /// # Errors
    ///
    /// Returns an error if the pattern is empty or is not a valid regex.
    pub fn new(pattern: &str) -> Result<Self, PatternError> {
        if pattern.is_empty() {
            return Err(PatternError::Empty);
        }
        let compiled = regex::Regex::new(pattern).map_err(|e| PatternError::InvalidRegex {
            pattern: pattern.to_string(),
            reason: e.to_string(),
        })?;
        Ok(Self {
            raw: pattern.to_string(),
            compiled,
        })
    }

    /// Finds the first match in `text`, returning its byte offset and fragment.
    #[must_use]
    pub fn find_in<'t>(&self, text: &'t str) -> Option<(usize, &'t str)> {
        self.compiled.find(text).map(|m| (m.start(), m.as_str()))
    }

    /// Returns the pattern source.
    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.raw
    }
}

impl PartialEq for TextPattern {
    fn eq(&self, other: &Self) -> bool {
        self.raw == other.raw
    }
}

impl Eq for TextPattern {}

/// A validated pattern over fully qualified dotted import names.
///
/// Two forms:
/// - segment patterns with `*` (exactly one segment) and `**` (any number of
///   segments), e.g. `**.contracts.*`;
/// - plain substring containment via [`ImportPattern::containing`], e.g.
///   `.contracts.`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ImportPattern {
    raw: String,
    kind: ImportPatternKind,
}

#[derive(Debug, Clone, PartialEq, Eq)]
enum ImportPatternKind {
    Segments(Vec<String>),
    Contains(String),
}

impl ImportPattern {
    /// Creates a segment pattern.
    ///
    /// # Errors
    ///
    /// Returns an error if the pattern is empty.
    pub fn new(pattern: &str) -> Result<Self, PatternError> {
        if pattern.is_empty() {
            return Err(PatternError::Empty);
        }
        let segments = pattern.split('.').map(str::to_string).collect();
        Ok(Self {
            raw: pattern.to_string(),
            kind: ImportPatternKind::Segments(segments),
        })
    }

    /// Creates a substring-containment pattern.
    ///
    /// # Errors
    ///
    /// Returns an error if the fragment is empty.
    pub fn containing(fragment: &str) -> Result<Self, PatternError> {
        if fragment.is_empty() {
            return Err(PatternError::Empty);
        }
        Ok(Self {
            raw: fragment.to_string(),
            kind: ImportPatternKind::Contains(fragment.to_string()),
        })
    }

    /// Tests whether an imported name matches this pattern.
    #[must_use]
    pub fn matches(&self, import: &str) -> bool {
        match &self.kind {
            ImportPatternKind::Segments(pattern) => {
                let parts: Vec<&str> = import.split('.').collect();
                let pattern: Vec<&str> = pattern.iter().map(String::as_str).collect();
                match_segments(&parts, &pattern)
            }
            ImportPatternKind::Contains(fragment) => import.contains(fragment),
        }
    }

    /// Returns the pattern source.
    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.raw
    }
}

fn match_segments(path: &[&str], pattern: &[&str]) -> bool {
    if pattern.is_empty() {
        return path.is_empty();
    }

    let (first, rest) = (pattern[0], &pattern[1..]);
    match first {
        "**" => {
            // Zero or more segments
            (0..=path.len()).any(|i| match_segments(&path[i..], rest))
        }
        "*" => !path.is_empty() && match_segments(&path[1..], rest),
        literal => !path.is_empty() && path[0] == literal && match_segments(&path[1..], rest),
    }
}

/// A validated glob pattern for unit-path matching in scope specs.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PathPattern {
    raw: String,
    compiled: glob::Pattern,
}

impl PathPattern {
    /// Creates a new path pattern.
    ///
    /// # Errors
    ///
    /// Returns an error if the pattern is empty or has invalid glob syntax.
    pub fn new(pattern: &str) -> Result<Self, PatternError> {
        if pattern.is_empty() {
            return Err(PatternError::Empty);
        }
        let compiled = glob::Pattern::new(pattern).map_err(|e| PatternError::InvalidGlob {
            pattern: pattern.to_string(),
            reason: e.to_string(),
        })?;
        Ok(Self {
            raw: pattern.to_string(),
            compiled,
        })
    }

    /// Tests whether a normalized unit path matches this pattern.
    #[must_use]
    pub fn matches(&self, path: &str) -> bool {
        if self.compiled.matches(path) {
            return true;
        }
        // For `dir/**` patterns, also accept prefix + component boundary to
        // cover edge cases the glob crate does not match as expected.
        if let Some(prefix) = self.raw.strip_suffix("/**") {
            let normalized = prefix.trim_end_matches('/');
            if path.starts_with(normalized)
                && path.as_bytes().get(normalized.len()).is_some_and(|&b| b == b'/')
            {
                return true;
            }
        }
        false
    }

    /// Returns the pattern source.
    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.raw
    }
}

impl fmt::Display for PathPattern {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.raw)
    }
}
