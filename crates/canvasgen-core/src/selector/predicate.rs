//! Predicate types and evaluation.
//!
//! Predicates test one property of a [`Subject`]: a type fact, or the
//! calling side of a call site.
//!
//! ## Predicate Variants
//!
//! - `Kind` - declaration kind (class, concrete class, record, ...)
//! - `Named` - regex over the short or full name, anchored to the whole name
//! - `Implementing` - regex searched in each implemented/derived name
//! - `MethodMarker` - regex searched in the markers of a calling method
//!
//! A [`Selector`] is the conjunction of its predicates.

use std::fmt;

use regex::Regex;

use super::SelectorError;
use crate::facts::{CallSite, TypeFact, TypeKind};

// ============================================================================
// Subjects
// ============================================================================

/// Anything a predicate can be evaluated against.
pub trait Subject {
    fn kind(&self) -> TypeKind;
    fn is_abstract(&self) -> bool;
    fn full_name(&self) -> &str;
    fn short_name(&self) -> &str;
    fn implements(&self) -> &[String];
    fn markers(&self) -> Vec<&str>;
}

impl Subject for TypeFact {
    fn kind(&self) -> TypeKind {
        self.kind
    }

    fn is_abstract(&self) -> bool {
        self.is_abstract
    }

    fn full_name(&self) -> &str {
        &self.full_name
    }

    fn short_name(&self) -> &str {
        TypeFact::short_name(self)
    }

    fn implements(&self) -> &[String] {
        &self.implements
    }

    /// Markers of every method constructing this type.
    fn markers(&self) -> Vec<&str> {
        self.call_sites
            .iter()
            .flat_map(|site| site.markers.iter().map(String::as_str))
            .collect()
    }
}

/// A call site seen from its caller.
impl Subject for CallSite {
    fn kind(&self) -> TypeKind {
        self.caller_kind
    }

    fn is_abstract(&self) -> bool {
        self.caller_is_abstract
    }

    fn full_name(&self) -> &str {
        &self.caller
    }

    fn short_name(&self) -> &str {
        self.caller_short_name()
    }

    fn implements(&self) -> &[String] {
        &self.caller_implements
    }

    fn markers(&self) -> Vec<&str> {
        self.markers.iter().map(String::as_str).collect()
    }
}

// ============================================================================
// Kind Filter
// ============================================================================

/// Declaration kind accepted by a selector.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum KindFilter {
    /// Any declaration kind.
    Any,
    /// Classes, abstract or not.
    Class,
    /// Non-abstract classes.
    ConcreteClass,
    /// Abstract classes.
    AbstractClass,
    Record,
    Interface,
}

impl KindFilter {
    /// Parse a single-word kind keyword.
    pub fn from_keyword(word: &str) -> Option<Self> {
        match word.to_ascii_lowercase().as_str() {
            "type" => Some(KindFilter::Any),
            "class" => Some(KindFilter::Class),
            "record" => Some(KindFilter::Record),
            "interface" => Some(KindFilter::Interface),
            _ => None,
        }
    }

    pub fn matches(&self, kind: TypeKind, is_abstract: bool) -> bool {
        match self {
            KindFilter::Any => true,
            KindFilter::Class => kind == TypeKind::Class,
            KindFilter::ConcreteClass => kind == TypeKind::Class && !is_abstract,
            KindFilter::AbstractClass => kind == TypeKind::Class && is_abstract,
            KindFilter::Record => kind == TypeKind::Record,
            KindFilter::Interface => kind == TypeKind::Interface,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            KindFilter::Any => "type",
            KindFilter::Class => "class",
            KindFilter::ConcreteClass => "concrete class",
            KindFilter::AbstractClass => "abstract class",
            KindFilter::Record => "record",
            KindFilter::Interface => "interface",
        }
    }
}

// ============================================================================
// Patterns
// ============================================================================

/// A compiled regex together with the text it was written as.
#[derive(Clone)]
pub struct Pattern {
    source: String,
    regex: Regex,
}

impl Pattern {
    /// Compile a pattern that may match anywhere in the tested text.
    pub fn search(source: &str) -> Result<Self, SelectorError> {
        Self::compile(source, source)
    }

    /// Compile a pattern that must cover the whole tested text.
    pub fn whole(source: &str) -> Result<Self, SelectorError> {
        Self::compile(source, &format!("^(?:{})$", source))
    }

    fn compile(source: &str, regex: &str) -> Result<Self, SelectorError> {
        let invalid = |e: regex::Error| SelectorError::InvalidPattern {
            pattern: source.to_string(),
            message: e.to_string(),
        };
        // The source must stand alone before any anchoring wraps it.
        Regex::new(source).map_err(invalid)?;
        let regex = Regex::new(regex).map_err(invalid)?;
        Ok(Pattern {
            source: source.to_string(),
            regex,
        })
    }

    pub fn as_str(&self) -> &str {
        &self.source
    }

    pub fn is_match(&self, text: &str) -> bool {
        self.regex.is_match(text)
    }
}

impl fmt::Debug for Pattern {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_tuple("Pattern").field(&self.source).finish()
    }
}

// ============================================================================
// Predicates
// ============================================================================

/// A single boolean test over a subject.
#[derive(Debug, Clone)]
pub enum Predicate {
    Kind(KindFilter),
    Named(Pattern),
    Implementing(Pattern),
    MethodMarker(Pattern),
}

impl Predicate {
    /// Build a name predicate; the pattern is anchored to the whole name.
    pub fn named(pattern: &str) -> Result<Self, SelectorError> {
        Pattern::whole(pattern).map(Predicate::Named)
    }

    pub fn implementing(pattern: &str) -> Result<Self, SelectorError> {
        Pattern::search(pattern).map(Predicate::Implementing)
    }

    pub fn method_marker(pattern: &str) -> Result<Self, SelectorError> {
        Pattern::search(pattern).map(Predicate::MethodMarker)
    }

    pub fn matches<S: Subject + ?Sized>(&self, subject: &S) -> bool {
        match self {
            Predicate::Kind(filter) => filter.matches(subject.kind(), subject.is_abstract()),
            Predicate::Named(pattern) => {
                pattern.is_match(subject.short_name()) || pattern.is_match(subject.full_name())
            }
            Predicate::Implementing(pattern) => {
                subject.implements().iter().any(|name| pattern.is_match(name))
            }
            Predicate::MethodMarker(pattern) => {
                subject.markers().into_iter().any(|marker| pattern.is_match(marker))
            }
        }
    }
}

// ============================================================================
// Selectors
// ============================================================================

/// Conjunction of predicates, remembered with its source text.
#[derive(Debug, Clone)]
pub struct Selector {
    source: String,
    predicates: Vec<Predicate>,
}

impl Selector {
    pub fn new(source: impl Into<String>, predicates: Vec<Predicate>) -> Self {
        Selector {
            source: source.into(),
            predicates,
        }
    }

    /// Selector from a single predicate, described by its pattern.
    pub fn from_predicate(predicate: Predicate) -> Self {
        let source = match &predicate {
            Predicate::Kind(kind) => kind.as_str().to_string(),
            Predicate::Named(p) => format!("type named '{}'", p.as_str()),
            Predicate::Implementing(p) => format!("type implementing '{}'", p.as_str()),
            Predicate::MethodMarker(p) => format!("method marked '{}'", p.as_str()),
        };
        Selector::new(source, vec![predicate])
    }

    pub fn source(&self) -> &str {
        &self.source
    }

    pub fn predicates(&self) -> &[Predicate] {
        &self.predicates
    }

    /// True when every predicate matches. An empty selector matches everything.
    pub fn matches<S: Subject + ?Sized>(&self, subject: &S) -> bool {
        self.predicates.iter().all(|p| p.matches(subject))
    }
}
