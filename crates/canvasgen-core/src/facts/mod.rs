//! Facts model: the extracted type facts a canvas is generated from.
//!
//! This module provides the data handed over by the extraction step:
//! - [`TypeFact`]: One analyzed type (class, record or interface)
//! - [`CallSite`]: A place where a type is constructed, with the calling
//!   type, the calling method and the markers decorating that method
//! - [`FactStore`]: In-memory, ordered collection with name lookup
//! - [`FactSource`]: The boundary trait any extraction mechanism implements
//!
//! Facts are immutable once produced. The store only indexes them; every
//! iteration follows input order so that rendered output is deterministic.
//!
//! # Facts File
//!
//! [`JsonFactsFile`] reads the JSON interchange format:
//!
//! ```json
//! {
//!   "schema_version": 1,
//!   "types": [
//!     {
//!       "full_name": "Catalog.Application.Catalog.DeleteCatalogCommand",
//!       "kind": "class",
//!       "module": "Catalog.Application",
//!       "implements": ["Catalog.Application.ICommand"],
//!       "call_sites": [
//!         { "caller": "Catalog.Api.CatalogController", "method": "Delete" }
//!       ]
//!     }
//!   ]
//! }
//! ```

use std::collections::HashMap;
use std::fs;
use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};
use tracing::warn;

use crate::error::CanvasError;

/// Schema version of the JSON facts file.
pub const FACTS_SCHEMA_VERSION: u32 = 1;

// ============================================================================
// Enums
// ============================================================================

/// Declaration kind of an analyzed type.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
#[serde(rename_all = "snake_case")]
pub enum TypeKind {
    #[default]
    Class,
    Record,
    Interface,
}

impl TypeKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            TypeKind::Class => "class",
            TypeKind::Record => "record",
            TypeKind::Interface => "interface",
        }
    }
}

// ============================================================================
// Call Sites
// ============================================================================

/// A construction or call site of a type.
///
/// The caller is described inline because it does not have to be part of
/// the analyzed fact set (a controller living in a host project, a test
/// class).
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CallSite {
    /// Fully-qualified name of the calling type.
    pub caller: String,
    #[serde(default)]
    pub caller_kind: TypeKind,
    #[serde(default, rename = "caller_abstract")]
    pub caller_is_abstract: bool,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub caller_implements: Vec<String>,
    /// Name of the calling method.
    pub method: String,
    /// Attributes/annotations decorating the calling method, as written.
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub markers: Vec<String>,
}

impl CallSite {
    /// Create a call site from a class caller.
    pub fn new(caller: impl Into<String>, method: impl Into<String>) -> Self {
        CallSite {
            caller: caller.into(),
            caller_kind: TypeKind::Class,
            caller_is_abstract: false,
            caller_implements: Vec::new(),
            method: method.into(),
            markers: Vec::new(),
        }
    }

    pub fn with_caller_kind(mut self, kind: TypeKind) -> Self {
        self.caller_kind = kind;
        self
    }

    pub fn with_caller_implementing(mut self, name: impl Into<String>) -> Self {
        self.caller_implements.push(name.into());
        self
    }

    pub fn with_marker(mut self, marker: impl Into<String>) -> Self {
        self.markers.push(marker.into());
        self
    }

    /// Final dotted segment of the caller name.
    pub fn caller_short_name(&self) -> &str {
        short_name_of(&self.caller)
    }
}

// ============================================================================
// Type Facts
// ============================================================================

/// One analyzed type.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TypeFact {
    /// Namespace-qualified dotted name, unique within a run.
    pub full_name: String,
    #[serde(default)]
    pub kind: TypeKind,
    #[serde(default, rename = "abstract")]
    pub is_abstract: bool,
    /// Owning module (assembly, crate, package).
    #[serde(default)]
    pub module: String,
    /// Fully-qualified names of implemented or inherited types, in
    /// declaration order.
    #[serde(default)]
    pub implements: Vec<String>,
    #[serde(default)]
    pub call_sites: Vec<CallSite>,
}

impl TypeFact {
    /// Create a fact with no relationships.
    pub fn new(full_name: impl Into<String>, kind: TypeKind) -> Self {
        TypeFact {
            full_name: full_name.into(),
            kind,
            is_abstract: false,
            module: String::new(),
            implements: Vec::new(),
            call_sites: Vec::new(),
        }
    }

    pub fn class(full_name: impl Into<String>) -> Self {
        Self::new(full_name, TypeKind::Class)
    }

    pub fn record(full_name: impl Into<String>) -> Self {
        Self::new(full_name, TypeKind::Record)
    }

    pub fn interface(full_name: impl Into<String>) -> Self {
        Self::new(full_name, TypeKind::Interface)
    }

    pub fn in_module(mut self, module: impl Into<String>) -> Self {
        self.module = module.into();
        self
    }

    pub fn implementing(mut self, name: impl Into<String>) -> Self {
        self.implements.push(name.into());
        self
    }

    pub fn abstract_type(mut self) -> Self {
        self.is_abstract = true;
        self
    }

    pub fn instantiated_by(mut self, site: CallSite) -> Self {
        self.call_sites.push(site);
        self
    }

    /// Final dotted segment of the full name.
    pub fn short_name(&self) -> &str {
        short_name_of(&self.full_name)
    }

    /// Everything before the short name (empty for top-level types).
    pub fn namespace(&self) -> &str {
        let short = self.short_name();
        let prefix = &self.full_name[..self.full_name.len() - short.len()];
        prefix.strip_suffix('.').unwrap_or(prefix)
    }
}

/// Return the final dotted segment of a qualified name.
///
/// Dots inside generic argument lists do not split: the short name of
/// `Catalog.IHandler<Catalog.Order>` is `IHandler<Catalog.Order>`.
pub fn short_name_of(full_name: &str) -> &str {
    let mut depth = 0usize;
    let mut last_dot = None;
    for (i, c) in full_name.char_indices() {
        match c {
            '<' | '[' => depth += 1,
            '>' | ']' => depth = depth.saturating_sub(1),
            '.' if depth == 0 => last_dot = Some(i),
            _ => {}
        }
    }
    match last_dot {
        Some(i) => &full_name[i + 1..],
        None => full_name,
    }
}

// ============================================================================
// FactStore
// ============================================================================

/// Ordered in-memory store of type facts.
///
/// Iteration follows insertion order. Name lookups go through a hash index
/// that is never iterated.
#[derive(Debug, Clone, Default)]
pub struct FactStore {
    facts: Vec<TypeFact>,
    by_name: HashMap<String, usize>,
}

impl FactStore {
    /// Build a store from facts, keeping the first fact for a duplicated name.
    pub fn new(facts: impl IntoIterator<Item = TypeFact>) -> Self {
        let mut store = FactStore::default();
        for fact in facts {
            if store.by_name.contains_key(&fact.full_name) {
                warn!(name = %fact.full_name, "duplicate type fact ignored");
                continue;
            }
            store
                .by_name
                .insert(fact.full_name.clone(), store.facts.len());
            store.facts.push(fact);
        }
        store
    }

    /// Load every fact a source produces.
    pub fn load(source: &dyn FactSource) -> Result<Self, CanvasError> {
        Ok(Self::new(source.load_facts()?))
    }

    pub fn len(&self) -> usize {
        self.facts.len()
    }

    pub fn is_empty(&self) -> bool {
        self.facts.is_empty()
    }

    pub fn iter(&self) -> std::slice::Iter<'_, TypeFact> {
        self.facts.iter()
    }

    /// Look up a fact by full name.
    pub fn get(&self, full_name: &str) -> Option<&TypeFact> {
        self.by_name.get(full_name).map(|&i| &self.facts[i])
    }

    pub fn contains(&self, full_name: &str) -> bool {
        self.by_name.contains_key(full_name)
    }
}

impl FromIterator<TypeFact> for FactStore {
    fn from_iter<I: IntoIterator<Item = TypeFact>>(iter: I) -> Self {
        FactStore::new(iter)
    }
}

impl<'a> IntoIterator for &'a FactStore {
    type Item = &'a TypeFact;
    type IntoIter = std::slice::Iter<'a, TypeFact>;

    fn into_iter(self) -> Self::IntoIter {
        self.facts.iter()
    }
}

// ============================================================================
// Fact Sources
// ============================================================================

/// Boundary to the extraction step.
///
/// Implementations return the complete, materialized fact set; the core
/// starts resolving only after `load_facts` returns.
pub trait FactSource {
    fn load_facts(&self) -> Result<Vec<TypeFact>, CanvasError>;
}

impl FactSource for [TypeFact] {
    fn load_facts(&self) -> Result<Vec<TypeFact>, CanvasError> {
        Ok(self.to_vec())
    }
}

impl FactSource for Vec<TypeFact> {
    fn load_facts(&self) -> Result<Vec<TypeFact>, CanvasError> {
        Ok(self.clone())
    }
}

/// Serialized facts document.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FactsDocument {
    #[serde(default = "default_schema_version")]
    pub schema_version: u32,
    #[serde(default)]
    pub types: Vec<TypeFact>,
}

fn default_schema_version() -> u32 {
    FACTS_SCHEMA_VERSION
}

/// A JSON facts file written by an external extractor.
#[derive(Debug, Clone)]
pub struct JsonFactsFile {
    path: PathBuf,
}

impl JsonFactsFile {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        JsonFactsFile { path: path.into() }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Decode a facts document from JSON text.
    pub fn parse(&self, content: &str) -> Result<FactsDocument, CanvasError> {
        let document: FactsDocument = serde_json::from_str(content)
            .map_err(|e| CanvasError::facts_load(self.path.display().to_string(), e.to_string()))?;
        if document.schema_version > FACTS_SCHEMA_VERSION {
            return Err(CanvasError::facts_load(
                self.path.display().to_string(),
                format!(
                    "unsupported schema version {} (expected at most {})",
                    document.schema_version, FACTS_SCHEMA_VERSION
                ),
            ));
        }
        Ok(document)
    }
}

impl FactSource for JsonFactsFile {
    fn load_facts(&self) -> Result<Vec<TypeFact>, CanvasError> {
        let content = fs::read_to_string(&self.path)
            .map_err(|e| CanvasError::facts_load(self.path.display().to_string(), e.to_string()))?;
        Ok(self.parse(&content)?.types)
    }
}
