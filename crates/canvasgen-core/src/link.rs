//! Link templates and one-hop link resolution.
//!
//! A link template ties an implementer of a generic contract back to the
//! type it was instantiated for. The template `T -> .*ICommandHandler<T>$`
//! turns the source `Shop.PlaceOrder` into the regex
//! `^(?:.*ICommandHandler<Shop\.PlaceOrder>$)$`, which an implements entry of a
//! candidate handler must match in full.
//!
//! The resolver knows about a single hop only; chaining hops is the job of
//! the graph builder.

use regex::Regex;
use tracing::debug;
use winnow::ascii::multispace0;
use winnow::prelude::*;
use winnow::token::rest;
use winnow::ModalResult;

use crate::facts::TypeFact;
use crate::selector::SelectorError;

/// Name placed in templates to validate them at parse time.
const PROBE_NAME: &str = "Probe.Type";

/// A parsed `T -> <regex>` template.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LinkTemplate {
    source: String,
    pattern: String,
}

impl LinkTemplate {
    /// Parse a template and check that it compiles once `T` is substituted.
    pub fn parse(input: &str) -> Result<Self, SelectorError> {
        let invalid = |message: &str| SelectorError::InvalidLinkTemplate {
            template: input.to_string(),
            message: message.to_string(),
        };

        let pattern = parse_template
            .parse(input.trim())
            .map_err(|_| invalid("expected `T -> <regex>`"))?;
        let pattern = pattern.trim().to_string();
        if pattern.is_empty() {
            return Err(invalid("missing pattern after '->'"));
        }
        if type_token_positions(&pattern).is_empty() {
            return Err(invalid("pattern does not contain the type token 'T'"));
        }

        let template = LinkTemplate {
            source: input.trim().to_string(),
            pattern,
        };
        template.regex_for(PROBE_NAME)?;
        Ok(template)
    }

    pub fn source(&self) -> &str {
        &self.source
    }

    /// The pattern with `T` still in place.
    pub fn pattern(&self) -> &str {
        &self.pattern
    }

    /// Substitute the escaped source name for every standalone `T`.
    pub fn expand(&self, full_name: &str) -> String {
        let escaped = regex::escape(full_name);
        let mut expanded = String::with_capacity(self.pattern.len() + escaped.len());
        let mut last = 0;
        for pos in type_token_positions(&self.pattern) {
            expanded.push_str(&self.pattern[last..pos]);
            expanded.push_str(&escaped);
            last = pos + 1;
        }
        expanded.push_str(&self.pattern[last..]);
        expanded
    }

    /// Regex a handler's implements entry must fully match for `full_name`.
    pub fn regex_for(&self, full_name: &str) -> Result<Regex, SelectorError> {
        let invalid = |e: regex::Error| SelectorError::InvalidPattern {
            pattern: self.pattern.clone(),
            message: e.to_string(),
        };
        let expanded = self.expand(full_name);
        Regex::new(&expanded).map_err(invalid)?;
        Regex::new(&format!("^(?:{})$", expanded)).map_err(invalid)
    }
}

/// Parse `T -> <rest>`, returning the rest.
fn parse_template<'a>(input: &mut &'a str) -> ModalResult<&'a str> {
    let _ = ('T', multispace0, "->", multispace0).parse_next(input)?;
    rest.parse_next(input)
}

/// Byte offsets of `T` characters that are not part of a longer identifier.
fn type_token_positions(pattern: &str) -> Vec<usize> {
    let is_ident = |c: Option<char>| c.is_some_and(|c| c.is_alphanumeric() || c == '_');
    let mut positions = Vec::new();
    let mut prev: Option<char> = None;
    let mut chars = pattern.char_indices().peekable();
    while let Some((i, c)) = chars.next() {
        let next = chars.peek().map(|&(_, n)| n);
        // An escaped `\T` is not a token.
        if c == 'T' && !is_ident(prev) && !is_ident(next) && prev != Some('\\') {
            positions.push(i);
        }
        prev = Some(c);
    }
    positions
}

/// Resolve, for every source fact, the handler facts linked to it.
///
/// Returns one entry per source, in source order, each listing its handlers
/// in handler order. A source without handlers gets an empty list.
pub fn resolve<'a>(
    sources: &[&'a TypeFact],
    handlers: &[&'a TypeFact],
    template: &LinkTemplate,
) -> Result<Vec<(&'a TypeFact, Vec<&'a TypeFact>)>, SelectorError> {
    let mut resolved = Vec::with_capacity(sources.len());
    for &source in sources {
        let regex = template.regex_for(&source.full_name)?;
        let matching: Vec<&TypeFact> = handlers
            .iter()
            .copied()
            .filter(|handler| handler.implements.iter().any(|name| regex.is_match(name)))
            .collect();
        if matching.is_empty() {
            debug!(source = %source.full_name, template = %template.source(), "no handler resolved");
        }
        resolved.push((source, matching));
    }
    Ok(resolved)
}
