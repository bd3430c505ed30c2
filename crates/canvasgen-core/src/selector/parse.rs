//! Selector parser.
//!
//! ## Grammar
//!
//! ```text
//! <selector> := <kind> (<clause>)*
//! <kind>     := "concrete" "class" | "abstract" "class" | "class"
//!             | "record" | "interface" | "type"
//! <clause>   := "implementing" <quoted> | "named" <quoted>
//! <quoted>   := '\'' regex '\'' | '"' regex '"'
//! ```
//!
//! Keywords are case-insensitive. Each clause may appear at most once.

use winnow::ascii::{multispace0, multispace1};
use winnow::combinator::{alt, delimited, preceded, repeat};
use winnow::error::{ErrMode, ParserError};
use winnow::prelude::*;
use winnow::token::{take_till, take_while};
use winnow::ModalResult;

use super::predicate::{KindFilter, Predicate, Selector};
use super::SelectorError;

const EXPECTED_FORM: &str = "expected `<kind> [implementing '<regex>'] [named '<regex>']`";

/// A clause as written, before its pattern is compiled.
#[derive(Debug, Clone, PartialEq, Eq)]
enum Clause {
    Implementing(String),
    Named(String),
}

/// Parse a selector and compile its patterns.
///
/// # Examples
///
/// ```
/// use canvasgen_core::selector::parse_selector;
///
/// let selector = parse_selector("concrete class implementing '.*IAggregateRoot<.*>'").unwrap();
/// assert_eq!(selector.predicates().len(), 2);
///
/// assert!(parse_selector("struct named 'Foo'").is_err());
/// ```
pub fn parse_selector(input: &str) -> Result<Selector, SelectorError> {
    let trimmed = input.trim();
    if trimmed.is_empty() {
        return Err(SelectorError::SelectorSyntax {
            selector: input.to_string(),
            message: "empty selector".to_string(),
        });
    }

    let (kind, clauses) =
        parse_phrase
            .parse(trimmed)
            .map_err(|e| SelectorError::SelectorSyntax {
                selector: input.to_string(),
                message: format!("{}, unexpected input at offset {}", EXPECTED_FORM, e.offset()),
            })?;

    let mut predicates = vec![Predicate::Kind(kind)];
    let mut seen_implementing = false;
    let mut seen_named = false;
    for clause in clauses {
        let (seen, keyword) = match &clause {
            Clause::Implementing(_) => (&mut seen_implementing, "implementing"),
            Clause::Named(_) => (&mut seen_named, "named"),
        };
        if *seen {
            return Err(SelectorError::SelectorSyntax {
                selector: input.to_string(),
                message: format!("clause '{}' given more than once", keyword),
            });
        }
        *seen = true;

        let predicate = match clause {
            Clause::Implementing(pattern) => Predicate::implementing(&pattern)?,
            Clause::Named(pattern) => Predicate::named(&pattern)?,
        };
        predicates.push(predicate);
    }

    Ok(Selector::new(trimmed, predicates))
}

// ============================================================================
// Parser implementation using winnow
// ============================================================================

/// Parse the whole phrase: a kind followed by clauses.
fn parse_phrase(input: &mut &str) -> ModalResult<(KindFilter, Vec<Clause>)> {
    let kind = parse_kind(input)?;
    let clauses: Vec<Clause> = repeat(0.., preceded(multispace1, parse_clause)).parse_next(input)?;
    let _ = multispace0.parse_next(input)?;
    Ok((kind, clauses))
}

/// Parse the kind keyword, including the two-word forms.
fn parse_kind(input: &mut &str) -> ModalResult<KindFilter> {
    let checkpoint = *input;
    let word = parse_word(input)?;

    let qualified = if word.eq_ignore_ascii_case("concrete") {
        Some(KindFilter::ConcreteClass)
    } else if word.eq_ignore_ascii_case("abstract") {
        Some(KindFilter::AbstractClass)
    } else {
        None
    };

    if let Some(kind) = qualified {
        let _ = multispace1.parse_next(input)?;
        parse_keyword(input, "class")?;
        return Ok(kind);
    }

    match KindFilter::from_keyword(word) {
        Some(kind) => Ok(kind),
        None => {
            *input = checkpoint;
            Err(ErrMode::from_input(input))
        }
    }
}

/// Parse one `implementing '...'` or `named '...'` clause.
fn parse_clause(input: &mut &str) -> ModalResult<Clause> {
    let checkpoint = *input;
    let word = parse_word(input)?;

    let build: fn(String) -> Clause = if word.eq_ignore_ascii_case("implementing") {
        Clause::Implementing
    } else if word.eq_ignore_ascii_case("named") {
        Clause::Named
    } else {
        *input = checkpoint;
        return Err(ErrMode::from_input(input));
    };

    let _ = multispace0.parse_next(input)?;
    let value = parse_quoted(input)?;
    Ok(build(value))
}

/// Parse an alphabetic word.
fn parse_word<'a>(input: &mut &'a str) -> ModalResult<&'a str> {
    take_while(1.., |c: char| c.is_ascii_alphabetic()).parse_next(input)
}

/// Parse a specific keyword (case-insensitive).
fn parse_keyword(input: &mut &str, keyword: &str) -> ModalResult<()> {
    let checkpoint = *input;
    let word = parse_word(input)?;
    if word.eq_ignore_ascii_case(keyword) {
        Ok(())
    } else {
        *input = checkpoint;
        Err(ErrMode::from_input(input))
    }
}

/// Parse a single- or double-quoted pattern.
fn parse_quoted(input: &mut &str) -> ModalResult<String> {
    alt((parse_single_quoted, parse_double_quoted)).parse_next(input)
}

fn parse_single_quoted(input: &mut &str) -> ModalResult<String> {
    delimited('\'', take_till(0.., |c| c == '\''), '\'')
        .map(|s: &str| s.to_string())
        .parse_next(input)
}

fn parse_double_quoted(input: &mut &str) -> ModalResult<String> {
    delimited('"', take_till(0.., |c| c == '"'), '"')
        .map(|s: &str| s.to_string())
        .parse_next(input)
}
