//! Selector language for classifying type facts into canvas roles.
//!
//! A selector is a short phrase compiled into a conjunction of predicates:
//!
//! ```text
//! <selector> := <kind> ["implementing" '<regex>'] ["named" '<regex>']
//! <kind>     := "class" | "concrete class" | "abstract class"
//!             | "record" | "interface" | "type"
//! ```
//!
//! Clauses may appear in either order, at most once each. Patterns are
//! compiled when the selector is parsed, so a malformed regex fails before
//! any resolution runs.
//!
//! ## Usage
//!
//! ```
//! use canvasgen_core::facts::TypeFact;
//! use canvasgen_core::selector::parse_selector;
//!
//! let commands = parse_selector("class implementing '.*ICommand$'").unwrap();
//! let fact = TypeFact::class("Shop.PlaceOrder").implementing("Shop.ICommand");
//! assert!(commands.matches(&fact));
//! ```

mod parse;
mod predicate;

use thiserror::Error;

pub use parse::parse_selector;
pub use predicate::{KindFilter, Pattern, Predicate, Selector, Subject};

/// Error type for selector, pattern and link template compilation.
#[derive(Debug, Error)]
pub enum SelectorError {
    /// Selector text does not follow the recognized phrase forms.
    #[error("invalid selector '{selector}': {message}")]
    SelectorSyntax { selector: String, message: String },

    /// A regex in a selector, policy or link template does not compile.
    #[error("invalid pattern '{pattern}': {message}")]
    InvalidPattern { pattern: String, message: String },

    /// A link template is not of the form `T -> <regex>`.
    #[error("invalid link template '{template}': {message}")]
    InvalidLinkTemplate { template: String, message: String },
}
