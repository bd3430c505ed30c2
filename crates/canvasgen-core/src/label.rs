//! Human-readable labels and Mermaid node identifiers.
//!
//! Labels are derived from identifiers by splitting them into words and
//! rendering the words as a sentence:
//!
//! - `OrderNewProductCommand` (command) -> `Order new product`
//! - `WebApp` -> `Web app`
//! - `Must_contains_at_least_one_item_to_order` -> `Must contains at least one item to order`
//!
//! Node identifiers are the full name with every character that Mermaid
//! does not accept in an id removed.

/// Split an identifier at case transitions, digit boundaries and separators.
///
/// A run of capitals stays together until the last capital that starts a
/// lower-case word, so `HTTPRequest` splits into `HTTP` and `Request`.
pub fn split_words(name: &str) -> Vec<String> {
    let chars: Vec<char> = name.chars().collect();
    let mut words = Vec::new();
    let mut current = String::new();

    for (i, &c) in chars.iter().enumerate() {
        if !c.is_alphanumeric() {
            if !current.is_empty() {
                words.push(std::mem::take(&mut current));
            }
            continue;
        }
        if let Some(prev) = current.chars().last() {
            let next = chars.get(i + 1).copied();
            let boundary = (prev.is_lowercase() && c.is_uppercase())
                || (prev.is_ascii_digit() != c.is_ascii_digit())
                || (prev.is_uppercase()
                    && c.is_uppercase()
                    && next.is_some_and(|n| n.is_lowercase()));
            if boundary {
                words.push(std::mem::take(&mut current));
            }
        }
        current.push(c);
    }
    if !current.is_empty() {
        words.push(current);
    }
    words
}

/// Render words as a sentence: first letter upper-case, the rest lower-case.
fn sentence(words: &[String]) -> String {
    let mut text = words
        .iter()
        .map(|w| w.to_lowercase())
        .collect::<Vec<_>>()
        .join(" ");
    if let Some(first) = text.chars().next() {
        let upper: String = first.to_uppercase().collect();
        text.replace_range(..first.len_utf8(), &upper);
    }
    text
}

/// Humanize an identifier.
pub fn humanize(name: &str) -> String {
    sentence(&split_words(name))
}

/// Humanize a command name, dropping a trailing `Command` word.
///
/// The suffix is kept when it is the only word.
pub fn command_label(name: &str) -> String {
    let mut words = split_words(name);
    if words.len() > 1 && words.last().is_some_and(|w| w == "Command") {
        words.pop();
    }
    sentence(&words)
}

/// Mermaid node id for a full name.
pub fn node_id(full_name: &str) -> String {
    full_name.chars().filter(|c| c.is_alphanumeric()).collect()
}

/// Escape a label for use inside a quoted Mermaid node text.
pub fn escape_label(text: &str) -> String {
    text.replace('"', "#quot;")
}

#[cfg(test)]
mod tests {
    use super::*;

    mod words {
        use super::*;

        #[test]
        fn camel_case() {
            assert_eq!(split_words("OrderNewProduct"), vec!["Order", "New", "Product"]);
        }

        #[test]
        fn underscores() {
            assert_eq!(
                split_words("Must_contains_at_least_one_item"),
                vec!["Must", "contains", "at", "least", "one", "item"]
            );
        }

        #[test]
        fn digits_are_their_own_word() {
            assert_eq!(split_words("Order2Items"), vec!["Order", "2", "Items"]);
            assert_eq!(split_words("V2"), vec!["V", "2"]);
        }

        #[test]
        fn acronym_run() {
            assert_eq!(split_words("HTTPRequest"), vec!["HTTP", "Request"]);
            assert_eq!(split_words("ImportCSV"), vec!["Import", "CSV"]);
        }

        #[test]
        fn empty_name() {
            assert!(split_words("").is_empty());
            assert!(split_words("__").is_empty());
        }
    }

    mod labels {
        use super::*;

        #[test]
        fn humanize_camel_case() {
            assert_eq!(humanize("WebApp"), "Web app");
            assert_eq!(humanize("ProductOrdered"), "Product ordered");
        }

        #[test]
        fn humanize_snake_case() {
            assert_eq!(
                humanize("Must_contains_at_least_one_item_to_order"),
                "Must contains at least one item to order"
            );
            assert_eq!(humanize("lower_start"), "Lower start");
        }

        #[test]
        fn humanize_keeps_command_suffix() {
            assert_eq!(humanize("OrderPlacedCommand"), "Order placed command");
        }

        #[test]
        fn command_label_strips_suffix() {
            assert_eq!(command_label("OrderNewProductCommand"), "Order new product");
            assert_eq!(command_label("RegisterUser"), "Register user");
        }

        #[test]
        fn command_label_keeps_lone_suffix() {
            assert_eq!(command_label("Command"), "Command");
        }

        #[test]
        fn command_label_only_strips_whole_word() {
            assert_eq!(command_label("SendCommands"), "Send commands");
        }
    }

    mod ids {
        use super::*;

        #[test]
        fn dots_removed() {
            assert_eq!(
                node_id("Test.Namespace.OrderNewProductCommand"),
                "TestNamespaceOrderNewProductCommand"
            );
        }

        #[test]
        fn generic_and_separator_characters_removed() {
            assert_eq!(node_id("A.Handler<B.C>"), "AHandlerBC");
            assert_eq!(node_id("A.Outer+Inner_1"), "AOuterInner1");
        }

        #[test]
        fn quotes_are_escaped() {
            assert_eq!(escape_label("say \"hi\""), "say #quot;hi#quot;");
        }
    }
}
