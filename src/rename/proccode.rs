//! Custom block signature ("proccode") handling.
//!
//! A signature such as `jump %n times %b` mixes label text with typed
//! argument placeholders. Renaming a custom block replaces the label while
//! the placeholders, whose order binds the block's arguments, stay intact.

use once_cell::sync::Lazy;
use regex::Regex;

static PLACEHOLDER: Lazy<Regex> = Lazy::new(|| Regex::new(r"%[nsb]").expect("valid regex"));

/// One token of a signature.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SignatureToken<'a> {
    /// Label text between placeholders (trimmed, never empty)
    Label(&'a str),
    /// Argument placeholder: `%s` (string), `%n` (number) or `%b` (boolean)
    Placeholder(&'a str),
}

/// Split a signature into label and placeholder tokens, in order.
pub fn tokenize(proccode: &str) -> Vec<SignatureToken<'_>> {
    let mut tokens = Vec::new();
    let mut cursor = 0;

    for found in PLACEHOLDER.find_iter(proccode) {
        push_label(&mut tokens, &proccode[cursor..found.start()]);
        tokens.push(SignatureToken::Placeholder(found.as_str()));
        cursor = found.end();
    }
    push_label(&mut tokens, &proccode[cursor..]);

    tokens
}

fn push_label<'a>(tokens: &mut Vec<SignatureToken<'a>>, text: &'a str) {
    let text = text.trim();
    if !text.is_empty() {
        tokens.push(SignatureToken::Label(text));
    }
}

/// Replace the label of a signature, keeping its placeholders.
///
/// The result is the new label followed by every placeholder, separated by
/// single spaces.
pub fn relabel(proccode: &str, label: &str) -> String {
    let mut out = String::from(label);
    for token in tokenize(proccode) {
        if let SignatureToken::Placeholder(placeholder) = token {
            out.push(' ');
            out.push_str(placeholder);
        }
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_tokenize_mixed_signature() {
        assert_eq!(
            tokenize("jump %n times %b"),
            vec![
                SignatureToken::Label("jump"),
                SignatureToken::Placeholder("%n"),
                SignatureToken::Label("times"),
                SignatureToken::Placeholder("%b"),
            ]
        );
    }

    #[test]
    fn test_tokenize_label_only() {
        assert_eq!(tokenize("reset"), vec![SignatureToken::Label("reset")]);
        assert!(tokenize("").is_empty());
    }

    #[test]
    fn test_relabel_keeps_placeholder_order() {
        assert_eq!(relabel("say %s for %n secs if %b", "x"), "x %s %n %b");
        assert_eq!(relabel("100% done", "y"), "y");
    }

    #[test]
    fn test_relabel() {
        assert_eq!(relabel("jump %n", "a1b2"), "a1b2 %n");
        assert_eq!(relabel("move %n steps then say %s", "zz"), "zz %n %s");
        assert_eq!(relabel("reset", "q"), "q");
    }
}
