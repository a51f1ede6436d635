//! Identifier handling for T-SQL names.
//!
//! SQL Server identifiers come in three shapes: plain (`Orders`), bracketed
//! (`[Order Details]`, where `]]` escapes a closing bracket) and double-quoted
//! (`"Order Details"`, where `""` escapes a quote). Multi-part names join
//! those with dots, and a part may be empty (`db..tbl`).
//!
//! ```ignore
//! use crate::parser::identifier_utils::*;
//!
//! assert_eq!(normalize_identifier("[My]]Table]"), "My]Table");
//! assert_eq!(split_multipart_name("srv.[my db]..t"), vec!["srv", "my db", "", "t"]);
//! assert_eq!(ensure_bracketed("a.b"), "[a.b]");
//! ```

use std::borrow::Cow;

use sqlparser::tokenizer::{Token, Word};

/// Strips one level of brackets or double quotes from an identifier part and
/// resolves the escaped closing character.
pub fn normalize_identifier(ident: &str) -> String {
    let trimmed = ident.trim();
    if trimmed.len() >= 2 && trimmed.starts_with('[') && trimmed.ends_with(']') {
        return trimmed[1..trimmed.len() - 1].replace("]]", "]");
    }
    if trimmed.len() >= 2 && trimmed.starts_with('"') && trimmed.ends_with('"') {
        return trimmed[1..trimmed.len() - 1].replace("\"\"", "\"");
    }
    trimmed.to_string()
}

/// Whether a bare identifier part must be bracketed to re-parse as one part.
pub fn needs_brackets(part: &str) -> bool {
    part.is_empty()
        || part
            .chars()
            .any(|c| matches!(c, '.' | '[' | ']' | '"') || c.is_whitespace())
}

/// Wraps a bare identifier part in brackets, escaping `]` as `]]`.
pub fn ensure_bracketed(part: &str) -> String {
    format!("[{}]", part.replace(']', "]]"))
}

/// Brackets a bare identifier part only when it would not re-parse as-is.
pub fn quote_if_needed(part: &str) -> Cow<'_, str> {
    if needs_brackets(part) {
        Cow::Owned(ensure_bracketed(part))
    } else {
        Cow::Borrowed(part)
    }
}

/// Splits a multi-part name on dots that are outside brackets and quotes.
///
/// Parts come back normalized. Empty parts are kept, so `db..t` yields three
/// parts and `.t` yields two.
pub fn split_multipart_name(name: &str) -> Vec<String> {
    let mut parts = Vec::new();
    let mut current = String::new();
    let mut chars = name.trim().chars().peekable();

    while let Some(c) = chars.next() {
        match c {
            '[' => {
                current.push(c);
                while let Some(inner) = chars.next() {
                    current.push(inner);
                    if inner == ']' {
                        if chars.peek() == Some(&']') {
                            current.push(']');
                            chars.next();
                        } else {
                            break;
                        }
                    }
                }
            }
            '"' => {
                current.push(c);
                while let Some(inner) = chars.next() {
                    current.push(inner);
                    if inner == '"' {
                        if chars.peek() == Some(&'"') {
                            current.push('"');
                            chars.next();
                        } else {
                            break;
                        }
                    }
                }
            }
            '.' => {
                parts.push(normalize_identifier(&current));
                current.clear();
            }
            c if c.is_whitespace() => {}
            _ => current.push(c),
        }
    }
    parts.push(normalize_identifier(&current));
    parts
}

/// Renders a word the way it was written: bracketed, double-quoted or bare.
pub fn format_word(word: &Word) -> String {
    match word.quote_style {
        Some('[') => ensure_bracketed(&word.value),
        Some('"') => format!("\"{}\"", word.value.replace('"', "\"\"")),
        Some(q) => format!("{q}{}{q}", word.value),
        None => word.value.clone(),
    }
}

/// Source text of a single token.
///
/// The tokenizer drops the escaping of embedded quotes and renders hex
/// literals in ANSI form; both are restored to their T-SQL spelling here.
pub fn token_source_text(token: &Token) -> Cow<'_, str> {
    match token {
        Token::Word(w) => Cow::Owned(format_word(w)),
        Token::SingleQuotedString(s) => Cow::Owned(format!("'{}'", s.replace('\'', "''"))),
        Token::NationalStringLiteral(s) => Cow::Owned(format!("N'{}'", s.replace('\'', "''"))),
        Token::HexStringLiteral(s) => Cow::Owned(format!("0x{s}")),
        other => Cow::Owned(other.to_string()),
    }
}
