//! Line tokenizer for the declaration dialect.

use crate::error::{DeclwrapError, Result};

/// A token on a single declaration line.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Token<'a> {
    Ident(&'a str),
    /// Content of a double-quoted alias, without the quotes.
    Alias(&'a str),
    Star,
    LParen,
    RParen,
    Comma,
    Colon,
    /// Content of a `[...]` group, trimmed.
    Array(&'a str),
    Ellipsis,
    /// A lone `-`, `+` or `?`, as found in `except? -1` annotations.
    Symbol(&'a str),
}

impl Token<'_> {
    pub fn describe(&self) -> String {
        match self {
            Token::Ident(s) => format!("identifier '{s}'"),
            Token::Alias(s) => format!("alias \"{s}\""),
            Token::Star => "'*'".to_string(),
            Token::LParen => "'('".to_string(),
            Token::RParen => "')'".to_string(),
            Token::Comma => "','".to_string(),
            Token::Colon => "':'".to_string(),
            Token::Array(s) => format!("'[{s}]'"),
            Token::Ellipsis => "'...'".to_string(),
            Token::Symbol(s) => format!("'{s}'"),
        }
    }
}

/// Width of the leading whitespace, counting a tab as four columns.
pub fn indent_of(text: &str) -> usize {
    text.chars()
        .take_while(|c| c.is_whitespace())
        .map(|c| if c == '\t' { 4 } else { 1 })
        .sum()
}

/// Whether the line holds nothing but whitespace.
pub fn is_blank(text: &str) -> bool {
    text.trim().is_empty()
}

/// Whether the line holds only a `#` comment.
pub fn is_comment(text: &str) -> bool {
    text.trim_start().starts_with('#')
}

/// Tokenize one line. `line` is only used in error messages.
///
/// A `#` outside a quoted alias ends the line.
pub fn tokenize(line: usize, text: &str) -> Result<Vec<Token<'_>>> {
    let bytes = text.as_bytes();
    let mut tokens = Vec::new();
    let mut pos = 0;

    while pos < bytes.len() {
        let c = bytes[pos];
        match c {
            b' ' | b'\t' | b'\r' => pos += 1,
            b'#' => break,
            b'*' => {
                tokens.push(Token::Star);
                pos += 1;
            }
            b'(' => {
                tokens.push(Token::LParen);
                pos += 1;
            }
            b')' => {
                tokens.push(Token::RParen);
                pos += 1;
            }
            b',' => {
                tokens.push(Token::Comma);
                pos += 1;
            }
            b':' => {
                tokens.push(Token::Colon);
                pos += 1;
            }
            b'"' => {
                let start = pos + 1;
                let end = text[start..]
                    .find('"')
                    .map(|off| start + off)
                    .ok_or_else(|| parse_error(line, "unterminated alias"))?;
                tokens.push(Token::Alias(&text[start..end]));
                pos = end + 1;
            }
            b'[' => {
                let start = pos + 1;
                let end = text[start..]
                    .find(']')
                    .map(|off| start + off)
                    .ok_or_else(|| parse_error(line, "unterminated '['"))?;
                tokens.push(Token::Array(text[start..end].trim()));
                pos = end + 1;
            }
            b'.' if text[pos..].starts_with("...") => {
                tokens.push(Token::Ellipsis);
                pos += 3;
            }
            b'-' | b'+' | b'?' => {
                tokens.push(Token::Symbol(&text[pos..pos + 1]));
                pos += 1;
            }
            c if c.is_ascii_alphanumeric() || c == b'_' => {
                let start = pos;
                while pos < bytes.len() && (bytes[pos].is_ascii_alphanumeric() || bytes[pos] == b'_') {
                    pos += 1;
                }
                tokens.push(Token::Ident(&text[start..pos]));
            }
            _ => {
                let ch = text[pos..].chars().next().unwrap_or('?');
                return Err(parse_error(line, &format!("unexpected character '{ch}'")));
            }
        }
    }

    Ok(tokens)
}

fn parse_error(line: usize, detail: &str) -> DeclwrapError {
    DeclwrapError::Parse {
        line,
        detail: detail.to_string(),
    }
}
