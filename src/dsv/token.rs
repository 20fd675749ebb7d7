//! Token values of a DSV line and the quoting rule.

use std::fmt;

use crate::config::DsvConfig;

/// One value of a delimiter-separated line.
#[derive(Clone, Debug, PartialEq)]
pub enum Token {
    /// A token made of digits only.
    Int(i64),
    /// Any other token that reads as a finite number.
    Float(f64),
    Text(String),
}

impl Token {
    /// Coerces raw text into the narrowest token type.
    ///
    /// All-digit text becomes [`Token::Int`], other numeric text becomes
    /// [`Token::Float`], and everything else stays [`Token::Text`].
    pub fn parse(raw: &str) -> Token {
        if !raw.is_empty() && raw.bytes().all(|b| b.is_ascii_digit()) {
            if let Ok(value) = raw.parse::<i64>() {
                return Token::Int(value);
            }
        }
        match raw.parse::<f64>() {
            Ok(value) if value.is_finite() => Token::Float(value),
            _ => Token::Text(raw.to_string()),
        }
    }

    /// The numeric value of this token, if it has one.
    pub fn as_f64(&self) -> Option<f64> {
        match self {
            Token::Int(value) => Some(*value as f64),
            Token::Float(value) => Some(*value),
            Token::Text(_) => None,
        }
    }
}

impl fmt::Display for Token {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Token::Int(value) => write!(f, "{}", value),
            Token::Float(value) => write!(f, "{}", value),
            Token::Text(value) => f.write_str(value),
        }
    }
}

impl From<f64> for Token {
    fn from(value: f64) -> Self {
        Token::Float(value)
    }
}

/// Wraps `value` in the quote character when quoting is enabled and the
/// trimmed value contains a space, a delimiter or the line terminator.
pub fn quote_if_necessary(value: &str, config: &DsvConfig) -> String {
    if !config.quoting {
        return value.to_string();
    }

    let value = value.trim();
    let contains = |needle: &str| !needle.is_empty() && value.contains(needle);
    if contains(" ")
        || contains(&config.delimiter)
        || contains(&config.line_terminator)
        || contains(&config.annotation_delimiter)
    {
        format!("{q}{value}{q}", q = config.quote_char)
    } else {
        value.to_string()
    }
}

/// Strips one surrounding pair of quote characters when quoting is enabled.
pub fn unquote<'a>(value: &'a str, config: &DsvConfig) -> &'a str {
    let q = config.quote_char.as_str();
    if !config.quoting || q.is_empty() {
        return value;
    }
    value
        .strip_prefix(q)
        .and_then(|inner| inner.strip_suffix(q))
        .unwrap_or(value)
}

/// Byte offsets of every `separator` in `text` that is not inside a quoted
/// run. Quotes only count when quoting is enabled.
fn separator_offsets(text: &str, separator: &str, config: &DsvConfig) -> Vec<usize> {
    let quote = config.quote_char.as_str();
    let quoting = config.quoting && !quote.is_empty();
    let mut offsets = Vec::new();
    if separator.is_empty() {
        return offsets;
    }

    let mut in_quotes = false;
    let mut i = 0;
    while let Some(rest) = text.get(i..).filter(|rest| !rest.is_empty()) {
        if quoting && rest.starts_with(quote) {
            in_quotes = !in_quotes;
            i += quote.len();
        } else if !in_quotes && rest.starts_with(separator) {
            offsets.push(i);
            i += separator.len();
        } else {
            i += rest.chars().next().map_or(1, char::len_utf8);
        }
    }
    offsets
}

/// Splits `text` on `separator`, leaving separators inside quotes alone.
///
/// Always yields at least one piece.
pub fn split_unquoted<'a>(text: &'a str, separator: &str, config: &DsvConfig) -> Vec<&'a str> {
    let mut pieces = Vec::new();
    let mut start = 0;
    for offset in separator_offsets(text, separator, config) {
        pieces.push(&text[start..offset]);
        start = offset + separator.len();
    }
    pieces.push(&text[start..]);
    pieces
}

/// Like [`str::split_once`], skipping quoted separators.
pub fn split_once_unquoted<'a>(
    text: &'a str,
    separator: &str,
    config: &DsvConfig,
) -> Option<(&'a str, &'a str)> {
    let offset = *separator_offsets(text, separator, config).first()?;
    Some((&text[..offset], &text[offset + separator.len()..]))
}

/// Like [`str::rsplit_once`], skipping quoted separators.
pub fn rsplit_once_unquoted<'a>(
    text: &'a str,
    separator: &str,
    config: &DsvConfig,
) -> Option<(&'a str, &'a str)> {
    let offset = *separator_offsets(text, separator, config).last()?;
    Some((&text[..offset], &text[offset + separator.len()..]))
}
