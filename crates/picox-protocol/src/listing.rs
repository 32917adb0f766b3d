//! Directory listing literal parser.
//!
//! `os.listdir()` is evaluated at the REPL, so the board answers with the
//! Python literal form of a list of strings, e.g. `['a.py', 'b.txt']`.

use std::iter::Peekable;
use std::str::Chars;

use crate::error::{ProtocolError, ProtocolResult};

/// Command that lists the board's current directory.
pub const LIST_ROOT_COMMAND: &str = "import os; os.listdir()";

/// Build the listing command for a directory (`None` for the current one).
pub fn listing_command(path: Option<&str>) -> String {
    match path {
        None => LIST_ROOT_COMMAND.to_string(),
        Some(path) => format!("import os; os.listdir('{}')", path),
    }
}

/// Parse the textual form of a list of strings.
///
/// The text must start with `[` and end with `]`. Both quote styles and the
/// usual backslash escapes are accepted.
pub fn parse_listing(text: &str) -> ProtocolResult<Vec<String>> {
    let text = text.trim();
    if !(text.starts_with('[') && text.ends_with(']')) {
        return Err(unexpected(format!(
            "directory listing is not a list: {:?}",
            text
        )));
    }

    let mut chars = text[1..text.len() - 1].chars().peekable();
    let mut names = Vec::new();

    loop {
        skip_whitespace(&mut chars);
        let Some(quote) = chars.next() else {
            break;
        };
        if quote != '\'' && quote != '"' {
            return Err(unexpected(format!(
                "expected a string in directory listing, found {:?}",
                quote
            )));
        }
        names.push(parse_string(&mut chars, quote)?);

        skip_whitespace(&mut chars);
        match chars.next() {
            None => break,
            Some(',') => continue,
            Some(other) => {
                return Err(unexpected(format!(
                    "expected ',' in directory listing, found {:?}",
                    other
                )))
            }
        }
    }

    Ok(names)
}

fn unexpected(message: String) -> ProtocolError {
    ProtocolError::UnexpectedFormat(message)
}

fn skip_whitespace(chars: &mut Peekable<Chars<'_>>) {
    while chars.peek().is_some_and(|c| c.is_whitespace()) {
        chars.next();
    }
}

/// Parse the body of a string literal; the opening quote is already consumed.
fn parse_string(chars: &mut Peekable<Chars<'_>>, quote: char) -> ProtocolResult<String> {
    let mut value = String::new();
    loop {
        match chars.next() {
            None => return Err(unexpected("unterminated string in directory listing".into())),
            Some(c) if c == quote => return Ok(value),
            Some('\\') => parse_escape(chars, &mut value)?,
            Some(c) => value.push(c),
        }
    }
}

fn parse_escape(chars: &mut Peekable<Chars<'_>>, value: &mut String) -> ProtocolResult<()> {
    let Some(c) = chars.next() else {
        return Err(unexpected("dangling escape in directory listing".into()));
    };
    match c {
        '\\' | '\'' | '"' => value.push(c),
        'n' => value.push('\n'),
        'r' => value.push('\r'),
        't' => value.push('\t'),
        '0' => value.push('\0'),
        'a' => value.push('\x07'),
        'b' => value.push('\x08'),
        'f' => value.push('\x0c'),
        'v' => value.push('\x0b'),
        'x' => value.push(parse_hex_escape(chars, 2)?),
        'u' => value.push(parse_hex_escape(chars, 4)?),
        'U' => value.push(parse_hex_escape(chars, 8)?),
        other => {
            // Unknown escapes keep their backslash, as in Python.
            value.push('\\');
            value.push(other);
        }
    }
    Ok(())
}

fn parse_hex_escape(chars: &mut Peekable<Chars<'_>>, digits: usize) -> ProtocolResult<char> {
    let hex: String = chars.by_ref().take(digits).collect();
    if hex.len() != digits {
        return Err(unexpected(format!("truncated escape {:?}", hex)));
    }
    u32::from_str_radix(&hex, 16)
        .ok()
        .and_then(char::from_u32)
        .ok_or_else(|| unexpected(format!("invalid escape value {:?}", hex)))
}
