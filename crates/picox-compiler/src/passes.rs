//! The compile pipeline, one function per step.
//!
//! Order matters: comments go first so later steps never see them, braces
//! are escaped while the source still has its line structure, and quotes are
//! escaped only after folding has produced the single line.

use picox_protocol::FAILURE_MARKER;

use crate::error::CompileResult;
use crate::lexer::{Lexer, TokenKind};

/// Indentation added to every folded line so it sits inside the `try:` block.
const INDENT: &str = "    ";

/// Escaped line break separating folded lines.
const FOLDED_NEWLINE: &str = "\\n";

/// Remove comments, keeping every other token at its original column.
///
/// Whitespace between tokens is re-created as spaces. Lines that held only a
/// comment become empty lines.
pub fn strip_comments(source: &str) -> CompileResult<String> {
    let mut out = String::with_capacity(source.len());
    let mut last_line = 1;
    let mut last_column = 0;

    for token in Lexer::new(source) {
        let token = token?;
        match token.kind {
            TokenKind::Comment => continue,
            TokenKind::Newline => out.push_str(token.text),
            TokenKind::String | TokenKind::Other => {
                if token.start.line > last_line {
                    last_column = 0;
                }
                if token.start.column > last_column {
                    out.extend(std::iter::repeat(' ').take(token.start.column - last_column));
                }
                out.push_str(token.text);
            }
        }
        last_line = token.end.line;
        last_column = token.end.column;
    }

    Ok(out)
}

/// Double lone `{` and `}` inside f-string literals.
///
/// Compiled commands are themselves templates, so literal braces must be
/// written as `{{`/`}}` to survive rendering. Braces that are already
/// doubled are left alone.
pub fn escape_format_braces(source: &str) -> CompileResult<String> {
    let mut out = String::with_capacity(source.len());
    let mut copied = 0;

    for token in Lexer::new(source) {
        let token = token?;
        if token.is_format_string() {
            out.push_str(&source[copied..token.start.offset]);
            out.push_str(&double_lone_braces(token.text));
            copied = token.end.offset;
        }
    }
    out.push_str(&source[copied..]);

    Ok(out)
}

fn double_lone_braces(text: &str) -> String {
    let chars: Vec<char> = text.chars().collect();
    let mut out = String::with_capacity(text.len() + 8);
    for (i, &c) in chars.iter().enumerate() {
        out.push(c);
        if c == '{' || c == '}' {
            let paired_before = i > 0 && chars[i - 1] == c;
            let paired_after = chars.get(i + 1) == Some(&c);
            if !paired_before && !paired_after {
                out.push(c);
            }
        }
    }
    out
}

/// Fold the source into one line.
///
/// Each non-blank line is indented once and followed by an escaped `\n`.
/// Backslashes are doubled so the remote `exec` sees them unchanged.
pub fn fold_lines(source: &str) -> String {
    source
        .split('\n')
        .map(|line| line.strip_suffix('\r').unwrap_or(line))
        .filter(|line| !line.trim().is_empty())
        .map(|line| format!("{}{}{}", INDENT, line.replace('\\', "\\\\"), FOLDED_NEWLINE))
        .collect()
}

/// Escape quote characters so the line can sit inside a quoted string.
pub fn escape_quotes(line: &str) -> String {
    line.replace('"', "\\\"").replace('\'', "\\'")
}

/// Wrap the body in a `try`/`except` that reports failures with the
/// shared failure marker.
pub fn wrap_failure(body: &str) -> String {
    format!(
        "try:\\n{}\\nexcept Exception as e:\\n    print(f\\\"{{{{str(e)}}}}{}\\\")",
        body, FAILURE_MARKER
    )
}

/// Wrap the escaped body in a single `exec` call.
pub fn wrap_exec(body: &str) -> String {
    format!("exec('{}')", body)
}

/// Run the whole pipeline on a template source.
pub fn compile_source(source: &str) -> CompileResult<String> {
    let stripped = strip_comments(source)?;
    let escaped = escape_format_braces(&stripped)?;
    let folded = fold_lines(&escaped);
    let quoted = escape_quotes(&folded);
    Ok(wrap_exec(&wrap_failure(&quoted)))
}
