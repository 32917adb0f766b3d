//! Minimal Python lexer.
//!
//! Only tells comments, string literals and line breaks apart from the rest
//! of the source. That is enough to strip comments without touching `#`
//! inside strings, and to find f-strings whose braces need escaping.

use crate::error::{CompileError, CompileResult};

/// Characters allowed in a string prefix (`f"..."`, `rb'...'`, ...).
const STRING_PREFIX_CHARS: &str = "rRbBfFuU";

/// Kind of a lexical token.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TokenKind {
    /// `#` up to the end of the line.
    Comment,
    /// A string literal, prefix and quotes included.
    String,
    /// `\n` or `\r\n`.
    Newline,
    /// Anything else: a name, a number or a single punctuation character.
    Other,
}

/// Location of a token boundary.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Position {
    /// Line number, 1-based.
    pub line: usize,
    /// Column in characters, 0-based.
    pub column: usize,
    /// Byte offset into the source.
    pub offset: usize,
}

/// A token borrowed from the source text.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Token<'a> {
    pub kind: TokenKind,
    pub text: &'a str,
    pub start: Position,
    pub end: Position,
}

impl Token<'_> {
    /// Check if this token is an f-string literal.
    pub fn is_format_string(&self) -> bool {
        self.kind == TokenKind::String
            && self
                .text
                .chars()
                .take_while(|c| *c != '\'' && *c != '"')
                .any(|c| c == 'f' || c == 'F')
    }
}

/// Iterator over the tokens of a source string.
///
/// Horizontal whitespace is skipped; token positions keep the layout.
pub struct Lexer<'a> {
    src: &'a str,
    offset: usize,
    line: usize,
    column: usize,
}

impl<'a> Lexer<'a> {
    /// Create a lexer over `src`.
    pub fn new(src: &'a str) -> Self {
        Lexer {
            src,
            offset: 0,
            line: 1,
            column: 0,
        }
    }

    fn pos(&self) -> Position {
        Position {
            line: self.line,
            column: self.column,
            offset: self.offset,
        }
    }

    fn rest(&self) -> &'a str {
        &self.src[self.offset..]
    }

    fn peek(&self) -> Option<char> {
        self.rest().chars().next()
    }

    fn peek_nth(&self, n: usize) -> Option<char> {
        self.rest().chars().nth(n)
    }

    fn bump(&mut self) -> Option<char> {
        let c = self.peek()?;
        self.offset += c.len_utf8();
        if c == '\n' {
            self.line += 1;
            self.column = 0;
        } else {
            self.column += 1;
        }
        Some(c)
    }

    /// Length of a string prefix at the current position, if a string
    /// literal starts here.
    fn string_prefix_len(&self) -> Option<usize> {
        let rest = self.rest();
        let prefix_len = rest
            .chars()
            .take_while(|c| STRING_PREFIX_CHARS.contains(*c))
            .take(3)
            .count();
        if prefix_len > 2 {
            return None;
        }
        match rest[prefix_len..].chars().next() {
            Some('\'' | '"') => Some(prefix_len),
            _ => None,
        }
    }

    fn lex_string(&mut self, prefix_len: usize, start: Position) -> CompileResult<()> {
        for _ in 0..prefix_len {
            self.bump();
        }
        let unterminated = || CompileError::UnterminatedString {
            line: start.line,
            column: start.column,
        };
        let quote = self.bump().ok_or_else(unterminated)?;
        let triple = self.peek() == Some(quote) && self.peek_nth(1) == Some(quote);
        if triple {
            self.bump();
            self.bump();
        }

        loop {
            match self.bump() {
                None => return Err(unterminated()),
                Some('\\') => {
                    // Escaped character, or a line continuation.
                    self.bump();
                }
                Some(c) if c == quote => {
                    if !triple {
                        return Ok(());
                    }
                    if self.peek() == Some(quote) && self.peek_nth(1) == Some(quote) {
                        self.bump();
                        self.bump();
                        return Ok(());
                    }
                }
                Some('\n') if !triple => return Err(unterminated()),
                Some(_) => {}
            }
        }
    }

    fn lex_other(&mut self) {
        let is_word = |c: char| c.is_alphanumeric() || c == '_';
        if let Some(first) = self.bump() {
            if is_word(first) {
                while self.peek().is_some_and(is_word) {
                    self.bump();
                }
            }
        }
    }

    fn next_token(&mut self) -> Option<CompileResult<Token<'a>>> {
        while matches!(self.peek(), Some(' ' | '\t' | '\x0c')) {
            self.bump();
        }

        let start = self.pos();
        let kind = match self.peek()? {
            '\n' => {
                self.bump();
                TokenKind::Newline
            }
            '\r' => {
                self.bump();
                if self.peek() == Some('\n') {
                    self.bump();
                }
                TokenKind::Newline
            }
            '#' => {
                while !matches!(self.peek(), None | Some('\r' | '\n')) {
                    self.bump();
                }
                TokenKind::Comment
            }
            _ => match self.string_prefix_len() {
                Some(prefix_len) => {
                    if let Err(e) = self.lex_string(prefix_len, start) {
                        // Stop after the first error.
                        self.offset = self.src.len();
                        return Some(Err(e));
                    }
                    TokenKind::String
                }
                None => {
                    self.lex_other();
                    TokenKind::Other
                }
            },
        };

        let end = self.pos();
        Some(Ok(Token {
            kind,
            text: &self.src[start.offset..end.offset],
            start,
            end,
        }))
    }
}

impl<'a> Iterator for Lexer<'a> {
    type Item = CompileResult<Token<'a>>;

    fn next(&mut self) -> Option<Self::Item> {
        self.next_token()
    }
}

/// Tokenize a whole source string.
pub fn tokenize(src: &str) -> CompileResult<Vec<Token<'_>>> {
    Lexer::new(src).collect()
}
