//! Line tokenizer
//!
//! Splits a single statement line (terminator already removed) into
//! tokens. Quoted strings and parenthesized expressions are atomic;
//! everything else is cut at whitespace and quote characters.

use crate::error::{LexError, Position};

/// How a token was written in the source
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TokenKind {
    /// `'...'`
    SingleQuoted,
    /// `"..."`
    DoubleQuoted,
    /// `(...)`, as used by `if` conditions
    Parenthesized,
    /// Unquoted run of non-whitespace characters
    Bare,
}

/// A token borrowed from the line it was read from
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Token<'a> {
    /// Classification of the token
    pub kind: TokenKind,
    /// Text as written, quotes included
    pub raw: &'a str,
    /// Literal value: quotes stripped, parentheses kept
    pub value: &'a str,
    /// Where the token starts within its line
    pub position: Position,
}

impl<'a> Token<'a> {
    /// Returns true for single or double quoted tokens
    pub fn is_quoted(&self) -> bool {
        matches!(self.kind, TokenKind::SingleQuoted | TokenKind::DoubleQuoted)
    }
}

/// Tokenizer over one statement line
#[derive(Debug, Clone)]
pub struct LineLexer<'a> {
    /// Line being tokenized
    input: &'a str,
    /// Current byte offset in `input`
    offset: usize,
    /// Current position, for diagnostics
    position: Position,
}

impl<'a> LineLexer<'a> {
    /// Creates a lexer for the given line
    pub fn new(input: &'a str) -> Self {
        Self {
            input,
            offset: 0,
            position: Position::new(),
        }
    }

    /// Peeks at the current character without consuming it
    #[inline]
    pub fn peek_char(&self) -> Option<char> {
        self.input[self.offset..].chars().next()
    }

    /// Consumes and returns the current character
    pub fn advance(&mut self) -> Option<char> {
        let c = self.peek_char()?;
        self.offset += c.len_utf8();
        self.position.advance(c);
        Some(c)
    }

    /// Skips over whitespace
    pub fn skip_whitespace(&mut self) {
        while matches!(self.peek_char(), Some(c) if c.is_whitespace()) {
            self.advance();
        }
    }

    /// Returns the next token, or `None` at the end of the line
    pub fn next_token(&mut self) -> Result<Option<Token<'a>>, LexError> {
        self.skip_whitespace();

        let Some(c) = self.peek_char() else {
            return Ok(None);
        };

        let token = match c {
            '\'' => self.lex_quoted('\'', TokenKind::SingleQuoted)?,
            '"' => self.lex_quoted('"', TokenKind::DoubleQuoted)?,
            '(' if self.has_parenthesized_group() => self.lex_parenthesized()?,
            _ => self.lex_bare(),
        };
        Ok(Some(token))
    }

    fn lex_quoted(&mut self, quote: char, kind: TokenKind) -> Result<Token<'a>, LexError> {
        let position = self.position;
        let start = self.offset;
        self.advance();

        let content_start = self.offset;
        loop {
            match self.advance() {
                Some(c) if c == quote => break,
                Some(_) => {}
                None => return Err(LexError::UnterminatedQuote { quote, position }),
            }
        }

        Ok(Token {
            kind,
            raw: &self.input[start..self.offset],
            value: &self.input[content_start..self.offset - quote.len_utf8()],
            position,
        })
    }

    /// `()` reads as a bare word; anything longer opens a group
    fn has_parenthesized_group(&self) -> bool {
        !self.input[self.offset..].starts_with("()")
    }

    fn lex_parenthesized(&mut self) -> Result<Token<'a>, LexError> {
        let position = self.position;
        let start = self.offset;
        self.advance();

        loop {
            match self.advance() {
                Some(')') => break,
                Some(_) => {}
                None => return Err(LexError::UnmatchedParenthesis { position }),
            }
        }

        let text = &self.input[start..self.offset];
        Ok(Token {
            kind: TokenKind::Parenthesized,
            raw: text,
            value: text,
            position,
        })
    }

    fn lex_bare(&mut self) -> Token<'a> {
        let position = self.position;
        let start = self.offset;
        while let Some(c) = self.peek_char() {
            if c.is_whitespace() || c == '\'' || c == '"' {
                break;
            }
            self.advance();
        }

        let text = &self.input[start..self.offset];
        Token {
            kind: TokenKind::Bare,
            raw: text,
            value: text,
            position,
        }
    }
}

/// Tokenizes a whole line
pub fn tokenize(line: &str) -> Result<Vec<Token<'_>>, LexError> {
    let mut lexer = LineLexer::new(line);
    let mut tokens = Vec::new();
    while let Some(token) = lexer.next_token()? {
        tokens.push(token);
    }
    Ok(tokens)
}
