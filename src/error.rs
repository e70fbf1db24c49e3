//! Error types and position tracking for configuration parsing
//!
//! Every layer of the pipeline has its own error enum: the tokenizer
//! produces [`LexError`], the tree builder [`ParseError`], the site
//! splitter [`StructureError`]. [`NgxError`] ties them together with the
//! I/O and YAML failures of the batch driver.

use std::fmt;
use std::path::PathBuf;
use thiserror::Error;

/// Represents a position in the source text
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct Position {
    /// Line number (1-based)
    pub line: usize,
    /// Column number (1-based, counted in characters)
    pub column: usize,
}

impl Position {
    /// Creates a new position at the start of input
    pub fn new() -> Self {
        Self { line: 1, column: 1 }
    }

    /// Advances the position by one character
    pub fn advance(&mut self, c: char) {
        match c {
            '\n' => {
                self.line += 1;
                self.column = 1;
            }
            '\r' => {
                self.column = 1;
            }
            _ => {
                self.column += 1;
            }
        }
    }

    /// Returns this position moved onto `line`, keeping the column
    pub fn on_line(self, line: usize) -> Self {
        Self { line, ..self }
    }
}

impl Default for Position {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Display for Position {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}:{}", self.line, self.column)
    }
}

/// Tokenization errors
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum LexError {
    /// Quoted string not closed before the end of the line
    #[error("Unterminated {quote} quote at {position}")]
    UnterminatedQuote { quote: char, position: Position },

    /// Parenthesized expression without a closing parenthesis
    #[error("Unmatched parenthesis at {position}")]
    UnmatchedParenthesis { position: Position },
}

impl LexError {
    /// Returns the position the error was reported at
    pub fn position(&self) -> Position {
        match self {
            LexError::UnterminatedQuote { position, .. } => *position,
            LexError::UnmatchedParenthesis { position } => *position,
        }
    }

    /// Rebinds the error onto a line of the source file
    pub fn on_line(self, line: usize) -> Self {
        match self {
            LexError::UnterminatedQuote { quote, position } => LexError::UnterminatedQuote {
                quote,
                position: position.on_line(line),
            },
            LexError::UnmatchedParenthesis { position } => LexError::UnmatchedParenthesis {
                position: position.on_line(line),
            },
        }
    }
}

/// Context tree building errors
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ParseError {
    /// Tokenizer failure on a statement line
    #[error("Tokenization error: {0}")]
    Lex(#[from] LexError),

    /// Line does not end in `;`, `{` or `}`
    #[error("Line wrapping not supported at line {line}, fix it:\n{text}")]
    UnsupportedLine { line: usize, text: String },

    /// Closing brace with no open context
    #[error("Unbalanced '}}' at line {line}: no context is open")]
    UnbalancedClose { line: usize },

    /// End of input reached with contexts still open
    #[error("Unexpected end of input: context '{context}' opened at line {line} is never closed")]
    UnclosedContext { context: String, line: usize },

    /// Statement line with no name token
    #[error("Statement without a name at line {line}")]
    MissingName { line: usize },
}

impl ParseError {
    /// Returns the source line the error refers to
    pub fn line(&self) -> usize {
        match self {
            ParseError::Lex(e) => e.position().line,
            ParseError::UnsupportedLine { line, .. }
            | ParseError::UnbalancedClose { line }
            | ParseError::UnclosedContext { line, .. }
            | ParseError::MissingName { line } => *line,
        }
    }
}

/// Errors raised when the serialized tree lacks the expected shape
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum StructureError {
    /// Root mapping has no `servers` key
    #[error("No 'servers' found in the http context")]
    MissingServers,

    /// `servers` holds something other than a list
    #[error("Expected 'servers' to be a list, found {found}")]
    ServersNotList { found: &'static str },

    /// Site document without its `site` key
    #[error("Document has no 'site' key")]
    MissingSite,

    /// Stream document is neither a site nor a root mapping
    #[error("Expected a mapping document, found {found}")]
    NotAMapping { found: &'static str },
}

/// Main error type for conversion operations
#[derive(Debug, Error)]
pub enum NgxError {
    /// Parsing error in a configuration file
    #[error("{}: {source}", .path.display())]
    Parse {
        path: PathBuf,
        #[source]
        source: ParseError,
    },

    /// Serialized tree lacks the expected structure
    #[error("{}: {source}", .path.display())]
    Structure {
        path: PathBuf,
        #[source]
        source: StructureError,
    },

    /// YAML encoding or decoding error
    #[error("YAML error: {0}")]
    Yaml(#[from] serde_yaml::Error),

    /// I/O error with the path involved
    #[error("{}: {source}", .path.display())]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
}

impl NgxError {
    pub(crate) fn io(path: impl Into<PathBuf>, source: std::io::Error) -> Self {
        NgxError::Io {
            path: path.into(),
            source,
        }
    }
}

/// Result alias for conversion operations
pub type Result<T, E = NgxError> = std::result::Result<T, E>;
