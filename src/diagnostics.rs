use std::fmt;
use std::path::PathBuf;

use thiserror::Error;

use crate::token::Token;

pub const MAX_CONTEXT_LEN: usize = 512;

/// Longest lexeme, in bytes, the scanner produces for any token.
pub const MAX_LEXEME_LEN: usize = 256;

/// One positioned error record, shared by the scanner and the validator.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Diagnostic {
    pub message: &'static str,
    pub line: usize,
    pub column: usize,
    pub context: String,
}

impl Diagnostic {
    pub fn new(message: &'static str, line: usize, column: usize, context: &str) -> Self {
        Self {
            message,
            line,
            column,
            context: context.chars().take(MAX_CONTEXT_LEN).collect(),
        }
    }

    /// Anchor a diagnostic at `token`, quoting its lexeme.
    pub fn at(message: &'static str, token: &Token) -> Self {
        Self::new(message, token.line, token.column, &token.lexeme)
    }
}

impl fmt::Display for Diagnostic {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "line {}, column {}: {} near '{}'",
            self.line, self.column, self.message, self.context
        )
    }
}

/// The error slot of a single stage within one run. Empty means the stage
/// has not failed.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ErrorSlot(Option<Diagnostic>);

impl ErrorSlot {
    pub fn new() -> Self {
        Self(None)
    }

    pub fn set(&mut self, diagnostic: Diagnostic) {
        self.0 = Some(diagnostic);
    }

    pub fn clear(&mut self) {
        self.0 = None;
    }

    pub fn get(&self) -> Option<&Diagnostic> {
        self.0.as_ref()
    }

    pub fn is_set(&self) -> bool {
        self.0.is_some()
    }

    pub fn take(&mut self) -> Option<Diagnostic> {
        self.0.take()
    }
}

#[derive(Debug, Error)]
pub enum CompileError {
    /// Input or schema file could not be read.
    #[error("cannot read '{}': {source}", .path.display())]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("lexical error at {0}")]
    Lexical(Diagnostic),

    #[error("syntax error at {0}")]
    Syntax(Diagnostic),

    #[error("invalid schema at {0}")]
    Schema(Diagnostic),

    #[error("semantic analysis failed: {}", .0.join("; "))]
    Semantic(Vec<String>),
}

pub type Result<T> = std::result::Result<T, CompileError>;
