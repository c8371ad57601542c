use tracing::debug;

use crate::diagnostics::Diagnostic;
use crate::lexer::Scanner;
use crate::token::{Token, TokenKind};

/// The comment-free token sequence handed from the scanner to the
/// validator and the IR generator. Indices of appended tokens never move.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct TokenStream {
    tokens: Vec<Token>,
}

impl TokenStream {
    pub fn new() -> Self {
        Self::default()
    }

    /// Drain `scanner` into a stream. Comments are dropped; the first error
    /// token aborts with its diagnostic. `on_token` sees every scanned token,
    /// comments and the error included, in source order.
    pub fn scan(
        scanner: &mut Scanner<'_>,
        mut on_token: impl FnMut(&Token),
    ) -> Result<Self, Diagnostic> {
        let mut stream = Self::new();
        for token in scanner.by_ref() {
            on_token(&token);
            match token.kind {
                TokenKind::Comment => {}
                TokenKind::Error(error) => {
                    debug!(
                        line = token.line,
                        column = token.column,
                        "scanner stopped on error token"
                    );
                    return Err(Diagnostic::at(error.message(), &token));
                }
                _ => stream.push(token),
            }
        }
        debug!(tokens = stream.len(), "token stream ready");
        Ok(stream)
    }

    pub fn from_source(input: &str) -> Result<Self, Diagnostic> {
        Self::scan(&mut Scanner::new(input), |_| {})
    }

    pub fn push(&mut self, token: Token) {
        self.tokens.push(token);
    }

    pub fn get(&self, index: usize) -> Option<&Token> {
        self.tokens.get(index)
    }

    pub fn len(&self) -> usize {
        self.tokens.len()
    }

    pub fn is_empty(&self) -> bool {
        self.tokens.is_empty()
    }

    pub fn last(&self) -> Option<&Token> {
        self.tokens.last()
    }

    pub fn iter(&self) -> impl Iterator<Item = &Token> {
        self.tokens.iter()
    }

    pub fn as_slice(&self) -> &[Token] {
        &self.tokens
    }
}

impl FromIterator<Token> for TokenStream {
    fn from_iter<I: IntoIterator<Item = Token>>(iter: I) -> Self {
        Self {
            tokens: iter.into_iter().collect(),
        }
    }
}
