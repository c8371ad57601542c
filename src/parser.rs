//! Recursive-descent validator for the supported `SELECT` grammar.
//!
//! ```text
//! statement       := SELECT [DISTINCT] projection_list FROM table_ref
//!                    {join_clause} [where_clause] [group_by] [having] [order_by] ";"
//! projection_item := (aggregate_call | column | "*") [AS identifier]
//! aggregate_call  := AGG "(" [DISTINCT] (column | "*") ")"
//! join_clause     := JOIN identifier ON condition
//! where_clause    := WHERE condition
//! condition       := term {(AND | OR) term}
//! term            := column (operator value | BETWEEN value AND value)
//! group_by        := GROUP BY column {"," column}
//! having          := HAVING <tokens until ORDER or ";">
//! order_by        := ORDER BY column [ASC | DESC] {"," column [ASC | DESC]}
//! column          := identifier ["." identifier]
//! ```
//!
//! The validator walks the token stream with a plain index and stops at the
//! first violated expectation. Each clause keyword selects exactly one
//! production, so there is no backtracking.

use tracing::debug;

use crate::config::SemicolonPolicy;
use crate::diagnostics::Diagnostic;
use crate::stream::TokenStream;
use crate::token::{Keyword, Token, TokenKind};

type Step = Result<(), Diagnostic>;

pub struct Validator<'a> {
    tokens: &'a TokenStream,
    current: usize,
    policy: SemicolonPolicy,
}

impl<'a> Validator<'a> {
    pub fn new(tokens: &'a TokenStream, policy: SemicolonPolicy) -> Self {
        Self {
            tokens,
            current: 0,
            policy,
        }
    }

    pub fn cursor(&self) -> usize {
        self.current
    }

    /// Validate every statement in the stream. Returns the number of
    /// statements accepted; on success the cursor equals the stream length.
    pub fn validate(&mut self) -> Result<usize, Diagnostic> {
        let mut statements = 0;

        while let Some(token) = self.peek() {
            match token.kind {
                TokenKind::EndOfInput if statements > 0 => self.current += 1,
                TokenKind::Keyword(Keyword::Select) => {
                    self.statement()?;
                    statements += 1;
                    debug!(statements, cursor = self.current, "statement validated");
                }
                TokenKind::Keyword(_) => return Err(self.error("Unsupported SQL statement")),
                _ => return Err(self.error("Expected SQL statement")),
            }
        }

        if statements == 0 {
            return Err(self.error("Expected SQL statement"));
        }
        Ok(statements)
    }

    fn peek(&self) -> Option<&'a Token> {
        self.tokens.get(self.current)
    }

    fn peek_keyword(&self) -> Option<Keyword> {
        self.peek().and_then(Token::keyword)
    }

    fn at_keyword(&self, kw: Keyword) -> bool {
        self.peek_keyword() == Some(kw)
    }

    fn at_punct(&self, text: &str) -> bool {
        self.peek().is_some_and(|t| t.is_punct(text))
    }

    fn bump(&mut self) {
        self.current += 1;
    }

    /// Build a diagnostic at the current token, or at the last consumed
    /// token once the cursor has run past the end of the stream. At
    /// `EndOfInput` the position stays on it but the context quotes the
    /// token before it.
    fn error(&self, message: &'static str) -> Diagnostic {
        let previous = self.current.checked_sub(1).and_then(|i| self.tokens.get(i));
        match (self.peek(), previous) {
            (Some(eof), Some(previous)) if eof.kind == TokenKind::EndOfInput => {
                Diagnostic::new(message, eof.line, eof.column, &previous.lexeme)
            }
            (Some(token), _) => Diagnostic::at(message, token),
            (None, Some(previous)) => Diagnostic::at(message, previous),
            (None, None) => Diagnostic::new(message, 1, 1, ""),
        }
    }

    fn expect_keyword(&mut self, kw: Keyword, message: &'static str) -> Step {
        if self.at_keyword(kw) {
            self.bump();
            Ok(())
        } else {
            Err(self.error(message))
        }
    }

    fn expect_punct(&mut self, text: &str, message: &'static str) -> Step {
        if self.at_punct(text) {
            self.bump();
            Ok(())
        } else {
            Err(self.error(message))
        }
    }

    fn expect_identifier(&mut self, message: &'static str) -> Step {
        match self.peek() {
            Some(token) if token.kind == TokenKind::Identifier => {
                self.bump();
                Ok(())
            }
            _ => Err(self.error(message)),
        }
    }

    fn statement(&mut self) -> Step {
        self.bump(); // SELECT
        if self.at_keyword(Keyword::Distinct) {
            self.bump();
        }

        self.projection_list()?;

        self.expect_keyword(Keyword::From, "Expected FROM keyword")?;
        self.expect_identifier("Expected table name")?;

        while self.at_keyword(Keyword::Join) {
            self.bump();
            self.expect_identifier("Expected table name after JOIN")?;
            self.expect_keyword(Keyword::On, "Expected ON keyword")?;
            self.condition()?;
        }

        if self.at_keyword(Keyword::Where) {
            self.bump();
            self.condition()?;
        }

        if self.at_keyword(Keyword::Group) {
            self.bump();
            self.expect_keyword(Keyword::By, "Expected BY after GROUP")?;
            self.column("Expected column name in GROUP BY")?;
            while self.at_punct(",") {
                self.bump();
                self.column("Expected column name in GROUP BY")?;
            }
        }

        if self.at_keyword(Keyword::Having) {
            self.bump();
            self.having()?;
        }

        if self.at_keyword(Keyword::Order) {
            self.bump();
            self.expect_keyword(Keyword::By, "Expected BY after ORDER")?;
            self.order_item()?;
            while self.at_punct(",") {
                self.bump();
                self.order_item()?;
            }
        }

        self.terminator()
    }

    fn terminator(&mut self) -> Step {
        match self.peek().map(|t| t.kind) {
            Some(TokenKind::Semicolon) => {
                self.bump();
                Ok(())
            }
            Some(TokenKind::EndOfInput) if self.policy == SemicolonPolicy::Optional => Ok(()),
            _ => Err(self.error("Expected semicolon")),
        }
    }

    fn projection_list(&mut self) -> Step {
        loop {
            self.projection_item()?;
            if !self.at_punct(",") {
                return Ok(());
            }
            self.bump();
        }
    }

    fn projection_item(&mut self) -> Step {
        match self.peek() {
            Some(token) if token.keyword().is_some_and(|kw| kw.is_aggregate()) => {
                self.aggregate_call()?;
            }
            Some(token) if token.is_punct("*") => self.bump(),
            _ => self.column("Expected column name")?,
        }

        if self.at_keyword(Keyword::As) {
            self.bump();
            self.expect_identifier("Expected alias after AS")?;
        }
        Ok(())
    }

    fn aggregate_call(&mut self) -> Step {
        self.bump(); // function name
        self.expect_punct("(", "Expected '(' after aggregate function")?;
        if self.at_keyword(Keyword::Distinct) {
            self.bump();
        }
        if self.at_punct("*") {
            self.bump();
        } else {
            self.column("Expected column name or '*' in aggregate")?;
        }
        self.expect_punct(")", "Expected ')' after aggregate argument")
    }

    fn column(&mut self, message: &'static str) -> Step {
        self.expect_identifier(message)?;
        if self.at_punct(".") {
            self.bump();
            self.expect_identifier("Expected column name after '.'")?;
        }
        Ok(())
    }

    fn condition(&mut self) -> Step {
        self.condition_term()?;
        while self.peek_keyword().is_some_and(|kw| kw.is_connective()) {
            self.bump();
            self.condition_term()?;
        }
        Ok(())
    }

    fn condition_term(&mut self) -> Step {
        self.column("Expected column name in condition")?;

        if self.at_keyword(Keyword::Between) {
            self.bump();
            self.value()?;
            self.expect_keyword(Keyword::And, "Expected AND in BETWEEN")?;
            return self.value();
        }

        match self.peek() {
            Some(token) if token.is_comparison() => self.bump(),
            _ => return Err(self.error("Expected comparison operator")),
        }
        self.value()
    }

    fn value(&mut self) -> Step {
        match self.peek() {
            Some(token) if token.kind.is_literal() => {
                self.bump();
                Ok(())
            }
            Some(token) if token.kind == TokenKind::Identifier => {
                self.column("Expected value in condition")
            }
            _ => Err(self.error("Expected value in condition")),
        }
    }

    fn having(&mut self) -> Step {
        let ends_having = |t: &Token| {
            matches!(t.kind, TokenKind::Semicolon | TokenKind::EndOfInput)
                || t.is_keyword(Keyword::Order)
        };

        if self.peek().is_none_or(ends_having) {
            return Err(self.error("Expected condition after HAVING"));
        }
        while self.peek().is_some_and(|t| !ends_having(t)) {
            self.bump();
        }
        Ok(())
    }

    fn order_item(&mut self) -> Step {
        self.column("Expected column name in ORDER BY")?;
        if self.peek().is_some_and(Token::is_sort_direction) {
            self.bump();
        }
        Ok(())
    }
}

/// Validate `tokens` as a sequence of `SELECT` statements.
pub fn validate(tokens: &TokenStream, policy: SemicolonPolicy) -> Result<usize, Diagnostic> {
    Validator::new(tokens, policy).validate()
}
