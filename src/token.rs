use std::fmt;

macro_rules! define_keywords {
    (
        aggregate {
            $( $agg_variant:ident => $agg_str:expr ),* $(,)?
        }
        plain {
            $( $variant:ident => $str:expr ),* $(,)?
        }
    ) => {
        #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
        pub enum Keyword {
            $( $agg_variant, )*
            $( $variant, )*
        }

        impl Keyword {
            pub fn as_str(&self) -> &'static str {
                match self {
                    $( Keyword::$agg_variant => $agg_str, )*
                    $( Keyword::$variant => $str, )*
                }
            }

            /// Aggregate function names (`COUNT SUM AVG MAX MIN`).
            pub fn is_aggregate(&self) -> bool {
                matches!(self, $( Keyword::$agg_variant )|*)
            }
        }

        impl fmt::Display for Keyword {
            fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                f.write_str(self.as_str())
            }
        }

        impl std::str::FromStr for Keyword {
            type Err = ();
            fn from_str(s: &str) -> Result<Self, Self::Err> {
                $( if s.eq_ignore_ascii_case($agg_str) { return Ok(Keyword::$agg_variant); } )*
                $( if s.eq_ignore_ascii_case($str) { return Ok(Keyword::$variant); } )*
                Err(())
            }
        }

        /// Lookup a reserved word (case-insensitive).
        pub fn lookup_keyword(word: &str) -> Option<Keyword> {
            word.parse().ok()
        }
    };
}

define_keywords! {
    aggregate {
        Count => "COUNT",
        Sum => "SUM",
        Avg => "AVG",
        Max => "MAX",
        Min => "MIN",
    }
    plain {
        Select => "SELECT",
        From => "FROM",
        Where => "WHERE",
        Insert => "INSERT",
        Update => "UPDATE",
        Delete => "DELETE",
        Create => "CREATE",
        Drop => "DROP",
        Table => "TABLE",
        Database => "DATABASE",
        Alter => "ALTER",
        Index => "INDEX",
        And => "AND",
        Or => "OR",
        Not => "NOT",
        In => "IN",
        Between => "BETWEEN",
        Like => "LIKE",
        Is => "IS",
        Null => "NULL",
        Order => "ORDER",
        By => "BY",
        Group => "GROUP",
        Having => "HAVING",
        Join => "JOIN",
        Left => "LEFT",
        Right => "RIGHT",
        Inner => "INNER",
        Outer => "OUTER",
        On => "ON",
        As => "AS",
        Distinct => "DISTINCT",
        Into => "INTO",
        Values => "VALUES",
        Set => "SET",
    }
}

impl Keyword {
    /// Keywords that open a clause of a `SELECT` statement.
    pub fn is_clause_starter(&self) -> bool {
        matches!(
            self,
            Keyword::Select
                | Keyword::From
                | Keyword::Join
                | Keyword::Where
                | Keyword::Group
                | Keyword::Having
                | Keyword::Order
        )
    }

    pub fn is_connective(&self) -> bool {
        matches!(self, Keyword::And | Keyword::Or)
    }
}

const COMPARISON_OPS: &[&str] = &["=", "<>", "!=", "<", ">", "<=", ">="];

/// Reasons the scanner gives up on the input.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LexError {
    InvalidCharacter,
    UnterminatedString,
    MultipleDecimalPoints,
    TokenTooLong,
}

impl LexError {
    pub fn message(&self) -> &'static str {
        match self {
            LexError::InvalidCharacter => "Invalid character",
            LexError::UnterminatedString => "Unterminated string literal",
            LexError::MultipleDecimalPoints => "Multiple decimal points in numeric literal",
            LexError::TokenTooLong => "Token exceeds maximum length",
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TokenKind {
    Identifier,
    Integer,
    Float,
    Operator,
    Delimiter,
    Keyword(Keyword),
    String,
    Char,
    Comment,
    Semicolon,
    EndOfInput,
    Error(LexError),
}

impl TokenKind {
    pub fn name(&self) -> &'static str {
        match self {
            TokenKind::Identifier => "IDENTIFIER",
            TokenKind::Integer => "INTEGER",
            TokenKind::Float => "FLOAT",
            TokenKind::Operator => "OPERATOR",
            TokenKind::Delimiter => "DELIMITER",
            TokenKind::Keyword(_) => "KEYWORD",
            TokenKind::String => "STRING",
            TokenKind::Char => "CHAR",
            TokenKind::Comment => "COMMENT",
            TokenKind::Semicolon => "SEMICOLON",
            TokenKind::EndOfInput => "EOF",
            TokenKind::Error(_) => "ERROR",
        }
    }

    pub fn is_literal(&self) -> bool {
        matches!(
            self,
            TokenKind::Integer | TokenKind::Float | TokenKind::String | TokenKind::Char
        )
    }
}

impl fmt::Display for TokenKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

/// A classified slice of source text. `line` and `column` are 1-based and
/// point at the first character of the lexeme.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Token {
    pub kind: TokenKind,
    pub lexeme: String,
    pub line: usize,
    pub column: usize,
}

impl Token {
    pub fn new(kind: TokenKind, lexeme: impl Into<String>, line: usize, column: usize) -> Self {
        Self {
            kind,
            lexeme: lexeme.into(),
            line,
            column,
        }
    }

    pub fn keyword(&self) -> Option<Keyword> {
        match self.kind {
            TokenKind::Keyword(kw) => Some(kw),
            _ => None,
        }
    }

    pub fn is_keyword(&self, kw: Keyword) -> bool {
        self.keyword() == Some(kw)
    }

    /// `= <> != < > <= >=`
    pub fn is_comparison(&self) -> bool {
        self.kind == TokenKind::Operator && COMPARISON_OPS.contains(&self.lexeme.as_str())
    }

    /// `ASC` or `DESC`, which scan as identifiers.
    pub fn is_sort_direction(&self) -> bool {
        self.kind == TokenKind::Identifier
            && (self.lexeme.eq_ignore_ascii_case("ASC") || self.lexeme.eq_ignore_ascii_case("DESC"))
    }

    /// True for a delimiter or operator token spelled exactly `text`.
    pub fn is_punct(&self, text: &str) -> bool {
        matches!(self.kind, TokenKind::Delimiter | TokenKind::Operator) && self.lexeme == text
    }
}

impl fmt::Display for Token {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "Token: {{ Type: {}, Value: '{}', Line: {}, Column: {} }}",
            self.kind, self.lexeme, self.line, self.column
        )
    }
}
