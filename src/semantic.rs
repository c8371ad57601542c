//! Name and type checks against a user-supplied catalog.
//!
//! The catalog is read from schema text such as
//! `users(id INT, name VARCHAR NOT NULL, age INT);`. With an empty catalog
//! the pass only records which tables each statement reads.

use std::fmt;

use tracing::debug;

use crate::diagnostics::Diagnostic;
use crate::stream::TokenStream;
use crate::token::{Keyword, Token, TokenKind};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum DataType {
    Int,
    Float,
    Varchar,
    Date,
    #[default]
    Unknown,
}

impl DataType {
    /// Map a schema type name. Unrecognised names are `Unknown`.
    pub fn from_name(name: &str) -> Self {
        match name.to_ascii_uppercase().as_str() {
            "INT" | "INTEGER" | "BIGINT" | "SMALLINT" => DataType::Int,
            "FLOAT" | "REAL" | "DOUBLE" | "DECIMAL" | "NUMERIC" => DataType::Float,
            "VARCHAR" | "CHAR" | "TEXT" => DataType::Varchar,
            "DATE" => DataType::Date,
            _ => DataType::Unknown,
        }
    }

    /// Type of a literal token; anything else is `Unknown`.
    pub fn of_literal(kind: TokenKind) -> Self {
        match kind {
            TokenKind::Integer => DataType::Int,
            TokenKind::Float => DataType::Float,
            TokenKind::String | TokenKind::Char => DataType::Varchar,
            _ => DataType::Unknown,
        }
    }

    pub fn is_compatible(self, other: DataType) -> bool {
        match (self, other) {
            (DataType::Unknown, _) | (_, DataType::Unknown) => true,
            (DataType::Int, DataType::Float) | (DataType::Float, DataType::Int) => true,
            (a, b) => a == b,
        }
    }
}

impl fmt::Display for DataType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            DataType::Int => "INT",
            DataType::Float => "FLOAT",
            DataType::Varchar => "VARCHAR",
            DataType::Date => "DATE",
            DataType::Unknown => "UNKNOWN",
        };
        f.write_str(name)
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Column {
    pub name: String,
    pub data_type: DataType,
    pub nullable: bool,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Table {
    pub name: String,
    pub columns: Vec<Column>,
}

impl Table {
    pub fn column(&self, name: &str) -> Option<&Column> {
        self.columns.iter().find(|c| c.name.eq_ignore_ascii_case(name))
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Catalog {
    tables: Vec<Table>,
}

impl Catalog {
    pub fn new() -> Self {
        Self::default()
    }

    /// Parse schema text: `name(col TYPE [NOT NULL], ...)` entries, each
    /// optionally closed by `;`.
    pub fn from_source(source: &str) -> Result<Self, Diagnostic> {
        let stream = TokenStream::from_source(source)?;
        let mut reader = SchemaReader {
            tokens: stream.as_slice(),
            pos: 0,
        };
        let mut catalog = Catalog::new();
        while !reader.at_end() {
            catalog.add_table(reader.table()?);
        }
        debug!(tables = catalog.len(), "schema loaded");
        Ok(catalog)
    }

    /// Add `table`, replacing an earlier definition with the same name.
    pub fn add_table(&mut self, table: Table) {
        match self
            .tables
            .iter_mut()
            .find(|t| t.name.eq_ignore_ascii_case(&table.name))
        {
            Some(existing) => *existing = table,
            None => self.tables.push(table),
        }
    }

    pub fn table(&self, name: &str) -> Option<&Table> {
        self.tables.iter().find(|t| t.name.eq_ignore_ascii_case(name))
    }

    /// Look `column` up in the named tables, or in every table when `among`
    /// is empty.
    pub fn find_column(&self, among: &[&str], column: &str) -> Option<&Column> {
        self.tables
            .iter()
            .filter(|t| among.is_empty() || among.iter().any(|n| t.name.eq_ignore_ascii_case(n)))
            .find_map(|t| t.column(column))
    }

    pub fn len(&self) -> usize {
        self.tables.len()
    }

    pub fn is_empty(&self) -> bool {
        self.tables.is_empty()
    }
}

struct SchemaReader<'a> {
    tokens: &'a [Token],
    pos: usize,
}

impl<'a> SchemaReader<'a> {
    fn peek(&self) -> Option<&'a Token> {
        self.tokens.get(self.pos)
    }

    fn at_end(&self) -> bool {
        self.peek().is_none_or(|t| t.kind == TokenKind::EndOfInput)
    }

    fn error(&self, message: &'static str) -> Diagnostic {
        match self.peek().or_else(|| self.tokens.last()) {
            Some(token) => Diagnostic::at(message, token),
            None => Diagnostic::new(message, 1, 1, ""),
        }
    }

    fn identifier(&mut self, message: &'static str) -> Result<String, Diagnostic> {
        match self.peek() {
            Some(token) if token.kind == TokenKind::Identifier => {
                self.pos += 1;
                Ok(token.lexeme.clone())
            }
            _ => Err(self.error(message)),
        }
    }

    fn eat_punct(&mut self, text: &str) -> bool {
        let found = self.peek().is_some_and(|t| t.is_punct(text));
        if found {
            self.pos += 1;
        }
        found
    }

    fn eat_keyword(&mut self, kw: Keyword) -> bool {
        let found = self.peek().is_some_and(|t| t.is_keyword(kw));
        if found {
            self.pos += 1;
        }
        found
    }

    fn table(&mut self) -> Result<Table, Diagnostic> {
        let name = self.identifier("Expected table name")?;
        if !self.eat_punct("(") {
            return Err(self.error("Expected '(' after table name"));
        }

        let mut columns = Vec::new();
        loop {
            let column = self.identifier("Expected column name")?;
            let type_name = self.identifier("Expected column type")?;
            let nullable = if self.eat_keyword(Keyword::Not) {
                if !self.eat_keyword(Keyword::Null) {
                    return Err(self.error("Expected NULL after NOT"));
                }
                false
            } else {
                true
            };
            columns.push(Column {
                name: column,
                data_type: DataType::from_name(&type_name),
                nullable,
            });
            if !self.eat_punct(",") {
                break;
            }
        }
        if !self.eat_punct(")") {
            return Err(self.error("Expected ')' after column list"));
        }
        if self.peek().is_some_and(|t| t.kind == TokenKind::Semicolon) {
            self.pos += 1;
        }

        Ok(Table { name, columns })
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct SemanticReport {
    /// Tables read by each statement, in order of appearance.
    pub tables: Vec<String>,
    pub errors: Vec<String>,
}

impl SemanticReport {
    pub fn is_valid(&self) -> bool {
        self.errors.is_empty()
    }
}

/// `[table.]column` as written.
#[derive(Debug, Clone, PartialEq, Eq)]
struct ColumnRef {
    table: Option<String>,
    name: String,
}

impl fmt::Display for ColumnRef {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match &self.table {
            Some(table) => write!(f, "{table}.{}", self.name),
            None => f.write_str(&self.name),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Clause {
    Other,
    Projection,
    Source,
    Condition,
}

/// Names one statement mentions.
#[derive(Debug, Default)]
struct References<'a> {
    tables: Vec<&'a str>,
    columns: Vec<ColumnRef>,
    /// Column compared with a literal.
    comparisons: Vec<(ColumnRef, &'a Token)>,
}

impl<'a> References<'a> {
    fn collect(statement: &'a [Token]) -> Self {
        let mut refs = Self::default();
        let mut clause = Clause::Other;
        let mut i = 0;

        while let Some(token) = statement.get(i) {
            if let Some(kw) = token.keyword() {
                clause = match kw {
                    Keyword::Select => Clause::Projection,
                    Keyword::From | Keyword::Join => Clause::Source,
                    Keyword::Where | Keyword::On => Clause::Condition,
                    _ if kw.is_clause_starter() => Clause::Other,
                    _ => clause,
                };
                i += 1;
                continue;
            }
            if token.kind != TokenKind::Identifier {
                i += 1;
                continue;
            }

            match clause {
                Clause::Source => {
                    refs.tables.push(&token.lexeme);
                    clause = Clause::Other;
                    i += 1;
                }
                Clause::Projection => {
                    let aliased = i > 0 && statement[i - 1].is_keyword(Keyword::As);
                    let (column, next) = column_ref(statement, i);
                    if !aliased {
                        refs.columns.push(column);
                    }
                    i = next;
                }
                Clause::Condition => {
                    let (column, next) = column_ref(statement, i);
                    i = next;
                    let literal_at = |k: usize| statement.get(k).filter(|t| t.kind.is_literal());
                    match statement.get(i) {
                        Some(op) if op.kind == TokenKind::Operator => {
                            if let Some(literal) = literal_at(i + 1) {
                                refs.comparisons.push((column.clone(), literal));
                            }
                        }
                        Some(t) if t.is_keyword(Keyword::Between) => {
                            for k in [i + 1, i + 3] {
                                if let Some(literal) = literal_at(k) {
                                    refs.comparisons.push((column.clone(), literal));
                                }
                            }
                        }
                        _ => {}
                    }
                    refs.columns.push(column);
                }
                Clause::Other => i += 1,
            }
        }
        refs
    }
}

/// Read `identifier [. identifier]` starting at `start`; returns the
/// reference and the index after it.
fn column_ref(tokens: &[Token], start: usize) -> (ColumnRef, usize) {
    let first = &tokens[start].lexeme;
    let qualified = tokens.get(start + 1).is_some_and(|t| t.is_punct("."))
        && tokens
            .get(start + 2)
            .is_some_and(|t| t.kind == TokenKind::Identifier);
    if qualified {
        let column = ColumnRef {
            table: Some(first.clone()),
            name: tokens[start + 2].lexeme.clone(),
        };
        (column, start + 3)
    } else {
        let column = ColumnRef {
            table: None,
            name: first.clone(),
        };
        (column, start + 1)
    }
}

/// Check every statement in `tokens` against `catalog`.
pub fn analyze(tokens: &TokenStream, catalog: &Catalog) -> SemanticReport {
    let mut report = SemanticReport::default();

    for statement in tokens
        .as_slice()
        .split(|t| t.kind == TokenKind::Semicolon)
    {
        let refs = References::collect(statement);
        report.tables.extend(refs.tables.iter().map(|t| t.to_string()));
        if catalog.is_empty() {
            continue;
        }

        for table in &refs.tables {
            if catalog.table(table).is_none() {
                report.errors.push(format!("Table not found: {table}"));
            }
        }

        let resolve = |column: &ColumnRef| match &column.table {
            Some(table) => catalog.find_column(&[table.as_str()], &column.name),
            None => catalog.find_column(&refs.tables, &column.name),
        };
        for column in &refs.columns {
            if resolve(column).is_none() {
                report.errors.push(format!("Column not found: {column}"));
            }
        }
        for (column, literal) in &refs.comparisons {
            let literal_type = DataType::of_literal(literal.kind);
            if let Some(found) = resolve(column)
                && !found.data_type.is_compatible(literal_type)
            {
                report.errors.push(format!(
                    "Type mismatch: {column} is {}, compared with {} ({literal_type})",
                    found.data_type, literal.lexeme
                ));
            }
        }
    }

    debug!(
        tables = report.tables.len(),
        errors = report.errors.len(),
        "semantic analysis finished"
    );
    report
}

#[cfg(test)]
mod tests {
    use super::*;

    const SCHEMA: &str = "users(id INT, name VARCHAR NOT NULL, age INT);\n\
                          orders(id INT, user_id INT, total FLOAT, placed DATE);";

    fn check(sql: &str) -> SemanticReport {
        let catalog = Catalog::from_source(SCHEMA).unwrap();
        analyze(&TokenStream::from_source(sql).unwrap(), &catalog)
    }

    #[test]
    fn test_type_compatibility() {
        assert!(DataType::Int.is_compatible(DataType::Float));
        assert!(DataType::Float.is_compatible(DataType::Int));
        assert!(DataType::Unknown.is_compatible(DataType::Date));
        assert!(DataType::Varchar.is_compatible(DataType::Unknown));
        assert!(!DataType::Int.is_compatible(DataType::Varchar));
        assert!(!DataType::Date.is_compatible(DataType::Float));
    }

    #[test]
    fn test_catalog_from_source() {
        let catalog = Catalog::from_source(SCHEMA).unwrap();
        assert_eq!(catalog.len(), 2);
        let users = catalog.table("USERS").unwrap();
        assert_eq!(users.columns.len(), 3);
        assert!(!users.column("name").unwrap().nullable);
        assert_eq!(
            catalog.find_column(&["orders"], "placed").map(|c| c.data_type),
            Some(DataType::Date)
        );
        assert!(catalog.find_column(&["users"], "total").is_none());
        assert!(catalog.find_column(&[], "total").is_some());
    }

    #[test]
    fn test_catalog_syntax_errors() {
        let err = Catalog::from_source("users id INT);").unwrap_err();
        assert_eq!(err.message, "Expected '(' after table name");
        assert_eq!((err.line, err.column), (1, 7));

        let err = Catalog::from_source("users(id INT, );").unwrap_err();
        assert_eq!(err.message, "Expected column name");

        let err = Catalog::from_source("users(id);").unwrap_err();
        assert_eq!(err.message, "Expected column type");

        let err = Catalog::from_source("users(id INT").unwrap_err();
        assert_eq!(err.message, "Expected ')' after column list");
    }

    #[test]
    fn test_empty_catalog_accepts_everything() {
        let stream =
            TokenStream::from_source("SELECT x FROM nowhere JOIN elsewhere ON a = 1;").unwrap();
        let report = analyze(&stream, &Catalog::new());
        assert!(report.is_valid());
        assert_eq!(report.tables, vec!["nowhere", "elsewhere"]);
    }

    #[test]
    fn test_known_columns_pass() {
        let report = check(
            "SELECT name, COUNT(users.id) AS n FROM users JOIN orders ON users.id = orders.user_id \
             WHERE age BETWEEN 18 AND 30 AND total > 9.5;",
        );
        assert!(report.is_valid(), "unexpected errors: {:?}", report.errors);
    }

    #[test]
    fn test_unknown_table_and_column() {
        let report = check("SELECT nickname FROM people;");
        assert_eq!(
            report.errors,
            vec!["Table not found: people", "Column not found: nickname"]
        );

        let report =
            check("SELECT orders.name FROM users JOIN orders ON users.id = orders.user_id;");
        assert_eq!(report.errors, vec!["Column not found: orders.name"]);
    }

    #[test]
    fn test_type_mismatch_in_condition() {
        let report = check("SELECT name FROM users WHERE age = 'old';");
        assert_eq!(report.errors.len(), 1);
        assert!(report.errors[0].starts_with("Type mismatch: age is INT"));

        let report = check("SELECT name FROM users WHERE age > 20.5;");
        assert!(report.is_valid());
    }

    #[test]
    fn test_statements_resolve_independently() {
        let report = check("SELECT total FROM orders; SELECT total FROM users;");
        assert_eq!(report.errors, vec!["Column not found: total"]);
    }
}
