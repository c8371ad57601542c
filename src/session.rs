use std::fmt::Write;

use tracing::debug;

use crate::config::{CompileOptions, EmitMode};
use crate::diagnostics::{CompileError, ErrorSlot, Result};
use crate::ir::{self, Program};
use crate::lexer::Scanner;
use crate::parser;
use crate::semantic::{self, Catalog, SemanticReport};
use crate::stream::TokenStream;
use crate::symbols::SymbolTable;
use crate::token::Token;

/// Options and schema shared by every run. Each call to [`Session::run`]
/// starts from fresh per-stage state.
#[derive(Debug, Clone, Default)]
pub struct Session {
    options: CompileOptions,
    catalog: Catalog,
}

/// Everything one run produced, stage by stage. A stage that did not run
/// leaves its field empty.
#[derive(Debug, Clone, Default)]
pub struct Compilation {
    /// Every scanned token in source order, comments and a terminating error
    /// token included.
    pub scanned: Vec<Token>,
    pub symbols: SymbolTable,
    pub stream: Option<TokenStream>,
    pub lexical: ErrorSlot,
    pub syntax: ErrorSlot,
    pub statements: usize,
    pub semantic: Option<SemanticReport>,
    pub programs: Vec<Program>,
}

impl Session {
    pub fn new(options: CompileOptions) -> Self {
        Self {
            options,
            catalog: Catalog::new(),
        }
    }

    pub fn with_catalog(mut self, catalog: Catalog) -> Self {
        self.catalog = catalog;
        self
    }

    pub fn run(&self, source: &str) -> Compilation {
        let mut compilation = Compilation::default();

        let mut scanner = Scanner::new(source);
        let scanned = &mut compilation.scanned;
        let stream = TokenStream::scan(&mut scanner, |token| scanned.push(token.clone()));
        compilation.symbols = scanner.into_symbols();

        let stream = match stream {
            Ok(stream) => stream,
            Err(diagnostic) => {
                debug!(%diagnostic, "lexical analysis failed");
                compilation.lexical.set(diagnostic);
                return compilation;
            }
        };

        match parser::validate(&stream, self.options.semicolon) {
            Ok(statements) => {
                compilation.statements = statements;
                compilation.semantic = Some(semantic::analyze(&stream, &self.catalog));
            }
            Err(diagnostic) => {
                debug!(%diagnostic, "syntax analysis failed");
                compilation.syntax.set(diagnostic);
            }
        }

        compilation.programs = ir::generate(&stream);
        compilation.stream = Some(stream);
        compilation
    }
}

impl Compilation {
    pub fn is_success(&self) -> bool {
        self.check().is_ok()
    }

    /// The first failure of the run, in stage order.
    pub fn check(&self) -> Result<()> {
        if let Some(diagnostic) = self.lexical.get() {
            return Err(CompileError::Lexical(diagnostic.clone()));
        }
        if let Some(diagnostic) = self.syntax.get() {
            return Err(CompileError::Syntax(diagnostic.clone()));
        }
        if let Some(report) = &self.semantic
            && !report.is_valid()
        {
            return Err(CompileError::Semantic(report.errors.clone()));
        }
        Ok(())
    }

    /// Human-readable report of the sections selected by `emit`.
    pub fn render_report(&self, emit: EmitMode) -> String {
        let mut out = String::new();
        match emit {
            EmitMode::Tokens => self.write_tokens(&mut out),
            EmitMode::Ir => {
                if let Some(diagnostic) = self.lexical.get() {
                    let _ = writeln!(out, "Lexical error at {diagnostic}");
                }
                self.write_programs(&mut out);
            }
            EmitMode::All => {
                let _ = writeln!(out, "=== Lexical analysis ===");
                self.write_tokens(&mut out);
                if self.lexical.is_set() {
                    let _ = writeln!(out, "\nCompilation stopped by lexical errors");
                    return out;
                }

                let _ = writeln!(out, "\nSymbol table:");
                let _ = write!(out, "{}", self.symbols);

                let _ = writeln!(out, "\n=== Syntax analysis ===");
                match self.syntax.get() {
                    Some(diagnostic) => {
                        let _ = writeln!(out, "Syntax error at {diagnostic}");
                    }
                    None => {
                        let _ = writeln!(
                            out,
                            "Syntax analysis completed successfully ({} statement(s))",
                            self.statements
                        );
                    }
                }

                if let Some(report) = &self.semantic {
                    let _ = writeln!(out, "\n=== Semantic analysis ===");
                    if report.is_valid() {
                        let _ = writeln!(out, "Semantic analysis completed successfully");
                    }
                    for error in &report.errors {
                        let _ = writeln!(out, "Semantic error: {error}");
                    }
                }

                let _ = writeln!(out, "\n=== Intermediate code ===");
                self.write_programs(&mut out);
            }
        }
        out
    }

    fn write_tokens(&self, out: &mut String) {
        for token in &self.scanned {
            let _ = writeln!(out, "{token}");
        }
        if let Some(diagnostic) = self.lexical.get() {
            let _ = writeln!(out, "\nLexical error at {diagnostic}");
        }
    }

    fn write_programs(&self, out: &mut String) {
        let numbered = self.programs.len() > 1;
        for (index, program) in self.programs.iter().enumerate() {
            if numbered {
                let _ = writeln!(out, "-- statement {}", index + 1);
            }
            let _ = write!(out, "{program}");
            if let Some(reason) = program.aborted {
                let _ = writeln!(out, "warning: {reason}; statement left incomplete");
            }
        }
    }
}
