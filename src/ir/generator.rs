//! Syntax-directed translation from the token stream into IR.
//!
//! The generator does not rely on the validator: it dispatches on clause
//! keywords, consumes what it recognises, and skips what it does not. Every
//! lookahead goes through `peek`/`peek_at`, so malformed input can shorten
//! the output but never index past the stream.

use tracing::{debug, warn};

use super::{Instruction, Opcode, Operand, Program, Temp};
use crate::stream::TokenStream;
use crate::token::{Keyword, Token, TokenKind};

const HAVING_WITHOUT_GROUP_BY: &str = "HAVING clause requires a preceding GROUP BY";

/// `FUNC([DISTINCT ]arg)` as written in the source.
struct AggregateCall {
    function: &'static str,
    argument: String,
}

impl AggregateCall {
    fn expr(&self) -> String {
        format!("{}({})", self.function, self.argument)
    }
}

/// A projection item that produces its own instruction.
enum Derived {
    Alias { expr: String, alias: String },
    Aggregate(AggregateCall),
}

pub struct IrGenerator<'a> {
    tokens: &'a [Token],
    pos: usize,
    next_temp: u32,
    /// Result of the most recent relational step of the current statement.
    current: Option<Temp>,
    /// Result of the statement's GROUP BY, consumed by HAVING.
    grouped: Option<Temp>,
    instructions: Vec<Instruction>,
    aborted: Option<&'static str>,
}

impl<'a> IrGenerator<'a> {
    pub fn new(tokens: &'a TokenStream) -> Self {
        Self {
            tokens: tokens.as_slice(),
            pos: 0,
            next_temp: 0,
            current: None,
            grouped: None,
            instructions: Vec::new(),
            aborted: None,
        }
    }

    /// Translate every statement in the stream, one `Program` each.
    pub fn generate(mut self) -> Vec<Program> {
        let mut programs = Vec::new();

        while let Some(token) = self.peek() {
            if self.aborted.is_some() {
                if matches!(token.kind, TokenKind::Semicolon | TokenKind::EndOfInput) {
                    self.pos += 1;
                    self.finish_statement(&mut programs);
                } else {
                    self.pos += 1;
                }
                continue;
            }

            match token.kind {
                TokenKind::Keyword(Keyword::Select) => self.select(),
                TokenKind::Keyword(Keyword::From) => self.from(),
                TokenKind::Keyword(Keyword::Join) => self.join(),
                TokenKind::Keyword(Keyword::Where) => self.filter(),
                TokenKind::Keyword(Keyword::Group) => self.group_by(),
                TokenKind::Keyword(Keyword::Having) => self.having(),
                TokenKind::Keyword(Keyword::Order) => self.order_by(),
                TokenKind::Semicolon | TokenKind::EndOfInput => {
                    self.pos += 1;
                    self.finish_statement(&mut programs);
                }
                _ => self.pos += 1,
            }
        }
        self.finish_statement(&mut programs);

        programs
    }

    fn finish_statement(&mut self, programs: &mut Vec<Program>) {
        if self.instructions.is_empty() && self.aborted.is_none() {
            return;
        }
        if self.aborted.is_none()
            && let Some(last) = self.current
        {
            let ret = Instruction::new(Opcode::Return, None).with_operands(Some(last.into()), None);
            self.instructions.push(ret);
        }

        let program = Program {
            instructions: std::mem::take(&mut self.instructions),
            aborted: self.aborted.take(),
        };
        debug!(
            statement = programs.len(),
            instructions = program.len(),
            complete = program.aborted.is_none(),
            "statement translated"
        );
        programs.push(program);

        self.next_temp = 0;
        self.current = None;
        self.grouped = None;
    }

    fn peek(&self) -> Option<&'a Token> {
        self.tokens.get(self.pos)
    }

    fn peek_at(&self, offset: usize) -> Option<&'a Token> {
        self.tokens.get(self.pos + offset)
    }

    fn at_keyword(&self, kw: Keyword) -> bool {
        self.peek().is_some_and(|t| t.is_keyword(kw))
    }

    fn at_punct(&self, text: &str) -> bool {
        self.peek().is_some_and(|t| t.is_punct(text))
    }

    fn eat_keyword(&mut self, kw: Keyword) -> bool {
        let found = self.at_keyword(kw);
        if found {
            self.pos += 1;
        }
        found
    }

    fn eat_punct(&mut self, text: &str) -> bool {
        let found = self.at_punct(text);
        if found {
            self.pos += 1;
        }
        found
    }

    fn mint(&mut self) -> Temp {
        let temp = Temp(self.next_temp);
        self.next_temp += 1;
        temp
    }

    fn emit(&mut self, instruction: Instruction) {
        self.instructions.push(instruction);
    }

    /// Mint a temporary and emit `opcode` into it.
    fn emit_new(
        &mut self,
        opcode: Opcode,
        operand1: Option<Operand>,
        operand2: Option<Operand>,
        operator: Option<&str>,
    ) -> Temp {
        let result = self.mint();
        let mut instruction =
            Instruction::new(opcode, Some(result)).with_operands(operand1, operand2);
        if let Some(op) = operator {
            instruction = instruction.with_operator(op);
        }
        self.emit(instruction);
        result
    }

    /// `identifier ["." identifier]`, joined back into one name.
    fn column(&mut self) -> Option<String> {
        let first = self.peek().filter(|t| t.kind == TokenKind::Identifier)?;
        self.pos += 1;
        let mut name = first.lexeme.clone();
        if self.at_punct(".")
            && let Some(second) = self.peek_at(1).filter(|t| t.kind == TokenKind::Identifier)
        {
            name.push('.');
            name.push_str(&second.lexeme);
            self.pos += 2;
        }
        Some(name)
    }

    fn value(&mut self) -> Option<String> {
        let token = self.peek()?;
        if token.kind.is_literal() {
            self.pos += 1;
            return Some(token.lexeme.clone());
        }
        self.column()
    }

    fn aggregate_call(&mut self) -> Option<AggregateCall> {
        let function = self.peek()?.keyword().filter(Keyword::is_aggregate)?.as_str();
        self.pos += 1;
        if !self.eat_punct("(") {
            return Some(AggregateCall {
                function,
                argument: String::new(),
            });
        }

        let mut argument = String::new();
        if self.eat_keyword(Keyword::Distinct) {
            argument.push_str("DISTINCT ");
        }
        if self.eat_punct("*") {
            argument.push('*');
        } else if let Some(column) = self.column() {
            argument.push_str(&column);
        }
        self.eat_punct(")");

        Some(AggregateCall { function, argument })
    }

    fn select(&mut self) {
        self.pos += 1;
        let distinct = self.eat_keyword(Keyword::Distinct);
        let project = self.mint();

        let mut columns = Vec::new();
        let mut derived = Vec::new();
        loop {
            let (expr, aggregate) = match self.peek() {
                Some(t) if t.keyword().is_some_and(|kw| kw.is_aggregate()) => {
                    match self.aggregate_call() {
                        Some(call) => (call.expr(), Some(call)),
                        None => break,
                    }
                }
                Some(t) if t.is_punct("*") => {
                    self.pos += 1;
                    ("*".to_string(), None)
                }
                Some(t) if t.kind == TokenKind::Identifier => match self.column() {
                    Some(column) => (column, None),
                    None => break,
                },
                _ => break,
            };

            let alias = match self.peek_at(1) {
                Some(next)
                    if self.at_keyword(Keyword::As) && next.kind == TokenKind::Identifier =>
                {
                    self.pos += 2;
                    Some(next.lexeme.clone())
                }
                _ => None,
            };

            match (alias, aggregate) {
                (Some(alias), _) => derived.push(Derived::Alias { expr, alias }),
                (None, Some(call)) => derived.push(Derived::Aggregate(call)),
                (None, None) => columns.push(expr),
            }

            if !self.eat_punct(",") {
                break;
            }
        }

        let mut project_instr = Instruction::new(Opcode::Project, Some(project)).with_operands(
            (!columns.is_empty()).then(|| Operand::text(columns.join(", "))),
            None,
        );
        if distinct {
            project_instr = project_instr.with_operator("DISTINCT");
        }
        self.emit(project_instr);

        let mut items: Option<Temp> = None;
        for item in derived {
            let produced = match item {
                Derived::Alias { expr, alias } => self.emit_new(
                    Opcode::As,
                    Some(Operand::text(expr)),
                    Some(Operand::text(alias)),
                    None,
                ),
                Derived::Aggregate(call) => self.emit_new(
                    Opcode::Aggregate,
                    Some(Operand::text(call.argument)),
                    None,
                    Some(call.function),
                ),
            };
            items = Some(match items {
                None => produced,
                Some(previous) => self.emit_new(
                    Opcode::Conditions,
                    Some(previous.into()),
                    Some(produced.into()),
                    Some(","),
                ),
            });
        }

        let selected = self.emit_new(
            Opcode::Select,
            Some(project.into()),
            items.map(Operand::from),
            None,
        );
        self.current = Some(selected);
    }

    fn from(&mut self) {
        self.pos += 1;
        let table = self.table_name();
        let from = self.emit_new(
            Opcode::From,
            self.current.map(Operand::from),
            table.map(Operand::Text),
            None,
        );
        self.current = Some(from);
    }

    fn table_name(&mut self) -> Option<String> {
        let token = self.peek().filter(|t| t.kind == TokenKind::Identifier)?;
        self.pos += 1;
        Some(token.lexeme.clone())
    }

    fn join(&mut self) {
        self.pos += 1;
        let table = self.table_name();
        self.eat_keyword(Keyword::On);
        let condition = self.condition().or(self.current);
        let joined = self.emit_new(
            Opcode::Join,
            table.map(Operand::Text),
            condition.map(Operand::from),
            None,
        );
        self.current = Some(joined);
    }

    fn filter(&mut self) {
        self.pos += 1;
        let source = self.current;
        if let Some(predicate) = self.condition() {
            let filtered = self.emit_new(
                Opcode::Conditions,
                source.map(Operand::from),
                Some(predicate.into()),
                Some("WHERE"),
            );
            self.current = Some(filtered);
        }
    }

    /// Translate `term {(AND | OR) term}`, folding terms left to right.
    fn condition(&mut self) -> Option<Temp> {
        let mut predicate = self.condition_term()?;
        while let Some(connective) = self
            .peek()
            .and_then(Token::keyword)
            .filter(Keyword::is_connective)
        {
            self.pos += 1;
            let Some(term) = self.condition_term() else {
                break;
            };
            predicate = self.emit_new(
                Opcode::Arithmetic,
                Some(predicate.into()),
                Some(term.into()),
                Some(connective.as_str()),
            );
        }
        Some(predicate)
    }

    fn condition_term(&mut self) -> Option<Temp> {
        let column = self.column()?;

        if self.eat_keyword(Keyword::Between) {
            let low = self.value();
            self.eat_keyword(Keyword::And);
            let high = self.value();
            let range = self.emit_new(
                Opcode::Arithmetic,
                low.map(Operand::Text),
                high.map(Operand::Text),
                Some(Keyword::And.as_str()),
            );
            return Some(self.emit_new(
                Opcode::Between,
                Some(Operand::Text(column)),
                Some(range.into()),
                None,
            ));
        }

        let operator = self.peek().filter(|t| t.is_comparison())?;
        self.pos += 1;
        let value = self.value();
        Some(self.emit_new(
            Opcode::Arithmetic,
            Some(Operand::Text(column)),
            value.map(Operand::Text),
            Some(operator.lexeme.as_str()),
        ))
    }

    fn column_list(&mut self) -> Vec<String> {
        let mut columns = Vec::new();
        while let Some(column) = self.column() {
            let mut entry = column;
            if let Some(direction) = self.peek().filter(|t| t.is_sort_direction()) {
                entry.push(' ');
                entry.push_str(&direction.lexeme.to_ascii_uppercase());
                self.pos += 1;
            }
            columns.push(entry);
            if !self.eat_punct(",") {
                break;
            }
        }
        columns
    }

    fn group_by(&mut self) {
        self.pos += 1;
        self.eat_keyword(Keyword::By);
        let columns = self.column_list();
        let grouped = self.emit_new(
            Opcode::GroupBy,
            self.current.map(Operand::from),
            Some(Operand::text(columns.join(", "))),
            None,
        );
        self.grouped = Some(grouped);
        self.current = Some(grouped);
    }

    fn having(&mut self) {
        let Some(grouped) = self.grouped else {
            if let Some(token) = self.peek() {
                warn!(
                    line = token.line,
                    column = token.column,
                    "{HAVING_WITHOUT_GROUP_BY}; dropping the rest of the statement"
                );
            }
            self.aborted = Some(HAVING_WITHOUT_GROUP_BY);
            return;
        };
        self.pos += 1;

        let (left, aggregate) = match self.aggregate_call() {
            Some(call) => {
                let applied = self.emit_new(
                    Opcode::Aggregate,
                    Some(Operand::text(call.argument.clone())),
                    None,
                    Some(call.function),
                );
                (call.expr(), Some(applied))
            }
            None => (self.column().unwrap_or_default(), None),
        };

        let mut condition = left;
        if let Some(op) = self.peek().filter(|t| t.kind == TokenKind::Operator) {
            self.pos += 1;
            condition.push(' ');
            condition.push_str(&op.lexeme);
            if let Some(value) = self.value() {
                condition.push(' ');
                condition.push_str(&value);
            }
        }

        let filtered = self.emit_new(
            Opcode::Having,
            Some(grouped.into()),
            aggregate.map(Operand::from),
            Some(condition.as_str()),
        );
        self.current = Some(filtered);

        while self.peek().is_some_and(|t| {
            !matches!(t.kind, TokenKind::Semicolon | TokenKind::EndOfInput)
                && !t.is_keyword(Keyword::Order)
        }) {
            self.pos += 1;
        }
    }

    fn order_by(&mut self) {
        self.pos += 1;
        self.eat_keyword(Keyword::By);
        let keys = self.column_list();
        let ordered = self.emit_new(
            Opcode::OrderBy,
            self.current.map(Operand::from),
            Some(Operand::text(keys.join(", "))),
            None,
        );
        self.current = Some(ordered);
    }
}

/// Translate `tokens` with fresh generator state.
pub fn generate(tokens: &TokenStream) -> Vec<Program> {
    IrGenerator::new(tokens).generate()
}
