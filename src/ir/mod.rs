//! Linear relational IR: every instruction assigns the outcome of one
//! relational step to a fresh temporary (`T0`, `T1`, ...), and later steps
//! refer back to those temporaries by name.

mod generator;

pub use generator::{IrGenerator, generate};

use std::collections::HashSet;
use std::fmt;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Opcode {
    Load,
    From,
    Select,
    As,
    Conditions,
    Project,
    Aggregate,
    GroupBy,
    Join,
    OrderBy,
    Const,
    Assignment,
    Arithmetic,
    Return,
    Concat,
    Between,
    Having,
}

impl Opcode {
    pub fn as_str(&self) -> &'static str {
        match self {
            Opcode::Load => "LOAD",
            Opcode::From => "FROM",
            Opcode::Select => "SELECT",
            Opcode::As => "AS",
            Opcode::Conditions => "CONDITIONS",
            Opcode::Project => "PROJECT",
            Opcode::Aggregate => "AGGREGATE",
            Opcode::GroupBy => "GROUP_BY",
            Opcode::Join => "JOIN",
            Opcode::OrderBy => "ORDER_BY",
            Opcode::Const => "CONST",
            Opcode::Assignment => "ASSIGNMENT",
            Opcode::Arithmetic => "ARITHMETIC",
            Opcode::Return => "RETURN",
            Opcode::Concat => "CONCAT",
            Opcode::Between => "BETWEEN",
            Opcode::Having => "HAVING",
        }
    }
}

impl fmt::Display for Opcode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A generated temporary name.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct Temp(pub u32);

impl fmt::Display for Temp {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "T{}", self.0)
    }
}

/// Either a reference to an earlier result or raw source text (a column,
/// table, literal or composed expression).
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Operand {
    Temp(Temp),
    Text(String),
}

impl Operand {
    pub fn text(value: impl Into<String>) -> Self {
        Operand::Text(value.into())
    }

    pub fn as_temp(&self) -> Option<Temp> {
        match self {
            Operand::Temp(temp) => Some(*temp),
            Operand::Text(_) => None,
        }
    }
}

impl From<Temp> for Operand {
    fn from(temp: Temp) -> Self {
        Operand::Temp(temp)
    }
}

impl fmt::Display for Operand {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Operand::Temp(temp) => temp.fmt(f),
            Operand::Text(text) => f.write_str(text),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Instruction {
    pub opcode: Opcode,
    pub result: Option<Temp>,
    pub operand1: Option<Operand>,
    pub operand2: Option<Operand>,
    pub operator: Option<String>,
}

impl Instruction {
    pub fn new(opcode: Opcode, result: Option<Temp>) -> Self {
        Self {
            opcode,
            result,
            operand1: None,
            operand2: None,
            operator: None,
        }
    }

    pub fn with_operands(mut self, operand1: Option<Operand>, operand2: Option<Operand>) -> Self {
        self.operand1 = operand1;
        self.operand2 = operand2;
        self
    }

    pub fn with_operator(mut self, operator: impl Into<String>) -> Self {
        self.operator = Some(operator.into());
        self
    }

    /// Temporaries this instruction reads.
    pub fn temps_used(&self) -> impl Iterator<Item = Temp> + '_ {
        [&self.operand1, &self.operand2]
            .into_iter()
            .filter_map(|op| op.as_ref().and_then(Operand::as_temp))
    }
}

/// Renders an optional part, `_` when absent.
struct Slot<'a, T>(Option<&'a T>);

impl<T: fmt::Display> fmt::Display for Slot<'_, T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.0 {
            Some(value) => value.fmt(f),
            None => f.write_str("_"),
        }
    }
}

impl fmt::Display for Instruction {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let a = Slot(self.operand1.as_ref());
        let b = Slot(self.operand2.as_ref());
        let op = Slot(self.operator.as_ref());

        if self.opcode != Opcode::Return {
            write!(f, "{} = ", Slot(self.result.as_ref()))?;
        }
        match self.opcode {
            Opcode::Return => write!(f, "RETURN {a}"),
            Opcode::Project => match &self.operator {
                Some(modifier) => write!(f, "PROJECT {modifier} {a}"),
                None => write!(f, "PROJECT {a}"),
            },
            Opcode::Select => match &self.operand2 {
                Some(items) => write!(f, "SELECT {a} {items}"),
                None => write!(f, "SELECT {a}"),
            },
            Opcode::As => write!(f, "{a} AS {b}"),
            Opcode::Aggregate => write!(f, "{op}({a})"),
            Opcode::Conditions => match self.operator.as_deref() {
                Some(",") | None => write!(f, "{a}, {b}"),
                Some(sep) => write!(f, "{a} {sep} {b}"),
            },
            Opcode::Arithmetic => write!(f, "{a} {op} {b}"),
            Opcode::Assignment => write!(f, "{a}"),
            Opcode::Load | Opcode::Const => write!(f, "{} {a}", self.opcode),
            Opcode::Having => write!(f, "HAVING {a} {b} ({op})"),
            Opcode::From
            | Opcode::Join
            | Opcode::GroupBy
            | Opcode::OrderBy
            | Opcode::Between
            | Opcode::Concat => write!(f, "{} {a} {b}", self.opcode),
        }
    }
}

/// The instructions produced for one statement.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Program {
    pub instructions: Vec<Instruction>,
    /// Set when translation stopped early; nothing after the cause was emitted.
    pub aborted: Option<&'static str>,
}

impl Program {
    pub fn len(&self) -> usize {
        self.instructions.len()
    }

    pub fn is_empty(&self) -> bool {
        self.instructions.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = &Instruction> {
        self.instructions.iter()
    }

    /// The temporary carried by the closing `RETURN`, if the statement
    /// completed.
    pub fn result(&self) -> Option<Temp> {
        self.instructions
            .last()
            .filter(|i| i.opcode == Opcode::Return)
            .and_then(|i| i.operand1.as_ref())
            .and_then(Operand::as_temp)
    }

    /// Check that every temporary is produced before it is read. Returns the
    /// first offending temporary.
    pub fn check_definitions(&self) -> Result<(), Temp> {
        let mut defined = HashSet::new();
        for instruction in &self.instructions {
            if let Some(temp) = instruction.temps_used().find(|t| !defined.contains(t)) {
                return Err(temp);
            }
            if let Some(result) = instruction.result {
                defined.insert(result);
            }
        }
        Ok(())
    }
}

impl fmt::Display for Program {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for instruction in &self.instructions {
            writeln!(f, "{instruction}")?;
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn render(instruction: Instruction) -> String {
        instruction.to_string()
    }

    #[test]
    fn test_render_select_and_join() {
        let select = Instruction::new(Opcode::Select, Some(Temp(2)))
            .with_operands(Some(Temp(1).into()), None);
        assert_eq!(render(select), "T2 = SELECT T1");

        let join = Instruction::new(Opcode::Join, Some(Temp(5)))
            .with_operands(Some(Operand::text("orders")), Some(Temp(4).into()));
        assert_eq!(render(join), "T5 = JOIN orders T4");
    }

    #[test]
    fn test_render_aggregate() {
        let agg = Instruction::new(Opcode::Aggregate, Some(Temp(7)))
            .with_operands(Some(Operand::text("amount")), None)
            .with_operator("COUNT");
        assert_eq!(render(agg), "T7 = COUNT(amount)");
    }

    #[test]
    fn test_render_absent_operands() {
        let from = Instruction::new(Opcode::From, Some(Temp(0)))
            .with_operands(None, Some(Operand::text("users")));
        assert_eq!(render(from), "T0 = FROM _ users");

        let project = Instruction::new(Opcode::Project, Some(Temp(0)));
        assert_eq!(render(project), "T0 = PROJECT _");
    }

    #[test]
    fn test_render_conditions_separators() {
        let list = Instruction::new(Opcode::Conditions, Some(Temp(3)))
            .with_operands(Some(Temp(1).into()), Some(Temp(2).into()))
            .with_operator(",");
        assert_eq!(render(list), "T3 = T1, T2");

        let filter = Instruction::new(Opcode::Conditions, Some(Temp(6)))
            .with_operands(Some(Temp(2).into()), Some(Temp(5).into()))
            .with_operator("WHERE");
        assert_eq!(render(filter), "T6 = T2 WHERE T5");
    }

    #[test]
    fn test_render_forward_opcodes() {
        let load = Instruction::new(Opcode::Load, Some(Temp(0)))
            .with_operands(Some(Operand::text("users")), None);
        assert_eq!(render(load), "T0 = LOAD users");

        let konst = Instruction::new(Opcode::Const, Some(Temp(1)))
            .with_operands(Some(Operand::text("42")), None);
        assert_eq!(render(konst), "T1 = CONST 42");

        let assign = Instruction::new(Opcode::Assignment, Some(Temp(2)))
            .with_operands(Some(Temp(1).into()), None);
        assert_eq!(render(assign), "T2 = T1");

        let concat = Instruction::new(Opcode::Concat, Some(Temp(3)))
            .with_operands(Some(Temp(0).into()), Some(Temp(2).into()));
        assert_eq!(render(concat), "T3 = CONCAT T0 T2");

        let ret = Instruction::new(Opcode::Return, None).with_operands(Some(Temp(3).into()), None);
        assert_eq!(render(ret), "RETURN T3");
    }

    #[test]
    fn test_render_having() {
        let having = Instruction::new(Opcode::Having, Some(Temp(6)))
            .with_operands(Some(Temp(4).into()), Some(Temp(5).into()))
            .with_operator("COUNT(id) > 5");
        assert_eq!(render(having), "T6 = HAVING T4 T5 (COUNT(id) > 5)");
    }

    #[test]
    fn test_check_definitions_flags_forward_reference() {
        let program = Program {
            instructions: vec![
                Instruction::new(Opcode::Select, Some(Temp(0)))
                    .with_operands(Some(Temp(1).into()), None),
                Instruction::new(Opcode::Project, Some(Temp(1))),
            ],
            aborted: None,
        };
        assert_eq!(program.check_definitions(), Err(Temp(1)));
    }

    #[test]
    fn test_result_requires_return() {
        let mut program = Program::default();
        program
            .instructions
            .push(Instruction::new(Opcode::Project, Some(Temp(0))));
        assert_eq!(program.result(), None);
        program.instructions.push(
            Instruction::new(Opcode::Return, None).with_operands(Some(Temp(0).into()), None),
        );
        assert_eq!(program.result(), Some(Temp(0)));
    }
}
