use std::fmt;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Symbol {
    pub id: usize,
    pub name: String,
    pub kind: &'static str,
    pub scope: usize,
}

/// Distinct non-keyword identifiers seen by one scan, in first-seen order.
/// Only used for diagnostic printing.
#[derive(Debug, Clone, Default)]
pub struct SymbolTable {
    symbols: Vec<Symbol>,
}

impl SymbolTable {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn find(&self, name: &str) -> Option<&Symbol> {
        self.symbols.iter().find(|s| s.name == name)
    }

    /// Register `name` and return its id. Re-registering returns the
    /// existing id.
    pub fn add(&mut self, name: &str) -> usize {
        if let Some(existing) = self.find(name) {
            return existing.id;
        }
        let id = self.symbols.len() + 1;
        self.symbols.push(Symbol {
            id,
            name: name.to_string(),
            kind: "IDENTIFIER",
            scope: 0,
        });
        id
    }

    pub fn len(&self) -> usize {
        self.symbols.len()
    }

    pub fn is_empty(&self) -> bool {
        self.symbols.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = &Symbol> {
        self.symbols.iter()
    }
}

impl fmt::Display for SymbolTable {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(f, "ID | Name                | Type      | Scope")?;
        writeln!(f, "---|---------------------|-----------|-------")?;
        for symbol in &self.symbols {
            writeln!(
                f,
                "{:<3}| {:<19} | {:<9} | {}",
                symbol.id, symbol.name, symbol.kind, symbol.scope
            )?;
        }
        Ok(())
    }
}
