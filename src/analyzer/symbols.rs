//! Symbol tables
//!
//! Schema-level symbols (tables, views, functions, types) live for the whole
//! source unit. Variables and parameters are scoped to the batch that
//! declares them: every batch has its own scope, filled by the first pass and
//! activated again when the second pass reaches that batch.

use std::collections::HashMap;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum SymbolKind {
    Variable,
    Object,
    ScalarFunction,
    TableFunction,
    UserDefinedType,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ObjectKind {
    Table,
    View,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Symbol {
    /// Declared type name, upper-cased without its length suffix.
    Variable { base_type: String },
    Object(ObjectKind),
    ScalarFunction { return_type: String },
    TableFunction,
    /// Base type name, or `TABLE` for table types.
    UserDefinedType { base: String },
}

impl Symbol {
    pub fn kind(&self) -> SymbolKind {
        match self {
            Symbol::Variable { .. } => SymbolKind::Variable,
            Symbol::Object(_) => SymbolKind::Object,
            Symbol::ScalarFunction { .. } => SymbolKind::ScalarFunction,
            Symbol::TableFunction => SymbolKind::TableFunction,
            Symbol::UserDefinedType { .. } => SymbolKind::UserDefinedType,
        }
    }
}

#[derive(Debug, Default)]
pub struct SymbolTable {
    unit: HashMap<(SymbolKind, String), Symbol>,
    batches: Vec<HashMap<String, Symbol>>,
    active: usize,
}

impl SymbolTable {
    pub fn new() -> Self {
        Self::default()
    }

    /// Makes the variable scope of batch `index` (0-based) current.
    pub fn enter_batch(&mut self, index: usize) {
        if self.batches.len() <= index {
            self.batches.resize_with(index + 1, HashMap::new);
        }
        self.active = index;
    }

    /// Records a symbol. Later declarations of the same key replace earlier ones.
    pub fn declare(&mut self, name: &str, symbol: Symbol) {
        let key = name.to_ascii_uppercase();
        if symbol.kind() == SymbolKind::Variable {
            self.enter_batch(self.active);
            self.batches[self.active].insert(key, symbol);
        } else {
            self.unit.insert((symbol.kind(), key), symbol);
        }
    }

    pub fn lookup(&self, kind: SymbolKind, name: &str) -> Option<&Symbol> {
        let key = name.to_ascii_uppercase();
        if kind == SymbolKind::Variable {
            self.batches.get(self.active).and_then(|scope| scope.get(&key))
        } else {
            self.unit.get(&(kind, key))
        }
    }

    /// Declared base type of a variable in the current batch.
    pub fn variable_type(&self, name: &str) -> Option<&str> {
        match self.lookup(SymbolKind::Variable, name) {
            Some(Symbol::Variable { base_type }) => Some(base_type),
            _ => None,
        }
    }

    pub fn object_kind(&self, key: &str) -> Option<ObjectKind> {
        match self.lookup(SymbolKind::Object, key) {
            Some(Symbol::Object(kind)) => Some(*kind),
            _ => None,
        }
    }

    /// Base type of a user-defined type, or `None` when the name is not one.
    pub fn type_base(&self, key: &str) -> Option<&str> {
        match self.lookup(SymbolKind::UserDefinedType, key) {
            Some(Symbol::UserDefinedType { base }) => Some(base),
            _ => None,
        }
    }

    pub fn scalar_function_type(&self, key: &str) -> Option<&str> {
        match self.lookup(SymbolKind::ScalarFunction, key) {
            Some(Symbol::ScalarFunction { return_type }) => Some(return_type),
            _ => None,
        }
    }

    pub fn is_table_function(&self, key: &str) -> bool {
        self.lookup(SymbolKind::TableFunction, key).is_some()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_variables_are_batch_scoped() {
        let mut symbols = SymbolTable::new();
        symbols.enter_batch(0);
        symbols.declare(
            "@when",
            Symbol::Variable {
                base_type: "DATETIME".to_string(),
            },
        );
        symbols.enter_batch(1);
        assert_eq!(symbols.variable_type("@when"), None);
        symbols.enter_batch(0);
        assert_eq!(symbols.variable_type("@WHEN"), Some("DATETIME"));
    }

    #[test]
    fn test_schema_objects_persist_across_batches() {
        let mut symbols = SymbolTable::new();
        symbols.enter_batch(3);
        symbols.declare("dbo.v", Symbol::Object(ObjectKind::View));
        symbols.enter_batch(0);
        assert_eq!(symbols.object_kind("DBO.V"), Some(ObjectKind::View));
        assert_eq!(symbols.object_kind("dbo.t"), None);
    }

    #[test]
    fn test_kinds_do_not_collide() {
        let mut symbols = SymbolTable::new();
        symbols.declare("dbo.x", Symbol::TableFunction);
        symbols.declare(
            "dbo.x",
            Symbol::UserDefinedType {
                base: "INT".to_string(),
            },
        );
        assert!(symbols.is_table_function("dbo.x"));
        assert_eq!(symbols.type_base("dbo.x"), Some("INT"));
        assert_eq!(symbols.scalar_function_type("dbo.x"), None);
    }
}
