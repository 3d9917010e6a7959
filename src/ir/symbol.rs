use crate::lang::{DataType, Value};
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum SymbolKind {
    Label,
    Variable,
    Constant,
    ProgName,
}

impl std::fmt::Display for SymbolKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            SymbolKind::Label => write!(f, "Label"),
            SymbolKind::Variable => write!(f, "Variable"),
            SymbolKind::Constant => write!(f, "Constant"),
            SymbolKind::ProgName => write!(f, "ProgName"),
        }
    }
}

/// A named storage slot.
///
/// `data_type` follows the value except for declarations that cannot be
/// stored, which keep `DataType::Invalid`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Symbol {
    pub name: String,
    pub kind: SymbolKind,
    pub data_type: DataType,
    pub value: Value,
}

impl Symbol {
    pub fn data_type(&self) -> DataType {
        self.data_type
    }
}

/// Growable list of symbols addressed by index.
///
/// Entries are never removed or reordered: quads embed these indices as
/// operands.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct SymbolTable {
    symbols: Vec<Symbol>,
}

impl SymbolTable {
    pub fn new() -> Self {
        Self::default()
    }

    /// Always appends; call [`SymbolTable::lookup_symbol`] first for
    /// add-if-absent behaviour.
    pub fn add_symbol(&mut self, name: &str, kind: SymbolKind, value: Value) -> usize {
        self.symbols.push(Symbol {
            name: name.to_string(),
            kind,
            data_type: value.data_type(),
            value,
        });
        self.symbols.len() - 1
    }

    /// First entry whose name matches exactly.
    pub fn lookup_symbol(&self, name: &str) -> Option<usize> {
        self.symbols.iter().position(|s| s.name == name)
    }

    /// First literal constant with this spelling and type. Literals are kept
    /// apart from identifiers so that a string `"N"` never aliases variable N.
    pub fn lookup_constant(&self, name: &str, data_type: DataType) -> Option<usize> {
        self.symbols.iter().position(|s| {
            s.name == name && s.kind == SymbolKind::Constant && s.data_type() == data_type
        })
    }

    /// First non-constant entry with this name.
    pub fn lookup_identifier(&self, name: &str) -> Option<usize> {
        self.symbols
            .iter()
            .position(|s| s.name == name && s.kind != SymbolKind::Constant)
    }

    /// Panics when `index` is past the end; indices come from this table.
    pub fn get_symbol(&self, index: usize) -> &Symbol {
        &self.symbols[index]
    }

    /// Overwrites kind and value; the data type follows the new value.
    pub fn update_symbol(&mut self, index: usize, kind: SymbolKind, value: Value) {
        let symbol = &mut self.symbols[index];
        symbol.kind = kind;
        symbol.data_type = value.data_type();
        symbol.value = value;
    }

    /// Marks `index` as a variable of `data_type` holding that type's zero
    /// value.
    pub fn declare_variable(&mut self, index: usize, data_type: DataType) {
        let symbol = &mut self.symbols[index];
        symbol.kind = SymbolKind::Variable;
        symbol.data_type = data_type;
        symbol.value = data_type.default_value();
    }

    pub fn set_kind(&mut self, index: usize, kind: SymbolKind) {
        self.symbols[index].kind = kind;
    }

    pub fn set_value(&mut self, index: usize, value: Value) {
        let symbol = &mut self.symbols[index];
        symbol.data_type = value.data_type();
        symbol.value = value;
    }

    pub fn symbols(&self) -> &[Symbol] {
        &self.symbols
    }

    pub fn len(&self) -> usize {
        self.symbols.len()
    }

    pub fn is_empty(&self) -> bool {
        self.symbols.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_add_does_not_deduplicate() {
        let mut table = SymbolTable::new();
        let a = table.add_symbol("X", SymbolKind::Variable, Value::Int(0));
        let b = table.add_symbol("X", SymbolKind::Variable, Value::Int(1));
        assert_eq!((a, b), (0, 1));
        assert_eq!(table.lookup_symbol("X"), Some(0));
        assert_eq!(table.lookup_symbol("x"), None);
    }

    #[test]
    fn test_update_switches_data_type() {
        let mut table = SymbolTable::new();
        let i = table.add_symbol("Y", SymbolKind::Variable, Value::Int(4));
        assert_eq!(table.get_symbol(i).data_type(), DataType::Integer);

        table.update_symbol(i, SymbolKind::Variable, Value::Real(2.5));
        assert_eq!(table.get_symbol(i).data_type(), DataType::Double);
        assert_eq!(table.get_symbol(i).value, Value::Real(2.5));
    }

    #[test]
    fn test_literal_and_identifier_lookups_stay_apart() {
        let mut table = SymbolTable::new();
        let text = table.add_symbol("N", SymbolKind::Constant, Value::Text("N".into()));
        let var = table.add_symbol("N", SymbolKind::Variable, Value::Int(0));
        assert_eq!(table.lookup_symbol("N"), Some(text));
        assert_eq!(table.lookup_identifier("N"), Some(var));
        assert_eq!(table.lookup_constant("N", DataType::String), Some(text));
        assert_eq!(table.lookup_constant("N", DataType::Integer), None);
    }

    #[test]
    fn test_declared_type_is_kept() {
        let mut table = SymbolTable::new();
        let a = table.add_symbol("A", SymbolKind::Variable, Value::Int(0));
        let r = table.add_symbol("R", SymbolKind::Variable, Value::Int(0));

        table.declare_variable(a, DataType::Invalid);
        table.declare_variable(r, DataType::Double);

        assert_eq!(table.get_symbol(a).data_type(), DataType::Invalid);
        assert_eq!(table.get_symbol(a).value, Value::Int(0));
        assert_eq!(table.get_symbol(r).data_type(), DataType::Double);
        assert_eq!(table.get_symbol(r).value, Value::Real(0.0));
    }

    #[test]
    #[should_panic]
    fn test_get_symbol_out_of_range_panics() {
        let table = SymbolTable::new();
        table.get_symbol(3);
    }
}
