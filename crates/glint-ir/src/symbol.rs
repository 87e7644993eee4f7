//! Exported symbols — the unit's contribution to the program interface.

use crate::global::StorageQualifier;

/// A symbol a compiled unit exposes for cross-stage resolution.
///
/// The type is carried as its canonical GLSL signature (`float`, `ivec3`,
/// `mat4`, `float[8]`) so symbols from independently compiled modules can be
/// compared without sharing a type arena, and so link diagnostics can name
/// types directly.
#[derive(Clone, Debug)]
pub struct ExportedSymbol {
    pub name: String,
    pub qualifier: StorageQualifier,
    pub ty: String,
    pub location: Option<u32>,
}

/// The symbols a unit exports, in declaration order.
#[derive(Clone, Debug, Default)]
pub struct SymbolTable {
    symbols: Vec<ExportedSymbol>,
}

impl SymbolTable {
    /// Creates an empty table.
    pub fn new() -> Self {
        Self::default()
    }

    /// Records a symbol.
    pub fn insert(&mut self, symbol: ExportedSymbol) {
        self.symbols.push(symbol);
    }

    /// Finds a symbol by name.
    pub fn get(&self, name: &str) -> Option<&ExportedSymbol> {
        self.symbols.iter().find(|s| s.name == name)
    }

    /// Iterates over the symbols in declaration order.
    pub fn iter(&self) -> impl Iterator<Item = &ExportedSymbol> {
        self.symbols.iter()
    }

    /// Returns the number of symbols.
    pub fn len(&self) -> usize {
        self.symbols.len()
    }

    /// Returns `true` if the table has no symbols.
    pub fn is_empty(&self) -> bool {
        self.symbols.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn insert_and_get() {
        let mut table = SymbolTable::new();
        table.insert(ExportedSymbol {
            name: "mvp".into(),
            qualifier: StorageQualifier::Uniform,
            ty: "mat4".into(),
            location: None,
        });
        table.insert(ExportedSymbol {
            name: "uv".into(),
            qualifier: StorageQualifier::Output,
            ty: "vec2".into(),
            location: Some(0),
        });

        assert_eq!(table.len(), 2);
        let uv = table.get("uv").unwrap();
        assert_eq!(uv.ty, "vec2");
        assert_eq!(uv.qualifier, StorageQualifier::Output);
        assert!(table.get("missing").is_none());
    }
}
