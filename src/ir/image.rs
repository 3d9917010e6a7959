use crate::ir::{Quad, QuadTable, SymbolTable};
use serde::{Deserialize, Serialize};

/// A compiled program in a form that can be written out and reloaded.
///
/// Holds the symbol table as compiled (before any run mutates it) and the
/// raw quads; the opcode table is rebuilt on load.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ProgramImage {
    pub symbols: SymbolTable,
    pub quads: Vec<Quad>,
}

#[derive(Debug)]
pub struct ImageError {
    pub message: String,
}

impl std::fmt::Display for ImageError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "program image error: {}", self.message)
    }
}

impl std::error::Error for ImageError {}

impl From<postcard::Error> for ImageError {
    fn from(e: postcard::Error) -> Self {
        ImageError {
            message: e.to_string(),
        }
    }
}

impl ProgramImage {
    pub fn new(symbols: &SymbolTable, quads: &QuadTable) -> Self {
        ProgramImage {
            symbols: symbols.clone(),
            quads: quads.quads().to_vec(),
        }
    }

    pub fn to_bytes(&self) -> Result<Vec<u8>, ImageError> {
        Ok(postcard::to_allocvec(self)?)
    }

    pub fn from_bytes(bytes: &[u8]) -> Result<Self, ImageError> {
        Ok(postcard::from_bytes(bytes)?)
    }

    /// Fresh, independent tables ready for the interpreter.
    pub fn into_tables(self) -> (SymbolTable, QuadTable) {
        (self.symbols, QuadTable::from_quads(self.quads))
    }
}
