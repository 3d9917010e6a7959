//! Intermediate representation: quads, the symbol table they address, and
//! the tooling to list or persist them.

pub mod disasm;
pub mod image;
pub mod op;
pub mod quad;
pub mod symbol;

pub use image::{ImageError, ProgramImage};
pub use op::Opcode;
pub use quad::{Quad, QuadTable};
pub use symbol::{Symbol, SymbolKind, SymbolTable};
