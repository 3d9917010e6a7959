//! # Language definitions
//!
//! Vocabulary shared by every stage of the pipeline: token classes, the
//! reserve tables that map mnemonics to codes, and the values symbols hold.

pub mod reserve;
pub mod token;
pub mod value;

pub use reserve::{ReserveTable, ReservedWord};
pub use token::{Token, TokenCode};
pub use value::{DataType, Value};
