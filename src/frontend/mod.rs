//! Source text to quads: the scanner, the parser that drives it, and the
//! token listing used for debugging the scanner.

pub mod lexer;
pub mod parser;
pub mod parser_error;
pub mod token_dumper;

pub use lexer::{Lexer, LexerOptions};
pub use parser::{Compilation, Parser, ParserOptions, compile};
pub use parser_error::{ParseError, ParseErrorKind};
pub use token_dumper::TokenDumper;
