pub mod interpreter;
pub mod runtime_error;

pub use interpreter::{Interpreter, InterpreterConfig};
pub use runtime_error::RuntimeError;
