/// A fault raised while executing a guest program.
#[derive(Debug, Clone, PartialEq)]
pub struct RuntimeError {
    pub message: String,
    /// Address of the quad being executed, once known.
    pub pc: Option<usize>,
}

impl std::fmt::Display for RuntimeError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self.pc {
            Some(pc) => write!(f, "runtime error at quad {}: {}", pc, self.message),
            None => write!(f, "runtime error: {}", self.message),
        }
    }
}

impl std::error::Error for RuntimeError {}

impl RuntimeError {
    pub fn new(msg: &str) -> Self {
        RuntimeError {
            message: msg.to_string(),
            pc: None,
        }
    }

    pub fn at(mut self, pc: usize) -> Self {
        self.pc = Some(pc);
        self
    }
}
