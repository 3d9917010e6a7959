//! Line-oriented output stream shared by the scanner, parser and interpreter.
//!
//! Nothing in the compiler core prints directly. Diagnostics, echoed source
//! lines, trace output and `PRINT` results all go through a [`Sink`] handed in
//! by the caller, so the same pipeline can write to a terminal or collect
//! lines in memory.

/// Receives one line of text at a time.
pub trait Sink {
    fn line(&mut self, text: &str);

    /// A compile error, printed as `ERROR: <message>`.
    fn error(&mut self, message: &str) {
        self.line(&format!("ERROR: {}", message));
    }

    /// A non-fatal diagnostic, printed as `WARNING: <message>`.
    fn warning(&mut self, message: &str) {
        self.line(&format!("WARNING: {}", message));
    }
}

/// Writes every line to standard output.
#[derive(Debug, Default)]
pub struct Console;

impl Sink for Console {
    fn line(&mut self, text: &str) {
        println!("{}", text);
    }
}

impl Sink for Vec<String> {
    fn line(&mut self, text: &str) {
        self.push(text.to_string());
    }
}

/// Forwards everything to another sink, counting the errors and warnings
/// reported through it.
pub struct Tally<'a> {
    inner: &'a mut dyn Sink,
    pub errors: usize,
    pub warnings: usize,
}

impl<'a> Tally<'a> {
    pub fn new(inner: &'a mut dyn Sink) -> Self {
        Tally {
            inner,
            errors: 0,
            warnings: 0,
        }
    }
}

impl Sink for Tally<'_> {
    fn line(&mut self, text: &str) {
        self.inner.line(text);
    }

    fn error(&mut self, message: &str) {
        self.errors += 1;
        self.inner.error(message);
    }

    fn warning(&mut self, message: &str) {
        self.warnings += 1;
        self.inner.warning(message);
    }
}
