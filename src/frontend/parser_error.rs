/// What went wrong in a [`ParseError`].
#[derive(Debug, Clone, PartialEq)]
pub enum ParseErrorKind {
    /// A grammar rule needed `expected` but the scanner delivered `found`.
    Syntax { expected: String, found: String },

    /// Declaration conflicts and unresolved labels.
    Semantic(String),
}

/// A parse error with the source line it was detected on.
///
/// `line` is 1-based; `text` is that line's source, reported alongside the
/// message so diagnostics stand on their own.
#[derive(Debug, Clone, PartialEq)]
pub struct ParseError {
    pub kind: ParseErrorKind,
    pub line: usize,
    pub text: String,
}

impl ParseError {
    pub fn syntax(expected: &str, found: &str, line: usize, text: &str) -> Self {
        ParseError {
            kind: ParseErrorKind::Syntax {
                expected: expected.to_string(),
                found: found.to_string(),
            },
            line,
            text: text.to_string(),
        }
    }

    pub fn semantic(message: &str, line: usize, text: &str) -> Self {
        ParseError {
            kind: ParseErrorKind::Semantic(message.to_string()),
            line,
            text: text.to_string(),
        }
    }

    pub fn is_syntax(&self) -> bool {
        matches!(self.kind, ParseErrorKind::Syntax { .. })
    }

    /// `Line #N: <source text>`, printed ahead of the message.
    pub fn location(&self) -> String {
        format!("Line #{}: {}", self.line, self.text)
    }

    /// The diagnostic without its `ERROR:` prefix.
    pub fn message(&self) -> String {
        match &self.kind {
            ParseErrorKind::Syntax { expected, found } => {
                format!("{} expected, but {} found.", expected, found)
            }
            ParseErrorKind::Semantic(message) => message.clone(),
        }
    }
}

impl std::fmt::Display for ParseError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "ERROR: {}", self.message())
    }
}

impl std::error::Error for ParseError {}
