use crate::diagnostics::Sink;
use crate::lang::{ReserveTable, Token, TokenCode};

/// Prints scanned tokens, one per line: source line, 4-character mnemonic,
/// numeric code, lexeme.
pub struct TokenDumper {
    pub color: bool,
    /// Include the symbol-table index for identifiers and literals.
    pub show_symbols: bool,
    mnemonics: ReserveTable,
}

impl Default for TokenDumper {
    fn default() -> Self {
        Self {
            color: true,
            show_symbols: true,
            mnemonics: ReserveTable::token_mnemonics(),
        }
    }
}

impl TokenDumper {
    // ANSI colors
    const RESET: &'static str = "\x1b[0m";
    const GRN: &'static str = "\x1b[32m";
    const YEL: &'static str = "\x1b[33m";
    const CYN: &'static str = "\x1b[36m";
    const MAG: &'static str = "\x1b[35m";
    const RED: &'static str = "\x1b[31m";

    pub fn new() -> Self {
        Self::default()
    }

    pub fn no_color(mut self) -> Self {
        self.color = false;
        self
    }

    pub fn pretty(mut self) -> Self {
        self.show_symbols = false;
        self
    }

    pub fn dump(&self, tokens: &[Token], out: &mut dyn Sink) {
        for token in tokens {
            out.line(&self.format_one(token));
        }
    }

    fn format_one(&self, token: &Token) -> String {
        let code = token.code.code();
        let mnemonic = self.mnemonics.lookup_code(code).unwrap_or("????");
        let colr = if self.color { Self::color(token.code) } else { "" };
        let reset = if self.color { Self::RESET } else { "" };

        let mut line = format!(
            "[{:03}] {}{} {:>2} {}{}",
            token.line, colr, mnemonic, code, token.lexeme, reset
        );
        if let (true, Some(index)) = (self.show_symbols, token.symbol) {
            line.push_str(&format!("  -> #{}", index));
        }
        line
    }

    fn color(code: TokenCode) -> &'static str {
        match code {
            TokenCode::StringConst => Self::GRN,
            TokenCode::IntConst | TokenCode::FloatConst => Self::CYN,
            TokenCode::Identifier => Self::YEL,
            TokenCode::Undefined => Self::RED,
            c if c.code() >= 30 => Self::MAG,
            _ => Self::RESET,
        }
    }
}
