use crate::diagnostics::Sink;
use crate::ir::{SymbolKind, SymbolTable};
use crate::lang::{DataType, ReserveTable, Token, TokenCode, Value};

const MAX_IDENTIFIER_LENGTH: usize = 30;
const MAX_NUMERIC_LENGTH: usize = 16;

/// States of the scanning automaton.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum State {
    Start,
    IntegerStart,
    IntegerAccept,
    FloatingPointStart,
    SciNotation,
    SciNotationSign,
    SciNotationDigit,
    FloatingPointAccept,
    IdentifierStart,
    IdentifierAccept,
    StringStart,
    StringAccept,
    Comment1Body,
    Comment2Start,
    Comment2Body,
    Comment2Close,
    OneOrTwoCharAccept,
    Undefined,
}

impl State {
    /// Only these states may run past the end of a source line.
    fn crosses_lines(self) -> bool {
        matches!(
            self,
            State::Start
                | State::Comment1Body
                | State::Comment2Start
                | State::Comment2Body
                | State::Comment2Close
        )
    }
}

/// Scanner switches.
#[derive(Debug, Clone, Copy, Default)]
pub struct LexerOptions {
    /// Print every source line as it is first reached.
    pub echo: bool,
    /// Report identifiers first seen after the declaration section.
    pub warn_undeclared: bool,
}

/// Finite-automaton scanner over a list of source lines.
///
/// Identifiers and literals are registered in the symbol table as they are
/// scanned; each returned [`Token`] carries the index it was given.
/// Problems are reported to the sink and scanning carries on.
pub struct Lexer {
    lines: Vec<Vec<char>>,
    /// Number of lines loaded so far, i.e. the 1-based current line.
    line_index: usize,
    char_index: usize,
    current: char,
    state: State,
    eof: bool,
    eol: bool,
    options: LexerOptions,
    past_declaration_section: bool,
    reserved: ReserveTable,
}

impl Lexer {
    pub fn new(lines: &[String]) -> Self {
        Self::with_options(lines, LexerOptions::default())
    }

    pub fn with_options(lines: &[String], options: LexerOptions) -> Self {
        Lexer {
            lines: lines.iter().map(|l| l.chars().collect()).collect(),
            line_index: 0,
            char_index: 0,
            current: ' ',
            state: State::Start,
            eof: false,
            eol: false,
            options,
            past_declaration_section: false,
            reserved: ReserveTable::reserved_words(),
        }
    }

    /// Marks the end of the declarations. From then on, with
    /// `warn_undeclared`, identifiers seen for the first time are reported.
    pub fn set_past_declaration_section(&mut self, past: bool) {
        self.past_declaration_section = past;
    }

    pub fn is_eof(&self) -> bool {
        self.eof
    }

    pub fn is_eol(&self) -> bool {
        self.eol
    }

    /// 1-based number of the line being scanned (0 before the first token).
    pub fn line_number(&self) -> usize {
        self.line_index
    }

    pub fn line_text(&self) -> String {
        self.current_line().iter().collect()
    }

    fn current_line(&self) -> &[char] {
        match self.line_index {
            0 => &[],
            n => self.lines[n - 1].as_slice(),
        }
    }

    /// Non-consuming peek at the next character on the current line; a
    /// space at end of line.
    fn look_ahead(&self) -> char {
        self.current_line()
            .get(self.char_index)
            .copied()
            .unwrap_or(' ')
    }

    fn load_next_line(&mut self, out: &mut dyn Sink) {
        self.line_index += 1;
        self.char_index = 0;
        if self.options.echo {
            out.line(&format!("Line #{} {}", self.line_index, self.line_text()));
        }
    }

    /// Advances to the next character, loading further lines when the
    /// current state allows it. Returns false at end of line (for states that
    /// stay on one line) or end of file.
    fn advance(&mut self, out: &mut dyn Sink) -> bool {
        loop {
            if let Some(&ch) = self.current_line().get(self.char_index) {
                self.current = ch;
                self.char_index += 1;
                self.eol = false;
                return true;
            }

            if self.line_index > 0 && !self.state.crosses_lines() {
                self.eol = true;
                return false;
            }

            if self.line_index >= self.lines.len() {
                self.eof = true;
                return false;
            }

            self.load_next_line(out);
        }
    }

    /// Scans the next token. Past the end of the source this keeps returning
    /// an end-of-file token (see [`Token::is_eof`]).
    pub fn next_token(&mut self, symbols: &mut SymbolTable, out: &mut dyn Sink) -> Token {
        loop {
            self.state = State::Start;

            // START crosses lines, so running out here means end of file
            if !self.advance(out) {
                return Token::eof(self.line_index);
            }

            let token = match self.current {
                ch if ch.is_whitespace() => continue,
                '{' => {
                    if self.skip_brace_comment(out) {
                        continue;
                    }
                    return Token::eof(self.line_index);
                }
                '(' if self.look_ahead() == '*' => {
                    if self.skip_paren_comment(out) {
                        continue;
                    }
                    return Token::eof(self.line_index);
                }
                ch if is_one_or_two_char_start(ch) => self.read_operator(ch, out),
                ch if ch.is_ascii_digit() => self.read_number(symbols, out),
                ch if ch.is_ascii_alphabetic() => self.read_identifier(symbols, out),
                '"' => self.read_string(symbols, out),
                ch => self.accept(TokenCode::Undefined, State::Undefined, ch.to_string()),
            };

            return token;
        }
    }

    /// Scans the remaining source into a token list (without the end marker).
    pub fn tokenize(&mut self, symbols: &mut SymbolTable, out: &mut dyn Sink) -> Vec<Token> {
        let mut tokens = Vec::new();
        loop {
            let token = self.next_token(symbols, out);
            if token.is_eof() {
                break;
            }
            tokens.push(token);
        }
        tokens
    }

    fn accept(&mut self, code: TokenCode, state: State, lexeme: String) -> Token {
        self.state = state;
        Token::new(code, lexeme, self.line_index)
    }

    /// `{ ... }`; returns false when the file ends first.
    fn skip_brace_comment(&mut self, out: &mut dyn Sink) -> bool {
        self.state = State::Comment1Body;
        loop {
            if !self.advance(out) {
                out.warning("End of file found before comment terminated");
                return false;
            }
            if self.current == '}' {
                self.state = State::Start;
                return true;
            }
        }
    }

    /// `(* ... *)`; returns false when the file ends first.
    fn skip_paren_comment(&mut self, out: &mut dyn Sink) -> bool {
        self.state = State::Comment2Start;
        self.advance(out); // the '*' seen by look-ahead
        self.state = State::Comment2Body;
        loop {
            if !self.advance(out) {
                out.warning("End of file found before comment terminated");
                return false;
            }
            if self.current == '*' {
                self.state = State::Comment2Close;
                if self.look_ahead() == ')' {
                    self.advance(out);
                    self.state = State::Start;
                    return true;
                }
                self.state = State::Comment2Body;
            }
        }
    }

    fn read_operator(&mut self, first: char, out: &mut dyn Sink) -> Token {
        self.state = State::OneOrTwoCharAccept;
        let mut lexeme = first.to_string();

        let next = self.look_ahead();
        let pairs = match first {
            ':' | '>' => next == '=',
            '<' => next == '=' || next == '>',
            _ => false,
        };
        if pairs {
            self.advance(out);
            lexeme.push(self.current);
        }

        let code = self
            .reserved
            .lookup_name(&lexeme)
            .and_then(TokenCode::from_code)
            .unwrap_or(TokenCode::Undefined);
        self.accept(code, State::OneOrTwoCharAccept, lexeme)
    }

    fn read_digits(&mut self, lexeme: &mut String, out: &mut dyn Sink) {
        while self.look_ahead().is_ascii_digit() {
            self.advance(out);
            lexeme.push(self.current);
        }
    }

    fn read_number(&mut self, symbols: &mut SymbolTable, out: &mut dyn Sink) -> Token {
        self.state = State::IntegerStart;
        let mut lexeme = self.current.to_string();
        self.read_digits(&mut lexeme, out);

        if self.look_ahead() != '.' {
            self.state = State::IntegerAccept;
            let lexeme = truncate(lexeme, MAX_NUMERIC_LENGTH, out);
            return match lexeme.parse::<i64>() {
                Ok(n) => self.constant(symbols, TokenCode::IntConst, lexeme, Value::Int(n)),
                Err(e) => {
                    out.error(&format!("Invalid integer constant '{}': {}", lexeme, e));
                    self.accept(TokenCode::Undefined, State::Undefined, lexeme)
                }
            };
        }

        self.state = State::FloatingPointStart;
        self.advance(out);
        lexeme.push(self.current);
        self.read_digits(&mut lexeme, out);

        if matches!(self.look_ahead(), 'E' | 'e') {
            self.state = State::SciNotation;
            self.advance(out);
            lexeme.push(self.current);

            if matches!(self.look_ahead(), '+' | '-') {
                self.state = State::SciNotationSign;
                self.advance(out);
                lexeme.push(self.current);
            }

            if !self.look_ahead().is_ascii_digit() {
                out.error(&format!(
                    "Expected at least one exponent digit in '{}'",
                    lexeme
                ));
                return self.accept(TokenCode::Undefined, State::Undefined, lexeme);
            }

            self.state = State::SciNotationDigit;
            self.read_digits(&mut lexeme, out);
        }

        self.state = State::FloatingPointAccept;
        let lexeme = truncate(lexeme, MAX_NUMERIC_LENGTH, out);
        match lexeme.parse::<f64>() {
            Ok(v) => self.constant(symbols, TokenCode::FloatConst, lexeme, Value::Real(v)),
            Err(e) => {
                out.error(&format!("Invalid floating point constant '{}': {}", lexeme, e));
                self.accept(TokenCode::Undefined, State::Undefined, lexeme)
            }
        }
    }

    fn read_identifier(&mut self, symbols: &mut SymbolTable, out: &mut dyn Sink) -> Token {
        self.state = State::IdentifierStart;
        let mut lexeme = self.current.to_string();
        while is_identifier_char(self.look_ahead()) {
            self.advance(out);
            lexeme.push(self.current);
        }

        let lexeme = truncate(lexeme, MAX_IDENTIFIER_LENGTH, out);
        let name = lexeme.to_ascii_uppercase();

        if let Some(code) = self
            .reserved
            .lookup_name(&name)
            .and_then(TokenCode::from_code)
        {
            return self.accept(code, State::IdentifierAccept, lexeme);
        }

        let index = match symbols.lookup_identifier(&name) {
            Some(index) => index,
            None => {
                if self.options.warn_undeclared && self.past_declaration_section {
                    out.warning(&format!("Undeclared Identifier - '{}'", lexeme));
                }
                symbols.add_symbol(&name, SymbolKind::Variable, Value::Int(0))
            }
        };

        self.accept(TokenCode::Identifier, State::IdentifierAccept, lexeme)
            .with_symbol(index)
    }

    fn read_string(&mut self, symbols: &mut SymbolTable, out: &mut dyn Sink) -> Token {
        self.state = State::StringStart;
        let mut text = String::new();

        loop {
            if self.look_ahead() == '"' {
                self.advance(out);
                break;
            }
            if !self.advance(out) {
                out.warning("End of line was reached before \" was found to close string.");
                break;
            }
            text.push(self.current);
        }

        self.state = State::StringAccept;
        let value = Value::Text(text.clone());
        self.constant(symbols, TokenCode::StringConst, text, value)
    }

    /// Registers a literal as a constant unless an identical one exists.
    fn constant(
        &mut self,
        symbols: &mut SymbolTable,
        code: TokenCode,
        lexeme: String,
        value: Value,
    ) -> Token {
        let data_type: DataType = value.data_type();
        let index = match symbols.lookup_constant(&lexeme, data_type) {
            Some(index) => index,
            None => symbols.add_symbol(&lexeme, SymbolKind::Constant, value),
        };
        let state = self.state;
        self.accept(code, state, lexeme).with_symbol(index)
    }
}

fn truncate(lexeme: String, max: usize, out: &mut dyn Sink) -> String {
    if lexeme.chars().count() <= max {
        return lexeme;
    }
    out.warning(&format!(
        "Token length exceeds {}. Token has been truncated.",
        max
    ));
    lexeme.chars().take(max).collect()
}

fn is_one_or_two_char_start(ch: char) -> bool {
    "/*+-();=,[].:><".contains(ch)
}

fn is_identifier_char(ch: char) -> bool {
    ch.is_ascii_alphanumeric() || ch == '_' || ch == '$'
}

#[cfg(test)]
mod tests {
    use super::*;

    fn lines(source: &str) -> Vec<String> {
        source.lines().map(str::to_string).collect()
    }

    fn scan(source: &str) -> (Vec<Token>, SymbolTable, Vec<String>) {
        let mut symbols = SymbolTable::new();
        let mut out: Vec<String> = Vec::new();
        let tokens = Lexer::new(&lines(source)).tokenize(&mut symbols, &mut out);
        (tokens, symbols, out)
    }

    fn codes(source: &str) -> Vec<TokenCode> {
        scan(source).0.into_iter().map(|t| t.code).collect()
    }

    #[test]
    fn test_identifier_registered_as_variable() {
        let (tokens, symbols, _) = scan("n");
        assert_eq!(tokens.len(), 1);
        assert_eq!(tokens[0].code, TokenCode::Identifier);
        assert_eq!(tokens[0].code.code(), 50);

        let symbol = symbols.get_symbol(tokens[0].symbol.unwrap());
        assert_eq!(symbol.name, "N");
        assert_eq!(symbol.kind, SymbolKind::Variable);
        assert_eq!(symbol.value, Value::Int(0));
    }

    #[test]
    fn test_integer_registered_as_constant() {
        let (tokens, symbols, _) = scan("123");
        assert_eq!(tokens[0].code.code(), 51);
        let symbol = symbols.get_symbol(tokens[0].symbol.unwrap());
        assert_eq!(symbol.kind, SymbolKind::Constant);
        assert_eq!(symbol.value, Value::Int(123));
    }

    #[test]
    fn test_scientific_float() {
        let (tokens, symbols, _) = scan("1.5E-3");
        assert_eq!(tokens.len(), 1);
        assert_eq!(tokens[0].code.code(), 52);
        match symbols.get_symbol(tokens[0].symbol.unwrap()).value {
            Value::Real(v) => assert!((v - 0.0015).abs() < 1e-12),
            ref other => panic!("expected real, got {:?}", other),
        }
    }

    #[test]
    fn test_reserved_words_any_case() {
        for word in ["WHILE", "while", "While", "wHiLe"] {
            let (tokens, symbols, _) = scan(word);
            assert_eq!(tokens[0].code.code(), 14);
            assert_eq!(tokens[0].symbol, None);
            assert!(symbols.is_empty());
        }
    }

    #[test]
    fn test_repeated_identifier_reuses_slot() {
        let (tokens, symbols, _) = scan("count Count COUNT");
        assert_eq!(symbols.len(), 1);
        assert!(tokens.iter().all(|t| t.symbol == Some(0)));
    }

    #[test]
    fn test_one_and_two_char_operators() {
        assert_eq!(
            codes(":= : >= > <= <> < = . ; , ( ) [ ] + - * /"),
            vec![
                TokenCode::Assign,
                TokenCode::Colon,
                TokenCode::GreaterEq,
                TokenCode::Greater,
                TokenCode::LessEq,
                TokenCode::NotEqual,
                TokenCode::Less,
                TokenCode::Equal,
                TokenCode::Period,
                TokenCode::Semicolon,
                TokenCode::Comma,
                TokenCode::LPar,
                TokenCode::RPar,
                TokenCode::LBracket,
                TokenCode::RBracket,
                TokenCode::Plus,
                TokenCode::Minus,
                TokenCode::Multiply,
                TokenCode::Divide,
            ]
        );
    }

    #[test]
    fn test_operators_without_spaces() {
        assert_eq!(
            codes("x:=y<>3;"),
            vec![
                TokenCode::Identifier,
                TokenCode::Assign,
                TokenCode::Identifier,
                TokenCode::NotEqual,
                TokenCode::IntConst,
                TokenCode::Semicolon,
            ]
        );
    }

    #[test]
    fn test_comments_are_skipped_across_lines() {
        let source = "a { one\n two } b (* three\n * four *) c";
        assert_eq!(
            codes(source),
            vec![
                TokenCode::Identifier,
                TokenCode::Identifier,
                TokenCode::Identifier
            ]
        );
    }

    #[test]
    fn test_paren_without_star_is_lpar() {
        assert_eq!(
            codes("(a)"),
            vec![TokenCode::LPar, TokenCode::Identifier, TokenCode::RPar]
        );
    }

    #[test]
    fn test_unterminated_comment_warns_and_stops() {
        let (tokens, _, out) = scan("a { never closed\nb c");
        assert_eq!(tokens.len(), 1);
        assert!(out.iter().any(|l| l.contains("End of file found before comment terminated")));
    }

    #[test]
    fn test_unterminated_paren_comment_warns_and_stops() {
        let (tokens, _, out) = scan("a (* never *\nclosed b *");
        assert_eq!(tokens.len(), 1);
        assert_eq!(tokens[0].code, TokenCode::Identifier);
        assert_eq!(
            out,
            vec!["WARNING: End of file found before comment terminated".to_string()]
        );
    }

    #[test]
    fn test_string_literal() {
        let (tokens, symbols, out) = scan("writeln(\"hello world\")");
        assert!(out.is_empty());
        let string = &tokens[2];
        assert_eq!(string.code, TokenCode::StringConst);
        assert_eq!(string.lexeme, "hello world");
        let symbol = symbols.get_symbol(string.symbol.unwrap());
        assert_eq!(symbol.kind, SymbolKind::Constant);
        assert_eq!(symbol.value, Value::Text("hello world".into()));
    }

    #[test]
    fn test_unterminated_string_warns() {
        let (tokens, _, out) = scan("\"abc\nx");
        assert_eq!(tokens[0].code, TokenCode::StringConst);
        assert_eq!(tokens[0].lexeme, "abc");
        assert_eq!(tokens[1].code, TokenCode::Identifier);
        assert!(out.iter().any(|l| l.contains("close string")));
    }

    #[test]
    fn test_string_does_not_alias_identifier() {
        let (tokens, symbols, _) = scan("N \"N\"");
        assert_ne!(tokens[0].symbol, tokens[1].symbol);
        assert_eq!(symbols.len(), 2);
    }

    #[test]
    fn test_exponent_without_digits_is_rejected() {
        let (tokens, symbols, out) = scan("2.5E+ x");
        assert_eq!(tokens[0].code, TokenCode::Undefined);
        assert_eq!(tokens[0].lexeme, "2.5E+");
        assert_eq!(tokens[1].code, TokenCode::Identifier);
        assert!(out.iter().any(|l| l.contains("exponent")));
        // only X made it into the table
        assert_eq!(symbols.len(), 1);
    }

    #[test]
    fn test_float_without_exponent() {
        let (tokens, symbols, _) = scan("3.25");
        assert_eq!(tokens[0].code, TokenCode::FloatConst);
        assert_eq!(
            symbols.get_symbol(tokens[0].symbol.unwrap()).value,
            Value::Real(3.25)
        );
    }

    #[test]
    fn test_long_identifier_truncated() {
        let long = "a".repeat(40);
        let (tokens, symbols, out) = scan(&long);
        assert_eq!(tokens[0].lexeme.len(), 30);
        assert_eq!(symbols.get_symbol(0).name.len(), 30);
        assert!(out.iter().any(|l| l.contains("exceeds 30")));
    }

    #[test]
    fn test_long_number_truncated() {
        let (tokens, symbols, out) = scan("12345678901234567890");
        assert_eq!(tokens[0].lexeme, "1234567890123456");
        assert_eq!(symbols.get_symbol(0).value, Value::Int(1234567890123456));
        assert!(out.iter().any(|l| l.contains("exceeds 16")));
    }

    #[test]
    fn test_undefined_character() {
        let (tokens, _, _) = scan("a @ b");
        assert_eq!(tokens[1].code, TokenCode::Undefined);
        assert_eq!(tokens[1].lexeme, "@");
        assert!(!tokens[1].is_eof());
    }

    #[test]
    fn test_identifier_with_underscore_and_dollar() {
        let (tokens, _, _) = scan("my_var$2 next");
        assert_eq!(tokens[0].lexeme, "my_var$2");
        assert_eq!(tokens.len(), 2);
    }

    #[test]
    fn test_blank_lines_and_eof() {
        let mut symbols = SymbolTable::new();
        let mut out: Vec<String> = Vec::new();
        let mut lexer = Lexer::new(&lines("\n\n  x  \n\n"));
        let first = lexer.next_token(&mut symbols, &mut out);
        assert_eq!(first.code, TokenCode::Identifier);
        assert_eq!(first.line, 3);
        assert!(lexer.next_token(&mut symbols, &mut out).is_eof());
        assert!(lexer.is_eof());
        // stays at end of file
        assert!(lexer.next_token(&mut symbols, &mut out).is_eof());
    }

    #[test]
    fn test_empty_source() {
        let (tokens, _, _) = scan("");
        assert!(tokens.is_empty());
    }

    #[test]
    fn test_echo_prints_lines_when_reached() {
        let mut symbols = SymbolTable::new();
        let mut out: Vec<String> = Vec::new();
        let options = LexerOptions {
            echo: true,
            ..LexerOptions::default()
        };
        let mut lexer = Lexer::with_options(&lines("a\nb"), options);
        lexer.next_token(&mut symbols, &mut out);
        assert_eq!(out, vec!["Line #1 a".to_string()]);
        lexer.next_token(&mut symbols, &mut out);
        assert_eq!(out[1], "Line #2 b");
    }

    #[test]
    fn test_undeclared_warning_after_declarations() {
        let mut symbols = SymbolTable::new();
        let mut out: Vec<String> = Vec::new();
        let options = LexerOptions {
            warn_undeclared: true,
            ..LexerOptions::default()
        };
        let mut lexer = Lexer::with_options(&lines("a b a"), options);
        lexer.next_token(&mut symbols, &mut out);
        lexer.set_past_declaration_section(true);
        lexer.next_token(&mut symbols, &mut out);
        lexer.next_token(&mut symbols, &mut out);
        assert_eq!(out, vec!["WARNING: Undeclared Identifier - 'b'".to_string()]);
    }

    #[test]
    fn test_undeclared_warning_needs_option() {
        let mut symbols = SymbolTable::new();
        let mut out: Vec<String> = Vec::new();
        let mut lexer = Lexer::new(&lines("a b"));
        lexer.set_past_declaration_section(true);
        lexer.tokenize(&mut symbols, &mut out);
        assert!(out.is_empty());
    }
}
