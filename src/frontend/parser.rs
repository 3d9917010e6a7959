use std::collections::{HashMap, HashSet};

use crate::diagnostics::{Sink, Tally};
use crate::frontend::lexer::{Lexer, LexerOptions};
use crate::frontend::parser_error::ParseError;
use crate::ir::{Opcode, ProgramImage, QuadTable, SymbolKind, SymbolTable};
use crate::lang::{DataType, ReserveTable, Token, TokenCode, Value};

/// Parser switches.
#[derive(Debug, Clone, Copy, Default)]
pub struct ParserOptions {
    /// Print rule entry/exit and every token consumed.
    pub trace: bool,
    /// Echo source lines as they are scanned.
    pub echo: bool,
    /// Warn about identifiers first seen inside the program body.
    pub warn_undeclared: bool,
}

/// Result of compiling one program.
///
/// The tables are complete even when errors were found; only a clean
/// compilation should be handed to the interpreter.
#[derive(Debug, Clone)]
pub struct Compilation {
    pub symbols: SymbolTable,
    pub quads: QuadTable,
    pub errors: usize,
    pub warnings: usize,
}

impl Compilation {
    pub fn is_clean(&self) -> bool {
        self.errors == 0
    }

    pub fn image(&self) -> ProgramImage {
        ProgramImage::new(&self.symbols, &self.quads)
    }
}

/// Compiles a program given as source lines.
pub fn compile(lines: &[String], options: ParserOptions, out: &mut dyn Sink) -> Compilation {
    Parser::new(lines, options, out).parse()
}

fn operand(index: usize) -> i32 {
    index as i32
}

/// Recursive-descent parser that emits quads as it recognizes constructs.
///
/// Each grammar rule is one method returning `Result`; a syntax error unwinds
/// to the innermost statement list, which reports it and resynchronizes on
/// the next statement start. Forward branches are emitted with a zero target
/// and patched once the target address is known.
pub struct Parser<'a> {
    lexer: Lexer,
    token: Token,
    /// Tokens consumed so far; lets recovery tell whether a failed statement
    /// made progress.
    consumed: usize,
    symbols: SymbolTable,
    quads: QuadTable,
    mnemonics: ReserveTable,
    out: Tally<'a>,
    options: ParserOptions,
    declared_variables: HashSet<usize>,
    declared_labels: HashSet<usize>,
    program_name: Option<usize>,
    temp_count: usize,
    /// Set after a syntax error is reported; further syntax errors stay
    /// quiet until a statement parses cleanly.
    recovering: bool,
    minus_one: usize,
    plus_one: usize,
    label_addresses: HashMap<usize, usize>,
    /// `BR` quads waiting for a label to be defined: (quad, label symbol).
    pending_gotos: Vec<(usize, usize)>,
}

impl<'a> Parser<'a> {
    pub fn new(lines: &[String], options: ParserOptions, out: &'a mut dyn Sink) -> Self {
        let lexer = Lexer::with_options(
            lines,
            LexerOptions {
                echo: options.echo,
                warn_undeclared: options.warn_undeclared,
            },
        );

        let mut symbols = SymbolTable::new();
        let minus_one = symbols.add_symbol("-1", SymbolKind::Constant, Value::Int(-1));
        let plus_one = symbols.add_symbol("1", SymbolKind::Constant, Value::Int(1));

        Parser {
            lexer,
            token: Token::eof(0),
            consumed: 0,
            symbols,
            quads: QuadTable::new(),
            mnemonics: ReserveTable::token_mnemonics(),
            out: Tally::new(out),
            options,
            declared_variables: HashSet::new(),
            declared_labels: HashSet::new(),
            program_name: None,
            temp_count: 0,
            recovering: false,
            minus_one,
            plus_one,
            label_addresses: HashMap::new(),
            pending_gotos: Vec::new(),
        }
    }

    /// Parses the whole program and hands back the tables.
    pub fn parse(mut self) -> Compilation {
        self.advance();

        if let Err(e) = self.program() {
            self.report(&e);
        }
        self.check_pending_gotos();

        log::debug!(
            "compiled {} quads, {} symbols, {} errors",
            self.quads.len(),
            self.symbols.len(),
            self.out.errors
        );

        Compilation {
            symbols: self.symbols,
            quads: self.quads,
            errors: self.out.errors,
            warnings: self.out.warnings,
        }
    }

    // ---------------------------------------------------------------
    // Token plumbing
    // ---------------------------------------------------------------

    fn advance(&mut self) {
        self.token = self.lexer.next_token(&mut self.symbols, &mut self.out);
        self.consumed += 1;

        if self.options.trace && !self.token.is_eof() {
            let mnemonic = self
                .mnemonics
                .lookup_code(self.token.code.code())
                .unwrap_or("UNDF");
            let line = format!("Lexeme: {} Mnemonic: {}", self.token.lexeme, mnemonic);
            self.out.line(&line);
        }
    }

    fn at(&self, code: TokenCode) -> bool {
        !self.token.is_eof() && self.token.code == code
    }

    fn expect(&mut self, code: TokenCode, expected: &str) -> Result<(), ParseError> {
        if !self.at(code) {
            return Err(self.syntax_error(expected));
        }
        self.advance();
        Ok(())
    }

    /// Consumes an identifier and returns its symbol index.
    fn identifier(&mut self, expected: &str) -> Result<usize, ParseError> {
        match (self.at(TokenCode::Identifier), self.token.symbol) {
            (true, Some(index)) => {
                self.advance();
                Ok(index)
            }
            _ => Err(self.syntax_error(expected)),
        }
    }

    fn syntax_error(&self, expected: &str) -> ParseError {
        let found = if self.token.is_eof() {
            "end of file"
        } else {
            self.token.lexeme.as_str()
        };
        ParseError::syntax(expected, found, self.token.line, &self.lexer.line_text())
    }

    fn semantic_error(&self, message: &str) -> ParseError {
        ParseError::semantic(message, self.token.line, &self.lexer.line_text())
    }

    fn report(&mut self, error: &ParseError) {
        if self.recovering && error.is_syntax() {
            log::debug!("suppressed while recovering: {}", error);
            return;
        }
        self.out.line(&error.location());
        self.out.error(&error.message());
        if error.is_syntax() {
            self.recovering = true;
        }
    }

    fn warning(&mut self, message: &str) {
        self.out.warning(message);
    }

    fn name_of(&self, index: usize) -> String {
        self.symbols.get_symbol(index).name.clone()
    }

    fn rule<T>(
        &mut self,
        name: &str,
        body: impl FnOnce(&mut Self) -> Result<T, ParseError>,
    ) -> Result<T, ParseError> {
        if self.options.trace {
            self.out.line(&format!("ENTERING {}()", name));
        }
        let result = body(self);
        if self.options.trace {
            self.out.line(&format!("EXITING {}()", name));
        }
        result
    }

    // ---------------------------------------------------------------
    // Code generation helpers
    // ---------------------------------------------------------------

    fn next_address(&self) -> i32 {
        operand(self.quads.next_quad())
    }

    /// Fresh `#tempN` variable for an intermediate result.
    fn gen_symbol(&mut self) -> usize {
        let name = format!("#temp{}", self.temp_count);
        self.temp_count += 1;
        log::trace!("new temporary {}", name);
        self.symbols
            .add_symbol(&name, SymbolKind::Variable, Value::Int(0))
    }

    fn emit(&mut self, opcode: Opcode, op1: usize, op2: usize, op3: usize) -> usize {
        self.quads
            .add_quad(opcode, operand(op1), operand(op2), operand(op3))
    }

    /// Emits a branch whose target is filled in later.
    fn emit_branch(&mut self, opcode: Opcode, tested: usize) -> usize {
        self.quads.add_quad(opcode, operand(tested), 0, 0)
    }

    fn patch_to_here(&mut self, branch: usize) {
        let target = self.next_address();
        self.quads.set_quad_op3(branch, target);
    }

    // ---------------------------------------------------------------
    // Program structure
    // ---------------------------------------------------------------

    fn program(&mut self) -> Result<(), ParseError> {
        self.rule("Program", |p| {
            p.expect(TokenCode::Unit, "UNIT")?;
            p.prog_identifier()?;
            p.expect(TokenCode::Semicolon, ";")?;
            p.block()?;
            p.expect(TokenCode::Period, ".")?;
            p.quads.add_quad(Opcode::Stop, 0, 0, 0);

            if !p.token.is_eof() {
                let text = format!(
                    "text after end of program ignored, starting at '{}'",
                    p.token.lexeme
                );
                p.warning(&text);
            }
            Ok(())
        })
    }

    fn prog_identifier(&mut self) -> Result<(), ParseError> {
        self.rule("ProgIdentifier", |p| {
            let index = p.identifier("program name")?;
            p.symbols.set_kind(index, SymbolKind::ProgName);
            p.program_name = Some(index);
            Ok(())
        })
    }

    fn block(&mut self) -> Result<(), ParseError> {
        self.rule("Block", |p| {
            if p.at(TokenCode::Label) {
                p.label_declaration();
            }
            while p.at(TokenCode::Var) {
                p.variable_declaration_section();
            }

            // the token after BEGIN is the first one scanned past the
            // declarations
            p.lexer.set_past_declaration_section(true);
            p.block_body()
        })
    }

    // ---------------------------------------------------------------
    // Declarations
    // ---------------------------------------------------------------

    /// Skips the rest of a broken declaration.
    fn skip_declaration(&mut self) {
        while !self.token.is_eof()
            && !matches!(
                self.token.code,
                TokenCode::Semicolon | TokenCode::Var | TokenCode::Begin
            )
        {
            self.advance();
        }
        if self.at(TokenCode::Semicolon) {
            self.advance();
        }
        self.recovering = false;
    }

    fn label_declaration(&mut self) {
        let result = self.rule("LabelDeclaration", |p| {
            p.advance();
            p.declare_label()?;
            while p.at(TokenCode::Comma) {
                p.advance();
                p.declare_label()?;
            }
            p.expect(TokenCode::Semicolon, ";")
        });

        if let Err(e) = result {
            self.report(&e);
            self.skip_declaration();
        }
    }

    fn declare_label(&mut self) -> Result<(), ParseError> {
        let index = self.identifier("label name")?;
        let name = self.name_of(index);

        if self.program_name == Some(index) {
            return Err(self.semantic_error(&format!(
                "'{}' is the program name and cannot be a label",
                name
            )));
        }
        if self.declared_variables.contains(&index) {
            return Err(self.semantic_error(&format!(
                "'{}' is already declared as a variable",
                name
            )));
        }
        if !self.declared_labels.insert(index) {
            self.warning(&format!("label '{}' is declared more than once", name));
        }

        self.symbols.set_kind(index, SymbolKind::Label);
        Ok(())
    }

    fn variable_declaration_section(&mut self) {
        if self.options.trace {
            self.out.line("ENTERING VariableDeclarationSection()");
        }

        self.advance();
        loop {
            if let Err(e) = self.variable_declaration() {
                self.report(&e);
                self.skip_declaration();
            }
            if !self.at(TokenCode::Identifier) {
                break;
            }
        }

        if self.options.trace {
            self.out.line("EXITING VariableDeclarationSection()");
        }
    }

    fn variable_declaration(&mut self) -> Result<(), ParseError> {
        self.rule("VariableDeclaration", |p| {
            let mut names = vec![p.declare_variable_name()?];
            while p.at(TokenCode::Comma) {
                p.advance();
                names.push(p.declare_variable_name()?);
            }
            p.expect(TokenCode::Colon, ":")?;
            let data_type = p.type_spec()?;
            p.expect(TokenCode::Semicolon, ";")?;

            for index in names {
                p.symbols.declare_variable(index, data_type);
                p.declared_variables.insert(index);
            }
            Ok(())
        })
    }

    fn declare_variable_name(&mut self) -> Result<usize, ParseError> {
        let index = self.identifier("variable name")?;
        let name = self.name_of(index);

        if self.program_name == Some(index) {
            return Err(self.semantic_error(&format!(
                "'{}' is the program name and cannot be a variable",
                name
            )));
        }
        if self.declared_labels.contains(&index) {
            return Err(self.semantic_error(&format!(
                "'{}' is already declared as a label",
                name
            )));
        }
        if self.declared_variables.contains(&index) {
            self.warning(&format!("variable '{}' is declared more than once", name));
        }
        Ok(index)
    }

    fn type_spec(&mut self) -> Result<DataType, ParseError> {
        self.rule("Type", |p| {
            let data_type = match p.token.code {
                _ if p.token.is_eof() => return Err(p.syntax_error("type")),
                TokenCode::Integer => DataType::Integer,
                TokenCode::Real => DataType::Double,
                TokenCode::String => DataType::String,
                TokenCode::Array => return p.array_type(),
                _ => return Err(p.syntax_error("type")),
            };
            p.advance();
            Ok(data_type)
        })
    }

    fn array_type(&mut self) -> Result<DataType, ParseError> {
        self.advance();
        self.expect(TokenCode::LBracket, "[")?;
        self.expect(TokenCode::IntConst, "array size")?;
        self.expect(TokenCode::RBracket, "]")?;
        self.expect(TokenCode::Of, "OF")?;
        self.expect(TokenCode::Integer, "INTEGER")?;
        self.warning("arrays are not supported");
        Ok(DataType::Invalid)
    }

    // ---------------------------------------------------------------
    // Statements
    // ---------------------------------------------------------------

    fn block_body(&mut self) -> Result<(), ParseError> {
        self.rule("BlockBody", |p| {
            p.expect(TokenCode::Begin, "BEGIN")?;
            p.statement_list();
            p.expect(TokenCode::End, "END")
        })
    }

    /// `statement { ; statement }`, recovering from errors in between.
    fn statement_list(&mut self) {
        loop {
            let start = self.consumed;
            match self.statement() {
                Ok(()) => self.recovering = false,
                Err(e) => {
                    self.report(&e);
                    self.resync(start);
                }
            }

            if self.at(TokenCode::Semicolon) {
                self.advance();
                continue;
            }
            if self.token.is_eof() || matches!(self.token.code, TokenCode::End | TokenCode::Period)
            {
                break;
            }

            let e = self.syntax_error(";");
            self.report(&e);
            if !self.token.code.is_statement_start() {
                let start = self.consumed;
                self.resync(start);
            }
        }
    }

    /// Discards tokens up to the next statement start, `END`, `.` or end of
    /// file.
    fn resync(&mut self, start: usize) {
        if self.consumed == start && self.token.code.is_statement_start() {
            self.advance();
        }

        let mut skipped = 0;
        while !self.token.is_eof()
            && !self.token.code.is_statement_start()
            && !matches!(self.token.code, TokenCode::End | TokenCode::Period)
        {
            self.advance();
            skipped += 1;
        }
        log::debug!(
            "resynchronized at line {} on '{}' after skipping {} tokens",
            self.token.line,
            self.token.lexeme,
            skipped
        );
    }

    fn statement(&mut self) -> Result<(), ParseError> {
        self.rule("Statement", |p| {
            while p.at(TokenCode::Identifier) && p.current_is_label() {
                let index = p.identifier("label")?;
                if !p.at(TokenCode::Colon) {
                    // a label in front of `:=` is an assignment target
                    p.check_variable_use(index);
                    return p.assignment_to(index);
                }
                p.advance();
                p.define_label(index);
            }

            if p.token.is_eof() {
                return Ok(());
            }

            match p.token.code {
                TokenCode::Identifier => p.assignment(),
                TokenCode::Begin => p.block_body(),
                TokenCode::If => p.if_statement(),
                TokenCode::While => p.while_statement(),
                TokenCode::Repeat => p.repeat_statement(),
                TokenCode::For => p.for_statement(),
                TokenCode::Goto => p.goto_statement(),
                TokenCode::Writeln => p.writeln_statement(),
                // empty statement
                TokenCode::End
                | TokenCode::Semicolon
                | TokenCode::Until
                | TokenCode::Else
                | TokenCode::Period => Ok(()),
                _ => Err(p.syntax_error("statement")),
            }
        })
    }

    fn current_is_label(&self) -> bool {
        self.token
            .symbol
            .map(|index| self.symbols.get_symbol(index).kind == SymbolKind::Label)
            .unwrap_or(false)
    }

    /// `label :` defines the label at the next quad address.
    fn define_label(&mut self, index: usize) {
        let name = self.name_of(index);
        let address = self.quads.next_quad();
        if self.label_addresses.contains_key(&index) {
            let e = self.semantic_error(&format!("label '{}' is defined more than once", name));
            self.report(&e);
            return;
        }

        self.label_addresses.insert(index, address);
        self.symbols.set_value(index, Value::Int(address as i64));
        log::debug!("label {} defined at {}", name, address);

        let (ready, waiting): (Vec<_>, Vec<_>) = self
            .pending_gotos
            .drain(..)
            .partition(|&(_, label)| label == index);
        self.pending_gotos = waiting;
        for (quad, _) in ready {
            self.quads.set_quad_op3(quad, operand(address));
        }
    }

    /// Consumes an identifier used as a variable, warning on kind mismatch.
    fn variable(&mut self) -> Result<usize, ParseError> {
        self.rule("Variable", |p| {
            let index = p.identifier("variable")?;
            p.check_variable_use(index);
            Ok(index)
        })
    }

    fn check_variable_use(&mut self, index: usize) {
        let symbol = self.symbols.get_symbol(index);
        let misuse = match symbol.kind {
            SymbolKind::Label => Some("a label"),
            SymbolKind::ProgName => Some("the program name"),
            _ => None,
        };
        if let Some(what) = misuse {
            let text = format!("'{}' is {} but is used as a variable", symbol.name, what);
            self.warning(&text);
        }
    }

    fn assignment(&mut self) -> Result<(), ParseError> {
        let target = self.variable()?;
        self.assignment_to(target)
    }

    /// The rest of an assignment once its target has been consumed.
    fn assignment_to(&mut self, target: usize) -> Result<(), ParseError> {
        self.rule("Assignment", |p| {
            p.expect(TokenCode::Assign, ":=")?;
            let source = p.expression_or_string()?;
            p.emit(Opcode::Mov, source, 0, target);
            Ok(())
        })
    }

    fn expression_or_string(&mut self) -> Result<usize, ParseError> {
        match (self.at(TokenCode::StringConst), self.token.symbol) {
            (true, Some(index)) => {
                self.advance();
                Ok(index)
            }
            _ => self.simple_expression(),
        }
    }

    fn if_statement(&mut self) -> Result<(), ParseError> {
        self.rule("IfStatement", |p| {
            p.advance();
            let branch = p.rel_expression()?;
            p.expect(TokenCode::Then, "THEN")?;
            p.statement()?;

            if p.at(TokenCode::Else) {
                p.advance();
                let skip_else = p.quads.add_quad(Opcode::Br, 0, 0, 0);
                p.patch_to_here(branch);
                p.statement()?;
                p.patch_to_here(skip_else);
            } else {
                p.patch_to_here(branch);
            }
            Ok(())
        })
    }

    fn while_statement(&mut self) -> Result<(), ParseError> {
        self.rule("WhileStatement", |p| {
            p.advance();
            let top = p.next_address();
            let branch = p.rel_expression()?;
            p.expect(TokenCode::Do, "DO")?;
            p.statement()?;
            p.quads.add_quad(Opcode::Br, 0, 0, top);
            p.patch_to_here(branch);
            Ok(())
        })
    }

    fn repeat_statement(&mut self) -> Result<(), ParseError> {
        self.rule("RepeatStatement", |p| {
            p.advance();
            let top = p.next_address();
            p.statement()?;
            while p.at(TokenCode::Semicolon) {
                p.advance();
                p.statement()?;
            }
            p.expect(TokenCode::Until, "UNTIL")?;
            let branch = p.rel_expression()?;
            p.quads.set_quad_op3(branch, top);
            Ok(())
        })
    }

    fn for_statement(&mut self) -> Result<(), ParseError> {
        self.rule("ForStatement", |p| {
            p.advance();
            let counter = p.variable()?;
            p.expect(TokenCode::Assign, ":=")?;
            let initial = p.simple_expression()?;
            p.emit(Opcode::Mov, initial, 0, counter);
            p.expect(TokenCode::To, "TO")?;

            let top = p.next_address();
            let limit = p.simple_expression()?;
            let temp = p.gen_symbol();
            p.emit(Opcode::Sub, counter, limit, temp);
            let exit = p.emit_branch(Opcode::Bp, temp);

            p.expect(TokenCode::Do, "DO")?;
            p.statement()?;

            let one = p.plus_one;
            p.emit(Opcode::Add, counter, one, counter);
            p.quads.add_quad(Opcode::Br, 0, 0, top);
            p.patch_to_here(exit);
            Ok(())
        })
    }

    fn goto_statement(&mut self) -> Result<(), ParseError> {
        self.rule("GotoStatement", |p| {
            p.advance();
            let index = p.identifier("label")?;
            if p.symbols.get_symbol(index).kind != SymbolKind::Label {
                let text = format!("'{}' is not declared as a label", p.name_of(index));
                p.warning(&text);
            }

            match p.label_addresses.get(&index).copied() {
                Some(address) => {
                    p.quads.add_quad(Opcode::Br, 0, 0, operand(address));
                }
                None => {
                    let quad = p.quads.add_quad(Opcode::Br, 0, 0, 0);
                    p.pending_gotos.push((quad, index));
                }
            }
            Ok(())
        })
    }

    fn writeln_statement(&mut self) -> Result<(), ParseError> {
        self.rule("WritelnStatement", |p| {
            p.advance();
            p.expect(TokenCode::LPar, "(")?;
            let value = p.expression_or_string()?;
            p.expect(TokenCode::RPar, ")")?;
            p.emit(Opcode::Print, value, 0, 0);
            Ok(())
        })
    }

    fn check_pending_gotos(&mut self) {
        let mut reported = HashSet::new();
        let pending = std::mem::take(&mut self.pending_gotos);
        for (_, label) in pending {
            if reported.insert(label) {
                let e = self.semantic_error(&format!(
                    "label '{}' is never defined",
                    self.name_of(label)
                ));
                self.report(&e);
            }
        }
    }

    // ---------------------------------------------------------------
    // Expressions
    // ---------------------------------------------------------------

    /// Emits `SUB left, right, temp` and a branch taken when the comparison
    /// is false. Returns the branch quad so the caller can patch its target.
    fn rel_expression(&mut self) -> Result<usize, ParseError> {
        self.rule("RelExpression", |p| {
            let left = p.simple_expression()?;

            let relop = p.token.code;
            let branch = match Opcode::branch_for_false(relop) {
                Some(op) if !p.token.is_eof() => op,
                _ => return Err(p.syntax_error("relational operator")),
            };
            p.advance();

            let right = p.simple_expression()?;
            let temp = p.gen_symbol();
            p.emit(Opcode::Sub, left, right, temp);
            Ok(p.emit_branch(branch, temp))
        })
    }

    fn simple_expression(&mut self) -> Result<usize, ParseError> {
        self.rule("SimpleExpression", |p| {
            let negate = match p.token.code {
                TokenCode::Minus if !p.token.is_eof() => {
                    p.advance();
                    true
                }
                TokenCode::Plus if !p.token.is_eof() => {
                    p.advance();
                    false
                }
                _ => false,
            };

            let mut left = p.term()?;
            if negate {
                let temp = p.gen_symbol();
                let minus_one = p.minus_one;
                p.emit(Opcode::Mul, left, minus_one, temp);
                left = temp;
            }

            while !p.token.is_eof() && p.token.code.is_add_op() {
                let op = if p.token.code == TokenCode::Plus {
                    Opcode::Add
                } else {
                    Opcode::Sub
                };
                p.advance();
                let right = p.term()?;
                let temp = p.gen_symbol();
                p.emit(op, left, right, temp);
                left = temp;
            }
            Ok(left)
        })
    }

    fn term(&mut self) -> Result<usize, ParseError> {
        self.rule("Term", |p| {
            let mut left = p.factor()?;
            while !p.token.is_eof() && p.token.code.is_mul_op() {
                let op = if p.token.code == TokenCode::Multiply {
                    Opcode::Mul
                } else {
                    Opcode::Div
                };
                p.advance();
                let right = p.factor()?;
                let temp = p.gen_symbol();
                p.emit(op, left, right, temp);
                left = temp;
            }
            Ok(left)
        })
    }

    fn factor(&mut self) -> Result<usize, ParseError> {
        self.rule("Factor", |p| {
            if p.token.is_eof() {
                return Err(p.syntax_error("factor"));
            }
            match (p.token.code, p.token.symbol) {
                (TokenCode::IntConst | TokenCode::FloatConst, Some(index)) => {
                    p.advance();
                    Ok(index)
                }
                (TokenCode::Identifier, _) => p.variable(),
                (TokenCode::LPar, _) => {
                    p.advance();
                    let inner = p.simple_expression()?;
                    p.expect(TokenCode::RPar, ")")?;
                    Ok(inner)
                }
                _ => Err(p.syntax_error("factor")),
            }
        })
    }
}
