//! A compiler and interpreter for a small Pascal-like teaching language.
//!
//! Source lines are scanned and parsed in one pass into quadruples (opcode
//! plus three operands) over a symbol table, which the interpreter then
//! executes directly.

pub mod cli;
pub mod diagnostics;
pub mod frontend;
pub mod ir;
pub mod lang;
pub mod runtime;

use std::path::Path;

use anyhow::Context;

use crate::cli::Cli;
use crate::diagnostics::Sink;
use crate::frontend::{Lexer, LexerOptions, TokenDumper};
use crate::ir::{ProgramImage, QuadTable, SymbolTable, disasm};
use crate::lang::ReserveTable;
use crate::runtime::{Interpreter, InterpreterConfig, RuntimeError};

pub use crate::frontend::{Compilation, ParserOptions, compile};

/// Outcome of one interpreter run.
#[derive(Debug, Clone)]
pub struct Execution {
    /// Symbol table as the program left it.
    pub symbols: SymbolTable,
    pub fault: Option<RuntimeError>,
    pub steps: usize,
}

/// Runs `quads` against a private copy of `symbols`, so the same compiled
/// program can be run any number of times.
pub fn execute(
    symbols: &SymbolTable,
    quads: &QuadTable,
    config: InterpreterConfig,
    out: &mut dyn Sink,
) -> Execution {
    let mut memory = symbols.clone();
    let mut interpreter = Interpreter::with_config(config);
    let fault = interpreter.run(quads, &mut memory, out).err();

    Execution {
        symbols: memory,
        fault,
        steps: interpreter.steps(),
    }
}

pub fn read_source(path: &Path) -> anyhow::Result<Vec<String>> {
    let text = std::fs::read_to_string(path)
        .with_context(|| format!("Reading {}", path.display()))?;
    Ok(text.lines().map(str::to_string).collect())
}

/// Drives the whole pipeline for the command-line tool.
pub fn run_cli(cli: &Cli, out: &mut dyn Sink) -> anyhow::Result<()> {
    if cli.reserve {
        disasm::write_reserve_table("RESERVED WORDS", &ReserveTable::reserved_words(), out);
        disasm::write_reserve_table("OPCODES", &ReserveTable::opcodes(), out);
    }

    if cli.image {
        let bytes = std::fs::read(&cli.input)
            .with_context(|| format!("Reading {}", cli.input.display()))?;
        let image = ProgramImage::from_bytes(&bytes)
            .with_context(|| format!("Decoding image {}", cli.input.display()))?;
        let (symbols, quads) = image.into_tables();
        return run_and_dump(cli, &symbols, &quads, out);
    }

    let lines = read_source(&cli.input)?;

    if cli.tokens {
        let options = LexerOptions {
            echo: cli.echo,
            warn_undeclared: false,
        };
        let mut symbols = SymbolTable::new();
        let tokens = Lexer::with_options(&lines, options).tokenize(&mut symbols, out);
        let mut dumper = TokenDumper::new();
        if cli.no_color {
            dumper = dumper.no_color();
        }
        if cli.no_symbols {
            dumper = dumper.pretty();
        }
        dumper.dump(&tokens, out);
        return Ok(());
    }

    let compilation = compile(&lines, cli.parser_options(), out);
    out.line(&format!(
        "{} error(s), {} warning(s)",
        compilation.errors, compilation.warnings
    ));

    if !compilation.is_clean() {
        if !cli.no_dump {
            dump_tables(&compilation.symbols, &compilation.quads, out);
        }
        anyhow::bail!(
            "{} failed to compile ({} errors)",
            cli.input.display(),
            compilation.errors
        );
    }

    if let Some(path) = &cli.save_image {
        let bytes = compilation.image().to_bytes()?;
        std::fs::write(path, bytes).with_context(|| format!("Writing {}", path.display()))?;
        log::info!("wrote program image to {}", path.display());
    }

    run_and_dump(cli, &compilation.symbols, &compilation.quads, out)
}

fn run_and_dump(
    cli: &Cli,
    symbols: &SymbolTable,
    quads: &QuadTable,
    out: &mut dyn Sink,
) -> anyhow::Result<()> {
    if cli.no_run {
        if !cli.no_dump {
            dump_tables(symbols, quads, out);
        }
        return Ok(());
    }

    let execution = execute(symbols, quads, cli.interpreter_config(), out);
    if !cli.no_dump {
        dump_tables(&execution.symbols, quads, out);
    }

    match execution.fault {
        Some(fault) => Err(anyhow::Error::new(fault).context("program aborted")),
        None => Ok(()),
    }
}

fn dump_tables(symbols: &SymbolTable, quads: &QuadTable, out: &mut dyn Sink) {
    out.line("");
    disasm::write_symbol_table(symbols, out);
    out.line("");
    disasm::write_quad_table(quads, out);
}
