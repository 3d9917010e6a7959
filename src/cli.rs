use clap::{ArgAction, Parser};
use std::path::PathBuf;

use crate::frontend::ParserOptions;
use crate::runtime::InterpreterConfig;

#[derive(Parser, Debug)]
#[command(author, version, about)]
pub struct Cli {
    /// Source program (or a compiled image with --image)
    pub input: PathBuf,

    /// Print every quad as the interpreter executes it
    #[arg(long)]
    pub trace: bool,

    /// Print parser rule entry/exit and every token consumed
    #[arg(long)]
    pub parse_trace: bool,

    /// Echo source lines as they are scanned
    #[arg(long)]
    pub echo: bool,

    /// Warn about identifiers that were never declared
    #[arg(long)]
    pub warn_undeclared: bool,

    /// Only scan the input and list its tokens
    #[arg(long)]
    pub tokens: bool,

    /// Plain token listing without ANSI colors
    #[arg(long)]
    pub no_color: bool,

    /// Leave symbol-table indices out of the token listing
    #[arg(long)]
    pub no_symbols: bool,

    /// Compile without running
    #[arg(long)]
    pub no_run: bool,

    /// Skip the final symbol and quad table dump
    #[arg(long)]
    pub no_dump: bool,

    /// Also list the reserved-word and opcode tables
    #[arg(long)]
    pub reserve: bool,

    /// Abort the run after N executed quads
    #[arg(long, value_name = "N")]
    pub max_steps: Option<usize>,

    /// Write the compiled program image to PATH
    #[arg(long, value_name = "PATH")]
    pub save_image: Option<PathBuf>,

    /// Treat INPUT as an image written by --save-image
    #[arg(long)]
    pub image: bool,

    /// Log verbosity (-v debug, -vv trace)
    #[arg(short, long, action = ArgAction::Count)]
    pub verbose: u8,
}

impl Cli {
    pub fn parser_options(&self) -> ParserOptions {
        ParserOptions {
            trace: self.parse_trace,
            echo: self.echo,
            warn_undeclared: self.warn_undeclared,
        }
    }

    pub fn interpreter_config(&self) -> InterpreterConfig {
        InterpreterConfig {
            trace: self.trace,
            max_steps: self.max_steps,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults() {
        let cli = Cli::try_parse_from(["quadc", "prog.pas"]).unwrap();
        assert_eq!(cli.input, PathBuf::from("prog.pas"));
        assert!(!cli.trace && !cli.tokens && !cli.image && !cli.no_symbols);
        assert_eq!(cli.max_steps, None);
        assert_eq!(cli.verbose, 0);
    }

    #[test]
    fn test_flags_map_to_options() {
        let cli = Cli::try_parse_from([
            "quadc",
            "prog.pas",
            "--trace",
            "--parse-trace",
            "--warn-undeclared",
            "--max-steps",
            "500",
            "-vv",
        ])
        .unwrap();

        let options = cli.parser_options();
        assert!(options.trace);
        assert!(!options.echo);
        assert!(options.warn_undeclared);

        let config = cli.interpreter_config();
        assert!(config.trace);
        assert_eq!(config.max_steps, Some(500));
        assert_eq!(cli.verbose, 2);
    }

    #[test]
    fn test_input_is_required() {
        assert!(Cli::try_parse_from(["quadc"]).is_err());
    }
}
