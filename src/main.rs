use clap::Parser;

use quadc::cli::Cli;
use quadc::diagnostics::Console;

fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    stderrlog::new()
        .module("quadc")
        .verbosity(1 + cli.verbose as usize)
        .init()?;

    quadc::run_cli(&cli, &mut Console)
}
