use std::io::IsTerminal;

use anyhow::Result;
use clap::Parser;

use askme::{Host, ask};

/// Ask what you would want to know about this machine.
///
/// Answer the prompt with `cpu` for per-core processor details, `totalmem` for the total physical
/// memory in bytes, or `freemem` for the memory available in bytes. Any other answer is only
/// echoed back.
#[derive(Debug, clap::Parser)]
#[clap(author, version, about)]
struct Args {}

fn main() -> Result<()> {
    let Args {} = Args::parse();

    let stdin = std::io::stdin();
    let interactive = stdin.is_terminal();
    ask(stdin.lock(), std::io::stdout().lock(), &Host, interactive)?;

    Ok(())
}
