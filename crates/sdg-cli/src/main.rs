use std::process::ExitCode;

use clap::{Parser, Subcommand};

use commands::{summary, validate};

mod commands;

#[derive(Parser, Debug)]
#[command(name = "sdg-audit", about = "SDG randomness ledger audit CLI")]
struct Cli {
    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Replay-validate a JSONL ledger against its declared seed and fingerprint.
    Validate(validate::ValidateArgs),
    /// Emit per-substream trace rollups from a JSONL ledger.
    Summary(summary::SummaryArgs),
}

fn main() -> ExitCode {
    let cli = Cli::parse();
    let outcome = match &cli.command {
        Command::Validate(args) => validate::run(args),
        Command::Summary(args) => summary::run(args),
    };
    match outcome {
        Ok(code) => code,
        Err(err) => {
            eprintln!("error: {err}");
            ExitCode::from(2)
        }
    }
}
