use std::path::PathBuf;
use std::process::ExitCode;

use clap::Args;
use sdg_audit::{summarize, trace, EventLedger};
use sdg_core::errors::ErrorInfo;
use sdg_core::SdgError;

#[derive(Args, Debug)]
pub struct SummaryArgs {
    /// JSONL event ledger produced by a generation run.
    #[arg(long)]
    pub events: PathBuf,
    /// CSV output path; prints to stdout when omitted.
    #[arg(long)]
    pub out: Option<PathBuf>,
}

pub fn run(args: &SummaryArgs) -> Result<ExitCode, SdgError> {
    let (_, events) = EventLedger::read_jsonl(&args.events)?;
    let summaries = summarize(&events);
    match &args.out {
        Some(path) => {
            trace::write_csv(&summaries, path).map_err(|err| {
                SdgError::Serde(
                    ErrorInfo::new("trace-write", err.to_string())
                        .with_context("path", path.display().to_string()),
                )
            })?;
        }
        None => {
            println!("module,substream_label,draws_total,blocks_total,events_total");
            for summary in &summaries {
                println!(
                    "{},{},{},{},{}",
                    summary.module,
                    summary.substream_label,
                    summary.draws_total,
                    summary.blocks_total,
                    summary.events_total
                );
            }
        }
    }
    Ok(ExitCode::SUCCESS)
}
