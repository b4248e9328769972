use std::fs;
use std::path::PathBuf;
use std::process::ExitCode;

use clap::Args;
use sdg_audit::{validate, EventLedger, ValidationPolicy};
use sdg_core::errors::ErrorInfo;
use sdg_core::{ManifestFingerprint, SdgError};

#[derive(Args, Debug)]
pub struct ValidateArgs {
    /// JSONL event ledger produced by a generation run.
    #[arg(long)]
    pub events: PathBuf,
    /// Expected master seed; defaults to the ledger header.
    #[arg(long)]
    pub seed: Option<u64>,
    /// Expected manifest fingerprint as hex; defaults to the ledger header.
    #[arg(long)]
    pub fingerprint: Option<String>,
    /// YAML validation policy (draw budgets, budget severity).
    #[arg(long)]
    pub policy: Option<PathBuf>,
}

pub fn run(args: &ValidateArgs) -> Result<ExitCode, SdgError> {
    let (identity, events) = EventLedger::read_jsonl(&args.events)?;
    let seed = args.seed.unwrap_or(identity.seed);
    let fingerprint = match &args.fingerprint {
        Some(raw) => ManifestFingerprint::from_hex(raw)?,
        None => identity.manifest_fingerprint,
    };
    let policy = match &args.policy {
        Some(path) => load_policy(path)?,
        None => ValidationPolicy::default(),
    };
    let report = validate(&events, seed, &fingerprint, &policy);
    let rendered = serde_json::to_string_pretty(&report)
        .map_err(|err| SdgError::Serde(ErrorInfo::new("report-serialize", err.to_string())))?;
    println!("{rendered}");
    // Any non-PASS validation blocks downstream certification of the bundle.
    Ok(if report.passed {
        ExitCode::SUCCESS
    } else {
        ExitCode::from(1)
    })
}

fn load_policy(path: &PathBuf) -> Result<ValidationPolicy, SdgError> {
    let contents = fs::read_to_string(path).map_err(|err| {
        SdgError::Serde(
            ErrorInfo::new("policy-read", err.to_string())
                .with_context("path", path.display().to_string()),
        )
    })?;
    serde_yaml::from_str(&contents).map_err(|err| {
        SdgError::Serde(
            ErrorInfo::new("policy-parse", err.to_string())
                .with_context("path", path.display().to_string()),
        )
    })
}
