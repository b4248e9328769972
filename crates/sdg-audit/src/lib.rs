#![deny(missing_docs)]
#![doc = "Audit layer for the SDG randomness engine: immutable draw-episode records, append-only ledgers with partition identity, trace rollups, and replay validation."]

pub mod event;
pub mod recorder;
pub mod trace;
pub mod validate;

pub use event::{EventPayload, ReplayClaim, RngEvent};
pub use recorder::{EventLedger, LEDGER_SCHEMA};
pub use trace::{summarize, TraceSummary};
pub use validate::{
    validate, BudgetSeverity, EventVerdict, FailureCode, Finding, ValidationPolicy,
    ValidationReport,
};
