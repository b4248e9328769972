//! Append-only event ledger and its JSONL reference backend.

use std::fs;
use std::io::Write;
use std::path::Path;

use parking_lot::Mutex;
use serde::{Deserialize, Serialize};
use sdg_core::errors::ErrorInfo;
use sdg_core::{CounterState, RunIdentity, SdgError};

use crate::event::RngEvent;

/// Ledger file schema version, bumped on breaking layout changes.
pub const LEDGER_SCHEMA: u32 = 1;

/// First line of every ledger file: the partition's full identity.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
struct LedgerHeader {
    schema: u32,
    #[serde(flatten)]
    identity: RunIdentity,
}

#[derive(Debug, Default)]
struct LedgerInner {
    events: Vec<RngEvent>,
    // Last counter_after per (module, substream_label); guards per-substream order.
    frontier: std::collections::HashMap<(String, String), CounterState>,
}

/// Append-only ledger for one (seed, parameter-hash, run-id) partition.
///
/// Appends for a given substream are never reordered relative to each other;
/// no ordering is guaranteed across substreams. Events are immutable once
/// appended.
#[derive(Debug)]
pub struct EventLedger {
    identity: RunIdentity,
    inner: Mutex<LedgerInner>,
}

impl EventLedger {
    /// Opens a fresh in-memory ledger for the given partition.
    pub fn new(identity: RunIdentity) -> Self {
        Self {
            identity,
            inner: Mutex::new(LedgerInner::default()),
        }
    }

    /// Partition identity of this ledger.
    pub fn identity(&self) -> &RunIdentity {
        &self.identity
    }

    /// Appends one event, enforcing partition identity and per-substream
    /// counter ordering.
    pub fn append(&self, event: RngEvent) -> Result<(), SdgError> {
        if event.identity() != self.identity {
            return Err(SdgError::Audit(
                ErrorInfo::new("ledger-identity", "event does not belong to this partition")
                    .with_context("event_run_id", event.run_id.clone())
                    .with_context("ledger_run_id", self.identity.run_id.clone()),
            ));
        }
        let mut inner = self.inner.lock();
        let stream = (event.module.clone(), event.substream_label.clone());
        if let Some(frontier) = inner.frontier.get(&stream) {
            if event.counter_before() < *frontier {
                return Err(SdgError::Audit(
                    ErrorInfo::new("ledger-order", "event regresses the substream counter")
                        .with_context("module", stream.0)
                        .with_context("substream_label", stream.1)
                        .with_context("frontier", frontier.as_u128().to_string())
                        .with_context(
                            "counter_before",
                            event.counter_before().as_u128().to_string(),
                        ),
                ));
            }
        }
        inner.frontier.insert(stream, event.counter_after());
        inner.events.push(event);
        Ok(())
    }

    /// Number of events appended so far.
    pub fn len(&self) -> usize {
        self.inner.lock().events.len()
    }

    /// Whether the ledger holds no events.
    pub fn is_empty(&self) -> bool {
        self.inner.lock().events.is_empty()
    }

    /// Snapshot of the appended events in append order.
    pub fn events(&self) -> Vec<RngEvent> {
        self.inner.lock().events.clone()
    }

    /// Writes the ledger as JSONL: one header line, then one event per line.
    pub fn write_jsonl(&self, path: &Path) -> Result<(), SdgError> {
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent).map_err(|err| {
                SdgError::Serde(
                    ErrorInfo::new("ledger-mkdir", err.to_string())
                        .with_context("path", parent.display().to_string()),
                )
            })?;
        }
        let header = LedgerHeader {
            schema: LEDGER_SCHEMA,
            identity: self.identity.clone(),
        };
        let mut out = Vec::new();
        serde_json::to_writer(&mut out, &header).map_err(|err| {
            SdgError::Serde(ErrorInfo::new("ledger-serialize", err.to_string()))
        })?;
        out.push(b'\n');
        for event in self.inner.lock().events.iter() {
            serde_json::to_writer(&mut out, event).map_err(|err| {
                SdgError::Serde(ErrorInfo::new("ledger-serialize", err.to_string()))
            })?;
            out.push(b'\n');
        }
        let mut file = fs::File::create(path).map_err(|err| {
            SdgError::Serde(
                ErrorInfo::new("ledger-write", err.to_string())
                    .with_context("path", path.display().to_string()),
            )
        })?;
        file.write_all(&out).map_err(|err| {
            SdgError::Serde(
                ErrorInfo::new("ledger-write", err.to_string())
                    .with_context("path", path.display().to_string()),
            )
        })
    }

    /// Reads a JSONL ledger, returning its identity and events.
    pub fn read_jsonl(path: &Path) -> Result<(RunIdentity, Vec<RngEvent>), SdgError> {
        let contents = fs::read_to_string(path).map_err(|err| {
            SdgError::Serde(
                ErrorInfo::new("ledger-read", err.to_string())
                    .with_context("path", path.display().to_string()),
            )
        })?;
        let mut lines = contents.lines().filter(|line| !line.trim().is_empty());
        let header_line = lines.next().ok_or_else(|| {
            SdgError::Serde(
                ErrorInfo::new("ledger-header", "ledger file is empty")
                    .with_context("path", path.display().to_string()),
            )
        })?;
        let header: LedgerHeader = serde_json::from_str(header_line).map_err(|err| {
            SdgError::Serde(
                ErrorInfo::new("ledger-header", err.to_string())
                    .with_context("path", path.display().to_string()),
            )
        })?;
        if header.schema != LEDGER_SCHEMA {
            return Err(SdgError::Serde(
                ErrorInfo::new("ledger-schema", "unsupported ledger schema version")
                    .with_context("found", header.schema.to_string())
                    .with_context("supported", LEDGER_SCHEMA.to_string()),
            ));
        }
        let mut events = Vec::new();
        for (idx, line) in lines.enumerate() {
            let event: RngEvent = serde_json::from_str(line).map_err(|err| {
                SdgError::Serde(
                    ErrorInfo::new("ledger-parse", err.to_string())
                        .with_context("line", (idx + 2).to_string())
                        .with_context("path", path.display().to_string()),
                )
            })?;
            events.push(event);
        }
        Ok((header.identity, events))
    }

    /// Reopens an existing partition for further appends.
    ///
    /// The caller's identity must match the stored header exactly (seed,
    /// manifest fingerprint, parameter hash, run id); a restarted process
    /// that cannot prove identity must start a new run id instead.
    pub fn resume(path: &Path, identity: &RunIdentity) -> Result<Self, SdgError> {
        let (stored, events) = Self::read_jsonl(path)?;
        if stored != *identity {
            return Err(SdgError::Audit(
                ErrorInfo::new(
                    "resume-identity-mismatch",
                    "partition identity does not match prior ledger",
                )
                .with_context("stored_run_id", stored.run_id.clone())
                .with_context("requested_run_id", identity.run_id.clone())
                .with_hint("start a new run id instead of resuming"),
            ));
        }
        let ledger = Self::new(stored);
        for event in events {
            ledger.append(event)?;
        }
        Ok(ledger)
    }
}
