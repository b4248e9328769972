//! Run identity shared by the engine and the audit ledger.

use serde::{Deserialize, Serialize};

use crate::types::{ManifestFingerprint, ParameterHash};

/// Full identity of one generation run.
///
/// The tuple (seed, manifest fingerprint, parameter hash, run id) names an
/// audit partition. A restarted process must match all four fields before
/// resuming writes into an existing partition; otherwise it starts a new
/// run id.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RunIdentity {
    /// Master seed supplied once per run.
    pub seed: u64,
    /// Content digest over all sealed governing inputs.
    pub manifest_fingerprint: ManifestFingerprint,
    /// Digest over governing coefficient/policy files (provenance only).
    pub parameter_hash: ParameterHash,
    /// Unique identifier for this run.
    pub run_id: String,
}

impl RunIdentity {
    /// Creates a run identity.
    pub fn new(
        seed: u64,
        manifest_fingerprint: ManifestFingerprint,
        parameter_hash: ParameterHash,
        run_id: impl Into<String>,
    ) -> Self {
        Self {
            seed,
            manifest_fingerprint,
            parameter_hash,
            run_id: run_id.into(),
        }
    }
}
