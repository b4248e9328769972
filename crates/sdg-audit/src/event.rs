//! Immutable audit records describing flushed draw episodes.

use chrono::Utc;
use serde::{Deserialize, Serialize};
use sdg_core::errors::ErrorInfo;
use sdg_core::{CounterState, ManifestFingerprint, ParameterHash, RunIdentity, SdgError};

/// Module-defined payload attached to an audit event.
///
/// Consumers declare a fixed tagged variant, validated at flush time;
/// open key-value maps are not accepted. Variants carrying raw uniforms are
/// replayable bit-for-bit by the validator; the rest receive structural
/// checks only.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "kebab-case")]
pub enum EventPayload {
    /// Every uniform drawn in the episode, in draw order.
    Uniform {
        /// Unit-interval draws, one per requested draw.
        values: Vec<f64>,
    },
    /// One Bernoulli decision (e.g. a hurdle sampler gate).
    Bernoulli {
        /// Entity the decision applies to (merchant, site, ...).
        entity_id: u64,
        /// Linear predictor fed to the link function.
        eta: f64,
        /// Success probability after the link.
        pi: f64,
        /// The uniform consumed by the decision (the episode's first draw).
        u: f64,
    },
    /// One accepted negative-binomial sample, including rejected attempts.
    NegativeBinomial {
        /// Mean parameter.
        mu: f64,
        /// Dispersion parameter.
        phi: f64,
        /// Accepted outlet count.
        n_outlets: u64,
        /// Rejected attempts folded into the episode's draw total.
        rejections: u64,
    },
    /// Escape hatch for external consumers; structural checks only.
    Opaque {
        /// Arbitrary JSON payload owned by the calling module.
        data: serde_json::Value,
    },
}

/// What the payload allows the validator to recompute exactly.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum ReplayClaim<'a> {
    /// No replayable values; structural checks only.
    None,
    /// The episode's first uniform draw.
    FirstDraw(f64),
    /// Every uniform draw of the episode, in order.
    AllDraws(&'a [f64]),
}

impl EventPayload {
    /// Validates the payload against the episode's draw count at flush time.
    pub fn validate(&self, draws: u64) -> Result<(), SdgError> {
        match self {
            EventPayload::Uniform { values } => {
                if values.len() as u64 != draws {
                    return Err(SdgError::Audit(
                        ErrorInfo::new(
                            "payload-invalid",
                            "uniform payload must carry one value per draw",
                        )
                        .with_context("values", values.len().to_string())
                        .with_context("draws", draws.to_string()),
                    ));
                }
                if values.iter().any(|v| !(v.is_finite() && *v > 0.0 && *v < 1.0)) {
                    return Err(SdgError::Audit(ErrorInfo::new(
                        "payload-invalid",
                        "uniform payload values must lie in (0,1)",
                    )));
                }
                Ok(())
            }
            EventPayload::Bernoulli { pi, u, .. } => {
                if draws == 0 {
                    return Err(SdgError::Audit(ErrorInfo::new(
                        "payload-invalid",
                        "bernoulli payload requires at least one draw",
                    )));
                }
                if !(pi.is_finite() && (0.0..=1.0).contains(pi)) {
                    return Err(SdgError::Audit(ErrorInfo::new(
                        "payload-invalid",
                        "bernoulli pi must lie in [0,1]",
                    )));
                }
                if !(u.is_finite() && *u > 0.0 && *u < 1.0) {
                    return Err(SdgError::Audit(ErrorInfo::new(
                        "payload-invalid",
                        "bernoulli u must lie in (0,1)",
                    )));
                }
                Ok(())
            }
            EventPayload::NegativeBinomial { mu, phi, .. } => {
                if !(mu.is_finite() && *mu > 0.0 && phi.is_finite() && *phi > 0.0) {
                    return Err(SdgError::Audit(ErrorInfo::new(
                        "payload-invalid",
                        "negative-binomial mu and phi must be positive and finite",
                    )));
                }
                Ok(())
            }
            EventPayload::Opaque { .. } => Ok(()),
        }
    }

    /// Returns the replayable portion of the payload.
    pub fn replay_claim(&self) -> ReplayClaim<'_> {
        match self {
            EventPayload::Uniform { values } => ReplayClaim::AllDraws(values),
            EventPayload::Bernoulli { u, .. } => ReplayClaim::FirstDraw(*u),
            EventPayload::NegativeBinomial { .. } | EventPayload::Opaque { .. } => {
                ReplayClaim::None
            }
        }
    }
}

/// One immutable audit record per flushed draw episode.
///
/// The first twelve fields are owned and guaranteed by the core; the payload
/// belongs to the calling module. The record is self-sufficient for replay:
/// given the run's seed and manifest fingerprint, the sub-key re-derives from
/// `module` and `substream_label` alone.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RngEvent {
    /// ISO-8601 UTC timestamp of the flush.
    pub ts_utc: String,
    /// Master seed of the run.
    pub seed: u64,
    /// Digest over governing coefficient/policy files.
    pub parameter_hash: ParameterHash,
    /// Content digest over all sealed governing inputs.
    pub manifest_fingerprint: ManifestFingerprint,
    /// Run identifier.
    pub run_id: String,
    /// Module that owns the substream.
    pub module: String,
    /// Fully rendered substream label, including entity keys.
    pub substream_label: String,
    /// High word of the counter before the episode.
    pub rng_counter_before_hi: u64,
    /// Low word of the counter before the episode.
    pub rng_counter_before_lo: u64,
    /// High word of the counter after the episode.
    pub rng_counter_after_hi: u64,
    /// Low word of the counter after the episode.
    pub rng_counter_after_lo: u64,
    /// Draws requested during the episode, including rejected attempts.
    pub draws: u64,
    /// Blocks consumed during the episode.
    pub blocks: u64,
    /// Module-defined payload.
    pub payload: EventPayload,
}

impl RngEvent {
    /// Builds an event for a flushed episode, stamping the current UTC time.
    ///
    /// The payload must already have been validated against `draws`.
    #[allow(clippy::too_many_arguments)]
    pub fn new(
        identity: &RunIdentity,
        module: &str,
        substream_label: &str,
        counter_before: CounterState,
        counter_after: CounterState,
        draws: u64,
        blocks: u64,
        payload: EventPayload,
    ) -> Self {
        Self {
            ts_utc: Utc::now().to_rfc3339(),
            seed: identity.seed,
            parameter_hash: identity.parameter_hash,
            manifest_fingerprint: identity.manifest_fingerprint,
            run_id: identity.run_id.clone(),
            module: module.to_string(),
            substream_label: substream_label.to_string(),
            rng_counter_before_hi: counter_before.hi,
            rng_counter_before_lo: counter_before.lo,
            rng_counter_after_hi: counter_after.hi,
            rng_counter_after_lo: counter_after.lo,
            draws,
            blocks,
            payload,
        }
    }

    /// Counter at the start of the episode.
    pub fn counter_before(&self) -> CounterState {
        CounterState::new(self.rng_counter_before_hi, self.rng_counter_before_lo)
    }

    /// Counter after the episode.
    pub fn counter_after(&self) -> CounterState {
        CounterState::new(self.rng_counter_after_hi, self.rng_counter_after_lo)
    }

    /// Identity of the partition this event belongs to.
    pub fn identity(&self) -> RunIdentity {
        RunIdentity::new(
            self.seed,
            self.manifest_fingerprint,
            self.parameter_hash,
            self.run_id.clone(),
        )
    }
}
