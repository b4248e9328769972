//! Replay validation: recomputes logged episodes and certifies a ledger.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};
use sdg_core::{
    philox_block, root_key, sub_key, uniform_from_word, CounterState, ManifestFingerprint,
    WORDS_PER_BLOCK,
};

use crate::event::{ReplayClaim, RngEvent};

/// Severity applied to draw-budget violations.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "kebab-case")]
pub enum BudgetSeverity {
    /// Budget findings are reported but do not block certification.
    Warn,
    /// Budget findings fail the validation (fail-closed default).
    #[default]
    Fatal,
}

/// Caller-supplied validation policy.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ValidationPolicy {
    /// Per-substream draw caps. Keys are `module/substream_label`; a key of
    /// `module/family_label` (the label up to its first entity separator)
    /// caps every substream of that family.
    #[serde(default)]
    pub budgets: BTreeMap<String, u64>,
    /// Severity applied when a budget is exceeded.
    #[serde(default)]
    pub budget_severity: BudgetSeverity,
    /// Upper bound on blocks recomputed for a single event; larger declared
    /// ranges are reported structurally instead of replayed.
    #[serde(default = "default_max_replay_blocks")]
    pub max_replay_blocks: u64,
}

fn default_max_replay_blocks() -> u64 {
    1 << 22
}

impl Default for ValidationPolicy {
    fn default() -> Self {
        Self {
            budgets: BTreeMap::new(),
            budget_severity: BudgetSeverity::default(),
            max_replay_blocks: default_max_replay_blocks(),
        }
    }
}

/// Verdict assigned to one event after replay.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum EventVerdict {
    /// Not yet examined.
    Pending,
    /// Recomputation reproduced every logged value.
    Match,
    /// A recomputed value differs from a logged value.
    Mismatch,
    /// The record violates a structural invariant.
    StructuralError,
}

/// Stable failure codes aggregated by the report.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum FailureCode {
    /// Recomputed value differs from the logged value.
    Mismatch,
    /// Missing fields, bad counter arithmetic, overlapping or duplicate ranges.
    StructuralError,
    /// Cumulative draws exceed a declared cap.
    BudgetExceeded,
}

impl FailureCode {
    /// Stable string form used as report keys.
    pub fn as_str(&self) -> &'static str {
        match self {
            FailureCode::Mismatch => "mismatch",
            FailureCode::StructuralError => "structural-error",
            FailureCode::BudgetExceeded => "budget-exceeded",
        }
    }
}

/// One finding, attributed to a substream and counter range.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Finding {
    /// Failure classification.
    pub code: FailureCode,
    /// Module of the offending substream.
    pub module: String,
    /// Substream label of the offending substream.
    pub substream_label: String,
    /// Counter range of the offending event, when attributable to one.
    pub counter_range: Option<(CounterState, CounterState)>,
    /// Human readable description.
    pub message: String,
}

/// Aggregated result of one validation pass.
///
/// The validator never fails fast: every finding across the entire event
/// stream is collected so one pass reports everything wrong. Any non-empty
/// `findings` blocks certification; budget warnings do not.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ValidationReport {
    /// True only when every event matched and no finding was recorded.
    pub passed: bool,
    /// Number of events examined.
    pub events_checked: usize,
    /// Finding counts keyed by stable failure code.
    pub failures_by_code: BTreeMap<String, usize>,
    /// Certification-blocking findings.
    pub findings: Vec<Finding>,
    /// Non-blocking findings (budget violations under a warn policy).
    pub warnings: Vec<Finding>,
    /// Final verdict per event, in stream order.
    pub verdicts: Vec<EventVerdict>,
}

#[derive(Debug, Default)]
struct StreamAccum {
    last_after: Option<CounterState>,
    draws_total: u128,
    blocks_declared: u128,
    counter_span: u128,
    counter_mismatch: bool,
}

/// Recomputes every logged episode from (seed, fingerprint) and checks exact
/// equality plus global counter invariants.
pub fn validate(
    events: &[RngEvent],
    seed: u64,
    fingerprint: &ManifestFingerprint,
    policy: &ValidationPolicy,
) -> ValidationReport {
    let root = root_key(seed, fingerprint);
    let mut findings = Vec::new();
    let mut warnings = Vec::new();
    let mut verdicts = Vec::with_capacity(events.len());
    let mut streams: BTreeMap<(String, String), StreamAccum> = BTreeMap::new();

    for event in events {
        let stream_id = (event.module.clone(), event.substream_label.clone());
        let mut verdict = EventVerdict::Pending;
        let range = Some((event.counter_before(), event.counter_after()));
        let push = |code: FailureCode, message: String, sink: &mut Vec<Finding>| {
            sink.push(Finding {
                code,
                module: event.module.clone(),
                substream_label: event.substream_label.clone(),
                counter_range: range,
                message,
            });
        };

        // Structural: required identity and addressing fields.
        if event.module.is_empty() || event.substream_label.is_empty() {
            push(
                FailureCode::StructuralError,
                "event is missing module or substream_label".to_string(),
                &mut findings,
            );
            verdict = EventVerdict::StructuralError;
        }
        if event.seed != seed || event.manifest_fingerprint != *fingerprint {
            push(
                FailureCode::StructuralError,
                "event identity disagrees with the declared seed/fingerprint".to_string(),
                &mut findings,
            );
            verdict = EventVerdict::StructuralError;
        }

        let before = event.counter_before();
        let after = event.counter_after();

        // Structural: monotone range, ordering against the stream frontier.
        let span = match before.blocks_until(&after) {
            Some(span) => span,
            None => {
                push(
                    FailureCode::StructuralError,
                    "counter_after precedes counter_before".to_string(),
                    &mut findings,
                );
                verdict = EventVerdict::StructuralError;
                0
            }
        };
        let accum = streams.entry(stream_id.clone()).or_default();
        if let Some(frontier) = accum.last_after {
            if before < frontier {
                push(
                    FailureCode::StructuralError,
                    format!(
                        "counter range overlaps the previous episode (frontier {})",
                        frontier.as_u128()
                    ),
                    &mut findings,
                );
                verdict = EventVerdict::StructuralError;
            }
        }
        // Structural: the two-word block contract bounds draws per block.
        if event.blocks == 0 && event.draws != 0 {
            push(
                FailureCode::StructuralError,
                "draws logged without any consumed block".to_string(),
                &mut findings,
            );
            verdict = EventVerdict::StructuralError;
        }
        if event.blocks > 0 {
            let max_draws = (event.blocks as u128) * WORDS_PER_BLOCK as u128;
            let min_draws = max_draws - (WORDS_PER_BLOCK as u128 - 1);
            if (event.draws as u128) < min_draws || (event.draws as u128) > max_draws {
                push(
                    FailureCode::StructuralError,
                    format!(
                        "draws {} inconsistent with {} consumed blocks",
                        event.draws, event.blocks
                    ),
                    &mut findings,
                );
                verdict = EventVerdict::StructuralError;
            }
        }

        // Mismatch: recomputed counter_after from (before, blocks).
        match before.advance(event.blocks) {
            Ok(expected_after) => {
                if expected_after != after {
                    push(
                        FailureCode::Mismatch,
                        format!(
                            "recomputed counter_after {} differs from logged {}",
                            expected_after.as_u128(),
                            after.as_u128()
                        ),
                        &mut findings,
                    );
                    verdict = EventVerdict::Mismatch;
                    accum.counter_mismatch = true;
                }
            }
            Err(_) => {
                push(
                    FailureCode::StructuralError,
                    "declared blocks overflow the counter space".to_string(),
                    &mut findings,
                );
                verdict = EventVerdict::StructuralError;
            }
        }

        // Mismatch: recomputed draws over the declared range.
        if event.blocks > policy.max_replay_blocks {
            push(
                FailureCode::StructuralError,
                format!(
                    "declared range of {} blocks exceeds the replay limit {}",
                    event.blocks, policy.max_replay_blocks
                ),
                &mut findings,
            );
            verdict = EventVerdict::StructuralError;
        } else {
            let key = sub_key(&root, &event.module, &event.substream_label);
            let mut counter = before;
            // `draws` is ledger-supplied; reserve only what the range can produce.
            let replayable = event
                .draws
                .min(event.blocks.saturating_mul(WORDS_PER_BLOCK as u64));
            let mut recomputed = Vec::with_capacity(replayable as usize);
            let mut replay_ok = true;
            for _ in 0..event.blocks {
                let block = philox_block(&key, counter);
                for word in block {
                    if (recomputed.len() as u64) < event.draws {
                        recomputed.push(uniform_from_word(word));
                    }
                }
                match counter.advance(1) {
                    Ok(next) => counter = next,
                    Err(_) => {
                        replay_ok = false;
                        break;
                    }
                }
            }
            if replay_ok {
                match event.payload.replay_claim() {
                    ReplayClaim::None => {}
                    ReplayClaim::FirstDraw(logged) => match recomputed.first() {
                        Some(first) if first.to_bits() == logged.to_bits() => {}
                        _ => {
                            push(
                                FailureCode::Mismatch,
                                format!(
                                    "logged u {logged} does not match the recomputed first draw"
                                ),
                                &mut findings,
                            );
                            verdict = EventVerdict::Mismatch;
                        }
                    },
                    ReplayClaim::AllDraws(logged) => {
                        let divergence = logged
                            .iter()
                            .zip(recomputed.iter())
                            .position(|(a, b)| a.to_bits() != b.to_bits());
                        if logged.len() != recomputed.len() || divergence.is_some() {
                            push(
                                FailureCode::Mismatch,
                                format!(
                                    "logged draws diverge from recomputation at index {}",
                                    divergence.unwrap_or_else(|| logged.len().min(recomputed.len()))
                                ),
                                &mut findings,
                            );
                            verdict = EventVerdict::Mismatch;
                        }
                    }
                }
            }
        }
        if event.payload.validate(event.draws).is_err() {
            push(
                FailureCode::StructuralError,
                "payload fails its schema validation".to_string(),
                &mut findings,
            );
            verdict = EventVerdict::StructuralError;
        }

        accum.draws_total += event.draws as u128;
        accum.blocks_declared += event.blocks as u128;
        accum.counter_span += span;
        if after > accum.last_after.unwrap_or(CounterState::ZERO) {
            accum.last_after = Some(after);
        }
        verdicts.push(match verdict {
            EventVerdict::Pending => EventVerdict::Match,
            settled => settled,
        });
    }

    // Global invariants across the full event set.
    for ((module, substream_label), accum) in &streams {
        if !accum.counter_mismatch && accum.counter_span != accum.blocks_declared {
            findings.push(Finding {
                code: FailureCode::StructuralError,
                module: module.clone(),
                substream_label: substream_label.clone(),
                counter_range: None,
                message: format!(
                    "cumulative counter span {} does not equal total blocks {}",
                    accum.counter_span, accum.blocks_declared
                ),
            });
        }
        if let Some(cap) = lookup_budget(policy, module, substream_label) {
            if accum.draws_total > cap as u128 {
                let finding = Finding {
                    code: FailureCode::BudgetExceeded,
                    module: module.clone(),
                    substream_label: substream_label.clone(),
                    counter_range: None,
                    message: format!(
                        "cumulative draws {} exceed the declared budget {}",
                        accum.draws_total, cap
                    ),
                };
                match policy.budget_severity {
                    BudgetSeverity::Fatal => findings.push(finding),
                    BudgetSeverity::Warn => warnings.push(finding),
                }
            }
        }
    }

    let mut failures_by_code = BTreeMap::new();
    for finding in &findings {
        *failures_by_code
            .entry(finding.code.as_str().to_string())
            .or_insert(0usize) += 1;
    }
    ValidationReport {
        passed: findings.is_empty(),
        events_checked: events.len(),
        failures_by_code,
        findings,
        warnings,
        verdicts,
    }
}

// Exact substream key wins over its family prefix.
fn lookup_budget(policy: &ValidationPolicy, module: &str, substream_label: &str) -> Option<u64> {
    let exact = format!("{module}/{substream_label}");
    if let Some(cap) = policy.budgets.get(&exact) {
        return Some(*cap);
    }
    let family_label = substream_label
        .split('|')
        .next()
        .unwrap_or(substream_label);
    policy.budgets.get(&format!("{module}/{family_label}")).copied()
}
