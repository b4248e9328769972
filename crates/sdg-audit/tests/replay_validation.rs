use sdg_audit::{validate, BudgetSeverity, EventPayload, FailureCode, RngEvent, ValidationPolicy};
use sdg_core::{
    philox_block, root_key, sub_key, uniform_from_word, CounterState, ManifestFingerprint,
    ParameterHash, RunIdentity,
};

const SEED: u64 = 1234;

fn fingerprint() -> ManifestFingerprint {
    ManifestFingerprint::from_bytes([0xab; 32])
}

fn identity() -> RunIdentity {
    RunIdentity::new(
        SEED,
        fingerprint(),
        ParameterHash::from_bytes([0x33; 32]),
        "run-val",
    )
}

// Recomputes exactly what a faithful engine would have logged for one
// episode of `draws` uniforms starting at block `start`.
fn episode(module: &str, label: &str, start: u64, draws: u64) -> RngEvent {
    let root = root_key(SEED, &fingerprint());
    let key = sub_key(&root, module, label);
    let blocks = draws.div_ceil(2);
    let before = CounterState::new(0, start);
    let mut counter = before;
    let mut values = Vec::new();
    for _ in 0..blocks {
        for word in philox_block(&key, counter) {
            if (values.len() as u64) < draws {
                values.push(uniform_from_word(word));
            }
        }
        counter = counter.advance(1).unwrap();
    }
    RngEvent::new(
        &identity(),
        module,
        label,
        before,
        counter,
        draws,
        blocks,
        EventPayload::Uniform { values },
    )
}

#[test]
fn faithful_ledger_passes() {
    let events = vec![
        episode("outlets", "hurdle|u:1", 0, 3),
        episode("outlets", "hurdle|u:1", 2, 4),
        episode("timing", "jitter|u:9", 0, 1),
    ];
    let report = validate(&events, SEED, &fingerprint(), &ValidationPolicy::default());
    assert!(report.passed, "findings: {:?}", report.findings);
    assert!(report.failures_by_code.is_empty());
    assert_eq!(report.events_checked, 3);
}

#[test]
fn corrupted_counter_after_is_a_mismatch() {
    // Move counter_after forward by one block without touching the payload.
    let mut events = vec![
        episode("outlets", "hurdle|u:1", 0, 3),
        episode("timing", "jitter|u:9", 0, 2),
    ];
    events[0].rng_counter_after_lo += 1;
    let report = validate(&events, SEED, &fingerprint(), &ValidationPolicy::default());
    assert!(!report.passed);
    assert_eq!(report.failures_by_code.get("mismatch"), Some(&1));
    let finding = report
        .findings
        .iter()
        .find(|f| f.code == FailureCode::Mismatch)
        .unwrap();
    assert_eq!(finding.module, "outlets");
    assert_eq!(finding.substream_label, "hurdle|u:1");
    // The untouched substream stays clean.
    assert!(report
        .findings
        .iter()
        .all(|f| f.substream_label != "jitter|u:9"));
}

#[test]
fn corrupted_draw_value_is_a_mismatch() {
    let mut event = episode("outlets", "hurdle|u:1", 0, 4);
    if let EventPayload::Uniform { values } = &mut event.payload {
        values[2] = values[2].next_up();
    }
    let report = validate(&[event], SEED, &fingerprint(), &ValidationPolicy::default());
    assert!(!report.passed);
    assert_eq!(report.failures_by_code.get("mismatch"), Some(&1));
}

#[test]
fn overlapping_ranges_are_structural() {
    let events = vec![
        episode("outlets", "hurdle|u:1", 0, 4),
        // Second episode re-enters counter space [0,2) already consumed.
        episode("outlets", "hurdle|u:1", 1, 2),
    ];
    let report = validate(&events, SEED, &fingerprint(), &ValidationPolicy::default());
    assert!(!report.passed);
    assert!(report.failures_by_code.contains_key("structural-error"));
}

#[test]
fn draw_block_accounting_is_checked() {
    let mut event = episode("outlets", "hurdle|u:1", 0, 4);
    // Two blocks cannot serve five draws under the two-word block contract.
    event.draws = 5;
    let report = validate(&[event], SEED, &fingerprint(), &ValidationPolicy::default());
    assert!(!report.passed);
    assert!(report.failures_by_code.contains_key("structural-error"));
}

#[test]
fn hostile_draw_count_is_reported_not_fatal() {
    // A tampered draws field must surface as a finding, never abort the pass.
    let mut event = episode("outlets", "hurdle|u:1", 0, 2);
    event.draws = u64::MAX;
    let report = validate(&[event], SEED, &fingerprint(), &ValidationPolicy::default());
    assert!(!report.passed);
    assert!(report.failures_by_code.contains_key("structural-error"));
}

#[test]
fn foreign_seed_is_structural() {
    let event = episode("outlets", "hurdle|u:1", 0, 2);
    let report = validate(&[event], SEED + 1, &fingerprint(), &ValidationPolicy::default());
    assert!(!report.passed);
    assert!(report.failures_by_code.contains_key("structural-error"));
}

#[test]
fn warn_budgets_do_not_block_certification() {
    let events = vec![episode("outlets", "hurdle|u:1", 0, 6)];
    let mut policy = ValidationPolicy {
        budget_severity: BudgetSeverity::Warn,
        ..ValidationPolicy::default()
    };
    policy.budgets.insert("outlets/hurdle".to_string(), 4);
    let report = validate(&events, SEED, &fingerprint(), &policy);
    assert!(report.passed);
    assert_eq!(report.warnings.len(), 1);
    assert_eq!(report.warnings[0].code, FailureCode::BudgetExceeded);

    policy.budget_severity = BudgetSeverity::Fatal;
    let report = validate(&events, SEED, &fingerprint(), &policy);
    assert!(!report.passed);
    assert_eq!(report.failures_by_code.get("budget-exceeded"), Some(&1));
}
