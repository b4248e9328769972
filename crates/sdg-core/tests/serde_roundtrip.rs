use sdg_core::{CounterState, ManifestFingerprint, ParameterHash, RunIdentity};

#[test]
fn counter_state_roundtrips() {
    let counter = CounterState::new(3, u64::MAX - 1);
    let json = serde_json::to_string(&counter).unwrap();
    let restored: CounterState = serde_json::from_str(&json).unwrap();
    assert_eq!(counter, restored);
}

#[test]
fn run_identity_roundtrips_with_hex_digests() {
    let identity = RunIdentity::new(
        1234,
        ManifestFingerprint::from_bytes([0xab; 32]),
        ParameterHash::from_bytes([0x07; 32]),
        "run-0042",
    );
    let json = serde_json::to_string(&identity).unwrap();
    assert!(json.contains(&"ab".repeat(32)));
    let restored: RunIdentity = serde_json::from_str(&json).unwrap();
    assert_eq!(identity, restored);
}

#[test]
fn malformed_digest_is_rejected() {
    let err = serde_json::from_str::<ManifestFingerprint>("\"zz\"");
    assert!(err.is_err());
}
