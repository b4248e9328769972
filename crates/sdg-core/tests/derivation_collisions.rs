use std::collections::HashMap;

use sdg_core::{root_key, sub_key, ManifestFingerprint};

#[test]
fn synthetic_key_population_has_no_subkey_collisions() {
    let root = root_key(1234, &ManifestFingerprint::from_bytes([0xab; 32]));
    let mut seen = HashMap::new();
    // Just over a million distinct keys across four modules.
    let modules = ["outlets", "placements", "timing", "fraud"];
    for module in modules {
        for entity in 0u64..262_144 {
            let label = format!("draw|u:{entity}");
            let key = sub_key(&root, module, &label);
            if let Some(prior) = seen.insert(key, (module, entity)) {
                panic!("sub-key collision: {prior:?} vs ({module}, {entity})");
            }
        }
    }
    assert_eq!(seen.len(), modules.len() * 262_144);
}

#[test]
fn sibling_labels_decorrelate_first_blocks() {
    use sdg_core::{philox_block, uniform_from_word, CounterState};

    let root = root_key(9, &ManifestFingerprint::from_bytes([0x11; 32]));
    let a = sub_key(&root, "outlets", "hurdle|u:1");
    let b = sub_key(&root, "outlets", "hurdle|u:2");
    assert_ne!(a, b);
    let block_a = philox_block(&a, CounterState::ZERO);
    let block_b = philox_block(&b, CounterState::ZERO);
    assert_ne!(block_a, block_b);
    assert_ne!(
        uniform_from_word(block_a[0]).to_bits(),
        uniform_from_word(block_b[0]).to_bits()
    );
}
