// Randomised model test
// Drives a store and a HashMap with the same operations and checks that the
// keydir agrees with the newest log record for every key.

use std::collections::HashMap;

use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};

use keydir::{Position, Store};

const KEYS: &[&str] = &["a", "b", "c", "d", "e", "f"];

fn check_invariants(store: &Store, model: &HashMap<String, Vec<u8>>, expected_len: u64) {
    assert_eq!(store.log_len(), expected_len);
    assert_eq!(store.len(), model.len());

    for key in KEYS {
        assert_eq!(store.get(key).unwrap(), model.get(*key).cloned(), "key {key}");

        let newest = store.history(key).pop();
        match (store.lookup(key), newest) {
            (Some(entry), Some((pos, record))) => {
                assert_eq!(entry.position, pos);
                assert!(!record.is_tombstone());
            }
            (None, Some((_, record))) => assert!(record.is_tombstone()),
            (None, None) => {}
            (Some(entry), None) => panic!("index entry {entry:?} for {key} with no history"),
        }
    }
}

// =============================================================================
// Test 1: Random put/delete sequences keep the keydir consistent with the log
// =============================================================================
#[test]
fn random_ops_match_model() {
    for seed in 0..20u64 {
        let mut rng = StdRng::seed_from_u64(seed);
        let store = Store::new();
        let mut model: HashMap<String, Vec<u8>> = HashMap::new();
        let mut ops = 0u64;

        for _ in 0..300 {
            let key = KEYS[rng.gen_range(0..KEYS.len())];
            if rng.gen_bool(0.7) {
                let value: Vec<u8> = (0..rng.gen_range(0..16)).map(|_| rng.gen_range(0..=255)).collect();
                store.put(key, value.clone()).unwrap();
                model.insert(key.to_string(), value);
            } else {
                store.delete(key).unwrap();
                model.remove(key);
            }
            ops += 1;
            check_invariants(&store, &model, ops);
        }
    }
}

// =============================================================================
// Test 2: Every position ever issued still resolves after heavy churn
// =============================================================================
#[test]
fn issued_positions_stay_resolvable() {
    let mut rng = StdRng::seed_from_u64(7);
    let store = Store::new();
    let mut issued = Vec::new();

    for i in 0..500u32 {
        let key = KEYS[rng.gen_range(0..KEYS.len())];
        let value = i.to_le_bytes().to_vec();
        store.put(key, value.clone()).unwrap();
        issued.push((store.lookup(key).unwrap().position, value));
        if rng.gen_bool(0.2) {
            store.delete(key).unwrap();
        }
    }

    for (pos, value) in issued {
        assert_eq!(store.record_at(pos).unwrap().value, value);
    }
    assert!(store.record_at(Position::new(store.log_len())).is_err());
}
