// CMap property tests.
//
// Property 1: state-machine equivalence against std::collections::HashMap.
//  - Ops: store, delete, load, contains, range (full and cut short), and
//    store/delete issued from inside a range visitor.
//  - Invariant after each op: len() equals the model's size, and every load
//    agrees with the model. After the run, range yields exactly the model.
//  - Colliding hashes exercise key equality; deletes push tables into
//    compaction. Resizing must never lose or duplicate an entry.
//
// Property 2: post-write policy invariant.
//  - After any write outside a walk, a table holding at least 64 live
//    entries is not overloaded and not tombstone-dominated.
use proptest::prelude::*;
use resizing_cmap::{CMap, ResizePolicy};
use std::collections::{BTreeMap, HashMap};

#[derive(Clone, Debug)]
enum Op {
    Store(u16, u32),
    Delete(u16),
    Load(u16),
    Contains(u16),
    Range,
    RangeFirst(usize),
    // Walk, and on the first visit delete every key in [from, from + n).
    DeleteDuringRange(u16, u16),
    // Walk, and on the first visit store n keys starting at `from`.
    StoreDuringRange(u16, u16),
}

fn arb_op(keys: u16) -> impl Strategy<Value = Op> {
    prop_oneof![
        6 => (0..keys, any::<u32>()).prop_map(|(k, v)| Op::Store(k, v)),
        3 => (0..keys).prop_map(Op::Delete),
        2 => (0..keys).prop_map(Op::Load),
        1 => (0..keys).prop_map(Op::Contains),
        1 => Just(Op::Range),
        1 => (0usize..20).prop_map(Op::RangeFirst),
        1 => (0..keys, 0u16..200).prop_map(|(f, n)| Op::DeleteDuringRange(f, n)),
        1 => (0..keys, 0u16..200).prop_map(|(f, n)| Op::StoreDuringRange(f, n)),
    ]
}

// Pairs of keys share a hash, so lookups must fall back to key equality.
fn paired(k: &u16) -> u32 {
    u32::from(*k / 2)
}

fn range_all(m: &CMap<u16, u32, fn(&u16) -> u32>) -> BTreeMap<u16, u32> {
    let mut out = BTreeMap::new();
    m.range(|k, v| {
        assert!(out.insert(*k, *v).is_none(), "key {k} visited twice");
        true
    });
    out
}

proptest! {
    #![proptest_config(ProptestConfig { cases: 48, .. ProptestConfig::default() })]
    #[test]
    fn prop_state_machine(
        keys in 64u16..2_000,
        ops in proptest::collection::vec(arb_op(2_000), 1..400),
    ) {
        let sut: CMap<u16, u32, fn(&u16) -> u32> = CMap::with_hasher(paired as fn(&u16) -> u32);
        let mut model: HashMap<u16, u32> = HashMap::new();

        for op in ops {
            match op {
                Op::Store(k, v) => {
                    let k = k % keys;
                    sut.store(k, v);
                    model.insert(k, v);
                }
                Op::Delete(k) => {
                    let k = k % keys;
                    prop_assert_eq!(sut.delete(&k), model.remove(&k));
                }
                Op::Load(k) => {
                    let k = k % keys;
                    prop_assert_eq!(sut.load(&k), model.get(&k).copied());
                }
                Op::Contains(k) => {
                    let k = k % keys;
                    prop_assert_eq!(sut.contains_key(&k), model.contains_key(&k));
                }
                Op::Range => {
                    let seen = range_all(&sut);
                    let expected: BTreeMap<u16, u32> = model.iter().map(|(k, v)| (*k, *v)).collect();
                    prop_assert_eq!(seen, expected);
                }
                Op::RangeFirst(n) => {
                    let mut calls = 0usize;
                    sut.range(|k, v| {
                        assert_eq!(model.get(k), Some(v));
                        calls += 1;
                        calls < n
                    });
                    prop_assert!(calls <= n.max(1));
                    prop_assert!(calls <= model.len());
                }
                Op::DeleteDuringRange(from, n) => {
                    let mut done = false;
                    let mut removed = Vec::new();
                    sut.range(|_, _| {
                        if !done {
                            done = true;
                            for k in from..from.saturating_add(n) {
                                let k = k % keys;
                                removed.push((k, sut.delete(&k)));
                            }
                        }
                        true
                    });
                    if !done {
                        // Empty map: nothing visited, nothing deleted.
                        prop_assert!(model.is_empty());
                    }
                    for (k, got) in removed {
                        prop_assert_eq!(got, model.remove(&k));
                    }
                }
                Op::StoreDuringRange(from, n) => {
                    let mut done = false;
                    sut.range(|_, _| {
                        if !done {
                            done = true;
                            for k in from..from.saturating_add(n) {
                                sut.store(k % keys, u32::from(k));
                            }
                        }
                        true
                    });
                    if done {
                        for k in from..from.saturating_add(n) {
                            model.insert(k % keys, u32::from(k));
                        }
                    }
                }
            }
            prop_assert_eq!(sut.len(), model.len());
            prop_assert!(!sut.is_resize_suspended());
        }

        for (k, v) in model.iter() {
            prop_assert_eq!(sut.load(k), Some(*v));
        }
        let expected: BTreeMap<u16, u32> = model.into_iter().collect();
        prop_assert_eq!(range_all(&sut), expected);
    }
}

proptest! {
    #![proptest_config(ProptestConfig { cases: 32, .. ProptestConfig::default() })]
    #[test]
    fn prop_policy_holds_after_each_write(
        ops in proptest::collection::vec((any::<bool>(), 0u32..3_000), 1..3_000),
    ) {
        let policy = ResizePolicy::default();
        let sut: CMap<u32, (), _> = CMap::with_hasher(|k: &u32| k.wrapping_mul(0x9E37_79B9));
        for (store, k) in ops {
            if store {
                sut.store(k, ());
            } else {
                sut.delete(&k);
            }
            let s = sut.stats();
            if s.entries >= policy.min_entries {
                prop_assert!(s.entries <= policy.max_load_factor * s.buckets, "{:?}", s);
                prop_assert!(s.entries >= policy.tombstone_ratio * s.deleted, "{:?}", s);
            }
        }
    }
}
