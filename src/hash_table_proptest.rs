#![cfg(test)]

// Property tests for HashTable kept inside the crate so they can check
// private structural invariants after every operation.

use crate::hash_table::HashTable;
use crate::primes::SEED_CAPACITY;
use proptest::prelude::*;
use std::collections::{BTreeSet, HashMap};
use std::fmt;
use std::hash::{BuildHasher, Hasher};

// Key newtype with Borrow<str> to exercise borrowed lookup.
#[derive(Clone, Eq, PartialEq, Ord, PartialOrd, Hash)]
struct Key(String);
impl fmt::Debug for Key {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        self.0.fmt(f)
    }
}
impl std::borrow::Borrow<str> for Key {
    fn borrow(&self) -> &str {
        &self.0
    }
}

// Pool-indexed operations so shrinking moves toward earlier keys and
// shorter op lists.
#[derive(Clone, Debug)]
enum OpI {
    Insert(usize, i32),
    PutIfAbsent(usize, i32),
    Remove(usize),
    RemoveIfEq(usize, i32),
    ReplaceIfEq(usize, i32, i32),
    Merge(usize, i32),
    ComputeIfPresentDrop(usize),
    Get(usize),
    Contains(String),
    Clear,
}

fn key_from(pool: &[String], i: usize) -> Key {
    Key(pool[i].clone())
}

fn arb_scenario() -> impl Strategy<Value = (Vec<String>, Vec<OpI>)> {
    proptest::collection::vec("[a-z]{0,4}", 1..=48).prop_flat_map(|pool| {
        let idxs: Vec<usize> = (0..pool.len()).collect();
        let idx = proptest::sample::select(idxs);
        let contains_pool = proptest::sample::select(pool.clone());
        let small = -3i32..3;
        let op = prop_oneof![
            6 => (idx.clone(), any::<i32>()).prop_map(|(i, v)| OpI::Insert(i, v)),
            2 => (idx.clone(), any::<i32>()).prop_map(|(i, v)| OpI::PutIfAbsent(i, v)),
            4 => idx.clone().prop_map(OpI::Remove),
            1 => (idx.clone(), small.clone()).prop_map(|(i, v)| OpI::RemoveIfEq(i, v)),
            1 => (idx.clone(), small.clone(), any::<i32>())
                .prop_map(|(i, o, n)| OpI::ReplaceIfEq(i, o, n)),
            1 => (idx.clone(), small).prop_map(|(i, v)| OpI::Merge(i, v)),
            1 => idx.clone().prop_map(OpI::ComputeIfPresentDrop),
            2 => idx.clone().prop_map(OpI::Get),
            1 => prop_oneof![
                contains_pool.prop_map(|s: String| s),
                "[a-z]{0,4}".prop_map(|s| s)
            ]
            .prop_map(OpI::Contains),
            1 => Just(OpI::Clear),
        ];
        proptest::collection::vec(op, 1..200).prop_map(move |ops| (pool.clone(), ops))
    })
}

fn run<S: BuildHasher>(
    mut sut: HashTable<Key, i32, S>,
    pool: &[String],
    ops: Vec<OpI>,
) -> Result<(), TestCaseError> {
    let mut model: HashMap<Key, i32> = HashMap::new();
    for op in ops {
        match op {
            OpI::Insert(i, v) => {
                let k = key_from(pool, i);
                prop_assert_eq!(sut.insert(k.clone(), v), model.insert(k, v));
            }
            OpI::PutIfAbsent(i, v) => {
                let k = key_from(pool, i);
                let expected = model.get(&k).copied();
                prop_assert_eq!(sut.put_if_absent(k.clone(), v).copied(), expected);
                model.entry(k).or_insert(v);
            }
            OpI::Remove(i) => {
                let k = key_from(pool, i);
                prop_assert_eq!(sut.remove(&k), model.remove(&k));
            }
            OpI::RemoveIfEq(i, v) => {
                let k = key_from(pool, i);
                let matches = model.get(&k) == Some(&v);
                prop_assert_eq!(sut.remove_if_eq(&k, &v), matches);
                if matches {
                    model.remove(&k);
                }
            }
            OpI::ReplaceIfEq(i, old, new) => {
                let k = key_from(pool, i);
                let matches = model.get(&k) == Some(&old);
                prop_assert_eq!(sut.replace_if_eq(&k, &old, new), matches);
                if matches {
                    model.insert(k, new);
                }
            }
            OpI::Merge(i, v) => {
                // Sums to zero remove the entry.
                let k = key_from(pool, i);
                let merged = match model.get(&k) {
                    None => Some(v),
                    Some(&cur) => Some(cur.wrapping_add(v)).filter(|&s| s != 0),
                };
                let got = sut
                    .merge(k.clone(), v, |a, b| Some(a.wrapping_add(b)).filter(|&s| s != 0))
                    .copied();
                prop_assert_eq!(got, merged);
                match merged {
                    Some(m) => {
                        model.insert(k, m);
                    }
                    None => {
                        model.remove(&k);
                    }
                }
            }
            OpI::ComputeIfPresentDrop(i) => {
                let k = key_from(pool, i);
                prop_assert!(sut.compute_if_present(&k, |_, _| None).is_none());
                model.remove(&k);
            }
            OpI::Get(i) => {
                let k = key_from(pool, i);
                prop_assert_eq!(sut.get(&k), model.get(&k));
                prop_assert_eq!(sut.contains_key(&k), model.contains_key(&k));
            }
            OpI::Contains(s) => {
                let has = sut.contains_key(s.as_str());
                let has_model = model.keys().any(|k| k.0 == s);
                prop_assert_eq!(has, has_model);
            }
            OpI::Clear => {
                sut.clear();
                model.clear();
                prop_assert_eq!(sut.capacity(), SEED_CAPACITY);
            }
        }

        sut.assert_invariants();
        let s_keys: BTreeSet<_> = sut.keys().cloned().collect();
        let m_keys: BTreeSet<_> = model.keys().cloned().collect();
        prop_assert_eq!(s_keys, m_keys);
        prop_assert_eq!(sut.iter().count(), model.len());
        prop_assert_eq!(sut.len(), model.len());
        prop_assert_eq!(sut.is_empty(), model.is_empty());
    }
    Ok(())
}

// Property: state-machine equivalence against std::collections::HashMap.
// After every op the table must also hold its structural invariants:
// capacity is a progression prime, load stays at or under LOAD_FACTOR,
// every node sits in the bucket its stored hash selects, and chain
// lengths sum to len().
proptest! {
    #![proptest_config(ProptestConfig { cases: 64, .. ProptestConfig::default() })]
    #[test]
    fn prop_state_machine((pool, ops) in arb_scenario()) {
        run(HashTable::new(), &pool, ops)?;
    }
}

// Collision variant using a constant hasher to stress chain traversal and
// unlinking from every chain position.
#[derive(Clone, Default)]
struct ConstBuildHasher;
struct ConstHasher;
impl BuildHasher for ConstBuildHasher {
    type Hasher = ConstHasher;
    fn build_hasher(&self) -> Self::Hasher {
        ConstHasher
    }
}
impl Hasher for ConstHasher {
    fn write(&mut self, _bytes: &[u8]) {}
    fn finish(&self) -> u64 {
        0
    }
}

proptest! {
    #![proptest_config(ProptestConfig { cases: 64, .. ProptestConfig::default() })]
    #[test]
    fn prop_state_machine_with_collisions((pool, ops) in arb_scenario()) {
        run(HashTable::with_hasher(ConstBuildHasher), &pool, ops)?;
    }
}
