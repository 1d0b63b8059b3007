//! prime-hashtable: a single-owner, separately-chained hash map whose
//! bucket count walks a fixed progression of primes.
//!
//! Internal Design:
//!
//! Summary
//! - Goal: a dictionary with the full read/write/iteration contract of
//!   `std::collections::HashMap`, built on explicit collision chains and a
//!   predictable resize policy.
//! - Layers:
//!   - `primes`: the capacity progression. 69 tabulated primes from 17 to
//!     7_199_369, extended on demand past the end.
//!   - `HashTable<K, V, S>`: bucket array of chain heads over a node arena,
//!     plus the grow/shrink policy and the whole operation set.
//!   - `iter`: borrowing, mutable and owning iterators.
//!
//! Storage
//! - Nodes live in a `SlotMap`; each carries its key, value, precomputed
//!   `u64` hash and the arena key of the next node in its chain. The bucket
//!   array holds only chain heads.
//! - New keys are prepended to their chain. Lookups compare the stored hash
//!   before calling `K: Eq`.
//! - Bucket selection folds the high bits of the hash into the low bits
//!   before reducing modulo the (prime) bucket count.
//!
//! Resize policy
//! - Grow: after an insert leaves `len / capacity > LOAD_FACTOR` (0.75), the
//!   table moves to the next prime in the progression.
//! - Shrink: after a removal leaves `len <= capacity / 4` on a table above the
//!   seed capacity, the table moves to the smallest prime
//!   `>= len / LOAD_FACTOR`. The asymmetric thresholds keep alternating
//!   insert/remove at a boundary from thrashing.
//! - Both are a full, synchronous rehash that relinks existing nodes using
//!   their stored hash; `K: Hash` is never called during resize. Expect an
//!   O(n) pause on the operation that crosses a threshold.
//! - `clear()` drops every entry and returns to the seed capacity.
//!
//! Constraints
//! - Single-threaded and unsynchronized; no ordering guarantees. Iteration
//!   order may change across any resize.
//! - Keys are immutable post-insert; values may be mutated in place.
//! - Caller-supplied closures (`compute*`, `merge`, `for_each`,
//!   `replace_all`) receive `&K`/`&V` while the table is borrowed, so they
//!   cannot mutate it.
//! - Equality is order-independent. `hash_code()` sums per-entry
//!   `hash(k) ^ hash(v)` with a fixed-key hasher so it agrees with `==`
//!   across tables seeded differently.
//!
//! Logging
//! - With the `logging` feature, every resize emits a `log::trace!` record.

mod hash_table;
mod hash_table_proptest;
pub mod iter;
mod primes;

// Public surface
pub use hash_table::{HashTable, InsertError, LOAD_FACTOR};
pub use primes::SEED_CAPACITY;
