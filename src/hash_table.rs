//! HashTable: separately-chained map over a node arena with a
//! prime-capacity grow/shrink policy.

use crate::iter::{IntoIter, Iter, IterMut, Keys, Values, ValuesMut};
use crate::primes::{closest_prime, prime_at, SEED_CAPACITY};
use core::borrow::Borrow;
use core::fmt;
use core::hash::{BuildHasher, Hash, Hasher};
use core::ops::Index;
use hashbrown::HashSet;
use slotmap::{DefaultKey, SlotMap};
use std::collections::hash_map::{DefaultHasher, RandomState};

/// Ratio of entries to buckets above which the table grows.
pub const LOAD_FACTOR: f64 = 0.75;

#[derive(Clone, Debug)]
pub(crate) struct Node<K, V> {
    pub(crate) key: K,
    pub(crate) value: V,
    hash: u64,
    pub(crate) next: Option<DefaultKey>,
}

/// Returned by `try_insert` when the key is already present. Carries the
/// rejected pair back to the caller.
#[derive(Debug, thiserror::Error)]
pub enum InsertError<K, V> {
    #[error("key already present in table")]
    DuplicateKey { key: K, value: V },
}

/// A hash map whose collisions are resolved by chaining.
///
/// Chains are singly linked through an arena of nodes; the bucket array
/// only holds chain heads. Bucket counts are always primes drawn from a
/// fixed progression starting at [`SEED_CAPACITY`]. The table grows to the
/// next prime once `len / capacity` exceeds [`LOAD_FACTOR`], and shrinks
/// once a removal leaves it at most a quarter full.
///
/// Callbacks handed to `compute*`, `merge`, `for_each` and `replace_all`
/// only ever see `&K`/`&V`; the table stays borrowed for the whole call so
/// they cannot reach back into it.
#[derive(Clone)]
pub struct HashTable<K, V, S = RandomState> {
    hasher: S,
    buckets: Vec<Option<DefaultKey>>, // chain heads
    slots: SlotMap<DefaultKey, Node<K, V>>,
    capacity_index: usize,
}

impl<K, V> HashTable<K, V>
where
    K: Eq + Hash,
{
    pub fn new() -> Self {
        Self::with_hasher(Default::default())
    }

    /// Creates a table that holds at least `n` entries before growing.
    pub fn with_capacity(n: usize) -> Self {
        Self::with_capacity_and_hasher(n, Default::default())
    }
}

impl<K, V, S> Default for HashTable<K, V, S>
where
    S: Default,
{
    fn default() -> Self {
        Self::with_hasher(S::default())
    }
}

#[inline]
fn bucket_index(hash: u64, capacity: usize) -> usize {
    let h = hash ^ (hash >> 32);
    let h = h ^ (h >> 16);
    (h % capacity as u64) as usize
}

fn stable_hash<T: ?Sized + Hash>(t: &T) -> u64 {
    let mut h = DefaultHasher::new();
    t.hash(&mut h);
    h.finish()
}

fn buckets_for(n: usize) -> (usize, usize) {
    closest_prime((n as f64 / LOAD_FACTOR).ceil() as usize)
}

impl<K, V, S> HashTable<K, V, S> {
    pub fn with_hasher(hasher: S) -> Self {
        Self {
            hasher,
            buckets: vec![None; SEED_CAPACITY],
            slots: SlotMap::with_key(),
            capacity_index: 0,
        }
    }

    pub fn with_capacity_and_hasher(n: usize, hasher: S) -> Self {
        let (index, prime) = buckets_for(n);
        Self {
            hasher,
            buckets: vec![None; prime],
            slots: SlotMap::with_capacity_and_key(n),
            capacity_index: index,
        }
    }

    pub fn len(&self) -> usize {
        self.slots.len()
    }

    pub fn is_empty(&self) -> bool {
        self.slots.is_empty()
    }

    /// Number of buckets. Always a member of the prime progression.
    pub fn capacity(&self) -> usize {
        self.buckets.len()
    }

    pub fn hasher(&self) -> &S {
        &self.hasher
    }

    /// Drops every entry and returns to the seed capacity.
    pub fn clear(&mut self) {
        self.slots.clear();
        self.buckets = vec![None; SEED_CAPACITY];
        self.capacity_index = 0;
    }

    /// Ensures `additional` more entries fit without triggering a grow.
    ///
    /// `additional` counts entries, not distinct new keys: reserving for
    /// keys that are already present still grows the table, and nothing
    /// shrinks it back until a removal.
    ///
    /// # Panics
    ///
    /// Panics with "capacity overflow" if the bucket array would exceed
    /// `isize::MAX` bytes.
    pub fn reserve(&mut self, additional: usize) {
        let wanted = self.len().saturating_add(additional);
        if wanted as f64 / self.capacity() as f64 > LOAD_FACTOR {
            let (index, prime) = buckets_for(wanted);
            if prime > self.capacity() {
                self.resize(index, prime);
            }
        }
    }

    pub fn iter(&self) -> Iter<'_, K, V> {
        Iter::new(&self.buckets, &self.slots)
    }

    pub fn iter_mut(&mut self) -> IterMut<'_, K, V> {
        IterMut::new(&mut self.slots)
    }

    pub fn keys(&self) -> Keys<'_, K, V> {
        Keys { inner: self.iter() }
    }

    /// Borrowing iterator over values; see [`HashTable::values`] for a copy.
    pub fn values_iter(&self) -> Values<'_, K, V> {
        Values { inner: self.iter() }
    }

    pub fn values_mut(&mut self) -> ValuesMut<'_, K, V> {
        ValuesMut {
            inner: self.iter_mut(),
        }
    }

    /// Calls `action` once per entry in bucket-then-chain order.
    pub fn for_each<F>(&self, mut action: F)
    where
        F: FnMut(&K, &V),
    {
        for (k, v) in self.iter() {
            action(k, v);
        }
    }

    /// Replaces every value with `f(key, value)`.
    pub fn replace_all<F>(&mut self, mut f: F)
    where
        F: FnMut(&K, &V) -> V,
    {
        for i in 0..self.buckets.len() {
            let mut cur = self.buckets[i];
            while let Some(k) = cur {
                let node = &mut self.slots[k];
                let value = f(&node.key, &node.value);
                node.value = value;
                cur = node.next;
            }
        }
    }

    /// Copies the values out, in iteration order.
    pub fn values(&self) -> Vec<V>
    where
        V: Clone,
    {
        self.values_iter().cloned().collect()
    }

    /// Copies every entry out, in iteration order.
    pub fn entry_set(&self) -> Vec<(K, V)>
    where
        K: Clone,
        V: Clone,
    {
        self.iter().map(|(k, v)| (k.clone(), v.clone())).collect()
    }

    /// Order-independent digest: the wrapping sum of `hash(k) ^ hash(v)`.
    ///
    /// Uses a fixed-key hasher rather than `S`, so equal tables produce
    /// equal codes regardless of how each was seeded.
    pub fn hash_code(&self) -> u64
    where
        K: Hash,
        V: Hash,
    {
        self.iter().fold(0u64, |acc, (k, v)| {
            acc.wrapping_add(stable_hash(k) ^ stable_hash(v))
        })
    }

    fn grow_if_overloaded(&mut self) {
        if self.len() as f64 / self.capacity() as f64 > LOAD_FACTOR {
            let index = self.capacity_index + 1;
            self.resize(index, prime_at(index));
        }
    }

    fn shrink_if_sparse(&mut self) {
        let capacity = self.capacity();
        if capacity > SEED_CAPACITY && self.len() <= capacity / 4 {
            let (index, prime) = buckets_for(self.len());
            if prime < capacity {
                self.resize(index, prime);
            }
        }
    }

    // Relinks every node into a fresh bucket array using the stored hash.
    // Arena keys are stable, so no node moves.
    fn resize(&mut self, index: usize, capacity: usize) {
        #[cfg(feature = "logging")]
        log::trace!(
            "rehashing {} entries from {} to {} buckets",
            self.len(),
            self.capacity(),
            capacity
        );

        let mut buckets = vec![None; capacity];
        for (k, node) in self.slots.iter_mut() {
            let i = bucket_index(node.hash, capacity);
            node.next = buckets[i];
            buckets[i] = Some(k);
        }
        self.buckets = buckets;
        self.capacity_index = index;
    }

    fn push_front(&mut self, hash: u64, key: K, value: V) -> DefaultKey {
        let i = bucket_index(hash, self.capacity());
        let next = self.buckets[i];
        let k = self.slots.insert(Node {
            key,
            value,
            hash,
            next,
        });
        self.buckets[i] = Some(k);
        k
    }

    fn insert_new(&mut self, hash: u64, key: K, value: V) -> DefaultKey {
        let k = self.push_front(hash, key, value);
        self.grow_if_overloaded();
        k
    }

    fn unlink(&mut self, prev: Option<DefaultKey>, k: DefaultKey) -> Option<Node<K, V>> {
        let node = self.slots.remove(k)?;
        match prev {
            Some(p) => self.slots[p].next = node.next,
            None => {
                let i = bucket_index(node.hash, self.capacity());
                self.buckets[i] = node.next;
            }
        }
        Some(node)
    }
}

impl<K, V, S> HashTable<K, V, S>
where
    K: Eq + Hash,
    S: BuildHasher,
{
    fn make_hash<Q>(&self, q: &Q) -> u64
    where
        Q: ?Sized + Hash,
    {
        self.hasher.hash_one(q)
    }

    fn find_node<Q>(&self, hash: u64, q: &Q) -> Option<DefaultKey>
    where
        K: Borrow<Q>,
        Q: ?Sized + Eq,
    {
        self.find_link(hash, q).map(|(_, k)| k)
    }

    // Returns the matching node together with its chain predecessor.
    fn find_link<Q>(&self, hash: u64, q: &Q) -> Option<(Option<DefaultKey>, DefaultKey)>
    where
        K: Borrow<Q>,
        Q: ?Sized + Eq,
    {
        let mut prev = None;
        let mut cur = self.buckets[bucket_index(hash, self.capacity())];
        while let Some(k) = cur {
            let node = &self.slots[k];
            if node.hash == hash && node.key.borrow() == q {
                return Some((prev, k));
            }
            prev = cur;
            cur = node.next;
        }
        None
    }

    fn remove_found(&mut self, prev: Option<DefaultKey>, k: DefaultKey) -> Option<(K, V)> {
        let node = self.unlink(prev, k)?;
        self.shrink_if_sparse();
        Some((node.key, node.value))
    }

    /// Inserts or overwrites, returning the previous value for `key`.
    pub fn insert(&mut self, key: K, value: V) -> Option<V> {
        let hash = self.make_hash(&key);
        if let Some(k) = self.find_node(hash, &key) {
            return Some(core::mem::replace(&mut self.slots[k].value, value));
        }
        self.insert_new(hash, key, value);
        None
    }

    /// Inserts only if `key` is absent. Returns the existing value
    /// otherwise, leaving it untouched.
    pub fn put_if_absent(&mut self, key: K, value: V) -> Option<&V> {
        let hash = self.make_hash(&key);
        match self.find_node(hash, &key) {
            Some(k) => Some(&self.slots[k].value),
            None => {
                self.insert_new(hash, key, value);
                None
            }
        }
    }

    /// Inserts a new entry, refusing to overwrite an existing one.
    pub fn try_insert(&mut self, key: K, value: V) -> Result<&mut V, InsertError<K, V>> {
        let hash = self.make_hash(&key);
        if self.find_node(hash, &key).is_some() {
            return Err(InsertError::DuplicateKey { key, value });
        }
        let k = self.insert_new(hash, key, value);
        Ok(&mut self.slots[k].value)
    }

    pub fn get<Q>(&self, q: &Q) -> Option<&V>
    where
        K: Borrow<Q>,
        Q: ?Sized + Hash + Eq,
    {
        let hash = self.make_hash(q);
        self.find_node(hash, q).map(|k| &self.slots[k].value)
    }

    /// Returns the value for `q`, or `default` when absent.
    pub fn get_or<'a, Q>(&'a self, q: &Q, default: &'a V) -> &'a V
    where
        K: Borrow<Q>,
        Q: ?Sized + Hash + Eq,
    {
        self.get(q).unwrap_or(default)
    }

    pub fn get_key_value<Q>(&self, q: &Q) -> Option<(&K, &V)>
    where
        K: Borrow<Q>,
        Q: ?Sized + Hash + Eq,
    {
        let hash = self.make_hash(q);
        self.find_node(hash, q).map(|k| {
            let node = &self.slots[k];
            (&node.key, &node.value)
        })
    }

    pub fn get_mut<Q>(&mut self, q: &Q) -> Option<&mut V>
    where
        K: Borrow<Q>,
        Q: ?Sized + Hash + Eq,
    {
        let hash = self.make_hash(q);
        let k = self.find_node(hash, q)?;
        Some(&mut self.slots[k].value)
    }

    pub fn contains_key<Q>(&self, q: &Q) -> bool
    where
        K: Borrow<Q>,
        Q: ?Sized + Hash + Eq,
    {
        let hash = self.make_hash(q);
        self.find_node(hash, q).is_some()
    }

    /// Full scan; values are not indexed.
    pub fn contains_value(&self, value: &V) -> bool
    where
        V: PartialEq,
    {
        self.values_iter().any(|v| v == value)
    }

    pub fn remove<Q>(&mut self, q: &Q) -> Option<V>
    where
        K: Borrow<Q>,
        Q: ?Sized + Hash + Eq,
    {
        self.remove_entry(q).map(|(_, v)| v)
    }

    pub fn remove_entry<Q>(&mut self, q: &Q) -> Option<(K, V)>
    where
        K: Borrow<Q>,
        Q: ?Sized + Hash + Eq,
    {
        let hash = self.make_hash(q);
        let (prev, k) = self.find_link(hash, q)?;
        self.remove_found(prev, k)
    }

    /// Removes the entry for `q` only if its value equals `value`.
    pub fn remove_if_eq<Q>(&mut self, q: &Q, value: &V) -> bool
    where
        K: Borrow<Q>,
        Q: ?Sized + Hash + Eq,
        V: PartialEq,
    {
        let hash = self.make_hash(q);
        match self.find_link(hash, q) {
            Some((prev, k)) if self.slots[k].value == *value => {
                self.remove_found(prev, k).is_some()
            }
            _ => false,
        }
    }

    /// Overwrites the value for `q` if present, returning the old one.
    /// Never inserts.
    pub fn replace<Q>(&mut self, q: &Q, value: V) -> Option<V>
    where
        K: Borrow<Q>,
        Q: ?Sized + Hash + Eq,
    {
        self.get_mut(q).map(|v| core::mem::replace(v, value))
    }

    /// Overwrites the value for `q` only if it currently equals `old`.
    pub fn replace_if_eq<Q>(&mut self, q: &Q, old: &V, new: V) -> bool
    where
        K: Borrow<Q>,
        Q: ?Sized + Hash + Eq,
        V: PartialEq,
    {
        match self.get_mut(q) {
            Some(v) if *v == *old => {
                *v = new;
                true
            }
            _ => false,
        }
    }

    /// Recomputes the entry for `key` from its current value, if any.
    /// `None` from `f` removes the entry (or leaves it absent).
    pub fn compute<F>(&mut self, key: K, f: F) -> Option<&V>
    where
        F: FnOnce(&K, Option<&V>) -> Option<V>,
    {
        let hash = self.make_hash(&key);
        let found = self.find_link(hash, &key);
        let computed = f(&key, found.map(|(_, k)| &self.slots[k].value));
        match (found, computed) {
            (Some((_, k)), Some(value)) => {
                self.slots[k].value = value;
                Some(&self.slots[k].value)
            }
            (Some((prev, k)), None) => {
                self.remove_found(prev, k);
                None
            }
            (None, Some(value)) => {
                let k = self.insert_new(hash, key, value);
                Some(&self.slots[k].value)
            }
            (None, None) => None,
        }
    }

    /// Inserts `f(key)` when `key` is absent and `f` yields a value.
    /// Returns the value now stored, if any.
    pub fn compute_if_absent<F>(&mut self, key: K, f: F) -> Option<&V>
    where
        F: FnOnce(&K) -> Option<V>,
    {
        let hash = self.make_hash(&key);
        if let Some(k) = self.find_node(hash, &key) {
            return Some(&self.slots[k].value);
        }
        let value = f(&key)?;
        let k = self.insert_new(hash, key, value);
        Some(&self.slots[k].value)
    }

    /// Recomputes an existing entry; `None` from `f` removes it.
    pub fn compute_if_present<Q, F>(&mut self, q: &Q, f: F) -> Option<&V>
    where
        K: Borrow<Q>,
        Q: ?Sized + Hash + Eq,
        F: FnOnce(&K, &V) -> Option<V>,
    {
        let hash = self.make_hash(q);
        let (prev, k) = self.find_link(hash, q)?;
        let node = &self.slots[k];
        match f(&node.key, &node.value) {
            Some(value) => {
                self.slots[k].value = value;
                Some(&self.slots[k].value)
            }
            None => {
                self.remove_found(prev, k);
                None
            }
        }
    }

    /// Stores `value` if `key` is absent, otherwise `f(current, value)`.
    /// `None` from `f` removes the entry.
    pub fn merge<F>(&mut self, key: K, value: V, f: F) -> Option<&V>
    where
        F: FnOnce(&V, V) -> Option<V>,
    {
        let hash = self.make_hash(&key);
        let Some((prev, k)) = self.find_link(hash, &key) else {
            let k = self.insert_new(hash, key, value);
            return Some(&self.slots[k].value);
        };
        let merged = f(&self.slots[k].value, value);
        match merged {
            Some(merged) => {
                self.slots[k].value = merged;
                Some(&self.slots[k].value)
            }
            None => {
                self.remove_found(prev, k);
                None
            }
        }
    }

    /// Copies the keys into a fresh set using a clone of this table's
    /// hasher.
    pub fn key_set(&self) -> HashSet<K, S>
    where
        K: Clone,
        S: Clone,
    {
        let mut set = HashSet::with_capacity_and_hasher(self.len(), self.hasher.clone());
        set.extend(self.keys().cloned());
        set
    }

    #[cfg(test)]
    pub(crate) fn assert_invariants(&self) {
        let capacity = self.capacity();
        assert_eq!(capacity, prime_at(self.capacity_index));
        assert!(capacity >= SEED_CAPACITY);
        assert!(self.len() as f64 / capacity as f64 <= LOAD_FACTOR);

        let mut chained = 0;
        for (i, head) in self.buckets.iter().enumerate() {
            let mut cur = *head;
            while let Some(k) = cur {
                let node = &self.slots[k];
                assert_eq!(node.hash, self.make_hash(&node.key));
                assert_eq!(bucket_index(node.hash, capacity), i);
                chained += 1;
                cur = node.next;
            }
        }
        assert_eq!(chained, self.len());
    }
}

impl<K, V, S> PartialEq for HashTable<K, V, S>
where
    K: Eq + Hash,
    V: PartialEq,
    S: BuildHasher,
{
    fn eq(&self, other: &Self) -> bool {
        self.len() == other.len() && self.iter().all(|(k, v)| other.get(k) == Some(v))
    }
}

impl<K, V, S> Eq for HashTable<K, V, S>
where
    K: Eq + Hash,
    V: Eq,
    S: BuildHasher,
{
}

impl<K, V, S> Hash for HashTable<K, V, S>
where
    K: Hash,
    V: Hash,
{
    fn hash<H: Hasher>(&self, state: &mut H) {
        state.write_u64(self.hash_code());
    }
}

impl<K, V, S> fmt::Debug for HashTable<K, V, S>
where
    K: fmt::Debug,
    V: fmt::Debug,
{
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_map().entries(self.iter()).finish()
    }
}

/// Renders `{k1=v1, k2=v2}` in iteration order.
impl<K, V, S> fmt::Display for HashTable<K, V, S>
where
    K: fmt::Display,
    V: fmt::Display,
{
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("{")?;
        for (i, (k, v)) in self.iter().enumerate() {
            if i > 0 {
                f.write_str(", ")?;
            }
            write!(f, "{}={}", k, v)?;
        }
        f.write_str("}")
    }
}

impl<K, Q, V, S> Index<&Q> for HashTable<K, V, S>
where
    K: Eq + Hash + Borrow<Q>,
    Q: ?Sized + Eq + Hash,
    S: BuildHasher,
{
    type Output = V;

    fn index(&self, key: &Q) -> &V {
        self.get(key).expect("key not present in HashTable")
    }
}

impl<K, V, S> Extend<(K, V)> for HashTable<K, V, S>
where
    K: Eq + Hash,
    S: BuildHasher,
{
    /// Pre-sizes for the whole lower size hint when empty, otherwise for
    /// half of it, since incoming keys may already be present.
    fn extend<T: IntoIterator<Item = (K, V)>>(&mut self, iter: T) {
        let iter = iter.into_iter();
        let hint = iter.size_hint().0;
        let reserve = if self.is_empty() {
            hint
        } else {
            (hint + 1) / 2
        };
        self.reserve(reserve);
        for (k, v) in iter {
            self.insert(k, v);
        }
    }
}

impl<K, V, S> FromIterator<(K, V)> for HashTable<K, V, S>
where
    K: Eq + Hash,
    S: BuildHasher + Default,
{
    fn from_iter<T: IntoIterator<Item = (K, V)>>(iter: T) -> Self {
        let mut table = Self::with_hasher(S::default());
        table.extend(iter);
        table
    }
}

impl<K, V, S> IntoIterator for HashTable<K, V, S> {
    type Item = (K, V);
    type IntoIter = IntoIter<K, V>;

    fn into_iter(self) -> Self::IntoIter {
        IntoIter::new(self.slots)
    }
}

impl<'a, K, V, S> IntoIterator for &'a HashTable<K, V, S> {
    type Item = (&'a K, &'a V);
    type IntoIter = Iter<'a, K, V>;

    fn into_iter(self) -> Self::IntoIter {
        self.iter()
    }
}

impl<'a, K, V, S> IntoIterator for &'a mut HashTable<K, V, S> {
    type Item = (&'a K, &'a mut V);
    type IntoIter = IterMut<'a, K, V>;

    fn into_iter(self) -> Self::IntoIter {
        self.iter_mut()
    }
}
