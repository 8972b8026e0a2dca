use std::borrow::Borrow;
use std::collections::HashMap;
use std::hash::Hash;

/// One locally asserted value.
#[derive(Debug, Clone, PartialEq)]
pub struct Pending<V, B> {
    /// What the user sees while the entry lives.
    pub value: V,
    /// Tag of the gesture that asserted `value`. Only that gesture may
    /// settle or revert the entry.
    pub generation: u64,
    /// Last value the store confirmed. Restored on failure.
    pub baseline: B,
}

/// Pending state keyed by entity.
///
/// A newer assertion for the same key replaces the value and generation but
/// keeps the baseline, so a failure after several quick gestures reverts to
/// what the store last confirmed rather than to an intermediate local value.
#[derive(Debug)]
pub struct PendingMap<K, V, B = V> {
    entries: HashMap<K, Pending<V, B>>,
    next_generation: u64,
}

impl<K, V, B> Default for PendingMap<K, V, B> {
    fn default() -> Self {
        Self {
            entries: HashMap::new(),
            next_generation: 1,
        }
    }
}

impl<K: Eq + Hash, V, B> PendingMap<K, V, B> {
    pub fn new() -> Self {
        Self::default()
    }

    /// Record a local value. `baseline` is only used when no entry exists.
    pub fn assert_local(&mut self, key: K, value: V, baseline: B) -> u64 {
        let generation = self.next_generation;
        self.next_generation += 1;
        match self.entries.get_mut(&key) {
            Some(entry) => {
                entry.value = value;
                entry.generation = generation;
            }
            None => {
                self.entries.insert(
                    key,
                    Pending {
                        value,
                        generation,
                        baseline,
                    },
                );
            }
        }
        generation
    }

    pub fn get<Q>(&self, key: &Q) -> Option<&V>
    where
        K: Borrow<Q>,
        Q: Hash + Eq + ?Sized,
    {
        self.entries.get(key).map(|entry| &entry.value)
    }

    pub fn entry<Q>(&self, key: &Q) -> Option<&Pending<V, B>>
    where
        K: Borrow<Q>,
        Q: Hash + Eq + ?Sized,
    {
        self.entries.get(key)
    }

    pub fn contains<Q>(&self, key: &Q) -> bool
    where
        K: Borrow<Q>,
        Q: Hash + Eq + ?Sized,
    {
        self.entries.contains_key(key)
    }

    /// A write landed: whatever generation owns the entry, the store now
    /// holds `confirmed`.
    pub fn confirm<Q>(&mut self, key: &Q, confirmed: B)
    where
        K: Borrow<Q>,
        Q: Hash + Eq + ?Sized,
    {
        if let Some(entry) = self.entries.get_mut(key) {
            entry.baseline = confirmed;
        }
    }

    /// Drop the entry if `generation` still owns it.
    pub fn settle<Q>(&mut self, key: &Q, generation: u64) -> bool
    where
        K: Borrow<Q>,
        Q: Hash + Eq + ?Sized,
    {
        let owned = self
            .entries
            .get(key)
            .is_some_and(|entry| entry.generation == generation);
        if owned {
            self.entries.remove(key);
        }
        owned
    }

    /// Drop the entry if `generation` still owns it and hand back the
    /// baseline to restore.
    pub fn fail<Q>(&mut self, key: &Q, generation: u64) -> Option<B>
    where
        K: Borrow<Q>,
        Q: Hash + Eq + ?Sized,
    {
        let owned = self
            .entries
            .get(key)
            .is_some_and(|entry| entry.generation == generation);
        if owned {
            self.entries.remove(key).map(|entry| entry.baseline)
        } else {
            None
        }
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn clear(&mut self) {
        self.entries.clear();
    }

    pub fn iter(&self) -> impl Iterator<Item = (&K, &V)> {
        self.entries.iter().map(|(key, entry)| (key, &entry.value))
    }
}
