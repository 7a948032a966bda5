//! Participant registry
//!
//! Dense array of members plus a member → slot index, giving O(1) insert,
//! lookup and swap-remove. After every call `slots[index[k]] == k` holds for
//! every member `k`, and `slots.len() == index.len()`.

use std::collections::HashMap;
use std::hash::Hash;

/// Set of participants with stable O(1) membership operations
#[derive(Clone, Debug)]
pub struct ParticipantRegistry<K> {
    slots: Vec<K>,
    index: HashMap<K, usize>,
}

impl<K> Default for ParticipantRegistry<K> {
    fn default() -> Self {
        Self {
            slots: Vec::new(),
            index: HashMap::new(),
        }
    }
}

impl<K: Clone + Eq + Hash> ParticipantRegistry<K> {
    pub fn new() -> Self {
        Self::default()
    }

    /// Add `key` at the next free slot. Returns `false` if already present.
    pub fn insert(&mut self, key: K) -> bool {
        if self.index.contains_key(&key) {
            return false;
        }
        self.index.insert(key.clone(), self.slots.len());
        self.slots.push(key);
        true
    }

    /// Remove `key`, moving the last member into its slot. Returns `false` if
    /// `key` was not a member.
    pub fn remove(&mut self, key: &K) -> bool {
        let Some(slot) = self.index.remove(key) else {
            return false;
        };
        let last = self.slots.len() - 1;
        if slot != last {
            self.slots.swap(slot, last);
            let moved = self.slots[slot].clone();
            self.index.insert(moved, slot);
        }
        self.slots.pop();
        true
    }

    pub fn contains(&self, key: &K) -> bool {
        self.index.contains_key(key)
    }

    /// Slot currently held by `key`
    pub fn slot_of(&self, key: &K) -> Option<usize> {
        self.index.get(key).copied()
    }

    /// Member at `slot`
    pub fn get(&self, slot: usize) -> Option<&K> {
        self.slots.get(slot)
    }

    pub fn len(&self) -> usize {
        self.slots.len()
    }

    pub fn is_empty(&self) -> bool {
        self.slots.is_empty()
    }

    pub fn as_slice(&self) -> &[K] {
        &self.slots
    }

    pub fn iter(&self) -> impl Iterator<Item = &K> {
        self.slots.iter()
    }

    /// Check the slot/index correspondence for every member
    pub fn is_consistent(&self) -> bool {
        self.slots.len() == self.index.len()
            && self
                .slots
                .iter()
                .enumerate()
                .all(|(slot, key)| self.index.get(key) == Some(&slot))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;
    use std::collections::HashSet;

    #[test]
    fn test_insert_is_idempotent() {
        let mut reg = ParticipantRegistry::new();
        assert!(reg.insert("alice"));
        assert!(!reg.insert("alice"));
        assert_eq!(reg.len(), 1);
        assert_eq!(reg.slot_of(&"alice"), Some(0));
    }

    #[test]
    fn test_remove_last_truncates() {
        let mut reg = ParticipantRegistry::new();
        reg.insert("a");
        reg.insert("b");
        assert!(reg.remove(&"b"));
        assert_eq!(reg.as_slice(), &["a"]);
        assert!(reg.is_consistent());
    }

    #[test]
    fn test_remove_middle_swaps_last_in() {
        let mut reg = ParticipantRegistry::new();
        reg.insert("a");
        reg.insert("b");
        reg.insert("c");

        assert!(reg.remove(&"a"));
        assert_eq!(reg.as_slice(), &["c", "b"]);
        assert_eq!(reg.slot_of(&"c"), Some(0));
        assert_eq!(reg.slot_of(&"b"), Some(1));
        assert!(!reg.contains(&"a"));
        assert!(reg.is_consistent());
    }

    #[test]
    fn test_remove_missing() {
        let mut reg: ParticipantRegistry<u8> = ParticipantRegistry::new();
        assert!(!reg.remove(&1));
        reg.insert(1);
        assert!(reg.remove(&1));
        assert!(reg.is_empty());
        assert!(!reg.remove(&1));
    }

    proptest! {
        #[test]
        fn prop_registry_matches_set(ops in proptest::collection::vec((any::<bool>(), 0u8..16), 0..200)) {
            let mut reg = ParticipantRegistry::new();
            let mut model = HashSet::new();
            for (add, key) in ops {
                if add {
                    prop_assert_eq!(reg.insert(key), model.insert(key));
                } else {
                    prop_assert_eq!(reg.remove(&key), model.remove(&key));
                }
                prop_assert!(reg.is_consistent());
                prop_assert_eq!(reg.len(), model.len());
            }
            for key in &model {
                let slot = reg.slot_of(key).unwrap();
                prop_assert_eq!(reg.get(slot), Some(key));
            }
        }
    }
}
