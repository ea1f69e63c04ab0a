//! A non-durable [`FactStore`] backed by a lock-guarded set, suitable for tests, the CLI
//! and single-process deployments. Durable adapters (e.g. a database-backed store) are a
//! hosting application's concern; this is the template they'd follow.

use std::collections::BTreeSet;

use parking_lot::RwLock;

use crate::error::Result;
use crate::fact::{Fact, FactStore};

/// In-memory [`FactStore`]. Cheap to construct, cloneable, shareable across threads.
#[derive(Default)]
pub struct MemoryFactStore {
    facts: RwLock<BTreeSet<Fact>>,
}

impl MemoryFactStore {
    /// Create an empty store.
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of facts currently asserted, across all topics. Mainly useful for tests.
    pub fn len(&self) -> usize {
        self.facts.read().len()
    }

    /// Reports whether the store holds no facts.
    pub fn is_empty(&self) -> bool {
        self.facts.read().is_empty()
    }
}

impl FactStore for MemoryFactStore {
    fn assert(&self, facts: &[Fact]) -> Result<()> {
        let mut guard = self.facts.write();
        for fact in facts {
            guard.insert(fact.clone());
        }
        Ok(())
    }

    fn deny(&self, facts: &[Fact]) -> Result<()> {
        let mut guard = self.facts.write();
        for fact in facts {
            guard.remove(fact);
        }
        Ok(())
    }

    fn exists(&self, facts: &[Fact]) -> Result<bool> {
        let guard = self.facts.read();
        Ok(facts.iter().all(|f| guard.contains(f)))
    }

    fn match_fact(&self, pattern: &Fact) -> Result<Vec<Fact>> {
        let guard = self.facts.read();
        Ok(guard.iter().filter(|f| pattern.matches(f)).cloned().collect())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn assert_then_exists() {
        let store = MemoryFactStore::new();
        let fact = Fact::new("t", "s", "p", "o");
        store.assert(&[fact.clone()]).unwrap();
        assert!(store.exists(&[fact]).unwrap());
    }

    #[test]
    fn assert_is_idempotent() {
        let store = MemoryFactStore::new();
        let fact = Fact::new("t", "s", "p", "o");
        store.assert(&[fact.clone()]).unwrap();
        store.assert(&[fact.clone()]).unwrap();
        assert_eq!(store.len(), 1);
    }

    #[test]
    fn deny_missing_fact_is_a_noop() {
        let store = MemoryFactStore::new();
        store.deny(&[Fact::new("t", "s", "p", "o")]).unwrap();
        assert!(store.is_empty());
    }

    #[test]
    fn exists_requires_every_fact() {
        let store = MemoryFactStore::new();
        store.assert(&[Fact::new("t", "a", "p", "o")]).unwrap();
        let all = [Fact::new("t", "a", "p", "o"), Fact::new("t", "b", "p", "o")];
        assert!(!store.exists(&all).unwrap());
    }

    #[test]
    fn match_with_wildcards() {
        let store = MemoryFactStore::new();
        store.assert(&[Fact::new("t", "a", "p1", "o1"), Fact::new("t", "a", "p2", "o2")]).unwrap();
        let matches = store.match_fact(&Fact::new("t", "a", "", "")).unwrap();
        assert_eq!(matches.len(), 2);
    }
}
