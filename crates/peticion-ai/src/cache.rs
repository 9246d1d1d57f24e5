//! Per-session memoization of task results.
//!
//! Keys are SHA-256 fingerprints of the task name and its JSON-serialized
//! inputs, so equal inputs hit regardless of how they were built. Entries
//! live as long as the cache; there is no eviction.

use std::collections::HashMap;
use std::fmt;

use peticion_core::Task;
use serde::Serialize;
use sha2::{Digest, Sha256};

use crate::resilience::Source;

/// Fingerprint of one task invocation.
#[derive(Clone, Copy, PartialEq, Eq, Hash)]
pub struct CacheKey([u8; 32]);

impl CacheKey {
    pub fn new<I: Serialize + ?Sized>(task: Task, inputs: &I) -> Result<Self, serde_json::Error> {
        let bytes = serde_json::to_vec(inputs)?;
        let mut hasher = Sha256::new();
        hasher.update(task.as_str().as_bytes());
        hasher.update([0u8]);
        hasher.update(&bytes);
        Ok(Self(hasher.finalize().into()))
    }
}

impl fmt::Debug for CacheKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for b in &self.0[..6] {
            write!(f, "{b:02x}")?;
        }
        Ok(())
    }
}

/// Results of one task type keyed by input fingerprint.
#[derive(Debug)]
pub struct ResultCache<T> {
    entries: HashMap<CacheKey, (T, Source)>,
    hits: u64,
}

impl<T: Clone> ResultCache<T> {
    pub fn new() -> Self {
        Self {
            entries: HashMap::new(),
            hits: 0,
        }
    }

    pub fn get(&mut self, key: &CacheKey) -> Option<(T, Source)> {
        let found = self.entries.get(key).cloned();
        if found.is_some() {
            self.hits += 1;
        }
        found
    }

    pub fn insert(&mut self, key: CacheKey, value: T, source: Source) {
        self.entries.insert(key, (value, source));
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn hits(&self) -> u64 {
        self.hits
    }

    pub fn clear(&mut self) {
        self.entries.clear();
    }
}

impl<T: Clone> Default for ResultCache<T> {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn equal_inputs_share_a_key() {
        let a = CacheKey::new(Task::Analyze, &("texto",)).unwrap();
        let b = CacheKey::new(Task::Analyze, &("texto",)).unwrap();
        assert_eq!(a, b);
    }

    #[test]
    fn task_is_part_of_the_key() {
        let a = CacheKey::new(Task::Analyze, "texto").unwrap();
        let b = CacheKey::new(Task::DetectProblems, "texto").unwrap();
        assert_ne!(a, b);
    }

    #[test]
    fn inputs_are_part_of_the_key() {
        let a = CacheKey::new(Task::Analyze, "texto a").unwrap();
        let b = CacheKey::new(Task::Analyze, "texto b").unwrap();
        assert_ne!(a, b);
    }

    #[test]
    fn hits_are_counted() {
        let mut cache = ResultCache::new();
        let key = CacheKey::new(Task::Analyze, "x").unwrap();
        assert!(cache.get(&key).is_none());
        cache.insert(key, 7u32, Source::Model);
        assert_eq!(cache.get(&key), Some((7, Source::Model)));
        assert_eq!(cache.hits(), 1);
        assert_eq!(cache.len(), 1);
        cache.clear();
        assert!(cache.is_empty());
    }
}
