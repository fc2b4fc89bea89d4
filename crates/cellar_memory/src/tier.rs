// Copyright (c) Microsoft Corporation.
// Licensed under the MIT License.

//! Insertion-ordered in-memory tier with a byte budget.

use std::collections::{HashMap, VecDeque};
use std::time::SystemTime;

use cellar_tier::{CacheEntry, CacheKey, CacheTier, Error, KeyPattern, TierUsage};
use parking_lot::Mutex;

/// Default byte budget: 100 MiB.
const DEFAULT_BUDGET: usize = 100 * 1024 * 1024;

/// Queue records beyond this many stale ones trigger compaction.
const COMPACTION_SLACK: usize = 64;

/// An in-memory cache tier that evicts in insertion order once its byte budget is reached.
///
/// Lookups and removals go through a hash index. Eviction order is a queue of
/// `(sequence, key)` records; removing or replacing an entry leaves its record behind as a
/// tombstone, which is skipped when it reaches the front and dropped during compaction.
///
/// An entry larger than the whole budget is never stored.
#[derive(Debug)]
pub struct VolatileTier {
    budget: usize,
    state: Mutex<State>,
}

#[derive(Debug, Default)]
struct State {
    entries: HashMap<String, Slot>,
    order: VecDeque<(u64, String)>,
    next_seq: u64,
    bytes: usize,
}

#[derive(Debug)]
struct Slot {
    seq: u64,
    entry: CacheEntry,
}

impl Default for VolatileTier {
    fn default() -> Self {
        Self::new()
    }
}

impl VolatileTier {
    /// Creates a tier with the default 100 MiB budget.
    #[must_use]
    pub fn new() -> Self {
        Self::with_budget(DEFAULT_BUDGET)
    }

    /// Creates a tier holding at most `budget` bytes of serialized values.
    #[must_use]
    pub fn with_budget(budget: usize) -> Self {
        Self {
            budget,
            state: Mutex::new(State::default()),
        }
    }

    /// Returns the configured byte budget.
    #[must_use]
    pub fn budget(&self) -> usize {
        self.budget
    }

    /// Returns the number of resident entries.
    #[must_use]
    pub fn len(&self) -> usize {
        self.state.lock().entries.len()
    }

    /// Returns `true` when no entries are resident.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Returns the resident bytes.
    #[must_use]
    pub fn resident_bytes(&self) -> usize {
        self.state.lock().bytes
    }

    fn store(&self, full_key: &str, entry: CacheEntry) -> usize {
        let mut state = self.state.lock();
        state.take(full_key);

        let size = entry.size();
        if size > self.budget {
            tracing::debug!(cache.key = full_key, cache.size = size, cache.budget = self.budget, "cache.volatile.oversized");
            return 0;
        }

        let mut evicted = 0;
        while state.bytes + size > self.budget {
            match state.evict_oldest() {
                Some(key) => {
                    tracing::debug!(cache.key = %key, "cache.volatile.evicted");
                    evicted += 1;
                }
                None => break,
            }
        }

        let seq = state.next_seq;
        state.next_seq += 1;
        state.bytes += size;
        state.order.push_back((seq, full_key.to_owned()));
        state.entries.insert(full_key.to_owned(), Slot { seq, entry });
        state.compact_if_needed();
        evicted
    }

    fn remove_where(&self, mut predicate: impl FnMut(&str, &CacheEntry) -> bool) -> usize {
        let mut state = self.state.lock();
        let doomed: Vec<String> = state
            .entries
            .iter()
            .filter(|(key, slot)| predicate(key, &slot.entry))
            .map(|(key, _)| key.clone())
            .collect();

        for key in &doomed {
            state.take(key);
        }
        state.compact_if_needed();
        doomed.len()
    }
}

impl State {
    fn take(&mut self, full_key: &str) -> Option<CacheEntry> {
        let slot = self.entries.remove(full_key)?;
        self.bytes -= slot.entry.size();
        Some(slot.entry)
    }

    fn evict_oldest(&mut self) -> Option<String> {
        while let Some((seq, key)) = self.order.pop_front() {
            let live = self.entries.get(&key).is_some_and(|slot| slot.seq == seq);
            if live {
                self.take(&key);
                return Some(key);
            }
        }
        None
    }

    fn compact_if_needed(&mut self) {
        if self.order.len() > self.entries.len() * 2 + COMPACTION_SLACK {
            let entries = &self.entries;
            self.order
                .retain(|(seq, key)| entries.get(key).is_some_and(|slot| slot.seq == *seq));
        }
    }
}

impl CacheTier for VolatileTier {
    async fn get(&self, key: &CacheKey) -> Result<Option<CacheEntry>, Error> {
        Ok(self
            .state
            .lock()
            .entries
            .get(key.full_key())
            .map(|slot| slot.entry.clone()))
    }

    async fn insert(&self, key: &CacheKey, entry: CacheEntry) -> Result<(), Error> {
        self.store(key.full_key(), entry);
        Ok(())
    }

    async fn remove(&self, key: &CacheKey) -> Result<bool, Error> {
        Ok(self.state.lock().take(key.full_key()).is_some())
    }

    async fn clear(&self) -> Result<(), Error> {
        *self.state.lock() = State::default();
        Ok(())
    }

    async fn clear_namespace(&self, namespace: &str) -> Result<usize, Error> {
        let prefix = CacheKey::namespace_prefix(namespace);
        Ok(self.remove_where(|key, _| key.starts_with(&prefix)))
    }

    async fn remove_matching(&self, pattern: &KeyPattern) -> Result<usize, Error> {
        Ok(self.remove_where(|key, _| pattern.matches(key)))
    }

    async fn purge_expired(&self, now: SystemTime) -> Result<usize, Error> {
        Ok(self.remove_where(|_, entry| !entry.is_valid_at(now)))
    }

    async fn usage(&self) -> Result<TierUsage, Error> {
        let state = self.state.lock();
        Ok(TierUsage {
            entries: state.entries.len() as u64,
            bytes: state.bytes as u64,
        })
    }
}
