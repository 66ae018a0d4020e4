//! Transient resource cache.
//!
//! A [`TransientResourceCache`] pools GPU resources a node has handed out in
//! earlier invocations. Every pooled entry carries the timeline value the
//! device must reach before the resource is idle again; a pop only returns
//! entries whose value the timeline has already passed, so a resource still
//! referenced by in-flight work is never handed out twice.
//!
//! The check is a plain comparison against the last observed timeline value.
//! Nothing here waits on the device: when no entry is ready a new resource is
//! created instead.

use std::collections::{BTreeMap, VecDeque};

use crate::config::DEFAULT_MAX_ENTRIES_PER_SLOT;
use crate::context::TimelineValue;
use crate::resource::Resource;

#[derive(Debug, Clone)]
struct CacheEntry {
    resource: Resource,
    ready_at: TimelineValue,
}

/// Allocation counters of a cache.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct CacheStats {
    /// Resources created because no pooled entry was ready.
    pub allocations: u64,
    /// Pops satisfied from the pool.
    pub reuses: u64,
    /// Entries dropped because the pool was full.
    pub evictions: u64,
}

impl CacheStats {
    fn merge(&mut self, other: &CacheStats) {
        self.allocations += other.allocations;
        self.reuses += other.reuses;
        self.evictions += other.evictions;
    }
}

/// Pool of reusable resources for one output slot.
#[derive(Debug, Clone)]
pub struct TransientResourceCache {
    entries: VecDeque<CacheEntry>,
    /// Maximum pooled entries; `0` means unbounded.
    capacity: usize,
    stats: CacheStats,
}

impl Default for TransientResourceCache {
    fn default() -> Self {
        Self::with_capacity(DEFAULT_MAX_ENTRIES_PER_SLOT)
    }
}

impl TransientResourceCache {
    /// Create an unbounded cache.
    pub fn new() -> Self {
        Self::with_capacity(0)
    }

    /// Create a cache holding at most `capacity` entries (`0` = unbounded).
    pub fn with_capacity(capacity: usize) -> Self {
        Self {
            entries: VecDeque::new(),
            capacity,
            stats: CacheStats::default(),
        }
    }

    pub fn capacity(&self) -> usize {
        self.capacity
    }

    /// Change the bound, evicting the oldest entries if the pool is over it.
    pub fn set_capacity(&mut self, capacity: usize) {
        self.capacity = capacity;
        self.evict_to_capacity();
    }

    /// Take the oldest entry whose timeline value has been reached, or create
    /// a new resource with `create`.
    pub fn pop_or_create<E>(
        &mut self,
        completed: TimelineValue,
        create: impl FnOnce() -> Result<Resource, E>,
    ) -> Result<Resource, E> {
        if let Some(index) = self.entries.iter().position(|e| e.ready_at <= completed) {
            if let Some(entry) = self.entries.remove(index) {
                self.stats.reuses += 1;
                log::debug!(
                    "Reusing pooled {} (ready at {}, timeline at {})",
                    entry.resource.kind(),
                    entry.ready_at,
                    completed
                );
                return Ok(entry.resource);
            }
        }

        let resource = create()?;
        self.stats.allocations += 1;
        Ok(resource)
    }

    /// Return a resource to the pool; it becomes reusable once the timeline
    /// reaches `ready_at`.
    pub fn push(&mut self, resource: Resource, ready_at: TimelineValue) {
        self.entries.push_back(CacheEntry { resource, ready_at });
        self.evict_to_capacity();
    }

    fn evict_to_capacity(&mut self) {
        if self.capacity == 0 {
            return;
        }
        while self.entries.len() > self.capacity {
            let oldest = self
                .entries
                .iter()
                .enumerate()
                .min_by_key(|(_, e)| e.ready_at)
                .map(|(index, _)| index);
            let Some(index) = oldest else { break };
            if let Some(evicted) = self.entries.remove(index) {
                self.stats.evictions += 1;
                log::debug!(
                    "Evicting pooled {} (ready at {}), pool bound is {}",
                    evicted.resource.kind(),
                    evicted.ready_at,
                    self.capacity
                );
            }
        }
    }

    /// Number of entries reusable at timeline value `completed`.
    pub fn ready_count(&self, completed: TimelineValue) -> usize {
        self.entries
            .iter()
            .filter(|e| e.ready_at <= completed)
            .count()
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Drop every pooled entry. Statistics are kept.
    pub fn clear(&mut self) {
        self.entries.clear();
    }

    pub fn stats(&self) -> CacheStats {
        self.stats
    }
}

/// Per-slot caches of one node, keyed by output port name.
#[derive(Debug, Clone)]
pub struct SlotCaches {
    capacity: usize,
    slots: BTreeMap<String, TransientResourceCache>,
}

impl Default for SlotCaches {
    fn default() -> Self {
        Self::with_capacity(DEFAULT_MAX_ENTRIES_PER_SLOT)
    }
}

impl SlotCaches {
    pub fn with_capacity(capacity: usize) -> Self {
        Self {
            capacity,
            slots: BTreeMap::new(),
        }
    }

    /// The cache for `slot`, created on first use.
    pub fn slot(&mut self, slot: &str) -> &mut TransientResourceCache {
        let capacity = self.capacity;
        self.slots
            .entry(slot.to_owned())
            .or_insert_with(|| TransientResourceCache::with_capacity(capacity))
    }

    pub fn get(&self, slot: &str) -> Option<&TransientResourceCache> {
        self.slots.get(slot)
    }

    pub fn set_capacity(&mut self, capacity: usize) {
        self.capacity = capacity;
        for cache in self.slots.values_mut() {
            cache.set_capacity(capacity);
        }
    }

    /// Drop the caches of slots that no longer exist.
    pub fn retain_slots(&mut self, keep: impl Fn(&str) -> bool) {
        self.slots.retain(|name, _| keep(name));
    }

    pub fn clear(&mut self) {
        self.slots.clear();
    }

    /// Total pooled entries across all slots.
    pub fn pooled(&self) -> usize {
        self.slots.values().map(TransientResourceCache::len).sum()
    }

    /// Combined statistics across all slots.
    pub fn stats(&self) -> CacheStats {
        let mut total = CacheStats::default();
        for cache in self.slots.values() {
            total.merge(&cache.stats());
        }
        total
    }
}
