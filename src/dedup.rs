use std::collections::{BTreeMap, HashMap};

use crate::story::ItemId;

pub const CACHE_CAPACITY: usize = 1024;

/// Bounded set of item ids that have already been handed to the resolver.
///
/// Recency is tracked with a monotonically increasing tick: `ticks` maps an id
/// to the tick of its last touch and `order` is the reverse index, so the
/// first entry of `order` is always the least recently touched id.
#[derive(Debug)]
pub struct SeenCache {
    capacity: usize,
    tick: u64,
    ticks: HashMap<ItemId, u64>,
    order: BTreeMap<u64, ItemId>,
}

impl SeenCache {
    /// A capacity of zero is clamped to one.
    pub fn new(capacity: usize) -> Self {
        let capacity = capacity.max(1);
        Self {
            capacity,
            tick: 0,
            ticks: HashMap::with_capacity(capacity + 1),
            order: BTreeMap::new(),
        }
    }

    /// Return `true` when `id` was already present; otherwise record it and
    /// return `false`. Either way `id` becomes the most recently touched entry.
    pub fn seen_or_record(&mut self, id: ItemId) -> bool {
        self.tick += 1;
        let tick = self.tick;

        if let Some(previous) = self.ticks.insert(id, tick) {
            self.order.remove(&previous);
            self.order.insert(tick, id);
            return true;
        }

        self.order.insert(tick, id);
        if self.ticks.len() > self.capacity {
            if let Some((_, evicted)) = self.order.pop_first() {
                self.ticks.remove(&evicted);
            }
        }
        false
    }

    /// Membership test that leaves recency untouched.
    pub fn contains(&self, id: ItemId) -> bool {
        self.ticks.contains_key(&id)
    }

    pub fn len(&self) -> usize {
        self.ticks.len()
    }

    pub fn is_empty(&self) -> bool {
        self.ticks.is_empty()
    }

    pub fn capacity(&self) -> usize {
        self.capacity
    }
}

impl Default for SeenCache {
    fn default() -> Self {
        Self::new(CACHE_CAPACITY)
    }
}
