//! The gap index
//!
//! A dense array with one `(size, slot)` entry per free segment, kept in
//! non-increasing size order with stable ties. Best-fit scans it from the
//! small end; first-fit never touches it. Sorted-largest-first also leaves
//! room for a binary-search or heap-based replacement behind the same
//! contract.

use tracing::debug;

use crate::error::{PoolError, PoolResult};
use crate::pool::segment::SlotIndex;

#[derive(Debug, Clone, Copy)]
pub(crate) struct GapEntry {
    pub size: u64,
    pub slot: SlotIndex,
}

/// Size-ordered index over the free segments of one pool.
///
/// Entry count always equals the pool's free-segment count; every entry
/// names a live free segment whose size matches the entry.
#[derive(Debug)]
pub(crate) struct GapIndex {
    entries: Vec<GapEntry>,
    capacity: usize,
    fill_factor: f32,
    expand_factor: usize,
}

impl GapIndex {
    pub fn with_capacity(
        capacity: usize,
        fill_factor: f32,
        expand_factor: usize,
    ) -> PoolResult<Self> {
        let mut entries = Vec::new();
        entries
            .try_reserve_exact(capacity)
            .map_err(|_| PoolError::OutOfMemory("gap index"))?;
        Ok(Self { entries, capacity, fill_factor, expand_factor })
    }

    /// Grows the index if occupancy exceeded the fill factor.
    ///
    /// Called at the top of any operation that may insert, so a
    /// host-allocator refusal precedes every mutation of that operation.
    pub fn ensure_headroom(&mut self) -> PoolResult<()> {
        if (self.entries.len() as f32) / (self.capacity as f32) <= self.fill_factor {
            return Ok(());
        }
        let new_capacity = self.capacity * self.expand_factor;
        self.entries
            .try_reserve(new_capacity - self.entries.len())
            .map_err(|_| PoolError::OutOfMemory("gap index"))?;
        debug!(old = self.capacity, new = new_capacity, "gap index grown");
        self.capacity = new_capacity;
        Ok(())
    }

    /// Appends an entry and bubbles it left while the left neighbor is
    /// strictly smaller. One insertion-sort pass over a nearly-sorted
    /// array: O(n) worst case, O(1) amortized for mixed workloads. The
    /// bubble stops at equal sizes, which keeps ties in insertion order.
    pub fn insert(&mut self, size: u64, slot: SlotIndex) {
        self.entries.push(GapEntry { size, slot });
        let mut i = self.entries.len() - 1;
        while i > 0 && self.entries[i - 1].size < self.entries[i].size {
            self.entries.swap(i - 1, i);
            i -= 1;
        }
    }

    /// Drops the entry for `slot`, compacting later entries left by one.
    /// Removal preserves the ordering invariant.
    pub fn remove(&mut self, slot: SlotIndex) {
        if let Some(position) = self.entries.iter().position(|entry| entry.slot == slot) {
            self.entries.remove(position);
        } else {
            debug_assert!(false, "free segment missing from gap index");
        }
    }

    /// Smallest fitting entry: scan from the tail (smallest sizes) and
    /// take the first entry with `size >= requested`. Among equal sizes
    /// this selects the rightmost, i.e. the most recently indexed.
    pub fn best_fit(&self, requested: u64) -> Option<SlotIndex> {
        self.entries
            .iter()
            .rev()
            .find(|entry| entry.size >= requested)
            .map(|entry| entry.slot)
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    /// Size of the largest gap, or 0 with no gaps. The largest entry is
    /// always at the front.
    pub fn largest(&self) -> u64 {
        self.entries.first().map_or(0, |entry| entry.size)
    }

    pub fn iter(&self) -> impl Iterator<Item = (u64, SlotIndex)> + '_ {
        self.entries.iter().map(|entry| (entry.size, entry.slot))
    }

    #[cfg(test)]
    pub fn capacity(&self) -> usize {
        self.capacity
    }
}
