//! Memory pools
//!
//! A [`Pool`] owns one contiguous byte buffer and carves it into
//! variable-sized allocations. The buffer is tracked as a doubly-linked
//! list of segments (allocated spans and gaps) backed by a grow-only node
//! arena, with a size-ordered gap index answering best-fit queries.
//! Adjacent gaps are coalesced on every release, so the list never holds
//! two neighboring free segments.
//!
//! A pool is single-threaded by design: it has no internal
//! synchronization, and callers that share one across threads must
//! serialize externally. Different pools are fully independent.

mod gap_index;
mod segment;

use core::fmt;
use std::sync::atomic::{AtomicU64, Ordering};

use tracing::{debug, trace};

use crate::config::PoolConfig;
use crate::error::{PoolError, PoolResult};
use crate::policy::PlacementPolicy;
use crate::registry::Registration;
use crate::stats::PoolStats;

use self::gap_index::GapIndex;
use self::segment::{Segment, SegmentArena, SlotIndex};

pub use self::segment::SegmentState;

/// Distinguishes pools so a handle cannot cross over to another pool.
static POOL_SEQ: AtomicU64 = AtomicU64::new(0);

/// Identifies one live allocation in one pool.
///
/// A handle stays valid until the allocation is freed (or the pool is
/// dropped). Handles are generational: once the allocation dies, the
/// handle is rejected with [`PoolError::UnknownHandle`] even if its
/// arena slot has been recycled for another segment since. Handles also
/// carry the identity of the pool that issued them, so presenting one to
/// a different pool fails the same way.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct AllocHandle {
    pool: u64,
    index: SlotIndex,
    generation: u32,
}

/// One row of a pool report, in offset order.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SegmentInfo {
    /// Byte offset of the segment within the pool.
    pub offset: u64,
    /// Segment length in bytes.
    pub size: u64,
    /// Whether the segment is handed out or free.
    pub state: SegmentState,
}

/// A contiguous byte buffer managed by this library.
///
/// Opened with one free segment spanning the whole buffer; every
/// operation re-establishes the tiling, coalescence, and index
/// invariants before returning. See the [crate docs](crate) for a usage
/// example.
pub struct Pool {
    id: u64,
    buffer: Box<[u8]>,
    policy: PlacementPolicy,
    config: PoolConfig,
    arena: SegmentArena,
    gaps: GapIndex,
    head: SlotIndex,
    num_allocs: usize,
    allocated_bytes: u64,
    registration: Option<Registration>,
}

impl Pool {
    /// Opens a pool of `size` bytes with the default knobs and the given
    /// placement policy.
    ///
    /// Fails with `InvalidArgument` when `size == 0` and with
    /// `OutOfMemory` when the host allocator refuses any of the backing
    /// structures; whatever was built before the failing step is released
    /// again in drop order.
    pub fn open(size: u64, policy: PlacementPolicy) -> PoolResult<Self> {
        Self::open_with_config(size, PoolConfig::new(policy))
    }

    /// Opens a pool of `size` bytes with explicit configuration.
    pub fn open_with_config(size: u64, config: PoolConfig) -> PoolResult<Self> {
        config.validate()?;
        if size == 0 {
            return Err(PoolError::InvalidArgument("pool size must be non-zero"));
        }
        let byte_len =
            usize::try_from(size).map_err(|_| PoolError::OutOfMemory("backing buffer"))?;

        let mut buffer = Vec::new();
        buffer
            .try_reserve_exact(byte_len)
            .map_err(|_| PoolError::OutOfMemory("backing buffer"))?;
        buffer.resize(byte_len, 0);

        let mut arena = SegmentArena::with_capacity(
            config.node_arena_capacity,
            config.fill_factor,
            config.expand_factor,
        )?;
        let mut gaps = GapIndex::with_capacity(
            config.gap_index_capacity,
            config.fill_factor,
            config.expand_factor,
        )?;

        // One gap covering the whole buffer, and its matching index entry.
        let head = arena.acquire(Segment {
            offset: 0,
            size,
            state: SegmentState::Free,
            prev: None,
            next: None,
        });
        gaps.insert(size, head);

        let pool = Self {
            id: POOL_SEQ.fetch_add(1, Ordering::Relaxed),
            buffer: buffer.into_boxed_slice(),
            policy: config.policy,
            config,
            arena,
            gaps,
            head,
            num_allocs: 0,
            allocated_bytes: 0,
            registration: None,
        };
        debug!(size, policy = ?pool.policy, "pool opened");
        pool.debug_check();
        Ok(pool)
    }

    /// Closes the pool, releasing the buffer, node arena, and gap index.
    ///
    /// Fails with `PoolNotEmpty`, handing the pool back untouched, unless
    /// every allocation has been freed and the free space has coalesced
    /// back into the single whole-pool gap.
    pub fn close(self) -> Result<(), (PoolError, Self)> {
        if self.num_allocs != 0 || self.gaps.len() != 1 {
            let error = PoolError::PoolNotEmpty {
                num_allocs: self.num_allocs,
                num_gaps: self.gaps.len(),
            };
            return Err((error, self));
        }
        debug!(size = self.total_size(), "pool closed");
        Ok(())
    }

    /// Carves `size` bytes out of a gap chosen by the pool's placement
    /// policy and returns a handle to the new allocation.
    ///
    /// The gap is shrunk in place; a non-zero remainder becomes a fresh
    /// gap spliced in right after the allocation. `NoMemory` (no fitting
    /// gap) and `OutOfMemory` (host refused auxiliary growth) both leave
    /// the pool unchanged.
    pub fn allocate(&mut self, size: u64) -> PoolResult<AllocHandle> {
        if size == 0 {
            return Err(PoolError::InvalidArgument("allocation size must be non-zero"));
        }
        // Growth comes before the fit search so every failure point
        // precedes the first mutation.
        self.arena.ensure_headroom()?;
        self.gaps.ensure_headroom()?;

        let candidate = match self.policy {
            PlacementPolicy::FirstFit => self.find_first_fit(size),
            PlacementPolicy::BestFit => self.gaps.best_fit(size),
        };
        let Some(slot) = candidate else {
            return Err(PoolError::NoMemory { requested: size });
        };

        self.gaps.remove(slot);

        let (offset, remainder, successor) = {
            let segment = self.arena.segment_mut(slot);
            debug_assert_eq!(segment.state, SegmentState::Free);
            let remainder = segment.size - size;
            segment.state = SegmentState::Allocated;
            segment.size = size;
            (segment.offset, remainder, segment.next)
        };

        if remainder > 0 {
            let gap_slot = self.arena.acquire(Segment {
                offset: offset + size,
                size: remainder,
                state: SegmentState::Free,
                prev: Some(slot),
                next: successor,
            });
            self.arena.segment_mut(slot).next = Some(gap_slot);
            if let Some(next) = successor {
                self.arena.segment_mut(next).prev = Some(gap_slot);
            }
            self.gaps.insert(remainder, gap_slot);
        }

        self.num_allocs += 1;
        self.allocated_bytes += size;
        trace!(offset, size, "segment allocated");
        self.debug_check();
        Ok(self.handle_for(slot))
    }

    /// Releases the allocation named by `handle`, merging the freed span
    /// with a free neighbor on either side.
    pub fn free(&mut self, handle: AllocHandle) -> PoolResult<()> {
        let slot = self.resolve(handle).ok_or(PoolError::UnknownHandle)?;
        if self.arena.segment(slot).state != SegmentState::Allocated {
            return Err(PoolError::UnknownHandle);
        }
        // The merged gap is indexed at the end of this operation; make
        // sure that insert cannot fail once the list has been rewritten.
        self.gaps.ensure_headroom()?;

        let (offset, size) = {
            let segment = self.arena.segment_mut(slot);
            segment.state = SegmentState::Free;
            (segment.offset, segment.size)
        };
        self.arena.retire_handle(slot);
        self.num_allocs -= 1;
        self.allocated_bytes -= size;
        trace!(offset, size, "segment freed");

        let mut keep = slot;

        // Right-merge: absorb a free successor into the freed segment.
        if let Some(next) = self.arena.segment(keep).next {
            if self.arena.segment(next).state == SegmentState::Free {
                self.gaps.remove(next);
                let (next_size, next_next) = {
                    let successor = self.arena.segment(next);
                    (successor.size, successor.next)
                };
                let segment = self.arena.segment_mut(keep);
                segment.size += next_size;
                segment.next = next_next;
                if let Some(after) = next_next {
                    self.arena.segment_mut(after).prev = Some(keep);
                }
                self.arena.release(next);
                trace!(offset, absorbed = next_size, "coalesced with successor");
            }
        }

        // Left-merge: absorb the freed segment into a free predecessor,
        // which then becomes the segment to index.
        if let Some(prev) = self.arena.segment(keep).prev {
            if self.arena.segment(prev).state == SegmentState::Free {
                self.gaps.remove(prev);
                let (keep_size, keep_next) = {
                    let segment = self.arena.segment(keep);
                    (segment.size, segment.next)
                };
                let predecessor = self.arena.segment_mut(prev);
                predecessor.size += keep_size;
                predecessor.next = keep_next;
                if let Some(after) = keep_next {
                    self.arena.segment_mut(after).prev = Some(prev);
                }
                self.arena.release(keep);
                trace!(absorbed = keep_size, "coalesced with predecessor");
                keep = prev;
            }
        }

        let merged = self.arena.segment(keep).size;
        self.gaps.insert(merged, keep);
        self.debug_check();
        Ok(())
    }

    /// Reports the segment list in offset order. Read-only; the caller
    /// owns the returned vector.
    pub fn inspect(&self) -> PoolResult<Vec<SegmentInfo>> {
        let mut report = Vec::new();
        report
            .try_reserve_exact(self.arena.live_count())
            .map_err(|_| PoolError::OutOfMemory("segment report"))?;
        let mut cursor = Some(self.head);
        while let Some(index) = cursor {
            let segment = self.arena.segment(index);
            report.push(SegmentInfo {
                offset: segment.offset,
                size: segment.size,
                state: segment.state,
            });
            cursor = segment.next;
        }
        Ok(report)
    }

    /// Borrows the bytes of a live allocation.
    pub fn slice(&self, handle: AllocHandle) -> PoolResult<&[u8]> {
        let slot = self.resolve_allocated(handle)?;
        let segment = self.arena.segment(slot);
        let start = segment.offset as usize;
        Ok(&self.buffer[start..start + segment.size as usize])
    }

    /// Mutably borrows the bytes of a live allocation.
    pub fn slice_mut(&mut self, handle: AllocHandle) -> PoolResult<&mut [u8]> {
        let slot = self.resolve_allocated(handle)?;
        let segment = self.arena.segment(slot);
        let start = segment.offset as usize;
        let end = start + segment.size as usize;
        Ok(&mut self.buffer[start..end])
    }

    /// Snapshot of the pool's summary counters.
    pub fn stats(&self) -> PoolStats {
        PoolStats {
            total_size: self.total_size(),
            allocated_bytes: self.allocated_bytes,
            num_allocs: self.num_allocs,
            num_gaps: self.gaps.len(),
            largest_gap: self.gaps.largest(),
        }
    }

    /// Placement policy fixed at open time.
    pub fn policy(&self) -> PlacementPolicy {
        self.policy
    }

    /// The configuration this pool was opened with.
    pub fn config(&self) -> &PoolConfig {
        &self.config
    }

    /// Size of the backing buffer in bytes.
    pub fn total_size(&self) -> u64 {
        self.buffer.len() as u64
    }

    /// Number of live allocations.
    pub fn num_allocs(&self) -> usize {
        self.num_allocs
    }

    /// Number of free segments.
    pub fn num_gaps(&self) -> usize {
        self.gaps.len()
    }

    /// Sum of the sizes of all allocated segments.
    pub fn allocated_bytes(&self) -> u64 {
        self.allocated_bytes
    }

    /// Size of the largest free segment, or 0 when the pool is full.
    pub fn largest_gap(&self) -> u64 {
        self.gaps.largest()
    }

    pub(crate) fn attach_registration(&mut self, registration: Registration) {
        self.registration = Some(registration);
    }

    /// Leftmost free segment that fits, by walking the list from the head.
    fn find_first_fit(&self, requested: u64) -> Option<SlotIndex> {
        let mut cursor = Some(self.head);
        while let Some(index) = cursor {
            let segment = self.arena.segment(index);
            if segment.state == SegmentState::Free && segment.size >= requested {
                return Some(index);
            }
            cursor = segment.next;
        }
        None
    }

    fn handle_for(&self, slot: SlotIndex) -> AllocHandle {
        AllocHandle { pool: self.id, index: slot, generation: self.arena.generation(slot) }
    }

    fn resolve(&self, handle: AllocHandle) -> Option<SlotIndex> {
        if handle.pool != self.id {
            return None;
        }
        self.arena.resolve(handle.index, handle.generation)
    }

    fn resolve_allocated(&self, handle: AllocHandle) -> PoolResult<SlotIndex> {
        let slot = self.resolve(handle).ok_or(PoolError::UnknownHandle)?;
        if self.arena.segment(slot).state != SegmentState::Allocated {
            return Err(PoolError::UnknownHandle);
        }
        Ok(slot)
    }

    fn debug_check(&self) {
        #[cfg(debug_assertions)]
        self.assert_invariants();
    }

    /// Walks every structure and asserts the full invariant set: tiling
    /// cover, link symmetry, coalescence, index order, index consistency,
    /// and counter consistency. Debug builds run it after every mutation.
    #[cfg(any(test, debug_assertions))]
    fn assert_invariants(&self) {
        let mut offset = 0u64;
        let mut walked = 0usize;
        let mut allocated_bytes = 0u64;
        let mut num_allocs = 0usize;
        let mut free_slots = Vec::new();
        let mut prev: Option<SlotIndex> = None;
        let mut prev_state: Option<SegmentState> = None;
        let mut cursor = Some(self.head);

        while let Some(index) = cursor {
            let segment = self.arena.segment(index);
            assert!(segment.size > 0, "zero-size segment at offset {offset}");
            assert_eq!(segment.offset, offset, "segments must tile the pool");
            assert_eq!(segment.prev, prev, "prev link must invert next");
            match segment.state {
                SegmentState::Free => {
                    assert_ne!(
                        prev_state,
                        Some(SegmentState::Free),
                        "adjacent free segments must have been coalesced"
                    );
                    free_slots.push((index, segment.size));
                }
                SegmentState::Allocated => {
                    allocated_bytes += segment.size;
                    num_allocs += 1;
                }
            }
            offset += segment.size;
            walked += 1;
            assert!(walked <= self.arena.live_count(), "segment list cycle");
            prev = Some(index);
            prev_state = Some(segment.state);
            cursor = segment.next;
        }

        assert_eq!(offset, self.total_size(), "segment list must cover the pool");
        assert_eq!(walked, self.arena.live_count(), "unreachable live slots");
        assert_eq!(num_allocs, self.num_allocs, "allocation count drifted");
        assert_eq!(allocated_bytes, self.allocated_bytes, "allocated byte count drifted");
        assert_eq!(self.gaps.len(), free_slots.len(), "gap index cardinality");

        let mut previous_size = u64::MAX;
        for (size, slot) in self.gaps.iter() {
            assert!(size <= previous_size, "gap index must be non-increasing");
            previous_size = size;
            let entry = free_slots
                .iter()
                .find(|(free_slot, _)| *free_slot == slot)
                .unwrap_or_else(|| panic!("gap index entry for vacated slot {slot}"));
            assert_eq!(entry.1, size, "gap index size out of date");
        }
    }
}

impl fmt::Debug for Pool {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Pool")
            .field("total_size", &self.total_size())
            .field("policy", &self.policy)
            .field("num_allocs", &self.num_allocs)
            .field("allocated_bytes", &self.allocated_bytes)
            .field("num_gaps", &self.gaps.len())
            .field("registered", &self.registration.is_some())
            .finish_non_exhaustive()
    }
}
