//! Placement policies
//!
//! The policy decides which free segment satisfies an allocation request.
//! It is fixed per pool at open time; the allocator dispatches on the
//! variant, so future policies (worst-fit, segregated free lists) extend
//! the enum without changing the API.

/// Which free segment an allocation request is placed into.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash)]
#[repr(u8)]
pub enum PlacementPolicy {
    /// The leftmost free segment that fits, found by walking the segment
    /// list from the start of the pool.
    #[default]
    FirstFit = 0,

    /// The smallest free segment that still fits, found by scanning the
    /// size-ordered gap index from its small end. Among equally-sized
    /// candidates the most recently indexed one wins; the choice is stable
    /// for a given history.
    BestFit = 1,
}
