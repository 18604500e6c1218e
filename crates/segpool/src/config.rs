//! Pool configuration
//!
//! The growth knobs of the auxiliary structures (fill factor, expansion
//! factor, initial capacities) are tuning constants, not invariants; they
//! are surfaced here with the established defaults.

use crate::error::{PoolError, PoolResult};
use crate::policy::PlacementPolicy;

/// Initial slot capacity of the node arena.
pub const NODE_ARENA_INIT_CAPACITY: usize = 40;
/// Initial entry capacity of the gap index.
pub const GAP_INDEX_INIT_CAPACITY: usize = 40;
/// Occupancy ratio above which an auxiliary structure grows.
pub const FILL_FACTOR: f32 = 0.75;
/// Capacity multiplier applied on growth.
pub const EXPAND_FACTOR: usize = 2;

/// Configuration for a pool.
///
/// `Default` gives the established knobs; the presets cover the common
/// cases. Validation happens once, at [`Pool::open_with_config`].
///
/// [`Pool::open_with_config`]: crate::Pool::open_with_config
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct PoolConfig {
    /// Placement policy used by `allocate`.
    pub policy: PlacementPolicy,

    /// Initial slot capacity of the node arena.
    pub node_arena_capacity: usize,

    /// Initial entry capacity of the gap index.
    pub gap_index_capacity: usize,

    /// Occupancy ratio in `(0, 1)` above which the node arena and gap
    /// index grow.
    pub fill_factor: f32,

    /// Capacity multiplier (>= 2) applied when a structure grows.
    pub expand_factor: usize,
}

impl Default for PoolConfig {
    fn default() -> Self {
        Self {
            policy: PlacementPolicy::default(),
            node_arena_capacity: NODE_ARENA_INIT_CAPACITY,
            gap_index_capacity: GAP_INDEX_INIT_CAPACITY,
            fill_factor: FILL_FACTOR,
            expand_factor: EXPAND_FACTOR,
        }
    }
}

impl PoolConfig {
    /// Default knobs with the given placement policy.
    pub fn new(policy: PlacementPolicy) -> Self {
        Self { policy, ..Self::default() }
    }

    /// First-fit preset.
    pub fn first_fit() -> Self {
        Self::new(PlacementPolicy::FirstFit)
    }

    /// Best-fit preset.
    pub fn best_fit() -> Self {
        Self::new(PlacementPolicy::BestFit)
    }

    /// Checks the knobs for cheap validity.
    pub fn validate(&self) -> PoolResult<()> {
        if self.node_arena_capacity == 0 {
            return Err(PoolError::InvalidArgument("node arena capacity must be non-zero"));
        }
        if self.gap_index_capacity == 0 {
            return Err(PoolError::InvalidArgument("gap index capacity must be non-zero"));
        }
        if !(self.fill_factor > 0.0 && self.fill_factor < 1.0) {
            return Err(PoolError::InvalidArgument("fill factor must be in (0, 1)"));
        }
        if self.expand_factor < 2 {
            return Err(PoolError::InvalidArgument("expand factor must be at least 2"));
        }
        Ok(())
    }
}
