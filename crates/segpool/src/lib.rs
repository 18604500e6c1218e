//! # segpool
//!
//! Byte-granular sub-allocation over caller-owned memory pools.
//!
//! A [`Pool`] wraps one large buffer obtained from the host allocator and
//! carves it into variable-sized allocations on request, reclaiming and
//! coalescing them on release. Placement is selectable per pool:
//! [`PlacementPolicy::FirstFit`] takes the leftmost gap that fits,
//! [`PlacementPolicy::BestFit`] the smallest. This is the building block
//! for arenas, bump-and-free regions, network buffer carving, or the slab
//! layer of a higher-level allocator.
//!
//! Internally each pool tracks its buffer as a doubly-linked list of
//! segments backed by a grow-only node arena, plus a size-ordered gap
//! index that answers best-fit queries without walking the list. Pools
//! are single-threaded; the optional [`Registry`] (or the [`init`] /
//! [`shutdown`] default context) only tracks which pools are open.
//!
//! ```
//! use segpool::{PlacementPolicy, Pool};
//!
//! # fn main() -> segpool::PoolResult<()> {
//! let mut pool = Pool::open(4096, PlacementPolicy::BestFit)?;
//!
//! let request = pool.allocate(512)?;
//! pool.slice_mut(request)?.fill(0xAB);
//! assert_eq!(pool.num_allocs(), 1);
//!
//! pool.free(request)?;
//! assert!(pool.close().is_ok());
//! # Ok(())
//! # }
//! ```

pub mod config;
pub mod error;
pub mod policy;
pub mod pool;
pub mod registry;
pub mod stats;

// Re-export the working surface at the crate root.
pub use config::PoolConfig;
pub use error::{PoolError, PoolResult};
pub use policy::PlacementPolicy;
pub use pool::{AllocHandle, Pool, SegmentInfo, SegmentState};
pub use registry::{Registry, init, shutdown, with_default_registry};
pub use stats::PoolStats;
