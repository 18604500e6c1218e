//! Error types for segpool
//!
//! Every public operation returns an explicit [`PoolResult`]; nothing in the
//! library aborts the process or unwinds over the caller. Internal invariant
//! violations are programming errors and are checked with `debug_assert!`
//! in debug builds only.

/// Result type for pool and registry operations.
pub type PoolResult<T> = Result<T, PoolError>;

/// Errors reported by pools and the pool registry.
///
/// A failed operation is a no-op on pool state: growth of the auxiliary
/// structures is attempted before any list or index mutation, so an
/// [`PoolError::OutOfMemory`] can never leave a pool half-updated.
#[derive(Debug, Clone, Copy, PartialEq, Eq, thiserror::Error)]
pub enum PoolError {
    /// A parameter failed a cheap validity check (zero size, bad config).
    #[error("invalid argument: {0}")]
    InvalidArgument(&'static str),

    /// No existing gap can satisfy the request. No growth is attempted and
    /// no state changes.
    #[error("no gap can satisfy a request of {requested} bytes")]
    NoMemory {
        /// The requested allocation size in bytes.
        requested: u64,
    },

    /// The host allocator refused to grow one of the backing structures.
    #[error("host allocator refused to grow the {0}")]
    OutOfMemory(&'static str),

    /// The handle is stale, vacated, or does not name a live allocation in
    /// this pool.
    #[error("handle does not refer to a live allocation in this pool")]
    UnknownHandle,

    /// `close` was called on a pool that still holds allocations or whose
    /// free space has not coalesced back into a single gap.
    #[error("pool is not empty: {num_allocs} allocations, {num_gaps} gaps")]
    PoolNotEmpty {
        /// Outstanding allocation count.
        num_allocs: usize,
        /// Current free-segment count.
        num_gaps: usize,
    },

    /// The default registry has already been installed.
    #[error("default registry is already initialized")]
    AlreadyInitialized,

    /// The default registry has not been installed (or was shut down).
    #[error("default registry is not initialized")]
    NotInitialized,

    /// The registry cannot shut down while pools are still open.
    #[error("registry still tracks {open} open pools")]
    PoolsOutstanding {
        /// Number of pools still registered.
        open: usize,
    },
}

impl PoolError {
    /// Whether this error came from the host allocator refusing growth.
    #[inline]
    pub const fn is_out_of_memory(&self) -> bool {
        matches!(self, Self::OutOfMemory(_))
    }

    /// Whether this error means the pool itself is exhausted (no fitting
    /// gap), as opposed to the host allocator failing.
    #[inline]
    pub const fn is_no_memory(&self) -> bool {
        matches!(self, Self::NoMemory { .. })
    }
}
