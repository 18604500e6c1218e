//! Pool registry
//!
//! A [`Registry`] is the process-wide table of open pools, used only for
//! init/teardown bookkeeping: it records which pools exist so shutdown can
//! refuse while any are outstanding. Registrations are non-owning: a pool
//! owns its storage, the registry holds an id.
//!
//! The registry is an explicitly constructed context. Callers that want
//! the classic library-wide singleton use the thin default-context
//! wrappers [`init`], [`shutdown`], and [`with_default_registry`].

use std::sync::Arc;

use parking_lot::Mutex;
use tracing::{debug, info};

use crate::config::{EXPAND_FACTOR, FILL_FACTOR, PoolConfig};
use crate::error::{PoolError, PoolResult};
use crate::policy::PlacementPolicy;
use crate::pool::Pool;

/// Initial slot capacity of a registry's pool table.
pub const REGISTRY_INIT_CAPACITY: usize = 20;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
struct PoolId(u64);

/// Grow-only table of registered pools. Closing a pool vacates its slot,
/// but the slot array's high-water mark never shrinks.
#[derive(Debug)]
struct PoolTable {
    slots: Vec<Option<PoolId>>,
    capacity: usize,
    next_id: u64,
    open: usize,
}

#[derive(Debug)]
struct RegistryShared {
    table: Mutex<PoolTable>,
}

/// Process-wide table of open pools.
///
/// The table itself is the only shared state in the library and is
/// guarded by a mutex; the pools it tracks remain single-threaded and
/// fully independent of each other.
#[derive(Debug)]
pub struct Registry {
    shared: Arc<RegistryShared>,
}

/// Token held by a registered pool; dropping it vacates the table slot.
pub(crate) struct Registration {
    shared: Arc<RegistryShared>,
    slot: usize,
}

impl Drop for Registration {
    fn drop(&mut self) {
        let mut table = self.shared.table.lock();
        if let Some(entry) = table.slots.get_mut(self.slot) {
            *entry = None;
        }
        table.open = table.open.saturating_sub(1);
        debug!(slot = self.slot, "pool deregistered");
    }
}

impl Registry {
    /// Constructs an empty registry.
    pub fn new() -> PoolResult<Self> {
        let mut slots = Vec::new();
        slots
            .try_reserve_exact(REGISTRY_INIT_CAPACITY)
            .map_err(|_| PoolError::OutOfMemory("pool table"))?;
        Ok(Self {
            shared: Arc::new(RegistryShared {
                table: Mutex::new(PoolTable {
                    slots,
                    capacity: REGISTRY_INIT_CAPACITY,
                    next_id: 0,
                    open: 0,
                }),
            }),
        })
    }

    /// Opens a pool registered to this registry with the default knobs.
    ///
    /// The pool deregisters itself when closed or dropped.
    pub fn open_pool(&self, size: u64, policy: PlacementPolicy) -> PoolResult<Pool> {
        self.open_pool_with_config(size, PoolConfig::new(policy))
    }

    /// Opens a registered pool with explicit configuration.
    pub fn open_pool_with_config(&self, size: u64, config: PoolConfig) -> PoolResult<Pool> {
        let registration = self.register()?;
        // A failed open drops the registration again, vacating the slot.
        let mut pool = Pool::open_with_config(size, config)?;
        pool.attach_registration(registration);
        Ok(pool)
    }

    /// Number of pools currently registered.
    pub fn open_pools(&self) -> usize {
        self.shared.table.lock().open
    }

    /// Tears the registry down.
    ///
    /// Fails with `PoolsOutstanding`, handing the registry back, while
    /// any registered pool is still open.
    pub fn shutdown(self) -> Result<(), (PoolError, Self)> {
        let open = self.shared.table.lock().open;
        if open > 0 {
            return Err((PoolError::PoolsOutstanding { open }, self));
        }
        info!("registry shut down");
        Ok(())
    }

    fn register(&self) -> PoolResult<Registration> {
        let mut table = self.shared.table.lock();
        if (table.slots.len() as f32) / (table.capacity as f32) > FILL_FACTOR {
            let new_capacity = table.capacity * EXPAND_FACTOR;
            let additional = new_capacity - table.slots.len();
            table
                .slots
                .try_reserve(additional)
                .map_err(|_| PoolError::OutOfMemory("pool table"))?;
            debug!(old = table.capacity, new = new_capacity, "pool table grown");
            table.capacity = new_capacity;
        }
        let id = PoolId(table.next_id);
        table.next_id += 1;
        let slot = table.slots.len();
        table.slots.push(Some(id));
        table.open += 1;
        debug!(slot, id = id.0, "pool registered");
        Ok(Registration { shared: Arc::clone(&self.shared), slot })
    }

    #[cfg(test)]
    fn high_water(&self) -> usize {
        self.shared.table.lock().slots.len()
    }

    #[cfg(test)]
    fn table_capacity(&self) -> usize {
        self.shared.table.lock().capacity
    }
}

// ============================================================================
// Default context
// ============================================================================

static DEFAULT_REGISTRY: Mutex<Option<Registry>> = Mutex::new(None);

/// Installs the default registry.
///
/// Fails with `AlreadyInitialized` if one is already installed; the
/// existing registry is untouched.
pub fn init() -> PoolResult<()> {
    let mut guard = DEFAULT_REGISTRY.lock();
    if guard.is_some() {
        return Err(PoolError::AlreadyInitialized);
    }
    *guard = Some(Registry::new()?);
    info!("default registry initialized");
    Ok(())
}

/// Shuts the default registry down.
///
/// Fails with `NotInitialized` if none is installed and with
/// `PoolsOutstanding` if pools opened through it are still live; in the
/// latter case the registry stays installed.
pub fn shutdown() -> PoolResult<()> {
    let mut guard = DEFAULT_REGISTRY.lock();
    match guard.take() {
        None => Err(PoolError::NotInitialized),
        Some(registry) => match registry.shutdown() {
            Ok(()) => Ok(()),
            Err((error, registry)) => {
                *guard = Some(registry);
                Err(error)
            }
        },
    }
}

/// Runs `f` against the installed default registry.
///
/// Fails with `NotInitialized` if [`init`] has not been called. The
/// default-registry lock is held for the duration of `f`; open the pool
/// inside and use it outside.
pub fn with_default_registry<T>(f: impl FnOnce(&Registry) -> PoolResult<T>) -> PoolResult<T> {
    let guard = DEFAULT_REGISTRY.lock();
    let registry = guard.as_ref().ok_or(PoolError::NotInitialized)?;
    f(registry)
}
