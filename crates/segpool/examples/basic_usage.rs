//! Open a pool, place a few requests, inspect the layout.
//!
//! Run with: `cargo run --example basic_usage`

use segpool::{PlacementPolicy, Pool, PoolResult};

fn main() -> PoolResult<()> {
    let mut pool = Pool::open(1 << 16, PlacementPolicy::BestFit)?;

    let a = pool.allocate(4096)?;
    let b = pool.allocate(1024)?;
    pool.slice_mut(a)?.fill(0x5A);

    println!("after two allocations: {:?}", pool.stats());

    pool.free(a)?;
    println!("segment map after freeing the first:");
    for segment in pool.inspect()? {
        println!("  {:>6} +{:<6} {:?}", segment.offset, segment.size, segment.state);
    }

    pool.free(b)?;
    pool.close().map_err(|(error, _)| error)?;
    println!("pool closed cleanly");
    Ok(())
}
