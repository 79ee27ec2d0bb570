//! Two memory tiers standing in for a memory + network chain, with a
//! circuit breaker on the slower tier

use std::time::Duration;

use strata_cache::prelude::*;

#[tokio::main]
async fn main() -> std::result::Result<(), Box<dyn std::error::Error>> {
    let fast = MemoryStore::new(MemoryConfig::with_capacity(1_000));
    let slow = MemoryStore::with_defaults();

    let layered = LayeredCache::builder()
        .tier(Tier::new("fast", 0, fast.clone()))
        .tier(
            Tier::new("slow", 1, slow.clone()).with_breaker(BreakerConfig {
                failure_threshold: 5,
                open_timeout: Duration::from_secs(10),
            }),
        )
        .build();
    let cache = CacheManager::new(layered);

    cache.set("greeting", &"hello", CacheOpts::new()).await?;

    // Simulate the fast tier losing the entry
    fast.delete("greeting").await?;

    // The read falls through to the slow tier and promotes the value
    let value = cache.get::<String>("greeting").await?.value();
    println!("served from slow tier: {value:?}");

    tokio::time::sleep(Duration::from_millis(50)).await;
    println!(
        "promoted back to fast tier: {}",
        fast.exists("greeting").await?
    );

    Ok(())
}
