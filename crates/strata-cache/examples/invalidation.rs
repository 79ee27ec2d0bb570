//! Tag, pattern and cascading dependency invalidation

use strata_cache::prelude::*;

#[tokio::main]
async fn main() -> std::result::Result<(), Box<dyn std::error::Error>> {
    let layered = LayeredCache::builder()
        .tier(Tier::new("memory", 0, MemoryStore::with_defaults()))
        .build();
    let cache = CacheManager::new(layered);

    cache
        .set("user:1", &"alice", CacheOpts::new().tags(["user", "active"]))
        .await?;
    cache
        .set("user:2", &"bob", CacheOpts::new().tag("user"))
        .await?;
    cache
        .set("post:1", &"hello world", CacheOpts::new().tag("post"))
        .await?;

    let count = cache
        .invalidate_tag("user", InvalidationOptions::new())
        .await?;
    println!("invalidated {count} entries tagged 'user'");

    cache.set("session:1", &"s1", CacheOpts::new()).await?;
    cache.set("session:2", &"s2", CacheOpts::new()).await?;
    let count = cache
        .invalidate_pattern("session:*", InvalidationOptions::new())
        .await?;
    println!("invalidated {count} entries matching 'session:*'");

    // order:1 ties customer:7 and product:3 together; invalidating the
    // customer cascades into the product
    cache
        .set(
            "order:1",
            &"order",
            CacheOpts::new().depends_on(["customer:7", "product:3"]),
        )
        .await?;
    cache
        .set("listing:3", &"listing", CacheOpts::new().depends_on(["product:3"]))
        .await?;

    let count = cache
        .invalidate_dependency("customer:7", InvalidationOptions::new().cascade())
        .await?;
    println!("cascading invalidation removed {count} entries");

    Ok(())
}
