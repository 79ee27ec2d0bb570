//! Basic single-tier usage with the in-memory store

use strata_cache::prelude::*;

#[derive(Debug, serde::Serialize, serde::Deserialize)]
struct User {
    id: u64,
    name: String,
}

#[tokio::main]
async fn main() -> std::result::Result<(), Box<dyn std::error::Error>> {
    let layered = LayeredCache::builder()
        .tier(Tier::new("memory", 0, MemoryStore::with_defaults()))
        .build();
    let cache = CacheManager::new(layered);

    let user = User {
        id: 42,
        name: "alice".to_string(),
    };
    cache
        .set(("user", user.id), &user, CacheOpts::new().ttl_secs(60))
        .await?;

    match cache.get::<User>(("user", 42u64)).await? {
        CacheResult::Hit(entry) => println!("hit: {:?} (age {:?})", entry.value, entry.age()),
        CacheResult::Miss => println!("miss"),
    }

    cache.delete(("user", 42u64)).await?;
    assert!(cache.get::<User>(("user", 42u64)).await?.is_miss());

    Ok(())
}
