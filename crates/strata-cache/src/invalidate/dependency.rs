//! Dependency-graph bulk invalidation with cascade and cycle safety

use std::collections::HashSet;
use std::sync::Arc;

use futures::future::{BoxFuture, join_all};
use tracing::{debug, warn};

use strata_cache_core::InvalidationOptions;
use strata_cache_storage::LayeredCache;

/// Invalidates every entry depending on an identifier, optionally
/// cascading into dependencies that co-occur on the same entries
///
/// One `visited` set lives for the duration of a top-level call,
/// including every nested cascade it spawns; an identifier seen twice is
/// logged as a circular dependency and contributes nothing further.
#[derive(Clone)]
pub struct DependencyInvalidator {
    layered: Arc<LayeredCache>,
}

impl DependencyInvalidator {
    /// Create an invalidator over the given tier chain
    pub fn new(layered: Arc<LayeredCache>) -> Self {
        Self { layered }
    }

    /// Invalidate everything depending on `dependency`
    ///
    /// Returns the summed per-tier invalidation count across the whole
    /// cascade. With `options.background` the work is dispatched without
    /// waiting and 0 is returned.
    pub async fn invalidate(&self, dependency: &str, options: InvalidationOptions) -> u64 {
        if options.background {
            let this = self.clone();
            let dependency = dependency.to_string();
            tokio::spawn(async move {
                let mut visited = HashSet::new();
                let count = this
                    .invalidate_step(dependency.clone(), options.cascade, &mut visited)
                    .await;
                debug!(
                    target: "strata_cache",
                    dependency = %dependency,
                    count,
                    "background dependency invalidation finished"
                );
            });
            return 0;
        }

        let mut visited = HashSet::new();
        self.invalidate_step(dependency.to_string(), options.cascade, &mut visited)
            .await
    }

    /// Invalidate a batch of dependencies sharing one visited set
    ///
    /// An identifier already processed while invalidating one list
    /// member is not reprocessed (or double counted) for another.
    pub async fn invalidate_many(
        &self,
        dependencies: &[&str],
        options: InvalidationOptions,
    ) -> u64 {
        if options.background {
            let this = self.clone();
            let dependencies: Vec<String> =
                dependencies.iter().map(|d| d.to_string()).collect();
            tokio::spawn(async move {
                let mut visited = HashSet::new();
                let mut count = 0u64;
                for dependency in &dependencies {
                    count += this
                        .invalidate_step(dependency.clone(), options.cascade, &mut visited)
                        .await;
                }
                debug!(
                    target: "strata_cache",
                    dependencies = dependencies.len(),
                    count,
                    "background batch dependency invalidation finished"
                );
            });
            return 0;
        }

        let mut visited = HashSet::new();
        let mut total = 0u64;
        for dependency in dependencies {
            total += self
                .invalidate_step(dependency.to_string(), options.cascade, &mut visited)
                .await;
        }
        total
    }

    /// One step of the cascade: mark visited, collect children, run the
    /// native invalidation, recurse.
    fn invalidate_step<'a>(
        &'a self,
        dependency: String,
        cascade: bool,
        visited: &'a mut HashSet<String>,
    ) -> BoxFuture<'a, u64> {
        Box::pin(async move {
            if visited.contains(&dependency) {
                warn!(
                    target: "strata_cache",
                    dependency = %dependency,
                    "circular dependency detected, skipping"
                );
                return 0;
            }
            visited.insert(dependency.clone());

            // Children must be collected before the entries carrying the
            // co-occurrence are deleted by the native step
            let children = if cascade {
                self.children_of(&dependency).await
            } else {
                Vec::new()
            };

            let mut total = self.invalidate_native(&dependency).await;

            for child in children {
                if visited.contains(&child) {
                    continue;
                }
                total += self.invalidate_step(child, cascade, visited).await;
            }

            total
        })
    }

    /// Run the native dependency invalidation on every capable tier
    async fn invalidate_native(&self, dependency: &str) -> u64 {
        let counts = join_all(self.layered.tiers().iter().map(|tier| async move {
            let Some(native) = tier.store().as_dependency() else {
                return 0;
            };
            match tier.execute(|| native.invalidate_dependency(dependency)).await {
                Ok(count) => count,
                Err(err) => {
                    warn!(
                        target: "strata_cache",
                        store = tier.name(),
                        dependency = %dependency,
                        error = %err,
                        "dependency invalidation failed on tier"
                    );
                    0
                }
            }
        }))
        .await;

        counts.into_iter().sum()
    }

    /// Find dependency identifiers co-occurring with `dependency` on any
    /// live entry. Tiers with a native dependency index narrow the scan
    /// to the affected keys; the rest are scanned wholesale.
    async fn children_of(&self, dependency: &str) -> Vec<String> {
        let per_tier = join_all(self.layered.tiers().iter().map(|tier| async move {
            let store = tier.store();

            let keys: Vec<String> = match store.as_dependency() {
                Some(native) => {
                    match tier.execute(|| native.keys_by_dependency(dependency)).await {
                        Ok(keys) => keys,
                        Err(err) => {
                            warn!(
                                target: "strata_cache",
                                store = tier.name(),
                                dependency = %dependency,
                                error = %err,
                                "dependency key lookup failed on tier"
                            );
                            return Vec::new();
                        }
                    }
                }
                None => match tier.execute(|| store.keys(None)).await {
                    Ok(keys) => keys,
                    Err(err) => {
                        warn!(
                            target: "strata_cache",
                            store = tier.name(),
                            dependency = %dependency,
                            error = %err,
                            "key enumeration failed on tier"
                        );
                        return Vec::new();
                    }
                },
            };
            if keys.is_empty() {
                return Vec::new();
            }

            let refs: Vec<&str> = keys.iter().map(String::as_str).collect();
            let entries = match tier.execute(|| store.get_many(&refs)).await {
                Ok(entries) => entries,
                Err(err) => {
                    warn!(
                        target: "strata_cache",
                        store = tier.name(),
                        dependency = %dependency,
                        error = %err,
                        "entry scan failed on tier"
                    );
                    return Vec::new();
                }
            };

            let mut found = Vec::new();
            for entry in entries.into_iter().flatten() {
                if entry.dependencies.iter().any(|d| d == dependency) {
                    found.extend(
                        entry
                            .dependencies
                            .into_iter()
                            .filter(|d| d != dependency),
                    );
                }
            }
            found
        }))
        .await;

        let mut seen = HashSet::new();
        per_tier
            .into_iter()
            .flatten()
            .filter(|child| seen.insert(child.clone()))
            .collect()
    }
}
