//! Tag-based bulk invalidation

use std::sync::Arc;

use futures::future::join_all;
use tracing::{debug, warn};

use strata_cache_core::InvalidationOptions;
use strata_cache_storage::LayeredCache;

/// Invalidates every entry carrying a tag, across all tiers
///
/// Tag support is opt-in per store: a tier without the taggable
/// capability contributes 0 rather than being emulated generically.
#[derive(Clone)]
pub struct TagInvalidator {
    layered: Arc<LayeredCache>,
}

impl TagInvalidator {
    /// Create an invalidator over the given tier chain
    pub fn new(layered: Arc<LayeredCache>) -> Self {
        Self { layered }
    }

    /// Invalidate a tag on every capable tier
    ///
    /// Returns the summed per-tier invalidation count. With
    /// `options.background` the work is dispatched without waiting and 0
    /// is returned; completion is observable only in logs.
    pub async fn invalidate(&self, tag: &str, options: InvalidationOptions) -> u64 {
        if options.background {
            let this = self.clone();
            let tag = tag.to_string();
            tokio::spawn(async move {
                let count = this.run(&tag).await;
                debug!(
                    target: "strata_cache",
                    tag = %tag,
                    count,
                    "background tag invalidation finished"
                );
            });
            return 0;
        }

        self.run(tag).await
    }

    async fn run(&self, tag: &str) -> u64 {
        let counts = join_all(self.layered.tiers().iter().map(|tier| async move {
            let Some(taggable) = tier.store().as_taggable() else {
                return 0;
            };
            match tier.execute(|| taggable.invalidate_tag(tag)).await {
                Ok(count) => count,
                Err(err) => {
                    warn!(
                        target: "strata_cache",
                        store = tier.name(),
                        tag = %tag,
                        error = %err,
                        "tag invalidation failed on tier"
                    );
                    0
                }
            }
        }))
        .await;

        counts.into_iter().sum()
    }
}
