use std::time::Duration;

use tracing::{debug, info};

use crate::store::{PostStore, StoreError};

/// Default number of unresolved posts examined per reconciliation cycle.
pub const DEFAULT_BATCH_SIZE: u32 = 20;
/// Default pause between engagement lookups, to stay friendly with the
/// publish platform's read limits.
pub const DEFAULT_LOOKUP_DELAY: Duration = Duration::from_secs(1);

/// Like/retweet counts for one published post.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Engagement {
    pub likes: i64,
    pub retweets: i64,
}

/// Deferred-engagement collaborator. `None` means the numbers are not
/// available yet (or the lookup failed); the record stays unresolved and is
/// retried on a later cycle.
#[allow(async_fn_in_trait)]
pub trait EngagementLookup {
    async fn engagement(&self, post_id: &str) -> Option<Engagement>;
}

/// One reconciliation pass: pull unresolved posts newest first, fetch their
/// real engagement, and backfill the composite score. Safe to invoke on any
/// schedule; already-backfilled records are never re-selected.
pub async fn run_feedback_cycle<L: EngagementLookup>(
    store: &PostStore,
    lookup: &L,
    batch_size: u32,
    lookup_delay: Duration,
) -> Result<usize, StoreError> {
    let ids = store.unresolved_ids(batch_size).await?;
    debug!(unresolved = ids.len(), "feedback cycle starting");

    let mut updated = 0;
    for id in &ids {
        match lookup.engagement(id).await {
            Some(engagement) => {
                if store
                    .backfill_engagement(id, engagement.likes, engagement.retweets)
                    .await?
                {
                    updated += 1;
                }
            }
            None => debug!(id = %id, "engagement not yet available, leaving unresolved"),
        }
        if !lookup_delay.is_zero() {
            tokio::time::sleep(lookup_delay).await;
        }
    }

    if updated > 0 {
        info!(updated, "backfilled engagement");
    }
    Ok(updated)
}

#[cfg(test)]
mod tests {
    use std::collections::HashMap;

    use super::*;
    use crate::store::PostStore;
    use crate::NarrativeLabel;

    struct FixedLookup {
        metrics: HashMap<String, Engagement>,
    }

    impl EngagementLookup for FixedLookup {
        async fn engagement(&self, post_id: &str) -> Option<Engagement> {
            self.metrics.get(post_id).copied()
        }
    }

    async fn seeded_store() -> PostStore {
        let store = PostStore::in_memory().await.unwrap();
        for id in ["p1", "p2"] {
            store
                .insert_post(id, "text", NarrativeLabel::Hype, NarrativeLabel::Hype, Some(60))
                .await
                .unwrap();
        }
        store
    }

    #[tokio::test]
    async fn unavailable_engagement_leaves_records_unresolved() {
        let store = seeded_store().await;
        let lookup = FixedLookup {
            metrics: HashMap::from([(
                "p1".to_string(),
                Engagement {
                    likes: 12,
                    retweets: 3,
                },
            )]),
        };

        let updated = run_feedback_cycle(&store, &lookup, 20, Duration::ZERO)
            .await
            .unwrap();
        assert_eq!(updated, 1);

        let resolved = store.get("p1").await.unwrap().unwrap();
        assert_eq!(resolved.composite_score, 18);
        assert_eq!(store.unresolved_ids(20).await.unwrap(), vec!["p2".to_string()]);
    }

    #[tokio::test]
    async fn second_cycle_selects_a_disjoint_set() {
        let store = seeded_store().await;
        let first_lookup = FixedLookup {
            metrics: HashMap::from([(
                "p1".to_string(),
                Engagement {
                    likes: 10,
                    retweets: 0,
                },
            )]),
        };
        let updated = run_feedback_cycle(&store, &first_lookup, 20, Duration::ZERO)
            .await
            .unwrap();
        assert_eq!(updated, 1);

        // Now every id resolves, but p1 must not be touched again.
        let second_lookup = FixedLookup {
            metrics: HashMap::from([
                (
                    "p1".to_string(),
                    Engagement {
                        likes: 999,
                        retweets: 999,
                    },
                ),
                (
                    "p2".to_string(),
                    Engagement {
                        likes: 4,
                        retweets: 2,
                    },
                ),
            ]),
        };
        let updated = run_feedback_cycle(&store, &second_lookup, 20, Duration::ZERO)
            .await
            .unwrap();
        assert_eq!(updated, 1);

        let first = store.get("p1").await.unwrap().unwrap();
        assert_eq!(first.actual_likes, Some(10));
        assert_eq!(first.composite_score, 10);
        let second = store.get("p2").await.unwrap().unwrap();
        assert_eq!(second.composite_score, 8);
        assert!(store.unresolved_ids(20).await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn batch_size_bounds_the_scan() {
        let store = seeded_store().await;
        let lookup = FixedLookup {
            metrics: HashMap::new(),
        };
        let updated = run_feedback_cycle(&store, &lookup, 1, Duration::ZERO)
            .await
            .unwrap();
        assert_eq!(updated, 0);
        assert_eq!(store.unresolved_ids(20).await.unwrap().len(), 2);
    }
}
