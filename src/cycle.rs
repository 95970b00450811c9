use tracing::{error, info, warn};

use crate::decision::DecisionEngine;
use crate::events::{select_events, MatchSnapshot};
use crate::narrative::classify;
use crate::safety::{Pacing, RecentPosts};
use crate::store::PostStore;
use crate::strategy::should_post;
use crate::{GenerationError, TextGenerator};

/// Match-data collaborator. Infallible by contract: transient feed trouble
/// shows up as an empty list, never as an error.
#[allow(async_fn_in_trait)]
pub trait MatchSource {
    async fn current_matches(&self) -> Vec<MatchSnapshot>;
}

/// Publish collaborator. `None` means the post did not go out; the cycle
/// skips the event and moves on. Reply/quote targets are threaded through
/// for banter posts even though the watch loop publishes plain posts.
#[allow(async_fn_in_trait)]
pub trait PublishSink {
    async fn publish(
        &self,
        text: &str,
        reply_to: Option<&str>,
        quote_of: Option<&str>,
    ) -> Option<String>;
}

/// One full watch pass: fetch matches, classify and gate each event, draft
/// and rank candidates, publish the winner, record it for the learning
/// loop. Returns the number of posts published. The only error that
/// escapes is a generation rate limit; the caller decides whether the quota
/// flag makes it fatal or just a wait-for-next-tick.
pub async fn run_decision_cycle<M, G, P>(
    source: &M,
    engine: &DecisionEngine<G>,
    sink: &P,
    store: &PostStore,
    guard: &mut RecentPosts,
    pacing: &Pacing,
    candidates: usize,
) -> Result<usize, GenerationError>
where
    M: MatchSource,
    G: TextGenerator,
    P: PublishSink,
{
    let snapshots = source.current_matches().await;
    let events = select_events(&snapshots);
    if events.is_empty() {
        info!("no matches to process, skipping cycle");
        return Ok(0);
    }

    let mut posted = 0;
    for event in &events {
        let label = classify(&event.summary, &event.state);
        info!(label = label.label(), summary = %event.summary, "processing event");

        if !should_post(&event.summary, label) {
            info!("below the posting bar, skipping");
            continue;
        }

        let decision = match engine.run_decision(&event.summary, label, candidates).await {
            Ok(decision) => decision,
            Err(err @ GenerationError::RateLimited { .. }) => return Err(err),
            Err(err) => {
                warn!("generation failed, skipping event: {err}");
                continue;
            }
        };

        if guard.is_duplicate(&decision.text) {
            warn!(text = %decision.text, "near-duplicate of a recent post, skipping");
            continue;
        }

        pacing.before_publish().await;

        let Some(post_id) = sink.publish(&decision.text, None, None).await else {
            warn!("publish failed, skipping event");
            continue;
        };
        guard.remember(&decision.text);

        if let Err(err) = store
            .insert_post(
                &post_id,
                &decision.text,
                label,
                label,
                Some(decision.predicted_score),
            )
            .await
        {
            error!("failed to persist post {post_id}: {err}");
        }

        info!(
            post_id = %post_id,
            predicted = decision.predicted_score,
            text = %decision.text,
            "posted"
        );
        posted += 1;

        pacing.after_publish().await;
    }

    Ok(posted)
}
