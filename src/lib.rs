pub mod config;
pub mod cycle;
pub mod decision;
pub mod events;
pub mod feedback;
pub mod narrative;
pub mod safety;
pub mod store;
pub mod strategy;

use thiserror::Error;

/// Discrete emotional read of a live match moment. Closed set; every
/// classified event maps to exactly one label.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum NarrativeLabel {
    Panic,
    Hype,
    Tension,
    Neutral,
}

impl NarrativeLabel {
    pub fn label(self) -> &'static str {
        match self {
            NarrativeLabel::Panic => "panic",
            NarrativeLabel::Hype => "hype",
            NarrativeLabel::Tension => "tension",
            NarrativeLabel::Neutral => "neutral",
        }
    }

    pub fn is_postable(self) -> bool {
        !matches!(self, NarrativeLabel::Neutral)
    }
}

#[derive(Debug, Error)]
pub enum GenerationError {
    #[error("text generation request failed: {0}")]
    Http(#[from] reqwest::Error),
    #[error("text generation API error: {status} {detail}")]
    Api { status: u16, detail: String },
    #[error("text generation rate limited (quota exhausted: {quota_exhausted})")]
    RateLimited { quota_exhausted: bool },
    #[error("text generation response missing choices")]
    EmptyResponse,
}

impl GenerationError {
    pub fn is_quota_exhausted(&self) -> bool {
        matches!(
            self,
            GenerationError::RateLimited {
                quota_exhausted: true
            }
        )
    }
}

/// Text-generation collaborator: one prompt in, one raw completion out.
/// Rate limiting surfaces as `GenerationError::RateLimited`; callers decide
/// whether the quota flag makes it fatal.
#[allow(async_fn_in_trait)]
pub trait TextGenerator {
    async fn complete(&self, prompt: &str) -> Result<String, GenerationError>;
}

pub const COMPOSITE_SCORE_CAP: i64 = 10_000;

/// Ground-truth engagement signal: likes plus double-weighted retweets,
/// capped so one runaway post cannot dominate per-label averages.
pub fn composite_score(likes: i64, retweets: i64) -> i64 {
    (likes + 2 * retweets).min(COMPOSITE_SCORE_CAP)
}
