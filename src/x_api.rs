use reqwest::header::AUTHORIZATION;
use serde::{Deserialize, Serialize};
use std::env;
use tracing::{error, warn};

use pitchside::cycle::PublishSink;
use pitchside::feedback::{Engagement, EngagementLookup};

/// Condensed walkthrough for the usual cause of a 401: an app still on
/// read-only permissions, or tokens minted before the permission change.
const UNAUTHORIZED_HELP: &str = "X API returned 401 Unauthorized. Posting requires \
    'Read and Write' app permissions and user tokens minted AFTER the permission \
    change: update the app settings, regenerate the token, and put the new value \
    in .env";

#[derive(Clone)]
pub struct XApiClient {
    client: reqwest::Client,
    api_base: String,
    bearer_token: String,
}

impl XApiClient {
    pub fn from_env() -> Option<Self> {
        let api_base =
            env::var("X_API_BASE").unwrap_or_else(|_| "https://api.twitter.com/2".to_string());
        let bearer_token = env::var("X_API_BEARER_TOKEN").ok()?;
        let client = reqwest::Client::new();
        Some(Self {
            client,
            api_base,
            bearer_token: decode_bearer(bearer_token),
        })
    }

    async fn create_post(
        &self,
        text: &str,
        reply_to: Option<&str>,
        quote_of: Option<&str>,
    ) -> Result<Option<String>, String> {
        let request = CreatePostRequest {
            text: text.to_string(),
            reply: reply_to.map(|id| ReplyTarget {
                in_reply_to_tweet_id: id.to_string(),
            }),
            quote_tweet_id: quote_of.map(str::to_string),
        };

        let response = self
            .client
            .post(format!("{}/tweets", self.api_base.trim_end_matches('/')))
            .header(AUTHORIZATION, format!("Bearer {}", self.bearer_token))
            .json(&request)
            .send()
            .await
            .map_err(|err| format!("X API request failed: {}", err))?;

        let status = response.status();
        if status == reqwest::StatusCode::UNAUTHORIZED {
            return Err(UNAUTHORIZED_HELP.to_string());
        }
        if !status.is_success() {
            let error_body = response.text().await.unwrap_or_else(|_| String::new());
            let detail = error_body.trim();
            if detail.is_empty() {
                return Err(format!("X API error: {}", status));
            }
            return Err(format!("X API error: {} {}", status, detail));
        }

        let body: CreatePostResponse = response
            .json()
            .await
            .map_err(|err| format!("X API response parse failed: {}", err))?;
        Ok(body.data.map(|data| data.id))
    }

    async fn public_metrics(&self, post_id: &str) -> Result<Option<Engagement>, String> {
        let response = self
            .client
            .get(format!(
                "{}/tweets/{}",
                self.api_base.trim_end_matches('/'),
                post_id
            ))
            .query(&[("tweet.fields", "public_metrics")])
            .header(AUTHORIZATION, format!("Bearer {}", self.bearer_token))
            .send()
            .await
            .map_err(|err| format!("X API request failed: {}", err))?;

        let status = response.status();
        if !status.is_success() {
            let error_body = response.text().await.unwrap_or_else(|_| String::new());
            let detail = error_body.trim();
            if detail.is_empty() {
                return Err(format!("X API error: {}", status));
            }
            return Err(format!("X API error: {} {}", status, detail));
        }

        let body: TweetResponse = response
            .json()
            .await
            .map_err(|err| format!("X API response parse failed: {}", err))?;

        Ok(body
            .data
            .and_then(|tweet| tweet.public_metrics)
            .map(|metrics| Engagement {
                likes: metrics.like_count,
                retweets: metrics.retweet_count,
            }))
    }
}

impl PublishSink for XApiClient {
    async fn publish(
        &self,
        text: &str,
        reply_to: Option<&str>,
        quote_of: Option<&str>,
    ) -> Option<String> {
        match self.create_post(text, reply_to, quote_of).await {
            Ok(Some(id)) => Some(id),
            Ok(None) => {
                warn!("X API accepted the post but returned no id");
                None
            }
            Err(err) => {
                error!("publish failed: {err}");
                None
            }
        }
    }
}

impl EngagementLookup for XApiClient {
    async fn engagement(&self, post_id: &str) -> Option<Engagement> {
        match self.public_metrics(post_id).await {
            Ok(metrics) => metrics,
            Err(err) => {
                warn!("engagement lookup failed for {post_id}: {err}");
                None
            }
        }
    }
}

fn decode_bearer(value: String) -> String {
    if value.contains('%') {
        match urlencoding::decode(&value) {
            Ok(decoded) => decoded.into_owned(),
            Err(_) => value,
        }
    } else {
        value
    }
}

#[derive(Serialize)]
struct CreatePostRequest {
    text: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    reply: Option<ReplyTarget>,
    #[serde(skip_serializing_if = "Option::is_none")]
    quote_tweet_id: Option<String>,
}

#[derive(Serialize)]
struct ReplyTarget {
    in_reply_to_tweet_id: String,
}

#[derive(Deserialize)]
struct CreatePostResponse {
    data: Option<CreatedPost>,
}

#[derive(Deserialize)]
struct CreatedPost {
    id: String,
}

#[derive(Deserialize)]
struct TweetResponse {
    data: Option<Tweet>,
}

#[derive(Deserialize)]
struct Tweet {
    public_metrics: Option<PublicMetrics>,
}

#[derive(Deserialize)]
struct PublicMetrics {
    like_count: i64,
    retweet_count: i64,
}
