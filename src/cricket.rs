use serde::Deserialize;
use std::env;
use std::time::Duration;
use tracing::warn;

use pitchside::cycle::MatchSource;
use pitchside::events::MatchSnapshot;

const FEED_TIMEOUT: Duration = Duration::from_secs(10);

#[derive(Clone)]
pub struct CricketClient {
    client: reqwest::Client,
    api_base: String,
    api_key: String,
}

impl CricketClient {
    pub fn from_env() -> Option<Self> {
        let api_key = env::var("CRICAPI_API_KEY").ok()?;
        let api_base =
            env::var("CRICAPI_API_BASE").unwrap_or_else(|_| "https://api.cricapi.com/v1".to_string());
        let client = reqwest::Client::new();
        Some(Self {
            client,
            api_base,
            api_key,
        })
    }

    async fn fetch(&self) -> Result<Vec<MatchSnapshot>, String> {
        let response = self
            .client
            .get(format!(
                "{}/currentMatches",
                self.api_base.trim_end_matches('/')
            ))
            .query(&[("apikey", self.api_key.as_str()), ("offset", "0")])
            .timeout(FEED_TIMEOUT)
            .send()
            .await
            .map_err(|err| format!("match feed request failed: {}", err))?;

        let status = response.status();
        if !status.is_success() {
            return Err(format!("match feed error: {}", status));
        }

        let body: CurrentMatchesResponse = response
            .json()
            .await
            .map_err(|err| format!("match feed parse failed: {}", err))?;
        Ok(body.data.unwrap_or_default())
    }
}

impl MatchSource for CricketClient {
    /// Feed trouble is never fatal to a cycle: log and report no matches.
    async fn current_matches(&self) -> Vec<MatchSnapshot> {
        match self.fetch().await {
            Ok(matches) => matches,
            Err(err) => {
                warn!("match feed unavailable, treating as no matches: {err}");
                Vec::new()
            }
        }
    }
}

#[derive(Deserialize)]
struct CurrentMatchesResponse {
    data: Option<Vec<MatchSnapshot>>,
}
