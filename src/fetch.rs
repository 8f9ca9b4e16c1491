use std::time::Duration;

use anyhow::Context;
use reqwest::StatusCode;
use serde::Deserialize;
use tokio::time::sleep;
use tracing::{debug, info, warn};

use crate::ingest::{self, PointsEnvelope, RawIndex, RawLatest};
use crate::models::{ChannelBundle, ChannelSummary};

/// Fixed retry cadence of the readiness polls.
pub const POLL_INTERVAL: Duration = Duration::from_secs(3);
/// Attempts before giving up on the channel appearing in the index.
pub const POLL_TRIES_INDEX: u32 = 60;
/// Attempts before giving up on the channel's data artifacts.
pub const POLL_TRIES_DATA: u32 = 60;

const HTTP_TIMEOUT: Duration = Duration::from_secs(30);

/// Read-only client for the pre-computed JSON artifacts published by the
/// weekly batch job.
pub struct ArtifactClient {
    http: reqwest::Client,
    base_url: String,
}

impl ArtifactClient {
    pub fn new(base_url: &str) -> Self {
        let http = reqwest::Client::builder()
            .timeout(HTTP_TIMEOUT)
            .build()
            .unwrap_or_else(|_| reqwest::Client::new());
        ArtifactClient {
            http,
            base_url: base_url.trim_end_matches('/').to_string(),
        }
    }

    fn url(&self, path: &str) -> String {
        format!("{}/{}", self.base_url, path)
    }

    /// GET a JSON artifact. A 404 is a valid "not produced yet" answer and
    /// maps to None; transport and server errors propagate.
    async fn get_json<T: serde::de::DeserializeOwned>(
        &self,
        path: &str,
    ) -> anyhow::Result<Option<T>> {
        let url = self.url(path);
        let response = self
            .http
            .get(&url)
            .send()
            .await
            .with_context(|| format!("fetch failed: {url}"))?;

        if response.status() == StatusCode::NOT_FOUND {
            return Ok(None);
        }
        let response = response
            .error_for_status()
            .with_context(|| format!("fetch failed: {url}"))?;
        let value = response
            .json::<T>()
            .await
            .with_context(|| format!("malformed artifact: {url}"))?;
        Ok(Some(value))
    }

    pub async fn fetch_index(&self) -> anyhow::Result<Vec<ChannelSummary>> {
        let raw: Option<RawIndex> = self.get_json("index.json").await?;
        let index = raw.map(ingest::channel_index).unwrap_or_default();
        debug!(channels = index.len(), "index fetched");
        Ok(index)
    }

    /// Fetch a channel's baseline and points. Missing artifacts degrade to an
    /// empty bundle; the core treats "no baseline" / "no points" as valid.
    pub async fn fetch_bundle(&self, channel_id: &str) -> anyhow::Result<ChannelBundle> {
        let latest: Option<RawLatest> = self
            .get_json(&format!("channels/{channel_id}/latest.json"))
            .await?;
        let points: Option<PointsEnvelope> = self
            .get_json(&format!("channels/{channel_id}/points.json"))
            .await?;

        if latest.is_none() {
            warn!(channel_id, "no latest artifact; baseline disabled");
        }
        if points.is_none() {
            warn!(channel_id, "no points artifact; channel renders empty");
        }

        let mut latest = latest.unwrap_or_default();
        let upstream_top = ingest::latest_top(&mut latest);

        Ok(ChannelBundle {
            channel_id: channel_id.to_string(),
            baseline: ingest::channel_baseline(latest.baseline),
            points: points.map(ingest::video_points).unwrap_or_default(),
            upstream_top,
        })
    }

    /// Cheap readiness probe: does the points artifact exist yet?
    pub async fn channel_data_ready(&self, channel_id: &str) -> bool {
        let url = self.url(&format!("channels/{channel_id}/points.json"));
        match self.http.get(&url).send().await {
            Ok(response) => response.status().is_success(),
            Err(_) => false,
        }
    }
}

#[derive(Debug, Deserialize)]
pub struct TriggerResponse {
    #[serde(alias = "channelId", alias = "id")]
    pub channel_id: Option<String>,
}

/// Client for the external on-demand analysis service.
pub struct TriggerClient {
    http: reqwest::Client,
    endpoint: String,
}

impl TriggerClient {
    pub fn new(endpoint: &str) -> Self {
        let http = reqwest::Client::builder()
            .timeout(HTTP_TIMEOUT)
            .build()
            .unwrap_or_else(|_| reqwest::Client::new());
        TriggerClient {
            http,
            endpoint: endpoint.to_string(),
        }
    }

    /// Kick off an on-demand analysis for a channel id or handle.
    pub async fn start(&self, input: &str) -> anyhow::Result<TriggerResponse> {
        info!(input, "requesting on-demand analysis");
        let response = self
            .http
            .post(&self.endpoint)
            .json(&serde_json::json!({ "input": input }))
            .send()
            .await
            .context("on-demand trigger unreachable")?
            .error_for_status()
            .context("on-demand trigger rejected the request")?;
        response
            .json::<TriggerResponse>()
            .await
            .context("malformed on-demand trigger response")
    }
}

/// Normalize a manually entered channel reference: trim whitespace and a
/// leading @.
pub fn normalize_input(raw: &str) -> String {
    raw.trim().trim_start_matches('@').to_string()
}

/// Resolve a manual input against the fetched index, by id or by title.
pub fn match_channel<'a>(
    index: &'a [ChannelSummary],
    input: &str,
) -> Option<&'a ChannelSummary> {
    let needle = normalize_input(input);
    index.iter().find(|ch| {
        ch.channel_id == needle || ch.title.trim_start_matches('@').eq_ignore_ascii_case(&needle)
    })
}

/// Poll the index until the requested input shows up, or attempts run out.
pub async fn wait_channel_in_index(
    artifacts: &ArtifactClient,
    input: &str,
) -> anyhow::Result<Option<String>> {
    for attempt in 1..=POLL_TRIES_INDEX {
        let index = artifacts.fetch_index().await?;
        if let Some(channel) = match_channel(&index, input) {
            return Ok(Some(channel.channel_id.clone()));
        }
        debug!(attempt, "input not in index yet");
        sleep(POLL_INTERVAL).await;
    }
    Ok(None)
}

/// Poll until the channel's data artifacts exist, or attempts run out.
/// Gives up quietly: a false return is "not ready", not an error.
pub async fn wait_channel_data_ready(
    artifacts: &ArtifactClient,
    channel_id: &str,
) -> bool {
    for attempt in 1..=POLL_TRIES_DATA {
        if artifacts.channel_data_ready(channel_id).await {
            return true;
        }
        debug!(attempt, channel_id, "channel data not ready yet");
        sleep(POLL_INTERVAL).await;
    }
    false
}

#[cfg(test)]
mod tests {
    use super::*;

    fn summary(id: &str, title: &str) -> ChannelSummary {
        ChannelSummary {
            channel_id: id.to_string(),
            title: title.to_string(),
            sticky_red_count: 0,
            max_anomaly_ratio: f64::NAN,
        }
    }

    #[test]
    fn match_channel_accepts_ids_and_handles() {
        let index = vec![summary("UCabc", "@SomeCreator"), summary("UCxyz", "Plain Name")];

        assert_eq!(match_channel(&index, "UCabc").unwrap().channel_id, "UCabc");
        assert_eq!(match_channel(&index, "@somecreator").unwrap().channel_id, "UCabc");
        assert_eq!(match_channel(&index, "somecreator").unwrap().channel_id, "UCabc");
        assert_eq!(match_channel(&index, " plain name ").unwrap().channel_id, "UCxyz");
        assert!(match_channel(&index, "missing").is_none());
    }

    #[test]
    fn normalize_input_strips_noise() {
        assert_eq!(normalize_input("  @handle "), "handle");
        assert_eq!(normalize_input("UCabc"), "UCabc");
    }
}
