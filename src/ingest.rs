use std::path::Path;

use anyhow::Context;
use chrono::{DateTime, Utc};
use serde::Deserialize;

use crate::classify;
use crate::models::{ChannelBaseline, ChannelSummary, Label, TopAnomaly, VideoPoint};

// Every field-name variant observed across artifact generations is absorbed
// here, once. Consumers only ever see the normalized types in `models`.

#[derive(Debug, Default, Deserialize)]
pub struct RawBaseline {
    #[serde(alias = "natLogIntercept", alias = "a")]
    nat_log_intercept: Option<f64>,
    #[serde(alias = "natLogSlope", alias = "b")]
    nat_log_slope: Option<f64>,
    #[serde(alias = "likeRegressionIntercept", alias = "b0")]
    like_log_intercept: Option<f64>,
    #[serde(alias = "likeRegressionSlope", alias = "b1")]
    like_log_slope: Option<f64>,
    #[serde(alias = "upperRatio")]
    upper_ratio: Option<f64>,
}

#[derive(Debug, Deserialize)]
pub struct RawPoint {
    #[serde(alias = "videoId", alias = "id")]
    video_id: Option<String>,
    title: Option<String>,
    #[serde(alias = "days")]
    t_days: Option<f64>,
    #[serde(alias = "publishedAt")]
    published_at: Option<DateTime<Utc>>,
    #[serde(alias = "viewCount", alias = "views")]
    view_count: Option<f64>,
    #[serde(alias = "likeCount", alias = "likes")]
    like_count: Option<f64>,
    anomaly_ratio: Option<f64>,
    ratio_nat: Option<f64>,
    ratio_like: Option<f64>,
    is_short: Option<bool>,
    #[serde(alias = "duration")]
    duration_sec: Option<f64>,
    description: Option<String>,
    tags: Option<Vec<String>>,
}

/// Points arrive as a bare list or wrapped in an envelope object.
#[derive(Debug, Deserialize)]
#[serde(untagged)]
pub enum PointsEnvelope {
    List(Vec<RawPoint>),
    Points { points: Vec<RawPoint> },
    Items { items: Vec<RawPoint> },
}

#[derive(Debug, Deserialize)]
pub struct RawTopEntry {
    title: Option<String>,
    #[serde(alias = "videoId", alias = "id")]
    video_id: Option<String>,
    anomaly_ratio: Option<f64>,
    label: Option<String>,
}

/// The per-channel `latest.json` artifact.
#[derive(Debug, Default, Deserialize)]
pub struct RawLatest {
    pub baseline: Option<RawBaseline>,
    #[serde(alias = "top_anomalies")]
    red_top: Option<Vec<RawTopEntry>>,
}

#[derive(Debug, Deserialize)]
pub struct RawIndex {
    channels: Option<Vec<RawChannel>>,
}

#[derive(Debug, Deserialize)]
pub struct RawChannel {
    #[serde(alias = "channelId", alias = "id")]
    channel_id: Option<String>,
    title: Option<String>,
    handle: Option<String>,
    #[serde(alias = "watchKey")]
    watch_key: Option<String>,
    #[serde(alias = "sticky_red", alias = "sticky")]
    sticky_red_count: Option<i64>,
    #[serde(alias = "worst_anomaly", alias = "worst")]
    max_anomaly_ratio: Option<f64>,
}

fn num_or_nan(value: Option<f64>) -> f64 {
    value.filter(|v| v.is_finite()).unwrap_or(f64::NAN)
}

pub fn channel_baseline(raw: Option<RawBaseline>) -> ChannelBaseline {
    let raw = raw.unwrap_or_default();
    ChannelBaseline {
        nat_log_intercept: num_or_nan(raw.nat_log_intercept),
        nat_log_slope: num_or_nan(raw.nat_log_slope),
        like_log_intercept: num_or_nan(raw.like_log_intercept),
        like_log_slope: num_or_nan(raw.like_log_slope),
        upper_ratio: num_or_nan(raw.upper_ratio),
    }
}

fn elapsed_days(published_at: DateTime<Utc>) -> f64 {
    (Utc::now() - published_at).num_seconds() as f64 / 86_400.0
}

fn normalize_point(raw: RawPoint) -> VideoPoint {
    let title = raw.title.unwrap_or_else(|| "(no title)".to_string());
    let days = match raw.t_days {
        Some(days) if days.is_finite() => days,
        _ => raw.published_at.map(elapsed_days).unwrap_or(f64::NAN),
    };

    let shorts_text = format!(
        "{} {} {}",
        title,
        raw.description.as_deref().unwrap_or(""),
        raw.tags.as_deref().unwrap_or(&[]).join(" ")
    );
    let is_short = classify::is_short_video(raw.is_short, raw.duration_sec, &shorts_text);

    VideoPoint {
        video_id: raw.video_id.unwrap_or_default(),
        title,
        view_count: num_or_nan(raw.view_count),
        like_count: num_or_nan(raw.like_count),
        days_since_publish: days,
        anomaly_ratio: num_or_nan(raw.anomaly_ratio),
        ratio_nat: num_or_nan(raw.ratio_nat),
        ratio_like: num_or_nan(raw.ratio_like),
        is_short,
    }
}

pub fn video_points(envelope: PointsEnvelope) -> Vec<VideoPoint> {
    let raw = match envelope {
        PointsEnvelope::List(points) => points,
        PointsEnvelope::Points { points } => points,
        PointsEnvelope::Items { items } => items,
    };
    raw.into_iter().map(normalize_point).collect()
}

pub fn top_anomalies(raw: Option<Vec<RawTopEntry>>) -> Vec<TopAnomaly> {
    raw.unwrap_or_default()
        .into_iter()
        .map(|entry| TopAnomaly {
            title: entry.title.unwrap_or_else(|| "(no title)".to_string()),
            video_id: entry.video_id.unwrap_or_default(),
            anomaly_ratio: num_or_nan(entry.anomaly_ratio),
            label: Label::parse(entry.label.as_deref().unwrap_or("")),
        })
        .collect()
}

pub fn channel_index(raw: RawIndex) -> Vec<ChannelSummary> {
    raw.channels
        .unwrap_or_default()
        .into_iter()
        .filter_map(|ch| {
            let channel_id = ch.channel_id?;
            let title = ch
                .title
                .or(ch.handle)
                .or(ch.watch_key)
                .unwrap_or_else(|| channel_id.clone());
            Some(ChannelSummary {
                channel_id,
                title,
                sticky_red_count: ch.sticky_red_count.unwrap_or(0),
                max_anomaly_ratio: num_or_nan(ch.max_anomaly_ratio),
            })
        })
        .collect()
}

pub fn latest_top(raw: &mut RawLatest) -> Vec<TopAnomaly> {
    top_anomalies(raw.red_top.take())
}

/// Convert a CSV export of video stats into a points artifact. Returns how
/// many rows were written.
pub fn import_csv_points(csv_path: &Path, out_path: &Path) -> anyhow::Result<usize> {
    #[derive(Deserialize)]
    struct CsvRow {
        video_id: String,
        title: String,
        view_count: f64,
        like_count: f64,
        #[serde(default)]
        t_days: Option<f64>,
        #[serde(default)]
        published_at: Option<DateTime<Utc>>,
        #[serde(default)]
        duration_sec: Option<f64>,
        #[serde(default)]
        anomaly_ratio: Option<f64>,
    }

    let mut reader = csv::Reader::from_path(csv_path)
        .with_context(|| format!("failed to open {}", csv_path.display()))?;
    let mut points = Vec::new();

    for result in reader.deserialize::<CsvRow>() {
        let row = result.context("malformed CSV row")?;
        points.push(normalize_point(RawPoint {
            video_id: Some(row.video_id),
            title: Some(row.title),
            t_days: row.t_days,
            published_at: row.published_at,
            view_count: Some(row.view_count),
            like_count: Some(row.like_count),
            anomaly_ratio: row.anomaly_ratio,
            ratio_nat: None,
            ratio_like: None,
            is_short: None,
            duration_sec: row.duration_sec,
            description: None,
            tags: None,
        }));
    }

    // non-finite f64 values serialize as null, which the adapter reads back
    // as "absent"
    let artifact: Vec<serde_json::Value> = points
        .iter()
        .map(|p| {
            serde_json::json!({
                "video_id": p.video_id,
                "title": p.title,
                "view_count": p.view_count,
                "like_count": p.like_count,
                "t_days": p.days_since_publish,
                "anomaly_ratio": p.anomaly_ratio,
                "is_short": p.is_short,
            })
        })
        .collect();

    let json = serde_json::to_string_pretty(&serde_json::json!({ "points": artifact }))?;
    std::fs::write(out_path, json)
        .with_context(|| format!("failed to write {}", out_path.display()))?;

    Ok(points.len())
}
