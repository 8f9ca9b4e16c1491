use std::fmt::Write;

use serde::Serialize;

use crate::baseline::BaselineModel;
use crate::classify::{self, classify};
use crate::curves::{self, CurvePair};
use crate::models::{AnalysisMode, ChannelBundle, Label, TopAnomaly, VideoPoint};

/// How many ranked anomalies the summary list carries.
pub const TOP_LIST_LIMIT: usize = 30;

/// One marker for the scatter chart.
#[derive(Debug, Clone, Serialize)]
pub struct ScatterPoint {
    pub x: f64,
    pub y: f64,
    pub video_id: String,
    pub label: Label,
    pub color: &'static str,
    pub marker_size: u32,
    pub hover_text: String,
}

/// Everything the chart layer needs for one channel in one mode.
#[derive(Debug, Clone, Serialize)]
pub struct RenderBundle {
    pub channel_id: String,
    pub mode: AnalysisMode,
    pub points: Vec<ScatterPoint>,
    pub curves: CurvePair,
    pub top_anomalies: Vec<TopAnomaly>,
}

pub fn video_url(video_id: &str) -> String {
    format!("https://www.youtube.com/watch?v={video_id}")
}

/// Integer formatting with thousands separators for hover/report text.
pub fn fmt_count(value: f64) -> String {
    if !value.is_finite() {
        return "?".to_string();
    }
    let negative = value < 0.0;
    let digits = (value.abs().round() as u64).to_string();
    let mut grouped = String::with_capacity(digits.len() + digits.len() / 3 + 1);
    for (i, c) in digits.chars().enumerate() {
        if i > 0 && (digits.len() - i) % 3 == 0 {
            grouped.push(',');
        }
        grouped.push(c);
    }
    if negative {
        format!("-{grouped}")
    } else {
        grouped
    }
}

fn fmt_ratio(value: f64) -> String {
    if value.is_finite() {
        format!("{value:.2}")
    } else {
        "?".to_string()
    }
}

fn hover_text(point: &VideoPoint, label: Label, days_ratio: f64, likes_ratio: f64) -> String {
    let mut text = String::new();
    let _ = writeln!(text, "{}", point.title);
    let _ = writeln!(text, "label: {}", label.as_str());
    let _ = writeln!(text, "days: {}", fmt_ratio(point.days_since_publish));
    let _ = writeln!(text, "views: {}", fmt_count(point.view_count));
    let _ = writeln!(text, "likes: {}", fmt_count(point.like_count));
    let _ = writeln!(text, "ratio_nat: {}", fmt_ratio(days_ratio));
    let _ = writeln!(text, "ratio_like: {}", fmt_ratio(likes_ratio));
    let _ = writeln!(text, "anomaly_ratio: {}", fmt_ratio(point.anomaly_ratio));
    let _ = write!(text, "{}", video_url(&point.video_id));
    text
}

/// Labeled scatter markers for one mode. The shorts/domain filter has already
/// run inside `mode_rows`, so every consumer sees the same point set.
pub fn scatter_points(
    points: &[VideoPoint],
    model: &BaselineModel,
    mode: AnalysisMode,
) -> Vec<ScatterPoint> {
    classify::mode_rows(points, mode)
        .into_iter()
        .map(|point| {
            let result = classify(point, model);
            let (x, y) = match mode {
                AnalysisMode::ViewsDays => (point.days_since_publish, point.view_count),
                AnalysisMode::ViewsLikes => (point.view_count, point.like_count),
            };
            ScatterPoint {
                x,
                y,
                video_id: point.video_id.clone(),
                label: result.label,
                color: result.label.color_token(),
                marker_size: result.label.marker_size(),
                hover_text: hover_text(point, result.label, result.days_ratio, result.likes_ratio),
            }
        })
        .collect()
}

/// Live top-N ranking by upstream anomaly ratio, worst first. Points without
/// a ratio rank last. Falls back to the batch job's own list when no live
/// point is eligible.
pub fn top_anomalies(
    bundle: &ChannelBundle,
    model: &BaselineModel,
    limit: usize,
) -> Vec<TopAnomaly> {
    let mut ranked: Vec<TopAnomaly> = bundle
        .points
        .iter()
        .filter(|p| classify::eligible_for_scoring(p))
        .map(|point| TopAnomaly {
            title: point.title.clone(),
            video_id: point.video_id.clone(),
            anomaly_ratio: point.anomaly_ratio,
            label: classify(point, model).label,
        })
        .collect();

    if ranked.is_empty() {
        return bundle.upstream_top.iter().take(limit).cloned().collect();
    }

    ranked.sort_by(|a, b| {
        let ar_a = if a.anomaly_ratio.is_finite() { a.anomaly_ratio } else { -1.0 };
        let ar_b = if b.anomaly_ratio.is_finite() { b.anomaly_ratio } else { -1.0 };
        ar_b.partial_cmp(&ar_a).unwrap_or(std::cmp::Ordering::Equal)
    });
    ranked.truncate(limit);
    ranked
}

/// Assemble the full render-ready structure for one channel and mode.
pub fn render_bundle(
    bundle: &ChannelBundle,
    model: &BaselineModel,
    mode: AnalysisMode,
    limit: usize,
) -> RenderBundle {
    let rows = classify::mode_rows(&bundle.points, mode);
    let curves = match mode {
        AnalysisMode::ViewsDays => curves::days_curves(model, &rows),
        AnalysisMode::ViewsLikes => curves::likes_curves(model, &rows),
    };

    RenderBundle {
        channel_id: bundle.channel_id.clone(),
        mode,
        points: scatter_points(&bundle.points, model, mode),
        curves,
        top_anomalies: top_anomalies(bundle, model, limit),
    }
}
