use clap::ValueEnum;
use serde::Serialize;

/// Severity tier. Ordering reflects severity, `Normal` lowest.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum Label {
    Normal,
    Yellow,
    Orange,
    Red,
}

impl Label {
    pub fn as_str(&self) -> &'static str {
        match self {
            Label::Normal => "NORMAL",
            Label::Yellow => "YELLOW",
            Label::Orange => "ORANGE",
            Label::Red => "RED",
        }
    }

    /// Parse an upstream label string; anything unrecognized is NORMAL.
    pub fn parse(value: &str) -> Label {
        match value.trim().to_ascii_uppercase().as_str() {
            "RED" => Label::Red,
            "ORANGE" => Label::Orange,
            "YELLOW" => Label::Yellow,
            _ => Label::Normal,
        }
    }

    pub fn color_token(&self) -> &'static str {
        match self {
            Label::Normal => "#94a3b8",
            Label::Yellow => "#facc15",
            Label::Orange => "#fb923c",
            Label::Red => "#ef4444",
        }
    }

    pub fn marker_size(&self) -> u32 {
        match self {
            Label::Red => 9,
            Label::Orange | Label::Yellow => 8,
            Label::Normal => 6,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, ValueEnum)]
#[serde(rename_all = "snake_case")]
pub enum AnalysisMode {
    /// Views against days since publish.
    ViewsDays,
    /// Views against like count.
    ViewsLikes,
}

/// Regression coefficients fit upstream for one channel.
///
/// Coefficients that were missing or unparseable in the artifact are carried
/// as NaN; a fit with any non-finite coefficient is unusable and its
/// exceedance test never fires.
#[derive(Debug, Clone)]
pub struct ChannelBaseline {
    /// ln(expected views) = nat_log_intercept + nat_log_slope * days
    pub nat_log_intercept: f64,
    pub nat_log_slope: f64,
    /// ln(expected views) = like_log_intercept + like_log_slope * ln(likes)
    pub like_log_intercept: f64,
    pub like_log_slope: f64,
    /// Multiplicative threshold above the expected curve.
    pub upper_ratio: f64,
}

impl ChannelBaseline {
    /// Baseline for a channel with no usable fit at all.
    pub fn empty() -> Self {
        ChannelBaseline {
            nat_log_intercept: f64::NAN,
            nat_log_slope: f64::NAN,
            like_log_intercept: f64::NAN,
            like_log_slope: f64::NAN,
            upper_ratio: f64::NAN,
        }
    }
}

/// One video, normalized by the ingest adapter. Read-only within the core.
/// The ratio fields are upstream-computed and NaN when absent.
#[derive(Debug, Clone)]
pub struct VideoPoint {
    pub video_id: String,
    pub title: String,
    pub view_count: f64,
    pub like_count: f64,
    pub days_since_publish: f64,
    pub anomaly_ratio: f64,
    pub ratio_nat: f64,
    pub ratio_like: f64,
    /// Resolved once at ingestion through the canonical shorts predicate.
    pub is_short: bool,
}

/// Outcome of classifying one point against one baseline. Computed fresh per
/// point per render; never mutates the source point. The deviation ratios
/// are observed/expected views per fit, NaN when inapplicable.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ClassificationResult {
    pub label: Label,
    pub exceeds_days_baseline: bool,
    pub exceeds_likes_baseline: bool,
    pub expected_views_days: f64,
    pub upper_views_days: f64,
    pub expected_views_likes: f64,
    pub upper_views_likes: f64,
    pub days_ratio: f64,
    pub likes_ratio: f64,
}

/// Per-channel artifact set, cached per channel id.
#[derive(Debug, Clone)]
pub struct ChannelBundle {
    pub channel_id: String,
    pub baseline: ChannelBaseline,
    pub points: Vec<VideoPoint>,
    /// Batch-job-selected top list, used as a fallback ranking source.
    pub upstream_top: Vec<TopAnomaly>,
}

impl ChannelBundle {
    pub fn empty(channel_id: &str) -> Self {
        ChannelBundle {
            channel_id: channel_id.to_string(),
            baseline: ChannelBaseline::empty(),
            points: Vec::new(),
            upstream_top: Vec::new(),
        }
    }
}

/// One row of the watched-channel index. Sticky RED counts and the worst
/// anomaly ratio are consumed from upstream, not computed here.
#[derive(Debug, Clone)]
pub struct ChannelSummary {
    pub channel_id: String,
    pub title: String,
    pub sticky_red_count: i64,
    pub max_anomaly_ratio: f64,
}

#[derive(Debug, Clone, Serialize)]
pub struct TopAnomaly {
    pub title: String,
    pub video_id: String,
    pub anomaly_ratio: f64,
    pub label: Label,
}
