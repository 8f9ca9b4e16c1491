use std::fmt::Write;

use chrono::Utc;

use crate::baseline::BaselineModel;
use crate::classify;
use crate::models::{ChannelBundle, ChannelSummary, Label};
use crate::render::{self, fmt_count};

/// Label counts across the points a channel is scored on.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct SeverityMix {
    pub red: usize,
    pub orange: usize,
    pub yellow: usize,
    pub normal: usize,
}

pub fn severity_mix(bundle: &ChannelBundle, model: &BaselineModel) -> SeverityMix {
    let mut mix = SeverityMix::default();
    for point in bundle
        .points
        .iter()
        .filter(|p| classify::eligible_for_scoring(p))
    {
        match classify::classify(point, model).label {
            Label::Red => mix.red += 1,
            Label::Orange => mix.orange += 1,
            Label::Yellow => mix.yellow += 1,
            Label::Normal => mix.normal += 1,
        }
    }
    mix
}

pub fn build_report(
    summary: &ChannelSummary,
    bundle: &ChannelBundle,
    model: &BaselineModel,
) -> String {
    let mix = severity_mix(bundle, model);
    let top = render::top_anomalies(bundle, model, 10);
    let shorts = bundle.points.iter().filter(|p| p.is_short).count();

    let mut output = String::new();

    let _ = writeln!(output, "# Channel Anomaly Report");
    let _ = writeln!(
        output,
        "Generated for {} ({}) on {}",
        summary.title,
        summary.channel_id,
        Utc::now().date_naive()
    );
    let _ = writeln!(output);
    let _ = writeln!(output, "## Severity Mix");

    let scored = mix.red + mix.orange + mix.yellow + mix.normal;
    if scored == 0 {
        let _ = writeln!(output, "No scorable videos for this channel.");
    } else {
        let _ = writeln!(output, "- RED: {}", mix.red);
        let _ = writeln!(output, "- ORANGE: {}", mix.orange);
        let _ = writeln!(output, "- YELLOW: {}", mix.yellow);
        let _ = writeln!(output, "- NORMAL: {}", mix.normal);
    }
    if shorts > 0 {
        let _ = writeln!(output, "- shorts excluded from scoring: {shorts}");
    }

    let _ = writeln!(output);
    let _ = writeln!(output, "## Top Anomalies");

    if top.is_empty() {
        let _ = writeln!(output, "No videos ranked above baseline this window.");
    } else {
        for anomaly in top.iter() {
            let ratio = if anomaly.anomaly_ratio.is_finite() {
                format!("{:.2}", anomaly.anomaly_ratio)
            } else {
                "?".to_string()
            };
            let _ = writeln!(
                output,
                "- {} ({}) label {} anomaly ratio {}",
                anomaly.title,
                anomaly.video_id,
                anomaly.label.as_str(),
                ratio
            );
        }
    }

    let _ = writeln!(output);
    let _ = writeln!(output, "## Baseline Fit");

    if model.days_fit_usable() {
        let _ = writeln!(
            output,
            "- days fit active; expected views at day 30: {}",
            fmt_count(model.expected_views_for_days(30.0))
        );
    } else {
        let _ = writeln!(output, "- days fit disabled (missing coefficients)");
    }
    if model.likes_fit_usable() {
        let _ = writeln!(output, "- likes fit active");
    } else {
        let _ = writeln!(output, "- likes fit disabled (missing coefficients)");
    }
    let factor = model.upper_factor();
    if factor.is_finite() {
        let _ = writeln!(output, "- outlier threshold: {factor:.2}x expected");
    } else {
        let _ = writeln!(output, "- outlier threshold unavailable; exceedance tests off");
    }
    if summary.sticky_red_count > 0 {
        let _ = writeln!(
            output,
            "- sticky RED windows so far: {}",
            summary.sticky_red_count
        );
    }

    output
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::{ChannelBaseline, VideoPoint};

    fn sample_model() -> BaselineModel {
        BaselineModel::new(
            ChannelBaseline {
                nat_log_intercept: 10.0,
                nat_log_slope: -0.01,
                like_log_intercept: 2.0,
                like_log_slope: 1.1,
                upper_ratio: 2.0,
            },
            1.0,
        )
    }

    fn sample_summary() -> ChannelSummary {
        ChannelSummary {
            channel_id: "UC123".to_string(),
            title: "Example Channel".to_string(),
            sticky_red_count: 2,
            max_anomaly_ratio: f64::NAN,
        }
    }

    fn sample_point(views: f64, likes: f64, days: f64) -> VideoPoint {
        VideoPoint {
            video_id: "vid".to_string(),
            title: "A video".to_string(),
            view_count: views,
            like_count: likes,
            days_since_publish: days,
            anomaly_ratio: 5.0,
            ratio_nat: f64::NAN,
            ratio_like: f64::NAN,
            is_short: false,
        }
    }

    #[test]
    fn mix_counts_only_scorable_points() {
        let model = sample_model();
        let mut short = sample_point(100.0, 10.0, 5.0);
        short.is_short = true;
        let bundle = ChannelBundle {
            channel_id: "UC123".to_string(),
            baseline: ChannelBaseline::empty(),
            points: vec![sample_point(100.0, 10.0, 5.0), short, sample_point(0.0, 10.0, 5.0)],
            upstream_top: Vec::new(),
        };

        let mix = severity_mix(&bundle, &model);
        assert_eq!(mix.red + mix.orange + mix.yellow + mix.normal, 1);
    }

    #[test]
    fn report_lists_sections_and_exclusions() {
        let model = sample_model();
        let mut short = sample_point(100.0, 10.0, 5.0);
        short.is_short = true;
        let bundle = ChannelBundle {
            channel_id: "UC123".to_string(),
            baseline: ChannelBaseline::empty(),
            points: vec![sample_point(100.0, 10.0, 5.0), short],
            upstream_top: Vec::new(),
        };

        let report = build_report(&sample_summary(), &bundle, &model);
        assert!(report.contains("# Channel Anomaly Report"));
        assert!(report.contains("## Severity Mix"));
        assert!(report.contains("## Top Anomalies"));
        assert!(report.contains("## Baseline Fit"));
        assert!(report.contains("shorts excluded from scoring: 1"));
        assert!(report.contains("sticky RED windows so far: 2"));
    }

    #[test]
    fn report_degrades_when_nothing_is_scorable() {
        let model = BaselineModel::new(ChannelBaseline::empty(), 1.0);
        let bundle = ChannelBundle::empty("UC123");

        let report = build_report(&sample_summary(), &bundle, &model);
        assert!(report.contains("No scorable videos"));
        assert!(report.contains("No videos ranked above baseline"));
        assert!(report.contains("days fit disabled"));
        assert!(report.contains("exceedance tests off"));
    }
}
