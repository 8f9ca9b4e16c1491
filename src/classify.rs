use crate::baseline::BaselineModel;
use crate::models::{AnalysisMode, ClassificationResult, Label, VideoPoint};

/// Marker substring that flags short-form uploads regardless of metadata.
const SHORTS_MARKER: &str = "#shorts";
/// Uploads with a duration at or under this count as shorts.
const SHORTS_MAX_DURATION_SECS: f64 = 60.0;
/// Anomaly ratio at or above which a single-baseline exceedance escalates
/// from YELLOW to ORANGE. Inclusive.
pub const ORANGE_ANOMALY_RATIO: f64 = 10.0;

/// The one shorts predicate. Every surface that scores or displays points
/// goes through this; it must never be re-implemented per consumer.
pub fn is_short_video(flag: Option<bool>, duration_secs: Option<f64>, text: &str) -> bool {
    if flag == Some(true) {
        return true;
    }
    if let Some(duration) = duration_secs {
        if duration.is_finite() && duration > 0.0 && duration <= SHORTS_MAX_DURATION_SECS {
            return true;
        }
    }
    text.to_lowercase().contains(SHORTS_MARKER)
}

/// A point enters scoring only when both metrics are inside the log/division
/// domain. Shorts never enter at all.
pub fn eligible_for_scoring(point: &VideoPoint) -> bool {
    !point.is_short && point.view_count > 0.0 && point.like_count > 0.0
}

/// Mode-specific display eligibility: the days axis additionally needs at
/// least one full day since publish. Likes mode has no days constraint.
pub fn eligible_for_mode(point: &VideoPoint, mode: AnalysisMode) -> bool {
    if !eligible_for_scoring(point) {
        return false;
    }
    match mode {
        AnalysisMode::ViewsDays => point.days_since_publish >= 1.0,
        AnalysisMode::ViewsLikes => true,
    }
}

/// Rows of `points` that the given mode is allowed to see.
pub fn mode_rows<'a>(points: &'a [VideoPoint], mode: AnalysisMode) -> Vec<&'a VideoPoint> {
    points.iter().filter(|p| eligible_for_mode(p, mode)).collect()
}

fn deviation_ratio(observed: f64, expected: f64) -> f64 {
    if observed > 0.0 && expected.is_finite() && expected > 0.0 {
        observed / expected
    } else {
        f64::NAN
    }
}

/// Classify one point against one baseline. Pure: a decision table over two
/// exceedance tests and one magnitude threshold, evaluated fresh per call.
pub fn classify(point: &VideoPoint, model: &BaselineModel) -> ClassificationResult {
    let expected_views_days = model.expected_views_for_days(point.days_since_publish);
    let upper_views_days = model.upper_views_for_days(point.days_since_publish);
    let expected_views_likes = model.expected_views_for_likes(point.like_count);
    let upper_views_likes = model.upper_views_for_likes(point.like_count);

    // A NaN upper bound means the test does not apply, not that it failed.
    // Shorts are excluded from scoring outright.
    let exceeds_days_baseline =
        !point.is_short && upper_views_days.is_finite() && point.view_count > upper_views_days;
    let exceeds_likes_baseline =
        !point.is_short && upper_views_likes.is_finite() && point.view_count > upper_views_likes;

    let label = if point.is_short {
        Label::Normal
    } else if exceeds_days_baseline && exceeds_likes_baseline {
        Label::Red
    } else if exceeds_days_baseline || exceeds_likes_baseline {
        if point.anomaly_ratio.is_finite() && point.anomaly_ratio >= ORANGE_ANOMALY_RATIO {
            Label::Orange
        } else {
            Label::Yellow
        }
    } else {
        Label::Normal
    };

    ClassificationResult {
        label,
        exceeds_days_baseline,
        exceeds_likes_baseline,
        expected_views_days,
        upper_views_days,
        expected_views_likes,
        upper_views_likes,
        days_ratio: deviation_ratio(point.view_count, expected_views_days),
        likes_ratio: deviation_ratio(point.view_count, expected_views_likes),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::ChannelBaseline;

    fn sample_baseline() -> ChannelBaseline {
        ChannelBaseline {
            nat_log_intercept: 10.0,
            nat_log_slope: -0.01,
            like_log_intercept: 2.0,
            like_log_slope: 1.1,
            upper_ratio: 2.0,
        }
    }

    fn sample_model() -> BaselineModel {
        BaselineModel::new(sample_baseline(), 1.0)
    }

    fn sample_point(view_count: f64, like_count: f64, days: f64) -> VideoPoint {
        VideoPoint {
            video_id: "vid-001".to_string(),
            title: "Weekly devlog".to_string(),
            view_count,
            like_count,
            days_since_publish: days,
            anomaly_ratio: f64::NAN,
            ratio_nat: f64::NAN,
            ratio_like: f64::NAN,
            is_short: false,
        }
    }

    /// Likes high enough that the likes fit predicts far more views than any
    /// days-only scenario feeds in, keeping the likes test from firing.
    fn quiet_likes() -> f64 {
        50_000.0
    }

    #[test]
    fn shorts_predicate_checks_flag_duration_and_text() {
        assert!(is_short_video(Some(true), None, ""));
        assert!(is_short_video(None, Some(45.0), ""));
        assert!(is_short_video(None, Some(60.0), ""));
        assert!(!is_short_video(None, Some(61.0), ""));
        assert!(!is_short_video(None, Some(0.0), ""));
        assert!(is_short_video(None, None, "big reveal #ShOrTs tomorrow"));
        assert!(!is_short_video(Some(false), None, "full length breakdown"));
        assert!(!is_short_video(None, Some(f64::NAN), ""));
    }

    #[test]
    fn days_only_exceedance_is_yellow_without_anomaly_ratio() {
        let model = sample_model();
        let upper = model.upper_views_for_days(5.0);
        let point = sample_point(upper * 1.01, quiet_likes(), 5.0);

        let result = classify(&point, &model);
        assert!(result.exceeds_days_baseline);
        assert!(!result.exceeds_likes_baseline);
        assert_eq!(result.label, Label::Yellow);
    }

    #[test]
    fn anomaly_ratio_at_threshold_escalates_to_orange() {
        let model = sample_model();
        let upper = model.upper_views_for_days(5.0);
        let mut point = sample_point(upper * 1.01, quiet_likes(), 5.0);
        point.anomaly_ratio = 10.0; // inclusive boundary

        assert_eq!(classify(&point, &model).label, Label::Orange);

        point.anomaly_ratio = 9.99;
        assert_eq!(classify(&point, &model).label, Label::Yellow);
    }

    #[test]
    fn both_exceedances_are_red_regardless_of_anomaly_ratio() {
        let model = sample_model();
        let upper_days = model.upper_views_for_days(5.0);
        let likes = 500.0;
        let upper_likes = model.upper_views_for_likes(likes);
        let views = upper_days.max(upper_likes) * 1.01;

        let mut point = sample_point(views, likes, 5.0);
        point.anomaly_ratio = 0.5;

        let result = classify(&point, &model);
        assert!(result.exceeds_days_baseline);
        assert!(result.exceeds_likes_baseline);
        assert_eq!(result.label, Label::Red);
    }

    #[test]
    fn shorts_classify_normal_no_matter_the_magnitude() {
        let model = sample_model();
        let mut point = sample_point(1e12, 500.0, 5.0);
        point.is_short = true;
        point.anomaly_ratio = 400.0;

        let result = classify(&point, &model);
        assert_eq!(result.label, Label::Normal);
        assert!(!result.exceeds_days_baseline);
        assert!(!result.exceeds_likes_baseline);
    }

    #[test]
    fn non_finite_slope_disables_the_days_test() {
        let mut baseline = sample_baseline();
        baseline.nat_log_slope = f64::NAN;
        let model = BaselineModel::new(baseline, 1.0);

        let point = sample_point(1e12, quiet_likes(), 5.0);
        let result = classify(&point, &model);
        assert!(result.upper_views_days.is_nan());
        assert!(!result.exceeds_days_baseline);
    }

    #[test]
    fn classification_is_idempotent_and_point_independent() {
        let model = sample_model();
        let upper = model.upper_views_for_days(5.0);
        let point = sample_point(upper * 1.5, quiet_likes(), 5.0);

        let first = classify(&point, &model);
        let second = classify(&point, &model);
        assert_eq!(first, second);
    }

    #[test]
    fn raising_views_never_lowers_the_label() {
        let model = sample_model();
        let likes = 500.0;
        let mut previous = Label::Normal;
        for views in [1.0, 1e3, 1e5, 1e7, 1e9, 1e11] {
            let label = classify(&sample_point(views, likes, 5.0), &model).label;
            assert!(label >= previous, "label regressed at views={views}");
            previous = label;
        }
        assert_eq!(previous, Label::Red);
    }

    #[test]
    fn deviation_ratios_compare_observed_to_expected() {
        let model = sample_model();
        let expected = model.expected_views_for_days(5.0);
        let point = sample_point(expected * 3.0, quiet_likes(), 5.0);

        let result = classify(&point, &model);
        assert!((result.days_ratio - 3.0).abs() < 1e-9);
    }

    #[test]
    fn mode_rows_apply_the_domain_filters() {
        let normal = sample_point(1000.0, 50.0, 5.0);
        let zero_likes = sample_point(1000.0, 0.0, 5.0);
        let zero_views = sample_point(0.0, 50.0, 5.0);
        let fresh = sample_point(1000.0, 50.0, 0.5);
        let mut short = sample_point(1000.0, 50.0, 5.0);
        short.is_short = true;

        let points = vec![normal, zero_likes, zero_views, fresh, short];

        let days_rows = mode_rows(&points, AnalysisMode::ViewsDays);
        assert_eq!(days_rows.len(), 1);
        assert!((days_rows[0].days_since_publish - 5.0).abs() < 1e-12);

        // likes mode keeps the fresh upload: no days constraint there
        let likes_rows = mode_rows(&points, AnalysisMode::ViewsLikes);
        assert_eq!(likes_rows.len(), 2);
    }

    #[test]
    fn nan_metrics_are_excluded_from_every_mode() {
        let point = sample_point(f64::NAN, 50.0, 5.0);
        assert!(!eligible_for_mode(&point, AnalysisMode::ViewsDays));
        assert!(!eligible_for_mode(&point, AnalysisMode::ViewsLikes));

        let point = sample_point(1000.0, 50.0, f64::NAN);
        assert!(!eligible_for_mode(&point, AnalysisMode::ViewsDays));
        assert!(eligible_for_mode(&point, AnalysisMode::ViewsLikes));
    }
}
