use serde::Serialize;

use crate::baseline::BaselineModel;
use crate::models::VideoPoint;

/// Sample counts for a smooth overlay at chart resolution.
const DAYS_CURVE_SAMPLES: usize = 360;
const LIKES_CURVE_SAMPLES: usize = 300;

/// Expected and upper polylines for one analysis mode. Either polyline may be
/// empty when its fit is unusable; neither ever carries a non-finite
/// coordinate.
#[derive(Debug, Clone, Default, Serialize)]
pub struct CurvePair {
    pub expected: Vec<(f64, f64)>,
    pub upper: Vec<(f64, f64)>,
}

impl CurvePair {
    pub fn is_empty(&self) -> bool {
        self.expected.is_empty() && self.upper.is_empty()
    }
}

/// Overlay curves for views-vs-days: `(days, views)` pairs sampled evenly
/// between day 1 and the newest point's age.
///
/// `rows` must already be filtered to the points the days mode displays.
pub fn days_curves(model: &BaselineModel, rows: &[&VideoPoint]) -> CurvePair {
    let max_days = rows
        .iter()
        .map(|p| p.days_since_publish)
        .filter(|d| d.is_finite())
        .fold(f64::NAN, f64::max);
    if !max_days.is_finite() {
        return CurvePair::default();
    }
    let max_days = max_days.max(1.0);

    let mut curves = CurvePair::default();
    for i in 0..DAYS_CURVE_SAMPLES {
        let t = i as f64 / (DAYS_CURVE_SAMPLES - 1) as f64;
        let days = 1.0 + (max_days - 1.0) * t;
        push_finite(&mut curves.expected, days, model.expected_views_for_days(days));
        push_finite(&mut curves.upper, days, model.upper_views_for_days(days));
    }
    curves
}

/// Overlay curves for views-vs-likes: `(views, likes)` pairs. Likes are
/// sampled evenly in log-space across the observed like range; the axes are
/// transposed because likes mode plots views on x.
pub fn likes_curves(model: &BaselineModel, rows: &[&VideoPoint]) -> CurvePair {
    let mut min_likes = f64::INFINITY;
    let mut max_likes = f64::NEG_INFINITY;
    for point in rows {
        let likes = point.like_count;
        if likes.is_finite() && likes > 0.0 {
            min_likes = min_likes.min(likes);
            max_likes = max_likes.max(likes);
        }
    }
    if !min_likes.is_finite() || !max_likes.is_finite() {
        return CurvePair::default();
    }

    let ln_min = min_likes.ln();
    let ln_max = max_likes.ln();

    let mut curves = CurvePair::default();
    for i in 0..LIKES_CURVE_SAMPLES {
        let t = i as f64 / (LIKES_CURVE_SAMPLES - 1) as f64;
        let likes = (ln_min + (ln_max - ln_min) * t).exp();
        push_finite(&mut curves.expected, model.expected_views_for_likes(likes), likes);
        push_finite(&mut curves.upper, model.upper_views_for_likes(likes), likes);
    }
    curves
}

fn push_finite(line: &mut Vec<(f64, f64)>, x: f64, y: f64) {
    if x.is_finite() && y.is_finite() {
        line.push((x, y));
    }
}
