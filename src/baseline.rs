use crate::models::ChannelBaseline;

/// Default extra multiplier applied on top of the baseline upper ratio.
pub const DEFAULT_UPPER_MULT: f64 = 1.0;

/// Evaluates a channel's regression fits: what view count is expected for a
/// given elapsed-days or like-count input, and what view count counts as an
/// outlier.
///
/// Every operation is total. Non-finite inputs or coefficients produce NaN,
/// which downstream code reads as "test does not apply", never as anomalous.
#[derive(Debug, Clone)]
pub struct BaselineModel {
    baseline: ChannelBaseline,
    upper_mult: f64,
}

impl BaselineModel {
    pub fn new(baseline: ChannelBaseline, upper_mult: f64) -> Self {
        let upper_mult = if upper_mult.is_finite() && upper_mult > 0.0 {
            upper_mult
        } else {
            DEFAULT_UPPER_MULT
        };
        BaselineModel {
            baseline,
            upper_mult,
        }
    }

    pub fn days_fit_usable(&self) -> bool {
        self.baseline.nat_log_intercept.is_finite() && self.baseline.nat_log_slope.is_finite()
    }

    pub fn likes_fit_usable(&self) -> bool {
        self.baseline.like_log_intercept.is_finite() && self.baseline.like_log_slope.is_finite()
    }

    /// Combined outlier threshold factor; NaN disables both exceedance tests.
    pub fn upper_factor(&self) -> f64 {
        let factor = self.baseline.upper_ratio * self.upper_mult;
        if factor.is_finite() && factor > 0.0 {
            factor
        } else {
            f64::NAN
        }
    }

    /// Expected view count `days` after publish. Inputs below 1 are clamped
    /// to 1; the fit is unstable in the first day of a video's life.
    pub fn expected_views_for_days(&self, days: f64) -> f64 {
        if !self.days_fit_usable() || !days.is_finite() {
            return f64::NAN;
        }
        let days = days.max(1.0);
        (self.baseline.nat_log_intercept + self.baseline.nat_log_slope * days).exp()
    }

    pub fn upper_views_for_days(&self, days: f64) -> f64 {
        self.expected_views_for_days(days) * self.upper_factor()
    }

    /// Expected view count for a video with `likes` likes. Zero or negative
    /// likes are outside the log domain and yield NaN.
    pub fn expected_views_for_likes(&self, likes: f64) -> f64 {
        if !self.likes_fit_usable() || !likes.is_finite() || likes <= 0.0 {
            return f64::NAN;
        }
        (self.baseline.like_log_intercept + self.baseline.like_log_slope * likes.ln()).exp()
    }

    pub fn upper_views_for_likes(&self, likes: f64) -> f64 {
        self.expected_views_for_likes(likes) * self.upper_factor()
    }
}
