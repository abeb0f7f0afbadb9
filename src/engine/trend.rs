// src/engine/trend.rs

use serde::{Deserialize, Serialize};

/// Qualitative direction of change between consecutive KPI values.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Trend {
    Up,
    Down,
    Stable,
}

impl Trend {
    pub fn as_str(self) -> &'static str {
        match self {
            Trend::Up => "up",
            Trend::Down => "down",
            Trend::Stable => "stable",
        }
    }
}

/// Change below this fraction of the previous value counts as stable.
const STABILITY_THRESHOLD: f64 = 0.01;

/// Classify the direction of change from `previous` to `current`.
///
/// A relative change strictly below 1% is stable; exactly 1% is already a
/// move. With a previous value of zero there is nothing to normalize
/// against, so fall back to the sign of the difference (both zero is
/// stable).
pub fn classify(current: f64, previous: f64) -> Trend {
    if previous == 0.0 {
        if current == 0.0 {
            return Trend::Stable;
        }
        return if current > previous { Trend::Up } else { Trend::Down };
    }

    let relative_change = ((current - previous) / previous).abs();
    if relative_change < STABILITY_THRESHOLD {
        Trend::Stable
    } else if current > previous {
        Trend::Up
    } else {
        Trend::Down
    }
}

/// Signed percent change for display, separate from trend classification.
/// A zero previous value yields 0 when current is also zero, else 100.
pub fn percent_change(current: f64, previous: f64) -> f64 {
    if previous == 0.0 {
        return if current == 0.0 { 0.0 } else { 100.0 };
    }
    ((current - previous) / previous) * 100.0
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn one_percent_change_is_up_not_stable() {
        // threshold is strict <, so exactly 1% already counts as movement
        assert_eq!(classify(101.0, 100.0), Trend::Up);
        assert_eq!(classify(99.0, 100.0), Trend::Down);
        assert_eq!(classify(110.0, 100.0), Trend::Up);
    }

    #[test]
    fn change_below_threshold_is_stable() {
        assert_eq!(classify(100.5, 100.0), Trend::Stable);
        assert_eq!(classify(99.5, 100.0), Trend::Stable);
    }

    #[test]
    fn equal_values_are_stable() {
        assert_eq!(classify(100.0, 100.0), Trend::Stable);
    }

    #[test]
    fn drop_over_threshold_is_down() {
        assert_eq!(classify(90.0, 100.0), Trend::Down);
    }

    #[test]
    fn zero_previous_falls_back_to_sign() {
        assert_eq!(classify(0.0, 0.0), Trend::Stable);
        assert_eq!(classify(5.0, 0.0), Trend::Up);
        assert_eq!(classify(-5.0, 0.0), Trend::Down);
    }

    #[test]
    fn percent_change_display() {
        assert_eq!(percent_change(150.0, 100.0), 50.0);
        assert_eq!(percent_change(50.0, 100.0), -50.0);
        assert_eq!(percent_change(0.0, 0.0), 0.0);
        assert_eq!(percent_change(42.0, 0.0), 100.0);
    }
}
