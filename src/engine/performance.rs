// src/engine/performance.rs

use serde::{Deserialize, Serialize};

/// Polarity rule for scoring a KPI against its target.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TargetType {
    Maximize,
    Minimize,
    Maintain,
}

impl TargetType {
    /// Parse the stored text value; anything unrecognized falls back to the
    /// schema default of maximize.
    pub fn parse(s: &str) -> TargetType {
        match s {
            "minimize" => TargetType::Minimize,
            "maintain" => TargetType::Maintain,
            _ => TargetType::Maximize,
        }
    }

    pub fn as_str(self) -> &'static str {
        match self {
            TargetType::Maximize => "maximize",
            TargetType::Minimize => "minimize",
            TargetType::Maintain => "maintain",
        }
    }
}

/// Dashboard status bands. Minimize targets invert the polarity here, not
/// in the percentage formula.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum PerformanceStatus {
    Excellent,
    OnTrack,
    AtRisk,
    Critical,
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct PerformanceScore {
    pub percent: f64,
    pub status: PerformanceStatus,
}

/// Score a KPI for the dashboard performance summary.
///
/// Returns `None` when no target is set (or the target is zero): no
/// percentage is computed and status classification is skipped. Maximize
/// and minimize share the `current/target` formula; maintain has no bands
/// of its own and reports on-track.
pub fn summarize(
    current: f64,
    target: Option<f64>,
    target_type: TargetType,
) -> Option<PerformanceScore> {
    let target = match target {
        Some(t) if t != 0.0 => t,
        _ => return None,
    };

    let percent = (current / target) * 100.0;
    let status = match target_type {
        TargetType::Maximize => {
            if percent >= 100.0 {
                PerformanceStatus::Excellent
            } else if percent >= 80.0 {
                PerformanceStatus::OnTrack
            } else if percent >= 60.0 {
                PerformanceStatus::AtRisk
            } else {
                PerformanceStatus::Critical
            }
        }
        TargetType::Minimize => {
            if percent <= 100.0 {
                PerformanceStatus::Excellent
            } else if percent <= 120.0 {
                PerformanceStatus::OnTrack
            } else if percent <= 150.0 {
                PerformanceStatus::AtRisk
            } else {
                PerformanceStatus::Critical
            }
        }
        TargetType::Maintain => PerformanceStatus::OnTrack,
    };

    Some(PerformanceScore { percent, status })
}

/// Generic utility variant used outside the dashboard summary. A zero
/// target yields 0 instead of skipping the computation; the minimize
/// formula is the inverted ratio here.
pub fn calculate_performance(actual: f64, target: f64, target_type: TargetType) -> f64 {
    if target == 0.0 {
        return 0.0;
    }

    match target_type {
        TargetType::Maximize => (actual / target) * 100.0,
        TargetType::Minimize => (target / actual) * 100.0,
        TargetType::Maintain => 100.0 - ((actual - target) / target * 100.0).abs(),
    }
}

/// UI coloring bands over any performance percentage. Independent of the
/// dashboard's on-track/at-risk bands and of target type; the thresholds
/// intentionally differ.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum StatusColor {
    Excellent,
    Good,
    Warning,
    Critical,
}

impl StatusColor {
    pub fn label(self) -> &'static str {
        match self {
            StatusColor::Excellent => "Excellent",
            StatusColor::Good => "Good",
            StatusColor::Warning => "Warning",
            StatusColor::Critical => "Critical",
        }
    }

    pub fn hex(self) -> &'static str {
        match self {
            StatusColor::Excellent => "#10B981",
            StatusColor::Good => "#84CC16",
            StatusColor::Warning => "#F59E0B",
            StatusColor::Critical => "#EF4444",
        }
    }
}

pub fn status_color(performance: f64) -> StatusColor {
    if performance >= 100.0 {
        StatusColor::Excellent
    } else if performance >= 90.0 {
        StatusColor::Good
    } else if performance >= 75.0 {
        StatusColor::Warning
    } else {
        StatusColor::Critical
    }
}

/// Performance percentages are surfaced with exactly two decimal digits.
pub fn format_percent(percent: f64) -> String {
    format!("{percent:.2}")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn maximize_percent_is_ratio_of_target() {
        let score = summarize(75.0, Some(100.0), TargetType::Maximize).unwrap();
        assert_eq!(score.percent, 75.0);
        assert_eq!(score.status, PerformanceStatus::AtRisk);
    }

    #[test]
    fn maximize_bands() {
        let status = |cur| summarize(cur, Some(100.0), TargetType::Maximize).unwrap().status;
        assert_eq!(status(100.0), PerformanceStatus::Excellent);
        assert_eq!(status(80.0), PerformanceStatus::OnTrack);
        assert_eq!(status(60.0), PerformanceStatus::AtRisk);
        assert_eq!(status(59.9), PerformanceStatus::Critical);
    }

    #[test]
    fn minimize_excellent_iff_at_most_hundred_percent() {
        let status = |cur| summarize(cur, Some(100.0), TargetType::Minimize).unwrap().status;
        assert_eq!(status(100.0), PerformanceStatus::Excellent);
        assert_eq!(status(100.1), PerformanceStatus::OnTrack);
        assert_eq!(status(120.0), PerformanceStatus::OnTrack);
        assert_eq!(status(150.0), PerformanceStatus::AtRisk);
        assert_eq!(status(151.0), PerformanceStatus::Critical);
    }

    #[test]
    fn missing_or_zero_target_skips_scoring() {
        assert!(summarize(50.0, None, TargetType::Maximize).is_none());
        assert!(summarize(50.0, Some(0.0), TargetType::Minimize).is_none());
    }

    #[test]
    fn generic_variant_returns_zero_for_zero_target() {
        assert_eq!(calculate_performance(50.0, 0.0, TargetType::Maximize), 0.0);
        assert_eq!(calculate_performance(50.0, 0.0, TargetType::Minimize), 0.0);
        assert_eq!(calculate_performance(50.0, 0.0, TargetType::Maintain), 0.0);
    }

    #[test]
    fn generic_maintain_penalizes_distance_from_target() {
        assert_eq!(calculate_performance(100.0, 100.0, TargetType::Maintain), 100.0);
        assert_eq!(calculate_performance(110.0, 100.0, TargetType::Maintain), 90.0);
        assert_eq!(calculate_performance(90.0, 100.0, TargetType::Maintain), 90.0);
    }

    #[test]
    fn generic_minimize_inverts_the_ratio() {
        assert_eq!(calculate_performance(50.0, 100.0, TargetType::Minimize), 200.0);
    }

    #[test]
    fn color_bands_are_independent_of_dashboard_bands() {
        assert_eq!(status_color(100.0), StatusColor::Excellent);
        assert_eq!(status_color(90.0), StatusColor::Good);
        assert_eq!(status_color(75.0), StatusColor::Warning);
        assert_eq!(status_color(74.9), StatusColor::Critical);
        assert_eq!(StatusColor::Warning.hex(), "#F59E0B");
    }

    #[test]
    fn percent_formatting_keeps_two_decimals() {
        assert_eq!(format_percent(75.0), "75.00");
        assert_eq!(format_percent(66.666), "66.67");
    }
}
