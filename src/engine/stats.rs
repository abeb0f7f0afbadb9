// src/engine/stats.rs

use std::collections::HashMap;

use chrono::{DateTime, Utc};
use serde::Serialize;
use uuid::Uuid;

use crate::models::{Category, Kpi, Metric};

/// Summary over a KPI's most recent metric window. The average keeps the
/// 2-decimal string form it is surfaced with.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Statistics {
    pub average: String,
    pub minimum: f64,
    pub maximum: f64,
    pub data_points: usize,
}

/// Compute count/mean/min/max over already-fetched metric values. Zero
/// metrics is a valid state, not an error.
pub fn recent_statistics(values: &[f64]) -> Statistics {
    if values.is_empty() {
        return Statistics {
            average: "0.00".to_string(),
            minimum: 0.0,
            maximum: 0.0,
            data_points: 0,
        };
    }

    let sum: f64 = values.iter().sum();
    let minimum = values.iter().copied().fold(f64::INFINITY, f64::min);
    let maximum = values.iter().copied().fold(f64::NEG_INFINITY, f64::max);

    Statistics {
        average: format!("{:.2}", sum / values.len() as f64),
        minimum,
        maximum,
        data_points: values.len(),
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct StatusCount {
    pub status: String,
    pub count: i64,
}

/// Count KPIs per status value, in first-seen order.
pub fn group_by_status(kpis: &[Kpi]) -> Vec<StatusCount> {
    let mut groups: Vec<StatusCount> = Vec::new();
    for kpi in kpis {
        match groups.iter_mut().find(|g| g.status == kpi.status) {
            Some(g) => g.count += 1,
            None => groups.push(StatusCount { status: kpi.status.clone(), count: 1 }),
        }
    }
    groups
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct CategoryCount {
    pub category_id: Uuid,
    pub name: String,
    pub count: i64,
}

/// Count KPIs per resolved category. KPIs with no category (or a dangling
/// reference) are left out of the grouping.
pub fn group_by_category(kpis: &[Kpi], categories: &HashMap<Uuid, Category>) -> Vec<CategoryCount> {
    let mut groups: Vec<CategoryCount> = Vec::new();
    for kpi in kpis {
        let Some(category_id) = kpi.category_id else { continue };
        let Some(category) = categories.get(&category_id) else { continue };
        match groups.iter_mut().find(|g| g.category_id == category_id) {
            Some(g) => g.count += 1,
            None => groups.push(CategoryCount {
                category_id,
                name: category.name.clone(),
                count: 1,
            }),
        }
    }
    groups
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct TrendPoint {
    pub timestamp: DateTime<Utc>,
    pub value: f64,
}

#[derive(Debug, Clone, Serialize)]
pub struct KpiTrendSeries {
    pub kpi: Kpi,
    pub data: Vec<TrendPoint>,
}

/// Group chronologically ascending (timestamp, value) pairs under their
/// owning KPI, preserving the order KPIs are first seen in. Metrics whose
/// KPI is not in the lookup are skipped.
pub fn trend_series(metrics: &[Metric], kpis: &HashMap<Uuid, Kpi>) -> Vec<KpiTrendSeries> {
    let mut series: Vec<KpiTrendSeries> = Vec::new();
    for metric in metrics {
        let point = TrendPoint { timestamp: metric.recorded_at, value: metric.value };
        match series.iter_mut().find(|s| s.kpi.kpi_id == metric.kpi_id) {
            Some(s) => s.data.push(point),
            None => {
                let Some(kpi) = kpis.get(&metric.kpi_id) else { continue };
                series.push(KpiTrendSeries { kpi: kpi.clone(), data: vec![point] });
            }
        }
    }
    series
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::engine::testutil::{kpi, metric};

    #[test]
    fn statistics_over_three_values() {
        let stats = recent_statistics(&[10.0, 20.0, 30.0]);
        assert_eq!(stats.average, "20.00");
        assert_eq!(stats.minimum, 10.0);
        assert_eq!(stats.maximum, 30.0);
        assert_eq!(stats.data_points, 3);
    }

    #[test]
    fn statistics_over_zero_metrics() {
        let stats = recent_statistics(&[]);
        assert_eq!(stats.average, "0.00");
        assert_eq!(stats.minimum, 0.0);
        assert_eq!(stats.maximum, 0.0);
        assert_eq!(stats.data_points, 0);
    }

    #[test]
    fn status_grouping_counts_each_value() {
        let kpis = vec![
            kpi("a", "active", 1.0, None),
            kpi("b", "active", 1.0, None),
            kpi("c", "archived", 1.0, None),
        ];
        let groups = group_by_status(&kpis);
        assert_eq!(groups.len(), 2);
        assert_eq!(groups[0], StatusCount { status: "active".into(), count: 2 });
        assert_eq!(groups[1], StatusCount { status: "archived".into(), count: 1 });
    }

    #[test]
    fn category_grouping_skips_uncategorized_kpis() {
        let category = crate::engine::testutil::category("Production");
        let mut categorized = kpi("a", "active", 1.0, None);
        categorized.category_id = Some(category.category_id);
        let orphan = kpi("b", "active", 1.0, None);

        let mut lookup = HashMap::new();
        lookup.insert(category.category_id, category.clone());

        let groups = group_by_category(&[categorized, orphan], &lookup);
        assert_eq!(groups.len(), 1);
        assert_eq!(groups[0].name, "Production");
        assert_eq!(groups[0].count, 1);
    }

    #[test]
    fn trend_series_preserves_first_seen_kpi_order() {
        let first = kpi("first", "active", 1.0, None);
        let second = kpi("second", "active", 1.0, None);
        let metrics = vec![
            metric(first.kpi_id, 1.0, 1),
            metric(second.kpi_id, 2.0, 2),
            metric(first.kpi_id, 3.0, 3),
        ];
        let mut lookup = HashMap::new();
        lookup.insert(first.kpi_id, first.clone());
        lookup.insert(second.kpi_id, second.clone());

        let series = trend_series(&metrics, &lookup);
        assert_eq!(series.len(), 2);
        assert_eq!(series[0].kpi.kpi_id, first.kpi_id);
        assert_eq!(series[0].data.len(), 2);
        assert_eq!(series[0].data[1].value, 3.0);
        assert_eq!(series[1].kpi.kpi_id, second.kpi_id);
    }

    #[test]
    fn trend_series_skips_unresolved_kpis() {
        let known = kpi("known", "active", 1.0, None);
        let metrics = vec![
            metric(Uuid::new_v4(), 9.0, 1),
            metric(known.kpi_id, 1.0, 2),
        ];
        let mut lookup = HashMap::new();
        lookup.insert(known.kpi_id, known.clone());

        let series = trend_series(&metrics, &lookup);
        assert_eq!(series.len(), 1);
        assert_eq!(series[0].kpi.kpi_id, known.kpi_id);
    }
}
